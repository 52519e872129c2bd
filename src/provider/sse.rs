// src/provider/sse.rs
// Shared SSE line parsing for the cloud providers: `data: {json}\n`,
// terminated by `data: [DONE]` or an empty payload. Pulled out into one
// helper instead of duplicated per provider.

/// Splits a raw SSE byte chunk into `data:` payload lines, dropping the
/// `[DONE]` sentinel and any non-`data:` lines (comments, blank
/// keep-alives).
pub fn extract_data_lines(chunk: &str) -> Vec<&str> {
    chunk
        .lines()
        .filter_map(|line| line.strip_prefix("data: ").or_else(|| line.strip_prefix("data:")))
        .map(str::trim)
        .filter(|data| !data.is_empty() && *data != "[DONE]")
        .collect()
}

/// Splits newline-delimited JSON (the local Ollama wire format) into
/// individual object strings.
pub fn extract_ndjson_lines(chunk: &str) -> Vec<&str> {
    chunk.lines().map(str::trim).filter(|l| !l.is_empty()).collect()
}
