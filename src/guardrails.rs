// src/guardrails.rs
// Pre-ingestion validation: path, size, extension, PII, privacy.
//
// PII/secret pattern tables are adapted from "is this content safe to
// remember" to "is this content safe to ingest", with a `PiiMode`-driven
// outcome instead of a single boolean.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;

use crate::config::{GuardrailsConfig, PiiMode};
use crate::error::{AppError, AppResult};

const BLOCKED_PATH_PREFIXES: &[&str] = &[
    "/etc", "/sys", "/proc", "/System", "C:\\Windows", "C:\\System",
];

/// (description, regex) pairs for content that looks like PII or a secret.
#[allow(clippy::expect_used)]
static PII_PATTERNS: LazyLock<Vec<(&'static str, Regex)>> = LazyLock::new(|| {
    vec![
        (
            "national id number",
            Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").expect("valid regex"),
        ),
        (
            "credit card number",
            Regex::new(r"\b(?:\d[ -]?){13,16}\b").expect("valid regex"),
        ),
        (
            "email address",
            Regex::new(r"(?i)\b[a-z0-9._%+-]+@[a-z0-9.-]+\.[a-z]{2,}\b").expect("valid regex"),
        ),
        (
            "phone number",
            Regex::new(r"\b(?:\+?\d{1,2}[ -]?)?\(?\d{3}\)?[ -]?\d{3}[ -]?\d{4}\b")
                .expect("valid regex"),
        ),
        (
            "cryptographic key header",
            Regex::new(r"-----BEGIN (RSA |EC |OPENSSH )?PRIVATE KEY-----").expect("valid regex"),
        ),
        (
            "generic high-entropy secret",
            Regex::new(r#"(?i)(secret|token|api[_-]?key)\s*[:=]\s*['"]?[a-zA-Z0-9_\-/.]{20,}"#)
                .expect("valid regex"),
        ),
    ]
});

/// First PII/secret rule name that matches `text`, if any.
pub fn detect_pii(text: &str) -> Option<&'static str> {
    PII_PATTERNS
        .iter()
        .find(|(_, re)| re.is_match(text))
        .map(|(name, _)| *name)
}

pub struct Guardrails<'a> {
    config: &'a GuardrailsConfig,
    privacy_mode: bool,
}

/// Outcome of a guardrail pass over ingested text: whether it was rejected
/// outright, and whether a PII marker should be attached to the stored
/// summary ("normal" mode attaches a marker, "strict" mode refuses).
pub struct GuardrailOutcome {
    pub pii_marker: Option<&'static str>,
}

impl<'a> Guardrails<'a> {
    pub fn new(config: &'a GuardrailsConfig, privacy_mode: bool) -> Self {
        Self {
            config,
            privacy_mode,
        }
    }

    /// Validates a path meant to host a watched folder: must not live under a
    /// hard-coded system directory, must exist, and must be a directory.
    pub fn check_watch_path(&self, path: &Path) -> AppResult<()> {
        let as_str = path.to_string_lossy();
        if BLOCKED_PATH_PREFIXES
            .iter()
            .any(|prefix| as_str.starts_with(prefix))
        {
            return Err(AppError::GuardrailRejected {
                rule: "path:system-directory".into(),
            });
        }
        if !path.exists() {
            return Err(AppError::GuardrailRejected {
                rule: "path:does-not-exist".into(),
            });
        }
        if !path.is_dir() {
            return Err(AppError::GuardrailRejected {
                rule: "path:not-a-directory".into(),
            });
        }
        Ok(())
    }

    /// Checks the extension of `source` against the configured allow-list.
    /// `source` is typically a file path; callers ingesting a caller-named
    /// source with no extension should skip this check.
    pub fn check_extension(&self, source: &str) -> AppResult<()> {
        let lower = source.to_lowercase();
        if self
            .config
            .allowed_extensions
            .iter()
            .any(|ext| lower.ends_with(&ext.to_lowercase()))
        {
            Ok(())
        } else {
            Err(AppError::GuardrailRejected {
                rule: "extension:not-allowed".into(),
            })
        }
    }

    pub fn check_size(&self, size_bytes: u64) -> AppResult<()> {
        if size_bytes > self.config.max_file_size_bytes() {
            Err(AppError::GuardrailRejected {
                rule: "size:exceeds-cap".into(),
            })
        } else {
            Ok(())
        }
    }

    /// Privacy mode forbids URL ingestion outright.
    pub fn check_url_allowed(&self) -> AppResult<()> {
        if self.privacy_mode {
            Err(AppError::GuardrailRejected {
                rule: "privacy:url-ingestion-forbidden".into(),
            })
        } else {
            Ok(())
        }
    }

    /// Privacy mode makes a network-requiring skill ineligible to execute.
    pub fn check_skill_network_allowed(&self, requires_network: bool) -> AppResult<()> {
        if self.privacy_mode && requires_network {
            Err(AppError::GuardrailRejected {
                rule: "privacy:network-skill-forbidden".into(),
            })
        } else {
            Ok(())
        }
    }

    /// Runs PII/secret detection according to the configured mode. In
    /// `strict` mode a match refuses ingestion; in `normal` mode a match is
    /// reported back as a marker to attach to the stored summary; `off`
    /// never inspects content.
    pub fn check_pii(&self, text: &str) -> AppResult<GuardrailOutcome> {
        if self.config.pii_detection == PiiMode::Off {
            return Ok(GuardrailOutcome { pii_marker: None });
        }
        match detect_pii(text) {
            Some(rule) if self.config.pii_detection == PiiMode::Strict => {
                Err(AppError::GuardrailRejected {
                    rule: format!("pii:{rule}"),
                })
            }
            Some(rule) => Ok(GuardrailOutcome {
                pii_marker: Some(rule),
            }),
            None => Ok(GuardrailOutcome { pii_marker: None }),
        }
    }
}
