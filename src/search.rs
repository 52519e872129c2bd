// src/search.rs
// Searcher: user-scoped top-k nearest neighbor by cosine similarity,
// computed in-process over vectors the store hands back as raw bytes
// (see DESIGN.md for why this favors brute-force scoring over an external
// vector database at the single-user / small-library scale this targets).

use crate::error::AppResult;
use crate::store::chunks::bytes_to_embedding;
use crate::store::{SearchHit, Store};

pub struct Searcher<'a> {
    store: &'a Store,
}

impl<'a> Searcher<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Returns up to `k` hits ordered by score descending, ties broken by
    /// most-recent-first insertion order. Chunks whose stored embedding
    /// differs in dimension from `query_vec` are silently skipped — these
    /// represent a stale embedding model and can't be scored meaningfully.
    pub async fn search(&self, user_id: &str, query_vec: &[f32], k: usize) -> AppResult<Vec<SearchHit>> {
        let rows = self.store.chunks_visible_to(user_id).await?;

        let mut scored: Vec<(f32, i64, SearchHit)> = rows
            .into_iter()
            .filter_map(|row| {
                let embedding = bytes_to_embedding(&row.embedding);
                if embedding.len() != query_vec.len() {
                    return None;
                }
                let score = cosine_similarity(query_vec, &embedding);
                Some((
                    score,
                    row.id,
                    SearchHit {
                        source: row.source,
                        text: row.text,
                        score,
                    },
                ))
            })
            .collect();

        // Descending score; on exact ties, higher row id (more recent insert) first.
        scored.sort_by(|a, b| {
            b.0.partial_cmp(&a.0)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| b.1.cmp(&a.1))
        });

        Ok(scored.into_iter().take(k).map(|(_, _, hit)| hit).collect())
    }
}

/// Cosine similarity of two equal-length vectors, compared as-stored with no
/// re-normalisation. Returns 0.0 for a zero-magnitude vector rather than
/// dividing by zero.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    dot / (mag_a * mag_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::models::Visibility;

    #[test]
    fn identical_vectors_score_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn orthogonal_vectors_score_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }

    #[test]
    fn zero_vector_scores_zero_not_nan() {
        let score = cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]);
        assert_eq!(score, 0.0);
    }

    #[tokio::test]
    async fn search_skips_mismatched_dimensions_and_orders_by_score() {
        let store = Store::open("sqlite::memory:").await.unwrap();
        store.create_user("u1", "alice", "h", false).await.unwrap();

        store
            .insert_chunk("u1", "a.md", "low match", &[1.0, 0.0], &[], None, Visibility::Private)
            .await
            .unwrap();
        store
            .insert_chunk("u1", "b.md", "high match", &[0.0, 1.0], &[], None, Visibility::Private)
            .await
            .unwrap();
        store
            .insert_chunk(
                "u1",
                "stale.md",
                "stale dims",
                &[1.0, 0.0, 0.0],
                &[],
                None,
                Visibility::Private,
            )
            .await
            .unwrap();

        let searcher = Searcher::new(&store);
        let hits = searcher.search("u1", &[0.0, 1.0], 5).await.unwrap();

        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].source, "b.md");
        assert!((hits[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn search_respects_k_and_user_scoping() {
        let store = Store::open("sqlite::memory:").await.unwrap();
        store.create_user("u1", "alice", "h", false).await.unwrap();
        store.create_user("u2", "bob", "h", false).await.unwrap();

        store
            .insert_chunk("u2", "secret.md", "bob's data", &[1.0, 0.0], &[], None, Visibility::Private)
            .await
            .unwrap();

        let searcher = Searcher::new(&store);
        let hits = searcher.search("u1", &[1.0, 0.0], 5).await.unwrap();
        assert!(hits.is_empty());
    }
}
