use crate::model::{Chunk, ScoredChunk};
use crate::store::ChunkStore;

/// Cosine similarity over the common prefix of `a` and `b`.
///
/// Returns `0.0` when either vector has zero norm or a component is not finite.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let mut dot = 0.0f64;
    let mut a_norm = 0.0f64;
    let mut b_norm = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        a_norm += x * x;
        b_norm += y * y;
    }
    if a_norm == 0.0 || b_norm == 0.0 {
        return 0.0;
    }
    let score = dot / (a_norm.sqrt() * b_norm.sqrt());
    if !score.is_finite() {
        return 0.0;
    }
    score.clamp(-1.0, 1.0) as f32
}

/// Scores every `(metadata, vector)` pair against `query` and sorts the result
/// by descending score. Equal scores keep their input order.
pub fn rank<M, V, I>(query: &[f32], pairs: I) -> Vec<(M, f32)>
where
    I: IntoIterator<Item = (M, V)>,
    V: AsRef<[f32]>,
{
    let mut scored: Vec<(M, f32)> = pairs
        .into_iter()
        .map(|(meta, vector)| {
            let score = cosine_similarity(query, vector.as_ref());
            (meta, score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1));
    scored
}

pub fn rank_chunks(query: &[f32], store: &ChunkStore) -> Vec<ScoredChunk> {
    rank(query, store.pairs())
        .into_iter()
        .map(|(chunk, score): (&Chunk, f32)| ScoredChunk {
            chunk: chunk.clone(),
            score,
        })
        .collect()
}

/// The `k` best entries of an already ranked list, best first.
pub fn nearest<T: Clone>(ranked: &[T], k: usize) -> Vec<T> {
    ranked.iter().take(k).cloned().collect()
}

/// The `k` worst entries of an already ranked list, worst first.
pub fn furthest<T: Clone>(ranked: &[T], k: usize) -> Vec<T> {
    ranked.iter().rev().take(k).cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_vector_scores_zero() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0, 2.0], &[0.0, 0.0]), 0.0);
        assert_eq!(cosine_similarity(&[], &[]), 0.0);
    }

    #[test]
    fn opposite_vectors_score_minus_one() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[-1.0, 0.0]), -1.0);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
    }

    #[test]
    fn ties_keep_input_order() {
        // Scores 0.9, 0.5, 0.9, 0.1 are reproduced with unit vectors at fixed angles.
        let query = [1.0f32, 0.0];
        let at = |cos: f32| vec![cos, (1.0 - cos * cos).sqrt()];
        let pairs = vec![(0usize, at(0.9)), (1, at(0.5)), (2, at(0.9)), (3, at(0.1))];
        let ranked = rank(&query, pairs);
        let order: Vec<usize> = ranked.iter().map(|(idx, _)| *idx).collect();
        assert_eq!(order, vec![0, 2, 1, 3]);
    }

    #[test]
    fn nearest_takes_three_highest_in_descending_order() {
        let query = [1.0f32, 0.0];
        let pairs: Vec<(usize, Vec<f32>)> = (0..10)
            .map(|i| {
                let cos = i as f32 / 10.0;
                (i, vec![cos, (1.0 - cos * cos).sqrt()])
            })
            .collect();
        let ranked = rank(&query, pairs);
        let top = nearest(&ranked, 3);
        assert_eq!(top.len(), 3);
        let ids: Vec<usize> = top.iter().map(|(i, _)| *i).collect();
        assert_eq!(ids, vec![9, 8, 7]);
        assert!(top[0].1 >= top[1].1 && top[1].1 >= top[2].1);
    }

    #[test]
    fn furthest_starts_from_lowest_score() {
        let ranked = vec![("a", 0.9f32), ("b", 0.4), ("c", -0.2), ("d", -0.8)];
        let worst = furthest(&ranked, 2);
        assert_eq!(worst, vec![("d", -0.8), ("c", -0.2)]);
        assert_eq!(furthest(&ranked, 10).len(), 4);
    }

    #[test]
    fn non_finite_components_score_zero() {
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[f32::INFINITY, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[f32::NAN, 1.0], &[1.0, 0.0]), 0.0);
    }

    #[test]
    fn rank_survives_infinite_vectors() {
        let query = [1.0f32, 0.0];
        let pairs: Vec<(usize, Vec<f32>)> = (0..64)
            .map(|i| {
                let v = if i % 3 == 0 {
                    vec![f32::INFINITY, 1.0]
                } else {
                    vec![1.0, i as f32]
                };
                (i, v)
            })
            .collect();
        let ranked = rank(&query, pairs);
        assert_eq!(ranked.len(), 64);
        assert!(ranked.iter().all(|(_, score)| score.is_finite()));
        assert_eq!(ranked[0].0, 1);
    }

    #[test]
    fn rank_does_not_mutate_inputs() {
        let vectors = vec![vec![0.0f32, 1.0], vec![1.0, 0.0]];
        let ranked = rank(&[1.0, 0.0], vectors.iter().enumerate());
        assert_eq!(ranked[0].0, 1);
        assert_eq!(vectors[0], vec![0.0, 1.0]);
    }
}
