//! Vector comparison and ranking.

use crate::error::{Error, Result};

/// Score assigned when either vector has zero norm.
pub const DEGENERATE_SCORE: f64 = -1.0;

/// Cosine of the angle between `a` and `b`, accumulated in `f64`.
///
/// A zero-norm vector has no direction; it scores [`DEGENERATE_SCORE`] so it sinks to
/// the bottom of a ranking instead of poisoning it with NaN.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f64> {
    if a.len() != b.len() {
        return Err(Error::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        norm_a += x * x;
        norm_b += y * y;
    }

    let denom = norm_a.sqrt() * norm_b.sqrt();
    if denom <= f64::EPSILON || !denom.is_finite() {
        return Ok(DEGENERATE_SCORE);
    }
    Ok((dot / denom).clamp(-1.0, 1.0))
}

/// Stable sort, highest score first. Equal scores keep their input order.
pub fn rank_descending<T>(items: &mut [T], score: impl Fn(&T) -> f64) {
    items.sort_by(|a, b| score(b).total_cmp(&score(a)));
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn self_similarity_is_one() {
        for v in [
            vec![1.0f32, 2.0, 3.0],
            vec![-0.5, 0.25, 8.0, 0.0],
            vec![1e-3, 1e-3],
        ] {
            let s = cosine_similarity(&v, &v).unwrap();
            assert!((s - 1.0).abs() < EPS, "self similarity was {s}");
        }
    }

    #[test]
    fn similarity_is_symmetric() {
        let a = [0.3f32, -1.2, 4.0, 0.7];
        let b = [2.0f32, 0.1, -0.4, 1.5];
        let ab = cosine_similarity(&a, &b).unwrap();
        let ba = cosine_similarity(&b, &a).unwrap();
        assert_eq!(ab, ba);
    }

    #[test]
    fn orthogonal_and_opposite_vectors() {
        assert!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]).unwrap().abs() < EPS);
        let opposite = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap();
        assert!((opposite + 1.0).abs() < EPS);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let err = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            Error::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn zero_vector_scores_minimum() {
        let s = cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap();
        assert_eq!(s, DEGENERATE_SCORE);
        assert!(!s.is_nan());
    }

    #[test]
    fn ranking_is_descending_and_stable() {
        let mut items = vec![("a", 0.5), ("b", 0.9), ("c", 0.5), ("d", -0.2), ("e", 0.9)];
        rank_descending(&mut items, |(_, s)| *s);
        let order: Vec<&str> = items.iter().map(|(n, _)| *n).collect();
        assert_eq!(order, vec!["b", "e", "a", "c", "d"]);
    }
}
