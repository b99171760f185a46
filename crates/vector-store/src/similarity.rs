use crate::error::{Result, VectorStoreError};

/// Cosine of the angle between `a` and `b`, in `[-1, 1]` up to rounding.
///
/// Fails on unequal lengths and when either side has zero norm or a
/// non-finite component. Sums run in `f64`, so tiny or huge but finite
/// components still score.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> Result<f32> {
    if a.len() != b.len() {
        return Err(VectorStoreError::DimensionMismatch {
            expected: a.len(),
            actual: b.len(),
        });
    }

    let norm_a = checked_norm(a)?;
    let norm_b = checked_norm(b)?;
    Ok(cosine_from_parts(dot(a, b), norm_a, norm_b))
}

/// Euclidean norm, rejecting zero and non-finite results
pub(crate) fn checked_norm(v: &[f32]) -> Result<f64> {
    let norm = dot(v, v).sqrt();
    if norm == 0.0 || !norm.is_finite() {
        return Err(VectorStoreError::DegenerateVector);
    }
    Ok(norm)
}

pub(crate) fn dot(a: &[f32], b: &[f32]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| f64::from(*x) * f64::from(*y))
        .sum()
}

/// Cosine from a precomputed dot product and norms, narrowed to `f32`
pub(crate) fn cosine_from_parts(dot: f64, norm_a: f64, norm_b: f64) -> f32 {
    (dot / norm_a / norm_b) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn self_similarity_is_one() {
        for v in [vec![1.0, 0.0, 0.0], vec![0.3, -2.0, 7.5], vec![1e-3, 1e-3]] {
            let s = cosine_similarity(&v, &v).unwrap();
            assert!((s - 1.0).abs() < 1e-6, "{v:?} -> {s}");
        }
    }

    #[test]
    fn similarity_is_symmetric_and_bounded() {
        let a = [0.2, 0.9, -0.4];
        let b = [-0.7, 0.1, 0.5];
        let ab = cosine_similarity(&a, &b).unwrap();
        let ba = cosine_similarity(&b, &a).unwrap();
        assert!((ab - ba).abs() < 1e-6);
        assert!((-1.0 - 1e-6..=1.0 + 1e-6).contains(&ab));

        let opposite = cosine_similarity(&[1.0, 2.0], &[-1.0, -2.0]).unwrap();
        assert!((opposite + 1.0).abs() < 1e-6);
        let orthogonal = cosine_similarity(&[1.0, 0.0], &[0.0, 3.0]).unwrap();
        assert!(orthogonal.abs() < 1e-6);
    }

    #[test]
    fn unequal_lengths_are_rejected() {
        let err = cosine_similarity(&[1.0, 0.0], &[1.0, 0.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            VectorStoreError::DimensionMismatch {
                expected: 2,
                actual: 3
            }
        ));
    }

    #[test]
    fn tiny_and_huge_components_still_score() {
        for v in [vec![1e-23, 0.0], vec![1e20, 1e20], vec![f32::MAX, -f32::MAX]] {
            let s = cosine_similarity(&v, &v).unwrap();
            assert!((s - 1.0).abs() < 1e-6, "{v:?} -> {s}");
        }
        let s = cosine_similarity(&[1e-23, 0.0], &[0.0, 1e20]).unwrap();
        assert!(s.abs() < 1e-6);
    }

    #[test]
    fn zero_vectors_are_degenerate() {
        let err = cosine_similarity(&[0.0, 0.0], &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, VectorStoreError::DegenerateVector));
        let err = cosine_similarity(&[1.0, 0.0], &[0.0, 0.0]).unwrap_err();
        assert!(matches!(err, VectorStoreError::DegenerateVector));
        let err = cosine_similarity(&[f32::NAN, 1.0], &[1.0, 0.0]).unwrap_err();
        assert!(matches!(err, VectorStoreError::DegenerateVector));
    }
}
