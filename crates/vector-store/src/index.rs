use crate::error::{Result, VectorStoreError};
use crate::similarity::{checked_norm, cosine_from_parts, dot};

/// Exact nearest-neighbour index: every query scans every vector.
///
/// Norms are computed once on insert so a query costs one dot product per row.
#[derive(Debug, Default)]
pub struct FlatIndex {
    dimension: Option<usize>,
    vectors: Vec<Vec<f32>>,
    norms: Vec<f64>,
}

impl FlatIndex {
    /// Dimension fixed by the first inserted vector
    pub const fn dimension(&self) -> Option<usize> {
        self.dimension
    }

    /// Check a vector against the index without inserting it; returns its norm
    pub fn check(&self, vector: &[f32]) -> Result<f64> {
        if let Some(expected) = self.dimension {
            if vector.len() != expected {
                return Err(VectorStoreError::DimensionMismatch {
                    expected,
                    actual: vector.len(),
                });
            }
        }
        checked_norm(vector)
    }

    /// Append a vector previously accepted by [`FlatIndex::check`]
    pub fn push(&mut self, vector: Vec<f32>, norm: f64) {
        self.dimension.get_or_insert(vector.len());
        self.vectors.push(vector);
        self.norms.push(norm);
    }

    /// Top `k` positions by cosine similarity, best first.
    /// Equal scores keep insertion order.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<(usize, f32)>> {
        if k == 0 {
            return Err(VectorStoreError::InvalidK);
        }
        if self.vectors.is_empty() {
            return Ok(Vec::new());
        }
        let query_norm = self.check(query)?;

        let mut scores: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .zip(&self.norms)
            .enumerate()
            .map(|(position, (vector, norm))| {
                (position, cosine_from_parts(dot(query, vector), query_norm, *norm))
            })
            .collect();

        scores.sort_by(|a, b| b.1.total_cmp(&a.1));
        scores.truncate(k);
        Ok(scores)
    }

    pub fn vector(&self, position: usize) -> Option<&[f32]> {
        self.vectors.get(position).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.vectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vectors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_of(rows: &[&[f32]]) -> FlatIndex {
        let mut index = FlatIndex::default();
        for row in rows {
            let norm = index.check(row).unwrap();
            index.push(row.to_vec(), norm);
        }
        index
    }

    #[test]
    fn test_add_and_search() {
        let index = index_of(&[&[1.0, 0.0, 0.0], &[0.9, 0.1, 0.0], &[0.0, 1.0, 0.0]]);
        assert_eq!(index.len(), 3);

        let results = index.search(&[1.0, 0.0, 0.0], 2).unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].0, 0);
        assert!((results[0].1 - 1.0).abs() < 1e-6);
        assert_eq!(results[1].0, 1);
        assert!(results[1].1 > 0.9);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let index = index_of(&[&[0.0, 1.0], &[2.0, 0.0], &[1.0, 0.0], &[5.0, 0.0]]);
        let results = index.search(&[1.0, 0.0], 4).unwrap();
        let positions: Vec<usize> = results.iter().map(|(p, _)| *p).collect();
        assert_eq!(positions, vec![1, 2, 3, 0]);
    }

    #[test]
    fn test_dimension_mismatch() {
        let mut index = index_of(&[&[1.0, 0.0, 0.0]]);
        assert!(matches!(
            index.check(&[1.0, 0.0]),
            Err(VectorStoreError::DimensionMismatch { expected: 3, actual: 2 })
        ));
        assert!(index.search(&[1.0, 0.0], 1).is_err());

        index.push(vec![0.0, 0.0, 2.0], 2.0);
        assert_eq!(index.dimension(), Some(3));
    }

    #[test]
    fn test_empty_index_and_invalid_k() {
        let index = FlatIndex::default();
        assert!(index.search(&[1.0], 3).unwrap().is_empty());
        assert!(matches!(index.search(&[1.0], 0), Err(VectorStoreError::InvalidK)));
    }
}
