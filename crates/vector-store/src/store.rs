use crate::error::{Result, VectorStoreError};
use crate::index::FlatIndex;
use crate::types::{ContentUnit, EmbeddingVector, IndexedEntry, RetrievalResult};
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Ordered, append-only, in-memory store of embedded content.
///
/// All entries share one embedding model and one dimension. Writers take the
/// lock exclusively, so an `add` is never observed half-applied by a `query`.
#[derive(Debug, Default)]
pub struct VectorStore {
    state: RwLock<StoreState>,
}

#[derive(Debug, Default)]
struct StoreState {
    model: Option<String>,
    units: Vec<ContentUnit>,
    index: FlatIndex,
}

impl VectorStore {
    /// Empty store; the embedding model is fixed by the first added entry
    pub fn new() -> Self {
        Self::default()
    }

    /// Empty store that only accepts vectors from `model_id`
    pub fn for_model(model_id: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(StoreState {
                model: Some(model_id.into()),
                ..StoreState::default()
            }),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, StoreState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, StoreState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Append entries in order. The whole batch is validated first, so on
    /// error the store is left untouched.
    pub fn add(&self, entries: Vec<IndexedEntry>) -> Result<()> {
        if entries.is_empty() {
            return Ok(());
        }

        let mut state = self.write();

        let mut model = state.model.clone();
        let mut dimension = state.index.dimension();
        let mut norms = Vec::with_capacity(entries.len());
        for entry in &entries {
            let vector = &entry.vector;
            match &model {
                Some(expected) if expected != vector.model() => {
                    return Err(VectorStoreError::ModelMismatch {
                        expected: expected.clone(),
                        actual: vector.model().to_string(),
                    });
                }
                Some(_) => {}
                None => model = Some(vector.model().to_string()),
            }
            match dimension {
                Some(expected) if expected != vector.dimension() => {
                    return Err(VectorStoreError::DimensionMismatch {
                        expected,
                        actual: vector.dimension(),
                    });
                }
                Some(_) => {}
                None => dimension = Some(vector.dimension()),
            }
            norms.push(state.index.check(vector.values())?);
        }

        let added = entries.len();
        state.model = model;
        for (entry, norm) in entries.into_iter().zip(norms) {
            let IndexedEntry { unit, vector } = entry;
            state.index.push(vector.values().to_vec(), norm);
            state.units.push(unit);
        }

        log::debug!("Added {added} entries. Total: {}", state.units.len());
        Ok(())
    }

    /// Exact top-`k` by cosine similarity, best first; ties keep insertion order
    pub fn query(&self, vector: &EmbeddingVector, k: usize) -> Result<Vec<RetrievalResult>> {
        if k == 0 {
            return Err(VectorStoreError::InvalidK);
        }

        let state = self.read();
        if let Some(expected) = &state.model {
            if expected != vector.model() {
                return Err(VectorStoreError::ModelMismatch {
                    expected: expected.clone(),
                    actual: vector.model().to_string(),
                });
            }
        }

        let hits = state.index.search(vector.values(), k)?;
        let results = hits
            .into_iter()
            .filter_map(|(position, score)| {
                state.units.get(position).map(|unit| RetrievalResult {
                    unit: unit.clone(),
                    score,
                    position,
                })
            })
            .collect::<Vec<_>>();

        log::debug!(
            "Query over {} entries returned {} results",
            state.units.len(),
            results.len()
        );
        Ok(results)
    }

    pub fn len(&self) -> usize {
        self.read().index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().index.is_empty()
    }

    pub fn dimension(&self) -> Option<usize> {
        self.read().index.dimension()
    }

    pub fn model_id(&self) -> Option<String> {
        self.read().model.clone()
    }

    /// Snapshot of every entry in insertion order
    pub fn entries(&self) -> Vec<IndexedEntry> {
        let state = self.read();
        let Some(model) = state.model.as_deref() else {
            return Vec::new();
        };
        state
            .units
            .iter()
            .enumerate()
            .filter_map(|(position, unit)| {
                state.index.vector(position).map(|values| {
                    IndexedEntry::new(unit.clone(), EmbeddingVector::new(values.to_vec(), model))
                })
            })
            .collect()
    }
}
