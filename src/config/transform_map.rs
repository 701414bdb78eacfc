use std::collections::HashMap;
use std::sync::Arc;

use crate::traits::transform::Transform;

/// Newtype wrapper for the transform registry providing type safety
#[derive(Clone, Default)]
pub struct TransformMap(pub HashMap<String, Arc<dyn Transform>>);

impl TransformMap {
    /// Create a new empty transform map
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    /// Insert a transform into the map
    pub fn insert(&mut self, id: String, transform: Arc<dyn Transform>) {
        self.0.insert(id, transform);
    }

    /// Get a transform by ID
    pub fn get(&self, id: &str) -> Option<&Arc<dyn Transform>> {
        self.0.get(id)
    }

    /// Check if a transform exists
    pub fn contains_key(&self, id: &str) -> bool {
        self.0.contains_key(id)
    }

    /// Get all transform IDs
    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.0.keys()
    }
}

impl std::fmt::Debug for TransformMap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransformMap")
            .field("transform_count", &self.0.len())
            .field("transform_ids", &self.0.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl From<HashMap<String, Arc<dyn Transform>>> for TransformMap {
    fn from(map: HashMap<String, Arc<dyn Transform>>) -> Self {
        Self(map)
    }
}
