//! Example pools that learned examples are registered into.

use std::sync::{PoisonError, RwLock};

use colmap_model::Example;

use crate::error::Result;

/// Destination for learned few-shot examples.
pub trait ExamplePool: Send + Sync {
    fn register(&self, example: Example) -> Result<()>;
}

/// Examples held in memory, readable by prompt builders.
#[derive(Debug, Default)]
pub struct InMemoryExamplePool {
    examples: RwLock<Vec<Example>>,
}

impl InMemoryExamplePool {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the registered examples in registration order.
    pub fn examples(&self) -> Vec<Example> {
        self.examples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Examples for one operation and schema type.
    pub fn find(&self, operation: &str, schema_type: &str) -> Vec<Example> {
        self.examples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|e| e.operation == operation && e.schema_type == schema_type)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.examples
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ExamplePool for InMemoryExamplePool {
    fn register(&self, example: Example) -> Result<()> {
        self.examples
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(example);
        Ok(())
    }
}
