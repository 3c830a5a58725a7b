// src/registry.rs

//! Shared store of task outputs for one run.
//!
//! Every task identity is written at most once per run (graph uniqueness
//! guarantees a single writer per key). Dependents read their upstream
//! outputs from here after the executor has seen those dependencies finish.
//!
//! Nested runs use [`TaskRegistry::scoped`]: reads fall through to the parent,
//! writes stay local until [`TaskRegistry::merge_into_parent`] is called.

use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

use crate::dag::TaskName;
use crate::errors::RegistryError;

/// Value produced by a task.
pub type TaskValue = serde_json::Value;

#[derive(Debug, Default)]
struct RegistryInner {
    entries: RwLock<HashMap<TaskName, TaskValue>>,
    parent: Option<TaskRegistry>,
}

/// Cheaply cloneable handle; clones share the same storage.
#[derive(Debug, Clone, Default)]
pub struct TaskRegistry {
    inner: Arc<RegistryInner>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Output of `name`, looking through parent scopes.
    pub fn get(&self, name: &str) -> Result<TaskValue, RegistryError> {
        let local = self
            .inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
            .cloned();

        match (local, &self.inner.parent) {
            (Some(value), _) => Ok(value),
            (None, Some(parent)) => parent.get(name),
            (None, None) => Err(RegistryError::NotFound(name.to_string())),
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    /// Record the output of `name` in this scope.
    ///
    /// A second write for the same name in the same scope is rejected. A
    /// scoped registry may shadow a value held by its parent.
    pub fn set(&self, name: impl Into<TaskName>, value: TaskValue) -> Result<(), RegistryError> {
        let name = name.into();
        let mut entries = self
            .inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);

        if entries.contains_key(&name) {
            return Err(RegistryError::AlreadyWritten(name));
        }

        debug!(task = %name, "registry: output recorded");
        entries.insert(name, value);
        Ok(())
    }

    /// Fresh child scope for a nested run.
    pub fn scoped(&self) -> TaskRegistry {
        TaskRegistry {
            inner: Arc::new(RegistryInner {
                entries: RwLock::new(HashMap::new()),
                parent: Some(self.clone()),
            }),
        }
    }

    pub fn parent(&self) -> Option<&TaskRegistry> {
        self.inner.parent.as_ref()
    }

    /// Move this scope's entries into the parent scope, replacing any values
    /// the parent already held for the same names.
    ///
    /// Returns the number of merged entries (zero for a root registry).
    pub fn merge_into_parent(&self) -> usize {
        let Some(parent) = &self.inner.parent else {
            return 0;
        };

        let drained: Vec<(TaskName, TaskValue)> = self
            .inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .drain()
            .collect();

        let count = drained.len();
        let mut target = parent
            .inner
            .entries
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        target.extend(drained);

        debug!(count, "registry: merged scoped outputs into parent");
        count
    }

    /// Number of entries in this scope (parents excluded).
    pub fn len(&self) -> usize {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sorted copy of this scope's entries (parents excluded).
    pub fn snapshot(&self) -> BTreeMap<TaskName, TaskValue> {
        self.inner
            .entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}
