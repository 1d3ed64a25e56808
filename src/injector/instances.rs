use crate::injector::Instance;
use std::any::Any;
use std::collections::HashMap;
use std::sync::Arc;

/// Name-keyed instances in insertion order.
///
/// Re-inserting an existing name overwrites the value but keeps its position.
#[derive(Clone, Default)]
pub struct NamedInstances {
    index: HashMap<String, usize>,
    entries: Vec<(String, Instance)>,
}

/// Snapshot of the injected modules.
pub type InjectedModules = NamedInstances;

/// Snapshot of the injected middlewares.
pub type InjectedMiddlewares = NamedInstances;

impl NamedInstances {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite, returning the previous value if any.
    pub fn insert(&mut self, name: impl Into<String>, instance: Instance) -> Option<Instance> {
        let name = name.into();
        match self.index.get(&name) {
            Some(&pos) => Some(std::mem::replace(&mut self.entries[pos].1, instance)),
            None => {
                self.index.insert(name.clone(), self.entries.len());
                self.entries.push((name, instance));
                None
            }
        }
    }

    pub fn get(&self, name: &str) -> Option<&Instance> {
        self.index.get(name).map(|&pos| &self.entries[pos].1)
    }

    /// Look up and downcast in one step.
    pub fn get_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        self.get(name)?.clone().downcast::<T>().ok()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Instance)> {
        self.entries.iter().map(|(n, i)| (n.as_str(), i))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn clear(&mut self) {
        self.index.clear();
        self.entries.clear();
    }
}

impl std::fmt::Debug for NamedInstances {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}
