//! Named coordinate and attribute maps.

use std::collections::BTreeMap;

use crate::dim::Dim;
use crate::error::ArrayError;
use crate::variable::Variable;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Coords {
    entries: BTreeMap<Dim, Variable>,
}

impl Coords {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, dim: &Dim) -> Option<&Variable> {
        self.entries.get(dim)
    }

    pub fn get_mut(&mut self, dim: &Dim) -> Option<&mut Variable> {
        self.entries.get_mut(dim)
    }

    pub fn require(&self, dim: &Dim) -> Result<&Variable, ArrayError> {
        self.get(dim).ok_or_else(|| ArrayError::NotFound(dim.clone()))
    }

    pub fn contains(&self, dim: &Dim) -> bool {
        self.entries.contains_key(dim)
    }

    pub fn insert(&mut self, dim: Dim, variable: Variable) -> Option<Variable> {
        self.entries.insert(dim, variable)
    }

    pub fn remove(&mut self, dim: &Dim) -> Option<Variable> {
        self.entries.remove(dim)
    }

    /// Remove and return an entry, failing if it is absent.
    pub fn extract(&mut self, dim: &Dim) -> Result<Variable, ArrayError> {
        self.remove(dim).ok_or_else(|| ArrayError::NotFound(dim.clone()))
    }

    pub fn iter(&self) -> impl Iterator<Item = (&Dim, &Variable)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &Dim> {
        self.entries.keys()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Rename a dimension in every entry and re-key the entry named after it.
    pub fn rename_dim(&mut self, from: &Dim, to: &Dim) {
        for variable in self.entries.values_mut() {
            variable.rename_dim(from, to);
        }
        if let Some(variable) = self.entries.remove(from) {
            self.entries.insert(to.clone(), variable);
        }
    }
}
