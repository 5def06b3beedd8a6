//! Execution units, batches, and plans.

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use serde::Serialize;

use crate::root::Root;
use crate::scope::CompiledScope;

/// Directory (under a root's directory) that built units are written to.
pub const BUILD_DIR: &str = ".stratum";

/// Identity of an execution unit: root name plus scope address.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct UnitKey {
    pub root: String,
    pub address: String,
}

impl fmt::Display for UnitKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.root, self.address)
    }
}

/// One root applied at one compiled scope.
#[derive(Debug, Clone)]
pub struct ExecutionUnit {
    root: Arc<Root>,
    scope: Arc<CompiledScope>,
}

impl ExecutionUnit {
    pub fn new(root: Arc<Root>, scope: Arc<CompiledScope>) -> Self {
        Self { root, scope }
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn scope(&self) -> &CompiledScope {
        &self.scope
    }

    pub fn key(&self) -> UnitKey {
        UnitKey {
            root: self.root.name().to_string(),
            address: self.scope.address(),
        }
    }

    /// Where this unit is built: `<root dir>/.stratum/<value>/<value>/...`.
    ///
    /// Scope values never contain separators, so distinct scopes of one root
    /// never share a destination.
    pub fn destination(&self) -> PathBuf {
        let mut path = self.root.dir().join(BUILD_DIR);
        path.extend(self.scope.scope_values());
        path
    }
}

impl PartialEq for ExecutionUnit {
    fn eq(&self, other: &Self) -> bool {
        self.root.name() == other.root.name() && self.scope.address() == other.scope.address()
    }
}

impl Eq for ExecutionUnit {}

impl fmt::Display for ExecutionUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.root.name(), self.scope.address())
    }
}

/// Units that can run concurrently: none depends on another.
pub type Batch = Vec<ExecutionUnit>;

/// Batches in execution order. Every unit's dependencies are in strictly
/// earlier batches; the requested units are in the last batch.
#[derive(Debug, Clone, Default)]
pub struct Plan {
    batches: Vec<Batch>,
}

impl Plan {
    pub fn new(batches: Vec<Batch>) -> Self {
        Self { batches }
    }

    pub fn batches(&self) -> &[Batch] {
        &self.batches
    }

    pub fn len(&self) -> usize {
        self.batches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    pub fn unit_count(&self) -> usize {
        self.batches.iter().map(Vec::len).sum()
    }

    pub fn units(&self) -> impl Iterator<Item = &ExecutionUnit> {
        self.batches.iter().flatten()
    }

    /// Index of the batch holding the unit with the given key.
    pub fn batch_of(&self, key: &UnitKey) -> Option<usize> {
        self.batches
            .iter()
            .position(|batch| batch.iter().any(|unit| &unit.key() == key))
    }

    /// Unit keys per batch.
    pub fn keys(&self) -> Vec<Vec<UnitKey>> {
        self.batches
            .iter()
            .map(|batch| batch.iter().map(ExecutionUnit::key).collect())
            .collect()
    }
}
