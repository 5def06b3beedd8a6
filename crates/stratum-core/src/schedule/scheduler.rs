//! Dependency batch scheduling.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::Arc;

use tracing::debug;

use super::policy::ChainPolicy;
use super::unit::{Batch, ExecutionUnit, Plan, UnitKey};
use crate::error::StratumError;
use crate::root::Root;
use crate::scope::ScopeMatcher;

/// Every root in a project, by name.
pub type Roots = BTreeMap<String, Arc<Root>>;

/// Reject the project if any root's dependencies form a cycle, or name a
/// root that doesn't exist.
///
/// The whole project is checked, not just what is reachable from one root.
pub fn assert_acyclic(roots: &Roots) -> Result<(), StratumError> {
    let mut visited = HashSet::new();
    for name in roots.keys() {
        if visited.contains(name.as_str()) {
            continue;
        }
        let mut stack = Vec::new();
        visit(roots, name, &mut visited, &mut stack)?;
    }
    Ok(())
}

// Depth-first search; `stack` holds the roots currently being visited.
fn visit<'a>(
    roots: &'a Roots,
    name: &'a str,
    visited: &mut HashSet<&'a str>,
    stack: &mut Vec<&'a str>,
) -> Result<(), StratumError> {
    visited.insert(name);
    stack.push(name);

    let Some(root) = roots.get(name) else {
        stack.pop();
        return Ok(());
    };
    for dependency in root.dependencies() {
        let dep_name = dependency.root.as_str();
        if !roots.contains_key(dep_name) {
            return Err(StratumError::UnknownDependency {
                root: name.to_string(),
                dependency: dep_name.to_string(),
            });
        }
        if let Some(pos) = stack.iter().position(|n| *n == dep_name) {
            let mut path: Vec<String> = stack[pos..].iter().map(|n| n.to_string()).collect();
            path.push(dep_name.to_string());
            return Err(StratumError::CyclicDependency {
                root: dep_name.to_string(),
                path,
            });
        }
        if !visited.contains(dep_name) {
            visit(roots, dep_name, visited, stack)?;
        }
    }

    stack.pop();
    Ok(())
}

/// Expands a request across root dependencies into ordered batches.
#[derive(Debug, Clone, Copy)]
pub struct DependencyScheduler<'a> {
    roots: &'a Roots,
    matcher: ScopeMatcher<'a>,
}

impl<'a> DependencyScheduler<'a> {
    pub fn new(roots: &'a Roots, matcher: ScopeMatcher<'a>) -> Self {
        Self { roots, matcher }
    }

    /// Plan a request for `root` at the scopes selected by `addresses`.
    ///
    /// Units are assigned a depth: requested units are 0, and a dependency
    /// sits one deeper than the deepest unit that needs it. Units of depth
    /// `k` land in batch `max_depth - k`, so dependencies always run first.
    pub fn prepare_batches<S: AsRef<str>>(
        &self,
        root: &Arc<Root>,
        addresses: &[S],
        policy: ChainPolicy,
    ) -> Result<Plan, StratumError> {
        assert_acyclic(self.roots)?;

        let seeds: Batch = self
            .matcher
            .determine_matching_scopes(root, addresses)?
            .into_iter()
            .map(|scope| ExecutionUnit::new(Arc::clone(root), scope))
            .collect();
        debug!(root = root.name(), units = seeds.len(), %policy, "seeded plan");

        if policy == ChainPolicy::None {
            return Ok(Plan::new(vec![seeds]));
        }

        let mut depths: BTreeMap<UnitKey, (ExecutionUnit, usize)> = BTreeMap::new();
        let mut queue = VecDeque::new();
        for unit in seeds {
            depths.insert(unit.key(), (unit.clone(), 0));
            queue.push_back(unit.key());
        }

        let mut max_depth = 0;
        while let Some(key) = queue.pop_front() {
            let Some((unit, depth)) = depths.get(&key).cloned() else {
                continue;
            };

            for dependency in unit.root().dependencies() {
                let ancestor = self.roots.get(&dependency.root).ok_or_else(|| {
                    StratumError::UnknownDependency {
                        root: unit.root().name().to_string(),
                        dependency: dependency.root.clone(),
                    }
                })?;
                let scope = self.matcher.resolve_dependency_scope(
                    unit.root().name(),
                    ancestor,
                    unit.scope(),
                    &dependency.scopes,
                )?;
                let found = ExecutionUnit::new(Arc::clone(ancestor), scope);
                let found_key = found.key();
                let next = depth + 1;

                // the same unit may be reachable by several paths; it must
                // sit below the deepest one
                let deepened = match depths.get_mut(&found_key) {
                    Some((_, existing)) if *existing >= next => false,
                    Some((_, existing)) => {
                        *existing = next;
                        true
                    }
                    None => {
                        depths.insert(found_key.clone(), (found, next));
                        true
                    }
                };
                max_depth = max_depth.max(next);
                debug!(unit = %key, dependency = %found_key, depth = next, "dependency discovered");

                if deepened && policy == ChainPolicy::Transitive {
                    queue.push_back(found_key);
                }
            }
        }

        let mut batches: Vec<Batch> = vec![Vec::new(); max_depth + 1];
        for (unit, depth) in depths.into_values() {
            batches[max_depth - depth].push(unit);
        }
        debug!(batches = batches.len(), "plan ready");
        Ok(Plan::new(batches))
    }
}
