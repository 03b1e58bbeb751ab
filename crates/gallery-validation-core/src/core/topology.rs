// crates/gallery-validation-core/src/core/topology.rs
// ============================================================================
// Module: Validation Step Topology
// Description: Topological ordering, cycle detection, and processor ordering.
// Purpose: Prove a declared step graph admits a legal execution order.
// Dependencies: crate::core::{identifiers, pipeline}
// ============================================================================

//! ## Overview
//! Steps form a graph where each edge points from a prerequisite to the step
//! that requires it. [`TopologicalSort::order`] produces a deterministic
//! execution order (declaration order breaks ties) or reports a cycle.
//! [`TopologicalSort::validate`] additionally requires every pair of
//! processors to be ordered relative to each other, because two processors
//! mutating the same artifact on parallel branches would race.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeSet;
use std::collections::VecDeque;

use thiserror::Error;

use crate::core::identifiers::ValidatorName;
use crate::core::pipeline::ValidationConfigurationItem;

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Topology violations for one step list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TopologyError {
    /// A step requires a name that is not declared.
    #[error("step {step} requires unknown step {prerequisite}")]
    UnknownPrerequisite {
        /// Requiring step.
        step: ValidatorName,
        /// Missing prerequisite.
        prerequisite: ValidatorName,
    },
    /// The graph contains a cycle (first name repeated at the end).
    #[error("dependency cycle: {}", format_path(.0))]
    Cycle(Vec<ValidatorName>),
    /// Processor pairs with no ordering between them.
    #[error("processors may run in parallel: {}", format_pairs(.0))]
    ParallelProcessors(Vec<(ValidatorName, ValidatorName)>),
}

/// Renders a cycle path as `a -> b -> a`.
fn format_path(path: &[ValidatorName]) -> String {
    path.iter().map(ValidatorName::as_str).collect::<Vec<_>>().join(" -> ")
}

/// Renders processor pairs as `a/b, c/d`.
fn format_pairs(pairs: &[(ValidatorName, ValidatorName)]) -> String {
    pairs.iter().map(|(left, right)| format!("{left}/{right}")).collect::<Vec<_>>().join(", ")
}

// ============================================================================
// SECTION: Graph
// ============================================================================

/// Index-based view of a step list.
struct StepGraph<'a> {
    /// Steps in declaration order.
    steps: &'a [ValidationConfigurationItem],
    /// Prerequisite indices per step.
    prerequisites: Vec<Vec<usize>>,
}

impl<'a> StepGraph<'a> {
    /// Resolves prerequisite names to indices.
    fn build(steps: &'a [ValidationConfigurationItem]) -> Result<Self, TopologyError> {
        let mut prerequisites = Vec::with_capacity(steps.len());
        for step in steps {
            let mut resolved = Vec::with_capacity(step.required_validations.len());
            for required in &step.required_validations {
                let Some(index) = steps.iter().position(|candidate| &candidate.name == required)
                else {
                    return Err(TopologyError::UnknownPrerequisite {
                        step: step.name.clone(),
                        prerequisite: required.clone(),
                    });
                };
                if !resolved.contains(&index) {
                    resolved.push(index);
                }
            }
            prerequisites.push(resolved);
        }
        Ok(Self {
            steps,
            prerequisites,
        })
    }

    /// Kahn's algorithm with declaration-order tie breaking.
    fn order(&self) -> Result<Vec<usize>, TopologyError> {
        let count = self.steps.len();
        let mut remaining: Vec<usize> = self.prerequisites.iter().map(Vec::len).collect();
        let mut ready: VecDeque<usize> = (0 .. count).filter(|&i| remaining[i] == 0).collect();
        let mut order = Vec::with_capacity(count);
        while let Some(next) = ready.pop_front() {
            order.push(next);
            let mut unlocked = Vec::new();
            for (index, prereqs) in self.prerequisites.iter().enumerate() {
                if prereqs.contains(&next) {
                    remaining[index] -= 1;
                    if remaining[index] == 0 {
                        unlocked.push(index);
                    }
                }
            }
            ready.extend(unlocked);
            let mut sorted: Vec<usize> = ready.drain(..).collect();
            sorted.sort_unstable();
            ready.extend(sorted);
        }
        if order.len() == count {
            return Ok(order);
        }
        let stuck: Vec<usize> = (0 .. count).filter(|index| !order.contains(index)).collect();
        Err(TopologyError::Cycle(self.find_cycle(&stuck)))
    }

    /// Walks prerequisite edges from stuck nodes until a node repeats.
    fn find_cycle(&self, stuck: &[usize]) -> Vec<ValidatorName> {
        let Some(&start) = stuck.first() else {
            return Vec::new();
        };
        let mut path = vec![start];
        let mut current = start;
        loop {
            let Some(&next) =
                self.prerequisites[current].iter().find(|candidate| stuck.contains(candidate))
            else {
                break;
            };
            if let Some(position) = path.iter().position(|&seen| seen == next) {
                let mut cycle: Vec<usize> = path[position ..].to_vec();
                cycle.reverse();
                let lowest = (0 .. cycle.len()).min_by_key(|&i| cycle[i]).unwrap_or(0);
                cycle.rotate_left(lowest);
                if let Some(&first) = cycle.first() {
                    cycle.push(first);
                }
                return cycle.into_iter().map(|index| self.steps[index].name.clone()).collect();
            }
            path.push(next);
            current = next;
        }
        path.into_iter().map(|index| self.steps[index].name.clone()).collect()
    }

    /// Transitive prerequisites of every step (cycle-safe).
    fn ancestors(&self) -> Vec<BTreeSet<usize>> {
        (0 .. self.steps.len())
            .map(|root| {
                let mut seen = BTreeSet::new();
                let mut stack: Vec<usize> = self.prerequisites[root].clone();
                while let Some(node) = stack.pop() {
                    if seen.insert(node) {
                        stack.extend(self.prerequisites[node].iter().copied());
                    }
                }
                seen
            })
            .collect()
    }
}

// ============================================================================
// SECTION: Public API
// ============================================================================

/// Topological ordering and validation for validation step lists.
pub struct TopologicalSort;

impl TopologicalSort {
    /// Returns step names in a legal execution order.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError`] when a prerequisite is unknown or a cycle exists.
    pub fn order(steps: &[ValidationConfigurationItem]) -> Result<Vec<ValidatorName>, TopologyError> {
        let graph = StepGraph::build(steps)?;
        let order = graph.order()?;
        Ok(order.into_iter().map(|index| steps[index].name.clone()).collect())
    }

    /// Validates acyclicity and that every processor pair is ordered.
    ///
    /// Returns the execution order on success.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError`] on unknown prerequisites, cycles, or
    /// processors that could run in parallel.
    pub fn validate(
        steps: &[ValidationConfigurationItem],
        is_processor: impl Fn(&ValidatorName) -> bool,
    ) -> Result<Vec<ValidatorName>, TopologyError> {
        let graph = StepGraph::build(steps)?;
        let order = graph.order()?;
        let ancestors = graph.ancestors();
        let processors: Vec<usize> =
            (0 .. steps.len()).filter(|&index| is_processor(&steps[index].name)).collect();
        let mut parallel = Vec::new();
        for (offset, &left) in processors.iter().enumerate() {
            for &right in &processors[offset + 1 ..] {
                let ordered = ancestors[left].contains(&right) || ancestors[right].contains(&left);
                if !ordered {
                    parallel.push((steps[left].name.clone(), steps[right].name.clone()));
                }
            }
        }
        if !parallel.is_empty() {
            return Err(TopologyError::ParallelProcessors(parallel));
        }
        Ok(order.into_iter().map(|index| steps[index].name.clone()).collect())
    }

    /// Returns the transitive prerequisites of `step`.
    ///
    /// # Errors
    ///
    /// Returns [`TopologyError::UnknownPrerequisite`] for unresolved names.
    pub fn prerequisites_of(
        steps: &[ValidationConfigurationItem],
        step: &ValidatorName,
    ) -> Result<Vec<ValidatorName>, TopologyError> {
        let graph = StepGraph::build(steps)?;
        let Some(root) = steps.iter().position(|candidate| &candidate.name == step) else {
            return Ok(Vec::new());
        };
        let ancestors = graph.ancestors();
        Ok(ancestors[root].iter().map(|&index| steps[index].name.clone()).collect())
    }
}
