//! Milestone dependency graph checks.

use std::collections::{BTreeMap, BTreeSet};

use opsdesk_types::MilestoneId;

/// Errors from validating a milestone's dependency list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum GraphError {
    /// The milestone lists itself.
    #[error("A milestone cannot depend on itself")]
    SelfDependency,

    /// Following the dependency leads back to the milestone.
    #[error("Dependency on milestone {via} would create a circular dependency")]
    Cycle {
        /// The listed dependency that closes the loop.
        via: MilestoneId,
    },
}

/// Check that giving `milestone` the `dependencies` keeps the graph acyclic.
///
/// `edges` holds the current dependency lists of the other milestones in
/// the project; any entry for `milestone` itself is ignored in favour of
/// `dependencies`.
pub fn validate_dependencies(
    milestone: MilestoneId,
    dependencies: &[MilestoneId],
    edges: &BTreeMap<MilestoneId, Vec<MilestoneId>>,
) -> Result<(), GraphError> {
    if dependencies.contains(&milestone) {
        return Err(GraphError::SelfDependency);
    }

    for &start in dependencies {
        let mut visited = BTreeSet::new();
        let mut stack = vec![start];
        while let Some(current) = stack.pop() {
            if current == milestone {
                return Err(GraphError::Cycle { via: start });
            }
            if !visited.insert(current) {
                continue;
            }
            if let Some(next) = edges.get(&current) {
                stack.extend(next.iter().copied());
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn independent_dependencies_are_accepted() {
        let (a, b, c) = (MilestoneId::new(), MilestoneId::new(), MilestoneId::new());
        let edges = BTreeMap::from([(b, vec![c]), (c, Vec::new())]);
        assert_eq!(validate_dependencies(a, &[b, c], &edges), Ok(()));
    }

    #[test]
    fn self_dependency_is_rejected() {
        let a = MilestoneId::new();
        assert_eq!(
            validate_dependencies(a, &[a], &BTreeMap::new()),
            Err(GraphError::SelfDependency)
        );
    }

    #[test]
    fn indirect_cycle_is_rejected() {
        let (a, b, c) = (MilestoneId::new(), MilestoneId::new(), MilestoneId::new());
        // c -> b -> a already; making a depend on c closes the loop.
        let edges = BTreeMap::from([(b, vec![a]), (c, vec![b])]);
        assert_eq!(
            validate_dependencies(a, &[c], &edges),
            Err(GraphError::Cycle { via: c })
        );
    }

    #[test]
    fn diamond_is_not_a_cycle() {
        let (a, b, c, d) = (
            MilestoneId::new(),
            MilestoneId::new(),
            MilestoneId::new(),
            MilestoneId::new(),
        );
        let edges = BTreeMap::from([(b, vec![d]), (c, vec![d]), (d, Vec::new())]);
        assert_eq!(validate_dependencies(a, &[b, c], &edges), Ok(()));
    }
}
