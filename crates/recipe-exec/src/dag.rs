//! Dependency-graph phase construction for `dependsOn` (spec §4.4), built
//! on the same Kahn's-algorithm reduction the host uses for TODO-item
//! dependency graphs.

use recipe_core::{EngineError, EngineResult, Step};
use std::collections::{HashMap, VecDeque};

/// Steps grouped into phases: every step in phase `n` depends only on
/// steps in phases `0..n`, and steps within a phase may run concurrently
/// (subject to `maxConcurrency` and each step's own `parallel` flag).
pub struct ExecutionPlan {
    pub phases: Vec<Vec<String>>,
}

/// Build the phase plan for `steps` (a recipe's top-level steps, or a
/// container step's nested steps), or report the cycle if `dependsOn`
/// edges don't reduce to a DAG. `dependsOn` is only resolved against names
/// within `steps` itself — a container's children are scheduled in their
/// own sub-plan, independent of siblings outside the container (spec §9
/// "container dependencies are authoritative").
pub fn build_plan(steps: &[Step]) -> EngineResult<ExecutionPlan> {
    let names: Vec<&str> = steps.iter().map(|s| s.name.as_str()).collect();
    let index_of: HashMap<&str, usize> = names.iter().enumerate().map(|(i, n)| (*n, i)).collect();

    let mut edges: Vec<Vec<usize>> = vec![Vec::new(); names.len()];
    let mut indegree: Vec<usize> = vec![0; names.len()];

    for (to_index, step) in steps.iter().enumerate() {
        for dep in &step.depends_on {
            let Some(&from_index) = index_of.get(dep.as_str()) else {
                return Err(EngineError::DependencyError {
                    step: step.name.clone(),
                    target: dep.clone(),
                });
            };
            edges[from_index].push(to_index);
            indegree[to_index] += 1;
        }
    }

    let mut phases = Vec::new();
    let mut remaining_indegree = indegree.clone();
    let mut frontier: VecDeque<usize> = remaining_indegree
        .iter()
        .enumerate()
        .filter_map(|(i, &d)| (d == 0).then_some(i))
        .collect();
    let mut visited = 0usize;

    while !frontier.is_empty() {
        let phase: Vec<usize> = frontier.drain(..).collect();
        visited += phase.len();
        let mut next_frontier = Vec::new();
        for &node in &phase {
            for &next in &edges[node] {
                remaining_indegree[next] -= 1;
                if remaining_indegree[next] == 0 {
                    next_frontier.push(next);
                }
            }
        }
        phases.push(phase.iter().map(|&i| names[i].to_string()).collect());
        frontier.extend(next_frontier);
    }

    if visited != names.len() {
        let cycle_nodes: Vec<String> = remaining_indegree
            .iter()
            .enumerate()
            .filter_map(|(i, &d)| (d > 0).then_some(names[i].to_string()))
            .collect();
        return Err(EngineError::CircularDependencyError(cycle_nodes));
    }

    Ok(ExecutionPlan { phases })
}

#[cfg(test)]
mod tests {
    use super::*;
    use recipe_core::StepPayload;
    use serde_json::Map;
    use std::collections::HashMap as Map2;

    fn shell_step(name: &str, depends_on: &[&str]) -> Step {
        Step {
            name: name.into(),
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            when: None,
            skip_if: None,
            timeout_ms: None,
            retries: None,
            continue_on_error: None,
            parallel: true,
            variable_overrides: Map::new(),
            output: Map2::new(),
            payload: StepPayload::Shell {
                command: "true".into(),
                cwd: None,
                env: Map2::new(),
            },
        }
    }

    #[test]
    fn independent_steps_land_in_a_single_phase() {
        let steps = vec![shell_step("a", &[]), shell_step("b", &[])];
        let plan = build_plan(&steps).unwrap();
        assert_eq!(plan.phases.len(), 1);
        assert_eq!(plan.phases[0].len(), 2);
    }

    #[test]
    fn chained_dependencies_produce_ordered_phases() {
        let steps = vec![
            shell_step("a", &[]),
            shell_step("b", &["a"]),
            shell_step("c", &["b"]),
        ];
        let plan = build_plan(&steps).unwrap();
        assert_eq!(plan.phases, vec![vec!["a"], vec!["b"], vec!["c"]]);
    }

    #[test]
    fn cycle_is_reported_with_offending_step_names() {
        let steps = vec![shell_step("a", &["b"]), shell_step("b", &["a"])];
        let err = build_plan(&steps).unwrap_err();
        match err {
            EngineError::CircularDependencyError(names) => {
                assert_eq!(names.len(), 2);
            }
            other => panic!("expected CircularDependencyError, got {other:?}"),
        }
    }

    #[test]
    fn unknown_dependency_target_is_a_dependency_error() {
        let steps = vec![shell_step("a", &["ghost"])];
        let err = build_plan(&steps).unwrap_err();
        assert!(matches!(err, EngineError::DependencyError { .. }));
    }

    use proptest::prelude::*;

    /// Build a step set from edges that only ever point from a lower index
    /// to a higher one — guaranteed acyclic, however the edges are chosen.
    fn acyclic_steps(edge_bits: &[bool], count: usize) -> Vec<Step> {
        let names: Vec<String> = (0..count).map(|i| format!("s{i}")).collect();
        let mut bit = edge_bits.iter();
        let mut depends_on: Vec<Vec<String>> = vec![Vec::new(); count];
        for to in 0..count {
            for from in 0..to {
                if *bit.next().unwrap_or(&false) {
                    depends_on[to].push(names[from].clone());
                }
            }
        }
        names
            .iter()
            .zip(depends_on)
            .map(|(name, deps)| {
                let mut step = shell_step(name, &[]);
                step.depends_on = deps;
                step
            })
            .collect()
    }

    proptest! {
        /// Any acyclic `dependsOn` graph reduces to a phase plan where every
        /// step's phase index is strictly greater than each of its
        /// dependencies' phase indices (spec §4.4/§9 Kahn's-algorithm
        /// property).
        #[test]
        fn acyclic_graphs_always_respect_phase_order(
            count in 1usize..8,
            bits in proptest::collection::vec(any::<bool>(), 0..28),
        ) {
            let steps = acyclic_steps(&bits, count);
            let plan = build_plan(&steps).expect("acyclic graph must produce a plan");

            let phase_of: HashMap<&str, usize> = plan
                .phases
                .iter()
                .enumerate()
                .flat_map(|(i, names)| names.iter().map(move |n| (n.as_str(), i)))
                .collect();

            for step in &steps {
                let step_phase = phase_of[step.name.as_str()];
                for dep in &step.depends_on {
                    prop_assert!(phase_of[dep.as_str()] < step_phase);
                }
            }

            let total_scheduled: usize = plan.phases.iter().map(Vec::len).sum();
            prop_assert_eq!(total_scheduled, steps.len());
        }

        /// A chain closed back on itself (`s0 -> s1 -> ... -> sN -> s0`) of any
        /// length is always reported as a cycle, never silently scheduled.
        #[test]
        fn closed_chains_are_always_reported_as_cycles(len in 2usize..8) {
            let names: Vec<String> = (0..len).map(|i| format!("s{i}")).collect();
            let steps: Vec<Step> = names
                .iter()
                .enumerate()
                .map(|(i, name)| {
                    let prev = names[(i + len - 1) % len].as_str();
                    shell_step(name, std::slice::from_ref(&prev))
                })
                .collect();
            let err = build_plan(&steps).unwrap_err();
            prop_assert!(matches!(err, EngineError::CircularDependencyError(_)));
        }
    }
}
