//! Dependency cycle detection
//!
//! The detector walks the identifier → dependencies mapping and reports
//! cycles; it never breaks them. Two variants share the interface: the
//! default no-op costs nothing, the active one runs a depth-first walk with
//! visited and in-path marker sets. The choice is a process-wide toggle.
//!
//! Cycles are reported through the logger during the build's detection
//! phase rather than thrown — the resolve path already fails with a
//! `CircularResolution` on the first cyclic require.

use crate::identifier::Identifier;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// A simple cycle through the dependency graph.
#[derive(Debug, Clone)]
pub struct Cycle {
    path: Vec<Identifier>,
}

impl Cycle {
    /// The identifiers on the cycle, without the closing repetition.
    pub fn identifiers(&self) -> &[Identifier] {
        &self.path
    }
}

impl fmt::Display for Cycle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for identifier in &self.path {
            write!(f, "{identifier} -> ")?;
        }
        match self.path.first() {
            Some(first) => write!(f, "{first}"),
            None => Ok(()),
        }
    }
}

/// Graph walk over the registry's dependency mapping.
pub trait CycleDetection: Send + Sync {
    /// Every cycle found in the graph; empty when detection is off.
    fn detect(&self, graph: &HashMap<Identifier, Vec<Identifier>>) -> Vec<Cycle>;
}

/// Zero-overhead variant: reports nothing.
pub struct NoOpCycleDetector;

impl CycleDetection for NoOpCycleDetector {
    fn detect(&self, _graph: &HashMap<Identifier, Vec<Identifier>>) -> Vec<Cycle> {
        Vec::new()
    }
}

/// Depth-first walk reporting each simple cycle once.
pub struct ActiveCycleDetector;

impl CycleDetection for ActiveCycleDetector {
    fn detect(&self, graph: &HashMap<Identifier, Vec<Identifier>>) -> Vec<Cycle> {
        let mut starts: Vec<&Identifier> = graph.keys().collect();
        // Deterministic report order regardless of map iteration.
        starts.sort_by_key(|identifier| identifier.name().to_string());

        let mut cycles = Vec::new();
        let mut reported = HashSet::new();
        for start in starts {
            let mut path = Vec::new();
            let mut visited = HashSet::new();
            walk(graph, start, &mut path, &mut visited, &mut reported, &mut cycles);
        }
        cycles
    }
}

fn walk(
    graph: &HashMap<Identifier, Vec<Identifier>>,
    node: &Identifier,
    path: &mut Vec<Identifier>,
    visited: &mut HashSet<Identifier>,
    reported: &mut HashSet<String>,
    cycles: &mut Vec<Cycle>,
) {
    if let Some(position) = path.iter().position(|on_path| on_path == node) {
        let cycle = Cycle {
            path: path[position..].to_vec(),
        };
        if reported.insert(normalized_key(&cycle)) {
            cycles.push(cycle);
        }
        return;
    }
    if !visited.insert(node.clone()) {
        return;
    }
    path.push(node.clone());
    if let Some(dependencies) = graph.get(node) {
        for dependency in dependencies {
            walk(graph, dependency, path, visited, reported, cycles);
        }
    }
    path.pop();
}

/// Rotation-independent key so the same cycle found from different starting
/// nodes is reported once.
fn normalized_key(cycle: &Cycle) -> String {
    let names: Vec<&str> = cycle.path.iter().map(Identifier::name).collect();
    let pivot = names
        .iter()
        .enumerate()
        .min_by_key(|(_, name)| *name)
        .map(|(index, _)| index)
        .unwrap_or(0);
    let mut rotated = Vec::with_capacity(names.len());
    rotated.extend_from_slice(&names[pivot..]);
    rotated.extend_from_slice(&names[..pivot]);
    rotated.join("/")
}

static DETECTION_ENABLED: AtomicBool = AtomicBool::new(false);

static NOOP_DETECTOR: NoOpCycleDetector = NoOpCycleDetector;
static ACTIVE_DETECTOR: ActiveCycleDetector = ActiveCycleDetector;

/// Toggle cycle detection for the whole process. Off by default so the
/// build path carries no graph-walk cost.
pub fn set_cycle_detection(enabled: bool) {
    DETECTION_ENABLED.store(enabled, Ordering::Release);
}

/// Whether cycle detection is currently active.
pub fn cycle_detection_enabled() -> bool {
    DETECTION_ENABLED.load(Ordering::Acquire)
}

pub(crate) fn detector() -> &'static dyn CycleDetection {
    if cycle_detection_enabled() {
        &ACTIVE_DETECTOR
    } else {
        &NOOP_DETECTOR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct A;
    struct B;
    struct C;
    struct D;

    fn graph(edges: &[(Identifier, Vec<Identifier>)]) -> HashMap<Identifier, Vec<Identifier>> {
        edges.iter().cloned().collect()
    }

    #[test]
    fn test_noop_reports_nothing() {
        let g = graph(&[
            (Identifier::of::<A>(), vec![Identifier::of::<B>()]),
            (Identifier::of::<B>(), vec![Identifier::of::<A>()]),
        ]);
        assert!(NoOpCycleDetector.detect(&g).is_empty());
    }

    #[test]
    fn test_self_loop() {
        let g = graph(&[(Identifier::of::<A>(), vec![Identifier::of::<A>()])]);
        let cycles = ActiveCycleDetector.detect(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].identifiers().len(), 1);
    }

    #[test]
    fn test_two_cycle_reported_once() {
        let g = graph(&[
            (Identifier::of::<A>(), vec![Identifier::of::<B>()]),
            (Identifier::of::<B>(), vec![Identifier::of::<A>()]),
        ]);
        let cycles = ActiveCycleDetector.detect(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].identifiers().len(), 2);

        let rendered = cycles[0].to_string();
        assert!(rendered.contains(" -> "));
        // Path closes on its first identifier.
        let first = cycles[0].identifiers()[0].name();
        assert!(rendered.ends_with(first));
    }

    #[test]
    fn test_three_cycle() {
        let g = graph(&[
            (Identifier::of::<A>(), vec![Identifier::of::<B>()]),
            (Identifier::of::<B>(), vec![Identifier::of::<C>()]),
            (Identifier::of::<C>(), vec![Identifier::of::<A>()]),
        ]);
        let cycles = ActiveCycleDetector.detect(&g);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].identifiers().len(), 3);
    }

    #[test]
    fn test_two_cycles_sharing_a_node() {
        let g = graph(&[
            (
                Identifier::of::<A>(),
                vec![Identifier::of::<B>(), Identifier::of::<C>()],
            ),
            (Identifier::of::<B>(), vec![Identifier::of::<A>()]),
            (Identifier::of::<C>(), vec![Identifier::of::<A>()]),
            (Identifier::of::<D>(), vec![Identifier::of::<A>()]),
        ]);
        let cycles = ActiveCycleDetector.detect(&g);
        assert_eq!(cycles.len(), 2);
    }

    #[test]
    fn test_acyclic_graph_is_clean() {
        let g = graph(&[
            (Identifier::of::<A>(), vec![Identifier::of::<B>()]),
            (Identifier::of::<B>(), vec![Identifier::of::<C>()]),
            (Identifier::of::<C>(), vec![]),
        ]);
        assert!(ActiveCycleDetector.detect(&g).is_empty());
    }

    #[test]
    fn test_toggle() {
        assert!(!cycle_detection_enabled());
        set_cycle_detection(true);
        assert!(cycle_detection_enabled());
        let g = graph(&[(Identifier::of::<A>(), vec![Identifier::of::<A>()])]);
        assert_eq!(detector().detect(&g).len(), 1);
        set_cycle_detection(false);
        assert!(detector().detect(&g).is_empty());
    }
}
