//! Cycle detection over an adjacency map
//!
//! Plain DFS with a current-path stack, started from every unvisited node in
//! map order. Hitting a neighbor that is on the path yields the path suffix
//! from that neighbor; a neighbor that was visited earlier but is off the
//! path ends the branch. Cycles are not deduplicated.

use indexmap::{IndexMap, IndexSet};
use std::collections::HashSet;

pub fn find_cycles(adjacency: &IndexMap<String, IndexSet<String>>) -> Vec<Vec<String>> {
    let mut search = CycleSearch {
        adjacency,
        visited: HashSet::new(),
        path: Vec::new(),
        cycles: Vec::new(),
    };

    for node in adjacency.keys() {
        if !search.visited.contains(node.as_str()) {
            search.visit(node);
        }
    }

    search.cycles
}

struct CycleSearch<'a> {
    adjacency: &'a IndexMap<String, IndexSet<String>>,
    visited: HashSet<&'a str>,
    path: Vec<&'a str>,
    cycles: Vec<Vec<String>>,
}

impl<'a> CycleSearch<'a> {
    fn visit(&mut self, node: &'a str) {
        self.visited.insert(node);
        self.path.push(node);

        let adjacency = self.adjacency;
        if let Some(neighbors) = adjacency.get(node) {
            for neighbor in neighbors {
                if let Some(start) = self.path.iter().position(|p| *p == neighbor.as_str()) {
                    self.cycles
                        .push(self.path[start..].iter().map(|s| s.to_string()).collect());
                } else if !self.visited.contains(neighbor.as_str()) {
                    self.visit(neighbor);
                }
            }
        }

        self.path.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn adjacency(edges: &[(&str, &[&str])]) -> IndexMap<String, IndexSet<String>> {
        edges
            .iter()
            .map(|(from, to)| {
                (
                    from.to_string(),
                    to.iter().map(|s| s.to_string()).collect::<IndexSet<_>>(),
                )
            })
            .collect()
    }

    fn assert_real_cycle(adj: &IndexMap<String, IndexSet<String>>, cycle: &[String]) {
        for i in 0..cycle.len() {
            let from = &cycle[i];
            let to = &cycle[(i + 1) % cycle.len()];
            assert!(adj[from].contains(to), "{from} -> {to} is not an edge");
        }
    }

    #[test]
    fn test_mutual_imports() {
        let adj = adjacency(&[("A", &["B"]), ("B", &["A"])]);
        let cycles = find_cycles(&adj);
        assert_eq!(cycles, vec![vec!["A".to_string(), "B".to_string()]]);
    }

    #[test]
    fn test_acyclic() {
        let adj = adjacency(&[("A", &["B", "C"]), ("B", &["C"]), ("C", &[])]);
        assert!(find_cycles(&adj).is_empty());
    }

    #[test]
    fn test_self_import() {
        let adj = adjacency(&[("A", &["A"])]);
        assert_eq!(find_cycles(&adj), vec![vec!["A".to_string()]]);
    }

    #[test]
    fn test_cycle_suffix_and_edges() {
        let adj = adjacency(&[
            ("Root", &["A"]),
            ("A", &["B"]),
            ("B", &["C"]),
            ("C", &["A"]),
        ]);
        let cycles = find_cycles(&adj);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0], vec!["A", "B", "C"]);
        for cycle in &cycles {
            assert_real_cycle(&adj, cycle);
        }
    }

    #[test]
    fn test_overlapping_cycles_each_reported() {
        let adj = adjacency(&[("A", &["B", "C"]), ("B", &["A"]), ("C", &["A"])]);
        let cycles = find_cycles(&adj);
        assert_eq!(cycles.len(), 2);
        for cycle in &cycles {
            assert_real_cycle(&adj, cycle);
        }
    }

    #[test]
    fn test_unknown_neighbor_has_no_successors() {
        let adj = adjacency(&[("A", &["Ghost"])]);
        assert!(find_cycles(&adj).is_empty());
    }
}
