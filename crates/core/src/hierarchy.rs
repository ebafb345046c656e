//! Folder hierarchy reconstruction from flat listings
//!
//! Drive returns folders as a flat list where each entry names its parents.
//! A folder can have several parents, and nothing stops a listing from
//! containing a parent chain that loops back on itself, so the traversal
//! guards the current path instead of relying on the data being a tree.

use crate::drive::Entry;
use std::collections::{HashMap, HashSet};

/// Parent id -> child ids, children in listing order
pub type ChildIndex = HashMap<String, Vec<String>>;

/// Suffix printed after an entry that closes a cycle
pub const CYCLE_MARKER: &str = "(cycle detected, stopping traversal)";

/// One rendered line of the hierarchy
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeLine {
    pub depth: usize,
    pub id: String,
    pub name: String,
    /// The entry is already on the current path; its subtree is not repeated
    pub cycle: bool,
}

/// Build the parent -> children index for a listing
pub fn build_index(entries: &[Entry]) -> ChildIndex {
    let mut index = ChildIndex::new();
    for entry in entries {
        for parent_id in &entry.parent_ids {
            index
                .entry(parent_id.clone())
                .or_default()
                .push(entry.id.clone());
        }
    }
    index
}

/// Depth-first rendering starting from every entry without parents.
///
/// Parents come before their children; children follow index order. An
/// entry reachable through several parents is emitted under each of them.
/// Child ids missing from `entries` are skipped.
pub fn render(entries: &[Entry], index: &ChildIndex) -> Vec<TreeLine> {
    let by_id: HashMap<&str, &Entry> = entries.iter().map(|e| (e.id.as_str(), e)).collect();
    let mut lines = Vec::new();
    let mut path = HashSet::new();

    for root in entries.iter().filter(|e| e.parent_ids.is_empty()) {
        visit(root, 0, &by_id, index, &mut path, &mut lines);
    }

    lines
}

fn visit<'a>(
    entry: &'a Entry,
    depth: usize,
    by_id: &HashMap<&str, &'a Entry>,
    index: &ChildIndex,
    path: &mut HashSet<&'a str>,
    lines: &mut Vec<TreeLine>,
) {
    let cycle = path.contains(entry.id.as_str());
    lines.push(TreeLine {
        depth,
        id: entry.id.clone(),
        name: entry.name.clone(),
        cycle,
    });
    if cycle {
        return;
    }

    path.insert(entry.id.as_str());
    if let Some(children) = index.get(&entry.id) {
        for child_id in children {
            if let Some(&child) = by_id.get(child_id.as_str()) {
                visit(child, depth + 1, by_id, index, path, lines);
            }
        }
    }
    path.remove(entry.id.as_str());
}

/// Format rendered lines with two spaces of indentation per level
pub fn format_tree(lines: &[TreeLine]) -> String {
    let mut out = String::new();
    for line in lines {
        out.push_str(&"  ".repeat(line.depth));
        out.push_str(&line.name);
        if line.cycle {
            out.push(' ');
            out.push_str(CYCLE_MARKER);
        }
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: &str, name: &str, parents: &[&str]) -> Entry {
        Entry {
            id: id.to_string(),
            name: name.to_string(),
            parent_ids: parents.iter().map(|p| p.to_string()).collect(),
        }
    }

    fn names(lines: &[TreeLine]) -> Vec<(usize, &str)> {
        lines.iter().map(|l| (l.depth, l.name.as_str())).collect()
    }

    #[test]
    fn test_build_index_keeps_listing_order() {
        let entries = vec![
            entry("b", "B", &["a"]),
            entry("c", "C", &["a"]),
            entry("d", "D", &["a", "b"]),
        ];
        let index = build_index(&entries);

        assert_eq!(index["a"], vec!["b", "c", "d"]);
        assert_eq!(index["b"], vec!["d"]);
        assert!(!index.contains_key("d"));
    }

    #[test]
    fn test_render_simple_tree() {
        let entries = vec![
            entry("a", "A", &[]),
            entry("b", "B", &["a"]),
            entry("c", "C", &["b"]),
            entry("d", "D", &["a"]),
        ];
        let lines = render(&entries, &build_index(&entries));

        assert_eq!(names(&lines), vec![(0, "A"), (1, "B"), (2, "C"), (1, "D")]);
        assert!(lines.iter().all(|l| !l.cycle));
    }

    #[test]
    fn test_render_multiple_roots() {
        let entries = vec![
            entry("r1", "Root1", &[]),
            entry("x", "X", &["r1"]),
            entry("r2", "Root2", &[]),
        ];
        let lines = render(&entries, &build_index(&entries));

        assert_eq!(names(&lines), vec![(0, "Root1"), (1, "X"), (0, "Root2")]);
    }

    #[test]
    fn test_render_multi_parent_entry_appears_under_each_parent() {
        let entries = vec![
            entry("p1", "P1", &[]),
            entry("p2", "P2", &[]),
            entry("shared", "Shared", &["p1", "p2"]),
        ];
        let lines = render(&entries, &build_index(&entries));

        assert_eq!(
            names(&lines),
            vec![(0, "P1"), (1, "Shared"), (0, "P2"), (1, "Shared")]
        );
        assert!(lines.iter().all(|l| !l.cycle));
    }

    #[test]
    fn test_render_cycle_is_marked_once() {
        // r -> a -> b -> a
        let entries = vec![
            entry("r", "R", &[]),
            entry("a", "A", &["r", "b"]),
            entry("b", "B", &["a"]),
        ];
        let lines = render(&entries, &build_index(&entries));

        assert_eq!(names(&lines), vec![(0, "R"), (1, "A"), (2, "B"), (3, "A")]);
        let cycles: Vec<_> = lines.iter().filter(|l| l.cycle).collect();
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].id, "a");
    }

    #[test]
    fn test_render_self_parent() {
        let entries = vec![entry("r", "R", &[]), entry("s", "S", &["r", "s"])];
        let lines = render(&entries, &build_index(&entries));

        assert_eq!(names(&lines), vec![(0, "R"), (1, "S"), (2, "S")]);
        assert!(lines[2].cycle);
    }

    #[test]
    fn test_render_skips_missing_children_and_dangling_parents() {
        let entries = vec![entry("r", "R", &[]), entry("orphan", "Orphan", &["gone"])];
        let mut index = build_index(&entries);
        index.entry("r".to_string()).or_default().push("missing".to_string());

        let lines = render(&entries, &index);

        // "orphan" has a parent outside the listing, so it is not a root.
        assert_eq!(names(&lines), vec![(0, "R")]);
    }

    #[test]
    fn test_render_cycle_without_roots_yields_nothing() {
        let entries = vec![entry("a", "A", &["b"]), entry("b", "B", &["a"])];
        assert!(render(&entries, &build_index(&entries)).is_empty());
    }

    #[test]
    fn test_depth_increases_by_one_per_edge() {
        let entries = vec![
            entry("1", "one", &[]),
            entry("2", "two", &["1"]),
            entry("3", "three", &["2"]),
            entry("4", "four", &["3"]),
        ];
        let lines = render(&entries, &build_index(&entries));

        for pair in lines.windows(2) {
            assert_eq!(pair[1].depth, pair[0].depth + 1);
        }
    }

    #[test]
    fn test_format_tree() {
        let lines = vec![
            TreeLine { depth: 0, id: "a".into(), name: "A".into(), cycle: false },
            TreeLine { depth: 1, id: "b".into(), name: "B".into(), cycle: false },
            TreeLine { depth: 2, id: "a".into(), name: "A".into(), cycle: true },
        ];

        assert_eq!(
            format_tree(&lines),
            "A\n  B\n    A (cycle detected, stopping traversal)\n"
        );
    }
}
