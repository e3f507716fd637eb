//! Sized, sorted arena copy of a filtered tree, shared by both layouts.

use std::collections::HashMap;

use indextree::{Arena, NodeId};

use crate::tree::TreeNode;

/// One node of the layout hierarchy.
#[derive(Debug, Clone)]
pub struct HierNode {
    pub name: String,
    /// Slash-joined name path from the root. Names are escaped (`%`, `/`, `#`)
    /// and repeated sibling names get a `#n` occurrence suffix, so every path
    /// is unique.
    pub path: String,
    /// Stable identifier derived from `path`.
    pub id: String,
    /// Aggregate byte size of the subtree.
    pub value: u64,
    pub is_dir: bool,
    /// Distance from the root (root = 0).
    pub depth: u32,
    /// Distance to the deepest descendant (leaf = 0).
    pub height: u32,
    /// Position in pre-order, used to index per-layout scratch buffers.
    pub index: usize,
}

/// Arena-backed hierarchy with sizes summed and siblings sorted by
/// descending value (ties keep document order).
#[derive(Debug, Clone)]
pub struct Hierarchy {
    arena: Arena<HierNode>,
    root: NodeId,
    preorder: Vec<NodeId>,
}

impl Hierarchy {
    pub fn build(tree: &TreeNode) -> Self {
        let mut arena = Arena::new();
        let path = path_segment(&tree.name, 0);
        let root = attach(&mut arena, tree, path, 0);

        let preorder: Vec<NodeId> = root.descendants(&arena).collect();
        for (index, &id) in preorder.iter().enumerate() {
            if let Some(node) = arena.get_mut(id) {
                node.get_mut().index = index;
            }
        }

        Self {
            arena,
            root,
            preorder,
        }
    }

    pub fn root(&self) -> NodeId {
        self.root
    }

    pub fn len(&self) -> usize {
        self.preorder.len()
    }

    /// Get a reference to a node
    pub fn get_node(&self, id: NodeId) -> Option<&HierNode> {
        self.arena.get(id).map(|n| n.get())
    }

    /// Children in layout order (largest first).
    pub fn children(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        id.children(&self.arena)
    }

    pub fn has_children(&self, id: NodeId) -> bool {
        self.arena
            .get(id)
            .map(|n| n.first_child().is_some())
            .unwrap_or(false)
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.arena.get(id).and_then(|n| n.parent())
    }

    /// All nodes, parents before children.
    pub fn preorder(&self) -> &[NodeId] {
        &self.preorder
    }

    /// Find a node by its unique path.
    pub fn find_by_path(&self, path: &str) -> Option<NodeId> {
        self.preorder
            .iter()
            .copied()
            .find(|&id| self.get_node(id).map(|n| n.path == path).unwrap_or(false))
    }
}

fn attach(arena: &mut Arena<HierNode>, node: &TreeNode, path: String, depth: u32) -> NodeId {
    let id = arena.new_node(HierNode {
        name: node.name.clone(),
        id: stable_id(&path),
        path,
        value: 0,
        is_dir: node.is_dir(),
        depth,
        height: 0,
        index: 0,
    });

    let (value, height) = match &node.children {
        None => (node.value.unwrap_or(0), 0),
        Some(children) => {
            let parent_path = arena[id].get().path.clone();
            let mut seen: HashMap<&str, usize> = HashMap::new();
            let mut built: Vec<(NodeId, u64, u32)> = Vec::with_capacity(children.len());

            for child in children {
                let occurrence = seen.entry(child.name.as_str()).or_insert(0);
                let child_path = format!("{}/{}", parent_path, path_segment(&child.name, *occurrence));
                *occurrence += 1;

                let child_id = attach(arena, child, child_path, depth + 1);
                let child_node = arena[child_id].get();
                built.push((child_id, child_node.value, child_node.height));
            }

            // Stable: equal sizes keep their document order.
            built.sort_by(|a, b| b.1.cmp(&a.1));

            let mut total = 0u64;
            let mut height = 0u32;
            for (child_id, value, child_height) in built {
                id.append(child_id, arena);
                total = total.saturating_add(value);
                height = height.max(child_height + 1);
            }
            (total, height)
        }
    };

    let entry = arena[id].get_mut();
    entry.value = value;
    entry.height = height;
    id
}

fn path_segment(name: &str, occurrence: usize) -> String {
    let name = escape_name(name);
    if occurrence == 0 {
        name
    } else {
        format!("{}#{}", name, occurrence)
    }
}

/// Percent-encode the path separator, the occurrence marker and `%` itself,
/// so an escaped name never contains `/` or `#`.
fn escape_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        match c {
            '%' => out.push_str("%25"),
            '/' => out.push_str("%2F"),
            '#' => out.push_str("%23"),
            _ => out.push(c),
        }
    }
    out
}

/// Reverse of [`escape_name`]. Malformed escapes are kept literally.
fn unescape_name(escaped: &str) -> String {
    let bytes = escaped.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            let decoded = escaped
                .get(i + 1..i + 3)
                .and_then(|hex| u8::from_str_radix(hex, 16).ok());
            if let Some(byte) = decoded {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Split one path segment into the sibling name and its occurrence index
/// among same-named siblings.
pub fn parse_segment(segment: &str) -> (String, usize) {
    match segment.rsplit_once('#') {
        Some((name, n)) => match n.parse::<usize>() {
            Ok(n) => (unescape_name(name), n),
            Err(_) => (unescape_name(segment), 0),
        },
        None => (unescape_name(segment), 0),
    }
}

/// Human-readable form of a node path: plain names, no occurrence suffixes.
pub fn display_path(path: &str) -> String {
    path.split('/')
        .map(|segment| parse_segment(segment).0)
        .collect::<Vec<_>>()
        .join("/")
}

/// djb2 hash of the node path, as 16 hex digits.
pub fn stable_id(path: &str) -> String {
    let mut hash: u64 = 5381;
    for byte in path.bytes() {
        hash = hash.wrapping_mul(33).wrapping_add(byte as u64);
    }
    format!("{:016x}", hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tree() -> TreeNode {
        TreeNode::dir(
            "root",
            vec![
                TreeNode::dir("small", vec![TreeNode::file("s", 10)]),
                TreeNode::dir(
                    "big",
                    vec![TreeNode::file("b1", 100), TreeNode::file("b2", 300)],
                ),
                TreeNode::file("tie-a", 10),
            ],
        )
    }

    fn names(h: &Hierarchy, id: NodeId) -> Vec<String> {
        h.children(id)
            .map(|c| h.get_node(c).unwrap().name.clone())
            .collect()
    }

    #[test]
    fn test_values_are_summed() {
        let h = Hierarchy::build(&tree());
        let root = h.get_node(h.root()).unwrap();
        assert_eq!(root.value, 420);
        assert_eq!(root.height, 2);
        assert_eq!(h.len(), 7);
    }

    #[test]
    fn test_siblings_sorted_descending_with_stable_ties() {
        let h = Hierarchy::build(&tree());
        assert_eq!(names(&h, h.root()), vec!["big", "small", "tie-a"]);

        let big = h.find_by_path("root/big").unwrap();
        assert_eq!(names(&h, big), vec!["b2", "b1"]);
    }

    #[test]
    fn test_preorder_depths_and_indices() {
        let h = Hierarchy::build(&tree());
        for (i, &id) in h.preorder().iter().enumerate() {
            let node = h.get_node(id).unwrap();
            assert_eq!(node.index, i);
            if let Some(parent) = h.parent(id) {
                assert_eq!(node.depth, h.get_node(parent).unwrap().depth + 1);
            } else {
                assert_eq!(node.depth, 0);
            }
        }
    }

    #[test]
    fn test_ids_are_deterministic() {
        let a = Hierarchy::build(&tree());
        let b = Hierarchy::build(&tree());
        let ids_a: Vec<_> = a.preorder().iter().map(|&id| a.get_node(id).unwrap().id.clone()).collect();
        let ids_b: Vec<_> = b.preorder().iter().map(|&id| b.get_node(id).unwrap().id.clone()).collect();
        assert_eq!(ids_a, ids_b);
        assert_eq!(stable_id("root/big"), stable_id("root/big"));
        assert_ne!(stable_id("root/big"), stable_id("root/small"));
    }

    #[test]
    fn test_duplicate_sibling_names_get_unique_paths() {
        let t = TreeNode::dir(
            "root",
            vec![TreeNode::file("dup", 1), TreeNode::file("dup", 2)],
        );
        let h = Hierarchy::build(&t);
        assert!(h.find_by_path("root/dup").is_some());
        assert!(h.find_by_path("root/dup#1").is_some());

        let dup1 = h.get_node(h.find_by_path("root/dup#1").unwrap()).unwrap();
        assert_eq!(dup1.value, 2);
        assert_eq!(dup1.name, "dup");
    }

    #[test]
    fn test_names_with_markers_do_not_collide() {
        let t = TreeNode::dir(
            "root",
            vec![
                TreeNode::file("a", 3),
                TreeNode::file("a", 2),
                TreeNode::file("a#1", 1),
                TreeNode::file("x/y", 1),
                TreeNode::file("x%2Fy", 1),
            ],
        );
        let h = Hierarchy::build(&t);

        let nodes: Vec<&HierNode> = h.preorder().iter().map(|&id| h.get_node(id).unwrap()).collect();
        let paths: Vec<&str> = nodes.iter().map(|n| n.path.as_str()).collect();
        let ids: std::collections::HashSet<&str> = nodes.iter().map(|n| n.id.as_str()).collect();
        assert_eq!(ids.len(), paths.len());
        assert_eq!(
            paths,
            vec!["root", "root/a", "root/a#1", "root/a%231", "root/x%2Fy", "root/x%252Fy"]
        );

        let literal = h.get_node(h.find_by_path("root/a%231").unwrap()).unwrap();
        assert_eq!(literal.name, "a#1");
        assert_eq!(literal.value, 1);
    }

    #[test]
    fn test_parse_segment_round_trips_names() {
        for name in ["plain", "a#1", "x/y", "50%", "%2F", "C#"] {
            for occurrence in [0, 1, 7] {
                let segment = path_segment(name, occurrence);
                assert!(!segment[..segment.rfind('#').unwrap_or(segment.len())].contains('/'));
                assert_eq!(parse_segment(&segment), (name.to_string(), occurrence));
            }
        }
        assert_eq!(parse_segment("bad%zz"), ("bad%zz".to_string(), 0));
        assert_eq!(display_path("root/a#1/C%23/x%2Fy"), "root/a/C#/x/y");
    }

    #[test]
    fn test_empty_directory_is_childless() {
        let t = TreeNode::dir("root", vec![TreeNode::dir("empty", vec![])]);
        let h = Hierarchy::build(&t);
        let empty = h.find_by_path("root/empty").unwrap();
        assert!(!h.has_children(empty));
        assert!(h.get_node(empty).unwrap().is_dir);
        assert_eq!(h.get_node(empty).unwrap().value, 0);
    }
}
