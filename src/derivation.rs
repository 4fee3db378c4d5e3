//! Derivation tree: a path-addressed structure tracking unresolved slots
//! ("holes") over a tree under construction.
//!
//! Holes and nodes both live in arenas and are addressed by integer handles;
//! a hole's path is a cached key, not its identity. Open holes are indexed
//! two ways: by the canonical key `(path length, path)` — whose minimum is
//! the BFS-first hole shared by construction and recovery — and by symbol,
//! for absolute replay's by-origin lookup.

use std::collections::{BTreeMap, HashMap};

use crate::errors::SkeinError;
use crate::grammar::Symbol;
use crate::tree::{Token, Tree, TreeChild};

/// Opaque handle to a hole in the slot arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HoleId(usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NodeId(usize);

/// Whether a node survives finalization or is spliced into its parent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    Normal,
    /// Transient wrapper: during finalization its children are spliced
    /// directly into the parent and the wrapper itself is discarded.
    Inline,
}

/// A child of a node about to fill a hole.
#[derive(Debug, Clone)]
pub enum PendingChild {
    Token(Token),
    /// An unresolved nonterminal; becomes a new hole on fill.
    Open(Symbol),
}

/// A concrete node produced from one production, ready to fill a hole.
#[derive(Debug, Clone)]
pub struct PendingNode {
    pub label: String,
    pub kind: NodeKind,
    pub children: Vec<PendingChild>,
}

#[derive(Debug, Clone)]
enum Slot {
    Token(Token),
    Node(NodeId),
    Open(HoleId),
}

#[derive(Debug, Clone)]
struct NodeData {
    label: String,
    kind: NodeKind,
    children: Vec<Slot>,
}

#[derive(Debug, Clone)]
struct HoleData {
    /// Owning node and child index; `None` for the root hole.
    parent: Option<(NodeId, usize)>,
    symbol: String,
    path: Vec<usize>,
}

/// A tree under construction. Created with one hole for the start symbol,
/// mutated exclusively through [`DerivationTree::fill`], finalized once no
/// holes remain.
#[derive(Debug, Clone)]
pub struct DerivationTree {
    nodes: Vec<NodeData>,
    holes: Vec<HoleData>,
    root: Option<NodeId>,
    /// Canonical index: `(path length, path)` -> open hole.
    open: BTreeMap<(usize, Vec<usize>), HoleId>,
    /// Symbol name -> open holes, insertion order.
    open_by_symbol: HashMap<String, Vec<HoleId>>,
}

impl DerivationTree {
    /// A new tree with exactly one open hole at the empty path.
    pub fn new(start_symbol: &str) -> Self {
        let root_hole = HoleData {
            parent: None,
            symbol: start_symbol.to_string(),
            path: Vec::new(),
        };
        let mut open = BTreeMap::new();
        open.insert((0, Vec::new()), HoleId(0));
        let mut open_by_symbol = HashMap::new();
        open_by_symbol.insert(start_symbol.to_string(), vec![HoleId(0)]);
        Self {
            nodes: Vec::new(),
            holes: vec![root_hole],
            root: None,
            open,
            open_by_symbol,
        }
    }

    /// Whether any holes remain open.
    pub fn any_holes(&self) -> bool {
        !self.open.is_empty()
    }

    /// Number of open holes.
    pub fn open_holes(&self) -> usize {
        self.open.len()
    }

    /// The open hole with minimal `(path length, path)`.
    pub fn bfs_first_hole(&self) -> Result<HoleId, SkeinError> {
        self.open
            .values()
            .next()
            .copied()
            .ok_or(SkeinError::NoHoles)
    }

    /// The BFS-minimal open hole whose symbol is `symbol`, if any.
    /// Absolute replay resolves each production's target hole this way.
    pub fn first_hole_for(&self, symbol: &str) -> Option<HoleId> {
        let ids = self.open_by_symbol.get(symbol)?;
        ids.iter().copied().min_by(|a, b| {
            let pa = &self.holes[a.0].path;
            let pb = &self.holes[b.0].path;
            (pa.len(), pa).cmp(&(pb.len(), pb))
        })
    }

    /// The nonterminal symbol a hole must resolve to.
    pub fn hole_symbol(&self, hole: HoleId) -> &str {
        &self.holes[hole.0].symbol
    }

    /// Path of child indices from the root to a hole.
    pub fn hole_path(&self, hole: HoleId) -> &[usize] {
        &self.holes[hole.0].path
    }

    /// Replace a hole with a concrete node. Atomic: every `Open` child of
    /// `node` is registered as a new hole before this returns. Paths are
    /// never reused; the filled hole leaves both indexes.
    pub fn fill(&mut self, hole: HoleId, node: PendingNode) {
        debug_assert!(
            self.open.values().any(|h| *h == hole),
            "fill() on a hole that is not open"
        );
        let path = self.holes[hole.0].path.clone();
        let parent = self.holes[hole.0].parent;
        let symbol = self.holes[hole.0].symbol.clone();

        let node_id = NodeId(self.nodes.len());
        let mut slots = Vec::with_capacity(node.children.len());
        for (i, child) in node.children.into_iter().enumerate() {
            match child {
                PendingChild::Token(token) => slots.push(Slot::Token(token)),
                PendingChild::Open(sym) => {
                    let child_hole = HoleId(self.holes.len());
                    let mut child_path = path.clone();
                    child_path.push(i);
                    self.open
                        .insert((child_path.len(), child_path.clone()), child_hole);
                    self.open_by_symbol
                        .entry(sym.name().to_string())
                        .or_default()
                        .push(child_hole);
                    self.holes.push(HoleData {
                        parent: Some((node_id, i)),
                        symbol: sym.name().to_string(),
                        path: child_path,
                    });
                    slots.push(Slot::Open(child_hole));
                }
            }
        }
        self.nodes.push(NodeData {
            label: node.label,
            kind: node.kind,
            children: slots,
        });

        self.open.remove(&(path.len(), path));
        if let Some(ids) = self.open_by_symbol.get_mut(&symbol) {
            ids.retain(|h| *h != hole);
        }
        match parent {
            None => self.root = Some(node_id),
            Some((parent_id, index)) => {
                self.nodes[parent_id.0].children[index] = Slot::Node(node_id);
            }
        }
    }

    /// The externally visible tree: inline wrappers spliced away.
    pub fn finalize(&self) -> Result<Tree, SkeinError> {
        self.export(true)
    }

    /// The tree with inline wrappers left in place, for diagnostics.
    pub fn raw(&self) -> Result<Tree, SkeinError> {
        self.export(false)
    }

    fn export(&self, splice: bool) -> Result<Tree, SkeinError> {
        if self.any_holes() {
            return Err(SkeinError::IncompleteTree {
                open: self.open.len(),
            });
        }
        let root = self.root.ok_or(SkeinError::IncompleteTree { open: 1 })?;

        // Nodes are only created by filling holes, so every child id is
        // greater than its parent's: a reverse id sweep finishes children
        // before parents without recursion.
        enum Flattened {
            Node(Tree),
            Spliced(Vec<TreeChild>),
        }
        let mut finished: Vec<Option<Flattened>> = Vec::new();
        finished.resize_with(self.nodes.len(), || None);

        for id in (0..self.nodes.len()).rev() {
            let node = &self.nodes[id];
            let mut children = Vec::with_capacity(node.children.len());
            for slot in &node.children {
                match slot {
                    Slot::Token(token) => children.push(TreeChild::Token(token.clone())),
                    Slot::Node(child_id) => {
                        // Present by the reverse-sweep ordering.
                        match finished[child_id.0].take().unwrap() {
                            Flattened::Node(tree) => children.push(TreeChild::Tree(tree)),
                            Flattened::Spliced(spliced) => children.extend(spliced),
                        }
                    }
                    Slot::Open(_) => unreachable!("open hole behind any_holes() check"),
                }
            }
            let flattened = if splice && node.kind == NodeKind::Inline {
                Flattened::Spliced(children)
            } else {
                Flattened::Node(Tree::new(node.label.clone(), children))
            };
            finished[id] = Some(flattened);
        }

        // The root wrapper itself is never spliced, only children are.
        Ok(match finished[root.0].take().unwrap() {
            Flattened::Node(tree) => tree,
            Flattened::Spliced(children) => Tree::new(self.nodes[root.0].label.clone(), children),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn open(name: &str) -> PendingChild {
        PendingChild::Open(Symbol::nonterminal(name))
    }

    fn token(name: &str, value: &str) -> PendingChild {
        PendingChild::Token(Token::new(name, value))
    }

    fn node(label: &str, children: Vec<PendingChild>) -> PendingNode {
        PendingNode {
            label: label.to_string(),
            kind: NodeKind::Normal,
            children,
        }
    }

    #[test]
    fn starts_with_one_hole_at_empty_path() {
        let tree = DerivationTree::new("start");
        assert!(tree.any_holes());
        let hole = tree.bfs_first_hole().unwrap();
        assert_eq!(tree.hole_path(hole), &[] as &[usize]);
        assert_eq!(tree.hole_symbol(hole), "start");
    }

    #[test]
    fn bfs_tie_break_prefers_shorter_path() {
        let mut tree = DerivationTree::new("start");
        let root = tree.bfs_first_hole().unwrap();
        tree.fill(root, node("start", vec![open("a"), open("b")]));
        // Expand (0,) into two more holes so (0,0) and (0,1) coexist with (1,).
        let first = tree.bfs_first_hole().unwrap();
        assert_eq!(tree.hole_path(first), &[0]);
        tree.fill(first, node("a", vec![open("c"), open("c")]));

        let next = tree.bfs_first_hole().unwrap();
        assert_eq!(tree.hole_path(next), &[1], "shorter path wins over (0, _)");
    }

    #[test]
    fn fill_registers_children_atomically() {
        let mut tree = DerivationTree::new("start");
        let root = tree.bfs_first_hole().unwrap();
        tree.fill(root, node("start", vec![open("a"), token("X", "x"), open("a")]));
        assert_eq!(tree.open_holes(), 2);
        let hole = tree.bfs_first_hole().unwrap();
        assert_eq!(tree.hole_path(hole), &[0]);
        assert_eq!(tree.hole_symbol(hole), "a");
    }

    #[test]
    fn first_hole_for_is_bfs_minimal() {
        let mut tree = DerivationTree::new("start");
        let root = tree.bfs_first_hole().unwrap();
        tree.fill(root, node("start", vec![open("b"), open("a")]));
        let hole = tree.first_hole_for("a").unwrap();
        assert_eq!(tree.hole_path(hole), &[1]);
        assert!(tree.first_hole_for("missing").is_none());
    }

    #[test]
    fn finalize_fails_while_holes_remain() {
        let tree = DerivationTree::new("start");
        let err = tree.finalize().unwrap_err();
        assert!(matches!(err, SkeinError::IncompleteTree { open: 1 }));
    }

    #[test]
    fn finalize_splices_inline_wrappers() {
        let mut tree = DerivationTree::new("start");
        let root = tree.bfs_first_hole().unwrap();
        tree.fill(root, node("start", vec![open("_wrap")]));
        let hole = tree.bfs_first_hole().unwrap();
        tree.fill(
            hole,
            PendingNode {
                label: "_wrap".to_string(),
                kind: NodeKind::Inline,
                children: vec![token("A", "a"), token("B", "b")],
            },
        );

        let finished = tree.finalize().unwrap();
        assert_eq!(finished.label, "start");
        assert_eq!(finished.children.len(), 2, "wrapper children are spliced");

        let raw = tree.raw().unwrap();
        assert_eq!(raw.children.len(), 1, "raw export keeps the wrapper");
        assert!(matches!(&raw.children[0], TreeChild::Tree(t) if t.label == "_wrap"));
    }
}
