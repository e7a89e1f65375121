//! Arena-backed abstract syntax trees.
//!
//! An [`Ast`] owns every node in a flat arena. Nodes are stored in
//! deterministic pre-order: [`NodeId`] `n` is the `n`-th node visited by a
//! depth-first, left-to-right walk from the root. The parent table is a
//! non-owning back-reference rebuilt every time a tree is assembled, so a
//! structural edit always produces a fresh `Ast` through [`AstBuilder`].
//!
//! Because the arena layout is canonical, derived equality is structural
//! equality.

use serde::{Deserialize, Serialize};

use super::grammar::Slot;
use super::vocabulary::Vocabulary;

/// Largest iteration count a `Repeat` node may carry.
pub const MAX_REPEAT: u8 = 19;

/// Index of a node inside an [`Ast`] arena (pre-order position).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct NodeId(u32);

impl NodeId {
    /// The root of every assembled tree.
    pub const ROOT: NodeId = NodeId(0);

    /// Arena index of this node.
    #[must_use]
    pub fn index(self) -> usize {
        self.0 as usize
    }

    fn from_index(index: usize) -> Self {
        // Trees are bounded far below u32::MAX by grammar limits.
        Self(u32::try_from(index).unwrap_or(u32::MAX))
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Which grammar category a `Hole` stands in for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HoleKind {
    Statement,
    Condition,
}

/// Node tag. Children live in the arena, not in the tag.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NodeKind {
    /// Root. Children: `[statement]`.
    Program,
    /// Children: `[first, rest]`. `first` is never itself a `Concatenate`.
    Concatenate,
    /// Children: `[condition, body]`.
    While,
    /// Children: `[condition, then]`.
    If,
    /// Children: `[condition, then, else]`.
    IfElse,
    /// Children: `[count, body]` where `count` is an `Int`.
    Repeat,
    /// Integer literal in `0..=MAX_REPEAT`.
    Int(u8),
    /// Primitive action from the domain vocabulary.
    Action(String),
    /// Boolean perception with zero, one or two enumerated parameters.
    Perception { name: String, params: Vec<String> },
    /// Children: `[condition]`.
    Not,
    /// Unfilled slot in a partial program.
    Hole(HoleKind),
}

/// Grammar category of a node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Category {
    Program,
    Statement,
    Condition,
    Integer,
}

impl std::fmt::Display for Category {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Program => "program",
            Self::Statement => "statement",
            Self::Condition => "condition",
            Self::Integer => "integer",
        };
        f.write_str(s)
    }
}

impl NodeKind {
    /// Grammar category this node belongs to.
    #[must_use]
    pub fn category(&self) -> Category {
        match self {
            Self::Program => Category::Program,
            Self::Concatenate
            | Self::While
            | Self::If
            | Self::IfElse
            | Self::Repeat
            | Self::Action(_)
            | Self::Hole(HoleKind::Statement) => Category::Statement,
            Self::Perception { .. } | Self::Not | Self::Hole(HoleKind::Condition) => {
                Category::Condition
            }
            Self::Int(_) => Category::Integer,
        }
    }

    /// Number of children this kind requires.
    #[must_use]
    pub fn arity(&self) -> usize {
        match self {
            Self::Program | Self::Not => 1,
            Self::Concatenate | Self::While | Self::If | Self::Repeat => 2,
            Self::IfElse => 3,
            Self::Int(_) | Self::Action(_) | Self::Perception { .. } | Self::Hole(_) => 0,
        }
    }

    /// Short human-readable label (used in traces and error messages).
    #[must_use]
    pub fn label(&self) -> String {
        match self {
            Self::Program => "Program".into(),
            Self::Concatenate => "Concatenate".into(),
            Self::While => "While".into(),
            Self::If => "If".into(),
            Self::IfElse => "IfElse".into(),
            Self::Repeat => "Repeat".into(),
            Self::Int(n) => format!("Int({n})"),
            Self::Action(name) => name.clone(),
            Self::Perception { name, params } if params.is_empty() => name.clone(),
            Self::Perception { name, params } => format!("{name}({})", params.join(", ")),
            Self::Not => "Not".into(),
            Self::Hole(_) => "<HOLE>".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct Node {
    kind: NodeKind,
    children: Vec<NodeId>,
}

/// Structural invariant violations reported by [`Ast::validate`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AstError {
    #[error("root must be Program, found {found}")]
    RootNotProgram { found: String },
    #[error("node {node} ({kind}) expects {expected} children, found {found}")]
    Arity {
        node: NodeId,
        kind: String,
        expected: usize,
        found: usize,
    },
    #[error("child {index} of node {node} must be a {expected}, found {found}")]
    ChildCategory {
        node: NodeId,
        index: usize,
        expected: Category,
        found: String,
    },
    #[error("Concatenate at {node} has a Concatenate as its first child")]
    LeftNestedConcatenate { node: NodeId },
    #[error("Repeat count {count} at {node} exceeds {MAX_REPEAT}")]
    RepeatOutOfRange { node: NodeId, count: u8 },
    #[error("unknown action '{name}' at {node}")]
    UnknownAction { node: NodeId, name: String },
    #[error("unknown perception '{name}' at {node}")]
    UnknownPerception { node: NodeId, name: String },
    #[error("perception '{name}' at {node}: {detail}")]
    InvalidParameters {
        node: NodeId,
        name: String,
        detail: String,
    },
}

/// An immutable program tree.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Ast {
    nodes: Vec<Node>,
    parents: Vec<Option<NodeId>>,
}

impl Ast {
    /// The root node (always [`NodeId::ROOT`]).
    #[must_use]
    pub fn root(&self) -> NodeId {
        NodeId::ROOT
    }

    /// Number of nodes in the tree.
    #[must_use]
    pub fn size(&self) -> usize {
        self.nodes.len()
    }

    /// Tag of `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree.
    #[must_use]
    pub fn kind(&self, id: NodeId) -> &NodeKind {
        &self.nodes[id.index()].kind
    }

    /// Ordered children of `id`.
    ///
    /// # Panics
    ///
    /// Panics if `id` does not belong to this tree.
    #[must_use]
    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.index()].children
    }

    /// Parent of `id`, `None` for the root.
    #[must_use]
    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.parents.get(id.index()).copied().flatten()
    }

    /// `true` if `id` addresses a node of this tree.
    #[must_use]
    pub fn contains(&self, id: NodeId) -> bool {
        id.index() < self.nodes.len()
    }

    /// Every node exactly once, in deterministic pre-order.
    pub fn all_nodes(&self) -> impl ExactSizeIterator<Item = NodeId> + DoubleEndedIterator {
        (0..self.nodes.len()).map(NodeId::from_index)
    }

    /// Strict ancestors of `id`, nearest first, ending at the root.
    pub fn ancestors(&self, id: NodeId) -> impl Iterator<Item = NodeId> + '_ {
        std::iter::successors(self.parent(id), move |&n| self.parent(n))
    }

    /// Number of strict ancestors of `id`.
    #[must_use]
    pub fn depth_of(&self, id: NodeId) -> usize {
        self.ancestors(id).count()
    }

    /// Number of nodes in the subtree rooted at `id` (including `id`).
    #[must_use]
    pub fn subtree_size(&self, id: NodeId) -> usize {
        1 + self
            .children(id)
            .iter()
            .map(|&c| self.subtree_size(c))
            .sum::<usize>()
    }

    /// Child positions leading from the root to `id`.
    ///
    /// The root's path is empty.
    #[must_use]
    pub fn find_path(&self, id: NodeId) -> Vec<usize> {
        let mut path = Vec::new();
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            let position = self
                .children(parent)
                .iter()
                .position(|&c| c == current)
                .unwrap_or_default();
            path.push(position);
            current = parent;
        }
        path.reverse();
        path
    }

    /// Resolve a path produced by [`Ast::find_path`].
    #[must_use]
    pub fn node_at_path(&self, path: &[usize]) -> Option<NodeId> {
        path.iter()
            .try_fold(self.root(), |node, &i| self.children(node).get(i).copied())
    }

    /// The statement directly under the `Program` root, if any.
    #[must_use]
    pub fn program_body(&self) -> Option<NodeId> {
        match self.kind(self.root()) {
            NodeKind::Program => self.children(self.root()).first().copied(),
            _ => None,
        }
    }

    /// The grammar slot `id` occupies in its parent, `None` for the root.
    #[must_use]
    pub fn slot_of(&self, id: NodeId) -> Option<Slot> {
        let parent = self.parent(id)?;
        let index = self.children(parent).iter().position(|&c| c == id)?;
        Slot::for_child(self.kind(parent), index)
    }

    /// First `Hole` in pre-order, if any.
    #[must_use]
    pub fn first_hole(&self) -> Option<NodeId> {
        self.all_nodes()
            .find(|&id| matches!(self.kind(id), NodeKind::Hole(_)))
    }

    /// `true` when the tree contains no `Hole`.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.first_hole().is_none()
    }

    /// Number of control-flow levels (`While`, `If`, `IfElse`, `Repeat`)
    /// enclosing the deepest statement.
    #[must_use]
    pub fn nesting_depth(&self) -> usize {
        self.all_nodes()
            .filter(|&id| self.kind(id).category() == Category::Statement)
            .map(|id| {
                self.ancestors(id)
                    .filter(|&a| {
                        matches!(
                            self.kind(a),
                            NodeKind::While | NodeKind::If | NodeKind::IfElse | NodeKind::Repeat
                        )
                    })
                    .count()
            })
            .max()
            .unwrap_or(0)
    }

    /// Check every structural invariant against `vocab`.
    ///
    /// # Errors
    ///
    /// Returns the first violation found in pre-order.
    pub fn validate(&self, vocab: &Vocabulary) -> Result<(), AstError> {
        let root_kind = self.kind(self.root());
        if *root_kind != NodeKind::Program {
            return Err(AstError::RootNotProgram {
                found: root_kind.label(),
            });
        }
        for id in self.all_nodes() {
            let kind = self.kind(id);
            let children = self.children(id);
            if children.len() != kind.arity() {
                return Err(AstError::Arity {
                    node: id,
                    kind: kind.label(),
                    expected: kind.arity(),
                    found: children.len(),
                });
            }
            for (index, &child) in children.iter().enumerate() {
                let Some(slot) = Slot::for_child(kind, index) else {
                    continue;
                };
                let child_kind = self.kind(child);
                if child_kind.category() != slot.category() {
                    return Err(AstError::ChildCategory {
                        node: id,
                        index,
                        expected: slot.category(),
                        found: child_kind.label(),
                    });
                }
            }
            match kind {
                NodeKind::Concatenate => {
                    if *self.kind(children[0]) == NodeKind::Concatenate {
                        return Err(AstError::LeftNestedConcatenate { node: id });
                    }
                }
                NodeKind::Int(count) if *count > MAX_REPEAT => {
                    return Err(AstError::RepeatOutOfRange {
                        node: id,
                        count: *count,
                    });
                }
                NodeKind::Action(name) if !vocab.has_action(name) => {
                    return Err(AstError::UnknownAction {
                        node: id,
                        name: name.clone(),
                    });
                }
                NodeKind::Perception { name, params } => {
                    let spec = vocab
                        .perception(name)
                        .ok_or_else(|| AstError::UnknownPerception {
                            node: id,
                            name: name.clone(),
                        })?;
                    spec.check_params(params)
                        .map_err(|detail| AstError::InvalidParameters {
                            node: id,
                            name: name.clone(),
                            detail,
                        })?;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// A copy of this tree with the subtree at `target` replaced by whatever
    /// `build` adds to the builder.
    ///
    /// `build` receives the builder and this tree, so it may import parts of
    /// the replaced subtree.
    #[must_use]
    pub fn with_replacement<F>(&self, target: NodeId, build: F) -> Ast
    where
        F: FnOnce(&mut AstBuilder, &Ast) -> NodeId,
    {
        let mut builder = AstBuilder::new();
        let mut build = Some(build);
        let root = self.import_into(&mut builder, self.root(), target, &mut build);
        builder.finish(root)
    }

    fn import_into<F>(
        &self,
        builder: &mut AstBuilder,
        id: NodeId,
        target: NodeId,
        build: &mut Option<F>,
    ) -> NodeId
    where
        F: FnOnce(&mut AstBuilder, &Ast) -> NodeId,
    {
        if id == target {
            if let Some(f) = build.take() {
                return f(builder, self);
            }
        }
        let children: Vec<NodeId> = self
            .children(id)
            .iter()
            .map(|&c| self.import_into(builder, c, target, build))
            .collect();
        builder.push(self.kind(id).clone(), children)
    }
}

/// Incremental constructor for [`Ast`].
///
/// Children must be created before their parent. [`AstBuilder::finish`]
/// keeps only the nodes reachable from the chosen root and lays them out in
/// pre-order.
#[derive(Debug, Clone, Default)]
pub struct AstBuilder {
    nodes: Vec<Node>,
}

impl AstBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a node with explicit children.
    ///
    /// Crate-private so every tree built outside the kernel goes through the
    /// typed constructors, which fix each kind's arity.
    pub(crate) fn push(&mut self, kind: NodeKind, children: Vec<NodeId>) -> NodeId {
        let id = NodeId::from_index(self.nodes.len());
        debug_assert!(children.iter().all(|&c| c < id), "children precede parent");
        debug_assert_eq!(
            children.len(),
            kind.arity(),
            "arity of {} node",
            kind.label()
        );
        self.nodes.push(Node { kind, children });
        id
    }

    pub fn action(&mut self, name: &str) -> NodeId {
        self.push(NodeKind::Action(name.to_string()), Vec::new())
    }

    pub fn perception(&mut self, name: &str) -> NodeId {
        self.perception_with(name, &[])
    }

    pub fn perception_with(&mut self, name: &str, params: &[&str]) -> NodeId {
        self.push(
            NodeKind::Perception {
                name: name.to_string(),
                params: params.iter().map(|p| (*p).to_string()).collect(),
            },
            Vec::new(),
        )
    }

    pub fn not(&mut self, condition: NodeId) -> NodeId {
        self.push(NodeKind::Not, vec![condition])
    }

    pub fn while_loop(&mut self, condition: NodeId, body: NodeId) -> NodeId {
        self.push(NodeKind::While, vec![condition, body])
    }

    pub fn if_then(&mut self, condition: NodeId, then: NodeId) -> NodeId {
        self.push(NodeKind::If, vec![condition, then])
    }

    pub fn if_else(&mut self, condition: NodeId, then: NodeId, otherwise: NodeId) -> NodeId {
        self.push(NodeKind::IfElse, vec![condition, then, otherwise])
    }

    /// Bare integer literal, for replacing the count under a `Repeat`.
    pub fn int(&mut self, count: u8) -> NodeId {
        self.push(NodeKind::Int(count), Vec::new())
    }

    /// `Repeat` with its integer literal child.
    pub fn repeat(&mut self, count: u8, body: NodeId) -> NodeId {
        let count = self.int(count);
        self.push(NodeKind::Repeat, vec![count, body])
    }

    pub fn concat(&mut self, first: NodeId, rest: NodeId) -> NodeId {
        self.push(NodeKind::Concatenate, vec![first, rest])
    }

    /// Right-associated `Concatenate` chain over `statements`.
    ///
    /// Returns `None` for an empty slice.
    pub fn sequence(&mut self, statements: &[NodeId]) -> Option<NodeId> {
        let (&last, init) = statements.split_last()?;
        Some(init.iter().rev().fold(last, |rest, &s| self.concat(s, rest)))
    }

    pub fn hole(&mut self, kind: HoleKind) -> NodeId {
        self.push(NodeKind::Hole(kind), Vec::new())
    }

    /// Copy the subtree of `source` rooted at `id` into this builder.
    pub fn import(&mut self, source: &Ast, id: NodeId) -> NodeId {
        let children: Vec<NodeId> = source
            .children(id)
            .iter()
            .map(|&c| self.import(source, c))
            .collect();
        self.push(source.kind(id).clone(), children)
    }

    /// Wrap `body` in a `Program` root and assemble the tree.
    #[must_use]
    pub fn program(mut self, body: NodeId) -> Ast {
        let root = self.push(NodeKind::Program, vec![body]);
        self.finish(root)
    }

    /// Assemble the tree rooted at `root`, in pre-order, with a fresh parent table.
    #[must_use]
    pub fn finish(self, root: NodeId) -> Ast {
        let mut nodes = Vec::with_capacity(self.nodes.len());
        let mut parents = Vec::with_capacity(self.nodes.len());
        copy_preorder(&self.nodes, root, None, &mut nodes, &mut parents);
        Ast { nodes, parents }
    }
}

fn copy_preorder(
    source: &[Node],
    id: NodeId,
    parent: Option<NodeId>,
    nodes: &mut Vec<Node>,
    parents: &mut Vec<Option<NodeId>>,
) -> NodeId {
    let new_id = NodeId::from_index(nodes.len());
    let node = &source[id.index()];
    nodes.push(Node {
        kind: node.kind.clone(),
        children: Vec::with_capacity(node.children.len()),
    });
    parents.push(parent);
    for &child in &node.children {
        let new_child = copy_preorder(source, child, Some(new_id), nodes, parents);
        nodes[new_id.index()].children.push(new_child);
    }
    new_id
}
