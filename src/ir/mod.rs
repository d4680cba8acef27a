//! Intermediate representation consumed by the compiler core.
//!
//! The IR is a tree of de Bruijn-indexed terms held in an arena. Besides the
//! ordinary lambda-calculus nodes it has two *sharing* nodes:
//!
//! - `Letted` marks a value that should be evaluated once and referenced
//!   from every place an equal value occurs, bound as locally as possible.
//! - `Hoisted` marks a closed value that is bound once at the top of the
//!   program.
//!
//! `resolve` eliminates both kinds; `lower` then turns the sharing-free tree
//! into a UPLC `Term`.
//!
//! Nodes are addressed by `NodeId`. Every slot caches the node's structural
//! hash and its parent, so a child can be swapped in place and the hashes
//! above it refreshed without touching the rest of the tree.

mod display;
pub mod debruijn;
pub mod error;
pub mod hash;
pub mod lower;
pub mod navigate;
pub mod resolve;

pub use error::IntegrityError;
pub use hash::ContentHash;

use crate::uplc::{Constant, DefaultFunction};

// ─── Nodes ─────────────────────────────────────────────────────────

/// Index of a node in its `IRTree`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum IRNode {
    /// Bound variable; 0 is the innermost binder.
    Var(u32),
    /// Introduces `arity` binders at once.
    Func { arity: u32, body: NodeId },
    App { func: NodeId, arg: NodeId },
    Delayed(NodeId),
    Forced(NodeId),
    /// Shared value; `dbn` is the number of binders enclosing this node.
    Letted { dbn: u32, value: NodeId },
    /// Shared closed value, bound at the top of the program.
    Hoisted(NodeId),
    Const(Constant),
    Builtin(DefaultFunction),
    Error,
}

impl IRNode {
    /// Child slots in evaluation order (function before argument).
    pub fn child_slots(&self) -> [Option<NodeId>; 2] {
        match self {
            IRNode::App { func, arg } => [Some(*func), Some(*arg)],
            IRNode::Func { body, .. } => [Some(*body), None],
            IRNode::Delayed(t) | IRNode::Forced(t) | IRNode::Hoisted(t) => [Some(*t), None],
            IRNode::Letted { value, .. } => [Some(*value), None],
            IRNode::Var(_) | IRNode::Const(_) | IRNode::Builtin(_) | IRNode::Error => {
                [None, None]
            }
        }
    }

    pub fn children(&self) -> impl Iterator<Item = NodeId> {
        self.child_slots().into_iter().flatten()
    }

    /// Number of binders this node introduces for its children.
    pub fn binders(&self) -> u32 {
        match self {
            IRNode::Func { arity, .. } => *arity,
            _ => 0,
        }
    }

    pub fn is_sharing(&self) -> bool {
        matches!(self, IRNode::Letted { .. } | IRNode::Hoisted(_))
    }

    /// The shared value of a `Letted` or `Hoisted` node.
    pub fn shared_value(&self) -> Option<NodeId> {
        match self {
            IRNode::Letted { value, .. } | IRNode::Hoisted(value) => Some(*value),
            _ => None,
        }
    }
}

#[derive(Clone, Debug)]
struct Slot {
    node: IRNode,
    hash: ContentHash,
    parent: Option<NodeId>,
}

// ─── Tree ──────────────────────────────────────────────────────────

/// Arena-backed IR tree.
///
/// Build nodes bottom-up with the constructor methods, then call
/// `set_root`, which validates the reachable tree. Nodes that end up
/// unreachable simply stay in the arena.
#[derive(Clone, Debug, Default)]
pub struct IRTree {
    slots: Vec<Slot>,
    root: Option<NodeId>,
}

impl IRTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn root(&self) -> Option<NodeId> {
        self.root
    }

    pub(crate) fn require_root(&self) -> Result<NodeId, IntegrityError> {
        self.root.ok_or(IntegrityError::MissingRoot)
    }

    /// Hash of the whole tree.
    pub fn root_hash(&self) -> Option<ContentHash> {
        self.root.map(|r| self.hash(r))
    }

    pub fn node(&self, id: NodeId) -> &IRNode {
        &self.slots[id.index()].node
    }

    pub fn hash(&self, id: NodeId) -> ContentHash {
        self.slots[id.index()].hash
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.slots[id.index()].parent
    }

    /// Number of arena slots, reachable or not.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    fn contains(&self, id: NodeId) -> bool {
        id.index() < self.slots.len()
    }

    // ── Construction ──

    fn alloc(&mut self, node: IRNode) -> NodeId {
        let id = NodeId(self.slots.len() as u32);
        let hash = hash::node_hash(&node, |c| self.hash(c));
        for child in node.children() {
            self.slots[child.index()].parent = Some(id);
        }
        self.slots.push(Slot {
            node,
            hash,
            parent: None,
        });
        id
    }

    pub fn var(&mut self, index: u32) -> NodeId {
        self.alloc(IRNode::Var(index))
    }

    pub fn func(&mut self, arity: u32, body: NodeId) -> NodeId {
        self.alloc(IRNode::Func { arity, body })
    }

    /// Application node. Using one node as both children is rejected: the
    /// two slots could never be told apart when rewriting.
    pub fn app(&mut self, func: NodeId, arg: NodeId) -> Result<NodeId, IntegrityError> {
        if func == arg {
            return Err(IntegrityError::IdenticalAppChildren {
                child: self.hash(func),
            });
        }
        Ok(self.alloc(IRNode::App { func, arg }))
    }

    pub fn delayed(&mut self, term: NodeId) -> NodeId {
        self.alloc(IRNode::Delayed(term))
    }

    pub fn forced(&mut self, term: NodeId) -> NodeId {
        self.alloc(IRNode::Forced(term))
    }

    pub fn letted(&mut self, dbn: u32, value: NodeId) -> NodeId {
        self.alloc(IRNode::Letted { dbn, value })
    }

    pub fn hoisted(&mut self, value: NodeId) -> NodeId {
        self.alloc(IRNode::Hoisted(value))
    }

    pub fn constant(&mut self, value: Constant) -> NodeId {
        self.alloc(IRNode::Const(value))
    }

    pub fn builtin(&mut self, fun: DefaultFunction) -> NodeId {
        self.alloc(IRNode::Builtin(fun))
    }

    pub fn error(&mut self) -> NodeId {
        self.alloc(IRNode::Error)
    }

    /// Deep-copy the subtree at `id` into fresh slots.
    pub fn clone_subtree(&mut self, id: NodeId) -> Result<NodeId, IntegrityError> {
        // Post-order: children are copied before their parent.
        let mut stack: Vec<(NodeId, bool)> = vec![(id, false)];
        let mut copies: Vec<NodeId> = Vec::new();
        let pop = |copies: &mut Vec<NodeId>, at: NodeId| {
            copies.pop().ok_or(IntegrityError::DanglingNode(at.0))
        };
        while let Some((current, expanded)) = stack.pop() {
            if !self.contains(current) {
                return Err(IntegrityError::DanglingNode(current.0));
            }
            let node = self.node(current).clone();
            if !expanded {
                stack.push((current, true));
                let [a, b] = node.child_slots();
                for child in [b, a].into_iter().flatten() {
                    stack.push((child, false));
                }
                continue;
            }
            let copy = match node {
                IRNode::Func { arity, .. } => IRNode::Func {
                    arity,
                    body: pop(&mut copies, current)?,
                },
                IRNode::App { .. } => {
                    let arg = pop(&mut copies, current)?;
                    let func = pop(&mut copies, current)?;
                    IRNode::App { func, arg }
                }
                IRNode::Delayed(_) => IRNode::Delayed(pop(&mut copies, current)?),
                IRNode::Forced(_) => IRNode::Forced(pop(&mut copies, current)?),
                IRNode::Hoisted(_) => IRNode::Hoisted(pop(&mut copies, current)?),
                IRNode::Letted { dbn, .. } => IRNode::Letted {
                    dbn,
                    value: pop(&mut copies, current)?,
                },
                leaf => leaf,
            };
            copies.push(self.alloc(copy));
        }
        pop(&mut copies, id)
    }

    /// Make `root` the root of the tree after validating everything
    /// reachable from it.
    ///
    /// Checks that no node is reachable twice, that no application uses one
    /// node for both children, that every variable is bound, that every
    /// `Letted` records its real binder depth and that every `Hoisted`
    /// value is closed. Parent links are rebuilt from the reachable tree.
    pub fn set_root(&mut self, root: NodeId) -> Result<(), IntegrityError> {
        if !self.contains(root) {
            return Err(IntegrityError::DanglingNode(root.0));
        }
        let mut seen = vec![false; self.slots.len()];
        // (node, parent, depth, binder depth at the innermost enclosing hoisted)
        let mut stack: Vec<(NodeId, Option<NodeId>, u32, Option<u32>)> =
            vec![(root, None, 0, None)];

        while let Some((id, parent, depth, hoist_base)) = stack.pop() {
            if !self.contains(id) {
                return Err(IntegrityError::DanglingNode(id.0));
            }
            if seen[id.index()] {
                return Err(IntegrityError::SharedNode {
                    hash: self.hash(id),
                });
            }
            seen[id.index()] = true;
            self.slots[id.index()].parent = parent;

            let node = self.node(id);
            match node {
                IRNode::Var(index) => {
                    if *index >= depth {
                        return Err(IntegrityError::UnboundVariable {
                            index: *index,
                            depth,
                        });
                    }
                    if let Some(base) = hoist_base {
                        if depth - 1 - index < base {
                            return Err(IntegrityError::OpenHoisted {
                                hash: self.hash(id),
                            });
                        }
                    }
                }
                IRNode::App { func, arg } if func == arg => {
                    return Err(IntegrityError::IdenticalAppChildren {
                        child: self.hash(*func),
                    });
                }
                IRNode::Letted { dbn, .. } if *dbn != depth => {
                    return Err(IntegrityError::LettedDepthMismatch {
                        hash: self.hash(id),
                        recorded: *dbn,
                        actual: depth,
                    });
                }
                _ => {}
            }

            let inner_base = match node {
                IRNode::Hoisted(_) => Some(depth),
                _ => hoist_base,
            };
            let inner_depth = depth + node.binders();
            let [a, b] = node.child_slots();
            for child in [b, a].into_iter().flatten() {
                stack.push((child, Some(id), inner_depth, inner_base));
            }
        }

        self.refresh_hashes(root);
        self.root = Some(root);
        Ok(())
    }

    // ── In-place mutation (used by the resolution passes) ──

    pub(crate) fn set_root_unchecked(&mut self, root: NodeId) {
        self.slots[root.index()].parent = None;
        self.root = Some(root);
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut IRNode {
        &mut self.slots[id.index()].node
    }

    pub(crate) fn set_parent(&mut self, id: NodeId, parent: Option<NodeId>) {
        self.slots[id.index()].parent = parent;
    }

    /// Recompute the hash of `id` from its children's cached hashes.
    pub(crate) fn rehash(&mut self, id: NodeId) {
        let hash = hash::node_hash(self.node(id), |c| self.hash(c));
        self.slots[id.index()].hash = hash;
    }

    /// Recompute the hashes of `id` and every ancestor up to the root.
    pub(crate) fn rehash_upwards(&mut self, id: NodeId) {
        let mut current = Some(id);
        while let Some(node) = current {
            self.rehash(node);
            current = self.parent(node);
        }
    }

    /// Recompute every hash in the subtree at `id`, bottom-up.
    pub(crate) fn refresh_hashes(&mut self, id: NodeId) {
        let mut stack: Vec<(NodeId, bool)> = vec![(id, false)];
        while let Some((current, expanded)) = stack.pop() {
            if expanded {
                self.rehash(current);
                continue;
            }
            stack.push((current, true));
            for child in self.node(current).children() {
                stack.push((child, false));
            }
        }
    }
}
