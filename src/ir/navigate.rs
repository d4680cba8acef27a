//! Tree navigation and in-place rewriting.
//!
//! All traversals use an explicit stack so arbitrarily deep programs never
//! exhaust the call stack. Child replacement locates the slot to rewrite by
//! structural hash, so the node handed in as "current child" may be a clone
//! of the one actually stored.

use super::{IRNode, IRTree, IntegrityError, NodeId};

// ─── Walking ───────────────────────────────────────────────────────

/// One node reached by `Walk`, with its position in the tree.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Visit {
    pub id: NodeId,
    /// Number of binders enclosing the node.
    pub depth: u32,
    /// Number of `Letted`/`Hoisted` nodes enclosing the node.
    pub nesting: u32,
}

/// Pre-order traversal, function before argument.
pub struct Walk<'a> {
    tree: &'a IRTree,
    stack: Vec<Visit>,
}

impl<'a> Walk<'a> {
    pub fn new(tree: &'a IRTree, from: NodeId, depth: u32) -> Self {
        Self {
            tree,
            stack: vec![Visit {
                id: from,
                depth,
                nesting: 0,
            }],
        }
    }
}

impl Iterator for Walk<'_> {
    type Item = Visit;

    fn next(&mut self) -> Option<Visit> {
        let visit = self.stack.pop()?;
        let node = self.tree.node(visit.id);
        let depth = visit.depth + node.binders();
        let nesting = visit.nesting + node.is_sharing() as u32;
        let [a, b] = node.child_slots();
        for child in [b, a].into_iter().flatten() {
            self.stack.push(Visit {
                id: child,
                depth,
                nesting,
            });
        }
        Some(visit)
    }
}

/// Every node under `from` (inclusive) matching `predicate`, in discovery
/// order.
pub fn find_all(
    tree: &IRTree,
    from: NodeId,
    predicate: impl Fn(&IRNode) -> bool,
) -> Vec<NodeId> {
    Walk::new(tree, from, 0)
        .filter(|v| predicate(tree.node(v.id)))
        .map(|v| v.id)
        .collect()
}

// ─── Ancestry ──────────────────────────────────────────────────────

/// Nodes from the root down to `id`, inclusive.
pub fn path_from_root(tree: &IRTree, id: NodeId) -> Vec<NodeId> {
    let mut path = vec![id];
    let mut current = id;
    while let Some(parent) = tree.parent(current) {
        path.push(parent);
        current = parent;
    }
    path.reverse();
    path
}

/// Number of binders enclosing `id`.
pub fn depth_of(tree: &IRTree, id: NodeId) -> u32 {
    let mut depth = 0;
    let mut current = tree.parent(id);
    while let Some(node) = current {
        depth += tree.node(node).binders();
        current = tree.parent(node);
    }
    depth
}

/// Whether `ancestor` is `id` or lies on the path from the root to `id`.
pub fn is_ancestor_or_self(tree: &IRTree, ancestor: NodeId, id: NodeId) -> bool {
    let mut current = Some(id);
    while let Some(node) = current {
        if node == ancestor {
            return true;
        }
        current = tree.parent(node);
    }
    false
}

/// Deepest node that is an ancestor of (or equal to) every node in `ids`.
pub fn lowest_common_ancestor(tree: &IRTree, ids: &[NodeId]) -> Option<NodeId> {
    let (first, rest) = ids.split_first()?;
    let mut common = path_from_root(tree, *first);
    for id in rest {
        let path = path_from_root(tree, *id);
        let shared = common
            .iter()
            .zip(path.iter())
            .take_while(|(a, b)| a == b)
            .count();
        common.truncate(shared);
    }
    common.last().copied()
}

/// The `Func` that introduces binder `level`, seen from `id` which sits
/// under `depth` binders.
pub fn binder_at_level(tree: &IRTree, id: NodeId, depth: u32, level: u32) -> Option<NodeId> {
    let mut child_depth = depth;
    let mut current = tree.parent(id);
    while let Some(node) = current {
        let arity = tree.node(node).binders();
        let node_depth = child_depth.checked_sub(arity)?;
        if arity > 0 && node_depth <= level && level < child_depth {
            return Some(node);
        }
        child_depth = node_depth;
        current = tree.parent(node);
    }
    None
}

// ─── Rewriting ─────────────────────────────────────────────────────

/// Replace the child of `parent` that matches `current` by hash with `new`.
///
/// When both children of an application match, the one that *is*
/// `current` wins; if neither is, the match is ambiguous. Hashes are
/// refreshed from `parent` up to the root.
pub fn replace_child(
    tree: &mut IRTree,
    parent: Option<NodeId>,
    current: NodeId,
    new: NodeId,
) -> Result<(), IntegrityError> {
    let child_hash = tree.hash(current);
    let Some(parent) = parent else {
        return Err(IntegrityError::UndefinedParent { child: child_hash });
    };

    let replaced = match tree.node(parent).clone() {
        IRNode::App { func, arg } => {
            let func_matches = tree.hash(func) == child_hash;
            let arg_matches = tree.hash(arg) == child_hash;
            let replace_func = match (func_matches, arg_matches) {
                (true, true) if func == current => true,
                (true, true) if arg == current => false,
                (true, true) => {
                    return Err(IntegrityError::AmbiguousChild {
                        parent: tree.hash(parent),
                        child: child_hash,
                    })
                }
                (true, false) => true,
                (false, true) => false,
                (false, false) => {
                    return Err(IntegrityError::UnknownAppChild {
                        child: child_hash,
                        func: tree.hash(func),
                        arg: tree.hash(arg),
                    })
                }
            };
            if replace_func {
                *tree.node_mut(parent) = IRNode::App { func: new, arg };
                func
            } else {
                *tree.node_mut(parent) = IRNode::App { func, arg: new };
                arg
            }
        }
        node => {
            let Some(only) = node.child_slots()[0] else {
                return Err(IntegrityError::UnknownChild {
                    parent: tree.hash(parent),
                    child: child_hash,
                });
            };
            if tree.hash(only) != child_hash {
                return Err(IntegrityError::UnknownChild {
                    parent: tree.hash(parent),
                    child: child_hash,
                });
            }
            *tree.node_mut(parent) = match node {
                IRNode::Func { arity, .. } => IRNode::Func { arity, body: new },
                IRNode::Delayed(_) => IRNode::Delayed(new),
                IRNode::Forced(_) => IRNode::Forced(new),
                IRNode::Hoisted(_) => IRNode::Hoisted(new),
                IRNode::Letted { dbn, .. } => IRNode::Letted { dbn, value: new },
                leaf => leaf,
            };
            only
        }
    };

    if tree.parent(replaced) == Some(parent) {
        tree.set_parent(replaced, None);
    }
    tree.set_parent(new, Some(parent));
    tree.rehash_upwards(parent);
    Ok(())
}

/// Replace `current` wherever it sits: in its parent, or as the root.
pub(crate) fn replace_node(
    tree: &mut IRTree,
    current: NodeId,
    new: NodeId,
) -> Result<(), IntegrityError> {
    match tree.parent(current) {
        Some(parent) => replace_child(tree, Some(parent), current, new),
        None if tree.root() == Some(current) => {
            tree.set_root_unchecked(new);
            tree.set_parent(current, None);
            Ok(())
        }
        None => Err(IntegrityError::UndefinedParent {
            child: tree.hash(current),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uplc::Constant;

    /// `(func 1 [(var 0) (con integer 1)])`
    fn small_tree() -> (IRTree, NodeId, NodeId, NodeId) {
        let mut t = IRTree::new();
        let v = t.var(0);
        let c = t.constant(Constant::integer(1));
        let app = t.app(v, c).unwrap();
        let f = t.func(1, app);
        t.set_root(f).unwrap();
        (t, app, v, c)
    }

    #[test]
    fn walk_tracks_depth_and_order() {
        let (t, app, v, c) = small_tree();
        let visits: Vec<Visit> = Walk::new(&t, t.root().unwrap(), 0).collect();
        let ids: Vec<NodeId> = visits.iter().map(|v| v.id).collect();
        assert_eq!(ids, vec![t.root().unwrap(), app, v, c]);
        assert_eq!(visits[0].depth, 0);
        assert_eq!(visits[2].depth, 1);
    }

    #[test]
    fn find_all_matches_predicate() {
        let (t, _, v, _) = small_tree();
        let vars = find_all(&t, t.root().unwrap(), |n| matches!(n, IRNode::Var(_)));
        assert_eq!(vars, vec![v]);
    }

    #[test]
    fn find_all_handles_deep_nesting() {
        let mut t = IRTree::new();
        let mut id = t.error();
        for _ in 0..200_000 {
            id = t.delayed(id);
        }
        t.set_root(id).unwrap();
        let errors = find_all(&t, id, |n| matches!(n, IRNode::Error));
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn replace_child_updates_matching_slot_only() {
        let (mut t, app, v, c) = small_tree();
        let before = t.root_hash();
        let new = t.constant(Constant::integer(2));
        replace_child(&mut t, Some(app), c, new).unwrap();
        assert_eq!(
            t.node(app),
            &IRNode::App {
                func: v,
                arg: new
            }
        );
        assert_eq!(t.parent(new), Some(app));
        assert_ne!(t.root_hash(), before);
    }

    #[test]
    fn replace_child_accepts_a_clone_of_the_child() {
        let (mut t, app, v, c) = small_tree();
        let clone = t.clone_subtree(v).unwrap();
        let new = t.error();
        replace_child(&mut t, Some(app), clone, new).unwrap();
        assert_eq!(t.node(app), &IRNode::App { func: new, arg: c });
    }

    #[test]
    fn replace_child_picks_exact_node_among_equal_children() {
        let mut t = IRTree::new();
        let a = t.var(0);
        let b = t.var(0);
        let app = t.app(a, b).unwrap();
        let f = t.func(1, app);
        t.set_root(f).unwrap();

        let new = t.error();
        replace_child(&mut t, Some(app), b, new).unwrap();
        assert_eq!(t.node(app), &IRNode::App { func: a, arg: new });
    }

    #[test]
    fn replace_child_reports_ambiguous_clone() {
        let mut t = IRTree::new();
        let a = t.var(0);
        let b = t.var(0);
        let app = t.app(a, b).unwrap();
        let f = t.func(1, app);
        t.set_root(f).unwrap();

        let clone = t.var(0);
        let new = t.error();
        assert!(matches!(
            replace_child(&mut t, Some(app), clone, new),
            Err(IntegrityError::AmbiguousChild { .. })
        ));
    }

    #[test]
    fn replace_child_rejects_unknown_child() {
        let (mut t, app, _, _) = small_tree();
        let stranger = t.constant(Constant::integer(99));
        let new = t.error();
        assert!(matches!(
            replace_child(&mut t, Some(app), stranger, new),
            Err(IntegrityError::UnknownAppChild { .. })
        ));
        let root = t.root().unwrap();
        assert!(matches!(
            replace_child(&mut t, Some(root), stranger, new),
            Err(IntegrityError::UnknownChild { .. })
        ));
    }

    #[test]
    fn replace_child_requires_parent() {
        let (mut t, _, v, _) = small_tree();
        let new = t.error();
        assert!(matches!(
            replace_child(&mut t, None, v, new),
            Err(IntegrityError::UndefinedParent { .. })
        ));
    }

    #[test]
    fn lca_of_siblings_is_their_application() {
        let (t, app, v, c) = small_tree();
        assert_eq!(lowest_common_ancestor(&t, &[v, c]), Some(app));
        assert_eq!(lowest_common_ancestor(&t, &[v]), Some(v));
        assert_eq!(lowest_common_ancestor(&t, &[]), None);
    }

    #[test]
    fn binder_lookup_spans_multi_arity_funcs() {
        // (func 2 (func 1 (var 0)))
        let mut t = IRTree::new();
        let v = t.var(0);
        let inner = t.func(1, v);
        let outer = t.func(2, inner);
        t.set_root(outer).unwrap();
        assert_eq!(binder_at_level(&t, v, 3, 2), Some(inner));
        assert_eq!(binder_at_level(&t, v, 3, 1), Some(outer));
        assert_eq!(binder_at_level(&t, v, 3, 0), Some(outer));
        assert_eq!(binder_at_level(&t, v, 3, 3), None);
        assert_eq!(depth_of(&t, v), 3);
        assert_eq!(depth_of(&t, inner), 2);
        assert!(is_ancestor_or_self(&t, outer, v));
        assert!(!is_ancestor_or_self(&t, v, outer));
    }
}
