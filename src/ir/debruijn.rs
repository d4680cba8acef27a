//! De Bruijn renumbering for relocated subtrees.

use super::{IRNode, IRTree, IntegrityError, NodeId};

/// Shift every variable that escapes the subtree at `id` by `delta`.
///
/// Variables bound by a `Func` inside the subtree are left alone. Recorded
/// `Letted` depths move by `delta` too, since every node of the subtree
/// changes depth by the same amount. Subtrees rooted at a node in `skip`
/// are not visited at all. Hashes in the subtree are refreshed afterwards.
pub fn shift_free(
    tree: &mut IRTree,
    id: NodeId,
    delta: i64,
    skip: &[NodeId],
) -> Result<(), IntegrityError> {
    if delta == 0 {
        return Ok(());
    }

    let mut stack: Vec<(NodeId, u32)> = vec![(id, 0)];
    while let Some((current, local)) = stack.pop() {
        if skip.contains(&current) {
            continue;
        }
        match tree.node(current).clone() {
            IRNode::Var(index) if index >= local => {
                let shifted = shift(index, delta).ok_or(IntegrityError::UnboundVariable {
                    index,
                    depth: local,
                })?;
                *tree.node_mut(current) = IRNode::Var(shifted);
            }
            IRNode::Letted { dbn, value } => {
                let shifted = shift(dbn, delta).ok_or(IntegrityError::LettedDepthMismatch {
                    hash: tree.hash(current),
                    recorded: dbn,
                    actual: 0,
                })?;
                *tree.node_mut(current) = IRNode::Letted {
                    dbn: shifted,
                    value,
                };
                stack.push((value, local));
            }
            node => {
                let inner = local + node.binders();
                for child in node.children() {
                    stack.push((child, inner));
                }
            }
        }
    }

    tree.refresh_hashes(id);
    Ok(())
}

fn shift(value: u32, delta: i64) -> Option<u32> {
    u32::try_from(i64::from(value) + delta).ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    /// `(func 1 [(var 0) (var 2)])`, to be placed under two outer binders.
    fn overlapping() -> (IRTree, NodeId, NodeId, NodeId) {
        let mut t = IRTree::new();
        let bound = t.var(0);
        let free = t.var(2);
        let app = t.app(bound, free).unwrap();
        let f = t.func(1, app);
        (t, f, bound, free)
    }

    #[test]
    fn shifts_only_escaping_variables() {
        let (mut t, f, bound, free) = overlapping();
        shift_free(&mut t, f, 3, &[]).unwrap();
        assert_eq!(t.node(bound), &IRNode::Var(0));
        assert_eq!(t.node(free), &IRNode::Var(5));
    }

    #[test]
    fn negative_shift_toward_root() {
        let (mut t, f, bound, free) = overlapping();
        shift_free(&mut t, f, -1, &[]).unwrap();
        assert_eq!(t.node(bound), &IRNode::Var(0));
        assert_eq!(t.node(free), &IRNode::Var(1));
    }

    #[test]
    fn shift_below_zero_is_rejected() {
        let (mut t, f, _, _) = overlapping();
        assert!(matches!(
            shift_free(&mut t, f, -2, &[]),
            Err(IntegrityError::UnboundVariable { index: 2, depth: 1 })
        ));
    }

    #[test]
    fn multi_arity_binders_protect_all_their_indices() {
        // (func 3 [[(var 2) (var 1)] (var 3)])
        let mut t = IRTree::new();
        let v2 = t.var(2);
        let v1 = t.var(1);
        let inner = t.app(v2, v1).unwrap();
        let v3 = t.var(3);
        let app = t.app(inner, v3).unwrap();
        let f = t.func(3, app);
        shift_free(&mut t, f, 1, &[]).unwrap();
        assert_eq!(t.node(v2), &IRNode::Var(2));
        assert_eq!(t.node(v1), &IRNode::Var(1));
        assert_eq!(t.node(v3), &IRNode::Var(4));
    }

    #[test]
    fn letted_depth_moves_with_its_subtree() {
        let mut t = IRTree::new();
        let v = t.var(1);
        let l = t.letted(2, v);
        let f = t.func(1, l);
        shift_free(&mut t, f, 1, &[]).unwrap();
        assert_eq!(t.node(l), &IRNode::Letted { dbn: 3, value: v });
        assert_eq!(t.node(v), &IRNode::Var(2));
    }

    #[test]
    fn skipped_subtrees_are_untouched() {
        let (mut t, f, bound, free) = overlapping();
        shift_free(&mut t, f, 1, &[free]).unwrap();
        assert_eq!(t.node(bound), &IRNode::Var(0));
        assert_eq!(t.node(free), &IRNode::Var(2));
    }

    #[test]
    fn hashes_follow_the_shift() {
        let (mut t, f, _, _) = overlapping();
        let before = t.hash(f);
        shift_free(&mut t, f, 1, &[]).unwrap();
        assert_ne!(t.hash(f), before);
        shift_free(&mut t, f, -1, &[]).unwrap();
        assert_eq!(t.hash(f), before);
    }
}
