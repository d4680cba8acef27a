//! Lowering of a sharing-free IR tree to a UPLC `Term`.

use tracing::instrument;

use super::{IRNode, IRTree, IntegrityError, NodeId};
use crate::uplc::Term;

/// Convert the tree under the root into a `Term`.
///
/// A `Func` of arity n becomes n nested lambdas. Any `Letted` or `Hoisted`
/// node left in the tree is an error.
#[instrument(skip_all, name = "lower")]
pub fn lower(tree: &IRTree) -> Result<Term, IntegrityError> {
    let root = tree.require_root()?;
    lower_subtree(tree, root)
}

pub fn lower_subtree(tree: &IRTree, id: NodeId) -> Result<Term, IntegrityError> {
    let mut stack: Vec<(NodeId, bool)> = vec![(id, false)];
    let mut terms: Vec<Term> = Vec::new();

    while let Some((current, expanded)) = stack.pop() {
        let node = tree.node(current);
        if !expanded {
            if node.is_sharing() {
                return Err(IntegrityError::UnresolvedSharing {
                    hash: tree.hash(current),
                });
            }
            stack.push((current, true));
            let [a, b] = node.child_slots();
            for child in [b, a].into_iter().flatten() {
                stack.push((child, false));
            }
            continue;
        }

        let term = match node {
            IRNode::Var(index) => Term::Var(u64::from(*index)),
            IRNode::Func { arity, .. } => {
                let mut body = pop(&mut terms, current)?;
                for _ in 0..*arity {
                    body = Term::lambda(body);
                }
                body
            }
            IRNode::App { .. } => {
                let arg = pop(&mut terms, current)?;
                let func = pop(&mut terms, current)?;
                Term::apply(func, arg)
            }
            IRNode::Delayed(_) => Term::delay(pop(&mut terms, current)?),
            IRNode::Forced(_) => Term::force(pop(&mut terms, current)?),
            IRNode::Const(c) => Term::Constant(c.clone()),
            IRNode::Builtin(b) => Term::Builtin(*b),
            IRNode::Error => Term::Error,
            IRNode::Letted { .. } | IRNode::Hoisted(_) => {
                return Err(IntegrityError::UnresolvedSharing {
                    hash: tree.hash(current),
                })
            }
        };
        terms.push(term);
    }

    pop(&mut terms, id)
}

fn pop(terms: &mut Vec<Term>, at: NodeId) -> Result<Term, IntegrityError> {
    terms.pop().ok_or(IntegrityError::DanglingNode(at.0))
}
