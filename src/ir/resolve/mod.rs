//! Sharing resolution: eliminate every `Letted` and `Hoisted` node.
//!
//! Sharing nodes are grouped by sharing key and by the binder their value
//! depends on. Each group becomes one binding, `[(func 1 body) value]`,
//! spliced in above all of its occurrences, and every occurrence becomes a
//! variable pointing at that binding. A sharing node whose value is a bare
//! variable is replaced by the variable itself.
//!
//! Hoisted groups are bound first, in a chain directly above the program
//! body. Letted groups follow, each at the lowest common ancestor of its
//! occurrences. The tree is rescanned after every binding, so each group is
//! resolved against the already rewritten tree.

mod hoisted;
mod letted;
#[cfg(test)]
mod tests;

use std::collections::HashMap;

use tracing::{debug, instrument};

use super::debruijn::shift_free;
use super::hash::{sharing_key, SharingKey};
use super::navigate::{self, Walk};
use super::{ContentHash, IRNode, IRTree, IntegrityError, NodeId};

/// What one resolution run did.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Resolution {
    /// Sharing nodes replaced by their variable value.
    pub inlined: usize,
    /// Bindings introduced for hoisted groups.
    pub hoisted: usize,
    /// Bindings introduced for letted groups.
    pub letted: usize,
}

/// Resolve every sharing node of `tree`, then revalidate it.
#[instrument(skip_all, name = "resolve")]
pub fn resolve_sharing(tree: &mut IRTree) -> Result<Resolution, IntegrityError> {
    tree.require_root()?;
    let inlined = inline_variables(tree)?;
    let hoisted = hoisted::resolve_hoisted(tree)?;
    let letted = letted::resolve_letted(tree)?;

    let root = tree.require_root()?;
    tree.set_root(root)?;
    let resolution = Resolution {
        inlined,
        hoisted,
        letted,
    };
    debug!(?resolution, nodes = tree.len(), "sharing resolved");
    Ok(resolution)
}

// ─── Groups ────────────────────────────────────────────────────────

#[derive(Clone, Copy, Debug)]
pub(super) struct Occurrence {
    pub id: NodeId,
    pub value: NodeId,
    pub depth: u32,
}

#[derive(Debug)]
pub(super) struct Group {
    pub key: SharingKey,
    /// The `Func` binding the value's innermost free variable.
    pub binder: Option<NodeId>,
    pub occurrences: Vec<Occurrence>,
    pub max_depth: u32,
    pub nesting: u32,
    /// Pre-order position of the first occurrence.
    pub discovery: usize,
}

impl Group {
    pub fn ids(&self) -> Vec<NodeId> {
        self.occurrences.iter().map(|o| o.id).collect()
    }
}

/// Scan the tree for sharing nodes accepted by `kind` and group them.
pub(super) fn collect_groups(
    tree: &IRTree,
    kind: impl Fn(&IRNode) -> bool,
) -> Result<Vec<Group>, IntegrityError> {
    let root = tree.require_root()?;
    let mut groups: Vec<Group> = Vec::new();
    let mut index: HashMap<(ContentHash, Option<NodeId>), usize> = HashMap::new();

    for (discovery, visit) in Walk::new(tree, root, 0).enumerate() {
        let node = tree.node(visit.id);
        if !kind(node) {
            continue;
        }
        let Some(value) = node.shared_value() else {
            continue;
        };
        let key = sharing_key(tree, value, visit.depth)?;
        let binder = match key.deepest_free_level {
            Some(level) => Some(
                navigate::binder_at_level(tree, visit.id, visit.depth, level).ok_or(
                    IntegrityError::UnboundVariable {
                        index: visit.depth.saturating_sub(level + 1),
                        depth: visit.depth,
                    },
                )?,
            ),
            None => None,
        };

        let occurrence = Occurrence {
            id: visit.id,
            value,
            depth: visit.depth,
        };
        let slot = *index.entry((key.key, binder)).or_insert_with(|| {
            groups.push(Group {
                key,
                binder,
                occurrences: Vec::new(),
                max_depth: 0,
                nesting: 0,
                discovery,
            });
            groups.len() - 1
        });
        let group = &mut groups[slot];
        group.occurrences.push(occurrence);
        group.max_depth = group.max_depth.max(visit.depth);
        group.nesting = group.nesting.max(visit.nesting);
    }

    Ok(groups)
}

// ─── Rewriting ─────────────────────────────────────────────────────

/// Replace every sharing node whose value is a variable by that variable.
fn inline_variables(tree: &mut IRTree) -> Result<usize, IntegrityError> {
    let root = tree.require_root()?;
    let targets: Vec<(NodeId, NodeId)> = Walk::new(tree, root, 0)
        .filter_map(|v| {
            let value = tree.node(v.id).shared_value()?;
            matches!(tree.node(value), IRNode::Var(_)).then_some((v.id, value))
        })
        .collect();
    for (sharing, value) in &targets {
        navigate::replace_node(tree, *sharing, *value)?;
    }
    Ok(targets.len())
}

/// Bind `group` at `insert`, which sits under `depth` binders and is an
/// ancestor of (or equal to) every occurrence.
///
/// `insert` becomes the body of a new one-binder function applied to the
/// group's value. Returns the node that now fills the body position; this
/// differs from `insert` when `insert` was itself an occurrence.
pub(super) fn bind_group(
    tree: &mut IRTree,
    group: &Group,
    insert: NodeId,
    depth: u32,
) -> Result<NodeId, IntegrityError> {
    let Some(representative) = group.occurrences.first().copied() else {
        return Ok(insert);
    };
    let occurrences = group.ids();

    shift_free(tree, insert, 1, &occurrences)?;

    let mut body = insert;
    for occ in &group.occurrences {
        let index = occ
            .depth
            .checked_sub(depth)
            .ok_or(IntegrityError::OccurrenceOutsideScope {
                hash: tree.hash(occ.id),
            })?;
        let var = tree.var(index);
        navigate::replace_node(tree, occ.id, var)?;
        if occ.id == insert {
            body = var;
        }
    }

    let value = representative.value;
    shift_free(
        tree,
        value,
        i64::from(depth) - i64::from(representative.depth),
        &[],
    )?;

    let parent = tree.parent(body);
    let is_root = tree.root() == Some(body);
    let func = tree.func(1, body);
    let app = tree.app(func, value)?;
    match parent {
        Some(parent) => navigate::replace_child(tree, Some(parent), body, app)?,
        None if is_root => tree.set_root_unchecked(app),
        None => {
            return Err(IntegrityError::UndefinedParent {
                child: tree.hash(body),
            })
        }
    }

    debug!(
        key = %group.key.key,
        occurrences = occurrences.len(),
        depth,
        "binding introduced"
    );
    Ok(body)
}
