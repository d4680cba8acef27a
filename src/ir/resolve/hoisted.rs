use tracing::trace;

use super::{bind_group, collect_groups};
use crate::ir::navigate::{depth_of, is_ancestor_or_self};
use crate::ir::{IRNode, IRTree, IntegrityError};

/// Bind every hoisted group in a chain above the program body.
///
/// Each new binding goes directly around the body, below the bindings made
/// before it, so a hoisted value may refer to any value hoisted earlier and
/// to nothing else. Most nested groups go first, then the earliest
/// discovered.
pub(super) fn resolve_hoisted(tree: &mut IRTree) -> Result<usize, IntegrityError> {
    let mut body = tree.require_root()?;
    let mut bound = 0;
    loop {
        let groups = collect_groups(tree, |n| matches!(n, IRNode::Hoisted(_)))?;
        let Some(group) = groups
            .into_iter()
            .min_by_key(|g| (std::cmp::Reverse(g.nesting), g.discovery))
        else {
            break;
        };

        let depth = depth_of(tree, body);
        for occ in &group.occurrences {
            if !is_ancestor_or_self(tree, body, occ.id) {
                return Err(IntegrityError::OccurrenceOutsideScope {
                    hash: tree.hash(occ.id),
                });
            }
        }
        if group.key.deepest_free_level.is_some_and(|level| level >= depth) {
            return Err(IntegrityError::OpenHoisted {
                hash: group.key.key,
            });
        }

        trace!(occurrences = group.occurrences.len(), depth, "hoisted group");
        body = bind_group(tree, &group, body, depth)?;
        bound += 1;
    }
    Ok(bound)
}
