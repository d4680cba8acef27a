use std::cmp::Reverse;

use tracing::trace;

use super::{bind_group, collect_groups};
use crate::ir::navigate::{depth_of, lowest_common_ancestor};
use crate::ir::{IRNode, IRTree, IntegrityError};

/// Bind every letted group at the lowest common ancestor of its
/// occurrences.
///
/// Groups whose deepest occurrence is deepest go first, then the most
/// nested, then the earliest discovered.
pub(super) fn resolve_letted(tree: &mut IRTree) -> Result<usize, IntegrityError> {
    let mut bound = 0;
    loop {
        let groups = collect_groups(tree, |n| matches!(n, IRNode::Letted { .. }))?;
        let Some(group) = groups
            .into_iter()
            .min_by_key(|g| (Reverse(g.max_depth), Reverse(g.nesting), g.discovery))
        else {
            break;
        };

        let Some(insert) = lowest_common_ancestor(tree, &group.ids()) else {
            break;
        };
        let depth = depth_of(tree, insert);
        trace!(
            occurrences = group.occurrences.len(),
            max_depth = group.max_depth,
            depth,
            "letted group"
        );
        bind_group(tree, &group, insert, depth)?;
        bound += 1;
    }
    Ok(bound)
}
