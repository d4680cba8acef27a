use thiserror::Error;

use super::hash::ContentHash;

/// A malformed IR tree.
///
/// These are defects in whatever produced the tree, not conditions a
/// caller is expected to recover from: compilation stops at the first one.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum IntegrityError {
    #[error("IR tree has no root")]
    MissingRoot,

    #[error("node id {0} does not belong to this tree")]
    DanglingNode(u32),

    #[error("node {hash} is reachable from more than one parent")]
    SharedNode { hash: ContentHash },

    #[error("application uses the same node {child} as function and argument")]
    IdenticalAppChildren { child: ContentHash },

    #[error("replace_child received an undefined parent; child to modify: {child}")]
    UndefinedParent { child: ContentHash },

    #[error(
        "unknown application child to modify; given child: {child}; \
         function child: {func}; argument child: {arg}"
    )]
    UnknownAppChild {
        child: ContentHash,
        func: ContentHash,
        arg: ContentHash,
    },

    #[error("node {parent} has no child matching {child}")]
    UnknownChild {
        parent: ContentHash,
        child: ContentHash,
    },

    #[error("both children of application {parent} match {child}")]
    AmbiguousChild {
        parent: ContentHash,
        child: ContentHash,
    },

    #[error("variable {index} is unbound under {depth} binders")]
    UnboundVariable { index: u32, depth: u32 },

    #[error("letted {hash} records depth {recorded} but sits under {actual} binders")]
    LettedDepthMismatch {
        hash: ContentHash,
        recorded: u32,
        actual: u32,
    },

    #[error("hoisted term {hash} refers to a variable bound outside of it")]
    OpenHoisted { hash: ContentHash },

    #[error("occurrence {hash} lies outside the scope chosen for its binding")]
    OccurrenceOutsideScope { hash: ContentHash },

    #[error("sharing node {hash} reached lowering unresolved")]
    UnresolvedSharing { hash: ContentHash },
}
