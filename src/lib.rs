pub mod api;
pub mod flat;
pub mod ir;
pub mod machine;
pub mod uplc;

// Common types, reachable from the crate root
pub use ir::{ContentHash, IRNode, IRTree, IntegrityError, NodeId};
pub use machine::{Evaluation, MachineError};
pub use uplc::{Constant, DefaultFunction, PlutusData, Program, Term, Type, Version};

// Public API: `uplc::compile_term()` etc.
pub use api::*;
