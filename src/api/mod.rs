//! End-to-end pipeline: IR → sharing resolution → UPLC term → Flat bytes,
//! and Flat bytes → program → evaluation.

use thiserror::Error;
use tracing::{debug, instrument};

use crate::flat::{self, CodecError, PadOptions};
use crate::ir::{self, ContentHash, IRTree, IntegrityError};
use crate::machine::{self, Evaluation, MachineError};
use crate::uplc::{Program, Term, Version};

pub use crate::machine::EvalOptions;

#[cfg(test)]
mod tests;

/// Any failure along the pipeline.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum Error {
    #[error("malformed IR: {0}")]
    Integrity(#[from] IntegrityError),

    #[error("flat decoding failed: {0}")]
    Codec(#[from] CodecError),

    #[error("evaluation failed: {0}")]
    Machine(#[from] MachineError),
}

/// Options controlling compilation: program version and closing pad.
#[derive(Clone, Debug, Default)]
pub struct CompileOptions {
    /// Version written into the program header.
    pub version: Version,
    /// Padding closing the Flat stream.
    pub padding: PadOptions,
}

impl CompileOptions {
    /// Default padding with a specific program version.
    pub fn for_version(version: Version) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    pub fn with_padding(mut self, padding: PadOptions) -> Self {
        self.padding = padding;
        self
    }
}

/// Resolve every sharing node of `tree` and lower the result to a term.
#[instrument(skip_all, name = "compile")]
pub fn compile_term(mut tree: IRTree) -> Result<Term, Error> {
    let resolution = ir::resolve::resolve_sharing(&mut tree)?;
    let term = ir::lower::lower(&tree)?;
    debug!(
        inlined = resolution.inlined,
        hoisted = resolution.hoisted,
        letted = resolution.letted,
        size = term.size(),
        "IR compiled"
    );
    Ok(term)
}

/// Compile `tree` into a program carrying the configured version.
pub fn compile_program(tree: IRTree, options: &CompileOptions) -> Result<Program, Error> {
    Ok(Program::new(options.version, compile_term(tree)?))
}

/// Compile `tree` straight to Flat bytes.
pub fn compile_flat(tree: IRTree, options: &CompileOptions) -> Result<Vec<u8>, Error> {
    let program = compile_program(tree, options)?;
    Ok(flat::encode_program_with(&program, &options.padding))
}

/// Decode a Flat program closed with the standard pad.
pub fn decode(bytes: &[u8]) -> Result<Program, Error> {
    Ok(flat::decode_program(bytes)?)
}

/// Evaluate a closed term with the standard builtins.
pub fn evaluate(term: &Term, options: &EvalOptions) -> Result<Evaluation, Error> {
    Ok(machine::evaluate(term, options)?)
}

pub fn evaluate_program(program: &Program, options: &EvalOptions) -> Result<Evaluation, Error> {
    evaluate(&program.term, options)
}

/// Decode a Flat program and evaluate its body.
pub fn evaluate_flat(bytes: &[u8], options: &EvalOptions) -> Result<Evaluation, Error> {
    evaluate_program(&decode(bytes)?, options)
}

/// Digest of the program's canonical Flat encoding.
pub fn program_hash(program: &Program) -> ContentHash {
    ContentHash(*blake3::hash(&flat::encode_program(program)).as_bytes())
}
