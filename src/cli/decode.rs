use std::path::PathBuf;

use clap::Args;

use super::load_program;

#[derive(Args)]
pub struct DecodeArgs {
    /// Flat-encoded program
    pub input: PathBuf,
    /// Input file holds hex text instead of raw bytes
    #[arg(long)]
    pub hex: bool,
}

pub fn cmd_decode(args: DecodeArgs) {
    let program = load_program(&args.input, args.hex);
    println!("{}", program);
}
