use std::path::PathBuf;

use clap::Args;

use super::load_program;

#[derive(Args)]
pub struct HashArgs {
    /// Flat-encoded program
    pub input: PathBuf,
    /// Input file holds hex text instead of raw bytes
    #[arg(long)]
    pub hex: bool,
    /// Show the full 256-bit hash instead of the short form
    #[arg(long)]
    pub full: bool,
}

pub fn cmd_hash(args: HashArgs) {
    let program = load_program(&args.input, args.hex);
    let hash = uplc::program_hash(&program);
    if args.full {
        println!("{}", hash.to_hex());
    } else {
        println!("{}", hash);
    }
}
