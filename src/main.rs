use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod cli;

use cli::decode::{cmd_decode, DecodeArgs};
use cli::eval::{cmd_eval, EvalArgs};
use cli::hash::{cmd_hash, HashArgs};

#[derive(Parser)]
#[command(
    name = "uplc",
    version,
    about = "Untyped Plutus Core toolkit: Flat decoding, evaluation, hashing"
)]
struct Cli {
    /// Log pipeline stages at debug level (overrides RUST_LOG)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Decode a Flat program and print its textual form
    Decode(DecodeArgs),
    /// Decode a Flat program and evaluate it
    Eval(EvalArgs),
    /// Print the content hash of a Flat program
    Hash(HashArgs),
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    match cli.command {
        Command::Decode(args) => cmd_decode(args),
        Command::Eval(args) => cmd_eval(args),
        Command::Hash(args) => cmd_hash(args),
    }
}

fn init_logging(verbose: bool) {
    let filter = if verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
