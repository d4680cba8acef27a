use std::path::PathBuf;
use std::process;

use clap::Args;

use super::load_program;

#[derive(Args)]
pub struct EvalArgs {
    /// Flat-encoded program
    pub input: PathBuf,
    /// Input file holds hex text instead of raw bytes
    #[arg(long)]
    pub hex: bool,
    /// Fail after this many machine steps
    #[arg(long, value_name = "N")]
    pub max_steps: Option<u64>,
}

pub fn cmd_eval(args: EvalArgs) {
    let program = load_program(&args.input, args.hex);
    let options = uplc::EvalOptions {
        step_limit: args.max_steps,
    };
    let result = match uplc::evaluate_program(&program, &options) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("error: {}", e);
            process::exit(1);
        }
    };

    println!("{}", result.term);
    println!("steps: {}", result.steps);
    for line in &result.logs {
        println!("trace: {}", line);
    }
}
