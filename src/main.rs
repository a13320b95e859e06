use std::fs;
use std::path::PathBuf;

use eyre::{Result, WrapErr};
use structopt::StructOpt;

use digit_chain::{
    maximize, minimize, parse_program, replay, ChainConfig, Constraint, ConstraintSet, StageChain,
};

#[derive(Debug, StructOpt)]
struct Args {
    #[structopt(help = "Path to the stage program.")]
    program: PathBuf,
    #[structopt(
        long,
        short,
        number_of_values = 1,
        help = "Auxiliary constraint, e.g. 'w10 > 6' or 'w11 = w10 - 6'. May be repeated."
    )]
    require: Vec<String>,
    #[structopt(long, help = "Accumulator base. [default: taken from the program text]")]
    base: Option<i64>,
    #[structopt(long, help = "Smallest digit allowed. [default: 1]")]
    min_digit: Option<i64>,
    #[structopt(long, help = "Largest digit allowed. [default: 9]")]
    max_digit: Option<i64>,
    #[structopt(long, help = "Required final accumulator value. [default: 0]")]
    target: Option<i64>,
    #[structopt(long, conflicts_with = "smallest", help = "Print only the largest answer.")]
    largest: bool,
    #[structopt(long, help = "Print only the smallest answer.")]
    smallest: bool,
}

fn main() -> Result<()> {
    let args = Args::from_args();
    let text = fs::read(&args.program)
        .wrap_err_with(|| format!("failed to read {}", args.program.display()))?;
    let program = parse_program(&text)?;

    let mut config = ChainConfig { base: program.base, ..ChainConfig::default() };
    if let Some(v) = args.base {
        // divisor validation in StageChain::new catches a mismatched override
        config.base = v;
    }
    if let Some(v) = args.min_digit {
        config.min_digit = v;
    }
    if let Some(v) = args.max_digit {
        config.max_digit = v;
    }
    if let Some(v) = args.target {
        config.target = v;
    }
    let chain = StageChain::new(&program.params, config)?;
    let constraints = args
        .require
        .iter()
        .map(|s| Constraint::parse(s))
        .collect::<Result<ConstraintSet, _>>()?;

    if !args.smallest {
        let answer = maximize(&chain, &constraints)?;
        println!("largest  = {} (accumulator {})", answer, replay(&chain, answer.digits())?);
    }
    if !args.largest {
        let answer = minimize(&chain, &constraints)?;
        println!("smallest = {} (accumulator {})", answer, replay(&chain, answer.digits())?);
    }
    Ok(())
}
