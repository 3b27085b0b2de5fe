use clap::{ArgAction, Parser};
use colored::Colorize;
use pyshuffle::error::exit_code;
use pyshuffle::{Report, ShuffleError, plan_file, reorder_file};
use rand::rngs::StdRng;
use rand::{RngCore, SeedableRng, thread_rng};
use std::path::PathBuf;
use std::process;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "pyshuffle",
    about = "Shuffle the top-level functions of a Python file",
    version,
    long_about = "pyshuffle randomly reorders the top-level function definitions of a \
                  Python file. Imports, module-level statements, classes, comments and \
                  blank lines stay in their slots between the functions, and every line \
                  is copied byte for byte.\n\n\
                  Set PYSHUFFLE_LOG (e.g. PYSHUFFLE_LOG=debug) to control logging."
)]
struct Cli {
    /// Python source file to reorder.
    input: PathBuf,

    /// Destination file. Overwritten if it exists; may be the input itself.
    #[arg(short, long, default_value = "output.py")]
    output: PathBuf,

    /// Seed the shuffle so the same input always yields the same order.
    #[arg(long)]
    seed: Option<u64>,

    /// Print the block plan without writing anything.
    #[arg(long)]
    dry_run: bool,

    /// Emit the run report as JSON instead of text.
    #[arg(long)]
    json: bool,

    /// Log pipeline stages to stderr (-v for info, -vv for debug).
    #[arg(short, long, action = ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(err) = run(&cli) {
        // Pipeline failures name their stage; anything else is an output problem.
        let (stage, code) = match err.downcast_ref::<ShuffleError>() {
            Some(e) => (e.stage().to_string(), e.exit_code()),
            None => ("output".to_string(), exit_code::IO_ERROR),
        };
        eprintln!("{}: {err}", format!("error[{stage}]").red().bold());
        process::exit(code);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let mut rng: Box<dyn RngCore> = match cli.seed {
        Some(seed) => Box::new(StdRng::seed_from_u64(seed)),
        None => Box::new(thread_rng()),
    };

    let report = if cli.dry_run {
        plan_file(&cli.input, rng.as_mut())?
    } else {
        reorder_file(&cli.input, &cli.output, rng.as_mut())?
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_text(&report);
    }
    Ok(())
}

fn print_text(report: &Report) {
    if report.output.is_none() {
        for block in &report.blocks {
            let span = format!("{:>5}-{:<5}", block.start, block.end);
            let kind = if block.is_function() {
                block.kind.to_string().cyan()
            } else {
                block.kind.to_string().dimmed()
            };
            println!("{span} {kind}");
        }
    }

    let moved = report
        .order
        .iter()
        .enumerate()
        .filter(|&(slot, &from)| slot != from)
        .count();
    let summary = format!(
        "{} function(s), {} moved, {} block(s)",
        report.functions,
        moved,
        report.blocks.len()
    );
    match &report.output {
        Some(output) => println!("{} {}: {summary}", "Wrote".green(), output.display()),
        None => println!("{} {}", "Dry run:".yellow().bold(), summary),
    }
}

fn init_logging(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter =
        EnvFilter::try_from_env("PYSHUFFLE_LOG").unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
