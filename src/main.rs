use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use cpu_sched_sim::{
    logging, simulate,
    workload::{generate, ArrivalPattern, GeneratorConfig},
    Algorithm, ResultSet, SimulationRequest,
};

#[derive(Parser)]
#[command(about, long_about)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Simulate a request file and print the comparison table
    Run(RunArgs),
    /// Write a synthetic process list
    Generate(GenerateArgs),
}

#[derive(clap::Args)]
struct RunArgs {
    /// JSON or YAML request: processes, algorithms and engine parameters
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    request: PathBuf,

    /// Overrides the request's algorithm list
    #[arg(long, value_delimiter = ',')]
    algorithms: Option<Vec<Algorithm>>,

    #[arg(long, env = "SCHED_CONTEXT_SWITCH", help = "Context-switch cost in ticks")]
    context_switch: Option<i64>,

    #[arg(long, env = "SCHED_TIME_QUANTUM", help = "Time quantum for RR and MLFQ")]
    quantum: Option<i64>,

    /// Where to write the result set as JSON
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct GenerateArgs {
    #[arg(long, default_value_t = 10)]
    count: usize,

    #[arg(long, value_enum, default_value_t = ArrivalPattern::Random)]
    pattern: ArrivalPattern,

    #[arg(long, env = "SCHED_SEED", default_value_t = 0)]
    seed: u64,

    /// Prints to stdout when absent
    #[arg(long, value_hint = clap::ValueHint::FilePath)]
    output: Option<PathBuf>,
}

fn main() -> Result<()> {
    logging::init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Run(args) => run(args),
        Commands::Generate(args) => run_generate(args),
    }
}

fn run(args: RunArgs) -> Result<()> {
    let mut request = SimulationRequest::from_path(&args.request)
        .with_context(|| format!("loading request {}", args.request.display()))?;

    if let Some(algorithms) = args.algorithms {
        request.algorithms = algorithms;
    }
    if let Some(context_switch) = args.context_switch {
        request.config.context_switch = context_switch;
    }
    if args.quantum.is_some() {
        request.config.time_quantum = args.quantum;
    }

    let results = simulate(&request).context("invalid simulation request")?;
    print_summary(&results);

    if let Some(output) = args.output {
        write_json(&output, &results)?;
        tracing::info!(path = %output.display(), "wrote result set");
    }
    Ok(())
}

fn run_generate(args: GenerateArgs) -> Result<()> {
    let config = GeneratorConfig {
        count: args.count,
        pattern: args.pattern,
        seed: args.seed,
        ..Default::default()
    };
    let processes = generate(&config).context("generating workload")?;

    match args.output {
        Some(output) => write_json(&output, &processes)?,
        None => println!("{}", serde_json::to_string_pretty(&processes)?),
    }
    Ok(())
}

fn write_json(path: &Path, value: &impl serde::Serialize) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    std::fs::write(path, json).with_context(|| format!("writing {}", path.display()))
}

fn print_summary(results: &ResultSet) {
    println!(
        "{:<20} {:>10} {:>14} {:>10} {:>8} {:>10} {:>6} {:>9}",
        "algorithm", "avg wait", "avg turnaround", "avg resp", "util", "throughput", "total", "switches"
    );
    for row in results.summary() {
        println!(
            "{:<20} {:>10.2} {:>14.2} {:>10.2} {:>7.1}% {:>10.3} {:>6} {:>9}",
            row.algorithm.as_str(),
            row.avg_waiting,
            row.avg_turnaround,
            row.avg_response,
            row.cpu_utilization * 100.0,
            row.throughput,
            row.total_time,
            row.context_switches,
        );
    }
    for (algorithm, result) in results.iter() {
        if let Err(err) = result {
            println!("{:<20} failed: {err}", algorithm.as_str());
        }
    }
}
