use std::io::{self, Write};
use std::process::exit;

use clap::Parser;
use log::{error, info};

use taskpool::scenarios::{self, Report, Scenario};
use taskpool::{Result, Strategy};

const DEFAULT_THREADS: u32 = 4;
const DEFAULT_TASKS: usize = 100;

#[derive(Parser)]
#[command(name = "pool-bench", version, about = "Compare thread pool scheduling strategies")]
struct Cli {
    /// Number of worker threads per pool
    #[arg(long, default_value_t = DEFAULT_THREADS, value_name = "N")]
    threads: u32,

    /// Number of jobs per scenario
    #[arg(long, default_value_t = DEFAULT_TASKS, value_name = "N")]
    tasks: usize,

    /// Scenario to run; all of them when omitted
    #[arg(long, value_enum)]
    scenario: Option<Scenario>,

    /// Strategy to measure; all of them when omitted
    #[arg(long, value_enum)]
    strategy: Option<Strategy>,

    /// Print one JSON report per line instead of text
    #[arg(long)]
    json: bool,
}

fn main() {
    env_logger::builder()
        .filter_level(log::LevelFilter::Info)
        .target(env_logger::Target::Stderr)
        .init();

    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!("{}", e);
        exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let scenarios = cli.scenario.map_or(Scenario::ALL.to_vec(), |s| vec![s]);
    let strategies = cli.strategy.map_or(Strategy::ALL.to_vec(), |s| vec![s]);

    info!("pool-bench {}", env!("CARGO_PKG_VERSION"));
    info!("{} threads, {} tasks per scenario", cli.threads, cli.tasks);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    for scenario in scenarios {
        if !cli.json {
            writeln!(out, "==== {} ====", scenario.title())?;
        }
        for &strategy in &strategies {
            let report = scenarios::run(scenario, strategy, cli.threads, cli.tasks)?;
            print_report(&mut out, &report, cli.json)?;
        }
    }
    Ok(())
}

fn print_report(out: &mut impl Write, report: &Report, json: bool) -> Result<()> {
    if json {
        serde_json::to_writer(&mut *out, report)?;
        writeln!(out)?;
    } else {
        writeln!(
            out,
            "{} threadpool takes: {:.3} ms",
            report.strategy, report.elapsed_ms
        )?;
    }
    Ok(())
}
