use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use logtally::config::DEFAULT_TOP_K;
use logtally::logging::init_logging;
use logtally::{Engine, EngineConfig, Report};

#[derive(Parser, Debug)]
#[command(
    name = "logtally",
    version,
    about = "Sum access-log bytes per URL and referer across a directory of logs"
)]
struct Cli {
    /// Number of worker threads
    #[arg(env = "LOGTALLY_WORKERS")]
    workers: usize,

    /// Directory holding the access logs
    #[arg(env = "LOGTALLY_LOG_DIR")]
    log_dir: PathBuf,

    /// How many URLs and referers to report
    #[arg(short = 'k', long, env = "LOGTALLY_TOP_K", default_value_t = DEFAULT_TOP_K)]
    top_k: usize,

    /// Report format
    #[arg(long, value_enum, default_value_t = Format::Text)]
    format: Format,

    /// Log progress at info level (overridden by RUST_LOG)
    #[arg(short, long)]
    verbose: bool,

    /// Emit log lines as JSON
    #[arg(long)]
    log_json: bool,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum Format {
    Text,
    Json,
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_json);

    if let Err(e) = run(&cli) {
        eprintln!("error: {e:#}");
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> anyhow::Result<()> {
    let config = EngineConfig::new(cli.workers, &cli.log_dir).with_top_k(cli.top_k);
    let report = Engine::new(config)
        .run()
        .with_context(|| format!("failed to aggregate logs in {}", cli.log_dir.display()))?;
    print_report(&report, cli.format)
}

fn print_report(report: &Report, format: Format) -> anyhow::Result<()> {
    match format {
        Format::Text => print!("{}", report.render_text()),
        Format::Json => println!(
            "{}",
            report.render_json().context("failed to encode report")?
        ),
    }
    Ok(())
}
