//! termlog - Trading terminal log analyzer CLI.
//!
//! Parses one or more raw terminal log files, prints a run summary, and
//! optionally the request statistics table and the filtered timeline.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use termlog::models::TimelineEntry;
use termlog::LogAnalysis;

#[derive(Parser, Debug)]
#[command(name = "termlog")]
#[command(about = "Correlate and inspect trading terminal protocol logs")]
struct Args {
    /// Log files to parse, in order
    #[arg(required = true)]
    files: Vec<PathBuf>,

    /// Print the per-(protocol, service, action) statistics table
    #[arg(long)]
    stats: bool,

    /// Print the merged request/response/push timeline
    #[arg(long)]
    timeline: bool,

    /// Timeline content filter: `~`-separated substrings, any may match
    #[arg(long, default_value = "")]
    filter: String,

    /// Inclusive timeline start, e.g. "20240101 09:30:00.000"
    #[arg(long, default_value = "")]
    from: String,

    /// Inclusive timeline end
    #[arg(long, default_value = "")]
    to: String,
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "termlog=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let args = Args::parse();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{err:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(args: &Args) -> Result<()> {
    let mut contents = Vec::with_capacity(args.files.len());
    for path in &args.files {
        // terminal logs regularly carry broken multi-byte sequences;
        // decode leniently rather than refusing the whole file
        let bytes = fs::read(path).with_context(|| format!("reading {}", path.display()))?;
        contents.push(String::from_utf8_lossy(&bytes).into_owned());
        info!(file = %path.display(), bytes = bytes.len(), "loaded log file");
    }

    let analysis = LogAnalysis::from_files(&contents).context("parsing logs")?;

    print_diagnostics(&analysis)?;
    if args.stats {
        print_stats(&analysis);
    }
    if args.timeline {
        print_timeline(&analysis.timeline(&args.filter, &args.from, &args.to));
    }
    Ok(())
}

fn print_diagnostics(analysis: &LogAnalysis) -> Result<()> {
    let diag = analysis.diagnostics();
    println!(
        "{}",
        serde_json::to_string_pretty(&diag).context("serializing diagnostics")?
    );
    Ok(())
}

fn print_stats(analysis: &LogAnalysis) {
    println!(
        "{:<12} {:<28} {:<28} {:>7} {:>9} {:>9}",
        "protocol", "servicename", "action", "counts", "avg", "total"
    );
    for row in analysis.statistics() {
        println!(
            "{:<12} {:<28} {:<28} {:>7} {:>9} {:>9}",
            row.protocol, row.servicename, row.action, row.counts, row.avg_lens, row.total_lens
        );
    }
}

fn print_timeline(entries: &[&TimelineEntry]) {
    for entry in entries {
        match entry {
            TimelineEntry::Record(record) => println!(
                "{} {:<8} {:<10} {} {} {}",
                record.time,
                record.record_type,
                record.protocol,
                record.id,
                record.servicename,
                record.action
            ),
            TimelineEntry::Push(push) => {
                println!("{} push     {}", push.time, push.push_type)
            }
        }
    }
}
