//! wikiplain CLI
//!
//! Convert a MediaWiki XML export into a stream of plain-text `<article>`
//! records, with optional link, category and redirect edge files.
//!
//! # Examples
//!
//! Convert a dump to plain text:
//! ```bash
//! wikiplain -i enwiki-latest-pages-articles.xml.bz2 -o articles.xml
//! ```
//!
//! Harvest the link graph only, across four workers:
//! ```bash
//! wikiplain -i dump.xml -n -l links.edg -j 4
//! ```
//!
//! Resume an interrupted run after 150000 articles:
//! ```bash
//! wikiplain -i dump.xml -o articles.xml -s 150000
//! ```

use std::io::{self, Read, Write};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::Ordering;

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use wikiplain::config::{DriverConfig, ExtractOptions};
use wikiplain::dump::{self, INTERRUPTED};
use wikiplain::extract::Extractor;

#[derive(Parser)]
#[command(name = "wikiplain")]
#[command(version, about = "Convert MediaWiki XML dumps to plain text")]
struct Cli {
    /// Take XML input from FILE (.bz2 accepted) instead of STDIN
    #[arg(short = 'i', long = "input-file", value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output parsed articles to FILE instead of STDOUT
    #[arg(short = 'o', long = "output-file", value_name = "FILE")]
    output: Option<PathBuf>,

    /// Produce plain (unformatted) text (default)
    #[arg(short = 't', long = "text", overrides_with = "no_text")]
    text: bool,

    /// Don't parse text (designed for use with -r -l -c options)
    #[arg(short = 'n', long = "no-text")]
    no_text: bool,

    /// Retain references in text (links and categories)
    #[arg(short = 'R', long = "references")]
    references: bool,

    /// Outsource redirect articles to FILE
    #[arg(short = 'r', long = "redirects", value_name = "FILE")]
    redirects: Option<PathBuf>,

    /// Capture articles' links in FILE
    #[arg(short = 'l', long = "links", value_name = "FILE")]
    links: Option<PathBuf>,

    /// Capture articles' categories in FILE
    #[arg(short = 'c', long = "categories", value_name = "FILE")]
    categories: Option<PathBuf>,

    /// Skip (resume after) NUMBER of articles (and append to sinks)
    #[arg(short = 's', long = "skip", value_name = "NUMBER", default_value_t = 0)]
    skip: u64,

    /// Number of parallel jobs (1 to the CPU count)
    #[arg(short = 'j', long = "jobs", value_name = "N", default_value_t = 1)]
    jobs: usize,

    /// Stop making noise
    #[arg(short = 'q', long = "quiet")]
    quiet: bool,

    /// Test by parsing a single raw body from STDIN (bypasses the XML layer)
    #[arg(short = 'T', long = "test")]
    test: bool,
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let filter = if cli.quiet {
        EnvFilter::new("warn")
    } else {
        EnvFilter::new("info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();

    match run(cli) {
        Ok(code) => code,
        Err(error) => {
            tracing::error!("{error:#}");
            ExitCode::FAILURE
        }
    }
}

fn run(cli: Cli) -> Result<ExitCode> {
    if cli.test {
        return run_test_mode(&cli);
    }

    let max_jobs = num_cpus::get();
    let jobs = if cli.jobs < 1 || cli.jobs > max_jobs {
        tracing::warn!(
            "invalid number of jobs ({}), must be between 1 and {max_jobs}; defaulting to 1",
            cli.jobs
        );
        1
    } else {
        cli.jobs
    };

    let text = cli.text || !cli.no_text;

    // Resuming makes no sense on a stream we cannot have read before.
    let skip = if cli.input.is_none() {
        if cli.skip > 0 {
            tracing::warn!("skip is ignored when reading from STDIN");
        }
        0
    } else {
        cli.skip
    };

    let config = DriverConfig {
        input: cli.input,
        output: cli.output,
        links_file: cli.links,
        categories_file: cli.categories,
        redirects_file: cli.redirects,
        skip,
        jobs,
        quiet: cli.quiet,
        text,
        references: cli.references,
    };

    if config.nothing_to_do() {
        tracing::info!("no output selected; use -t, -r, -l or -c");
        return Ok(ExitCode::SUCCESS);
    }

    ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::SeqCst))
        .context("failed to install interrupt handler")?;

    let summary = dump::run(&config)?;
    if !config.quiet && !summary.interrupted {
        tracing::info!(
            "done: {} articles processed, {} skipped",
            summary.processed,
            summary.skipped
        );
    }
    Ok(ExitCode::SUCCESS)
}

/// `-T`: treat STDIN as one raw article body and print its plain text.
fn run_test_mode(cli: &Cli) -> Result<ExitCode> {
    let mut body = String::new();
    io::stdin()
        .read_to_string(&mut body)
        .context("failed to read article body from STDIN")?;

    let options = ExtractOptions::new()
        .with_text(true)
        .with_references(cli.references);
    let extraction = Extractor::new(options).extract(&body)?;

    if let Some(plain) = extraction.plain_text {
        let mut stdout = io::stdout();
        stdout.write_all(plain.as_bytes())?;
        stdout.flush()?;
    }
    Ok(ExitCode::SUCCESS)
}
