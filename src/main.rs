#![forbid(unsafe_code)]
//! # Topic Insights CLI
//!
//! Command-line front end for the `topic_insights` crate. It loads an article
//! table (CSV, TSV or JSON) annotated with topic assignments and either prints
//! the dashboard summary or computes one author's topic timeline.
//!
//! ## Example
//! ```bash
//! cargo run --release -- articles.csv --compare news.csv --export-format csv
//! cargo run --release -- articles.csv --author "Jane Doe" --mode top5
//! ```
//!
//! Set `RUST_LOG=debug` to see skipped rows and malformed fields.

use clap::Parser;
use log::{error, warn};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process;
use topic_insights::export::render_timeline;
use topic_insights::{
    Dataset, ExportFormat, InsightConfig, author_timeline, build_dashboard, export_dashboard,
    export_timeline, load_topic_labels, render_summary,
};

#[derive(Parser)]
#[command(author, version, about)]
struct Cli {
    /// Article table to analyze (.csv, .tsv or .json)
    path: PathBuf,

    /// Second dataset whose year distribution is shown alongside
    #[arg(long)]
    compare: Option<PathBuf>,

    /// Topic label file (JSON) used to annotate topic ids
    #[arg(long)]
    labels: Option<PathBuf>,

    /// Compute the topic timeline of this author instead of the dashboard
    #[arg(long)]
    author: Option<String>,

    /// Timeline mode: full or top5
    #[arg(long, default_value = "full")]
    mode: String,

    /// Print the sorted list of authors and exit
    #[arg(long, default_value_t = false)]
    list_authors: bool,

    /// Output format for export (txt, csv, tsv, json)
    #[arg(long, default_value = "txt")]
    export_format: ExportFormat,

    /// Directory for exported files (default: current directory)
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Length of the topic rankings
    #[arg(long, default_value_t = 15)]
    top_n: usize,

    /// Topics kept in a top5 timeline
    #[arg(long, default_value_t = 5)]
    top_k: usize,

    /// Distinct-topic count above which an author counts as broad
    #[arg(long, default_value_t = 15)]
    broad_range: usize,

    /// Years at or below this value are ignored
    #[arg(long, default_value_t = 1000)]
    min_year: i32,

    /// Refuse inputs with more rows than this (0 = unlimited)
    #[arg(long, default_value_t = 1_000_000)]
    max_rows: usize,
}

impl Cli {
    fn config(&self) -> InsightConfig {
        InsightConfig {
            top_n: self.top_n,
            top_k: self.top_k,
            broad_range_threshold: self.broad_range,
            min_year: self.min_year,
            max_rows: (self.max_rows > 0).then_some(self.max_rows),
        }
    }
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "topics".into())
}

fn run(cli: &Cli) -> topic_insights::Result<()> {
    let config = cli.config();
    let primary = Dataset::load(&cli.path, &config)?;
    let stem = file_stem(&cli.path);

    if cli.list_authors {
        for name in topic_insights::unique_author_names(&primary.records) {
            println!("{name}");
        }
        return Ok(());
    }

    if let Some(author) = &cli.author {
        let timeline = author_timeline(&primary.records, author, &cli.mode, &config)?;
        println!("{}", render_timeline(author, &timeline));
        export_timeline(author, &timeline, &cli.out_dir, &stem, cli.export_format)?;
        return Ok(());
    }

    let secondary = cli
        .compare
        .as_deref()
        .map(|p| Dataset::load(p, &config))
        .transpose()?;
    let labels = match &cli.labels {
        Some(p) => load_topic_labels(p).unwrap_or_else(|e| {
            warn!("ignoring topic labels {}: {}", p.display(), e);
            BTreeMap::new()
        }),
        None => BTreeMap::new(),
    };

    let report = build_dashboard(&primary, secondary.as_ref(), &config);
    println!("{}", render_summary(&report, &labels));
    export_dashboard(&report, &labels, &cli.out_dir, &stem, cli.export_format)?;
    Ok(())
}

fn main() {
    env_logger::init();
    let cli = Cli::parse();

    if let Err(e) = run(&cli) {
        error!("Error: {}", e);
        eprintln!("Error: {e}");
        process::exit(1);
    }
}
