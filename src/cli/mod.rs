//! CLI for the storefront account checker.
//!
//! Argument parsing, URL collection, and console rendering live here so the
//! binary stays a thin shell and the pieces can be driven from tests.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use thiserror::Error;

use crate::batch::classify_in_groups;
use crate::config::ProbeConfig;
use crate::normalize::normalize_all;
use crate::prober::StoreProber;
use crate::probe::core::{AccountType, CheckResult};

/// Check which customer-account system Shopify storefronts use.
#[derive(Debug, Parser)]
#[command(name = "store-check", version)]
#[command(about = "Check which customer-account system Shopify storefronts use", long_about = None)]
pub struct Cli {
    /// Store URLs or bare domains.
    pub urls: Vec<String>,

    /// File with one URL per line; lines starting with `#` are ignored.
    #[arg(short, long, value_name = "PATH")]
    pub file: Option<PathBuf>,

    /// Print one JSON object per line instead of the decorated report.
    #[arg(long)]
    pub json: bool,

    /// Load probe settings from a .toml or .json file.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Error)]
pub enum CliError {
    #[error("No valid URLs provided.")]
    NoValidUrls,
}

/// Positional URLs first, then the file's lines, all normalized.
pub fn collect_urls(cli: &Cli) -> Result<Vec<String>> {
    let mut urls = normalize_all(&cli.urls);
    if let Some(path) = &cli.file {
        urls.extend(read_url_file(path)?);
    }
    if urls.is_empty() {
        return Err(CliError::NoValidUrls.into());
    }
    Ok(urls)
}

fn read_url_file(path: &Path) -> Result<Vec<String>> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("failed to read URL file {}", path.display()))?;
    Ok(normalize_all(text.lines()))
}

/// One decorated report line: emoji, label, URL, then the note or error.
pub fn render_line(result: &CheckResult) -> String {
    let kind = result.kind();
    let mut line = format!("{} {:<11} {}", kind.emoji(), kind.label(), result.url());
    if let Some(error) = result.error() {
        line.push_str(&format!(" [error: {error}]"));
    } else if let Some(note) = result.note() {
        line.push_str(&format!(" ({note})"));
    }
    line
}

/// Per-type counts for a finished run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Summary {
    counts: [usize; AccountType::ALL.len()],
}

impl Summary {
    pub fn record(&mut self, kind: AccountType) {
        self.counts[slot(kind)] += 1;
    }

    pub fn count(&self, kind: AccountType) -> usize {
        self.counts[slot(kind)]
    }

    pub fn total(&self) -> usize {
        self.counts.iter().sum()
    }

    /// Summary block, one line per type in a fixed order.
    pub fn render(&self) -> String {
        let mut out = format!("Summary ({} checked)\n", self.total());
        for kind in AccountType::ALL {
            out.push_str(&format!(
                "  {} {:<11} {}\n",
                kind.emoji(),
                kind.label(),
                self.count(kind)
            ));
        }
        out
    }
}

fn slot(kind: AccountType) -> usize {
    match kind {
        AccountType::New => 0,
        AccountType::Legacy => 1,
        AccountType::PasswordProtected => 2,
        AccountType::NotShopify => 3,
        AccountType::Unknown => 4,
        AccountType::Error => 5,
    }
}

/// Parse-independent entry point: load config, collect URLs, probe, report.
pub async fn run<W: Write>(cli: Cli, out: &mut W) -> Result<Summary> {
    let config = match &cli.config {
        Some(path) => ProbeConfig::load(path)?,
        None => ProbeConfig::default(),
    };
    tracing::debug!("loaded config: {:?}", config);

    let urls = collect_urls(&cli)?;
    let prober = StoreProber::builder()
        .with_config(config)
        .disable_metrics()
        .build()?;
    report(&prober, &urls, cli.json, out).await
}

/// Probe `urls` in groups and write each result as it lands.
pub async fn report<W: Write>(
    prober: &StoreProber,
    urls: &[String],
    json: bool,
    out: &mut W,
) -> Result<Summary> {
    if !json {
        writeln!(out, "Checking {} store(s)...\n", urls.len())?;
    }

    let mut summary = Summary::default();
    classify_in_groups(prober, urls, |result| -> Result<()> {
        summary.record(result.kind());
        if json {
            write!(out, "{}", result.to_ndjson_line()?)?;
        } else {
            writeln!(out, "{}", render_line(&result))?;
        }
        Ok(())
    })
    .await?;

    if !json {
        write!(out, "\n{}", summary.render())?;
    }
    out.flush()?;
    Ok(summary)
}
