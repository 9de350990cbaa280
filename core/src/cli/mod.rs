pub mod report;

use crate::types::AnalyzerConfig;
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Command-line arguments for bidsort
#[derive(Parser, Debug)]
#[command(name = "bidsort")]
#[command(about = "Classify and deduplicate MRI acquisitions for BIDS conversion")]
#[command(version)]
pub struct Cli {
    /// Data root containing sidecars and images
    #[arg(value_name = "ROOT")]
    pub root: PathBuf,

    /// Listing file (defaults to ROOT/list, else ROOT is walked)
    #[arg(short, long, value_name = "FILE")]
    pub list: Option<PathBuf>,

    /// Write output to a file instead of stdout
    #[arg(short, long, value_name = "FILE")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, default_value = "json")]
    pub format: OutputFormat,

    /// Minimum volume count for a functional run
    #[arg(long, default_value_t = 50)]
    pub min_bold_volumes: usize,

    /// Copy series entities onto every object
    #[arg(long)]
    pub propagate_entities: bool,

    /// Verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Analyzer configuration selected by the flags
    pub fn analyzer_config(&self) -> AnalyzerConfig {
        AnalyzerConfig::default()
            .min_bold_volumes(self.min_bold_volumes)
            .propagate_entities(self.propagate_entities)
    }
}

/// Output format options
#[derive(Debug, Clone, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable text format
    Text,
    /// JSON catalog
    Json,
}
