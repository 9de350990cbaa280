use bidsort_core::cli::{Cli, OutputFormat};
use bidsort_core::{AnalysisContext, Analyzer, TextReport};
use clap::Parser;
use log::{error, info};
use std::fs;
use std::process;

fn main() {
    let cli = Cli::parse();

    setup_logging(cli.verbose);

    if !cli.root.is_dir() {
        eprintln!("Error: {} is not a directory", cli.root.display());
        process::exit(1);
    }

    info!("Processing data root: {}", cli.root.display());

    let mut context = AnalysisContext::new(&cli.root).config(cli.analyzer_config());
    if let Some(list) = &cli.list {
        context = context.list_file(list);
    }

    let analysis = match Analyzer::analyze(&context) {
        Ok(analysis) => analysis,
        Err(e) => {
            error!("Analysis failed: {}", e);
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };

    let output = match cli.format {
        OutputFormat::Text => TextReport::new(&analysis).to_string(),
        OutputFormat::Json => match analysis.to_json() {
            Ok(json) => json,
            Err(e) => {
                eprintln!("Error: Failed to serialize catalog: {}", e);
                process::exit(1);
            }
        },
    };

    match &cli.output {
        Some(path) => {
            if let Err(e) = fs::write(path, output) {
                eprintln!("Error: Failed to write {}: {}", path.display(), e);
                process::exit(1);
            }
            info!("Wrote {}", path.display());
        }
        None => println!("{}", output),
    }

    for request in analysis.preview_requests() {
        info!("Preview needed: {} -> {}", request.nifti_path, request.png_path);
    }
}

fn setup_logging(verbose: bool) {
    let level = if verbose {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    env_logger::Builder::from_default_env()
        .filter_level(level)
        .init();
}
