//! bilr - BilR presence cohort analysis CLI
//!
//! Command-line interface for running the cohort pipeline on a sample table.

use bilr_cohorts::data::SampleTable;
use bilr_cohorts::error::Result;
use bilr_cohorts::pipeline::{Pipeline, PipelineConfig};
use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Output format for pipeline results
#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// One summary and one tests TSV per analysis
    Tsv,
    /// A single JSON document
    Json,
    /// Both TSV files and JSON
    All,
}

/// BilR presence/absence cohort analysis
#[derive(Parser)]
#[command(name = "bilr")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the cohort pipeline on a sample table
    Run {
        /// Path to the sample table (TSV, or CSV with --csv)
        #[arg(short, long)]
        input: PathBuf,

        /// Pipeline configuration YAML (default: the full study)
        #[arg(short, long)]
        config: Option<PathBuf>,

        /// Output directory
        #[arg(short, long)]
        output: PathBuf,

        /// Output format
        #[arg(long, value_enum, default_value = "tsv")]
        format: OutputFormat,

        /// Input is comma-separated
        #[arg(long)]
        csv: bool,

        /// Bioprojects to exclude (comma-separated), added to the config list
        #[arg(long, value_delimiter = ',')]
        exclude: Vec<String>,
    },

    /// Write the default study configuration
    Example {
        /// Output path for the example YAML
        #[arg(short, long, default_value = "bilr.yaml")]
        output: PathBuf,
    },
}

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Run {
            input,
            config,
            output,
            format,
            csv,
            exclude,
        } => cmd_run(&input, config.as_deref(), &output, format, csv, exclude),

        Commands::Example { output } => cmd_example(&output),
    };

    if let Err(e) = result {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

/// Run the pipeline and write results
fn cmd_run(
    input: &Path,
    config_path: Option<&Path>,
    output_dir: &Path,
    format: OutputFormat,
    csv: bool,
    exclude: Vec<String>,
) -> Result<()> {
    let mut config = match config_path {
        Some(path) => {
            tracing::info!("Loading pipeline configuration from {:?}", path);
            PipelineConfig::from_yaml(&std::fs::read_to_string(path)?)?
        }
        None => PipelineConfig::default(),
    };
    config.excluded_bioprojects.extend(exclude);

    tracing::info!("Loading samples from {:?}", input);
    let table = if csv {
        SampleTable::from_csv(input)?
    } else {
        SampleTable::from_tsv(input)?
    };
    tracing::info!(
        "Loaded {} samples ({} malformed rows skipped)",
        table.len(),
        table.exclusions().len()
    );

    let output = Pipeline::from_config(&config).run(&table)?;

    std::fs::create_dir_all(output_dir)?;
    if matches!(format, OutputFormat::Tsv | OutputFormat::All) {
        output.write_tsv_dir(output_dir)?;
    }
    if matches!(format, OutputFormat::Json | OutputFormat::All) {
        output.write_json(output_dir.join(format!("{}.json", output.name)))?;
    }

    eprint!("{}", output);
    tracing::info!("Results written to {:?}", output_dir);
    Ok(())
}

/// Write the default configuration as YAML
fn cmd_example(output: &Path) -> Result<()> {
    let yaml = PipelineConfig::default().to_yaml()?;
    std::fs::write(output, yaml)?;
    tracing::info!("Example configuration written to {:?}", output);
    Ok(())
}
