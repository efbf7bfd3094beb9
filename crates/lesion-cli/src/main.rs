use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod commands;

#[derive(Parser)]
#[command(name = "lesion")]
#[command(about = "Quantitative analysis of spinal cord lesion images", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose logging (-v for debug, -vv for trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Commands {
    /// Show per-series metadata of a LIF file
    Describe {
        /// Path to the LIF file
        #[arg(short, long)]
        input: PathBuf,

        /// Output format (text, json)
        #[arg(short, long, default_value = "text")]
        format: String,
    },

    /// Convert LIF series to 16-bit grayscale PNG files
    Convert {
        /// LIF files to convert
        #[arg(required = true)]
        inputs: Vec<PathBuf>,

        /// Channel of interest
        #[arg(short, long, default_value = "0")]
        channel: usize,

        /// Series to convert (comma-separated; all by default)
        #[arg(short, long, value_delimiter = ',')]
        series: Option<Vec<usize>>,

        /// Restrict the projection to one z-slice
        #[arg(short, long)]
        z_slice: Option<usize>,

        /// Output directory (defaults to each input's directory)
        #[arg(short, long)]
        out_dir: Option<PathBuf>,
    },

    /// Trace series and write a statistics table
    Process {
        /// Path to the LIF file
        #[arg(short, long)]
        input: PathBuf,

        /// Channel containing the image to be traced
        #[arg(short, long, default_value = "0")]
        channel: usize,

        /// Series to process (comma-separated; all by default)
        #[arg(short, long, value_delimiter = ',')]
        series: Option<Vec<usize>>,

        /// Output file (prints to stdout if not specified)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Output format (csv, json)
        #[arg(short, long, default_value = "csv")]
        format: String,

        /// Print processing metrics after the run
        #[arg(long)]
        metrics: bool,
    },

    /// Download test fixtures listed in a text manifest
    FetchFixtures {
        /// Path to the manifest (one URL per line)
        #[arg(short, long)]
        manifest: PathBuf,

        /// Directory to download into
        #[arg(short, long, default_value = "testdata")]
        out_dir: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize tracing
    // Priority: RUST_LOG env var > verbose flag > default (info)
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        match cli.verbose {
            0 => EnvFilter::new("info"),
            1 => EnvFilter::new("debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(filter)
        .init();

    match cli.command {
        Commands::Describe { input, format } => {
            commands::describe::run(&input, &format).await?;
        }
        Commands::Convert {
            inputs,
            channel,
            series,
            z_slice,
            out_dir,
        } => {
            commands::convert::run(
                &inputs,
                channel,
                series.as_deref(),
                z_slice,
                out_dir.as_deref(),
            )
            .await?;
        }
        Commands::Process {
            input,
            channel,
            series,
            output,
            format,
            metrics,
        } => {
            commands::process::run(&input, channel, series, output.as_deref(), &format, metrics)
                .await?;
        }
        Commands::FetchFixtures { manifest, out_dir } => {
            commands::fixtures::run(&manifest, &out_dir).await?;
        }
    }

    Ok(())
}
