//! The `gradekeeper` command-line interface.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

mod commands;

#[derive(Parser)]
#[command(
    name = "gradekeeper",
    version,
    about = "Deterministic point scores from test, coverage and warning results"
)]
struct Cli {
    /// Log progress details to stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Grade projects against a results feed
    Grade {
        /// Manifest file or directory of manifests
        #[arg(long)]
        manifest: Option<PathBuf>,

        /// Results feed (.toml or .json)
        #[arg(long)]
        results: Option<PathBuf>,

        /// Grade only this project
        #[arg(long)]
        project: Option<String>,

        /// Output directory
        #[arg(long)]
        output: Option<PathBuf>,

        /// Output formats: json, text, html, gradescope, all
        #[arg(long)]
        format: Option<String>,

        /// Max projects graded at once
        #[arg(long)]
        parallelism: Option<usize>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,

        /// Don't print the breakdown to stdout
        #[arg(long)]
        quiet: bool,

        /// Exit code 1 if any project is not fully passing
        #[arg(long)]
        strict: bool,
    },

    /// Check a manifest for configuration errors
    Validate {
        /// Manifest file or directory of manifests
        #[arg(long)]
        manifest: PathBuf,
    },

    /// Print the resolved grading policy as a manifest
    Export {
        /// Manifest file or directory of manifests
        #[arg(long)]
        manifest: PathBuf,

        /// Export only this project
        #[arg(long)]
        project: Option<String>,

        /// Write to a file instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Compare two grade reports
    Compare {
        /// Baseline report JSON
        #[arg(long)]
        baseline: PathBuf,

        /// Current report JSON
        #[arg(long)]
        current: PathBuf,

        /// Point change below which a project counts as unchanged
        #[arg(long, default_value = "0.0")]
        threshold: f64,

        /// Exit code 1 if regressions found
        #[arg(long)]
        fail_on_regression: bool,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,
    },

    /// Create starter config and example manifest
    Init,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let default_directive = if cli.verbose {
        "gradekeeper=info"
    } else {
        "gradekeeper=warn"
    };
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_directive)),
        )
        .init();

    let result = match cli.command {
        Commands::Grade {
            manifest,
            results,
            project,
            output,
            format,
            parallelism,
            config,
            quiet,
            strict,
        } => {
            commands::grade::execute(commands::grade::GradeArgs {
                manifest,
                results,
                project,
                output,
                format,
                parallelism,
                config,
                quiet,
                strict,
            })
            .await
        }
        Commands::Validate { manifest } => commands::validate::execute(manifest),
        Commands::Export {
            manifest,
            project,
            output,
        } => commands::export::execute(manifest, project, output),
        Commands::Compare {
            baseline,
            current,
            threshold,
            fail_on_regression,
            format,
        } => commands::compare::execute(baseline, current, threshold, fail_on_regression, format),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
