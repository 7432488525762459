//! coursekit CLI: content document checks and answer grading.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(name = "coursekit", version, about = "Lesson content authoring checks and answer grading")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Load and lint content documents
    Validate {
        /// Path to a content document or a directory of documents
        #[arg(long)]
        document: PathBuf,
    },

    /// Rewrite a document in the current shape
    Migrate {
        /// Path to the content document
        #[arg(long)]
        document: PathBuf,

        /// Item type to assume when the document does not name one
        #[arg(long)]
        item_type: Option<String>,

        /// Write here instead of stdout
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Bring gap metadata in line with the blanks in gap-fill content
    Reconcile {
        /// Path to the content document
        #[arg(long)]
        document: PathBuf,

        /// Update the document in place
        #[arg(long)]
        write: bool,
    },

    /// Grade one submission against a block
    Grade {
        /// Path to the content document
        #[arg(long)]
        document: PathBuf,

        /// Block id to grade
        #[arg(long)]
        block: String,

        /// Submitted answer as JSON (e.g. '{"selected": [0]}')
        #[arg(long)]
        answer: String,

        /// Include the correct answer in the output
        #[arg(long)]
        show_solutions: bool,

        /// Student id recorded with the attempt
        #[arg(long, default_value = "cli")]
        student: String,

        /// Output format: text, json
        #[arg(long, default_value = "text")]
        format: String,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Fold an attempt log into per-block statistics
    Stats {
        /// JSON file with a list of attempts
        #[arg(long)]
        attempts: PathBuf,

        /// Output format: text, json, markdown
        #[arg(long, default_value = "text")]
        format: String,

        /// Also save the report as JSON
        #[arg(long)]
        output: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Create starter config and example document
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("coursekit=info".parse().expect("static directive")),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Validate { document } => commands::validate::execute(document),
        Commands::Migrate {
            document,
            item_type,
            output,
        } => commands::migrate::execute(document, item_type, output),
        Commands::Reconcile { document, write } => commands::reconcile::execute(document, write),
        Commands::Grade {
            document,
            block,
            answer,
            show_solutions,
            student,
            format,
            config,
        } => {
            commands::grade::execute(document, block, answer, show_solutions, student, format, config)
                .await
        }
        Commands::Stats {
            attempts,
            format,
            output,
            config,
        } => commands::stats::execute(attempts, format, output, config),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
