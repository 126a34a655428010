//! aula CLI: take timed evaluations and practice rounds from the terminal.

use std::path::PathBuf;
use std::process;

use clap::{Parser, Subcommand};

use aula_core::model::SubjectType;

mod commands;

#[derive(Parser)]
#[command(name = "aula", version, about = "Timed evaluations and practice rounds")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Take a timed evaluation
    Take {
        /// Evaluation id (see `aula list`)
        #[arg(long)]
        evaluation: String,

        /// Path to .toml bank or directory (default: builtin bank)
        #[arg(long)]
        bank: Option<PathBuf>,

        /// User id attached to the result
        #[arg(long)]
        user: Option<String>,

        /// Start the timer immediately
        #[arg(long)]
        no_countdown: bool,

        /// Latency of the simulated reporter in milliseconds
        #[arg(long)]
        latency_ms: Option<u64>,

        /// Print the final summary as markdown
        #[arg(long)]
        markdown: bool,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Practice a subject with immediate feedback
    Practice {
        /// Subject: math or communication
        #[arg(long)]
        subject: SubjectType,

        /// Path to .toml bank or directory (default: builtin bank)
        #[arg(long)]
        bank: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// List available evaluations
    List {
        /// Path to .toml bank or directory (default: builtin bank)
        #[arg(long)]
        bank: Option<PathBuf>,

        /// Config file path
        #[arg(long)]
        config: Option<PathBuf>,
    },

    /// Validate question bank TOML files
    Validate {
        /// Path to bank file or directory
        #[arg(long)]
        bank: PathBuf,
    },

    /// Create starter config and sample bank
    Init,
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("aula=info".parse().unwrap()),
        )
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Take {
            evaluation,
            bank,
            user,
            no_countdown,
            latency_ms,
            markdown,
            config,
        } => {
            let options = commands::take::TakeOptions {
                user,
                no_countdown,
                latency_ms,
                markdown,
            };
            commands::take::execute(evaluation, bank, options, config).await
        }
        Commands::Practice {
            subject,
            bank,
            config,
        } => commands::practice::execute(subject, bank, config).await,
        Commands::List { bank, config } => commands::list::execute(bank, config).await,
        Commands::Validate { bank } => commands::validate::execute(bank),
        Commands::Init => commands::init::execute(),
    };

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        process::exit(1);
    }
}
