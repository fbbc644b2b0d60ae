use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use icebook::{config, session};
use tracing::error;

#[derive(Parser)]
#[command(
    name = "icebook",
    about = "An order book with limit and iceberg type orders"
)]
struct Cli {
    #[arg(short, long, default_value = "icebook.toml")]
    config_path: String,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add every order of a JSON batch file and print the final book
    Replay {
        input: PathBuf,
        /// Print every order with its trades and the resulting book
        #[arg(short, long)]
        show_details: bool,
    },
    /// Write random orders to a JSON batch file
    Generate {
        count: usize,
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Read JSON orders line by line from stdin
    Interactive,
}

fn init_logging(cfg: &config::AppConfig) {
    match cfg.logger.format {
        config::LogFormat::JSON => {
            tracing_subscriber::fmt()
                .json()
                .with_max_level(cfg.logger.level)
                .with_current_span(true)
                .with_writer(io::stderr)
                .init();
        }
        config::LogFormat::COMPACT => {
            tracing_subscriber::fmt()
                .compact()
                .with_max_level(cfg.logger.level)
                .with_writer(io::stderr)
                .init();
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = config::AppConfig::load(cli.config_path.as_ref()).expect("could not load config");

    init_logging(&config);

    let mut stdout = io::stdout().lock();
    let result = match cli.command.unwrap_or(Commands::Interactive) {
        Commands::Replay {
            input,
            show_details,
        } => session::replay(&input, show_details, &mut stdout).map(|_| ()),
        Commands::Generate { count, output } => {
            let output = output.unwrap_or_else(|| config.generator.output.clone());
            session::generate(&config.generator, count, &output, &mut stdout).map(|_| ())
        }
        Commands::Interactive => {
            session::interactive(io::stdin().lock(), &mut stdout).map(|_| ())
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "command failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}
