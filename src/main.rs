//! Scratchbox - workspace sandbox with HTTP API.
//!
//! Usage:
//!   scratchbox serve [--port 8080]        # Start HTTP server
//!   scratchbox --run -- <command> [args]  # Run one command in the workspace

use clap::{Parser, Subcommand};
use scratchbox::config::Config;
use scratchbox::exec;
use scratchbox::http_server;
use scratchbox::state::AppState;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "scratchbox")]
#[command(about = "Workspace sandbox with HTTP API")]
struct Args {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Run command directly instead of serving
    #[arg(long)]
    run: bool,

    /// Seconds before a command is killed
    #[arg(long, default_value = "30")]
    timeout: u64,

    /// Command and arguments to run
    #[arg(last = true)]
    cmd_args: Vec<String>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP server
    Serve {
        /// Port to listen on
        #[arg(long, default_value = "8080")]
        port: u16,
    },
}

#[tokio::main]
async fn main() {
    use std::process::exit;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let args = Args::parse();

    let mut config = Config::from_env();
    if let Err(e) = config.ensure_workspace() {
        eprintln!(
            "Error: cannot prepare workspace {}: {}",
            config.workspace.display(),
            e
        );
        exit(1);
    }
    tracing::info!("Workspace ready at {}", config.workspace.display());

    match args.command {
        Some(Commands::Serve { port }) => {
            if let Err(e) = http_server::run_server(port, AppState::new(config)).await {
                eprintln!("Error: {}", e);
                exit(1);
            }
        }
        None if args.run => {
            if args.cmd_args.is_empty() {
                eprintln!("Error: No command specified");
                exit(1);
            }
            match exec::run_shell(&args.cmd_args.join(" "), &config.workspace, args.timeout).await {
                Ok(outcome) => {
                    print!("{}", outcome.stdout);
                    eprint!("{}", outcome.stderr);
                    exit(outcome.exit_code);
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    exit(1);
                }
            }
        }
        None => {
            eprintln!("Error: Use 'serve' subcommand or --run flag");
            exit(1);
        }
    }
}
