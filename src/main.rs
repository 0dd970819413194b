use anyhow::Result;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

mod cli;

#[derive(Parser)]
#[command(name = "wsmux")]
#[command(about = "Workspace multiplexer - isolated git worktrees with tiled terminal sessions")]
#[command(version)]
struct Cli {
    /// Path to the repository (defaults to current directory)
    #[arg(short, long, global = true)]
    path: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the repository's worktrees
    Worktrees {
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the branch a workspace with this name would get
    BranchName {
        name: String,

        /// Branch prefix (defaults to the configured one)
        #[arg(long)]
        prefix: Option<String>,
    },

    /// Initialize a new .wsmux/config.toml configuration file
    Init {
        /// Overwrite existing config file
        #[arg(long)]
        force: bool,
    },

    /// Create a workspace and stream its terminal to stdout until it exits
    Run {
        /// Workspace name
        name: String,

        /// Delete the workspace (worktree and branch) afterwards
        #[arg(long)]
        cleanup: bool,

        /// Command to run instead of an interactive shell
        #[arg(last = true)]
        command: Vec<String>,
    },

    /// Remove a worktree and its branch
    Remove {
        /// Path of the worktree
        worktree: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Logs go to stderr, stdout belongs to terminal output
    let log_level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let work_dir = cli.path.unwrap_or_else(|| PathBuf::from("."));

    match cli.command {
        Commands::Worktrees { json } => {
            cli::worktrees::worktrees_command(&work_dir, json)?;
        }
        Commands::BranchName { name, prefix } => {
            cli::branch_name::branch_name_command(&work_dir, &name, prefix)?;
        }
        Commands::Init { force } => {
            cli::init::init_command(&work_dir, force)?;
        }
        Commands::Run {
            name,
            cleanup,
            command,
        } => {
            let code = cli::run::run_command(&work_dir, &name, command, cleanup).await?;
            if code != 0 {
                std::process::exit(code);
            }
        }
        Commands::Remove { worktree } => {
            cli::remove::remove_command(&work_dir, &worktree)?;
        }
    }

    Ok(())
}
