mod cli;
mod core;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::core::config::ConfigOverrides;

#[derive(Parser)]
#[command(
    name = "claude-monitor",
    about = "Claude Code usage monitor",
    version,
    arg_required_else_help = true
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Disable ANSI colors
    #[arg(long, global = true)]
    no_color: bool,

    /// Verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Args, Debug)]
struct ConfigArgs {
    /// Email reported with every upload
    #[arg(long)]
    email: Option<String>,

    /// Collector base URL
    #[arg(long)]
    server: Option<String>,

    /// Seconds between uploads
    #[arg(long)]
    interval: Option<u64>,
}

impl From<ConfigArgs> for ConfigOverrides {
    fn from(args: ConfigArgs) -> Self {
        Self {
            email: args.email,
            server_url: args.server,
            interval_seconds: args.interval,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Install as background service (auto-start on login)
    Install(ConfigArgs),
    /// Remove the background service
    Uninstall,
    /// Show service status and configuration
    Status,
    /// Run the monitor in the foreground
    Run(ConfigArgs),
    /// Collect usage and write it to a file without uploading
    Test {
        /// Where to write the report (default: <temp dir>/claude-usage.json)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Print the report to stdout instead of writing a file
        #[arg(short, long)]
        json: bool,
    },
    /// Show version information
    Version,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let output_opts = cli::output::OutputOptions {
        use_color: cli::output::detect_color(!cli.no_color),
        verbose: cli.verbose,
    };

    // The agent sets up its own file logging once the config is known.
    if !matches!(cli.command, Commands::Run(_)) {
        core::logging::init_cli(cli.verbose);
    }

    match cli.command {
        Commands::Install(args) => {
            cli::install_cmd::install(&args.into(), &output_opts).await?
        }
        Commands::Uninstall => cli::install_cmd::uninstall(&output_opts).await?,
        Commands::Status => cli::status_cmd::run(&output_opts).await?,
        Commands::Run(args) => cli::run_cmd::run(&args.into(), cli.verbose).await?,
        Commands::Test { output, json } => cli::test_cmd::run(output, json, &output_opts).await?,
        Commands::Version => println!("claude-monitor v{}", env!("CARGO_PKG_VERSION")),
    }

    Ok(())
}
