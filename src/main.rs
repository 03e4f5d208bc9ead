// swap-resizer - Memory/swap reporting and swap file resizing for Linux
// SPDX-License-Identifier: GPL-3.0-or-later

use clap::{Parser, Subcommand};
use tracing::error;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use swap_resizer::command::SystemExecutor;
use swap_resizer::config::{Config, ResizerConfig};
use swap_resizer::helpers::to_mb;
use swap_resizer::host::LocalHost;
use swap_resizer::resize::{ResizeRequest, SwapResizer};
use swap_resizer::state::SwapState;
use swap_resizer::status::ConsoleSink;
use swap_resizer::swaps::format_mb;

#[derive(Parser)]
#[command(name = "swap-resizer")]
#[command(about = "Show memory and swap usage and resize the swap file")]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Swap file to manage (overrides swapfile_path from the config)
    #[arg(long, global = true)]
    swapfile: Option<String>,

    /// Privilege elevation helper (overrides privilege_helper from the config)
    #[arg(long, global = true)]
    helper: Option<String>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Show memory and swap usage
    Status,
    /// Resize the swap file; 0 disables it, no value keeps the current size
    Resize {
        /// New size in MB
        #[arg(allow_negative_numbers = true)]
        size_mb: Option<i64>,
    },
}

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let result = match cli.command {
        Some(Commands::Status) => load_settings(&cli.swapfile, &cli.helper).map(status),
        Some(Commands::Resize { size_mb }) => {
            load_settings(&cli.swapfile, &cli.helper).and_then(|settings| resize(settings, size_mb))
        }
        None => {
            // No subcommand provided, show help
            use clap::CommandFactory;
            Cli::command().print_help().ok();
            println!();
            return;
        }
    };

    if let Err(e) = result {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => tracing::Level::WARN,
        1 => tracing::Level::INFO,
        2 => tracing::Level::DEBUG,
        _ => tracing::Level::TRACE,
    };

    // Allow RUST_LOG to override if set
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.to_string()));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Config files, then command line overrides
fn load_settings(
    swapfile: &Option<String>,
    helper: &Option<String>,
) -> Result<ResizerConfig, Box<dyn std::error::Error>> {
    let mut config = Config::load()?;
    if let Some(path) = swapfile {
        config.set("swapfile_path", path.as_str());
    }
    if let Some(helper) = helper {
        config.set("privilege_helper", helper.as_str());
    }
    Ok(ResizerConfig::from_config(&config)?)
}

fn print_state(state: &SwapState) {
    let memory = &state.memory;
    let swap = &state.swap;

    println!("\nMemory:");
    println!("  Total:         {} MB", to_mb(memory.total_bytes));
    println!("  Used:          {} MB", to_mb(memory.used_bytes));
    println!("  Available:     {} MB", to_mb(memory.available_bytes()));

    println!("\nSwap:");
    println!("  Total:         {} MB", to_mb(swap.total_bytes));
    println!("  Used:          {} MB", to_mb(swap.used_bytes));
    println!("  Available:     {} MB", to_mb(swap.free_bytes));
    println!("  Partition:     {}", format_mb(state.backing.partition_mb));
    println!("  File:          {}", format_mb(state.backing.file_mb));
}

/// Show memory and swap usage
fn status(settings: ResizerConfig) {
    let resizer = SwapResizer::new(SystemExecutor, LocalHost::new(&settings), settings);
    let state = resizer.refresh(&mut ConsoleSink);
    print_state(&state);
}

/// Resize the swap file and show the resulting state
fn resize(
    settings: ResizerConfig,
    size_mb: Option<i64>,
) -> Result<(), Box<dyn std::error::Error>> {
    let mut sink = ConsoleSink;
    let mut resizer = SwapResizer::new(SystemExecutor, LocalHost::new(&settings), settings);

    let current = resizer.refresh(&mut sink).swap_total_mb();
    let target = match size_mb {
        Some(size) => size,
        None => i64::try_from(current)?,
    };

    match resizer.resize(ResizeRequest::new(target), current, &mut sink) {
        Ok(outcome) => {
            print_state(outcome.state());
            Ok(())
        }
        Err(e) => {
            // A failed command can still have changed swap
            if let Some(state) = e.state() {
                print_state(state);
            }
            Err(e.into())
        }
    }
}
