use std::path::PathBuf;

use clap::{Parser, Subcommand};

use bitcleaner::app::{App, SimpleOptions, TreeOptions};
use bitcleaner::config::groups::Platform;
use bitcleaner::config::settings::Settings;

#[derive(Parser, Debug)]
#[command(name = "bitcleaner", version, about = "Find and delete space-hungry files and folders")]
struct Cli {
    /// Never use du/PowerShell; walk directories instead
    #[arg(long, global = true)]
    no_native: bool,

    /// Stats file (default: platform data directory)
    #[arg(long, global = true)]
    stats_file: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Build a size map of a directory
    Tree {
        /// Directory to analyze
        #[arg(default_value = ".")]
        path: String,

        /// Directories inside the tree to delete after scanning
        #[arg(long = "delete")]
        delete: Vec<PathBuf>,

        /// Actually delete; without this, deletions are only listed
        #[arg(short = 'y', long)]
        yes: bool,

        /// Write the tree as JSON to this file
        #[arg(long)]
        export_json: Option<PathBuf>,
    },

    /// Scan the known cleanup targets for this platform
    Simple {
        /// Group config file (JSON) instead of the built-in list
        #[arg(short = 'c', long)]
        config: Option<PathBuf>,

        /// Platform list to use: windows, linux, macos, ios, android
        #[arg(long)]
        platform: Option<Platform>,

        /// Groups to delete after scanning
        #[arg(long = "delete-group")]
        delete_groups: Vec<String>,

        /// Items or sub-entries to delete after scanning
        #[arg(long = "delete-item")]
        delete_items: Vec<PathBuf>,

        /// Actually delete; without this, deletions are only listed
        #[arg(short = 'y', long)]
        yes: bool,
    },

    /// Show cumulative cleanup statistics
    Stats {
        /// Reset the counters to zero
        #[arg(long)]
        reset: bool,
    },

    /// Open a path in the system file manager
    Open { path: String },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing (logs to stderr)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut settings = Settings::default();
    settings.native_probe = !cli.no_native;
    if let Some(stats_file) = cli.stats_file {
        settings.stats_file = stats_file;
    }

    match cli.command {
        Command::Tree {
            path,
            delete,
            yes,
            export_json,
        } => {
            let app = App::new(settings);
            app.run_tree(TreeOptions {
                path,
                delete,
                confirm: yes,
                export_json,
            })
            .await
        }
        Command::Simple {
            config,
            platform,
            delete_groups,
            delete_items,
            yes,
        } => {
            settings.groups_file = config;
            settings.platform = platform;
            let app = App::new(settings);
            app.run_simple(SimpleOptions {
                delete_groups,
                delete_items,
                confirm: yes,
            })
            .await
        }
        Command::Stats { reset } => App::new(settings).show_stats(reset),
        Command::Open { path } => App::new(settings).open(&path),
    }
}
