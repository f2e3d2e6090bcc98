use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(name = "hybrid-build-kit")]
#[command(about = "Prepares Cordova projects for a target environment and platform")]
#[command(version)]
pub struct CliConfig {
    /// Project root (defaults to the current directory)
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Build configuration file, relative to the project root
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[arg(short, long, global = true, help = "Enable verbose output")]
    pub verbose: bool,

    #[arg(long, global = true, help = "Emit diagnostics as JSON lines")]
    pub log_json: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Initializes the project with targeted env/platform
    Initialize {
        #[arg(default_value = "browser")]
        env: String,
        #[arg(default_value = "android")]
        platform: String,
    },

    /// Wraps up the build process
    Finalize {
        env: Option<String>,
        #[arg(default_value = "android")]
        platform: String,
        /// Copies build output to the bin folder
        #[arg(short, long)]
        copy_output: bool,
    },

    /// Sets up the project to support hybrid-build-kit commands
    Setup {
        /// Copy this template directory instead of the bundled templates
        #[arg(long)]
        templates: Option<PathBuf>,
        /// Overwrite files that already exist under the build directory
        #[arg(long)]
        force: bool,
    },
}
