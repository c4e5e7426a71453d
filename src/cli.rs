// ABOUTME: Command-line interface definition using clap derive macros.
// ABOUTME: Defines all subcommands and their arguments.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "converge")]
#[command(about = "Reconcile intended deployments against running clusters")]
#[command(version)]
pub struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List the deployments a state directory expands to
    Deployments {
        /// State directory (clusters.yml and manifests/)
        dir: PathBuf,
    },

    /// Show what would change going from one state directory to another
    Diff {
        /// State directory describing what runs now
        from: PathBuf,
        /// State directory describing what should run
        to: PathBuf,
    },

    /// Publish manifests to the state server using conditional writes
    Publish {
        /// State directory holding the manifests to publish
        dir: PathBuf,

        /// State directory the server is expected to hold. Manifests only in
        /// this directory are deleted. Without it, the server is read for the
        /// manifests in DIR and nothing is deleted
        #[arg(long)]
        prior: Option<PathBuf>,

        /// State server base URL (overrides converge.yml)
        #[arg(short, long)]
        server: Option<String>,
    },
}
