// ABOUTME: Entry point for the converge CLI application.
// ABOUTME: Parses arguments and dispatches to appropriate command handlers.

mod cli;

use clap::Parser;
use cli::{Cli, Commands};
use converge::config::{self, Settings};
use converge::deploy::{Manifests, TABBED_HEADERS};
use converge::error::{Error, Result};
use converge::store::{HttpStateManager, StoreError, StoredManifests};
use std::env;
use std::path::Path;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("warn")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .init();

    let result = run(cli).await;

    if let Err(e) = result {
        eprintln!("Error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Deployments { dir } => list_deployments(&dir),
        Commands::Diff { from, to } => diff(&from, &to),
        Commands::Publish { dir, prior, server } => {
            let cwd = env::current_dir()?;
            let mut settings = Settings::discover_or_default(&cwd)?;
            if server.is_some() {
                settings.server = server;
            }
            publish(&settings, &dir, prior.as_deref()).await
        }
    }
}

/// Print the intended deployment set of a state directory.
fn list_deployments(dir: &Path) -> Result<()> {
    let state = config::load_state(dir)?;
    let deployments = state.deployments()?;

    println!("{}", TABBED_HEADERS);
    for deployment in deployments.to_vec() {
        println!("{}", deployment.tabbed());
    }
    Ok(())
}

/// Print how the deployments of `to` differ from those of `from`.
fn diff(from: &Path, to: &Path) -> Result<()> {
    let existing = config::load_state(from)?.deployments()?;
    let intended = config::load_state(to)?.deployments()?;
    let diff = existing.diff(&intended);

    for d in diff.new.to_vec() {
        println!("+ {}", d);
    }
    for d in diff.gone.to_vec() {
        println!("- {}", d);
    }
    for pair in &diff.changed {
        println!("~ {}", pair.prior);
        println!("  {}", pair.post);
    }
    println!(
        "{} new, {} gone, {} changed, {} unchanged",
        diff.new.len(),
        diff.gone.len(),
        diff.changed.len(),
        diff.same.len()
    );
    Ok(())
}

/// Publish the manifests of `dir` to the state server.
async fn publish(settings: &Settings, dir: &Path, prior_dir: Option<&Path>) -> Result<()> {
    let store = settings.state_manager()?;
    let post = config::load_state(dir)?.manifests;

    let prior = match prior_dir {
        Some(prior_dir) => StoredManifests::from(config::load_state(prior_dir)?.manifests),
        None => read_current(&store, &post).await?,
    };

    let report = store.publish(&prior, &post).await;
    println!(
        "{} created, {} modified, {} deleted",
        report.created, report.modified, report.deleted
    );

    if report.is_success() {
        return Ok(());
    }
    for (id, e) in &report.failures {
        eprintln!("  ✗ {}: {}", id, e);
    }
    Err(Error::PublishFailed(report.failures.len()))
}

/// What the server currently holds for each manifest in `post`, with the
/// tags later writes are conditional on. Manifests missing from `post` are
/// not read, so nothing is deleted.
async fn read_current(store: &HttpStateManager, post: &Manifests) -> Result<StoredManifests> {
    let mut current = StoredManifests::new();
    for manifest in post.iter() {
        match store.read(&manifest.id()).await {
            Ok(versioned) => current.insert(versioned)?,
            Err(StoreError::NotFound(_)) => {}
            Err(e) => return Err(e.into()),
        }
    }
    Ok(current)
}
