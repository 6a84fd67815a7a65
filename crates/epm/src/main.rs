//! EPM command-line front end
//!
//! Wires the library to the local blob store and the directory registry under
//! the EPM home.

use anyhow::Context;
use clap::{Parser, Subcommand};
use epm::{
    ContentHost, DirectoryRegistry, EpmConfig, Installer, LocalStore, Manifest, Publisher,
    Registry,
};
use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "epm")]
#[command(about = "Package manager for content-addressed source packages", long_about = None)]
#[command(version)]
struct Cli {
    /// Log at debug level unless RUST_LOG is set
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Install the dependencies of a manifest
    Install {
        /// Manifest file (defaults to ./epm.json)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
        /// Install directory (defaults to ./installed_contracts)
        #[arg(short, long)]
        destination: Option<PathBuf>,
    },

    /// Publish the package described by a manifest
    Publish {
        /// Manifest file (defaults to ./epm.json)
        #[arg(short, long)]
        manifest: Option<PathBuf>,
        /// JSON object mapping contract names to their metadata
        #[arg(long)]
        metadata: Option<PathBuf>,
    },

    /// Show the version and lockfile a range resolves to
    Resolve {
        /// Package name
        name: String,
        /// Version range
        #[arg(default_value = "*")]
        range: String,
    },
}

/// Registry and content host backing the command-line tool
async fn open_backends(config: &EpmConfig) -> anyhow::Result<(Registry, Arc<dyn ContentHost>)> {
    let store = LocalStore::open(&config.store_dir)
        .await
        .with_context(|| format!("opening blob store at {}", config.store_dir.display()))?;
    let registry = DirectoryRegistry::open(&config.registry_dir)
        .await
        .with_context(|| format!("opening registry at {}", config.registry_dir.display()))?;

    Ok((Registry::new(Arc::new(registry)), Arc::new(store)))
}

fn read_metadata(path: Option<PathBuf>) -> anyhow::Result<BTreeMap<String, serde_json::Value>> {
    let Some(path) = path else {
        return Ok(BTreeMap::new());
    };
    let content = std::fs::read(&path)
        .with_context(|| format!("reading contract metadata {}", path.display()))?;
    serde_json::from_slice(&content)
        .with_context(|| format!("{} must be a JSON object of contract metadata", path.display()))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    if let Err(e) = epm::logging::init(level) {
        eprintln!("warning: logging unavailable: {}", e);
    }

    let mut config = EpmConfig::load()?;

    match cli.command {
        Commands::Install {
            manifest,
            destination,
        } => {
            if let Some(manifest) = manifest {
                config = config.with_manifest_file(manifest);
            }
            if let Some(destination) = destination {
                config = config.with_installed_packages_directory(destination);
            }

            let manifest = Manifest::read(&config.manifest_file)?;
            let (registry, host) = open_backends(&config).await?;
            let report = Installer::new(registry, host)
                .install_dependencies(&manifest, &config.installed_packages_directory)
                .await?;

            for package in &report.installed {
                println!("installed {}@{} -> {}", package.name, package.version, package.path.display());
            }
            for package in &report.skipped {
                println!("up to date {}@{}", package.name, package.version);
            }
            println!(
                "\nDone! {} installed, {} already present.",
                report.installed.len(),
                report.skipped.len()
            );
        }

        Commands::Publish { manifest, metadata } => {
            if let Some(manifest) = manifest {
                config = config.with_manifest_file(manifest);
            }
            let metadata = read_metadata(metadata)?;

            let (registry, host) = open_backends(&config).await?;
            let receipt = Publisher::new(registry, host)
                .publish(&config.manifest_file, &config.base_path(), metadata)
                .await?;

            println!(
                "published {}@{} ({} files)\nlockfile: {}",
                receipt.package_name,
                receipt.version,
                receipt.lockfile.sources.len(),
                receipt.lockfile_uri
            );
        }

        Commands::Resolve { name, range } => {
            let (registry, _) = open_backends(&config).await?;
            let entry = registry.resolve(&name, &range).await?;
            println!("{}@{} {}", name, entry.version, entry.lockfile_uri);
        }
    }

    Ok(())
}
