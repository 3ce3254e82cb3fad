//! FLOWGATE CLI
//!
//! Validate, inspect and package flow configurations.

#![warn(missing_docs)]
#![warn(clippy::all)]

use clap::{Parser, Subcommand};
use color_eyre::Result;
use color_eyre::eyre::{WrapErr, bail};
use flowgate_core::FlowError;
use flowgate_document::parse_flow_bytes;
use flowgate_extension::{BundleChecker, ExtensionRegistry};
use flowgate_flow::{
    FlowClassification, FlowSynchronizer, SynchronizerConfig, extract, is_flow_empty,
};
use flowgate_storage::{StorageConfig, read_flow, write_flow};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "flowgate")]
#[command(about = "FLOWGATE - flow configuration validation", long_about = None)]
struct Cli {
    /// Log at debug level
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a flow and check its bundles
    Check {
        /// Flow file (gzip unless --plain)
        file: PathBuf,
        /// The file is uncompressed XML
        #[arg(long)]
        plain: bool,
        /// JSON manifest of installed bundles
        #[arg(short, long)]
        manifest: Option<PathBuf>,
        /// Report every missing bundle instead of stopping at the first
        #[arg(long)]
        all: bool,
    },
    /// Print whether a flow is empty
    Empty {
        /// Flow file (gzip unless --plain)
        file: PathBuf,
        /// The file is uncompressed XML
        #[arg(long)]
        plain: bool,
    },
    /// Decide whether the stored flow would be loaded
    Classify {
        /// Synchronizer config (JSON)
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Flow file, overriding the config
        #[arg(short, long)]
        flow: Option<PathBuf>,
        /// JSON manifest of installed bundles, overriding the config
        #[arg(short, long)]
        manifest: Option<PathBuf>,
        /// Skip bundle compatibility checks
        #[arg(long)]
        skip_bundles: bool,
    },
    /// Validate uncompressed XML and store it gzip-compressed
    Pack {
        /// Uncompressed flow XML
        input: PathBuf,
        /// Output path
        output: PathBuf,
        /// Gzip level (0-9)
        #[arg(short, long, default_value_t = 6)]
        level: u32,
    },
}

fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("flowgate=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flowgate=info"))
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::Check {
            file,
            plain,
            manifest,
            all,
        } => check(&file, plain, manifest.as_deref(), all),
        Commands::Empty { file, plain } => {
            let bytes = read_input(&file, plain)?;
            println!("{}", is_flow_empty(&bytes)?);
            Ok(())
        }
        Commands::Classify {
            config,
            flow,
            manifest,
            skip_bundles,
        } => classify(config.as_deref(), flow, manifest, skip_bundles),
        Commands::Pack {
            input,
            output,
            level,
        } => pack(&input, &output, level),
    }
}

fn read_input(path: &Path, plain: bool) -> Result<Vec<u8>> {
    if plain {
        fs::read(path).wrap_err_with(|| format!("reading {}", path.display()))
    } else {
        Ok(read_flow(path)?)
    }
}

fn load_registry(manifest: Option<&Path>) -> Result<ExtensionRegistry> {
    match manifest {
        Some(path) => Ok(ExtensionRegistry::from_manifest_file(path)?),
        None => Ok(ExtensionRegistry::new()),
    }
}

fn check(file: &Path, plain: bool, manifest: Option<&Path>, all: bool) -> Result<()> {
    let bytes = read_input(file, plain)?;
    let Some(doc) = parse_flow_bytes(&bytes)? else {
        println!("{}: no flow configuration", file.display());
        return Ok(());
    };

    if manifest.is_none() {
        warn!("no extension manifest given, skipping bundle checks");
        println!("{}: valid", file.display());
        return Ok(());
    }

    let registry = load_registry(manifest)?;
    let checker = BundleChecker::new(&registry);
    if all {
        let missing = checker.check_all(&doc);
        for m in &missing {
            println!("missing: {}", m);
        }
        if !missing.is_empty() {
            bail!("{} component(s) reference missing bundles", missing.len());
        }
    } else {
        checker.check(&doc).map_err(FlowError::from)?;
    }

    println!("{}: valid, {}", file.display(), extract(&doc).summary());
    Ok(())
}

fn classify(
    config: Option<&Path>,
    flow: Option<PathBuf>,
    manifest: Option<PathBuf>,
    skip_bundles: bool,
) -> Result<()> {
    let mut config = match config {
        Some(path) => SynchronizerConfig::from_json_file(path)?,
        None => SynchronizerConfig::default(),
    };
    if let Some(flow) = flow {
        let storage = config.storage.clone().with_flow_file(flow);
        config = config.with_storage(storage);
    }
    if let Some(manifest) = manifest {
        config = config.with_extensions_manifest(manifest);
    }
    if skip_bundles {
        config = config.with_check_bundles(false);
    }

    if config.check_bundles && config.extensions_manifest.is_none() {
        warn!("bundle checks enabled without a manifest, every bundle will be missing");
    }
    let registry = load_registry(config.extensions_manifest.as_deref())?;
    info!(bundles = registry.count(), "loaded extension registry");
    let synchronizer = FlowSynchronizer::new(config, Arc::new(registry));

    match synchronizer.load_from_disk()? {
        FlowClassification::Fresh => println!("fresh"),
        FlowClassification::Load(model) => println!("load: {}", model.summary()),
    }
    Ok(())
}

fn pack(input: &Path, output: &Path, level: u32) -> Result<()> {
    let xml = fs::read(input).wrap_err_with(|| format!("reading {}", input.display()))?;
    if parse_flow_bytes(&xml)?.is_none() {
        bail!("{} is empty", input.display());
    }

    let level = StorageConfig::default().with_compression_level(level).compression_level;
    write_flow(output, &xml, level)?;
    println!("packed {} into {}", input.display(), output.display());
    Ok(())
}
