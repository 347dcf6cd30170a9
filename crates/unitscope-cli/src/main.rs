use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::EnvFilter;
use unitscope::{
    GlobSet, HostScope, PluginDescriptor, PluginLoader, ResolveError, Scope, UnitStore,
    DEFAULT_INCLUDE_PATTERNS,
};

#[derive(Parser)]
#[command(author, version, about = "Inspect how plugin units resolve against a host")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve unit names through a plugin's isolation scope.
    Resolve(ResolveArgs),
    /// List the resource locations a plugin directory provides.
    List(PluginArgs),
}

#[derive(Args)]
struct PluginArgs {
    /// Plugin base directory.
    #[arg(long, conflicts_with = "manifest")]
    base: Option<PathBuf>,
    /// Plugin manifest (plugin.json) to read instead of --base/--include/--exclude.
    #[arg(long)]
    manifest: Option<PathBuf>,
    /// Include glob, relative to the base directory. Repeatable.
    #[arg(long = "include", value_name = "GLOB")]
    includes: Vec<String>,
    /// Additional exclude pattern. Repeatable.
    #[arg(long = "exclude", value_name = "PATTERN")]
    excludes: Vec<String>,
}

#[derive(Args)]
struct ResolveArgs {
    #[command(flatten)]
    plugin: PluginArgs,
    /// Directory holding the host's own units.
    #[arg(long)]
    host_base: Option<PathBuf>,
    /// Qualified unit names to resolve.
    #[arg(required = true)]
    names: Vec<String>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .try_init()
        .ok();

    let cli = Cli::parse();
    match cli.command {
        Commands::Resolve(args) => execute_resolve(args),
        Commands::List(args) => execute_list(args),
    }
}

fn descriptor(args: &PluginArgs) -> Result<PluginDescriptor> {
    if let Some(manifest) = &args.manifest {
        return PluginDescriptor::from_manifest_file(manifest)
            .with_context(|| format!("failed to load manifest {}", manifest.display()));
    }
    let base = args
        .base
        .clone()
        .context("either --base or --manifest is required")?;
    let builder = args
        .includes
        .iter()
        .fold(PluginDescriptor::builder(&base), |b, p| b.include(p.as_str()));
    args.excludes
        .iter()
        .fold(builder, |b, p| b.exclude(p.as_str()))
        .build()
        .with_context(|| format!("invalid plugin configuration for {}", base.display()))
}

fn host_scope(host_base: Option<&PathBuf>) -> Result<Arc<HostScope>> {
    let Some(dir) = host_base else {
        return Ok(Arc::new(HostScope::new()));
    };
    let includes = GlobSet::compile(DEFAULT_INCLUDE_PATTERNS)?;
    let store = UnitStore::build(dir, &includes)
        .with_context(|| format!("failed to index host units in {}", dir.display()))?;
    Ok(Arc::new(HostScope::with_search_path(store)))
}

fn execute_resolve(args: ResolveArgs) -> Result<()> {
    let descriptor = descriptor(&args.plugin)?;
    let host = host_scope(args.host_base.as_ref())?;
    let loader = PluginLoader::new(descriptor, host)?;
    let plugin_scope = loader.scope().id();

    for name in &args.names {
        match loader.load_unit(name) {
            Ok(unit) => {
                let origin = unit
                    .origin()
                    .map(|origin| origin.to_string())
                    .unwrap_or_else(|| "host".to_string());
                let mode = if unit.scope() == plugin_scope {
                    "isolated"
                } else {
                    "delegated"
                };
                tracing::debug!(unit = %name, mode, scope = %unit.scope(), "resolved unit");
                println!("{name} {mode} {origin}");
            }
            Err(ResolveError::NotFound(_)) => println!("{name} missing"),
            Err(err) => return Err(err).with_context(|| format!("failed to resolve {name}")),
        }
    }
    Ok(())
}

fn execute_list(args: PluginArgs) -> Result<()> {
    let descriptor = descriptor(&args)?;
    let store = UnitStore::build(descriptor.base_directory(), descriptor.includes())?;
    if store.locations().is_empty() {
        println!("No resource locations matched in {}.", descriptor.base_directory().display());
        return Ok(());
    }
    for location in store.locations() {
        println!("{location}");
        for unit in store.units_in(location) {
            println!("  - {unit}");
        }
    }
    Ok(())
}
