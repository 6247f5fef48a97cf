//! Reelmeta command-line entry point: owns argument parsing, configuration
//! loading, logging-subscriber setup, and the process exit-code mapping —
//! every ambient concern the orchestration core itself stays out of.
mod config_loader;
mod plugins;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use reelmeta_core::{Config, ManifestRegistry, Pipeline, PluginLoader};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Parser)]
#[command(name = "reelmeta", about = "Plugin-driven media metadata enrichment")]
struct Args {
    /// Path to the configuration document (JSON, YAML, or TOML).
    #[arg(long, default_value = "reelmeta.json")]
    config: PathBuf,

    /// Root directory containing one subdirectory per plugin.
    #[arg(long, default_value = "plugins")]
    plugins_dir: PathBuf,

    /// Simulate the run without touching the filesystem.
    #[arg(long)]
    dry_run: bool,

    /// Emit verbose, structured diagnostics.
    #[arg(long)]
    debug: bool,

    /// Use hardlinks instead of moves for save tasks.
    #[arg(long)]
    hardlink: bool,
}

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else {
        EnvFilter::new("info")
    };

    let subscriber = tracing_subscriber::fmt().with_env_filter(filter);
    if debug {
        subscriber.json().init();
    } else {
        subscriber.compact().init();
    }

    let _ = tracing_log::LogTracer::init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_tracing(args.debug);

    let mut config: Config = match config_loader::load(&args.config) {
        Ok(c) => c,
        Err(e) => {
            tracing::error!(error = %e, "failed to load configuration");
            return ExitCode::from(2);
        }
    };

    config.options.dry_run |= args.dry_run;
    config.options.debug |= args.debug;
    config.options.hardlink |= args.hardlink;

    let registry = match ManifestRegistry::load(&args.plugins_dir).await {
        Ok(r) => r,
        Err(e) => {
            tracing::error!(error = %e, "failed to load plugin manifests");
            return ExitCode::from(2);
        }
    };

    let mut loader = PluginLoader::new();
    plugins::register_builtin_plugins(&mut loader);

    let plugin_config = config.plugin_config_entries();
    let plugins = match loader.load_enabled(&registry, &plugin_config) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "failed to load plugins");
            return ExitCode::from(2);
        }
    };

    let pipeline = match Pipeline::new(registry, plugins) {
        Ok(p) => p,
        Err(e) => {
            tracing::error!(error = %e, "failed to plan dependency graph");
            return ExitCode::from(2);
        }
    };

    let response = pipeline.run(&config).await;
    let document = response.to_json(&config);

    match serde_json::to_string_pretty(&document) {
        Ok(rendered) => println!("{rendered}"),
        Err(e) => {
            tracing::error!(error = %e, "failed to serialize response");
            return ExitCode::from(3);
        }
    }

    if response.success() {
        ExitCode::from(0)
    } else {
        ExitCode::from(1)
    }
}
