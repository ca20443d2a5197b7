use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use portal_plugins::api::ApiServer;
use portal_plugins::api::plugins::RegistryResponse;
use portal_plugins::{
    AccessGate, CapabilityRequirement, CapabilityRequirements, Config, HttpCapabilityService,
    PluginHost,
};

/// Portal plugins - runtime plugin loader for the portal shell
#[derive(Parser)]
#[command(name = "portal-plugins", version, about)]
struct Cli {
    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Load plugins and serve the inspection API (default)
    Serve {
        /// Port to listen on
        #[arg(long, env = "PORTAL_API_PORT")]
        port: Option<u16>,
    },
    /// Run one load cycle and print the registry
    List {
        /// Seconds to wait for every plugin to register
        #[arg(short, long, default_value = "10")]
        timeout: u64,
    },
    /// Ask the capability service whether a set of requirements is granted
    Check {
        /// Verb of a requirement, paired with the --resource at the same position
        #[arg(long = "verb", required = true)]
        verbs: Vec<String>,
        /// Resource of a requirement
        #[arg(long = "resource", required = true)]
        resources: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,portal_plugins=info",
        1 => "info,portal_plugins=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    match cli.command.unwrap_or(Command::Serve { port: None }) {
        Command::Serve { port } => serve(&config, port).await,
        Command::List { timeout } => list(&config, Duration::from_secs(timeout)).await,
        Command::Check { verbs, resources } => check(&config, verbs, resources).await,
    }
}

async fn serve(config: &Config, port: Option<u16>) -> anyhow::Result<()> {
    let port = port.unwrap_or(config.api_server.port);
    tracing::info!(
        plugins = %config.plugins_endpoint,
        origin = %config.bundle_origin,
        port,
        "starting portal plugin runtime"
    );

    let host = Arc::new(PluginHost::from_config(config));
    host.start().await;

    let loader = Arc::clone(&host);
    tokio::spawn(async move {
        let report = loader.load_cycle().await;
        tracing::info!(
            cycle = report.cycle,
            executed = report.load.executed,
            failed = report.load.failed,
            "initial load cycle finished"
        );
    });

    let server = ApiServer::new(Arc::clone(&host), port).spawn();

    tokio::select! {
        result = server => {
            result??;
        }
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("shutting down");
        }
    }

    host.shutdown().await;
    Ok(())
}

async fn list(config: &Config, timeout: Duration) -> anyhow::Result<()> {
    let host = PluginHost::from_config(config);
    host.start().await;

    let report = host.load_cycle().await;
    if let Some(e) = &report.fetch_error {
        anyhow::bail!("could not read plugin list: {e}");
    }

    if tokio::time::timeout(timeout, host.wait_until_loaded()).await.is_err() {
        let registry = host.registry();
        tracing::warn!(
            registered = registry.len(),
            expected = ?registry.expected(),
            "not every plugin registered in time"
        );
    }

    let response = RegistryResponse::from(host.registry().as_ref());
    println!("{}", serde_json::to_string_pretty(&response)?);

    host.shutdown().await;
    Ok(())
}

async fn check(config: &Config, verbs: Vec<String>, resources: Vec<String>) -> anyhow::Result<()> {
    if verbs.len() != resources.len() {
        anyhow::bail!(
            "got {} --verb and {} --resource, they must pair up",
            verbs.len(),
            resources.len()
        );
    }

    let requirements: CapabilityRequirements = verbs
        .iter()
        .zip(&resources)
        .map(|(verb, resource)| CapabilityRequirement::new(verb, resource))
        .collect();

    let service = Arc::new(HttpCapabilityService::new(config.capability_endpoint.clone()));
    let mut gate = AccessGate::new("granted", requirements.clone());
    gate.mount(service);
    let state = gate.resolved().await;

    for requirement in requirements.pairs() {
        println!("{requirement}");
    }
    println!("{}", if state.granted() { "allowed" } else { "denied" });

    Ok(())
}
