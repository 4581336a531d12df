//! AskBuddy - Main CLI Entry Point

use anyhow::{Context, Result};
use clap::Parser;
use tracing_subscriber::EnvFilter;

use askbuddy::{
    cli::{Args, Commands},
    config::Config,
    rag::AskPipeline,
};

fn init_logging(args: &Args) {
    // RUST_LOG wins over the verbosity flags
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(args.verbosity().filter_directive()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    }
}

async fn run_ask(config: &Config, args: &Args) -> Result<()> {
    let pipeline = AskPipeline::from_config(config).context("Failed to build ask pipeline")?;

    let result = pipeline.ask(args.to_request()).await;
    pipeline.shutdown();

    match result {
        Ok(response) => {
            println!("{}", response.message);
            Ok(())
        }
        Err(e) => {
            eprintln!("Error ({}): {}", e.status_code(), e);
            std::process::exit(1);
        }
    }
}

async fn run_doctor(config: &Config) -> Result<()> {
    let pipeline = AskPipeline::from_config(config)?;

    println!("Ollama:       {}", config.ollama.url);
    println!(
        "Remote store: {}",
        if config.remote.is_configured() { "configured" } else { "disabled" }
    );

    match pipeline.warm_up().await {
        Ok(()) => {
            println!("Models:       reachable");
            Ok(())
        }
        Err(e) => {
            println!("Models:       {}", e);
            std::process::exit(1);
        }
    }
}

fn show_config(config: &Config) -> Result<()> {
    let mut shown = config.clone();
    if shown.remote.api_key.is_some() {
        shown.remote.api_key = Some("********".to_string());
    }

    let rendered = toml::to_string_pretty(&shown).context("Failed to render config")?;
    println!("{}", rendered);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if let Err(message) = args.validate() {
        eprintln!("{}", message);
        std::process::exit(2);
    }

    init_logging(&args);
    let config = load_config(&args)?;

    match &args.command {
        Some(Commands::Config) => show_config(&config),
        Some(Commands::Doctor) => run_doctor(&config).await,
        None => run_ask(&config, &args).await,
    }
}
