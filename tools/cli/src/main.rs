//! secretd CLI - drive the secret storage service from a shell.
//!
//! `serve` speaks line-delimited JSON over stdin/stdout; logs go to stderr.

mod protocol;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::{debug, info};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use secretd_crypto::{Algorithm, DhExchange, Secret, SessionCipher};
use secretd_service::{ItemProperties, SecretService, ServiceConfig};
use secretd_store::Attributes;

#[derive(Parser)]
#[command(name = "secretd")]
#[command(about = "secretd - Process-local secret storage service")]
#[command(version)]
struct Cli {
    /// Enable verbose logging.
    #[arg(short, long)]
    verbose: bool,

    /// Path to a JSON service configuration.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Serve JSON requests from stdin, one per line.
    Serve,

    /// Run a walkthrough against an in-process service.
    Demo,

    /// Print the enabled session algorithms.
    Algorithms,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Setup logging
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let subscriber = FmtSubscriber::builder()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let config = load_config(cli.config.as_deref())?;
    let service = SecretService::new(config).context("Failed to start service")?;

    match cli.command {
        Commands::Serve => cmd_serve(&service).await,
        Commands::Demo => cmd_demo(&service),
        Commands::Algorithms => cmd_algorithms(&service),
    }
}

fn load_config(path: Option<&Path>) -> Result<ServiceConfig> {
    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            ServiceConfig::load(path)
                .with_context(|| format!("Failed to load configuration from {:?}", path))
        }
        None => Ok(ServiceConfig::default()),
    }
}

/// Answer requests until stdin closes.
async fn cmd_serve(service: &SecretService) -> Result<()> {
    info!("Serving requests on stdin");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("Failed to read request")? {
        if line.trim().is_empty() {
            continue;
        }
        let response = protocol::handle_line(service, &line);
        debug!(ok = response.get("ok").is_some(), "Handled request");

        let mut encoded = serde_json::to_vec(&response)?;
        encoded.push(b'\n');
        stdout.write_all(&encoded).await?;
        stdout.flush().await?;
    }

    let closed = service.shutdown();
    info!(sessions = closed, "Input closed, shutting down");
    Ok(())
}

/// Plain session walkthrough, then an encrypted retrieval.
fn cmd_demo(service: &SecretService) -> Result<()> {
    let plain = service.open_session("plain", &[])?;
    println!("Opened session {} ({})", plain.handle, plain.algorithm);

    let work = service.create_collection("work", false)?;
    println!("Created collection {}", work);

    let everything = service.search_collections(&Attributes::new());
    println!(
        "Search {{}}: {} unlocked, {} locked",
        everything.unlocked.len(),
        everything.locked.len()
    );

    let alice = Attributes::from([("user".to_string(), "alice".to_string())]);
    let item = service.create_item(
        &plain.handle,
        work,
        ItemProperties {
            label: "alice at work".to_string(),
            attributes: alice.clone(),
            content_type: None,
        },
        &Secret::new(Algorithm::Plain.as_str(), Vec::new(), b"pa55word".to_vec()),
        false,
    )?;
    println!("Created item {}", item);

    let found = service.search_collections(&alice);
    println!(
        "Search user=alice: unlocked {:?}, locked {:?}",
        paths(&found.unlocked),
        paths(&found.locked)
    );

    // Encrypted retrieval while the item is still unlocked
    let client = DhExchange::new();
    let encrypted = service.open_session(Algorithm::DhX25519.as_str(), &client.public_bytes())?;
    let cipher = SessionCipher::Aead(client.complete(&encrypted.server_public)?);
    println!("Opened session {} ({})", encrypted.handle, encrypted.algorithm);

    let retrieved = service.retrieve_secrets(&encrypted.handle, &[item])?;
    for r in &retrieved {
        let plaintext = cipher.decrypt(&r.secret)?;
        println!(
            "Retrieved {} ({}): {} encrypted bytes, {} after decryption",
            r.item,
            r.content_type,
            r.secret.value.len(),
            plaintext.len()
        );
    }

    service.lock_service();
    println!("Locked service");

    let found = service.search_collections(&alice);
    println!(
        "Search user=alice: unlocked {:?}, locked {:?}",
        paths(&found.unlocked),
        paths(&found.locked)
    );

    match service.retrieve_secrets(&encrypted.handle, &[item]) {
        Ok(_) => println!("Retrieval after lock unexpectedly succeeded"),
        Err(e) => println!("Retrieval after lock: {} ({})", e, e.dbus_name()),
    }

    service.close_session(&plain.handle);
    service.close_session(&encrypted.handle);
    println!("Closed sessions");

    Ok(())
}

fn cmd_algorithms(service: &SecretService) -> Result<()> {
    for algorithm in service.algorithms() {
        println!("{}", algorithm);
    }
    Ok(())
}

fn paths<T: std::fmt::Display>(ids: &[T]) -> Vec<String> {
    ids.iter().map(ToString::to_string).collect()
}
