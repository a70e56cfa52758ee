mod cli;

use anyhow::Context;
use clap::Parser;
use cs_auth::{ApiClient, ApiRequest, SessionBootstrap, SessionEvent, SessionPhase};
use cs_settings::SettingsLoader;
use tracing::{error, info, warn};

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run(cli).await {
        error!("fatal: {e:#}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let loader = match cli.config {
        Some(path) => SettingsLoader::new(path),
        None => SettingsLoader::from_default_location()?,
    };
    let mut settings = loader.load_or_init().await?;
    if let Some(base_url) = cli.base_url {
        settings.api.base_url = base_url;
    }

    let config = settings
        .to_auth_config()
        .context("Invalid session settings")?;
    let client = ApiClient::new(config)?;
    spawn_event_logger(&client);

    let status = SessionBootstrap::new(client.clone()).run().await;

    match cli.command {
        Command::Status => match status.phase {
            SessionPhase::Authenticated(user) => {
                println!("Signed in as {} ({})", user.name(), user.id);
            }
            SessionPhase::Unreachable => println!("Session stored, server unreachable"),
            SessionPhase::Anonymous => println!("Not signed in"),
        },
        Command::Login(args) => {
            let password = std::env::var(&args.password_env)
                .with_context(|| format!("Password env var {} is not set", args.password_env))?;
            let user = client.login(&args.email, &password).await?;
            match user {
                Some(user) => println!("Signed in as {} ({})", user.name(), user.id),
                None => println!("Signed in as {}", args.email),
            }
        }
        Command::Logout => {
            client.logout().await;
            println!("Signed out");
        }
        Command::Get(args) => {
            let response = client.send(ApiRequest::get(args.path)).await?;
            match response.json::<serde_json::Value>() {
                Ok(value) => println!("{}", serde_json::to_string_pretty(&value)?),
                Err(_) => println!("{}", response.text()),
            }
        }
    }

    Ok(())
}

fn spawn_event_logger(client: &ApiClient) {
    let mut events = client.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                SessionEvent::Expired {
                    redirect: Some(redirect),
                    reason,
                } => warn!("Session expired ({}), log in again: {}", reason, redirect.location()),
                SessionEvent::Expired { reason, .. } => warn!("Session expired ({})", reason),
                other => info!("Session event: {:?}", other),
            }
        }
    });
}
