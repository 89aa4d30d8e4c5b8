pub mod commands;
pub mod config;
pub mod debounce;
pub mod generate;
pub mod github;
pub mod http;
pub mod session;
pub mod store;

use std::io::Write;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::commands::{Cli, Commands, Target};
use crate::config::Config;
use crate::github::DeckSource;
use crate::http::ReqwestClient;
use crate::session::SessionTracker;
use crate::store::SqliteStore;

/// Install the global subscriber. `RUST_LOG` selects the level, `info` by default.
pub fn init_tracing() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

pub async fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::from_env();
    init_tracing();

    let target = Target::resolve(&cli, &config);
    let client = ReqwestClient::new(config.github_token.clone())?;
    let source = DeckSource::with_api_url(client, config.github_api_url.clone());
    let mut out = std::io::stdout();

    match cli.command {
        Commands::List { filter } => {
            commands::list(&source, &target, filter.as_deref(), &mut out).await
        }
        Commands::Search => commands::search(Arc::new(source), target).await,
        Commands::Show { path, html } => {
            commands::show(&source, &target, &path, html, &mut out).await
        }
        Commands::Study { path, shuffle } => {
            let tracker = open_tracker(&config)?;
            commands::study(&source, &tracker, &target, &path, shuffle, &mut out).await
        }
        Commands::Last { deck } => {
            let tracker = open_tracker(&config)?;
            commands::last(&tracker, &deck, &mut out)
        }
        Commands::Generate {
            provider,
            file,
            output,
            message,
        } => match output {
            Some(path) => {
                let mut buf = Vec::new();
                commands::generate(&config, provider, &file, &message, &mut buf).await?;
                std::fs::write(&path, buf)
                    .with_context(|| format!("failed to write {}", path.display()))?;
                tracing::info!("Deck written to {}", path.display());
                Ok(())
            }
            None => {
                commands::generate(&config, provider, &file, &message, &mut out).await?;
                out.flush()?;
                Ok(())
            }
        },
    }
}

fn open_tracker(config: &Config) -> anyhow::Result<SessionTracker<SqliteStore>> {
    if let Some(parent) = config.db_path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    tracing::debug!("Opening session store at {}", config.db_path.display());
    let store = SqliteStore::open(&config.db_path)
        .with_context(|| format!("failed to open {}", config.db_path.display()))?;
    Ok(SessionTracker::new(store))
}
