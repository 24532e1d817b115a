mod config;
mod render;

use anyhow::bail;
use tracing::info;

use exportview_client::{BackendClient, Uploader};
use exportview_ingest::{IngestState, Ingestor, Phase};
use exportview_search::{SearchConfig, SearchIndex};

use crate::config::Config;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "exportview=info,exportview_ingest=info".into()),
        )
        .init();

    let config = Config::from_env()?;
    info!(server = %config.server_url, archive = %config.archive.display(), "Starting viewer");

    let ingestor = Ingestor::new();
    let uploader = Uploader::new(BackendClient::new(config.server_url.clone()), ingestor.clone());

    let state = follow_upload(&uploader, &config).await?;
    print_summary(&state);

    let index = SearchIndex::spawn(
        ingestor.subscribe(),
        SearchConfig {
            debounce: config.debounce,
        },
    );

    if let Some(channel) = &config.channel {
        let mut results = index.subscribe();
        index.select_channel(channel.as_str());
        let query = config.query.clone().unwrap_or_default();
        index.set_query(query.as_str());

        let view = results
            .wait_for(|s| {
                s.active_channel.as_deref() == Some(channel.as_str())
                    && s.applied_query == query
                    && !s.pending
            })
            .await?
            .clone();

        if view.results.is_empty() {
            println!("No messages in #{} match \"{}\"", channel, query);
        } else {
            print!("{}", render::render_messages(&view.results));
        }
    }

    index.shutdown().await;

    if let Some(error) = state.error {
        bail!(error);
    }
    Ok(())
}

/// Start the upload and echo every status change until it settles.
async fn follow_upload(uploader: &Uploader, config: &Config) -> anyhow::Result<IngestState> {
    let mut updates = uploader.ingestor().subscribe();
    let session = uploader.upload(config.archive.clone());

    let mut last_status = String::new();
    loop {
        let state = updates.borrow_and_update().clone();
        if state.session == session.id() {
            if state.status != last_status {
                println!("{}", state.status);
                last_status = state.status.clone();
            }
            if !state.is_loading() {
                return Ok(state);
            }
        }
        updates.changed().await?;
    }
}

fn print_summary(state: &IngestState) {
    if state.phase == Phase::Failed {
        if let Some(error) = &state.error {
            eprintln!("Error: {}", error);
        }
    }

    println!(
        "{} channels, {} messages ({} lines skipped)",
        state.channels.len(),
        state.store.message_count(),
        state.lines_skipped
    );
    for channel in &state.channels {
        let count = state.store.get(&channel.name).map_or(0, |bucket| bucket.len());
        println!("  #{:<24} {:>6}", channel.name, count);
    }
}
