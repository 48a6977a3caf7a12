use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::config::{Config, Settings};
use crate::core::{GatherRequest, GatherService, PlaylistPlayer, SortOrder};
use crate::extractors::OEmbedClient;
use crate::storage::{keys, JsonFileStore, KeyValueStore};
use crate::tabs::MemoryTabs;
use crate::utils::split_ids;

#[derive(Parser)]
#[command(name = "gathertube")]
#[command(about = "Gather open YouTube tabs into one playback queue")]
#[command(version)]
pub struct Cli {
    /// Path to a toml config file
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Scan a tab snapshot and build a playback queue
    Gather {
        /// JSON snapshot of open tabs (overrides the config file)
        #[arg(long)]
        tabs: Option<PathBuf>,

        /// Sort order for the gathered queue
        #[arg(short, long)]
        sort: Option<SortOrder>,

        /// Force the embedded playlist page instead of a native URL
        #[arg(long)]
        embed: bool,

        /// Close the source tabs after gathering
        #[arg(long)]
        close_tabs: bool,

        /// Window identifier to gather from
        #[arg(long, default_value = "1")]
        window: u32,
    },
    /// Print the persisted queue for a window
    ShowQueue {
        /// Window identifier
        #[arg(long, default_value = "1")]
        window: u32,

        /// Resolve display titles via oEmbed
        #[arg(long)]
        titles: bool,
    },
    /// Empty the persisted queue for a window
    ClearQueue {
        /// Window identifier
        #[arg(long, default_value = "1")]
        window: u32,

        /// Skip the confirmation prompt
        #[arg(long)]
        yes: bool,
    },
}

impl Cli {
    pub async fn run(&self) -> Result<()> {
        let config = Config::load(self.config.as_deref())?;
        let store = JsonFileStore::new(&config.state_file);

        match &self.command {
            Command::Gather {
                tabs,
                sort,
                embed,
                close_tabs,
                window,
            } => {
                let tabs_file = tabs.as_deref().unwrap_or(&config.tabs_file);
                let provider = MemoryTabs::from_json_file(tabs_file, *window)?;

                // Stored settings fill in whatever the flags leave unset.
                let settings = Settings::load(&store).await;
                let request = GatherRequest {
                    embed_mode: *embed || settings.embed_mode,
                    close_tabs: *close_tabs || settings.close_tabs,
                    sort_order: (*sort).unwrap_or(settings.sort_order),
                };

                let service = GatherService::new(provider, store, config.player_page);
                let response = service.handle(&request).await;

                println!("{}", response.message);
                if let Some(url) = &response.queue_url {
                    println!("{url}");
                }
                if !response.success && response.video_count == 0 {
                    // Expected-empty is not a process failure.
                    tracing::info!("Gather finished with nothing to queue");
                }
                Ok(())
            }
            Command::ShowQueue { window, titles } => {
                let window = window.to_string();
                let ids = load_queue(&store, &window).await?;
                if ids.is_empty() {
                    println!("No videos in queue for window {window}.");
                    return Ok(());
                }

                let display_titles = if *titles {
                    let client = OEmbedClient::new();
                    let lookups = ids.iter().map(|id| client.fetch_title(id));
                    futures::future::join_all(lookups).await
                } else {
                    vec![None; ids.len()]
                };

                for (i, (id, title)) in ids.iter().zip(display_titles).enumerate() {
                    match title {
                        Some(title) => println!("{:3}. {id}  {title}", i + 1),
                        None => println!("{:3}. {id}", i + 1),
                    }
                }
                Ok(())
            }
            Command::ClearQueue { window, yes } => {
                let window = window.to_string();
                let ids = load_queue(&store, &window).await?;
                if ids.is_empty() {
                    println!("No videos in queue for window {window}.");
                    return Ok(());
                }

                // Clearing is destructive and unrecoverable; ask first.
                if !*yes
                    && !confirm(&format!(
                        "Clear {} video(s) from window {window}? [y/N] ",
                        ids.len()
                    ))?
                {
                    println!("Aborted.");
                    return Ok(());
                }

                let mut player = PlaylistPlayer::initialize(&store, &window, None).await;
                player.clear().await;
                // The legacy slots would otherwise resurface on the next load.
                store.remove(keys::LEGACY_QUEUE).await?;
                store.remove(keys::LEGACY_QUEUE_TIMESTAMP).await?;

                println!("Queue cleared for window {window}.");
                Ok(())
            }
        }
    }
}

fn confirm(prompt: &str) -> Result<bool> {
    use std::io::Write;

    print!("{prompt}");
    std::io::stdout().flush()?;
    let mut answer = String::new();
    std::io::stdin().read_line(&mut answer)?;
    Ok(is_affirmative(&answer))
}

fn is_affirmative(answer: &str) -> bool {
    matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(is_affirmative("y\n"));
        assert!(is_affirmative("Yes"));
        assert!(!is_affirmative(""));
        assert!(!is_affirmative("n\n"));
        assert!(!is_affirmative("yep"));
    }

    #[tokio::test]
    async fn clear_queue_empties_scoped_and_legacy_slots() -> Result<()> {
        let dir = tempdir()?;
        let state = dir.path().join("state.json");
        let config_path = dir.path().join("config.toml");
        std::fs::write(&config_path, format!("state_file = {:?}\n", state))?;

        {
            let store = JsonFileStore::new(&state);
            store
                .set_json(&keys::queue("3"), &vec!["aaaaaaaaaaa"])
                .await?;
            store
                .set_json(keys::LEGACY_QUEUE, &vec!["bbbbbbbbbbb"])
                .await?;
        }

        let cli = Cli {
            config: Some(config_path),
            command: Command::ClearQueue {
                window: 3,
                yes: true,
            },
        };
        cli.run().await?;

        let store = JsonFileStore::new(&state);
        assert!(load_queue(&store, "3").await?.is_empty());
        let legacy: Option<Vec<String>> = store.get_json(keys::LEGACY_QUEUE).await?;
        assert_eq!(legacy, None);
        Ok(())
    }
}

async fn load_queue(
    store: &JsonFileStore,
    window: &str,
) -> Result<Vec<crate::extractors::VideoId>> {
    for key in [keys::queue(window), keys::LEGACY_QUEUE.to_string()] {
        if let Some(raw) = store.get_json::<Vec<String>>(&key).await? {
            let ids = split_ids(&raw.join(","));
            if !ids.is_empty() {
                return Ok(ids);
            }
        }
    }
    Ok(Vec::new())
}
