// src/services/game.rs

//! Game file service.
//!
//! Resolves a game ID to its storage folder and returns the input and output
//! files stored for that game.

use std::sync::Arc;

use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};

use crate::error::{AppError, Result};
use crate::models::{GameId, SeasonType, StorageConfig};
use crate::storage::{ObjectStore, file_name};

fn include_by_default() -> bool {
    true
}

/// Arguments of the `get_game_details` operation.
#[derive(Debug, Clone, Deserialize)]
pub struct GameDetailsArgs {
    #[serde(default)]
    pub game_id: String,

    #[serde(default = "include_by_default")]
    pub include_inputs: bool,

    #[serde(default = "include_by_default")]
    pub include_outputs: bool,
}

/// Counts and location of a game lookup.
#[derive(Debug, Clone, Serialize)]
pub struct GameMetadata {
    pub base_s3_path: String,
    pub input_files_found: usize,
    pub output_files_found: usize,
    pub included_inputs: bool,
    pub included_outputs: bool,
}

/// Files of one game, keyed by file name.
#[derive(Debug, Clone, Serialize)]
pub struct GameDetails {
    pub game_id: String,
    pub season: u16,
    pub season_type: SeasonType,
    pub week: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub inputs: Option<Map<String, Value>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub outputs: Option<Map<String, Value>>,

    pub metadata: GameMetadata,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameDetailsPayload {
    pub success: bool,
    pub data: GameDetails,
}

/// Service behind the `get_game_details` operation.
#[derive(Clone)]
pub struct GameService {
    store: Arc<dyn ObjectStore>,
    config: StorageConfig,
}

impl GameService {
    pub fn new(store: Arc<dyn ObjectStore>, config: StorageConfig) -> Self {
        Self { store, config }
    }

    pub async fn get_game_details(&self, args: GameDetailsArgs) -> Result<GameDetailsPayload> {
        if args.game_id.trim().is_empty() {
            return Err(AppError::validation("Game ID is required"));
        }
        let game: GameId = args.game_id.parse()?;
        let base_path = game.base_path(&self.config.game_data_prefix);
        log::info!("Loading game {} from {}", game, base_path);

        let inputs = if args.include_inputs {
            Some(self.read_folder(&base_path, "inputs").await?)
        } else {
            None
        };
        let outputs = if args.include_outputs {
            Some(self.read_folder(&base_path, "outputs").await?)
        } else {
            None
        };

        let input_files_found = inputs.as_ref().map_or(0, Map::len);
        let output_files_found = outputs.as_ref().map_or(0, Map::len);
        let requested = args.include_inputs || args.include_outputs;
        if requested && input_files_found + output_files_found == 0 {
            return Err(AppError::not_found(format!(
                "No files found for game {} at {}",
                game,
                self.store.location(&base_path)
            )));
        }

        Ok(GameDetailsPayload {
            success: true,
            data: GameDetails {
                game_id: game.to_string(),
                season: game.season,
                season_type: game.season_type,
                week: game.week_padded(),
                inputs,
                outputs,
                metadata: GameMetadata {
                    base_s3_path: self.store.location(&base_path),
                    input_files_found,
                    output_files_found,
                    included_inputs: args.include_inputs,
                    included_outputs: args.include_outputs,
                },
            },
        })
    }

    /// Read every file in `{base}/{folder}/`, bounded by `max_concurrent`.
    async fn read_folder(&self, base_path: &str, folder: &str) -> Result<Map<String, Value>> {
        let prefix = format!("{base_path}/{folder}/");
        let keys: Vec<String> = self
            .store
            .list_keys(&prefix)
            .await?
            .into_iter()
            .filter(|key| !file_name(key).is_empty())
            .collect();

        let files: Vec<(String, Value)> = stream::iter(keys)
            .map(|key| async move {
                let value = self.read_file(&key).await;
                (file_name(&key).to_string(), value)
            })
            .buffered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        log::debug!("Read {} files from {}", files.len(), prefix);
        Ok(files.into_iter().collect())
    }

    /// File content as JSON when it parses, else as text. Failures are
    /// reported in place so one bad file does not hide the others.
    async fn read_file(&self, key: &str) -> Value {
        match self.store.get_bytes(key).await {
            Ok(Some(bytes)) => decode_file(&bytes),
            Ok(None) => json!({ "error": "File disappeared before it could be read" }),
            Err(e) => {
                log::warn!("Failed to read {}: {}", key, e);
                json!({ "error": format!("Failed to read file: {e}") })
            }
        }
    }
}

fn decode_file(bytes: &[u8]) -> Value {
    let text = String::from_utf8_lossy(bytes);
    serde_json::from_str(&text).unwrap_or_else(|_| Value::String(text.into_owned()))
}
