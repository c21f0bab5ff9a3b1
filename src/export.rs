// Exporter: writes one JSON table per terminal position bucket.

use serde::Serialize;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::info;

use crate::model::{Player, Position, PositionGroup};

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("failed to create output directory {path}: {source}")]
    CreateDir {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to serialize {path}: {source}")]
    Serialize {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// A player row as exported: the primary position tag plus the full player
/// record (stats, z-scores, money, shekels).
#[derive(Serialize)]
struct ExportRow<'a> {
    pri_pos: Position,
    #[serde(flatten)]
    player: &'a Player,
}

/// Write each group to `appraised_<pos>.json` in the output directory.
pub fn export_groups(groups: &[PositionGroup], out_dir: &Path) -> Result<(), ExportError> {
    std::fs::create_dir_all(out_dir).map_err(|e| ExportError::CreateDir {
        path: out_dir.to_path_buf(),
        source: e,
    })?;

    for group in groups {
        let file_name = format!("appraised_{}.json", group.position.abbrev().to_lowercase());
        let path = out_dir.join(file_name);

        let rows: Vec<ExportRow> = group
            .players
            .iter()
            .map(|player| ExportRow {
                pri_pos: group.position,
                player,
            })
            .collect();

        let json = serde_json::to_string_pretty(&rows).map_err(|e| ExportError::Serialize {
            path: path.clone(),
            source: e,
        })?;
        std::fs::write(&path, json).map_err(|e| ExportError::Write {
            path: path.clone(),
            source: e,
        })?;

        info!(
            "exported {} players to {}",
            group.players.len(),
            path.display()
        );
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
