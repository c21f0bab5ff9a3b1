// Identity resolver: the canonical cross-source ID table.
//
// The keymap file unifies the three source-specific ID schemes (ESPN,
// FanGraphs, MLBAM) into one row per player. Source files key players
// differently, so the Combiner resolves every row through this table before
// merging.

use serde_json::Value;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::warn;

use crate::model::PlayerIds;

pub const KEYMAP_FILE: &str = "mtbl_keymap.json";

#[derive(Debug, Error)]
pub enum KeymapError {
    #[error("failed to read keymap {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse keymap {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("keymap {path} has no `data` array")]
    MissingData { path: PathBuf },

    #[error("keymap produced zero usable entries")]
    Empty,
}

/// In-memory keymap with lookups by FanGraphs and MLBAM ID.
#[derive(Debug, Clone)]
pub struct KeyMap {
    entries: Vec<PlayerIds>,
    by_fangraphs: HashMap<String, usize>,
    by_mlb: HashMap<String, usize>,
}

impl KeyMap {
    /// Load `mtbl_keymap.json` from the extract directory. The file is a
    /// schema envelope whose `data` key holds the entry array; numeric IDs
    /// are coerced to integer strings on load.
    pub fn load(extract_dir: &Path) -> Result<Self, KeymapError> {
        let path = extract_dir.join(KEYMAP_FILE);
        let text = std::fs::read_to_string(&path).map_err(|e| KeymapError::Io {
            path: path.clone(),
            source: e,
        })?;
        let json: Value = serde_json::from_str(&text).map_err(|e| KeymapError::Json {
            path: path.clone(),
            source: e,
        })?;
        let data = json
            .get("data")
            .and_then(Value::as_array)
            .ok_or(KeymapError::MissingData { path })?;

        let mut entries = Vec::with_capacity(data.len());
        for row in data {
            let espn = id_string(row.get("ESPNID"));
            let fangraphs = id_string(row.get("FANGRAPHSID"));
            let mlb = id_string(row.get("MLBID"));
            match (espn, fangraphs) {
                (Some(espn), Some(fangraphs)) => {
                    entries.push(PlayerIds {
                        espn,
                        fangraphs,
                        // MLBAM coverage is incomplete for prospects; an
                        // empty string simply never matches a statcast row.
                        mlb: mlb.unwrap_or_default(),
                    });
                }
                _ => {
                    warn!("skipping keymap entry without ESPN + FanGraphs IDs: {row}");
                }
            }
        }

        if entries.is_empty() {
            return Err(KeymapError::Empty);
        }

        Ok(Self::from_entries(entries))
    }

    /// Build a keymap from already-resolved entries. Used by tests and by
    /// callers that assemble the table in memory.
    pub fn from_entries(entries: Vec<PlayerIds>) -> Self {
        let mut by_fangraphs = HashMap::with_capacity(entries.len());
        let mut by_mlb = HashMap::with_capacity(entries.len());
        for (idx, ids) in entries.iter().enumerate() {
            by_fangraphs.entry(ids.fangraphs.clone()).or_insert(idx);
            if !ids.mlb.is_empty() {
                by_mlb.entry(ids.mlb.clone()).or_insert(idx);
            }
        }
        KeyMap {
            entries,
            by_fangraphs,
            by_mlb,
        }
    }

    pub fn by_fangraphs(&self, id: &str) -> Option<&PlayerIds> {
        self.by_fangraphs.get(id).map(|&i| &self.entries[i])
    }

    pub fn by_mlb(&self, id: &str) -> Option<&PlayerIds> {
        self.by_mlb.get(id).map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Coerce a JSON ID value into a string key. Source exports store ESPN and
/// MLBAM IDs as numbers (sometimes floats); FanGraphs IDs are strings that
/// may carry a minor-league `sa` prefix.
pub(crate) fn id_string(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Some(i.to_string())
            } else {
                n.as_f64().map(|f| (f as i64).to_string())
            }
        }
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
