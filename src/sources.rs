// Data source readers.
//
// Three source shapes feed the pipeline: projection CSVs (FanGraphs-style,
// keyed by PlayerId), statcast CSVs (Savant-style, keyed by player_id), and
// the ESPN player universe JSON (keyed by espn_id, carrying position
// eligibility and ownership). Pre-season extracts prefix projected stat
// columns with `proj_`; serde aliases accept both spellings.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::warn;

use crate::keymap::id_string;
use crate::model::SeasonMode;

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One row of the batter projection source.
#[derive(Debug, Clone)]
pub struct BatterProjection {
    pub fangraphs_id: String,
    pub name: String,
    pub team: String,
    pub games: f64,
    pub pa: f64,
    pub hr: f64,
    pub r: f64,
    pub rbi: f64,
    pub sb: f64,
    pub cs: f64,
    pub obp: f64,
    pub slg: f64,
    pub wrc_plus: f64,
    pub wraa: f64,
    pub war: f64,
}

/// One row of the pitcher projection source.
#[derive(Debug, Clone)]
pub struct PitcherProjection {
    pub fangraphs_id: String,
    pub name: String,
    pub team: String,
    pub games: f64,
    pub gs: f64,
    pub ip: f64,
    pub qs: f64,
    pub sv: f64,
    pub hld: f64,
    pub era: f64,
    pub whip: f64,
    pub k9: f64,
    pub fip: f64,
    pub war: f64,
}

/// Quality-of-contact metrics from the statcast source.
#[derive(Debug, Clone)]
pub struct StatcastRow {
    pub mlb_id: String,
    pub avg_ev: f64,
    pub barrel_pct: f64,
    pub hard_hit_pct: f64,
}

/// One row of the ESPN player universe: eligibility plus ownership.
#[derive(Debug, Clone)]
pub struct UniversePlayer {
    pub espn_id: String,
    pub name: String,
    pub team: String,
    pub positions: Vec<String>,
    pub owner: Option<String>,
    pub pct_rostered: Option<f64>,
}

/// Everything the Combiner needs, loaded from the extract directory.
#[derive(Debug, Clone)]
pub struct ExtractBundle {
    pub batter_projections: Vec<BatterProjection>,
    pub pitcher_projections: Vec<PitcherProjection>,
    pub statcast_batters: Vec<StatcastRow>,
    pub statcast_pitchers: Vec<StatcastRow>,
    pub universe: Vec<UniversePlayer>,
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: PathBuf, source: csv::Error },

    #[error("JSON error in {path}: {source}")]
    Json {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV serde structs (private)
// ---------------------------------------------------------------------------

/// Projection batter row. Counting stats stay f64: projection systems emit
/// fractional values. Extra columns are absorbed via `#[serde(flatten)]`.
#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawBatterProjection {
    PlayerId: String,
    Name: String,
    #[serde(default)]
    Team: String,
    #[serde(alias = "proj_G")]
    G: f64,
    #[serde(alias = "proj_PA")]
    PA: f64,
    #[serde(alias = "proj_HR")]
    HR: f64,
    #[serde(alias = "proj_R")]
    R: f64,
    #[serde(alias = "proj_RBI")]
    RBI: f64,
    #[serde(alias = "proj_SB")]
    SB: f64,
    #[serde(alias = "proj_CS")]
    CS: f64,
    #[serde(alias = "proj_OBP")]
    OBP: f64,
    #[serde(alias = "proj_SLG")]
    SLG: f64,
    #[serde(rename = "wRC+", alias = "proj_wRC+")]
    wRCplus: f64,
    #[serde(rename = "wRAA", alias = "proj_wRAA")]
    wRAA: f64,
    #[serde(alias = "proj_WAR", default)]
    WAR: f64,
    #[serde(flatten)]
    #[allow(dead_code)]
    _extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawPitcherProjection {
    PlayerId: String,
    Name: String,
    #[serde(default)]
    Team: String,
    #[serde(alias = "proj_G")]
    G: f64,
    #[serde(alias = "proj_GS")]
    GS: f64,
    #[serde(alias = "proj_IP")]
    IP: f64,
    #[serde(alias = "proj_QS")]
    QS: f64,
    #[serde(alias = "proj_SV")]
    SV: f64,
    #[serde(alias = "proj_HLD")]
    HLD: f64,
    #[serde(alias = "proj_ERA")]
    ERA: f64,
    #[serde(alias = "proj_WHIP")]
    WHIP: f64,
    #[serde(rename = "K/9", alias = "proj_K/9")]
    K9: f64,
    #[serde(alias = "proj_FIP")]
    FIP: f64,
    #[serde(alias = "proj_WAR", default)]
    WAR: f64,
    #[serde(flatten)]
    #[allow(dead_code)]
    _extra: HashMap<String, serde_json::Value>,
}

#[derive(Debug, Deserialize)]
#[allow(non_snake_case)]
struct RawStatcastRow {
    player_id: String,
    avg_hit_speed: f64,
    brl_percent: f64,
    #[serde(alias = "hard_hit_percent")]
    hardhit_percent: f64,
    #[serde(flatten)]
    #[allow(dead_code)]
    _extra: HashMap<String, serde_json::Value>,
}

// ---------------------------------------------------------------------------
// Raw universe serde struct (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawUniversePlayer {
    #[serde(deserialize_with = "de_id")]
    espn_id: String,
    name: String,
    #[serde(default)]
    team: String,
    #[serde(default)]
    positions: Vec<String>,
    #[serde(default)]
    owner: Option<String>,
    /// Nested per-player stat blob; only `%ROST` is read from it.
    #[serde(default)]
    player_stats: Option<HashMap<String, Value>>,
}

fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    id_string(Some(&value)).ok_or_else(|| serde::de::Error::custom("missing or empty id"))
}

/// Returns true if all given f64 values are finite (not NaN or Infinity).
fn all_finite(values: &[f64]) -> bool {
    values.iter().all(|v| v.is_finite())
}

// ---------------------------------------------------------------------------
// Reader-based loaders (private, enable testing without temp files)
// ---------------------------------------------------------------------------

fn load_batter_projections_from_reader<R: Read>(
    rdr: R,
) -> Result<Vec<BatterProjection>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut rows = Vec::new();
    for result in reader.deserialize::<RawBatterProjection>() {
        match result {
            Ok(raw) => {
                if !all_finite(&[raw.OBP, raw.SLG, raw.wRCplus]) {
                    warn!(
                        "skipping batter '{}': non-finite rate stat",
                        raw.Name.trim()
                    );
                    continue;
                }
                rows.push(BatterProjection {
                    fangraphs_id: raw.PlayerId.trim().to_string(),
                    name: raw.Name.trim().to_string(),
                    team: raw.Team.trim().to_string(),
                    games: raw.G,
                    pa: raw.PA,
                    hr: raw.HR,
                    r: raw.R,
                    rbi: raw.RBI,
                    sb: raw.SB,
                    cs: raw.CS,
                    obp: raw.OBP,
                    slg: raw.SLG,
                    wrc_plus: raw.wRCplus,
                    wraa: raw.wRAA,
                    war: raw.WAR,
                });
            }
            Err(e) => {
                warn!("skipping malformed batter projection row: {}", e);
            }
        }
    }
    Ok(rows)
}

fn load_pitcher_projections_from_reader<R: Read>(
    rdr: R,
) -> Result<Vec<PitcherProjection>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut rows = Vec::new();
    for result in reader.deserialize::<RawPitcherProjection>() {
        match result {
            Ok(raw) => {
                if !all_finite(&[raw.IP, raw.ERA, raw.WHIP, raw.FIP]) {
                    warn!(
                        "skipping pitcher '{}': non-finite IP/ERA/WHIP/FIP",
                        raw.Name.trim()
                    );
                    continue;
                }
                rows.push(PitcherProjection {
                    fangraphs_id: raw.PlayerId.trim().to_string(),
                    name: raw.Name.trim().to_string(),
                    team: raw.Team.trim().to_string(),
                    games: raw.G,
                    gs: raw.GS,
                    ip: raw.IP,
                    qs: raw.QS,
                    sv: raw.SV,
                    hld: raw.HLD,
                    era: raw.ERA,
                    whip: raw.WHIP,
                    k9: raw.K9,
                    fip: raw.FIP,
                    war: raw.WAR,
                });
            }
            Err(e) => {
                warn!("skipping malformed pitcher projection row: {}", e);
            }
        }
    }
    Ok(rows)
}

fn load_statcast_from_reader<R: Read>(rdr: R) -> Result<Vec<StatcastRow>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut rows = Vec::new();
    for result in reader.deserialize::<RawStatcastRow>() {
        match result {
            Ok(raw) => rows.push(StatcastRow {
                mlb_id: raw.player_id.trim().to_string(),
                avg_ev: raw.avg_hit_speed,
                barrel_pct: raw.brl_percent,
                hard_hit_pct: raw.hardhit_percent,
            }),
            Err(e) => {
                warn!("skipping malformed statcast row: {}", e);
            }
        }
    }
    Ok(rows)
}

fn load_universe_from_reader<R: Read>(rdr: R) -> Result<Vec<UniversePlayer>, serde_json::Error> {
    let raw: Vec<Value> = serde_json::from_reader(rdr)?;
    let mut players = Vec::with_capacity(raw.len());
    for value in raw {
        match serde_json::from_value::<RawUniversePlayer>(value) {
            Ok(raw) => {
                let pct_rostered = raw
                    .player_stats
                    .as_ref()
                    .and_then(|stats| stats.get("%ROST"))
                    .and_then(Value::as_f64);
                players.push(UniversePlayer {
                    espn_id: raw.espn_id,
                    name: raw.name.trim().to_string(),
                    team: raw.team.trim().to_string(),
                    positions: raw.positions,
                    owner: raw.owner,
                    pct_rostered,
                });
            }
            Err(e) => {
                warn!("skipping malformed universe entry: {}", e);
            }
        }
    }
    Ok(players)
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

fn open(path: &Path) -> Result<std::fs::File, SourceError> {
    std::fs::File::open(path).map_err(|e| SourceError::Io {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn load_batter_projections(path: &Path) -> Result<Vec<BatterProjection>, SourceError> {
    load_batter_projections_from_reader(open(path)?).map_err(|e| SourceError::Csv {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn load_pitcher_projections(path: &Path) -> Result<Vec<PitcherProjection>, SourceError> {
    load_pitcher_projections_from_reader(open(path)?).map_err(|e| SourceError::Csv {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn load_statcast(path: &Path) -> Result<Vec<StatcastRow>, SourceError> {
    load_statcast_from_reader(open(path)?).map_err(|e| SourceError::Csv {
        path: path.to_path_buf(),
        source: e,
    })
}

pub fn load_universe(path: &Path) -> Result<Vec<UniversePlayer>, SourceError> {
    load_universe_from_reader(open(path)?).map_err(|e| SourceError::Json {
        path: path.to_path_buf(),
        source: e,
    })
}

/// Load every extract file for the given season mode. Projection file names
/// carry the mode suffix (`bats_pre_season.csv`, `arms_regular_season.csv`);
/// statcast and universe files are mode-independent.
pub fn load_extracted(extract_dir: &Path, mode: SeasonMode) -> Result<ExtractBundle, SourceError> {
    let suffix = mode.file_suffix();

    let batter_projections =
        load_batter_projections(&extract_dir.join(format!("bats_{suffix}.csv")))?;
    let pitcher_projections =
        load_pitcher_projections(&extract_dir.join(format!("arms_{suffix}.csv")))?;
    let statcast_batters = load_statcast(&extract_dir.join("bats_savant.csv"))?;
    let statcast_pitchers = load_statcast(&extract_dir.join("arms_savant.csv"))?;
    let universe = load_universe(&extract_dir.join("espn_player_universe.json"))?;

    if batter_projections.is_empty() {
        return Err(SourceError::Validation(
            "batter projection CSV produced zero valid rows".into(),
        ));
    }
    if pitcher_projections.is_empty() {
        return Err(SourceError::Validation(
            "pitcher projection CSV produced zero valid rows".into(),
        ));
    }
    if universe.is_empty() {
        return Err(SourceError::Validation(
            "player universe JSON produced zero valid entries".into(),
        ));
    }

    Ok(ExtractBundle {
        batter_projections,
        pitcher_projections,
        statcast_batters,
        statcast_pitchers,
        universe,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    // -- Batter projection CSV --

    #[test]
    fn batter_csv_parses() {
        let csv_data = "\
PlayerId,Name,Team,G,PA,HR,R,RBI,SB,CS,OBP,SLG,wRC+,wRAA,WAR
19755,Aaron Judge,NYY,155,700,50,120,130,5,1,0.420,0.650,190.0,65.2,10.1
15640,Mookie Betts,LAD,150,680,30,110,95,15,3,0.380,0.540,145.5,38.7,7.2";

        let rows = load_batter_projections_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].fangraphs_id, "19755");
        assert_eq!(rows[0].name, "Aaron Judge");
        assert!((rows[0].hr - 50.0).abs() < f64::EPSILON);
        assert!((rows[0].wrc_plus - 190.0).abs() < f64::EPSILON);
        assert!((rows[1].obp - 0.380).abs() < f64::EPSILON);
    }

    #[test]
    fn batter_csv_accepts_proj_prefixed_columns() {
        let csv_data = "\
PlayerId,Name,Team,proj_G,proj_PA,proj_HR,proj_R,proj_RBI,proj_SB,proj_CS,proj_OBP,proj_SLG,proj_wRC+,proj_wRAA,proj_WAR
19755,Aaron Judge,NYY,155,700,50,120,130,5,1,0.420,0.650,190.0,65.2,10.1";

        let rows = load_batter_projections_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].hr - 50.0).abs() < f64::EPSILON);
        assert!((rows[0].wraa - 65.2).abs() < f64::EPSILON);
    }

    #[test]
    fn batter_csv_extra_columns_ignored() {
        let csv_data = "\
PlayerId,Name,Team,G,PA,HR,R,RBI,SB,CS,OBP,SLG,wRC+,wRAA,WAR,AVG,ISO,BABIP
19755,Aaron Judge,NYY,155,700,50,120,130,5,1,0.420,0.650,190.0,65.2,10.1,0.300,0.350,0.360";

        let rows = load_batter_projections_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Aaron Judge");
    }

    #[test]
    fn malformed_batter_rows_skipped() {
        let csv_data = "\
PlayerId,Name,Team,G,PA,HR,R,RBI,SB,CS,OBP,SLG,wRC+,wRAA,WAR
19755,Valid Player,NYY,155,700,50,120,130,5,1,0.420,0.650,190.0,65.2,10.1
19756,Bad Row,NYY,not_a_number,700,50,120,130,5,1,0.420,0.650,190.0,65.2,10.1
19757,Another Valid,BOS,150,650,25,90,85,10,2,0.350,0.470,120.0,15.3,4.0";

        let rows = load_batter_projections_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Valid Player");
        assert_eq!(rows[1].name, "Another Valid");
    }

    #[test]
    fn batter_nan_rate_stat_skipped() {
        let csv_data = "\
PlayerId,Name,Team,G,PA,HR,R,RBI,SB,CS,OBP,SLG,wRC+,wRAA,WAR
19755,Valid Player,NYY,155,700,50,120,130,5,1,0.420,0.650,190.0,65.2,10.1
19756,NaN Player,NYY,155,700,50,120,130,5,1,NaN,0.650,190.0,65.2,10.1";

        let rows = load_batter_projections_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Valid Player");
    }

    #[test]
    fn batter_names_trimmed() {
        let csv_data = "\
PlayerId,Name,Team,G,PA,HR,R,RBI,SB,CS,OBP,SLG,wRC+,wRAA,WAR
19755,  Aaron Judge  , NYY ,155,700,50,120,130,5,1,0.420,0.650,190.0,65.2,10.1";

        let rows = load_batter_projections_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(rows[0].name, "Aaron Judge");
        assert_eq!(rows[0].team, "NYY");
    }

    // -- Pitcher projection CSV --

    #[test]
    fn pitcher_csv_parses() {
        let csv_data = "\
PlayerId,Name,Team,G,GS,IP,QS,SV,HLD,ERA,WHIP,K/9,FIP,WAR
22267,Gerrit Cole,NYY,32,32,200.0,22,0,0,2.80,1.05,11.2,2.95,6.1
27498,Devin Williams,NYY,60,0,62.0,0,5,25,2.10,0.92,13.0,2.40,2.2";

        let rows = load_pitcher_projections_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Gerrit Cole");
        assert!((rows[0].qs - 22.0).abs() < f64::EPSILON);
        assert!((rows[1].hld - 25.0).abs() < f64::EPSILON);
        assert!((rows[1].k9 - 13.0).abs() < f64::EPSILON);
    }

    #[test]
    fn pitcher_inf_era_skipped() {
        let csv_data = "\
PlayerId,Name,Team,G,GS,IP,QS,SV,HLD,ERA,WHIP,K/9,FIP,WAR
22267,Valid Pitcher,NYY,32,32,200.0,22,0,0,2.80,1.05,11.2,2.95,6.1
22268,Inf Pitcher,NYY,32,32,200.0,22,0,0,inf,1.05,11.2,2.95,6.1";

        let rows = load_pitcher_projections_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].name, "Valid Pitcher");
    }

    #[test]
    fn pitcher_csv_accepts_proj_prefixed_columns() {
        let csv_data = "\
PlayerId,Name,Team,proj_G,proj_GS,proj_IP,proj_QS,proj_SV,proj_HLD,proj_ERA,proj_WHIP,proj_K/9,proj_FIP,proj_WAR
22267,Gerrit Cole,NYY,32,32,200.0,22,0,0,2.80,1.05,11.2,2.95,6.1";

        let rows = load_pitcher_projections_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert!((rows[0].fip - 2.95).abs() < f64::EPSILON);
    }

    // -- Statcast CSV --

    #[test]
    fn statcast_csv_parses() {
        let csv_data = "\
\"last_name, first_name\",player_id,attempts,avg_hit_speed,brl_percent,hardhit_percent
\"Judge, Aaron\",592450,450,95.8,26.1,61.3";

        let rows = load_statcast_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].mlb_id, "592450");
        assert!((rows[0].barrel_pct - 26.1).abs() < f64::EPSILON);
        assert!((rows[0].hard_hit_pct - 61.3).abs() < f64::EPSILON);
    }

    #[test]
    fn statcast_hard_hit_alias() {
        let csv_data = "\
player_id,avg_hit_speed,brl_percent,hard_hit_percent
592450,95.8,26.1,61.3";

        let rows = load_statcast_from_reader(csv_data.as_bytes()).unwrap();
        assert!((rows[0].hard_hit_pct - 61.3).abs() < f64::EPSILON);
    }

    // -- Universe JSON --

    #[test]
    fn universe_parses_with_nested_stats() {
        let json = r#"[
            {
                "espn_id": 33192,
                "name": "Aaron Judge",
                "team": "NYY",
                "positions": ["OF", "DH"],
                "owner": "Scrub Stompers",
                "player_stats": {"%ROST": 99.9, "PRTR": 12.3}
            },
            {
                "espn_id": "41234",
                "name": "Free Agent Guy",
                "team": "MIA",
                "positions": ["2B"]
            }
        ]"#;

        let players = load_universe_from_reader(json.as_bytes()).unwrap();
        assert_eq!(players.len(), 2);
        assert_eq!(players[0].espn_id, "33192");
        assert_eq!(players[0].positions, vec!["OF", "DH"]);
        assert_eq!(players[0].owner.as_deref(), Some("Scrub Stompers"));
        assert!((players[0].pct_rostered.unwrap() - 99.9).abs() < f64::EPSILON);
        assert_eq!(players[1].espn_id, "41234");
        assert!(players[1].owner.is_none());
        assert!(players[1].pct_rostered.is_none());
    }

    #[test]
    fn universe_skips_entries_without_id() {
        let json = r#"[
            {"espn_id": 1, "name": "Valid", "positions": ["C"]},
            {"name": "No Id", "positions": ["C"]}
        ]"#;

        let players = load_universe_from_reader(json.as_bytes()).unwrap();
        assert_eq!(players.len(), 1);
        assert_eq!(players[0].name, "Valid");
    }

    #[test]
    fn empty_csv_returns_empty_vec() {
        let csv_data = "PlayerId,Name,Team,G,PA,HR,R,RBI,SB,CS,OBP,SLG,wRC+,wRAA,WAR";
        let rows = load_batter_projections_from_reader(csv_data.as_bytes()).unwrap();
        assert!(rows.is_empty());
    }
}
