// Configuration loading and parsing (league.toml, budget.toml).

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::model::{Category, Position, BATTER_BUCKET_ORDER};

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub budget_split: BudgetSplit,
    pub data_paths: DataPaths,
}

/// League ruleset: manager count, auction budget, roster requirements, and
/// the ordered scored-category lists.
#[derive(Debug, Clone)]
pub struct LeagueConfig {
    pub name: String,
    pub managers: usize,
    pub draft_budget: u32,
    /// Slot count per batter bucket. Iterate via `BATTER_BUCKET_ORDER`,
    /// never map order: DH must be processed last.
    pub batter_slots: BTreeMap<Position, usize>,
    pub pitcher_slots: PitcherSlots,
    pub batting_categories: Vec<Category>,
    pub pitching_categories: Vec<Category>,
}

/// Pitcher roster requirements. `wildcard` slots are not pre-designated
/// SP or RP and are split between the two roles for valuation.
#[derive(Debug, Clone, Copy)]
pub struct PitcherSlots {
    pub sp: usize,
    pub rp: usize,
    pub wildcard: usize,
}

/// Budget fraction preferences for one player type.
#[derive(Debug, Clone)]
pub struct TypeSplit {
    /// This type's fraction of the total league budget.
    pub ovr: f64,
    /// Category -> fraction of this type's budget. Must sum to 1.
    pub cats: BTreeMap<Category, f64>,
}

/// How the league budget divides across player types and categories.
/// The Valuator validates the sum invariants at construction.
#[derive(Debug, Clone)]
pub struct BudgetSplit {
    pub bats: TypeSplit,
    pub sps: TypeSplit,
    pub rps: TypeSplit,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub extract_dir: String,
    pub out_dir: String,
}

// ---------------------------------------------------------------------------
// Raw TOML structs (private)
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct LeagueFile {
    league: RawLeague,
    data_paths: DataPaths,
}

#[derive(Debug, Deserialize)]
struct RawLeague {
    name: String,
    managers: usize,
    draft_budget: u32,
    roster: RawRoster,
    scoring: RawScoring,
}

#[derive(Debug, Deserialize)]
struct RawRoster {
    batters: HashMap<String, usize>,
    pitchers: HashMap<String, usize>,
}

#[derive(Debug, Deserialize)]
struct RawScoring {
    batting: Vec<String>,
    pitching: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BudgetFile {
    bats: RawTypeSplit,
    sps: RawTypeSplit,
    rps: RawTypeSplit,
}

#[derive(Debug, Deserialize)]
struct RawTypeSplit {
    ovr: f64,
    cats: HashMap<String, f64>,
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load configuration from `config/league.toml` and `config/budget.toml`
/// relative to `base_dir`. Missing files are seeded from `defaults/` first.
pub fn load_config(base_dir: &Path) -> Result<Config, ConfigError> {
    ensure_config_files(base_dir)?;
    load_config_from(base_dir)
}

pub(crate) fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let league_path = config_dir.join("league.toml");
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;

    let budget_path = config_dir.join("budget.toml");
    let budget_text = read_file(&budget_path)?;
    let budget_file: BudgetFile =
        toml::from_str(&budget_text).map_err(|e| ConfigError::ParseError {
            path: budget_path.clone(),
            source: e,
        })?;

    let league = convert_league(league_file.league)?;
    let budget_split = BudgetSplit {
        bats: convert_type_split(budget_file.bats, "bats")?,
        sps: convert_type_split(budget_file.sps, "sps")?,
        rps: convert_type_split(budget_file.rps, "rps")?,
    };

    let config = Config {
        league,
        budget_split,
        data_paths: league_file.data_paths,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure config files exist by copying missing ones from `defaults/`.
/// Returns the list of files copied.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}; \
                     run from the project root or pass --config-dir",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let mut copied = Vec::new();

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

// ---------------------------------------------------------------------------
// Conversion helpers
// ---------------------------------------------------------------------------

fn convert_league(raw: RawLeague) -> Result<LeagueConfig, ConfigError> {
    let mut batter_slots = BTreeMap::new();
    for (key, count) in &raw.roster.batters {
        let pos = Position::from_abbrev(key).ok_or_else(|| ConfigError::ValidationError {
            field: format!("league.roster.batters.{key}"),
            message: "unknown batter position".into(),
        })?;
        if pos.is_pitcher() {
            return Err(ConfigError::ValidationError {
                field: format!("league.roster.batters.{key}"),
                message: "pitcher position in the batter roster table".into(),
            });
        }
        batter_slots.insert(pos, *count);
    }

    let pitcher_slot = |key: &str| -> Result<usize, ConfigError> {
        raw.roster
            .pitchers
            .get(key)
            .copied()
            .ok_or_else(|| ConfigError::ValidationError {
                field: format!("league.roster.pitchers.{key}"),
                message: "missing required pitcher slot count".into(),
            })
    };
    let pitcher_slots = PitcherSlots {
        sp: pitcher_slot("SP")?,
        rp: pitcher_slot("RP")?,
        wildcard: pitcher_slot("P")?,
    };

    let batting_categories = convert_categories(&raw.scoring.batting, "league.scoring.batting")?;
    let pitching_categories =
        convert_categories(&raw.scoring.pitching, "league.scoring.pitching")?;

    Ok(LeagueConfig {
        name: raw.name,
        managers: raw.managers,
        draft_budget: raw.draft_budget,
        batter_slots,
        pitcher_slots,
        batting_categories,
        pitching_categories,
    })
}

fn convert_categories(names: &[String], field: &str) -> Result<Vec<Category>, ConfigError> {
    names
        .iter()
        .map(|name| {
            Category::from_abbrev(name).ok_or_else(|| ConfigError::ValidationError {
                field: field.to_string(),
                message: format!("unknown scoring category `{name}`"),
            })
        })
        .collect()
}

fn convert_type_split(raw: RawTypeSplit, which: &str) -> Result<TypeSplit, ConfigError> {
    let mut cats = BTreeMap::new();
    for (key, frac) in &raw.cats {
        let cat = Category::from_abbrev(key).ok_or_else(|| ConfigError::ValidationError {
            field: format!("{which}.cats.{key}"),
            message: "unknown scoring category".into(),
        })?;
        cats.insert(cat, *frac);
    }
    Ok(TypeSplit { ovr: raw.ovr, cats })
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let league = &config.league;

    if league.managers == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.managers".into(),
            message: "must be greater than 0".into(),
        });
    }

    if league.draft_budget == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.draft_budget".into(),
            message: "must be greater than 0".into(),
        });
    }

    // Every canonical batter bucket needs a slot count so that pool sizes
    // and RLP windows are defined for it.
    for pos in BATTER_BUCKET_ORDER {
        match league.batter_slots.get(pos) {
            Some(0) | None => {
                return Err(ConfigError::ValidationError {
                    field: format!("league.roster.batters.{pos}"),
                    message: "every batter bucket needs a slot count > 0".into(),
                });
            }
            Some(_) => {}
        }
    }

    if league.pitcher_slots.sp == 0 || league.pitcher_slots.rp == 0 {
        return Err(ConfigError::ValidationError {
            field: "league.roster.pitchers".into(),
            message: "SP and RP slot counts must be > 0".into(),
        });
    }

    if league.batting_categories.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "league.scoring.batting".into(),
            message: "at least one batting category is required".into(),
        });
    }
    if league.pitching_categories.is_empty() {
        return Err(ConfigError::ValidationError {
            field: "league.scoring.pitching".into(),
            message: "at least one pitching category is required".into(),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    const LEAGUE_TOML: &str = r#"
[league]
name = "Test League"
managers = 10
draft_budget = 260

[league.roster.batters]
C = 1
"1B" = 1
"2B" = 1
"3B" = 1
SS = 1
OF = 3
DH = 1

[league.roster.pitchers]
SP = 2
RP = 2
P = 3

[league.scoring]
batting = ["HR", "R", "RBI", "SBN", "OBP", "SLG"]
pitching = ["IP", "QS", "SVHD", "ERA", "WHIP", "K/9"]

[data_paths]
extract_dir = "data/extract"
out_dir = "data/transform"
"#;

    const BUDGET_TOML: &str = r#"
[bats]
ovr = 0.65
[bats.cats]
HR = 0.20
R = 0.15
RBI = 0.10
SBN = 0.15
OBP = 0.20
SLG = 0.20

[sps]
ovr = 0.20
[sps.cats]
IP = 0.15
QS = 0.20
ERA = 0.20
WHIP = 0.20
"K/9" = 0.25

[rps]
ovr = 0.15
[rps.cats]
IP = 0.15
SVHD = 0.20
ERA = 0.20
WHIP = 0.20
"K/9" = 0.25
"#;

    fn write_config(dir: &Path, league: &str, budget: &str) {
        let config_dir = dir.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("league.toml"), league).unwrap();
        fs::write(config_dir.join("budget.toml"), budget).unwrap();
    }

    fn temp_base(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!("appraiser_config_{name}"));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn load_valid_config() {
        let dir = temp_base("valid");
        write_config(&dir, LEAGUE_TOML, BUDGET_TOML);

        let config = load_config_from(&dir).expect("should load valid config");

        assert_eq!(config.league.name, "Test League");
        assert_eq!(config.league.managers, 10);
        assert_eq!(config.league.draft_budget, 260);
        assert_eq!(config.league.batter_slots[&Position::Outfield], 3);
        assert_eq!(config.league.batter_slots[&Position::DesignatedHitter], 1);
        assert_eq!(config.league.pitcher_slots.sp, 2);
        assert_eq!(config.league.pitcher_slots.rp, 2);
        assert_eq!(config.league.pitcher_slots.wildcard, 3);
        assert_eq!(
            config.league.batting_categories,
            vec![
                Category::HomeRuns,
                Category::Runs,
                Category::RunsBattedIn,
                Category::NetStolenBases,
                Category::OnBasePct,
                Category::SluggingPct,
            ]
        );
        assert_eq!(config.league.pitching_categories.len(), 6);
        assert!((config.budget_split.bats.ovr - 0.65).abs() < f64::EPSILON);
        assert!(
            (config.budget_split.rps.cats[&Category::SavesPlusHolds] - 0.20).abs() < f64::EPSILON
        );
        assert_eq!(config.data_paths.extract_dir, "data/extract");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_zero_managers() {
        let dir = temp_base("zero_managers");
        write_config(
            &dir,
            &LEAGUE_TOML.replace("managers = 10", "managers = 0"),
            BUDGET_TOML,
        );

        let err = load_config_from(&dir).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => assert_eq!(field, "league.managers"),
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_missing_batter_bucket() {
        let dir = temp_base("missing_bucket");
        write_config(&dir, &LEAGUE_TOML.replace("SS = 1\n", ""), BUDGET_TOML);

        let err = load_config_from(&dir).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "league.roster.batters.SS");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_unknown_category() {
        let dir = temp_base("bad_category");
        write_config(
            &dir,
            &LEAGUE_TOML.replace("\"SBN\"", "\"XYZ\""),
            BUDGET_TOML,
        );

        let err = load_config_from(&dir).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, message } => {
                assert_eq!(field, "league.scoring.batting");
                assert!(message.contains("XYZ"));
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn rejects_missing_wildcard_slot() {
        let dir = temp_base("missing_wildcard");
        write_config(&dir, &LEAGUE_TOML.replace("P = 3\n", ""), BUDGET_TOML);

        let err = load_config_from(&dir).unwrap_err();
        match &err {
            ConfigError::ValidationError { field, .. } => {
                assert_eq!(field, "league.roster.pitchers.P");
            }
            other => panic!("expected ValidationError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_not_found_for_missing_budget_toml() {
        let dir = temp_base("missing_budget");
        let config_dir = dir.join("config");
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(config_dir.join("league.toml"), LEAGUE_TOML).unwrap();

        let err = load_config_from(&dir).unwrap_err();
        match &err {
            ConfigError::FileNotFound { path } => assert!(path.ends_with("budget.toml")),
            other => panic!("expected FileNotFound, got: {other}"),
        }

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn parse_error_for_invalid_toml() {
        let dir = temp_base("invalid_toml");
        write_config(&dir, "not valid [[[ toml", BUDGET_TOML);

        let err = load_config_from(&dir).unwrap_err();
        match &err {
            ConfigError::ParseError { path, .. } => assert!(path.ends_with("league.toml")),
            other => panic!("expected ParseError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn ensure_config_files_copies_missing() {
        let dir = temp_base("ensure_copies");
        let defaults_dir = dir.join("defaults");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::write(defaults_dir.join("league.toml"), LEAGUE_TOML).unwrap();
        fs::write(defaults_dir.join("budget.toml"), BUDGET_TOML).unwrap();

        let copied = ensure_config_files(&dir).expect("should succeed");
        assert_eq!(copied.len(), 2);
        assert!(dir.join("config/league.toml").exists());
        assert!(dir.join("config/budget.toml").exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn ensure_config_files_skips_existing() {
        let dir = temp_base("ensure_skips");
        let defaults_dir = dir.join("defaults");
        let config_dir = dir.join("config");
        fs::create_dir_all(&defaults_dir).unwrap();
        fs::create_dir_all(&config_dir).unwrap();
        fs::write(defaults_dir.join("league.toml"), LEAGUE_TOML).unwrap();
        fs::write(defaults_dir.join("budget.toml"), BUDGET_TOML).unwrap();
        fs::write(config_dir.join("league.toml"), "# custom\n").unwrap();

        let copied = ensure_config_files(&dir).expect("should succeed");
        assert_eq!(copied.len(), 1);
        assert!(copied[0].ends_with("budget.toml"));

        let content = fs::read_to_string(config_dir.join("league.toml")).unwrap();
        assert_eq!(content, "# custom\n");

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn errors_when_both_dirs_missing() {
        let dir = temp_base("both_missing");

        let err = ensure_config_files(&dir).unwrap_err();
        match &err {
            ConfigError::DefaultsCopyError { message } => {
                assert!(message.contains("neither defaults/ nor config/"));
            }
            other => panic!("expected DefaultsCopyError, got: {other}"),
        }

        let _ = fs::remove_dir_all(&dir);
    }
}
