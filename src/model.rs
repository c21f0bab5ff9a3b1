// Core data model shared across the pipeline: positions, scored categories,
// canonical identity, player records, and position groups.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

// ---------------------------------------------------------------------------
// Season mode
// ---------------------------------------------------------------------------

/// Which slice of the season the pipeline is processing. Pre-season runs use
/// full-season projections; regular-season runs use rest-of-season
/// projections plus ownership data from the player universe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeasonMode {
    PreSeason,
    RegularSeason,
}

impl SeasonMode {
    /// File-name suffix used by the extract directory convention.
    pub fn file_suffix(&self) -> &'static str {
        match self {
            SeasonMode::PreSeason => "pre_season",
            SeasonMode::RegularSeason => "regular_season",
        }
    }
}

impl fmt::Display for SeasonMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeasonMode::PreSeason => write!(f, "pre-season"),
            SeasonMode::RegularSeason => write!(f, "regular-season"),
        }
    }
}

// ---------------------------------------------------------------------------
// Positions
// ---------------------------------------------------------------------------

/// Roster positions used for bucketing players.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Position {
    #[serde(rename = "C")]
    Catcher,
    #[serde(rename = "1B")]
    FirstBase,
    #[serde(rename = "2B")]
    SecondBase,
    #[serde(rename = "3B")]
    ThirdBase,
    #[serde(rename = "SS")]
    ShortStop,
    #[serde(rename = "OF")]
    Outfield,
    #[serde(rename = "DH")]
    DesignatedHitter,
    #[serde(rename = "SP")]
    StartingPitcher,
    #[serde(rename = "RP")]
    ReliefPitcher,
}

/// Batter bucket iteration order. DH must come last: its candidate pool is
/// fed by the replacement-level spillover of every other bucket.
pub const BATTER_BUCKET_ORDER: &[Position] = &[
    Position::Catcher,
    Position::FirstBase,
    Position::SecondBase,
    Position::ThirdBase,
    Position::ShortStop,
    Position::Outfield,
    Position::DesignatedHitter,
];

impl Position {
    /// Parse a roster abbreviation. Individual outfield spots collapse into
    /// the generic OF bucket.
    pub fn from_abbrev(s: &str) -> Option<Self> {
        match s.trim().to_uppercase().as_str() {
            "C" => Some(Position::Catcher),
            "1B" => Some(Position::FirstBase),
            "2B" => Some(Position::SecondBase),
            "3B" => Some(Position::ThirdBase),
            "SS" => Some(Position::ShortStop),
            "OF" | "LF" | "CF" | "RF" => Some(Position::Outfield),
            "DH" | "UTIL" => Some(Position::DesignatedHitter),
            "SP" => Some(Position::StartingPitcher),
            "RP" => Some(Position::ReliefPitcher),
            _ => None,
        }
    }

    pub fn abbrev(&self) -> &'static str {
        match self {
            Position::Catcher => "C",
            Position::FirstBase => "1B",
            Position::SecondBase => "2B",
            Position::ThirdBase => "3B",
            Position::ShortStop => "SS",
            Position::Outfield => "OF",
            Position::DesignatedHitter => "DH",
            Position::StartingPitcher => "SP",
            Position::ReliefPitcher => "RP",
        }
    }

    pub fn is_pitcher(&self) -> bool {
        matches!(self, Position::StartingPitcher | Position::ReliefPitcher)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbrev())
    }
}

// ---------------------------------------------------------------------------
// Scored categories
// ---------------------------------------------------------------------------

/// Closed vocabulary of scored statistical categories. Per-player values,
/// z-scores, and shekel amounts are keyed by this enum rather than by
/// constructed column-name strings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Category {
    // Batting
    #[serde(rename = "HR")]
    HomeRuns,
    #[serde(rename = "R")]
    Runs,
    #[serde(rename = "RBI")]
    RunsBattedIn,
    #[serde(rename = "SBN")]
    NetStolenBases,
    #[serde(rename = "OBP")]
    OnBasePct,
    #[serde(rename = "SLG")]
    SluggingPct,
    // Pitching
    #[serde(rename = "IP")]
    InningsPitched,
    #[serde(rename = "QS")]
    QualityStarts,
    #[serde(rename = "SVHD")]
    SavesPlusHolds,
    #[serde(rename = "ERA")]
    EarnedRunAvg,
    #[serde(rename = "WHIP")]
    Whip,
    #[serde(rename = "K/9")]
    StrikeoutsPerNine,
}

impl Category {
    pub fn from_abbrev(s: &str) -> Option<Self> {
        match s.trim() {
            "HR" => Some(Category::HomeRuns),
            "R" => Some(Category::Runs),
            "RBI" => Some(Category::RunsBattedIn),
            "SBN" => Some(Category::NetStolenBases),
            "OBP" => Some(Category::OnBasePct),
            "SLG" => Some(Category::SluggingPct),
            "IP" => Some(Category::InningsPitched),
            "QS" => Some(Category::QualityStarts),
            "SVHD" => Some(Category::SavesPlusHolds),
            "ERA" => Some(Category::EarnedRunAvg),
            "WHIP" => Some(Category::Whip),
            "K/9" => Some(Category::StrikeoutsPerNine),
            _ => None,
        }
    }

    pub fn abbrev(&self) -> &'static str {
        match self {
            Category::HomeRuns => "HR",
            Category::Runs => "R",
            Category::RunsBattedIn => "RBI",
            Category::NetStolenBases => "SBN",
            Category::OnBasePct => "OBP",
            Category::SluggingPct => "SLG",
            Category::InningsPitched => "IP",
            Category::QualityStarts => "QS",
            Category::SavesPlusHolds => "SVHD",
            Category::EarnedRunAvg => "ERA",
            Category::Whip => "WHIP",
            Category::StrikeoutsPerNine => "K/9",
        }
    }

    /// True for categories where a lower raw value is better. These invert
    /// the sign convention before the square-root transform.
    pub fn lower_is_better(&self) -> bool {
        matches!(self, Category::EarnedRunAvg | Category::Whip)
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.abbrev())
    }
}

// ---------------------------------------------------------------------------
// Canonical identity
// ---------------------------------------------------------------------------

/// The three source-specific identifiers unified by the keymap. ESPN is the
/// canonical key for the player universe, FanGraphs keys the projection
/// source, MLBAM keys the statcast source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlayerIds {
    #[serde(rename = "ESPNID")]
    pub espn: String,
    #[serde(rename = "FANGRAPHSID")]
    pub fangraphs: String,
    #[serde(rename = "MLBID")]
    pub mlb: String,
}

// ---------------------------------------------------------------------------
// Player record
// ---------------------------------------------------------------------------

/// A player carried through the standardization and valuation passes.
///
/// `stats` holds the scored-category values selected by the Cleaner for the
/// current season mode. `zscores`, `z_total`, `money`, and `shekels` start
/// empty/zero and are filled by the Standardizer and Valuator.
#[derive(Debug, Clone, Serialize)]
pub struct Player {
    #[serde(flatten)]
    pub ids: PlayerIds,
    pub name: String,
    pub team: String,
    /// Ordered eligibility list from the player universe.
    pub positions: Vec<Position>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pct_rostered: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub barrel_pct: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hard_hit_pct: Option<f64>,
    /// Ranking proxy metric: wRC+ for batters (higher is better), FIP for
    /// pitchers (lower is better).
    pub proxy: f64,
    pub stats: BTreeMap<Category, f64>,
    pub zscores: BTreeMap<Category, f64>,
    pub z_total: f64,
    pub money: BTreeMap<Category, f64>,
    pub shekels: f64,
}

impl Player {
    /// A bare record with empty derived fields; the Cleaner fills in stats
    /// and passthrough columns.
    pub fn new(ids: PlayerIds, name: String, team: String, positions: Vec<Position>) -> Self {
        Player {
            ids,
            name,
            team,
            positions,
            owner: None,
            pct_rostered: None,
            barrel_pct: None,
            hard_hit_pct: None,
            proxy: 0.0,
            stats: BTreeMap::new(),
            zscores: BTreeMap::new(),
            z_total: 0.0,
            money: BTreeMap::new(),
            shekels: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Position group
// ---------------------------------------------------------------------------

/// A ranked table of players bucketed at one position, together with the
/// derived scalars the valuation passes attach to it.
#[derive(Debug, Clone)]
pub struct PositionGroup {
    pub position: Position,
    /// Ranked player table. Sort key depends on the phase: the raw proxy
    /// metric before the first z-pass, `z_total` afterwards.
    pub players: Vec<Player>,
    /// managers x roster slots for this position: the draftable cutoff.
    pub pool_size: usize,
    /// Replacement-level profile: category -> mean over the three players
    /// ranked just outside the draftable pool.
    pub rlp: BTreeMap<Category, f64>,
    /// Sum of z_total over the draftable pool; set by the Valuator.
    pub pool_z: f64,
    /// Shekels earmarked for this group; set by the Valuator.
    pub budget_alloc: f64,
}

impl PositionGroup {
    pub fn new(position: Position, players: Vec<Player>, pool_size: usize) -> Self {
        PositionGroup {
            position,
            players,
            pool_size,
            rlp: BTreeMap::new(),
            pool_z: 0.0,
            budget_alloc: 0.0,
        }
    }

    /// The draftable slice, clamped to the table length.
    pub fn pool(&self) -> &[Player] {
        let n = self.pool_size.min(self.players.len());
        &self.players[..n]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
