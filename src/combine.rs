// Combiner: merges the per-source tables into one batter table and one
// pitcher table keyed by canonical identity.
//
// Projection rows join through the keymap on FanGraphs ID, statcast rows on
// MLBAM ID, and the player universe supplies eligibility and ownership by
// ESPN ID. Players that cannot be resolved end-to-end are reported and
// excluded; the downstream passes only ever see fully-keyed rows.

use std::collections::{HashMap, HashSet};
use tracing::warn;

use crate::keymap::KeyMap;
use crate::model::{PlayerIds, Position};
use crate::sources::{BatterProjection, ExtractBundle, PitcherProjection, StatcastRow, UniversePlayer};

// ---------------------------------------------------------------------------
// Combined row types
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct CombinedBatter {
    pub ids: PlayerIds,
    pub name: String,
    pub team: String,
    pub positions: Vec<Position>,
    pub owner: Option<String>,
    pub pct_rostered: Option<f64>,
    pub proj: BatterProjection,
    pub statcast: Option<StatcastRow>,
}

#[derive(Debug, Clone)]
pub struct CombinedPitcher {
    pub ids: PlayerIds,
    pub name: String,
    pub team: String,
    pub positions: Vec<Position>,
    pub owner: Option<String>,
    pub pct_rostered: Option<f64>,
    pub proj: PitcherProjection,
    pub statcast: Option<StatcastRow>,
}

// ---------------------------------------------------------------------------
// Combiner
// ---------------------------------------------------------------------------

pub struct Combiner<'a> {
    keymap: &'a KeyMap,
}

impl<'a> Combiner<'a> {
    pub fn new(keymap: &'a KeyMap) -> Self {
        Combiner { keymap }
    }

    /// Merge the extracted bundle into combined batter and pitcher tables.
    pub fn combine(&self, bundle: &ExtractBundle) -> (Vec<CombinedBatter>, Vec<CombinedPitcher>) {
        let universe_by_espn: HashMap<&str, &UniversePlayer> = bundle
            .universe
            .iter()
            .map(|u| (u.espn_id.as_str(), u))
            .collect();
        let statcast_bats: HashMap<&str, &StatcastRow> = bundle
            .statcast_batters
            .iter()
            .map(|s| (s.mlb_id.as_str(), s))
            .collect();
        let statcast_arms: HashMap<&str, &StatcastRow> = bundle
            .statcast_pitchers
            .iter()
            .map(|s| (s.mlb_id.as_str(), s))
            .collect();

        let mut seen_bats = HashSet::new();
        let mut bats = Vec::new();
        for proj in &bundle.batter_projections {
            let Some((ids, universe)) =
                self.resolve(&proj.fangraphs_id, &proj.name, &universe_by_espn)
            else {
                continue;
            };
            if !seen_bats.insert(ids.espn.clone()) {
                warn!("duplicate canonical id for batter '{}', keeping first", proj.name);
                continue;
            }
            let positions = parse_positions(universe, &proj.name);
            if positions.is_empty() {
                warn!(
                    "excluding batter '{}': no recognizable position eligibility",
                    proj.name
                );
                continue;
            }
            let statcast = statcast_bats.get(ids.mlb.as_str()).map(|&s| s.clone());
            bats.push(CombinedBatter {
                ids,
                name: proj.name.clone(),
                team: proj.team.clone(),
                positions,
                owner: universe.owner.clone(),
                pct_rostered: universe.pct_rostered,
                proj: proj.clone(),
                statcast,
            });
        }

        let mut seen_arms = HashSet::new();
        let mut arms = Vec::new();
        for proj in &bundle.pitcher_projections {
            let Some((ids, universe)) =
                self.resolve(&proj.fangraphs_id, &proj.name, &universe_by_espn)
            else {
                continue;
            };
            if !seen_arms.insert(ids.espn.clone()) {
                warn!("duplicate canonical id for pitcher '{}', keeping first", proj.name);
                continue;
            }
            // Pitchers bucket by role, not eligibility, so an empty position
            // list is tolerated here; the Cleaner backfills the role.
            let positions = parse_positions(universe, &proj.name);
            let statcast = statcast_arms.get(ids.mlb.as_str()).map(|&s| s.clone());
            arms.push(CombinedPitcher {
                ids,
                name: proj.name.clone(),
                team: proj.team.clone(),
                positions,
                owner: universe.owner.clone(),
                pct_rostered: universe.pct_rostered,
                proj: proj.clone(),
                statcast,
            });
        }

        (bats, arms)
    }

    /// Resolve a projection row to its canonical identity and universe
    /// entry. Reports and drops rows the keymap or universe cannot place.
    fn resolve<'u>(
        &self,
        fangraphs_id: &str,
        name: &str,
        universe_by_espn: &HashMap<&str, &'u UniversePlayer>,
    ) -> Option<(PlayerIds, &'u UniversePlayer)> {
        let Some(ids) = self.keymap.by_fangraphs(fangraphs_id) else {
            warn!("excluding '{name}': FanGraphs id {fangraphs_id} not in keymap");
            return None;
        };
        let Some(universe) = universe_by_espn.get(ids.espn.as_str()).copied() else {
            warn!(
                "excluding '{name}': ESPN id {} not in the player universe",
                ids.espn
            );
            return None;
        };
        Some((ids.clone(), universe))
    }
}

fn parse_positions(universe: &UniversePlayer, name: &str) -> Vec<Position> {
    let mut positions = Vec::with_capacity(universe.positions.len());
    for raw in &universe.positions {
        match Position::from_abbrev(raw) {
            Some(pos) if !positions.contains(&pos) => positions.push(pos),
            Some(_) => {}
            None => warn!("ignoring unknown position '{raw}' for '{name}'"),
        }
    }
    positions
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
