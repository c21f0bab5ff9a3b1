// Standardizer: replacement-level profiles and z-scores per position group.
//
// The replacement-level player (RLP) profile for a bucket is the average
// stat line of the three players ranked just outside the draftable pool.
// Z-scores measure each player against that profile, compressed through a
// square root to tame high-end outliers, and position-eligibility conflicts
// are resolved so each batter ends up in exactly one bucket.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::warn;

use crate::config::{LeagueConfig, PitcherSlots};
use crate::model::{Category, Player, Position, PositionGroup, BATTER_BUCKET_ORDER};

/// Threshold below which a pool's standard deviation is treated as zero.
const STDEV_EPSILON: f64 = 1e-9;

/// Players averaged into the replacement-level profile.
const RLP_WINDOW: usize = 3;

// ---------------------------------------------------------------------------
// Wildcard pitcher split
// ---------------------------------------------------------------------------

/// Split the wildcard pitcher allotment between the SP and RP roles.
/// SP takes the ceiling half; the remainder goes to RP. The combined slot
/// count is preserved exactly.
pub fn split_wildcard_slots(slots: &PitcherSlots) -> (usize, usize) {
    let wildcard_sp = slots.wildcard.div_ceil(2);
    let sp = slots.sp + wildcard_sp;
    let rp = slots.rp + (slots.wildcard - wildcard_sp);
    (sp, rp)
}

// ---------------------------------------------------------------------------
// Standardizer
// ---------------------------------------------------------------------------

pub struct Standardizer<'a> {
    league: &'a LeagueConfig,
}

impl<'a> Standardizer<'a> {
    pub fn new(league: &'a LeagueConfig) -> Self {
        Standardizer { league }
    }

    fn batter_pool_size(&self, pos: Position) -> usize {
        self.league.managers * self.league.batter_slots.get(&pos).copied().unwrap_or(0)
    }

    /// Standardize the batter table into terminal position groups, ordered
    /// `C, 1B, 2B, 3B, SS, OF, DH`.
    ///
    /// Two full passes over every bucket: an initial RLP + z-score pass on
    /// the proxy-sorted input, primary-position resolution, then a final
    /// RLP + z-score pass on the resolved tables. The DH bucket is built
    /// from the other buckets' replacement-level spillover plus players
    /// eligible only at DH, and is always processed last.
    pub fn standardize_batters(&self, bats: &[Player]) -> Vec<PositionGroup> {
        let cats = &self.league.batting_categories;

        // ---- Pass 1a: initial bucketing and RLP profiles ----
        let mut groups: Vec<PositionGroup> = Vec::new();
        let mut dh_pool: Vec<Player> = Vec::new();

        for &pos in BATTER_BUCKET_ORDER {
            if pos == Position::DesignatedHitter {
                continue;
            }
            let players: Vec<Player> = bats
                .iter()
                .filter(|p| p.positions.contains(&pos))
                .cloned()
                .collect();
            let mut group = PositionGroup::new(pos, players, self.batter_pool_size(pos));
            let window = rlp_window(&group.players, group.pool_size);
            dh_pool.extend_from_slice(window);
            group.rlp = rlp_profile(window, cats, pos);
            groups.push(group);
        }

        // DH candidates: replacement-level spillover plus DH-only players.
        dh_pool.extend(
            bats.iter()
                .filter(|p| p.positions == [Position::DesignatedHitter])
                .cloned(),
        );
        sort_by_proxy_desc(&mut dh_pool);
        dedup_by_espn(&mut dh_pool);
        let mut dh = PositionGroup::new(
            Position::DesignatedHitter,
            dh_pool,
            self.batter_pool_size(Position::DesignatedHitter),
        );
        dh.rlp = rlp_profile(
            rlp_window(&dh.players, dh.pool_size),
            cats,
            Position::DesignatedHitter,
        );

        // ---- Pass 1b: first z-scores; each bucket's top pool leaves DH ----
        for group in &mut groups {
            let rlp = group.rlp.clone();
            apply_zscores(group, &rlp, cats);
            remove_pooled_players(&mut dh.players, group);
        }
        let dh_rlp = dh.rlp.clone();
        apply_zscores(&mut dh, &dh_rlp, cats);
        groups.push(dh);

        // ---- Pass 2a: primary-position resolution ----
        resolve_primary_positions(&mut groups, &self.league.batter_slots);

        // ---- Pass 2b: final RLP + z-scores on the resolved tables ----
        let mut dh = groups.pop().expect("DH group is always present");
        for group in &mut groups {
            let rlp = rlp_profile(
                rlp_window(&group.players, group.pool_size),
                cats,
                group.position,
            );
            group.rlp = rlp.clone();
            apply_zscores(group, &rlp, cats);

            // Refresh the DH pool from the re-scored bucket.
            let window = rlp_window(&group.players, group.pool_size).to_vec();
            dh.players.extend(window);
            remove_pooled_players(&mut dh.players, group);
            dedup_by_espn(&mut dh.players);
        }
        // DH ranks on the raw proxy metric, not z_total.
        sort_by_proxy_desc(&mut dh.players);
        let rlp = rlp_profile(
            rlp_window(&dh.players, dh.pool_size),
            cats,
            Position::DesignatedHitter,
        );
        dh.rlp = rlp.clone();
        apply_zscores(&mut dh, &rlp, cats);
        groups.push(dh);

        groups
    }

    /// Standardize the starter and reliever tables. SP/RP are mutually
    /// exclusive roles, so no position resolution is needed: two RLP +
    /// z-score passes, the second against the re-sorted pools.
    pub fn standardize_pitchers(
        &self,
        starters: Vec<Player>,
        relievers: Vec<Player>,
    ) -> Vec<PositionGroup> {
        let cats = &self.league.pitching_categories;
        let (sp_slots, rp_slots) = split_wildcard_slots(&self.league.pitcher_slots);

        let mut groups = vec![
            PositionGroup::new(
                Position::StartingPitcher,
                starters,
                self.league.managers * sp_slots,
            ),
            PositionGroup::new(
                Position::ReliefPitcher,
                relievers,
                self.league.managers * rp_slots,
            ),
        ];

        for _pass in 0..2 {
            for group in &mut groups {
                let rlp = rlp_profile(
                    rlp_window(&group.players, group.pool_size),
                    cats,
                    group.position,
                );
                group.rlp = rlp.clone();
                apply_zscores(group, &rlp, cats);
            }
        }

        groups
    }
}

// ---------------------------------------------------------------------------
// RLP helpers
// ---------------------------------------------------------------------------

/// The replacement-level window: players ranked `[pool_size, pool_size+3)`,
/// clamped to the table length.
fn rlp_window(players: &[Player], pool_size: usize) -> &[Player] {
    let start = pool_size.min(players.len());
    let end = (pool_size + RLP_WINDOW).min(players.len());
    &players[start..end]
}

/// Average each scored category over the window. Categories absent from
/// every window row are left out of the profile (skip semantics downstream).
fn rlp_profile(
    window: &[Player],
    categories: &[Category],
    pos: Position,
) -> BTreeMap<Category, f64> {
    let mut profile = BTreeMap::new();
    if window.is_empty() {
        warn!("{pos} bucket too small for a replacement-level window");
        return profile;
    }
    for &cat in categories {
        let values: Vec<f64> = window
            .iter()
            .filter_map(|p| p.stats.get(&cat).copied())
            .collect();
        if values.is_empty() {
            continue;
        }
        profile.insert(cat, values.iter().sum::<f64>() / values.len() as f64);
    }
    profile
}

// ---------------------------------------------------------------------------
// Z-score computation
// ---------------------------------------------------------------------------

/// Sample standard deviation (Bessel's correction). Returns 0.0 for fewer
/// than two values.
fn sample_stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let n = values.len() as f64;
    let mean = values.iter().sum::<f64>() / n;
    let variance = values.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (n - 1.0);
    variance.sqrt()
}

/// Score every player in the group against the RLP profile, then re-rank.
///
/// `z = sign(v - rlp) * sqrt(|v - rlp| / stdev)` where the standard
/// deviation is taken over the draftable pool only. Lower-is-better
/// categories flip the sign term. A degenerate pool (stdev ~ 0) zeroes the
/// category's z-scores rather than dividing by zero.
fn apply_zscores(
    group: &mut PositionGroup,
    rlp: &BTreeMap<Category, f64>,
    categories: &[Category],
) {
    let pool_len = group.pool_size.min(group.players.len());

    let mut stdevs: BTreeMap<Category, f64> = BTreeMap::new();
    for &cat in categories {
        if !rlp.contains_key(&cat) {
            continue;
        }
        let pool_values: Vec<f64> = group.players[..pool_len]
            .iter()
            .filter_map(|p| p.stats.get(&cat).copied())
            .collect();
        let sd = sample_stdev(&pool_values);
        if sd < STDEV_EPSILON {
            warn!(
                "{} pool has no {} spread; z-scores for the category zeroed",
                group.position, cat
            );
        }
        stdevs.insert(cat, sd);
    }

    for player in &mut group.players {
        player.zscores.clear();
        for &cat in categories {
            let (Some(&rlp_mean), Some(&sd)) = (rlp.get(&cat), stdevs.get(&cat)) else {
                continue;
            };
            let Some(&value) = player.stats.get(&cat) else {
                continue;
            };
            let delta = if cat.lower_is_better() {
                rlp_mean - value
            } else {
                value - rlp_mean
            };
            let z = if sd < STDEV_EPSILON {
                0.0
            } else {
                delta.signum() * (delta.abs() / sd).sqrt()
            };
            player.zscores.insert(cat, z);
        }
        player.z_total = player.zscores.values().sum();
    }

    group.players.sort_by(|a, b| {
        b.z_total
            .partial_cmp(&a.z_total)
            .unwrap_or(Ordering::Equal)
    });
}

// ---------------------------------------------------------------------------
// Primary-position resolution
// ---------------------------------------------------------------------------

/// Resolve multi-position eligibility so each batter survives in exactly one
/// bucket.
///
/// Pure two-pass construction: first collect, for every player present in
/// more than one of their eligible buckets, the draft tier
/// `ceil(rank / roster_slots)` (1-based rank) in each; then retain the
/// player only in the bucket with the lowest tier. Equal tiers keep the
/// position listed first in the player's eligibility list. Pitcher
/// positions never participate.
fn resolve_primary_positions(
    groups: &mut [PositionGroup],
    batter_slots: &BTreeMap<Position, usize>,
) {
    struct Candidate {
        group_idx: usize,
        tier: usize,
        elig_idx: usize,
    }

    let mut by_player: HashMap<String, Vec<Candidate>> = HashMap::new();

    for (group_idx, group) in groups.iter().enumerate() {
        let slots = batter_slots
            .get(&group.position)
            .copied()
            .unwrap_or(1)
            .max(1);
        for (idx, player) in group.players.iter().enumerate() {
            let batter_eligibility = player
                .positions
                .iter()
                .filter(|p| !p.is_pitcher())
                .count();
            if batter_eligibility < 2 {
                continue;
            }
            // Spillover rows (e.g. in DH without DH eligibility) stay put.
            let Some(elig_idx) = player.positions.iter().position(|p| *p == group.position)
            else {
                continue;
            };
            let tier = (idx + 1).div_ceil(slots);
            by_player
                .entry(player.ids.espn.clone())
                .or_default()
                .push(Candidate {
                    group_idx,
                    tier,
                    elig_idx,
                });
        }
    }

    let mut removals: Vec<HashSet<String>> = vec![HashSet::new(); groups.len()];
    for (espn, candidates) in by_player {
        if candidates.len() < 2 {
            continue;
        }
        let best = candidates
            .iter()
            .min_by_key(|c| (c.tier, c.elig_idx))
            .expect("candidates is non-empty");
        let best_group = best.group_idx;
        for candidate in &candidates {
            if candidate.group_idx != best_group {
                removals[candidate.group_idx].insert(espn.clone());
            }
        }
    }

    for (group_idx, group) in groups.iter_mut().enumerate() {
        let to_remove = &removals[group_idx];
        if !to_remove.is_empty() {
            group
                .players
                .retain(|p| !to_remove.contains(p.ids.espn.as_str()));
        }
    }
}

// ---------------------------------------------------------------------------
// Small table helpers
// ---------------------------------------------------------------------------

fn sort_by_proxy_desc(players: &mut [Player]) {
    players.sort_by(|a, b| b.proxy.partial_cmp(&a.proxy).unwrap_or(Ordering::Equal));
}

fn dedup_by_espn(players: &mut Vec<Player>) {
    let mut seen = HashSet::new();
    players.retain(|p| seen.insert(p.ids.espn.clone()));
}

/// Drop from `players` anyone inside `group`'s draftable pool.
fn remove_pooled_players(players: &mut Vec<Player>, group: &PositionGroup) {
    let pooled: HashSet<&str> = group.pool().iter().map(|p| p.ids.espn.as_str()).collect();
    players.retain(|p| !pooled.contains(p.ids.espn.as_str()));
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
