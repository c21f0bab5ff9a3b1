// Valuator: converts standardized position groups into auction currency
// ("shekels").
//
// The league budget splits across player types and categories per the
// configured fractions. Batting categories weight each bucket by its share
// of the league-wide raw production; SP and RP budgets are carved out
// per role, so no cross-bucket weighting applies. Within a (bucket,
// category) pair, money flows at a fixed shekel-per-z rate derived from the
// draftable pool, which makes the pool's per-category money sum reproduce
// the category's earmark by construction.

use std::collections::BTreeMap;
use thiserror::Error;
use tracing::warn;

use crate::config::{BudgetSplit, LeagueConfig, TypeSplit};
use crate::model::{Category, Position, PositionGroup};

/// Tolerance when checking that configured fractions sum to 1. Absorbs the
/// representation error of decimal TOML literals.
const SPLIT_TOLERANCE: f64 = 1e-6;

/// Below this magnitude a pool z-sum is treated as zero and the category's
/// rate is dropped instead of dividing by it.
const ZSUM_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum AppraiseError {
    #[error("invalid budget split for `{which}`: {message}")]
    InvalidSplit { which: String, message: String },
}

// ---------------------------------------------------------------------------
// Appraiser
// ---------------------------------------------------------------------------

#[derive(Debug)]
pub struct Appraiser<'a> {
    league: &'a LeagueConfig,
    split: &'a BudgetSplit,
    /// Total currency in the auction: draft budget x managers.
    lg_budget: f64,
}

impl<'a> Appraiser<'a> {
    /// Construct an appraiser, failing fast when the budget split violates
    /// its sum invariants. Nothing is computed until `appraise` runs, so a
    /// bad configuration aborts before any monetary assignment.
    pub fn new(league: &'a LeagueConfig, split: &'a BudgetSplit) -> Result<Self, AppraiseError> {
        validate_split(split)?;
        Ok(Appraiser {
            league,
            split,
            lg_budget: league.draft_budget as f64 * league.managers as f64,
        })
    }

    pub fn league_budget(&self) -> f64 {
        self.lg_budget
    }

    /// Assign per-category money and total shekels to every player, and set
    /// `pool_z` / `budget_alloc` on each group.
    pub fn appraise(&self, bats: &mut [PositionGroup], arms: &mut [PositionGroup]) {
        // ---- Phase 1: league batting totals with per-bucket subtotals ----
        let mut league_totals: BTreeMap<Category, f64> = BTreeMap::new();
        let mut bucket_subtotals: Vec<BTreeMap<Category, f64>> = Vec::with_capacity(bats.len());

        for group in bats.iter() {
            let mut subtotals = BTreeMap::new();
            for &cat in &self.league.batting_categories {
                let values: Vec<f64> = group
                    .pool()
                    .iter()
                    .filter_map(|p| p.stats.get(&cat).copied())
                    .collect();
                if values.is_empty() {
                    continue;
                }
                let sum: f64 = values.iter().sum();
                subtotals.insert(cat, sum);
                *league_totals.entry(cat).or_insert(0.0) += sum;
            }
            bucket_subtotals.push(subtotals);
        }

        // ---- Phase 2: shekel-per-z rates ----
        for (group, subtotals) in bats.iter_mut().zip(&bucket_subtotals) {
            let rates =
                batting_rates(group, subtotals, &league_totals, &self.split.bats, self.lg_budget);
            assign_money(group, &rates);
        }

        for group in arms.iter_mut() {
            let type_split = match group.position {
                Position::StartingPitcher => &self.split.sps,
                _ => &self.split.rps,
            };
            let rates = pitching_rates(group, type_split, self.lg_budget);
            assign_money(group, &rates);
        }
    }
}

// ---------------------------------------------------------------------------
// Split validation
// ---------------------------------------------------------------------------

fn validate_split(split: &BudgetSplit) -> Result<(), AppraiseError> {
    let types = [
        ("bats", &split.bats),
        ("sps", &split.sps),
        ("rps", &split.rps),
    ];

    for (which, type_split) in &types {
        for (cat, frac) in &type_split.cats {
            if *frac < 0.0 {
                return Err(AppraiseError::InvalidSplit {
                    which: (*which).into(),
                    message: format!("category fraction for {cat} is negative ({frac})"),
                });
            }
        }
        let cat_sum: f64 = type_split.cats.values().sum();
        if (cat_sum - 1.0).abs() > SPLIT_TOLERANCE {
            return Err(AppraiseError::InvalidSplit {
                which: (*which).into(),
                message: format!("category fractions sum to {cat_sum}, expected 1"),
            });
        }
    }

    let ovr_sum: f64 = types.iter().map(|(_, t)| t.ovr).sum();
    if (ovr_sum - 1.0).abs() > SPLIT_TOLERANCE {
        return Err(AppraiseError::InvalidSplit {
            which: "ovr".into(),
            message: format!("overall fractions sum to {ovr_sum}, expected 1"),
        });
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Rate derivation
// ---------------------------------------------------------------------------

/// Batting: the category earmark is weighted by this bucket's share of the
/// league-wide raw production before dividing by the pool's z-sum.
fn batting_rates(
    group: &mut PositionGroup,
    subtotals: &BTreeMap<Category, f64>,
    league_totals: &BTreeMap<Category, f64>,
    type_split: &TypeSplit,
    lg_budget: f64,
) -> BTreeMap<Category, f64> {
    let mut rates = BTreeMap::new();
    group.budget_alloc = 0.0;

    for (&cat, &frac) in &type_split.cats {
        let Some(&subtotal) = subtotals.get(&cat) else {
            // Configured category absent from this bucket's schema.
            continue;
        };
        let Some(&total) = league_totals.get(&cat) else {
            continue;
        };
        if total.abs() < ZSUM_EPSILON {
            warn!(
                "league-wide {cat} total is zero; no budget assigned for it in {}",
                group.position
            );
            continue;
        }
        let weight = subtotal / total;
        let earmark = lg_budget * type_split.ovr * frac * weight;
        group.budget_alloc += earmark;
        rates.insert(cat, per_z_rate(group, cat, earmark));
    }

    rates
}

/// Pitching: SP and RP budgets are already disjoint, so the full category
/// earmark lands on the single role bucket.
fn pitching_rates(
    group: &mut PositionGroup,
    type_split: &TypeSplit,
    lg_budget: f64,
) -> BTreeMap<Category, f64> {
    let mut rates = BTreeMap::new();
    group.budget_alloc = 0.0;

    for (&cat, &frac) in &type_split.cats {
        let present = group.pool().iter().any(|p| p.zscores.contains_key(&cat));
        if !present {
            continue;
        }
        let earmark = lg_budget * type_split.ovr * frac;
        group.budget_alloc += earmark;
        rates.insert(cat, per_z_rate(group, cat, earmark));
    }

    rates
}

fn per_z_rate(group: &PositionGroup, cat: Category, earmark: f64) -> f64 {
    let z_sum: f64 = group
        .pool()
        .iter()
        .filter_map(|p| p.zscores.get(&cat).copied())
        .sum();
    if z_sum.abs() < ZSUM_EPSILON {
        warn!(
            "{} pool z-sum for {cat} is zero; shekel rate dropped",
            group.position
        );
        return 0.0;
    }
    earmark / z_sum
}

// ---------------------------------------------------------------------------
// Phase 3: per-player assignment
// ---------------------------------------------------------------------------

fn assign_money(group: &mut PositionGroup, rates: &BTreeMap<Category, f64>) {
    for player in &mut group.players {
        player.money.clear();
        for (&cat, &rate) in rates {
            if let Some(&z) = player.zscores.get(&cat) {
                player.money.insert(cat, z * rate);
            }
        }
        let total: f64 = player.money.values().sum();
        player.shekels = (total * 10.0).round() / 10.0;
    }
    group.pool_z = group.pool().iter().map(|p| p.z_total).sum();
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
