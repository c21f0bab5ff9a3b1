// Cleaner: selects the mode-relevant columns from the combined tables,
// derives the composite categories (SBN, SVHD), and partitions pitchers
// into starters and relievers by role heuristic.

use crate::combine::{CombinedBatter, CombinedPitcher};
use crate::model::{Category, Player, Position, SeasonMode};

pub struct Cleaner {
    mode: SeasonMode,
}

impl Cleaner {
    pub fn new(mode: SeasonMode) -> Self {
        Cleaner { mode }
    }

    /// Build the cleaned batter table: scored-category map, ranking proxy,
    /// and the mode's passthrough columns, sorted descending by proxy.
    pub fn clean_batters(&self, combined: Vec<CombinedBatter>) -> Vec<Player> {
        let mut players: Vec<Player> = combined
            .into_iter()
            .map(|row| {
                let mut player = Player::new(row.ids, row.name, row.team, row.positions);
                player.proxy = row.proj.wrc_plus;
                player.stats.insert(Category::HomeRuns, row.proj.hr);
                player.stats.insert(Category::Runs, row.proj.r);
                player.stats.insert(Category::RunsBattedIn, row.proj.rbi);
                player
                    .stats
                    .insert(Category::NetStolenBases, row.proj.sb - row.proj.cs);
                player.stats.insert(Category::OnBasePct, row.proj.obp);
                player.stats.insert(Category::SluggingPct, row.proj.slg);
                match self.mode {
                    SeasonMode::PreSeason => {
                        if let Some(sc) = &row.statcast {
                            player.barrel_pct = Some(sc.barrel_pct);
                            player.hard_hit_pct = Some(sc.hard_hit_pct);
                        }
                    }
                    SeasonMode::RegularSeason => {
                        player.owner = row.owner;
                        player.pct_rostered = row.pct_rostered;
                    }
                }
                player
            })
            .collect();

        // Higher wRC+ first: the raw ranking the RLP windows cut against.
        players.sort_by(|a, b| b.proxy.partial_cmp(&a.proxy).unwrap_or(std::cmp::Ordering::Equal));
        players
    }

    /// Partition pitchers into (starters, relievers) and build their cleaned
    /// tables. A pitcher projected for more quality starts than saves+holds
    /// is a starter; ties classify as relievers. Starters score QS, relievers
    /// score SVHD; both sort ascending by FIP (lower is better).
    pub fn clean_pitchers(&self, combined: Vec<CombinedPitcher>) -> (Vec<Player>, Vec<Player>) {
        let mut starters = Vec::new();
        let mut relievers = Vec::new();

        for row in combined {
            let svhd = row.proj.sv + row.proj.hld;
            let is_starter = row.proj.qs > svhd;
            let role = if is_starter {
                Position::StartingPitcher
            } else {
                Position::ReliefPitcher
            };

            let mut positions = row.positions;
            if positions.is_empty() {
                positions.push(role);
            }

            let mut player = Player::new(row.ids, row.name, row.team, positions);
            player.proxy = row.proj.fip;
            player.stats.insert(Category::InningsPitched, row.proj.ip);
            player.stats.insert(Category::EarnedRunAvg, row.proj.era);
            player.stats.insert(Category::Whip, row.proj.whip);
            player
                .stats
                .insert(Category::StrikeoutsPerNine, row.proj.k9);
            if is_starter {
                player.stats.insert(Category::QualityStarts, row.proj.qs);
            } else {
                player.stats.insert(Category::SavesPlusHolds, svhd);
            }
            match self.mode {
                SeasonMode::PreSeason => {
                    if let Some(sc) = &row.statcast {
                        player.barrel_pct = Some(sc.barrel_pct);
                        player.hard_hit_pct = Some(sc.hard_hit_pct);
                    }
                }
                SeasonMode::RegularSeason => {
                    player.owner = row.owner;
                    player.pct_rostered = row.pct_rostered;
                }
            }

            if is_starter {
                starters.push(player);
            } else {
                relievers.push(player);
            }
        }

        let by_fip_asc = |a: &Player, b: &Player| {
            a.proxy.partial_cmp(&b.proxy).unwrap_or(std::cmp::Ordering::Equal)
        };
        starters.sort_by(by_fip_asc);
        relievers.sort_by(by_fip_asc);

        (starters, relievers)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlayerIds;
    use crate::sources::{BatterProjection, PitcherProjection, StatcastRow};

    fn ids(n: u32) -> PlayerIds {
        PlayerIds {
            espn: n.to_string(),
            fangraphs: format!("fg{n}"),
            mlb: format!("m{n}"),
        }
    }

    fn combined_batter(n: u32, name: &str, wrc_plus: f64, sb: f64, cs: f64) -> CombinedBatter {
        CombinedBatter {
            ids: ids(n),
            name: name.into(),
            team: "TST".into(),
            positions: vec![Position::FirstBase],
            owner: Some("Owner X".into()),
            pct_rostered: Some(75.0),
            proj: BatterProjection {
                fangraphs_id: format!("fg{n}"),
                name: name.into(),
                team: "TST".into(),
                games: 150.0,
                pa: 600.0,
                hr: 25.0,
                r: 80.0,
                rbi: 75.0,
                sb,
                cs,
                obp: 0.350,
                slg: 0.480,
                wrc_plus,
                wraa: 15.0,
                war: 4.0,
            },
            statcast: Some(StatcastRow {
                mlb_id: format!("m{n}"),
                avg_ev: 91.0,
                barrel_pct: 12.0,
                hard_hit_pct: 45.0,
            }),
        }
    }

    fn combined_pitcher(n: u32, name: &str, qs: f64, sv: f64, hld: f64, fip: f64) -> CombinedPitcher {
        CombinedPitcher {
            ids: ids(n),
            name: name.into(),
            team: "TST".into(),
            positions: vec![],
            owner: None,
            pct_rostered: None,
            proj: PitcherProjection {
                fangraphs_id: format!("fg{n}"),
                name: name.into(),
                team: "TST".into(),
                games: 40.0,
                gs: 20.0,
                ip: 150.0,
                qs,
                sv,
                hld,
                era: 3.50,
                whip: 1.20,
                k9: 9.0,
                fip,
                war: 3.0,
            },
            statcast: None,
        }
    }

    #[test]
    fn sbn_derived_from_sb_minus_cs() {
        let cleaner = Cleaner::new(SeasonMode::PreSeason);
        let players = cleaner.clean_batters(vec![combined_batter(1, "Speedy", 120.0, 30.0, 8.0)]);
        assert!((players[0].stats[&Category::NetStolenBases] - 22.0).abs() < f64::EPSILON);
    }

    #[test]
    fn batters_sorted_descending_by_wrc_plus() {
        let cleaner = Cleaner::new(SeasonMode::PreSeason);
        let players = cleaner.clean_batters(vec![
            combined_batter(1, "Mid", 110.0, 5.0, 1.0),
            combined_batter(2, "Elite", 160.0, 5.0, 1.0),
            combined_batter(3, "Scrub", 80.0, 5.0, 1.0),
        ]);
        let names: Vec<&str> = players.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Elite", "Mid", "Scrub"]);
    }

    #[test]
    fn pre_season_carries_statcast_not_ownership() {
        let cleaner = Cleaner::new(SeasonMode::PreSeason);
        let players = cleaner.clean_batters(vec![combined_batter(1, "Guy", 120.0, 5.0, 1.0)]);
        assert!(players[0].barrel_pct.is_some());
        assert!(players[0].owner.is_none());
        assert!(players[0].pct_rostered.is_none());
    }

    #[test]
    fn regular_season_carries_ownership_not_statcast() {
        let cleaner = Cleaner::new(SeasonMode::RegularSeason);
        let players = cleaner.clean_batters(vec![combined_batter(1, "Guy", 120.0, 5.0, 1.0)]);
        assert_eq!(players[0].owner.as_deref(), Some("Owner X"));
        assert!((players[0].pct_rostered.unwrap() - 75.0).abs() < f64::EPSILON);
        assert!(players[0].barrel_pct.is_none());
    }

    #[test]
    fn pitchers_partition_by_qs_vs_svhd() {
        let cleaner = Cleaner::new(SeasonMode::PreSeason);
        let (starters, relievers) = cleaner.clean_pitchers(vec![
            combined_pitcher(1, "Workhorse", 22.0, 0.0, 0.0, 3.10),
            combined_pitcher(2, "Closer", 0.0, 38.0, 4.0, 2.80),
            combined_pitcher(3, "Setup", 1.0, 3.0, 25.0, 3.40),
        ]);
        assert_eq!(starters.len(), 1);
        assert_eq!(starters[0].name, "Workhorse");
        assert_eq!(relievers.len(), 2);
    }

    #[test]
    fn partition_tie_classifies_as_reliever() {
        let cleaner = Cleaner::new(SeasonMode::PreSeason);
        let (starters, relievers) =
            cleaner.clean_pitchers(vec![combined_pitcher(1, "Swingman", 5.0, 2.0, 3.0, 4.00)]);
        assert!(starters.is_empty());
        assert_eq!(relievers.len(), 1);
    }

    #[test]
    fn starter_scores_qs_and_not_svhd() {
        let cleaner = Cleaner::new(SeasonMode::PreSeason);
        let (starters, _) =
            cleaner.clean_pitchers(vec![combined_pitcher(1, "Ace", 24.0, 0.0, 0.0, 2.60)]);
        let stats = &starters[0].stats;
        assert!(stats.contains_key(&Category::QualityStarts));
        assert!(!stats.contains_key(&Category::SavesPlusHolds));
    }

    #[test]
    fn reliever_scores_svhd_and_not_qs() {
        let cleaner = Cleaner::new(SeasonMode::PreSeason);
        let (_, relievers) =
            cleaner.clean_pitchers(vec![combined_pitcher(1, "Closer", 0.0, 30.0, 5.0, 2.90)]);
        let stats = &relievers[0].stats;
        assert!((stats[&Category::SavesPlusHolds] - 35.0).abs() < f64::EPSILON);
        assert!(!stats.contains_key(&Category::QualityStarts));
    }

    #[test]
    fn pitchers_sorted_ascending_by_fip() {
        let cleaner = Cleaner::new(SeasonMode::PreSeason);
        let (starters, _) = cleaner.clean_pitchers(vec![
            combined_pitcher(1, "Good", 20.0, 0.0, 0.0, 3.20),
            combined_pitcher(2, "Great", 22.0, 0.0, 0.0, 2.50),
            combined_pitcher(3, "Okay", 18.0, 0.0, 0.0, 4.10),
        ]);
        let names: Vec<&str> = starters.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Great", "Good", "Okay"]);
    }

    #[test]
    fn empty_positions_backfilled_with_role() {
        let cleaner = Cleaner::new(SeasonMode::PreSeason);
        let (starters, relievers) = cleaner.clean_pitchers(vec![
            combined_pitcher(1, "Starter", 20.0, 0.0, 0.0, 3.00),
            combined_pitcher(2, "Reliever", 0.0, 10.0, 10.0, 3.00),
        ]);
        assert_eq!(starters[0].positions, vec![Position::StartingPitcher]);
        assert_eq!(relievers[0].positions, vec![Position::ReliefPitcher]);
    }
}
