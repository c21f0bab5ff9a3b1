// Appraiser entry point.
//
// Pipeline sequence:
// 1. Initialize tracing
// 2. Load config (league ruleset, budget split, data paths)
// 3. Load the keymap and extracted source files
// 4. Combine sources into canonical batter/pitcher tables
// 5. Clean: mode column selection, role partition
// 6. Standardize: RLP profiles and z-scores per position group
// 7. Appraise: shekel assignment (budget split validated up front)
// 8. Export one table per terminal bucket

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, ValueEnum};
use tracing::info;

use fantasy_appraiser::appraise::Appraiser;
use fantasy_appraiser::clean::Cleaner;
use fantasy_appraiser::combine::Combiner;
use fantasy_appraiser::config;
use fantasy_appraiser::export;
use fantasy_appraiser::keymap::KeyMap;
use fantasy_appraiser::model::SeasonMode;
use fantasy_appraiser::sources;
use fantasy_appraiser::standardize::Standardizer;

#[derive(Debug, Clone, Copy, ValueEnum)]
enum ModeArg {
    #[value(name = "pre-season")]
    PreSeason,
    #[value(name = "regular-season")]
    RegularSeason,
}

impl From<ModeArg> for SeasonMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::PreSeason => SeasonMode::PreSeason,
            ModeArg::RegularSeason => SeasonMode::RegularSeason,
        }
    }
}

/// Compute standardized scores and auction values for a fantasy league.
#[derive(Debug, Parser)]
#[command(name = "appraiser", version)]
struct Args {
    /// Season mode: which extract shape to process.
    #[arg(long, value_enum, default_value = "regular-season")]
    mode: ModeArg,

    /// Directory holding config/ (and defaults/); defaults to the CWD.
    #[arg(long, default_value = ".")]
    config_dir: PathBuf,

    /// Override the extract directory from league.toml.
    #[arg(long)]
    extract_dir: Option<PathBuf>,

    /// Override the output directory from league.toml.
    #[arg(long)]
    out_dir: Option<PathBuf>,
}

fn main() -> anyhow::Result<()> {
    init_tracing();

    let args = Args::parse();
    let mode: SeasonMode = args.mode.into();
    info!("appraiser starting ({mode} mode)");

    // 2. Config
    let config = config::load_config(&args.config_dir).context("failed to load configuration")?;
    info!(
        "config loaded: league={}, {} managers, {} budget",
        config.league.name, config.league.managers, config.league.draft_budget
    );

    // 7 (early). Budget split is validated before any data is touched so a
    // bad configuration aborts the run up front.
    let appraiser = Appraiser::new(&config.league, &config.budget_split)
        .context("invalid budget split configuration")?;

    let extract_dir = args
        .extract_dir
        .unwrap_or_else(|| PathBuf::from(&config.data_paths.extract_dir));
    let out_dir = args
        .out_dir
        .unwrap_or_else(|| PathBuf::from(&config.data_paths.out_dir));

    // 3. Keymap and sources
    let keymap = KeyMap::load(&extract_dir).context("failed to load keymap")?;
    info!("keymap loaded: {} players", keymap.len());

    let bundle =
        sources::load_extracted(&extract_dir, mode).context("failed to load extracted data")?;
    info!(
        "sources loaded: {} batter projections, {} pitcher projections, {} universe players",
        bundle.batter_projections.len(),
        bundle.pitcher_projections.len(),
        bundle.universe.len()
    );

    // 4. Combine
    let (combined_bats, combined_arms) = Combiner::new(&keymap).combine(&bundle);
    info!(
        "combined tables: {} batters, {} pitchers",
        combined_bats.len(),
        combined_arms.len()
    );

    // 5. Clean
    let cleaner = Cleaner::new(mode);
    let bats = cleaner.clean_batters(combined_bats);
    let (starters, relievers) = cleaner.clean_pitchers(combined_arms);
    info!(
        "cleaned tables: {} batters, {} starters, {} relievers",
        bats.len(),
        starters.len(),
        relievers.len()
    );

    // 6. Standardize
    let standardizer = Standardizer::new(&config.league);
    let mut bat_groups = standardizer.standardize_batters(&bats);
    let mut arm_groups = standardizer.standardize_pitchers(starters, relievers);
    info!(
        "standardized {} batter buckets and {} pitcher buckets",
        bat_groups.len(),
        arm_groups.len()
    );

    // 7. Appraise
    appraiser.appraise(&mut bat_groups, &mut arm_groups);
    info!(
        "appraised players against a {} shekel league budget",
        appraiser.league_budget()
    );

    // 8. Export
    let groups: Vec<_> = bat_groups.into_iter().chain(arm_groups).collect();
    export::export_groups(&groups, &out_dir).context("failed to export appraised tables")?;
    info!("export complete: {}", out_dir.display());

    Ok(())
}

fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("fantasy_appraiser=info,warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}
