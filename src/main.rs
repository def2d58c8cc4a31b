//! Orbclash: elemental orb-matching battle puzzle in the terminal.

mod app;
mod cascade;
mod combat;
mod error;
mod grid;
mod input;
mod loot;
mod matcher;
mod sequencer;
mod session;
mod theme;
mod ui;

use anyhow::{Context, Result, ensure};
use app::App;
use clap::{Parser, ValueEnum};
use combat::CombatTuning;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Phase lengths. All zero with `--no-animation`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    pub swap: Duration,
    pub reject: Duration,
    pub removal: Duration,
    pub fall: Duration,
    pub beat: Duration,
    pub loot_flight: Duration,
    pub round_over: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            swap: Duration::from_millis(400),
            reject: Duration::from_millis(300),
            removal: Duration::from_millis(400),
            fall: Duration::from_millis(600),
            beat: Duration::from_millis(100),
            loot_flight: Duration::from_millis(1500),
            round_over: Duration::from_millis(1500),
        }
    }
}

impl Timings {
    pub const fn instant() -> Self {
        Self {
            swap: Duration::ZERO,
            reject: Duration::ZERO,
            removal: Duration::ZERO,
            fall: Duration::ZERO,
            beat: Duration::ZERO,
            loot_flight: Duration::ZERO,
            round_over: Duration::ZERO,
        }
    }
}

/// Options derived from CLI that affect game behaviour.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GameConfig {
    /// Fixed RNG seed for reproducible boards; OS entropy when unset.
    pub seed: Option<u64>,
    pub timings: Timings,
    pub combat: CombatTuning,
    /// Chance of a chest after each settled cascade, 0.0..=1.0.
    pub chest_chance: f64,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            seed: None,
            timings: Timings::default(),
            combat: CombatTuning::default(),
            chest_chance: 0.15,
        }
    }
}

impl GameConfig {
    fn from_args(args: &Args) -> Result<Self> {
        ensure!(
            (0.0..=1.0).contains(&args.chest_chance),
            "--chest-chance must be between 0 and 1, got {}",
            args.chest_chance
        );
        ensure!(args.max_health > 0, "--max-health must be positive");
        let ms = Duration::from_millis;
        let timings = if args.no_animation {
            Timings::instant()
        } else {
            Timings {
                swap: ms(args.swap_ms),
                reject: ms(args.reject_ms),
                removal: ms(args.removal_ms),
                fall: ms(args.fall_ms),
                beat: ms(args.beat_ms),
                loot_flight: ms(args.loot_ms),
                round_over: ms(args.round_over_ms),
            }
        };
        Ok(Self {
            seed: args.seed,
            timings,
            combat: CombatTuning {
                base_damage: args.base_damage,
                max_health: args.max_health,
            },
            chest_chance: args.chest_chance,
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    ensure!(
        args.frame_rate.is_finite() && args.frame_rate > 0.0,
        "--frame-rate must be a positive number"
    );
    if let Some(path) = args.log_file.as_deref() {
        init_logging(path)?;
    }
    let config = GameConfig::from_args(&args)?;
    let theme = match theme::Theme::load(args.theme.as_deref(), args.palette) {
        Ok(theme) => theme,
        Err(e) => {
            log::warn!("theme not loaded, using defaults: {e}");
            let mut theme = theme::Theme::default();
            theme.apply_palette(args.palette);
            theme
        }
    };
    log::info!("starting with {config:?}");
    let mut app = App::new(&args, config, theme);
    app.run()
}

/// Logs go to a file; the terminal belongs to the game.
fn init_logging(path: &Path) -> Result<()> {
    let file = std::fs::File::create(path)
        .with_context(|| format!("cannot create log file {}", path.display()))?;
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .target(env_logger::Target::Pipe(Box::new(file)))
        .init();
    Ok(())
}

/// Elemental orb-matching battle puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "orbclash",
    version,
    about = "Elemental orb-matching battle puzzle in the terminal. Swap orbs, line up three, strike the enemy.",
    long_about = "Orbclash is a terminal match-three battler.\n\n\
        Swap two neighbouring orbs to line up three or more of one element. Matches of your \
        element hit the enemy, matches of the enemy's element hit you. Chain the same element \
        on consecutive moves to build a streak. Chests dropped on the board open when you \
        match your own element.\n\n\
        CONTROLS:\n  Mouse       Drag an orb onto a neighbour\n  Arrows/hjkl Move cursor    Space/Enter Grab / drop\n  Esc         Let go         P           Pause      Q  Quit\n\n\
        Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// RNG seed for a reproducible game.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Path to theme file (btop-style theme[key]=\"value\"; orb keys: water, fire, earth, air).
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Disable all animation: every phase completes instantly.
    #[arg(long)]
    pub no_animation: bool,

    /// Swap animation length.
    #[arg(long, default_value = "400", value_name = "MS")]
    pub swap_ms: u64,

    /// Rejected swap (out and back) animation length.
    #[arg(long, default_value = "300", value_name = "MS")]
    pub reject_ms: u64,

    /// Matched orb fade-out length.
    #[arg(long, default_value = "400", value_name = "MS")]
    pub removal_ms: u64,

    /// Gravity and refill animation length.
    #[arg(long, default_value = "600", value_name = "MS")]
    pub fall_ms: u64,

    /// Pause between cascade passes.
    #[arg(long, default_value = "100", value_name = "MS")]
    pub beat_ms: u64,

    /// Loot flight time from chest to tally.
    #[arg(long, default_value = "1500", value_name = "MS")]
    pub loot_ms: u64,

    /// How long the round result stays up before the next round.
    #[arg(long, default_value = "1500", value_name = "MS")]
    pub round_over_ms: u64,

    /// Chance (0..1) of a chest after each settled cascade.
    #[arg(long, default_value = "0.15", value_name = "P")]
    pub chest_chance: f64,

    /// Damage of a single match before streak bonus.
    #[arg(long, default_value = "10", value_name = "HP")]
    pub base_damage: u32,

    /// Starting health of both sides.
    #[arg(long, default_value = "100", value_name = "HP")]
    pub max_health: u32,

    /// Target render frames per second.
    #[arg(long, default_value = "30.0", value_name = "RATE")]
    pub frame_rate: f64,

    /// Write logs to this file (filter with RUST_LOG, default info).
    #[arg(long, value_name = "FILE")]
    pub log_file: Option<PathBuf>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(extra: &[&str]) -> Args {
        Args::try_parse_from(std::iter::once("orbclash").chain(extra.iter().copied())).unwrap()
    }

    #[test]
    fn test_cli_defaults_match_config_default() {
        let config = GameConfig::from_args(&parse(&[])).unwrap();
        assert_eq!(config, GameConfig::default());
    }

    #[test]
    fn test_no_animation_zeroes_every_phase() {
        let config = GameConfig::from_args(&parse(&["--no-animation", "--swap-ms", "900"])).unwrap();
        assert_eq!(config.timings, Timings::instant());
    }

    #[test]
    fn test_timing_and_tuning_flags() {
        let args = parse(&[
            "--seed",
            "42",
            "--fall-ms",
            "250",
            "--base-damage",
            "7",
            "--palette",
            "colourblind",
        ]);
        assert_eq!(args.palette, Palette::Colorblind);
        let config = GameConfig::from_args(&args).unwrap();
        assert_eq!(config.seed, Some(42));
        assert_eq!(config.timings.fall, Duration::from_millis(250));
        assert_eq!(config.combat.base_damage, 7);
    }

    #[test]
    fn test_out_of_range_chest_chance_is_rejected() {
        assert!(GameConfig::from_args(&parse(&["--chest-chance", "1.5"])).is_err());
    }
}
