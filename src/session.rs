//! Game session: owns the board, combat, loot and the phase machine, and is the
//! only way input reaches them.
//!
//! The session never runs a loop. The caller feeds pointer events, calls
//! [`GameSession::advance`] once per tick with the current time, and samples
//! [`GameSession::view`] to draw.

use crate::GameConfig;
use crate::cascade::{CascadeResolver, CascadeState};
use crate::combat::{Combat, Outcome, Side};
use crate::error::EngineError;
use crate::grid::{Element, Grid, Pos};
use crate::loot::{Chest, LootController, LootKind};
use crate::sequencer::{Phase, Sequencer};
use rand::SeedableRng;
use rand::rngs::StdRng;
use std::time::{Duration, Instant};

/// Something the status read-out may want to show.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GameEvent {
    RoundStarted { ally: Element, enemy: Element },
    Swapped { a: Pos, b: Pos, valid: bool },
    Hit { element: Element, side: Side, damage: f64, player_move: bool },
    Streak { count: u32, element: Element },
    ChestSpawned(Pos),
    ChestsOpened { items: usize },
    LootCollected(LootKind),
    RoundOver(Outcome),
}

/// Loot sprite position for the renderer, in cell units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LootSprite {
    pub kind: LootKind,
    pub row: f32,
    pub col: f32,
    pub progress: f32,
}

/// Everything the renderer needs for one frame.
#[derive(Debug)]
pub struct View<'a> {
    pub grid: &'a Grid,
    pub phase: Option<&'a Phase>,
    /// Clamped 0.0..=1.0 progress of `phase`.
    pub progress: f32,
    pub phase_id: u64,
    pub selected: Option<Pos>,
    pub chests: &'a [Chest],
    pub loot: Vec<LootSprite>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundStats {
    pub won: u32,
    pub lost: u32,
}

pub struct GameSession {
    config: GameConfig,
    rng: StdRng,
    grid: Grid,
    combat: Combat,
    loot: LootController,
    cascade: CascadeResolver,
    sequencer: Sequencer,
    /// Cell the pointer went down on.
    pressed: Option<Pos>,
    /// Highlighted cell (origin, or the adjacent target under the pointer).
    selected: Option<Pos>,
    events: Vec<GameEvent>,
    stats: RoundStats,
}

impl GameSession {
    pub fn new(config: GameConfig) -> Self {
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Self::with_rng(config, rng)
    }

    fn with_rng(config: GameConfig, mut rng: StdRng) -> Self {
        let grid = Grid::generate(&mut rng);
        let combat = Combat::new(&mut rng, config.combat);
        let loot = LootController::new(config.chest_chance, config.timings.loot_flight);
        let mut session = Self {
            config,
            rng,
            grid,
            combat,
            loot,
            cascade: CascadeResolver::new(),
            sequencer: Sequencer::new(),
            pressed: None,
            selected: None,
            events: Vec::new(),
            stats: RoundStats::default(),
        };
        session.announce_round();
        session
    }

    pub fn combat(&self) -> &Combat {
        &self.combat
    }

    pub fn loot(&self) -> &LootController {
        &self.loot
    }

    pub fn stats(&self) -> RoundStats {
        self.stats
    }

    /// Input is locked from swap start until the cascade has settled.
    pub fn is_busy(&self) -> bool {
        self.sequencer.is_busy()
    }

    pub fn drain_events(&mut self) -> Vec<GameEvent> {
        std::mem::take(&mut self.events)
    }

    /// Pointer pressed on a cell. Returns whether the press was taken.
    pub fn pointer_down(&mut self, row: usize, col: usize) -> bool {
        if self.is_busy() {
            return false;
        }
        let Some(pos) = Pos::checked(row, col) else {
            return false;
        };
        self.pressed = Some(pos);
        self.selected = Some(pos);
        true
    }

    /// Pointer dragged over a cell: highlight it if it is a legal target, else fall back to the origin.
    pub fn pointer_move(&mut self, row: usize, col: usize) {
        if self.is_busy() {
            return;
        }
        let (Some(origin), Some(pos)) = (self.pressed, Pos::checked(row, col)) else {
            return;
        };
        self.selected = Some(if origin.is_adjacent(pos) { pos } else { origin });
    }

    /// Pointer released. An adjacent release starts a swap; anything else just drops the selection.
    pub fn pointer_up(&mut self, row: usize, col: usize, now: Instant) {
        if self.is_busy() {
            return;
        }
        let Some(origin) = self.pressed.take() else {
            return;
        };
        self.selected = None;
        let Some(target) = Pos::checked(row, col) else {
            return;
        };
        if !origin.is_adjacent(target) {
            return;
        }
        debug_assert_eq!(self.cascade.state(), CascadeState::Idle);
        let valid = CascadeResolver::is_valid_swap(&mut self.grid, origin, target);
        self.grid.swap(origin, target);
        self.events.push(GameEvent::Swapped {
            a: origin,
            b: target,
            valid,
        });
        let timings = self.config.timings;
        let duration = if valid { timings.swap } else { timings.reject };
        self.sequencer.start(
            Phase::Swap {
                a: origin,
                b: target,
                valid,
            },
            duration,
            now,
        );
    }

    /// Collect finished loot and run every phase transition that is due at `now`.
    pub fn advance(&mut self, now: Instant) -> Result<(), EngineError> {
        for kind in self.loot.tick(now) {
            self.events.push(GameEvent::LootCollected(kind));
        }
        while let Some(done) = self.sequencer.complete(now) {
            self.on_phase_complete(done, now)?;
        }
        Ok(())
    }

    /// Freeze every clock for `by` (the game was paused).
    pub fn shift_clock(&mut self, by: Duration) {
        self.sequencer.shift(by);
        self.loot.shift(by);
    }

    /// Snapshot for the renderer at `now`. Does not change any state.
    pub fn view(&self, now: Instant) -> View<'_> {
        let flight = self.loot.flight();
        let loot = self
            .loot
            .in_flight()
            .iter()
            .map(|item| {
                let progress = item.progress(now, flight);
                let (row, col) = item.position(progress);
                LootSprite {
                    kind: item.kind,
                    row,
                    col,
                    progress,
                }
            })
            .collect();
        View {
            grid: &self.grid,
            phase: self.sequencer.phase(),
            progress: self.sequencer.progress(now),
            phase_id: self.sequencer.generation(),
            selected: self.selected,
            chests: self.loot.chests(),
            loot,
        }
    }

    fn on_phase_complete(&mut self, phase: Phase, now: Instant) -> Result<(), EngineError> {
        let timings = self.config.timings;
        match phase {
            Phase::Swap { a, b, valid: true } => {
                log::debug!("swap {a:?} <-> {b:?} committed");
                self.cascade.begin(true);
                self.sequencer.start(Phase::Beat, timings.beat, now);
            }
            Phase::Swap { a, b, valid: false } => {
                log::debug!("swap {a:?} <-> {b:?} rejected");
                self.grid.swap(a, b);
            }
            Phase::Beat => self.validate(now)?,
            Phase::Removal { matches } => {
                let awards = self.cascade.award(
                    &matches,
                    &mut self.combat,
                    &mut self.loot,
                    now,
                    &mut self.rng,
                );
                for award in awards {
                    let strike = award.strike;
                    if let (Some(outcome), Some(_)) = (strike.outcome, strike.target) {
                        log::debug!("{outcome:?} decided, settling cascade");
                    }
                    if let Some(side) = strike.target {
                        self.events.push(GameEvent::Hit {
                            element: strike.element,
                            side,
                            damage: strike.damage,
                            player_move: strike.player_move,
                        });
                    }
                    if strike.player_move && strike.streak > 0 {
                        self.events.push(GameEvent::Streak {
                            count: strike.streak,
                            element: strike.element,
                        });
                    }
                    if award.loot > 0 {
                        self.events.push(GameEvent::ChestsOpened { items: award.loot });
                    }
                }
                self.cascade.clear(&mut self.grid, &matches);
                let settle = self.cascade.settle(&mut self.grid, &mut self.rng);
                let duration = if settle.is_empty() {
                    Duration::ZERO
                } else {
                    timings.fall
                };
                self.sequencer.start(
                    Phase::Falling {
                        falls: settle.falls,
                        spawns: settle.spawns,
                    },
                    duration,
                    now,
                );
            }
            Phase::Falling { .. } => self.sequencer.start(Phase::Beat, timings.beat, now),
            Phase::RoundOver { outcome } => self.reset_round(outcome),
        }
        Ok(())
    }

    /// Detection step of the cascade: more removal, or the chain is over.
    fn validate(&mut self, now: Instant) -> Result<(), EngineError> {
        let timings = self.config.timings;
        if let Some(matches) = self.cascade.detect(&self.grid)? {
            self.sequencer
                .start(Phase::Removal { matches }, timings.removal, now);
            return Ok(());
        }
        log::debug!("cascade settled after {} passes", self.cascade.passes());
        if let Some(pos) = self.cascade.finish(&self.grid, &mut self.loot, &mut self.rng) {
            self.events.push(GameEvent::ChestSpawned(pos));
        }
        if let Some(outcome) = self.combat.outcome() {
            self.events.push(GameEvent::RoundOver(outcome));
            // Loot from the final cascade lands before the tallies are reset.
            let hold = timings.round_over.max(self.loot.remaining_flight(now));
            self.sequencer.start(Phase::RoundOver { outcome }, hold, now);
        }
        Ok(())
    }

    /// Fresh round: new board and affinities, full health, no streak, no chests or loot.
    fn reset_round(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Victory => self.stats.won += 1,
            Outcome::Defeat => self.stats.lost += 1,
        }
        self.grid = Grid::generate(&mut self.rng);
        self.combat = Combat::new(&mut self.rng, self.config.combat);
        self.loot.clear();
        self.cascade = CascadeResolver::new();
        self.pressed = None;
        self.selected = None;
        self.announce_round();
    }

    fn announce_round(&mut self) {
        let (ally, enemy) = (self.combat.ally.affinity, self.combat.enemy.affinity);
        log::info!("round start: ally {ally:?} vs enemy {enemy:?}");
        self.events.push(GameEvent::RoundStarted { ally, enemy });
    }
}
