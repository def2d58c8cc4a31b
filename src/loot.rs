//! Chests and loot: chests land on the board after a settled cascade, matching
//! the ally's element cracks them open, and the loot flies off to the tally.

use crate::grid::{Element, Grid, Pos};
use rand::Rng;
use rand::seq::IndexedRandom;
use std::f32::consts::TAU;
use std::time::{Duration, Instant};

/// Share of the flight spent popping out of the chest.
const POP_SHARE: f32 = 0.4;
/// Pop-out distance, in cells.
const POP_DISTANCE: f32 = 0.5;
/// Row (in cell units, centre based) the loot rises to before it is collected.
const FLY_TARGET_ROW: f32 = -0.8;
/// Items per opened chest.
const MIN_ITEMS: usize = 1;
const MAX_ITEMS: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LootKind {
    Gem,
    Coin,
    Star,
    Crystal,
}

impl LootKind {
    pub const ALL: [Self; 4] = [Self::Gem, Self::Coin, Self::Star, Self::Crystal];

    pub fn index(self) -> usize {
        match self {
            Self::Gem => 0,
            Self::Coin => 1,
            Self::Star => 2,
            Self::Crystal => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Gem => "Gems",
            Self::Coin => "Coins",
            Self::Star => "Stars",
            Self::Crystal => "Crystals",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chest {
    pub pos: Pos,
    pub opened: bool,
    opened_at: Option<Instant>,
}

/// Loot on its way from a chest to the tally.
#[derive(Debug, Clone, PartialEq)]
pub struct LootItem {
    pub kind: LootKind,
    pub origin: Pos,
    /// Launch direction in radians.
    pub angle: f32,
    launched_at: Instant,
}

impl LootItem {
    /// Flight progress in 0.0..=1.0.
    pub fn progress(&self, now: Instant, flight: Duration) -> f32 {
        clamped_progress(now.saturating_duration_since(self.launched_at), flight)
    }

    /// (row, col) of the item's centre in cell units at `progress`.
    pub fn position(&self, progress: f32) -> (f32, f32) {
        let start_row = self.origin.row as f32 + 0.5;
        let start_col = self.origin.col as f32 + 0.5;
        let (dy, dx) = (self.angle.sin(), self.angle.cos());
        let pop_row = start_row + dy * POP_DISTANCE;
        let pop_col = start_col + dx * POP_DISTANCE;
        if progress < POP_SHARE {
            let eased = crate::sequencer::ease_in_out_cubic(progress / POP_SHARE);
            (
                start_row + (pop_row - start_row) * eased,
                start_col + (pop_col - start_col) * eased,
            )
        } else {
            let fly = ((progress - POP_SHARE) / (1.0 - POP_SHARE)).min(1.0);
            let final_col = start_col + dx * POP_DISTANCE * 2.0;
            (
                pop_row + (FLY_TARGET_ROW - pop_row) * fly,
                pop_col + (final_col - pop_col) * fly,
            )
        }
    }
}

fn clamped_progress(elapsed: Duration, total: Duration) -> f32 {
    if total.is_zero() {
        return 1.0;
    }
    (elapsed.as_secs_f32() / total.as_secs_f32()).clamp(0.0, 1.0)
}

#[derive(Debug, Clone)]
pub struct LootController {
    chests: Vec<Chest>,
    in_flight: Vec<LootItem>,
    tallies: [u32; 4],
    spawned: u32,
    chest_chance: f64,
    flight: Duration,
}

impl LootController {
    pub fn new(chest_chance: f64, flight: Duration) -> Self {
        Self {
            chests: Vec::new(),
            in_flight: Vec::new(),
            tallies: [0; 4],
            spawned: 0,
            chest_chance: chest_chance.clamp(0.0, 1.0),
            flight,
        }
    }

    pub fn chests(&self) -> &[Chest] {
        &self.chests
    }

    pub fn in_flight(&self) -> &[LootItem] {
        &self.in_flight
    }

    pub fn flight(&self) -> Duration {
        self.flight
    }

    pub fn tally(&self, kind: LootKind) -> u32 {
        self.tallies[kind.index()]
    }

    pub fn collected(&self) -> u32 {
        self.tallies.iter().sum()
    }

    pub fn spawned(&self) -> u32 {
        self.spawned
    }

    pub fn has_chest(&self, pos: Pos) -> bool {
        self.chests.iter().any(|c| c.pos == pos)
    }

    /// Once per settled cascade: maybe drop a chest on an occupied, chest-free cell.
    pub fn on_cascade_settled<R: Rng + ?Sized>(&mut self, grid: &Grid, rng: &mut R) -> Option<Pos> {
        if !rng.random_bool(self.chest_chance) {
            return None;
        }
        let free: Vec<Pos> = grid
            .occupied()
            .map(|(pos, _)| pos)
            .filter(|pos| !self.has_chest(*pos))
            .collect();
        let pos = *free.choose(rng)?;
        self.chests.push(Chest {
            pos,
            opened: false,
            opened_at: None,
        });
        log::debug!("chest spawned at {pos:?}");
        Some(pos)
    }

    /// A match of the ally's element opens every closed chest. Returns the number of items launched.
    pub fn on_match_group<R: Rng + ?Sized>(
        &mut self,
        element: Element,
        ally_affinity: Element,
        now: Instant,
        rng: &mut R,
    ) -> usize {
        if element != ally_affinity {
            return 0;
        }
        let mut launched = 0;
        for chest in self.chests.iter_mut().filter(|c| !c.opened) {
            chest.opened = true;
            chest.opened_at = Some(now);
            let count = rng.random_range(MIN_ITEMS..=MAX_ITEMS);
            for i in 0..count {
                let kind = *LootKind::ALL.choose(rng).unwrap_or(&LootKind::Coin);
                self.in_flight.push(LootItem {
                    kind,
                    origin: chest.pos,
                    angle: i as f32 / count as f32 * TAU,
                    launched_at: now,
                });
            }
            log::debug!("chest at {:?} opened with {count} items", chest.pos);
            launched += count;
        }
        self.spawned += launched as u32;
        launched
    }

    /// Collect finished items (each exactly once) and drop chests whose loot is gone.
    pub fn tick(&mut self, now: Instant) -> Vec<LootKind> {
        let flight = self.flight;
        let mut collected = Vec::new();
        self.in_flight.retain(|item| {
            if item.progress(now, flight) >= 1.0 {
                collected.push(item.kind);
                false
            } else {
                true
            }
        });
        for kind in &collected {
            self.tallies[kind.index()] += 1;
        }
        self.chests.retain(|chest| match chest.opened_at {
            Some(at) => now.saturating_duration_since(at) < flight,
            None => true,
        });
        collected
    }

    /// Time until the last item in flight lands.
    pub fn remaining_flight(&self, now: Instant) -> Duration {
        self.in_flight
            .iter()
            .map(|item| (item.launched_at + self.flight).saturating_duration_since(now))
            .max()
            .unwrap_or(Duration::ZERO)
    }

    /// Push every running timer forward (used while the game is paused).
    pub fn shift(&mut self, by: Duration) {
        for item in &mut self.in_flight {
            item.launched_at += by;
        }
        for chest in &mut self.chests {
            if let Some(at) = chest.opened_at.as_mut() {
                *at += by;
            }
        }
    }

    /// Round reset: no chests, no loot, empty tallies.
    pub fn clear(&mut self) {
        self.chests.clear();
        self.in_flight.clear();
        self.tallies = [0; 4];
        self.spawned = 0;
    }
}
