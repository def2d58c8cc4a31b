//! Animation sequencing: one timed phase at a time, completed exactly once.
//!
//! Phases are driven by wall-clock samples, not a fixed step: a phase is done when
//! `elapsed >= duration`, however irregular the ticks. A zero duration completes
//! on the first poll.

use crate::combat::Outcome;
use crate::grid::{Fall, Pos, Spawn};
use crate::matcher::Matches;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Two orbs trade places. The grid is already swapped; invalid swaps are undone on completion.
    Swap { a: Pos, b: Pos, valid: bool },
    /// Short pause before the next detection pass.
    Beat,
    /// Matched orbs fade out; the match is awarded and cleared on completion.
    Removal { matches: Matches },
    /// Gravity and refill, already applied to the grid.
    Falling { falls: Vec<Fall>, spawns: Vec<Spawn> },
    /// Round decided; the board resets on completion.
    RoundOver { outcome: Outcome },
}

#[derive(Debug, Clone)]
struct Active {
    phase: Phase,
    started: Instant,
    duration: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct Sequencer {
    active: Option<Active>,
    /// Bumped on every start so renderers can tell consecutive phases of the same kind apart.
    generation: u64,
}

impl Sequencer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Begin a phase. Phases never overlap: the previous one must have completed.
    pub fn start(&mut self, phase: Phase, duration: Duration, now: Instant) {
        debug_assert!(self.active.is_none(), "phase started while another is active");
        log::debug!("phase start: {} ({} ms)", phase_name(&phase), duration.as_millis());
        self.generation = self.generation.wrapping_add(1);
        self.active = Some(Active {
            phase,
            started: now,
            duration,
        });
    }

    /// True while any phase runs; gates all pointer input.
    pub fn is_busy(&self) -> bool {
        self.active.is_some()
    }

    pub fn phase(&self) -> Option<&Phase> {
        self.active.as_ref().map(|a| &a.phase)
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Progress of the active phase, clamped to 0.0..=1.0 (1.0 when idle).
    pub fn progress(&self, now: Instant) -> f32 {
        match &self.active {
            Some(active) => {
                if active.duration.is_zero() {
                    return 1.0;
                }
                let elapsed = now.saturating_duration_since(active.started);
                (elapsed.as_secs_f32() / active.duration.as_secs_f32()).clamp(0.0, 1.0)
            }
            None => 1.0,
        }
    }

    /// Hand back the active phase if it has run its course. Returns each phase once.
    pub fn complete(&mut self, now: Instant) -> Option<Phase> {
        let done = self
            .active
            .as_ref()
            .is_some_and(|a| now.saturating_duration_since(a.started) >= a.duration);
        if !done {
            return None;
        }
        let active = self.active.take()?;
        log::trace!("phase done: {}", phase_name(&active.phase));
        Some(active.phase)
    }

    /// Push the active phase's clock forward (pause support).
    pub fn shift(&mut self, by: Duration) {
        if let Some(active) = self.active.as_mut() {
            active.started += by;
        }
    }
}

fn phase_name(phase: &Phase) -> &'static str {
    match phase {
        Phase::Swap { valid: true, .. } => "swap",
        Phase::Swap { valid: false, .. } => "rejected swap",
        Phase::Beat => "beat",
        Phase::Removal { .. } => "removal",
        Phase::Falling { .. } => "falling",
        Phase::RoundOver { .. } => "round over",
    }
}

pub fn ease_in_out_cubic(t: f32) -> f32 {
    if t < 0.5 {
        4.0 * t * t * t
    } else {
        1.0 - (-2.0 * t + 2.0).powi(3) / 2.0
    }
}
