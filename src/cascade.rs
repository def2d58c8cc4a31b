//! Cascade resolution: detect, award, clear, gravity and refill, then detect again
//! until the board is stable.
//!
//! The resolver holds the chain bookkeeping only; the session drives it one step
//! per animation phase.

use crate::combat::{Combat, Strike};
use crate::error::EngineError;
use crate::grid::{Element, Fall, GRID_SIZE, Grid, Pos, Spawn};
use crate::loot::LootController;
use crate::matcher::{Matches, find_matches};
use rand::Rng;
use std::time::Instant;

/// Upper bound on detection passes in one chain.
pub const MAX_PASSES: usize = GRID_SIZE * GRID_SIZE;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CascadeState {
    #[default]
    Idle,
    Validating,
    Resolving,
    Falling,
}

/// One awarded match group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Award {
    pub strike: Strike,
    /// Loot items launched by chests this group opened.
    pub loot: usize,
}

/// Gravity and refill of one pass, for the fall animation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Settle {
    pub falls: Vec<Fall>,
    pub spawns: Vec<Spawn>,
}

impl Settle {
    pub fn is_empty(&self) -> bool {
        self.falls.is_empty() && self.spawns.is_empty()
    }
}

#[derive(Debug, Clone, Default)]
pub struct CascadeResolver {
    state: CascadeState,
    /// Set by a player move until the first group of the chain consumes it.
    player_pending: bool,
    passes: usize,
    groups_resolved: usize,
}

impl CascadeResolver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> CascadeState {
        self.state
    }

    pub fn passes(&self) -> usize {
        self.passes
    }

    /// Start a chain. With `player_move` the very first group is credited to the player.
    pub fn begin(&mut self, player_move: bool) {
        self.state = CascadeState::Validating;
        self.player_pending = player_move;
        self.passes = 0;
        self.groups_resolved = 0;
    }

    /// One detection pass. `None` means the board is stable and the chain is over.
    pub fn detect(&mut self, grid: &Grid) -> Result<Option<Matches>, EngineError> {
        self.passes += 1;
        if self.passes > MAX_PASSES {
            log::error!("cascade exceeded {MAX_PASSES} passes");
            return Err(EngineError::CascadeOverflow {
                passes: self.passes,
            });
        }
        let found = find_matches(grid);
        if found.is_empty() {
            log::debug!(
                "board stable after {} passes, {} groups",
                self.passes,
                self.groups_resolved
            );
            self.state = CascadeState::Idle;
            self.player_pending = false;
            return Ok(None);
        }
        log::debug!(
            "pass {}: {} groups, {} cells",
            self.passes,
            found.groups.len(),
            found.flat.len()
        );
        self.state = CascadeState::Resolving;
        Ok(Some(found))
    }

    /// Feed every group of a pass, in detection order, to combat and loot.
    pub fn award<R: Rng + ?Sized>(
        &mut self,
        matches: &Matches,
        combat: &mut Combat,
        loot: &mut LootController,
        now: Instant,
        rng: &mut R,
    ) -> Vec<Award> {
        let mut awards = Vec::with_capacity(matches.groups.len());
        for group in &matches.groups {
            log::trace!(
                "{:?} {:?} run of {}",
                group.element,
                group.axis,
                group.cells.len()
            );
            let player_move = std::mem::take(&mut self.player_pending);
            let strike = combat.apply_match(group.element, player_move);
            let loot = loot.on_match_group(group.element, combat.ally.affinity, now, rng);
            awards.push(Award { strike, loot });
        }
        self.groups_resolved += matches.groups.len();
        awards
    }

    /// Empty every matched cell.
    pub fn clear(&mut self, grid: &mut Grid, matches: &Matches) {
        for pos in &matches.flat {
            grid.set(pos.row, pos.col, None);
        }
    }

    /// Gravity then refill, column by column.
    pub fn settle<R: Rng + ?Sized>(&mut self, grid: &mut Grid, rng: &mut R) -> Settle {
        self.state = CascadeState::Falling;
        let mut out = Settle::default();
        for col in 0..GRID_SIZE {
            let compaction = grid.compact_column(col);
            for fall in &compaction.falls {
                log::trace!(
                    "{:?} falls {} -> {} in column {col}",
                    fall.element,
                    fall.from_row,
                    fall.to_row
                );
            }
            let spawns = grid.fill_column(col, || Element::random(rng));
            debug_assert_eq!(spawns.len(), compaction.empty_rows.len());
            for spawn in &spawns {
                log::trace!("{:?} spawned at {:?}", spawn.element, spawn.pos);
            }
            out.falls.extend(compaction.falls);
            out.spawns.extend(spawns);
        }
        self.state = CascadeState::Validating;
        out
    }

    /// Chain over: a chain that removed anything gets its chest roll.
    pub fn finish<R: Rng + ?Sized>(
        &mut self,
        grid: &Grid,
        loot: &mut LootController,
        rng: &mut R,
    ) -> Option<Pos> {
        let resolved = std::mem::take(&mut self.groups_resolved);
        if resolved == 0 {
            return None;
        }
        loot.on_cascade_settled(grid, rng)
    }

    /// Would swapping `a` and `b` make a match? The grid is restored before returning.
    pub fn is_valid_swap(grid: &mut Grid, a: Pos, b: Pos) -> bool {
        grid.swap(a, b);
        let valid = !find_matches(grid).is_empty();
        grid.swap(a, b);
        valid
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::combat::{CombatTuning, Side};
    use crate::grid::tests::{arb_full_grid, checker};
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::time::Duration;

    use Element::{Earth, Fire, Water};

    /// Run a whole chain synchronously; returns every award in order.
    fn run_chain(
        resolver: &mut CascadeResolver,
        grid: &mut Grid,
        combat: &mut Combat,
        loot: &mut LootController,
        rng: &mut StdRng,
        player_move: bool,
    ) -> Result<Vec<Award>, EngineError> {
        let now = Instant::now();
        let mut awards = Vec::new();
        resolver.begin(player_move);
        while let Some(matches) = resolver.detect(grid)? {
            awards.extend(resolver.award(&matches, combat, loot, now, rng));
            resolver.clear(grid, &matches);
            resolver.settle(grid, rng);
        }
        resolver.finish(grid, loot, rng);
        Ok(awards)
    }

    fn fixtures() -> (Combat, LootController, StdRng) {
        (
            Combat::with_affinities(Water, Fire, CombatTuning::default()),
            LootController::new(0.0, Duration::from_millis(10)),
            StdRng::seed_from_u64(7),
        )
    }

    #[test]
    fn test_valid_swap_probe_restores_grid() {
        let mut grid = checker();
        grid.set(1, 1, Some(Water));
        assert!(find_matches(&grid).is_empty());
        let before = grid.clone();
        let (a, b) = (Pos::new(0, 1), Pos::new(1, 1));
        assert!(CascadeResolver::is_valid_swap(&mut grid, a, b));
        assert!(CascadeResolver::is_valid_swap(&mut grid, a, b));
        assert_eq!(grid, before);
        assert!(!CascadeResolver::is_valid_swap(
            &mut grid,
            Pos::new(5, 5),
            Pos::new(5, 6)
        ));
        assert_eq!(grid, before);
    }

    #[test]
    fn test_only_first_group_is_player_move() {
        let mut grid = checker();
        // Row 0 Water run plus an unrelated Earth column run in column 7.
        grid.set(0, 1, Some(Water));
        for row in 3..6 {
            grid.set(row, 7, Some(Earth));
        }
        let (mut combat, mut loot, mut rng) = fixtures();
        let mut resolver = CascadeResolver::new();
        resolver.begin(true);
        let matches = resolver.detect(&grid).unwrap().unwrap();
        assert!(matches.groups.len() >= 2);
        let awards = resolver.award(&matches, &mut combat, &mut loot, Instant::now(), &mut rng);
        assert!(awards[0].strike.player_move);
        assert_eq!(awards[0].strike.element, Water);
        assert_eq!(awards[0].strike.target, Some(Side::Enemy));
        assert!(awards[1..].iter().all(|a| !a.strike.player_move));
        assert_eq!(resolver.state(), CascadeState::Resolving);
    }

    #[test]
    fn test_chain_without_player_flag_credits_nobody() {
        let mut grid = checker();
        grid.set(0, 1, Some(Water));
        let (mut combat, mut loot, mut rng) = fixtures();
        let mut resolver = CascadeResolver::new();
        let awards = run_chain(&mut resolver, &mut grid, &mut combat, &mut loot, &mut rng, false)
            .unwrap();
        assert!(!awards.is_empty());
        assert!(awards.iter().all(|a| !a.strike.player_move));
        assert_eq!(combat.streak.count, 0);
        assert_eq!(combat.streak.element, None);
    }

    #[test]
    fn test_clear_then_settle_refills_board() {
        let mut grid = checker();
        grid.set(0, 1, Some(Water));
        let (_, _, mut rng) = fixtures();
        let mut resolver = CascadeResolver::new();
        resolver.begin(false);
        let matches = resolver.detect(&grid).unwrap().unwrap();
        resolver.clear(&mut grid, &matches);
        assert!(matches.flat.iter().all(|p| grid.cell(*p).is_none()));
        let settle = resolver.settle(&mut grid, &mut rng);
        assert!(grid.is_full());
        assert_eq!(settle.spawns.len(), 3);
        // Row 0 is the top row: nothing above it falls.
        assert!(settle.falls.is_empty());
    }

    #[test]
    fn test_stable_board_ends_chain_without_chest() {
        let grid = checker();
        let (_, _, mut rng) = fixtures();
        let mut loot = LootController::new(1.0, Duration::from_millis(10));
        let mut resolver = CascadeResolver::new();
        resolver.begin(true);
        assert_eq!(resolver.detect(&grid).unwrap(), None);
        assert_eq!(resolver.state(), CascadeState::Idle);
        assert_eq!(resolver.finish(&grid, &mut loot, &mut rng), None);
    }

    #[test]
    fn test_settled_chain_rolls_for_chest() {
        let mut grid = checker();
        grid.set(0, 1, Some(Water));
        let (mut combat, _, mut rng) = fixtures();
        let mut loot = LootController::new(1.0, Duration::from_millis(10));
        let mut resolver = CascadeResolver::new();
        run_chain(&mut resolver, &mut grid, &mut combat, &mut loot, &mut rng, true).unwrap();
        assert_eq!(loot.chests().len(), 1);
    }

    /// Column 0 ends in a Fire run; once it clears, the Earth at (4, 0) drops to
    /// row 7 beside two Earths and matches again whatever the refill draws.
    fn gravity_chain() -> Grid {
        let mut grid = checker();
        for row in 5..GRID_SIZE {
            grid.set(row, 0, Some(Fire));
        }
        grid.set(4, 0, Some(Earth));
        grid.set(7, 1, Some(Earth));
        grid.set(7, 2, Some(Earth));
        grid
    }

    #[test]
    fn test_gravity_chain_starts_with_a_single_run() {
        let matches = find_matches(&gravity_chain());
        assert_eq!(matches.groups.len(), 1);
        assert_eq!(matches.groups[0].element, Fire);
        assert_eq!(matches.flat.len(), 3);
    }

    #[test]
    fn test_later_passes_are_never_player_moves() {
        let mut grid = gravity_chain();
        let (mut combat, _, mut rng) = fixtures();
        let mut loot = LootController::new(1.0, Duration::from_millis(10));
        let mut resolver = CascadeResolver::new();
        let awards = run_chain(&mut resolver, &mut grid, &mut combat, &mut loot, &mut rng, true)
            .unwrap();
        assert!(resolver.passes() >= 3);
        assert!(awards.len() >= 2);
        assert!(awards[0].strike.player_move);
        assert_eq!(awards[0].strike.element, Fire);
        assert_eq!(awards[0].strike.target, Some(Side::Ally));
        assert!(awards[1..].iter().all(|a| !a.strike.player_move));
        assert!(awards[1..].iter().any(|a| a.strike.element == Earth));
        assert_eq!(combat.streak.count, 0);
        assert_eq!(combat.streak.element, Some(Fire));
        // One chest roll for the whole chain, not one per pass.
        assert_eq!(loot.chests().len(), 1);
        assert_eq!(resolver.state(), CascadeState::Idle);
    }

    #[test]
    fn test_pass_bound_is_enforced() {
        let mut grid = checker();
        grid.set(0, 1, Some(Water));
        let mut resolver = CascadeResolver::new();
        resolver.begin(false);
        for _ in 0..MAX_PASSES {
            assert!(resolver.detect(&grid).unwrap().is_some());
        }
        assert_eq!(
            resolver.detect(&grid),
            Err(EngineError::CascadeOverflow {
                passes: MAX_PASSES + 1
            })
        );
    }

    proptest! {
        #[test]
        fn prop_chain_leaves_board_full_and_stable(grid in arb_full_grid(), seed in any::<u64>()) {
            let mut grid = grid;
            let (mut combat, mut loot, _) = fixtures();
            let mut rng = StdRng::seed_from_u64(seed);
            let mut resolver = CascadeResolver::new();
            run_chain(&mut resolver, &mut grid, &mut combat, &mut loot, &mut rng, true).unwrap();
            prop_assert!(grid.is_full());
            prop_assert!(find_matches(&grid).is_empty());
            prop_assert_eq!(resolver.state(), CascadeState::Idle);
        }

        #[test]
        fn prop_swap_probe_is_pure(grid in arb_full_grid(), row in 0usize..GRID_SIZE, col in 0usize..GRID_SIZE - 1) {
            let mut probed = grid.clone();
            CascadeResolver::is_valid_swap(&mut probed, Pos::new(row, col), Pos::new(row, col + 1));
            prop_assert_eq!(probed, grid);
        }
    }
}
