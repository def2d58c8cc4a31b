//! Orb grid: elements, cell positions, and the mutation primitives used by the cascade.

use crate::matcher::find_matches;
use rand::Rng;

/// Board side length in cells.
pub const GRID_SIZE: usize = 8;

/// Element kinds an orb can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Element {
    Water,
    Fire,
    Earth,
    Air,
}

impl Element {
    pub const ALL: [Self; 4] = [Self::Water, Self::Fire, Self::Earth, Self::Air];

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.random_range(0..Self::ALL.len())]
    }

    /// Index 0..4 for theme lookups.
    pub fn index(self) -> usize {
        match self {
            Self::Water => 0,
            Self::Fire => 1,
            Self::Earth => 2,
            Self::Air => 3,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Water => "Water",
            Self::Fire => "Fire",
            Self::Earth => "Earth",
            Self::Air => "Air",
        }
    }
}

/// Grid coordinate; row 0 is the top.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    pub row: usize,
    pub col: usize,
}

impl Pos {
    pub const fn new(row: usize, col: usize) -> Self {
        Self { row, col }
    }

    /// `Some` only for coordinates inside the board.
    pub fn checked(row: usize, col: usize) -> Option<Self> {
        (row < GRID_SIZE && col < GRID_SIZE).then_some(Self { row, col })
    }

    /// Orthogonal neighbours only; a cell is not adjacent to itself.
    pub fn is_adjacent(self, other: Self) -> bool {
        self.row.abs_diff(other.row) + self.col.abs_diff(other.col) == 1
    }
}

/// Single cell: an orb or nothing.
pub type Cell = Option<Element>;

/// One orb moved down by gravity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fall {
    pub col: usize,
    pub from_row: usize,
    pub to_row: usize,
    pub element: Element,
}

/// One orb created by refill.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Spawn {
    pub pos: Pos,
    pub element: Element,
}

/// Result of compacting one column.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Compaction {
    /// Orbs that changed row, bottom-most first.
    pub falls: Vec<Fall>,
    /// Rows left empty at the top of the column, top first.
    pub empty_rows: Vec<usize>,
}

/// The board. rows[row][col]; rows[0] is the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Grid {
    rows: [[Cell; GRID_SIZE]; GRID_SIZE],
}

impl Default for Grid {
    fn default() -> Self {
        Self::empty()
    }
}

impl Grid {
    pub fn empty() -> Self {
        Self {
            rows: [[None; GRID_SIZE]; GRID_SIZE],
        }
    }

    /// Fresh random board with no matches: matched cells are re-rolled until clean.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut grid = Self::empty();
        for row in &mut grid.rows {
            for cell in row.iter_mut() {
                *cell = Some(Element::random(rng));
            }
        }
        let mut rerolls = 0usize;
        loop {
            let found = find_matches(&grid);
            if found.is_empty() {
                break;
            }
            for pos in &found.flat {
                grid.rows[pos.row][pos.col] = Some(Element::random(rng));
            }
            rerolls += 1;
        }
        log::debug!("generated board after {rerolls} re-roll passes");
        grid
    }

    /// Coordinates must be in range.
    #[inline]
    pub fn get(&self, row: usize, col: usize) -> Cell {
        self.rows[row][col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, cell: Cell) {
        self.rows[row][col] = cell;
    }

    #[inline]
    pub fn cell(&self, pos: Pos) -> Cell {
        self.get(pos.row, pos.col)
    }

    /// Unconditional exchange of two cells.
    pub fn swap(&mut self, a: Pos, b: Pos) {
        let tmp = self.cell(a);
        self.set(a.row, a.col, self.cell(b));
        self.set(b.row, b.col, tmp);
    }

    /// Move every orb in `col` down as far as it goes, keeping their order.
    pub fn compact_column(&mut self, col: usize) -> Compaction {
        let mut out = Compaction::default();
        let mut write = GRID_SIZE;
        for row in (0..GRID_SIZE).rev() {
            if let Some(element) = self.rows[row][col] {
                write -= 1;
                if write != row {
                    self.rows[write][col] = Some(element);
                    self.rows[row][col] = None;
                    out.falls.push(Fall {
                        col,
                        from_row: row,
                        to_row: write,
                        element,
                    });
                }
            }
        }
        out.empty_rows = (0..write).collect();
        out
    }

    /// Fill the empty cells of `col` with generated orbs.
    pub fn fill_column(&mut self, col: usize, mut generate: impl FnMut() -> Element) -> Vec<Spawn> {
        let mut spawns = Vec::new();
        for row in 0..GRID_SIZE {
            if self.rows[row][col].is_none() {
                let element = generate();
                self.rows[row][col] = Some(element);
                spawns.push(Spawn {
                    pos: Pos::new(row, col),
                    element,
                });
            }
        }
        spawns
    }

    /// Occupied cells in row-major order.
    pub fn occupied(&self) -> impl Iterator<Item = (Pos, Element)> + '_ {
        self.rows.iter().enumerate().flat_map(|(row, cells)| {
            cells
                .iter()
                .enumerate()
                .filter_map(move |(col, cell)| cell.map(|e| (Pos::new(row, col), e)))
        })
    }

    pub fn is_full(&self) -> bool {
        self.rows.iter().flatten().all(Option::is_some)
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Match-free board: rows alternate two elements, columns cycle all four.
    pub(crate) fn checker() -> Grid {
        let mut grid = Grid::empty();
        for row in 0..GRID_SIZE {
            for col in 0..GRID_SIZE {
                grid.set(row, col, Some(Element::ALL[(row + 2 * col) % 4]));
            }
        }
        grid
    }

    fn column(grid: &Grid, col: usize) -> Vec<Cell> {
        (0..GRID_SIZE).map(|row| grid.get(row, col)).collect()
    }

    #[test]
    fn test_checker_has_no_matches() {
        assert!(find_matches(&checker()).is_empty());
    }

    #[test]
    fn test_generate_is_full_and_match_free() {
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let grid = Grid::generate(&mut rng);
            assert!(grid.is_full());
            assert!(find_matches(&grid).is_empty(), "seed {seed}");
        }
    }

    #[test]
    fn test_swap_exchanges_cells() {
        let mut grid = checker();
        let (a, b) = (Pos::new(0, 0), Pos::new(0, 1));
        let (ea, eb) = (grid.cell(a), grid.cell(b));
        grid.swap(a, b);
        assert_eq!(grid.cell(a), eb);
        assert_eq!(grid.cell(b), ea);
    }

    #[test]
    fn test_compact_column_reports_moves_and_empty_rows() {
        let mut grid = checker();
        let original = column(&grid, 3);
        grid.set(7, 3, None);
        grid.set(5, 3, None);
        let result = grid.compact_column(3);
        assert_eq!(result.empty_rows, vec![0, 1]);
        // rows 6, 4, 3, 2, 1, 0 each dropped.
        assert_eq!(result.falls.len(), 6);
        assert_eq!(
            result.falls[0],
            Fall {
                col: 3,
                from_row: 6,
                to_row: 7,
                element: original[6].unwrap()
            }
        );
        assert_eq!(grid.get(2, 3), original[0]);
        assert_eq!(grid.get(0, 3), None);
    }

    #[test]
    fn test_compact_full_column_is_noop() {
        let mut grid = checker();
        let result = grid.compact_column(0);
        assert!(result.falls.is_empty());
        assert!(result.empty_rows.is_empty());
        assert_eq!(grid, checker());
    }

    #[test]
    fn test_fill_column_only_fills_gaps() {
        let mut grid = checker();
        grid.set(0, 2, None);
        grid.set(1, 2, None);
        let spawns = grid.fill_column(2, || Element::Air);
        assert_eq!(spawns.len(), 2);
        assert_eq!(spawns[0].pos, Pos::new(0, 2));
        assert!(grid.is_full());
        assert_eq!(grid.get(1, 2), Some(Element::Air));
    }

    #[test]
    fn test_adjacency() {
        let p = Pos::new(3, 3);
        assert!(p.is_adjacent(Pos::new(2, 3)));
        assert!(p.is_adjacent(Pos::new(3, 4)));
        assert!(!p.is_adjacent(p));
        assert!(!p.is_adjacent(Pos::new(4, 4)));
        assert_eq!(Pos::checked(8, 0), None);
    }

    pub(crate) fn arb_grid(empty_weight: u32) -> impl Strategy<Value = Grid> {
        prop::collection::vec(
            prop_oneof![
                empty_weight => Just(None::<Element>),
                4 => (0usize..4).prop_map(|i| Some(Element::ALL[i])),
            ],
            GRID_SIZE * GRID_SIZE,
        )
        .prop_map(|cells| {
            let mut grid = Grid::empty();
            for (i, cell) in cells.into_iter().enumerate() {
                grid.set(i / GRID_SIZE, i % GRID_SIZE, cell);
            }
            grid
        })
    }

    pub(crate) fn arb_full_grid() -> impl Strategy<Value = Grid> {
        prop::collection::vec(0usize..4, GRID_SIZE * GRID_SIZE).prop_map(|cells| {
            let mut grid = Grid::empty();
            for (i, e) in cells.into_iter().enumerate() {
                grid.set(i / GRID_SIZE, i % GRID_SIZE, Some(Element::ALL[e]));
            }
            grid
        })
    }

    proptest! {
        #[test]
        fn prop_compact_column_packs_to_bottom_in_order(grid in arb_grid(3), col in 0usize..GRID_SIZE) {
            let before: Vec<Element> = column(&grid, col).into_iter().flatten().collect();
            let mut grid = grid;
            let result = grid.compact_column(col);
            let after = column(&grid, col);
            let gap = GRID_SIZE - before.len();
            prop_assert!(after[..gap].iter().all(Option::is_none));
            let packed: Vec<Element> = after[gap..].iter().flatten().copied().collect();
            prop_assert_eq!(packed, before);
            prop_assert_eq!(result.empty_rows, (0..gap).collect::<Vec<_>>());
        }
    }
}
