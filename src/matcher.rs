//! Match detection: maximal same-element runs of three or more, rows scanned before columns.

use crate::grid::{Element, GRID_SIZE, Grid, Pos};

/// Shortest run that counts as a match.
pub const MIN_RUN: usize = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    Row,
    Column,
}

/// One maximal run. `cells` lists every cell of the run, even ones an earlier
/// group already claimed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchGroup {
    pub element: Element,
    pub axis: Axis,
    pub cells: Vec<Pos>,
}

/// Result of one detection pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Matches {
    /// Deduplicated union of all group cells, in claim order. This is what gets removed.
    pub flat: Vec<Pos>,
    /// Row groups first (top to bottom), then column groups (left to right).
    pub groups: Vec<MatchGroup>,
}

impl Matches {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn contains(&self, pos: Pos) -> bool {
        self.flat.contains(&pos)
    }
}

/// Scan the whole board. Pure: never touches the grid.
pub fn find_matches(grid: &Grid) -> Matches {
    let mut found = Matches::default();
    let mut claimed = [[false; GRID_SIZE]; GRID_SIZE];

    for row in 0..GRID_SIZE {
        let line: [Pos; GRID_SIZE] = std::array::from_fn(|col| Pos::new(row, col));
        scan_line(grid, &line, Axis::Row, &mut claimed, &mut found);
    }
    for col in 0..GRID_SIZE {
        let line: [Pos; GRID_SIZE] = std::array::from_fn(|row| Pos::new(row, col));
        scan_line(grid, &line, Axis::Column, &mut claimed, &mut found);
    }
    found
}

/// Run-length scan of one line. Empty cells break runs and never match.
fn scan_line(
    grid: &Grid,
    line: &[Pos],
    axis: Axis,
    claimed: &mut [[bool; GRID_SIZE]; GRID_SIZE],
    found: &mut Matches,
) {
    let mut start = 0;
    while start < line.len() {
        let Some(element) = grid.cell(line[start]) else {
            start += 1;
            continue;
        };
        let mut end = start + 1;
        while end < line.len() && grid.cell(line[end]) == Some(element) {
            end += 1;
        }
        if end - start >= MIN_RUN {
            let cells = line[start..end].to_vec();
            for &pos in &cells {
                if !claimed[pos.row][pos.col] {
                    claimed[pos.row][pos.col] = true;
                    found.flat.push(pos);
                }
            }
            log::trace!("{:?} run of {} {:?} at {:?}", axis, cells.len(), element, cells[0]);
            found.groups.push(MatchGroup {
                element,
                axis,
                cells,
            });
        }
        start = end;
    }
}
