//! Circular reference detection for formula cells.
//!
//! Rule tables are authored by hand and may contain formulas that reference
//! themselves through a chain of other cells (A1 -> B1 -> C1 -> A1).
//! Two tools live here:
//! - [`EvalPath`] guards a running evaluation: it tracks the cells on the
//!   active call path and refuses to re-enter one, or to go deeper than a bound.
//! - [`detect_cycle`] runs a depth-first search over the grid ahead of time.

use std::collections::HashSet;

use super::cell::Grid;
use super::cell_ref::CellRef;
use super::deps::extract_references;
use crate::error::EvalError;

/// Default bound on nested formula evaluation.
pub const DEFAULT_MAX_DEPTH: usize = 256;

/// The chain of formula cells currently being evaluated.
#[derive(Debug, Clone)]
pub struct EvalPath {
    visiting: HashSet<CellRef>,
    stack: Vec<CellRef>,
    max_depth: usize,
}

impl EvalPath {
    pub fn new(max_depth: usize) -> EvalPath {
        EvalPath {
            visiting: HashSet::new(),
            stack: Vec::new(),
            max_depth,
        }
    }

    /// Push `cell` onto the path, failing if it is already on it or the path is full.
    pub fn enter(&mut self, cell: CellRef) -> Result<(), EvalError> {
        if self.visiting.contains(&cell) {
            let mut path = self.stack.clone();
            path.push(cell);
            return Err(EvalError::Cycle { path });
        }
        if self.stack.len() >= self.max_depth {
            return Err(EvalError::DepthExceeded {
                cell,
                max_depth: self.max_depth,
            });
        }
        self.visiting.insert(cell);
        self.stack.push(cell);
        Ok(())
    }

    /// Pop `cell`, which must be the innermost entry.
    pub fn leave(&mut self, cell: CellRef) {
        if self.stack.last() == Some(&cell) {
            self.stack.pop();
            self.visiting.remove(&cell);
        }
    }

    pub fn depth(&self) -> usize {
        self.stack.len()
    }
}

impl Default for EvalPath {
    fn default() -> Self {
        EvalPath::new(DEFAULT_MAX_DEPTH)
    }
}

/// Detect circular references starting from a cell.
/// Returns Some(cycle_path) if a cycle is found, None otherwise.
pub fn detect_cycle(start: &CellRef, grid: &Grid) -> Option<Vec<CellRef>> {
    detect_cycle_from(start, grid, &mut HashSet::new())
}

/// Depth-first search with an explicit stack, so chain length is bounded by
/// memory rather than by the thread stack. Cells whose references were fully
/// explored without meeting a cycle land in `done` and are skipped later.
fn detect_cycle_from(
    start: &CellRef,
    grid: &Grid,
    done: &mut HashSet<CellRef>,
) -> Option<Vec<CellRef>> {
    let deps_of = |cell: &CellRef| grid.formula(cell.row, cell.col).map(extract_references);

    if done.contains(start) {
        return None;
    }
    let deps = deps_of(start)?;

    let mut visiting: HashSet<CellRef> = HashSet::from([*start]);
    let mut stack: Vec<(CellRef, Vec<CellRef>, usize)> = vec![(*start, deps, 0)];

    loop {
        let Some((cell, deps, idx)) = stack.last_mut() else {
            return None;
        };
        let cell = *cell;
        let next = deps.get(*idx).copied();
        *idx += 1;

        let Some(dep) = next else {
            stack.pop();
            visiting.remove(&cell);
            done.insert(cell);
            continue;
        };

        if visiting.contains(&dep) {
            let mut path: Vec<CellRef> = stack.iter().map(|(c, _, _)| *c).collect();
            path.push(dep);
            return Some(path);
        }
        if done.contains(&dep) {
            continue;
        }
        if let Some(deps) = deps_of(&dep) {
            visiting.insert(dep);
            stack.push((dep, deps, 0));
        }
    }
}

/// Every distinct reference cycle in the grid, each reported once.
///
/// Formula cells are searched in row-major order. A cycle path starts and ends
/// on the first cycle cell the search entered; cells that only lead into a
/// cycle are left out.
pub fn find_cycles(grid: &Grid) -> Vec<Vec<CellRef>> {
    let mut starts: Vec<CellRef> = grid
        .iter()
        .filter(|(_, cell)| cell.is_formula())
        .map(|(at, _)| *at)
        .collect();
    starts.sort_by_key(|c| (c.row, c.col));

    let mut done: HashSet<CellRef> = HashSet::new();
    let mut on_cycle: HashSet<CellRef> = HashSet::new();
    let mut reported: HashSet<Vec<CellRef>> = HashSet::new();
    let mut cycles = Vec::new();
    for start in starts {
        if on_cycle.contains(&start) {
            continue;
        }
        let Some(path) = detect_cycle_from(&start, grid, &mut done) else {
            continue;
        };
        let Some(repeated) = path.last().copied() else {
            continue;
        };
        let from = path.iter().position(|c| *c == repeated).unwrap_or(0);
        let cycle = path[from..].to_vec();

        let mut members = cycle[..cycle.len() - 1].to_vec();
        members.sort_by_key(|c| (c.row, c.col));
        on_cycle.extend(members.iter().copied());
        if reported.insert(members) {
            cycles.push(cycle);
        }
    }
    cycles
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eval_path_rejects_reentry() {
        let mut path = EvalPath::new(8);
        let a = CellRef::new(1, 1);
        let b = CellRef::new(2, 1);
        path.enter(a).unwrap();
        path.enter(b).unwrap();
        match path.enter(a) {
            Err(EvalError::Cycle { path }) => assert_eq!(path, vec![a, b, a]),
            other => panic!("expected cycle, got {:?}", other),
        }
        path.leave(b);
        path.leave(a);
        assert_eq!(path.depth(), 0);
        assert!(path.enter(a).is_ok());
    }

    #[test]
    fn test_eval_path_depth_bound() {
        let mut path = EvalPath::new(2);
        path.enter(CellRef::new(1, 1)).unwrap();
        path.enter(CellRef::new(1, 2)).unwrap();
        assert!(matches!(
            path.enter(CellRef::new(1, 3)),
            Err(EvalError::DepthExceeded { max_depth: 2, .. })
        ));
    }

    #[test]
    fn test_detect_cycle_finds_three_cell_loop() {
        let grid = Grid::new("Sheet")
            .with("A1", "=B1+1")
            .with("B1", "=C1*2")
            .with("C1", "=A1");
        let path = detect_cycle(&CellRef::new(1, 1), &grid).unwrap();
        assert_eq!(path.first(), path.last());
        assert_eq!(path.len(), 4);
    }

    #[test]
    fn test_detect_cycle_none_for_diamond() {
        let grid = Grid::new("Sheet")
            .with("A1", "=B1+C1")
            .with("B1", "=D1")
            .with("C1", "=D1")
            .with("D1", "5");
        assert!(detect_cycle(&CellRef::new(1, 1), &grid).is_none());
        assert!(find_cycles(&grid).is_empty());
    }

    #[test]
    fn test_find_cycles_reports_self_reference() {
        let grid = Grid::new("Sheet").with("A1", "1").with("B2", "=B2+A1");
        assert_eq!(
            find_cycles(&grid),
            vec![vec![CellRef::new(2, 2), CellRef::new(2, 2)]]
        );
    }

    #[test]
    fn test_find_cycles_leaves_out_lead_in_cells() {
        let grid = Grid::new("Sheet")
            .with("A1", "=B1")
            .with("B1", "=C1")
            .with("C1", "=B1")
            .with("D1", "=B1+1");
        let b1 = CellRef::new(2, 1);
        let c1 = CellRef::new(3, 1);
        assert_eq!(find_cycles(&grid), vec![vec![b1, c1, b1]]);
    }

    #[test]
    fn test_find_cycles_reports_each_cycle_once() {
        let grid = Grid::new("Sheet")
            .with("A1", "=A2")
            .with("A2", "=A1")
            .with("B1", "=B2+A1")
            .with("B2", "=B1");
        let cycles = find_cycles(&grid);
        assert_eq!(cycles.len(), 2);
        assert_eq!(cycles[0], vec![CellRef::new(1, 1), CellRef::new(1, 2), CellRef::new(1, 1)]);
        assert_eq!(cycles[1], vec![CellRef::new(2, 1), CellRef::new(2, 2), CellRef::new(2, 1)]);
    }

    #[test]
    fn test_long_chain_without_cycle() {
        let len = 25_000;
        let mut grid = Grid::new("Sheet");
        for row in 1..len {
            grid = grid.with(&format!("A{}", row), &format!("=A{}+1", row + 1));
        }
        grid = grid.with(&format!("A{}", len), "1");

        assert!(detect_cycle(&CellRef::new(1, 1), &grid).is_none());
        assert!(find_cycles(&grid).is_empty());
    }

    #[test]
    fn test_long_chain_closing_on_itself() {
        let len = 25_000;
        let mut grid = Grid::new("Sheet");
        for row in 1..len {
            grid = grid.with(&format!("A{}", row), &format!("=A{}+1", row + 1));
        }
        grid = grid.with(&format!("A{}", len), "=A1");

        let cycles = find_cycles(&grid);
        assert_eq!(cycles.len(), 1);
        assert_eq!(cycles[0].len(), len + 1);
        assert_eq!(cycles[0].first(), Some(&CellRef::new(1, 1)));
        assert_eq!(cycles[0].last(), Some(&CellRef::new(1, 1)));
    }
}
