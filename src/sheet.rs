//! `Sheet`: the sparse `Position -> Cell` mapping, printable-size tracking, and the coordination
//! that lazily materializes cells referenced by a formula.
//!
//! Grounded on the original C++ `Sheet::SetCell` / `GetCell` / `ClearCell` / `UpdateSize` /
//! `PrintValues` / `PrintTexts`, and on the teacher's `Workbook::set_cell_value` /
//! `recalculate` for the "create missing referenced cells, then invalidate dependents" flow.

use std::io::{self, Write};

use hashbrown::HashMap;
use log::debug;

use crate::cell::{self, Cell};
use crate::content::Content;
use crate::error::CellGraphError;
use crate::formula::SheetView;
use crate::position::Position;
use crate::value::Value;

/// The minimal rectangle covering all live cells: `rows > max(row)` and `cols > max(col)` for any
/// present cell, or `(0, 0)` when the sheet is empty.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Size {
    pub rows: u32,
    pub cols: u32,
}

/// A sparse, in-memory spreadsheet: a mapping from [`Position`] to [`Cell`] plus the current
/// printable [`Size`].
#[derive(Debug, Default)]
pub struct Sheet {
    cells: HashMap<Position, Cell>,
    size: Size,
}

impl Sheet {
    pub fn new() -> Self {
        Sheet {
            cells: HashMap::new(),
            size: Size::default(),
        }
    }

    /// Sets the content at `pos` from raw text, per the classification rule in
    /// `Content::classify`. On a cycle or parse failure, `pos` is left exactly as it was before
    /// the call (atomic rollback) — no partial edge rewiring or content replacement occurs.
    pub fn set_cell(&mut self, pos: Position, text: &str) -> Result<(), CellGraphError> {
        if !pos.is_valid() {
            return Err(CellGraphError::InvalidPosition(pos));
        }

        let content = Content::classify(text)?;
        let refs = content.get_referenced_cells();

        if !refs.is_empty() && cell::would_introduce_cycle(&self.cells, pos, &refs) {
            debug!("rejecting write at {pos}: would introduce a circular reference");
            return Err(CellGraphError::CircularReference(pos));
        }

        for &referenced in &refs {
            self.ensure_cell_exists(referenced);
        }
        self.ensure_cell_exists(pos);

        cell::rewire_outgoing(&mut self.cells, pos, &refs);
        cell::install_content(&mut self.cells, pos, content);
        self.grow_to_cover(pos);
        cell::invalidate_transitively(&self.cells, pos);

        Ok(())
    }

    /// Returns the cell at `pos`, or `None` if no cell has ever been written or materialized
    /// there.
    pub fn get_cell(&self, pos: Position) -> Result<Option<&Cell>, CellGraphError> {
        if !pos.is_valid() {
            return Err(CellGraphError::InvalidPosition(pos));
        }
        Ok(self.cells.get(&pos))
    }

    /// Removes the cell entry at `pos` entirely (no Empty placeholder left behind). A no-op if
    /// absent. Cells that depended on the removed one (`removed.incoming()`) have their caches
    /// invalidated transitively, since the value they read has changed (to absent); their stale
    /// `outgoing` edge pointing at `pos` is left in place and reconciled if `pos` is materialized
    /// again — see `cell::incoming_from_existing_outgoing`.
    pub fn clear_cell(&mut self, pos: Position) -> Result<(), CellGraphError> {
        if !pos.is_valid() {
            return Err(CellGraphError::InvalidPosition(pos));
        }
        let Some(removed) = self.cells.remove(&pos) else {
            return Ok(());
        };

        for referenced in removed.outgoing() {
            if let Some(cell) = self.cells.get_mut(referenced) {
                // hashbrown's HashMap doesn't expose entry-level field mutation through `Cell`
                // directly; incoming is private, so route through the cell module's helper.
                cell::forget_incoming(cell, pos);
            }
        }

        for dependent in removed.incoming() {
            cell::invalidate_transitively(&self.cells, *dependent);
        }

        let was_on_boundary =
            self.size.rows == pos.row + 1 || self.size.cols == pos.col + 1;
        if was_on_boundary {
            self.recompute_size();
        }
        Ok(())
    }

    pub fn get_printable_size(&self) -> Size {
        self.size
    }

    /// Writes a tab-separated grid of computed values; absent cells render as empty strings and
    /// arithmetic errors render as `#ARITHM!` (via [`Value::render`]).
    pub fn print_values<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_grid(out, |cell, sheet| cell.get_value(sheet).render())
    }

    /// Writes a tab-separated grid of each cell's raw text (`GetText`).
    pub fn print_texts<W: Write>(&self, out: &mut W) -> io::Result<()> {
        self.print_grid(out, |cell, _sheet| cell.get_text())
    }

    fn print_grid<W: Write>(
        &self,
        out: &mut W,
        render: impl Fn(&Cell, &Sheet) -> String,
    ) -> io::Result<()> {
        for row in 0..self.size.rows {
            for col in 0..self.size.cols {
                if col > 0 {
                    write!(out, "\t")?;
                }
                if let Some(cell) = self.cells.get(&Position::new(row, col)) {
                    write!(out, "{}", render(cell, self))?;
                }
            }
            writeln!(out)?;
        }
        Ok(())
    }

    fn ensure_cell_exists(&mut self, pos: Position) {
        if !self.cells.contains_key(&pos) {
            debug!("materializing implicit empty cell at {pos}");
            let incoming = cell::incoming_from_existing_outgoing(&self.cells, pos);
            self.cells.insert(pos, Cell::empty_with_incoming(incoming));
            self.grow_to_cover(pos);
        }
    }

    fn grow_to_cover(&mut self, pos: Position) {
        self.size.rows = self.size.rows.max(pos.row + 1);
        self.size.cols = self.size.cols.max(pos.col + 1);
    }

    fn recompute_size(&mut self) {
        let mut max_row = None;
        let mut max_col = None;
        for pos in self.cells.keys() {
            max_row = Some(max_row.map_or(pos.row, |m: u32| m.max(pos.row)));
            max_col = Some(max_col.map_or(pos.col, |m: u32| m.max(pos.col)));
        }
        self.size = match (max_row, max_col) {
            (Some(r), Some(c)) => Size {
                rows: r + 1,
                cols: c + 1,
            },
            _ => Size::default(),
        };
    }
}

impl SheetView for Sheet {
    fn get_value(&self, pos: Position) -> Option<Value> {
        self.cells.get(&pos).map(|cell| cell.get_value(self))
    }
}
