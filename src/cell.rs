//! `Cell`: one cell's content plus its dependency-graph neighbor sets, and the graph algorithms
//! (cycle detection, transitive cache invalidation) that operate over those neighbor sets.
//!
//! Grounded on the original C++ `Cell::Set` / `DetectCircularDependency` /
//! `InvalidateCacheInner` / `UpdateDependencies`, adapted so that back-references are `Position`
//! keys resolved through the owning `Sheet`'s map rather than raw `Cell*` pointers (see
//! `DESIGN.md` for why — Rust has no safe non-owning pointer with the lifetime the original
//! design wants, and `Position` is already a stable, `Copy`, hashable identity for a live cell).

use std::collections::HashSet;

use hashbrown::HashMap;
use log::{debug, trace};
use smallvec::SmallVec;

/// Most formulas reference only a handful of cells; inline up to 8 before spilling to the heap.
type PositionStack = SmallVec<[Position; 8]>;

use crate::content::Content;
use crate::formula::SheetView;
use crate::position::Position;
use crate::value::Value;

/// One cell: its current content, and the cells it references (`outgoing`) / the cells that
/// reference it (`incoming`), keyed by `Position`.
#[derive(Debug)]
pub struct Cell {
    content: Content,
    outgoing: HashSet<Position>,
    incoming: HashSet<Position>,
}

impl Cell {
    pub(crate) fn empty() -> Self {
        Self::empty_with_incoming(HashSet::new())
    }

    /// An empty cell carrying a pre-existing `incoming` set, for (re)materializing a position that
    /// other live cells already name in their `outgoing` set — see
    /// `incoming_from_existing_outgoing`.
    pub(crate) fn empty_with_incoming(incoming: HashSet<Position>) -> Self {
        Cell {
            content: Content::Empty,
            outgoing: HashSet::new(),
            incoming,
        }
    }

    pub fn get_value(&self, sheet: &dyn SheetView) -> Value {
        self.content.get_value(sheet)
    }

    pub fn get_text(&self) -> String {
        self.content.get_text()
    }

    pub fn get_referenced_cells(&self) -> Vec<Position> {
        self.content.get_referenced_cells()
    }

    pub fn outgoing(&self) -> &HashSet<Position> {
        &self.outgoing
    }

    pub fn incoming(&self) -> &HashSet<Position> {
        &self.incoming
    }

    pub(crate) fn content(&self) -> &Content {
        &self.content
    }

    pub(crate) fn reset_cache(&self) {
        self.content.reset_cache();
    }
}

/// Would installing `candidate_refs` as `target`'s outgoing edges introduce a cycle?
///
/// True iff `target` is reachable from any position in `candidate_refs` via the *existing*
/// outgoing edges already in `cells` — the graph is acyclic pre-edit, so the candidate introduces
/// a cycle iff `target` is reachable from one of its own new targets under the current edges.
/// Unresolved (not-yet-existing) positions contribute nothing, since a not-yet-existing cell has
/// no outgoing edges.
pub(crate) fn would_introduce_cycle(
    cells: &HashMap<Position, Cell>,
    target: Position,
    candidate_refs: &[Position],
) -> bool {
    let mut visited: HashSet<Position> = HashSet::new();
    let mut stack: PositionStack = candidate_refs.iter().copied().collect();

    while let Some(pos) = stack.pop() {
        if pos == target {
            return true;
        }
        if !visited.insert(pos) {
            continue;
        }
        if let Some(cell) = cells.get(&pos) {
            stack.extend(cell.outgoing.iter().copied());
        }
    }
    false
}

/// Rewires `target`'s outgoing edges to exactly `new_refs`, updating every affected cell's
/// incoming set. `new_refs` is assumed to already be de-duplicated (as
/// `Content::get_referenced_cells` guarantees) and to name only positions present in `cells`
/// (the caller must have materialized any not-yet-existing referenced positions first).
pub(crate) fn rewire_outgoing(cells: &mut HashMap<Position, Cell>, target: Position, new_refs: &[Position]) {
    let old_refs: Vec<Position> = cells
        .get(&target)
        .map(|c| c.outgoing.iter().copied().collect())
        .unwrap_or_default();

    for old in &old_refs {
        if let Some(prior) = cells.get_mut(old) {
            prior.incoming.remove(&target);
        }
    }

    if let Some(cell) = cells.get_mut(&target) {
        cell.outgoing.clear();
        cell.outgoing.extend(new_refs.iter().copied());
    }
    for new in new_refs {
        if let Some(referenced) = cells.get_mut(new) {
            referenced.incoming.insert(target);
        }
    }
}

/// Resets `start`'s own cache, then walks incoming edges transitively resetting the cache of
/// every reachable cell. A visited set bounds the traversal even though acyclicity already
/// forbids revisiting — defensive, per the spec's note that this is the only place caches are
/// cleared.
pub(crate) fn invalidate_transitively(cells: &HashMap<Position, Cell>, start: Position) {
    if let Some(cell) = cells.get(&start) {
        trace!("invalidating cached value at {start}");
        cell.reset_cache();
    }

    let mut visited: HashSet<Position> = HashSet::new();
    let mut stack: PositionStack = cells
        .get(&start)
        .map(|c| c.incoming.iter().copied().collect())
        .unwrap_or_default();

    while let Some(pos) = stack.pop() {
        if !visited.insert(pos) {
            continue;
        }
        if let Some(cell) = cells.get(&pos) {
            trace!("invalidating cached value at {pos}");
            cell.reset_cache();
            stack.extend(cell.incoming.iter().copied());
        }
    }
}

/// Removes `pos` from `cell`'s incoming set, used by `Sheet::clear_cell` to keep the surviving
/// neighbors of a removed cell's former outgoing targets consistent.
pub(crate) fn forget_incoming(cell: &mut Cell, pos: Position) {
    cell.incoming.remove(&pos);
}

/// Positions of existing cells whose `outgoing` already names `pos`.
///
/// A cleared cell's former dependents keep their stale `outgoing` edge pointing at the now-absent
/// position (clearing is permitted even with live incoming edges). When `pos` is materialized
/// again — implicitly via a new formula, or explicitly via `set_cell` — this reconciles `incoming`
/// so those dependents are still reachable by `invalidate_transitively`.
pub(crate) fn incoming_from_existing_outgoing(cells: &HashMap<Position, Cell>, pos: Position) -> HashSet<Position> {
    cells
        .iter()
        .filter(|(_, cell)| cell.outgoing.contains(&pos))
        .map(|(&k, _)| k)
        .collect()
}

pub(crate) fn install_content(cells: &mut HashMap<Position, Cell>, target: Position, content: Content) {
    debug!("installing new content at {target}");
    match cells.get_mut(&target) {
        Some(cell) => cell.content = content,
        None => {
            let incoming = incoming_from_existing_outgoing(cells, target);
            cells.insert(
                target,
                Cell {
                    content,
                    outgoing: HashSet::new(),
                    incoming,
                },
            );
        }
    }
}
