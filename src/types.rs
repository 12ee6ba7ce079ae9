/// An identifier for a given slot, based on its index in the `GridConfig`'s `slot_configs` field.
pub type SlotId = usize;

/// An identifier for a given word option, based on its index in the relevant slot's `options`
/// (scoped to that slot).
pub type WordId = usize;

/// An identifier for the intersection between two slots, shared by both sides of the crossing.
/// These index into the per-attempt crossing weights.
pub type CrossingId = usize;

/// Zero-indexed `(row, col)` coords for a cell in the grid, where row 0 is the top row.
pub type GridCoord = (usize, usize);

/// A dictionary word's score. Higher is better; entries without a score get 0.
pub type Score = u32;
