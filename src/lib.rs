#![warn(clippy::pedantic)]
#![allow(
    clippy::cast_possible_truncation,
    clippy::cast_precision_loss,
    clippy::cast_sign_loss,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::module_name_repetitions,
    clippy::must_use_candidate
)]

//! `crossfill` fills the open cells of a crossword grid from a scored word list, using a
//! single-pass greedy fill followed by a randomized backtracking search with restarts.

pub mod autofill;
pub mod backtracking_search;
pub mod dupe_index;
pub mod fill_state;
pub mod greedy_fill;
pub mod grid_config;
pub mod random;
pub mod selection;
pub mod types;
pub mod word_list;

#[cfg(target_arch = "wasm32")]
pub mod wasm;

/// Verify the fill state after every backtrack, even in release builds.
pub const CHECK_INVARIANTS: bool = cfg!(feature = "check_invariants");

/// The expected maximum length for a single slot.
pub const MAX_SLOT_LENGTH: usize = 21;

#[cfg(all(target_arch = "wasm32", feature = "console_error_panic_hook"))]
pub fn set_panic_hook() {
    console_error_panic_hook::set_once();
}
