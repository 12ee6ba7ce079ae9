//! A cheap single-pass fill that's tried before the full search: visit slots from most to least
//! constrained and commit the first of each slot's best few options that fits. It never
//! backtracks, so it either succeeds quickly or gives up.

use log::{debug, trace};
use thiserror::Error;

use crate::fill_state::FillState;
use crate::grid_config::GridConfig;
use crate::types::SlotId;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GreedyFailure {
    #[error("slot {slot_id} has no available options")]
    NoOptions { slot_id: SlotId },

    #[error("none of the top {tried} options fit slot {slot_id}")]
    NoFit { slot_id: SlotId, tried: usize },
}

/// Try to fill every slot in one pass, considering at most `options_per_slot` options for each.
/// On success every slot in the returned state is fixed.
pub fn greedy_fill(
    config: &GridConfig,
    options_per_slot: usize,
) -> Result<FillState<'_>, GreedyFailure> {
    let mut state = FillState::new(config);

    // Fewest options first; `sort_by_key` is stable, so ties stay in slot id order.
    let mut slot_order: Vec<SlotId> = (0..config.slot_configs.len()).collect();
    slot_order.sort_by_key(|&slot_id| config.slot_configs[slot_id].options.len());

    for slot_id in slot_order {
        if state.slots[slot_id].is_fixed() {
            continue;
        }

        let candidates: Vec<_> = state
            .available_word_ids(slot_id)
            .into_iter()
            .take(options_per_slot)
            .collect();
        if candidates.is_empty() {
            debug!("Greedy fill: no options for slot {slot_id}");
            return Err(GreedyFailure::NoOptions { slot_id });
        }

        let placed = candidates.iter().any(|&word_id| {
            let result = state.try_place_word(slot_id, word_id);
            trace!(
                "Greedy fill: slot {slot_id}, {}: {result:?}",
                config.slot_configs[slot_id].options[word_id].word
            );
            result.is_ok()
        });

        if !placed {
            debug!("Greedy fill: nothing fits slot {slot_id}");
            return Err(GreedyFailure::NoFit {
                slot_id,
                tried: candidates.len(),
            });
        }
    }

    Ok(state)
}

#[cfg(test)]
mod tests {
    use crate::grid_config::{generate_grid_config, render_grid, Grid};
    use crate::greedy_fill::{greedy_fill, GreedyFailure};
    use crate::word_list::WordList;

    #[test]
    fn test_greedy_fill_2x2() {
        let grid = Grid::from_template(
            "
            ..
            ..
            ",
        )
        .unwrap();
        let config = generate_grid_config(&grid, &WordList::new(&["AB:50", "CD:40", "AC:30", "BD:20"]));

        let state = greedy_fill(&config, 5).expect("Greedy fill should succeed");

        assert!(state.is_complete());
        state.check_invariants().unwrap();
        assert_eq!(render_grid(&config, &state.choices), "AB\nCD");
    }

    #[test]
    fn test_greedy_fill_avoids_duplicates() {
        let grid = Grid::from_template(
            "
            ...
            .##
            .##
            ",
        )
        .unwrap();
        let config = generate_grid_config(&grid, &WordList::new(&["CAT;10", "DOG;10", "CAR;5"]));

        let state = greedy_fill(&config, 5).unwrap();
        assert_eq!(render_grid(&config, &state.choices), "CAT\nA##\nR##");
    }

    #[test]
    fn test_greedy_fill_failures() {
        let grid = Grid::from_template("Q..").unwrap();
        let config = generate_grid_config(&grid, &WordList::new(&["CAT;10"]));
        assert_eq!(
            greedy_fill(&config, 5).unwrap_err(),
            GreedyFailure::NoOptions { slot_id: 0 }
        );

        let grid = Grid::from_template(
            "
            .....
            #####
            .....
            ",
        )
        .unwrap();
        let config = generate_grid_config(&grid, &WordList::new(&["APPLE:90", "APPLE;50"]));
        assert_eq!(
            greedy_fill(&config, 5).unwrap_err(),
            GreedyFailure::NoFit {
                slot_id: 1,
                tried: 2
            }
        );
    }
}
