//! Variable and value ordering for the fill search: slots are ranked with a version of the
//! `dom/wdeg` heuristic (remaining options divided by the weight of live crossings), with the
//! "adaptive branching" tweak of sticking with the previous slot when it's nearly as good as the
//! best one. Both slots and words are then picked at weighted random from the top few candidates.

use float_ord::FloatOrd;

use crate::backtracking_search::Statistics;
use crate::fill_state::{FillState, Slot};
use crate::random::{choose_weighted, UniformSource};
use crate::types::{SlotId, WordId};

/// If the previously-attempted slot is within this distance of the "best" (lowest-priority-value)
/// slot, we should stick with the previous one instead of switching.
pub const ADAPTIVE_BRANCHING_THRESHOLD: f32 = 0.2;

/// Slot weights are floored at this value so that slots without live crossings still get a
/// finite priority.
pub const MIN_SLOT_WEIGHT: f32 = 0.1;

/// Slots whose priority is within this factor of the best one are candidates for the random draw.
pub const TOP_SLOT_PRIORITY_FACTOR: f32 = 2.0;

/// How do we weigh the highest-ranked N slots when choosing which one to fill next? Ranks past the
/// end of the list reuse the last weight.
pub const RANDOM_SLOT_WEIGHTS: [u8; 4] = [5, 3, 2, 1];

/// How do we weigh the highest-ranked N words when choosing a word for a given slot?
pub const RANDOM_WORD_WEIGHTS: [u8; 4] = [5, 3, 2, 1];

/// Word scores are divided by this to get a multiplier on the rank weight, so that words scoring
/// above it get a boost.
pub const WORD_SCORE_SCALE: f64 = 50.0;

fn rank_weight(weights: &[u8], rank: usize) -> f64 {
    f64::from(weights[rank.min(weights.len() - 1)])
}

/// Calculate the weight of a slot as defined in the `wdeg` heuristic, which is the sum of the
/// weights of any crossings it has where the other slot is still undetermined.
#[must_use]
pub fn calculate_slot_weight(state: &FillState, crossing_weights: &[f32], slot_id: SlotId) -> f32 {
    state.config.slot_configs[slot_id]
        .crossings
        .iter()
        .filter(|crossing| state.slots[crossing.other_slot_id].remaining_option_count > 1)
        .map(|crossing| crossing_weights[crossing.crossing_id])
        .sum::<f32>()
        .max(MIN_SLOT_WEIGHT)
}

/// Calculate the weights of all slots as defined in the `wdeg` heuristic.
#[must_use]
pub fn calculate_slot_weights(state: &FillState, crossing_weights: &[f32]) -> Vec<f32> {
    (0..state.slots.len())
        .map(|slot_id| calculate_slot_weight(state, crossing_weights, slot_id))
        .collect()
}

/// Calculate the priority of a slot, a measurement of how good a candidate it is to fill
/// next (where lower is better).
#[must_use]
pub fn calculate_slot_priority(slots: &[Slot], slot_weights: &[f32], slot_id: SlotId) -> f32 {
    (slots[slot_id].remaining_option_count as f32) / slot_weights[slot_id]
}

/// Choose the next slot to fill, or `None` if no unfixed slot has any options left.
pub fn choose_next_slot<R: UniformSource + ?Sized>(
    slots: &[Slot],
    slot_weights: &[f32],
    last_slot_id: Option<SlotId>,
    rng: &mut R,
    statistics: &mut Statistics,
) -> Option<SlotId> {
    let mut sorted_slot_ids: Vec<SlotId> = (0..slots.len())
        .filter(|&slot_id| slots[slot_id].is_eligible())
        .collect();

    // Stable, so equal priorities stay in slot id order.
    sorted_slot_ids
        .sort_by_cached_key(|&slot_id| FloatOrd(calculate_slot_priority(slots, slot_weights, slot_id)));

    let &best_slot_id = sorted_slot_ids.first()?;
    let best_slot_priority = calculate_slot_priority(slots, slot_weights, best_slot_id);

    // If the best slot isn't that much better than the one we're on, stay with the one we're on.
    if let Some(last_slot_id) = last_slot_id {
        if slots[last_slot_id].is_eligible() {
            let last_slot_priority = calculate_slot_priority(slots, slot_weights, last_slot_id);
            if last_slot_priority - best_slot_priority < ADAPTIVE_BRANCHING_THRESHOLD {
                statistics.restricted_branchings += 1;
                return Some(last_slot_id);
            }
        }
    }

    // Otherwise, take one of the best few slots at random.
    let top_slot_ids: Vec<SlotId> = sorted_slot_ids
        .into_iter()
        .take_while(|&slot_id| {
            calculate_slot_priority(slots, slot_weights, slot_id)
                <= best_slot_priority * TOP_SLOT_PRIORITY_FACTOR
        })
        .collect();

    choose_weighted(
        &top_slot_ids,
        |rank, _| rank_weight(&RANDOM_SLOT_WEIGHTS, rank),
        rng,
    )
    .copied()
}

/// Choose one of a slot's remaining options, favoring the best-ranked few and especially
/// high-scoring words. Returns `None` if every option has been eliminated.
pub fn choose_word<R: UniformSource + ?Sized>(
    state: &FillState,
    slot_id: SlotId,
    rng: &mut R,
) -> Option<WordId> {
    let options = &state.config.slot_configs[slot_id].options;

    // Options are already sorted by descending score, so the first few available ones are the
    // best.
    let candidates: Vec<WordId> = state
        .available_word_ids(slot_id)
        .into_iter()
        .take(RANDOM_WORD_WEIGHTS.len())
        .collect();

    choose_weighted(
        &candidates,
        |rank, &word_id| {
            let score_boost = (f64::from(options[word_id].score) / WORD_SCORE_SCALE).max(1.0);
            rank_weight(&RANDOM_WORD_WEIGHTS, rank) * score_boost
        },
        rng,
    )
    .copied()
}
