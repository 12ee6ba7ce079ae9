//! This module implements grid-filling using a randomized backtracking search. Slots are ordered
//! with a variant of the `dom/wdeg` heuristic plus "adaptive branching" (see `selection.rs`), words
//! are drawn at weighted random from each slot's best options, and a run of failed slots triggers
//! chronological backtracking. Each attempt is bounded by a backtrack budget; the retry loop in
//! `find_fill` restarts with a new seed and a larger budget until an attempt succeeds or we run
//! out of retries.

use instant::Instant;
use log::{debug, trace};
use std::time::Duration;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

use crate::fill_state::FillState;
use crate::greedy_fill::greedy_fill;
use crate::grid_config::{Choice, GridConfig};
use crate::random::{Lcg, RngStrategy, UniformSource};
use crate::selection::{calculate_slot_weights, choose_next_slot, choose_word};
use crate::types::SlotId;
use crate::CHECK_INVARIANTS;

/// How much do we decrease the weight of each crossing every time a slot fails? The lower this is,
/// the more we prioritize recent information over older information. Only used when crossing
/// weight learning is enabled.
pub const WEIGHT_AGE_FACTOR: f32 = 0.99;

/// How much is each of a failed slot's crossings penalized when crossing weight learning is
/// enabled?
pub const WEIGHT_FAILURE_INCREMENT: f32 = 1.0;

/// Knobs controlling a fill operation. The defaults are the tuned values the search was designed
/// around; most callers shouldn't need to touch them.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct FillOptions {
    /// How many seeded search attempts to make after the greedy pass fails.
    pub max_retries: usize,

    /// The backtrack budget of the first attempt.
    pub initial_max_backtracks: usize,

    /// After a failed attempt, the budget grows to the larger of `current + min_backtrack_increment`
    /// and `current * backtrack_growth_factor`.
    pub min_backtrack_increment: usize,
    pub backtrack_growth_factor: f64,

    /// How many words to draw for a slot before declaring it failed.
    pub words_per_slot: usize,

    /// How many consecutive slot failures it takes to backtrack rather than abandon the attempt.
    pub failures_before_backtrack: usize,

    /// How many of each slot's best options the greedy pass considers.
    pub greedy_options_per_slot: usize,

    pub rng: RngStrategy,

    /// Adjust crossing weights as slots fail, instead of keeping them all at 1.0.
    pub learn_crossing_weights: bool,
}

impl Default for FillOptions {
    fn default() -> Self {
        FillOptions {
            max_retries: 5,
            initial_max_backtracks: 1000,
            min_backtrack_increment: 100,
            backtrack_growth_factor: 1.2,
            words_per_slot: 10,
            failures_before_backtrack: 3,
            greedy_options_per_slot: 5,
            rng: RngStrategy::Lcg,
            learn_crossing_weights: false,
        }
    }
}

/// A struct tracking stats about the filling process. These accumulate across every attempt in a
/// single `find_fill` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Statistics {
    pub states: usize,
    pub backtracks: usize,
    pub restricted_branchings: usize,

    /// The index of the attempt that succeeded.
    pub retries: usize,

    pub total_time: Duration,
}

/// Why a single fill attempt gave up. None of these are fatal: the retry loop moves on to the next
/// attempt.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AttemptFailure {
    #[error("slot {slot_id} has no remaining options")]
    SlotUnsatisfiable { slot_id: SlotId },

    #[error("couldn't place any word in slot {slot_id}")]
    SlotExhausted { slot_id: SlotId },

    #[error("exceeded the backtrack limit of {0}")]
    BacktrackLimitExceeded(usize),

    #[error("no choices left to backtrack")]
    ChoicesExhausted,
}

/// The states of a single fill attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchState {
    /// Pick the next slot to fill.
    Select,

    /// Draw words for the given slot until one fits.
    TryWord(SlotId),

    /// Undo choices until some slot has options again, starting by ruling out the given choice if
    /// we know which one failed.
    Backtrack(Option<Choice>),

    Done,
    Failed(AttemptFailure),
}

/// Decide what happens after a slot runs out of draws: keep going by backtracking only if slots
/// have been failing repeatedly; otherwise give up on the attempt right away.
#[must_use]
pub fn transition_after_slot_failure(
    consecutive_failures: usize,
    failures_before_backtrack: usize,
    slot_id: SlotId,
    last_rejected: Option<Choice>,
) -> SearchState {
    if consecutive_failures >= failures_before_backtrack {
        SearchState::Backtrack(last_rejected)
    } else {
        SearchState::Failed(AttemptFailure::SlotExhausted { slot_id })
    }
}

/// Age every crossing weight towards 1.0, then penalize the crossings of a slot that just failed.
fn record_slot_failure(config: &GridConfig, crossing_weights: &mut [f32], slot_id: SlotId) {
    for weight in crossing_weights.iter_mut() {
        *weight = 1.0 + (*weight - 1.0) * WEIGHT_AGE_FACTOR;
    }
    for crossing in &config.slot_configs[slot_id].crossings {
        crossing_weights[crossing.crossing_id] += WEIGHT_FAILURE_INCREMENT;
    }
}

/// Undo choices until some slot has options again. Returns the slot that should be tried next.
fn backtrack(
    state: &mut FillState,
    mut target: Option<Choice>,
    backtracks: &mut usize,
    max_backtracks: usize,
    statistics: &mut Statistics,
) -> Result<SlotId, AttemptFailure> {
    loop {
        *backtracks += 1;
        statistics.backtracks += 1;

        if *backtracks > max_backtracks {
            return Err(AttemptFailure::BacktrackLimitExceeded(max_backtracks));
        }

        if let Some(choice) = target {
            trace!(
                "Eliminating {} from slot {}",
                state.config.choice_word(&choice).word,
                choice.slot_id
            );
            state.eliminate_word(choice.slot_id, choice.word_id);

            if state.slots[choice.slot_id].remaining_option_count > 0 {
                return Ok(choice.slot_id);
            }
        }

        let Some(undone) = state.undo_last_choice() else {
            return Err(AttemptFailure::ChoicesExhausted);
        };
        trace!(
            "Undid {} in slot {}",
            state.config.choice_word(&undone).word,
            undone.slot_id
        );
        target = Some(undone);
    }
}

/// Run a single fill attempt with the given backtrack budget, drawing all randomness from `rng`.
/// `statistics` is updated as we go, whether or not the attempt succeeds.
pub fn run_attempt<'a, R: UniformSource + ?Sized>(
    config: &'a GridConfig,
    options: &FillOptions,
    max_backtracks: usize,
    rng: &mut R,
    statistics: &mut Statistics,
) -> Result<FillState<'a>, AttemptFailure> {
    let mut state = FillState::new(config);

    // Track weights representing how problematic each crossing is in the grid. These stay at 1.0
    // unless learning is enabled.
    let mut crossing_weights: Vec<f32> = vec![1.0; config.crossing_count];

    let mut last_slot_id: Option<SlotId> = None;
    let mut consecutive_failures: usize = 0;
    let mut backtracks: usize = 0;
    let mut search_state = SearchState::Select;

    loop {
        search_state = match search_state {
            SearchState::Select => {
                statistics.states += 1;

                let slot_weights = calculate_slot_weights(&state, &crossing_weights);
                match choose_next_slot(&state.slots, &slot_weights, last_slot_id, rng, statistics)
                {
                    Some(slot_id) => SearchState::TryWord(slot_id),
                    None => match state.slots.iter().find(|slot| !slot.is_fixed()) {
                        // If there are no more slots to fill, it means we're done.
                        None => SearchState::Done,
                        Some(slot) => {
                            SearchState::Failed(AttemptFailure::SlotUnsatisfiable { slot_id: slot.id })
                        }
                    },
                }
            }

            SearchState::TryWord(slot_id) => {
                last_slot_id = Some(slot_id);

                let max_draws = state.slots[slot_id]
                    .remaining_option_count
                    .min(options.words_per_slot);
                let mut last_rejected: Option<Choice> = None;
                let mut placed = false;

                for _ in 0..max_draws {
                    let Some(word_id) = choose_word(&state, slot_id, rng) else {
                        break;
                    };

                    match state.try_place_word(slot_id, word_id) {
                        Ok(()) => {
                            trace!(
                                "Placed {} in slot {slot_id}",
                                config.slot_configs[slot_id].options[word_id].word
                            );
                            placed = true;
                            break;
                        }
                        Err(rejection) => {
                            trace!(
                                "Rejected {} for slot {slot_id}: {rejection:?}",
                                config.slot_configs[slot_id].options[word_id].word
                            );
                            state.eliminate_word(slot_id, word_id);
                            last_rejected = Some(Choice { slot_id, word_id });
                        }
                    }
                }

                if placed {
                    consecutive_failures = 0;
                    SearchState::Select
                } else {
                    consecutive_failures += 1;
                    if options.learn_crossing_weights {
                        record_slot_failure(config, &mut crossing_weights, slot_id);
                    }
                    transition_after_slot_failure(
                        consecutive_failures,
                        options.failures_before_backtrack,
                        slot_id,
                        last_rejected,
                    )
                }
            }

            SearchState::Backtrack(target) => {
                match backtrack(&mut state, target, &mut backtracks, max_backtracks, statistics) {
                    Ok(slot_id) => {
                        if CHECK_INVARIANTS || cfg!(debug_assertions) {
                            if let Err(problem) = state.check_invariants() {
                                panic!("Inconsistent fill state after backtracking: {problem}");
                            }
                        }

                        last_slot_id = Some(slot_id);
                        consecutive_failures = 0;
                        SearchState::Select
                    }
                    Err(failure) => SearchState::Failed(failure),
                }
            }

            SearchState::Done => return Ok(state),

            SearchState::Failed(failure) => return Err(failure),
        };
    }
}

/// The backtrack budget for the attempt after one that failed with `current`.
#[must_use]
pub fn next_max_backtracks(current: usize, options: &FillOptions) -> usize {
    // Float-to-int `as` casts saturate, so huge budgets top out at `usize::MAX`.
    let grown = (current as f64 * options.backtrack_growth_factor).floor() as usize;
    current
        .saturating_add(options.min_backtrack_increment)
        .max(grown)
}

/// How a successful fill was found.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum FillMethod {
    /// There was nothing to fill.
    AlreadyComplete,
    Greedy,
    Search,
}

/// A struct representing the results of a fill operation.
#[derive(Debug, Clone)]
pub struct FillSuccess {
    pub statistics: Statistics,
    pub choices: Vec<Choice>,

    /// The completed letters, in the same layout as `GridConfig.fill`.
    pub fill: Vec<Option<char>>,

    pub method: FillMethod,
}

#[derive(Error, Debug, Clone)]
#[error("no fill found after {} attempts", .attempts.len())]
pub struct FillFailure {
    pub statistics: Statistics,

    /// Why each attempt failed, in order.
    pub attempts: Vec<AttemptFailure>,
}

/// Search for a valid fill for the given grid: try the greedy pass, then up to
/// `options.max_retries` seeded attempts with a growing backtrack budget.
pub fn find_fill(config: &GridConfig, options: &FillOptions) -> Result<FillSuccess, FillFailure> {
    let start = Instant::now();
    let mut statistics = Statistics::default();

    if config.slot_configs.is_empty() {
        statistics.total_time = start.elapsed();
        return Ok(FillSuccess {
            statistics,
            choices: vec![],
            fill: config.fill.clone(),
            method: FillMethod::AlreadyComplete,
        });
    }

    debug!(
        "Filling {} slots ({} crossings)",
        config.slot_configs.len(),
        config.crossing_count
    );

    match greedy_fill(config, options.greedy_options_per_slot) {
        Ok(state) => {
            statistics.total_time = start.elapsed();
            debug!("Greedy fill succeeded: {statistics:?}");
            return Ok(FillSuccess {
                statistics,
                choices: state.choices,
                fill: state.fill,
                method: FillMethod::Greedy,
            });
        }
        Err(failure) => debug!("Greedy fill failed ({failure}), starting search"),
    }

    // We cap the number of backtracks for each retry so that we don't get hung up for too long on a
    // bad starting point.
    let mut max_backtracks = options.initial_max_backtracks;
    let mut attempts = vec![];

    for retry_num in 0..options.max_retries {
        debug!("Attempt {retry_num}: max backtracks = {max_backtracks}");

        let seed = retry_num as u64;
        let result = match options.rng {
            RngStrategy::Lcg => run_attempt(
                config,
                options,
                max_backtracks,
                &mut Lcg::new(seed),
                &mut statistics,
            ),
            RngStrategy::SmallRng => run_attempt(
                config,
                options,
                max_backtracks,
                &mut RngStrategy::small_rng(seed),
                &mut statistics,
            ),
        };

        match result {
            Ok(state) => {
                statistics.retries = retry_num;
                statistics.total_time = start.elapsed();
                debug!("Attempt {retry_num} succeeded: {statistics:?}");
                return Ok(FillSuccess {
                    statistics,
                    choices: state.choices,
                    fill: state.fill,
                    method: FillMethod::Search,
                });
            }
            Err(failure) => {
                debug!("Attempt {retry_num} failed: {failure}");
                attempts.push(failure);
                max_backtracks = next_max_backtracks(max_backtracks, options);
            }
        }
    }

    statistics.total_time = start.elapsed();
    debug!("No fill found: {statistics:?}");
    Err(FillFailure {
        statistics,
        attempts,
    })
}

#[cfg(test)]
mod tests {
    use crate::backtracking_search::{
        find_fill, next_max_backtracks, run_attempt, transition_after_slot_failure,
        AttemptFailure, FillMethod, FillOptions, SearchState, Statistics,
    };
    use crate::grid_config::{generate_grid_config, render_grid, Choice, Grid, GridConfig};
    use crate::random::{Lcg, RngStrategy};
    use crate::word_list::WordList;
    use std::collections::HashSet;

    fn generate_config(template: &str, words: &[&str]) -> GridConfig {
        let grid = Grid::from_template(template).unwrap();
        generate_grid_config(&grid, &WordList::new(words))
    }

    const CORNER: &str = "
        ...
        .##
        .##
    ";

    const RING: &str = "
        ....
        .##.
        .##.
        ....
    ";

    const RING_WORDS: &[&str] = &[
        "ABLE;60", "ACHE;50", "ALOE;55", "AREA;40", "BASE;45", "BEAD;30", "BODE;20", "CASE;35",
        "DEAR;50", "EASE;30", "ERAS;25", "ESPY;10", "NOSE;40", "ROSE;55", "SEAR;30", "TEAS;20",
    ];

    /// Check that a fill is consistent with the grid: every slot is filled with one of its options,
    /// crossing slots agree, and no word is used twice.
    fn assert_valid_fill(config: &GridConfig, choices: &[Choice], fill: &[Option<char>]) {
        assert_eq!(choices.len(), config.slot_configs.len());

        let mut seen = HashSet::new();
        for choice in choices {
            let slot_config = &config.slot_configs[choice.slot_id];
            let word = &config.choice_word(choice).word;
            assert!(seen.insert(word.clone()), "{word} used twice");

            let letters: String = slot_config
                .cell_coords
                .iter()
                .map(|&coord| fill[config.cell_index(coord)].unwrap())
                .collect();
            assert_eq!(&letters, word);

            for (letter, pattern_letter) in word.chars().zip(slot_config.pattern.chars()) {
                assert!(pattern_letter == '?' || pattern_letter == letter);
            }
        }
    }

    #[test]
    fn test_next_max_backtracks() {
        let options = FillOptions::default();
        assert_eq!(next_max_backtracks(1000, &options), 1200);
        assert_eq!(next_max_backtracks(1200, &options), 1440);
        assert_eq!(next_max_backtracks(100, &options), 200);
        assert_eq!(next_max_backtracks(0, &options), 100);

        // Budgets saturate instead of overflowing.
        assert_eq!(next_max_backtracks(usize::MAX, &options), usize::MAX);
        assert_eq!(next_max_backtracks(usize::MAX - 50, &options), usize::MAX);
    }

    #[test]
    fn test_transition_after_slot_failure() {
        let rejected = Some(Choice {
            slot_id: 2,
            word_id: 7,
        });

        assert_eq!(
            transition_after_slot_failure(1, 3, 2, rejected),
            SearchState::Failed(AttemptFailure::SlotExhausted { slot_id: 2 })
        );
        assert_eq!(
            transition_after_slot_failure(3, 3, 2, rejected),
            SearchState::Backtrack(rejected)
        );
        assert_eq!(
            transition_after_slot_failure(1, 1, 2, None),
            SearchState::Backtrack(None)
        );
    }

    #[test]
    fn test_attempt_succeeds() {
        let config = generate_config(CORNER, &["CAT;10", "CAR;5"]);
        let mut statistics = Statistics::default();

        let state = run_attempt(
            &config,
            &FillOptions::default(),
            1000,
            &mut Lcg::new(0),
            &mut statistics,
        )
        .expect("Failed to find a fill");

        assert_eq!(render_grid(&config, &state.choices), "CAT\nA##\nR##");
        assert_valid_fill(&config, &state.choices, &state.fill);
        assert_eq!(statistics.backtracks, 0);
        assert_eq!(statistics.states, 3);
    }

    #[test]
    fn test_attempt_fails_without_backtracking_by_default() {
        let config = generate_config(CORNER, &["CAT;10", "DOG;10"]);
        let mut statistics = Statistics::default();

        let result = run_attempt(
            &config,
            &FillOptions::default(),
            1000,
            &mut Lcg::new(0),
            &mut statistics,
        );

        assert!(matches!(result, Err(AttemptFailure::SlotExhausted { .. })));
        assert_eq!(statistics.backtracks, 0);
    }

    #[test]
    fn test_attempt_backtracks_after_repeated_failures() {
        let config = generate_config(CORNER, &["CAT;10", "DOG;10"]);
        let options = FillOptions {
            failures_before_backtrack: 1,
            ..FillOptions::default()
        };

        // The second slot fails, so we undo the first one and rule its word out. The first slot
        // then takes the other word, leaving nothing for the second.
        let mut statistics = Statistics::default();
        let result = run_attempt(&config, &options, 1000, &mut Lcg::new(0), &mut statistics);
        assert!(matches!(
            result,
            Err(AttemptFailure::SlotUnsatisfiable { .. })
        ));
        assert_eq!(statistics.backtracks, 2);
        assert_eq!(statistics.restricted_branchings, 1);

        let mut statistics = Statistics::default();
        let result = run_attempt(&config, &options, 1, &mut Lcg::new(0), &mut statistics);
        assert_eq!(result.unwrap_err(), AttemptFailure::BacktrackLimitExceeded(1));
        assert_eq!(statistics.backtracks, 2);
    }

    #[test]
    fn test_attempts_are_deterministic() {
        let config = generate_config(RING, RING_WORDS);
        let options = FillOptions {
            failures_before_backtrack: 1,
            learn_crossing_weights: true,
            ..FillOptions::default()
        };

        for strategy in [RngStrategy::Lcg, RngStrategy::SmallRng] {
            let run = |seed| {
                let mut statistics = Statistics::default();
                let result = match strategy {
                    RngStrategy::Lcg => {
                        run_attempt(&config, &options, 50, &mut Lcg::new(seed), &mut statistics)
                    }
                    RngStrategy::SmallRng => run_attempt(
                        &config,
                        &options,
                        50,
                        &mut RngStrategy::small_rng(seed),
                        &mut statistics,
                    ),
                };
                (result.map(|state| state.choices), statistics)
            };

            for seed in 0..5 {
                assert_eq!(run(seed), run(seed));
            }
        }
    }

    #[test]
    fn test_find_fill_for_corner() {
        let config = generate_config(CORNER, &["CAT;10", "DOG;10", "CAR;5"]);

        let result = find_fill(&config, &FillOptions::default()).expect("Failed to find a fill");

        assert_eq!(result.method, FillMethod::Greedy);
        assert_eq!(result.statistics.states, 0);
        assert_eq!(render_grid(&config, &result.choices), "CAT\nA##\nR##");
        assert_valid_fill(&config, &result.choices, &result.fill);
    }

    #[test]
    fn test_find_fill_for_ring() {
        let config = generate_config(RING, RING_WORDS);

        let result = find_fill(&config, &FillOptions::default()).expect("Failed to find a fill");

        assert_eq!(result.method, FillMethod::Search);
        assert_eq!(result.statistics.retries, 2);
        assert_eq!(
            render_grid(&config, &result.choices),
            "ABLE\nR##A\nE##S\nALOE"
        );
        assert_valid_fill(&config, &result.choices, &result.fill);
    }

    const SQUARE_WORDS: &[&str] = &["AB;90", "AC;80", "CD;70", "BD;60", "XY;50", "AX;40", "BY;30"];

    #[test]
    fn test_find_fill_searches_when_greedy_fails() {
        let config = generate_config(
            "
            ..
            ..
            ",
            SQUARE_WORDS,
        );

        let result = find_fill(&config, &FillOptions::default()).expect("Failed to find a fill");

        assert_eq!(result.method, FillMethod::Search);
        assert_eq!(result.statistics.retries, 0);
        assert_eq!(render_grid(&config, &result.choices), "AB\nCD");
        assert_valid_fill(&config, &result.choices, &result.fill);
    }

    #[test]
    fn test_find_fill_with_huge_limits() {
        let config = generate_config(
            "
            ..
            ..
            ",
            SQUARE_WORDS,
        );
        let options = FillOptions {
            max_retries: usize::MAX / 2,
            initial_max_backtracks: usize::MAX,
            min_backtrack_increment: usize::MAX,
            ..FillOptions::default()
        };

        let result = find_fill(&config, &options).expect("Failed to find a fill");
        assert_eq!(render_grid(&config, &result.choices), "AB\nCD");
    }

    #[test]
    fn test_find_fill_fails_gracefully() {
        let config = generate_config("Q..", &["CAT;10", "DOG;10"]);

        let failure = find_fill(&config, &FillOptions::default()).expect_err("Found an impossible fill??");

        assert_eq!(
            failure.attempts,
            vec![AttemptFailure::SlotUnsatisfiable { slot_id: 0 }; 5]
        );
        assert_eq!(failure.statistics.states, 5);
        assert_eq!(failure.statistics.backtracks, 0);
    }

    #[test]
    fn test_find_fill_never_repeats_words() {
        let config = generate_config(
            "
            .....
            #####
            .....
            ",
            &["APPLE:90", "APPLE;50", "MANGO;10"],
        );
        let result = find_fill(&config, &FillOptions::default()).unwrap();
        assert_eq!(render_grid(&config, &result.choices), "APPLE\n#####\nMANGO");

        let config = generate_config(
            "
            .....
            #####
            .....
            ",
            &["APPLE:90", "APPLE;50"],
        );
        let failure = find_fill(&config, &FillOptions::default()).unwrap_err();
        assert!(failure
            .attempts
            .iter()
            .all(|attempt| matches!(attempt, AttemptFailure::SlotExhausted { .. })));
    }

    #[test]
    fn test_find_fill_for_complete_grid() {
        let config = generate_config("CAT", &["DOG;10"]);

        let result = find_fill(&config, &FillOptions::default()).unwrap();

        assert_eq!(result.method, FillMethod::AlreadyComplete);
        assert!(result.choices.is_empty());
        assert_eq!(result.fill, vec![Some('C'), Some('A'), Some('T')]);
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use crate::backtracking_search::FillOptions;
    use crate::random::RngStrategy;

    #[test]
    fn test_fill_options_deserialization() {
        let options: FillOptions =
            serde_json::from_str(r#"{"max_retries": 2, "rng": "small_rng"}"#).unwrap();

        assert_eq!(options.max_retries, 2);
        assert_eq!(options.rng, RngStrategy::SmallRng);
        assert_eq!(options.initial_max_backtracks, 1000);
        assert!(!options.learn_crossing_weights);
    }
}
