//! The mutable state of a single fill attempt. A `FillState` is built fresh from a `GridConfig` for
//! the greedy pass and for every retry, so nothing one attempt does can leak into the next.

use std::collections::HashSet;
use std::fmt;
use std::fmt::{Debug, Formatter};

use crate::dupe_index::PlacedWords;
use crate::grid_config::{Choice, Direction, GridConfig, SlotConfig};
use crate::types::{GridCoord, SlotId, WordId};

/// A struct tracking the live state of a single slot during filling.
#[derive(Clone)]
pub struct Slot {
    /// Property duplicated from `SlotConfig` for convenience.
    pub id: SlotId,

    /// Words ruled out for this slot during the current attempt. These are stored as strings rather
    /// than `WordId`s, so eliminating a word also rules out any duplicate dictionary entries for it.
    pub eliminations: HashSet<String>,

    /// How many options are still available for this slot: the number of options whose word isn't
    /// in `eliminations`, or exactly 1 while the slot is fixed.
    pub remaining_option_count: usize,

    /// The option committed to this slot, if there is one.
    pub fixed_word_id: Option<WordId>,
}

impl Debug for Slot {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("Slot")
            .field("id", &self.id)
            .field(
                "eliminations",
                &format!("({} eliminations)", self.eliminations.len()),
            )
            .field("remaining_option_count", &self.remaining_option_count)
            .field("fixed_word_id", &self.fixed_word_id)
            .finish()
    }
}

impl Slot {
    fn new(slot_config: &SlotConfig) -> Slot {
        Slot {
            id: slot_config.id,
            eliminations: HashSet::new(),
            remaining_option_count: slot_config.options.len(),
            fixed_word_id: None,
        }
    }

    #[must_use]
    pub fn is_fixed(&self) -> bool {
        self.fixed_word_id.is_some()
    }

    /// Can this slot still be chosen for filling?
    #[must_use]
    pub fn is_eligible(&self) -> bool {
        !self.is_fixed() && self.remaining_option_count > 0
    }

    fn count_available(&self, slot_config: &SlotConfig) -> usize {
        slot_config
            .options
            .iter()
            .filter(|option| !self.eliminations.contains(&option.word))
            .count()
    }

    fn recompute_remaining(&mut self, slot_config: &SlotConfig) {
        self.remaining_option_count = if self.is_fixed() {
            1
        } else {
            self.count_available(slot_config)
        };
    }
}

/// Why a word couldn't be placed in a slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlacementRejection {
    /// The given cell already holds a different letter.
    LetterConflict(GridCoord),

    /// The word is already placed somewhere else in the grid.
    DuplicateWord,
}

/// All of the state that a fill attempt mutates.
#[derive(Clone)]
pub struct FillState<'a> {
    pub config: &'a GridConfig,

    /// Live slots, indexed by `SlotId`.
    pub slots: Vec<Slot>,

    /// The working letters of the grid, in the same layout as `GridConfig.fill`.
    pub fill: Vec<Option<char>>,

    /// The undo log: every placement made so far, in order.
    pub choices: Vec<Choice>,

    pub placed_words: PlacedWords,
}

impl<'a> Debug for FillState<'a> {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("FillState")
            .field("slots", &self.slots)
            .field("choices", &self.choices)
            .field("placed_words", &self.placed_words.len())
            .finish_non_exhaustive()
    }
}

impl<'a> FillState<'a> {
    #[must_use]
    pub fn new(config: &'a GridConfig) -> FillState<'a> {
        FillState {
            config,
            slots: config.slot_configs.iter().map(Slot::new).collect(),
            fill: config.fill.clone(),
            choices: Vec::with_capacity(config.slot_configs.len()),
            placed_words: PlacedWords::new(),
        }
    }

    /// The ids of a slot's options that haven't been eliminated, best first.
    #[must_use]
    pub fn available_word_ids(&self, slot_id: SlotId) -> Vec<WordId> {
        let slot = &self.slots[slot_id];
        self.config.slot_configs[slot_id]
            .options
            .iter()
            .enumerate()
            .filter(|(_, option)| !slot.eliminations.contains(&option.word))
            .map(|(word_id, _)| word_id)
            .collect()
    }

    /// Check whether a word could be placed in a slot given the current working letters and the
    /// words already placed.
    pub fn check_placement(&self, slot_id: SlotId, word_id: WordId) -> Result<(), PlacementRejection> {
        let slot_config = &self.config.slot_configs[slot_id];
        let word = &slot_config.options[word_id].word;

        for (&coord, letter) in slot_config.cell_coords.iter().zip(word.chars()) {
            if let Some(existing) = self.fill[self.config.cell_index(coord)] {
                if existing != letter {
                    return Err(PlacementRejection::LetterConflict(coord));
                }
            }
        }

        if self.placed_words.contains(word) {
            return Err(PlacementRejection::DuplicateWord);
        }

        Ok(())
    }

    /// Commit a word to a slot if it fits: write its letters, fix the slot, and record the choice.
    pub fn try_place_word(
        &mut self,
        slot_id: SlotId,
        word_id: WordId,
    ) -> Result<(), PlacementRejection> {
        self.check_placement(slot_id, word_id)?;

        let config = self.config;
        let slot_config = &config.slot_configs[slot_id];
        let word = &slot_config.options[word_id].word;

        for (&coord, letter) in slot_config.cell_coords.iter().zip(word.chars()) {
            self.fill[config.cell_index(coord)] = Some(letter);
        }

        let slot = &mut self.slots[slot_id];
        slot.fixed_word_id = Some(word_id);
        slot.remaining_option_count = 1;

        self.choices.push(Choice { slot_id, word_id });
        self.placed_words.insert(word);

        Ok(())
    }

    /// Rule a word out for a slot for the rest of this attempt.
    pub fn eliminate_word(&mut self, slot_id: SlotId, word_id: WordId) {
        let slot_config = &self.config.slot_configs[slot_id];
        let slot = &mut self.slots[slot_id];

        slot.eliminations
            .insert(slot_config.options[word_id].word.clone());
        slot.recompute_remaining(slot_config);
    }

    /// Is a cell's letter pinned in place while erasing a word running in `direction`? Letters
    /// given in the input grid always are, and so are letters belonging to a fully-lettered word
    /// in the crossing direction.
    #[must_use]
    pub fn is_cell_locked(&self, coord: GridCoord, direction: Direction) -> bool {
        if self.config.fill[self.config.cell_index(coord)].is_some() {
            return true;
        }

        self.config
            .grid_word_through(coord, direction.other())
            .map_or(false, |crossing_word| {
                crossing_word
                    .cells
                    .iter()
                    .all(|&cell| self.fill[self.config.cell_index(cell)].is_some())
            })
    }

    /// Pop the most recent choice, erasing its unlocked letters, unfixing its slot, and releasing
    /// its word. Returns the undone choice, or `None` if there was nothing to undo.
    pub fn undo_last_choice(&mut self) -> Option<Choice> {
        let choice = self.choices.pop()?;
        let config = self.config;
        let slot_config = &config.slot_configs[choice.slot_id];

        let cleared: Vec<GridCoord> = slot_config
            .cell_coords
            .iter()
            .copied()
            .filter(|&coord| !self.is_cell_locked(coord, slot_config.direction))
            .collect();
        for coord in cleared {
            self.fill[config.cell_index(coord)] = None;
        }

        let slot = &mut self.slots[choice.slot_id];
        slot.fixed_word_id = None;
        slot.recompute_remaining(slot_config);

        self.placed_words
            .remove(&slot_config.options[choice.word_id].word);

        Some(choice)
    }

    /// Has every slot been filled?
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.slots.iter().all(Slot::is_fixed)
    }

    /// Verify the bookkeeping that ties slots, choices, and placed words together, returning a
    /// description of the first problem found.
    pub fn check_invariants(&self) -> Result<(), String> {
        let fixed_count = self.slots.iter().filter(|slot| slot.is_fixed()).count();
        if fixed_count != self.choices.len() {
            return Err(format!(
                "{} fixed slots but {} choices",
                fixed_count,
                self.choices.len()
            ));
        }

        for choice in &self.choices {
            if self.slots[choice.slot_id].fixed_word_id != Some(choice.word_id) {
                return Err(format!("choice {choice:?} doesn't match its slot"));
            }
        }

        let chosen_words: HashSet<&str> = self
            .choices
            .iter()
            .map(|choice| self.config.choice_word(choice).word.as_str())
            .collect();
        let placed_words: HashSet<&str> = self.placed_words.iter().collect();
        if chosen_words != placed_words {
            return Err(format!(
                "placed words {placed_words:?} don't match choices {chosen_words:?}"
            ));
        }

        for slot in &self.slots {
            let slot_config = &self.config.slot_configs[slot.id];
            let expected = if slot.is_fixed() {
                1
            } else {
                slot.count_available(slot_config)
            };
            if slot.remaining_option_count != expected {
                return Err(format!(
                    "slot {} has remaining_option_count {}, expected {}",
                    slot.id, slot.remaining_option_count, expected
                ));
            }
        }

        Ok(())
    }
}
