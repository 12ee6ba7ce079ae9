//! The query surface that hosts (the CLI and the wasm binding) drive: load a word list, fill a
//! grid in place, and report how complete a grid is.

use log::{debug, warn};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

use crate::backtracking_search::{find_fill, FillFailure, FillMethod, FillOptions, Statistics};
use crate::grid_config::{generate_grid_config, Grid};
use crate::word_list::WordList;

pub const ALREADY_COMPLETE_MESSAGE: &str = "Grid is already complete!";
pub const FILLED_MESSAGE: &str = "Grid filled successfully!";
pub const NO_SOLUTION_MESSAGE: &str =
    "Could not find a valid solution. Try adding more words to your dictionary.";

#[derive(Error, Debug)]
pub enum FillError {
    #[error("No word list loaded. Please load a dictionary first.")]
    NoDictionaryLoaded,

    #[error("Could not find a valid solution. Try adding more words to your dictionary.")]
    AllRetriesExhausted(#[source] FillFailure),
}

/// The user-facing outcome of a fill.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct FillResult {
    pub success: bool,
    pub message: String,
}

/// How many of a grid's words are complete.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct GridStats {
    pub total_words: usize,
    pub filled_words: usize,
    pub empty_words: usize,

    /// `filled_words` as a rounded percentage of `total_words`, or 0 for a grid with no words.
    pub completion_percentage: u32,
}

/// Count the complete and incomplete words in a grid.
#[must_use]
pub fn grid_stats(grid: &Grid) -> GridStats {
    let words = grid.words();
    let total_words = words.len();
    let filled_words = words.iter().filter(|word| word.is_complete(grid)).count();

    let completion_percentage = if total_words == 0 {
        0
    } else {
        (filled_words as f64 * 100.0 / total_words as f64).round() as u32
    };

    GridStats {
        total_words,
        filled_words,
        empty_words: total_words - filled_words,
        completion_percentage,
    }
}

/// A fill session: holds the loaded word list, the options to fill with, and the statistics of
/// the most recent fill.
#[derive(Debug, Default)]
pub struct AutoFill {
    word_list: Option<WordList>,
    options: FillOptions,
    statistics: Statistics,
}

impl AutoFill {
    #[must_use]
    pub fn new(options: FillOptions) -> AutoFill {
        AutoFill {
            options,
            ..AutoFill::default()
        }
    }

    /// Load word list entries like `"CAT;10"`, `"DOG:5"` or `"EMU"`, replacing any previous list.
    pub fn set_word_list<S: AsRef<str>>(&mut self, entries: &[S]) {
        self.set_dictionary(WordList::new(entries));
    }

    /// Replace the word list with one that's already been loaded.
    pub fn set_dictionary(&mut self, word_list: WordList) {
        for error in &word_list.errors {
            warn!("{error}");
        }
        debug!("Auto-fill loaded with {} words", word_list.len());
        self.word_list = Some(word_list);
    }

    #[must_use]
    pub fn word_list(&self) -> Option<&WordList> {
        self.word_list.as_ref()
    }

    /// Statistics from the most recent fill.
    #[must_use]
    pub fn statistics(&self) -> &Statistics {
        &self.statistics
    }

    /// Fill every incomplete word in `grid`. The grid is only modified if a fill is found.
    pub fn fill_grid(&mut self, grid: &mut Grid) -> Result<FillMethod, FillError> {
        let word_list = match &self.word_list {
            Some(word_list) if !word_list.is_empty() => word_list,
            _ => return Err(FillError::NoDictionaryLoaded),
        };

        self.statistics = Statistics::default();
        let config = generate_grid_config(grid, word_list);

        match find_fill(&config, &self.options) {
            Ok(success) => {
                self.statistics = success.statistics;
                grid.apply_fill(&success.fill);
                Ok(success.method)
            }
            Err(failure) => {
                self.statistics = failure.statistics.clone();
                Err(FillError::AllRetriesExhausted(failure))
            }
        }
    }

    /// Fill `grid` and describe the outcome for a user. Only a missing word list is an error;
    /// failing to find a fill is reported as an unsuccessful `FillResult`.
    pub fn auto_fill_grid(&mut self, grid: &mut Grid) -> Result<FillResult, FillError> {
        match self.fill_grid(grid) {
            Ok(method) => Ok(FillResult {
                success: true,
                message: match method {
                    FillMethod::AlreadyComplete => ALREADY_COMPLETE_MESSAGE,
                    FillMethod::Greedy | FillMethod::Search => FILLED_MESSAGE,
                }
                .into(),
            }),
            Err(FillError::AllRetriesExhausted(failure)) => {
                debug!("{failure}: {:?}", failure.attempts);
                Ok(FillResult {
                    success: false,
                    message: NO_SOLUTION_MESSAGE.into(),
                })
            }
            Err(error) => Err(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::autofill::{
        grid_stats, AutoFill, FillError, GridStats, ALREADY_COMPLETE_MESSAGE, FILLED_MESSAGE,
        NO_SOLUTION_MESSAGE,
    };
    use crate::backtracking_search::FillOptions;
    use crate::grid_config::Grid;

    #[test]
    fn test_requires_word_list() {
        let mut auto_fill = AutoFill::default();
        let mut grid = Grid::from_template("...").unwrap();

        let error = auto_fill.auto_fill_grid(&mut grid).unwrap_err();
        assert!(matches!(error, FillError::NoDictionaryLoaded));
        assert_eq!(
            error.to_string(),
            "No word list loaded. Please load a dictionary first."
        );

        // The dictionary is checked even when there's nothing to fill.
        let mut complete = Grid::from_template("CAT").unwrap();
        auto_fill.set_word_list::<&str>(&[]);
        assert!(auto_fill.auto_fill_grid(&mut complete).is_err());
    }

    #[test]
    fn test_fills_grid_in_place() {
        let mut auto_fill = AutoFill::new(FillOptions::default());
        auto_fill.set_word_list(&["CAT;10", "DOG;10", "CAR;5"]);

        let mut grid = Grid::from_template(
            "
            ...
            .##
            .##
            ",
        )
        .unwrap();

        let result = auto_fill.auto_fill_grid(&mut grid).unwrap();

        assert!(result.success);
        assert_eq!(result.message, FILLED_MESSAGE);
        assert_eq!(grid.render(), "CAT\nA##\nR##");
        assert_eq!(grid_stats(&grid).empty_words, 0);
        assert_eq!(auto_fill.statistics().retries, 0);
    }

    #[test]
    fn test_reports_failure_without_touching_grid() {
        let mut auto_fill = AutoFill::default();
        auto_fill.set_word_list(&["CAT;10", "DOG;10"]);

        let mut grid = Grid::from_template("Q..").unwrap();
        let result = auto_fill.auto_fill_grid(&mut grid).unwrap();

        assert!(!result.success);
        assert_eq!(result.message, NO_SOLUTION_MESSAGE);
        assert_eq!(grid.render(), "Q..");
        assert_eq!(auto_fill.statistics().states, 5);
    }

    #[test]
    fn test_already_complete() {
        let mut auto_fill = AutoFill::default();
        auto_fill.set_word_list(&["DOG;10"]);

        let mut grid = Grid::from_template("CAT").unwrap();
        let result = auto_fill.auto_fill_grid(&mut grid).unwrap();

        assert!(result.success);
        assert_eq!(result.message, ALREADY_COMPLETE_MESSAGE);
    }

    #[test]
    fn test_grid_stats() {
        let grid = Grid::from_template(
            "
            CAT
            A#.
            B..
            ",
        )
        .unwrap();

        assert_eq!(
            grid_stats(&grid),
            GridStats {
                total_words: 4,
                filled_words: 2,
                empty_words: 2,
                completion_percentage: 50,
            }
        );

        let grid = Grid::from_template("#.#").unwrap();
        assert_eq!(grid_stats(&grid).completion_percentage, 0);
        assert_eq!(grid_stats(&grid).total_words, 0);
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use crate::autofill::FillResult;

    #[test]
    fn test_fill_result_serialization() {
        let result = FillResult {
            success: true,
            message: "Grid filled successfully!".into(),
        };

        assert_eq!(
            serde_json::to_string(&result).unwrap(),
            r#"{"success":true,"message":"Grid filled successfully!"}"#
        );
    }
}
