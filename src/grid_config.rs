//! This module implements the grid snapshot that fills are read from and written back to, plus the
//! static slot graph (slots, options, crossings) derived from it before any search happens.

use smallvec::SmallVec;
use std::collections::HashMap;
use std::fmt;
use std::fmt::Debug;
use thiserror::Error;

#[cfg(feature = "serde")]
use serde_derive::{Deserialize, Serialize};

use crate::types::{CrossingId, GridCoord, SlotId, WordId};
use crate::word_list::{WordList, WordOption};
use crate::MAX_SLOT_LENGTH;

/// The direction that a slot is facing.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Direction {
    Across,
    Down,
}

impl Direction {
    #[must_use]
    pub fn other(self) -> Direction {
        match self {
            Direction::Across => Direction::Down,
            Direction::Down => Direction::Across,
        }
    }

    fn step(self, (row, col): GridCoord) -> GridCoord {
        match self {
            Direction::Across => (row, col + 1),
            Direction::Down => (row + 1, col),
        }
    }

    fn step_back(self, (row, col): GridCoord) -> Option<GridCoord> {
        match self {
            Direction::Across => col.checked_sub(1).map(|col| (row, col)),
            Direction::Down => row.checked_sub(1).map(|row| (row, col)),
        }
    }

    fn index(self) -> usize {
        match self {
            Direction::Across => 0,
            Direction::Down => 1,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GridError {
    #[error("Grid must have at least one row and one column")]
    Empty,

    #[error("Grid row {row} has {found} cells, expected {expected}")]
    Ragged {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Grid contains invalid character “{ch}” at row {row}, column {col}")]
    InvalidCharacter { ch: char, row: usize, col: usize },

    #[error("Cell {0:?} is outside the grid")]
    OutOfBounds(GridCoord),

    #[error("Cell {0:?} is a black square")]
    BlockCell(GridCoord),
}

/// A single square of the grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cell {
    Block,
    Open(Option<char>),
}

/// A maximal run of two or more non-black cells in one direction, i.e. one crossword answer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordSpan {
    pub direction: Direction,
    pub cells: Vec<GridCoord>,
}

impl WordSpan {
    #[must_use]
    pub fn start_cell(&self) -> GridCoord {
        self.cells[0]
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.cells.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    /// The current letters of this word, with `?` for empty cells.
    #[must_use]
    pub fn pattern(&self, grid: &Grid) -> String {
        self.cells
            .iter()
            .map(|&coord| grid.letter(coord).unwrap_or('?'))
            .collect()
    }

    #[must_use]
    pub fn is_complete(&self, grid: &Grid) -> bool {
        self.cells.iter().all(|&coord| grid.letter(coord).is_some())
    }
}

/// The grid snapshot: a rectangle of cells that are either black squares or open squares holding
/// an optional letter.
#[derive(Clone, PartialEq, Eq)]
pub struct Grid {
    width: usize,
    height: usize,

    /// Cells in order of row and then column.
    cells: Vec<Cell>,
}

impl Grid {
    /// Parse a grid from a template string with `#` representing blocks, `.` or `?` representing
    /// empty cells, and letters representing themselves. Blank lines and surrounding whitespace
    /// are ignored.
    pub fn from_template(template: &str) -> Result<Grid, GridError> {
        let rows: Vec<Vec<char>> = template
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(|line| line.chars().collect())
            .collect();

        let Some(first_row) = rows.first() else {
            return Err(GridError::Empty);
        };
        let width = first_row.len();

        let mut cells = Vec::with_capacity(width * rows.len());
        for (row, line) in rows.iter().enumerate() {
            if line.len() != width {
                return Err(GridError::Ragged {
                    row,
                    expected: width,
                    found: line.len(),
                });
            }

            for (col, &ch) in line.iter().enumerate() {
                cells.push(match ch {
                    '#' => Cell::Block,
                    '.' | '?' => Cell::Open(None),
                    c if c.is_ascii_alphabetic() => Cell::Open(Some(c.to_ascii_uppercase())),
                    _ => return Err(GridError::InvalidCharacter { ch, row, col }),
                });
            }
        }

        Ok(Grid {
            width,
            height: rows.len(),
            cells,
        })
    }

    #[must_use]
    pub fn width(&self) -> usize {
        self.width
    }

    #[must_use]
    pub fn height(&self) -> usize {
        self.height
    }

    fn index(&self, (row, col): GridCoord) -> Option<usize> {
        (row < self.height && col < self.width).then_some(row * self.width + col)
    }

    /// The cell at the given coords, or `None` if they're outside the grid.
    #[must_use]
    pub fn cell(&self, coord: GridCoord) -> Option<Cell> {
        self.index(coord).map(|idx| self.cells[idx])
    }

    #[must_use]
    pub fn is_block(&self, coord: GridCoord) -> bool {
        matches!(self.cell(coord), Some(Cell::Block))
    }

    #[must_use]
    pub fn letter(&self, coord: GridCoord) -> Option<char> {
        match self.cell(coord) {
            Some(Cell::Open(letter)) => letter,
            _ => None,
        }
    }

    pub fn set_letter(&mut self, coord: GridCoord, letter: Option<char>) -> Result<(), GridError> {
        let idx = self.index(coord).ok_or(GridError::OutOfBounds(coord))?;
        match self.cells[idx] {
            Cell::Block => Err(GridError::BlockCell(coord)),
            Cell::Open(_) => {
                self.cells[idx] = Cell::Open(letter.map(|c| c.to_ascii_uppercase()));
                Ok(())
            }
        }
    }

    pub fn set_block(&mut self, coord: GridCoord, block: bool) -> Result<(), GridError> {
        let idx = self.index(coord).ok_or(GridError::OutOfBounds(coord))?;
        self.cells[idx] = if block { Cell::Block } else { Cell::Open(None) };
        Ok(())
    }

    /// The word running through the given cell in the given direction. Black squares and runs of
    /// a single cell don't belong to any word.
    #[must_use]
    pub fn word_at(&self, coord: GridCoord, direction: Direction) -> Option<WordSpan> {
        if !matches!(self.cell(coord)?, Cell::Open(_)) {
            return None;
        }

        let mut start = coord;
        while let Some(prev) = direction.step_back(start) {
            if self.is_block(prev) {
                break;
            }
            start = prev;
        }

        let mut cells = vec![start];
        let mut next = direction.step(start);
        while matches!(self.cell(next), Some(Cell::Open(_))) {
            cells.push(next);
            next = direction.step(next);
        }

        (cells.len() > 1).then_some(WordSpan { direction, cells })
    }

    /// Every word in the grid: across words in order of their starting cell (row, then column),
    /// followed by down words in the same order.
    #[must_use]
    pub fn words(&self) -> Vec<WordSpan> {
        let mut words = vec![];

        for direction in [Direction::Across, Direction::Down] {
            for row in 0..self.height {
                for col in 0..self.width {
                    if let Some(word) = self.word_at((row, col), direction) {
                        if word.start_cell() == (row, col) {
                            words.push(word);
                        }
                    }
                }
            }
        }

        words
    }

    /// The letters of every cell in order of row and then column; `None` for blocks and empty
    /// cells.
    #[must_use]
    pub fn letters(&self) -> Vec<Option<char>> {
        self.cells
            .iter()
            .map(|cell| match cell {
                Cell::Open(letter) => *letter,
                Cell::Block => None,
            })
            .collect()
    }

    /// Write a flat fill (in the same layout as `letters()`) into the grid's open cells.
    pub fn apply_fill(&mut self, fill: &[Option<char>]) {
        for (cell, &letter) in self.cells.iter_mut().zip(fill) {
            if let Cell::Open(current) = cell {
                *current = letter;
            }
        }
    }

    /// Render the grid in the same format that `from_template` accepts.
    #[must_use]
    pub fn render(&self) -> String {
        self.cells
            .chunks(self.width)
            .map(|line| {
                line.iter()
                    .map(|cell| match cell {
                        Cell::Block => '#',
                        Cell::Open(letter) => letter.unwrap_or('.'),
                    })
                    .collect::<String>()
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.render())
    }
}

impl Debug for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Grid {}x{}:\n{}", self.width, self.height, self.render())
    }
}

/// A struct representing a crossing between one slot and another, referencing the other slot's id
/// and the location of the intersection within both slots.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Crossing {
    pub other_slot_id: SlotId,
    pub this_slot_cell: usize,
    pub other_slot_cell: usize,
    pub crossing_id: CrossingId,
}

/// A struct representing the aspects of a slot in the grid that are static during filling.
#[derive(Debug, Clone)]
pub struct SlotConfig {
    pub id: SlotId,
    pub direction: Direction,

    /// The slot's letters at the time the graph was built, with `?` for empty cells.
    pub pattern: String,

    pub length: usize,
    pub cell_coords: Vec<GridCoord>,

    /// Dictionary words matching `pattern`, best first. `WordId`s index into this list.
    pub options: Vec<WordOption>,

    pub crossings: SmallVec<[Crossing; MAX_SLOT_LENGTH]>,
}

impl SlotConfig {
    /// Generate the indices of this slot's cells in a flat fill array like `GridConfig.fill`.
    #[must_use]
    pub fn cell_fill_indices(&self, grid_width: usize) -> Vec<usize> {
        self.cell_coords
            .iter()
            .map(|&(row, col)| row * grid_width + col)
            .collect()
    }
}

/// A struct holding all of the static information needed as input to a crossword filling
/// operation. This is built once per fill and shared (read-only) by every attempt.
#[derive(Debug, Clone)]
pub struct GridConfig {
    /// The width and height of the grid.
    pub width: usize,
    pub height: usize,

    /// A flat array of letters given in the input grid, in order of row and then column. `None`
    /// can represent a block or an unfilled cell.
    pub fill: Vec<Option<char>>,

    /// Which cells are black squares, in the same layout as `fill`.
    pub blocks: Vec<bool>,

    /// Config representing all of the incomplete slots in the grid and their crossings.
    pub slot_configs: Vec<SlotConfig>,

    /// The number of distinct crossings represented in all of the `slot_configs`.
    pub crossing_count: usize,

    /// Every word in the grid, complete or not, in `Grid::words` order.
    pub grid_words: Vec<WordSpan>,

    /// For each cell, the index in `grid_words` of the across and down words through it.
    pub grid_word_by_cell: Vec<[Option<usize>; 2]>,
}

impl GridConfig {
    #[must_use]
    pub fn cell_index(&self, (row, col): GridCoord) -> usize {
        row * self.width + col
    }

    /// The grid word through a cell in the given direction, if any, without needing the live
    /// grid.
    #[must_use]
    pub fn grid_word_through(&self, coord: GridCoord, direction: Direction) -> Option<&WordSpan> {
        self.grid_word_by_cell
            .get(self.cell_index(coord))?
            .get(direction.index())
            .copied()
            .flatten()
            .map(|word_idx| &self.grid_words[word_idx])
    }

    /// Look up the option referenced by a choice.
    #[must_use]
    pub fn choice_word(&self, choice: &Choice) -> &WordOption {
        &self.slot_configs[choice.slot_id].options[choice.word_id]
    }
}

/// Given the words of a grid that still need filling, generate `SlotConfig`s containing derived
/// information about crossings. Returns the configs along with the number of distinct crossings.
#[must_use]
pub fn generate_slot_configs(
    grid: &Grid,
    word_list: &WordList,
    words: &[&WordSpan],
) -> (Vec<SlotConfig>, usize) {
    // Build a map from cell location to slots involved, which we can then use to calculate
    // crossings.
    let mut slots_by_loc: HashMap<GridCoord, Vec<(SlotId, usize)>> = HashMap::new();
    for (slot_id, word) in words.iter().enumerate() {
        for (cell_idx, &loc) in word.cells.iter().enumerate() {
            slots_by_loc.entry(loc).or_default().push((slot_id, cell_idx));
        }
    }

    // Both sides of a crossing share one id: the first time we see a pair of slots we allocate the
    // next id, and when we see it again from the other side we reuse it.
    let mut crossing_ids: HashMap<(SlotId, SlotId), CrossingId> = HashMap::new();

    let slot_configs = words
        .iter()
        .enumerate()
        .map(|(slot_id, word)| {
            let mut crossings: SmallVec<[Crossing; MAX_SLOT_LENGTH]> = SmallVec::new();

            for (this_slot_cell, loc) in word.cells.iter().enumerate() {
                for &(other_slot_id, other_slot_cell) in &slots_by_loc[loc] {
                    if other_slot_id == slot_id
                        || crossings.iter().any(|c| c.other_slot_id == other_slot_id)
                    {
                        continue;
                    }

                    let key = (slot_id.min(other_slot_id), slot_id.max(other_slot_id));
                    let next_id = crossing_ids.len();
                    let crossing_id = *crossing_ids.entry(key).or_insert(next_id);

                    crossings.push(Crossing {
                        other_slot_id,
                        this_slot_cell,
                        other_slot_cell,
                        crossing_id,
                    });
                }
            }

            let pattern = word.pattern(grid);
            SlotConfig {
                id: slot_id,
                direction: word.direction,
                length: word.len(),
                cell_coords: word.cells.clone(),
                options: word_list.options_for(&pattern),
                pattern,
                crossings,
            }
        })
        .collect();

    (slot_configs, crossing_ids.len())
}

/// Build the static slot graph for a grid: one slot for each word with at least one empty cell,
/// with ids assigned in `Grid::words` order.
#[must_use]
pub fn generate_grid_config(grid: &Grid, word_list: &WordList) -> GridConfig {
    let grid_words = grid.words();

    let mut grid_word_by_cell = vec![[None, None]; grid.width() * grid.height()];
    for (word_idx, word) in grid_words.iter().enumerate() {
        for &(row, col) in &word.cells {
            grid_word_by_cell[row * grid.width() + col][word.direction.index()] = Some(word_idx);
        }
    }

    let incomplete_words: Vec<&WordSpan> = grid_words
        .iter()
        .filter(|word| !word.is_complete(grid))
        .collect();

    let (slot_configs, crossing_count) = generate_slot_configs(grid, word_list, &incomplete_words);

    let mut blocks = Vec::with_capacity(grid.width() * grid.height());
    for row in 0..grid.height() {
        for col in 0..grid.width() {
            blocks.push(grid.is_block((row, col)));
        }
    }

    GridConfig {
        width: grid.width(),
        height: grid.height(),
        fill: grid.letters(),
        blocks,
        slot_configs,
        crossing_count,
        grid_words,
        grid_word_by_cell,
    }
}

/// A struct recording a slot assignment made during a fill process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Choice {
    pub slot_id: SlotId,
    pub word_id: WordId,
}

/// Turn the given grid config and fill choices into a rendered string.
#[must_use]
pub fn render_grid(config: &GridConfig, choices: &[Choice]) -> String {
    let mut fill = config.fill.clone();

    for choice in choices {
        let slot_config = &config.slot_configs[choice.slot_id];
        let word = &config.choice_word(choice).word;

        for (&idx, letter) in slot_config
            .cell_fill_indices(config.width)
            .iter()
            .zip(word.chars())
        {
            fill[idx] = Some(letter);
        }
    }

    fill.chunks(config.width)
        .zip(config.blocks.chunks(config.width))
        .map(|(line, blocks)| {
            line.iter()
                .zip(blocks)
                .map(|(cell, &block)| if block { '#' } else { cell.unwrap_or('.') })
                .collect::<String>()
        })
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use crate::grid_config::{
        generate_grid_config, render_grid, Cell, Choice, Direction, Grid, GridError,
    };
    use crate::word_list::WordList;

    #[test]
    fn test_parses_templates() {
        let grid = Grid::from_template(
            "
            c.#
            ..?
            ",
        )
        .unwrap();

        assert_eq!((grid.width(), grid.height()), (3, 2));
        assert_eq!(grid.cell((0, 0)), Some(Cell::Open(Some('C'))));
        assert_eq!(grid.cell((0, 2)), Some(Cell::Block));
        assert_eq!(grid.cell((1, 2)), Some(Cell::Open(None)));
        assert_eq!(grid.cell((2, 0)), None);
        assert_eq!(grid.render(), "C.#\n...");

        assert_eq!(Grid::from_template("\n\n"), Err(GridError::Empty));
        assert_eq!(
            Grid::from_template("...\n.."),
            Err(GridError::Ragged {
                row: 1,
                expected: 3,
                found: 2
            })
        );
        assert_eq!(
            Grid::from_template("..*"),
            Err(GridError::InvalidCharacter {
                ch: '*',
                row: 0,
                col: 2
            })
        );
    }

    #[test]
    fn test_set_letter() {
        let mut grid = Grid::from_template(".#").unwrap();

        grid.set_letter((0, 0), Some('q')).unwrap();
        assert_eq!(grid.letter((0, 0)), Some('Q'));
        assert_eq!(
            grid.set_letter((0, 1), Some('A')),
            Err(GridError::BlockCell((0, 1)))
        );
        assert_eq!(
            grid.set_letter((3, 3), None),
            Err(GridError::OutOfBounds((3, 3)))
        );

        grid.set_block((0, 1), false).unwrap();
        assert!(!grid.is_block((0, 1)));
    }

    #[test]
    fn test_word_at() {
        let grid = Grid::from_template(
            "
            ...#
            .#..
            ",
        )
        .unwrap();

        let across = grid.word_at((0, 1), Direction::Across).unwrap();
        assert_eq!(across.cells, vec![(0, 0), (0, 1), (0, 2)]);

        let down = grid.word_at((1, 0), Direction::Down).unwrap();
        assert_eq!(down.cells, vec![(0, 0), (1, 0)]);

        // Single-cell runs and blocks aren't words.
        assert!(grid.word_at((0, 1), Direction::Down).is_none());
        assert!(grid.word_at((0, 3), Direction::Across).is_none());
        assert!(grid.word_at((1, 0), Direction::Across).is_none());
        assert!(grid.word_at((5, 5), Direction::Across).is_none());
    }

    #[test]
    fn test_words_order() {
        let grid = Grid::from_template(
            "
            ...
            .#.
            ...
            ",
        )
        .unwrap();

        let starts: Vec<_> = grid
            .words()
            .iter()
            .map(|word| (word.direction, word.start_cell(), word.len()))
            .collect();

        assert_eq!(
            starts,
            vec![
                (Direction::Across, (0, 0), 3),
                (Direction::Across, (2, 0), 3),
                (Direction::Down, (0, 0), 3),
                (Direction::Down, (0, 2), 3),
            ]
        );
    }

    #[test]
    fn test_generate_grid_config() {
        let grid = Grid::from_template(
            "
            CAT
            .#.
            ...
            ",
        )
        .unwrap();
        let word_list = WordList::new(&["COB;10", "CAB;30", "TEN;5", "BIN;1"]);

        let config = generate_grid_config(&grid, &word_list);

        // The complete across word at the top isn't a slot, but it's still recorded.
        assert_eq!(config.grid_words.len(), 4);
        assert_eq!(config.slot_configs.len(), 3);

        let patterns: Vec<_> = config
            .slot_configs
            .iter()
            .map(|slot| slot.pattern.as_str())
            .collect();
        assert_eq!(patterns, vec!["???", "C??", "T??"]);

        let down_options: Vec<_> = config.slot_configs[1]
            .options
            .iter()
            .map(|option| option.word.as_str())
            .collect();
        assert_eq!(down_options, vec!["CAB", "COB"]);
        assert_eq!(config.slot_configs[0].options.len(), 4);

        // Crossings are mirrored and share ids.
        assert_eq!(config.crossing_count, 2);
        let bottom = &config.slot_configs[0];
        assert_eq!(bottom.crossings.len(), 2);
        for crossing in &bottom.crossings {
            let other = &config.slot_configs[crossing.other_slot_id];
            let mirror = other
                .crossings
                .iter()
                .find(|c| c.other_slot_id == bottom.id)
                .unwrap();
            assert_eq!(mirror.crossing_id, crossing.crossing_id);
            assert_eq!(mirror.this_slot_cell, crossing.other_slot_cell);
            assert_eq!(mirror.other_slot_cell, crossing.this_slot_cell);
            assert_eq!(
                bottom.cell_coords[crossing.this_slot_cell],
                other.cell_coords[crossing.other_slot_cell]
            );
        }

        let top = config.grid_word_through((0, 1), Direction::Across).unwrap();
        assert_eq!(top.cells, vec![(0, 0), (0, 1), (0, 2)]);
        assert!(config.grid_word_through((0, 1), Direction::Down).is_none());

        let rendered = render_grid(
            &config,
            &[
                Choice {
                    slot_id: 1,
                    word_id: 0,
                },
                Choice {
                    slot_id: 0,
                    word_id: 3,
                },
            ],
        );
        assert_eq!(rendered, "CAT\nA#.\nBIN");
    }
}

#[cfg(all(test, feature = "serde"))]
mod serde_tests {
    use crate::grid_config::Direction;

    #[test]
    fn test_direction_serialization() {
        assert_eq!(
            serde_json::to_string(&Direction::Across).unwrap(),
            "\"across\""
        );
        assert_eq!(
            serde_json::from_str::<Direction>("\"down\"").unwrap(),
            Direction::Down
        );
    }
}
