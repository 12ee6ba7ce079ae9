//! The dictionary index: parses scored word list entries and answers "which words fit this
//! pattern?" queries for the fill engine.

use fancy_regex::Regex;
use lazy_static::lazy_static;
use std::fmt::Debug;
use std::path::Path;
use std::{fmt, fs};
use thiserror::Error;
use unicode_normalization::UnicodeNormalization;

use crate::types::Score;

/// Stop recording diagnostics for a single load after this many; a badly-formatted file would
/// otherwise produce one per line.
pub const MAX_WORD_LIST_ERRORS: usize = 100;

lazy_static! {
    /// Matches the integer at the start of a score field, the way a lenient number parser would
    /// (`"12abc"` is 12).
    static ref LEADING_INTEGER: Regex =
        Regex::new(r"^\s*([+-]?\d+)").expect("leading-integer regex should compile");
}

/// A single parsed dictionary entry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DictionaryEntry {
    /// The line as it appeared in the user's word list.
    pub raw: String,

    /// The normalized form used in the grid: only the letters A-Z.
    pub word: String,

    pub score: Score,
}

/// A candidate answer for a particular slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WordOption {
    pub word: String,
    pub score: Score,

    /// Index of the `DictionaryEntry` this option came from. Duplicate words in the list produce
    /// distinct options with distinct entries.
    pub entry: usize,
}

/// Given a word string from a dictionary file, turn it into the normalized form we'll use in the
/// actual fill engine: compatibility-decompose it (so accented letters become a base letter plus a
/// combining mark), then keep only ASCII letters, uppercased.
#[must_use]
pub fn normalize_word(canonical: &str) -> String {
    canonical
        .nfkd()
        .filter(char::is_ascii_alphabetic)
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WordListError {
    #[error("Can’t read file: “{0}”")]
    InvalidPath(String),

    #[error("Word list contains invalid word: “{0}”")]
    InvalidWord(String),

    #[error("Word list contains invalid score: “{0}”")]
    InvalidScore(String),
}

/// Split an entry into its word and score fields. A semicolon takes precedence over a colon, so
/// `"RE:MIX;40"` is the word `RE:MIX` with score 40.
fn split_entry(line: &str) -> (&str, Option<&str>) {
    if let Some(idx) = line.find(';') {
        (&line[..idx], Some(&line[idx + 1..]))
    } else if let Some(idx) = line.find(':') {
        (&line[..idx], Some(&line[idx + 1..]))
    } else {
        (line, None)
    }
}

/// Parse the leading integer of a score field. Negative values clamp to 0 and values too large
/// for a `Score` saturate. Returns `None` if the field doesn't start with an integer.
fn parse_score(field: &str) -> Option<Score> {
    let captures = LEADING_INTEGER.captures(field).ok()??;
    let digits = captures.get(1)?.as_str();

    let score = match digits.parse::<i64>() {
        Ok(value) => value.clamp(0, i64::from(Score::MAX)) as Score,
        Err(_) if digits.starts_with('-') => 0,
        Err(_) => Score::MAX,
    };
    Some(score)
}

/// Parse one line of a word list. Returns `Ok(None)` for blank lines.
fn parse_entry(
    line: &str,
    errors: &mut Vec<WordListError>,
) -> Result<Option<DictionaryEntry>, WordListError> {
    if line.trim().is_empty() {
        return Ok(None);
    }

    let (word_field, score_field) = split_entry(line);

    let word = normalize_word(word_field);
    if word.is_empty() {
        return Err(WordListError::InvalidWord(word_field.to_string()));
    }

    let score = match score_field {
        None => 0,
        Some(field) => parse_score(field).unwrap_or_else(|| {
            errors.push(WordListError::InvalidScore(field.to_string()));
            0
        }),
    };

    Ok(Some(DictionaryEntry {
        raw: line.to_string(),
        word,
        score,
    }))
}

/// A struct representing the currently-loaded word list. This is static for the lifetime of a
/// fill: the search only ever reads from it.
pub struct WordList {
    /// Every usable entry, in dictionary order (including duplicates).
    pub entries: Vec<DictionaryEntry>,

    /// Entry indices bucketed by word length, so `entries_by_length[5]` lists every five-letter
    /// entry in dictionary order.
    pub entries_by_length: Vec<Vec<usize>>,

    /// Problems found while loading, capped at `MAX_WORD_LIST_ERRORS`.
    pub errors: Vec<WordListError>,
}

impl WordList {
    /// Build a `WordList` from in-memory entries such as `"CAT;10"`, `"DOG:5"` or `"EMU"`.
    #[must_use]
    pub fn new<S: AsRef<str>>(lines: &[S]) -> WordList {
        let mut instance = WordList {
            entries: vec![],
            entries_by_length: vec![vec![]],
            errors: vec![],
        };

        let mut errors = vec![];
        for line in lines {
            match parse_entry(line.as_ref(), &mut errors) {
                Ok(Some(entry)) => instance.add_entry(entry),
                Ok(None) => {}
                Err(error) => errors.push(error),
            }
        }

        errors.truncate(MAX_WORD_LIST_ERRORS);
        instance.errors = errors;

        instance
    }

    /// Build a `WordList` from the contents of a dictionary file, one entry per line.
    #[must_use]
    pub fn from_contents(contents: &str) -> WordList {
        WordList::new(&contents.lines().collect::<Vec<_>>())
    }

    /// Load a dictionary file from disk.
    pub fn from_dict_file<P: AsRef<Path>>(path: P) -> Result<WordList, WordListError> {
        let path = path.as_ref();
        let contents = fs::read_to_string(path)
            .map_err(|_| WordListError::InvalidPath(path.to_string_lossy().into()))?;

        Ok(WordList::from_contents(&contents))
    }

    fn add_entry(&mut self, entry: DictionaryEntry) {
        let length = entry.word.len();
        if self.entries_by_length.len() <= length {
            self.entries_by_length.resize(length + 1, vec![]);
        }
        self.entries_by_length[length].push(self.entries.len());
        self.entries.push(entry);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Find every entry that fits `pattern`, a string of letters and `?` wildcards. Matching is
    /// case-insensitive. Results are sorted by descending score; equal scores keep dictionary
    /// order. No match is an empty result, not an error.
    #[must_use]
    pub fn options_for(&self, pattern: &str) -> Vec<WordOption> {
        let length = pattern.chars().count();
        let Some(bucket) = self.entries_by_length.get(length) else {
            return vec![];
        };
        let Some(regex) = pattern_regex(pattern) else {
            return vec![];
        };

        let mut options: Vec<WordOption> = bucket
            .iter()
            .filter_map(|&entry_idx| {
                let entry = &self.entries[entry_idx];
                regex
                    .is_match(&entry.word)
                    .unwrap_or(false)
                    .then(|| WordOption {
                        word: entry.word.clone(),
                        score: entry.score,
                        entry: entry_idx,
                    })
            })
            .collect();

        // `sort_by` is stable, so ties stay in dictionary order.
        options.sort_by(|a, b| b.score.cmp(&a.score));
        options
    }
}

/// Compile a slot pattern like `C?T` into `(?i)^C[A-Z]T$`. Returns `None` if the pattern contains
/// anything other than letters and wildcards.
fn pattern_regex(pattern: &str) -> Option<Regex> {
    let mut source = String::from("(?i)^");
    for ch in pattern.chars() {
        match ch {
            '?' => source.push_str("[A-Z]"),
            c if c.is_ascii_alphabetic() => source.push(c),
            _ => return None,
        }
    }
    source.push('$');

    Regex::new(&source).ok()
}

impl Debug for WordList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WordList")
            .field(
                "entries_by_length",
                &self.entries_by_length.iter().map(Vec::len).collect::<Vec<_>>(),
            )
            .field("errors", &self.errors.len())
            .finish_non_exhaustive()
    }
}
