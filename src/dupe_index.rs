use std::collections::HashSet;

/// Tracks which words are currently committed anywhere in the grid, so that we can enforce the
/// rule that no word appears in more than one slot. This only knows about words placed by the
/// search (i.e., words referenced by the choice stack), not words that were already complete in
/// the input grid.
#[derive(Debug, Clone, Default)]
pub struct PlacedWords {
    words: HashSet<String>,
}

impl PlacedWords {
    #[must_use]
    pub fn new() -> PlacedWords {
        PlacedWords::default()
    }

    #[must_use]
    pub fn contains(&self, word: &str) -> bool {
        self.words.contains(word)
    }

    /// Record a placed word. Returns false if it was already present.
    pub fn insert(&mut self, word: &str) -> bool {
        self.words.insert(word.to_string())
    }

    /// Forget a placed word. Returns false if it wasn't present.
    pub fn remove(&mut self, word: &str) -> bool {
        self.words.remove(word)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}
