//! Word vocabulary: token/id maps shared by training, scoring, and
//! sampling.
//!
//! The vocabulary is built once from the training corpus and persisted in
//! checkpoint metadata, so later runs score and sample with the exact id
//! mapping the model was trained on.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Marks the beginning of a sentence.
pub const SENTENCE_START: &str = "<s>";
/// Marks the end of a sentence.
pub const SENTENCE_END: &str = "</s>";
/// Replacement for words not seen during training.
pub const UNKNOWN: &str = "<unk>";

/// Bidirectional word/id mapping with sentence-boundary specials.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<String>", into = "Vec<String>")]
pub struct Vocabulary {
    words: Vec<String>,
    index: HashMap<String, usize>,
}

impl Vocabulary {
    /// Builds a vocabulary from whitespace-tokenized text. The special
    /// tokens always occupy the first three ids.
    pub fn from_text(text: &str) -> Self {
        let mut words: Vec<String> = vec![
            SENTENCE_START.to_string(),
            SENTENCE_END.to_string(),
            UNKNOWN.to_string(),
        ];
        let mut index: HashMap<String, usize> =
            words.iter().cloned().zip(0..).collect();

        for token in text.split_whitespace() {
            if !index.contains_key(token) {
                index.insert(token.to_string(), words.len());
                words.push(token.to_string());
            }
        }

        Self { words, index }
    }

    /// Number of distinct words, specials included.
    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Maps a word to its id, falling back to `<unk>`.
    pub fn id(&self, word: &str) -> i32 {
        match self.index.get(word) {
            Some(&id) => id as i32,
            None => self.index[UNKNOWN] as i32,
        }
    }

    /// Maps an id back to its word.
    pub fn word(&self, id: i32) -> &str {
        &self.words[id as usize]
    }

    pub fn start_id(&self) -> i32 {
        self.id(SENTENCE_START)
    }

    pub fn end_id(&self) -> i32 {
        self.id(SENTENCE_END)
    }

    /// Encodes one sentence as `<s> words </s>`.
    pub fn encode_sentence(&self, sentence: &str) -> Vec<i32> {
        let mut ids = vec![self.start_id()];
        ids.extend(sentence.split_whitespace().map(|word| self.id(word)));
        ids.push(self.end_id());
        ids
    }

    /// Encodes a whole corpus as the concatenation of its sentences.
    pub fn encode_corpus(&self, text: &str) -> Vec<i32> {
        text.lines()
            .filter(|line| !line.trim().is_empty())
            .flat_map(|line| self.encode_sentence(line))
            .collect()
    }

    /// Decodes ids back to a space-joined string, skipping sentence
    /// boundary markers.
    pub fn decode(&self, ids: &[i32]) -> String {
        ids.iter()
            .map(|&id| self.word(id))
            .filter(|word| *word != SENTENCE_START && *word != SENTENCE_END)
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl From<Vec<String>> for Vocabulary {
    fn from(words: Vec<String>) -> Self {
        let index = words
            .iter()
            .enumerate()
            .map(|(id, word)| (word.clone(), id))
            .collect();
        Self { words, index }
    }
}

impl From<Vocabulary> for Vec<String> {
    fn from(vocabulary: Vocabulary) -> Self {
        vocabulary.words
    }
}
