
use crate::config::files_handling::{ReadFile, SaveFile};
use crate::errors::{GloveError, Result};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;


/// Maps words to dense ids in order of first appearance.
///
/// The table grows while the corpus is scanned and is sealed before the
/// factor matrices are allocated, after which its size never changes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Vocabulary {
    t2i: HashMap<String, usize>,
    i2t: Vec<String>,
    max_size: Option<usize>,
    sealed: bool,
}

impl Vocabulary {

    pub fn new() -> Self {
        Self::default()
    }

    /// A vocabulary that stops admitting new words once it holds `max_size` of them.
    pub fn with_max_size(max_size: usize) -> Self {
        Self { max_size: Some(max_size), ..Self::default() }
    }

    /// Rebuilds a sealed vocabulary from words ordered by id.
    pub fn from_words(words: Vec<String>) -> Self {
        let t2i = words.iter().enumerate().map(|(i, w)| (w.to_owned(), i)).collect();
        Self { t2i, i2t: words, max_size: None, sealed: true }
    }

    /// Returns the id of `word`, adding it if unseen.
    ///
    /// `Ok(None)` means the word is unseen and the size cap has been reached,
    /// the caller should drop the token.
    pub fn intern(&mut self, word: &str) -> Result<Option<usize>> {
        if let Some(&i) = self.t2i.get(word) {
            return Ok(Some(i));
        }
        if self.sealed {
            return Err(GloveError::VocabularySealed(word.to_owned()));
        }
        if self.max_size.map_or(false, |max| self.i2t.len() >= max) {
            return Ok(None);
        }
        let i = self.i2t.len();
        self.t2i.insert(word.to_owned(), i);
        self.i2t.push(word.to_owned());
        Ok(Some(i))
    }

    pub fn id_of(&self, word: &str) -> Option<usize> {
        self.t2i.get(word).copied()
    }

    pub fn word_of(&self, id: usize) -> Option<&str> {
        self.i2t.get(id).map(|w| w.as_str())
    }

    pub fn size(&self) -> usize {
        self.i2t.len()
    }

    pub fn is_empty(&self) -> bool {
        self.i2t.is_empty()
    }

    /// Freezes the vocabulary, later calls to `intern` with unseen words fail.
    pub fn seal(&mut self) {
        self.sealed = true;
    }

    pub fn is_sealed(&self) -> bool {
        self.sealed
    }

    pub fn words(&self) -> &[String] {
        &self.i2t
    }

}

impl SaveFile for Vocabulary {
    const EXTENSION: &'static str = "json";
    fn save_file(&self, path: &Path) -> Result<()> {
        let mut f = BufWriter::new(File::create(path)?);
        serde_json::to_writer(&mut f, &self.i2t)?;
        f.flush()?;
        Ok(())
    }
}

impl ReadFile for Vocabulary {
    const EXTENSION: &'static str = "json";
    fn read_file(path: &Path) -> Result<Self> {
        let f = BufReader::new(File::open(path)?);
        let words: Vec<String> = serde_json::from_reader(f)?;
        Ok(Vocabulary::from_words(words))
    }
}


/// Splits a corpus line into tokens.
pub trait Tokenizer: Sync {
    fn tokenize(&self, line: &str) -> Vec<String>;
}

/// Lower cases the line and splits it on whitespace.
#[derive(Clone, Copy, Debug, Default)]
pub struct WhitespaceTokenizer;

impl Tokenizer for WhitespaceTokenizer {
    fn tokenize(&self, line: &str) -> Vec<String> {
        line.to_lowercase().split_whitespace().map(|x| x.to_string()).collect()
    }
}


#[cfg(test)]
mod tests {

    use super::{Tokenizer, Vocabulary, WhitespaceTokenizer};
    use crate::config::files_handling::{read_input, save_output};
    use crate::errors::GloveError;

    #[test]
    fn ids_follow_first_appearance() {

        let mut vocab = Vocabulary::new();
        let ids: Vec<usize> = ["the", "cat", "the", "sat"]
            .iter()
            .map(|w| vocab.intern(w).unwrap().unwrap())
            .collect();

        assert_eq!(ids, vec![0, 1, 0, 2]);
        assert_eq!(vocab.size(), 3);
        assert_eq!(vocab.id_of("sat"), Some(2));
        assert_eq!(vocab.word_of(1), Some("cat"));
        assert_eq!(vocab.word_of(3), None);
        assert_eq!(vocab.id_of("dog"), None);
    }

    #[test]
    fn sealed_vocabulary_does_not_grow() {

        let mut vocab = Vocabulary::new();
        vocab.intern("the").unwrap();
        vocab.seal();

        assert_eq!(vocab.intern("the").unwrap(), Some(0));
        assert!(matches!(vocab.intern("dog"), Err(GloveError::VocabularySealed(w)) if w == "dog"));
        assert_eq!(vocab.size(), 1);
    }

    #[test]
    fn capped_vocabulary_drops_new_words() {

        let mut vocab = Vocabulary::with_max_size(2);
        assert_eq!(vocab.intern("a").unwrap(), Some(0));
        assert_eq!(vocab.intern("b").unwrap(), Some(1));
        assert_eq!(vocab.intern("c").unwrap(), None);
        assert_eq!(vocab.intern("a").unwrap(), Some(0));
        assert_eq!(vocab.size(), 2);
    }

    #[test]
    fn tokenizer_lower_cases_and_splits() {
        let tokens = WhitespaceTokenizer.tokenize("  The Cat\tsat \n");
        assert_eq!(tokens, vec!["the", "cat", "sat"]);
        assert!(WhitespaceTokenizer.tokenize("   ").is_empty());
    }

    #[test]
    fn saved_words_keep_their_ids() {

        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().to_str().unwrap();

        let mut vocab = Vocabulary::new();
        for w in ["the", "dog", "sat"] {
            vocab.intern(w).unwrap();
        }
        save_output(output_dir, "words", &vocab).unwrap();

        let loaded: Vocabulary = read_input(output_dir, "words").unwrap();
        assert!(loaded.is_sealed());
        assert_eq!(loaded.words(), vocab.words());
        assert_eq!(loaded.id_of("sat"), Some(2));
    }
}
