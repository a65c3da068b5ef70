
// trained word vectors and their on-disk layouts
//
// text layout, one word per line, no header:
//     word v_1 v_2 ... v_dim
// values are separated by one space and printed with the shortest
// representation that parses back to the same f32.

use crate::config::files_handling::{ReadFile, SaveFile};
use crate::errors::{GloveError, Result};

use ndarray::{Array2, ArrayView1};
use ndarray_npy::{read_npy, write_npy};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;


#[derive(Clone, Debug, PartialEq)]
pub struct Embeddings {
    words: Vec<String>,
    t2i: HashMap<String, usize>,
    vectors: Array2<f32>,
}

impl Embeddings {

    /// Pairs row `i` of `vectors` with `words[i]`.
    pub fn new(words: Vec<String>, vectors: Array2<f32>) -> Result<Self> {
        if words.len() != vectors.nrows() {
            return Err(GloveError::Format {
                line: 0,
                reason: format!("{} words for {} vectors", words.len(), vectors.nrows()),
            });
        }
        let t2i = words.iter().enumerate().map(|(i, w)| (w.to_owned(), i)).collect();
        Ok(Self { words, t2i, vectors })
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn vectors(&self) -> &Array2<f32> {
        &self.vectors
    }

    pub fn len(&self) -> usize {
        self.words.len()
    }

    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    pub fn dimension(&self) -> usize {
        self.vectors.ncols()
    }

    pub fn index_of(&self, word: &str) -> Option<usize> {
        self.t2i.get(word).copied()
    }

    pub fn get(&self, word: &str) -> Option<ArrayView1<'_, f32>> {
        self.index_of(word).map(|i| self.vectors.row(i))
    }

    pub fn write_text<W: Write>(&self, mut writer: W) -> Result<()> {
        for (word, row) in self.words.iter().zip(self.vectors.outer_iter()) {
            write!(writer, "{}", word)?;
            for v in row {
                write!(writer, " {}", v)?;
            }
            writeln!(writer)?;
        }
        writer.flush()?;
        Ok(())
    }

    pub fn read_text<R: BufRead>(reader: R) -> Result<Self> {

        let mut words = Vec::new();
        let mut values: Vec<f32> = Vec::new();
        let mut dimension = None;

        for (n, line) in reader.lines().enumerate() {
            let line = line?;
            let mut parts = line.split_whitespace();
            let word = match parts.next() {
                Some(word) => word,
                None => continue,
            };

            let before = values.len();
            for part in parts {
                let v: f32 = part.parse().map_err(|_| GloveError::Format {
                    line: n + 1,
                    reason: format!("'{}' is not a number", part),
                })?;
                values.push(v);
            }

            let found = values.len() - before;
            match dimension {
                None => dimension = Some(found),
                Some(expected) if expected != found => {
                    return Err(GloveError::Format {
                        line: n + 1,
                        reason: format!("expected {} values, found {}", expected, found),
                    });
                }
                Some(_) => {}
            }
            words.push(word.to_owned());
        }

        let vectors = Array2::from_shape_vec((words.len(), dimension.unwrap_or(0)), values)
            .map_err(|e| GloveError::Format { line: 0, reason: e.to_string() })?;
        Embeddings::new(words, vectors)
    }

}

impl SaveFile for Embeddings {
    const EXTENSION: &'static str = "txt";
    fn save_file(&self, path: &Path) -> Result<()> {
        self.write_text(BufWriter::new(File::create(path)?))
    }
}

impl ReadFile for Embeddings {
    const EXTENSION: &'static str = "txt";
    fn read_file(path: &Path) -> Result<Self> {
        Embeddings::read_text(BufReader::new(File::open(path)?))
    }
}

impl SaveFile for Array2<f32> {
    const EXTENSION: &'static str = "npy";
    fn save_file(&self, path: &Path) -> Result<()> {
        write_npy(path, self)?;
        Ok(())
    }
}

impl ReadFile for Array2<f32> {
    const EXTENSION: &'static str = "npy";
    fn read_file(path: &Path) -> Result<Self> {
        Ok(read_npy(path)?)
    }
}


#[cfg(test)]
mod tests {

    use super::Embeddings;
    use crate::config::files_handling::{read_input, save_output};
    use crate::errors::GloveError;
    use ndarray::{array, Array2};
    use std::io::Cursor;

    fn sample() -> Embeddings {
        let words = vec!["the".to_string(), "cat".to_string(), "sat".to_string()];
        let vectors = array![[0.1, -2.5e-7, 3.0], [1.0 / 3.0, 0.0, -1.25], [f32::MAX, f32::MIN_POSITIVE, 7.5]];
        Embeddings::new(words, vectors).unwrap()
    }

    #[test]
    fn text_layout_is_word_then_values() {

        let mut buf = Vec::new();
        sample().write_text(&mut buf).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let first = text.lines().next().unwrap();

        assert_eq!(text.lines().count(), 3);
        assert_eq!(first.split(' ').count(), 4);
        assert!(first.starts_with("the 0.1 "));
    }

    #[test]
    fn text_reads_back_exactly() {

        let embeddings = sample();
        let mut buf = Vec::new();
        embeddings.write_text(&mut buf).unwrap();

        let loaded = Embeddings::read_text(Cursor::new(buf)).unwrap();
        assert_eq!(loaded, embeddings);
        assert_eq!(loaded.get("cat").unwrap()[0], 1.0 / 3.0);
        assert_eq!(loaded.index_of("sat"), Some(2));
        assert!(loaded.get("dog").is_none());
    }

    #[test]
    fn ragged_or_bad_lines_are_rejected() {

        let ragged = "a 1 2 3\nb 1 2\n";
        assert!(matches!(Embeddings::read_text(Cursor::new(ragged)), Err(GloveError::Format { line: 2, .. })));

        let not_a_number = "a 1 two 3\n";
        assert!(matches!(Embeddings::read_text(Cursor::new(not_a_number)), Err(GloveError::Format { line: 1, .. })));

        let empty = Embeddings::read_text(Cursor::new("")).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn rows_must_match_words() {
        let result = Embeddings::new(vec!["a".into()], Array2::zeros((2, 3)));
        assert!(matches!(result, Err(GloveError::Format { .. })));
    }

    #[test]
    fn saved_files_load_back() {

        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().to_str().unwrap();
        let embeddings = sample();

        save_output(output_dir, "vectors", &embeddings).unwrap();
        save_output(output_dir, "vecs", embeddings.vectors()).unwrap();

        let text: Embeddings = read_input(output_dir, "vectors").unwrap();
        let npy: Array2<f32> = read_input(output_dir, "vecs").unwrap();
        assert_eq!(&text, &embeddings);
        assert_eq!(&npy, embeddings.vectors());
    }
}
