
use crate::embeddings::Embeddings;
use crate::errors::{GloveError, Result};

use ndarray::prelude::*;


/// Cosine similarity queries over trained vectors.
pub struct Similarity {
    w: Array2<f32>,
    embeddings: Embeddings,
}

impl Similarity {

    pub fn new(embeddings: Embeddings) -> Similarity {

        // normalize w so each row has l2 norm 1, then dot products are cosines
        let mut w = embeddings.vectors().clone();
        for mut row in w.axis_iter_mut(Axis(0)) {
            let norm = row.dot(&row).sqrt();
            if norm > 0.0 {
                row.mapv_inplace(|a| a / norm);
            }
        }

        Self { w, embeddings }
    }

    pub fn extract_vec_from_word(&self, token: &str) -> Result<Array1<f32>> {
        match self.embeddings.index_of(token) {
            Some(i) => Ok(self.w.row(i).to_owned()),
            None => Err(GloveError::UnknownWord(token.to_owned())),
        }
    }

    /// `b - a + c` for "a is to b as c is to ?".
    pub fn extract_analogy_vec(&self, inputs: [&str; 3]) -> Result<Array1<f32>> {
        let a = self.extract_vec_from_word(inputs[0])?;
        let b = self.extract_vec_from_word(inputs[1])?;
        let c = self.extract_vec_from_word(inputs[2])?;
        Ok(b - a + c)
    }

    pub fn extract_analogies(&self, inputs: [&str; 3], k: usize) -> Result<Vec<(String, f32)>> {
        let analogy = self.extract_analogy_vec(inputs)?;
        self.find_k_most_similar(&analogy, k, &inputs)
    }

    pub fn most_similar(&self, token: &str, k: usize) -> Result<Vec<(String, f32)>> {
        let vec = self.extract_vec_from_word(token)?;
        self.find_k_most_similar(&vec, k, &[token])
    }

    /// The `k` words closest to `vec` by cosine, best first, skipping `exclude`.
    pub fn find_k_most_similar(&self, vec: &Array1<f32>, k: usize, exclude: &[&str]) -> Result<Vec<(String, f32)>> {

        let norm = vec.dot(vec).sqrt();
        let query = if norm > 0.0 { vec / norm } else { vec.clone() };

        let words = self.embeddings.words();
        let scores = self.w.dot(&query); // of size vocab size
        let mut indexed_scores: Vec<(usize, f32)> = scores.iter().copied().enumerate()
            .filter(|(i, _)| !exclude.contains(&words[*i].as_str()))
            .collect();

        // sort by most similar in descending order
        indexed_scores.sort_by(|(_i, s), (_j, t)| t.total_cmp(s));

        Ok(indexed_scores
            .into_iter()
            .take(k)
            .map(|(i, score)| (words[i].to_owned(), score))
            .collect())
    }

}
