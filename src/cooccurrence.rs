// imports
use crate::config::files_handling::{ReadFile, SaveFile};
use crate::errors::{GloveError, Result};

use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::Path;
use ndarray::{Array1, Array2, array, s};
use flate2::{Compression, read::GzDecoder, write::GzEncoder};
use bincode::{deserialize, serialize};


// ids are written as f32 in the saved (N, 3) matrix, above this they stop being exact
const MAX_SAVED_ID: usize = 1 << 24;

/// Two word ids that appeared within a window of each other.
///
/// Pairs are symmetric, a pair is always stored with `i < j` so that
/// `(a, b)` and `(b, a)` land on the same entry.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pair {
    pub i: usize,
    pub j: usize,
}

impl Pair {
    pub fn new(a: usize, b: usize) -> Pair {
        if a <= b { Pair { i: a, j: b } } else { Pair { i: b, j: a } }
    }
}

/// Accumulated distance weighted co-occurrence counts.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct CooccurrenceTable {
    tup2cooc: HashMap<Pair, f32>,
    bound: usize,
}

impl CooccurrenceTable {

    /// An empty table accepting ids below `bound`.
    pub fn new(bound: usize) -> Self {
        Self { tup2cooc: HashMap::new(), bound }
    }

    pub fn bound(&self) -> usize {
        self.bound
    }

    /// Raises the id bound, used while the vocabulary is still growing.
    pub fn set_bound(&mut self, bound: usize) {
        self.bound = self.bound.max(bound);
    }

    /// Records that `id_b` was seen `distance` tokens away from `id_a`.
    ///
    /// The pair gains `1 / distance`. Self pairs are ignored.
    pub fn update(&mut self, id_a: usize, id_b: usize, distance: usize) -> Result<()> {

        for id in [id_a, id_b] {
            if id >= self.bound {
                return Err(GloveError::InvalidId { id, bound: self.bound });
            }
        }
        if id_a == id_b {
            return Ok(());
        }
        debug_assert!(distance > 0, "distance between two positions is at least 1");

        let dis_count = 1.0 / distance as f32;
        let val = self.tup2cooc.entry(Pair::new(id_a, id_b)).or_insert(0.0);
        *val += dis_count;
        Ok(())
    }

    /// Counts every pair of positions at most `window_size` apart in `token_ids`.
    pub fn scan(&mut self, token_ids: &[usize], window_size: usize) -> Result<()> {

        let n = token_ids.len();
        for p in 0..n {
            for d in 1..=window_size {
                if p + d >= n { break }
                self.update(token_ids[p], token_ids[p + d], d)?;
            }
        }
        Ok(())
    }

    /// Adds the counts of `other` into this table.
    pub fn merge(&mut self, other: CooccurrenceTable) {
        self.set_bound(other.bound);
        for (pair, weight) in other.tup2cooc {
            *self.tup2cooc.entry(pair).or_insert(0.0) += weight;
        }
    }

    /// A fresh pass over all pairs and their weights.
    pub fn entries(&self) -> impl Iterator<Item = (Pair, f32)> + '_ {
        self.tup2cooc.iter().map(|(pair, weight)| (*pair, *weight))
    }

    pub fn get(&self, id_a: usize, id_b: usize) -> Option<f32> {
        self.tup2cooc.get(&Pair::new(id_a, id_b)).copied()
    }

    pub fn len(&self) -> usize {
        self.tup2cooc.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tup2cooc.is_empty()
    }

    pub fn clear(&mut self) {
        self.tup2cooc.clear();
        self.bound = 0;
    }

    /// Rows of `[i, j, weight]`, one per pair.
    pub fn to_ndarray(&self) -> Array2<f32> {
        let mut nd_array: Array2<f32> = Array2::zeros((self.tup2cooc.len(), 3));
        for (r, (k, v)) in self.tup2cooc.iter().enumerate() {
            let line: Array1<f32> = array![k.i as f32, k.j as f32, *v];
            nd_array.slice_mut(s![r, ..]).assign(&line);
        }
        nd_array
    }

    /// Rebuilds a table from `[i, j, weight]` rows.
    pub fn from_ndarray(rows: &Array2<f32>) -> Result<Self> {

        if rows.ncols() != 3 {
            return Err(GloveError::Format { line: 0, reason: format!("expected 3 columns, found {}", rows.ncols()) });
        }

        let mut table = CooccurrenceTable::new(0);
        for (r, row) in rows.outer_iter().enumerate() {
            let (i, j, weight) = (row[0], row[1], row[2]);
            if i < 0.0 || j < 0.0 || i.fract() != 0.0 || j.fract() != 0.0 || i == j {
                return Err(GloveError::Format { line: r, reason: format!("bad pair ({}, {})", i, j) });
            }
            if !(weight > 0.0) {
                return Err(GloveError::Format { line: r, reason: format!("weight {} is not positive", weight) });
            }
            let pair = Pair::new(i as usize, j as usize);
            table.set_bound(pair.j + 1);
            *table.tup2cooc.entry(pair).or_insert(0.0) += weight;
        }
        Ok(table)
    }

}

impl SaveFile for CooccurrenceTable {
    const EXTENSION: &'static str = "bin.gz";
    fn save_file(&self, path: &Path) -> Result<()> {

        if self.bound > MAX_SAVED_ID {
            return Err(GloveError::InvalidId { id: self.bound - 1, bound: MAX_SAVED_ID });
        }

        // the (N, 3) matrix is serialized and compressed in one piece
        let encoded: Vec<u8> = serialize(&self.to_ndarray())?;
        let f = BufWriter::new(File::create(path)?);
        let mut writer = GzEncoder::new(f, Compression::default());
        writer.write_all(&encoded)?;
        writer.finish()?.flush()?;
        Ok(())
    }
}

impl ReadFile for CooccurrenceTable {
    const EXTENSION: &'static str = "bin.gz";
    fn read_file(path: &Path) -> Result<Self> {
        let f = BufReader::new(File::open(path)?);
        let mut reader = GzDecoder::new(f);
        let mut buf: Vec<u8> = Vec::new();
        reader.read_to_end(&mut buf)?;
        let rows: Array2<f32> = deserialize(&buf)?;
        CooccurrenceTable::from_ndarray(&rows)
    }
}


#[cfg(test)]
mod tests {

    use std::collections::HashMap;
    use super::{CooccurrenceTable, Pair};
    use crate::config::files_handling::{read_input, save_output};
    use crate::errors::GloveError;

    #[test]
    fn cooc_test() {

        // "the cat sat" and "the dog sat" with the ids the=0 cat=1 sat=2 dog=3
        let sequences = [vec![0, 1, 2], vec![0, 3, 2]];
        let window_size = 2;

        let mut golden: HashMap<Pair, f32> = HashMap::new();
        golden.insert(Pair::new(0, 1), 1.0);
        golden.insert(Pair::new(1, 2), 1.0);
        golden.insert(Pair::new(0, 3), 1.0);
        golden.insert(Pair::new(3, 2), 1.0);
        golden.insert(Pair::new(0, 2), 1.0 / 2.0 + 1.0 / 2.0);

        let mut table = CooccurrenceTable::new(4);
        for sequence in &sequences {
            table.scan(sequence, window_size).unwrap();
        }

        let found: HashMap<Pair, f32> = table.entries().collect();
        assert_eq!(found, golden);
        assert_eq!(table.get(2, 0), Some(1.0));
    }

    #[test]
    fn nearer_pairs_weigh_more() {

        let window_size = 4;
        let mut table = CooccurrenceTable::new(5);
        for _ in 0..3 {
            table.scan(&[0, 1, 2, 3, 4], window_size).unwrap();
        }

        let near = table.get(0, 1).unwrap();
        let far = table.get(0, 4).unwrap();
        assert!(near > far);
        approx::assert_abs_diff_eq!(near, 3.0, epsilon = 1e-6);
        approx::assert_abs_diff_eq!(far, 3.0 / 4.0, epsilon = 1e-6);

        // beyond the window nothing is counted
        let mut narrow = CooccurrenceTable::new(5);
        narrow.scan(&[0, 1, 2, 3, 4], 1).unwrap();
        assert_eq!(narrow.get(0, 2), None);
        assert_eq!(narrow.len(), 4);
    }

    #[test]
    fn self_pairs_are_never_stored() {

        let mut table = CooccurrenceTable::new(2);
        table.scan(&[0, 0, 1, 0, 0], 3).unwrap();

        assert!(table.entries().all(|(pair, _)| pair.i != pair.j));
        assert_eq!(table.len(), 1);
        assert_eq!(table.get(0, 0), None);
    }

    #[test]
    fn short_sequences_contribute_nothing() {

        let mut table = CooccurrenceTable::new(3);
        table.scan(&[], 5).unwrap();
        table.scan(&[2], 5).unwrap();
        assert!(table.is_empty());
    }

    #[test]
    fn ids_outside_the_bound_fail() {

        let mut table = CooccurrenceTable::new(3);
        assert!(matches!(table.update(0, 3, 1), Err(GloveError::InvalidId { id: 3, bound: 3 })));
        assert!(matches!(table.scan(&[7, 1], 2), Err(GloveError::InvalidId { id: 7, bound: 3 })));

        table.set_bound(8);
        table.scan(&[7, 1], 2).unwrap();
        assert_eq!(table.get(1, 7), Some(1.0));
    }

    #[test]
    fn merged_tables_add_up() {

        let mut left = CooccurrenceTable::new(3);
        left.scan(&[0, 1, 2], 2).unwrap();
        let mut right = CooccurrenceTable::new(4);
        right.scan(&[1, 0, 3], 1).unwrap();

        left.merge(right);
        assert_eq!(left.bound(), 4);
        assert_eq!(left.get(0, 1), Some(2.0));
        assert_eq!(left.get(0, 3), Some(1.0));
        assert_eq!(left.get(0, 2), Some(0.5));
    }

    #[test]
    fn entries_restart_on_every_call() {

        let mut table = CooccurrenceTable::new(4);
        table.scan(&[0, 1, 2, 3], 3).unwrap();

        let first: f32 = table.entries().map(|(_, w)| w).sum();
        let second: f32 = table.entries().map(|(_, w)| w).sum();
        assert_eq!(table.entries().count(), 6);
        assert_eq!(first, second);
    }

    #[test]
    fn saved_counts_load_back() {

        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().to_str().unwrap();

        let mut table = CooccurrenceTable::new(4);
        table.scan(&[0, 1, 2, 3, 1], 3).unwrap();
        save_output(output_dir, "cooc", &table).unwrap();

        let loaded: CooccurrenceTable = read_input(output_dir, "cooc").unwrap();
        assert_eq!(loaded, table);
    }
}
