
use crate::config::Optimizer;
use crate::errors::{GloveError, Result};

use ndarray::prelude::*;
use ndarray::Array;
use ndarray_rand::RandomExt;
use ndarray_rand::rand_distr::Uniform;
use rand::Rng;


/// Which of the two factor matrices a row belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Role {
    /// the word as the pivot token
    Main,
    /// the word as a context token
    Context,
}

struct Factors {
    w_tokens: Array2<f32>,
    w_context: Array2<f32>,
    b_tokens: Array1<f32>,
    b_context: Array1<f32>,
    grads: Option<Accumulators>,
}

// squared gradient sums for adagrad, same shapes as the factors
struct Accumulators {
    ag_w_tok: Array2<f32>,
    ag_w_context: Array2<f32>,
    ag_b_tok: Array1<f32>,
    ag_b_context: Array1<f32>,
}

/// Mutable views of everything one example touches: the main row of one
/// word and the context row of another.
pub struct PairRows<'a> {
    pub main: ArrayViewMut1<'a, f32>,
    pub context: ArrayViewMut1<'a, f32>,
    pub main_bias: &'a mut f32,
    pub context_bias: &'a mut f32,
    pub grads: Option<PairGrads<'a>>,
}

pub struct PairGrads<'a> {
    pub main: ArrayViewMut1<'a, f32>,
    pub context: ArrayViewMut1<'a, f32>,
    pub main_bias: &'a mut f32,
    pub context_bias: &'a mut f32,
}

/// Dense word and context vectors plus biases, one row per word id.
#[derive(Default)]
pub struct FactorStore {
    factors: Option<Factors>,
}

impl FactorStore {

    /// Allocates `vocab_size` rows of `dimension` values for both roles.
    ///
    /// Vectors are drawn from `U(-0.5, 0.5) / dimension`, biases start at zero
    /// and adagrad accumulators (if any) at one, which makes the first step
    /// size equal to the learning rate.
    pub fn allocate<R: Rng + ?Sized>(&mut self, vocab_size: usize, dimension: usize, optimizer: Optimizer, rng: &mut R) -> Result<()> {

        if self.factors.is_some() {
            return Err(GloveError::AlreadyAllocated);
        }

        let grads = match optimizer {
            Optimizer::Sgd => None,
            Optimizer::Adagrad => Some(Accumulators {
                ag_w_tok: Array2::from_elem((vocab_size, dimension), 1.0),
                ag_w_context: Array2::from_elem((vocab_size, dimension), 1.0),
                ag_b_tok: Array1::from_elem(vocab_size, 1.0),
                ag_b_context: Array1::from_elem(vocab_size, 1.0),
            }),
        };

        self.factors = Some(Factors {
            w_tokens: Array::random_using((vocab_size, dimension), Uniform::new(-0.5, 0.5), rng) / dimension as f32,
            w_context: Array::random_using((vocab_size, dimension), Uniform::new(-0.5, 0.5), rng) / dimension as f32,
            b_tokens: Array1::zeros(vocab_size),
            b_context: Array1::zeros(vocab_size),
            grads,
        });
        Ok(())
    }

    /// Drops the matrices so that `allocate` can be called again.
    pub fn reset(&mut self) {
        self.factors = None;
    }

    pub fn is_allocated(&self) -> bool {
        self.factors.is_some()
    }

    pub fn rows(&self) -> usize {
        self.factors.as_ref().map_or(0, |f| f.w_tokens.nrows())
    }

    pub fn dimension(&self) -> usize {
        self.factors.as_ref().map_or(0, |f| f.w_tokens.ncols())
    }

    fn checked(&self, id: usize) -> Result<&Factors> {
        let factors = self.factors.as_ref().ok_or(GloveError::NotInitialized)?;
        let rows = factors.w_tokens.nrows();
        if id >= rows {
            return Err(GloveError::OutOfRange { id, rows });
        }
        Ok(factors)
    }

    fn checked_mut(&mut self, id: usize) -> Result<&mut Factors> {
        let factors = self.factors.as_mut().ok_or(GloveError::NotInitialized)?;
        let rows = factors.w_tokens.nrows();
        if id >= rows {
            return Err(GloveError::OutOfRange { id, rows });
        }
        Ok(factors)
    }

    pub fn vector(&self, role: Role, id: usize) -> Result<ArrayView1<'_, f32>> {
        let factors = self.checked(id)?;
        Ok(match role {
            Role::Main => factors.w_tokens.row(id),
            Role::Context => factors.w_context.row(id),
        })
    }

    pub fn vector_mut(&mut self, role: Role, id: usize) -> Result<ArrayViewMut1<'_, f32>> {
        let factors = self.checked_mut(id)?;
        Ok(match role {
            Role::Main => factors.w_tokens.row_mut(id),
            Role::Context => factors.w_context.row_mut(id),
        })
    }

    pub fn bias(&self, role: Role, id: usize) -> Result<f32> {
        let factors = self.checked(id)?;
        Ok(match role {
            Role::Main => factors.b_tokens[id],
            Role::Context => factors.b_context[id],
        })
    }

    pub fn bias_mut(&mut self, role: Role, id: usize) -> Result<&mut f32> {
        let factors = self.checked_mut(id)?;
        Ok(match role {
            Role::Main => &mut factors.b_tokens[id],
            Role::Context => &mut factors.b_context[id],
        })
    }

    /// Borrows the main row of `main_id` together with the context row of `context_id`.
    pub fn pair_mut(&mut self, main_id: usize, context_id: usize) -> Result<PairRows<'_>> {

        self.checked(main_id)?;
        let Factors { w_tokens, w_context, b_tokens, b_context, grads } = self.checked_mut(context_id)?;

        let grads = grads.as_mut().map(|g| {
            let Accumulators { ag_w_tok, ag_w_context, ag_b_tok, ag_b_context } = g;
            PairGrads {
                main: ag_w_tok.row_mut(main_id),
                context: ag_w_context.row_mut(context_id),
                main_bias: &mut ag_b_tok[main_id],
                context_bias: &mut ag_b_context[context_id],
            }
        });

        Ok(PairRows {
            main: w_tokens.row_mut(main_id),
            context: w_context.row_mut(context_id),
            main_bias: &mut b_tokens[main_id],
            context_bias: &mut b_context[context_id],
            grads,
        })
    }

    /// Final word vectors: row `i` is the sum of the main and context vectors of word `i`.
    pub fn export(&self) -> Result<Array2<f32>> {
        let factors = self.factors.as_ref().ok_or(GloveError::NotInitialized)?;
        Ok(&factors.w_tokens + &factors.w_context)
    }

}


#[cfg(test)]
mod tests {

    use super::{FactorStore, PairRows, Role};
    use crate::config::Optimizer;
    use crate::errors::GloveError;
    use rand::{rngs::StdRng, SeedableRng};

    fn allocated(vocab_size: usize, dimension: usize, optimizer: Optimizer) -> FactorStore {
        let mut store = FactorStore::default();
        store.allocate(vocab_size, dimension, optimizer, &mut StdRng::seed_from_u64(42)).unwrap();
        store
    }

    #[test]
    fn allocation_is_small_noise_and_zero_biases() {

        let dimension = 8;
        let store = allocated(5, dimension, Optimizer::Sgd);
        let limit = 0.5 / dimension as f32;

        assert_eq!(store.rows(), 5);
        assert_eq!(store.dimension(), dimension);
        for id in 0..5 {
            for role in [Role::Main, Role::Context] {
                let row = store.vector(role, id).unwrap();
                assert_eq!(row.len(), dimension);
                assert!(row.iter().all(|x| x.abs() <= limit));
                assert_eq!(store.bias(role, id).unwrap(), 0.0);
            }
        }
        assert_ne!(store.vector(Role::Main, 0).unwrap(), store.vector(Role::Context, 0).unwrap());
    }

    #[test]
    fn second_allocation_needs_a_reset() {

        let mut store = allocated(3, 2, Optimizer::Sgd);
        let mut rng = StdRng::seed_from_u64(1);

        assert!(matches!(store.allocate(3, 2, Optimizer::Sgd, &mut rng), Err(GloveError::AlreadyAllocated)));
        store.reset();
        assert!(!store.is_allocated());
        store.allocate(4, 2, Optimizer::Sgd, &mut rng).unwrap();
        assert_eq!(store.rows(), 4);
    }

    #[test]
    fn row_access_is_checked() {

        let empty = FactorStore::default();
        assert!(matches!(empty.vector(Role::Main, 0), Err(GloveError::NotInitialized)));
        assert!(matches!(empty.export(), Err(GloveError::NotInitialized)));

        let mut store = allocated(3, 2, Optimizer::Sgd);
        assert!(matches!(store.vector(Role::Context, 3), Err(GloveError::OutOfRange { id: 3, rows: 3 })));
        assert!(matches!(store.bias_mut(Role::Main, 9), Err(GloveError::OutOfRange { id: 9, rows: 3 })));
        assert!(matches!(store.pair_mut(0, 3), Err(GloveError::OutOfRange { id: 3, rows: 3 })));
    }

    #[test]
    fn mutable_views_write_through() {

        let mut store = allocated(3, 2, Optimizer::Sgd);
        store.vector_mut(Role::Main, 1).unwrap().fill(1.0);
        *store.bias_mut(Role::Context, 2).unwrap() = 0.25;

        {
            let rows = store.pair_mut(1, 2).unwrap();
            assert!(rows.grads.is_none());
            assert_eq!(rows.main.to_vec(), vec![1.0, 1.0]);
            assert_eq!(*rows.context_bias, 0.25);
            let PairRows { mut context, main_bias, .. } = rows;
            context.fill(2.0);
            *main_bias = -1.0;
        }

        assert_eq!(store.vector(Role::Context, 2).unwrap().to_vec(), vec![2.0, 2.0]);
        assert_eq!(store.bias(Role::Main, 1).unwrap(), -1.0);
        // the other role of the same ids is untouched
        assert_ne!(store.vector(Role::Main, 2).unwrap().to_vec(), vec![2.0, 2.0]);
    }

    #[test]
    fn adagrad_accumulators_start_at_one() {

        let mut store = allocated(2, 3, Optimizer::Adagrad);
        let rows = store.pair_mut(0, 1).unwrap();
        let grads = rows.grads.unwrap();
        assert_eq!(grads.main.to_vec(), vec![1.0; 3]);
        assert_eq!(grads.context.to_vec(), vec![1.0; 3]);
        assert_eq!(*grads.main_bias, 1.0);
        assert_eq!(*grads.context_bias, 1.0);
    }

    #[test]
    fn export_sums_both_roles() {

        let store = allocated(4, 3, Optimizer::Sgd);
        let w = store.export().unwrap();

        assert_eq!(w.dim(), (4, 3));
        let expected = &store.vector(Role::Main, 2).unwrap() + &store.vector(Role::Context, 2).unwrap();
        assert_eq!(w.row(2), expected);
    }
}
