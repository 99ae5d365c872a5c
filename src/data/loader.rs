/*!
Batched, optionally shuffled iteration over a sampler
*/
use super::TsSampler;
use crate::error::Result;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rayon::{ThreadPool, ThreadPoolBuilder};
use tch::Tensor;

/// Iterates a `TsSampler` in batches, assembling each batch on a pool of worker threads
#[derive(Debug)]
pub struct DataLoader<'a> {
    sampler: &'a TsSampler,
    batch_size: usize,
    rng: Option<StdRng>,
    pool: ThreadPool,
}

impl<'a> DataLoader<'a> {
    /// Create a sequential loader over a sampler using `n_jobs` worker threads (zero picks a default)
    pub fn new(sampler: &'a TsSampler, batch_size: usize, n_jobs: usize) -> Result<DataLoader<'a>> {
        let pool = ThreadPoolBuilder::new().num_threads(n_jobs).build()?;
        Ok(DataLoader {
            sampler,
            batch_size: batch_size.max(1),
            rng: None,
            pool,
        })
    }
    /// Reshuffle the sample order on every pass, optionally from a fixed seed
    pub fn shuffled(mut self, seed: Option<u64>) -> DataLoader<'a> {
        self.rng = Some(match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        });
        self
    }
    /// The sampler being loaded
    pub fn sampler(&self) -> &'a TsSampler {
        self.sampler
    }
    /// The number of batches in one pass
    pub fn len(&self) -> usize {
        (self.sampler.len() + self.batch_size - 1) / self.batch_size
    }
    /// Whether a pass yields no batches
    pub fn is_empty(&self) -> bool {
        self.sampler.is_empty()
    }
    /// Start a pass over the data, reshuffling if this loader shuffles
    pub fn iter(&mut self) -> Batches<'_, 'a> {
        let mut order: Vec<usize> = (0..self.sampler.len()).collect();
        if let Some(rng) = &mut self.rng {
            order.shuffle(rng);
        }
        Batches {
            loader: &*self,
            order,
            pos: 0,
        }
    }
}

/// One pass of a `DataLoader`, yielding `[batch, step_len, d_feat + 1]` tensors
#[derive(Debug)]
pub struct Batches<'l, 'a> {
    loader: &'l DataLoader<'a>,
    order: Vec<usize>,
    pos: usize,
}

impl<'l, 'a> Batches<'l, 'a> {
    /// The sample indices of the batches not yet yielded, in order
    pub fn remaining(&self) -> &[usize] {
        &self.order[self.pos..]
    }
}

impl<'l, 'a> Iterator for Batches<'l, 'a> {
    type Item = Tensor;
    fn next(&mut self) -> Option<Tensor> {
        if self.pos >= self.order.len() {
            return None;
        }
        let end = (self.pos + self.loader.batch_size).min(self.order.len());
        let indices = &self.order[self.pos..end];
        let sampler = self.loader.sampler;
        let batch = self.loader.pool.install(|| sampler.batch(indices));
        self.pos = end;
        Some(batch)
    }
    fn size_hint(&self) -> (usize, Option<usize>) {
        let left = self.order.len() - self.pos;
        let batches = (left + self.loader.batch_size - 1) / self.loader.batch_size;
        (batches, Some(batches))
    }
}

impl<'l, 'a> ExactSizeIterator for Batches<'l, 'a> {}
