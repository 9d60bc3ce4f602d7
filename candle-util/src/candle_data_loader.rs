use crate::candle_data_loader_util::Minibatches;

use candle_core::{DType, Device, Tensor};
use rayon::prelude::*;

pub struct MinibatchData {
    pub input: Tensor,
    /// row positions of this minibatch in the original data
    pub rows: Vec<usize>,
}

/// `DataLoader` for minibatch learning
pub trait DataLoader {
    fn minibatch_data(
        &self,
        batch_idx: usize,
        target_device: &Device,
    ) -> anyhow::Result<MinibatchData>;

    fn num_minibatch(&self) -> usize;

    fn shuffle_minibatch(&mut self, batch_size: usize) -> anyhow::Result<()>;
}

///
/// A simple data loader for an in-memory document x word count
/// matrix. Each row is a bag-of-words vector.
///
pub struct InMemoryData {
    data_nd: Tensor,
    minibatches: Minibatches,
}

impl InMemoryData {
    ///
    /// Create a data loader from `(row, col, value)` triplets
    ///
    pub fn from_triplets(
        triplets: &[(usize, usize, f32)],
        nrows: usize,
        ncols: usize,
    ) -> anyhow::Result<Self> {
        let mut dense = vec![0f32; nrows * ncols];
        for &(i, j, x) in triplets {
            if i >= nrows || j >= ncols {
                return Err(anyhow::anyhow!(
                    "entry ({}, {}) out of bounds for {} x {}",
                    i,
                    j,
                    nrows,
                    ncols
                ));
            }
            dense[i * ncols + j] += x;
        }
        Self::from_dense(dense, nrows, ncols)
    }

    ///
    /// Create a data loader from row-major values
    ///
    pub fn from_dense(values: Vec<f32>, nrows: usize, ncols: usize) -> anyhow::Result<Self> {
        if values.par_iter().any(|x| *x < 0.0 || !x.is_finite()) {
            return Err(anyhow::anyhow!("counts must be finite and non-negative"));
        }
        let data_nd = Tensor::from_vec(values, (nrows, ncols), &Device::Cpu)?;
        Ok(Self {
            data_nd,
            minibatches: Minibatches::new(nrows),
        })
    }

    pub fn num_rows(&self) -> usize {
        self.minibatches.size()
    }

    pub fn num_columns(&self) -> anyhow::Result<usize> {
        Ok(self.data_nd.dim(1)?)
    }

    /// Chunk rows in their original order
    pub fn ordered_minibatch(&mut self, batch_size: usize) {
        self.minibatches.chunk_in_order(batch_size);
    }
}

impl DataLoader for InMemoryData {
    fn minibatch_data(
        &self,
        batch_idx: usize,
        target_device: &Device,
    ) -> anyhow::Result<MinibatchData> {
        let rows = self
            .minibatches
            .chunks
            .get(batch_idx)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "invalid index = {} vs. total # = {}",
                    batch_idx,
                    self.minibatches.num_chunks()
                )
            })?
            .clone();

        let idx = Tensor::from_iter(rows.iter().map(|&i| i as u32), &Device::Cpu)?;
        let input = self
            .data_nd
            .index_select(&idx, 0)?
            .to_dtype(DType::F32)?
            .to_device(target_device)?;

        Ok(MinibatchData { input, rows })
    }

    fn num_minibatch(&self) -> usize {
        self.minibatches.num_chunks()
    }

    fn shuffle_minibatch(&mut self, batch_size: usize) -> anyhow::Result<()> {
        if batch_size == 0 {
            return Err(anyhow::anyhow!("minibatch size must be positive"));
        }
        self.minibatches.shuffle_minibatch(batch_size);
        Ok(())
    }
}
