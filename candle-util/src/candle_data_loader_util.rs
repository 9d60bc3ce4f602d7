use rand::prelude::SliceRandom;
use rand::Rng;

///
/// A helper `struct` for shuffling and creating minibatch indexes;
/// after `shuffle_minibatch` is called, `chunks` partition indexes.
///
pub struct Minibatches {
    pub samples: Vec<usize>,
    pub chunks: Vec<Vec<usize>>,
}

impl Minibatches {
    pub fn new(nsamples: usize) -> Self {
        Self {
            samples: (0..nsamples).collect(),
            chunks: vec![],
        }
    }

    /// Shuffle the samples and cut them into consecutive chunks of
    /// `batch_size`; every sample lands in exactly one chunk
    pub fn shuffle_minibatch(&mut self, batch_size: usize) {
        let mut rng = rand::rng();
        self.shuffle_minibatch_with(batch_size, &mut rng);
    }

    pub fn shuffle_minibatch_with<R: Rng + ?Sized>(&mut self, batch_size: usize, rng: &mut R) {
        self.samples.shuffle(rng);
        self.chunk_in_order(batch_size);
    }

    /// Chunk without shuffling, e.g., for evaluation in data order
    pub fn chunk_in_order(&mut self, batch_size: usize) {
        let batch_size = batch_size.max(1);
        self.chunks = self
            .samples
            .chunks(batch_size)
            .map(|c| c.to_vec())
            .collect();
    }

    pub fn size(&self) -> usize {
        self.samples.len()
    }

    pub fn num_chunks(&self) -> usize {
        self.chunks.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chunks_partition_samples() {
        let mut mb = Minibatches::new(23);
        mb.shuffle_minibatch(5);
        assert_eq!(mb.num_chunks(), 5);
        assert_eq!(mb.chunks.last().map(|c| c.len()), Some(3));

        let mut seen: Vec<usize> = mb.chunks.iter().flatten().copied().collect();
        seen.sort();
        assert_eq!(seen, (0..23).collect::<Vec<_>>());
    }
}
