use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::config::SamplingMode;
use crate::error::{DqnError, Result};
use crate::rl::experience::{Experience, SampledBatch};

/// A fixed-capacity ring of experiences.
///
/// Once full, every push overwrites the slot under the write cursor, which is
/// always the oldest surviving experience. Sampling draws from its own seeded
/// generator so results only depend on the seed and the push order.
pub struct ReplayBuffer {
    /// Maximum capacity of the buffer.
    capacity: usize,
    /// The backing slots.
    buffer: Vec<Experience>,
    /// Next slot to write.
    position: usize,
    rng: StdRng,
    sampling: SamplingMode,
}

impl ReplayBuffer {
    /// Create an empty buffer.
    ///
    /// # Arguments
    /// * `capacity` - Maximum number of stored experiences, must be positive.
    /// * `seed` - Seed of the sampling generator.
    pub fn new(capacity: usize, seed: u64) -> Result<Self> {
        if capacity == 0 {
            return Err(DqnError::Configuration(
                "replay buffer capacity must be positive".to_string(),
            ));
        }
        Ok(Self {
            capacity,
            buffer: Vec::with_capacity(capacity),
            position: 0,
            rng: StdRng::seed_from_u64(seed),
            sampling: SamplingMode::WithoutReplacement,
        })
    }

    /// Choose between sampling with or without replacement.
    pub fn with_sampling(mut self, sampling: SamplingMode) -> Self {
        self.sampling = sampling;
        self
    }

    /// Reseed the sampling generator.
    pub fn set_seed(&mut self, seed: u64) {
        self.rng = StdRng::seed_from_u64(seed);
    }

    /// Store `experience`, overwriting the oldest one once full.
    pub fn push(&mut self, experience: Experience) {
        if self.buffer.len() < self.capacity {
            self.buffer.push(experience);
        } else {
            self.buffer[self.position] = experience;
        }
        self.position = (self.position + 1) % self.capacity;
    }

    /// Slots picked for a batch of `batch_size`.
    pub fn sample_indices(&mut self, batch_size: usize) -> Result<Vec<usize>> {
        let len = self.buffer.len();
        if batch_size > len {
            return Err(DqnError::InsufficientData { requested: batch_size, available: len });
        }
        let indices = match self.sampling {
            SamplingMode::WithoutReplacement => {
                rand::seq::index::sample(&mut self.rng, len, batch_size).into_vec()
            }
            SamplingMode::WithReplacement => {
                (0..batch_size).map(|_| self.rng.gen_range(0..len)).collect()
            }
        };
        Ok(indices)
    }

    /// Sample a batch uniformly at random.
    pub fn sample(&mut self, batch_size: usize) -> Result<SampledBatch> {
        let indices = self.sample_indices(batch_size)?;
        let picked: Vec<&Experience> = indices.iter().map(|&i| &self.buffer[i]).collect();
        Ok(SampledBatch::from_experiences(&picked))
    }

    /// Number of stored experiences, never above `capacity`.
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// Whether nothing has been pushed yet.
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Maximum capacity of the buffer.
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Stored experiences in slot order (not insertion order once the ring wrapped).
    pub fn iter(&self) -> impl Iterator<Item = &Experience> {
        self.buffer.iter()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;
    use crate::graph::{HeteroGraph, NodeKind};

    /// Experience tagged by its reward so tests can tell them apart.
    fn tagged(tag: usize) -> Experience {
        let graph = HeteroGraph::new().with_nodes(NodeKind::Application, vec![vec![tag as f32]]);
        Experience::new(graph.clone(), vec![0], vec![tag as f32], graph)
    }

    fn tags(buffer: &ReplayBuffer) -> HashSet<usize> {
        buffer.iter().map(|e| e.rewards[0] as usize).collect()
    }

    #[test]
    fn zero_capacity_is_a_configuration_error() {
        assert!(matches!(ReplayBuffer::new(0, 1), Err(DqnError::Configuration(_))));
    }

    #[test]
    fn overflow_keeps_only_the_most_recent() {
        let mut buffer = ReplayBuffer::new(3, 0).unwrap();
        for tag in 0..3 {
            buffer.push(tagged(tag));
        }
        assert_eq!(buffer.len(), 3);

        for tag in 3..8 {
            buffer.push(tagged(tag));
            assert_eq!(buffer.len(), 3);
            let expected: HashSet<usize> = (tag - 2..=tag).collect();
            assert_eq!(tags(&buffer), expected);
        }
    }

    #[test]
    fn samples_are_distinct_stored_elements() {
        let mut buffer = ReplayBuffer::new(10, 5).unwrap();
        for tag in 0..10 {
            buffer.push(tagged(tag));
        }
        for _ in 0..50 {
            let indices = buffer.sample_indices(10).unwrap();
            let unique: HashSet<usize> = indices.iter().copied().collect();
            assert_eq!(unique.len(), 10);
        }
        let batch = buffer.sample(4).unwrap();
        assert_eq!(batch.len(), 4);
        let rewards: HashSet<usize> = batch.rewards.iter().map(|r| *r as usize).collect();
        assert_eq!(rewards.len(), 4);
        assert!(rewards.iter().all(|r| *r < 10));
    }

    #[test]
    fn same_seed_and_pushes_give_same_samples() {
        let run = |seed| {
            let mut buffer = ReplayBuffer::new(20, seed).unwrap();
            for tag in 0..30 {
                buffer.push(tagged(tag));
            }
            (0..5).map(|_| buffer.sample(6).unwrap().rewards).collect::<Vec<_>>()
        };
        assert_eq!(run(11), run(11));
        assert_ne!(run(11), run(12));
    }

    #[test]
    fn reseeding_restarts_the_sequence() {
        let mut buffer = ReplayBuffer::new(8, 3).unwrap();
        for tag in 0..8 {
            buffer.push(tagged(tag));
        }
        buffer.set_seed(9);
        let first = buffer.sample_indices(5).unwrap();
        buffer.set_seed(9);
        assert_eq!(buffer.sample_indices(5).unwrap(), first);
    }

    #[test]
    fn oversized_request_is_insufficient_data() {
        let mut buffer = ReplayBuffer::new(5, 0).unwrap();
        buffer.push(tagged(0));
        assert!(matches!(
            buffer.sample(2),
            Err(DqnError::InsufficientData { requested: 2, available: 1 })
        ));
    }

    #[test]
    fn sampling_with_replacement_stays_in_range() {
        let mut buffer = ReplayBuffer::new(4, 2).unwrap().with_sampling(SamplingMode::WithReplacement);
        for tag in 0..4 {
            buffer.push(tagged(tag));
        }
        let indices = buffer.sample_indices(4).unwrap();
        assert_eq!(indices.len(), 4);
        assert!(indices.iter().all(|i| *i < 4));
    }
}
