//! Identifier samplers for the three workload distributions

use rand::Rng;
use std::collections::VecDeque;

/// Default size of the recency window
pub const RECENCY_WINDOW: usize = 50;

/// Default probability of drawing from the recency window
pub const RECENCY_BIAS: f64 = 0.8;

pub trait IdSampler {
    /// Next identifier to request, or `None` when the pool is empty
    fn next_id<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String>;
}

/// Every identifier equally likely
#[derive(Debug, Clone)]
pub struct UniformSampler {
    ids: Vec<String>,
}

impl UniformSampler {
    pub fn new(ids: Vec<String>) -> Self {
        Self { ids }
    }
}

impl IdSampler for UniformSampler {
    fn next_id<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        pick_uniform(&self.ids, rng).cloned()
    }
}

/// Popularity-weighted sampling by cumulative-weight inversion
#[derive(Debug, Clone)]
pub struct WeightedSampler {
    ids: Vec<String>,
    /// Running sum of weights, strictly increasing
    cumulative: Vec<u64>,
}

impl WeightedSampler {
    /// Entries with a zero weight are dropped
    pub fn new(weighted: impl IntoIterator<Item = (String, u64)>) -> Self {
        let mut ids = Vec::new();
        let mut cumulative = Vec::new();
        let mut running = 0u64;

        for (id, weight) in weighted {
            if weight == 0 {
                continue;
            }
            running += weight;
            ids.push(id);
            cumulative.push(running);
        }

        Self { ids, cumulative }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn total_weight(&self) -> u64 {
        self.cumulative.last().copied().unwrap_or(0)
    }
}

impl IdSampler for WeightedSampler {
    fn next_id<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        let total = self.total_weight();
        if total == 0 {
            return None;
        }

        let threshold = rng.random_range(0..total);
        let index = self.cumulative.partition_point(|&c| c <= threshold);
        self.ids.get(index).cloned()
    }
}

/// Favours identifiers from a bounded window of recent picks
#[derive(Debug, Clone)]
pub struct RecencySampler {
    ids: Vec<String>,
    recent: VecDeque<String>,
    window: usize,
    bias: f64,
}

impl RecencySampler {
    pub fn new(ids: Vec<String>, window: usize, bias: f64) -> Self {
        Self {
            ids,
            recent: VecDeque::with_capacity(window + 1),
            window,
            bias: bias.clamp(0.0, 1.0),
        }
    }

    /// Most recent pick last
    pub fn recent(&self) -> impl Iterator<Item = &str> {
        self.recent.iter().map(String::as_str)
    }

    fn remember(&mut self, id: &str) {
        if let Some(pos) = self.recent.iter().position(|r| r == id) {
            self.recent.remove(pos);
        }
        self.recent.push_back(id.to_string());
        while self.recent.len() > self.window {
            self.recent.pop_front();
        }
    }
}

impl IdSampler for RecencySampler {
    fn next_id<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        if self.ids.is_empty() {
            return None;
        }

        let use_recent = !self.recent.is_empty() && rng.random::<f64>() < self.bias;
        let chosen = if use_recent {
            let index = rng.random_range(0..self.recent.len());
            self.recent[index].clone()
        } else {
            pick_uniform(&self.ids, rng)?.clone()
        };

        self.remember(&chosen);
        Some(chosen)
    }
}

/// Sampler chosen at runtime
#[derive(Debug, Clone)]
pub enum Sampler {
    Uniform(UniformSampler),
    Weighted(WeightedSampler),
    Recency(RecencySampler),
}

impl IdSampler for Sampler {
    fn next_id<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Option<String> {
        match self {
            Self::Uniform(s) => s.next_id(rng),
            Self::Weighted(s) => s.next_id(rng),
            Self::Recency(s) => s.next_id(rng),
        }
    }
}

fn pick_uniform<'a, R: Rng + ?Sized>(ids: &'a [String], rng: &mut R) -> Option<&'a String> {
    if ids.is_empty() {
        return None;
    }
    ids.get(rng.random_range(0..ids.len()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use std::collections::HashMap;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("id-{}", i)).collect()
    }

    #[test]
    fn test_weighted_frequency_matches_scores() {
        let mut sampler = WeightedSampler::new(vec![
            ("a".to_string(), 500),
            ("b".to_string(), 100),
            ("c".to_string(), 5),
            ("d".to_string(), 1),
        ]);
        let mut rng = StdRng::seed_from_u64(7);
        let draws = 20_000;

        let mut counts: HashMap<String, usize> = HashMap::new();
        for _ in 0..draws {
            *counts.entry(sampler.next_id(&mut rng).unwrap()).or_default() += 1;
        }

        let observed = counts["a"] as f64 / draws as f64;
        let expected = 500.0 / 606.0;
        assert!(
            (observed - expected).abs() < 0.02,
            "observed {} expected {}",
            observed,
            expected
        );
        assert!(counts["b"] > counts["c"]);
    }

    #[test]
    fn test_weighted_boundaries() {
        let sampler = WeightedSampler::new(vec![
            ("zero".to_string(), 0),
            ("a".to_string(), 3),
            ("b".to_string(), 2),
        ]);
        assert_eq!(sampler.len(), 2);
        assert_eq!(sampler.total_weight(), 5);

        // threshold 0..=2 -> a, 3..=4 -> b
        assert_eq!(sampler.cumulative.partition_point(|&c| c <= 2), 0);
        assert_eq!(sampler.cumulative.partition_point(|&c| c <= 3), 1);
        assert_eq!(sampler.cumulative.partition_point(|&c| c <= 4), 1);
    }

    #[test]
    fn test_empty_samplers_yield_nothing() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(UniformSampler::new(vec![]).next_id(&mut rng).is_none());
        assert!(WeightedSampler::new(vec![]).next_id(&mut rng).is_none());
        assert!(RecencySampler::new(vec![], 5, 0.8).next_id(&mut rng).is_none());
    }

    #[test]
    fn test_uniform_covers_pool() {
        let mut sampler = UniformSampler::new(ids(4));
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(sampler.next_id(&mut rng).unwrap());
        }
        assert_eq!(seen.len(), 4);
    }

    #[test]
    fn test_recency_window_is_bounded_and_unique() {
        let mut sampler = RecencySampler::new(ids(1000), 10, 0.5);
        let mut rng = StdRng::seed_from_u64(11);

        for _ in 0..500 {
            let id = sampler.next_id(&mut rng).unwrap();
            let recent: Vec<&str> = sampler.recent().collect();
            assert!(recent.len() <= 10);
            assert_eq!(recent.last().copied(), Some(id.as_str()));

            let unique: std::collections::HashSet<_> = recent.iter().collect();
            assert_eq!(unique.len(), recent.len());
        }
    }

    #[test]
    fn test_recency_bias_repeats_recent_ids() {
        let mut sampler = RecencySampler::new(ids(100_000), RECENCY_WINDOW, RECENCY_BIAS);
        let mut rng = StdRng::seed_from_u64(5);

        let mut repeats = 0;
        let mut seen = std::collections::HashSet::new();
        let draws = 5_000;
        for _ in 0..draws {
            let id = sampler.next_id(&mut rng).unwrap();
            if !seen.insert(id) {
                repeats += 1;
            }
        }

        // About 80% of draws come from the window; a uniform draw over 100k
        // ids almost never repeats.
        let ratio = repeats as f64 / draws as f64;
        assert!(ratio > 0.7 && ratio < 0.9, "repeat ratio {}", ratio);
    }

    #[test]
    fn test_recency_without_bias_is_uniform() {
        let mut sampler = RecencySampler::new(ids(3), 2, 0.0);
        let mut rng = StdRng::seed_from_u64(9);
        for _ in 0..50 {
            assert!(sampler.next_id(&mut rng).is_some());
        }
        assert!(sampler.recent().count() <= 2);
    }
}
