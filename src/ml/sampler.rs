//! Class-balancing samplers.

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

/// Reduce every class to the size of the smallest one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RandomUnderSampler {
    pub seed: u64,
}

impl Default for RandomUnderSampler {
    fn default() -> Self {
        Self { seed: 0 }
    }
}

impl RandomUnderSampler {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    /// Indices of the rows kept, ascending. Classes absent from `y` are ignored.
    pub fn sample_indices(&self, y: &[usize], n_classes: usize) -> Vec<usize> {
        let mut by_class: Vec<Vec<usize>> = vec![Vec::new(); n_classes];
        for (idx, &class_idx) in y.iter().enumerate() {
            if let Some(bucket) = by_class.get_mut(class_idx) {
                bucket.push(idx);
            }
        }
        let Some(target) = by_class
            .iter()
            .map(Vec::len)
            .filter(|&len| len > 0)
            .min()
        else {
            return Vec::new();
        };

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut kept = Vec::with_capacity(target * n_classes);
        for mut bucket in by_class.into_iter().filter(|bucket| !bucket.is_empty()) {
            if bucket.len() > target {
                bucket.shuffle(&mut rng);
                bucket.truncate(target);
            }
            kept.extend(bucket);
        }
        kept.sort_unstable();
        kept
    }

    /// Apply the sampler to a feature matrix and its class indices.
    pub fn fit_resample(
        &self,
        x: &[Vec<f32>],
        y: &[usize],
        n_classes: usize,
    ) -> (Vec<Vec<f32>>, Vec<usize>) {
        let kept = self.sample_indices(y, n_classes);
        let xs = kept.iter().map(|&idx| x[idx].clone()).collect();
        let ys = kept.iter().map(|&idx| y[idx]).collect();
        (xs, ys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn balances_majority_class() {
        let y = vec![0, 0, 0, 0, 0, 0, 1, 1, 0, 0];
        let kept = RandomUnderSampler::default().sample_indices(&y, 2);
        assert_eq!(kept.len(), 4);
        assert_eq!(kept.iter().filter(|&&idx| y[idx] == 1).count(), 2);
        assert!(kept.windows(2).all(|w| w[0] < w[1]));
        assert!(kept.contains(&6) && kept.contains(&7));
    }

    #[test]
    fn same_seed_same_sample() {
        let y: Vec<usize> = (0..100).map(|i| usize::from(i % 5 == 0)).collect();
        let a = RandomUnderSampler::new(0).sample_indices(&y, 2);
        let b = RandomUnderSampler::new(0).sample_indices(&y, 2);
        assert_eq!(a, b);
        assert_eq!(a.len(), 40);
    }

    #[test]
    fn single_class_keeps_everything() {
        let y = vec![1, 1, 1];
        assert_eq!(RandomUnderSampler::default().sample_indices(&y, 2), vec![0, 1, 2]);
        assert!(RandomUnderSampler::default().sample_indices(&[], 2).is_empty());
    }

    #[test]
    fn resample_keeps_rows_aligned() {
        let x = vec![vec![0.0], vec![1.0], vec![2.0]];
        let y = vec![0, 1, 0];
        let (xs, ys) = RandomUnderSampler::default().fit_resample(&x, &y, 2);
        assert_eq!(xs.len(), 2);
        for (row, class_idx) in xs.iter().zip(&ys) {
            assert_eq!(y[row[0] as usize], *class_idx);
        }
    }
}
