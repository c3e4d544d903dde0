use rand::Rng;

/// A random action distribution that favours some actions
///
/// A single roll is compared against the cumulative mass of the preferred
/// actions in order; when it lands past all of them, an action is drawn
/// uniformly from the whole space instead.
#[derive(Debug, Clone, PartialEq)]
pub struct BiasedRandom {
    preferred: Vec<(usize, f32)>,
}

impl BiasedRandom {
    /// **Panics** if any mass is negative or the masses sum to more than 1
    pub fn new(preferred: Vec<(usize, f32)>) -> Self {
        assert!(
            preferred.iter().all(|&(_, p)| p >= 0.0),
            "Preferred action mass must be non-negative"
        );
        let total: f32 = preferred.iter().map(|&(_, p)| p).sum();
        assert!(total <= 1.0, "Preferred action mass must not exceed 1, got {total}");
        Self { preferred }
    }

    /// Plain uniform sampling
    pub fn uniform() -> Self {
        Self {
            preferred: Vec::new(),
        }
    }

    /// Highest action index this distribution can prefer
    pub fn max_index(&self) -> Option<usize> {
        self.preferred.iter().map(|&(i, _)| i).max()
    }

    /// Draw an action index from `0..count`
    pub fn sample<R: Rng + ?Sized>(&self, count: usize, rng: &mut R) -> usize {
        let roll = rng.gen::<f32>();
        let mut cumulative = 0.0;
        for &(index, mass) in &self.preferred {
            cumulative += mass;
            if roll < cumulative {
                return index;
            }
        }
        rng.gen_range(0..count)
    }
}

impl Default for BiasedRandom {
    fn default() -> Self {
        Self::uniform()
    }
}

#[cfg(test)]
mod tests {
    use rand::{rngs::StdRng, SeedableRng};

    use super::*;

    #[test]
    fn preferred_actions_dominate() {
        let dist = BiasedRandom::new(vec![(2, 0.35), (4, 0.2), (3, 0.2)]);
        let mut rng = StdRng::seed_from_u64(42);
        let mut counts = [0usize; 6];
        for _ in 0..60_000 {
            counts[dist.sample(6, &mut rng)] += 1;
        }

        // Expected shares: right ~0.39, right+jump ~0.24, jump ~0.24, others ~0.04
        let share = |i: usize| counts[i] as f32 / 60_000.0;
        assert!((share(2) - 0.392).abs() < 0.02, "right share {}", share(2));
        assert!((share(4) - 0.242).abs() < 0.02, "right+jump share {}", share(4));
        assert!((share(3) - 0.242).abs() < 0.02, "jump share {}", share(3));
        for i in [0, 1, 5] {
            assert!((share(i) - 0.042).abs() < 0.01, "action {i} share {}", share(i));
        }
    }

    #[test]
    fn uniform_covers_all_actions() {
        let dist = BiasedRandom::uniform();
        let mut rng = StdRng::seed_from_u64(1);
        let mut seen = [false; 6];
        for _ in 0..1000 {
            seen[dist.sample(6, &mut rng)] = true;
        }
        assert!(seen.iter().all(|&s| s));
        assert_eq!(dist.max_index(), None);
    }

    #[test]
    #[should_panic(expected = "must not exceed 1")]
    fn rejects_excess_mass() {
        BiasedRandom::new(vec![(0, 0.6), (1, 0.6)]);
    }
}
