use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};

/// Per-session sampling decision.
///
/// A decision is drawn only for top-level statements; every statement
/// nested below it reuses that outcome until the next top-level statement.
#[derive(Debug)]
pub struct SamplingDecider {
    sampled: AtomicBool,
    rng: Mutex<StdRng>,
}

impl SamplingDecider {
    /// Decider seeded from the operating system.
    pub fn new() -> Self {
        Self::from_rng(StdRng::from_os_rng())
    }

    /// Decider with a reproducible sequence.
    pub fn with_seed(seed: u64) -> Self {
        Self::from_rng(StdRng::seed_from_u64(seed))
    }

    fn from_rng(rng: StdRng) -> Self {
        Self {
            sampled: AtomicBool::new(true),
            rng: Mutex::new(rng),
        }
    }

    /// Decide whether the statement being started is sampled.
    ///
    /// A new draw happens only when `is_top_level` and `logging_enabled`
    /// both hold; otherwise the stored outcome is returned unchanged. The
    /// draw is uniform over `[0, 1)` and compared with `<`, so a rate of
    /// `1.0` always samples and `0.0` never does.
    pub fn should_sample(
        &self,
        is_top_level: bool,
        logging_enabled: bool,
        sample_rate: f64,
    ) -> bool {
        if is_top_level && logging_enabled {
            let draw: f64 = self
                .rng
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .random();
            let sampled = draw < sample_rate;
            tracing::trace!(target: "auto_explain", sample_rate, sampled, "sampling decision");
            self.sampled.store(sampled, Ordering::Relaxed);
            sampled
        } else {
            self.current()
        }
    }

    /// Outcome of the most recent top-level decision.
    pub fn current(&self) -> bool {
        self.sampled.load(Ordering::Relaxed)
    }
}

impl Default for SamplingDecider {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TRIALS: usize = 10_000;

    #[test]
    fn rate_zero_never_samples() {
        let decider = SamplingDecider::with_seed(7);
        let positives = (0..TRIALS)
            .filter(|_| decider.should_sample(true, true, 0.0))
            .count();
        assert_eq!(positives, 0);
    }

    #[test]
    fn rate_one_always_samples() {
        let decider = SamplingDecider::with_seed(7);
        let negatives = (0..TRIALS)
            .filter(|_| !decider.should_sample(true, true, 1.0))
            .count();
        assert_eq!(negatives, 0);
    }

    #[test]
    fn fractional_rate_samples_roughly_that_fraction() {
        let decider = SamplingDecider::with_seed(42);
        let positives = (0..TRIALS)
            .filter(|_| decider.should_sample(true, true, 0.25))
            .count();
        assert!((2_000..3_000).contains(&positives), "{positives}");
    }

    #[test]
    fn nested_statements_inherit_the_top_level_outcome() {
        let decider = SamplingDecider::with_seed(1);

        let top = decider.should_sample(true, true, 0.0);
        assert!(!top);
        for _ in 0..100 {
            assert!(!decider.should_sample(false, true, 1.0));
        }

        let top = decider.should_sample(true, true, 1.0);
        assert!(top);
        for _ in 0..100 {
            assert!(decider.should_sample(false, true, 0.0));
        }
    }

    #[test]
    fn disabled_logging_keeps_previous_outcome() {
        let decider = SamplingDecider::with_seed(3);
        assert!(decider.current());

        decider.should_sample(true, true, 0.0);
        assert!(!decider.should_sample(true, false, 1.0));
    }
}
