//! Shared helpers for the parallel drivers: cancellation, thread pools and
//! sample quantiles.
use rayon::{ThreadPool, ThreadPoolBuilder};
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

/// Cooperative cancellation flag shared between a caller and a running
/// sweep or bootstrap. Cloning shares the flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Local rayon pool with `n_threads` workers (`None`: one per core).
pub fn build_pool(n_threads: Option<usize>) -> Result<ThreadPool, rayon::ThreadPoolBuildError> {
    let mut builder = ThreadPoolBuilder::new();
    if let Some(n) = n_threads {
        builder = builder.num_threads(n);
    }
    builder.build()
}

/// Type-7 sample quantile (linear interpolation between order statistics,
/// the default of most statistics packages). `sorted` must be ascending and
/// non-empty; `q` is clamped to `[0, 1]`.
pub fn quantile_type7(sorted: &[f64], q: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = (n - 1) as f64 * q.clamp(0.0, 1.0);
    let lo = h.floor() as usize;
    let hi = (lo + 1).min(n - 1);
    sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    // Purpose
    // -------
    // Type-7 quantiles interpolate between order statistics.
    //
    // Given
    // -----
    // - x = [1, 2, 3, 4, 10].
    //
    // Expect
    // ------
    // - q(0) = 1, q(0.5) = 3, q(0.9) = 4 + 0.6·6 = 7.6, q(1) = 10.
    fn quantile_type7_matches_reference_values() {
        let x = [1.0, 2.0, 3.0, 4.0, 10.0];
        assert_eq!(quantile_type7(&x, 0.0), 1.0);
        assert_eq!(quantile_type7(&x, 0.5), 3.0);
        assert_relative_eq!(quantile_type7(&x, 0.9), 7.6, epsilon = 1e-12);
        assert_eq!(quantile_type7(&x, 1.0), 10.0);
        assert_eq!(quantile_type7(&[5.0], 0.3), 5.0);
    }

    #[test]
    fn cancel_token_is_shared_between_clones() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn build_pool_honours_thread_count() {
        let pool = build_pool(Some(2)).expect("pool");
        assert_eq!(pool.current_num_threads(), 2);
    }
}
