//! Environment abstraction for deterministic testing.
//!
//! Decouples protocol logic from system time. State machines take instants as
//! parameters, so production code runs on `std::time::Instant` while tests
//! drive a virtual clock forward explicitly.

use std::time::Duration;

/// Abstract environment providing time and the one async primitive drivers
/// need.
///
/// # Invariants
///
/// - `now()` never goes backwards within a single execution context.
/// - `sleep()` is only called by driver code, never by state machines.
pub trait Environment: Clone + Send + Sync + 'static {
    /// The specific instant type used by this environment.
    ///
    /// Production environments use `std::time::Instant`; tests use the same
    /// type fed from a controllable clock.
    type Instant: Copy + Ord + Send + Sync + std::ops::Sub<Output = Duration>;

    /// Current time (monotonic).
    fn now(&self) -> Self::Instant;

    /// Sleeps for the specified duration.
    ///
    /// The only async method in the trait; state machines express delays as
    /// deadlines checked on tick instead.
    fn sleep(&self, duration: Duration) -> impl std::future::Future<Output = ()> + Send;
}

/// Test environments with a manually advanced clock.
pub mod test_utils {
    use std::{
        sync::{
            Arc,
            atomic::{AtomicU64, Ordering},
        },
        time::{Duration, Instant},
    };

    use super::Environment;

    /// Deterministic environment for unit tests.
    ///
    /// Time starts at construction and only moves when [`MockEnv::advance`]
    /// is called, so tests control exactly which deadlines have elapsed.
    #[derive(Clone)]
    pub struct MockEnv {
        start: Instant,
        elapsed_ms: Arc<AtomicU64>,
    }

    impl MockEnv {
        /// Create a mock environment with the clock at zero.
        pub fn new() -> Self {
            Self { start: Instant::now(), elapsed_ms: Arc::new(AtomicU64::new(0)) }
        }

        /// Advance the virtual clock.
        pub fn advance(&self, duration: Duration) {
            let ms = u64::try_from(duration.as_millis()).unwrap_or(u64::MAX);
            self.elapsed_ms.fetch_add(ms, Ordering::SeqCst);
        }
    }

    impl Default for MockEnv {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Environment for MockEnv {
        type Instant = Instant;

        fn now(&self) -> Instant {
            self.start + Duration::from_millis(self.elapsed_ms.load(Ordering::SeqCst))
        }

        fn sleep(&self, _duration: Duration) -> impl std::future::Future<Output = ()> + Send {
            // Virtual time: sleeping completes immediately
            std::future::ready(())
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn clock_only_moves_on_advance() {
            let env = MockEnv::new();
            let t0 = env.now();
            assert_eq!(env.now(), t0);

            env.advance(Duration::from_secs(3));
            assert_eq!(env.now() - t0, Duration::from_secs(3));
        }

        #[test]
        fn clones_share_the_clock() {
            let env = MockEnv::new();
            let other = env.clone();
            env.advance(Duration::from_millis(250));
            assert_eq!(other.now(), env.now());
        }
    }
}
