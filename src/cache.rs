//! Tree cache
//!
//! Owns the current namespace snapshot and rebuilds it from the backend when it
//! is older than the TTL or has been invalidated. Readers clone an `Arc<Tree>`
//! and keep traversing that snapshot even if a newer one is swapped in.
//!
//! Rebuilds are single-flight: callers that find the cache stale queue on one
//! rebuild lock, and whoever gets it second sees either the fresh tree or the
//! failure of the attempt it waited on. A failed rebuild never replaces the
//! previous tree, which stays available as the last known good snapshot.

use crate::backend::Backend;
use crate::error::FsError;
use crate::tree::{Tree, TreeBuilder};
use parking_lot::{Mutex, RwLock};
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime};
use tracing::{info, warn};

/// Default time a tree stays fresh
pub const DEFAULT_TTL: Duration = Duration::from_secs(30);

/// Time source for cache expiry
pub trait Clock: Send + Sync {
    /// Monotonic time used for TTL checks
    fn now(&self) -> Instant;

    /// Wall clock time stamped on rebuilt trees
    fn system_time(&self) -> SystemTime;
}

/// The real clock
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug)]
pub struct ManualClock {
    origin: Instant,
    elapsed: Mutex<Duration>,
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            elapsed: Mutex::new(Duration::ZERO),
        }
    }

    pub fn advance(&self, by: Duration) {
        *self.elapsed.lock() += by;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + *self.elapsed.lock()
    }

    fn system_time(&self) -> SystemTime {
        SystemTime::UNIX_EPOCH + *self.elapsed.lock()
    }
}

/// Cache counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    /// Successful rebuilds
    pub builds: u64,
    /// Failed rebuilds
    pub failures: u64,
    /// Explicit invalidations
    pub invalidations: u64,
}

#[derive(Default)]
struct CacheState {
    tree: Option<Arc<Tree>>,
    built_at: Option<Instant>,
    stale: bool,
    /// Bumped by every invalidation
    generation: u64,
    /// Rebuild attempts finished so far
    attempts: u64,
    /// Attempt number and error of the most recent failed rebuild
    last_failure: Option<(u64, FsError)>,
    stats: CacheStats,
}

/// TTL cache around the namespace tree
pub struct TreeCache {
    backend: Arc<dyn Backend>,
    builder: TreeBuilder,
    ttl: Duration,
    clock: Arc<dyn Clock>,
    state: RwLock<CacheState>,
    /// Held for the duration of a rebuild
    rebuild: Mutex<()>,
}

impl TreeCache {
    pub fn new(backend: Arc<dyn Backend>, builder: TreeBuilder, ttl: Duration) -> Self {
        Self::with_clock(backend, builder, ttl, Arc::new(SystemClock))
    }

    pub fn with_clock(
        backend: Arc<dyn Backend>,
        builder: TreeBuilder,
        ttl: Duration,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            backend,
            builder,
            ttl,
            clock,
            state: RwLock::new(CacheState::default()),
            rebuild: Mutex::new(()),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn backend(&self) -> &Arc<dyn Backend> {
        &self.backend
    }

    /// Current tree, rebuilt first when missing, expired or invalidated.
    pub fn get_current(&self) -> Result<Arc<Tree>, FsError> {
        let seen_attempts = {
            let state = self.state.read();
            if let Some(tree) = self.fresh_tree(&state) {
                return Ok(tree);
            }
            state.attempts
        };

        let _rebuild = self.rebuild.lock();

        {
            let state = self.state.read();
            if let Some(tree) = self.fresh_tree(&state) {
                return Ok(tree);
            }
            // an attempt we waited on failed: share its outcome
            if state.attempts != seen_attempts {
                if let Some((attempt, err)) = &state.last_failure {
                    if *attempt == state.attempts {
                        return Err(err.clone());
                    }
                }
            }
        }

        self.rebuild_locked()
    }

    /// Force the next [`get_current`](Self::get_current) to rebuild.
    pub fn invalidate(&self) {
        let mut state = self.state.write();
        state.stale = true;
        state.generation += 1;
        state.stats.invalidations += 1;
    }

    /// Most recently built tree regardless of freshness
    pub fn last_known_good(&self) -> Option<Arc<Tree>> {
        self.state.read().tree.clone()
    }

    pub fn stats(&self) -> CacheStats {
        self.state.read().stats
    }

    fn fresh_tree(&self, state: &CacheState) -> Option<Arc<Tree>> {
        if state.stale {
            return None;
        }
        let built_at = state.built_at?;
        let age = self.clock.now().saturating_duration_since(built_at);
        if age > self.ttl {
            return None;
        }
        state.tree.clone()
    }

    fn rebuild_locked(&self) -> Result<Arc<Tree>, FsError> {
        let (attempt, generation) = {
            let state = self.state.read();
            (state.attempts + 1, state.generation)
        };

        let started = Instant::now();
        let fetched = catch_unwind(AssertUnwindSafe(|| self.backend.fetch_all()))
            .unwrap_or_else(|_| {
                Err(crate::error::BackendError::Unavailable(
                    "backend panicked while fetching".to_string(),
                ))
            });

        let records = match fetched {
            Ok(records) => records,
            Err(e) => {
                let err = FsError::Fetch(e.to_string());
                warn!(attempt, error = %e, "Tree rebuild failed; keeping previous tree");
                let mut state = self.state.write();
                state.attempts = attempt;
                state.last_failure = Some((attempt, err.clone()));
                state.stats.failures += 1;
                return Err(err);
            }
        };

        let record_count = records.len();
        let tree = Arc::new(self.builder.build(records, self.clock.system_time()));
        info!(
            attempt,
            records = record_count,
            files = tree.file_count(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Rebuilt recording tree"
        );

        let mut state = self.state.write();
        state.attempts = attempt;
        state.tree = Some(Arc::clone(&tree));
        state.built_at = Some(self.clock.now());
        // an invalidation during the fetch may postdate the snapshot
        state.stale = state.generation != generation;
        state.last_failure = None;
        state.stats.builds += 1;
        Ok(tree)
    }
}
