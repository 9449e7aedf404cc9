//! Parallel processing strategies

use rayon::prelude::*;
use verdant_core::{Error, Result};

/// Processing mode for tile work
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessingMode {
    /// Single-threaded processing
    Sequential,
    /// Parallel processing on the global Rayon pool
    #[default]
    Parallel,
    /// Parallel on a dedicated pool with the given number of threads
    ParallelWith(usize),
}

impl ProcessingMode {
    /// Number of workers this mode will use
    pub fn workers(&self) -> usize {
        match self {
            ProcessingMode::Sequential => 1,
            ProcessingMode::Parallel => num_cpus(),
            ProcessingMode::ParallelWith(threads) => *threads,
        }
    }

    /// Reject configurations that cannot run
    pub fn validate(&self) -> Result<()> {
        if let ProcessingMode::ParallelWith(0) = self {
            return Err(Error::InvalidParameter {
                name: "threads",
                value: "0".to_string(),
                reason: "at least one worker thread is required".to_string(),
            });
        }
        Ok(())
    }
}

/// Strategy for executing independent jobs
pub trait ParallelStrategy {
    /// Map a fallible function over `items`, preserving input order.
    ///
    /// The first error aborts the whole call; results already computed are dropped.
    fn try_map<I, T, F>(&self, items: Vec<I>, f: F) -> Result<Vec<T>>
    where
        I: Send,
        T: Send,
        F: Fn(I) -> Result<T> + Sync + Send;
}

impl ParallelStrategy for ProcessingMode {
    fn try_map<I, T, F>(&self, items: Vec<I>, f: F) -> Result<Vec<T>>
    where
        I: Send,
        T: Send,
        F: Fn(I) -> Result<T> + Sync + Send,
    {
        match self {
            ProcessingMode::Sequential => items.into_iter().map(f).collect(),
            ProcessingMode::Parallel => items.into_par_iter().map(f).collect(),
            ProcessingMode::ParallelWith(_) => Executor::new(*self)?.try_map(items, f),
        }
    }
}

/// A processing mode together with the threads it runs on.
///
/// `ParallelWith` builds its dedicated pool once here, so repeated calls
/// (one per batch of tiles) reuse the same workers.
#[derive(Debug)]
pub struct Executor {
    mode: ProcessingMode,
    pool: Option<rayon::ThreadPool>,
}

impl Executor {
    pub fn new(mode: ProcessingMode) -> Result<Self> {
        mode.validate()?;
        let pool = match mode {
            ProcessingMode::ParallelWith(threads) => Some(
                rayon::ThreadPoolBuilder::new()
                    .num_threads(threads)
                    .build()
                    .map_err(|e| Error::Other(format!("Failed to build thread pool: {}", e)))?,
            ),
            _ => None,
        };
        Ok(Self { mode, pool })
    }

    pub fn mode(&self) -> ProcessingMode {
        self.mode
    }
}

impl ParallelStrategy for Executor {
    fn try_map<I, T, F>(&self, items: Vec<I>, f: F) -> Result<Vec<T>>
    where
        I: Send,
        T: Send,
        F: Fn(I) -> Result<T> + Sync + Send,
    {
        match &self.pool {
            Some(pool) => pool.install(|| items.into_par_iter().map(f).collect()),
            None => self.mode.try_map(items, f),
        }
    }
}

/// Get the number of threads in the global Rayon pool
pub fn num_cpus() -> usize {
    rayon::current_num_threads()
}
