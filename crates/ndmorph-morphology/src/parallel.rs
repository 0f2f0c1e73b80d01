use rayon::prelude::*;
use thiserror::Error;

/// Errors that can occur during parallel execution.
#[derive(Error, Debug, PartialEq)]
pub enum ParallelError {
    /// The thread pool failed to build.
    #[error("failed to build thread pool: {0}")]
    BuildError(String),

    /// The requested thread count is invalid.
    #[error("thread count must be > 0, got {0}")]
    InvalidThreadCount(usize),
}

/// How the image lines of a filter pass are distributed over threads.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionStrategy {
    /// All lines on the calling thread.
    Serial,

    /// Lines spread over the global rayon pool.
    #[default]
    ParallelLines,

    /// Lines spread over a pool of `n` threads built for the call.
    ///
    /// The pool is rebuilt on every filter pass.
    Fixed(usize),
}

/// Process `data` in chunks of `chunk_len` elements with per-worker scratch space.
///
/// Each worker calls `init` once and reuses the resulting scratch for every chunk it processes,
/// so scratch buffers only ever grow. A trailing chunk shorter than `chunk_len` is processed as
/// well.
///
/// # Arguments
///
/// * `strategy` - The execution strategy.
/// * `data` - The destination buffer.
/// * `chunk_len` - The number of elements per chunk, typically an image line.
/// * `init` - Creates the scratch space of one worker.
/// * `op` - Called with the scratch, the chunk index and the chunk.
///
/// # Returns
///
/// A result indicating success or failure.
pub fn execute_chunks_with<T, S, I, F>(
    strategy: ExecutionStrategy,
    data: &mut [T],
    chunk_len: usize,
    init: I,
    op: F,
) -> Result<(), ParallelError>
where
    T: Send,
    I: Fn() -> S + Sync + Send,
    F: Fn(&mut S, usize, &mut [T]) + Sync + Send,
{
    if chunk_len == 0 || data.is_empty() {
        return Ok(());
    }

    let run_parallel = |data: &mut [T]| {
        data.par_chunks_mut(chunk_len)
            .enumerate()
            .for_each_init(&init, |scratch, (index, chunk)| op(scratch, index, chunk));
    };

    match strategy {
        ExecutionStrategy::Serial => {
            let mut scratch = init();
            data.chunks_mut(chunk_len)
                .enumerate()
                .for_each(|(index, chunk)| op(&mut scratch, index, chunk));
        }
        ExecutionStrategy::ParallelLines => run_parallel(data),
        ExecutionStrategy::Fixed(n) => {
            if n == 0 {
                return Err(ParallelError::InvalidThreadCount(n));
            }
            let pool = rayon::ThreadPoolBuilder::new()
                .num_threads(n)
                .build()
                .map_err(|e| ParallelError::BuildError(e.to_string()))?;

            pool.install(|| run_parallel(data));
        }
    }
    Ok(())
}
