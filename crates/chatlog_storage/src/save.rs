//! Save state machine.
//!
//! A save walks `Compressing → Retrying → … → FallingBack → Done | Failed`,
//! with `Retrying { attempt }` leading back to `Compressing { attempt }`.
//! Each transition is a pure function of the previous state and the result
//! of the I/O it performed, so the progression can be tested without disks.

use crate::error::StorageError;

/// How a successful save was persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    /// The compressed artifact was written.
    Compressed {
        /// Attempt number that succeeded (1-indexed).
        attempts: u32,
    },
    /// Every compressed attempt failed and the chunked representation was written.
    Chunked {
        /// Number of slice artifacts written.
        chunks: usize,
        /// Number of failed compressed attempts before the fallback.
        compressed_attempts: u32,
    },
}

impl SaveOutcome {
    /// Returns true if the save had to fall back to chunks.
    pub fn is_degraded(&self) -> bool {
        matches!(self, SaveOutcome::Chunked { .. })
    }
}

/// The current state of a save.
#[derive(Debug)]
pub enum SaveState {
    /// About to perform compressed attempt number `attempt` (1-indexed).
    Compressing {
        /// Attempt number.
        attempt: u32,
    },
    /// A compressed attempt failed; `attempt` is the next one to make.
    Retrying {
        /// Next attempt number.
        attempt: u32,
        /// Failure of the previous attempt.
        error: StorageError,
    },
    /// All compressed attempts failed; the chunked write comes next.
    FallingBack {
        /// Number of compressed attempts made.
        attempts: u32,
        /// Failure of the last compressed attempt.
        error: StorageError,
    },
    /// The save completed.
    Done(SaveOutcome),
    /// The fallback failed too.
    Failed(StorageError),
}

impl SaveState {
    /// Initial state of every save.
    pub fn start() -> Self {
        SaveState::Compressing { attempt: 1 }
    }

    /// Transition after compressed attempt `attempt` finished with `result`.
    pub fn after_compressed(
        attempt: u32,
        max_attempts: u32,
        result: Result<(), StorageError>,
    ) -> Self {
        match result {
            Ok(()) => SaveState::Done(SaveOutcome::Compressed { attempts: attempt }),
            Err(error) if attempt < max_attempts => SaveState::Retrying {
                attempt: attempt + 1,
                error,
            },
            Err(error) => SaveState::FallingBack {
                attempts: attempt,
                error,
            },
        }
    }

    /// Transition after the chunked fallback finished with `result`.
    pub fn after_chunked(attempts: u32, result: Result<usize, StorageError>) -> Self {
        match result {
            Ok(chunks) => SaveState::Done(SaveOutcome::Chunked {
                chunks,
                compressed_attempts: attempts,
            }),
            Err(error) => SaveState::Failed(StorageError::RetryExhausted {
                attempts,
                source: Box::new(error),
            }),
        }
    }

    /// Short name for logging.
    pub fn name(&self) -> &'static str {
        match self {
            SaveState::Compressing { .. } => "compressing",
            SaveState::Retrying { .. } => "retrying",
            SaveState::FallingBack { .. } => "falling_back",
            SaveState::Done(_) => "done",
            SaveState::Failed(_) => "failed",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    fn io_err() -> StorageError {
        StorageError::compression(
            "/t.gz",
            StorageError::Io(io::Error::new(io::ErrorKind::Other, "disk full")),
        )
    }

    #[test]
    fn first_success_is_done() {
        let state = SaveState::after_compressed(1, 3, Ok(()));
        assert!(matches!(
            state,
            SaveState::Done(SaveOutcome::Compressed { attempts: 1 })
        ));
        assert_eq!(state.name(), "done");
    }

    #[test]
    fn failure_below_bound_retries() {
        let state = SaveState::after_compressed(1, 3, Err(io_err()));
        assert!(matches!(state, SaveState::Retrying { attempt: 2, .. }));
        assert_eq!(state.name(), "retrying");
    }

    #[test]
    fn third_failure_falls_back() {
        let state = SaveState::after_compressed(2, 3, Err(io_err()));
        assert!(matches!(state, SaveState::Retrying { attempt: 3, .. }));

        let state = SaveState::after_compressed(3, 3, Err(io_err()));
        assert!(matches!(state, SaveState::FallingBack { attempts: 3, .. }));
    }

    #[test]
    fn success_on_last_attempt_does_not_fall_back() {
        let state = SaveState::after_compressed(3, 3, Ok(()));
        assert!(matches!(
            state,
            SaveState::Done(SaveOutcome::Compressed { attempts: 3 })
        ));
    }

    #[test]
    fn single_attempt_policy_falls_back_immediately() {
        let state = SaveState::after_compressed(1, 1, Err(io_err()));
        assert!(matches!(state, SaveState::FallingBack { attempts: 1, .. }));
    }

    #[test]
    fn chunked_success_is_degraded_done() {
        let state = SaveState::after_chunked(3, Ok(2));
        match state {
            SaveState::Done(outcome) => {
                assert!(outcome.is_degraded());
                assert_eq!(
                    outcome,
                    SaveOutcome::Chunked {
                        chunks: 2,
                        compressed_attempts: 3
                    }
                );
            }
            other => panic!("unexpected state {other:?}"),
        }
    }

    #[test]
    fn chunked_failure_is_retry_exhausted() {
        let state = SaveState::after_chunked(3, Err(StorageError::chunk("/t.1", io_err())));
        match state {
            SaveState::Failed(error) => {
                assert!(error.is_retry_exhausted());
                assert!(matches!(error, StorageError::RetryExhausted { attempts: 3, .. }));
            }
            other => panic!("unexpected state {other:?}"),
        }
    }
}
