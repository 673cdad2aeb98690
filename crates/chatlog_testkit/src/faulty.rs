//! A storage backend wrapper that injects I/O failures per artifact kind.

use chatlog_storage::{ArtifactLayout, StorageBackend, StorageError, StorageResult};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};

/// Which artifact of a transcript a path names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ArtifactKind {
    /// `<base>.gz`
    Compressed,
    /// `<base>.meta`
    Meta,
    /// `<base>.<index>`
    Chunk(usize),
    /// Anything else.
    Other,
}

/// Which operation a fault applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultOp {
    /// `StorageBackend::read`
    Read,
    /// `StorageBackend::write`
    Write,
    /// `StorageBackend::remove`
    Remove,
}

/// Fault target: an operation on one artifact kind, or on every slice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FaultTarget {
    /// A specific artifact kind.
    Kind(ArtifactKind),
    /// Every slice artifact regardless of index.
    AnyChunk,
}

impl FaultTarget {
    fn matches(self, kind: ArtifactKind) -> bool {
        match self {
            FaultTarget::Kind(target) => target == kind,
            FaultTarget::AnyChunk => matches!(kind, ArtifactKind::Chunk(_)),
        }
    }
}

/// A storage backend wrapper that fails selected operations.
///
/// Faults are armed with a remaining count; each matching call consumes one
/// and fails with a simulated I/O error before reaching the inner backend.
/// Every call is counted, failed or not.
pub struct FaultyBackend<B> {
    inner: B,
    layout: ArtifactLayout,
    faults: Mutex<HashMap<(FaultOp, FaultTarget), usize>>,
    calls: Mutex<HashMap<(FaultOp, ArtifactKind), usize>>,
}

impl<B: StorageBackend> FaultyBackend<B> {
    /// Wraps `inner`, classifying paths against `layout`.
    pub fn new(inner: B, layout: ArtifactLayout) -> Self {
        Self {
            inner,
            layout,
            faults: Mutex::new(HashMap::new()),
            calls: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the wrapped backend.
    pub fn inner(&self) -> &B {
        &self.inner
    }

    /// Classifies `path`.
    pub fn kind_of(&self, path: &Path) -> ArtifactKind {
        if path == self.layout.compressed_path() {
            ArtifactKind::Compressed
        } else if path == self.layout.meta_path() {
            ArtifactKind::Meta
        } else if let Some(index) = self.layout.chunk_index(path) {
            ArtifactKind::Chunk(index)
        } else {
            ArtifactKind::Other
        }
    }

    /// Makes the next `times` matching calls fail.
    pub fn fail(&self, op: FaultOp, target: FaultTarget, times: usize) {
        self.faults.lock().insert((op, target), times);
    }

    /// Makes every matching call fail until [`Self::reset`].
    pub fn fail_always(&self, op: FaultOp, target: FaultTarget) {
        self.fail(op, target, usize::MAX);
    }

    /// Makes the next `times` writes of the compressed artifact fail.
    pub fn fail_compressed_writes(&self, times: usize) {
        self.fail(
            FaultOp::Write,
            FaultTarget::Kind(ArtifactKind::Compressed),
            times,
        );
    }

    /// Clears every armed fault and call count.
    pub fn reset(&self) {
        self.faults.lock().clear();
        self.calls.lock().clear();
    }

    /// Number of `op` calls made against `kind`, failed or not.
    pub fn calls(&self, op: FaultOp, kind: ArtifactKind) -> usize {
        self.calls.lock().get(&(op, kind)).copied().unwrap_or(0)
    }

    /// Number of `op` calls made against any slice artifact.
    pub fn chunk_calls(&self, op: FaultOp) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|((call_op, kind), _)| *call_op == op && matches!(kind, ArtifactKind::Chunk(_)))
            .map(|(_, count)| *count)
            .sum()
    }

    fn check(&self, op: FaultOp, path: &Path) -> StorageResult<()> {
        let kind = self.kind_of(path);
        *self.calls.lock().entry((op, kind)).or_insert(0) += 1;

        let mut faults = self.faults.lock();
        let armed = faults
            .iter_mut()
            .find(|((fault_op, target), remaining)| {
                *fault_op == op && target.matches(kind) && **remaining > 0
            });

        match armed {
            Some((_, remaining)) => {
                if *remaining != usize::MAX {
                    *remaining -= 1;
                }
                Err(StorageError::Io(io::Error::new(
                    io::ErrorKind::Other,
                    format!("simulated {op:?} failure on {}", path.display()),
                )))
            }
            None => Ok(()),
        }
    }
}

impl<B: StorageBackend> StorageBackend for FaultyBackend<B> {
    fn read(&self, path: &Path) -> StorageResult<Vec<u8>> {
        self.check(FaultOp::Read, path)?;
        self.inner.read(path)
    }

    fn write(&self, path: &Path, data: &[u8]) -> StorageResult<()> {
        self.check(FaultOp::Write, path)?;
        self.inner.write(path, data)
    }

    fn remove(&self, path: &Path) -> StorageResult<()> {
        self.check(FaultOp::Remove, path)?;
        self.inner.remove(path)
    }

    fn list_dir(&self, dir: &Path) -> StorageResult<Vec<PathBuf>> {
        self.inner.list_dir(dir)
    }
}
