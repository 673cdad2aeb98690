//! Benchmark utilities.

use chatlog_storage::Record;
use chatlog_testkit::bulk_records;

/// Transcript sizes exercised by the benchmarks: (label, messages, text bytes each).
pub const TRANSCRIPT_SIZES: [(&str, usize, usize); 3] = [
    ("small", 20, 200),
    ("medium", 500, 1_000),
    ("large", 2_000, 1_500),
];

/// Builds a transcript of `count` chat messages with `text_len` bytes of text each.
pub fn transcript(count: usize, text_len: usize) -> Vec<Record> {
    bulk_records(count, text_len)
}

/// Serialized size of `records` in bytes.
pub fn serialized_len(records: &[Record]) -> u64 {
    chatlog_storage::codec::serialize(records).map_or(0, |text| text.len() as u64)
}

/// A small multi-threaded runtime for driving async store calls from criterion.
///
/// # Panics
///
/// Panics if the runtime cannot be built.
pub fn runtime() -> tokio::runtime::Runtime {
    tokio::runtime::Builder::new_multi_thread()
        .worker_threads(2)
        .enable_all()
        .build()
        .expect("Failed to build tokio runtime")
}
