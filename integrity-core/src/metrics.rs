//! Operation counters
//!
//! Recorded through the `metrics` facade; nothing is exported unless the
//! embedding process installs a recorder.

use metrics::{counter, describe_counter};

pub const SUBMIT_TOTAL: &str = "integrity.submit.total";
pub const SUBMIT_FAILED: &str = "integrity.submit.failed";
pub const QUERY_TOTAL: &str = "integrity.query.total";
pub const QUERY_FAILED: &str = "integrity.query.failed";
pub const QUERY_RECORDS: &str = "integrity.query.records";

/// Register metric descriptions with the installed recorder
pub fn describe() {
    describe_counter!(SUBMIT_TOTAL, "Total submitHash invocations");
    describe_counter!(SUBMIT_FAILED, "Failed submitHash invocations");
    describe_counter!(QUERY_TOTAL, "Total queryHash invocations");
    describe_counter!(QUERY_FAILED, "Failed queryHash invocations");
    describe_counter!(QUERY_RECORDS, "Records returned by queryHash");
}

/// Record a counter metric
pub fn record_counter(name: &'static str, value: u64) {
    counter!(name).increment(value);
}
