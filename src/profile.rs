//! Opt-in timing of backend round trips.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

use crate::backend::BackendOp;

/// A snapshot of backend call profiling metrics.
///
/// Profiling is enabled via the `QUADSCROLL_PROFILE` environment variable and
/// tracks how much time iterators spend waiting on the search backend.
#[derive(Debug, Clone, Copy, Default)]
pub struct BackendProfileSnapshot {
    /// Total nanoseconds spent fetching field mappings.
    pub field_mapping_ns: u64,
    /// Number of field-mapping fetches.
    pub field_mapping_count: u64,
    /// Total nanoseconds spent in count queries.
    pub count_ns: u64,
    /// Number of count queries.
    pub count_count: u64,
    /// Total nanoseconds spent opening scrolls.
    pub scroll_start_ns: u64,
    /// Number of scrolls opened.
    pub scroll_start_count: u64,
    /// Total nanoseconds spent fetching continuation pages.
    pub scroll_next_ns: u64,
    /// Number of continuation pages fetched.
    pub scroll_next_count: u64,
    /// Number of calls of any kind that returned an error.
    pub error_count: u64,
}

#[derive(Default)]
struct BackendProfileCounters {
    field_mapping_ns: AtomicU64,
    field_mapping_count: AtomicU64,
    count_ns: AtomicU64,
    count_count: AtomicU64,
    scroll_start_ns: AtomicU64,
    scroll_start_count: AtomicU64,
    scroll_next_ns: AtomicU64,
    scroll_next_count: AtomicU64,
    error_count: AtomicU64,
}

static PROFILE_ENABLED: OnceLock<bool> = OnceLock::new();
static PROFILE_COUNTERS: OnceLock<BackendProfileCounters> = OnceLock::new();

fn profiling_enabled() -> bool {
    *PROFILE_ENABLED.get_or_init(|| std::env::var_os("QUADSCROLL_PROFILE").is_some())
}

fn counters() -> Option<&'static BackendProfileCounters> {
    profiling_enabled().then(|| PROFILE_COUNTERS.get_or_init(BackendProfileCounters::default))
}

pub(crate) fn profile_timer() -> Option<Instant> {
    profiling_enabled().then(Instant::now)
}

pub(crate) fn record_profile_timer(op: BackendOp, start: Option<Instant>, ok: bool) {
    let Some(start) = start else {
        return;
    };
    let Some(counters) = counters() else {
        return;
    };
    let nanos = start.elapsed().as_nanos().min(u64::MAX as u128) as u64;
    record(counters, op, nanos, ok);
}

fn record(counters: &BackendProfileCounters, op: BackendOp, nanos: u64, ok: bool) {
    let (ns, count) = match op {
        BackendOp::FieldMapping => (&counters.field_mapping_ns, &counters.field_mapping_count),
        BackendOp::Count => (&counters.count_ns, &counters.count_count),
        BackendOp::ScrollStart => (&counters.scroll_start_ns, &counters.scroll_start_count),
        BackendOp::ScrollNext => (&counters.scroll_next_ns, &counters.scroll_next_count),
    };
    ns.fetch_add(nanos, Ordering::Relaxed);
    count.fetch_add(1, Ordering::Relaxed);
    if !ok {
        counters.error_count.fetch_add(1, Ordering::Relaxed);
    }
}

/// Retrieves a snapshot of backend profiling metrics.
///
/// Returns `None` when `QUADSCROLL_PROFILE` is unset. With `reset`, counters
/// are zeroed as they are read.
///
/// ```no_run
/// use quadscroll::profile::profile_snapshot;
///
/// if let Some(snapshot) = profile_snapshot(false) {
///     println!("pages fetched: {}", snapshot.scroll_next_count);
/// }
/// ```
pub fn profile_snapshot(reset: bool) -> Option<BackendProfileSnapshot> {
    counters().map(|counters| snapshot(counters, reset))
}

fn snapshot(counters: &BackendProfileCounters, reset: bool) -> BackendProfileSnapshot {
    let load = |counter: &AtomicU64| {
        if reset {
            counter.swap(0, Ordering::Relaxed)
        } else {
            counter.load(Ordering::Relaxed)
        }
    };
    BackendProfileSnapshot {
        field_mapping_ns: load(&counters.field_mapping_ns),
        field_mapping_count: load(&counters.field_mapping_count),
        count_ns: load(&counters.count_ns),
        count_count: load(&counters.count_count),
        scroll_start_ns: load(&counters.scroll_start_ns),
        scroll_start_count: load(&counters.scroll_start_count),
        scroll_next_ns: load(&counters.scroll_next_ns),
        scroll_next_count: load(&counters.scroll_next_count),
        error_count: load(&counters.error_count),
    }
}
