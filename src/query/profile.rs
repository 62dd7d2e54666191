use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;
use std::time::Instant;

/// A snapshot of per-stage pipeline timings.
///
/// Profiling is enabled via the `NESTQL_PROFILE` environment variable. The
/// counters are process-wide and only ever accumulate timings; they carry no
/// request data.
#[derive(Debug, Clone, Copy, Default, serde::Serialize)]
pub struct QueryProfileSnapshot {
    /// Total nanoseconds spent normalizing and building request trees.
    pub parse_ns: u64,
    /// Number of documents parsed.
    pub parse_count: u64,
    /// Total nanoseconds spent compiling node queries.
    pub compile_ns: u64,
    /// Number of nodes compiled.
    pub compile_count: u64,
    /// Total nanoseconds spent waiting on the backing store.
    pub execute_ns: u64,
    /// Number of queries sent to the backing store.
    pub execute_count: u64,
    /// Total nanoseconds spent assembling nested output.
    pub assemble_ns: u64,
    /// Number of documents assembled.
    pub assemble_count: u64,
}

#[derive(Default)]
struct QueryProfileCounters {
    parse_ns: AtomicU64,
    parse_count: AtomicU64,
    compile_ns: AtomicU64,
    compile_count: AtomicU64,
    execute_ns: AtomicU64,
    execute_count: AtomicU64,
    assemble_ns: AtomicU64,
    assemble_count: AtomicU64,
}

static PROFILE_ENABLED: OnceLock<bool> = OnceLock::new();
static PROFILE_COUNTERS: OnceLock<QueryProfileCounters> = OnceLock::new();

fn profiling_enabled() -> bool {
    *PROFILE_ENABLED.get_or_init(|| std::env::var_os("NESTQL_PROFILE").is_some())
}

fn counters() -> Option<&'static QueryProfileCounters> {
    profiling_enabled().then(|| PROFILE_COUNTERS.get_or_init(QueryProfileCounters::default))
}

pub(crate) fn profile_timer() -> Option<Instant> {
    profiling_enabled().then(Instant::now)
}

/// Pipeline stage a timer is attributed to.
pub(crate) enum QueryProfileKind {
    /// Normalizing and building request trees.
    Parse,
    /// Compiling one node query.
    Compile,
    /// One round trip to the backing store.
    Execute,
    /// Assembling nested output.
    Assemble,
}

pub(crate) fn record_profile_timer(kind: QueryProfileKind, start: Option<Instant>) {
    let Some(start) = start else {
        return;
    };
    let Some(counters) = counters() else {
        return;
    };
    let nanos = start.elapsed().as_nanos().min(u64::MAX as u128) as u64;
    let (ns, count) = match kind {
        QueryProfileKind::Parse => (&counters.parse_ns, &counters.parse_count),
        QueryProfileKind::Compile => (&counters.compile_ns, &counters.compile_count),
        QueryProfileKind::Execute => (&counters.execute_ns, &counters.execute_count),
        QueryProfileKind::Assemble => (&counters.assemble_ns, &counters.assemble_count),
    };
    ns.fetch_add(nanos, Ordering::Relaxed);
    count.fetch_add(1, Ordering::Relaxed);
}

/// Retrieves a snapshot of the pipeline counters.
///
/// Returns `None` when `NESTQL_PROFILE` is unset. With `reset` the counters are
/// zeroed as they are read.
///
/// ```no_run
/// use nestql::query::profile::profile_snapshot;
///
/// if let Some(snapshot) = profile_snapshot(false) {
///     println!("backing store time: {}ns", snapshot.execute_ns);
/// }
/// ```
pub fn profile_snapshot(reset: bool) -> Option<QueryProfileSnapshot> {
    let counters = counters()?;
    let load = |counter: &AtomicU64| {
        if reset {
            counter.swap(0, Ordering::Relaxed)
        } else {
            counter.load(Ordering::Relaxed)
        }
    };
    Some(QueryProfileSnapshot {
        parse_ns: load(&counters.parse_ns),
        parse_count: load(&counters.parse_count),
        compile_ns: load(&counters.compile_ns),
        compile_count: load(&counters.compile_count),
        execute_ns: load(&counters.execute_ns),
        execute_count: load(&counters.execute_count),
        assemble_ns: load(&counters.assemble_ns),
        assemble_count: load(&counters.assemble_count),
    })
}
