//! Metrics declaration and recording helpers.
//!
//! Every helper is a no-op when the `metrics` feature is disabled.

#[cfg(feature = "metrics")]
use lazy_static::lazy_static;

#[cfg(feature = "metrics")]
lazy_static! {
    // Cache status metrics

    /// Track number of fresh cache hits.
    pub static ref CACHE_HIT_COUNTER: &'static str = {
        metrics::describe_counter!(
            "corral_cache_hit_total",
            "Total number of fresh cache hits."
        );
        "corral_cache_hit_total"
    };
    /// Track number of cache misses (absent or expired entries).
    pub static ref CACHE_MISS_COUNTER: &'static str = {
        metrics::describe_counter!(
            "corral_cache_miss_total",
            "Total number of cache misses."
        );
        "corral_cache_miss_total"
    };
    /// Track number of stale hits served while revalidating.
    pub static ref CACHE_STALE_COUNTER: &'static str = {
        metrics::describe_counter!(
            "corral_cache_stale_total",
            "Total number of stale cache hits."
        );
        "corral_cache_stale_total"
    };
    /// Track number of callers that joined an in-flight load.
    pub static ref CACHE_DEDUP_COUNTER: &'static str = {
        metrics::describe_counter!(
            "corral_cache_dedup_total",
            "Total number of loads joined instead of started."
        );
        "corral_cache_dedup_total"
    };
    /// Track number of entries invalidated.
    pub static ref CACHE_INVALIDATED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "corral_cache_invalidated_total",
            "Total number of cache entries invalidated."
        );
        "corral_cache_invalidated_total"
    };
    /// Track number of failed loads.
    pub static ref CACHE_LOAD_FAILED_COUNTER: &'static str = {
        metrics::describe_counter!(
            "corral_cache_load_failed_total",
            "Total number of failed loads."
        );
        "corral_cache_load_failed_total"
    };
    /// Histogram of load duration.
    pub static ref CACHE_LOAD_DURATION: &'static str = {
        metrics::describe_histogram!(
            "corral_load_duration_seconds",
            metrics::Unit::Seconds,
            "Duration of loads in seconds."
        );
        "corral_load_duration_seconds"
    };

    // Background load metrics

    /// Gauge of loads currently driven in the background.
    pub static ref BACKGROUND_LOADS_ACTIVE: &'static str = {
        metrics::describe_gauge!(
            "corral_background_loads_active",
            "Number of loads currently running in the background."
        );
        "corral_background_loads_active"
    };

    // Mutation metrics

    /// Track mutations by resource, kind and outcome.
    pub static ref MUTATION_COUNTER: &'static str = {
        metrics::describe_counter!(
            "corral_mutation_total",
            "Total number of mutations by outcome."
        );
        "corral_mutation_total"
    };
}

/// Outcome of a cache lookup, for the status counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStatus {
    /// Fresh entry served.
    Hit,
    /// Stale entry served, revalidation started.
    Stale,
    /// No servable entry.
    Miss,
}

/// Record a cache lookup for `resource`.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_lookup(resource: &str, status: LookupStatus) {
    let counter = match status {
        LookupStatus::Hit => *CACHE_HIT_COUNTER,
        LookupStatus::Stale => *CACHE_STALE_COUNTER,
        LookupStatus::Miss => *CACHE_MISS_COUNTER,
    };
    metrics::counter!(counter, "resource" => resource.to_string()).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_lookup(_resource: &str, _status: LookupStatus) {}

/// Record a caller joining an in-flight load.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_dedup(resource: &str) {
    metrics::counter!(*CACHE_DEDUP_COUNTER, "resource" => resource.to_string()).increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_dedup(_resource: &str) {}

/// Record the end of a load.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_load(resource: &str, duration: std::time::Duration, failed: bool) {
    metrics::histogram!(*CACHE_LOAD_DURATION, "resource" => resource.to_string())
        .record(duration.as_secs_f64());
    if failed {
        metrics::counter!(*CACHE_LOAD_FAILED_COUNTER, "resource" => resource.to_string())
            .increment(1);
    }
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_load(_resource: &str, _duration: std::time::Duration, _failed: bool) {}

/// Record `count` entries invalidated under `prefix`.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_invalidation(prefix: &str, count: usize) {
    metrics::counter!(*CACHE_INVALIDATED_COUNTER, "prefix" => prefix.to_string())
        .increment(count as u64);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_invalidation(_prefix: &str, _count: usize) {}

/// Track a background load starting (`started`) or ending.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_background_load(resource: &str, started: bool) {
    let gauge = metrics::gauge!(*BACKGROUND_LOADS_ACTIVE, "resource" => resource.to_string());
    if started {
        gauge.increment(1.0);
    } else {
        gauge.decrement(1.0);
    }
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_background_load(_resource: &str, _started: bool) {}

/// Record a finished mutation.
#[cfg(feature = "metrics")]
#[inline]
pub fn record_mutation(resource: &str, kind: &'static str, success: bool) {
    let outcome = if success { "success" } else { "failure" };
    metrics::counter!(
        *MUTATION_COUNTER,
        "resource" => resource.to_string(),
        "kind" => kind,
        "outcome" => outcome
    )
    .increment(1);
}

/// No-op version when metrics feature is disabled.
#[cfg(not(feature = "metrics"))]
#[inline]
pub fn record_mutation(_resource: &str, _kind: &'static str, _success: bool) {}
