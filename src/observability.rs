use std::net::SocketAddr;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total HTTP requests handled. Labels: route, status.
pub const HTTP_REQUESTS_TOTAL: &str = "nextsus_http_requests_total";

/// Histogram: HTTP request latency in seconds. Labels: route.
pub const HTTP_REQUEST_DURATION_SECONDS: &str = "nextsus_http_request_duration_seconds";

// ── Domain metrics ──────────────────────────────────────────────

/// Counter: reservations created. Labels: domain.
pub const RESERVATIONS_CREATED_TOTAL: &str = "nextsus_reservations_created_total";

/// Counter: requests rejected by the conflict checker. Labels: domain.
pub const CONFLICTS_TOTAL: &str = "nextsus_conflicts_total";

/// Counter: applied status transitions. Labels: domain, action.
pub const TRANSITIONS_TOTAL: &str = "nextsus_transitions_total";

/// Counter: loans moved to overdue by the sweep.
pub const OVERDUE_MARKED_TOTAL: &str = "nextsus_overdue_marked_total";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: open server-sent event streams.
pub const SSE_SUBSCRIBERS: &str = "nextsus_sse_subscribers";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "nextsus_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "nextsus_wal_flush_batch_size";

/// Counter: completed WAL compactions.
pub const WAL_COMPACTIONS_TOTAL: &str = "nextsus_wal_compactions_total";

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init(port: Option<u16>) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Collapse a request path to its route template so ids don't explode
/// label cardinality.
pub fn route_label(path: &str) -> String {
    path.split('/')
        .map(|seg| {
            if ulid::Ulid::from_string(seg).is_ok() {
                ":id"
            } else {
                seg
            }
        })
        .collect::<Vec<_>>()
        .join("/")
}
