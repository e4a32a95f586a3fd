use std::net::SocketAddr;

use tracing_subscriber::EnvFilter;

use crate::sql::Command;

// ── RED metrics (request-driven) ────────────────────────────────

/// Counter: total queries executed. Labels: command, status.
pub const QUERIES_TOTAL: &str = "tablebook_queries_total";

/// Histogram: query latency in seconds. Labels: command.
pub const QUERY_DURATION_SECONDS: &str = "tablebook_query_duration_seconds";

// ── USE metrics (resource utilization) ──────────────────────────

/// Gauge: active TCP connections.
pub const CONNECTIONS_ACTIVE: &str = "tablebook_connections_active";

/// Counter: total connections accepted.
pub const CONNECTIONS_TOTAL: &str = "tablebook_connections_total";

/// Counter: connections rejected due to limit.
pub const CONNECTIONS_REJECTED_TOTAL: &str = "tablebook_connections_rejected_total";

/// Gauge: number of loaded venues.
pub const VENUES_ACTIVE: &str = "tablebook_venues_active";

/// Counter: startup/auth failures and scope denials. Labels: reason.
pub const AUTH_FAILURES_TOTAL: &str = "tablebook_auth_failures_total";

/// Histogram: WAL group-commit flush duration in seconds.
pub const WAL_FLUSH_DURATION_SECONDS: &str = "tablebook_wal_flush_duration_seconds";

/// Histogram: WAL group-commit batch size (events per flush).
pub const WAL_FLUSH_BATCH_SIZE: &str = "tablebook_wal_flush_batch_size";

// ── Availability ────────────────────────────────────────────────

/// Histogram: time spent in one availability sweep, in seconds.
pub const SWEEP_DURATION_SECONDS: &str = "tablebook_sweep_duration_seconds";

/// Gauge: derived blocked windows after the latest refresh.
pub const BLOCKED_WINDOWS_DERIVED: &str = "tablebook_blocked_windows_derived";

/// Counter: reservation mails that could not be delivered.
pub const NOTIFICATIONS_FAILED_TOTAL: &str = "tablebook_notifications_failed_total";

/// Install the fmt subscriber, filtered by `RUST_LOG` (default `info`).
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Install Prometheus metrics exporter on the given port. No-op if port is None.
pub fn init_metrics(
    port: Option<u16>,
) -> Result<(), metrics_exporter_prometheus::BuildError> {
    let Some(port) = port else { return Ok(()) };
    let addr: SocketAddr = ([0, 0, 0, 0], port).into();
    metrics_exporter_prometheus::PrometheusBuilder::new()
        .with_http_listener(addr)
        .install()?;
    tracing::info!("metrics endpoint: http://0.0.0.0:{port}/metrics");
    Ok(())
}

/// Map a Command variant to a short label for metrics.
pub fn command_label(cmd: &Command) -> &'static str {
    match cmd {
        Command::InsertReservation { .. } => "insert_reservation",
        Command::UpdateReservation { .. } => "update_reservation",
        Command::DeleteReservation { .. } => "delete_reservation",
        Command::SelectReservations { .. } => "select_reservations",
        Command::InsertBlockedWindow { .. } => "insert_blocked_window",
        Command::DeleteBlockedWindow { .. } => "delete_blocked_window",
        Command::SelectBlockedWindows { .. } => "select_blocked_windows",
        Command::RefreshBlockedWindows => "refresh_blocked_windows",
        Command::InsertCategory { .. } => "insert_category",
        Command::DeleteCategory { .. } => "delete_category",
        Command::SelectCategories => "select_categories",
        Command::InsertItem { .. } => "insert_item",
        Command::UpdateItem { .. } => "update_item",
        Command::DeleteItem { .. } => "delete_item",
        Command::SelectItems { .. } => "select_items",
        Command::SelectItemPicture { .. } => "select_item_picture",
        Command::Listen { .. } => "listen",
        Command::Unlisten { .. } => "unlisten",
        Command::UnlistenAll => "unlisten_all",
    }
}
