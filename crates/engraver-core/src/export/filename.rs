//! Output file naming.

use chrono::{DateTime, SecondsFormat, Utc};

/// Suffix shared by every exported file.
pub const FILE_SUFFIX: &str = "_Map";
/// Extension of the exported file.
pub const FILE_EXTENSION: &str = "jpeg";

/// The caller's order identifier, trimmed, if it is usable.
pub fn resolve_order(identifier: Option<&str>) -> Option<&str> {
    identifier.map(str::trim).filter(|id| !id.is_empty())
}

/// Order id for exports made before an order exists.
pub fn generated_order_id(at: DateTime<Utc>) -> String {
    format!("ORD-{}", at.timestamp_millis())
}

/// ISO-8601 UTC timestamp with `:` and `.` replaced so it is filename safe.
pub fn sanitized_timestamp(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// Name of the exported file.
///
/// `{id}_Map.jpeg` when an identifier is present, otherwise
/// `{generated id}_Map_{timestamp}.jpeg`. Pure in both inputs.
pub fn export_filename(identifier: Option<&str>, at: DateTime<Utc>) -> String {
    match resolve_order(identifier) {
        Some(id) => format!("{id}{FILE_SUFFIX}.{FILE_EXTENSION}"),
        None => format!(
            "{}{FILE_SUFFIX}_{}.{FILE_EXTENSION}",
            generated_order_id(at),
            sanitized_timestamp(at)
        ),
    }
}
