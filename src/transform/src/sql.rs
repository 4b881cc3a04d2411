//! String-level contract with the upstream SQL generator.
//!
//! SQL arrives fully built. The only things read from or written into it
//! are the `GROUP BY` marker, the two time-range placeholders and the
//! tracing detail filter. Nothing here parses SQL.

pub const FROM_PLACEHOLDER: &str = "'${__from:date:seconds}'";
pub const TO_PLACEHOLDER: &str = "'${__to:date:seconds}'";

const GROUP_BY_MARKER: &str = "GROUP BY";
const TIME_SERIES_FORMAT: &str = "timeSeries";

/// Grouped output is produced only for time series queries that group.
pub fn uses_group_by(format_as: &str, sql: &str) -> bool {
    format_as == TIME_SERIES_FORMAT && sql.contains(GROUP_BY_MARKER)
}

/// Replace the quoted time-range placeholders with Unix seconds.
pub fn bind_time_range(sql: &str, from: i64, to: i64) -> String {
    sql.replace(FROM_PLACEHOLDER, &from.to_string())
        .replace(TO_PLACEHOLDER, &to.to_string())
}

/// Filter `sql` down to the given span ids, ordered by start time.
pub fn tracing_detail_sql<S: AsRef<str>>(sql: &str, ids: &[S]) -> String {
    let filter = ids
        .iter()
        .map(|id| format!("_id={}", id.as_ref()))
        .collect::<Vec<_>>()
        .join(" or ");

    if filter.is_empty() {
        format!("{sql} order by `start_time`")
    } else {
        format!("{sql} where {filter} order by `start_time`")
    }
}
