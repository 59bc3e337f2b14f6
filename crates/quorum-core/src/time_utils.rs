/// Returns the current Unix timestamp in milliseconds.
///
/// Clock failures collapse to zero rather than panicking; durable records
/// treat a zero timestamp as "unknown".
pub fn current_unix_timestamp_ms() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|duration| duration.as_millis().try_into().unwrap_or(u64::MAX))
        .unwrap_or(0)
}
