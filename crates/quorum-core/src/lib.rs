//! Foundational low-level utilities shared across Quorum crates.
//!
//! Provides atomic file-write helpers and time utilities used by the
//! channel-owner store and decision trace timestamps.

pub mod atomic_io;
pub mod time_utils;

pub use atomic_io::{write_json_atomic, write_text_atomic};
pub use time_utils::current_unix_timestamp_ms;

#[cfg(test)]
mod tests {
    use std::fs::read_to_string;

    use super::*;

    #[test]
    fn unit_timestamp_ms_is_monotonic_enough() {
        let first = current_unix_timestamp_ms();
        let second = current_unix_timestamp_ms();
        assert!(second >= first);
        assert!(first > 1_500_000_000_000);
    }

    #[test]
    fn unit_write_text_atomic_writes_content() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("nested").join("sample.txt");
        write_text_atomic(&path, "hello world").expect("write");
        let contents = read_to_string(&path).expect("read");
        assert_eq!(contents, "hello world");
    }

    #[test]
    fn regression_write_text_atomic_replaces_without_leftover_temp_files() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("record.json");
        write_text_atomic(&path, "first").expect("write");
        write_text_atomic(&path, "second").expect("overwrite");
        assert_eq!(read_to_string(&path).expect("read"), "second");

        let entries = std::fs::read_dir(tempdir.path())
            .expect("list")
            .map(|entry| entry.expect("entry").file_name().to_string_lossy().into_owned())
            .collect::<Vec<String>>();
        assert_eq!(entries, vec!["record.json"]);
    }

    #[test]
    fn regression_write_text_atomic_rejects_pathless_destination() {
        assert!(write_text_atomic(std::path::Path::new(""), "x").is_err());
    }

    #[test]
    fn unit_write_json_atomic_round_trips_value() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("record.json");
        let value = serde_json::json!({ "assignee": "qq:1001" });
        write_json_atomic(&path, &value).expect("write");
        let parsed: serde_json::Value =
            serde_json::from_str(&read_to_string(&path).expect("read")).expect("parse");
        assert_eq!(parsed, value);
    }
}
