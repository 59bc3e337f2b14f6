//! Channel-owner state storage and the owner mutation audit log.
//!
//! Each channel carries exactly one mutable field: the identity ref of the
//! current assignee (empty string = unclaimed). The file-backed store keeps
//! one JSON document per channel, written atomically; the audit logger
//! appends one JSONL record per mutation.

use std::collections::BTreeMap;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, bail, Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use quorum_core::{current_unix_timestamp_ms, write_json_atomic};

pub const OWNER_RECORD_SCHEMA_VERSION: u32 = 1;
pub const OWNER_RECORD_FILE_NAME: &str = "owner.json";

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
/// Public struct `ChannelOwnerRecord` shared across Quorum components.
pub struct ChannelOwnerRecord {
    pub schema_version: u32,
    #[serde(default)]
    pub assignee: String,
    #[serde(default)]
    pub updated_unix_ms: u64,
}

impl Default for ChannelOwnerRecord {
    fn default() -> Self {
        Self {
            schema_version: OWNER_RECORD_SCHEMA_VERSION,
            assignee: String::new(),
            updated_unix_ms: 0,
        }
    }
}

/// Trait contract for `OwnerStateStore` behavior.
///
/// The engine reads the assignee once per message pass and issues conditional
/// writes; persistence, caching, and transport belong to implementations.
pub trait OwnerStateStore {
    fn read_assignee(&self, channel_ref: &str) -> Result<String>;
    fn write_assignee(&self, channel_ref: &str, assignee: &str) -> Result<()>;
    /// Current assignee per channel ref, for snapshot/restore.
    fn list_assignees(&self) -> Result<BTreeMap<String, String>>;
}

#[derive(Debug, Clone)]
/// Public struct `FileOwnerStateStore` shared across Quorum components.
pub struct FileOwnerStateStore {
    base_dir: PathBuf,
}

impl FileOwnerStateStore {
    pub fn open(base_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(base_dir.join("channels"))
            .with_context(|| format!("failed to create {}", base_dir.display()))?;
        Ok(Self {
            base_dir: base_dir.to_path_buf(),
        })
    }

    fn owner_record_path(&self, channel_ref: &str) -> Result<PathBuf> {
        let (platform, channel_id) = split_channel_ref(channel_ref)?;
        Ok(self
            .base_dir
            .join("channels")
            .join(platform)
            .join(channel_id)
            .join(OWNER_RECORD_FILE_NAME))
    }

    fn read_record(&self, channel_ref: &str) -> Result<ChannelOwnerRecord> {
        let path = self.owner_record_path(channel_ref)?;
        if !path.exists() {
            return Ok(ChannelOwnerRecord::default());
        }
        let raw = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read owner record {}", path.display()))?;
        let record = serde_json::from_str::<ChannelOwnerRecord>(&raw)
            .with_context(|| format!("failed to parse owner record {}", path.display()))?;
        if record.schema_version != OWNER_RECORD_SCHEMA_VERSION {
            bail!(
                "unsupported owner record schema_version {} in {}",
                record.schema_version,
                path.display()
            );
        }
        Ok(record)
    }
}

impl OwnerStateStore for FileOwnerStateStore {
    fn read_assignee(&self, channel_ref: &str) -> Result<String> {
        Ok(self.read_record(channel_ref)?.assignee)
    }

    fn write_assignee(&self, channel_ref: &str, assignee: &str) -> Result<()> {
        let path = self.owner_record_path(channel_ref)?;
        let record = ChannelOwnerRecord {
            schema_version: OWNER_RECORD_SCHEMA_VERSION,
            assignee: assignee.trim().to_string(),
            updated_unix_ms: current_unix_timestamp_ms(),
        };
        write_json_atomic(&path, &record)
            .with_context(|| format!("failed to write owner record {}", path.display()))
    }

    fn list_assignees(&self) -> Result<BTreeMap<String, String>> {
        let mut assignees = BTreeMap::new();
        let channels_dir = self.base_dir.join("channels");
        for platform in read_dir_entries(&channels_dir)? {
            let platform_dir = channels_dir.join(&platform);
            for channel_id in read_dir_entries(&platform_dir)? {
                let channel_ref = format!("{platform}/{channel_id}");
                let record = self.read_record(&channel_ref)?;
                assignees.insert(channel_ref, record.assignee);
            }
        }
        Ok(assignees)
    }
}

fn read_dir_entries(dir: &Path) -> Result<Vec<String>> {
    if !dir.exists() {
        return Ok(Vec::new());
    }
    let mut names = Vec::new();
    let entries = std::fs::read_dir(dir)
        .with_context(|| format!("failed to list {}", dir.display()))?;
    for entry in entries {
        let entry = entry.with_context(|| format!("failed to list {}", dir.display()))?;
        if entry.path().is_dir() {
            if let Some(name) = entry.file_name().to_str() {
                names.push(name.to_string());
            }
        }
    }
    names.sort();
    Ok(names)
}

/// Splits a `platform/channel_id` channel ref, rejecting path traversal.
pub fn split_channel_ref(raw: &str) -> Result<(String, String)> {
    let trimmed = raw.trim();
    let (platform, channel_id) = trimmed
        .split_once('/')
        .ok_or_else(|| anyhow!("invalid channel ref '{raw}', expected platform/channel_id"))?;
    let platform = platform.trim();
    let channel_id = channel_id.trim();
    if platform.is_empty() || channel_id.is_empty() {
        bail!("invalid channel ref '{raw}', expected platform/channel_id");
    }
    for segment in [platform, channel_id] {
        if segment == "." || segment == ".." || segment.contains('/') || segment.contains('\\') {
            bail!("channel ref segment '{segment}' is not a safe path component");
        }
    }
    Ok((platform.to_string(), channel_id.to_string()))
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
/// Public struct `OwnerMutation` shared across Quorum components.
pub struct OwnerMutation {
    pub channel_ref: String,
    pub identity_ref: String,
    pub previous_assignee: String,
    pub new_assignee: String,
    pub reason_code: String,
}

pub fn owner_mutation_payload(mutation: &OwnerMutation) -> Value {
    json!({
        "record_type": "multi_bot_owner_mutation_v1",
        "timestamp_unix_ms": current_unix_timestamp_ms(),
        "channel_ref": mutation.channel_ref,
        "identity_ref": mutation.identity_ref,
        "previous_assignee": mutation.previous_assignee,
        "new_assignee": mutation.new_assignee,
        "reason_code": mutation.reason_code,
    })
}

#[derive(Clone)]
/// Public struct `OwnerAuditLogger` shared across Quorum components.
pub struct OwnerAuditLogger {
    path: PathBuf,
    file: Arc<Mutex<std::fs::File>>,
}

impl OwnerAuditLogger {
    pub fn open(path: PathBuf) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).with_context(|| {
                    format!("failed to create owner audit directory {}", parent.display())
                })?;
            }
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open owner audit log {}", path.display()))?;
        Ok(Self {
            path,
            file: Arc::new(Mutex::new(file)),
        })
    }

    pub fn log_mutation(&self, mutation: &OwnerMutation) -> Result<()> {
        let line = serde_json::to_string(&owner_mutation_payload(mutation))
            .context("failed to encode owner mutation record")?;
        let mut file = self
            .file
            .lock()
            .map_err(|_| anyhow!("owner audit file lock is poisoned"))?;
        writeln!(file, "{line}")
            .with_context(|| format!("failed to write owner audit log {}", self.path.display()))?;
        file.flush()
            .with_context(|| format!("failed to flush owner audit log {}", self.path.display()))?;
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq, Default)]
/// Public struct `OwnerRestoreReport` shared across Quorum components.
pub struct OwnerRestoreReport {
    pub restored_channels: usize,
    pub unchanged_channels: usize,
    pub skipped: bool,
}

/// Captures the current assignee per channel, for restoration at teardown.
pub fn snapshot_owner_assignments(store: &dyn OwnerStateStore) -> Result<BTreeMap<String, String>> {
    store.list_assignees()
}

/// Restores a previously captured assignee snapshot.
///
/// A store failure is reported and the whole restoration is skipped for this
/// run; restoration is best-effort and never fatal.
pub fn restore_owner_assignments(
    store: &dyn OwnerStateStore,
    snapshot: &BTreeMap<String, String>,
) -> OwnerRestoreReport {
    let current = match store.list_assignees() {
        Ok(current) => current,
        Err(error) => {
            tracing::warn!(
                error = %format!("{error:#}"),
                "owner store unavailable, skipping assignee restoration"
            );
            return OwnerRestoreReport {
                skipped: true,
                ..Default::default()
            };
        }
    };

    let mut report = OwnerRestoreReport::default();
    for (channel_ref, assignee) in snapshot {
        if current.get(channel_ref) == Some(assignee) {
            report.unchanged_channels += 1;
            continue;
        }
        if let Err(error) = store.write_assignee(channel_ref, assignee) {
            tracing::warn!(
                channel_ref = %channel_ref,
                error = %format!("{error:#}"),
                "owner store write failed, skipping assignee restoration"
            );
            return OwnerRestoreReport {
                skipped: true,
                ..report
            };
        }
        report.restored_channels += 1;
    }
    report
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_split_channel_ref_rejects_traversal_segments() {
        assert!(split_channel_ref("qq/chan-1").is_ok());
        for raw in ["qq", "/chan-1", "qq/", "../x", "qq/..", "a/b\\c"] {
            assert!(split_channel_ref(raw).is_err(), "should reject '{raw}'");
        }
    }

    #[test]
    fn unit_missing_owner_record_reads_as_unclaimed() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let store = FileOwnerStateStore::open(tempdir.path()).expect("open store");
        let assignee = store.read_assignee("qq/chan-1").expect("read");
        assert_eq!(assignee, "");
    }

    #[test]
    fn functional_write_then_read_round_trips_assignee() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let store = FileOwnerStateStore::open(tempdir.path()).expect("open store");
        store.write_assignee("qq/chan-1", "qq:1001").expect("write");
        assert_eq!(store.read_assignee("qq/chan-1").expect("read"), "qq:1001");

        store.write_assignee("qq/chan-1", "").expect("clear");
        assert_eq!(store.read_assignee("qq/chan-1").expect("read"), "");
    }

    #[test]
    fn functional_list_assignees_covers_all_platforms_sorted() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let store = FileOwnerStateStore::open(tempdir.path()).expect("open store");
        store.write_assignee("qq/chan-2", "qq:1002").expect("write");
        store.write_assignee("qq/chan-1", "qq:1001").expect("write");
        store
            .write_assignee("discord/general", "discord:A999")
            .expect("write");
        let assignees = store.list_assignees().expect("list");
        let refs = assignees.keys().cloned().collect::<Vec<String>>();
        assert_eq!(refs, vec!["discord/general", "qq/chan-1", "qq/chan-2"]);
        assert_eq!(assignees["qq/chan-1"], "qq:1001");
    }

    #[test]
    fn integration_snapshot_restore_round_trip() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let store = FileOwnerStateStore::open(tempdir.path()).expect("open store");
        store.write_assignee("qq/chan-1", "qq:1001").expect("write");
        let snapshot = snapshot_owner_assignments(&store).expect("snapshot");

        store.write_assignee("qq/chan-1", "qq:9999").expect("mutate");
        let report = restore_owner_assignments(&store, &snapshot);
        assert!(!report.skipped);
        assert_eq!(report.restored_channels, 1);
        assert_eq!(store.read_assignee("qq/chan-1").expect("read"), "qq:1001");

        // Restoring again changes nothing.
        let repeat = restore_owner_assignments(&store, &snapshot);
        assert_eq!(repeat.restored_channels, 0);
        assert_eq!(repeat.unchanged_channels, 1);
    }

    #[test]
    fn integration_audit_logger_appends_one_record_per_mutation() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let path = tempdir.path().join("logs").join("owner-audit.jsonl");
        let logger = OwnerAuditLogger::open(path.clone()).expect("open logger");
        let mutation = OwnerMutation {
            channel_ref: "qq/chan-1".to_string(),
            identity_ref: "qq:1001".to_string(),
            previous_assignee: String::new(),
            new_assignee: "qq:1001".to_string(),
            reason_code: "respond_keyword_permitted".to_string(),
        };
        logger.log_mutation(&mutation).expect("log");
        logger.log_mutation(&mutation).expect("log again");

        let raw = std::fs::read_to_string(&path).expect("read log");
        let lines = raw.lines().collect::<Vec<&str>>();
        assert_eq!(lines.len(), 2);
        let record: Value = serde_json::from_str(lines[0]).expect("parse record");
        assert_eq!(record["record_type"], "multi_bot_owner_mutation_v1");
        assert_eq!(record["new_assignee"], "qq:1001");
        assert_eq!(record["reason_code"], "respond_keyword_permitted");
    }

    #[test]
    fn regression_owner_record_with_future_schema_fails_read() {
        let tempdir = tempfile::tempdir().expect("tempdir");
        let store = FileOwnerStateStore::open(tempdir.path()).expect("open store");
        let path = tempdir
            .path()
            .join("channels")
            .join("qq")
            .join("chan-1")
            .join(OWNER_RECORD_FILE_NAME);
        std::fs::create_dir_all(path.parent().expect("parent")).expect("mkdir");
        std::fs::write(&path, r#"{ "schema_version": 9, "assignee": "x" }"#).expect("seed");
        let error = store.read_assignee("qq/chan-1").expect_err("schema should fail");
        assert!(error
            .to_string()
            .contains("unsupported owner record schema_version 9"));
    }
}
