//! Validation audit trail
//!
//! One append-only entry per validation attempt. Entries never carry
//! request payloads.

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;
use tracing::{error, info};

/// Outcome of a validation attempt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Allow,
    Deny,
}

/// Audit record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub timestamp: DateTime<Utc>,
    /// Absent when no session was found
    pub principal_id: Option<String>,
    /// `METHOD /path` label
    pub route: String,
    pub resolved_tenant: Option<String>,
    /// Tenant recorded on the resource, as stored
    pub resource_tenant: Option<String>,
    pub decision: Decision,
    /// `ok`, or the internal denial reason
    pub reason_code: String,
}

/// Append-only audit destination
pub trait AuditSink: Send + Sync {
    fn record(&self, entry: AuditEntry);
}

/// Emits entries as structured tracing events on `franchise::audit`
#[derive(Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn record(&self, entry: AuditEntry) {
        info!(
            target: "franchise::audit",
            timestamp = %entry.timestamp.to_rfc3339(),
            principal_id = entry.principal_id.as_deref().unwrap_or("-"),
            route = %entry.route,
            resolved_tenant = entry.resolved_tenant.as_deref().unwrap_or("-"),
            resource_tenant = entry.resource_tenant.as_deref().unwrap_or("-"),
            decision = ?entry.decision,
            reason_code = %entry.reason_code,
            "access validation"
        );
    }
}

/// Appends one JSON object per line to a file
pub struct JsonLinesAuditSink {
    file: Mutex<File>,
}

impl JsonLinesAuditSink {
    pub fn open(path: &Path) -> std::io::Result<Self> {
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self { file: Mutex::new(file) })
    }
}

impl AuditSink for JsonLinesAuditSink {
    fn record(&self, entry: AuditEntry) {
        let line = match serde_json::to_string(&entry) {
            Ok(line) => line,
            Err(e) => {
                error!(error = %e, "failed to encode audit entry");
                return;
            }
        };
        let mut file = self.file.lock();
        if let Err(e) = writeln!(file, "{line}") {
            error!(error = %e, "failed to append audit entry");
        }
    }
}

/// Keeps entries in memory
#[derive(Debug, Default)]
pub struct MemoryAuditSink {
    entries: Mutex<Vec<AuditEntry>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded entries
    pub fn entries(&self) -> Vec<AuditEntry> {
        self.entries.lock().clone()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, entry: AuditEntry) {
        self.entries.lock().push(entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(decision: Decision) -> AuditEntry {
        AuditEntry {
            timestamp: Utc::now(),
            principal_id: Some("u1".into()),
            route: "/api/business/me".into(),
            resolved_tenant: Some("riverside".into()),
            resource_tenant: Some("riverside".into()),
            decision,
            reason_code: "ok".into(),
        }
    }

    #[test]
    fn test_memory_sink_appends() {
        let sink = MemoryAuditSink::new();
        sink.record(entry(Decision::Allow));
        sink.record(entry(Decision::Deny));

        let entries = sink.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].decision, Decision::Deny);
    }

    #[test]
    fn test_json_lines_sink_appends() {
        let path = std::env::temp_dir().join(format!("franchise-audit-{}.jsonl", uuid::Uuid::new_v4()));
        {
            let sink = JsonLinesAuditSink::open(&path).unwrap();
            sink.record(entry(Decision::Allow));
        }
        {
            let sink = JsonLinesAuditSink::open(&path).unwrap();
            sink.record(entry(Decision::Deny));
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<AuditEntry> = content
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        std::fs::remove_file(&path).ok();

        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].decision, Decision::Allow);
        assert_eq!(lines[1].decision, Decision::Deny);
        assert!(content.contains("\"resolvedTenant\":\"riverside\""));
    }
}
