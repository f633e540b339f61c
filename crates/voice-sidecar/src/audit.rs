//! Append-only JSONL audit log, one record per completed pipeline invocation.
//!
//! Concurrent appends must not interleave bytes within a line: writes go
//! through a single `Mutex<File>` so each call to [`AuditLog::record`] is
//! one atomic `write_all` of a complete, newline-terminated line.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use jarvis_domain::error::Result;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditEvent {
    Identified,
    Fallback,
    Rejected,
    NoSpeech,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback_reason: Option<String>,
    pub audio_duration_seconds: f32,
}

pub struct AuditLog {
    path: PathBuf,
    file: Mutex<std::fs::File>,
}

impl AuditLog {
    pub fn open(path: impl Into<PathBuf>) -> anyhow::Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            file: Mutex::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, record: &AuditRecord) -> Result<()> {
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = self.file.lock();
        file.write_all(line.as_bytes())?;
        file.flush()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{BufRead, BufReader};

    #[test]
    fn records_are_appended_as_single_lines() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");
        let log = AuditLog::open(&log_path).unwrap();

        log.record(&AuditRecord {
            timestamp: Utc::now(),
            event: AuditEvent::NoSpeech,
            user_id: None,
            confidence: None,
            fallback_reason: None,
            audio_duration_seconds: 1.5,
        })
        .unwrap();
        log.record(&AuditRecord {
            timestamp: Utc::now(),
            event: AuditEvent::Identified,
            user_id: Some("dad".into()),
            confidence: Some(0.9),
            fallback_reason: None,
            audio_duration_seconds: 2.3,
        })
        .unwrap();

        let file = std::fs::File::open(&log_path).unwrap();
        let lines: Vec<String> = BufReader::new(file)
            .lines()
            .collect::<std::io::Result<_>>()
            .unwrap();
        assert_eq!(lines.len(), 2);
        let first: AuditRecord = serde_json::from_str(&lines[0]).unwrap();
        assert_eq!(first.event, AuditEvent::NoSpeech);
        let second: AuditRecord = serde_json::from_str(&lines[1]).unwrap();
        assert_eq!(second.user_id.as_deref(), Some("dad"));
    }

    #[test]
    fn reopen_appends_rather_than_truncates() {
        let dir = tempfile::tempdir().unwrap();
        let log_path = dir.path().join("audit.jsonl");
        {
            let log = AuditLog::open(&log_path).unwrap();
            log.record(&AuditRecord {
                timestamp: Utc::now(),
                event: AuditEvent::Rejected,
                user_id: None,
                confidence: Some(0.3),
                fallback_reason: None,
                audio_duration_seconds: 1.0,
            })
            .unwrap();
        }
        {
            let log = AuditLog::open(&log_path).unwrap();
            log.record(&AuditRecord {
                timestamp: Utc::now(),
                event: AuditEvent::Rejected,
                user_id: None,
                confidence: Some(0.2),
                fallback_reason: None,
                audio_duration_seconds: 1.0,
            })
            .unwrap();
        }
        let content = std::fs::read_to_string(&log_path).unwrap();
        assert_eq!(content.lines().count(), 2);
    }
}
