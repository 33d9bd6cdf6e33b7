//! Core domain types for docbuild runs and reports.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// DocumentPair
// ---------------------------------------------------------------------------

/// One document to build: the HTML intermediate produced by the wiki
/// compiler and the Markdown file it is converted into. Paths are relative
/// to the project root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentPair {
    /// HTML intermediate emitted by the wiki compiler.
    pub html: PathBuf,
    /// Markdown target, fully overwritten on each run.
    pub markdown: PathBuf,
}

impl DocumentPair {
    pub fn new(html: impl Into<PathBuf>, markdown: impl Into<PathBuf>) -> Self {
        Self {
            html: html.into(),
            markdown: markdown.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// RunId
// ---------------------------------------------------------------------------

/// A UUID v7 wrapper for build-run identifiers (time-sortable).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(pub Uuid);

impl RunId {
    /// Generate a new time-sortable run identifier.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RunId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

// ---------------------------------------------------------------------------
// Step reports
// ---------------------------------------------------------------------------

/// Outcome of a single pipeline step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    /// The step completed successfully.
    Ok,
    /// The step ran but failed (non-zero exit, spawn failure, I/O error).
    Failed {
        /// Exit code, when the tool ran and exited normally.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        exit_code: Option<i32>,
        /// Human-readable failure detail (tool stderr or error message).
        detail: String,
    },
    /// The step was not executed because an earlier step failed under
    /// fail-fast policy.
    Skipped,
}

impl StepStatus {
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Record of one executed (or skipped) pipeline step.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepReport {
    /// Step name, e.g. `compile-wiki` or `convert README.html`.
    pub name: String,
    /// Step outcome.
    #[serde(flatten)]
    pub status: StepStatus,
    /// Wall-clock duration of the step in milliseconds.
    pub duration_ms: u64,
}

// ---------------------------------------------------------------------------
// Document reports
// ---------------------------------------------------------------------------

/// State of one Markdown output after a run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentReport {
    /// Markdown target path, relative to the project root.
    pub markdown: PathBuf,
    /// Whether the file exists after the run.
    pub exists: bool,
    /// File length in bytes (0 when missing).
    pub bytes: u64,
    /// SHA-256 of the file content, hex-encoded (absent when missing).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
}

impl DocumentReport {
    /// Whether the output satisfies the success-path invariant: present
    /// and non-empty.
    pub fn is_nonempty(&self) -> bool {
        self.exists && self.bytes > 0
    }
}

// ---------------------------------------------------------------------------
// RunReport
// ---------------------------------------------------------------------------

/// Serializable summary of one `build` run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// Unique identifier for this run.
    pub run_id: RunId,
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Total wall-clock duration in milliseconds.
    pub duration_ms: u64,
    /// Per-step outcomes, in execution order.
    pub steps: Vec<StepReport>,
    /// Per-document output state.
    pub documents: Vec<DocumentReport>,
    /// True iff no executed step failed.
    pub success: bool,
}

impl RunReport {
    /// Steps that failed, in execution order.
    pub fn failed_steps(&self) -> impl Iterator<Item = &StepReport> {
        self.steps.iter().filter(|s| s.status.is_failed())
    }

    /// Find a document report by its Markdown path.
    pub fn document(&self, markdown: &Path) -> Option<&DocumentReport> {
        self.documents.iter().find(|d| d.markdown == markdown)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn run_id_roundtrip() {
        let id = RunId::new();
        let s = id.to_string();
        let parsed: RunId = s.parse().expect("parse RunId");
        assert_eq!(id, parsed);
    }

    #[test]
    fn step_status_serialization() {
        let ok = serde_json::to_value(StepStatus::Ok).expect("serialize");
        assert_eq!(ok["status"], "ok");

        let failed = serde_json::to_value(StepStatus::Failed {
            exit_code: Some(2),
            detail: "boom".into(),
        })
        .expect("serialize");
        assert_eq!(failed["status"], "failed");
        assert_eq!(failed["exit_code"], 2);

        let parsed: StepStatus =
            serde_json::from_value(failed).expect("deserialize");
        assert!(parsed.is_failed());
    }

    #[test]
    fn report_roundtrip() {
        let report = RunReport {
            run_id: RunId::new(),
            started_at: Utc::now(),
            duration_ms: 1234,
            steps: vec![
                StepReport {
                    name: "compile-wiki".into(),
                    status: StepStatus::Ok,
                    duration_ms: 900,
                },
                StepReport {
                    name: "convert README.html".into(),
                    status: StepStatus::Failed {
                        exit_code: Some(1),
                        detail: "converter exited with status 1".into(),
                    },
                    duration_ms: 12,
                },
                StepReport {
                    name: "clean README.html".into(),
                    status: StepStatus::Skipped,
                    duration_ms: 0,
                },
            ],
            documents: vec![DocumentReport {
                markdown: "README.md".into(),
                exists: true,
                bytes: 42,
                sha256: Some("ab".repeat(32)),
            }],
            success: false,
        };

        let json = serde_json::to_string_pretty(&report).expect("serialize");
        let parsed: RunReport = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(parsed.steps.len(), 3);
        assert_eq!(parsed.failed_steps().count(), 1);
        assert!(!parsed.success);
        assert!(
            parsed
                .document(Path::new("README.md"))
                .expect("document report")
                .is_nonempty()
        );
    }
}
