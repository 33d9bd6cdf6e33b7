//! End-to-end `build` pipeline: compile wiki, convert documents, clean up.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::time::Instant;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, warn};

use docbuild_process::{self as process, ToolSpec};
use docbuild_shared::{
    AppConfig, DocBuildError, DocumentPair, DocumentReport, Result, RunId, RunReport, StepReport,
    StepStatus,
};

use crate::workdir::ScopedWorkdir;

// ---------------------------------------------------------------------------
// Config and progress
// ---------------------------------------------------------------------------

/// Configuration for one `build` run, resolved from config file + CLI flags.
#[derive(Debug, Clone)]
pub struct BuildConfig {
    /// Project root; the whole sequence runs with this as its working
    /// directory.
    pub root: PathBuf,
    /// Wiki source directory, passed to the compiler.
    pub wiki_dir: PathBuf,
    /// Wiki compiler invocation.
    pub compiler: ToolSpec,
    /// HTML-to-Markdown converter invocation.
    pub converter: ToolSpec,
    /// Documents to build, in order.
    pub documents: Vec<DocumentPair>,
    /// Abort remaining steps on the first failure.
    pub fail_fast: bool,
}

impl From<&AppConfig> for BuildConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            root: PathBuf::from(&config.project.root),
            wiki_dir: PathBuf::from(&config.project.wiki_dir),
            compiler: ToolSpec::from(&config.tools.compiler),
            converter: ToolSpec::from(&config.tools.converter),
            documents: config.documents.clone(),
            fail_fast: config.behavior.fail_fast,
        }
    }
}

/// Progress callback for reporting build status.
pub trait ProgressReporter: Send + Sync {
    /// Called when entering a new phase.
    fn phase(&self, name: &str);
    /// Called after each document's conversion step.
    fn document_converted(&self, markdown: &str, current: usize, total: usize);
    /// Called when the build completes.
    fn done(&self, report: &RunReport);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn phase(&self, _name: &str) {}
    fn document_converted(&self, _markdown: &str, _current: usize, _total: usize) {}
    fn done(&self, _report: &RunReport) {}
}

// ---------------------------------------------------------------------------
// Build
// ---------------------------------------------------------------------------

/// Run the full documentation build.
///
/// 1. Enter the project root (restored on every exit path)
/// 2. Compile the wiki source to HTML intermediates
/// 3. Convert each HTML intermediate to its Markdown target
/// 4. Delete each HTML intermediate
///
/// Step failures do not abort the sequence unless `fail_fast` is set; every
/// outcome lands in the returned [`RunReport`]. `Err` is reserved for
/// failures that prevent orchestration entirely (project root missing).
#[instrument(skip_all, fields(root = %config.root.display()))]
pub fn build(config: &BuildConfig, progress: &dyn ProgressReporter) -> Result<RunReport> {
    let started_at = Utc::now();
    let start = Instant::now();
    let run_id = RunId::new();

    info!(%run_id, root = %config.root.display(), "starting documentation build");

    let _workdir = ScopedWorkdir::enter(&config.root)?;

    let mut steps: Vec<StepReport> = Vec::new();
    let mut halted = false;

    // The compiler drops its HTML output into the project root.
    progress.phase("Compiling wiki");
    let step = tool_step(
        "compile-wiki".into(),
        &config.compiler,
        &[config.wiki_dir.as_os_str()],
    );
    note_halt(&step, config.fail_fast, &mut halted);
    steps.push(step);

    let total = config.documents.len();
    for (idx, doc) in config.documents.iter().enumerate() {
        progress.phase(&format!("Converting {}", doc.html.display()));

        let name = format!("convert {}", doc.html.display());
        let step = if halted {
            skipped(name)
        } else {
            let begun = Instant::now();
            let result =
                process::capture_to_file(&config.converter, &[doc.html.as_os_str()], &doc.markdown);
            finish_step(name, begun, result)
        };
        note_halt(&step, config.fail_fast, &mut halted);
        steps.push(step);
        progress.document_converted(&doc.markdown.display().to_string(), idx + 1, total);

        let name = format!("clean {}", doc.html.display());
        let step = if halted {
            skipped(name)
        } else {
            remove_step(name, &doc.html)
        };
        note_halt(&step, config.fail_fast, &mut halted);
        steps.push(step);
    }

    // Output state is recorded while still inside the project root, since
    // document paths are relative to it.
    let documents: Vec<DocumentReport> = config
        .documents
        .iter()
        .map(|doc| describe_output(&doc.markdown))
        .collect();

    let success = steps.iter().all(|s| !s.status.is_failed());
    let report = RunReport {
        run_id,
        started_at,
        duration_ms: start.elapsed().as_millis() as u64,
        steps,
        documents,
        success,
    };

    if report.success {
        for doc in &report.documents {
            if !doc.is_nonempty() {
                warn!(
                    markdown = %doc.markdown.display(),
                    "output missing or empty after successful run"
                );
            }
        }
        info!(
            steps = report.steps.len(),
            elapsed_ms = report.duration_ms,
            "build complete"
        );
    } else {
        warn!(
            failed = report.failed_steps().count(),
            "build completed with failures"
        );
    }

    progress.done(&report);
    Ok(report)
}

// ---------------------------------------------------------------------------
// Step helpers
// ---------------------------------------------------------------------------

fn tool_step(name: String, spec: &ToolSpec, extra_args: &[&OsStr]) -> StepReport {
    let begun = Instant::now();
    let result = process::run(spec, extra_args);
    finish_step(name, begun, result)
}

fn finish_step(
    name: String,
    begun: Instant,
    result: Result<process::ToolRun>,
) -> StepReport {
    let status = match result {
        Ok(run) if run.success() => StepStatus::Ok,
        Ok(run) => StepStatus::Failed {
            exit_code: run.exit_code,
            detail: run.failure_detail(),
        },
        Err(e) => StepStatus::Failed {
            exit_code: None,
            detail: e.to_string(),
        },
    };
    if let StepStatus::Failed { detail, .. } = &status {
        warn!(step = %name, %detail, "step failed");
    }
    StepReport {
        name,
        status,
        duration_ms: begun.elapsed().as_millis() as u64,
    }
}

fn skipped(name: String) -> StepReport {
    StepReport {
        name,
        status: StepStatus::Skipped,
        duration_ms: 0,
    }
}

fn note_halt(step: &StepReport, fail_fast: bool, halted: &mut bool) {
    if fail_fast && step.status.is_failed() {
        *halted = true;
    }
}

fn remove_step(name: String, path: &Path) -> StepReport {
    let begun = Instant::now();
    // An intermediate that never got produced is not a failure to clean.
    let status = match std::fs::remove_file(path) {
        Ok(()) => StepStatus::Ok,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => StepStatus::Ok,
        Err(e) => StepStatus::Failed {
            exit_code: None,
            detail: DocBuildError::io(path, e).to_string(),
        },
    };
    StepReport {
        name,
        status,
        duration_ms: begun.elapsed().as_millis() as u64,
    }
}

fn describe_output(markdown: &Path) -> DocumentReport {
    match std::fs::read(markdown) {
        Ok(bytes) => {
            let mut hasher = Sha256::new();
            hasher.update(&bytes);
            let sha256 = format!("{:x}", hasher.finalize());
            DocumentReport {
                markdown: markdown.to_path_buf(),
                exists: true,
                bytes: bytes.len() as u64,
                sha256: Some(sha256),
            }
        }
        Err(_) => DocumentReport {
            markdown: markdown.to_path_buf(),
            exists: false,
            bytes: 0,
            sha256: None,
        },
    }
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use std::sync::MutexGuard;
    use tempfile::TempDir;

    fn cwd_lock() -> MutexGuard<'static, ()> {
        crate::test_support::CWD_LOCK
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    fn write_script(dir: &Path, name: &str, body: &str) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let path = dir.join(name);
        std::fs::write(&path, format!("#!/bin/sh\n{body}\n")).expect("write script");
        let mut perms = std::fs::metadata(&path).expect("stat").permissions();
        perms.set_mode(0o755);
        std::fs::set_permissions(&path, perms).expect("chmod");
        path
    }

    /// A project root plus a bin dir holding fake compiler/converter
    /// scripts. The compiler writes the two HTML intermediates; the
    /// converter strips tags from its file argument to stdout.
    struct Fixture {
        _tmp: TempDir,
        root: PathBuf,
        compiler: PathBuf,
        converter: PathBuf,
    }

    impl Fixture {
        fn new(compiler_body: &str) -> Self {
            let tmp = tempfile::tempdir().expect("tempdir");
            let root = tmp.path().join("project");
            std::fs::create_dir_all(root.join("wiki")).expect("mkdir wiki");

            let bin = tmp.path().join("bin");
            std::fs::create_dir_all(&bin).expect("mkdir bin");
            let compiler = write_script(&bin, "fake-compiler", compiler_body);
            let converter =
                write_script(&bin, "fake-converter", r#"exec sed -e 's/<[^>]*>//g' "$1""#);

            Self {
                _tmp: tmp,
                root,
                compiler,
                converter,
            }
        }

        fn working_compiler() -> &'static str {
            r#"printf '<h1>Title</h1>\n<p>Readme body</p>\n' > README.html
printf '<h1>Install</h1>\n<p>Howto body</p>\n' > HOWTO.html"#
        }

        fn config(&self, fail_fast: bool) -> BuildConfig {
            BuildConfig {
                root: self.root.clone(),
                wiki_dir: "wiki".into(),
                compiler: ToolSpec::new(self.compiler.to_string_lossy(), vec![]),
                converter: ToolSpec::new(self.converter.to_string_lossy(), vec![]),
                documents: vec![
                    DocumentPair::new("README.html", "README.md"),
                    DocumentPair::new("HOWTO.html", "HOWTO.md"),
                ],
                fail_fast,
            }
        }
    }

    #[test]
    fn build_produces_markdown_and_removes_intermediates() {
        let _lock = cwd_lock();
        let fx = Fixture::new(Fixture::working_compiler());
        let before = std::env::current_dir().expect("cwd");

        let report = build(&fx.config(false), &SilentProgress).expect("build");

        assert!(report.success);
        // compile + (convert + clean) per document
        assert_eq!(report.steps.len(), 5);
        assert!(report.steps.iter().all(|s| s.status == StepStatus::Ok));

        let readme = std::fs::read_to_string(fx.root.join("README.md")).expect("read README.md");
        assert!(readme.contains("Title"));
        assert!(readme.contains("Readme body"));
        assert!(!readme.contains("<h1>"));

        assert!(!fx.root.join("README.html").exists());
        assert!(!fx.root.join("HOWTO.html").exists());
        assert!(report.documents.iter().all(|d| d.is_nonempty()));

        assert_eq!(std::env::current_dir().expect("cwd"), before);
    }

    #[test]
    fn repeated_builds_produce_identical_output() {
        let _lock = cwd_lock();
        let fx = Fixture::new(Fixture::working_compiler());
        let config = fx.config(false);

        let first = build(&config, &SilentProgress).expect("first build");
        let second = build(&config, &SilentProgress).expect("second build");

        assert!(first.success && second.success);
        for (a, b) in first.documents.iter().zip(second.documents.iter()) {
            assert_eq!(a.sha256, b.sha256, "{} changed between runs", a.markdown.display());
        }
        assert!(!fx.root.join("README.html").exists());
    }

    #[test]
    fn failing_compiler_still_runs_remaining_steps() {
        let _lock = cwd_lock();
        let fx = Fixture::new("echo compile exploded >&2\nexit 1");
        let before = std::env::current_dir().expect("cwd");

        let report = build(&fx.config(false), &SilentProgress).expect("build");

        assert!(!report.success);
        assert_eq!(report.steps.len(), 5);
        assert!(report.steps[0].status.is_failed());
        // Conversion was attempted (and failed on the missing input);
        // cleanup of a missing intermediate is a no-op success.
        assert!(report.steps[1].status.is_failed());
        assert_eq!(report.steps[2].status, StepStatus::Ok);
        assert!(report.steps[3].status.is_failed());
        assert_eq!(report.steps[4].status, StepStatus::Ok);

        // The converter produced no stdout, so the targets exist but are
        // empty, exactly like shell redirection from a failed command.
        let readme = fx.root.join("README.md");
        assert!(readme.exists());
        assert_eq!(std::fs::metadata(&readme).expect("stat").len(), 0);

        assert_eq!(std::env::current_dir().expect("cwd"), before);
    }

    #[test]
    fn fail_fast_skips_remaining_steps() {
        let _lock = cwd_lock();
        let fx = Fixture::new("exit 1");

        let report = build(&fx.config(true), &SilentProgress).expect("build");

        assert!(!report.success);
        assert!(report.steps[0].status.is_failed());
        assert!(
            report.steps[1..]
                .iter()
                .all(|s| s.status == StepStatus::Skipped)
        );
        assert!(!fx.root.join("README.md").exists());
    }

    #[test]
    fn missing_root_is_an_error() {
        let _lock = cwd_lock();
        let fx = Fixture::new(Fixture::working_compiler());
        let mut config = fx.config(false);
        config.root = fx.root.join("nonexistent");

        assert!(build(&config, &SilentProgress).is_err());
    }
}
