//! Build orchestration for docbuild.
//!
//! Sequences the external wiki compiler and HTML-to-Markdown converter over
//! the configured document pairs, removes the HTML intermediates, and
//! assembles a run report.

pub mod clean;
pub mod pipeline;
pub mod workdir;

pub use clean::clean;
pub use pipeline::{BuildConfig, ProgressReporter, SilentProgress, build};
pub use workdir::ScopedWorkdir;

#[cfg(test)]
pub(crate) mod test_support {
    use std::sync::Mutex;

    /// Tests that change the process-wide working directory serialize on
    /// this lock.
    pub static CWD_LOCK: Mutex<()> = Mutex::new(());
}
