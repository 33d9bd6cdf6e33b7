//! Scoped working-directory changes.

use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use docbuild_shared::{DocBuildError, Result};

/// RAII guard for a working-directory change: records the current directory,
/// changes into the target, and restores the original directory when
/// dropped, including on error returns and panics.
#[derive(Debug)]
pub struct ScopedWorkdir {
    original: PathBuf,
}

impl ScopedWorkdir {
    /// Change into `dir`, remembering the current directory for restoration.
    pub fn enter(dir: &Path) -> Result<Self> {
        let original =
            std::env::current_dir().map_err(|e| DocBuildError::io(PathBuf::from("."), e))?;
        std::env::set_current_dir(dir).map_err(|e| DocBuildError::io(dir, e))?;
        debug!(from = %original.display(), to = %dir.display(), "entered working directory");
        Ok(Self { original })
    }

    /// The directory that will be restored on drop.
    pub fn original(&self) -> &Path {
        &self.original
    }
}

impl Drop for ScopedWorkdir {
    fn drop(&mut self) {
        if let Err(e) = std::env::set_current_dir(&self.original) {
            warn!(
                path = %self.original.display(),
                error = %e,
                "failed to restore working directory"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::MutexGuard;

    fn cwd_lock() -> MutexGuard<'static, ()> {
        // A poisoned lock only means an earlier test panicked while holding
        // it; the guard itself restored the directory.
        crate::test_support::CWD_LOCK
            .lock()
            .unwrap_or_else(|e| e.into_inner())
    }

    #[test]
    fn enter_changes_and_restores() {
        let _lock = cwd_lock();
        let dir = tempfile::tempdir().expect("tempdir");
        let before = std::env::current_dir().expect("cwd");

        {
            let guard = ScopedWorkdir::enter(dir.path()).expect("enter");
            assert_eq!(guard.original(), before.as_path());
            let inside = std::env::current_dir().expect("cwd");
            assert_eq!(
                inside.canonicalize().expect("canonicalize"),
                dir.path().canonicalize().expect("canonicalize")
            );
        }

        assert_eq!(std::env::current_dir().expect("cwd"), before);
    }

    #[test]
    fn restores_on_panic() {
        let _lock = cwd_lock();
        let dir = tempfile::tempdir().expect("tempdir");
        let before = std::env::current_dir().expect("cwd");

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _guard = ScopedWorkdir::enter(dir.path()).expect("enter");
            panic!("step blew up");
        }));
        assert!(result.is_err());

        assert_eq!(std::env::current_dir().expect("cwd"), before);
    }

    #[test]
    fn enter_nonexistent_dir_fails_without_changing_cwd() {
        let _lock = cwd_lock();
        let before = std::env::current_dir().expect("cwd");

        let result = ScopedWorkdir::enter(Path::new("/nonexistent/docbuild-workdir"));
        assert!(result.is_err());
        assert_eq!(std::env::current_dir().expect("cwd"), before);
    }
}
