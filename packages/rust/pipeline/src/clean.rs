//! Removal of leftover HTML intermediates.
//!
//! An interrupted run can leave HTML files behind in the project root;
//! `clean` removes them without invoking any external tool.

use std::path::PathBuf;

use tracing::info;

use docbuild_shared::{DocBuildError, Result};

use crate::pipeline::BuildConfig;
use crate::workdir::ScopedWorkdir;

/// Remove any HTML intermediates listed in the config. Returns the paths
/// that were actually removed; files that do not exist are ignored.
pub fn clean(config: &BuildConfig) -> Result<Vec<PathBuf>> {
    let _workdir = ScopedWorkdir::enter(&config.root)?;

    let mut removed = Vec::new();
    for doc in &config.documents {
        match std::fs::remove_file(&doc.html) {
            Ok(()) => {
                info!(path = %doc.html.display(), "removed leftover intermediate");
                removed.push(doc.html.clone());
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(DocBuildError::io(&doc.html, e)),
        }
    }

    Ok(removed)
}

#[cfg(test)]
#[cfg(unix)]
mod tests {
    use super::*;
    use docbuild_process::ToolSpec;
    use docbuild_shared::DocumentPair;

    fn config_for(root: &std::path::Path) -> BuildConfig {
        BuildConfig {
            root: root.to_path_buf(),
            wiki_dir: "wiki".into(),
            compiler: ToolSpec::new("true", vec![]),
            converter: ToolSpec::new("true", vec![]),
            documents: vec![
                DocumentPair::new("README.html", "README.md"),
                DocumentPair::new("HOWTO.html", "HOWTO.md"),
            ],
            fail_fast: false,
        }
    }

    #[test]
    fn clean_removes_only_existing_intermediates() {
        let _lock = crate::test_support::CWD_LOCK
            .lock()
            .unwrap_or_else(|e| e.into_inner());
        let tmp = tempfile::tempdir().expect("tempdir");
        std::fs::write(tmp.path().join("README.html"), "<h1>leftover</h1>").expect("seed html");
        let before = std::env::current_dir().expect("cwd");

        let removed = clean(&config_for(tmp.path())).expect("clean");

        assert_eq!(removed, vec![PathBuf::from("README.html")]);
        assert!(!tmp.path().join("README.html").exists());
        assert_eq!(std::env::current_dir().expect("cwd"), before);
    }
}
