//! Startup requirement validation for procpulse.
//!
//! Checks that the proc root is usable before the server or dashboard starts.

use nix::unistd::geteuid;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{error, info, warn};

use procpulse::ReaderMode;

#[derive(Debug, thiserror::Error)]
pub enum ValidationError {
    #[error("proc root {0} does not exist")]
    ProcRootMissing(PathBuf),

    #[error("proc root {0} is not a directory")]
    ProcRootNotDirectory(PathBuf),

    #[error("insufficient permissions on {path}: {reason}")]
    InsufficientPermissions { path: PathBuf, reason: String },
}

/// Validate all runtime requirements for the chosen reader mode.
///
/// The fixed reader needs nothing. `auto` only warns, since it falls back to
/// fixed values on its own.
pub fn validate_requirements(mode: ReaderMode, proc_root: &Path) -> Result<(), ValidationError> {
    info!("Validating runtime requirements...");

    match mode {
        ReaderMode::Fixed => {
            info!("Fixed reader selected, skipping proc checks");
        }
        ReaderMode::Procfs => {
            check_user_privileges();
            check_proc_root(proc_root)?;
        }
        ReaderMode::Auto => {
            check_user_privileges();
            if let Err(e) = check_proc_root(proc_root) {
                warn!("{} (auto mode will fall back to fixed values)", e);
            }
        }
    }

    info!("Runtime requirements validated");
    Ok(())
}

fn check_user_privileges() {
    if geteuid().is_root() {
        info!("Running as root (uid=0)");
    } else {
        warn!("Not running as root - command lines of other users' processes may be hidden");
    }
}

/// The root must be a readable directory containing `stat`.
fn check_proc_root(root: &Path) -> Result<(), ValidationError> {
    let meta = match fs::metadata(root) {
        Ok(m) => m,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            return Err(ValidationError::ProcRootMissing(root.to_path_buf()));
        }
        Err(e) => {
            return Err(ValidationError::InsufficientPermissions {
                path: root.to_path_buf(),
                reason: e.to_string(),
            });
        }
    };
    if !meta.is_dir() {
        return Err(ValidationError::ProcRootNotDirectory(root.to_path_buf()));
    }

    let stat = root.join("stat");
    match fs::read_to_string(&stat) {
        Ok(_) => {
            info!("{} is readable", stat.display());
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::PermissionDenied => {
            error!("Cannot read {} - insufficient permissions", stat.display());
            Err(ValidationError::InsufficientPermissions {
                path: stat,
                reason: e.to_string(),
            })
        }
        Err(e) => {
            warn!("Could not read {}: {}", stat.display(), e);
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_fixed_mode_needs_nothing() {
        assert!(validate_requirements(ReaderMode::Fixed, Path::new("/nonexistent")).is_ok());
    }

    #[test]
    fn test_procfs_mode_missing_root() {
        let err = validate_requirements(ReaderMode::Procfs, Path::new("/nonexistent/proc"))
            .unwrap_err();
        assert!(matches!(err, ValidationError::ProcRootMissing(_)));
    }

    #[test]
    fn test_auto_mode_only_warns() {
        assert!(validate_requirements(ReaderMode::Auto, Path::new("/nonexistent/proc")).is_ok());
    }

    #[test]
    fn test_procfs_mode_file_root() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not_a_dir");
        fs::write(&file, "x").unwrap();
        let err = validate_requirements(ReaderMode::Procfs, &file).unwrap_err();
        assert!(matches!(err, ValidationError::ProcRootNotDirectory(_)));
    }

    #[test]
    fn test_procfs_mode_fake_root() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("stat"), "cpu 1 2 3 4 5 6 7\n").unwrap();
        assert!(validate_requirements(ReaderMode::Procfs, dir.path()).is_ok());
    }
}
