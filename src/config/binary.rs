//! Locating the native watcher binary for the current platform.
//!
//! Binaries ship side by side as `<platform>-<arch>/rust-watcher`, with a
//! single universal build for macOS.

use std::path::{Path, PathBuf};

use crate::{Error, Result};

/// File name of the watcher executable, without extension.
pub const BINARY_NAME: &str = "rust-watcher";

/// Directory name holding the binary for the running platform.
///
/// # Errors
///
/// Returns an error on platforms no watcher build exists for.
pub fn binary_dir_name() -> Result<String> {
    dir_name_for(std::env::consts::OS, std::env::consts::ARCH)
}

/// Full path of the watcher binary under `base_dir`.
///
/// # Errors
///
/// Returns an error on unsupported platforms.
pub fn resolve_binary_path(base_dir: impl AsRef<Path>) -> Result<PathBuf> {
    let file = format!("{BINARY_NAME}{}", std::env::consts::EXE_SUFFIX);
    Ok(base_dir.as_ref().join(binary_dir_name()?).join(file))
}

fn dir_name_for(os: &str, arch: &str) -> Result<String> {
    let platform = match os {
        "linux" => "linux",
        "macos" => return Ok("osx-universal2".to_string()),
        "windows" => "windows",
        other => return Err(Error::config(format!("unsupported platform '{other}'"))),
    };

    let arch = match arch {
        "x86_64" => "x64",
        "aarch64" => "arm64",
        "x86" => "x32",
        other => return Err(Error::config(format!("unsupported architecture '{other}'"))),
    };

    Ok(format!("{platform}-{arch}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dir_names() {
        assert_eq!(dir_name_for("linux", "x86_64").unwrap(), "linux-x64");
        assert_eq!(dir_name_for("linux", "aarch64").unwrap(), "linux-arm64");
        assert_eq!(dir_name_for("windows", "x86").unwrap(), "windows-x32");
        assert_eq!(dir_name_for("macos", "aarch64").unwrap(), "osx-universal2");
        assert_eq!(dir_name_for("macos", "x86_64").unwrap(), "osx-universal2");
    }

    #[test]
    fn test_unsupported_platform() {
        let err = dir_name_for("freebsd", "x86_64").unwrap_err();
        assert!(err.to_string().contains("freebsd"));
        assert!(dir_name_for("linux", "riscv64").is_err());
    }

    #[cfg(all(target_os = "linux", target_arch = "x86_64"))]
    #[test]
    fn test_resolve_binary_path() {
        assert_eq!(
            resolve_binary_path("/opt/plugin").unwrap(),
            PathBuf::from("/opt/plugin/linux-x64/rust-watcher")
        );
    }
}
