//! Byte size of a file or directory tree.
//!
//! A native probe (`du` on Unix, PowerShell on Windows) is tried first since
//! it is much faster on large trees. When it is unavailable, fails, or prints
//! something unexpected, a manual walk is used instead. Neither path follows
//! symbolic links.

use std::path::Path;
use std::process::Command;

use walkdir::WalkDir;

use crate::config::settings::Settings;

/// A fast, OS-specific size summary. `None` means "could not tell".
pub trait NativeProbe: Send + Sync {
    fn name(&self) -> &'static str;
    fn probe(&self, path: &Path) -> Option<u64>;
}

/// `du -skP`: summary only, KiB blocks, never follow symlinks.
#[derive(Debug, Default, Clone, Copy)]
pub struct DuProbe;

impl NativeProbe for DuProbe {
    fn name(&self) -> &'static str {
        "du"
    }

    fn probe(&self, path: &Path) -> Option<u64> {
        let output = Command::new("du").arg("-skP").arg(path).output().ok()?;
        if !output.status.success() {
            return None;
        }
        parse_du_output(&String::from_utf8_lossy(&output.stdout))
    }
}

/// `du -sk` prints `<kib>\t<path>`; returns bytes.
pub fn parse_du_output(output: &str) -> Option<u64> {
    let first = output.lines().next()?;
    let kib: u64 = first.split_whitespace().next()?.parse().ok()?;
    kib.checked_mul(1024)
}

/// `Get-ChildItem -Recurse` summed with `Measure-Object`. Reparse points are
/// not followed unless `-FollowSymlink` is given.
#[derive(Debug, Default, Clone, Copy)]
pub struct PowerShellProbe;

impl NativeProbe for PowerShellProbe {
    fn name(&self) -> &'static str {
        "powershell"
    }

    fn probe(&self, path: &Path) -> Option<u64> {
        let literal = path.to_string_lossy().replace('\'', "''");
        let script = format!(
            "(Get-ChildItem -LiteralPath '{literal}' -Recurse -Force -ErrorAction SilentlyContinue \
             | Measure-Object -Property Length -Sum).Sum"
        );
        let output = Command::new("powershell.exe")
            .args(["-NoProfile", "-Command", &script])
            .output()
            .ok()?;
        if !output.status.success() {
            return None;
        }
        parse_powershell_output(&String::from_utf8_lossy(&output.stdout))
    }
}

pub fn parse_powershell_output(output: &str) -> Option<u64> {
    output.lines().next()?.trim().parse().ok()
}

/// Sizes paths with an optional native probe and a portable fallback.
pub struct SizeProber {
    native: Option<Box<dyn NativeProbe>>,
}

impl SizeProber {
    /// The native probe suited to the host OS, if there is one.
    pub fn for_host() -> Self {
        #[cfg(unix)]
        let native: Option<Box<dyn NativeProbe>> = Some(Box::new(DuProbe));
        #[cfg(windows)]
        let native: Option<Box<dyn NativeProbe>> = Some(Box::new(PowerShellProbe));
        #[cfg(not(any(unix, windows)))]
        let native: Option<Box<dyn NativeProbe>> = None;

        Self { native }
    }

    /// Walk-only prober; sizes are exact apparent byte lengths.
    pub fn portable() -> Self {
        Self { native: None }
    }

    pub fn with_native(probe: Box<dyn NativeProbe>) -> Self {
        Self {
            native: Some(probe),
        }
    }

    pub fn from_settings(settings: &Settings) -> Self {
        if settings.native_probe {
            Self::for_host()
        } else {
            Self::portable()
        }
    }

    /// Total size in bytes. Never fails: anything unreadable counts as 0.
    pub fn size(&self, path: &Path) -> u64 {
        // `du` would report the link's own block
        match std::fs::symlink_metadata(path) {
            Ok(meta) if !meta.file_type().is_symlink() => {}
            _ => return 0,
        }

        if let Some(native) = &self.native {
            match native.probe(path) {
                Some(size) => {
                    tracing::debug!("{} sized {} at {} bytes", native.name(), path.display(), size);
                    return size;
                }
                None => {
                    tracing::warn!("{} probe failed for {}, walking instead", native.name(), path.display());
                }
            }
        }

        walk_size(path)
    }
}

/// Sum of regular-file lengths under `path`. A symlink at `path` counts as 0;
/// symlinks below it are skipped, as are entries that cannot be read.
pub fn walk_size(path: &Path) -> u64 {
    let meta = match std::fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(_) => return 0,
    };
    let file_type = meta.file_type();
    if file_type.is_symlink() {
        return 0;
    }
    if file_type.is_file() {
        return meta.len();
    }
    if !file_type.is_dir() {
        return 0;
    }

    WalkDir::new(path)
        .follow_links(false)
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                tracing::debug!("skipping unreadable entry: {}", e);
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .filter_map(|entry| entry.metadata().ok())
        .map(|meta| meta.len())
        .sum()
}
