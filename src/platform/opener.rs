use std::path::Path;
use std::process::Command;

/// Reveals a path in the desktop file manager.
pub trait PathOpener: Send + Sync {
    fn open(&self, path: &Path) -> std::io::Result<()>;
}

/// Launches a helper program with the path as its only argument.
#[derive(Debug, Clone, Copy)]
pub struct CommandOpener {
    pub program: &'static str,
}

impl PathOpener for CommandOpener {
    fn open(&self, path: &Path) -> std::io::Result<()> {
        tracing::debug!("{} {}", self.program, path.display());
        // Do not wait: file managers may keep running.
        Command::new(self.program).arg(path).spawn().map(|_| ())
    }
}

pub fn for_host() -> Box<dyn PathOpener> {
    let program = if cfg!(target_os = "macos") {
        "open"
    } else if cfg!(windows) {
        "explorer.exe"
    } else {
        "xdg-open"
    };
    Box::new(CommandOpener { program })
}
