use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;
use tokio::process::Child;

/// Locate an executable by name on `PATH`; names containing a separator are checked directly
pub fn find_on_path(bin: &str) -> Option<PathBuf> {
    if bin.contains(std::path::MAIN_SEPARATOR) {
        let p = PathBuf::from(bin);
        return if p.exists() { Some(p) } else { None };
    }
    let paths = std::env::var_os("PATH")?;
    std::env::split_paths(&paths)
        .map(|dir| dir.join(bin))
        .find(|candidate| is_file(candidate))
}

/// Binary named by `env_key` if it exists, otherwise `default_bin` looked up on `PATH`
pub fn find_from_env_or_path(env_key: &str, default_bin: &str) -> Option<PathBuf> {
    if let Ok(p) = std::env::var(env_key) {
        let pb = PathBuf::from(p);
        if pb.exists() {
            return Some(pb);
        }
    }
    find_on_path(default_bin)
}

fn is_file(p: &Path) -> bool {
    p.metadata().map(|m| m.is_file()).unwrap_or(false)
}

/// Write `input` to the child's stdin, then close it so the child sees EOF.
///
/// A child that exits without draining stdin is not an error here; its exit
/// status and stderr are what the caller reports.
pub async fn feed_stdin(child: &mut Child, input: &[u8]) -> std::io::Result<()> {
    let Some(mut stdin) = child.stdin.take() else {
        return Ok(());
    };
    match stdin.write_all(input).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::BrokenPipe => {
            tracing::debug!(target: "utils", "child closed stdin before reading all input");
            Ok(())
        }
        Err(e) => Err(e),
    }
}
