//! System utilities: master volume and the desktop trash
//!
//! Linux only. Each call shells out to a standard tool (`amixer`,
//! `trash-empty`, `trash-put`) and waits for it.

use std::path::Path;

use tokio::process::Command;

use crate::{Error, Result};

/// Argument list for setting the master volume
fn volume_args(percent: u8) -> [String; 5] {
    [
        "-D".to_string(),
        "pulse".to_string(),
        "sset".to_string(),
        "Master".to_string(),
        format!("{}%", percent.min(100)),
    ]
}

/// Set the master volume, clamped to 0-100 percent
///
/// # Errors
///
/// Returns error off Linux or when `amixer` fails
pub async fn set_volume(percent: u8) -> Result<u8> {
    let percent = percent.min(100);
    run("amixer", &volume_args(percent)).await?;
    tracing::info!(percent, "volume set");
    Ok(percent)
}

/// Permanently delete everything in the trash
///
/// # Errors
///
/// Returns error off Linux or when `trash-empty` fails
pub async fn empty_trash() -> Result<()> {
    run::<&str>("trash-empty", &[]).await?;
    tracing::info!("trash emptied");
    Ok(())
}

/// Move `path` to the trash
///
/// # Errors
///
/// Returns error off Linux, when the file does not exist, or when
/// `trash-put` fails
pub async fn move_to_trash(path: &Path) -> Result<()> {
    if !path.exists() {
        return Err(Error::Launch(format!(
            "No pude encontrar el archivo '{}'.",
            path.display()
        )));
    }

    run("trash-put", &[path.as_os_str()]).await?;
    tracing::info!(path = %path.display(), "moved to trash");
    Ok(())
}

async fn run<S: AsRef<std::ffi::OsStr>>(program: &str, args: &[S]) -> Result<()> {
    if !cfg!(target_os = "linux") {
        return Err(Error::Launch(
            "Esta función solo está disponible en Linux.".to_string(),
        ));
    }

    let output = Command::new(program)
        .args(args)
        .output()
        .await
        .map_err(|e| Error::Launch(format!("failed to run {program}: {e}")))?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(Error::Launch(format!(
            "{program} exited with {}: {}",
            output.status,
            stderr.trim()
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_volume_is_clamped() {
        assert_eq!(volume_args(50)[4], "50%");
        assert_eq!(volume_args(250)[4], "100%");
        assert_eq!(volume_args(0)[..4], ["-D", "pulse", "sset", "Master"]);
    }

    #[tokio::test]
    async fn test_trash_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = move_to_trash(&dir.path().join("nope.txt")).await.unwrap_err();
        assert!(err.to_string().contains("nope.txt"));
    }
}
