use std::path::{Path, PathBuf};
use tokio::fs;

/// Path an upload is stored at: `<upload_dir>/<owner>_<filename>`.
/// Directory components and separators are stripped from the filename.
pub fn upload_path(upload_dir: &Path, owner_id: i64, filename: &str) -> PathBuf {
    upload_dir.join(format!("{}_{}", owner_id, sanitize_filename(filename)))
}

fn sanitize_filename(filename: &str) -> String {
    let base = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(filename)
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| if c.is_control() || c == ':' { '_' } else { c })
        .collect();

    match cleaned.trim_start_matches('.') {
        "" => "upload".to_string(),
        name => name.to_string(),
    }
}

pub async fn save_upload(path: &Path, bytes: &[u8]) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent).await?;
    }
    fs::write(path, bytes).await
}

/// Remove a stored upload; a file that is already gone is not an error.
pub async fn remove_upload(path: &Path) -> std::io::Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e),
    }
}

async fn ensure_dir(path: &Path) -> std::io::Result<()> {
    if !fs::try_exists(path).await? {
        fs::create_dir_all(path).await?;
    }
    Ok(())
}
