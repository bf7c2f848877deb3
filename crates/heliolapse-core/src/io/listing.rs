use std::path::{Path, PathBuf};

use crate::error::Result;

use super::FrameFormat;

/// Frames of `format` directly inside `dir`, sorted by file name.
pub fn list_frames(dir: &Path, format: FrameFormat) -> Result<Vec<PathBuf>> {
    let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && FrameFormat::from_path(p) == Some(format))
        .collect();
    frames.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(frames)
}

/// Frames of any supported format directly inside `dir`, sorted by file name.
pub fn list_all_frames(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut frames: Vec<PathBuf> = std::fs::read_dir(dir)?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| p.is_file() && FrameFormat::from_path(p).is_some())
        .collect();
    frames.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(frames)
}

/// Output path of an aligned frame: `<aligned_dir>/<input stem>.<extension>`.
pub fn aligned_output_path(aligned_dir: &Path, input: &Path, extension: &str) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "frame".to_string());
    aligned_dir.join(format!("{stem}.{extension}"))
}

/// Extension of `path`, lowercased; `fallback` when it has none.
pub fn extension_or(path: &Path, fallback: &str) -> String {
    path.extension()
        .map(|e| e.to_string_lossy().to_ascii_lowercase())
        .unwrap_or_else(|| fallback.to_string())
}
