//! Frame captions and their subtitle rendering.

use std::fmt::Write as _;
use std::path::Path;

use regex::Regex;

use crate::error::Result;
use crate::pipeline::config::VideoConfig;

use super::manifest::FrameManifest;

/// Builds a caption from a frame's file stem.
///
/// Without a rewrite the caption is the stem itself. With one, the first
/// match of the pattern is replaced (capture groups as `$1`, `${name}`).
#[derive(Clone, Debug, Default)]
pub struct Captioner {
    rewrite: Option<(Regex, String)>,
}

impl Captioner {
    pub fn plain() -> Self {
        Self::default()
    }

    pub fn with_rewrite(pattern: &str, replacement: &str) -> Result<Self> {
        let rewrite = crate::pipeline::config::CaptionRewrite {
            pattern: pattern.to_string(),
            replacement: replacement.to_string(),
        };
        Ok(Self {
            rewrite: Some((rewrite.compile()?, rewrite.replacement)),
        })
    }

    pub fn from_config(config: &VideoConfig) -> Result<Self> {
        match &config.caption_rewrite {
            Some(r) => Self::with_rewrite(&r.pattern, &r.replacement),
            None => Ok(Self::plain()),
        }
    }

    pub fn caption(&self, path: &Path) -> String {
        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        match &self.rewrite {
            Some((re, replacement)) => re.replace(&stem, replacement.as_str()).into_owned(),
            None => stem,
        }
    }
}

/// SubRip document showing each manifest caption for one frame period.
pub fn srt_document(manifest: &FrameManifest, fps: u32) -> String {
    let fps = fps.max(1) as u64;
    let mut out = String::new();
    for (i, entry) in manifest.iter().enumerate() {
        let start = i as u64 * 1000 / fps;
        let end = (i as u64 + 1) * 1000 / fps;
        // Writing to a String cannot fail.
        let _ = write!(
            out,
            "{}\n{} --> {}\n{}\n\n",
            i + 1,
            srt_timestamp(start),
            srt_timestamp(end),
            entry.caption
        );
    }
    out
}

/// `HH:MM:SS,mmm` for a millisecond offset.
fn srt_timestamp(ms: u64) -> String {
    format!(
        "{:02}:{:02}:{:02},{:03}",
        ms / 3_600_000,
        ms / 60_000 % 60,
        ms / 1000 % 60,
        ms % 1000
    )
}
