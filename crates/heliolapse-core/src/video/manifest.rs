use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::pipeline::AlignmentResult;

use super::caption::Captioner;

/// One movie frame: an aligned file and the text shown over it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub path: PathBuf,
    pub caption: String,
}

/// Ordered list of frames handed to video assembly.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameManifest {
    pub frames: Vec<ManifestEntry>,
}

impl FrameManifest {
    /// Manifest of the successful results, in job order.
    ///
    /// Captions are derived from the input file names.
    pub fn from_results(results: &[AlignmentResult], captioner: &Captioner) -> Self {
        let mut succeeded: Vec<_> = results
            .iter()
            .filter_map(|r| match r {
                AlignmentResult::Succeeded(s) => Some(s),
                AlignmentResult::Failed(_) => None,
            })
            .collect();
        succeeded.sort_by_key(|s| s.index);

        Self {
            frames: succeeded
                .into_iter()
                .map(|s| ManifestEntry {
                    path: s.output.clone(),
                    caption: captioner.caption(&s.input),
                })
                .collect(),
        }
    }

    /// Manifest of already aligned files, kept in the given order.
    pub fn from_paths(paths: &[PathBuf], captioner: &Captioner) -> Self {
        Self {
            frames: paths
                .iter()
                .map(|p| ManifestEntry {
                    path: p.clone(),
                    caption: captioner.caption(p),
                })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ManifestEntry> {
        self.frames.iter()
    }

    pub fn write_json(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn read_json(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&contents)?)
    }
}
