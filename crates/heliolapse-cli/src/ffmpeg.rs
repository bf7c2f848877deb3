use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};

use byteorder::{LittleEndian, WriteBytesExt};
use heliolapse_core::error::{HelioError, Result};
use heliolapse_core::frame::QuantizedFrame;
use heliolapse_core::io::{FileCodec, FrameCodec, FrameFormat};
use heliolapse_core::pipeline::config::VideoConfig;
use heliolapse_core::video::{srt_document, FrameManifest, VideoAssembler};
use tracing::{debug, info};

/// Encodes a manifest with an external `ffmpeg` process.
///
/// Frames are streamed as raw little-endian 16-bit gray over stdin; captions
/// are written to a SubRip file next to the movie and burned in with the
/// `subtitles` filter.
pub struct FfmpegAssembler {
    program: PathBuf,
}

impl Default for FfmpegAssembler {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ffmpeg"),
        }
    }
}

impl VideoAssembler for FfmpegAssembler {
    fn assemble(
        &self,
        manifest: &FrameManifest,
        output: &Path,
        config: &VideoConfig,
    ) -> Result<()> {
        let first = manifest
            .iter()
            .next()
            .ok_or_else(|| HelioError::Video("no frames to encode".into()))?;
        let (width, height) = {
            let frame = read_frame(&first.path)?;
            (frame.width(), frame.height())
        };

        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let subtitles = if config.caption {
            let path = output.with_extension("srt");
            std::fs::write(&path, srt_document(manifest, config.fps))?;
            Some(path)
        } else {
            None
        };

        let mut cmd = Command::new(&self.program);
        cmd.args(["-y", "-loglevel", "error"])
            .args(["-f", "rawvideo", "-pix_fmt", "gray16le"])
            .args(["-s", &format!("{width}x{height}")])
            .args(["-framerate", &config.fps.to_string()])
            .args(["-i", "-"]);
        if let Some(srt) = &subtitles {
            cmd.args(["-vf", &subtitles_filter(srt)]);
        }
        cmd.args(["-c:v", "libx264", "-crf", &config.crf.to_string()])
            .args(["-pix_fmt", "yuv420p"])
            .arg(output)
            .stdin(Stdio::piped());
        debug!(command = ?cmd, "Starting encoder");

        let mut child = cmd.spawn().map_err(|e| {
            HelioError::Video(format!("cannot start {}: {e}", self.program.display()))
        })?;

        if let Err(e) = stream_frames(&mut child, manifest, (width, height)) {
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }

        let status = child.wait()?;
        if !status.success() {
            return Err(HelioError::Video(format!(
                "{} exited with {status}",
                self.program.display()
            )));
        }

        info!(
            movie = %output.display(),
            frames = manifest.len(),
            fps = config.fps,
            "Movie written"
        );
        Ok(())
    }
}

fn stream_frames(
    child: &mut Child,
    manifest: &FrameManifest,
    (width, height): (usize, usize),
) -> Result<()> {
    let stdin = child
        .stdin
        .take()
        .ok_or_else(|| HelioError::Video("encoder stdin unavailable".into()))?;
    let mut writer = BufWriter::new(stdin);

    for entry in manifest.iter() {
        let frame = read_frame(&entry.path)?;
        if (frame.width(), frame.height()) != (width, height) {
            return Err(HelioError::ShapeMismatch {
                expected_w: width,
                expected_h: height,
                actual_w: frame.width(),
                actual_h: frame.height(),
            });
        }
        for &v in frame.data.iter() {
            writer.write_u16::<LittleEndian>(v)?;
        }
    }
    writer.flush()?;
    Ok(())
}

fn read_frame(path: &Path) -> Result<QuantizedFrame> {
    let format = FrameFormat::from_path(path)
        .ok_or_else(|| HelioError::UnsupportedFormat(path.display().to_string()))?;
    Ok(FileCodec.decode(path, format)?.to_quantized())
}

/// `subtitles=` filter argument with the path quoted for ffmpeg's parser.
fn subtitles_filter(path: &Path) -> String {
    let escaped = path
        .to_string_lossy()
        .replace('\\', "/")
        .replace(':', "\\:")
        .replace('\'', "\\'");
    format!("subtitles='{escaped}'")
}
