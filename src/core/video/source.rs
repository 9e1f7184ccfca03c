//! 视频帧来源：ffmpeg 管道解码 + 内存回放

use super::error::VideoError;
use super::frame::Frame;
use log::{debug, info};
use serde::Deserialize;
use std::collections::VecDeque;
use std::io::{BufReader, ErrorKind, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, ChildStdout, Command, Stdio};

/// Seekable, forward-reading frame source.
///
/// `read` is tri-state: `Ok(Some)` for a frame, `Ok(None)` at end of stream,
/// `Err` for a real decoder failure.
pub trait FrameSource {
    fn fps(&self) -> f64;

    /// Position the source so the next `read` yields frame `index`.
    fn seek(&mut self, index: u64) -> Result<(), VideoError>;

    fn read(&mut self) -> Result<Option<Frame>, VideoError>;

    /// Index of the frame the next `read` will yield.
    fn position(&self) -> u64;
}

/// In-memory frame list with a fixed frame rate.
pub struct VecFrameSource {
    frames: Vec<Frame>,
    fps: f64,
    cursor: u64,
    reads: u64,
}

impl VecFrameSource {
    pub fn new(frames: Vec<Frame>, fps: f64) -> Self {
        Self {
            frames,
            fps,
            cursor: 0,
            reads: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Number of successful reads so far.
    pub fn reads(&self) -> u64 {
        self.reads
    }
}

impl FrameSource for VecFrameSource {
    fn fps(&self) -> f64 {
        self.fps
    }

    fn seek(&mut self, index: u64) -> Result<(), VideoError> {
        self.cursor = index;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Frame>, VideoError> {
        let frame = self.frames.get(self.cursor as usize).cloned();
        if frame.is_some() {
            self.cursor += 1;
            self.reads += 1;
        }
        Ok(frame)
    }

    fn position(&self) -> u64 {
        self.cursor
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VideoInfo {
    pub width: u32,
    pub height: u32,
    pub fps: f64,
}

#[derive(Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
    r_frame_rate: Option<String>,
}

/// Parse an ffprobe rational such as `30000/1001` or `25`.
fn parse_frame_rate(text: &str) -> Option<f64> {
    let (num, den) = match text.split_once('/') {
        Some((n, d)) => (n.trim().parse::<f64>().ok()?, d.trim().parse::<f64>().ok()?),
        None => (text.trim().parse::<f64>().ok()?, 1.0),
    };
    if den == 0.0 || num <= 0.0 {
        return None;
    }
    Some(num / den)
}

fn probe(path: &Path) -> Result<VideoInfo, VideoError> {
    let output = Command::new("ffprobe")
        .args(["-v", "error", "-select_streams", "v:0"])
        .args(["-show_entries", "stream=width,height,r_frame_rate"])
        .args(["-of", "json"])
        .arg(path)
        .output()
        .map_err(|source| VideoError::Tool {
            tool: "ffprobe",
            source,
        })?;

    let open_error = |reason: String| VideoError::Open {
        path: path.to_path_buf(),
        reason,
    };

    if !output.status.success() {
        return Err(open_error(
            String::from_utf8_lossy(&output.stderr).trim().to_string(),
        ));
    }

    let parsed: ProbeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| open_error(format!("unreadable ffprobe output: {}", e)))?;
    let stream = parsed
        .streams
        .into_iter()
        .next()
        .ok_or_else(|| open_error("no video stream".into()))?;

    let fps = stream
        .r_frame_rate
        .as_deref()
        .and_then(parse_frame_rate)
        .ok_or_else(|| open_error("unknown frame rate".into()))?;

    match (stream.width, stream.height) {
        (Some(width), Some(height)) if width > 0 && height > 0 => {
            Ok(VideoInfo { width, height, fps })
        }
        _ => Err(open_error("unknown frame size".into())),
    }
}

struct Decoder {
    child: Child,
    stdout: BufReader<ChildStdout>,
}

impl Decoder {
    fn spawn(path: &Path, start_seconds: f64) -> Result<Self, VideoError> {
        let mut cmd = Command::new("ffmpeg");
        cmd.args(["-v", "error", "-nostdin"]);
        if start_seconds > 0.0 {
            cmd.arg("-ss").arg(format!("{:.6}", start_seconds));
        }
        cmd.arg("-i")
            .arg(path)
            .args(["-an", "-f", "rawvideo", "-pix_fmt", "rgb24", "-"])
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null());

        let mut child = cmd.spawn().map_err(|source| VideoError::Tool {
            tool: "ffmpeg",
            source,
        })?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| VideoError::Decode("ffmpeg stdout not captured".into()))?;

        Ok(Self {
            child,
            stdout: BufReader::with_capacity(1 << 20, stdout),
        })
    }

    /// Read one raw frame; `None` on a clean end of stream.
    fn next_raw(&mut self, frame_bytes: usize) -> Result<Option<Vec<u8>>, VideoError> {
        let mut buf = vec![0u8; frame_bytes];
        let mut filled = 0;
        while filled < frame_bytes {
            match self.stdout.read(&mut buf[filled..]) {
                Ok(0) => break,
                Ok(n) => filled += n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(e.into()),
            }
        }

        if filled == frame_bytes {
            return Ok(Some(buf));
        }

        let status = self.child.wait()?;
        if filled == 0 && status.success() {
            Ok(None)
        } else if filled == 0 {
            Err(VideoError::Decode(format!("ffmpeg exited with {}", status)))
        } else {
            Err(VideoError::Decode(format!(
                "truncated frame: {} of {} bytes",
                filled, frame_bytes
            )))
        }
    }
}

impl Drop for Decoder {
    fn drop(&mut self) {
        let _ = self.child.kill();
        let _ = self.child.wait();
    }
}

/// ffmpeg-backed frame source.
///
/// Recently decoded frames are kept in a ring buffer so that the cursor's
/// one-stride back-off is served from memory; short forward seeks decode
/// through, anything else restarts the pipe at the target time.
pub struct FfmpegSource {
    path: PathBuf,
    info: VideoInfo,
    decoder: Option<Decoder>,
    /// Frames `[decoded - buffer.len(), decoded)`.
    buffer: VecDeque<Frame>,
    buffer_capacity: usize,
    /// Index of the next frame the pipe yields.
    decoded: u64,
    cursor: u64,
    max_skip: u64,
    exhausted: bool,
}

impl FfmpegSource {
    pub fn open(path: &Path) -> Result<Self, VideoError> {
        if !path.is_file() {
            return Err(VideoError::Open {
                path: path.to_path_buf(),
                reason: "no such file".into(),
            });
        }

        let info = probe(path)?;
        let stride = info.fps.round().max(1.0) as usize;
        info!(
            "🎬 Opened {:?}: {}x{} @ {:.3} fps",
            path, info.width, info.height, info.fps
        );

        Ok(Self {
            path: path.to_path_buf(),
            info,
            decoder: None,
            buffer: VecDeque::with_capacity(stride * 2 + 4),
            buffer_capacity: stride * 2 + 4,
            decoded: 0,
            cursor: 0,
            max_skip: stride as u64 * 4,
            exhausted: false,
        })
    }

    pub fn info(&self) -> VideoInfo {
        self.info
    }

    fn frame_bytes(&self) -> usize {
        (self.info.width * self.info.height * 3) as usize
    }

    fn restart_at(&mut self, index: u64) -> Result<(), VideoError> {
        debug!("Restarting decoder at frame {}", index);
        self.decoder = None;
        self.buffer.clear();
        self.exhausted = false;
        self.decoded = index;
        self.decoder = Some(Decoder::spawn(&self.path, index as f64 / self.info.fps)?);
        Ok(())
    }

    fn decode_next(&mut self) -> Result<bool, VideoError> {
        if self.exhausted {
            return Ok(false);
        }
        if self.decoder.is_none() {
            self.restart_at(self.decoded)?;
        }
        let frame_bytes = self.frame_bytes();
        let raw = match self.decoder.as_mut() {
            Some(decoder) => decoder.next_raw(frame_bytes)?,
            None => None,
        };
        let Some(data) = raw else {
            self.exhausted = true;
            self.decoder = None;
            return Ok(false);
        };

        let timestamp_ms = (self.decoded as f64 * 1000.0 / self.info.fps) as u64;
        let frame = Frame::new(
            self.info.width,
            self.info.height,
            data,
            timestamp_ms,
            self.decoded,
        );
        self.buffer.push_back(frame);
        if self.buffer.len() > self.buffer_capacity {
            self.buffer.pop_front();
        }
        self.decoded += 1;
        Ok(true)
    }

    fn buffered(&self, index: u64) -> Option<&Frame> {
        let first = self.decoded - self.buffer.len() as u64;
        if index >= first && index < self.decoded {
            self.buffer.get((index - first) as usize)
        } else {
            None
        }
    }
}

impl FrameSource for FfmpegSource {
    fn fps(&self) -> f64 {
        self.info.fps
    }

    fn seek(&mut self, index: u64) -> Result<(), VideoError> {
        self.cursor = index;
        Ok(())
    }

    fn read(&mut self) -> Result<Option<Frame>, VideoError> {
        let target = self.cursor;

        if self.buffered(target).is_none() {
            let behind = target < self.decoded;
            let too_far = target > self.decoded + self.max_skip;
            if behind || too_far || (self.exhausted && target > self.decoded) {
                if self.exhausted && !behind {
                    return Ok(None);
                }
                self.restart_at(target)?;
            }
            while self.decoded <= target {
                if !self.decode_next()? {
                    return Ok(None);
                }
            }
        }

        let frame = self.buffered(target).cloned();
        if frame.is_some() {
            self.cursor += 1;
        }
        Ok(frame)
    }

    fn position(&self) -> u64 {
        self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(n: u64) -> Frame {
        Frame::new(2, 2, vec![n as u8; 12], n * 100, n)
    }

    #[test]
    fn test_vec_source_read_and_seek() {
        let mut source = VecFrameSource::new((0..5).map(frame).collect(), 10.0);

        assert_eq!(source.read().unwrap().map(|f| f.frame_number), Some(0));
        source.seek(3).unwrap();
        assert_eq!(source.position(), 3);
        assert_eq!(source.read().unwrap().map(|f| f.frame_number), Some(3));
        assert_eq!(source.read().unwrap().map(|f| f.frame_number), Some(4));
        assert!(source.read().unwrap().is_none());
        assert_eq!(source.position(), 5);

        source.seek(1).unwrap();
        assert_eq!(source.read().unwrap().map(|f| f.frame_number), Some(1));
        // 读到流尾不计数
        assert_eq!(source.reads(), 4);
    }

    #[test]
    fn test_parse_frame_rate() {
        assert_eq!(parse_frame_rate("25"), Some(25.0));
        assert_eq!(parse_frame_rate("60/1"), Some(60.0));
        let ntsc = parse_frame_rate("30000/1001").unwrap();
        assert!((ntsc - 29.97).abs() < 0.01);
        assert_eq!(parse_frame_rate("0/0"), None);
        assert_eq!(parse_frame_rate("abc"), None);
    }

    #[test]
    fn test_open_missing_file_fails() {
        let result = FfmpegSource::open(Path::new("/definitely/not/here.mp4"));
        assert!(matches!(result, Err(VideoError::Open { .. })));
    }
}
