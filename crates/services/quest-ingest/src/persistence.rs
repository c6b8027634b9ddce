//! Persistence sink for accepted records
//!
//! When enabled, every accepted record is written to a stream-specific
//! subdirectory, one file per record:
//!
//! ```text
//! <data_dir>/
//! ├── camera/camera_frame_000001_2025-01-01T12-00-00.000000Z.jpg
//! ├── audio/audio_frame_000001_2025-01-01T12-00-00.000000Z.wav
//! └── text/text_message_msg_000001_2025-01-01T12-00-00.000000Z.json
//! ```
//!
//! Sinks return a `Result`; the caller logs failures and never surfaces them
//! to the client.

use std::fs;
use std::path::{Path, PathBuf};

use crate::error::PersistenceError;
use crate::model::{AudioFrame, CameraFrame, PixelFormat, TextMessage};

/// Durable writer for accepted records
///
/// Writers receive a read-only copy of the record and do not retain it.
pub trait PersistenceSink: Send + Sync {
    fn write_camera(&self, frame: &CameraFrame) -> Result<PathBuf, PersistenceError>;

    fn write_audio(&self, frame: &AudioFrame) -> Result<PathBuf, PersistenceError>;

    fn write_text(&self, message: &TextMessage) -> Result<PathBuf, PersistenceError>;
}

/// Writes records as files under a root directory
#[derive(Debug, Clone)]
pub struct FileSink {
    root: PathBuf,
    camera_dir: PathBuf,
    audio_dir: PathBuf,
    text_dir: PathBuf,
}

impl FileSink {
    /// Create the sink and its per-stream directories
    pub fn create(root: impl Into<PathBuf>) -> Result<Self, PersistenceError> {
        let root = root.into();
        let sink = Self {
            camera_dir: root.join("camera"),
            audio_dir: root.join("audio"),
            text_dir: root.join("text"),
            root,
        };

        for dir in [&sink.camera_dir, &sink.audio_dir, &sink.text_dir] {
            fs::create_dir_all(dir).map_err(|source| PersistenceError::Io {
                path: dir.clone(),
                source,
            })?;
        }

        Ok(sink)
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

impl PersistenceSink for FileSink {
    fn write_camera(&self, frame: &CameraFrame) -> Result<PathBuf, PersistenceError> {
        let expected = frame.expected_len();
        if frame.byte_len() != expected {
            return Err(PersistenceError::Encode(format!(
                "cannot encode {}x{} image from {} bytes (expected {})",
                frame.width,
                frame.height,
                frame.byte_len(),
                expected
            )));
        }

        let mut pixels = frame.data.to_vec();
        if frame.format != PixelFormat::Rgb {
            // Non-RGB 3-channel layouts are treated as BGR
            for px in pixels.chunks_exact_mut(3) {
                px.swap(0, 2);
            }
        }

        let image = image::RgbImage::from_raw(frame.width, frame.height, pixels)
            .ok_or_else(|| PersistenceError::Encode("pixel buffer too small".to_string()))?;

        let path = self.camera_dir.join(format!(
            "camera_frame_{:06}_{}.jpg",
            frame.frame_id,
            filename_timestamp(&frame.timestamp)
        ));
        image
            .save_with_format(&path, image::ImageFormat::Jpeg)
            .map_err(|e| PersistenceError::Encode(e.to_string()))?;

        Ok(path)
    }

    fn write_audio(&self, frame: &AudioFrame) -> Result<PathBuf, PersistenceError> {
        let path = self.audio_dir.join(format!(
            "audio_frame_{:06}_{}.wav",
            frame.frame_id,
            filename_timestamp(&frame.timestamp)
        ));

        // Payload is assumed to be 16-bit little-endian PCM; only whole
        // frames (one sample per channel) can be written
        let frame_bytes = usize::from(frame.channels.max(1)) * 2;
        let whole = frame.data.len() - frame.data.len() % frame_bytes;
        if whole != frame.data.len() {
            tracing::warn!(
                frame_id = frame.frame_id,
                channels = frame.channels,
                dropped_bytes = frame.data.len() - whole,
                "Audio payload is not a whole number of frames, truncating"
            );
        }

        let spec = hound::WavSpec {
            channels: frame.channels,
            sample_rate: frame.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        write_pcm16(&path, spec, &frame.data[..whole])?;

        Ok(path)
    }

    fn write_text(&self, message: &TextMessage) -> Result<PathBuf, PersistenceError> {
        let path = self.text_dir.join(format!(
            "text_message_{}_{}.json",
            filename_component(&message.message_id),
            filename_timestamp(&message.timestamp)
        ));

        let json = serde_json::to_vec_pretty(message)
            .map_err(|e| PersistenceError::Encode(e.to_string()))?;
        fs::write(&path, json).map_err(|source| PersistenceError::Io {
            path: path.clone(),
            source,
        })?;

        Ok(path)
    }
}

/// Write 16-bit PCM as a WAV file, removing the file if any step fails
fn write_pcm16(path: &Path, spec: hound::WavSpec, pcm: &[u8]) -> Result<(), PersistenceError> {
    let write = || -> Result<(), hound::Error> {
        let mut writer = hound::WavWriter::create(path, spec)?;
        for sample in pcm.chunks_exact(2) {
            writer.write_sample(i16::from_le_bytes([sample[0], sample[1]]))?;
        }
        writer.finalize()
    };

    write().map_err(|e| {
        // A half-written file has a broken header
        let _ = fs::remove_file(path);
        PersistenceError::from(e)
    })
}

/// Timestamp made safe for filenames (`:` becomes `-`)
fn filename_timestamp(timestamp: &str) -> String {
    filename_component(timestamp)
}

fn filename_component(value: &str) -> String {
    value
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.' | '+') {
                c
            } else {
                '-'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{AudioFormat, MessageStatus};
    use bytes::Bytes;

    fn camera(data: Vec<u8>, width: u32, height: u32) -> CameraFrame {
        CameraFrame {
            timestamp: "2025-01-01T12:00:00.000000Z".to_string(),
            width,
            height,
            format: PixelFormat::Rgb,
            data: Bytes::from(data),
            frame_id: 1,
        }
    }

    #[test]
    fn test_create_makes_stream_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::create(dir.path().join("data")).unwrap();

        assert!(sink.root().join("camera").is_dir());
        assert!(sink.root().join("audio").is_dir());
        assert!(sink.root().join("text").is_dir());
    }

    #[test]
    fn test_filename_timestamp() {
        assert_eq!(
            filename_timestamp("2025-01-01T12:00:00.5+00:00"),
            "2025-01-01T12-00-00.5+00-00"
        );
        assert_eq!(filename_component("../etc/passwd"), "..-etc-passwd");
    }

    #[test]
    fn test_write_camera_jpeg() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::create(dir.path()).unwrap();

        let path = sink.write_camera(&camera(vec![200; 4 * 2 * 3], 4, 2)).unwrap();
        assert!(path.exists());
        let name = path.file_name().unwrap().to_string_lossy().to_string();
        assert_eq!(name, "camera_frame_000001_2025-01-01T12-00-00.000000Z.jpg");

        let decoded = image::open(&path).unwrap();
        assert_eq!(decoded.width(), 4);
        assert_eq!(decoded.height(), 2);
    }

    #[test]
    fn test_write_camera_size_mismatch_fails() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::create(dir.path()).unwrap();

        let result = sink.write_camera(&camera(vec![0; 5], 4, 2));
        assert!(matches!(result, Err(PersistenceError::Encode(_))));
    }

    #[test]
    fn test_write_audio_wav() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::create(dir.path()).unwrap();

        let samples: Vec<u8> = [0i16, 1000, -1000, i16::MAX]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let frame = AudioFrame {
            timestamp: "2025-01-01T12:00:00Z".to_string(),
            sample_rate: 16000,
            channels: 1,
            format: AudioFormat::Pcm,
            data: Bytes::from(samples),
            duration_ms: 0.25,
            frame_id: 3,
        };

        let path = sink.write_audio(&frame).unwrap();
        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 16000);
        assert_eq!(reader.spec().channels, 1);
        assert_eq!(reader.spec().bits_per_sample, 16);
        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, vec![0, 1000, -1000, i16::MAX]);
    }

    fn audio(channels: u16, data: Vec<u8>) -> AudioFrame {
        AudioFrame {
            timestamp: "2025-01-01T12:00:00Z".to_string(),
            sample_rate: 16000,
            channels,
            format: AudioFormat::Pcm,
            data: Bytes::from(data),
            duration_ms: 0.1,
            frame_id: 9,
        }
    }

    #[test]
    fn test_write_audio_partial_stereo_frame_is_truncated() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::create(dir.path()).unwrap();

        // Three samples with two channels: one whole frame plus a stray sample
        let samples: Vec<u8> = [100i16, -100, 7]
            .iter()
            .flat_map(|s| s.to_le_bytes())
            .collect();
        let path = sink.write_audio(&audio(2, samples)).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().channels, 2);
        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, vec![100, -100]);
    }

    #[test]
    fn test_write_audio_odd_byte_count() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::create(dir.path()).unwrap();

        let path = sink.write_audio(&audio(1, vec![1, 0, 2, 0, 3])).unwrap();
        let mut reader = hound::WavReader::open(&path).unwrap();
        let read: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(read, vec![1, 2]);
    }

    #[test]
    fn test_write_pcm16_failure_leaves_no_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.wav");
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 16000,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        // Three samples cannot form whole stereo frames, so finalize fails
        let result = write_pcm16(&path, spec, &[1, 0, 2, 0, 3, 0]);
        assert!(result.is_err());
        assert!(!path.exists());
    }

    #[test]
    fn test_write_text_json() {
        let dir = tempfile::tempdir().unwrap();
        let sink = FileSink::create(dir.path()).unwrap();

        let message = TextMessage {
            timestamp: "2025-01-01T12:00:00Z".to_string(),
            message_id: "msg_000004".to_string(),
            content: "héllo".to_string(),
            status: MessageStatus::Sent,
        };

        let path = sink.write_text(&message).unwrap();
        assert!(path
            .to_string_lossy()
            .ends_with("text_message_msg_000004_2025-01-01T12-00-00Z.json"));

        let stored: TextMessage = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(stored, message);
    }
}
