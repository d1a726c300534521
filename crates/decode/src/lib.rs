use std::io::Cursor;
use std::path::Path;

use board_transport::{MediaSource, mime_essence};
use symphonia::core::codecs::DecoderOptions;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Content type assigned to files whose extension we do not recognise.
pub const UNKNOWN_MIME: &str = "application/octet-stream";

const EXTENSION_MIME: &[(&str, &str)] = &[
    ("mp3", "audio/mpeg"),
    ("wav", "audio/wav"),
    ("ogg", "audio/ogg"),
    ("oga", "audio/ogg"),
    ("opus", "audio/ogg"),
    ("flac", "audio/flac"),
    ("m4a", "audio/mp4"),
    ("aac", "audio/aac"),
    ("webm", "audio/webm"),
];

/// Guess the content type of a local file from its extension.
pub fn mime_from_path(path: &Path) -> &'static str {
    let Some(ext) = path.extension().and_then(|e| e.to_str()) else {
        return UNKNOWN_MIME;
    };
    let ext = ext.to_ascii_lowercase();
    EXTENSION_MIME
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(UNKNOWN_MIME)
}

/// Container hint for the prober, derived from a declared content type.
pub fn extension_for_mime(mime: &str) -> Option<&'static str> {
    match mime_essence(mime).as_str() {
        "audio/mpeg" | "audio/mp3" => Some("mp3"),
        "audio/wav" | "audio/wave" | "audio/x-wav" | "audio/vnd.wave" => Some("wav"),
        "audio/ogg" | "audio/vorbis" | "audio/opus" => Some("ogg"),
        "audio/flac" | "audio/x-flac" => Some("flac"),
        "audio/mp4" | "audio/x-m4a" => Some("m4a"),
        "audio/aac" => Some("aac"),
        "audio/webm" => Some("webm"),
        _ => None,
    }
}

/// What the engine needs to know about a payload before playing it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaInfo {
    pub duration_secs: f64,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Probe an in-memory payload and work out its duration.
///
/// Containers that carry a frame count in their header are answered from the
/// header alone; anything else is decoded packet by packet to count frames.
pub fn probe(source: &MediaSource) -> anyhow::Result<MediaInfo> {
    let cursor = Cursor::new(source.bytes.clone());
    let mss = MediaSourceStream::new(Box::new(cursor), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension_for_mime(&source.mime) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let mut format = probed.format;

    let track = format
        .default_track()
        .ok_or_else(|| anyhow::anyhow!("no default track"))?;

    let sample_rate = track
        .codec_params
        .sample_rate
        .ok_or_else(|| anyhow::anyhow!("unknown sample rate"))?;
    let channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(2) as u16;

    if let Some(frames) = track.codec_params.n_frames {
        return Ok(MediaInfo {
            duration_secs: frames as f64 / sample_rate as f64,
            sample_rate,
            channels,
        });
    }

    let track_id = track.id;
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut frames = 0u64;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(symphonia::core::errors::Error::IoError(e))
                if e.kind() == std::io::ErrorKind::UnexpectedEof =>
            {
                break;
            }
            Err(e) => return Err(e.into()),
        };

        if packet.track_id() != track_id {
            continue;
        }

        let decoded = decoder.decode(&packet)?;
        frames += decoded.frames() as u64;
    }

    Ok(MediaInfo {
        duration_secs: frames as f64 / sample_rate as f64,
        sample_rate,
        channels,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn wav_bytes(sample_rate: u32, channels: u16, frames: usize) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).expect("wav writer");
            for i in 0..frames * channels as usize {
                writer.write_sample((i % 64) as i16 * 100).expect("write sample");
            }
            writer.finalize().expect("finalize");
        }
        cursor.into_inner()
    }

    #[test]
    fn test_probe_wav_duration() {
        let source = MediaSource::new(wav_bytes(8000, 1, 16000), "audio/wav");
        let info = probe(&source).expect("probe");

        assert_eq!(info.sample_rate, 8000);
        assert_eq!(info.channels, 1);
        assert!((info.duration_secs - 2.0).abs() < 0.01);
    }

    #[test]
    fn test_probe_stereo_without_hint() {
        let source = MediaSource::new(wav_bytes(44100, 2, 4410), "audio/x-unknown");
        let info = probe(&source).expect("probe");

        assert_eq!(info.channels, 2);
        assert!((info.duration_secs - 0.1).abs() < 0.01);
    }

    #[test]
    fn test_probe_garbage_fails() {
        let source = MediaSource::new(b"definitely not audio".to_vec(), "audio/mpeg");
        assert!(probe(&source).is_err());
    }

    #[test]
    fn test_mime_from_path() {
        assert_eq!(mime_from_path(&PathBuf::from("airhorn.mp3")), "audio/mpeg");
        assert_eq!(mime_from_path(&PathBuf::from("dir/Applause.WAV")), "audio/wav");
        assert_eq!(mime_from_path(&PathBuf::from("notes.txt")), UNKNOWN_MIME);
        assert_eq!(mime_from_path(&PathBuf::from("no_extension")), UNKNOWN_MIME);
    }

    #[test]
    fn test_extension_for_mime() {
        assert_eq!(extension_for_mime("audio/mpeg"), Some("mp3"));
        assert_eq!(extension_for_mime("audio/x-wav"), Some("wav"));
        assert_eq!(extension_for_mime("Audio/OGG; codecs=opus"), Some("ogg"));
        assert_eq!(extension_for_mime("video/mp4"), None);
    }
}
