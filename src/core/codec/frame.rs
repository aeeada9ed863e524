use base64::prelude::*;
use bytes::Bytes;

use super::{CodecError, mulaw, resample};

/// Sample encoding of a [`MediaFrame`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Encoding {
    /// 8-bit G.711 μ-law
    MuLaw,
    /// 16-bit signed little-endian linear PCM
    Pcm16,
}

/// Format metadata carried alongside raw audio bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioFormat {
    pub encoding: Encoding,
    pub sample_rate: u32,
    pub channels: u16,
}

impl AudioFormat {
    /// Narrowband telephony audio: μ-law, 8 kHz, mono.
    pub const TELEPHONY: AudioFormat = AudioFormat {
        encoding: Encoding::MuLaw,
        sample_rate: 8000,
        channels: 1,
    };

    /// Mono linear PCM at `sample_rate`.
    pub const fn pcm16(sample_rate: u32) -> Self {
        Self {
            encoding: Encoding::Pcm16,
            sample_rate,
            channels: 1,
        }
    }

    /// MIME type used to declare this format to remote peers.
    pub fn mime_type(&self) -> String {
        match self.encoding {
            Encoding::MuLaw => "audio/x-mulaw".to_string(),
            Encoding::Pcm16 => format!("audio/pcm;rate={}", self.sample_rate),
        }
    }

    /// Parse a `audio/pcm;rate=N` style MIME type.
    ///
    /// A PCM type without a rate parameter falls back to `default_rate`.
    pub fn from_mime_type(mime: &str, default_rate: u32) -> Option<Self> {
        let mut parts = mime.split(';').map(str::trim);
        let base = parts.next()?.to_ascii_lowercase();
        let rate = parts
            .filter_map(|p| p.strip_prefix("rate="))
            .find_map(|r| r.parse::<u32>().ok());

        match base.as_str() {
            "audio/pcm" | "audio/l16" => Some(Self::pcm16(rate.unwrap_or(default_rate))),
            "audio/x-mulaw" | "audio/mulaw" | "audio/pcmu" => Some(Self {
                encoding: Encoding::MuLaw,
                sample_rate: rate.unwrap_or(8000),
                channels: 1,
            }),
            _ => None,
        }
    }
}

/// A chunk of audio plus the format needed to interpret it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFrame {
    pub data: Bytes,
    pub format: AudioFormat,
}

impl MediaFrame {
    pub fn new(data: impl Into<Bytes>, format: AudioFormat) -> Self {
        Self {
            data: data.into(),
            format,
        }
    }

    /// Decode a base64 payload into a frame of the given format.
    pub fn from_base64(payload: &str, format: AudioFormat) -> Result<Self, CodecError> {
        let data = BASE64_STANDARD.decode(payload.trim())?;
        if format.encoding == Encoding::Pcm16 && data.len() % 2 != 0 {
            return Err(CodecError::OddPcmLength(data.len()));
        }
        Ok(Self::new(data, format))
    }

    pub fn to_base64(&self) -> String {
        BASE64_STANDARD.encode(&self.data)
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Linear samples regardless of the frame's encoding.
    pub fn to_pcm16(&self) -> Result<Vec<i16>, CodecError> {
        match self.format.encoding {
            Encoding::MuLaw => Ok(mulaw::decode(&self.data)),
            Encoding::Pcm16 => pcm16_from_le_bytes(&self.data),
        }
    }

    /// Convert this frame into `target`, decoding, resampling and re-encoding
    /// as needed. Frames already in `target` are returned unchanged.
    pub fn transcode(&self, target: AudioFormat) -> Result<MediaFrame, CodecError> {
        if self.format == target {
            return Ok(self.clone());
        }
        if self.format.channels != target.channels {
            return Err(CodecError::ChannelMismatch {
                source_channels: self.format.channels,
                target_channels: target.channels,
            });
        }

        let samples = self.to_pcm16()?;
        let samples = resample(&samples, self.format.sample_rate, target.sample_rate)?;
        let data = match target.encoding {
            Encoding::MuLaw => mulaw::encode(&samples),
            Encoding::Pcm16 => pcm16_to_le_bytes(&samples),
        };

        Ok(MediaFrame::new(data, target))
    }
}

/// Reinterpret little-endian bytes as PCM16 samples.
pub fn pcm16_from_le_bytes(bytes: &[u8]) -> Result<Vec<i16>, CodecError> {
    if bytes.len() % 2 != 0 {
        return Err(CodecError::OddPcmLength(bytes.len()));
    }
    Ok(bytes
        .chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect())
}

pub fn pcm16_to_le_bytes(samples: &[i16]) -> Vec<u8> {
    let mut bytes = Vec::with_capacity(samples.len() * 2);
    for sample in samples {
        bytes.extend_from_slice(&sample.to_le_bytes());
    }
    bytes
}
