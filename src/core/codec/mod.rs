//! Audio codec engine.
//!
//! Pure conversions between the telephony leg's narrowband μ-law audio and the
//! linear PCM expected by realtime AI providers:
//!
//! - `mulaw` - G.711 μ-law expansion and compression
//! - `resample` - integer-ratio sample rate conversion
//! - `frame` - [`MediaFrame`] / [`AudioFormat`] and the combined `transcode` path
//!
//! Nothing here holds state; both bridge loops call into it directly.

mod frame;
pub mod mulaw;
mod resample;

use thiserror::Error;

pub use frame::{AudioFormat, Encoding, MediaFrame, pcm16_from_le_bytes, pcm16_to_le_bytes};
pub use resample::{downsample, resample, upsample};

/// Errors produced while decoding or converting a media frame.
///
/// All of them are per-frame: the caller drops the frame and keeps going.
#[derive(Debug, Error)]
pub enum CodecError {
    #[error("Invalid base64 audio payload: {0}")]
    InvalidBase64(#[from] base64::DecodeError),

    #[error("PCM16 payload has odd length {0}")]
    OddPcmLength(usize),

    #[error("Unsupported resampling ratio {source_rate} Hz -> {target_rate} Hz")]
    UnsupportedRatio { source_rate: u32, target_rate: u32 },

    #[error("Channel count mismatch: {source_channels} -> {target_channels}")]
    ChannelMismatch {
        source_channels: u16,
        target_channels: u16,
    },
}
