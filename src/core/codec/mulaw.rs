//! G.711 μ-law companding.
//!
//! Each 8-bit code word carries a sign bit, a 3-bit exponent (segment) and a
//! 4-bit mantissa. Code words are stored complemented on the wire, so the
//! decoder inverts the byte before decomposing it and the encoder inverts the
//! assembled code word.

/// Bias added to the magnitude before segment search.
const BIAS: i32 = 0x84;

/// Largest magnitude that survives biasing without overflowing segment 7.
const CLIP: i32 = 32635;

/// Precomputed expansion of every code word.
static DECODE_TABLE: [i16; 256] = build_decode_table();

const fn build_decode_table() -> [i16; 256] {
    let mut table = [0i16; 256];
    let mut code = 0;
    while code < 256 {
        table[code] = expand(code as u8);
        code += 1;
    }
    table
}

const fn expand(code: u8) -> i16 {
    let code = !code;
    let sign = code & 0x80;
    let exponent = ((code >> 4) & 0x07) as i32;
    let mantissa = (code & 0x0F) as i32;
    let magnitude = (((mantissa << 3) + BIAS) << exponent) - BIAS;

    if sign != 0 {
        -magnitude as i16
    } else {
        magnitude as i16
    }
}

/// Expand a single μ-law code word into a linear 16-bit sample.
#[inline]
pub fn decode_sample(code: u8) -> i16 {
    DECODE_TABLE[code as usize]
}

/// Compress a single linear 16-bit sample into a μ-law code word.
pub fn encode_sample(sample: i16) -> u8 {
    let mut magnitude = sample as i32;
    let sign = if magnitude < 0 {
        magnitude = -magnitude;
        0x80
    } else {
        0x00
    };

    if magnitude > CLIP {
        magnitude = CLIP;
    }
    magnitude += BIAS;

    let mut exponent = 7;
    let mut mask = 0x4000;
    while exponent > 0 && magnitude & mask == 0 {
        exponent -= 1;
        mask >>= 1;
    }

    let mantissa = (magnitude >> (exponent + 3)) & 0x0F;
    !((sign | (exponent << 4) | mantissa) as u8)
}

/// Expand a buffer of μ-law bytes into PCM16 samples.
pub fn decode(codes: &[u8]) -> Vec<i16> {
    codes.iter().map(|&code| decode_sample(code)).collect()
}

/// Compress PCM16 samples into μ-law bytes.
pub fn encode(samples: &[i16]) -> Vec<u8> {
    samples.iter().map(|&sample| encode_sample(sample)).collect()
}

/// Width of the quantization step that `code` falls into.
pub fn step_size(code: u8) -> i32 {
    let exponent = ((!code >> 4) & 0x07) as i32;
    8 << exponent
}
