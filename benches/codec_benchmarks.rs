//! Performance benchmarks for the audio path
//!
//! Run with: cargo bench
//! Or for specific benchmarks: cargo bench -- <filter>

use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use std::time::Duration;
use voice_bridge::core::codec::{AudioFormat, MediaFrame, mulaw};
use voice_bridge::core::telephony::{InboundEvent, OutboundEvent};

/// One 20 ms telephony frame worth of samples.
const FRAME_SAMPLES: usize = 160;

fn sine_samples(count: usize, rate: u32) -> Vec<i16> {
    (0..count)
        .map(|i| {
            let t = i as f32 / rate as f32;
            ((t * 440.0 * std::f32::consts::TAU).sin() * 12_000.0) as i16
        })
        .collect()
}

fn pcm16_frame(rate: u32) -> MediaFrame {
    let samples = sine_samples(FRAME_SAMPLES * (rate / 8000) as usize, rate);
    let data: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    MediaFrame::new(data, AudioFormat::pcm16(rate))
}

/// Benchmark mu-law sample conversion
fn bench_mulaw(c: &mut Criterion) {
    let mut group = c.benchmark_group("mulaw");
    group.measurement_time(Duration::from_secs(5));

    let samples = sine_samples(FRAME_SAMPLES, 8000);
    let codes = mulaw::encode(&samples);

    group.throughput(Throughput::Elements(FRAME_SAMPLES as u64));
    group.bench_function("encode_frame", |b| {
        b.iter(|| mulaw::encode(black_box(&samples)));
    });
    group.bench_function("decode_frame", |b| {
        b.iter(|| mulaw::decode(black_box(&codes)));
    });

    group.finish();
}

/// Benchmark conversions between the telephony format and provider formats
fn bench_transcode(c: &mut Criterion) {
    let mut group = c.benchmark_group("transcode");
    group.measurement_time(Duration::from_secs(5));

    let caller = MediaFrame::new(
        mulaw::encode(&sine_samples(FRAME_SAMPLES, 8000)),
        AudioFormat::TELEPHONY,
    );

    for rate in [8000u32, 16000, 24000] {
        group.bench_with_input(
            BenchmarkId::new("caller_to_pcm16", rate),
            &rate,
            |b, &rate| {
                let target = AudioFormat::pcm16(rate);
                b.iter(|| black_box(&caller).transcode(target));
            },
        );
    }

    for rate in [16000u32, 24000] {
        let model = pcm16_frame(rate);
        group.bench_with_input(
            BenchmarkId::new("model_to_telephony", rate),
            &model,
            |b, model| {
                b.iter(|| black_box(model).transcode(AudioFormat::TELEPHONY));
            },
        );
    }

    group.finish();
}

/// Benchmark telephony frame parsing and serialization
fn bench_telephony_frames(c: &mut Criterion) {
    let mut group = c.benchmark_group("telephony_frames");

    let caller = MediaFrame::new(
        mulaw::encode(&sine_samples(FRAME_SAMPLES, 8000)),
        AudioFormat::TELEPHONY,
    );
    let media = format!(
        r#"{{"event":"media","media":{{"track":"inbound","payload":"{}"}}}}"#,
        caller.to_base64()
    );

    group.throughput(Throughput::Bytes(media.len() as u64));
    group.bench_function("parse_media", |b| {
        b.iter(|| InboundEvent::decode(black_box(&media)));
    });

    let play = OutboundEvent::play_audio(&caller);
    group.bench_function("encode_play_audio", |b| {
        b.iter(|| black_box(&play).encode());
    });

    group.finish();
}

criterion_group!(benches, bench_mulaw, bench_transcode, bench_telephony_frames);
criterion_main!(benches);
