//! Criterion benchmarks for cadenza-synth offline rendering
//!
//! Run with: cargo bench -p cadenza-synth

use cadenza_core::OfflineContext;
use cadenza_synth::{Oscillator, SynthEngine, ToneSpec, Waveform};
use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use futures::executor::block_on;

const SAMPLE_RATE: f32 = 48000.0;
const BLOCK_SIZES: &[usize] = &[128, 512, 1024];

// ============================================================================
// Oscillator benchmarks
// ============================================================================

fn bench_oscillator_waveforms(c: &mut Criterion) {
    let mut group = c.benchmark_group("Oscillator");

    let waveforms = [
        ("Sine", Waveform::Sine),
        ("Saw", Waveform::Saw),
        ("Square", Waveform::Square),
        ("Triangle", Waveform::Triangle),
        ("Noise", Waveform::Noise),
    ];

    for (name, waveform) in &waveforms {
        for &block_size in BLOCK_SIZES {
            let mut osc = Oscillator::new(SAMPLE_RATE);
            osc.set_frequency(440.0);
            osc.set_waveform(*waveform);
            let mut block = vec![0.0f32; block_size];

            group.bench_with_input(
                BenchmarkId::new(*name, block_size),
                &block_size,
                |b, _| {
                    b.iter(|| {
                        osc.fill(&mut block);
                        black_box(block[0])
                    })
                },
            );
        }
    }

    group.finish();
}

// ============================================================================
// Offline render benchmarks (tick loop + synthesis)
// ============================================================================

fn bench_offline_render(c: &mut Criterion) {
    let mut group = c.benchmark_group("OfflineRender");
    group.sample_size(20);

    for &notes_per_second in &[4usize, 32] {
        group.bench_with_input(
            BenchmarkId::new("one_second_stereo", notes_per_second),
            &notes_per_second,
            |b, &notes| {
                b.iter(|| {
                    let mut ctx = OfflineContext::<SynthEngine>::new(2, 1.0, SAMPLE_RATE).unwrap();
                    let every = (200 / notes).max(1) as u64;
                    ctx.on_tick(move |tick, engine| {
                        if tick.index % every == 0 {
                            let spec = ToneSpec {
                                waveform: Waveform::Saw,
                                stop: Some(tick.time + 0.1),
                                ..ToneSpec::new(220.0 + tick.index as f32, tick.time)
                            };
                            engine.graph_mut().schedule_tone(spec)?;
                        }
                        Ok(())
                    });
                    black_box(block_on(ctx.render()).unwrap())
                })
            },
        );
    }

    group.finish();
}

criterion_group!(benches, bench_oscillator_waveforms, bench_offline_render);
criterion_main!(benches);
