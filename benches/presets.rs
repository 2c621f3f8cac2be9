use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

use clip_compositor::{overlay::OverlayConfig, overlay::TextOverlay, presets::PresetRegistry, video::Frame};

fn bench_presets(c: &mut Criterion) {
    let registry = PresetRegistry::new();
    let source = Frame::new_filled(640, 480, [120, 80, 200, 255]);

    let mut group = c.benchmark_group("preset_640x480");
    for name in ["none", "grayscale", "sepia", "saturate", "glitch"] {
        let preset = registry.resolve(name);
        group.bench_with_input(BenchmarkId::from_parameter(name), &preset, |b, preset| {
            let mut frame = source.clone();
            let mut counter = 0u64;
            b.iter(|| {
                preset.apply(black_box(&mut frame), counter).ok();
                counter += 1;
            });
        });
    }
    group.finish();
}

fn bench_overlay(c: &mut Criterion) {
    let overlay = TextOverlay::new("Clip Compositor", OverlayConfig::default());
    if !overlay.has_font() {
        return;
    }

    let source = Frame::new_black(640, 480);
    c.bench_function("overlay_640x480", |b| {
        let mut frame = source.clone();
        b.iter(|| overlay.render(black_box(&mut frame), 60).ok());
    });
}

criterion_group!(benches, bench_presets, bench_overlay);
criterion_main!(benches);
