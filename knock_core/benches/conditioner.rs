use criterion::{Criterion, black_box, criterion_group, criterion_main};
use knock_core::conditioner::{Measurement, combined_output};
use knock_core::report::format_line;
use knock_core::ChannelMode;

// xorshift codes in 0..=1023
fn synth_codes(n: usize, seed: u32) -> Vec<u16> {
    let mut state = seed.max(1);
    (0..n)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state % 1024) as u16
        })
        .collect()
}

fn bench_conditioning(c: &mut Criterion) {
    let codes = synth_codes(4096, 0xC0FFEE);

    c.bench_function("measurement_from_raw_4096", |b| {
        b.iter(|| {
            let mut limits = 0u32;
            for &raw in &codes {
                let m = Measurement::from_raw(1, black_box(raw));
                limits += u32::from(m.limit_exceeded);
            }
            black_box(limits)
        })
    });

    c.bench_function("combined_output_pairs", |b| {
        b.iter(|| {
            let mut acc = 0u32;
            for pair in codes.chunks_exact(2) {
                acc += u32::from(combined_output(black_box(pair[0]), black_box(pair[1])));
            }
            black_box(acc)
        })
    });

    c.bench_function("format_dual_line", |b| {
        let ms = [Measurement::from_raw(1, 412), Measurement::from_raw(2, 977)];
        b.iter(|| black_box(format_line(ChannelMode::Dual, black_box(&ms))))
    });
}

criterion_group!(benches, bench_conditioning);
criterion_main!(benches);
