//! Throughput benchmarks

use criterion::{criterion_group, criterion_main, Criterion, Throughput};
use scpilot_core::{
    tokenize, Catalog, ChannelAliases, ChannelLabels, ConsoleFamily, LineFramer, ScpEngine,
};
use std::fmt::Write;
use std::hint::black_box;
use std::sync::Arc;

fn catalog_source() -> String {
    let mut source = String::new();
    for (i, section) in ["InCh", "StInCh", "Mix", "Mtrx", "St", "DCA"].iter().enumerate() {
        for (j, param) in ["Fader/Level", "Fader/On", "Label/Name", "ToMix/Level"].iter().enumerate() {
            let _ = writeln!(
                source,
                "OK prminfo {} \"MIXER:Current/{section}/{param}\" 72 24 -32768 1000 -32768 \"dB\" integer any rw 100",
                i * 4 + j
            );
        }
    }
    source
}

fn notify_stream(lines: usize) -> Vec<u8> {
    let mut out = String::new();
    for i in 0..lines {
        let _ = writeln!(
            out,
            "NOTIFY set MIXER:Current/InCh/Fader/Level {} 0 {}",
            i % 72,
            -(i as i64 % 1000)
        );
    }
    out.into_bytes()
}

fn tokenizer_benchmark(c: &mut Criterion) {
    let line = "NOTIFY set MIXER:Current/InCh/Label/Name 11 0 \"Lead Vox\" \"Lead Vox\"";

    let mut group = c.benchmark_group("tokenizer");
    group.throughput(Throughput::Bytes(line.len() as u64));

    group.bench_function("tokenize_line", |b| {
        b.iter(|| black_box(tokenize(black_box(line))))
    });

    group.finish();
}

fn catalog_benchmark(c: &mut Criterion) {
    let catalog =
        Catalog::load(&catalog_source(), ConsoleFamily::ClQl, ChannelLabels::default()).unwrap();

    let mut group = c.benchmark_group("catalog");

    group.bench_function("resolve_address", |b| {
        b.iter(|| black_box(catalog.resolve(black_box("MIXER:Current/DCA/ToMix/Level"))))
    });

    group.bench_function("resolve_miss", |b| {
        b.iter(|| black_box(catalog.resolve(black_box("MIXER:Current/Nowhere/Level"))))
    });

    group.finish();
}

fn framing_benchmark(c: &mut Criterion) {
    let data = notify_stream(1000);

    let mut group = c.benchmark_group("framing");
    group.throughput(Throughput::Bytes(data.len() as u64));

    group.bench_function("split_chunks", |b| {
        b.iter(|| {
            let mut framer = LineFramer::new();
            let mut lines = 0;
            for chunk in black_box(&data).chunks(1460) {
                lines += framer.feed(chunk).len();
            }
            black_box(lines)
        })
    });

    group.bench_function("engine_feed", |b| {
        let catalog = Arc::new(
            Catalog::load(&catalog_source(), ConsoleFamily::ClQl, ChannelLabels::default())
                .unwrap(),
        );
        b.iter(|| {
            let mut engine = ScpEngine::new(catalog.clone(), ChannelAliases::default());
            let mut events = 0;
            for chunk in black_box(&data).chunks(1460) {
                events += engine.feed(chunk).len();
            }
            black_box(events)
        })
    });

    group.finish();
}

criterion_group!(benches, tokenizer_benchmark, catalog_benchmark, framing_benchmark);
criterion_main!(benches);
