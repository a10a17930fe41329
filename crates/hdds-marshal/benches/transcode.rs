// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 naskel.com

#![allow(clippy::uninlined_format_args)] // Test/bench code readability over pedantic
#![allow(clippy::cast_possible_truncation)] // Test parameters
#![allow(clippy::semicolon_if_nothing_returned)] // Benchmark code formatting

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use hdds_marshal::{
    array_to_buffer, buffer_to_array, buffer_to_sequence, buffer_to_string_sequence,
    raw_sequence_to_buffer, sequence_to_buffer, string_sequence_to_buffer, AllocationLedger,
    NdArray, StringFormat, WireBuffer,
};

// ============================================================================
// Sequence Benchmarks
// ============================================================================

/// Benchmark: per-element vs block-copy encode of f64 sequences.
fn bench_sequence_encode(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequence_encode");
    for size in [16_usize, 256, 4096] {
        let items: Vec<f64> = (0..size).map(|i| i as f64 * 0.5).collect();
        group.bench_with_input(BenchmarkId::new("element", size), &items, |b, items| {
            b.iter(|| {
                let mut ledger = AllocationLedger::new();
                let buf = sequence_to_buffer(&mut ledger, black_box(items)).unwrap();
                black_box(buf.len());
            })
        });
        group.bench_with_input(BenchmarkId::new("raw", size), &items, |b, items| {
            b.iter(|| {
                let mut ledger = AllocationLedger::new();
                let buf = raw_sequence_to_buffer(&mut ledger, black_box(items)).unwrap();
                black_box(buf.len());
            })
        });
    }
    group.finish();
}

/// Benchmark: decode of a 4096-element i32 sequence.
fn bench_sequence_decode(c: &mut Criterion) {
    let items: Vec<i32> = (0..4096).collect();
    let mut ledger = AllocationLedger::new();
    let buf = sequence_to_buffer(&mut ledger, &items).unwrap();
    c.bench_function("sequence_decode_4096_i32", |b| {
        b.iter(|| {
            let out: Vec<i32> =
                unsafe { buffer_to_sequence(black_box(buf.as_ptr()), 4096) }.unwrap();
            black_box(out);
        })
    });
}

// ============================================================================
// String Benchmarks
// ============================================================================

fn bench_string_sequence(c: &mut Criterion) {
    let names: Vec<String> = (0..64).map(|i| format!("rt/sensors/topic_{}", i)).collect();
    let mut group = c.benchmark_group("string_sequence");
    for format in [StringFormat::Narrow, StringFormat::native_wide()] {
        let id = BenchmarkId::new("round_trip", format!("{:?}", format));
        group.bench_with_input(id, &names, |b, names| {
            b.iter(|| {
                let mut ledger = AllocationLedger::new();
                let buf = string_sequence_to_buffer(&mut ledger, black_box(names), format).unwrap();
                let back = unsafe { buffer_to_string_sequence(buf.as_ptr(), format, names.len()) };
                black_box(back.unwrap());
            })
        });
    }
    group.finish();
}

// ============================================================================
// Array / Wire Benchmarks
// ============================================================================

/// Benchmark: 16x16x16 carry walk, encode then decode.
fn bench_array_round_trip(c: &mut Criterion) {
    let extents = [16, 16, 16];
    let source = NdArray::from_fn(&extents, |index| {
        (index[0] * 256 + index[1] * 16 + index[2]) as u32
    })
    .unwrap();
    let mut target = NdArray::filled(&extents, 0_u32).unwrap();
    c.bench_function("array_round_trip_16x16x16_u32", |b| {
        b.iter(|| {
            let mut ledger = AllocationLedger::new();
            let buf = array_to_buffer(&mut ledger, black_box(&source)).unwrap();
            unsafe { buffer_to_array(buf.as_ptr(), &mut target) }.unwrap();
        })
    });
}

fn bench_wire_scalars(c: &mut Criterion) {
    c.bench_function("wire_write_read_1024_mixed", |b| {
        b.iter(|| {
            let mut wire = WireBuffer::with_capacity(1024 * 13);
            for i in 0..1024_u32 {
                wire.write_u32(i);
                wire.write_f64(f64::from(i));
                wire.write_bool(i % 2 == 0);
            }
            let mut reader = WireBuffer::from_bytes(wire.into_bytes());
            let mut sum = 0.0;
            for _ in 0..1024 {
                sum += f64::from(reader.read_u32()) + reader.read_f64();
                black_box(reader.read_bool());
            }
            black_box(sum);
        })
    });
}

criterion_group!(sequence_benches, bench_sequence_encode, bench_sequence_decode);
criterion_group!(string_benches, bench_string_sequence);
criterion_group!(array_benches, bench_array_round_trip, bench_wire_scalars);
criterion_main!(sequence_benches, string_benches, array_benches);
