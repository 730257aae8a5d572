//! Criterion benchmarks for key code translation.
//!
//! Run with:
//! ```bash
//! cargo bench --package kvm-serial-core --bench keymap_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use kvm_serial_core::KeyMapper;

/// Windows VK codes covering letters, modifiers, navigation and an unmapped code.
const BENCH_VK_CODES: &[u8] = &[
    0x41, // 'A'
    0x5A, // 'Z'
    0x0D, // VK_RETURN
    0x1B, // VK_ESCAPE
    0x08, // VK_BACK
    0x20, // VK_SPACE
    0x70, // VK_F1
    0x87, // VK_F24
    0xA2, // VK_LCONTROL
    0xA5, // VK_RMENU
    0x2E, // VK_DELETE
    0x25, // VK_LEFT
    0xBA, // VK_OEM_1
    0xA6, // unmapped
];

fn bench_vk_to_device(c: &mut Criterion) {
    let mut group = c.benchmark_group("keymap_vk_to_device");

    group.bench_function("single", |b| {
        b.iter(|| KeyMapper::vk_to_device(black_box(0x41)))
    });

    group.bench_function("batch_14", |b| {
        b.iter(|| {
            BENCH_VK_CODES
                .iter()
                .map(|&vk| KeyMapper::vk_to_device(black_box(vk)))
                .collect::<Vec<_>>()
        })
    });

    group.finish();
}

fn bench_key_name(c: &mut Criterion) {
    let mut group = c.benchmark_group("keymap_key_name");

    group.bench_function("special", |b| b.iter(|| KeyMapper::key_name(black_box(0x2E))));
    group.bench_function("formatted", |b| b.iter(|| KeyMapper::key_name(black_box(0x7F))));

    group.finish();
}

criterion_group!(benches, bench_vk_to_device, bench_key_name);
criterion_main!(benches);
