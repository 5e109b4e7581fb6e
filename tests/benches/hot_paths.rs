//! Criterion benchmarks for the interrupt and foreground hot paths.
//!
//! Run: cargo bench -p fretboard-tests --bench hot_paths
//!
//!   key_queue_*    : one enqueue/dequeue pair, empty and saturated ring
//!   scanner_poll   : a poll tick with a two-key chord held
//!   advance_ticks_*: one tick on a board holding N notes

use std::hint::black_box;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use fretboard_core::game::RhythmGame;
use fretboard_core::hal::mock::{MockGameHal, MockMatrix};
use fretboard_core::key_queue::{KeyEventQueue, KEY_QUEUE_CAPACITY};
use fretboard_core::scanner::KeyboardScanner;
use fretboard_core::types::{Column, GameConfig, KEY_1, KEY_9};
use fretboard_core::HeldKeys;

fn bench_key_queue(c: &mut Criterion) {
    let queue = KeyEventQueue::<KEY_QUEUE_CAPACITY>::new();
    c.bench_function("key_queue_empty", |b| {
        b.iter(|| {
            queue.enqueue(black_box(KEY_1));
            black_box(queue.try_dequeue())
        })
    });

    let full = KeyEventQueue::<KEY_QUEUE_CAPACITY>::new();
    for _ in 0..KEY_QUEUE_CAPACITY {
        full.enqueue(KEY_9);
    }
    c.bench_function("key_queue_saturated", |b| {
        b.iter(|| {
            full.enqueue(black_box(KEY_1));
            black_box(full.try_dequeue());
            full.enqueue(black_box(KEY_9))
        })
    });
}

fn bench_scanner(c: &mut Criterion) {
    let queue = KeyEventQueue::<KEY_QUEUE_CAPACITY>::new();
    let held = HeldKeys::new();
    let mut scanner = KeyboardScanner::new(MockMatrix::new(), &queue, &held);
    scanner.matrix_mut().press(KEY_1);
    scanner.matrix_mut().press(KEY_9);
    scanner.on_row_edge();

    c.bench_function("scanner_poll", |b| {
        b.iter(|| black_box(scanner.on_poll_tick()))
    });
}

fn bench_advance(c: &mut Criterion) {
    let mut group = c.benchmark_group("advance_ticks");
    for per_column in [1usize, 8, 32] {
        group.bench_with_input(BenchmarkId::from_parameter(per_column * 4), &per_column, |b, &n| {
            b.iter_batched_ref(
                || {
                    let mut game = RhythmGame::new(GameConfig::default(), &[]);
                    let mut hal = MockGameHal::mock();
                    for _ in 0..n {
                        for column in Column::ALL {
                            game.spawn_manual(&mut hal, column);
                        }
                    }
                    (game, MockGameHal::mock())
                },
                |(game, hal)| game.advance_ticks(hal, black_box(1)),
                criterion::BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

criterion_group!(benches, bench_key_queue, bench_scanner, bench_advance);
criterion_main!(benches);
