use std::collections::BinaryHeap;

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tile_nav::{HeapArena, IndexedHeap};

struct Keys {
    keys: Vec<i32>,
    index: Vec<i32>,
}

impl Keys {
    fn new(keys: &[i32]) -> Self {
        Self {
            keys: keys.to_vec(),
            index: vec![-1; keys.len()],
        }
    }
}

impl HeapArena for Keys {
    fn less(&self, a: u32, b: u32) -> bool {
        self.keys[a as usize] < self.keys[b as usize]
    }

    fn heap_index(&self, slot: u32) -> i32 {
        self.index[slot as usize]
    }

    fn set_heap_index(&mut self, slot: u32, index: i32) {
        self.index[slot as usize] = index;
    }
}

fn criterion_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("heap");
    group.sample_size(100);

    const N: usize = 4096;
    let mut rng = StdRng::seed_from_u64(1);
    let values: Vec<i32> = (0..N).map(|_| rng.gen()).collect();

    group.bench_function("indexed_push_pop", |b| {
        b.iter(|| {
            let mut arena = Keys::new(black_box(&values));
            let mut heap = IndexedHeap::with_capacity(N);
            for slot in 0..N as u32 {
                heap.push(&mut arena, slot);
            }
            while let Some(slot) = heap.pop(&mut arena) {
                black_box(slot);
            }
        })
    });

    group.bench_function("std_binary_push_pop", |b| {
        b.iter(|| {
            let mut heap = BinaryHeap::with_capacity(N);
            for &v in black_box(&values) {
                heap.push(std::cmp::Reverse(v));
            }
            while let Some(v) = heap.pop() {
                black_box(v);
            }
        })
    });

    let fixes: Vec<(usize, i32)> = (0..N)
        .map(|_| (rng.gen_range(0..N), rng.gen_range(-100..=100)))
        .collect();

    group.bench_function("indexed_fix", |b| {
        b.iter(|| {
            let mut arena = Keys::new(black_box(&values));
            let mut heap = IndexedHeap::with_capacity(N);
            for slot in 0..N as u32 {
                heap.push(&mut arena, slot);
            }
            for &(slot, delta) in black_box(&fixes) {
                arena.keys[slot] += delta;
                heap.fix(&mut arena, slot as u32);
            }
        })
    });

    group.finish();
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
