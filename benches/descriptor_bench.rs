use criterion::{black_box, criterion_group, criterion_main, Criterion};

use biobind::core::face::FaceDescriptor;

fn bench_descriptor(c: &mut Criterion) {
    let a = FaceDescriptor::new((0..128).map(|i| i as f32 / 128.0).collect());
    let b = FaceDescriptor::new((0..128).map(|i| (127 - i) as f32 / 128.0).collect());

    c.bench_function("descriptor_distance_128", |bench| {
        bench.iter(|| black_box(&a).distance(black_box(&b)))
    });

    c.bench_function("biometric_hash_128", |bench| {
        bench.iter(|| black_box(&a).biometric_hash())
    });
}

criterion_group!(benches, bench_descriptor);
criterion_main!(benches);
