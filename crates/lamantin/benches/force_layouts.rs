use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use lamantin::{
    Algorithm, CommonOptions, ForceAtlas2Options, FruchtermanReingoldOptions, Graph,
    KamadaKawaiOptions, layout,
};
use std::hint::black_box;
use std::time::Duration;

fn build_graph(node_count: usize, fanout: usize) -> Graph<usize> {
    let mut g = Graph::new();
    // A ring to guarantee connectivity.
    for i in 0..node_count {
        g.add_edge(i, (i + 1) % node_count);
    }
    // Chords that create clusters of varying density.
    for i in (0..node_count).step_by(3) {
        for k in 2..=(fanout + 1) {
            let to = (i * 7 + k * 13) % node_count;
            if to != i {
                g.add_edge(i, to);
            }
        }
    }
    g
}

fn common() -> CommonOptions<usize> {
    CommonOptions {
        seed: Some(1),
        ..Default::default()
    }
}

fn bench_force_layouts(c: &mut Criterion) {
    let mut group = c.benchmark_group("force_layouts");
    group.measurement_time(Duration::from_secs(10));
    group.sample_size(20);

    let cases = [("ring_50_f2", 50usize, 2usize), ("ring_200_f3", 200usize, 3usize)];

    for (name, nodes, fanout) in cases {
        let g = build_graph(nodes, fanout);
        group.bench_with_input(BenchmarkId::new("fruchterman_reingold", name), &g, |b, g| {
            b.iter(|| {
                let algorithm = Algorithm::FruchtermanReingold(FruchtermanReingoldOptions {
                    common: common(),
                    ..Default::default()
                });
                black_box(layout(black_box(g), algorithm).map(|r| r.stats))
            })
        });
        group.bench_with_input(BenchmarkId::new("forceatlas2", name), &g, |b, g| {
            b.iter(|| {
                let algorithm = Algorithm::ForceAtlas2(ForceAtlas2Options {
                    common: common(),
                    ..Default::default()
                });
                black_box(layout(black_box(g), algorithm).map(|r| r.stats))
            })
        });
        group.bench_with_input(BenchmarkId::new("kamada_kawai", name), &g, |b, g| {
            b.iter(|| {
                let algorithm = Algorithm::KamadaKawai(KamadaKawaiOptions {
                    common: common(),
                    ..Default::default()
                });
                black_box(layout(black_box(g), algorithm).map(|r| r.stats))
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_force_layouts);
criterion_main!(benches);
