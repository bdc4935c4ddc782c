use criterion::{BatchSize, BenchmarkId, Criterion, criterion_group, criterion_main};
use remora::cycles::break_cycles;
use remora::graph::DirectedGraph;
use remora::sort::topological_sort;
use std::hint::black_box;

#[derive(Debug, Clone)]
struct GraphSpec {
    node_count: usize,
    edges: Vec<(usize, usize)>,
}

impl GraphSpec {
    fn build(&self) -> DirectedGraph<usize, bool> {
        let mut g: DirectedGraph<usize, bool> = DirectedGraph::new();
        for node in 0..self.node_count {
            g.add_node(node);
        }
        for &(origin, destination) in &self.edges {
            g.add_edge(&origin, &destination, true)
                .expect("bench endpoints are always present");
        }
        g
    }
}

fn build_dag_spec(node_count: usize, fanout: usize) -> GraphSpec {
    let mut edges: Vec<(usize, usize)> = Vec::new();

    // A spine so that most nodes are transitively constrained.
    for i in 1..node_count {
        edges.push((i, i - 1));
    }

    // Extra backward edges for fan-in pressure.
    for i in 0..node_count {
        for k in 2..=(fanout + 1) {
            if i >= k {
                edges.push((i, i - k));
            }
        }
    }

    GraphSpec { node_count, edges }
}

fn build_cyclic_spec(node_count: usize, cycle_len: usize) -> GraphSpec {
    let mut spec = build_dag_spec(node_count, 2);

    // Close a forward edge over every `cycle_len` stretch of the spine.
    let mut i = 0;
    while i + cycle_len < node_count {
        spec.edges.push((i, i + cycle_len));
        i += cycle_len;
    }
    spec
}

fn bench_topological_sort(c: &mut Criterion) {
    let mut group = c.benchmark_group("topological_sort");

    let cases = [
        ("dag_100_f3", 100usize, 3usize),
        ("dag_1000_f4", 1000usize, 4usize),
    ];

    for (name, nodes, fanout) in cases {
        let spec = build_dag_spec(nodes, fanout);
        group.bench_with_input(BenchmarkId::new("sort", name), &spec, |b, spec| {
            let g = spec.build();
            b.iter(|| black_box(topological_sort(black_box(&g))));
        });
    }

    group.finish();
}

fn bench_break_cycles(c: &mut Criterion) {
    let mut group = c.benchmark_group("break_cycles");

    let cases = [
        ("cyclic_100_c5", 100usize, 5usize),
        ("cyclic_500_c10", 500usize, 10usize),
    ];

    for (name, nodes, cycle_len) in cases {
        let spec = build_cyclic_spec(nodes, cycle_len);
        group.bench_with_input(BenchmarkId::new("break", name), &spec, |b, spec| {
            b.iter_batched(
                || spec.build(),
                |mut g| {
                    break_cycles(&mut g, |node: &usize| *node);
                    black_box(g.edge_count());
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_topological_sort, bench_break_cycles);
criterion_main!(benches);
