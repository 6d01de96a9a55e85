use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};

use xfem_topology::cut::PlaneCut;
use xfem_topology::cut_mesh::CutMesh;
use xfem_topology::xfem::{HostMesh, Xfem};

/// Connectivity of a strip of `n` unit quads along x.
fn strip(n: u32) -> Vec<Vec<u32>> {
    let row = n + 1;
    (0..n).map(|i| vec![i, i + 1, i + 1 + row, i + row]).collect()
}

/// Cut the whole strip along its midline and run one topology update.
fn split_strip(connectivity: &[Vec<u32>]) -> CutMesh {
    let mut mesh = CutMesh::default();
    mesh.add_elements(connectivity).expect("strip connectivity");
    mesh.update_edge_neighbors().expect("neighbors");
    mesh.add_edge_intersection(0, 3, 0.5).expect("entry cut");
    for id in 0..connectivity.len() as u32 {
        mesh.add_edge_intersection(id, 1, 0.5).expect("side cut");
    }
    mesh.update_physical_links_and_fragments().expect("fragments");
    mesh.update_topology().expect("topology");
    mesh
}

fn bench_topology_update(c: &mut Criterion) {
    let mut group = c.benchmark_group("topology_update");

    for &n in &[16u32, 64, 256] {
        let connectivity = strip(n);
        group.bench_with_input(BenchmarkId::new("split_strip", n), &n, |b, _| {
            b.iter(|| {
                let mesh = split_strip(&connectivity);
                black_box(mesh.num_elements());
            });
        });

        group.bench_with_input(BenchmarkId::new("xfem_update", n), &n, |b, &n| {
            b.iter(|| {
                let mut host = HostMesh::rectangle(n, 1, f64::from(n), 1.0).expect("grid");
                let mut xfem = Xfem::default();
                xfem.add_geometric_cut(PlaneCut::new([0.0, 0.5], [0.0, 1.0]));
                let changed = xfem.update(&mut host, 0.0).expect("update");
                black_box((changed, host.num_elements()));
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_topology_update);
criterion_main!(benches);
