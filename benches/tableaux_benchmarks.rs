//! Benchmarks for the DAG and tableau hot paths (SPEC_FULL.md §A.4),
//! in the teacher's style of benchmarking its own tableaux module.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use shiq_tableau::frontend::{Axiom, ConceptTree};
use shiq_tableau::iri::IRI;
use shiq_tableau::kernel::Kernel;
use shiq_tableau::reasoning::tableaux::role::RoleId;

fn chained_existentials(depth: usize) -> ConceptTree {
    let role = RoleId(0);
    let mut tree = ConceptTree::Name(IRI::new("http://bench.example.org/Leaf").unwrap());
    for i in (0..depth).rev() {
        let name = IRI::new(format!("http://bench.example.org/C{i}")).unwrap();
        tree = ConceptTree::And(vec![ConceptTree::Name(name), ConceptTree::Exists(role, Box::new(tree))]);
    }
    tree
}

fn bench_dag_construction(c: &mut Criterion) {
    c.bench_function("dag_add_tree_chained_existentials_32", |b| {
        b.iter(|| {
            let mut kernel = Kernel::new();
            kernel.new_kb().unwrap();
            let tree = chained_existentials(32);
            kernel.is_satisfiable(black_box(&tree)).unwrap();
        });
    });
}

fn bench_cyclic_blocking(c: &mut Criterion) {
    c.bench_function("cyclic_concept_blocking_satisfiability", |b| {
        b.iter(|| {
            let mut kernel = Kernel::new();
            kernel.new_kb().unwrap();
            let role = RoleId(0);
            let a = IRI::new("http://bench.example.org/A").unwrap();
            kernel
                .add_axiom(Axiom::SubClassOf {
                    sub: ConceptTree::Name(a.clone()),
                    sup: ConceptTree::Exists(role, Box::new(ConceptTree::Name(a.clone()))),
                })
                .unwrap();
            black_box(kernel.is_satisfiable(&ConceptTree::Name(a)).unwrap());
        });
    });
}

fn bench_le_merge_chain(c: &mut Criterion) {
    c.bench_function("at_most_merge_chain_8_successors", |b| {
        b.iter(|| {
            let mut kernel = Kernel::new();
            kernel.new_kb().unwrap();
            let role = RoleId(0);
            let tree = ConceptTree::And(vec![
                ConceptTree::AtMost(1, role, Box::new(ConceptTree::Top)),
                ConceptTree::AtLeast(8, role, Box::new(ConceptTree::Top)),
            ]);
            black_box(kernel.is_satisfiable(&tree).unwrap());
        });
    });
}

criterion_group!(benches, bench_dag_construction, bench_cyclic_blocking, bench_le_merge_chain);
criterion_main!(benches);
