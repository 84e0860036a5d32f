use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};
use flatsel::selector::{self, Specificity};
use flatsel::tree::NodeId;
use flatsel::Session;

/// Builds a synthetic tree shaped like a deeply nested, wide-fanout document:
/// `depth` levels of `div.level-N`, each with `fanout` `li.item` children at
/// its deepest level, so both long ancestor chains (stressing the Bloom
/// filter and descendant backtracking) and wide sibling runs (stressing
/// `:nth-child`) are represented.
fn build_tree(session: &mut Session, depth: usize, fanout: usize) -> NodeId {
    let div_tag = session.intern(b"div").unwrap();
    let li_tag = session.intern(b"li").unwrap();
    let level_classes: Vec<_> = (0..depth)
        .map(|i| session.intern(format!("level-{i}").as_bytes()).unwrap())
        .collect();
    let item_class = session.intern(b"item").unwrap();

    let mut node = NodeId::NONE;
    for class in &level_classes {
        node = session.create_element(div_tag, node).unwrap();
        session.set_classes(node, &[*class]).unwrap();
    }
    for _ in 0..fanout {
        let li = session.create_element(li_tag, node).unwrap();
        session.set_classes(li, &[item_class]).unwrap();
    }
    node
}

fn execute_throughput(c: &mut Criterion) {
    let mut session = Session::new();
    build_tree(&mut session, 32, 256);
    let sel = session.compile_selector("div.level-0 li.item:nth-child(2n)").unwrap();
    let bytecode = session.selectors()[sel].bytecode().to_vec();
    let tree = session.tree();
    let last = tree.node_count() as u32 - 1;

    c.bench_function("execute_deep_tree", |b| {
        b.iter(|| {
            for raw in 1..=last {
                black_box(selector::execute(black_box(&bytecode), black_box(tree), NodeId(raw)));
            }
        })
    });
}

fn resolve_bucketed_vs_naive(c: &mut Criterion) {
    let mut session = Session::new();
    build_tree(&mut session, 16, 512);
    session
        .compile_selector_list("li, li.item, div, .level-0, #never, li.item:nth-child(2n)")
        .unwrap();
    let tree = session.tree();
    let selectors = session.selectors();
    let last = tree.node_count() as u32 - 1;

    c.bench_function("resolve_bucketed", |b| {
        b.iter(|| {
            for raw in 1..=last {
                black_box(selector::resolve_bucketed(black_box(selectors), black_box(tree), NodeId(raw)));
            }
        })
    });

    c.bench_function("resolve_naive", |b| {
        b.iter(|| {
            for raw in 1..=last {
                black_box(selector::resolve(black_box(selectors), black_box(tree), NodeId(raw)));
            }
        })
    });
}

fn specificity_overhead(c: &mut Criterion) {
    let mut session = Session::new();
    let sel = session.compile_selector("div.level-0 > li.item:first-child").unwrap();
    let spec: Specificity = session.specificity_of(sel).unwrap();
    c.bench_function("specificity_read", |b| {
        b.iter(|| black_box(spec.a()) + black_box(spec.b()) + black_box(spec.c()))
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default();
    targets = execute_throughput, resolve_bucketed_vs_naive, specificity_overhead
}
criterion_main!(benches);
