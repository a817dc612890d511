//! Benchmarks for the assembler

use assemblage::prelude::*;
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use std::sync::Arc;

struct Leaf;

#[async_trait]
impl Lifecycle for Leaf {}

impl Assemblage for Leaf {
    type Interface = Leaf;

    fn assemble(_ctx: &BuildContext) -> Result<Self> {
        Ok(Leaf)
    }

    fn as_interface(this: Arc<Self>) -> Arc<Self> {
        this
    }
}

struct Branch {
    _leaf: Arc<Leaf>,
}

#[async_trait]
impl Lifecycle for Branch {}

impl Assemblage for Branch {
    type Interface = Branch;

    fn definition() -> Definition {
        Definition::new().inject(Injection::of::<Leaf>())
    }

    fn dependencies() -> Vec<Identifier> {
        identifiers![Leaf]
    }

    fn assemble(ctx: &BuildContext) -> Result<Self> {
        Ok(Branch {
            _leaf: ctx.require::<Leaf>()?,
        })
    }

    fn as_interface(this: Arc<Self>) -> Arc<Self> {
        this
    }
}

struct Root {
    _branch: Arc<Branch>,
}

#[async_trait]
impl Lifecycle for Root {}

impl Assemblage for Root {
    type Interface = Root;

    fn definition() -> Definition {
        Definition::new().inject(Injection::of::<Branch>())
    }

    fn dependencies() -> Vec<Identifier> {
        identifiers![Branch]
    }

    fn assemble(ctx: &BuildContext) -> Result<Self> {
        Ok(Root {
            _branch: ctx.require::<Branch>()?,
        })
    }

    fn as_interface(this: Arc<Self>) -> Arc<Self> {
        this
    }
}

fn bench_registration(c: &mut Criterion) {
    let mut group = c.benchmark_group("registration");

    group.bench_function("register_leaf", |b| {
        b.iter(|| {
            let assembler = Assembler::new();
            assembler.register(Injection::of::<Leaf>()).unwrap();
            black_box(assembler)
        })
    });

    group.bench_function("register_tree", |b| {
        b.iter(|| {
            let assembler = Assembler::new();
            assembler.register(Injection::of::<Root>()).unwrap();
            black_box(assembler)
        })
    });

    group.finish();
}

fn bench_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("resolution");

    let assembler = Assembler::new();
    assembler.register(Injection::of::<Root>()).unwrap();
    let _ = assembler.require::<Root>().unwrap();

    group.bench_function("singleton_hit", |b| {
        b.iter(|| black_box(assembler.require::<Leaf>().unwrap()))
    });

    group.bench_function("has", |b| b.iter(|| black_box(assembler.has::<Branch>())));

    group.finish();
}

fn bench_build(c: &mut Criterion) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");

    let mut group = c.benchmark_group("build");

    group.bench_function("three_level_tree", |b| {
        b.iter(|| {
            runtime.block_on(async {
                let assembler = Assembler::new();
                let root = assembler.build::<Root>(None).await.unwrap();
                black_box(root)
            })
        })
    });

    group.finish();
}

criterion_group!(benches, bench_registration, bench_resolution, bench_build);
criterion_main!(benches);
