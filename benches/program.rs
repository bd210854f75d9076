//! Program analysis benchmarks

use criterion::{criterion_group, criterion_main, Criterion};
use summit::cluster::{ConstructorRef, MethodRef, Type};
use summit::program::{Literal, Program, Statement, VarRef};

/// A chain of `Node` objects, each linked to the previous one
fn linked_program(length: usize) -> Program {
    let node = Type::class("Node");
    let link = MethodRef {
        declaring: node.clone(),
        name: "link".to_string(),
        params: vec![node.clone()],
        returns: node.clone(),
        is_static: false,
    };
    let constructor = ConstructorRef {
        declaring: node,
        params: vec![],
    };
    let mut program = Program::new();
    let mut last = program
        .add_statement(Statement::construct(constructor.clone(), vec![]))
        .expect("add should succeed");
    for i in 0..length {
        if i % 3 == 0 {
            program
                .add_statement(Statement::literal(Literal::Int(i as i64), Type::int()))
                .expect("add should succeed");
        }
        let fresh = program
            .add_statement(Statement::construct(constructor.clone(), vec![]))
            .expect("add should succeed");
        last = program
            .add_statement(Statement::call(link.clone(), Some(fresh), vec![last]))
            .expect("add should succeed");
    }
    program
}

fn benchmark_dependencies(c: &mut Criterion) {
    let program = linked_program(50);
    let last = VarRef::Value(program.len() - 1);

    c.bench_function("dependencies_chain_50", |b| {
        b.iter(|| program.dependencies(&last));
    });
}

fn benchmark_references(c: &mut Criterion) {
    let program = linked_program(50);

    c.bench_function("references_chain_50", |b| {
        b.iter(|| program.references(&VarRef::Value(0)));
    });
}

fn benchmark_slice(c: &mut Criterion) {
    let program = linked_program(50);
    let target = VarRef::Value(program.len() / 2);

    c.bench_function("slice_chain_50", |b| {
        b.iter(|| {
            let mut copy = program.clone();
            copy.slice_for(&target).expect("slice should succeed")
        });
    });
}

criterion_group!(
    benches,
    benchmark_dependencies,
    benchmark_references,
    benchmark_slice
);
criterion_main!(benches);
