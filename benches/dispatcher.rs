use std::rc::Rc;

use criterion::{black_box, criterion_group, criterion_main, Criterion};

use input_dispatch::action::Effect;
use input_dispatch::categorize::{categorize, RawEntry};
use input_dispatch::dispatcher::Dispatcher;
use input_dispatch::mode::RawConfig;
use input_dispatch::timer::{Clock, ManualClock};

fn noop() -> Effect {
    Effect::NoArgs(Rc::new(|| {}))
}

fn build_entries(n: usize) -> Vec<RawEntry> {
    let mut entries = Vec::with_capacity(n);
    for i in 0..n {
        entries.push(RawEntry::new(format!("input_{i}"), format!("L{i}"), noop()));
    }
    entries
}

fn bench_categorize(c: &mut Criterion) {
    let entries = build_entries(200);
    c.bench_function("categorize::200_literal_entries", |b| {
        b.iter(|| black_box(categorize(&entries).unwrap()))
    });
}

fn bench_dispatch_simple_literal(c: &mut Criterion) {
    c.bench_function("dispatcher::handle_simple_literal", |b| {
        let clock = Rc::new(ManualClock::new());
        let dispatcher = Dispatcher::new(Rc::clone(&clock) as Rc<dyn Clock>);
        dispatcher
            .setup(RawConfig::Flat(vec![RawEntry::new("pop", "P", noop())]))
            .unwrap();
        b.iter(|| dispatcher.handle(black_box("pop")))
    });
}

fn bench_dispatch_combo_chain(c: &mut Criterion) {
    c.bench_function("dispatcher::handle_combo_chain", |b| {
        let clock = Rc::new(ManualClock::new());
        let dispatcher = Dispatcher::new(Rc::clone(&clock) as Rc<dyn Clock>);
        dispatcher
            .setup(RawConfig::Flat(vec![
                RawEntry::new("pop", "P", noop()),
                RawEntry::new("pop cluck", "PC", noop()),
            ]))
            .unwrap();
        b.iter(|| {
            dispatcher.handle(black_box("pop"));
            clock.advance(400);
        })
    });
}

fn bench_dispatch_throttled(c: &mut Criterion) {
    c.bench_function("dispatcher::handle_throttled", |b| {
        let clock = Rc::new(ManualClock::new());
        let dispatcher = Dispatcher::new(Rc::clone(&clock) as Rc<dyn Clock>);
        dispatcher
            .setup(RawConfig::Flat(vec![RawEntry::new("pop:th_50", "P", noop())]))
            .unwrap();
        b.iter(|| {
            dispatcher.handle(black_box("pop"));
            clock.advance(10);
        })
    });
}

fn bench_dispatch_many_entries(c: &mut Criterion) {
    c.bench_function("dispatcher::handle_among_200_entries", |b| {
        let clock = Rc::new(ManualClock::new());
        let dispatcher = Dispatcher::new(Rc::clone(&clock) as Rc<dyn Clock>);
        dispatcher.setup(RawConfig::Flat(build_entries(200))).unwrap();
        b.iter(|| dispatcher.handle(black_box("input_100")))
    });
}

fn bench_mode_cycle(c: &mut Criterion) {
    c.bench_function("dispatcher::mode_cycle", |b| {
        let clock = Rc::new(ManualClock::new());
        let dispatcher = Dispatcher::new(Rc::clone(&clock) as Rc<dyn Clock>);
        dispatcher
            .setup(RawConfig::Modes(vec![
                ("a".to_string(), vec![RawEntry::new("pop", "P", noop())]),
                ("b".to_string(), vec![RawEntry::new("cluck", "C", noop())]),
            ]))
            .unwrap();
        b.iter(|| {
            black_box(dispatcher.mode_cycle().unwrap());
        })
    });
}

criterion_group!(
    benches,
    bench_categorize,
    bench_dispatch_simple_literal,
    bench_dispatch_combo_chain,
    bench_dispatch_throttled,
    bench_dispatch_many_entries,
    bench_mode_cycle,
);
criterion_main!(benches);
