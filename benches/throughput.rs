//! Throughput benchmarks for the matching engine and session driver.
//!
//! Measures performance of:
//! - Order submission (with and without matching)
//! - Cancellation
//! - A short end-to-end session run across a range of population sizes

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use auctionbook::config::{Cohort, SimConfig, TraderBlueprint};
use auctionbook::schedule::{PriceRange, Schedule, StepMode, TimeMode, Zone};
use auctionbook::session::SessionSinks;
use auctionbook::sinks::CsvSink;
use auctionbook::{Exchange, Order, Price, Session, Side};

/// Builds an exchange with `levels` resting price levels on each side,
/// one order per level.
fn build_book(levels: i32) -> Exchange {
    let mut exchange = Exchange::new();
    for i in 0..levels {
        exchange.add_order(Order::new(format!("B{i}"), Side::Bid, Price(200 - i), i as f64));
        exchange.add_order(Order::new(format!("S{i}"), Side::Ask, Price(300 + i), i as f64));
    }
    exchange
}

fn bench_submit_no_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_no_match");
    for levels in [10, 100, 1000] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(levels), &levels, |b, &levels| {
            let mut exchange = build_book(levels);
            let mut offset = 0i32;
            b.iter(|| {
                let price = Price(150 - (offset % 50));
                offset += 1;
                black_box(exchange.process_order(1_000.0, Order::new("probe", Side::Bid, price, 1_000.0)))
            });
        });
    }
    group.finish();
}

fn bench_submit_with_match(c: &mut Criterion) {
    let mut group = c.benchmark_group("submit_with_match");
    group.throughput(Throughput::Elements(1));
    group.bench_function("single_fill", |b| {
        b.iter_batched(
            || {
                let mut exchange = Exchange::new();
                exchange.process_order(1.0, Order::new("S0", Side::Ask, Price(100), 1.0)).unwrap();
                exchange
            },
            |mut exchange| black_box(exchange.process_order(2.0, Order::new("B0", Side::Bid, Price(100), 2.0))),
            criterion::BatchSize::SmallInput,
        );
    });
    group.finish();
}

fn bench_cancel(c: &mut Criterion) {
    let mut group = c.benchmark_group("cancel");
    for levels in [10, 100, 1000] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(levels), &levels, |b, &levels| {
            b.iter_batched(
                || build_book(levels),
                |mut exchange| black_box(exchange.del_order(1_000.0, Side::Bid, "B0")),
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn bench_publish_lob(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_lob");
    for levels in [10, 100, 1000] {
        group.throughput(Throughput::Elements(1));
        group.bench_with_input(BenchmarkId::from_parameter(levels), &levels, |b, &levels| {
            let exchange = build_book(levels);
            b.iter(|| black_box(exchange.publish_lob(1_000.0)));
        });
    }
    group.finish();
}

fn flat_schedule(lo: i32, hi: i32) -> Schedule {
    Schedule {
        zones: vec![Zone { from: 0.0, to: 1_000_000.0, ranges: vec![PriceRange::fixed(lo, hi)], stepmode: StepMode::Fixed }],
        timemode: TimeMode::Periodic,
        interval: 5.0,
        fittointerval: false,
        noise_sigma: 0.0,
    }
}

fn bench_session_run(c: &mut Criterion) {
    let mut group = c.benchmark_group("session_run");
    for n in [10usize, 50, 200] {
        group.throughput(Throughput::Elements(n as u64));
        group.bench_with_input(BenchmarkId::from_parameter(n), &n, |b, &n| {
            b.iter_batched(
                || SimConfig {
                    endtime: 200.0,
                    seed: 1,
                    buyers: vec![Cohort { prefix: "B".into(), count: n / 2, kind: TraderBlueprint::Zic }],
                    sellers: vec![Cohort { prefix: "S".into(), count: n / 2, kind: TraderBlueprint::Zic }],
                    demand: flat_schedule(100, 200),
                    supply: flat_schedule(50, 150),
                    shuffle_times: false,
                    replenish_interval: 5.0,
                },
                |config| {
                    let sinks = SessionSinks {
                        tape: CsvSink::new(Vec::new()),
                        lob: CsvSink::new(Vec::new()),
                        balances: CsvSink::new(Vec::new()),
                        blotter: CsvSink::new(Vec::new()),
                    };
                    let mut session = Session::new(&config, sinks).unwrap();
                    black_box(session.run().unwrap())
                },
                criterion::BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_submit_no_match,
    bench_submit_with_match,
    bench_cancel,
    bench_publish_lob,
    bench_session_run,
);
criterion_main!(benches);
