//! Benchmarks for decoding and depth aggregation

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, Criterion};
use itch_depth::{Decoder, DepthAggregator, LiveOrder, OrderStore, RawFrame, Side};
use rust_decimal::Decimal;

fn add_frame(order_id: u64) -> RawFrame {
    let mut b = vec![b'A'];
    b.extend_from_slice(&34_200u32.to_be_bytes());
    b.extend_from_slice(&order_id.to_be_bytes());
    b.extend_from_slice(b"BDO     ");
    b.extend_from_slice(&500u32.to_be_bytes());
    b.extend_from_slice(&12_550u32.to_be_bytes());
    b.push(b'B');
    RawFrame::new(Bytes::from(b))
}

fn populated_store(orders: u64) -> OrderStore {
    let mut store = OrderStore::new();
    for id in 0..orders {
        let side = if id % 2 == 0 { Side::Bid } else { Side::Ask };
        let offset = (id % 50) as i64;
        let price = match side {
            Side::Bid => Decimal::new(10_000 - offset, 2),
            Side::Ask => Decimal::new(10_001 + offset, 2),
        };
        store.apply_add(
            id,
            LiveOrder {
                symbol: "BDO".to_string(),
                side,
                price,
                quantity: 100,
                timestamp: 1,
            },
        );
    }
    store
}

fn benchmark_decode(c: &mut Criterion) {
    let decoder = Decoder::default();
    let frame = add_frame(42);

    c.bench_function("decode_add_order", |b| {
        b.iter(|| black_box(decoder.decode(black_box(&frame))))
    });
}

fn benchmark_store(c: &mut Criterion) {
    c.bench_function("add_then_execute", |b| {
        let mut store = populated_store(1000);
        let mut id = 1_000_000u64;
        b.iter(|| {
            id += 1;
            store.apply_add(
                id,
                LiveOrder {
                    symbol: "BDO".to_string(),
                    side: Side::Bid,
                    price: Decimal::new(9_990, 2),
                    quantity: 100,
                    timestamp: 2,
                },
            );
            black_box(store.apply_execute(id, 100));
        })
    });
}

fn benchmark_aggregate(c: &mut Criterion) {
    let store = populated_store(1000);
    let aggregator = DepthAggregator::new(5);

    c.bench_function("aggregate_1000_orders", |b| {
        b.iter(|| black_box(aggregator.aggregate(&store, black_box("BDO"))))
    });
}

criterion_group!(benches, benchmark_decode, benchmark_store, benchmark_aggregate);
criterion_main!(benches);
