use criterion::{BenchmarkId, Criterion, black_box, criterion_group, criterion_main};
use protocol::codec::{decode_list, decode_list_lenient};
use protocol::message::Transaction;
use serde_json::{Value, json};

fn sample_transactions(count: usize) -> Value {
    let items: Vec<Value> = (0..count)
        .map(|i| {
            json!({
                "_id": format!("tx-{i}"),
                "type": if i % 2 == 0 { "deposit" } else { "withdraw" },
                "amount": (i as f64) * 12.5,
                "status": "completed",
                "createdAt": "2025-01-01T10:00:00Z"
            })
        })
        .collect();

    json!({ "success": true, "data": items })
}

fn bench_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_transactions");

    for count in [10usize, 100, 1_000] {
        let body = sample_transactions(count);

        group.bench_with_input(BenchmarkId::new("strict", count), &body, |b, body| {
            b.iter(|| {
                let txs: Vec<Transaction> = decode_list(black_box(body.clone())).unwrap();
                black_box(txs)
            })
        });

        group.bench_with_input(BenchmarkId::new("lenient", count), &body, |b, body| {
            b.iter(|| {
                let txs = decode_list_lenient::<Transaction>(black_box(body.clone())).unwrap();
                black_box(txs)
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
