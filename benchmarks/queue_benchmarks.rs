use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use relayq::{Broker, BrokerError};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Benchmark: publish into an empty queue, drain with try_consume
fn bench_publish_drain(c: &mut Criterion) {
    let mut group = c.benchmark_group("publish_drain");

    for capacity in [100, 1000, 10000].iter() {
        group.throughput(Throughput::Elements(*capacity as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(capacity),
            capacity,
            |b, &capacity| {
                let broker = Broker::new(capacity, 1024);

                b.iter(|| {
                    for _ in 0..capacity {
                        let _ = broker.publish(black_box(&b"payload"[..]));
                    }
                    while let Some(message) = broker.try_consume() {
                        black_box(message);
                    }
                });
            },
        );
    }
    group.finish();
}

/// Benchmark: publish then blocking consume on the same task
fn bench_roundtrip_latency(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("roundtrip_latency");
    group.sample_size(1000);

    let broker = Broker::default();
    group.bench_function("publish_then_consume", |b| {
        b.iter(|| {
            rt.block_on(async {
                broker.publish(black_box(&b"payload"[..])).unwrap();
                black_box(broker.consume().await);
            });
        });
    });

    group.finish();
}

/// Benchmark: hand-off to consumers already waiting
fn bench_direct_handoff(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("direct_handoff");

    for num_consumers in [1, 4, 16].iter() {
        group.throughput(Throughput::Elements(*num_consumers as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_consumers),
            num_consumers,
            |b, &num_consumers| {
                b.iter(|| {
                    rt.block_on(async {
                        let broker = Arc::new(Broker::default());

                        let mut handles = vec![];
                        for _ in 0..num_consumers {
                            let broker = broker.clone();
                            handles.push(tokio::spawn(async move { broker.consume().await }));
                        }
                        while broker.waiting_consumers() < num_consumers {
                            tokio::task::yield_now().await;
                        }

                        for _ in 0..num_consumers {
                            broker.publish(&b"payload"[..]).unwrap();
                        }
                        for handle in handles {
                            black_box(handle.await.unwrap());
                        }
                    });
                });
            },
        );
    }
    group.finish();
}

/// Benchmark: Producer-Consumer pattern
fn bench_producer_consumer(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("producer_consumer");
    group.sample_size(50);

    group.bench_function("1_producer_1_consumer", |b| {
        b.iter(|| {
            rt.block_on(async {
                let broker = Arc::new(Broker::default());

                let producer = {
                    let broker = broker.clone();
                    tokio::spawn(async move {
                        let mut sent = 0;
                        while sent < 10000 {
                            match broker.publish(&b"payload"[..]) {
                                Ok(_) => sent += 1,
                                Err(BrokerError::QueueFull { .. }) => tokio::task::yield_now().await,
                                Err(err) => panic!("publish failed: {err}"),
                            }
                        }
                    })
                };

                let consumer = {
                    let broker = broker.clone();
                    tokio::spawn(async move {
                        for _ in 0..10000 {
                            black_box(broker.consume().await);
                        }
                    })
                };

                producer.await.unwrap();
                consumer.await.unwrap();
            });
        });
    });

    group.finish();
}

/// Benchmark: Message size impact
fn bench_message_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("message_sizes");

    for size in [100, 1000, 10240].iter() {
        group.throughput(Throughput::Bytes(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let broker = Broker::default();
            let payload = bytes::Bytes::from(vec![b'x'; size]);

            b.iter(|| {
                broker.publish(black_box(payload.clone())).unwrap();
                black_box(broker.try_consume());
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_publish_drain,
    bench_roundtrip_latency,
    bench_direct_handoff,
    bench_producer_consumer,
    bench_message_sizes,
);

criterion_main!(benches);
