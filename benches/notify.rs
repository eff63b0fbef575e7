use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};

use action_semaphore::{JsonAction, Pipeline, SemaphoreRegistry};

fn bench_dispatch_no_waiters(c: &mut Criterion) {
    let semaphores = SemaphoreRegistry::<JsonAction>::default();
    let pipeline = Pipeline::new(|a: JsonAction| a.action_type.len())
        .with_stage(semaphores.install_interceptor());
    let action = JsonAction::new("TICK");

    let mut group = c.benchmark_group("notify");
    group.throughput(Throughput::Elements(1));
    group.bench_function("dispatch_no_waiters", |b| {
        b.iter(|| black_box(pipeline.dispatch(action.clone())));
    });
    group.finish();
}

fn bench_dispatch_pending_waiters(c: &mut Criterion) {
    // 256 waiters that never match: measures the snapshot + evaluate cost.
    let semaphores = SemaphoreRegistry::<JsonAction>::default();
    let _pending: Vec<_> = (0..256)
        .map(|i| semaphores.await_event(format!("NEVER_{i}")))
        .collect();
    let pipeline = Pipeline::new(|a: JsonAction| a.action_type.len())
        .with_stage(semaphores.install_interceptor());
    let action = JsonAction::new("TICK");

    let mut group = c.benchmark_group("notify");
    group.throughput(Throughput::Elements(256));
    group.bench_function("dispatch_256_pending", |b| {
        b.iter(|| black_box(pipeline.dispatch(action.clone())));
    });
    group.finish();
}

fn bench_register_and_settle(c: &mut Criterion) {
    let semaphores = SemaphoreRegistry::<JsonAction>::default();
    let interceptor = semaphores.install_interceptor();
    let action = JsonAction::new("GO");

    c.bench_function("notify/register_and_settle_64", |b| {
        b.iter_batched(
            || (0..64).map(|_| semaphores.await_event("GO")).collect::<Vec<_>>(),
            |outcomes| {
                interceptor.notify(&action);
                for o in outcomes {
                    black_box(o.wait().ok());
                }
            },
            BatchSize::SmallInput,
        );
    });
}

criterion_group!(
    benches,
    bench_dispatch_no_waiters,
    bench_dispatch_pending_waiters,
    bench_register_and_settle
);
criterion_main!(benches);
