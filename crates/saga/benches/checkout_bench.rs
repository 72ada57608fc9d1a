use criterion::{Criterion, criterion_group, criterion_main};
use order_store::InMemoryOrderStore;
use saga::{
    CheckoutOrchestrator, CheckoutRequest, InMemoryNotificationService, InMemoryPaymentGateway,
};

fn request() -> CheckoutRequest {
    CheckoutRequest::new("bench-user", 100.0)
        .with_item("SKU-001", 2, 25.0)
        .with_item("SKU-002", 1, 50.0)
}

fn bench_validate(c: &mut Criterion) {
    let request = request();

    c.bench_function("saga/validate_request", |b| {
        b.iter(|| request.validate().unwrap());
    });
}

fn bench_checkout_success(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let orchestrator = CheckoutOrchestrator::new(
        InMemoryOrderStore::new(),
        InMemoryPaymentGateway::new(),
        InMemoryNotificationService::new(),
    );
    let request = request();

    c.bench_function("saga/checkout_success", |b| {
        b.iter(|| {
            rt.block_on(async {
                orchestrator.checkout(&request).await.unwrap();
            });
        });
    });
}

fn bench_checkout_compensated(c: &mut Criterion) {
    let rt = tokio::runtime::Runtime::new().unwrap();
    let payment = InMemoryPaymentGateway::new();
    payment.set_fail_on_charge(true);
    let orchestrator = CheckoutOrchestrator::new(
        InMemoryOrderStore::new(),
        payment,
        InMemoryNotificationService::new(),
    );
    let request = request();

    c.bench_function("saga/checkout_compensated", |b| {
        b.iter(|| {
            rt.block_on(async {
                orchestrator.checkout(&request).await.unwrap();
            });
        });
    });
}

criterion_group!(
    benches,
    bench_validate,
    bench_checkout_success,
    bench_checkout_compensated,
);
criterion_main!(benches);
