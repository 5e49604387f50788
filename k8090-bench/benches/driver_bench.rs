//! Driver round trips against the simulated board.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use k8090_client::{ConnectionConfig, SimulatedBoard, K8090};
use k8090_core::ButtonMode;
use std::time::Duration;

fn open() -> K8090<SimulatedBoard> {
    let config = ConnectionConfig::new("simulated").with_settle_delay(Duration::ZERO);
    K8090::with_transport(SimulatedBoard::new(), config).unwrap()
}

fn bench_relay_toggle(c: &mut Criterion) {
    let mut device = open();
    c.bench_function("relay_toggle", |b| {
        b.iter(|| {
            device.relay(3).unwrap().toggle().unwrap();
            black_box(device.state().relays_on())
        })
    });
}

fn bench_mode_broadcast(c: &mut Criterion) {
    let mut device = open();
    let mut timed = false;
    c.bench_function("button_mode_broadcast", |b| {
        b.iter(|| {
            timed = !timed;
            let mode = if timed {
                ButtonMode::Timed
            } else {
                ButtonMode::Toggle
            };
            device.button(5).unwrap().set_mode(mode).unwrap();
        })
    });
}

fn bench_drain_burst(c: &mut Criterion) {
    let mut device = open();
    let board = device.transport().handle();
    c.bench_function("drain_64_button_reports", |b| {
        b.iter(|| {
            for i in 0..32 {
                board.press(i % 8);
                board.release(i % 8);
            }
            device.sync().unwrap();
        })
    });
}

criterion_group!(
    benches,
    bench_relay_toggle,
    bench_mode_broadcast,
    bench_drain_burst
);
criterion_main!(benches);
