//! Benchmarks for the hot, network-free parts of a decision.
//!
//! - Verdict extraction over oracle answers of increasing length
//! - Payload signing and recovery
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use rand::{distributions::Alphanumeric, Rng, SeedableRng};
use safe_cosigner::agents::{extract_verdict, POSITIVE_INDICATORS};
use safe_cosigner::{Credential, SignatureProvider};
use serde_json::json;

const KEY: &str = "0x4c0883a69102937d6231471b5dbb6204fe5129617082792ae468d01a3f362318";

/// Letters every positive indicator needs at least one of.
const EXCLUDED: [char; 4] = ['y', 'v', 'b', 'g'];

/// Random lowercase filler that cannot spell an indicator, with a trailing verdict word.
fn answer(len: usize, tail: &str) -> String {
    let mut rng = rand::rngs::StdRng::seed_from_u64(7);
    let filler: String = (&mut rng)
        .sample_iter(&Alphanumeric)
        .map(|c| (c as char).to_ascii_lowercase())
        .filter(|c| c.is_ascii_lowercase() && !EXCLUDED.contains(c))
        .take(len)
        .collect();
    assert!(POSITIVE_INDICATORS.iter().all(|token| !filler.contains(token)));
    format!("NO {} {}", filler, tail)
}

fn bench_extract_verdict(c: &mut Criterion) {
    let mut group = c.benchmark_group("extract_verdict");

    for len in [64usize, 1024, 16 * 1024].iter() {
        let positive = answer(*len, "reasonable");
        let negative = answer(*len, "declined");
        assert!(extract_verdict(&positive));
        assert!(!extract_verdict(&negative));

        group.throughput(Throughput::Bytes(*len as u64));
        group.bench_with_input(BenchmarkId::new("positive", len), &positive, |b, text| {
            b.iter(|| black_box(extract_verdict(black_box(text))))
        });
        group.bench_with_input(BenchmarkId::new("negative", len), &negative, |b, text| {
            b.iter(|| black_box(extract_verdict(black_box(text))))
        });
    }

    group.finish();
}

fn bench_signing(c: &mut Criterion) {
    let credential = Credential::from_hex(KEY).expect("valid key");
    let provider = SignatureProvider::new();
    let payload = json!({
        "to": "0x00000000000000000000000000000000000000aa",
        "value": "1000000000000000000"
    });
    let signature = provider.sign(&payload, &credential).expect("sign");

    c.bench_function("sign_payload", |b| {
        b.iter(|| black_box(provider.sign(black_box(&payload), &credential).expect("sign")))
    });
    c.bench_function("recover_signer", |b| {
        b.iter(|| black_box(provider.recover(black_box(&payload), &signature).expect("recover")))
    });
}

criterion_group!(benches, bench_extract_verdict, bench_signing);
criterion_main!(benches);
