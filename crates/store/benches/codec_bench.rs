use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde_json::json;
use store::{BackendConfig, PayloadCodec, RawProfileRecord};

fn sample_record(addons: usize) -> RawProfileRecord {
    let active_addons: Vec<_> = (0..addons)
        .map(|i| json!({"addon_id": format!("addon-{i}@example.com"), "is_system": i % 4 == 0}))
        .collect();
    json!({
        "client_id": "bench-client",
        "city": "Toronto",
        "locale": "en-CA",
        "os": "Linux",
        "subsession_length": 3600,
        "places_bookmarks_count": 120,
        "scalar_parent_browser_engagement_tab_open_event_count": 48,
        "scalar_parent_browser_engagement_total_uri_count": 900,
        "scalar_parent_browser_engagement_unique_domains_count": 75,
        "active_addons": active_addons,
        "disabled_addons_ids": ["old-addon@example.com"]
    })
    .as_object()
    .cloned()
    .expect("object literal")
}

/// Encode/decode cost at the levels worth considering.
fn bench_codec(c: &mut Criterion) {
    let mut group = c.benchmark_group("payload_codec");
    let record = sample_record(40);

    for level in [1, 6, 9] {
        let codec = PayloadCodec::new(level);
        let payload = codec.encode(&record).expect("encode");
        group.throughput(Throughput::Bytes(payload.len() as u64));

        group.bench_function(format!("encode_level_{level}"), |b| {
            b.iter(|| codec.encode(black_box(&record)).expect("encode"));
        });
        group.bench_function(format!("decode_level_{level}"), |b| {
            b.iter(|| codec.decode(black_box(&payload)).expect("decode"));
        });
    }

    group.finish();
}

/// Full put/get through the in-memory wide-column backend.
fn bench_in_memory_backend(c: &mut Criterion) {
    let backend = BackendConfig::in_memory().build().expect("in-memory backend");
    let record = sample_record(40);
    backend.put_profile(&record).expect("seed");

    c.bench_function("in_memory_put", |b| {
        b.iter(|| backend.put_profile(black_box(&record)).expect("put"));
    });
    c.bench_function("in_memory_get", |b| {
        b.iter(|| backend.get_profile(black_box("bench-client")));
    });
}

criterion_group!(benches, bench_codec, bench_in_memory_backend);
criterion_main!(benches);
