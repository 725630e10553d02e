use criterion::{Criterion, criterion_group, criterion_main};
use vitalscope::{RawEntry, collect::timeline::TimelineCollector, config::CaptureLimits};

fn synthetic_batch(count: usize) -> Vec<RawEntry> {
    (0..count)
        .map(|index| RawEntry::Resource {
            url: format!("https://app.example.com/assets/res-{index}.js"),
            start_time: index as f64 * 3.0,
            duration: 12.0,
            initiator_type: Some("script".to_string()),
            transfer_size: Some(2048.0),
            encoded_body_size: None,
            domain_lookup_start: None,
            domain_lookup_end: None,
            connect_start: None,
            connect_end: None,
            request_start: None,
            response_start: None,
            response_end: None,
        })
        .collect()
}

fn bench_timeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("timeline_normalize");
    for &count in &[16, 64, 256] {
        let batch = synthetic_batch(count);
        group.bench_function(format!("ingest_{count}"), |b| {
            b.iter(|| {
                let mut collector = TimelineCollector::new(&CaptureLimits::default(), 0.0);
                collector.set_anchor(Some(8.0));
                collector.ingest_batch(&batch);
                collector.model()
            })
        });
    }
    group.finish();
}

criterion_group!(benches, bench_timeline);
criterion_main!(benches);
