//! Benchmarks for map loading and topic conversion.

use std::fmt::Write;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use dita_renderer::{ConversionOptions, Rules};
use dita_site::{DocumentIndex, convert_topic};
use dita_storage::MockStorage;

/// Build a map with `breadth` sections of `breadth` topics each, one
/// sequence per section.
fn create_corpus(breadth: usize) -> MockStorage {
    let mut map = String::from("<map>");
    let mut storage = MockStorage::new();

    for section in 0..breadth {
        let _ = write!(
            map,
            r#"<topicref href="s{section}/index.dita" collection-type="sequence">"#
        );
        storage = storage.with_file(
            format!("s{section}/index.dita"),
            format!(r#"<concept id="s{section}"><title>Section {section}</title><conbody/></concept>"#),
        );
        for topic in 0..breadth {
            let _ = write!(map, r#"<topicref href="s{section}/t{topic}.dita"/>"#);
            storage = storage.with_file(
                format!("s{section}/t{topic}.dita"),
                format!(
                    r#"<task id="t{topic}"><title>Task {topic}</title><shortdesc>Do {topic}.</shortdesc>
<taskbody><steps><step><cmd>Open <uicontrol>Settings</uicontrol></cmd></step>
<step><cmd>See <xref href="../s0/t0.dita"/></cmd></step></steps></taskbody></task>"#
                ),
            );
        }
        map.push_str("</topicref>");
    }
    map.push_str("</map>");

    storage.with_file("index.ditamap", map)
}

fn bench_load_map(c: &mut Criterion) {
    let mut group = c.benchmark_group("load_map");

    for breadth in [5, 20] {
        let storage = Arc::new(create_corpus(breadth));
        group.bench_with_input(BenchmarkId::from_parameter(breadth), &breadth, |b, _| {
            b.iter(|| {
                let mut index = DocumentIndex::new(storage.clone());
                index.load_map("index.ditamap").unwrap();
                index
            });
        });
    }

    group.finish();
}

fn bench_convert_topic(c: &mut Criterion) {
    let mut index = DocumentIndex::new(Arc::new(create_corpus(5)));
    index.load_map("index.ditamap").unwrap();
    let topic = index.find_topic("s1/t1.dita").unwrap();
    let rules = Rules::default_dita();
    let options = ConversionOptions::default();

    c.bench_function("convert_topic", |b| {
        b.iter(|| convert_topic(&index, &rules, &options, topic).unwrap());
    });
}

criterion_group!(benches, bench_load_map, bench_convert_topic);
criterion_main!(benches);
