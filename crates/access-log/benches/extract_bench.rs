// Copyright 2025-Present Datadog, Inc. https://www.datadoghq.com/
// SPDX-License-Identifier: Apache-2.0

use access_log::extract;
use criterion::{black_box, criterion_group, criterion_main, Criterion};

fn bench_extract(c: &mut Criterion) {
    let lines = [
        (
            "common",
            r#"123.45.67.89 - - [10/Oct/2023:13:55:36 -0700] "GET /index.html HTTP/1.1" 200 1043"#,
        ),
        (
            "combined",
            r#"10.0.0.1 - frank [10/Oct/2000:13:55:36 -0700] "GET /a.gif HTTP/1.0" 200 2326 "http://example.com/start.html" "Mozilla/4.08 [en] (Win98; I ;Nav)""#,
        ),
        ("malformed", "this line carries none of the expected fields"),
    ];

    let mut group = c.benchmark_group("extract");
    for (name, line) in lines {
        group.bench_function(name, |b| {
            b.iter(|| {
                let _ = extract(black_box(line));
            });
        });
    }
    group.finish();
}

criterion_group!(benches, bench_extract);
criterion_main!(benches);
