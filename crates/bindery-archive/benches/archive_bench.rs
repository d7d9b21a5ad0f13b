// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Criterion benchmarks for the bindery-archive crate: page ordering on a
// large listing, and a full CBZ to CBR conversion through the in-process RAR
// stand-in.

use criterion::{Criterion, black_box, criterion_group, criterion_main};
use tokio_util::sync::CancellationToken;

use bindery_archive::container::order_pages;
use bindery_archive::testing::{sample_jpeg, test_capabilities, write_cbz};
use bindery_archive::{FileProgress, convert, plan_job};
use bindery_core::ArchiveFormat;

// ---------------------------------------------------------------------------
// Benchmarks
// ---------------------------------------------------------------------------

/// Order a 2000-entry listing with folders, metadata, and resource forks mixed in.
fn bench_order_pages(c: &mut Criterion) {
    let mut names = Vec::new();
    for i in (0..2000).rev() {
        names.push(format!("chapter-{:02}/{i:04}.jpg", i / 100));
        if i % 100 == 0 {
            names.push(format!("__MACOSX/chapter-{:02}/._{i:04}.jpg", i / 100));
        }
    }
    names.push("ComicInfo.xml".to_string());

    c.bench_function("order_pages (2000 entries)", |b| {
        b.iter(|| black_box(order_pages(black_box(&names))));
    });
}

/// Convert a 20-page CBZ to CBR. Covers ZIP reading, page staging, and
/// archive creation.
fn bench_cbz_to_cbr(c: &mut Criterion) {
    let dir = tempfile::tempdir().expect("tempdir");
    let source = dir.path().join("issue.cbz");
    let pages: Vec<(String, Vec<u8>)> = (0..20u8)
        .map(|i| (format!("{i:03}.jpg"), sample_jpeg(i)))
        .collect();
    let entries: Vec<(&str, Vec<u8>)> = pages
        .iter()
        .map(|(name, payload)| (name.as_str(), payload.clone()))
        .collect();
    write_cbz(&source, &entries);

    let caps = test_capabilities();
    let cancel = CancellationToken::new();

    c.bench_function("convert cbz -> cbr (20 pages)", |b| {
        b.iter(|| {
            let job = plan_job(&source, ArchiveFormat::Cbr, false);
            let pages = convert(&job, &caps, &cancel, &mut |_: FileProgress| {})
                .expect("conversion");
            std::fs::remove_file(&job.target_path).expect("remove output");
            black_box(pages);
        });
    });
}

criterion_group!(benches, bench_order_pages, bench_cbz_to_cbr);
criterion_main!(benches);
