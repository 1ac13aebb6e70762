//! Criterion benchmarks for manufacturer lookups.
//!
//! Measures point lookups against synthetic tables sized like a small, a
//! typical and a complete Wireshark `manuf` file.
//!
//! Run benchmarks with:
//! ```bash
//! cargo bench --package probemon-data
//! ```

// Criterion macros generate code that triggers missing_docs warnings.
#![allow(missing_docs, reason = "Criterion macros generate undocumented code")]

use std::hint::black_box;

use criterion::{BenchmarkId, Criterion, Throughput, criterion_group, criterion_main};
use probemon_core::MacAddress;
use probemon_data::{VendorRecord, VendorResolver};

/// Table sizes to benchmark.
const TABLE_SIZES: &[usize] = &[1_000, 10_000, 50_000];

/// Lookups issued per iteration.
const QUERIES: usize = 1_024;

const SEED: u64 = 0x5eed_cafe_f00d_beef;
const MAC_MASK: u64 = (1 << 48) - 1;

/// Deterministic xorshift stream so runs are comparable.
fn addresses(seed: u64, count: usize) -> Vec<u64> {
    let mut state = seed;
    (0..count)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            state & MAC_MASK
        })
        .collect()
}

/// OUI-sized ranges with an occasional nested /36 block.
fn synthetic_table(size: usize) -> VendorResolver {
    let records = addresses(SEED, size)
        .into_iter()
        .enumerate()
        .map(|(index, address)| {
            let (min, span) = if index % 16 == 0 {
                (address & !0xf_ffff, 0xf_ffff)
            } else {
                (address & !0xff_ffff, 0xff_ffff)
            };
            VendorRecord {
                range_min: min,
                range_max: min | span,
                short_name: format!("Vendor{index}"),
                long_name: None,
                comment: None,
            }
        })
        .collect();
    VendorResolver::from_records(records).unwrap_or_else(|| panic!("synthetic table is empty"))
}

fn bench_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("vendor_lookup");
    let queries: Vec<MacAddress> = addresses(SEED.rotate_left(17), QUERIES)
        .into_iter()
        .filter_map(|value| MacAddress::from_u64(value).ok())
        .collect();
    group.throughput(Throughput::Elements(queries.len() as u64));

    for &size in TABLE_SIZES {
        let resolver = synthetic_table(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &resolver, |b, resolver| {
            b.iter(|| {
                queries
                    .iter()
                    .filter(|mac| resolver.lookup(black_box(**mac)).is_some())
                    .count()
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_lookup);
criterion_main!(benches);
