use std::hint::black_box;

use artcafe_feed::{DedupSet, Identified, ItemId};
use criterion::{criterion_group, criterion_main, BatchSize, Criterion};

#[derive(Clone)]
struct Entry {
    id: ItemId,
    _body: String,
}

impl Identified for Entry {
    fn id(&self) -> &ItemId {
        &self.id
    }
}

/// Pages of `size` items where each page repeats the tail of the previous one
fn overlapping_pages(pages: u64, size: u64, overlap: u64) -> Vec<Vec<Entry>> {
    (0..pages)
        .map(|page| {
            let start = page * (size - overlap);
            (start..start + size)
                .map(|id| Entry {
                    id: ItemId::from(id),
                    _body: format!("post body {id}"),
                })
                .collect()
        })
        .collect()
}

fn benchmark(c: &mut Criterion) {
    let pages = overlapping_pages(50, 20, 5);

    c.bench_function("merge-overlapping-pages", |b| {
        b.iter_batched(
            || pages.clone(),
            |pages| {
                let mut set = DedupSet::new();
                for page in pages {
                    black_box(set.merge_page(page));
                }
                set
            },
            BatchSize::SmallInput,
        )
    });

    let mut loaded = DedupSet::new();
    for page in pages.iter().cloned() {
        loaded.merge_page(page);
    }
    let repeat = pages.last().cloned().unwrap_or_default();

    c.bench_function("merge-fully-seen-page", |b| {
        b.iter_batched(
            || (loaded.clone(), repeat.clone()),
            |(mut set, page)| black_box(set.merge_page(page)),
            BatchSize::SmallInput,
        )
    });
}

criterion_group!(benches, benchmark);
criterion_main!(benches);
