use std::sync::Arc;

use criterion::{Criterion, criterion_group, criterion_main};
use markdown_zkn_engine::combinators::{Multiplex, Region};
use markdown_zkn_engine::{
    GrammarRegistry, Highlighter, SpellcheckCache, ZknMode, ZknOptions, build_document_grammar,
    fenced_regions,
};

fn generate_note(sections: usize) -> String {
    let mut content = String::from("---\ntitle: Benchmark note\ntags: [bench, zkn]\n---\n\n");
    for section in 0..sections {
        content.push_str(&format!("# Section {section} #topic-{section}\n\n"));
        content.push_str(
            "Prose with a [[20200101120000]] link, some *emphasis*, ==highlights== and $x^2$ math.\n",
        );
        content.push_str("A second line citing [@doe99, p. 33] with `inline code`.\n\n");
        if section % 4 == 0 {
            content.push_str("```rust\nfn example() -> u32 {\n    42\n}\n```\n\n");
        }
    }
    content
}

fn bench_full_document(c: &mut Criterion) {
    let mut group = c.benchmark_group("full_document");
    group.sample_size(20);

    let content = generate_note(200);
    let registry = GrammarRegistry::with_builtin();
    let options = ZknOptions::default();

    let plain = build_document_grammar(&registry, &options, None).unwrap();
    group.bench_function("without_spellcheck", |b| {
        b.iter(|| {
            let mut highlighter =
                Highlighter::new(Arc::clone(&plain), std::hint::black_box(&content));
            let count = highlighter.line_count();
            std::hint::black_box(highlighter.highlight(0..count).len());
        });
    });

    let cache = Arc::new(SpellcheckCache::new());
    let spelled = build_document_grammar(&registry, &options, Some(cache)).unwrap();
    group.bench_function("with_spellcheck", |b| {
        b.iter(|| {
            let mut highlighter =
                Highlighter::new(Arc::clone(&spelled), std::hint::black_box(&content));
            let count = highlighter.line_count();
            std::hint::black_box(highlighter.highlight(0..count).len());
        });
    });

    group.finish();
}

/// Compares region scanning with and without the fence marker short-cut.
fn bench_multiplex_fast_path(c: &mut Criterion) {
    let mut group = c.benchmark_group("multiplex_fast_path");
    group.sample_size(20);

    let content = generate_note(200);
    let registry = GrammarRegistry::with_builtin();
    let marked = fenced_regions(&registry).unwrap();
    let unmarked: Vec<Region> = marked
        .iter()
        .cloned()
        .map(|mut region| {
            region.marker = None;
            region
        })
        .collect();

    for (name, regions) in [("with_markers", marked), ("without_markers", unmarked)] {
        let grammar = Arc::new(Multiplex::new(ZknMode::default(), regions));
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut highlighter =
                    Highlighter::new(grammar.clone(), std::hint::black_box(&content));
                let count = highlighter.line_count();
                std::hint::black_box(highlighter.highlight(0..count).len());
            });
        });
    }

    group.finish();
}

fn bench_incremental_edit(c: &mut Criterion) {
    let mut group = c.benchmark_group("incremental_edit");
    group.sample_size(20);

    let content = generate_note(200);
    let registry = GrammarRegistry::with_builtin();
    let grammar = build_document_grammar(&registry, &ZknOptions::default(), None).unwrap();
    let mut base = Highlighter::new(grammar, &content);
    let count = base.line_count();
    base.highlight(0..count);
    let middle = content.len() / 2;

    group.bench_function("edit_middle_and_rehighlight_viewport", |b| {
        b.iter(|| {
            let mut highlighter = base.fork();
            highlighter.edit(middle..middle, "x");
            let line = highlighter.rope().line_of_offset(middle);
            std::hint::black_box(highlighter.highlight(line..line + 50).len());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_full_document,
    bench_multiplex_fast_path,
    bench_incremental_edit
);
criterion_main!(benches);
