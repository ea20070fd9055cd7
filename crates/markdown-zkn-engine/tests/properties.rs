//! Property-based tests for the tokenizer.
//!
//! Documents are built from fragments that exercise every construct of the
//! note grammar: frontmatter, math, links, fences, comments and escapes.

use std::sync::Arc;

use markdown_zkn_engine::{
    Grammar, GrammarRegistry, Highlighter, SpellcheckCache, ZknMode, ZknOptions,
    build_document_grammar, tokenize_line_in_place,
};
use proptest::prelude::*;

const FRAGMENTS: &[&str] = &[
    "\n", "\n", "\n", " ", " ", "word", "teh", "x", "---", "...", "$", "$$", "\\", "\\$",
    "[[", "]]", "#tag", "# ", "*", "**", "_", "`", "```", "```js", "~~~", "~~~python", "==",
    "::", "|", "<!--", "-->", "20200101120000", "[@doe99]", "title: v", "> ", "- ", "\t",
    "ünï", "é", "[a](b)", "https://x.io",
];

fn document_strategy() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(FRAGMENTS), 0..60).prop_map(|parts| parts.concat())
}

fn char_boundary(text: &str, index: prop::sample::Index) -> usize {
    let boundaries: Vec<usize> = text
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(text.len()))
        .collect();
    boundaries[index.index(boundaries.len())]
}

fn spellchecking_grammar() -> Arc<dyn Grammar> {
    let cache = Arc::new(SpellcheckCache::new());
    cache.insert("teh", false);
    cache.insert("word", true);
    build_document_grammar(
        &GrammarRegistry::with_builtin(),
        &ZknOptions::default(),
        Some(cache),
    )
    .unwrap()
}

fn plain_document_grammar() -> Arc<dyn Grammar> {
    build_document_grammar(&GrammarRegistry::with_builtin(), &ZknOptions::default(), None).unwrap()
}

/// The class of every byte of every line, with the spellcheck class removed.
fn base_classes(highlighter: &mut Highlighter) -> Vec<Vec<String>> {
    let count = highlighter.line_count();
    highlighter
        .highlight(0..count)
        .iter()
        .map(|tokens| {
            tokens
                .iter()
                .flat_map(|t| {
                    let class = t
                        .class
                        .as_deref()
                        .unwrap_or("")
                        .split_whitespace()
                        .filter(|c| *c != "spell-error")
                        .collect::<Vec<_>>()
                        .join(" ");
                    std::iter::repeat_n(class, t.to - t.from)
                })
                .collect()
        })
        .collect()
}

proptest! {
    #[test]
    fn every_line_is_covered_without_stalls(doc in document_strategy()) {
        let grammar = spellchecking_grammar();
        let mut state = grammar.start_any();
        for line in doc.split('\n') {
            let out = tokenize_line_in_place(&*grammar, line, &mut state);
            prop_assert!(out.stalls.is_empty(), "stalled on {:?}", line);
            let mut expected = 0;
            for token in &out.tokens {
                prop_assert_eq!(token.from, expected);
                prop_assert!(token.to > token.from);
                prop_assert!(line.is_char_boundary(token.to));
                expected = token.to;
            }
            prop_assert_eq!(expected, line.trim_end_matches('\r').len());
        }
    }

    #[test]
    fn incremental_edit_matches_fresh_tokenization(
        doc in document_strategy(),
        start in any::<prop::sample::Index>(),
        end in any::<prop::sample::Index>(),
        insert in document_strategy(),
    ) {
        let grammar = spellchecking_grammar();
        let mut edited = Highlighter::new(Arc::clone(&grammar), &doc);
        let count = edited.line_count();
        edited.highlight(0..count);

        let a = char_boundary(&doc, start);
        let b = char_boundary(&doc, end);
        edited.edit(a.min(b)..a.max(b), &insert);

        let mut fresh = Highlighter::new(grammar, &edited.text());
        let count = fresh.line_count();
        prop_assert_eq!(edited.line_count(), count);
        prop_assert_eq!(edited.highlight(0..count).to_vec(), fresh.highlight(0..count).to_vec());
        prop_assert_eq!(edited.line_state(count).cloned(), fresh.line_state(count).cloned());
    }

    #[test]
    fn spellcheck_never_changes_base_classes(doc in document_strategy()) {
        let mut checked = Highlighter::new(spellchecking_grammar(), &doc);
        let mut plain = Highlighter::new(plain_document_grammar(), &doc);
        prop_assert_eq!(base_classes(&mut checked), base_classes(&mut plain));
    }

    #[test]
    fn lines_without_fence_markers_match_the_bare_grammar(doc in document_strategy()) {
        let doc = doc.replace('`', "'").replace('~', "-");
        let mut multiplexed = Highlighter::new(plain_document_grammar(), &doc);
        let mut bare = Highlighter::new(Arc::new(ZknMode::default()), &doc);
        let count = multiplexed.line_count();
        prop_assert_eq!(
            multiplexed.highlight(0..count).to_vec(),
            bare.highlight(0..count).to_vec()
        );
    }
}
