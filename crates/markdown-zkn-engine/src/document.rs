//! Assembles the grammar used for a whole note.

use std::sync::Arc;

use crate::combinators::{Multiplex, Overlay, Region};
use crate::error::GrammarError;
use crate::grammar::{Grammar, GrammarRegistry, Mode};
use crate::spellcheck::{SpellcheckCache, SpellcheckOverlay};
use crate::zkn::{ZknMode, ZknOptions};

pub const CODE_BLOCK_FORMATTING: &str = "formatting formatting-code-block";
pub const CODE_BLOCK: &str = "code-block";

const FENCES: [(&str, &str); 2] = [("`", "```"), ("~", "~~~")];

/// Builds the fenced code regions for every language in `registry`.
///
/// Each language gets one backtick and one tilde region. The opening fence
/// accepts `` ```js ``, `` ``` {.js} `` and trailing attributes; the closing
/// fence is a bare run of fence characters at least as long as the opening.
pub fn fenced_regions(registry: &GrammarRegistry) -> Result<Vec<Region>, GrammarError> {
    let mut regions = Vec::new();
    for (id, selectors) in registry.fence_selectors() {
        let Some(grammar) = registry.get(id) else {
            continue;
        };
        let alternatives = selectors
            .iter()
            .map(|s| regex::escape(s))
            .collect::<Vec<_>>()
            .join("|");
        for (fence_char, marker) in FENCES {
            let run = format!("(?P<run>{}{{3,}})", regex::escape(fence_char));
            let open = format!(r"(?i)^ {{0,3}}{run}\s*\{{?\.?(?:{alternatives})(?:[\s,}}].*)?$");
            let close = format!(r"^ {{0,3}}{run}\s*$");
            let region = Region::between(
                &open,
                &close,
                Arc::clone(grammar),
                Some(CODE_BLOCK_FORMATTING),
            )?;
            regions.push(region.with_marker(marker).with_inner_class(CODE_BLOCK));
        }
    }
    log::debug!("built {} fenced code regions", regions.len());
    Ok(regions)
}

/// The full note grammar: fenced code regions around the Zettelkasten
/// grammar, with spellchecking layered on top when a cache is given.
pub fn build_document_grammar(
    registry: &GrammarRegistry,
    options: &ZknOptions,
    spellcheck: Option<Arc<SpellcheckCache>>,
) -> Result<Arc<dyn Grammar>, GrammarError> {
    let regions = fenced_regions(registry)?;
    let zkn = ZknMode::new(options.clone());
    Ok(match spellcheck {
        Some(cache) => {
            let overlay = SpellcheckOverlay::new(cache, options.formatting_chars());
            multiplexed(Overlay::new(zkn, overlay, true), regions)
        }
        None => multiplexed(zkn, regions),
    })
}

fn multiplexed<O: Mode>(outer: O, regions: Vec<Region>) -> Arc<dyn Grammar> {
    Arc::new(Multiplex::new(outer, regions))
}
