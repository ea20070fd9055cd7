use std::collections::HashMap;
use std::sync::Arc;

use crate::error::GrammarError;
use crate::grammar::Grammar;
use crate::modes::{CLikeMode, MarkdownMode, PlainMode, TexMode, YamlMode};

/// Handle for a grammar stored in a [`GrammarRegistry`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GrammarId(usize);

/// Named grammars plus the language selectors that resolve to them.
///
/// Selectors are the words written after a code fence (`js`, `c++`) or MIME
/// types (`text/x-python`). Lookup is case-insensitive.
#[derive(Clone, Default)]
pub struct GrammarRegistry {
    grammars: Vec<Arc<dyn Grammar>>,
    names: HashMap<String, GrammarId>,
    selectors: HashMap<String, GrammarId>,
}

impl std::fmt::Debug for GrammarRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GrammarRegistry")
            .field("names", &self.names)
            .field("selectors", &self.selectors)
            .finish()
    }
}

impl GrammarRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry holding the grammars shipped with this crate and their
    /// usual fence selectors.
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        let builtin: [(Arc<dyn Grammar>, &[&str]); 9] = [
            (
                Arc::new(MarkdownMode),
                &["markdown", "md", "text/markdown", "text/x-markdown"],
            ),
            (Arc::new(YamlMode), &["yaml", "yml", "text/x-yaml"]),
            (
                Arc::new(TexMode),
                &["stex", "tex", "latex", "text/x-stex", "text/x-latex"],
            ),
            (
                Arc::new(CLikeMode::javascript()),
                &["javascript", "js", "node", "text/javascript"],
            ),
            (Arc::new(CLikeMode::c()), &["c", "h", "text/x-csrc"]),
            (
                Arc::new(CLikeMode::cpp()),
                &["cpp", "c++", "cxx", "hpp", "text/x-c++src"],
            ),
            (
                Arc::new(CLikeMode::python()),
                &["python", "py", "text/x-python"],
            ),
            (Arc::new(CLikeMode::rust()), &["rust", "rs", "text/x-rustsrc"]),
            (Arc::new(PlainMode), &["text", "plain", "txt", "text/plain"]),
        ];
        for (grammar, selectors) in builtin {
            let id = registry.register(grammar);
            for selector in selectors {
                registry.insert_selector(selector, id);
            }
        }
        registry
    }

    /// Stores `grammar` under its own name, replacing an earlier grammar of
    /// the same name.
    pub fn register(&mut self, grammar: Arc<dyn Grammar>) -> GrammarId {
        let name = grammar.grammar_name().to_lowercase();
        if let Some(&id) = self.names.get(&name) {
            self.grammars[id.0] = grammar;
            return id;
        }
        let id = GrammarId(self.grammars.len());
        self.grammars.push(grammar);
        self.names.insert(name.clone(), id);
        self.selectors.insert(name, id);
        id
    }

    /// Makes `selector` resolve to the grammar registered as `name`.
    pub fn alias(&mut self, selector: &str, name: &str) -> Result<GrammarId, GrammarError> {
        let id = self
            .id_of(name)
            .ok_or_else(|| GrammarError::UnknownGrammar(name.to_string()))?;
        self.insert_selector(selector, id);
        Ok(id)
    }

    fn insert_selector(&mut self, selector: &str, id: GrammarId) {
        self.selectors.insert(normalize(selector), id);
    }

    pub fn id_of(&self, name: &str) -> Option<GrammarId> {
        self.names.get(&normalize(name)).copied()
    }

    pub fn get(&self, id: GrammarId) -> Option<&Arc<dyn Grammar>> {
        self.grammars.get(id.0)
    }

    pub fn by_name(&self, name: &str) -> Option<&Arc<dyn Grammar>> {
        self.id_of(name).and_then(|id| self.get(id))
    }

    /// Resolves a fence word or MIME type.
    pub fn resolve(&self, selector: &str) -> Option<&Arc<dyn Grammar>> {
        self.selectors
            .get(&normalize(selector))
            .and_then(|&id| self.get(id))
    }

    /// Every grammar with the selectors that reach it, in registration order.
    /// MIME-style selectors are left out since they never appear after a fence.
    pub fn fence_selectors(&self) -> Vec<(GrammarId, Vec<&str>)> {
        let mut grouped: Vec<(GrammarId, Vec<&str>)> = (0..self.grammars.len())
            .map(|i| (GrammarId(i), Vec::new()))
            .collect();
        for (selector, id) in &self.selectors {
            if !selector.contains('/') {
                grouped[id.0].1.push(selector.as_str());
            }
        }
        for (_, selectors) in &mut grouped {
            // Longer words first so `cpp` is tried before `c`.
            selectors.sort_by(|a, b| b.len().cmp(&a.len()).then(a.cmp(b)));
        }
        grouped.retain(|(_, selectors)| !selectors.is_empty());
        grouped
    }

    pub fn len(&self) -> usize {
        self.grammars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.grammars.is_empty()
    }
}

fn normalize(selector: &str) -> String {
    selector.trim().to_lowercase()
}
