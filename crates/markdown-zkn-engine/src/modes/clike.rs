use std::borrow::Cow;
use std::collections::HashSet;
use std::sync::OnceLock;

use regex::Regex;

use crate::grammar::{Mode, Style};
use crate::stream::StringStream;

/// Language-specific rules for the generic code grammar.
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    pub name: &'static str,
    pub keywords: HashSet<&'static str>,
    pub types: HashSet<&'static str>,
    pub atoms: HashSet<&'static str>,
    pub line_comment: &'static str,
    pub block_comment: Option<(&'static str, &'static str)>,
    pub quotes: &'static [char],
    /// Python-style `"""` strings that may span lines.
    pub triple_quotes: bool,
    /// Quote characters whose strings continue across lines (JS templates).
    pub multiline_quotes: &'static [char],
    pub has_preprocessor: bool,
}

impl LanguageConfig {
    pub fn c() -> Self {
        Self {
            name: "c",
            keywords: [
                "auto", "break", "case", "const", "continue", "default", "do", "else", "enum",
                "extern", "for", "goto", "if", "inline", "register", "restrict", "return",
                "sizeof", "static", "struct", "switch", "typedef", "union", "volatile", "while",
            ]
            .into_iter()
            .collect(),
            types: [
                "void", "char", "short", "int", "long", "float", "double", "signed", "unsigned",
                "size_t", "ssize_t", "int8_t", "int16_t", "int32_t", "int64_t", "uint8_t",
                "uint16_t", "uint32_t", "uint64_t", "bool",
            ]
            .into_iter()
            .collect(),
            atoms: ["NULL", "true", "false"].into_iter().collect(),
            line_comment: "//",
            block_comment: Some(("/*", "*/")),
            quotes: &['"', '\''],
            triple_quotes: false,
            multiline_quotes: &[],
            has_preprocessor: true,
        }
    }

    pub fn cpp() -> Self {
        let mut config = Self::c();
        config.name = "cpp";
        config.keywords.extend([
            "class", "namespace", "template", "typename", "public", "private", "protected",
            "virtual", "override", "new", "delete", "this", "using", "try", "catch", "throw",
            "constexpr", "noexcept", "operator", "friend", "explicit", "mutable", "auto",
        ]);
        config.types.extend(["string", "vector", "map", "wchar_t"]);
        config.atoms.insert("nullptr");
        config
    }

    pub fn javascript() -> Self {
        Self {
            name: "javascript",
            keywords: [
                "async", "await", "break", "case", "catch", "class", "const", "continue",
                "debugger", "default", "delete", "do", "else", "export", "extends", "finally",
                "for", "function", "if", "import", "in", "instanceof", "let", "new", "of",
                "return", "static", "super", "switch", "this", "throw", "try", "typeof", "var",
                "void", "while", "with", "yield",
            ]
            .into_iter()
            .collect(),
            types: ["Array", "Object", "String", "Number", "Boolean", "Promise", "Map", "Set"]
                .into_iter()
                .collect(),
            atoms: ["true", "false", "null", "undefined", "NaN", "Infinity"]
                .into_iter()
                .collect(),
            line_comment: "//",
            block_comment: Some(("/*", "*/")),
            quotes: &['"', '\'', '`'],
            triple_quotes: false,
            multiline_quotes: &['`'],
            has_preprocessor: false,
        }
    }

    pub fn python() -> Self {
        Self {
            name: "python",
            keywords: [
                "and", "as", "assert", "async", "await", "break", "class", "continue", "def",
                "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
                "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise",
                "return", "try", "while", "with", "yield",
            ]
            .into_iter()
            .collect(),
            types: [
                "int", "float", "str", "bool", "list", "dict", "tuple", "set", "bytes", "object",
            ]
            .into_iter()
            .collect(),
            atoms: ["True", "False", "None"].into_iter().collect(),
            line_comment: "#",
            block_comment: None,
            quotes: &['"', '\''],
            triple_quotes: true,
            multiline_quotes: &[],
            has_preprocessor: false,
        }
    }

    pub fn rust() -> Self {
        Self {
            name: "rust",
            keywords: [
                "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else",
                "enum", "extern", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod",
                "move", "mut", "pub", "ref", "return", "self", "Self", "static", "struct",
                "super", "trait", "type", "unsafe", "use", "where", "while",
            ]
            .into_iter()
            .collect(),
            types: [
                "bool", "char", "str", "String", "i8", "i16", "i32", "i64", "i128", "u8", "u16",
                "u32", "u64", "u128", "isize", "usize", "f32", "f64", "Vec", "Option", "Result",
                "Box", "Rc", "Arc",
            ]
            .into_iter()
            .collect(),
            atoms: ["true", "false", "None", "Some", "Ok", "Err"]
                .into_iter()
                .collect(),
            line_comment: "//",
            block_comment: Some(("/*", "*/")),
            quotes: &['"'],
            triple_quotes: false,
            multiline_quotes: &['"'],
            has_preprocessor: false,
        }
    }
}

/// Multi-line constructs carried from one line to the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CLikeState {
    #[default]
    Normal,
    BlockComment,
    String { quote: char, triple: bool },
}

/// A generic tokenizer for C-family and similar languages.
#[derive(Debug, Clone)]
pub struct CLikeMode {
    config: LanguageConfig,
}

impl CLikeMode {
    pub fn new(config: LanguageConfig) -> Self {
        Self { config }
    }

    pub fn c() -> Self {
        Self::new(LanguageConfig::c())
    }

    pub fn cpp() -> Self {
        Self::new(LanguageConfig::cpp())
    }

    pub fn javascript() -> Self {
        Self::new(LanguageConfig::javascript())
    }

    pub fn python() -> Self {
        Self::new(LanguageConfig::python())
    }

    pub fn rust() -> Self {
        Self::new(LanguageConfig::rust())
    }

    fn block_comment(
        &self,
        stream: &mut StringStream<'_>,
        state: &mut CLikeState,
    ) -> Option<Style> {
        let end = self.config.block_comment.map_or("*/", |(_, end)| end);
        if stream.skip_to_str(end) {
            stream.match_str(end, true);
            *state = CLikeState::Normal;
        } else {
            stream.skip_to_end();
            *state = CLikeState::BlockComment;
        }
        Some(Cow::Borrowed("comment"))
    }

    fn string(
        &self,
        stream: &mut StringStream<'_>,
        state: &mut CLikeState,
        quote: char,
        triple: bool,
    ) -> Option<Style> {
        let mut closed = false;
        while let Some(c) = stream.bump() {
            if c == '\\' {
                stream.bump();
                continue;
            }
            if c != quote {
                continue;
            }
            if !triple {
                closed = true;
                break;
            }
            let mut closer = [0u8; 4];
            let closer = quote.encode_utf8(&mut closer).repeat(2);
            if stream.match_str(&closer, true) {
                closed = true;
                break;
            }
        }
        *state = if closed || !(triple || self.config.multiline_quotes.contains(&quote)) {
            CLikeState::Normal
        } else {
            CLikeState::String { quote, triple }
        };
        Some(Cow::Borrowed("string"))
    }
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(
            r"^(?:0[xX][0-9a-fA-F_]+|0[bB][01_]+|0[oO][0-7_]+|\d[\d_]*(?:\.\d[\d_]*)?(?:[eE][+-]?\d+)?)[A-Za-z0-9_]*",
        )
        .expect("Invalid number regex")
    })
}

fn identifier_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[A-Za-z_$][\w$]*").expect("Invalid identifier regex"))
}

impl Mode for CLikeMode {
    type State = CLikeState;

    fn name(&self) -> &str {
        self.config.name
    }

    fn start_state(&self) -> CLikeState {
        CLikeState::Normal
    }

    fn token(&self, stream: &mut StringStream<'_>, state: &mut CLikeState) -> Option<Style> {
        match *state {
            CLikeState::BlockComment => return self.block_comment(stream, state),
            CLikeState::String { quote, triple } => {
                return self.string(stream, state, quote, triple);
            }
            CLikeState::Normal => {}
        }

        if stream.eat_while(char::is_whitespace) {
            return None;
        }

        if stream.match_str(self.config.line_comment, true) {
            stream.skip_to_end();
            return Some(Cow::Borrowed("comment"));
        }
        if let Some((start, _)) = self.config.block_comment
            && stream.match_str(start, true)
        {
            return self.block_comment(stream, state);
        }

        if self.config.has_preprocessor
            && stream.peek() == Some('#')
            && stream.text()[..stream.pos()].trim().is_empty()
        {
            stream.skip_to_end();
            return Some(Cow::Borrowed("meta"));
        }

        if let Some(quote) = stream.peek().filter(|c| self.config.quotes.contains(c)) {
            let mut triple = [0u8; 4];
            let triple = quote.encode_utf8(&mut triple).repeat(3);
            if self.config.triple_quotes && stream.match_str(&triple, true) {
                return self.string(stream, state, quote, true);
            }
            stream.bump();
            return self.string(stream, state, quote, false);
        }

        if stream.match_regex(number_regex(), true).is_some() {
            return Some(Cow::Borrowed("number"));
        }

        if let Some(word) = stream.match_regex(identifier_regex(), true) {
            let style = if self.config.keywords.contains(word) {
                "keyword"
            } else if self.config.atoms.contains(word) {
                "atom"
            } else if self.config.types.contains(word) {
                "type"
            } else {
                "variable"
            };
            return Some(Cow::Borrowed(style));
        }

        match stream.bump() {
            Some('(' | ')' | '[' | ']' | '{' | '}') => Some(Cow::Borrowed("bracket")),
            Some(
                '+' | '-' | '*' | '/' | '%' | '=' | '<' | '>' | '!' | '&' | '|' | '^' | '~' | '?',
            ) => {
                stream.eat_while(|c| "+-*/%=<>!&|^~?".contains(c));
                Some(Cow::Borrowed("operator"))
            }
            _ => None,
        }
    }
}
