use regex::Regex;

use crate::error::GrammarError;

/// User-configurable parts of the Zettelkasten grammar.
#[derive(Debug, Clone)]
pub struct ZknOptions {
    link_start: String,
    link_end: String,
    id_pattern: String,
    id_anchored: Regex,
    id_search: Regex,
    formatting_chars: String,
    tag: Regex,
}

impl ZknOptions {
    pub const DEFAULT_LINK_START: &'static str = "[[";
    pub const DEFAULT_LINK_END: &'static str = "]]";
    pub const DEFAULT_ID_PATTERN: &'static str = r"(\d{14})";
    /// Characters that end a tag or a spellchecked word.
    pub const DEFAULT_FORMATTING_CHARS: &'static str =
        r#",.:;…!?"'`»«“”‘’—–@$%&*#^+~÷\/|§=<>(){}[]"#;

    /// Builds options from raw settings.
    ///
    /// An identifier pattern without a capture group is wrapped in one, so
    /// capture group 1 always holds the identifier. A pattern that does not
    /// compile is logged and replaced by [`Self::DEFAULT_ID_PATTERN`].
    pub fn new(
        link_start: impl Into<String>,
        link_end: impl Into<String>,
        id_pattern: &str,
        formatting_chars: &str,
    ) -> Result<Self, GrammarError> {
        let link_start = link_start.into();
        let link_end = link_end.into();
        if link_start.is_empty() {
            return Err(GrammarError::EmptyLinkToken { which: "start" });
        }
        if link_end.is_empty() {
            return Err(GrammarError::EmptyLinkToken { which: "end" });
        }

        let (id_pattern, id_anchored, id_search) =
            compile_id_pattern(id_pattern).unwrap_or_else(|err| {
                log::warn!(
                    "invalid identifier pattern {id_pattern:?}, using {:?}: {err}",
                    Self::DEFAULT_ID_PATTERN
                );
                compile_id_pattern(Self::DEFAULT_ID_PATTERN)
                    .expect("Invalid default identifier pattern")
            });

        let excluded: String = formatting_chars
            .chars()
            .filter(|c| !c.is_whitespace())
            .map(|c| regex::escape(c.encode_utf8(&mut [0u8; 4])))
            .collect();
        let tag = Regex::new(&format!(r"^#[^\s#{excluded}]+"))
            .map_err(GrammarError::InvalidFormattingChars)?;

        Ok(Self {
            link_start,
            link_end,
            id_pattern,
            id_anchored,
            id_search,
            formatting_chars: formatting_chars.to_string(),
            tag,
        })
    }

    pub fn link_start(&self) -> &str {
        &self.link_start
    }

    pub fn link_end(&self) -> &str {
        &self.link_end
    }

    /// The identifier pattern after normalisation.
    pub fn id_pattern(&self) -> &str {
        &self.id_pattern
    }

    pub fn formatting_chars(&self) -> &str {
        &self.formatting_chars
    }

    pub fn is_formatting_char(&self, c: char) -> bool {
        self.formatting_chars.contains(c)
    }

    /// First identifier anywhere in `text`.
    pub fn find_identifier<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.id_search
            .captures(text)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str())
    }

    /// Length of an identifier starting exactly at the beginning of `text`.
    pub(crate) fn identifier_len(&self, text: &str) -> Option<usize> {
        self.id_anchored
            .find(text)
            .map(|m| m.end())
            .filter(|&len| len > 0)
    }

    pub(crate) fn tag_regex(&self) -> &Regex {
        &self.tag
    }
}

/// The normalised pattern, its anchored form and its search form.
fn compile_id_pattern(pattern: &str) -> Result<(String, Regex, Regex), regex::Error> {
    let raw = Regex::new(pattern)?;
    let pattern = if raw.captures_len() > 1 {
        pattern.to_string()
    } else {
        format!("({pattern})")
    };
    let anchored = Regex::new(&format!("^(?:{pattern})"))?;
    let search = Regex::new(&pattern)?;
    Ok((pattern, anchored, search))
}

impl Default for ZknOptions {
    fn default() -> Self {
        Self::new(
            Self::DEFAULT_LINK_START,
            Self::DEFAULT_LINK_END,
            Self::DEFAULT_ID_PATTERN,
            Self::DEFAULT_FORMATTING_CHARS,
        )
        .expect("Invalid default Zettelkasten options")
    }
}
