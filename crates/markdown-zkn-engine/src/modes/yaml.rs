use std::borrow::Cow;
use std::sync::OnceLock;

use regex::Regex;

use crate::grammar::{Mode, Style};
use crate::stream::StringStream;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct YamlState {
    /// Indentation of the key that opened a `|` or `>` block scalar.
    pub block_scalar: Option<usize>,
    /// A `key:` was seen on the current line.
    pub in_value: bool,
    /// Nesting of `[` and `{` flow collections.
    pub flow_depth: usize,
}

/// Tokenizer for YAML, used for frontmatter and `yaml` fences.
#[derive(Debug, Clone, Copy, Default)]
pub struct YamlMode;

fn key_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^("[^"]*"|'[^']*'|[^\s:#"'\[\]{},-][^:#]*?|-[^\s:#][^:#]*?)[ \t]*:(?:[ \t]|$)"#)
            .expect("Invalid YAML key regex")
    })
}

fn block_scalar_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[ \t]*[|>][+-]?\d*[ \t]*(?:#.*)?$").expect("Invalid YAML block regex")
    })
}

fn number_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^[-+]?(?:0x[0-9a-fA-F]+|0o[0-7]+|\d+(?:\.\d+)?(?:[eE][-+]?\d+)?|\.inf|\.nan)")
            .expect("Invalid YAML number regex")
    })
}

fn keyword_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^(?i:true|false|yes|no|null|on|off|~)").expect("Invalid YAML keyword regex")
    })
}

fn string_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r#"^(?:"(?:[^"\\]|\\.)*"?|'(?:[^']|'')*'?)"#).expect("Invalid YAML string regex")
    })
}

fn anchor_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^[&*][\w-]+").expect("Invalid YAML anchor regex"))
}

/// True when the scalar just matched ends at a plain-scalar boundary.
fn at_scalar_end(stream: &StringStream<'_>) -> bool {
    match stream.peek() {
        None => true,
        Some(c) => c.is_whitespace() || matches!(c, ',' | ']' | '}' | '#'),
    }
}

fn indentation(line: &str) -> usize {
    line.len() - line.trim_start_matches(' ').len()
}

impl Mode for YamlMode {
    type State = YamlState;

    fn name(&self) -> &str {
        "yaml"
    }

    fn start_state(&self) -> YamlState {
        YamlState::default()
    }

    fn token(&self, stream: &mut StringStream<'_>, state: &mut YamlState) -> Option<Style> {
        if stream.sol() {
            state.in_value = false;
            if let Some(indent) = state.block_scalar {
                let line = stream.text();
                if line.trim().is_empty() || indentation(line) > indent {
                    stream.skip_to_end();
                    return Some(Cow::Borrowed("string"));
                }
                state.block_scalar = None;
            }
        }

        if stream.eat_while(char::is_whitespace) {
            return None;
        }

        if stream.peek() == Some('#')
            && stream.preceding_char().is_none_or(char::is_whitespace)
        {
            stream.skip_to_end();
            return Some(Cow::Borrowed("comment"));
        }

        if stream.sol() && (stream.match_str("---", false) || stream.match_str("...", false)) {
            let line = stream.text().trim_end();
            if line == "---" || line == "..." {
                stream.skip_to_end();
                return Some(Cow::Borrowed("def"));
            }
        }

        if !state.in_value && state.flow_depth == 0 {
            if stream.peek() == Some('-') {
                let after = stream.rest()[1..].chars().next();
                if after.is_none_or(char::is_whitespace) {
                    stream.bump();
                    return Some(Cow::Borrowed("meta"));
                }
            }
            if let Some(caps) = stream.captures(key_regex(), false)
                && let Some(key) = caps.get(1)
            {
                stream.set_pos(stream.pos() + key.end());
                return Some(Cow::Borrowed("atom"));
            }
        }

        if stream.eat(':') {
            state.in_value = true;
            if block_scalar_regex().is_match(stream.rest()) {
                state.block_scalar = Some(indentation(stream.text()));
            }
            return Some(Cow::Borrowed("meta"));
        }

        if stream.match_regex(string_regex(), true).is_some() {
            return Some(Cow::Borrowed("string"));
        }

        if stream.match_regex(anchor_regex(), true).is_some() {
            return Some(Cow::Borrowed("variable-2"));
        }

        if let Some(c) = stream.peek()
            && matches!(c, '[' | '{' | ']' | '}' | ',')
        {
            stream.bump();
            match c {
                '[' | '{' => state.flow_depth += 1,
                ']' | '}' => state.flow_depth = state.flow_depth.saturating_sub(1),
                _ => {}
            }
            return Some(Cow::Borrowed("meta"));
        }

        if state.block_scalar.is_some() && (stream.eat('|') || stream.eat('>')) {
            stream.eat_while(|c| c == '+' || c == '-' || c.is_ascii_digit());
            return Some(Cow::Borrowed("meta"));
        }

        let start = stream.pos();
        if stream.match_regex(number_regex(), true).is_some() {
            if at_scalar_end(stream) {
                return Some(Cow::Borrowed("number"));
            }
            stream.set_pos(start);
        }
        if stream.match_regex(keyword_regex(), true).is_some() {
            if at_scalar_end(stream) {
                return Some(Cow::Borrowed("keyword"));
            }
            stream.set_pos(start);
        }

        let in_flow = state.flow_depth > 0;
        if !stream.eat_while(|c| !c.is_whitespace() && !(in_flow && matches!(c, ',' | ']' | '}')))
        {
            stream.bump();
        }
        None
    }

    fn blank_line(&self, state: &mut YamlState) {
        state.in_value = false;
    }
}
