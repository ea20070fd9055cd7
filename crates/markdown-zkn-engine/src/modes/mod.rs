//! Base grammars used on their own or nested inside the Zettelkasten grammar.

mod clike;
mod markdown;
mod plain;
mod tex;
mod yaml;

pub use clike::{CLikeMode, CLikeState, LanguageConfig};
pub use markdown::{MarkdownMode, MarkdownState};
pub use plain::PlainMode;
pub use tex::{TexMode, TexState};
pub use yaml::{YamlMode, YamlState};
