//! Locator labels and the words that introduce them.

use std::sync::OnceLock;

pub const DEFAULT_LABEL: &str = "page";

/// Every label with its English, German, French and Spanish synonyms and
/// abbreviations, matched case-insensitively.
pub const LABELS: &[(&str, &[&str])] = &[
    (
        "book",
        &["book", "books", "bk.", "bks.", "buch", "bücher", "livre", "livres", "libro", "libros"],
    ),
    (
        "chapter",
        &[
            "chapter", "chapters", "chap.", "chaps.", "ch.", "chs.", "kapitel", "kap.", "chapitre",
            "chapitres", "chap", "capítulo", "capítulos", "cap.",
        ],
    ),
    (
        "column",
        &[
            "column", "columns", "col.", "cols.", "spalte", "spalten", "sp.", "colonne", "colonnes",
            "columna", "columnas",
        ],
    ),
    (
        "figure",
        &[
            "figure", "figures", "fig.", "figs.", "abbildung", "abbildungen", "abb.", "figura",
            "figuras",
        ],
    ),
    ("folio", &["folio", "folios", "fol.", "fols.", "fo.", "fos."]),
    (
        "issue",
        &[
            "issue", "issues", "no.", "nos.", "nr.", "heft", "numéro", "numéros", "número",
            "números", "núm.",
        ],
    ),
    (
        "line",
        &[
            "line", "lines", "l.", "ll.", "zeile", "zeilen", "z.", "ligne", "lignes", "línea",
            "líneas",
        ],
    ),
    (
        "note",
        &[
            "note", "notes", "n.", "nn.", "anmerkung", "anmerkungen", "anm.", "fußnote", "nota",
            "notas",
        ],
    ),
    ("opus", &["opus", "opera", "op.", "opp."]),
    (
        "page",
        &[
            "page", "pages", "p.", "pp.", "seite", "seiten", "s.", "pagina", "página", "páginas",
            "pág.", "págs.",
        ],
    ),
    (
        "paragraph",
        &[
            "paragraph", "paragraphs", "para.", "paras.", "¶", "¶¶", "§", "§§", "absatz", "absätze",
            "abs.", "paragraphe", "paragraphes", "párrafo", "párrafos",
        ],
    ),
    (
        "part",
        &["part", "parts", "pt.", "pts.", "teil", "teile", "partie", "parties", "parte", "partes"],
    ),
    (
        "section",
        &[
            "section", "sections", "sec.", "secs.", "sect.", "abschnitt", "abschnitte", "sección",
            "secciones",
        ],
    ),
    ("sub verbo", &["sub verbo", "sub verbis", "s.v.", "s.vv.", "s. v.", "s. vv."]),
    ("verse", &["verse", "verses", "v.", "vv.", "vers", "verso", "versos", "vs."]),
    (
        "volume",
        &[
            "volume", "volumes", "vol.", "vols.", "band", "bände", "bd.", "bde.", "tome", "tomes",
            "volumen", "volúmenes",
        ],
    ),
];

/// `(synonym, label)` pairs, longest synonym first.
fn synonyms() -> &'static [(&'static str, &'static str)] {
    static SYNONYMS: OnceLock<Vec<(&'static str, &'static str)>> = OnceLock::new();
    SYNONYMS.get_or_init(|| {
        let mut all: Vec<_> = LABELS
            .iter()
            .flat_map(|(label, words)| words.iter().map(move |word| (*word, *label)))
            .collect();
        all.sort_by(|a, b| b.0.chars().count().cmp(&a.0.chars().count()).then(a.0.cmp(b.0)));
        all
    })
}

/// Byte length of the prefix of `text` equal to `prefix` ignoring case.
fn strip_prefix_ignore_case(text: &str, prefix: &str) -> Option<usize> {
    let mut chars = text.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = chars.next()?;
        if !actual.to_lowercase().eq(expected.to_lowercase()) {
            return None;
        }
    }
    Some(chars.next().map_or(text.len(), |(i, _)| i))
}

/// The label introduced at the start of `text` and the byte length of the
/// synonym that introduced it.
///
/// The longest synonym wins. A synonym ending in a letter must not be
/// followed by another letter, so `page` matches in `page 4` but not in
/// `pageant`.
pub fn match_label(text: &str) -> Option<(&'static str, usize)> {
    synonyms().iter().find_map(|&(synonym, label)| {
        let len = strip_prefix_ignore_case(text, synonym)?;
        let ends_in_letter = synonym.chars().next_back().is_some_and(char::is_alphabetic);
        let followed_by_letter = text[len..].chars().next().is_some_and(char::is_alphabetic);
        (!(ends_in_letter && followed_by_letter)).then_some((label, len))
    })
}

/// The canonical label names.
pub fn label_names() -> impl Iterator<Item = &'static str> {
    LABELS.iter().map(|(label, _)| *label)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    #[rstest]
    #[case("p. 33", Some(("page", 2)))]
    #[case("pp. 33-35", Some(("page", 3)))]
    #[case("Chap. 4", Some(("chapter", 5)))]
    #[case("s.v. word", Some(("sub verbo", 4)))]
    #[case("S. 12", Some(("page", 2)))]
    #[case("§ 3", Some(("paragraph", 2)))]
    #[case("vol. 2", Some(("volume", 4)))]
    #[case("página 7", Some(("page", 7)))]
    #[case("pageant", None)]
    #[case("and more", None)]
    fn matches_longest_synonym(#[case] text: &str, #[case] expected: Option<(&str, usize)>) {
        assert_eq!(match_label(text), expected);
    }

    #[test]
    fn every_synonym_is_lowercase_or_symbolic() {
        for (_, words) in LABELS {
            for word in *words {
                assert_eq!(word.to_lowercase(), *word);
            }
        }
    }

    #[test]
    fn label_names_are_unique() {
        let mut names: Vec<_> = label_names().collect();
        let count = names.len();
        names.dedup();
        assert_eq!(names.len(), count);
        assert!(names.contains(&DEFAULT_LABEL));
    }
}
