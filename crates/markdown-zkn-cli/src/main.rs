use anyhow::{Context, Result, anyhow};
use markdown_zkn_citations::{CitePosition, extract_citations};
use markdown_zkn_config::Config;
use markdown_zkn_engine::{
    GrammarRegistry, Highlighter, HunspellOracle, SpellcheckCache, TokenSpan, ZknOptions,
    build_document_grammar,
};
use std::path::{Path, PathBuf};
use std::{env, fs, process, sync::Arc};

const USAGE: &str = "Usage: markdown-zkn-cli <file> [--config <path>] [--citations] \
                     [--no-spellcheck] [--dictionary <path>]";

#[derive(Debug, Default, PartialEq)]
struct Args {
    file: PathBuf,
    config: Option<PathBuf>,
    citations: bool,
    no_spellcheck: bool,
    dictionary: Option<PathBuf>,
}

impl Args {
    fn parse<I: IntoIterator<Item = String>>(args: I) -> Result<Self, String> {
        let mut file = None;
        let mut parsed = Args::default();
        let mut args = args.into_iter();
        while let Some(arg) = args.next() {
            match arg.as_str() {
                "--config" => {
                    let path = args.next().ok_or("--config needs a path")?;
                    parsed.config = Some(PathBuf::from(path));
                }
                "--dictionary" => {
                    let path = args.next().ok_or("--dictionary needs a path")?;
                    parsed.dictionary = Some(PathBuf::from(path));
                }
                "--citations" => parsed.citations = true,
                "--no-spellcheck" => parsed.no_spellcheck = true,
                flag if flag.starts_with("--") => return Err(format!("unknown option {flag}")),
                _ if file.is_some() => return Err(format!("unexpected argument {arg}")),
                _ => file = Some(PathBuf::from(&arg)),
            }
        }
        parsed.file = file.ok_or("no input file given")?;
        Ok(parsed)
    }
}

fn load_config(args: &Args) -> Result<Config> {
    match &args.config {
        Some(path) => Config::load_from_path(path)?
            .ok_or_else(|| anyhow!("No config file at {}", path.display())),
        None => {
            log::debug!("Config path: {}", Config::config_path().display());
            Ok(Config::load_or_default()?)
        }
    }
}

/// The dictionary oracle, or `None` when spellchecking is off or there is no
/// dictionary to check against.
fn load_oracle(args: &Args, config: &Config) -> Result<Option<HunspellOracle>> {
    if args.no_spellcheck || !config.spellcheck {
        return Ok(None);
    }
    let Some(path) = args.dictionary.as_ref().or(config.dictionary.as_ref()) else {
        log::info!("No dictionary configured, spellcheck disabled");
        return Ok(None);
    };
    read_dictionary(path).map(Some)
}

/// Reads a Hunspell `.aff`/`.dic` pair. `path` may name either file or their
/// common stem.
fn read_dictionary(path: &Path) -> Result<HunspellOracle> {
    let aff_path = path.with_extension("aff");
    let dic_path = path.with_extension("dic");
    let aff = fs::read_to_string(&aff_path)
        .with_context(|| format!("Failed to read affix file {}", aff_path.display()))?;
    let dic = fs::read_to_string(&dic_path)
        .with_context(|| format!("Failed to read dictionary {}", dic_path.display()))?;
    let oracle = HunspellOracle::new(&aff, &dic)
        .with_context(|| format!("Invalid dictionary {}", dic_path.display()))?;
    log::info!("Loaded dictionary {}", dic_path.display());
    Ok(oracle)
}

fn format_tokens(line: usize, tokens: &[TokenSpan]) -> Vec<String> {
    tokens
        .iter()
        .map(|token| {
            format!(
                "line {}: [{}..{}] {}",
                line + 1,
                token.from,
                token.to,
                token.class.as_deref().unwrap_or("-")
            )
        })
        .collect()
}

fn format_citation(line: usize, position: &CitePosition) -> String {
    let items: Vec<String> = position
        .citations
        .iter()
        .map(|item| {
            let mut out = String::new();
            if item.suppress_author {
                out.push('-');
            }
            out.push('@');
            out.push_str(&item.id);
            if let Some(locator) = &item.locator {
                out.push_str(&format!(" {} {locator}", item.label));
            }
            if let Some(suffix) = &item.suffix {
                out.push_str(&format!(" ({suffix})"));
            }
            out
        })
        .collect();
    format!(
        "line {}: [{}..{}] {} {}",
        line + 1,
        position.from,
        position.to,
        if position.composite { "in-text" } else { "cluster" },
        items.join("; ")
    )
}

fn run(args: Args) -> Result<()> {
    let config = load_config(&args)?;
    let text = fs::read_to_string(&args.file)
        .with_context(|| format!("Failed to read {}", args.file.display()))?;

    let mut registry = GrammarRegistry::with_builtin();
    for (selector, name) in &config.code_languages {
        registry
            .alias(selector, name)
            .with_context(|| format!("Bad code_languages entry {selector} = {name}"))?;
    }
    let options = ZknOptions::new(
        config.link_start.clone(),
        config.link_end.clone(),
        &config.id_pattern,
        &config.formatting_chars,
    )?;

    let oracle = load_oracle(&args, &config)?;
    let cache = oracle.as_ref().map(|_| Arc::new(SpellcheckCache::new()));
    let grammar = build_document_grammar(&registry, &options, cache.clone())?;

    let mut highlighter = Highlighter::new(grammar, &text);
    let count = highlighter.line_count();
    highlighter.highlight(0..count);

    if let (Some(oracle), Some(cache)) = (&oracle, &cache) {
        let misses = cache.take_misses();
        if !misses.is_empty() {
            cache.prewarm(oracle, misses);
            highlighter.invalidate_all();
        }
    }

    for (line, tokens) in highlighter.highlight(0..count).iter().enumerate() {
        for row in format_tokens(line, tokens) {
            println!("{row}");
        }
    }

    if args.citations {
        for (line, content) in text.lines().enumerate() {
            for position in extract_citations(content) {
                println!("{}", format_citation(line, &position));
            }
        }
    }

    Ok(())
}

fn main() -> Result<()> {
    env_logger::Builder::from_default_env()
        .filter_level(log::LevelFilter::Info)
        .init();

    let args = match Args::parse(env::args().skip(1)) {
        Ok(args) => args,
        Err(message) => {
            eprintln!("Error: {message}");
            eprintln!("{USAGE}");
            process::exit(1);
        }
    };

    run(args)
}

#[cfg(test)]
mod tests {
    use super::*;
    use markdown_zkn_citations::CiteItem;
    use markdown_zkn_engine::SpellOracle;
    use tempfile::TempDir;

    fn args(list: &[&str]) -> Result<Args, String> {
        Args::parse(list.iter().map(|arg| arg.to_string()))
    }

    #[test]
    fn parses_flags_in_any_order() {
        let parsed = args(&["--citations", "note.md", "--dictionary", "words.txt"]).unwrap();
        assert_eq!(
            parsed,
            Args {
                file: PathBuf::from("note.md"),
                citations: true,
                dictionary: Some(PathBuf::from("words.txt")),
                ..Args::default()
            }
        );
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(args(&[]).is_err());
        assert!(args(&["a.md", "b.md"]).is_err());
        assert!(args(&["a.md", "--config"]).is_err());
        assert!(args(&["a.md", "--verbose"]).is_err());
    }

    #[test]
    fn dictionary_pair_is_read_with_affixes() {
        let temp_dir = TempDir::new().unwrap();
        let aff = "SET UTF-8\nSFX S Y 1\nSFX S 0 s .\n";
        fs::write(temp_dir.path().join("en.aff"), aff).unwrap();
        fs::write(temp_dir.path().join("en.dic"), "1\ncat/S\n").unwrap();

        for name in ["en.dic", "en.aff", "en"] {
            let oracle = read_dictionary(&temp_dir.path().join(name)).unwrap();
            assert!(oracle.check("cats").unwrap());
            assert!(!oracle.check("dogs").unwrap());
        }
    }

    #[test]
    fn missing_affix_file_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("en.dic"), "1\ncat\n").unwrap();
        let err = read_dictionary(&temp_dir.path().join("en.dic")).unwrap_err();
        assert!(err.to_string().contains("affix file"));
    }

    #[test]
    fn no_dictionary_means_no_spellcheck() {
        let parsed = args(&["note.md"]).unwrap();
        assert!(load_oracle(&parsed, &Config::default()).unwrap().is_none());
        let parsed = args(&["note.md", "--no-spellcheck", "--dictionary", "missing.dic"]).unwrap();
        assert!(load_oracle(&parsed, &Config::default()).unwrap().is_none());
    }

    #[test]
    fn unclassed_tokens_print_a_dash() {
        let tokens = vec![
            TokenSpan {
                from: 0,
                to: 2,
                class: Some("header header-1".into()),
            },
            TokenSpan {
                from: 2,
                to: 5,
                class: None,
            },
        ];
        assert_eq!(
            format_tokens(2, &tokens),
            vec!["line 3: [0..2] header header-1", "line 3: [2..5] -"]
        );
    }

    #[test]
    fn citation_rows_show_locator_and_suffix() {
        let position = CitePosition {
            from: 4,
            to: 30,
            source: "[-@doe99, p. 4, emphasis added]".to_string(),
            composite: false,
            citations: vec![CiteItem {
                id: "doe99".to_string(),
                prefix: Some(String::new()),
                suffix: Some("emphasis added".to_string()),
                locator: Some("4".to_string()),
                label: "page".to_string(),
                suppress_author: true,
            }],
        };
        assert_eq!(
            format_citation(0, &position),
            "line 1: [4..30] cluster -@doe99 page 4 (emphasis added)"
        );
    }
}
