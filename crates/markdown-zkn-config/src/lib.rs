use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {config_path}: {source}")]
    ConfigReadError {
        config_path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file at {config_path}: {source}")]
    ConfigParseError {
        config_path: PathBuf,
        source: toml::de::Error,
    },
}

/// User settings for the Zettelkasten grammar.
///
/// Every field is optional in the file; missing ones take the defaults below.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Token that opens a wiki link.
    pub link_start: String,
    /// Token that closes a wiki link.
    pub link_end: String,
    /// Regex for note identifiers. Capture group 1 is the identifier.
    pub id_pattern: String,
    /// Characters that end a hashtag or a spellchecked word.
    pub formatting_chars: String,
    pub spellcheck: bool,
    /// Hunspell dictionary for the spellchecker: the `.dic` file, with its
    /// `.aff` file next to it.
    pub dictionary: Option<PathBuf>,
    /// Extra fence words, mapped to a grammar name (`ts = "javascript"`).
    pub code_languages: BTreeMap<String, String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            link_start: "[[".to_string(),
            link_end: "]]".to_string(),
            id_pattern: r"(\d{14})".to_string(),
            formatting_chars: r#",.:;…!?"'`»«“”‘’—–@$%&*#^+~÷\/|§=<>(){}[]"#.to_string(),
            spellcheck: true,
            dictionary: None,
            code_languages: BTreeMap::new(),
        }
    }
}

impl Config {
    pub fn load_from_path<P: AsRef<Path>>(config_path: P) -> Result<Option<Self>, ConfigError> {
        let config_path = config_path.as_ref();
        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(config_path).map_err(|source| {
            ConfigError::ConfigReadError {
                config_path: config_path.to_path_buf(),
                source,
            }
        })?;

        let mut config: Config =
            toml::from_str(&content).map_err(|source| ConfigError::ConfigParseError {
                config_path: config_path.to_path_buf(),
                source,
            })?;

        config.dictionary = config
            .dictionary
            .map(|path| Self::expand_path(&path).unwrap_or(path));

        Ok(Some(config))
    }

    pub fn load() -> Result<Option<Self>, ConfigError> {
        let config_path = Self::config_path();
        Self::load_from_path(&config_path)
    }

    /// Like [`Config::load`], but falls back to the defaults when there is
    /// no config file.
    pub fn load_or_default() -> Result<Self, ConfigError> {
        Ok(Self::load()?.unwrap_or_default())
    }

    pub fn save_to_path<P: AsRef<Path>>(&self, config_path: P) -> anyhow::Result<()> {
        let config_path = config_path.as_ref();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(config_path, content)?;
        Ok(())
    }

    pub fn save(&self) -> anyhow::Result<()> {
        let config_path = Self::config_path();
        self.save_to_path(&config_path)
    }

    pub fn config_path() -> PathBuf {
        let config_dir = shellexpand::tilde("~/.config/markdown-zkn");
        PathBuf::from(config_dir.as_ref()).join("config.toml")
    }

    fn expand_path(path: &Path) -> Option<PathBuf> {
        let path_str = path.to_string_lossy();
        shellexpand::full(&path_str)
            .ok()
            .map(|expanded| PathBuf::from(expanded.as_ref()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use tempfile::TempDir;

    #[test]
    fn test_config_path() {
        let config_path = Config::config_path();
        let path_str = config_path.to_string_lossy();

        assert!(!path_str.starts_with('~'));
        assert!(path_str.ends_with(".config/markdown-zkn/config.toml"));
    }

    #[test]
    fn test_empty_file_gives_defaults() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config, Config::default());
        assert!(config.spellcheck);
        assert_eq!(config.link_start, "[[");
    }

    #[test]
    fn test_partial_file_keeps_other_defaults() {
        let config: Config = toml::from_str(
            r#"
link_start = "<<"
link_end = ">>"
spellcheck = false

[code_languages]
ts = "javascript"
"#,
        )
        .unwrap();

        assert_eq!(config.link_start, "<<");
        assert_eq!(config.link_end, ">>");
        assert!(!config.spellcheck);
        assert_eq!(config.id_pattern, Config::default().id_pattern);
        assert_eq!(
            config.code_languages.get("ts").map(String::as_str),
            Some("javascript")
        );
    }

    #[test]
    fn test_expand_path_with_tilde() {
        let expanded = Config::expand_path(Path::new("~/words.txt")).unwrap();
        assert!(!expanded.to_string_lossy().starts_with('~'));
        assert!(expanded.to_string_lossy().ends_with("words.txt"));
    }

    #[test]
    fn test_expand_path_with_relative_path() {
        let path = PathBuf::from("relative/words.txt");
        assert_eq!(Config::expand_path(&path).unwrap(), path);
    }

    #[test]
    fn test_dictionary_env_var_is_expanded_on_load() {
        unsafe {
            env::set_var("ZKN_DICT_ROOT", "/custom/dicts");
        }
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "dictionary = \"$ZKN_DICT_ROOT/en.txt\"\n").unwrap();

        let config = Config::load_from_path(&config_file).unwrap().unwrap();
        assert_eq!(config.dictionary, Some(PathBuf::from("/custom/dicts/en.txt")));

        unsafe {
            env::remove_var("ZKN_DICT_ROOT");
        }
    }

    #[test]
    fn test_load_config_file_not_found() {
        let temp_dir = TempDir::new().unwrap();
        let non_existent_config = temp_dir.path().join("nonexistent.toml");

        let result = Config::load_from_path(&non_existent_config).unwrap();

        assert!(result.is_none());
    }

    #[test]
    fn test_invalid_toml_is_a_parse_error() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("config.toml");
        std::fs::write(&config_file, "spellcheck = \"sometimes\"\n").unwrap();

        let err = Config::load_from_path(&config_file).unwrap_err();
        assert!(matches!(err, ConfigError::ConfigParseError { .. }));
    }

    #[test]
    fn test_save_and_load_config() {
        let temp_dir = TempDir::new().unwrap();
        let config_file = temp_dir.path().join("nested").join("config.toml");
        let mut test_config = Config {
            id_pattern: r"(\d{8})".to_string(),
            dictionary: Some(PathBuf::from("/tmp/words.txt")),
            ..Config::default()
        };
        test_config
            .code_languages
            .insert("golang".to_string(), "c".to_string());

        test_config.save_to_path(&config_file).unwrap();
        let loaded_config = Config::load_from_path(&config_file).unwrap().unwrap();

        assert_eq!(loaded_config, test_config);
    }
}
