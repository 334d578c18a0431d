//! Configuration file management for gdl90-decode.
//!
//! Reads/writes `~/.gdl90-decode/config.yaml` with the receiver position,
//! decoder policies and output formatting.

use std::path::{Path, PathBuf};

use crate::codec::Convention;
use crate::decoder::{CrcPolicy, DecoderConfig};
use crate::table::TableMode;
use crate::types::{Gdl90Error, Result};

/// Full configuration structure.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub receiver: ReceiverConfig,
    pub decoder: DecoderConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReceiverConfig {
    pub name: String,
    pub lat: Option<f64>,
    pub lon: Option<f64>,
}

impl ReceiverConfig {
    /// Receiver position when both coordinates are set.
    pub fn position(&self) -> Option<(f64, f64)> {
        Some((self.lat?, self.lon?))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OutputConfig {
    pub delimiter: char,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            receiver: ReceiverConfig {
                name: "default".into(),
                lat: None,
                lon: None,
            },
            decoder: DecoderConfig::default(),
            output: OutputConfig { delimiter: ',' },
        }
    }
}

/// Get the config directory path (`~/.gdl90-decode/`).
pub fn config_dir() -> PathBuf {
    dirs_home().join(".gdl90-decode")
}

/// Get the config file path.
pub fn config_file() -> PathBuf {
    config_dir().join("config.yaml")
}

fn dirs_home() -> PathBuf {
    std::env::var("HOME")
        .or_else(|_| std::env::var("USERPROFILE"))
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

/// Load config from `~/.gdl90-decode/config.yaml`.
///
/// Returns default config if the file doesn't exist or can't be read.
pub fn load_config() -> Config {
    load_config_from(&config_file()).unwrap_or_default()
}

/// Load config from an explicit path. A missing file yields the defaults.
pub fn load_config_from(path: &Path) -> Result<Config> {
    if !path.exists() {
        return Ok(Config::default());
    }
    let text = std::fs::read_to_string(path)?;
    Ok(parse_config(&text))
}

/// Save config to `~/.gdl90-decode/config.yaml`.
pub fn save_config(config: &Config) -> Result<PathBuf> {
    let path = config_file();
    save_config_to(config, &path)?;
    Ok(path)
}

/// Write config to `path`, creating parent directories as needed.
pub fn save_config_to(config: &Config, path: &Path) -> Result<()> {
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir).map_err(|e| Gdl90Error::Config(e.to_string()))?;
    }
    std::fs::write(path, serialize_config(config))
        .map_err(|e| Gdl90Error::Config(e.to_string()))?;
    Ok(())
}

/// Parse simple YAML-like config text. Unknown or malformed keys keep their
/// defaults.
pub fn parse_config(text: &str) -> Config {
    let mut config = Config::default();
    let mut current_section: Option<String> = None;

    for line in text.lines() {
        let line = strip_comment(line);
        let stripped = line.trim();
        if stripped.is_empty() {
            continue;
        }

        let is_indented = line.starts_with("  ") || line.starts_with('\t');

        let Some((key, val)) = stripped.split_once(':') else {
            continue;
        };
        let key = key.trim();
        let val = val.trim();

        if !is_indented {
            current_section = val.is_empty().then(|| key.to_string());
            continue;
        }

        match (current_section.as_deref(), key) {
            (Some("receiver"), "name") => {
                if let Some(v) = parse_string_value(val) {
                    config.receiver.name = v;
                }
            }
            (Some("receiver"), "lat") => config.receiver.lat = parse_float_value(val),
            (Some("receiver"), "lon") => config.receiver.lon = parse_float_value(val),
            (Some("decoder"), "crc_policy") => {
                if let Some(p) = parse_string_value(val).as_deref().and_then(CrcPolicy::parse) {
                    config.decoder.crc_policy = p;
                }
            }
            (Some("decoder"), "convention") => {
                if let Some(c) = parse_string_value(val).as_deref().and_then(Convention::parse) {
                    config.decoder.convention = c;
                }
            }
            (Some("decoder"), "upsert") => match val {
                "true" | "yes" => config.decoder.table_mode = TableMode::Merge,
                "false" | "no" => config.decoder.table_mode = TableMode::Append,
                _ => {}
            },
            (Some("output"), "delimiter") => {
                if let Some(c) = parse_string_value(val).and_then(|v| single_char(&v)) {
                    config.output.delimiter = c;
                }
            }
            _ => {}
        }
    }

    config
}

/// Drop a trailing `# comment` that is not inside quotes.
fn strip_comment(line: &str) -> &str {
    let mut quote = None;
    for (i, c) in line.char_indices() {
        match (c, quote) {
            ('"' | '\'', None) => quote = Some(c),
            (c, Some(q)) if c == q => quote = None,
            ('#', None) => return &line[..i],
            _ => {}
        }
    }
    line
}

fn parse_string_value(val: &str) -> Option<String> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    // Strip quotes
    if val.len() >= 2
        && ((val.starts_with('"') && val.ends_with('"'))
            || (val.starts_with('\'') && val.ends_with('\'')))
    {
        return Some(val[1..val.len() - 1].to_string());
    }
    Some(val.to_string())
}

fn parse_float_value(val: &str) -> Option<f64> {
    if val == "null" || val == "~" || val.is_empty() {
        return None;
    }
    val.parse().ok()
}

fn single_char(val: &str) -> Option<char> {
    match val {
        "\\t" => Some('\t'),
        _ => {
            let mut chars = val.chars();
            let c = chars.next()?;
            chars.next().is_none().then_some(c)
        }
    }
}

/// Serialize config to YAML-like text.
pub fn serialize_config(config: &Config) -> String {
    let mut lines = vec!["# gdl90-decode configuration".to_string(), String::new()];

    lines.push("receiver:".into());
    lines.push(format!("  name: \"{}\"", config.receiver.name));
    match config.receiver.lat {
        Some(v) => lines.push(format!("  lat: {v}")),
        None => lines.push("  lat: null".into()),
    }
    match config.receiver.lon {
        Some(v) => lines.push(format!("  lon: {v}")),
        None => lines.push("  lon: null".into()),
    }
    lines.push(String::new());

    lines.push("decoder:".into());
    lines.push(format!(
        "  crc_policy: {}  # reject | report | ignore",
        config.decoder.crc_policy.as_str()
    ));
    lines.push(format!(
        "  convention: {}  # legacy | icd",
        config.decoder.convention.as_str()
    ));
    lines.push(format!(
        "  upsert: {}",
        config.decoder.table_mode == TableMode::Merge
    ));
    lines.push(String::new());

    lines.push("output:".into());
    let delimiter = match config.output.delimiter {
        '\t' => "\\t".to_string(),
        c => c.to_string(),
    };
    lines.push(format!("  delimiter: \"{delimiter}\""));

    lines.join("\n") + "\n"
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
