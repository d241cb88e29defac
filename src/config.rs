//! Settings read from `config.yml`. Every field is optional in the file; a
//! missing file means defaults.

use crate::input::KeyMap;
use crate::layout::Theme;
use crate::model::Card;
use chrono::{Duration, NaiveDate};
use directories::ProjectDirs;
use ratatui::prelude::Color;
use serde::{Deserialize, Serialize};
use simplelog::LevelFilter;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

pub const DEFAULT_BOARD_ID: &str = "default-board";
const MAX_DUE_IN_DAYS: i64 = 36_500;

#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    #[error("reading {path:?}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing config: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("unknown color for theme.{field}: {value}")]
    Color { field: &'static str, value: String },
    #[error("unknown log level: {0}")]
    LogLevel(String),
    #[error("cards.due_in_days must be between 0 and 36500, got {0}")]
    DueInDays(i64),
    #[error("key {key:?} is bound to both {first} and {second}")]
    KeyConflict {
        key: char,
        first: &'static str,
        second: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub database: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub log_level: String,
    pub board_id: String,
    /// Title given to the board when it is first created.
    pub board_title: String,
    pub keys: KeysConfig,
    pub cards: CardDefaults,
    pub theme: ThemeConfig,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            database: None,
            log_file: None,
            log_level: "info".into(),
            board_id: DEFAULT_BOARD_ID.into(),
            board_title: "Kanban".into(),
            keys: KeysConfig::default(),
            cards: CardDefaults::default(),
            theme: ThemeConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KeysConfig {
    pub compose: char,
    pub new_list: char,
    pub commit: char,
    pub quit: char,
    pub remove_card: char,
    pub remove_list: char,
}

impl Default for KeysConfig {
    fn default() -> Self {
        let keys = KeyMap::default();
        KeysConfig {
            compose: keys.compose,
            new_list: keys.new_list,
            commit: keys.commit,
            quit: keys.quit,
            remove_card: keys.remove_card,
            remove_list: keys.remove_list,
        }
    }
}

impl KeysConfig {
    pub fn key_map(&self) -> KeyMap {
        KeyMap {
            compose: self.compose,
            new_list: self.new_list,
            commit: self.commit,
            quit: self.quit,
            remove_card: self.remove_card,
            remove_list: self.remove_list,
        }
    }
}

/// Values filled into a card when its title is committed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CardDefaults {
    pub description: String,
    pub due_in_days: i64,
}

impl Default for CardDefaults {
    fn default() -> Self {
        CardDefaults {
            description: String::new(),
            due_in_days: 7,
        }
    }
}

impl CardDefaults {
    /// Due date `due_in_days` after `today`, or `None` when it falls outside chrono's range.
    fn due_after(&self, today: NaiveDate) -> Option<NaiveDate> {
        Duration::try_days(self.due_in_days).and_then(|d| today.checked_add_signed(d))
    }

    pub fn card(&self, title: &str, today: NaiveDate) -> Card {
        let due = self.due_after(today).unwrap_or(today);
        let mut card = Card::new(title, today);
        card.description = self.description.clone();
        card.due = due;
        card.end = due;
        card.duration = due - today;
        card
    }
}

/// Colors are names or `#rrggbb`, as accepted by ratatui.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ThemeConfig {
    pub column_width: usize,
    pub background: Option<String>,
    pub border: Option<String>,
    pub banner_fg: Option<String>,
    pub banner_bg: Option<String>,
    pub list_fg: Option<String>,
    pub list_bg: Option<String>,
    pub card_fg: Option<String>,
    pub card_bg: Option<String>,
    pub focus_fg: Option<String>,
    pub focus_bg: Option<String>,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        ThemeConfig {
            column_width: Theme::default().column_width,
            background: None,
            border: None,
            banner_fg: None,
            banner_bg: None,
            list_fg: None,
            list_bg: None,
            card_fg: None,
            card_bg: None,
            focus_fg: None,
            focus_bg: None,
        }
    }
}

fn color(field: &'static str, value: &Option<String>, fallback: Color) -> Result<Color, ConfigError> {
    match value {
        Some(raw) => Color::from_str(raw.trim()).map_err(|_| ConfigError::Color {
            field,
            value: raw.clone(),
        }),
        None => Ok(fallback),
    }
}

impl ThemeConfig {
    pub fn theme(&self) -> Result<Theme, ConfigError> {
        let base = Theme::default();
        Ok(Theme {
            column_width: self.column_width,
            background: color("background", &self.background, base.background)?,
            border: color("border", &self.border, base.border)?,
            banner_fg: color("banner_fg", &self.banner_fg, base.banner_fg)?,
            banner_bg: color("banner_bg", &self.banner_bg, base.banner_bg)?,
            list_fg: color("list_fg", &self.list_fg, base.list_fg)?,
            list_bg: color("list_bg", &self.list_bg, base.list_bg)?,
            card_fg: color("card_fg", &self.card_fg, base.card_fg)?,
            card_bg: color("card_bg", &self.card_bg, base.card_bg)?,
            focus_fg: color("focus_fg", &self.focus_fg, base.focus_fg)?,
            focus_bg: color("focus_bg", &self.focus_bg, base.focus_bg)?,
        })
    }
}

impl Config {
    /// Reads `path`, or the per-user config file when `path` is `None`.
    /// Only an explicitly named file is required to exist.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => match default_config_path() {
                Some(p) => (p, false),
                None => return Ok(Config::default()),
            },
        };
        if !required && !path.exists() {
            return Ok(Config::default());
        }
        let data = fs::read_to_string(&path).map_err(|source| ConfigError::Io {
            path: path.clone(),
            source,
        })?;
        Config::parse(&data)
    }

    pub fn parse(data: &str) -> Result<Config, ConfigError> {
        if data.trim().is_empty() {
            return Ok(Config::default());
        }
        let config: Config = serde_yaml::from_str(data)?;
        config.theme.theme()?;
        config.log_level()?;
        if !(0..=MAX_DUE_IN_DAYS).contains(&config.cards.due_in_days) {
            return Err(ConfigError::DueInDays(config.cards.due_in_days));
        }
        if let Some((key, first, second)) = config.keys.key_map().conflict() {
            return Err(ConfigError::KeyConflict { key, first, second });
        }
        Ok(config)
    }

    pub fn log_level(&self) -> Result<LevelFilter, ConfigError> {
        LevelFilter::from_str(self.log_level.trim())
            .map_err(|_| ConfigError::LogLevel(self.log_level.clone()))
    }
}

fn default_config_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "boardwalk").map(|dirs| dirs.config_dir().join("config.yml"))
}

/// Where the log goes when the config does not say.
pub fn default_log_path() -> Option<PathBuf> {
    ProjectDirs::from("", "", "boardwalk").map(|dirs| dirs.data_dir().join("boardwalk.log"))
}
