use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::core::feed::{FeedConfig, LogFilter};

/// Bump this when adding new fields with non-trivial defaults. A loaded
/// file with a lower version is re-saved so users see the new keys.
const CURRENT_PREFS_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum LayoutMode {
    #[default]
    Grid,
    SingleColumn,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortField {
    #[default]
    Id,
    Name,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn toggled(self) -> Self {
        match self {
            SortOrder::Asc => SortOrder::Desc,
            SortOrder::Desc => SortOrder::Asc,
        }
    }
}

/// Persisted console view preferences: layout, list sorting, the saved
/// search term, and the log page size. Injected into the feed layer rather
/// than read as global state, so coordinators stay testable with plain
/// values.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewPrefs {
    pub prefs_version: u32,
    pub layout: LayoutMode,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
    pub search: String,
    pub log_page_size: usize,
}

impl Default for ViewPrefs {
    fn default() -> Self {
        Self {
            prefs_version: 0,
            layout: LayoutMode::Grid,
            sort_field: SortField::Id,
            sort_order: SortOrder::Asc,
            search: String::new(),
            log_page_size: 20,
        }
    }
}

fn global_prefs_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".relay-console")
}

fn global_prefs_path() -> PathBuf {
    global_prefs_dir().join("prefs.toml")
}

impl ViewPrefs {
    pub fn load_global() -> Self {
        Self::load_from(&global_prefs_path())
    }

    pub fn load_from(path: &Path) -> Self {
        if !path.exists() {
            return Self {
                prefs_version: CURRENT_PREFS_VERSION,
                ..Self::default()
            };
        }

        let content = std::fs::read_to_string(path).unwrap_or_default();
        let mut prefs: Self = match toml::from_str(&content) {
            Ok(prefs) => prefs,
            Err(error) => {
                log::warn!("failed to parse {}: {}. Using defaults.", path.display(), error);
                Self::default()
            }
        };

        // Re-save older files so new keys appear on disk with their
        // defaults.
        if prefs.prefs_version < CURRENT_PREFS_VERSION {
            prefs.prefs_version = CURRENT_PREFS_VERSION;
            if let Err(error) = prefs.save_to(path) {
                log::warn!(
                    "failed to migrate prefs to v{}: {}",
                    CURRENT_PREFS_VERSION,
                    error
                );
            }
        }

        prefs
    }

    pub fn save(&self) -> Result<(), Box<dyn std::error::Error>> {
        self.save_to(&global_prefs_path())
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Box<dyn std::error::Error>> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, &content)?;
        Ok(())
    }

    pub fn set_search(&mut self, value: &str) {
        self.search = value.trim().to_string();
    }

    pub fn toggle_sort_order(&mut self) {
        self.sort_order = self.sort_order.toggled();
    }

    pub fn log_page_size(&self) -> usize {
        self.log_page_size.clamp(1, 100)
    }

    /// Feed scope for the stored page size and the given filter.
    pub fn feed_config(&self, filter: LogFilter) -> FeedConfig {
        FeedConfig {
            filter,
            page_size: self.log_page_size(),
        }
    }
}
