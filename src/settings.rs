use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::storage::SettingsStore;

const THEME_KEY: &str = "theme";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ThemeMode {
    #[default]
    Light,
    Dark,
    /// Follow the operating system preference.
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Accent {
    #[default]
    Blue,
    Green,
    Orange,
    Purple,
    Red,
}

impl Accent {
    fn hex(self) -> &'static str {
        match self {
            Accent::Blue => "#2563eb",
            Accent::Green => "#16a34a",
            Accent::Orange => "#ea580c",
            Accent::Purple => "#7c3aed",
            Accent::Red => "#dc2626",
        }
    }

    fn contrast(self) -> &'static str {
        match self {
            Accent::Orange => "#111827",
            _ => "#ffffff",
        }
    }

    fn class_name(self) -> &'static str {
        match self {
            Accent::Blue => "accent-blue",
            Accent::Green => "accent-green",
            Accent::Orange => "accent-orange",
            Accent::Purple => "accent-purple",
            Accent::Red => "accent-red",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThemeSettings {
    #[serde(default)]
    pub mode: ThemeMode,
    #[serde(default)]
    pub accent: Accent,
}

impl ThemeSettings {
    pub fn is_dark(&self, system_prefers_dark: bool) -> bool {
        match self.mode {
            ThemeMode::Light => false,
            ThemeMode::Dark => true,
            ThemeMode::System => system_prefers_dark,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StyleTokens {
    pub background: &'static str,
    pub surface: &'static str,
    pub text: &'static str,
    pub muted_text: &'static str,
    pub accent: &'static str,
    pub accent_contrast: &'static str,
    pub classes: Vec<&'static str>,
}

pub fn style_tokens(settings: &ThemeSettings, system_prefers_dark: bool) -> StyleTokens {
    let dark = settings.is_dark(system_prefers_dark);
    let (background, surface, text, muted_text) = if dark {
        ("#0f172a", "#1e293b", "#f1f5f9", "#94a3b8")
    } else {
        ("#f8fafc", "#ffffff", "#0f172a", "#64748b")
    };
    StyleTokens {
        background,
        surface,
        text,
        muted_text,
        accent: settings.accent.hex(),
        accent_contrast: settings.accent.contrast(),
        classes: vec![
            if dark { "theme-dark" } else { "theme-light" },
            settings.accent.class_name(),
        ],
    }
}

/// Reads the saved theme; missing or unreadable values fall back to defaults.
pub fn load_theme(store: &dyn SettingsStore) -> Result<ThemeSettings> {
    let Some(bytes) = store.load_setting(THEME_KEY)? else {
        return Ok(ThemeSettings::default());
    };
    match serde_json::from_slice(&bytes) {
        Ok(settings) => Ok(settings),
        Err(err) => {
            warn!(error = %err, "ignoring unreadable theme settings");
            Ok(ThemeSettings::default())
        }
    }
}

pub fn save_theme(store: &dyn SettingsStore, settings: &ThemeSettings) -> Result<()> {
    let bytes = serde_json::to_vec(settings).context("failed to serialize theme settings")?;
    store.save_setting(THEME_KEY, &bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn tokens_follow_mode_and_accent() {
        let dark = ThemeSettings {
            mode: ThemeMode::Dark,
            accent: Accent::Green,
        };
        let tokens = style_tokens(&dark, false);
        assert_eq!(tokens.background, "#0f172a");
        assert_eq!(tokens.accent, "#16a34a");
        assert_eq!(tokens.classes, vec!["theme-dark", "accent-green"]);

        let system = ThemeSettings {
            mode: ThemeMode::System,
            ..ThemeSettings::default()
        };
        assert_eq!(style_tokens(&system, false).classes[0], "theme-light");
        assert_eq!(style_tokens(&system, true).classes[0], "theme-dark");
    }

    #[test]
    fn theme_round_trips_through_store() {
        let store = MemoryStore::new();
        assert_eq!(load_theme(&store).unwrap(), ThemeSettings::default());

        let settings = ThemeSettings {
            mode: ThemeMode::System,
            accent: Accent::Purple,
        };
        save_theme(&store, &settings).unwrap();
        assert_eq!(load_theme(&store).unwrap(), settings);

        store.save_setting(THEME_KEY, b"not json").unwrap();
        assert_eq!(load_theme(&store).unwrap(), ThemeSettings::default());
    }
}
