use std::{env, path::PathBuf};

use config::{Config, File};
use font_kit::{font::Font, source::SystemSource};
use log::{info, warn};
use serde::Deserialize;

use crate::{error::ConfigError, render_canvas::Color};

const CONFIG_FILE: &str = "laser-search.toml";
const FALLBACK_FONT: &str = "FreeSans";

#[derive(Debug, Deserialize, PartialEq)]
#[serde(default)]
struct LauncherConfigRaw {
    font: String,
    icon_theme: Option<String>,
    icon_size: u16,
    namespace: String,
    background_color: [u8; 4],
    text_color: [u8; 4],
    hover_color: [u8; 4],
    field_color: [u8; 4],
}
impl Default for LauncherConfigRaw {
    fn default() -> Self {
        Self {
            font: FALLBACK_FONT.to_string(),
            icon_theme: None,
            icon_size: 48,
            namespace: "laser-search".to_string(),
            background_color: [0, 0, 0, 128],
            text_color: [238, 238, 238, 255],
            hover_color: [51, 51, 51, 119],
            field_color: [40, 40, 40, 230],
        }
    }
}
impl LauncherConfigRaw {
    fn load() -> Result<Self, ConfigError> {
        match Self::locate_config() {
            Some(path) => {
                info!("Loading configuration from {}", path.display());
                Self::load_from(path)
            }
            None => Ok(Self::default()),
        }
    }

    fn load_from(path: PathBuf) -> Result<Self, ConfigError> {
        let raw = Config::builder()
            .add_source(File::from(path))
            .build()?
            .try_deserialize::<Self>()?;
        Ok(raw)
    }

    fn locate_config() -> Option<PathBuf> {
        let candidates = [
            env::var_os("XDG_CONFIG_HOME").map(|dir| PathBuf::from(dir).join(CONFIG_FILE)),
            env::var_os("HOME").map(|dir| PathBuf::from(dir).join(".config").join(CONFIG_FILE)),
        ];
        candidates.into_iter().flatten().find(|path| path.exists())
    }
}

pub struct LauncherConfig {
    pub font: Font,
    pub icon_theme: Option<String>,
    pub icon_size: u16,
    pub namespace: String,
    pub background_color: Color,
    pub text_color: Color,
    pub hover_color: Color,
    pub field_color: Color,
}
impl LauncherConfig {
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_raw(LauncherConfigRaw::load()?)
    }

    fn from_raw(raw: LauncherConfigRaw) -> Result<Self, ConfigError> {
        let font_source = SystemSource::new();
        let font = match Self::find_font(&font_source, &raw.font) {
            Some(font) => font,
            None if raw.font != FALLBACK_FONT => {
                warn!("Font '{}' is unavailable, falling back to {FALLBACK_FONT}", raw.font);
                Self::find_font(&font_source, FALLBACK_FONT).ok_or_else(|| ConfigError::Font(raw.font.clone()))?
            }
            None => return Err(ConfigError::Font(raw.font)),
        };

        Ok(Self {
            font,
            icon_theme: raw.icon_theme,
            icon_size: raw.icon_size.max(1),
            namespace: raw.namespace,
            background_color: Color::from(raw.background_color),
            text_color: Color::from(raw.text_color),
            hover_color: Color::from(raw.hover_color),
            field_color: Color::from(raw.field_color),
        })
    }

    fn find_font(source: &SystemSource, postscript_name: &str) -> Option<Font> {
        source.select_by_postscript_name(postscript_name).ok()?.load().ok()
    }
}
