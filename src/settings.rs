// ============================================================================
// EDITOR SETTINGS: persisted key=value configuration
// ============================================================================

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::canvas::{Color, DEFAULT_LAYER_SIZE};
use crate::error::{EditorError, Result};

#[derive(Clone, Debug, PartialEq)]
pub struct EditorSettings {
    /// Try wgpu before falling back to CPU compositing.
    pub gpu_acceleration: bool,
    /// "auto", "low power" or "high performance".
    pub preferred_gpu: String,
    pub default_layer_width: u32,
    pub default_layer_height: u32,
    pub checkerboard_brightness: f32,
    /// Render-loop cadence while the surface is visible.
    pub frame_interval_ms: u64,
    /// Render-loop cadence while hidden.
    pub hidden_interval_ms: u64,
    /// How often the visibility probe is re-evaluated.
    pub visibility_poll_ms: u64,
    pub foreground_color: Color,
    pub background_color: Color,
}

impl Default for EditorSettings {
    fn default() -> Self {
        Self {
            gpu_acceleration: true,
            preferred_gpu: "auto".to_string(),
            default_layer_width: DEFAULT_LAYER_SIZE,
            default_layer_height: DEFAULT_LAYER_SIZE,
            checkerboard_brightness: 1.0,
            frame_interval_ms: 16,
            hidden_interval_ms: 100,
            visibility_poll_ms: 100,
            foreground_color: Color::BLACK,
            background_color: Color::WHITE,
        }
    }
}

impl EditorSettings {
    /// Path to the settings file.
    /// On Linux:   ~/.config/layer-editor/layer-editor.cfg  (XDG_CONFIG_HOME respected)
    /// On Windows: %APPDATA%\LayerEditor\layer-editor.cfg
    /// On macOS:   ~/Library/Application Support/LayerEditor/layer-editor.cfg
    pub fn settings_path() -> Option<PathBuf> {
        #[cfg(target_os = "windows")]
        {
            let appdata = std::env::var("APPDATA").or_else(|_| std::env::var("USERPROFILE")).ok()?;
            return Some(PathBuf::from(appdata).join("LayerEditor").join("layer-editor.cfg"));
        }
        #[cfg(target_os = "macos")]
        {
            let home = std::env::var("HOME").ok()?;
            return Some(
                PathBuf::from(home)
                    .join("Library")
                    .join("Application Support")
                    .join("LayerEditor")
                    .join("layer-editor.cfg"),
            );
        }
        #[cfg(not(any(target_os = "windows", target_os = "macos")))]
        {
            let config_dir = std::env::var("XDG_CONFIG_HOME")
                .map(PathBuf::from)
                .or_else(|_| std::env::var("HOME").map(|h| PathBuf::from(h).join(".config")))
                .ok()?;
            Some(config_dir.join("layer-editor").join("layer-editor.cfg"))
        }
    }

    pub fn frame_interval(&self) -> Duration {
        Duration::from_millis(self.frame_interval_ms.max(1))
    }

    pub fn hidden_interval(&self) -> Duration {
        Duration::from_millis(self.hidden_interval_ms.max(1))
    }

    pub fn visibility_poll(&self) -> Duration {
        Duration::from_millis(self.visibility_poll_ms)
    }

    /// Parse the `key=value` format.  Unknown keys and bad values are skipped
    /// so a partly corrupt file still yields usable settings.
    pub fn parse(content: &str) -> Self {
        let mut s = Self::default();
        for line in content.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let Some((key, val)) = line.split_once('=') else { continue };
            let key = key.trim();
            let val = val.trim();
            let ok = match key {
                "gpu_acceleration" => parse_into(val, &mut s.gpu_acceleration),
                "preferred_gpu" => {
                    s.preferred_gpu = val.to_string();
                    true
                }
                "default_layer_width" => parse_into(val, &mut s.default_layer_width),
                "default_layer_height" => parse_into(val, &mut s.default_layer_height),
                "checkerboard_brightness" => parse_into(val, &mut s.checkerboard_brightness),
                "frame_interval_ms" => parse_into(val, &mut s.frame_interval_ms),
                "hidden_interval_ms" => parse_into(val, &mut s.hidden_interval_ms),
                "visibility_poll_ms" => parse_into(val, &mut s.visibility_poll_ms),
                "foreground_color" => parse_into(val, &mut s.foreground_color),
                "background_color" => parse_into(val, &mut s.background_color),
                _ => true,
            };
            if !ok {
                log_warn!("Ignoring bad settings value {}={}", key, val);
            }
        }
        s
    }

    pub fn to_cfg_string(&self) -> String {
        format!(
            "gpu_acceleration={}\n\
             preferred_gpu={}\n\
             default_layer_width={}\n\
             default_layer_height={}\n\
             checkerboard_brightness={}\n\
             frame_interval_ms={}\n\
             hidden_interval_ms={}\n\
             visibility_poll_ms={}\n\
             foreground_color={}\n\
             background_color={}\n",
            self.gpu_acceleration,
            self.preferred_gpu,
            self.default_layer_width,
            self.default_layer_height,
            self.checkerboard_brightness,
            self.frame_interval_ms,
            self.hidden_interval_ms,
            self.visibility_poll_ms,
            self.foreground_color,
            self.background_color,
        )
    }

    /// Load from the platform settings path; defaults if missing or unreadable.
    pub fn load() -> Self {
        Self::settings_path()
            .map(|p| Self::load_from(&p))
            .unwrap_or_default()
    }

    pub fn load_from(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(content) => Self::parse(&content),
            Err(_) => Self::default(),
        }
    }

    pub fn save(&self) -> Result<()> {
        let path = Self::settings_path()
            .ok_or_else(|| EditorError::Settings("no settings directory".into()))?;
        self.save_to(&path)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, self.to_cfg_string())?;
        Ok(())
    }
}

fn parse_into<T: std::str::FromStr>(val: &str, slot: &mut T) -> bool {
    match val.parse() {
        Ok(v) => {
            *slot = v;
            true
        }
        Err(_) => false,
    }
}
