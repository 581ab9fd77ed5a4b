use std::path::Path;

use anyhow::anyhow;
use config::{Config, File};
use serde::Deserialize;

#[derive(Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    /// Open the log level up to debug output
    pub enable_logging: bool,
    pub hover: bool,
    /// Clickable document links
    pub quick_jump: bool,
    /// Lines past this bound are never scanned for links
    pub max_lines_count: usize,
}

impl Settings {
    pub fn new(root_dir: &Path) -> anyhow::Result<Settings> {
        Settings::with_overrides(root_dir, None)
    }

    /// Layers editor-supplied options (LSP `initializationOptions`) on top of
    /// the user and project settings files.
    pub fn with_overrides(
        root_dir: &Path,
        overrides: Option<&serde_json::Value>,
    ) -> anyhow::Result<Settings> {
        let expanded = shellexpand::tilde("~/.config/cakeview/settings");

        let settings = Config::builder()
            .add_source(File::with_name(&expanded).required(false))
            .add_source(
                File::with_name(&format!(
                    "{}/.cakeview",
                    root_dir
                        .to_str()
                        .ok_or(anyhow!("Can't convert root_dir to str"))?
                ))
                .required(false),
            )
            .set_default("enable_logging", false)?
            .set_default("hover", true)?
            .set_default("quick_jump", true)?
            .set_default("max_lines_count", 1000)?
            .set_override_option(
                "enable_logging",
                option(overrides, "enableLogging").and_then(|it| it.as_bool()),
            )?
            .set_override_option("hover", option(overrides, "hover").and_then(|it| it.as_bool()))?
            .set_override_option(
                "quick_jump",
                option(overrides, "quickJump").and_then(|it| it.as_bool()),
            )?
            .set_override_option(
                "max_lines_count",
                option(overrides, "maxLinesCount").and_then(|it| it.as_i64()),
            )?
            .build()
            .map_err(|err| anyhow!("Build err: {err}"))?;

        let settings = settings.try_deserialize::<Settings>()?;

        anyhow::Ok(settings)
    }
}

fn option<'a>(overrides: Option<&'a serde_json::Value>, key: &str) -> Option<&'a serde_json::Value> {
    overrides.and_then(|value| value.get(key))
}

impl Default for Settings {
    fn default() -> Self {
        Settings {
            enable_logging: false,
            hover: true,
            quick_jump: true,
            max_lines_count: 1000,
        }
    }
}
