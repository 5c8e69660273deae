use crate::config::ConfigOverrides;
use anyhow::{anyhow, bail, Context, Result};
use std::env;
use std::path::PathBuf;

pub const DEFAULT_FRAMES: u32 = 900;

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CliOverrides {
    config: Option<PathBuf>,
    assets: Option<PathBuf>,
    frames: Option<u32>,
    physics: Option<bool>,
    hud: Option<bool>,
    cdn: Option<String>,
    bindings: Option<String>,
}

impl CliOverrides {
    pub fn parse_from_env() -> Result<Self> {
        Self::parse(env::args())
    }

    pub fn parse<I, S>(args: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut overrides = CliOverrides::default();
        let mut iter = args.into_iter();
        let _ = iter.next(); // skip program name if present
        while let Some(raw_flag) = iter.next() {
            let flag = raw_flag.as_ref();
            let Some(key) = flag.strip_prefix("--") else {
                bail!("Unexpected argument '{flag}'. Flags take the form --name value.");
            };
            let value =
                iter.next().ok_or_else(|| anyhow!("Expected a value after '{flag}'"))?.as_ref().to_string();
            match key {
                "config" => overrides.config = Some(PathBuf::from(value)),
                "assets" => overrides.assets = Some(PathBuf::from(value)),
                "frames" => {
                    overrides.frames =
                        Some(value.parse::<u32>().with_context(|| format!("Invalid frame count '{value}'"))?);
                }
                "physics" => overrides.physics = Some(parse_bool_flag("physics", &value)?),
                "hud" => overrides.hud = Some(parse_bool_flag("hud", &value)?),
                "cdn" => overrides.cdn = Some(value),
                "bindings" => overrides.bindings = Some(value),
                _ => bail!(
                    "Unknown flag '{flag}'. Supported flags: --config, --assets, --frames, --physics, --hud, --cdn, --bindings."
                ),
            }
        }
        Ok(overrides)
    }

    pub fn config_path(&self) -> Option<&PathBuf> {
        self.config.as_ref()
    }

    /// Directory the local asset root is resolved against. Defaults to the working directory.
    pub fn site_root(&self) -> PathBuf {
        self.assets.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    pub fn frames(&self) -> u32 {
        self.frames.unwrap_or(DEFAULT_FRAMES)
    }

    pub fn config_overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            local_root: None,
            cdn_base: self.cdn.clone(),
            physics: self.physics,
            hud: self.hud,
            input_bindings: self.bindings.clone(),
        }
    }
}

fn parse_bool_flag(flag: &str, value: &str) -> Result<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "on" | "yes" => Ok(true),
        "0" | "false" | "off" | "no" => Ok(false),
        other => bail!("Invalid {flag} value '{other}'. Use on/off or true/false."),
    }
}
