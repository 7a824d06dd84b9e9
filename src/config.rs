use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result, ensure};
use serde::Deserialize;
use tracing::{info, warn};

use crate::error::Error;
use crate::sequencer::SelectionMode;

const MAX_FADE_DURATION: Duration = Duration::from_secs(60 * 60);

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case", default, deny_unknown_fields)]
pub struct Configuration {
    /// Directory holding the `.jpg` files to cycle through.
    pub photo_library_path: PathBuf,
    /// Pick files uniformly at random instead of in name order.
    pub random: bool,
    /// Time an image stays fully visible after its fade completes.
    #[serde(with = "humantime_serde")]
    pub show_duration: Duration,
    /// Length of the cross-fade between two images.
    #[serde(with = "humantime_serde")]
    pub fade_duration: Duration,
    /// Optional deterministic seed for random selection.
    pub random_seed: Option<u64>,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            photo_library_path: PathBuf::from("."),
            random: false,
            show_duration: Duration::from_secs(5),
            fade_duration: Duration::from_secs(5),
            random_seed: None,
        }
    }
}

impl Configuration {
    pub fn from_yaml_file(path: impl AsRef<Path>) -> std::result::Result<Self, Error> {
        let s = std::fs::read_to_string(path)?;
        Ok(serde_yaml::from_str(&s)?)
    }

    /// Validate runtime invariants that cannot be expressed via serde defaults alone.
    pub fn validated(self) -> Result<Self> {
        ensure!(
            !self.photo_library_path.as_os_str().is_empty(),
            "photo-library-path must not be empty"
        );
        ensure!(
            self.fade_duration <= MAX_FADE_DURATION,
            "fade-duration must not exceed {}",
            humantime::format_duration(MAX_FADE_DURATION)
        );
        Ok(self)
    }

    /// The plain values the slideshow core runs on.
    #[must_use]
    pub fn settings(&self) -> SlideshowSettings {
        SlideshowSettings {
            photo_dir: self.photo_library_path.clone(),
            mode: SelectionMode::from_random_flag(self.random),
            show_duration: self.show_duration,
            fade_duration: self.fade_duration,
        }
    }
}

/// Settings consumed by the scheduler, refreshed between cycles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlideshowSettings {
    pub photo_dir: PathBuf,
    pub mode: SelectionMode,
    pub show_duration: Duration,
    pub fade_duration: Duration,
}

/// Command-line values that win over whatever the config file says.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SettingsOverrides {
    pub photo_dir: Option<PathBuf>,
    pub random: Option<bool>,
    pub show_duration: Option<Duration>,
    pub fade_duration: Option<Duration>,
    pub random_seed: Option<u64>,
}

impl SettingsOverrides {
    #[must_use]
    pub fn apply(&self, mut cfg: Configuration) -> Configuration {
        if let Some(dir) = &self.photo_dir {
            cfg.photo_library_path = dir.clone();
        }
        if let Some(random) = self.random {
            cfg.random = random;
        }
        if let Some(show) = self.show_duration {
            cfg.show_duration = show;
        }
        if let Some(fade) = self.fade_duration {
            cfg.fade_duration = fade;
        }
        if let Some(seed) = self.random_seed {
            cfg.random_seed = Some(seed);
        }
        cfg
    }
}

/// Something the scheduler polls for new settings at the start of each cycle.
pub trait SettingsSource {
    /// New settings if they changed since the last call.
    fn refresh(&mut self) -> Option<SlideshowSettings>;
}

/// Re-reads a YAML config file every cycle.
#[derive(Debug)]
pub struct ConfigFileSource {
    path: PathBuf,
    overrides: SettingsOverrides,
    last: SlideshowSettings,
}

impl ConfigFileSource {
    /// Load `path` once, failing loudly, and remember the result for later
    /// reloads.
    pub fn open(path: impl Into<PathBuf>, overrides: SettingsOverrides) -> Result<(Self, Configuration)> {
        let path = path.into();
        let cfg = load(&path, &overrides)
            .with_context(|| format!("failed to load configuration from {}", path.display()))?;
        let source = Self {
            path,
            overrides,
            last: cfg.settings(),
        };
        Ok((source, cfg))
    }
}

impl SettingsSource for ConfigFileSource {
    fn refresh(&mut self) -> Option<SlideshowSettings> {
        match load(&self.path, &self.overrides) {
            Ok(cfg) => {
                let settings = cfg.settings();
                if settings == self.last {
                    return None;
                }
                info!(path = %self.path.display(), settings = ?settings, "configuration changed");
                self.last = settings.clone();
                Some(settings)
            }
            Err(err) => {
                warn!(
                    path = %self.path.display(),
                    error = ?err,
                    "config reload failed; keeping previous settings"
                );
                None
            }
        }
    }
}

fn load(path: &Path, overrides: &SettingsOverrides) -> Result<Configuration> {
    let cfg = Configuration::from_yaml_file(path)?;
    overrides
        .apply(cfg)
        .validated()
        .context("invalid configuration values")
}
