// Copyright 2025 Crrow
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//      http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! User settings read from `settings.json`.

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    time::Duration,
};

use bon::Builder;
use kinora_common_telemetry::LoggingOptions;
use serde::{Deserialize, Serialize};
use smart_default::SmartDefault;
use snafu::{ResultExt, Snafu, ensure};

use crate::{keymap::Command, state::DEFAULT_SPEEDS};

#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum SettingsError {
    #[snafu(display("Failed to read settings from {}", path.display()))]
    ReadSettings {
        path:   PathBuf,
        source: std::io::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Malformed settings in {}", path.display()))]
    ParseSettings {
        path:   PathBuf,
        source: serde_json::Error,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Invalid setting `{field}`: {reason}"))]
    InvalidSetting {
        field:  &'static str,
        reason: String,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },
}

pub type Result<T, E = SettingsError> = std::result::Result<T, E>;

/// Player behavior knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, SmartDefault, Builder)]
#[serde(default)]
pub struct PlayerSettings {
    /// Seconds skipped by the back/forward buttons and arrow keys.
    #[default = 10.0]
    #[builder(default = 10.0)]
    pub skip_seconds: f64,

    /// Idle time before the control strip hides during playback.
    #[default = 3000]
    #[builder(default = 3000)]
    pub hide_controls_delay_ms: u64,

    /// Grace period after the pointer leaves the player surface.
    #[default = 100]
    #[builder(default = 100)]
    pub pointer_leave_grace_ms: u64,

    /// Volume change per arrow key press.
    #[default = 0.1]
    #[builder(default = 0.1)]
    pub volume_step: f64,

    #[default(_code = "DEFAULT_SPEEDS.to_vec()")]
    #[builder(default = DEFAULT_SPEEDS.to_vec())]
    pub playback_speeds: Vec<f64>,

    /// Extra or replacement key bindings, key name to command.
    #[builder(default)]
    pub shortcuts: BTreeMap<String, Command>,
}

impl PlayerSettings {
    pub const fn hide_controls_delay(&self) -> Duration {
        Duration::from_millis(self.hide_controls_delay_ms)
    }

    pub const fn pointer_leave_grace(&self) -> Duration {
        Duration::from_millis(self.pointer_leave_grace_ms)
    }

    pub fn validate(&self) -> Result<()> {
        ensure!(
            self.skip_seconds.is_finite() && self.skip_seconds > 0.0,
            InvalidSettingSnafu {
                field:  "skip_seconds",
                reason: format!("expected a positive number, got {}", self.skip_seconds),
            }
        );
        ensure!(
            self.volume_step > 0.0 && self.volume_step <= 1.0,
            InvalidSettingSnafu {
                field:  "volume_step",
                reason: format!("expected a value in (0, 1], got {}", self.volume_step),
            }
        );
        ensure!(
            !self.playback_speeds.is_empty(),
            InvalidSettingSnafu {
                field:  "playback_speeds",
                reason: "at least one speed is required",
            }
        );
        if let Some(bad) = self
            .playback_speeds
            .iter()
            .find(|s| !s.is_finite() || **s <= 0.0)
        {
            return InvalidSettingSnafu {
                field:  "playback_speeds",
                reason: format!("speeds must be positive, got {bad}"),
            }
            .fail();
        }
        Ok(())
    }
}

/// Contents of `settings.json`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Builder)]
#[serde(default)]
pub struct Settings {
    #[builder(default, getter)]
    pub player:  PlayerSettings,
    #[builder(default, getter)]
    pub logging: LoggingOptions,
}

impl Settings {
    /// Read and validate settings. A missing file yields defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "no settings file, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(e).context(ReadSettingsSnafu { path }),
        };
        let settings: Self = serde_json::from_str(&text).context(ParseSettingsSnafu { path })?;
        settings.player.validate()?;
        Ok(settings)
    }
}
