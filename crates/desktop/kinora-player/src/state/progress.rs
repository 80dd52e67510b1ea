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

/// `MM:SS` label. Minutes are not wrapped at the hour; unknown or negative
/// times render as `--:--`.
pub fn format_time(seconds: f64) -> String {
    if !seconds.is_finite() || seconds < 0.0 {
        return "--:--".to_string();
    }
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let total = seconds.floor() as u64;
    format!("{:02}:{:02}", total / 60, total % 60)
}

/// A duration the seek bar can work with: finite and positive.
pub fn known_duration(duration: f64) -> Option<f64> {
    (duration.is_finite() && duration > 0.0).then_some(duration)
}

/// Horizontal pointer offset on the bar as a fraction in `[0, 1]`.
pub fn pointer_ratio(x: f64, bar_width: f64) -> f64 {
    if bar_width <= 0.0 || x.is_nan() {
        return 0.0;
    }
    (x / bar_width).clamp(0.0, 1.0)
}

/// Hover tooltip over the seek bar.
#[derive(Debug, Clone, PartialEq)]
pub struct SeekTooltip {
    pub label:  String,
    /// Left offset in pixels, kept inside the bar.
    pub offset: f64,
}

impl SeekTooltip {
    /// `None` while the duration is unknown.
    pub fn at(x: f64, bar_width: f64, tooltip_width: f64, duration: f64) -> Option<Self> {
        let duration = known_duration(duration)?;
        let ratio = pointer_ratio(x, bar_width);
        let max_offset = (bar_width - tooltip_width).max(0.0);
        let offset = (x - tooltip_width / 2.0).clamp(0.0, max_offset);
        Some(Self {
            label: format_time(ratio * duration),
            offset,
        })
    }
}

/// Seek bar fill and the two time labels.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressDisplay {
    /// Played fraction in `[0, 1]`.
    pub fraction:       f64,
    pub current_label:  String,
    pub duration_label: String,
}

impl Default for ProgressDisplay {
    fn default() -> Self {
        Self {
            fraction:       0.0,
            current_label:  format_time(0.0),
            duration_label: format_time(f64::NAN),
        }
    }
}

impl ProgressDisplay {
    /// Position changed. The fill only moves once the duration is known.
    pub fn update_time(&mut self, current: f64, duration: f64) {
        if let Some(duration) = known_duration(duration) {
            self.fraction = (current / duration).clamp(0.0, 1.0);
        }
        self.current_label = format_time(current);
    }

    pub fn update_duration(&mut self, duration: f64) { self.duration_label = format_time(duration); }
}
