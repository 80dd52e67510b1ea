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

/// Playback rates offered when settings do not override them.
pub const DEFAULT_SPEEDS: [f64; 5] = [0.5, 0.75, 1.0, 1.5, 2.0];

/// Button and menu label for a rate, e.g. `1.5x`.
pub fn speed_label(rate: f64) -> String { format!("{rate}x") }

/// The playback speed selector.
///
/// The selected index always points into `speeds`.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeedMenu {
    speeds:   Vec<f64>,
    selected: usize,
    open:     bool,
}

impl Default for SpeedMenu {
    fn default() -> Self { Self::new(DEFAULT_SPEEDS.to_vec()) }
}

impl SpeedMenu {
    /// Starts at normal speed when offered, else at the first entry. An empty
    /// list falls back to [`DEFAULT_SPEEDS`].
    pub fn new(speeds: Vec<f64>) -> Self {
        let speeds = if speeds.is_empty() {
            DEFAULT_SPEEDS.to_vec()
        } else {
            speeds
        };
        let selected = speeds
            .iter()
            .position(|s| (*s - 1.0).abs() < f64::EPSILON)
            .unwrap_or(0);
        Self {
            speeds,
            selected,
            open: false,
        }
    }

    pub fn speeds(&self) -> &[f64] { &self.speeds }

    pub const fn selected_index(&self) -> usize { self.selected }

    pub fn selected_rate(&self) -> f64 { self.speeds[self.selected] }

    pub fn labels(&self) -> Vec<String> { self.speeds.iter().copied().map(speed_label).collect() }

    pub fn position(&self, rate: f64) -> Option<usize> {
        if rate.is_nan() {
            return None;
        }
        self.speeds.iter().position(|s| *s == rate)
    }

    /// Select `rate` if it is offered. Anything else leaves the selection
    /// alone and returns false.
    pub fn select(&mut self, rate: f64) -> bool {
        match self.position(rate) {
            Some(index) => {
                self.selected = index;
                true
            }
            None => false,
        }
    }

    /// Pick a menu option by its value text (`"1.5"`). Closes the menu on
    /// success.
    pub fn choose(&mut self, option: &str) -> Option<f64> {
        let rate = option.trim().trim_end_matches('x').parse::<f64>().ok()?;
        if self.select(rate) {
            self.open = false;
            Some(rate)
        } else {
            None
        }
    }

    pub const fn is_open(&self) -> bool { self.open }

    pub const fn toggle_open(&mut self) { self.open = !self.open; }

    pub const fn close(&mut self) { self.open = false; }
}
