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

/// Volume and mute as applied to the media handle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeLevel {
    /// Slider level (0.0 to 1.0), kept while muted.
    pub level: f64,
    pub muted: bool,
}

impl VolumeLevel {
    pub const FULL: Self = Self {
        level: 1.0,
        muted: false,
    };

    /// Level actually heard: 0 while muted.
    pub const fn effective(self) -> f64 { if self.muted { 0.0 } else { self.level } }
}

impl Default for VolumeLevel {
    fn default() -> Self { Self::FULL }
}

/// Remembers the last audible level so unmuting from zero has somewhere to
/// go back to.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolumeControl {
    last_non_zero: f64,
}

impl Default for VolumeControl {
    fn default() -> Self { Self { last_non_zero: 1.0 } }
}

impl VolumeControl {
    /// Initial volume from a persisted level.
    ///
    /// Missing, non-finite or out-of-range values fall back to full volume,
    /// unmuted. A stored 0 starts muted.
    pub fn restore(saved: Option<f64>) -> (Self, VolumeLevel) {
        match saved {
            Some(level) if (0.0..=1.0).contains(&level) => {
                let control = Self {
                    last_non_zero: if level > 0.0 { level } else { 1.0 },
                };
                (control, VolumeLevel {
                    level,
                    muted: level == 0.0,
                })
            }
            Some(level) => {
                tracing::warn!(level, "ignoring out-of-range saved volume");
                (Self::default(), VolumeLevel::FULL)
            }
            None => (Self::default(), VolumeLevel::FULL),
        }
    }

    pub const fn last_non_zero(&self) -> f64 { self.last_non_zero }

    /// Slider input. Returns `None` for `NaN`.
    pub fn set_level(&mut self, level: f64) -> Option<VolumeLevel> {
        if level.is_nan() {
            return None;
        }
        let level = level.clamp(0.0, 1.0);
        if level > 0.0 {
            self.last_non_zero = level;
        }
        Some(VolumeLevel {
            level,
            muted: level == 0.0,
        })
    }

    /// Flip mute. Unmuting at level 0 restores the last audible level, or full
    /// volume when there never was one.
    pub fn toggle_mute(&self, current: VolumeLevel) -> VolumeLevel {
        if current.muted {
            let level = if current.level == 0.0 {
                if self.last_non_zero > 0.0 { self.last_non_zero } else { 1.0 }
            } else {
                current.level
            };
            VolumeLevel {
                level,
                muted: false,
            }
        } else {
            VolumeLevel {
                level: current.level,
                muted: true,
            }
        }
    }

    /// Keyboard volume step from what is currently audible.
    pub fn step(&mut self, current: VolumeLevel, delta: f64) -> Option<VolumeLevel> {
        self.set_level(current.effective() + delta)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn restore_validates_range() {
        let (control, level) = VolumeControl::restore(Some(5.0));
        assert_eq!(level, VolumeLevel::FULL);
        assert!((control.last_non_zero() - 1.0).abs() < f64::EPSILON);

        let (_, level) = VolumeControl::restore(Some(-0.1));
        assert_eq!(level, VolumeLevel::FULL);

        let (control, level) = VolumeControl::restore(Some(0.0));
        assert!(level.muted);
        assert!((control.last_non_zero() - 1.0).abs() < f64::EPSILON);

        let (control, level) = VolumeControl::restore(Some(0.4));
        assert!(!level.muted);
        assert!((control.last_non_zero() - 0.4).abs() < f64::EPSILON);

        assert_eq!(VolumeControl::restore(None).1, VolumeLevel::FULL);
    }

    #[test]
    fn set_level_mutes_only_at_zero() {
        let mut control = VolumeControl::default();
        for v in [0.0, 0.01, 0.3, 0.5, 0.99, 1.0] {
            let level = control.set_level(v).unwrap();
            assert_eq!(level.muted, v == 0.0, "level {v}");
        }
        assert!((control.last_non_zero() - 1.0).abs() < f64::EPSILON);

        assert_eq!(control.set_level(1.7).unwrap().level, 1.0);
        assert!(control.set_level(f64::NAN).is_none());
    }

    #[test]
    fn zero_does_not_overwrite_last_audible_level() {
        let mut control = VolumeControl::default();
        control.set_level(0.3);
        let muted = control.set_level(0.0).unwrap();
        let unmuted = control.toggle_mute(muted);
        assert_eq!(unmuted, VolumeLevel {
            level: 0.3,
            muted: false,
        });
    }

    #[test]
    fn toggle_twice_is_identity() {
        let control = VolumeControl::default();
        let start = VolumeLevel {
            level: 0.7,
            muted: false,
        };
        let once = control.toggle_mute(start);
        assert!(once.muted);
        assert_eq!(once.effective(), 0.0);
        assert_eq!(control.toggle_mute(once), start);
    }

    #[test]
    fn step_starts_from_audible_level() {
        let mut control = VolumeControl::default();
        let muted = VolumeLevel {
            level: 0.5,
            muted: true,
        };
        let up = control.step(muted, 0.1).unwrap();
        assert!((up.level - 0.1).abs() < 1e-9);
        assert!(!up.muted);

        let down = control.step(VolumeLevel::FULL, -2.0).unwrap();
        assert_eq!(down.level, 0.0);
        assert!(down.muted);
    }
}
