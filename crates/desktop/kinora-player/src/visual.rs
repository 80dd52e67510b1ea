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

//! Icon choices derived from playback state, plus the snapshot renderers
//! draw from.

use crate::{
    host::TrackMode,
    state::{SeekTooltip, format_time, speed_label},
};

/// Glyph on the play/pause button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::IntoStaticStr)]
pub enum PlayPauseIcon {
    #[strum(serialize = "play_arrow")]
    Play,
    #[strum(serialize = "pause")]
    Pause,
    #[strum(serialize = "replay")]
    Replay,
}

impl PlayPauseIcon {
    pub const fn from_state(paused: bool, ended: bool) -> Self {
        if ended {
            Self::Replay
        } else if paused {
            Self::Play
        } else {
            Self::Pause
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::IntoStaticStr)]
pub enum VolumeIcon {
    #[strum(serialize = "volume_off")]
    Muted,
    #[strum(serialize = "volume_down")]
    Low,
    #[strum(serialize = "volume_up")]
    High,
}

impl VolumeIcon {
    pub fn from_state(volume: f64, muted: bool) -> Self {
        if muted || volume == 0.0 {
            Self::Muted
        } else if volume <= 0.5 {
            Self::Low
        } else {
            Self::High
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::IntoStaticStr)]
pub enum FullscreenIcon {
    #[strum(serialize = "fullscreen")]
    Enter,
    #[strum(serialize = "fullscreen_exit")]
    Exit,
}

impl FullscreenIcon {
    pub const fn from_state(fullscreen: bool) -> Self {
        if fullscreen { Self::Exit } else { Self::Enter }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::IntoStaticStr)]
pub enum SubtitleIcon {
    #[strum(serialize = "subtitles")]
    On,
    #[strum(serialize = "subtitles_off")]
    Off,
}

impl SubtitleIcon {
    /// Only an enabled toggle over a showing track reads as on.
    pub fn from_state(toggle_enabled: bool, mode: TrackMode) -> Self {
        if toggle_enabled && mode == TrackMode::Showing {
            Self::On
        } else {
            Self::Off
        }
    }
}

/// Everything a renderer needs to draw the control surface.
#[derive(Debug, Clone, PartialEq)]
pub struct PlayerView {
    pub play_pause:          PlayPauseIcon,
    pub volume_icon:         VolumeIcon,
    /// Slider position: 0 while muted.
    pub volume_slider:       f64,
    pub volume_slider_shown: bool,
    pub fullscreen:          FullscreenIcon,
    pub subtitle_icon:       SubtitleIcon,
    pub subtitles_enabled:   bool,
    pub progress:            f64,
    /// Hover label over the seek bar, pointer devices only.
    pub seek_tooltip:        Option<SeekTooltip>,
    pub current_time:        String,
    pub duration:            String,
    pub speed_label:         String,
    pub speed_index:         usize,
    pub speed_menu_open:     bool,
    pub pip_available:       bool,
    pub controls_visible:    bool,
    pub cinema_mode:         bool,
    pub error:               Option<String>,
}

impl Default for PlayerView {
    fn default() -> Self {
        Self {
            play_pause:          PlayPauseIcon::Play,
            volume_icon:         VolumeIcon::High,
            volume_slider:       1.0,
            volume_slider_shown: false,
            fullscreen:          FullscreenIcon::Enter,
            subtitle_icon:       SubtitleIcon::Off,
            subtitles_enabled:   false,
            progress:            0.0,
            seek_tooltip:        None,
            current_time:        format_time(0.0),
            duration:            format_time(f64::NAN),
            speed_label:         speed_label(1.0),
            speed_index:         0,
            speed_menu_open:     false,
            pip_available:       false,
            controls_visible:    true,
            cinema_mode:         false,
            error:               None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn play_pause_icon() {
        assert_eq!(PlayPauseIcon::from_state(true, false), PlayPauseIcon::Play);
        assert_eq!(PlayPauseIcon::from_state(false, false), PlayPauseIcon::Pause);
        assert_eq!(PlayPauseIcon::from_state(true, true), PlayPauseIcon::Replay);
        assert_eq!(PlayPauseIcon::Replay.to_string(), "replay");
    }

    #[test]
    fn volume_icon_thresholds() {
        assert_eq!(VolumeIcon::from_state(0.0, false), VolumeIcon::Muted);
        assert_eq!(VolumeIcon::from_state(0.8, true), VolumeIcon::Muted);
        assert_eq!(VolumeIcon::from_state(0.3, false), VolumeIcon::Low);
        assert_eq!(VolumeIcon::from_state(0.5, false), VolumeIcon::Low);
        assert_eq!(VolumeIcon::from_state(0.51, false), VolumeIcon::High);
    }

    #[test]
    fn subtitle_icon_needs_enabled_toggle() {
        assert_eq!(
            SubtitleIcon::from_state(false, TrackMode::Showing),
            SubtitleIcon::Off
        );
        assert_eq!(
            SubtitleIcon::from_state(true, TrackMode::Hidden),
            SubtitleIcon::Off
        );
        assert_eq!(
            SubtitleIcon::from_state(true, TrackMode::Showing),
            SubtitleIcon::On
        );
        assert_eq!(FullscreenIcon::from_state(true).to_string(), "fullscreen_exit");
    }
}
