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

//! Seams to the host platform's media engine.
//!
//! Decoding, rendering, fullscreen and picture-in-picture all live on the
//! other side of these traits. Asynchronous platform requests come back as
//! [`PlatformRequest`] futures that the controller keeps in its pending set.

use std::path::{Path, PathBuf};

use futures::future::LocalBoxFuture;
use kinora_store::PreferenceWriter;

use crate::err::PlatformError;

/// A platform request that settles once the host has acted on it.
pub type PlatformRequest = LocalBoxFuture<'static, Result<(), PlatformError>>;

/// Transient URL minted by the host for a locally selected file.
#[derive(
    Debug, Clone, PartialEq, Eq, Hash, derive_more::Display, derive_more::From, derive_more::AsRef,
)]
pub struct ResourceUrl(String);

impl ResourceUrl {
    pub fn as_str(&self) -> &str { &self.0 }
}

impl From<&str> for ResourceUrl {
    fn from(url: &str) -> Self { Self(url.to_string()) }
}

/// A file the user picked, with the media type the picker declared for it.
#[derive(Debug, Clone, PartialEq, Eq, bon::Builder)]
pub struct SelectedFile {
    #[builder(into)]
    pub name:      String,
    /// Declared media type. Empty when the picker could not tell.
    #[builder(default, into)]
    pub mime_type: String,
    #[builder(into)]
    pub path:      Option<PathBuf>,
}

impl SelectedFile {
    /// Describe a file on disk, guessing its media type from the extension.
    pub fn from_path(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        let name = path
            .file_name()
            .map_or_else(String::new, |n| n.to_string_lossy().into_owned());
        let mime_type = mime_guess::from_path(path)
            .first()
            .map(|m| m.essence_str().to_string())
            .unwrap_or_default();
        Self {
            name,
            mime_type,
            path: Some(path.to_path_buf()),
        }
    }

    pub fn is_video(&self) -> bool { self.mime_type.starts_with("video/") }

    pub fn is_webvtt(&self) -> bool { self.name.to_ascii_lowercase().ends_with(".vtt") }
}

/// Display mode of a text track.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::IntoStaticStr,
)]
#[strum(serialize_all = "snake_case")]
pub enum TrackMode {
    #[default]
    Disabled,
    Hidden,
    Showing,
}

/// Notifications the media handle and platform deliver to the controller.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MediaEvent {
    Play,
    Pause,
    TimeUpdate,
    DurationChange,
    LoadedMetadata,
    Ended,
    VolumeChange,
    Error,
    FullscreenChange,
    PictureInPictureChange,
}

/// The playback handle of the current source.
///
/// Times are in seconds. `duration` is `NaN` while unknown.
pub trait MediaElement {
    fn current_time(&self) -> f64;
    fn set_current_time(&mut self, seconds: f64);
    fn duration(&self) -> f64;
    fn paused(&self) -> bool;
    fn ended(&self) -> bool;
    fn volume(&self) -> f64;
    fn set_volume(&mut self, level: f64);
    fn muted(&self) -> bool;
    fn set_muted(&mut self, muted: bool);
    fn playback_rate(&self) -> f64;
    fn set_playback_rate(&mut self, rate: f64);
    /// Platform media error code of the last failure, if any.
    fn error_code(&self) -> Option<u16>;
    /// Whether the source opted out of picture-in-picture.
    fn disable_picture_in_picture(&self) -> bool;
    fn play(&mut self) -> PlatformRequest;
    fn pause(&mut self);
    fn set_source(&mut self, url: Option<&ResourceUrl>);
    fn load(&mut self);
}

/// Document level capabilities: fullscreen, picture-in-picture, resource URLs
/// and input modality.
pub trait Platform {
    fn is_touch_device(&self) -> bool;
    fn is_fullscreen(&self) -> bool;
    fn request_fullscreen(&mut self) -> PlatformRequest;
    fn exit_fullscreen(&mut self) -> PlatformRequest;
    fn picture_in_picture_enabled(&self) -> bool;
    fn in_picture_in_picture(&self) -> bool;
    fn request_picture_in_picture(&mut self) -> PlatformRequest;
    fn exit_picture_in_picture(&mut self) -> PlatformRequest;
    fn create_resource(&mut self, file: &SelectedFile) -> ResourceUrl;
    fn release_resource(&mut self, url: &ResourceUrl);
}

/// The subtitle track attached to the media handle.
pub trait SubtitleTrack {
    fn mode(&self) -> TrackMode;
    fn set_mode(&mut self, mode: TrackMode);
    /// Point the track at `url`. Settles when the cues are ready.
    fn load(&mut self, url: &ResourceUrl) -> PlatformRequest;
    fn clear_source(&mut self);
}

/// Where volume-affecting actions persist the level.
pub trait VolumeSink {
    fn save_volume(&self, level: f64);
}

impl VolumeSink for PreferenceWriter {
    fn save_volume(&self, level: f64) { Self::save_volume(self, level); }
}
