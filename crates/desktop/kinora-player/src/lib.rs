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

//! Kinora's video player control surface.
//!
//! [`PlayerController`] keeps the on-screen controls consistent with a host
//! media element reached through the traits in [`host`]. Renderers subscribe
//! to [`PlayerView`] snapshots; [`runtime::run`] drives the controller from
//! input and media event channels.

pub mod controller;
pub mod err;
pub mod headless;
pub mod host;
pub mod keymap;
pub mod runtime;
pub mod settings;
pub mod state;
pub mod util;
pub mod visual;

pub use controller::{ControllerState, PlayerController, PointerInput, SeekDirection};
pub use err::{MediaErrorKind, PlatformError, PlatformErrorKind, PlayerError};
pub use host::{
    MediaElement, MediaEvent, Platform, PlatformRequest, ResourceUrl, SelectedFile,
    SubtitleTrack, TrackMode, VolumeSink,
};
pub use keymap::{Command, Key, KeyInput, Keymap};
pub use runtime::{PlayerInput, run};
pub use settings::{PlayerSettings, Settings, SettingsError};
pub use visual::{FullscreenIcon, PlayPauseIcon, PlayerView, SubtitleIcon, VolumeIcon};
