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

//! Pure control state mirrored from the media handle.
//!
//! Nothing in here talks to the host. The controller feeds these types the
//! handle's values and applies whatever they decide.

pub mod progress;
pub mod speed;
pub mod visibility;
pub mod volume;

pub use progress::{ProgressDisplay, SeekTooltip, format_time, known_duration, pointer_ratio};
pub use speed::{DEFAULT_SPEEDS, SpeedMenu, speed_label};
pub use visibility::{ControlsVisibility, VisibilityGate};
pub use volume::{VolumeControl, VolumeLevel};
