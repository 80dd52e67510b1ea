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

//! Single-threaded driver loop around a [`PlayerController`].

use tokio::{sync::mpsc, time::sleep_until};
use tokio_util::sync::CancellationToken;

use crate::{
    controller::{PlayerController, PointerInput},
    host::{MediaEvent, SelectedFile},
    keymap::{Command, KeyInput},
};

/// User input delivered to the driver.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerInput {
    Key(KeyInput),
    Pointer(PointerInput),
    Command(Command),
    OpenMedia(SelectedFile),
    OpenSubtitles(SelectedFile),
    SetVolume(f64),
    /// Seek to a fraction of the duration.
    SeekTo(f64),
    SetSpeed(f64),
    ToggleSpeedMenu,
    ChooseSpeed(String),
    DismissError,
}

impl PlayerController {
    pub fn dispatch(&mut self, input: PlayerInput) {
        match input {
            PlayerInput::Key(key) => {
                if !self.handle_key(&key) {
                    tracing::trace!(key = %key.key, "unbound key");
                }
            }
            PlayerInput::Pointer(pointer) => self.handle_pointer(pointer),
            PlayerInput::Command(command) => self.execute(command),
            PlayerInput::OpenMedia(file) => self.load_source(&file),
            PlayerInput::OpenSubtitles(file) => self.load_subtitles(&file),
            PlayerInput::SetVolume(level) => self.set_volume(level),
            PlayerInput::SeekTo(ratio) => self.seek_absolute(ratio),
            PlayerInput::SetSpeed(rate) => self.set_playback_rate(rate),
            PlayerInput::ToggleSpeedMenu => self.toggle_speed_menu(),
            PlayerInput::ChooseSpeed(option) => self.choose_speed(&option),
            PlayerInput::DismissError => self.dismiss_error(),
        }
    }
}

/// Drive `controller` until `cancel` fires or the input channel closes.
///
/// Inputs, media events, pending platform requests and visibility deadlines
/// are all served from one task, in arrival order.
pub async fn run(
    controller: &mut PlayerController,
    mut inputs: mpsc::UnboundedReceiver<PlayerInput>,
    mut events: mpsc::UnboundedReceiver<MediaEvent>,
    cancel: CancellationToken,
) {
    tracing::debug!("player driver started");
    loop {
        let deadline = controller.next_deadline();
        let has_pending = controller.has_pending();
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            Some(event) = events.recv() => controller.on_media_event(event),
            input = inputs.recv() => match input {
                Some(input) => controller.dispatch(input),
                None => break,
            },
            _ = controller.settle_next(), if has_pending => {}
            () = sleep_until(deadline.unwrap_or_else(tokio::time::Instant::now)), if deadline.is_some() => {
                controller.poll_timers();
            }
        }
    }
    tracing::debug!("player driver stopped");
}
