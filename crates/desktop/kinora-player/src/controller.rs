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

//! The player controller.
//!
//! Input goes in through the operation methods, host notifications through
//! [`PlayerController::on_media_event`]. Every call ends by publishing a fresh
//! [`PlayerView`] to subscribers when something visible changed.
//!
//! Platform requests are never awaited inline. They sit in a pending set that
//! the driver settles with [`PlayerController::settle_next`].

use futures::{FutureExt, StreamExt, future::LocalBoxFuture, stream::FuturesUnordered};
use snafu::IntoError;
use tokio::{sync::watch, time::Instant};

use crate::{
    err::{
        InvalidMediaTypeSnafu, InvalidSubtitleFileSnafu, MediaErrorKind, MediaSnafu,
        PictureInPictureSnafu, PlatformError, PlatformErrorKind, PlayerError, PlaySnafu,
    },
    host::{
        MediaElement, MediaEvent, Platform, PlatformRequest, ResourceUrl, SelectedFile,
        SubtitleTrack, TrackMode, VolumeSink,
    },
    keymap::{Command, KeyInput, Keymap},
    settings::PlayerSettings,
    state::{
        ControlsVisibility, ProgressDisplay, SeekTooltip, SpeedMenu, VisibilityGate,
        VolumeControl, VolumeLevel, known_duration, pointer_ratio, speed_label,
    },
    visual::{FullscreenIcon, PlayPauseIcon, PlayerView, SubtitleIcon, VolumeIcon},
};

/// Direction of a relative seek.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display)]
#[strum(serialize_all = "snake_case")]
pub enum SeekDirection {
    Back,
    Forward,
}

/// Pointer and touch input on the player surface.
///
/// Positions on the seek bar are pixel offsets from its left edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerInput {
    SurfaceEnter,
    SurfaceMove,
    SurfaceLeave,
    ControlsEnter,
    ControlsLeave,
    /// Touch on the surface outside the control strip.
    SurfaceTap,
    VideoClick,
    VolumeButton,
    SeekBarPress { x: f64, bar_width: f64 },
    SeekBarMove {
        x:             f64,
        bar_width:     f64,
        tooltip_width: f64,
    },
    SeekBarClick { x: f64, bar_width: f64 },
    SeekBarLeave,
    /// Mouse or touch released anywhere.
    Release,
}

/// Controller bookkeeping, for inspection.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControllerState {
    pub last_non_zero_volume:   f64,
    pub selected_speed_index:   usize,
    pub is_scrubbing:           bool,
    pub controls_visible:       bool,
    pub hide_controls_deadline: Option<Instant>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    Play,
    EnterFullscreen,
    ExitFullscreen,
    EnterPictureInPicture,
    ExitPictureInPicture,
    SubtitleTrack { generation: u64 },
}

struct Settlement {
    kind:   RequestKind,
    result: Result<(), PlatformError>,
}

pub struct PlayerController {
    platform:    Box<dyn Platform>,
    media:       Option<Box<dyn MediaElement>>,
    subtitles:   Option<Box<dyn SubtitleTrack>>,
    volume_sink: Box<dyn VolumeSink>,
    settings:    PlayerSettings,
    keymap:      Keymap,

    volume:              VolumeControl,
    /// Applied level while no media handle is attached.
    detached_volume:     VolumeLevel,
    speed:               SpeedMenu,
    progress:            ProgressDisplay,
    visibility:          ControlsVisibility,
    seek_tooltip:        Option<SeekTooltip>,
    scrubbing:           bool,
    subtitles_enabled:   bool,
    subtitle_generation: u64,
    volume_slider_shown: bool,
    cinema_mode:         bool,
    error:               Option<PlayerError>,

    media_resource:    Option<ResourceUrl>,
    subtitle_resource: Option<ResourceUrl>,

    pending: FuturesUnordered<LocalBoxFuture<'static, Settlement>>,
    view_tx: watch::Sender<PlayerView>,
}

#[bon::bon]
impl PlayerController {
    #[builder]
    pub fn new(
        platform: Box<dyn Platform>,
        media: Option<Box<dyn MediaElement>>,
        subtitles: Option<Box<dyn SubtitleTrack>>,
        volume_sink: Box<dyn VolumeSink>,
        // Raw persisted level, validated by `VolumeControl::restore`.
        saved_volume: Option<f64>,
        #[builder(default)] settings: PlayerSettings,
    ) -> Self {
        let (volume, level) = VolumeControl::restore(saved_volume);
        let keymap = Keymap::with_overrides(&settings.shortcuts);
        let speed = SpeedMenu::new(settings.playback_speeds.clone());
        let visibility = ControlsVisibility::new(
            settings.hide_controls_delay(),
            settings.pointer_leave_grace(),
        );

        let mut controller = Self {
            platform,
            media,
            subtitles,
            volume_sink,
            settings,
            keymap,
            volume,
            detached_volume: level,
            speed,
            progress: ProgressDisplay::default(),
            visibility,
            seek_tooltip: None,
            scrubbing: false,
            subtitles_enabled: false,
            subtitle_generation: 0,
            volume_slider_shown: false,
            cinema_mode: false,
            error: None,
            media_resource: None,
            subtitle_resource: None,
            pending: FuturesUnordered::new(),
            view_tx: watch::Sender::new(PlayerView::default()),
        };
        controller.apply_volume(level);
        controller.apply_playback_rate();
        tracing::debug!(
            volume = level.level,
            muted = level.muted,
            "player controller initialized"
        );
        controller.publish();
        controller
    }
}

impl PlayerController {
    /// Receiver of view snapshots. The current view is marked seen.
    pub fn subscribe(&self) -> watch::Receiver<PlayerView> { self.view_tx.subscribe() }

    pub fn view(&self) -> PlayerView { self.view_tx.borrow().clone() }

    pub fn state(&self) -> ControllerState {
        ControllerState {
            last_non_zero_volume:   self.volume.last_non_zero(),
            selected_speed_index:   self.speed.selected_index(),
            is_scrubbing:           self.scrubbing,
            controls_visible:       self.controls_visible(),
            hide_controls_deadline: self.visibility.hide_deadline(),
        }
    }

    pub const fn settings(&self) -> &PlayerSettings { &self.settings }

    /// Error currently on display.
    pub const fn error(&self) -> Option<&PlayerError> { self.error.as_ref() }

    pub fn dismiss_error(&mut self) {
        self.clear_error();
        self.publish();
    }

    // -- playback ---------------------------------------------------------

    /// Play when paused or ended, pause otherwise.
    pub fn play_pause(&mut self) {
        let Some(media) = self.media.as_mut() else {
            tracing::debug!("play/pause without a media handle");
            return;
        };
        if media.paused() || media.ended() {
            let request = media.play();
            self.track(RequestKind::Play, request);
        } else {
            media.pause();
        }
        self.publish();
    }

    /// Move by `amount` seconds. The handle bounds the result.
    pub fn seek_relative(&mut self, direction: SeekDirection, amount: f64) {
        let Some(media) = self.media.as_mut() else {
            return;
        };
        let delta = match direction {
            SeekDirection::Back => -amount,
            SeekDirection::Forward => amount,
        };
        let target = media.current_time() + delta;
        tracing::trace!(%direction, amount, target, "relative seek");
        media.set_current_time(target);
        self.refresh_progress();
        self.publish();
    }

    /// Jump to `ratio` of the duration. Ignored while the duration is unknown.
    pub fn seek_absolute(&mut self, ratio: f64) {
        if ratio.is_nan() {
            return;
        }
        let Some(media) = self.media.as_mut() else {
            return;
        };
        let Some(duration) = known_duration(media.duration()) else {
            tracing::debug!("seek ignored, duration unknown");
            return;
        };
        media.set_current_time(ratio.clamp(0.0, 1.0) * duration);
        self.refresh_progress();
        self.publish();
    }

    // -- volume -----------------------------------------------------------

    /// Slider input: clamp, mute at zero, persist.
    pub fn set_volume(&mut self, level: f64) {
        let Some(next) = self.volume.set_level(level) else {
            tracing::debug!("ignoring NaN volume");
            return;
        };
        self.apply_volume(next);
        self.volume_sink.save_volume(next.level);
        self.publish();
    }

    pub fn toggle_mute(&mut self) {
        let next = self.volume.toggle_mute(self.current_volume());
        self.apply_volume(next);
        self.volume_sink.save_volume(next.effective());
        self.publish();
    }

    fn step_volume(&mut self, delta: f64) {
        let Some(next) = self.volume.step(self.current_volume(), delta) else {
            return;
        };
        self.apply_volume(next);
        self.volume_sink.save_volume(next.level);
        self.publish();
    }

    // -- speed ------------------------------------------------------------

    /// Switch to `rate` if the speed menu offers it.
    pub fn set_playback_rate(&mut self, rate: f64) {
        if !self.speed.select(rate) {
            tracing::debug!(rate, "ignoring playback rate not in the speed menu");
            return;
        }
        if let Some(media) = self.media.as_mut() {
            media.set_playback_rate(rate);
        }
        self.publish();
    }

    pub fn toggle_speed_menu(&mut self) {
        self.speed.toggle_open();
        self.publish();
    }

    /// Pick a speed menu entry by its value text.
    pub fn choose_speed(&mut self, option: &str) {
        match self.speed.choose(option) {
            Some(rate) => {
                if let Some(media) = self.media.as_mut() {
                    media.set_playback_rate(rate);
                }
            }
            None => tracing::debug!(option, "ignoring unknown speed option"),
        }
        self.publish();
    }

    // -- display modes ----------------------------------------------------

    /// Enter or leave fullscreen. Failures are only logged.
    pub fn toggle_fullscreen(&mut self) {
        let (kind, request) = if self.platform.is_fullscreen() {
            (RequestKind::ExitFullscreen, self.platform.exit_fullscreen())
        } else {
            (RequestKind::EnterFullscreen, self.platform.request_fullscreen())
        };
        self.track(kind, request);
        self.publish();
    }

    pub fn toggle_picture_in_picture(&mut self) {
        let Some(media) = self.media.as_ref() else {
            return;
        };
        if !self.platform.picture_in_picture_enabled() || media.disable_picture_in_picture() {
            tracing::warn!("picture-in-picture is unsupported or disabled for this video");
            return;
        }
        let (kind, request) = if self.platform.in_picture_in_picture() {
            (
                RequestKind::ExitPictureInPicture,
                self.platform.exit_picture_in_picture(),
            )
        } else {
            (
                RequestKind::EnterPictureInPicture,
                self.platform.request_picture_in_picture(),
            )
        };
        self.track(kind, request);
        self.publish();
    }

    pub fn toggle_cinema_mode(&mut self) {
        self.cinema_mode = !self.cinema_mode;
        self.publish();
    }

    // -- subtitles --------------------------------------------------------

    /// Flip between showing and hidden once a track has been loaded.
    pub fn toggle_subtitles(&mut self) {
        if !self.subtitles_enabled {
            return;
        }
        let Some(track) = self.subtitles.as_mut() else {
            return;
        };
        let next = if track.mode() == TrackMode::Showing {
            TrackMode::Hidden
        } else {
            TrackMode::Showing
        };
        track.set_mode(next);
        tracing::debug!(mode = %next, "subtitle mode changed");
        self.publish();
    }

    pub fn load_subtitles(&mut self, file: &SelectedFile) {
        self.clear_error();
        if !file.is_webvtt() {
            self.show_error(
                InvalidSubtitleFileSnafu {
                    name: file.name.clone(),
                }
                .build(),
            );
            self.reset_subtitles();
            self.publish();
            return;
        }
        let Some(track) = self.subtitles.as_mut() else {
            tracing::warn!(file = %file.name, "no subtitle track to load into");
            self.publish();
            return;
        };

        if let Some(previous) = self.subtitle_resource.take() {
            self.platform.release_resource(&previous);
        }
        let url = self.platform.create_resource(file);
        let request = track.load(&url);
        track.set_mode(TrackMode::Hidden);
        self.subtitle_resource = Some(url);
        self.subtitles_enabled = true;
        self.subtitle_generation += 1;
        tracing::info!(file = %file.name, "loading subtitles");

        let generation = self.subtitle_generation;
        self.track(RequestKind::SubtitleTrack { generation }, request);
        self.publish();
    }

    fn reset_subtitles(&mut self) {
        if let Some(previous) = self.subtitle_resource.take() {
            self.platform.release_resource(&previous);
        }
        if let Some(track) = self.subtitles.as_mut() {
            track.clear_source();
            track.set_mode(TrackMode::Disabled);
        }
        self.subtitles_enabled = false;
        self.subtitle_generation += 1;
    }

    // -- sources ----------------------------------------------------------

    /// Replace the media source. Non-video files leave the current source
    /// untouched and raise a validation error.
    pub fn load_source(&mut self, file: &SelectedFile) {
        self.clear_error();
        if !file.is_video() {
            let mime_type = if file.mime_type.is_empty() {
                "unknown"
            } else {
                file.mime_type.as_str()
            };
            self.show_error(InvalidMediaTypeSnafu { mime_type }.build());
            self.publish();
            return;
        }
        let Some(media) = self.media.as_mut() else {
            tracing::warn!(file = %file.name, "no media handle to load into");
            self.publish();
            return;
        };

        if let Some(previous) = self.media_resource.take() {
            self.platform.release_resource(&previous);
        }
        let url = self.platform.create_resource(file);
        media.set_source(Some(&url));
        media.load();
        self.media_resource = Some(url);
        self.apply_playback_rate();
        tracing::info!(file = %file.name, "loading video");

        self.reset_subtitles();
        self.progress = ProgressDisplay::default();
        self.seek_tooltip = None;
        self.publish();
    }

    // -- input ------------------------------------------------------------

    pub fn execute(&mut self, command: Command) {
        tracing::trace!(%command, "executing command");
        match command {
            Command::PlayPause => self.play_pause(),
            Command::SkipBack => self.seek_relative(SeekDirection::Back, self.settings.skip_seconds),
            Command::SkipForward => {
                self.seek_relative(SeekDirection::Forward, self.settings.skip_seconds);
            }
            Command::ToggleMute => self.toggle_mute(),
            Command::VolumeUp => self.step_volume(self.settings.volume_step),
            Command::VolumeDown => self.step_volume(-self.settings.volume_step),
            Command::ToggleFullscreen => self.toggle_fullscreen(),
            Command::ToggleCinemaMode => self.toggle_cinema_mode(),
            Command::ToggleSubtitles => self.toggle_subtitles(),
            Command::TogglePictureInPicture => self.toggle_picture_in_picture(),
        }
    }

    /// Run the command bound to `input`. Returns whether one was bound.
    pub fn handle_key(&mut self, input: &KeyInput) -> bool {
        match self.keymap.resolve(input) {
            Some(command) => {
                self.execute(command);
                true
            }
            None => false,
        }
    }

    pub fn handle_pointer(&mut self, input: PointerInput) {
        let now = Instant::now();
        let touch = self.platform.is_touch_device();
        let gate = self.gate();
        match input {
            PointerInput::SurfaceEnter if !touch => {
                self.volume_slider_shown = true;
                self.visibility.pointer_enter_surface(now, gate);
            }
            PointerInput::SurfaceMove if !touch => self.visibility.pointer_move(now, gate),
            PointerInput::SurfaceLeave if !touch => {
                self.volume_slider_shown = false;
                self.visibility.pointer_leave_surface(now);
            }
            PointerInput::ControlsEnter if !touch => {
                self.visibility.pointer_enter_controls(now, gate);
            }
            PointerInput::ControlsLeave if !touch => self.visibility.pointer_leave_controls(gate),
            PointerInput::SurfaceEnter
            | PointerInput::SurfaceMove
            | PointerInput::SurfaceLeave
            | PointerInput::ControlsEnter
            | PointerInput::ControlsLeave => {}
            PointerInput::SurfaceTap => self.visibility.tap(now, gate),
            PointerInput::VideoClick => {
                if touch {
                    self.visibility.tap(now, gate);
                } else {
                    self.play_pause();
                    return;
                }
            }
            PointerInput::VolumeButton => {
                if touch {
                    self.volume_slider_shown = !self.volume_slider_shown;
                } else {
                    self.toggle_mute();
                    return;
                }
            }
            PointerInput::SeekBarPress { x, bar_width } => {
                if self.media_duration().is_some() {
                    self.set_scrubbing(true);
                    self.seek_absolute(pointer_ratio(x, bar_width));
                    return;
                }
            }
            PointerInput::SeekBarMove {
                x,
                bar_width,
                tooltip_width,
            } => {
                let duration = self.media_duration().unwrap_or(f64::NAN);
                if !touch {
                    self.seek_tooltip = SeekTooltip::at(x, bar_width, tooltip_width, duration);
                }
                if self.scrubbing {
                    self.seek_absolute(pointer_ratio(x, bar_width));
                    return;
                }
            }
            PointerInput::SeekBarClick { x, bar_width } => {
                self.seek_absolute(pointer_ratio(x, bar_width));
                return;
            }
            PointerInput::SeekBarLeave => {
                self.seek_tooltip = None;
                self.set_scrubbing(false);
            }
            PointerInput::Release => self.set_scrubbing(false),
        }
        self.publish();
    }

    fn set_scrubbing(&mut self, scrubbing: bool) {
        if self.scrubbing == scrubbing {
            return;
        }
        self.scrubbing = scrubbing;
        let gate = self.gate();
        if scrubbing {
            self.visibility.cancel_hide();
        } else if self.visibility.is_visible() {
            self.visibility.schedule_hide(Instant::now(), gate);
        }
    }

    // -- host notifications -----------------------------------------------

    pub fn on_media_event(&mut self, event: MediaEvent) {
        tracing::trace!(?event, "media event");
        let now = Instant::now();
        match event {
            MediaEvent::Play => {
                if self.visibility.is_visible() {
                    let gate = self.gate();
                    self.visibility.schedule_hide(now, gate);
                }
            }
            MediaEvent::Pause => self.visibility.cancel_hide(),
            MediaEvent::Ended => {
                self.visibility.cancel_hide();
                tracing::info!("video finished playing");
            }
            MediaEvent::TimeUpdate => self.refresh_progress(),
            MediaEvent::DurationChange => {
                self.refresh_progress();
                self.refresh_duration();
            }
            MediaEvent::LoadedMetadata => self.refresh_duration(),
            MediaEvent::VolumeChange
            | MediaEvent::FullscreenChange
            | MediaEvent::PictureInPictureChange => {}
            MediaEvent::Error => {
                let code = self.media.as_ref().and_then(|m| m.error_code());
                let kind = code.map_or(MediaErrorKind::Unknown(0), MediaErrorKind::from_code);
                self.show_error(MediaSnafu { kind }.build());
            }
        }
        self.publish();
    }

    // -- timers and pending requests --------------------------------------

    /// Fire expired visibility deadlines.
    pub fn poll_timers(&mut self) {
        let gate = self.gate();
        if self.visibility.poll(Instant::now(), gate) {
            tracing::trace!(visible = self.visibility.is_visible(), "controls visibility changed");
        }
        self.publish();
    }

    pub fn next_deadline(&self) -> Option<Instant> { self.visibility.next_deadline() }

    pub fn has_pending(&self) -> bool { !self.pending.is_empty() }

    /// Wait for the next platform request to settle and apply it. Returns
    /// false when nothing is pending. Cancel safe.
    pub async fn settle_next(&mut self) -> bool {
        match self.pending.next().await {
            Some(settlement) => {
                self.apply_settlement(settlement);
                true
            }
            None => false,
        }
    }

    /// Settle everything currently pending, including requests issued while
    /// settling.
    pub async fn settle_all(&mut self) { while self.settle_next().await {} }

    fn track(&mut self, kind: RequestKind, request: PlatformRequest) {
        self.pending.push(
            async move {
                Settlement {
                    kind,
                    result: request.await,
                }
            }
            .boxed_local(),
        );
    }

    fn apply_settlement(&mut self, Settlement { kind, result }: Settlement) {
        match (kind, result) {
            (RequestKind::SubtitleTrack { generation }, Ok(())) => {
                if generation == self.subtitle_generation {
                    tracing::debug!("subtitle track ready");
                }
            }
            (_, Ok(())) => tracing::trace!(?kind, "platform request settled"),
            (RequestKind::Play, Err(e)) if e.kind() == PlatformErrorKind::Aborted => {
                tracing::debug!(error = %e, "play request interrupted");
            }
            (RequestKind::Play, Err(e)) => {
                tracing::warn!(error = %e, "error playing video");
                self.show_error(PlaySnafu.into_error(e));
            }
            (RequestKind::EnterFullscreen | RequestKind::ExitFullscreen, Err(e)) => {
                tracing::error!(
                    error = %e,
                    kind = %e.kind(),
                    entering = kind == RequestKind::EnterFullscreen,
                    "fullscreen request failed"
                );
            }
            (RequestKind::EnterPictureInPicture | RequestKind::ExitPictureInPicture, Err(e)) => {
                self.show_error(PictureInPictureSnafu.into_error(e));
            }
            (RequestKind::SubtitleTrack { generation }, Err(e)) => {
                if generation == self.subtitle_generation {
                    tracing::warn!(error = %e, "subtitle track failed to load");
                    self.reset_subtitles();
                }
            }
        }
        self.publish();
    }

    // -- helpers ----------------------------------------------------------

    fn show_error(&mut self, error: PlayerError) {
        if error.is_validation() {
            tracing::warn!(%error, "rejected input");
        } else {
            tracing::error!(%error, "video player error");
        }
        self.error = Some(error);
        self.visibility.force_hidden();
    }

    fn clear_error(&mut self) {
        if self.error.take().is_some() {
            let gate = self.gate();
            self.visibility.show(Instant::now(), gate);
        }
    }

    fn gate(&self) -> VisibilityGate {
        VisibilityGate {
            playing:     self.media.as_ref().is_some_and(|m| !m.paused() && !m.ended()),
            scrubbing:   self.scrubbing,
            error_shown: self.error.is_some(),
        }
    }

    fn controls_visible(&self) -> bool { self.error.is_none() && self.visibility.is_visible() }

    fn media_duration(&self) -> Option<f64> {
        self.media.as_ref().and_then(|m| known_duration(m.duration()))
    }

    fn current_volume(&self) -> VolumeLevel {
        self.media.as_ref().map_or(self.detached_volume, |m| VolumeLevel {
            level: m.volume(),
            muted: m.muted(),
        })
    }

    fn apply_volume(&mut self, level: VolumeLevel) {
        self.detached_volume = level;
        if let Some(media) = self.media.as_mut() {
            media.set_volume(level.level);
            media.set_muted(level.muted);
        }
    }

    fn apply_playback_rate(&mut self) {
        let rate = self.speed.selected_rate();
        if let Some(media) = self.media.as_mut() {
            media.set_playback_rate(rate);
        }
    }

    fn refresh_progress(&mut self) {
        if let Some(media) = self.media.as_ref() {
            self.progress
                .update_time(media.current_time(), media.duration());
        }
    }

    fn refresh_duration(&mut self) {
        if let Some(media) = self.media.as_ref() {
            self.progress.update_duration(media.duration());
        }
    }

    fn snapshot(&self) -> PlayerView {
        let (paused, ended) = self
            .media
            .as_ref()
            .map_or((true, false), |m| (m.paused(), m.ended()));
        let volume = self.current_volume();
        let track_mode = self
            .subtitles
            .as_ref()
            .map_or(TrackMode::Disabled, |t| t.mode());

        PlayerView {
            play_pause:          PlayPauseIcon::from_state(paused, ended),
            volume_icon:         VolumeIcon::from_state(volume.level, volume.muted),
            volume_slider:       volume.effective(),
            volume_slider_shown: self.volume_slider_shown,
            fullscreen:          FullscreenIcon::from_state(self.platform.is_fullscreen()),
            subtitle_icon:       SubtitleIcon::from_state(self.subtitles_enabled, track_mode),
            subtitles_enabled:   self.subtitles_enabled,
            progress:            self.progress.fraction,
            seek_tooltip:        self.seek_tooltip.clone(),
            current_time:        self.progress.current_label.clone(),
            duration:            self.progress.duration_label.clone(),
            speed_label:         speed_label(self.speed.selected_rate()),
            speed_index:         self.speed.selected_index(),
            speed_menu_open:     self.speed.is_open(),
            pip_available:       self.platform.picture_in_picture_enabled(),
            controls_visible:    self.controls_visible(),
            cinema_mode:         self.cinema_mode,
            error:               self.error.as_ref().map(ToString::to_string),
        }
    }

    fn publish(&self) {
        let next = self.snapshot();
        self.view_tx.send_if_modified(|view| {
            if *view == next {
                false
            } else {
                *view = next;
                true
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use tokio::sync::mpsc;

    use super::*;
    use crate::{
        err::MediaErrorKind,
        headless::{
            EventSender, HeadlessMedia, HeadlessPlatform, HeadlessSubtitleTrack, MemoryVolumeSink,
        },
        keymap::Key,
    };

    struct Harness {
        controller: PlayerController,
        media:      HeadlessMedia,
        platform:   HeadlessPlatform,
        track:      HeadlessSubtitleTrack,
        sink:       MemoryVolumeSink,
        events:     mpsc::UnboundedReceiver<MediaEvent>,
    }

    impl Harness {
        fn new() -> Self { Self::with(|tx| HeadlessPlatform::builder(tx).build(), None) }

        fn saved(volume: f64) -> Self {
            Self::with(|tx| HeadlessPlatform::builder(tx).build(), Some(volume))
        }

        fn with(
            platform: impl FnOnce(EventSender) -> HeadlessPlatform,
            saved_volume: Option<f64>,
        ) -> Self {
            let (tx, events) = mpsc::unbounded_channel();
            let media = HeadlessMedia::new(tx.clone());
            let platform = platform(tx);
            let track = HeadlessSubtitleTrack::new();
            let sink = MemoryVolumeSink::new();
            let controller = PlayerController::builder()
                .platform(Box::new(platform.clone()))
                .media(Box::new(media.clone()))
                .subtitles(Box::new(track.clone()))
                .volume_sink(Box::new(sink.clone()))
                .maybe_saved_volume(saved_volume)
                .build();
            let mut harness = Self {
                controller,
                media,
                platform,
                track,
                sink,
                events,
            };
            harness.pump();
            harness
        }

        fn touch() -> Self { Self::with(|tx| HeadlessPlatform::builder(tx).touch(true).build(), None) }

        fn pump(&mut self) {
            while let Ok(event) = self.events.try_recv() {
                self.controller.on_media_event(event);
            }
        }

        fn load_video(&mut self, duration: f64) {
            self.controller
                .load_source(&SelectedFile::from_path("/videos/clip.mp4"));
            self.media.finish_loading(duration);
            self.pump();
        }

        async fn start_playback(&mut self) {
            self.controller.play_pause();
            self.controller.settle_all().await;
            self.pump();
        }

        fn key(&mut self, name: &str) -> bool {
            self.controller
                .handle_key(&KeyInput::new(Key::new(name).unwrap()))
        }
    }

    #[test]
    fn set_volume_mutes_exactly_at_zero() {
        let mut h = Harness::new();
        for v in [0.0, 0.3, 0.5, 0.51, 1.0] {
            h.controller.set_volume(v);
            assert_eq!(h.media.muted(), v == 0.0, "volume {v}");
        }
        h.controller.set_volume(4.0);
        assert_eq!(h.media.volume(), 1.0);
        assert_eq!(h.sink.last(), Some(1.0));
    }

    #[test]
    fn slider_drives_volume_icon() {
        let mut h = Harness::new();
        h.controller.set_volume(0.0);
        h.pump();
        assert!(h.media.muted());
        assert_eq!(h.controller.view().volume_icon, VolumeIcon::Muted);

        h.controller.set_volume(0.3);
        h.pump();
        assert!(!h.media.muted());
        assert_eq!(h.controller.view().volume_icon, VolumeIcon::Low);
        assert_eq!(h.controller.view().volume_slider, 0.3);
    }

    #[test]
    fn toggle_mute_twice_restores() {
        let mut h = Harness::new();
        h.controller.set_volume(0.6);
        let before = (h.media.muted(), h.media.volume());

        h.controller.toggle_mute();
        assert!(h.media.muted());
        assert_eq!(h.sink.last(), Some(0.0));
        assert_eq!(h.controller.view().volume_slider, 0.0);

        h.controller.toggle_mute();
        assert_eq!((h.media.muted(), h.media.volume()), before);
        assert_eq!(h.sink.last(), Some(0.6));
    }

    #[test]
    fn unmute_from_zero_restores_last_audible_level() {
        let mut h = Harness::new();
        h.controller.set_volume(0.4);
        h.controller.set_volume(0.0);
        assert!((h.controller.state().last_non_zero_volume - 0.4).abs() < f64::EPSILON);

        h.controller.toggle_mute();
        assert!(!h.media.muted());
        assert_eq!(h.media.volume(), 0.4);
    }

    #[test]
    fn saved_volume_is_validated() {
        let h = Harness::saved(5.0);
        assert_eq!(h.media.volume(), 1.0);
        assert!(!h.media.muted());

        let h = Harness::saved(0.25);
        assert_eq!(h.media.volume(), 0.25);
        assert_eq!(h.controller.view().volume_icon, VolumeIcon::Low);

        let h = Harness::saved(0.0);
        assert!(h.media.muted());
        assert_eq!(h.controller.state().last_non_zero_volume, 1.0);
    }

    #[test]
    fn playback_rate_must_be_offered() {
        let mut h = Harness::new();
        h.controller.set_playback_rate(1.5);
        assert_eq!(h.media.playback_rate(), 1.5);
        assert_eq!(h.controller.view().speed_label, "1.5x");

        for rate in [1.25, f64::NAN, 0.0, 3.0] {
            h.controller.set_playback_rate(rate);
            assert_eq!(h.controller.state().selected_speed_index, 3);
            assert_eq!(h.media.playback_rate(), 1.5);
        }
    }

    #[test]
    fn speed_menu_selection() {
        let mut h = Harness::new();
        h.controller.toggle_speed_menu();
        assert!(h.controller.view().speed_menu_open);

        h.controller.choose_speed("0.5");
        let view = h.controller.view();
        assert!(!view.speed_menu_open);
        assert_eq!(view.speed_index, 0);
        assert_eq!(h.media.playback_rate(), 0.5);
    }

    #[test]
    fn seek_absolute_clamps_ratio() {
        let mut h = Harness::new();
        h.load_video(120.0);

        h.controller.seek_absolute(1.5);
        assert_eq!(h.media.current_time(), 120.0);
        h.controller.seek_absolute(-0.5);
        assert_eq!(h.media.current_time(), 0.0);
        h.controller.seek_absolute(0.5);
        assert_eq!(h.media.current_time(), 60.0);
        h.pump();
        assert_eq!(h.controller.view().progress, 0.5);
        assert_eq!(h.controller.view().current_time, "01:00");
    }

    #[test]
    fn seek_ignored_without_duration() {
        let mut h = Harness::new();
        h.controller
            .load_source(&SelectedFile::from_path("/videos/clip.mp4"));
        h.controller.seek_absolute(0.5);
        assert_eq!(h.media.current_time(), 0.0);
    }

    #[test]
    fn click_at_quarter_of_bar() {
        let mut h = Harness::new();
        h.load_video(120.0);
        h.controller.handle_pointer(PointerInput::SeekBarClick {
            x:         100.0,
            bar_width: 400.0,
        });
        assert_eq!(h.media.current_time(), 30.0);
    }

    #[test]
    fn skip_keys_move_by_ten_seconds() {
        let mut h = Harness::new();
        h.load_video(120.0);
        h.controller.seek_absolute(0.5);

        assert!(h.key("ArrowRight"));
        assert_eq!(h.media.current_time(), 70.0);
        assert!(h.key("ArrowLeft"));
        assert!(h.key("left"));
        assert_eq!(h.media.current_time(), 50.0);

        h.controller.seek_relative(SeekDirection::Back, 500.0);
        assert_eq!(h.media.current_time(), 0.0);
    }

    #[test]
    fn keys_ignored_in_text_entry() {
        let mut h = Harness::new();
        let input = KeyInput {
            key:           Key::new("m").unwrap(),
            in_text_entry: true,
        };
        assert!(!h.controller.handle_key(&input));
        assert!(!h.media.muted());

        assert!(h.key("m"));
        assert!(h.media.muted());
        assert!(h.key("c"));
        assert!(h.controller.view().cinema_mode);
        assert!(!h.key("q"));
    }

    #[test]
    fn volume_keys_step() {
        let mut h = Harness::new();
        h.controller.set_volume(0.5);
        assert!(h.key("ArrowDown"));
        assert!((h.media.volume() - 0.4).abs() < 1e-9);
        assert!((h.sink.last().unwrap() - 0.4).abs() < 1e-9);
        assert!(h.key("ArrowUp"));
        assert!(h.key("ArrowUp"));
        assert!((h.media.volume() - 0.6).abs() < 1e-9);
        assert!((h.sink.last().unwrap() - 0.6).abs() < 1e-9);
        assert_eq!(h.sink.saved().len(), 4);
    }

    #[test]
    fn custom_speeds_are_applied_to_the_media() {
        let (tx, _events) = mpsc::unbounded_channel();
        let media = HeadlessMedia::new(tx.clone());
        let mut controller = PlayerController::builder()
            .platform(Box::new(HeadlessPlatform::builder(tx).build()))
            .media(Box::new(media.clone()))
            .volume_sink(Box::new(MemoryVolumeSink::new()))
            .settings(
                PlayerSettings::builder()
                    .playback_speeds(vec![0.25, 3.0])
                    .build(),
            )
            .build();
        assert_eq!(controller.view().speed_label, "0.25x");
        assert_eq!(media.playback_rate(), 0.25);

        controller.set_playback_rate(3.0);
        controller.load_source(&SelectedFile::from_path("/videos/clip.mp4"));
        assert_eq!(controller.view().speed_label, "3x");
        assert_eq!(media.playback_rate(), 3.0);
    }

    #[test]
    fn rejected_source_leaves_player_intact() {
        let mut h = Harness::new();
        h.load_video(120.0);
        h.controller.seek_absolute(0.25);
        h.pump();
        let source = h.media.source();
        let before = h.controller.view();

        h.controller.load_source(
            &SelectedFile::builder()
                .name("notes.txt")
                .mime_type("text/plain")
                .build(),
        );

        assert_eq!(h.media.source(), source);
        assert_eq!(h.media.duration(), 120.0);
        let view = h.controller.view();
        assert_eq!(view.progress, before.progress);
        assert_eq!(view.duration, before.duration);
        let error = h.controller.error().unwrap();
        assert!(error.is_validation());
        assert_eq!(
            view.error.as_deref(),
            Some("Invalid file type for video: text/plain. Please select a video file.")
        );
    }

    #[test]
    fn unknown_type_is_named_unknown() {
        let mut h = Harness::new();
        h.controller
            .load_source(&SelectedFile::builder().name("blob").build());
        assert_eq!(
            h.controller.view().error.as_deref(),
            Some("Invalid file type for video: unknown. Please select a video file.")
        );
    }

    #[test]
    fn new_source_resets_ui_and_releases_previous() {
        let mut h = Harness::new();
        h.load_video(120.0);
        h.controller.seek_absolute(0.5);
        h.pump();
        h.controller
            .load_subtitles(&SelectedFile::builder().name("clip.vtt").build());
        assert_eq!(h.platform.live_resources().len(), 2);

        h.controller
            .load_source(&SelectedFile::from_path("/videos/other.webm"));
        h.pump();

        let view = h.controller.view();
        assert_eq!(view.duration, "--:--");
        assert_eq!(view.current_time, "00:00");
        assert_eq!(view.progress, 0.0);
        assert!(!view.subtitles_enabled);
        assert_eq!(h.track.mode(), TrackMode::Disabled);
        assert_eq!(h.track.source(), None);
        let live = h.platform.live_resources();
        assert_eq!(live.len(), 1);
        assert!(live[0].ends_with("other.webm"));
    }

    #[test]
    fn ended_shows_replay() {
        let mut h = Harness::new();
        h.load_video(5.0);
        futures::executor::block_on(h.start_playback());
        assert_eq!(h.controller.view().play_pause, PlayPauseIcon::Pause);

        h.media.advance(6.0);
        h.pump();
        assert_eq!(h.controller.view().play_pause, PlayPauseIcon::Replay);
        assert_eq!(h.controller.view().progress, 1.0);

        h.controller.play_pause();
        h.pump();
        assert_eq!(h.media.current_time(), 0.0);
        assert_eq!(h.controller.view().play_pause, PlayPauseIcon::Pause);
    }

    #[tokio::test]
    async fn play_failure_is_displayed() {
        let mut h = Harness::new();
        h.controller.play_pause();
        assert!(h.controller.has_pending());
        h.controller.settle_all().await;
        assert_eq!(
            h.controller.view().error.as_deref(),
            Some("Could not play video: The element has no supported sources.")
        );
        assert!(!h.controller.view().controls_visible);
    }

    #[tokio::test]
    async fn play_interrupted_by_pause_is_not_an_error() {
        let mut h = Harness::new();
        h.controller
            .load_source(&SelectedFile::from_path("/videos/clip.mp4"));
        h.controller.play_pause();
        h.pump();
        h.controller.play_pause();
        h.controller.settle_all().await;
        assert!(h.controller.error().is_none());
        assert!(h.media.paused());
    }

    #[tokio::test]
    async fn media_error_suppresses_controls_until_next_file() {
        let mut h = Harness::new();
        h.load_video(30.0);
        h.media.fail(4);
        h.pump();

        assert!(matches!(
            h.controller.error(),
            Some(PlayerError::Media {
                kind: MediaErrorKind::SourceNotSupported,
                ..
            })
        ));
        let view = h.controller.view();
        assert!(!view.controls_visible);
        h.controller.handle_pointer(PointerInput::SurfaceMove);
        assert!(!h.controller.view().controls_visible);

        h.controller
            .load_source(&SelectedFile::from_path("/videos/fixed.mp4"));
        assert!(h.controller.error().is_none());
        assert!(h.controller.view().controls_visible);
    }

    #[tokio::test]
    async fn picture_in_picture_refusal_is_displayed() {
        let mut h = Harness::new();
        h.load_video(30.0);
        h.platform.refuse_picture_in_picture("denied by user");
        h.controller.toggle_picture_in_picture();
        h.controller.settle_all().await;
        assert_eq!(
            h.controller.view().error.as_deref(),
            Some("Picture-in-Picture Error: denied by user")
        );

        h.controller.dismiss_error();
        h.controller.toggle_picture_in_picture();
        h.controller.settle_all().await;
        assert!(h.platform.in_picture_in_picture());
        h.controller.toggle_picture_in_picture();
        h.controller.settle_all().await;
        assert!(!h.platform.in_picture_in_picture());
    }

    #[tokio::test]
    async fn picture_in_picture_respects_capability() {
        let mut h = Harness::with(
            |tx| HeadlessPlatform::builder(tx).picture_in_picture(false).build(),
            None,
        );
        assert!(!h.controller.view().pip_available);
        h.controller.toggle_picture_in_picture();
        assert!(!h.controller.has_pending());

        let mut h = Harness::new();
        h.media.set_disable_picture_in_picture(true);
        h.controller.toggle_picture_in_picture();
        assert!(!h.controller.has_pending());
    }

    #[tokio::test]
    async fn fullscreen_toggles_and_failures_stay_quiet() {
        let mut h = Harness::new();
        h.controller.toggle_fullscreen();
        h.controller.settle_all().await;
        h.pump();
        assert_eq!(h.controller.view().fullscreen, FullscreenIcon::Exit);
        assert!(h.key("f"));
        h.controller.settle_all().await;
        h.pump();
        assert_eq!(h.controller.view().fullscreen, FullscreenIcon::Enter);

        let mut h = Harness::with(
            |tx| HeadlessPlatform::builder(tx).fullscreen(false).build(),
            None,
        );
        h.controller.toggle_fullscreen();
        h.controller.settle_all().await;
        assert!(h.controller.error().is_none());
        assert_eq!(h.controller.view().fullscreen, FullscreenIcon::Enter);
    }

    #[tokio::test]
    async fn subtitles_load_and_toggle() {
        let mut h = Harness::new();
        h.controller.toggle_subtitles();
        assert_eq!(h.track.mode(), TrackMode::Disabled);

        h.controller
            .load_subtitles(&SelectedFile::builder().name("Clip.VTT").build());
        assert_eq!(h.track.mode(), TrackMode::Hidden);
        assert!(h.controller.view().subtitles_enabled);
        h.controller.settle_all().await;
        assert_eq!(h.controller.view().subtitle_icon, SubtitleIcon::Off);

        h.controller.toggle_subtitles();
        assert_eq!(h.track.mode(), TrackMode::Showing);
        assert_eq!(h.controller.view().subtitle_icon, SubtitleIcon::On);
        h.controller.toggle_subtitles();
        assert_eq!(h.track.mode(), TrackMode::Hidden);
    }

    #[tokio::test]
    async fn invalid_subtitles_reset_track() {
        let mut h = Harness::new();
        h.controller
            .load_subtitles(&SelectedFile::builder().name("a.vtt").build());
        h.controller.settle_all().await;

        h.controller
            .load_subtitles(&SelectedFile::builder().name("a.srt").build());
        assert_eq!(
            h.controller.view().error.as_deref(),
            Some("Invalid file type for subtitles: a.srt. Please select a .vtt file.")
        );
        assert!(!h.controller.view().subtitles_enabled);
        assert_eq!(h.track.mode(), TrackMode::Disabled);
        assert!(h.platform.live_resources().is_empty());
    }

    #[tokio::test]
    async fn subtitle_track_failure_disables_toggle() {
        let mut h = Harness::new();
        h.track.fail_next_load("malformed cues");
        h.controller
            .load_subtitles(&SelectedFile::builder().name("a.vtt").build());
        h.controller.settle_all().await;
        assert!(!h.controller.view().subtitles_enabled);
        assert_eq!(h.track.mode(), TrackMode::Disabled);
        assert!(h.controller.error().is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn controls_hide_after_idle_playback() {
        let mut h = Harness::new();
        h.load_video(120.0);
        h.start_playback().await;
        h.controller.handle_pointer(PointerInput::SurfaceMove);
        assert!(h.controller.state().controls_visible);
        assert!(h.controller.state().hide_controls_deadline.is_some());

        tokio::time::advance(Duration::from_millis(2999)).await;
        h.controller.poll_timers();
        assert!(h.controller.view().controls_visible);

        tokio::time::advance(Duration::from_millis(1)).await;
        h.controller.poll_timers();
        assert!(!h.controller.view().controls_visible);

        h.controller.handle_pointer(PointerInput::SurfaceMove);
        assert!(h.controller.view().controls_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn pause_and_scrubbing_cancel_hiding() {
        let mut h = Harness::new();
        h.load_video(120.0);
        h.start_playback().await;
        h.controller.handle_pointer(PointerInput::SurfaceMove);

        h.controller.handle_pointer(PointerInput::SeekBarPress {
            x:         200.0,
            bar_width: 400.0,
        });
        let state = h.controller.state();
        assert!(state.is_scrubbing);
        assert_eq!(state.hide_controls_deadline, None);
        assert_eq!(h.media.current_time(), 60.0);

        h.controller.handle_pointer(PointerInput::SeekBarMove {
            x:             300.0,
            bar_width:     400.0,
            tooltip_width: 40.0,
        });
        assert_eq!(h.media.current_time(), 90.0);

        h.controller.handle_pointer(PointerInput::Release);
        assert!(!h.controller.state().is_scrubbing);
        assert!(h.controller.state().hide_controls_deadline.is_some());

        h.controller.play_pause();
        h.pump();
        assert_eq!(h.controller.state().hide_controls_deadline, None);
        tokio::time::advance(Duration::from_secs(10)).await;
        h.controller.poll_timers();
        assert!(h.controller.view().controls_visible);
    }

    #[tokio::test(start_paused = true)]
    async fn leaving_the_surface_hides_after_grace() {
        let mut h = Harness::new();
        h.controller.handle_pointer(PointerInput::SurfaceEnter);
        assert!(h.controller.view().volume_slider_shown);
        h.controller.handle_pointer(PointerInput::SurfaceLeave);
        assert!(!h.controller.view().volume_slider_shown);

        let deadline = h.controller.next_deadline().unwrap();
        tokio::time::sleep_until(deadline).await;
        h.controller.poll_timers();
        assert!(!h.controller.view().controls_visible);
    }

    #[test]
    fn seek_tooltip_on_pointer_devices_only() {
        let mut h = Harness::new();
        h.load_video(120.0);
        h.controller.handle_pointer(PointerInput::SeekBarMove {
            x:             100.0,
            bar_width:     400.0,
            tooltip_width: 40.0,
        });
        let tip = h.controller.view().seek_tooltip.unwrap();
        assert_eq!(tip.label, "00:30");
        assert_eq!(tip.offset, 80.0);
        h.controller.handle_pointer(PointerInput::SeekBarLeave);
        assert!(h.controller.view().seek_tooltip.is_none());

        let mut h = Harness::touch();
        h.load_video(120.0);
        h.controller.handle_pointer(PointerInput::SeekBarMove {
            x:             100.0,
            bar_width:     400.0,
            tooltip_width: 40.0,
        });
        assert!(h.controller.view().seek_tooltip.is_none());
    }

    #[test]
    fn touch_taps_toggle_controls_and_slider() {
        let mut h = Harness::touch();
        h.load_video(120.0);
        assert!(h.controller.view().controls_visible);

        h.controller.handle_pointer(PointerInput::VideoClick);
        assert!(!h.controller.view().controls_visible);
        assert!(h.media.paused());
        h.controller.handle_pointer(PointerInput::SurfaceTap);
        assert!(h.controller.view().controls_visible);

        h.controller.handle_pointer(PointerInput::VolumeButton);
        assert!(h.controller.view().volume_slider_shown);
        assert!(!h.media.muted());

        h.controller.handle_pointer(PointerInput::SurfaceEnter);
        h.controller.handle_pointer(PointerInput::SurfaceLeave);
        assert!(h.controller.view().volume_slider_shown);
    }

    #[test]
    fn pointer_clicks_play_and_mute() {
        let mut h = Harness::new();
        h.load_video(120.0);
        h.controller.handle_pointer(PointerInput::VideoClick);
        h.pump();
        assert!(!h.media.paused());
        h.controller.handle_pointer(PointerInput::VolumeButton);
        assert!(h.media.muted());
    }

    #[test]
    fn subscribers_see_changes() {
        let mut h = Harness::new();
        let mut rx = h.controller.subscribe();
        assert!(!rx.has_changed().unwrap());

        h.controller.set_volume(0.3);
        assert!(rx.has_changed().unwrap());
        assert_eq!(rx.borrow_and_update().volume_icon, VolumeIcon::Low);

        h.controller.set_volume(0.3);
        assert!(!rx.has_changed().unwrap());
    }
}
