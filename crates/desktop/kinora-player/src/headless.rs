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

//! In-process host for running the player without a real media engine.
//!
//! Each handle is a cheap clone over shared state, so the driver can keep
//! one copy to move the clock or inject failures while the controller owns
//! another. State changes are reported on an unbounded event channel, the
//! way a platform would dispatch media events.

use std::{cell::RefCell, collections::BTreeSet, rc::Rc};

use futures::{FutureExt, future};
use tokio::sync::{mpsc, oneshot};

use crate::{
    err::{PlatformError, PlatformErrorKind},
    host::{
        MediaElement, MediaEvent, Platform, PlatformRequest, ResourceUrl, SelectedFile,
        SubtitleTrack, TrackMode, VolumeSink,
    },
};

pub type EventSender = mpsc::UnboundedSender<MediaEvent>;

fn settled(result: Result<(), PlatformError>) -> PlatformRequest {
    future::ready(result).boxed_local()
}

fn emit(events: &EventSender, event: MediaEvent) {
    if events.send(event).is_err() {
        tracing::trace!(?event, "no listener for media event");
    }
}

#[derive(Debug)]
struct MediaState {
    source:        Option<ResourceUrl>,
    loading:       bool,
    current_time:  f64,
    duration:      f64,
    paused:        bool,
    ended:         bool,
    volume:        f64,
    muted:         bool,
    playback_rate: f64,
    error_code:    Option<u16>,
    pip_disabled:  bool,
    waiting_plays: Vec<oneshot::Sender<Result<(), PlatformError>>>,
}

impl Default for MediaState {
    fn default() -> Self {
        Self {
            source:        None,
            loading:       false,
            current_time:  0.0,
            duration:      f64::NAN,
            paused:        true,
            ended:         false,
            volume:        1.0,
            muted:         false,
            playback_rate: 1.0,
            error_code:    None,
            pip_disabled:  false,
            waiting_plays: Vec::new(),
        }
    }
}

impl MediaState {
    fn settle_plays(&mut self, result: &Result<(), PlatformError>) {
        for waiter in self.waiting_plays.drain(..) {
            // The controller may have been dropped; nobody to tell.
            let _ = waiter.send(result.clone());
        }
    }
}

/// Media handle with a simulated clock.
///
/// `play` resolves once the source finishes loading and is aborted by a
/// `pause` issued before that.
#[derive(Debug, Clone)]
pub struct HeadlessMedia {
    state:  Rc<RefCell<MediaState>>,
    events: EventSender,
}

impl HeadlessMedia {
    pub fn new(events: EventSender) -> Self {
        Self {
            state: Rc::default(),
            events,
        }
    }

    fn emit(&self, event: MediaEvent) { emit(&self.events, event); }

    pub fn source(&self) -> Option<ResourceUrl> { self.state.borrow().source.clone() }

    pub fn is_loading(&self) -> bool { self.state.borrow().loading }

    /// Opt the current source out of picture-in-picture.
    pub fn set_disable_picture_in_picture(&self, disabled: bool) {
        self.state.borrow_mut().pip_disabled = disabled;
    }

    /// Finish loading the current source with the given duration.
    pub fn finish_loading(&self, duration: f64) {
        {
            let mut state = self.state.borrow_mut();
            if state.source.is_none() {
                return;
            }
            state.loading = false;
            state.duration = duration;
            state.settle_plays(&Ok(()));
        }
        self.emit(MediaEvent::DurationChange);
        self.emit(MediaEvent::LoadedMetadata);
    }

    /// Report a platform media error with `code`.
    pub fn fail(&self, code: u16) {
        {
            let mut state = self.state.borrow_mut();
            state.loading = false;
            state.error_code = Some(code);
            state.paused = true;
            state.settle_plays(&Err(PlatformError::new(
                PlatformErrorKind::NotSupported,
                "The element has no supported sources.",
            )));
        }
        self.emit(MediaEvent::Error);
    }

    /// Move the clock forward by `seconds` of wall time.
    pub fn advance(&self, seconds: f64) {
        let finished = {
            let mut state = self.state.borrow_mut();
            if state.paused || state.ended || state.loading || state.source.is_none() {
                return;
            }
            state.current_time += seconds * state.playback_rate;
            if state.duration.is_finite() && state.current_time >= state.duration {
                state.current_time = state.duration;
                state.ended = true;
                state.paused = true;
                true
            } else {
                false
            }
        };
        self.emit(MediaEvent::TimeUpdate);
        if finished {
            self.emit(MediaEvent::Pause);
            self.emit(MediaEvent::Ended);
        }
    }
}

impl MediaElement for HeadlessMedia {
    fn current_time(&self) -> f64 { self.state.borrow().current_time }

    fn set_current_time(&mut self, seconds: f64) {
        {
            let mut state = self.state.borrow_mut();
            let upper = if state.duration.is_finite() {
                state.duration
            } else {
                f64::INFINITY
            };
            state.current_time = seconds.clamp(0.0, upper);
            if state.current_time < upper {
                state.ended = false;
            }
        }
        self.emit(MediaEvent::TimeUpdate);
    }

    fn duration(&self) -> f64 { self.state.borrow().duration }

    fn paused(&self) -> bool { self.state.borrow().paused }

    fn ended(&self) -> bool { self.state.borrow().ended }

    fn volume(&self) -> f64 { self.state.borrow().volume }

    fn set_volume(&mut self, level: f64) {
        let changed = {
            let mut state = self.state.borrow_mut();
            let level = level.clamp(0.0, 1.0);
            let changed = (state.volume - level).abs() > f64::EPSILON;
            state.volume = level;
            changed
        };
        if changed {
            self.emit(MediaEvent::VolumeChange);
        }
    }

    fn muted(&self) -> bool { self.state.borrow().muted }

    fn set_muted(&mut self, muted: bool) {
        let changed = std::mem::replace(&mut self.state.borrow_mut().muted, muted) != muted;
        if changed {
            self.emit(MediaEvent::VolumeChange);
        }
    }

    fn playback_rate(&self) -> f64 { self.state.borrow().playback_rate }

    fn set_playback_rate(&mut self, rate: f64) { self.state.borrow_mut().playback_rate = rate; }

    fn error_code(&self) -> Option<u16> { self.state.borrow().error_code }

    fn disable_picture_in_picture(&self) -> bool { self.state.borrow().pip_disabled }

    fn play(&mut self) -> PlatformRequest {
        let mut state = self.state.borrow_mut();
        if state.source.is_none() || state.error_code.is_some() {
            return settled(Err(PlatformError::new(
                PlatformErrorKind::NotSupported,
                "The element has no supported sources.",
            )));
        }
        if state.ended {
            state.current_time = 0.0;
            state.ended = false;
        }
        let was_paused = std::mem::replace(&mut state.paused, false);
        let request = if state.loading {
            let (tx, rx) = oneshot::channel();
            state.waiting_plays.push(tx);
            async move {
                rx.await.unwrap_or_else(|_| {
                    Err(PlatformError::new(
                        PlatformErrorKind::Aborted,
                        "The media element went away.",
                    ))
                })
            }
            .boxed_local()
        } else {
            settled(Ok(()))
        };
        drop(state);
        if was_paused {
            self.emit(MediaEvent::Play);
        }
        request
    }

    fn pause(&mut self) {
        let was_playing = {
            let mut state = self.state.borrow_mut();
            state.settle_plays(&Err(PlatformError::new(
                PlatformErrorKind::Aborted,
                "The play() request was interrupted by a call to pause().",
            )));
            !std::mem::replace(&mut state.paused, true)
        };
        if was_playing {
            self.emit(MediaEvent::Pause);
        }
    }

    fn set_source(&mut self, url: Option<&ResourceUrl>) {
        self.state.borrow_mut().source = url.cloned();
    }

    fn load(&mut self) {
        let mut state = self.state.borrow_mut();
        state.settle_plays(&Err(PlatformError::new(
            PlatformErrorKind::Aborted,
            "The play() request was interrupted by a new load request.",
        )));
        state.loading = state.source.is_some();
        state.current_time = 0.0;
        state.duration = f64::NAN;
        state.paused = true;
        state.ended = false;
        state.error_code = None;
    }
}

#[derive(Debug)]
struct PlatformState {
    touch:          bool,
    fullscreen:     bool,
    pip_enabled:    bool,
    in_pip:         bool,
    /// Reason given when the next picture-in-picture request is refused.
    pip_refusal:    Option<String>,
    fullscreen_ok:  bool,
    next_resource:  u64,
    live_resources: BTreeSet<String>,
}

/// Document-level host: fullscreen, picture-in-picture and resource URLs.
#[derive(Debug, Clone)]
pub struct HeadlessPlatform {
    state:  Rc<RefCell<PlatformState>>,
    events: EventSender,
}

#[bon::bon]
impl HeadlessPlatform {
    #[builder]
    pub fn new(
        #[builder(start_fn)] events: EventSender,
        #[builder(default)] touch: bool,
        #[builder(default = true)] picture_in_picture: bool,
        #[builder(default = true)] fullscreen: bool,
    ) -> Self {
        Self {
            state: Rc::new(RefCell::new(PlatformState {
                touch,
                fullscreen: false,
                pip_enabled: picture_in_picture,
                in_pip: false,
                pip_refusal: None,
                fullscreen_ok: fullscreen,
                next_resource: 0,
                live_resources: BTreeSet::new(),
            })),
            events,
        }
    }
}

impl HeadlessPlatform {
    /// Refuse the next picture-in-picture request with `reason`.
    pub fn refuse_picture_in_picture(&self, reason: impl Into<String>) {
        self.state.borrow_mut().pip_refusal = Some(reason.into());
    }

    /// Resource URLs created and not yet released.
    pub fn live_resources(&self) -> Vec<String> {
        self.state.borrow().live_resources.iter().cloned().collect()
    }

    fn set_fullscreen(&self, on: bool) -> PlatformRequest {
        {
            let mut state = self.state.borrow_mut();
            if !state.fullscreen_ok {
                return settled(Err(PlatformError::new(
                    PlatformErrorKind::NotSupported,
                    "Fullscreen is not supported.",
                )));
            }
            if state.fullscreen == on {
                return settled(Ok(()));
            }
            state.fullscreen = on;
        }
        emit(&self.events, MediaEvent::FullscreenChange);
        settled(Ok(()))
    }

    fn set_pip(&self, on: bool) -> PlatformRequest {
        {
            let mut state = self.state.borrow_mut();
            if on {
                if let Some(reason) = state.pip_refusal.take() {
                    return settled(Err(PlatformError::new(
                        PlatformErrorKind::NotAllowed,
                        reason,
                    )));
                }
            }
            state.in_pip = on;
        }
        emit(&self.events, MediaEvent::PictureInPictureChange);
        settled(Ok(()))
    }
}

impl Platform for HeadlessPlatform {
    fn is_touch_device(&self) -> bool { self.state.borrow().touch }

    fn is_fullscreen(&self) -> bool { self.state.borrow().fullscreen }

    fn request_fullscreen(&mut self) -> PlatformRequest { self.set_fullscreen(true) }

    fn exit_fullscreen(&mut self) -> PlatformRequest { self.set_fullscreen(false) }

    fn picture_in_picture_enabled(&self) -> bool { self.state.borrow().pip_enabled }

    fn in_picture_in_picture(&self) -> bool { self.state.borrow().in_pip }

    fn request_picture_in_picture(&mut self) -> PlatformRequest { self.set_pip(true) }

    fn exit_picture_in_picture(&mut self) -> PlatformRequest { self.set_pip(false) }

    fn create_resource(&mut self, file: &SelectedFile) -> ResourceUrl {
        let mut state = self.state.borrow_mut();
        state.next_resource += 1;
        let url = format!("blob:kinora/{}/{}", state.next_resource, file.name);
        state.live_resources.insert(url.clone());
        ResourceUrl::from(url)
    }

    fn release_resource(&mut self, url: &ResourceUrl) {
        if !self.state.borrow_mut().live_resources.remove(url.as_str()) {
            tracing::warn!(%url, "released an unknown resource");
        }
    }
}

#[derive(Debug, Default)]
struct TrackState {
    mode:         TrackMode,
    source:       Option<ResourceUrl>,
    load_failure: Option<String>,
}

/// Subtitle track whose cues are ready as soon as a source is set.
#[derive(Debug, Clone, Default)]
pub struct HeadlessSubtitleTrack {
    state: Rc<RefCell<TrackState>>,
}

impl HeadlessSubtitleTrack {
    pub fn new() -> Self { Self::default() }

    pub fn source(&self) -> Option<ResourceUrl> { self.state.borrow().source.clone() }

    /// Make the next load fail with `reason`.
    pub fn fail_next_load(&self, reason: impl Into<String>) {
        self.state.borrow_mut().load_failure = Some(reason.into());
    }
}

impl SubtitleTrack for HeadlessSubtitleTrack {
    fn mode(&self) -> TrackMode { self.state.borrow().mode }

    fn set_mode(&mut self, mode: TrackMode) { self.state.borrow_mut().mode = mode; }

    fn load(&mut self, url: &ResourceUrl) -> PlatformRequest {
        let mut state = self.state.borrow_mut();
        state.source = Some(url.clone());
        match state.load_failure.take() {
            Some(reason) => settled(Err(PlatformError::new(PlatformErrorKind::Other, reason))),
            None => settled(Ok(())),
        }
    }

    fn clear_source(&mut self) { self.state.borrow_mut().source = None; }
}

/// Volume sink that keeps every saved level in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryVolumeSink {
    saved: Rc<RefCell<Vec<f64>>>,
}

impl MemoryVolumeSink {
    pub fn new() -> Self { Self::default() }

    pub fn saved(&self) -> Vec<f64> { self.saved.borrow().clone() }

    pub fn last(&self) -> Option<f64> { self.saved.borrow().last().copied() }
}

impl VolumeSink for MemoryVolumeSink {
    fn save_volume(&self, level: f64) { self.saved.borrow_mut().push(level); }
}
