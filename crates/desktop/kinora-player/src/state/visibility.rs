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

//! Auto-hiding of the control strip.
//!
//! Both timers are plain deadlines. The driver asks for
//! [`ControlsVisibility::next_deadline`], sleeps until then and calls
//! [`ControlsVisibility::poll`].

use std::time::Duration;

use tokio::time::Instant;

/// Playback facts that decide whether the strip may hide.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct VisibilityGate {
    pub playing:     bool,
    pub scrubbing:   bool,
    pub error_shown: bool,
}

impl VisibilityGate {
    const fn may_auto_hide(self) -> bool { self.playing && !self.scrubbing }
}

#[derive(Debug, Clone)]
pub struct ControlsVisibility {
    visible:        bool,
    over_surface:   bool,
    over_controls:  bool,
    hide_deadline:  Option<Instant>,
    leave_deadline: Option<Instant>,
    idle_delay:     Duration,
    leave_grace:    Duration,
}

impl ControlsVisibility {
    pub const fn new(idle_delay: Duration, leave_grace: Duration) -> Self {
        Self {
            visible: true,
            over_surface: false,
            over_controls: false,
            hide_deadline: None,
            leave_deadline: None,
            idle_delay,
            leave_grace,
        }
    }

    pub const fn is_visible(&self) -> bool { self.visible }

    pub const fn hide_deadline(&self) -> Option<Instant> { self.hide_deadline }

    /// Earliest pending deadline of either timer.
    pub fn next_deadline(&self) -> Option<Instant> {
        match (self.hide_deadline, self.leave_deadline) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    /// Show the strip and restart the idle timer. No-op while the error
    /// overlay is up.
    pub fn show(&mut self, now: Instant, gate: VisibilityGate) {
        if gate.error_shown {
            return;
        }
        self.visible = true;
        self.schedule_hide(now, gate);
    }

    /// Replace the idle deadline. Only armed while playing and not scrubbing.
    pub fn schedule_hide(&mut self, now: Instant, gate: VisibilityGate) {
        self.hide_deadline = None;
        if gate.may_auto_hide() {
            self.hide_deadline = Some(now + self.idle_delay);
        }
    }

    pub const fn cancel_hide(&mut self) { self.hide_deadline = None; }

    /// Hide unless the pointer rests on the strip. The error overlay always
    /// wins.
    pub const fn hide(&mut self, gate: VisibilityGate) {
        if self.over_controls && !gate.error_shown {
            return;
        }
        self.visible = false;
    }

    /// Hide immediately, dropping both timers.
    pub const fn force_hidden(&mut self) {
        self.visible = false;
        self.hide_deadline = None;
        self.leave_deadline = None;
    }

    /// Tap on the surface: flip visibility right away.
    pub fn tap(&mut self, now: Instant, gate: VisibilityGate) {
        if self.visible {
            self.cancel_hide();
            self.hide(gate);
        } else {
            self.show(now, gate);
        }
    }

    pub fn pointer_enter_surface(&mut self, now: Instant, gate: VisibilityGate) {
        self.over_surface = true;
        self.leave_deadline = None;
        self.show(now, gate);
    }

    pub fn pointer_move(&mut self, now: Instant, gate: VisibilityGate) { self.show(now, gate); }

    /// Leaving the surface hides after a short grace so the pointer can
    /// cross onto the strip.
    pub fn pointer_leave_surface(&mut self, now: Instant) {
        self.over_surface = false;
        self.leave_deadline = Some(now + self.leave_grace);
    }

    pub fn pointer_enter_controls(&mut self, now: Instant, gate: VisibilityGate) {
        self.over_controls = true;
        self.show(now, gate);
    }

    pub const fn pointer_leave_controls(&mut self, gate: VisibilityGate) {
        self.over_controls = false;
        if !self.over_surface {
            self.hide(gate);
        }
    }

    /// Fire expired deadlines. Returns whether visibility changed.
    pub fn poll(&mut self, now: Instant, gate: VisibilityGate) -> bool {
        let before = self.visible;
        if self.leave_deadline.is_some_and(|d| d <= now) {
            self.leave_deadline = None;
            if !self.over_surface && !self.over_controls {
                self.hide(gate);
            }
        }
        if self.hide_deadline.is_some_and(|d| d <= now) {
            self.hide_deadline = None;
            if gate.may_auto_hide() {
                self.hide(gate);
            }
        }
        before != self.visible
    }
}
