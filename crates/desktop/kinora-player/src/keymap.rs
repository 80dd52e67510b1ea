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

//! Keyboard shortcuts.

use std::{collections::HashMap, fmt};

use serde::{Deserialize, Serialize};

/// What a shortcut asks the player to do.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum_macros::Display,
    strum_macros::EnumString,
    strum_macros::VariantNames,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Command {
    PlayPause,
    SkipBack,
    SkipForward,
    ToggleMute,
    VolumeUp,
    VolumeDown,
    ToggleFullscreen,
    ToggleCinemaMode,
    ToggleSubtitles,
    TogglePictureInPicture,
}

/// A key name, normalized so `" "`, `"Space"` and `"space"` compare equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Key(String);

impl Key {
    /// `None` for an empty name.
    pub fn new(name: &str) -> Option<Self> {
        if name == " " {
            return Some(Self("space".to_string()));
        }
        let lower = name.trim().to_ascii_lowercase();
        let normalized = match lower.as_str() {
            "" => return None,
            "spacebar" => "space",
            "left" => "arrowleft",
            "right" => "arrowright",
            "up" => "arrowup",
            "down" => "arrowdown",
            other => other,
        };
        Some(Self(normalized.to_string()))
    }

    pub fn as_str(&self) -> &str { &self.0 }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { f.write_str(&self.0) }
}

/// A key release as seen by the player.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyInput {
    pub key:           Key,
    /// Focus sits in an input, text area, select or editable element.
    pub in_text_entry: bool,
}

impl KeyInput {
    pub const fn new(key: Key) -> Self {
        Self {
            key,
            in_text_entry: false,
        }
    }
}

const DEFAULT_BINDINGS: &[(&str, Command)] = &[
    ("space", Command::PlayPause),
    ("k", Command::PlayPause),
    ("arrowleft", Command::SkipBack),
    ("arrowright", Command::SkipForward),
    ("m", Command::ToggleMute),
    ("f", Command::ToggleFullscreen),
    ("arrowup", Command::VolumeUp),
    ("arrowdown", Command::VolumeDown),
    ("c", Command::ToggleCinemaMode),
];

#[derive(Debug, Clone)]
pub struct Keymap {
    bindings: HashMap<Key, Command>,
}

impl Default for Keymap {
    fn default() -> Self {
        let bindings = DEFAULT_BINDINGS
            .iter()
            .filter_map(|(name, command)| Key::new(name).map(|key| (key, *command)))
            .collect();
        Self { bindings }
    }
}

impl Keymap {
    /// Default bindings with `overrides` (key name to command) layered on top.
    pub fn with_overrides<'a>(overrides: impl IntoIterator<Item = (&'a String, &'a Command)>) -> Self {
        let mut keymap = Self::default();
        for (name, command) in overrides {
            match Key::new(name) {
                Some(key) => {
                    keymap.bindings.insert(key, *command);
                }
                None => tracing::warn!(%command, "ignoring shortcut with an empty key name"),
            }
        }
        keymap
    }

    /// Command bound to the key, unless focus is in a text entry.
    pub fn resolve(&self, input: &KeyInput) -> Option<Command> {
        if input.in_text_entry {
            return None;
        }
        self.bindings.get(&input.key).copied()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn press(name: &str) -> KeyInput { KeyInput::new(Key::new(name).unwrap()) }

    #[test]
    fn default_bindings() {
        let keymap = Keymap::default();
        assert_eq!(keymap.resolve(&press(" ")), Some(Command::PlayPause));
        assert_eq!(keymap.resolve(&press("K")), Some(Command::PlayPause));
        assert_eq!(keymap.resolve(&press("ArrowLeft")), Some(Command::SkipBack));
        assert_eq!(keymap.resolve(&press("right")), Some(Command::SkipForward));
        assert_eq!(keymap.resolve(&press("ArrowUp")), Some(Command::VolumeUp));
        assert_eq!(keymap.resolve(&press("c")), Some(Command::ToggleCinemaMode));
        assert_eq!(keymap.resolve(&press("x")), None);
    }

    #[test]
    fn text_entry_swallows_shortcuts() {
        let keymap = Keymap::default();
        let mut input = press("m");
        input.in_text_entry = true;
        assert_eq!(keymap.resolve(&input), None);
    }

    #[test]
    fn overrides_replace_and_extend() {
        let overrides = BTreeMap::from([
            ("s".to_string(), Command::ToggleSubtitles),
            ("m".to_string(), Command::TogglePictureInPicture),
        ]);
        let keymap = Keymap::with_overrides(&overrides);
        assert_eq!(keymap.resolve(&press("s")), Some(Command::ToggleSubtitles));
        assert_eq!(
            keymap.resolve(&press("m")),
            Some(Command::TogglePictureInPicture)
        );
        assert_eq!(keymap.resolve(&press("f")), Some(Command::ToggleFullscreen));
    }

    #[test]
    fn command_names_are_snake_case() {
        assert_eq!(Command::ToggleCinemaMode.to_string(), "toggle_cinema_mode");
        assert_eq!(
            "skip_back".parse::<Command>().unwrap(),
            Command::SkipBack
        );
        let parsed: Command = serde_json::from_str("\"volume_up\"").unwrap();
        assert_eq!(parsed, Command::VolumeUp);
    }
}
