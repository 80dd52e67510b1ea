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

use snafu::Snafu;

/// Failure category of an asynchronous platform request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum_macros::Display, strum_macros::AsRefStr)]
pub enum PlatformErrorKind {
    /// Interrupted by a later request, e.g. a pause issued before play
    /// resolved.
    #[strum(serialize = "AbortError")]
    Aborted,
    #[strum(serialize = "NotAllowedError")]
    NotAllowed,
    #[strum(serialize = "NotSupportedError")]
    NotSupported,
    #[strum(serialize = "InvalidStateError")]
    InvalidState,
    #[strum(serialize = "Error")]
    Other,
}

/// Rejection reported by the host for play, fullscreen, picture-in-picture or
/// subtitle track requests.
#[derive(Snafu, Debug, Clone, PartialEq, Eq)]
#[snafu(display("{message}"))]
pub struct PlatformError {
    kind:    PlatformErrorKind,
    message: String,
}

impl PlatformError {
    pub fn new(kind: PlatformErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub const fn kind(&self) -> PlatformErrorKind { self.kind }

    pub fn message(&self) -> &str { &self.message }
}

/// Media error reported by the playback handle, mapped from the platform's
/// numeric code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaErrorKind {
    /// Fetching was aborted at the user's request.
    Aborted,
    Network,
    Decode,
    SourceNotSupported,
    Unknown(u16),
}

impl MediaErrorKind {
    pub const fn from_code(code: u16) -> Self {
        match code {
            1 => Self::Aborted,
            2 => Self::Network,
            3 => Self::Decode,
            4 => Self::SourceNotSupported,
            other => Self::Unknown(other),
        }
    }

    /// Text shown in the error overlay.
    pub fn message(self) -> String {
        match self {
            Self::Aborted => "Video loading aborted.".to_string(),
            Self::Network => "A network error caused the video download to fail.".to_string(),
            Self::Decode => "The video playback was aborted due to a corruption problem or \
                             because the video used features your platform does not support."
                .to_string(),
            Self::SourceNotSupported => "The video could not be loaded, either because the \
                                         server or network failed or because the format is \
                                         not supported."
                .to_string(),
            Self::Unknown(code) => format!("An unexpected error occurred (Code: {code})."),
        }
    }
}

/// Everything the player can put in front of the user.
#[derive(Snafu, Debug)]
#[snafu(visibility(pub))]
pub enum PlayerError {
    #[snafu(display("Invalid file type for video: {mime_type}. Please select a video file."))]
    InvalidMediaType {
        mime_type: String,
        #[snafu(implicit)]
        loc:       snafu::Location,
    },

    #[snafu(display("Invalid file type for subtitles: {name}. Please select a .vtt file."))]
    InvalidSubtitleFile {
        name: String,
        #[snafu(implicit)]
        loc:  snafu::Location,
    },

    #[snafu(display("{}", kind.message()))]
    Media {
        kind: MediaErrorKind,
        #[snafu(implicit)]
        loc:  snafu::Location,
    },

    #[snafu(display("Could not play video: {source}"))]
    Play {
        source: PlatformError,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },

    #[snafu(display("Picture-in-Picture Error: {source}"))]
    PictureInPicture {
        source: PlatformError,
        #[snafu(implicit)]
        loc:    snafu::Location,
    },
}

impl PlayerError {
    /// Locally raised input validation failure, as opposed to a failure
    /// reported by the platform.
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::InvalidMediaType { .. } | Self::InvalidSubtitleFile { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use snafu::IntoError;

    use super::*;

    #[test]
    fn media_codes_map_to_taxonomy() {
        assert_eq!(MediaErrorKind::from_code(1), MediaErrorKind::Aborted);
        assert_eq!(MediaErrorKind::from_code(2), MediaErrorKind::Network);
        assert_eq!(MediaErrorKind::from_code(3), MediaErrorKind::Decode);
        assert_eq!(
            MediaErrorKind::from_code(4),
            MediaErrorKind::SourceNotSupported
        );
        assert_eq!(MediaErrorKind::from_code(9), MediaErrorKind::Unknown(9));
        assert_eq!(
            MediaErrorKind::Unknown(9).message(),
            "An unexpected error occurred (Code: 9)."
        );
    }

    #[test]
    fn validation_errors_are_flagged() {
        let err = InvalidMediaTypeSnafu {
            mime_type: "text/plain",
        }
        .build();
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "Invalid file type for video: text/plain. Please select a video file."
        );

        let err = PictureInPictureSnafu.into_error(PlatformError::new(
            PlatformErrorKind::NotAllowed,
            "user gesture required",
        ));
        assert!(!err.is_validation());
        assert_eq!(
            err.to_string(),
            "Picture-in-Picture Error: user gesture required"
        );
    }
}
