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

//! Headless session driven from stdin.

use std::{io::BufRead, time::Duration};

use kinora_player::{
    Command, Key, KeyInput, PlayerInput, PlayerView, PointerInput, SelectedFile,
    headless::HeadlessMedia, util::ResultExt,
};
use strum::VariantNames;
use tokio::{
    sync::{mpsc, watch},
    time::MissedTickBehavior,
};
use tokio_util::sync::CancellationToken;

pub const HELP: &str = "\
commands:
  open <path>        load a video
  subs <path>        load WebVTT subtitles
  volume <0..1>      set the volume
  seek <0..1>        jump to a fraction of the video
  rate <speed>       set the playback speed
  speed [option]     open the speed menu, or pick an option
  click | tap | hover | leave
                     pointer input on the video surface
  dismiss            close the error overlay
  <command>          any shortcut command, e.g. toggle_mute
  <key>              a key name, e.g. space, k, m, f, c, left, up
  help | quit";

/// One line of session input.
#[derive(Debug, Clone, PartialEq)]
pub enum Line {
    Input(PlayerInput),
    Help,
    Quit,
    Empty,
    Unknown(String),
}

pub fn parse_line(line: &str) -> Line {
    let line = line.trim();
    if line.is_empty() {
        return Line::Empty;
    }
    let (word, rest) = line
        .split_once(char::is_whitespace)
        .map_or((line, ""), |(word, rest)| (word, rest.trim()));
    let unknown = || Line::Unknown(line.to_string());
    let number = |f: fn(f64) -> PlayerInput| {
        rest.parse::<f64>()
            .map_or_else(|_| unknown(), |v| Line::Input(f(v)))
    };

    match word.to_ascii_lowercase().as_str() {
        "quit" | "exit" => Line::Quit,
        "help" => Line::Help,
        "open" if !rest.is_empty() => {
            Line::Input(PlayerInput::OpenMedia(SelectedFile::from_path(rest)))
        }
        "subs" if !rest.is_empty() => {
            Line::Input(PlayerInput::OpenSubtitles(SelectedFile::from_path(rest)))
        }
        "volume" => number(PlayerInput::SetVolume),
        "seek" => number(PlayerInput::SeekTo),
        "rate" => number(PlayerInput::SetSpeed),
        "speed" if rest.is_empty() => Line::Input(PlayerInput::ToggleSpeedMenu),
        "speed" => Line::Input(PlayerInput::ChooseSpeed(rest.to_string())),
        "dismiss" => Line::Input(PlayerInput::DismissError),
        "click" => Line::Input(PlayerInput::Pointer(PointerInput::VideoClick)),
        "tap" => Line::Input(PlayerInput::Pointer(PointerInput::SurfaceTap)),
        "hover" => Line::Input(PlayerInput::Pointer(PointerInput::SurfaceMove)),
        "leave" => Line::Input(PlayerInput::Pointer(PointerInput::SurfaceLeave)),
        _ if !rest.is_empty() => unknown(),
        other => match other.parse::<Command>() {
            Ok(command) => Line::Input(PlayerInput::Command(command)),
            Err(_) => Key::new(other)
                .map_or_else(unknown, |key| Line::Input(PlayerInput::Key(KeyInput::new(key)))),
        },
    }
}

pub fn status_line(view: &PlayerView) -> String {
    let mut line = format!(
        "[{}] {} / {}  {} {:.0}%  {}  {}  controls {}",
        view.play_pause,
        view.current_time,
        view.duration,
        view.volume_icon,
        view.volume_slider * 100.0,
        view.speed_label,
        view.subtitle_icon,
        if view.controls_visible { "shown" } else { "hidden" },
    );
    if view.speed_menu_open {
        line.push_str("  [speed menu]");
    }
    if view.cinema_mode {
        line.push_str("  [cinema]");
    }
    if let Some(error) = &view.error {
        line.push_str("  error: ");
        line.push_str(error);
    }
    line
}

/// Forward stdin lines as player input until EOF, `quit` or cancellation.
///
/// Runs on its own thread so a pending read never holds up runtime shutdown.
/// Returning drops the sender, so the driver drains what was queued and then
/// stops.
pub fn spawn_stdin_reader(
    inputs: mpsc::UnboundedSender<PlayerInput>,
    cancel: CancellationToken,
) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || forward_lines(std::io::stdin().lock(), &inputs, &cancel))
}

pub fn forward_lines(
    reader: impl BufRead,
    inputs: &mpsc::UnboundedSender<PlayerInput>,
    cancel: &CancellationToken,
) {
    for line in reader.lines() {
        if cancel.is_cancelled() {
            return;
        }
        let Some(line) = line.log_err() else {
            return;
        };
        match parse_line(&line) {
            Line::Input(input) => {
                if inputs.send(input).warn_on_err("forwarding input").is_none() {
                    return;
                }
            }
            Line::Help => println!("{HELP}\nshortcut commands: {}", Command::VARIANTS.join(", ")),
            Line::Quit => return,
            Line::Empty => {}
            Line::Unknown(text) => println!("unrecognized input: {text} (try `help`)"),
        }
    }
}

/// Advance the simulated clock. Sources still loading finish on the next
/// tick with `duration`.
pub async fn tick_media(
    media: HeadlessMedia,
    tick: Duration,
    duration: f64,
    cancel: CancellationToken,
) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            _ = interval.tick() => {
                if media.is_loading() {
                    media.finish_loading(duration);
                } else {
                    media.advance(tick.as_secs_f64());
                }
            }
        }
    }
}

/// Print a status line whenever the view changes.
pub async fn print_views(mut views: watch::Receiver<PlayerView>, cancel: CancellationToken) {
    println!("{}", status_line(&views.borrow_and_update()));
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            changed = views.changed() => {
                if changed.is_err() {
                    break;
                }
                let line = status_line(&views.borrow_and_update());
                tracing::debug!(status = %line, "view changed");
                println!("{line}");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use kinora_player::{
        PlayerController,
        headless::{HeadlessPlatform, MemoryVolumeSink},
        run,
    };

    use super::*;

    #[test]
    fn parses_session_lines() {
        assert_eq!(parse_line("  "), Line::Empty);
        assert_eq!(parse_line("quit"), Line::Quit);
        assert_eq!(
            parse_line("volume 0.5"),
            Line::Input(PlayerInput::SetVolume(0.5))
        );
        assert_eq!(
            parse_line("volume loud"),
            Line::Unknown("volume loud".to_string())
        );
        assert_eq!(
            parse_line("speed 1.5"),
            Line::Input(PlayerInput::ChooseSpeed("1.5".to_string()))
        );
        assert_eq!(
            parse_line("toggle_mute"),
            Line::Input(PlayerInput::Command(Command::ToggleMute))
        );
        assert_eq!(
            parse_line("space"),
            Line::Input(PlayerInput::Key(KeyInput::new(Key::new("space").unwrap())))
        );
        match parse_line("open /tmp/My Movie.mkv") {
            Line::Input(PlayerInput::OpenMedia(file)) => {
                assert_eq!(file.name, "My Movie.mkv");
                assert!(file.is_video());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn status_line_mentions_error() {
        let view = PlayerView {
            error: Some("Video loading aborted.".to_string()),
            ..PlayerView::default()
        };
        let line = status_line(&view);
        assert!(line.starts_with("[play_arrow] 00:00 / --:--"));
        assert!(line.ends_with("error: Video loading aborted."));
    }

    #[tokio::test]
    async fn piped_lines_are_dispatched_before_the_driver_stops() {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let sink = MemoryVolumeSink::new();
        let mut controller = PlayerController::builder()
            .platform(Box::new(HeadlessPlatform::builder(event_tx.clone()).build()))
            .media(Box::new(HeadlessMedia::new(event_tx)))
            .volume_sink(Box::new(sink.clone()))
            .build();

        let cancel = CancellationToken::new();
        forward_lines(
            Cursor::new("volume 0.3\nrate 1.5\nquit\nvolume 0.9\n"),
            &input_tx,
            &cancel,
        );
        drop(input_tx);
        run(&mut controller, input_rx, event_rx, cancel).await;

        let view = controller.view();
        assert_eq!(view.volume_slider, 0.3);
        assert_eq!(view.speed_label, "1.5x");
        assert_eq!(sink.saved(), [0.3]);
    }

    #[test]
    fn cancelled_reader_forwards_nothing() {
        let (input_tx, mut input_rx) = mpsc::unbounded_channel();
        let cancel = CancellationToken::new();
        cancel.cancel();
        forward_lines(Cursor::new("volume 0.3\n"), &input_tx, &cancel);
        assert!(input_rx.try_recv().is_err());
    }
}
