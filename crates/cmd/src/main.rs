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

use std::{path::PathBuf, time::Duration};

use clap::{Args, Parser, Subcommand};
use kinora_common_telemetry::{LoggingOptions, init_global_logging, set_panic_hook};
use kinora_player::{
    PlayerController, PlayerInput, SelectedFile, Settings,
    headless::{HeadlessMedia, HeadlessPlatform, HeadlessSubtitleTrack},
    util::ResultExt,
};
use kinora_store::{DBStore, DatabaseConfig};
use snafu::{ResultExt as _, Whatever};
use tokio::{sync::mpsc, task::LocalSet};
use tokio_util::sync::CancellationToken;

mod build_info;
mod session;

#[derive(Debug, Parser)]
#[clap(
name = "kinora",
about= "Kinora video player",
author = build_info::AUTHOR,
version = build_info::FULL_VERSION)]
struct Cli {
    /// Settings file. Defaults to `settings.json` in the config directory.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Keep all data, settings and logs under this directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    commands: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    Run(RunArgs),
    Volume(VolumeArgs),
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Runs a headless player session. Commands and key names are read from stdin,
one per line; the player state is printed whenever it changes.
Examples:

kinora run ~/Videos/trailer.mp4 --subtitles ~/Videos/trailer.vtt
echo 'space' | kinora run clip.mp4

")]
struct RunArgs {
    /// Video to open at start.
    video: Option<PathBuf>,

    /// WebVTT subtitles to open at start.
    #[arg(long)]
    subtitles: Option<PathBuf>,

    /// Duration reported for every opened video, in seconds.
    #[arg(long, default_value_t = 120.0)]
    duration: f64,

    /// Behave like a touch device.
    #[arg(long)]
    touch: bool,

    /// Simulated clock resolution in milliseconds.
    #[arg(long, default_value_t = 250)]
    tick_ms: u64,
}

impl RunArgs {
    async fn run(self, settings: Settings) -> Result<(), Whatever> {
        build_info::log_build_info();
        let store = open_store().await?;
        let prefs = store.preferences();
        let saved_volume = prefs.load_volume().await;
        let (writer, writer_task) = prefs.spawn_writer();

        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let (input_tx, input_rx) = mpsc::unbounded_channel();
        let media = HeadlessMedia::new(event_tx.clone());
        let platform = HeadlessPlatform::builder(event_tx)
            .touch(self.touch)
            .build();

        let mut controller = PlayerController::builder()
            .platform(Box::new(platform))
            .media(Box::new(media.clone()))
            .subtitles(Box::new(HeadlessSubtitleTrack::new()))
            .volume_sink(Box::new(writer))
            .maybe_saved_volume(saved_volume)
            .settings(settings.player)
            .build();

        if let Some(video) = &self.video {
            input_tx
                .send(PlayerInput::OpenMedia(SelectedFile::from_path(video)))
                .log_err();
        }
        if let Some(subtitles) = &self.subtitles {
            input_tx
                .send(PlayerInput::OpenSubtitles(SelectedFile::from_path(subtitles)))
                .log_err();
        }

        let cancel = CancellationToken::new();
        LocalSet::new()
            .run_until(async {
                tokio::task::spawn_local(session::tick_media(
                    media,
                    Duration::from_millis(self.tick_ms.max(1)),
                    self.duration,
                    cancel.clone(),
                ));
                tokio::task::spawn_local(session::print_views(
                    controller.subscribe(),
                    cancel.clone(),
                ));
                session::spawn_stdin_reader(input_tx, cancel.clone());
                let interrupt = cancel.clone();
                tokio::spawn(async move {
                    if tokio::signal::ctrl_c().await.log_err().is_some() {
                        tracing::info!("interrupted");
                    }
                    interrupt.cancel();
                });

                kinora_player::run(&mut controller, input_rx, event_rx, cancel.clone()).await;
            })
            .await;
        cancel.cancel();

        // Dropping the controller releases the last writer so the task flushes.
        drop(controller);
        writer_task
            .await
            .whatever_context("volume preference writer panicked")?;
        Ok(())
    }
}

#[derive(Debug, Clone, Args)]
#[command(flatten_help = true)]
#[command(long_about = r"

Shows the saved volume preference, or clears it.
Examples:

kinora volume
kinora volume --reset

")]
struct VolumeArgs {
    /// Forget the saved volume; the next session starts at full volume.
    #[arg(long)]
    reset: bool,
}

impl VolumeArgs {
    async fn run(self) -> Result<(), Whatever> {
        let prefs = open_store().await?.preferences();
        if self.reset {
            prefs
                .clear_volume()
                .await
                .whatever_context("failed to clear the volume preference")?;
            println!("volume preference cleared");
            return Ok(());
        }
        match prefs.load_volume().await {
            Some(level) if (0.0..=1.0).contains(&level) => println!("{:.0}%", level * 100.0),
            Some(level) => println!("{level} (out of range, sessions start at 100%)"),
            None => println!("unset"),
        }
        Ok(())
    }
}

async fn open_store() -> Result<DBStore, Whatever> {
    let config = DatabaseConfig::builder()
        .db_path(kinora_paths::database_file())
        .build();
    DBStore::new(&config)
        .await
        .with_whatever_context(|_| format!("failed to open {}", config.db_path.display()))
}

/// Logging options with the directory defaulted and created.
fn logging_options(settings: &Settings) -> Result<LoggingOptions, Whatever> {
    let mut opts = settings.logging.clone();
    if opts.dir.is_empty() {
        opts.dir = kinora_paths::logs_dir().display().to_string();
    }
    std::fs::create_dir_all(&opts.dir)
        .with_whatever_context(|_| format!("failed to create log directory {}", opts.dir))?;
    Ok(opts)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Whatever> {
    let cli = Cli::parse();
    if let Some(dir) = &cli.data_dir {
        kinora_paths::set_custom_data_dir(dir);
    }
    let settings_path = cli
        .config
        .clone()
        .unwrap_or_else(|| kinora_paths::settings_file().clone());
    let settings = Settings::load(&settings_path).with_whatever_context(|e| {
        format!("failed to load settings from {}: {e}", settings_path.display())
    })?;

    let _guards = init_global_logging("kinora", &logging_options(&settings)?);
    set_panic_hook();

    match cli.commands {
        Commands::Run(args) => args.run(settings).await,
        Commands::Volume(args) => args.run().await,
    }
}
