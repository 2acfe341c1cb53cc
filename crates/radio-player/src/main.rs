mod action;

use std::io::Write;
use std::sync::Arc;
use std::time::Duration;

use radio_player::mpv::MpvSink;
use radio_player::{DirectoryClient, Notice, PlayTransition, PlayerController};
use radio_proto::config::Config;
use tokio::io::{AsyncBufReadExt, BufReader};

use action::{Action, HELP};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let data_dir = radio_proto::platform::data_dir();
    std::fs::create_dir_all(&data_dir)?;
    let log_path = data_dir.join("world-radio.log");

    let log_file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)?;

    // stdout is the UI, so logs go to a file.  RUST_LOG overrides.
    let log_filter = std::env::var("RUST_LOG")
        .unwrap_or_else(|_| "info,radio_player=debug,hyper_util=warn,reqwest=warn".to_string());
    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_env_filter(log_filter.as_str())
        .with_ansi(false)
        .init();

    eprintln!("world-radio log: {}", log_path.display());
    tracing::info!("world-radio starting…");

    let (config, load_error) = Config::load_or_default();
    if let Some(e) = load_error {
        tracing::warn!("Config unavailable ({:?}): {}; using defaults", Config::config_path(), e);
    }

    let directory = Arc::new(DirectoryClient::from_config(&config.player)?);
    let sink = MpvSink::new(Duration::from_secs(config.player.start_timeout_secs));
    if !sink.is_available() {
        eprintln!("warning: mpv not found, playback will fail (install mpv or set MPV_PATH)");
    }

    let (mut controller, mut outcomes) = PlayerController::new(
        Arc::new(sink),
        Some(Arc::clone(&directory)),
        config.player.default_volume,
    );

    println!("Loading stations…");
    let (stations, countries) = tokio::join!(
        directory.fetch_top_stations(config.player.top_limit),
        directory.fetch_country_aggregates(config.player.country_limit),
    );
    controller.load_stations(stations);
    controller.set_countries(countries);
    print_stations(&controller);
    println!("Type 'help' for commands.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    prompt();

    loop {
        tokio::select! {
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                if !line.trim().is_empty() {
                    match line.parse::<Action>() {
                        Ok(Action::Quit) => break,
                        Ok(action) => apply(&mut controller, action),
                        Err(e) => println!("{}", e),
                    }
                }
                prompt();
            }
            Some(outcome) = outcomes.recv() => {
                if let Some(notice) = controller.complete(outcome) {
                    println!();
                    print_notice(&notice);
                    prompt();
                }
            }
        }
    }

    tracing::info!("world-radio exiting");
    Ok(())
}

fn apply(controller: &mut PlayerController, action: Action) {
    match action {
        Action::List => print_stations(controller),
        Action::Search(term) => {
            controller.set_search_term(term);
            print_stations(controller);
        }
        Action::Country(country) => {
            controller.set_country_filter(country);
            print_stations(controller);
        }
        Action::Countries => {
            if controller.countries().is_empty() {
                println!("  (no countries loaded)");
            }
            for country in controller.countries() {
                println!("  {} ({})", country.name, country.station_count);
            }
        }
        Action::Play(idx) => {
            let Some(station) = visible_at(controller, idx) else {
                println!("no station {} in the current list", idx + 1);
                return;
            };
            match controller.play(&station) {
                PlayTransition::Paused => println!("⏸ {}", station.name),
                PlayTransition::Loading { .. } => println!("… tuning in to {}", station.name),
            }
        }
        Action::Favorite(idx) => {
            let Some(station) = visible_at(controller, idx) else {
                println!("no station {} in the current list", idx + 1);
                return;
            };
            if controller.toggle_favorite(&station) {
                println!("♥ {}", station.name);
            } else {
                println!("♡ {}", station.name);
            }
        }
        Action::Favorites => {
            let mut any = false;
            for station in controller.favorites() {
                any = true;
                println!("  ♥ {} — {}", station.name, station.country);
            }
            if !any {
                println!("  (no favorites yet)");
            }
        }
        Action::Volume(volume) => {
            controller.set_volume(volume);
            print_volume(controller);
        }
        Action::Mute => {
            controller.toggle_mute();
            print_volume(controller);
        }
        Action::Status => {
            let snapshot = controller.snapshot();
            match &snapshot.current_station {
                Some(station) => println!(
                    "{} [{}] {} • {}",
                    station.name,
                    snapshot.status.label(),
                    station.country,
                    station.tags
                ),
                None => println!("nothing selected"),
            }
            if let Some(err) = &snapshot.last_error {
                println!("last error: {}", err);
            }
            print_volume(controller);
        }
        Action::Help => println!("{}", HELP),
        Action::Quit => {}
    }
}

fn visible_at(controller: &PlayerController, idx: usize) -> Option<radio_proto::protocol::Station> {
    controller.visible_stations().get(idx).map(|s| (*s).clone())
}

fn print_stations(controller: &PlayerController) {
    let visible = controller.visible_stations();
    if visible.is_empty() {
        println!("  (no stations)");
        return;
    }
    let current = controller.current_station().map(|s| s.id.clone());
    for (i, station) in visible.iter().enumerate() {
        let marker = if current.as_deref() == Some(station.id.as_str()) {
            if controller.is_playing() {
                '▶'
            } else {
                '·'
            }
        } else {
            ' '
        };
        let fav = if controller.is_favorite(&station.id) { "♥" } else { " " };
        println!("{}{} {:>3}. {} — {}", marker, fav, i + 1, station.name, station.country);
    }
}

fn print_volume(controller: &PlayerController) {
    if controller.is_muted() {
        println!("volume {:.0}% (muted)", controller.volume() * 100.0);
    } else {
        println!("volume {:.0}%", controller.volume() * 100.0);
    }
}

fn print_notice(notice: &Notice) {
    match notice {
        Notice::Started { station } => println!("▶ {}", station),
        Notice::PlaybackFailed { station, message } => {
            println!("✗ {}: this station's stream is unavailable or blocked ({})", station, message)
        }
    }
}

fn prompt() {
    print!("> ");
    let _ = std::io::stdout().flush();
}
