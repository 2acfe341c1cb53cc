//! Session state for one running player.
//!
//! Owns the station list, search/country filter, favorites, the single audio
//! output slot and volume.  All mutations are synchronous; the only async work
//! (opening a stream, click registration) runs on spawned tasks.
//!
//! Playback attempts report back through the outcome channel returned by
//! [`PlayerController::new`].  Each attempt carries the generation it was
//! started under; [`PlayerController::complete`] drops any outcome whose
//! generation is no longer current, so a slow stream can never overwrite a
//! station chosen after it.  Starting a new attempt also aborts the one still
//! loading, which drops its half-open output.

use std::collections::BTreeMap;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use radio_proto::filter::visible_stations;
use radio_proto::protocol::{CountryAggregate, PlaybackStatus, Station};

use crate::directory::DirectoryClient;
use crate::error::SinkError;
use crate::sink::{AudioOutput, AudioSink};

const OUTCOME_CHANNEL_CAPACITY: usize = 32;

/// Result of one `open` attempt, tagged with the generation that started it.
pub struct PlaybackOutcome {
    pub generation: u64,
    pub station_id: String,
    pub result: Result<Box<dyn AudioOutput>, SinkError>,
}

/// What `play` did synchronously.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayTransition {
    /// Same station was playing; paused in place.
    Paused,
    /// A new attempt was started.
    Loading { generation: u64 },
}

/// Something the frontend should show the user.
#[derive(Debug, Clone, PartialEq)]
pub enum Notice {
    Started { station: String },
    PlaybackFailed { station: String, message: String },
}

/// Read-only view of the session for rendering.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub current_station: Option<Station>,
    pub status: PlaybackStatus,
    pub volume: f32,
    pub is_muted: bool,
    pub effective_volume: f32,
    pub search_term: String,
    pub country_filter: String,
    pub favorites: usize,
    pub last_error: Option<String>,
}

pub struct PlayerController {
    sink: Arc<dyn AudioSink>,
    directory: Option<Arc<DirectoryClient>>,
    outcome_tx: mpsc::Sender<PlaybackOutcome>,

    // ── Directory data ──────────────────────────────────────────────────────
    all_stations: Vec<Station>,
    countries: Vec<CountryAggregate>,

    // ── Filter ──────────────────────────────────────────────────────────────
    search_term: String,
    country_filter: String,

    // ── Favorites (session only) ────────────────────────────────────────────
    favorites: BTreeMap<String, Station>,

    // ── Playback slot ───────────────────────────────────────────────────────
    current_station: Option<Station>,
    status: PlaybackStatus,
    output: Option<Box<dyn AudioOutput>>,
    /// The `open` task for the current generation while it is loading.
    pending: Option<JoinHandle<()>>,
    /// Bumped on every new attempt; outcomes from older generations are stale.
    generation: u64,
    last_error: Option<String>,

    // ── Volume ──────────────────────────────────────────────────────────────
    volume: f32,
    is_muted: bool,
}

impl PlayerController {
    pub fn new(
        sink: Arc<dyn AudioSink>,
        directory: Option<Arc<DirectoryClient>>,
        volume: f32,
    ) -> (Self, mpsc::Receiver<PlaybackOutcome>) {
        let (outcome_tx, outcome_rx) = mpsc::channel(OUTCOME_CHANNEL_CAPACITY);
        let controller = Self {
            sink,
            directory,
            outcome_tx,
            all_stations: Vec::new(),
            countries: Vec::new(),
            search_term: String::new(),
            country_filter: String::new(),
            favorites: BTreeMap::new(),
            current_station: None,
            status: PlaybackStatus::Idle,
            output: None,
            pending: None,
            generation: 0,
            last_error: None,
            volume: sanitize_volume(volume).unwrap_or(1.0),
            is_muted: false,
        };
        (controller, outcome_rx)
    }

    // ── Directory data ──────────────────────────────────────────────────────

    pub fn load_stations(&mut self, stations: Vec<Station>) {
        info!("controller: {} stations loaded", stations.len());
        self.all_stations = stations;
    }

    pub fn set_countries(&mut self, countries: Vec<CountryAggregate>) {
        self.countries = countries;
    }

    pub fn stations(&self) -> &[Station] {
        &self.all_stations
    }

    pub fn countries(&self) -> &[CountryAggregate] {
        &self.countries
    }

    // ── Filter ──────────────────────────────────────────────────────────────

    pub fn set_search_term(&mut self, term: impl Into<String>) {
        self.search_term = term.into();
    }

    pub fn set_country_filter(&mut self, country: impl Into<String>) {
        self.country_filter = country.into();
    }

    /// Derived on every call from the station list and the current filters.
    pub fn visible_stations(&self) -> Vec<&Station> {
        visible_stations(&self.all_stations, &self.search_term, &self.country_filter)
    }

    // ── Favorites ───────────────────────────────────────────────────────────

    /// Returns `true` if the station is a favorite after the toggle.
    pub fn toggle_favorite(&mut self, station: &Station) -> bool {
        if self.favorites.remove(&station.id).is_some() {
            false
        } else {
            self.favorites.insert(station.id.clone(), station.clone());
            true
        }
    }

    pub fn is_favorite(&self, station_id: &str) -> bool {
        self.favorites.contains_key(station_id)
    }

    pub fn favorites(&self) -> impl Iterator<Item = &Station> {
        self.favorites.values()
    }

    // ── Playback ────────────────────────────────────────────────────────────

    /// Toggle-or-switch.
    ///
    /// Pauses in place when `station` is the one currently playing; otherwise
    /// releases the current output and starts loading `station`.  The result
    /// of the load arrives later as a [`PlaybackOutcome`].
    pub fn play(&mut self, station: &Station) -> PlayTransition {
        let is_current = self
            .current_station
            .as_ref()
            .is_some_and(|current| current.id == station.id);

        if is_current && self.status == PlaybackStatus::Playing {
            if let Some(output) = self.output.as_mut() {
                output.pause();
            }
            self.status = PlaybackStatus::Paused;
            info!("controller: paused {}", station.name);
            return PlayTransition::Paused;
        }

        self.current_station = Some(station.clone());
        if self.output.take().is_some() {
            debug!("controller: released previous output");
        }
        if let Some(attempt) = self.pending.take() {
            attempt.abort();
            debug!("controller: aborted attempt gen={}", self.generation);
        }

        self.generation += 1;
        let generation = self.generation;
        self.status = PlaybackStatus::Loading;
        self.last_error = None;

        info!(
            "controller: loading {} ({}) gen={}",
            station.name, station.stream_url, generation
        );

        let sink = Arc::clone(&self.sink);
        let outcome_tx = self.outcome_tx.clone();
        let url = station.stream_url.clone();
        let station_id = station.id.clone();
        let volume = self.effective_volume();
        self.pending = Some(tokio::spawn(async move {
            let result = sink.open(&url, volume).await;
            // Receiver gone means the controller is gone; the output drops here.
            let _ = outcome_tx
                .send(PlaybackOutcome {
                    generation,
                    station_id,
                    result,
                })
                .await;
        }));

        self.register_click(station);

        PlayTransition::Loading { generation }
    }

    /// Apply a finished attempt.  Stale outcomes are dropped without touching
    /// state; their output (if any) is released.
    pub fn complete(&mut self, outcome: PlaybackOutcome) -> Option<Notice> {
        if outcome.generation != self.generation {
            debug!(
                "controller: discarding stale outcome gen={} (current {}) for {}",
                outcome.generation, self.generation, outcome.station_id
            );
            return None;
        }
        self.pending = None;

        let station = self
            .current_station
            .as_ref()
            .map(|s| s.name.clone())
            .unwrap_or_default();

        match outcome.result {
            Ok(mut output) => {
                output.set_volume(self.effective_volume());
                self.output = Some(output);
                self.status = PlaybackStatus::Playing;
                info!("controller: playing {}", station);
                Some(Notice::Started { station })
            }
            Err(e) => {
                warn!("Playback failed for {}: {}", station, e);
                self.status = PlaybackStatus::Idle;
                let message = e.to_string();
                self.last_error = Some(message.clone());
                Some(Notice::PlaybackFailed { station, message })
            }
        }
    }

    /// Fire-and-forget click registration.  Never affects playback.
    fn register_click(&self, station: &Station) {
        let Some(directory) = self.directory.as_ref() else {
            return;
        };
        let directory = Arc::clone(directory);
        let station_id = station.id.clone();
        tokio::spawn(async move {
            if let Err(e) = directory.register_click(&station_id).await {
                debug!("click registration for {} failed: {}", station_id, e);
            }
        });
    }

    pub fn current_station(&self) -> Option<&Station> {
        self.current_station.as_ref()
    }

    pub fn status(&self) -> PlaybackStatus {
        self.status
    }

    pub fn is_playing(&self) -> bool {
        self.status == PlaybackStatus::Playing
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    // ── Volume ──────────────────────────────────────────────────────────────

    /// Clamps to `0.0..=1.0`; NaN is ignored.
    pub fn set_volume(&mut self, volume: f32) {
        let Some(volume) = sanitize_volume(volume) else {
            return;
        };
        self.volume = volume;
        self.apply_volume();
    }

    /// Returns the new mute state.  The stored volume is left as is.
    pub fn toggle_mute(&mut self) -> bool {
        self.is_muted = !self.is_muted;
        self.apply_volume();
        self.is_muted
    }

    pub fn volume(&self) -> f32 {
        self.volume
    }

    pub fn is_muted(&self) -> bool {
        self.is_muted
    }

    pub fn effective_volume(&self) -> f32 {
        if self.is_muted {
            0.0
        } else {
            self.volume
        }
    }

    fn apply_volume(&mut self) {
        let volume = self.effective_volume();
        if let Some(output) = self.output.as_mut() {
            output.set_volume(volume);
        }
    }

    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            current_station: self.current_station.clone(),
            status: self.status,
            volume: self.volume,
            is_muted: self.is_muted,
            effective_volume: self.effective_volume(),
            search_term: self.search_term.clone(),
            country_filter: self.country_filter.clone(),
            favorites: self.favorites.len(),
            last_error: self.last_error.clone(),
        }
    }
}

impl Drop for PlayerController {
    fn drop(&mut self) {
        if let Some(attempt) = self.pending.take() {
            attempt.abort();
        }
    }
}

fn sanitize_volume(volume: f32) -> Option<f32> {
    if volume.is_nan() {
        None
    } else {
        Some(volume.clamp(0.0, 1.0))
    }
}
