//! Shared fixtures: a fake directory behind the real relay, and a scripted
//! audio sink.
#![allow(dead_code)]

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::extract::Path;
use axum::routing::get;
use axum::{Json, Router};
use radio_player::{AudioOutput, AudioSink, SinkError};
use radio_proto::protocol::Station;
use serde_json::{json, Value};
use tokio::sync::Notify;

// ── fake directory ────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct DirectoryFixture {
    pub stations: Arc<Vec<Value>>,
    pub countries: Arc<Vec<Value>>,
    pub clicks: Arc<Mutex<Vec<String>>>,
}

/// 50 stations, the last 10 unplayable (5 http, 3 .m3u, 2 .pls).
pub fn fifty_stations() -> Vec<Value> {
    (0..50)
        .map(|i| {
            let url = match i {
                40..=44 => format!("http://stream.example.org/{i}.mp3"),
                45..=47 => format!("https://stream.example.org/{i}.m3u"),
                48..=49 => format!("https://stream.example.org/{i}.pls"),
                _ => format!("https://stream.example.org/{i}.mp3"),
            };
            let country = if i % 2 == 0 { "France" } else { "Japan" };
            json!({
                "stationuuid": format!("uuid-{i}"),
                "name": format!("Station {i}"),
                "country": country,
                "tags": if i % 5 == 0 { Value::Null } else { json!("pop,news") },
                "url": "",
                "url_resolved": url,
                "favicon": "",
                "votes": 1000 - i,
            })
        })
        .collect()
}

/// Starts the fake directory and a relay in front of it.  Returns the relay
/// URL the directory client should use.
pub async fn spawn_directory_with_relay(fixture: DirectoryFixture) -> String {
    let stations = fixture.stations.clone();
    let countries = fixture.countries.clone();
    let clicks = fixture.clicks.clone();

    let app = Router::new()
        .route(
            "/json/stations/topvote/:n",
            get(move |Path(n): Path<usize>| {
                let stations = stations.clone();
                async move { Json(stations.iter().take(n).cloned().collect::<Vec<_>>()) }
            }),
        )
        .route(
            "/json/countries",
            get(move || {
                let countries = countries.clone();
                async move { Json((*countries).clone()) }
            }),
        )
        .route(
            "/json/url/:id",
            get(move |Path(id): Path<String>| {
                let clicks = clicks.clone();
                async move {
                    clicks.lock().unwrap().push(id);
                    Json(json!({ "ok": true }))
                }
            }),
        )
        .route("/json/broken", get(|| async { "not json" }));

    let upstream = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_addr = upstream.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(upstream, app).await.unwrap();
    });

    let state = radio_relay::RelayState::new(
        &format!("http://{upstream_addr}"),
        Duration::from_secs(5),
        true,
    )
    .unwrap();
    let relay = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let relay_addr = relay.local_addr().unwrap();
    radio_relay::spawn(relay, state);

    format!("http://{relay_addr}/api/radio")
}

/// An address nothing listens on.
pub async fn dead_address() -> SocketAddr {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    addr
}

// ── scripted sink ─────────────────────────────────────────────────────────────

#[derive(Clone, Default)]
pub struct Script {
    /// Wait for this before answering.
    pub gate: Option<Arc<Notify>>,
    /// Fail with this message instead of starting.
    pub fail: Option<String>,
}

/// Observations shared between the sink, its outputs and the test.
#[derive(Default)]
pub struct SinkLog {
    pub live_outputs: AtomicUsize,
    pub opened: Mutex<Vec<String>>,
    pub pauses: AtomicUsize,
    pub volumes: Mutex<Vec<f32>>,
}

#[derive(Default)]
pub struct ScriptedSink {
    scripts: Mutex<HashMap<String, Script>>,
    pub log: Arc<SinkLog>,
}

impl ScriptedSink {
    pub fn script(&self, url: &str, script: Script) {
        self.scripts.lock().unwrap().insert(url.to_string(), script);
    }
}

#[async_trait]
impl AudioSink for ScriptedSink {
    async fn open(&self, url: &str, volume: f32) -> Result<Box<dyn AudioOutput>, SinkError> {
        let script = self.scripts.lock().unwrap().get(url).cloned().unwrap_or_default();
        if let Some(gate) = script.gate {
            gate.notified().await;
        }
        if let Some(message) = script.fail {
            return Err(SinkError::Stream(message));
        }
        self.log.opened.lock().unwrap().push(url.to_string());
        self.log.live_outputs.fetch_add(1, Ordering::SeqCst);
        self.log.volumes.lock().unwrap().push(volume);
        Ok(Box::new(ScriptedOutput {
            log: self.log.clone(),
        }))
    }
}

pub struct ScriptedOutput {
    log: Arc<SinkLog>,
}

impl AudioOutput for ScriptedOutput {
    fn pause(&mut self) {
        self.log.pauses.fetch_add(1, Ordering::SeqCst);
    }

    fn set_volume(&mut self, volume: f32) {
        self.log.volumes.lock().unwrap().push(volume);
    }
}

impl Drop for ScriptedOutput {
    fn drop(&mut self) {
        self.log.live_outputs.fetch_sub(1, Ordering::SeqCst);
    }
}

pub fn station(id: &str) -> Station {
    Station::new(id, format!("Station {id}"), format!("https://stream.example.org/{id}.mp3"))
}
