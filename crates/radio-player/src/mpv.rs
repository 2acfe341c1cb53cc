//! mpv-backed audio sink with separated reader/writer IPC tasks.
//!
//! Architecture:
//!
//! ```text
//!   MpvSink::open(url)
//!         │
//!         ├── spawn mpv --idle --input-ipc-server=<per-attempt socket>
//!         ├── writer_task   ← receives PendingRequest via mpsc, serialises → socket
//!         ├── reader_task   ← reads JSON lines from socket
//!         │                      ├── response (has request_id) → matched oneshot::Sender
//!         │                      └── event                     → event channel
//!         └── loadfile url, then wait for `playback-restart` / `end-file`
//! ```
//!
//! Every `open` gets its own process.  The returned `MpvOutput` owns it
//! (`kill_on_drop`), so dropping a superseded output can never touch the
//! stream that replaced it.
//!
//! Platform notes:
//! - Unix:   Unix domain sockets
//! - Windows: Named pipes  \\.\pipe\<name>
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{json, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::{mpsc, oneshot, Mutex};
use tracing::{debug, info, warn};

use crate::error::SinkError;
use crate::sink::{AudioOutput, AudioSink};

// ── global counters ───────────────────────────────────────────────────────────

static NEXT_REQ_ID: AtomicU64 = AtomicU64::new(1);

const IPC_REPLY_TIMEOUT: Duration = Duration::from_secs(5);
const SOCKET_WAIT_STEPS: u32 = 50;
const SOCKET_WAIT_STEP: Duration = Duration::from_millis(100);

// ── internal channel types ────────────────────────────────────────────────────

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<Result<Value, SinkError>>>>>;

struct PendingRequest {
    req_id: u64,
    payload: String, // serialised JSON line (already has '\n')
    reply: oneshot::Sender<Result<Value, SinkError>>,
}

/// An mpv event that arrived unsolicited (no request_id).
#[derive(Debug, Clone)]
pub struct MpvEvent {
    pub raw: Value,
}

impl MpvEvent {
    /// Returns the event name, e.g. "end-file", "start-file", "playback-restart".
    pub fn event_name(&self) -> Option<&str> {
        self.raw.get("event")?.as_str()
    }

    /// For `end-file`: the `reason` field ("eof", "stop", "error", ...).
    pub fn end_reason(&self) -> Option<&str> {
        self.raw.get("reason")?.as_str()
    }
}

/// What a startup event means for the pending `open`.
#[derive(Debug, PartialEq)]
enum StartSignal {
    Started,
    Failed(String),
    Pending,
}

fn classify_start_event(event: &MpvEvent) -> StartSignal {
    match event.event_name() {
        Some("playback-restart") => StartSignal::Started,
        Some("end-file") => {
            let reason = event.end_reason().unwrap_or("unknown");
            let detail = event
                .raw
                .get("file_error")
                .and_then(|v| v.as_str())
                .unwrap_or(reason);
            StartSignal::Failed(detail.to_string())
        }
        _ => StartSignal::Pending,
    }
}

// ── IPC handle ────────────────────────────────────────────────────────────────

/// Cloneable handle to the mpv writer task.  Use `send()` to fire a command
/// and await the response.
#[derive(Clone)]
pub struct MpvHandle {
    tx: mpsc::Sender<PendingRequest>,
}

impl MpvHandle {
    pub async fn send(&self, command: Value) -> Result<Value, SinkError> {
        let req_id = NEXT_REQ_ID.fetch_add(1, Ordering::Relaxed);
        let msg = json!({ "command": command, "request_id": req_id });
        let mut raw = serde_json::to_string(&msg).map_err(|e| SinkError::Ipc(e.to_string()))?;
        raw.push('\n');

        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(PendingRequest {
                req_id,
                payload: raw,
                reply: reply_tx,
            })
            .await
            .map_err(|_| SinkError::Ipc("mpv writer task gone".into()))?;

        tokio::time::timeout(IPC_REPLY_TIMEOUT, reply_rx)
            .await
            .map_err(|_| SinkError::Ipc(format!("timeout for req={}", req_id)))?
            .map_err(|_| SinkError::Ipc(format!("reply channel dropped req={}", req_id)))?
    }

    pub async fn load_stream(&self, url: &str) -> Result<(), SinkError> {
        self.send(json!(["loadfile", url])).await?;
        Ok(())
    }

    pub async fn set_volume(&self, vol: f32) -> Result<(), SinkError> {
        self.send(json!(["set_property", "volume", volume_percent(vol)]))
            .await?;
        Ok(())
    }

    pub async fn set_pause(&self, paused: bool) -> Result<(), SinkError> {
        self.send(json!(["set_property", "pause", paused])).await?;
        Ok(())
    }
}

fn volume_percent(volume: f32) -> f64 {
    f64::from((volume * 100.0).clamp(0.0, 100.0)).round()
}

// ── sink ──────────────────────────────────────────────────────────────────────

pub struct MpvSink {
    binary: Option<PathBuf>,
    start_timeout: Duration,
    next_serial: AtomicU64,
}

impl MpvSink {
    /// Uses the mpv found by [`radio_proto::platform::find_mpv_binary`].
    pub fn new(start_timeout: Duration) -> Self {
        Self::with_binary(radio_proto::platform::find_mpv_binary(), start_timeout)
    }

    pub fn with_binary(binary: Option<PathBuf>, start_timeout: Duration) -> Self {
        Self {
            binary,
            start_timeout,
            next_serial: AtomicU64::new(1),
        }
    }

    pub fn is_available(&self) -> bool {
        self.binary.is_some()
    }

    fn spawn_process(&self, serial: u64, volume: f32) -> Result<MpvProcess, SinkError> {
        let binary = self.binary.as_ref().ok_or(SinkError::BinaryNotFound)?;
        let socket_name = radio_proto::platform::mpv_socket_name(serial);

        #[cfg(unix)]
        let _ = std::fs::remove_file(&socket_name);

        let child = tokio::process::Command::new(binary)
            .arg("--no-video")
            .arg("--idle=yes")
            .arg("--no-terminal")
            .arg(radio_proto::platform::mpv_socket_arg(serial))
            .arg(format!("--volume={}", volume_percent(volume)))
            .stdin(std::process::Stdio::null())
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .kill_on_drop(true)
            .spawn()?;

        Ok(MpvProcess {
            child,
            socket_name,
        })
    }

    async fn start(
        &self,
        process: &mut MpvProcess,
        url: &str,
    ) -> Result<MpvHandle, SinkError> {
        let (event_tx, mut event_rx) = mpsc::channel::<MpvEvent>(64);
        let handle = connect_ipc(process, event_tx).await?;

        handle.load_stream(url).await?;

        let waited = tokio::time::timeout(self.start_timeout, async {
            while let Some(event) = event_rx.recv().await {
                debug!("mpv: startup event {:?}", event.event_name());
                match classify_start_event(&event) {
                    StartSignal::Started => return Ok(()),
                    StartSignal::Failed(reason) => return Err(SinkError::Stream(reason)),
                    StartSignal::Pending => {}
                }
            }
            Err(SinkError::Ipc("mpv exited before playback started".into()))
        })
        .await;

        match waited {
            Ok(Ok(())) => {
                // Keep draining so the reader task never blocks on a full channel.
                tokio::spawn(async move { while event_rx.recv().await.is_some() {} });
                Ok(handle)
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(SinkError::Timeout(self.start_timeout.as_secs())),
        }
    }
}

#[async_trait]
impl AudioSink for MpvSink {
    async fn open(&self, url: &str, volume: f32) -> Result<Box<dyn AudioOutput>, SinkError> {
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);
        let mut process = self.spawn_process(serial, volume)?;
        info!("mpv[{}]: opening {}", serial, url);

        // On error `process` drops here, killing mpv and removing its socket.
        let handle = self.start(&mut process, url).await?;
        info!("mpv[{}]: playback started", serial);

        Ok(Box::new(MpvOutput {
            serial,
            handle,
            _process: process,
        }))
    }
}

// ── process guard ─────────────────────────────────────────────────────────────

struct MpvProcess {
    child: tokio::process::Child,
    socket_name: String,
}

impl MpvProcess {
    fn alive(&mut self) -> bool {
        self.child.try_wait().ok().flatten().is_none()
    }
}

impl Drop for MpvProcess {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
        #[cfg(unix)]
        let _ = std::fs::remove_file(&self.socket_name);
    }
}

// ── output ────────────────────────────────────────────────────────────────────

pub struct MpvOutput {
    serial: u64,
    handle: MpvHandle,
    _process: MpvProcess,
}

impl AudioOutput for MpvOutput {
    fn pause(&mut self) {
        let handle = self.handle.clone();
        let serial = self.serial;
        tokio::spawn(async move {
            if let Err(e) = handle.set_pause(true).await {
                warn!("mpv[{}]: pause failed: {}", serial, e);
            }
        });
    }

    fn set_volume(&mut self, volume: f32) {
        let handle = self.handle.clone();
        let serial = self.serial;
        tokio::spawn(async move {
            if let Err(e) = handle.set_volume(volume).await {
                warn!("mpv[{}]: set volume failed: {}", serial, e);
            }
        });
    }
}

impl Drop for MpvOutput {
    fn drop(&mut self) {
        debug!("mpv[{}]: output released", self.serial);
    }
}

// ── connection ────────────────────────────────────────────────────────────────

#[cfg(unix)]
async fn connect_ipc(
    process: &mut MpvProcess,
    event_tx: mpsc::Sender<MpvEvent>,
) -> Result<MpvHandle, SinkError> {
    use tokio::net::UnixStream;

    let socket_path = PathBuf::from(&process.socket_name);
    for _ in 0..SOCKET_WAIT_STEPS {
        if socket_path.exists() {
            break;
        }
        if !process.alive() {
            return Err(SinkError::Ipc("mpv exited during startup".into()));
        }
        tokio::time::sleep(SOCKET_WAIT_STEP).await;
    }
    if !socket_path.exists() {
        return Err(SinkError::Ipc("mpv IPC socket did not appear".into()));
    }

    let stream = UnixStream::connect(&socket_path).await?;
    debug!("mpv: connected to IPC socket {}", socket_path.display());
    let (read_half, write_half) = stream.into_split();
    Ok(start_io_tasks(read_half, write_half, event_tx))
}

#[cfg(windows)]
async fn connect_ipc(
    process: &mut MpvProcess,
    event_tx: mpsc::Sender<MpvEvent>,
) -> Result<MpvHandle, SinkError> {
    use tokio::net::windows::named_pipe::ClientOptions;

    let pipe_path = format!(r"\\.\pipe\{}", process.socket_name);
    for _ in 0..SOCKET_WAIT_STEPS {
        tokio::time::sleep(SOCKET_WAIT_STEP).await;
        if !process.alive() {
            return Err(SinkError::Ipc("mpv exited during startup".into()));
        }
        if let Ok(client) = ClientOptions::new().open(&pipe_path) {
            debug!("mpv: connected to named pipe {}", pipe_path);
            let (read_half, write_half) = tokio::io::split(client);
            return Ok(start_io_tasks(read_half, write_half, event_tx));
        }
    }
    Err(SinkError::Ipc("mpv named pipe did not appear".into()))
}

fn start_io_tasks<R, W>(read_half: R, write_half: W, event_tx: mpsc::Sender<MpvEvent>) -> MpvHandle
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
    W: tokio::io::AsyncWrite + Unpin + Send + 'static,
{
    // pending map: req_id → reply channel.  Shared between writer (inserts) and reader (resolves).
    let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
    let (cmd_tx, cmd_rx) = mpsc::channel::<PendingRequest>(64);

    tokio::spawn(writer_task(write_half, cmd_rx, pending.clone()));
    tokio::spawn(reader_task(BufReader::new(read_half), pending, event_tx));

    MpvHandle { tx: cmd_tx }
}

// ── reader task ───────────────────────────────────────────────────────────────

async fn fail_pending(pending: &PendingMap, reason: &str) {
    let mut map = pending.lock().await;
    for (_, tx) in map.drain() {
        let _ = tx.send(Err(SinkError::Ipc(reason.to_string())));
    }
}

async fn reader_task<R>(mut reader: BufReader<R>, pending: PendingMap, event_tx: mpsc::Sender<MpvEvent>)
where
    R: tokio::io::AsyncRead + Unpin,
{
    let mut line = String::new();
    loop {
        line.clear();
        match reader.read_line(&mut line).await {
            Ok(0) => {
                debug!("mpv reader: connection closed");
                fail_pending(&pending, "mpv IPC connection closed").await;
                break;
            }
            Ok(_) => {
                let trimmed = line.trim();
                if trimmed.is_empty() {
                    continue;
                }
                let val: Value = match serde_json::from_str(trimmed) {
                    Ok(v) => v,
                    Err(e) => {
                        debug!("mpv reader: invalid json '{}': {}", trimmed, e);
                        continue;
                    }
                };

                if let Some(req_id) = val.get("request_id").and_then(|v| v.as_u64()) {
                    let mut map = pending.lock().await;
                    if let Some(tx) = map.remove(&req_id) {
                        let result = if val["error"].as_str() == Some("success") {
                            Ok(val)
                        } else {
                            let err = val["error"].as_str().unwrap_or("unknown error");
                            Err(SinkError::Ipc(format!("mpv error: {}", err)))
                        };
                        let _ = tx.send(result);
                    } else {
                        debug!("mpv reader: response for unknown req={}", req_id);
                    }
                } else if event_tx.send(MpvEvent { raw: val }).await.is_err() {
                    debug!("mpv reader: event receiver gone");
                }
            }
            Err(e) => {
                warn!("mpv reader: read error: {}", e);
                fail_pending(&pending, "mpv IPC read error").await;
                break;
            }
        }
    }
}

// ── writer task ───────────────────────────────────────────────────────────────

async fn writer_task<W>(mut writer: W, mut rx: mpsc::Receiver<PendingRequest>, pending: PendingMap)
where
    W: tokio::io::AsyncWrite + Unpin,
{
    while let Some(req) = rx.recv().await {
        // Register reply channel before writing so reader can match it
        {
            let mut map = pending.lock().await;
            map.insert(req.req_id, req.reply);
        }
        debug!("mpv writer: send req={} payload={}", req.req_id, req.payload.trim());
        if let Err(e) = writer.write_all(req.payload.as_bytes()).await {
            warn!("mpv writer: write error: {}", e);
            let mut map = pending.lock().await;
            if let Some(tx) = map.remove(&req.req_id) {
                let _ = tx.send(Err(SinkError::Ipc(format!("write error: {}", e))));
            }
            break;
        }
    }
    debug!("mpv writer: task exiting");
}
