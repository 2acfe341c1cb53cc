/// Failures talking to the station directory through the relay.
#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("directory request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("directory returned status {0}")]
    Status(u16),

    #[error("directory response could not be decoded: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Failures opening or driving the audio output.
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error("mpv binary not found (set MPV_PATH or install mpv)")]
    BinaryNotFound,

    #[error("player I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("player IPC error: {0}")]
    Ipc(String),

    #[error("stream unavailable: {0}")]
    Stream(String),

    #[error("stream did not start within {0}s")]
    Timeout(u64),
}
