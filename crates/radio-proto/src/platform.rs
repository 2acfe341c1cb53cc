use std::path::PathBuf;

const APP_DIR: &str = "world-radio";

/// Override for the mpv executable used by the player's audio sink.
pub const MPV_PATH_ENV: &str = "MPV_PATH";

pub fn data_dir() -> PathBuf {
    // On macOS and Linux, use ~/.local/share/world-radio/ (XDG standard)
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".local")
            .join("share")
            .join(APP_DIR)
    }
    #[cfg(windows)]
    {
        dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

pub fn config_dir() -> PathBuf {
    // On macOS and Linux, always use ~/.config/world-radio/
    #[cfg(unix)]
    {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
            .join(APP_DIR)
    }

    #[cfg(windows)]
    {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(APP_DIR)
    }
}

/// IPC endpoint name for one mpv instance.  Each playback attempt gets its own
/// process, so the name carries the process id and a per-attempt serial.
#[cfg(unix)]
pub fn mpv_socket_name(serial: u64) -> String {
    format!(
        "{}/world-radio-mpv-{}-{}.sock",
        std::env::temp_dir().display(),
        std::process::id(),
        serial
    )
}

#[cfg(windows)]
pub fn mpv_socket_name(serial: u64) -> String {
    format!("world-radio-mpv-{}-{}", std::process::id(), serial)
}

#[cfg(unix)]
pub fn mpv_socket_arg(serial: u64) -> String {
    format!("--input-ipc-server={}", mpv_socket_name(serial))
}

#[cfg(windows)]
pub fn mpv_socket_arg(serial: u64) -> String {
    format!("--input-ipc-server=\\\\.\\pipe\\{}", mpv_socket_name(serial))
}

#[cfg(unix)]
pub fn mpv_binary_name() -> &'static str {
    "mpv"
}

#[cfg(windows)]
pub fn mpv_binary_name() -> &'static str {
    "mpv.exe"
}

/// Find mpv for playback.
///
/// Searches in order:
/// 1. `MPV_PATH` environment variable
/// 2. Beside the current executable
/// 3. PATH
pub fn find_mpv_binary() -> Option<PathBuf> {
    if let Ok(p) = std::env::var(MPV_PATH_ENV) {
        let path = PathBuf::from(p);
        if path.exists() {
            return Some(path);
        }
    }

    let exe_name = mpv_binary_name();

    if let Ok(current_exe) = std::env::current_exe() {
        if let Some(dir) = current_exe.parent() {
            let local_mpv = dir.join(exe_name);
            if local_mpv.exists() {
                return Some(local_mpv);
            }
        }
    }

    let path = std::env::var_os("PATH")?;
    std::env::split_paths(&path)
        .map(|dir| dir.join(exe_name))
        .find(|candidate| candidate.exists())
}
