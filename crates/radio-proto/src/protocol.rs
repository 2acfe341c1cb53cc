use serde::{Deserialize, Serialize};

/// Station as consumed by the player.  Built from a [`DirectoryStation`].
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Station {
    /// Directory `stationuuid`; identity for favorites and playback.
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub country: String,
    /// Comma-separated free text as the directory returns it.
    #[serde(default)]
    pub tags: String,
    pub stream_url: String,
    #[serde(default)]
    pub icon_url: Option<String>,
    #[serde(default)]
    pub vote_count: i64,
}

impl Station {
    pub fn new(id: impl Into<String>, name: impl Into<String>, stream_url: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            stream_url: stream_url.into(),
            ..Self::default()
        }
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = country.into();
        self
    }

    pub fn with_tags(mut self, tags: impl Into<String>) -> Self {
        self.tags = tags.into();
        self
    }
}

/// Raw station record from the directory API (`/json/stations/...`).
///
/// Any field may be missing or null upstream, so all of them default.  A
/// record without a uuid has no identity and is skipped by the client.  We keep this separate from `Station` so the directory schema can
/// drift without touching the player.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct DirectoryStation {
    #[serde(default, deserialize_with = "null_as_default")]
    pub stationuuid: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub country: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub tags: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub url_resolved: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub favicon: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub votes: i64,
}

impl DirectoryStation {
    /// `url_resolved`, falling back to `url` when the directory left it empty.
    pub fn resolved_url(&self) -> &str {
        if self.url_resolved.trim().is_empty() {
            self.url.trim()
        } else {
            self.url_resolved.trim()
        }
    }
}

impl From<DirectoryStation> for Station {
    fn from(raw: DirectoryStation) -> Self {
        let stream_url = raw.resolved_url().to_string();
        let icon_url = if raw.favicon.trim().is_empty() {
            None
        } else {
            Some(raw.favicon.trim().to_string())
        };
        Station {
            id: raw.stationuuid,
            name: raw.name.trim().to_string(),
            country: raw.country.trim().to_string(),
            tags: raw.tags,
            stream_url,
            icon_url,
            vote_count: raw.votes,
        }
    }
}

/// Raw country record from `/json/countries`.
#[derive(Debug, Clone, Deserialize)]
pub struct DirectoryCountry {
    #[serde(default, deserialize_with = "null_as_default")]
    pub name: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub stationcount: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CountryAggregate {
    pub name: String,
    pub station_count: u64,
}

impl From<DirectoryCountry> for CountryAggregate {
    fn from(raw: DirectoryCountry) -> Self {
        Self {
            name: raw.name.trim().to_string(),
            station_count: raw.stationcount,
        }
    }
}

/// Where country aggregates come from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum CountrySource {
    /// Dedicated `/json/countries` query: global counts.
    #[default]
    Dedicated,
    /// Counted from the same top-N station batch.
    Stations,
}

/// Playback slot state.
///
/// Transitions:
///   Idle -> Loading -> Playing -> Paused
///   Loading -> Idle   (start failed)
///   any -> Loading    (play on another station, or re-play after pause)
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum PlaybackStatus {
    #[default]
    Idle,
    Loading,
    Playing,
    Paused,
}

impl PlaybackStatus {
    pub fn label(&self) -> &'static str {
        match self {
            PlaybackStatus::Idle => "idle",
            PlaybackStatus::Loading => "loading",
            PlaybackStatus::Playing => "playing",
            PlaybackStatus::Paused => "paused",
        }
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de> + Default,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
