//! Station directory client.
//!
//! Every request goes through the relay as `GET <relay>?endpoint=<path>`; the
//! relay appends `<path>` to the directory host.

use std::time::Duration;

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use radio_proto::config::PlayerConfig;
use radio_proto::filter::{countries_from_stations, rank_countries, retain_playable};
use radio_proto::protocol::{CountryAggregate, CountrySource, DirectoryCountry, DirectoryStation, Station};

use crate::error::DirectoryError;

const COUNTRIES_ENDPOINT: &str = "/json/countries?order=stationcount&reverse=true&hidebroken=true";

pub struct DirectoryClient {
    client: Client,
    relay_url: String,
    country_source: CountrySource,
    /// Batch size used when countries are counted from stations.
    station_batch: usize,
}

impl DirectoryClient {
    pub fn new(relay_url: impl Into<String>, timeout: Duration) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("world-radio/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            client,
            relay_url: relay_url.into(),
            country_source: CountrySource::default(),
            station_batch: 100,
        })
    }

    pub fn from_config(config: &PlayerConfig) -> Result<Self, DirectoryError> {
        Ok(Self::new(
            config.relay_url.clone(),
            Duration::from_secs(config.request_timeout_secs),
        )?
        .with_country_source(config.country_source)
        .with_station_batch(config.top_limit))
    }

    pub fn with_country_source(mut self, source: CountrySource) -> Self {
        self.country_source = source;
        self
    }

    pub fn with_station_batch(mut self, batch: usize) -> Self {
        self.station_batch = batch;
        self
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, DirectoryError> {
        let response = self
            .client
            .get(&self.relay_url)
            .query(&[("endpoint", endpoint)])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status(status.as_u16()));
        }

        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    /// Top-voted stations with a directly playable https stream.
    pub async fn try_fetch_top_stations(&self, limit: usize) -> Result<Vec<Station>, DirectoryError> {
        let raw: Vec<DirectoryStation> = self
            .get_json(&format!("/json/stations/topvote/{}", limit))
            .await?;
        let fetched = raw.len();
        let stations = retain_playable(
            raw.into_iter()
                .filter(|r| !r.stationuuid.trim().is_empty())
                .map(Station::from)
                .collect(),
        );
        debug!(
            "directory: {} stations fetched, {} playable",
            fetched,
            stations.len()
        );
        Ok(stations)
    }

    /// Like [`Self::try_fetch_top_stations`], but a failure is logged and
    /// yields an empty list.
    pub async fn fetch_top_stations(&self, limit: usize) -> Vec<Station> {
        match self.try_fetch_top_stations(limit).await {
            Ok(stations) => {
                info!("Loaded {} stations", stations.len());
                stations
            }
            Err(e) => {
                warn!("Error fetching stations: {}", e);
                Vec::new()
            }
        }
    }

    /// Countries ranked by station count, at most `limit` of them.
    pub async fn try_fetch_country_aggregates(
        &self,
        limit: usize,
    ) -> Result<Vec<CountryAggregate>, DirectoryError> {
        match self.country_source {
            CountrySource::Dedicated => {
                let raw: Vec<DirectoryCountry> = self.get_json(COUNTRIES_ENDPOINT).await?;
                let countries = raw.into_iter().map(CountryAggregate::from).collect();
                Ok(rank_countries(countries, limit))
            }
            CountrySource::Stations => {
                let stations = self.try_fetch_top_stations(self.station_batch).await?;
                Ok(countries_from_stations(&stations, limit))
            }
        }
    }

    pub async fn fetch_country_aggregates(&self, limit: usize) -> Vec<CountryAggregate> {
        match self.try_fetch_country_aggregates(limit).await {
            Ok(countries) => countries,
            Err(e) => {
                warn!("Error fetching countries: {}", e);
                Vec::new()
            }
        }
    }

    /// Tell the directory a station was played.  The response body is ignored.
    pub async fn register_click(&self, station_id: &str) -> Result<(), DirectoryError> {
        let response = self
            .client
            .get(&self.relay_url)
            .query(&[("endpoint", format!("/json/url/{}", station_id))])
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(DirectoryError::Status(status.as_u16()));
        }
        Ok(())
    }
}
