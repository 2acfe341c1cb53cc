mod common;

use std::sync::Arc;
use std::time::Duration;

use common::{dead_address, fifty_stations, spawn_directory_with_relay, DirectoryFixture};
use radio_player::{DirectoryClient, DirectoryError};
use radio_proto::protocol::CountrySource;
use serde_json::json;

fn client(relay_url: &str) -> DirectoryClient {
    DirectoryClient::new(relay_url, Duration::from_secs(5)).unwrap()
}

#[tokio::test]
async fn drops_unplayable_stations() {
    let relay = spawn_directory_with_relay(DirectoryFixture {
        stations: Arc::new(fifty_stations()),
        ..Default::default()
    })
    .await;

    let stations = client(&relay).fetch_top_stations(100).await;
    assert_eq!(stations.len(), 40);
    assert!(stations.iter().all(|s| s.stream_url.starts_with("https://")));
    assert!(stations
        .iter()
        .all(|s| !s.stream_url.ends_with(".m3u") && !s.stream_url.ends_with(".pls")));
    // Null tags decode as empty.
    assert_eq!(stations[0].tags, "");
    assert_eq!(stations[1].tags, "pop,news");
}

#[tokio::test]
async fn top_limit_is_forwarded_upstream() {
    let relay = spawn_directory_with_relay(DirectoryFixture {
        stations: Arc::new(fifty_stations()),
        ..Default::default()
    })
    .await;

    let stations = client(&relay).try_fetch_top_stations(5).await.unwrap();
    assert_eq!(stations.len(), 5);
    assert_eq!(stations[4].id, "uuid-4");
}

#[tokio::test]
async fn dedicated_countries_are_ranked_and_capped() {
    let mut countries = vec![
        json!({ "name": "Nowhere", "stationcount": 0 }),
        json!({ "name": "Germany", "stationcount": 3000 }),
        json!({ "name": "France", "stationcount": 1500 }),
    ];
    for i in 0..60 {
        countries.push(json!({ "name": format!("Country {i}"), "stationcount": 10 + i }));
    }
    let relay = spawn_directory_with_relay(DirectoryFixture {
        countries: Arc::new(countries),
        ..Default::default()
    })
    .await;

    let ranked = client(&relay).fetch_country_aggregates(50).await;
    assert_eq!(ranked.len(), 50);
    assert_eq!(ranked[0].name, "Germany");
    assert_eq!(ranked[1].name, "France");
    assert!(ranked.windows(2).all(|w| w[0].station_count >= w[1].station_count));
    assert!(ranked.iter().all(|c| c.station_count > 0));
}

#[tokio::test]
async fn countries_can_be_counted_from_station_batch() {
    let relay = spawn_directory_with_relay(DirectoryFixture {
        stations: Arc::new(fifty_stations()),
        ..Default::default()
    })
    .await;

    let ranked = client(&relay)
        .with_country_source(CountrySource::Stations)
        .with_station_batch(100)
        .fetch_country_aggregates(50)
        .await;
    // 40 playable stations split evenly between two countries.
    assert_eq!(ranked.len(), 2);
    assert_eq!(ranked[0].station_count, 20);
    assert_eq!(ranked[1].station_count, 20);
}

#[tokio::test]
async fn unreachable_relay_yields_empty_lists() {
    let relay = format!("http://{}/api/radio", dead_address().await);
    let client = client(&relay);

    assert!(matches!(
        client.try_fetch_top_stations(10).await,
        Err(DirectoryError::Transport(_))
    ));
    assert!(client.fetch_top_stations(10).await.is_empty());
    assert!(client.fetch_country_aggregates(50).await.is_empty());
}

#[tokio::test]
async fn non_success_status_is_an_error() {
    let relay = spawn_directory_with_relay(DirectoryFixture::default()).await;
    let wrong_path = relay.replace("/api/radio", "/not-the-relay");
    let client = client(&wrong_path);

    assert!(matches!(
        client.try_fetch_top_stations(10).await,
        Err(DirectoryError::Status(404))
    ));
    assert!(client.fetch_top_stations(10).await.is_empty());
}

#[tokio::test]
async fn records_without_uuid_are_skipped() {
    let mut stations = fifty_stations();
    stations.insert(0, json!({ "name": "no uuid", "url_resolved": "https://a.example/x.mp3" }));
    stations.insert(1, json!({ "stationuuid": null, "name": "null uuid" }));
    let relay = spawn_directory_with_relay(DirectoryFixture {
        stations: Arc::new(stations),
        ..Default::default()
    })
    .await;

    let stations = client(&relay).try_fetch_top_stations(100).await.unwrap();
    assert_eq!(stations.len(), 40);
    assert_eq!(stations[0].id, "uuid-0");
}

#[tokio::test]
async fn malformed_records_are_a_decode_error() {
    let relay = spawn_directory_with_relay(DirectoryFixture {
        stations: Arc::new(vec![json!({ "stationuuid": 42, "name": "numeric id" })]),
        ..Default::default()
    })
    .await;

    assert!(matches!(
        client(&relay).try_fetch_top_stations(10).await,
        Err(DirectoryError::Decode(_))
    ));
}

#[tokio::test]
async fn click_registration_reaches_directory() {
    let fixture = DirectoryFixture::default();
    let clicks = fixture.clicks.clone();
    let relay = spawn_directory_with_relay(fixture).await;

    client(&relay).register_click("uuid-7").await.unwrap();
    assert_eq!(*clicks.lock().unwrap(), vec!["uuid-7".to_string()]);
}
