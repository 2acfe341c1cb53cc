//! Pure derivations over the station list.
//!
//! Nothing here holds state: the visible list is always recomputed from
//! `(stations, search, country)`.

use std::collections::HashMap;

use crate::protocol::{CountryAggregate, Station};

/// Playlist manifests a plain media element cannot open without a parser.
const PLAYLIST_SUFFIXES: [&str; 2] = [".m3u", ".pls"];

/// Upper bound on the country ranking.
pub const MAX_COUNTRIES: usize = 50;

/// True if `station` matches `query` in name, country or tags.
///
/// `query` must already be lowercase; empty matches everything.
pub fn matches_search(station: &Station, query: &str) -> bool {
    if query.is_empty() {
        return true;
    }
    station.name.to_lowercase().contains(query)
        || station.country.to_lowercase().contains(query)
        || station.tags.to_lowercase().contains(query)
}

/// Exact, case-insensitive country match.  Empty `country` matches everything.
pub fn matches_country(station: &Station, country: &str) -> bool {
    country.is_empty() || station.country.to_lowercase() == country.to_lowercase()
}

/// The stations a user currently sees, in directory order.
pub fn visible_stations<'a>(stations: &'a [Station], search: &str, country: &str) -> Vec<&'a Station> {
    let query = search.to_lowercase();
    stations
        .iter()
        .filter(|s| matches_search(s, &query) && matches_country(s, country))
        .collect()
}

/// Direct https audio stream, not a playlist manifest.
pub fn is_playable_stream_url(url: &str) -> bool {
    let url = url.trim().to_ascii_lowercase();
    url.starts_with("https://") && !PLAYLIST_SUFFIXES.iter().any(|suffix| url.ends_with(suffix))
}

/// Drop stations whose stream the player cannot open directly.
pub fn retain_playable(stations: Vec<Station>) -> Vec<Station> {
    stations
        .into_iter()
        .filter(|s| is_playable_stream_url(&s.stream_url))
        .collect()
}

/// Keep non-empty counts, sort descending by count (then name), cap at `limit`.
pub fn rank_countries(mut countries: Vec<CountryAggregate>, limit: usize) -> Vec<CountryAggregate> {
    countries.retain(|c| c.station_count > 0 && !c.name.is_empty());
    countries.sort_by(|a, b| {
        b.station_count
            .cmp(&a.station_count)
            .then_with(|| a.name.cmp(&b.name))
    });
    countries.truncate(limit);
    countries
}

/// Count stations per country in a batch, then rank.
pub fn countries_from_stations(stations: &[Station], limit: usize) -> Vec<CountryAggregate> {
    let mut counts: HashMap<&str, u64> = HashMap::new();
    for station in stations {
        let name = station.country.trim();
        if !name.is_empty() {
            *counts.entry(name).or_default() += 1;
        }
    }
    let countries = counts
        .into_iter()
        .map(|(name, station_count)| CountryAggregate {
            name: name.to_string(),
            station_count,
        })
        .collect();
    rank_countries(countries, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Station> {
        vec![
            Station::new("1", "Radio Paradise", "https://stream.example.org/rp.mp3")
                .with_country("The United States Of America")
                .with_tags("eclectic,rock"),
            Station::new("2", "FIP", "https://stream.example.org/fip.aac")
                .with_country("France")
                .with_tags("jazz,world"),
            Station::new("3", "Jazz Radio", "https://stream.example.org/jazz.mp3")
                .with_country("France"),
            Station::new("4", "NTS 1", "https://stream.example.org/nts1")
                .with_country("The United Kingdom Of Great Britain And Northern Ireland")
                .with_tags("Underground"),
        ]
    }

    fn ids(view: &[&Station]) -> Vec<String> {
        view.iter().map(|s| s.id.clone()).collect()
    }

    #[test]
    fn test_search_matches_name_country_and_tags() {
        let stations = sample();
        assert_eq!(ids(&visible_stations(&stations, "JAZZ", "")), vec!["2", "3"]);
        assert_eq!(ids(&visible_stations(&stations, "france", "")), vec!["2", "3"]);
        assert_eq!(ids(&visible_stations(&stations, "underground", "")), vec!["4"]);
        assert_eq!(visible_stations(&stations, "", "").len(), 4);
    }

    #[test]
    fn test_empty_tags_never_match_and_never_fail() {
        let stations = vec![Station::new("x", "Plain", "https://a.example/s")];
        assert!(visible_stations(&stations, "rock", "").is_empty());
        assert_eq!(visible_stations(&stations, "pla", "").len(), 1);
    }

    #[test]
    fn test_search_term_is_matched_as_typed() {
        let stations = vec![
            Station::new("1", "Kiss FM", "https://a.example/1"),
            Station::new("2", "FMX Radio", "https://a.example/2"),
        ];
        assert_eq!(ids(&visible_stations(&stations, " fm", "")), vec!["1"]);
        assert!(visible_stations(&stations, "  ", "").is_empty());
        assert_eq!(visible_stations(&stations, "", "").len(), 2);
    }

    #[test]
    fn test_country_filter_exact_case_insensitive() {
        let stations = sample();
        assert_eq!(ids(&visible_stations(&stations, "", "FRANCE")), vec!["2", "3"]);
        // Substring is not enough for the country filter.
        assert!(visible_stations(&stations, "", "Fran").is_empty());
    }

    #[test]
    fn test_clearing_country_restores_unfiltered_view() {
        let stations = sample();
        let unfiltered = ids(&visible_stations(&stations, "a", ""));
        let filtered = ids(&visible_stations(&stations, "a", "France"));
        assert!(filtered.len() < unfiltered.len());
        assert_eq!(ids(&visible_stations(&stations, "a", "")), unfiltered);
    }

    #[test]
    fn test_search_and_country_combine() {
        let stations = sample();
        assert_eq!(ids(&visible_stations(&stations, "jazz", "france")), vec!["2", "3"]);
        assert_eq!(ids(&visible_stations(&stations, "fip", "france")), vec!["2"]);
        assert!(visible_stations(&stations, "paradise", "france").is_empty());
    }

    #[test]
    fn test_playable_stream_urls() {
        assert!(is_playable_stream_url("https://stream.example.org/live.mp3"));
        assert!(!is_playable_stream_url("http://stream.example.org/live.mp3"));
        assert!(!is_playable_stream_url("https://stream.example.org/list.m3u"));
        assert!(!is_playable_stream_url("https://stream.example.org/list.pls"));
        assert!(!is_playable_stream_url("https://stream.example.org/LIST.PLS"));
        assert!(!is_playable_stream_url(""));
        // HLS manifests are m3u8, not m3u.
        assert!(is_playable_stream_url("https://stream.example.org/live.m3u8"));
    }

    #[test]
    fn test_rank_countries() {
        let raw = vec![
            CountryAggregate { name: "Germany".into(), station_count: 30 },
            CountryAggregate { name: "Atlantis".into(), station_count: 0 },
            CountryAggregate { name: "France".into(), station_count: 50 },
            CountryAggregate { name: "Austria".into(), station_count: 30 },
        ];
        let ranked = rank_countries(raw, 2);
        assert_eq!(
            ranked,
            vec![
                CountryAggregate { name: "France".into(), station_count: 50 },
                CountryAggregate { name: "Austria".into(), station_count: 30 },
            ]
        );
    }

    #[test]
    fn test_countries_from_stations() {
        let ranked = countries_from_stations(&sample(), MAX_COUNTRIES);
        assert_eq!(ranked.len(), 3);
        assert_eq!(ranked[0], CountryAggregate { name: "France".into(), station_count: 2 });
    }
}
