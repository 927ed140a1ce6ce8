//! Station records and the display transformation.

use serde::{Deserialize, Serialize};

/// Stations below this bitrate are dropped even when the upstream query
/// already asked for the same floor; upstream filtering has been observed to
/// be inconsistent.
pub const MIN_BITRATE: u32 = 120;

/// A station record as returned by the directory API.
#[derive(Debug, Clone, Deserialize)]
pub struct RadioStation {
    pub stationuuid: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub url_resolved: String,
    #[serde(default)]
    pub homepage: String,
    #[serde(default)]
    pub favicon: String,
    #[serde(default)]
    pub tags: String,
    #[serde(default)]
    pub countrycode: String,
    #[serde(default)]
    pub language: String,
    #[serde(default)]
    pub votes: i64,
    #[serde(default)]
    pub codec: String,
    #[serde(default)]
    pub bitrate: u32,
    #[serde(default)]
    pub lastcheckok: i64,
    #[serde(default)]
    pub clickcount: i64,
}

/// Display-oriented projection of a station record.
#[derive(Debug, Clone, Serialize)]
pub struct StationCard {
    pub id: String,
    pub title: String,
    pub subtitle: String,
    pub description: String,
    pub features: Vec<String>,
    pub stationuuid: String,
    pub stream_url: String,
    pub favicon: String,
}

/// A country entry from the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountryInfo {
    pub name: String,
    pub stationcount: i64,
}

/// A tag entry from the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TagInfo {
    pub name: String,
    pub stationcount: i64,
}

/// A language entry from the directory.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LanguageInfo {
    pub name: String,
    pub iso_639: Option<String>,
    pub stationcount: i64,
}

/// Upstream acknowledgement for a click-tracking call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClickResult {
    pub url: String,
    pub name: String,
    pub ok: bool,
    pub message: String,
}

/// Whether a station survives the post-fetch filter.
pub fn keep_station(station: &RadioStation) -> bool {
    station.lastcheckok == 1 && station.bitrate >= MIN_BITRATE
}

/// Transform one station record into its display card.
pub fn transform_station(station: RadioStation) -> StationCard {
    let subtitle = {
        let tags: Vec<&str> = station
            .tags
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .take(3)
            .collect();
        if tags.is_empty() {
            "Radio".to_string()
        } else {
            tags.join(", ")
        }
    };

    let description = if station.homepage.is_empty() {
        format!("{} • {}", station.countrycode, station.language)
    } else {
        station.homepage.clone()
    };

    let codec_line = if station.bitrate > 0 {
        format!(
            "{} {} kbps",
            if station.codec.is_empty() {
                "Unknown"
            } else {
                &station.codec
            },
            station.bitrate
        )
    } else if station.codec.is_empty() {
        "Unknown".to_string()
    } else {
        station.codec.clone()
    };

    let features: Vec<String> = [
        codec_line,
        format!("{} clicks", station.clickcount),
        format!("{} votes", station.votes),
        if station.countrycode.is_empty() {
            "Unknown".to_string()
        } else {
            station.countrycode.clone()
        },
    ]
    .into_iter()
    .filter(|f| !f.is_empty())
    .collect();

    let stream_url = if station.url_resolved.is_empty() {
        station.url
    } else {
        station.url_resolved
    };

    StationCard {
        id: station.stationuuid.clone(),
        title: station.name,
        subtitle,
        description,
        features,
        stationuuid: station.stationuuid,
        stream_url,
        favicon: station.favicon,
    }
}
