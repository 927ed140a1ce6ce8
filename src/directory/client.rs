//! Failover fetching against the discovered directory replicas.

use serde::de::DeserializeOwned;

use super::{
    keep_station, transform_station, ClickResult, CountryInfo, DirectoryError, LanguageInfo,
    RadioStation, SearchFilter, ShufflePolicy, SortOrder, SrvResolver, StationCard, TagInfo,
    MIN_BITRATE,
};
use crate::config::DEFAULT_DIRECTORY_SERVICE;

const USER_AGENT: &str = concat!("wavegate/", env!("CARGO_PKG_VERSION"));

/// Client for the station directory API.
///
/// Candidates are re-resolved on every top-level operation; nothing is cached
/// across calls.
#[derive(Debug, Clone)]
pub struct DirectoryClient {
    http: reqwest::Client,
    resolver: SrvResolver,
    fixed_servers: Option<Vec<String>>,
}

impl DirectoryClient {
    pub fn new(service: &str, policy: ShufflePolicy) -> Self {
        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()
            .unwrap_or_default();

        Self {
            http,
            resolver: SrvResolver::new(service, policy),
            fixed_servers: None,
        }
    }

    /// Client with a fixed replica list, bypassing SRV discovery.
    pub fn with_servers(servers: Vec<String>) -> Self {
        let mut client = Self::new(DEFAULT_DIRECTORY_SERVICE, ShufflePolicy::FullyRandom);
        client.fixed_servers = Some(servers);
        client
    }

    async fn servers(&self) -> Result<Vec<String>, DirectoryError> {
        match &self.fixed_servers {
            Some(servers) => Ok(servers.clone()),
            None => self.resolver.resolve().await,
        }
    }

    /// Fetch and decode a JSON body, trying each resolved replica in order.
    async fn fetch_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, DirectoryError> {
        let servers = self.servers().await?;
        self.fetch_json_from(&servers, path).await
    }

    /// Failover core: attempt each candidate in list order and return the
    /// first successfully decoded response.
    ///
    /// A candidate fails on network error, non-2xx status, or decode error;
    /// each failure is logged before advancing. No candidate is retried.
    pub async fn fetch_json_from<T: DeserializeOwned>(
        &self,
        servers: &[String],
        path: &str,
    ) -> Result<T, DirectoryError> {
        let mut attempts = 0;

        for server in servers {
            attempts += 1;
            let url = format!("{}{}", server, path);

            let response = match self.http.get(&url).send().await {
                Ok(r) => r,
                Err(e) => {
                    tracing::warn!("Directory server {} failed: {}", server, e);
                    continue;
                }
            };

            if !response.status().is_success() {
                tracing::warn!(
                    "Directory server {} returned HTTP {}",
                    server,
                    response.status()
                );
                continue;
            }

            match response.json::<T>().await {
                Ok(body) => return Ok(body),
                Err(e) => {
                    tracing::warn!("Directory server {} sent undecodable body: {}", server, e);
                    continue;
                }
            }
        }

        Err(DirectoryError::AllServersFailed { attempts })
    }

    /// Search stations with the given filter.
    ///
    /// Injects the minimum-bitrate floor when absent, then drops any record
    /// that is broken or below the floor regardless of what upstream sent.
    pub async fn search_stations(
        &self,
        filter: SearchFilter,
    ) -> Result<Vec<StationCard>, DirectoryError> {
        let path = format!(
            "/json/stations/search?{}",
            with_bitrate_floor(filter).to_query()
        );
        let stations: Vec<RadioStation> = self.fetch_json(&path).await?;

        Ok(stations
            .into_iter()
            .filter(keep_station)
            .map(transform_station)
            .collect())
    }

    /// Search stations by display name.
    pub async fn search_by_name(
        &self,
        name: &str,
        limit: u32,
    ) -> Result<Vec<StationCard>, DirectoryError> {
        let filter = SearchFilter {
            name: Some(name.to_string()),
            bitrate_min: Some(MIN_BITRATE),
            limit: Some(limit),
            order: Some(SortOrder::ClickCount),
            ..SearchFilter::default()
        };
        self.search_stations(filter).await
    }

    /// List countries with at least one station.
    pub async fn countries(&self) -> Result<Vec<CountryInfo>, DirectoryError> {
        let countries: Vec<CountryInfo> = self
            .fetch_json("/json/countrycodes?order=stationcount&reverse=true&limit=500")
            .await?;
        Ok(countries.into_iter().filter(|c| c.stationcount > 0).collect())
    }

    /// List the most popular tags.
    pub async fn tags(&self, limit: u32) -> Result<Vec<TagInfo>, DirectoryError> {
        let path = format!(
            "/json/tags?order=stationcount&reverse=true&limit={}&hidebroken=true",
            limit
        );
        let tags: Vec<TagInfo> = self.fetch_json(&path).await?;
        Ok(tags.into_iter().filter(|t| t.stationcount > 0).collect())
    }

    /// List the most common languages.
    pub async fn languages(&self, limit: u32) -> Result<Vec<LanguageInfo>, DirectoryError> {
        let path = format!(
            "/json/languages?order=stationcount&reverse=true&limit={}&hidebroken=true",
            limit
        );
        let languages: Vec<LanguageInfo> = self.fetch_json(&path).await?;
        Ok(languages
            .into_iter()
            .filter(|l| l.stationcount > 0)
            .collect())
    }

    /// Register a listener click for a station and fetch its playable URL.
    pub async fn track_click(&self, stationuuid: &str) -> Result<ClickResult, DirectoryError> {
        let path = format!("/json/url/{}", stationuuid);
        self.fetch_json(&path).await
    }
}

/// Apply the minimum-bitrate floor when the caller left it unset.
/// An explicit value, including one below the floor, is sent as-is.
fn with_bitrate_floor(mut filter: SearchFilter) -> SearchFilter {
    if filter.bitrate_min.is_none() {
        filter.bitrate_min = Some(MIN_BITRATE);
    }
    filter
}
