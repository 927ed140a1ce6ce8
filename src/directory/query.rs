//! Search filter and wire-query building.

use serde::{Deserialize, Serialize};
use url::form_urlencoded;

/// Sort orders accepted by the directory search endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    ClickCount,
    Votes,
    Bitrate,
    Name,
    Random,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortOrder::ClickCount => "clickcount",
            SortOrder::Votes => "votes",
            SortOrder::Bitrate => "bitrate",
            SortOrder::Name => "name",
            SortOrder::Random => "random",
        }
    }
}

/// Optional search criteria for the station search endpoint.
///
/// Field names mirror the wire parameters so the filter can be deserialized
/// straight from an incoming query string.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SearchFilter {
    pub name: Option<String>,
    pub tag: Option<String>,
    pub tag_exact: Option<bool>,
    pub countrycode: Option<String>,
    pub language: Option<String>,
    pub codec: Option<String>,
    pub bitrate_min: Option<u32>,
    pub bitrate_max: Option<u32>,
    pub order: Option<SortOrder>,
    pub reverse: Option<bool>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
    pub hidebroken: Option<bool>,
}

impl SearchFilter {
    /// Serialize the filter to a URL query string.
    ///
    /// Only present fields are written; booleans become the literal strings
    /// "true"/"false". Defaults are injected for order (clickcount), reverse
    /// (true unless explicitly false), limit (100), offset (0), and
    /// hidebroken (true unless explicitly false).
    pub fn to_query(&self) -> String {
        let mut params = form_urlencoded::Serializer::new(String::new());

        if let Some(name) = &self.name {
            params.append_pair("name", name);
        }
        if let Some(tag) = &self.tag {
            params.append_pair("tag", tag);
        }
        if self.tag_exact == Some(true) {
            params.append_pair("tagExact", "true");
        }
        if let Some(countrycode) = &self.countrycode {
            params.append_pair("countrycode", countrycode);
        }
        if let Some(language) = &self.language {
            params.append_pair("language", language);
        }
        if let Some(codec) = &self.codec {
            params.append_pair("codec", codec);
        }
        if let Some(min) = self.bitrate_min {
            params.append_pair("bitrateMin", &min.to_string());
        }
        if let Some(max) = self.bitrate_max {
            params.append_pair("bitrateMax", &max.to_string());
        }

        params.append_pair("order", self.order.unwrap_or(SortOrder::ClickCount).as_str());
        params.append_pair("reverse", bool_str(self.reverse != Some(false)));
        params.append_pair("limit", &self.limit.unwrap_or(100).to_string());
        params.append_pair("offset", &self.offset.unwrap_or(0).to_string());
        params.append_pair("hidebroken", bool_str(self.hidebroken != Some(false)));

        params.finish()
    }
}

fn bool_str(value: bool) -> &'static str {
    if value {
        "true"
    } else {
        "false"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn parse(query: &str) -> HashMap<String, String> {
        form_urlencoded::parse(query.as_bytes())
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect()
    }

    #[test]
    fn test_defaults_injected() {
        let query = SearchFilter::default().to_query();
        let parsed = parse(&query);
        assert_eq!(parsed["order"], "clickcount");
        assert_eq!(parsed["reverse"], "true");
        assert_eq!(parsed["limit"], "100");
        assert_eq!(parsed["offset"], "0");
        assert_eq!(parsed["hidebroken"], "true");
        assert_eq!(parsed.len(), 5);
    }

    #[test]
    fn test_explicit_false_flags() {
        let filter = SearchFilter {
            reverse: Some(false),
            hidebroken: Some(false),
            ..SearchFilter::default()
        };
        let parsed = parse(&filter.to_query());
        assert_eq!(parsed["reverse"], "false");
        assert_eq!(parsed["hidebroken"], "false");
    }

    #[test]
    fn test_roundtrip_present_fields() {
        let filter = SearchFilter {
            tag: Some("jazz".to_string()),
            tag_exact: Some(true),
            countrycode: Some("DE".to_string()),
            language: Some("german".to_string()),
            codec: Some("MP3".to_string()),
            bitrate_min: Some(128),
            bitrate_max: Some(320),
            order: Some(SortOrder::Votes),
            reverse: Some(true),
            limit: Some(25),
            offset: Some(50),
            hidebroken: Some(true),
            ..SearchFilter::default()
        };
        let parsed = parse(&filter.to_query());
        assert_eq!(parsed["tag"], "jazz");
        assert_eq!(parsed["tagExact"], "true");
        assert_eq!(parsed["countrycode"], "DE");
        assert_eq!(parsed["language"], "german");
        assert_eq!(parsed["codec"], "MP3");
        assert_eq!(parsed["bitrateMin"], "128");
        assert_eq!(parsed["bitrateMax"], "320");
        assert_eq!(parsed["order"], "votes");
        assert_eq!(parsed["reverse"], "true");
        assert_eq!(parsed["limit"], "25");
        assert_eq!(parsed["offset"], "50");
        assert_eq!(parsed["hidebroken"], "true");
    }

    #[test]
    fn test_tag_exact_false_omitted() {
        let filter = SearchFilter {
            tag_exact: Some(false),
            ..SearchFilter::default()
        };
        let parsed = parse(&filter.to_query());
        assert!(!parsed.contains_key("tagExact"));
    }

    #[test]
    fn test_name_encoded() {
        let filter = SearchFilter {
            name: Some("drum & bass".to_string()),
            ..SearchFilter::default()
        };
        let query = filter.to_query();
        assert!(query.contains("name=drum+%26+bass"));
    }
}
