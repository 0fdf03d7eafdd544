//! Requests to the backend detail service.
//!
//! The backend answers `GET /details?lat=<lat>&lon=<lon>` with `{"state_1km_mean": <number>}`
//! and `GET /details?polygon_id=<id>` with `{"wikiUrl": <string>, "timeSeries": [[<ms>, <value>], ...]}`.
//! Either may instead answer `{"error": <string>}`.

use log::debug;
use poll_promise::Promise;
use serde::Deserialize;
use serde_json::Value as JsonValue;
use thiserror::Error;

use super::{DetailQuery, DetailResult};
use crate::CLIENT;
use crate::chart::TimePoint;

/// Errors that can occur while requesting details from the backend.
#[derive(Error, Debug)]
pub enum ClientError {
    /// An error occurred while making a web request.
    #[error("Connection error")]
    Connection(#[from] reqwest::Error),

    /// The backend answered with an unsuccessful status.
    #[error("Detail request failed. HTTP Status: `{0}`")]
    Status(String),

    /// The request URL could not be built.
    #[error("Invalid detail request URL: {0}")]
    InvalidUrl(String),

    /// The response body is not what the backend is expected to send.
    #[error("Unable to decode the detail response")]
    Decode(#[from] serde_json::Error),
}

/// A backend that answers detail queries.
pub trait DetailService {
    /// Starts a request. The promise resolves once the backend responds or the request fails.
    fn fetch(&self, query: &DetailQuery) -> Promise<Result<DetailResult, ClientError>>;
}

#[derive(Deserialize)]
struct PointDetails {
    state_1km_mean: Option<f64>,
    error: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RegionDetails {
    title: Option<String>,
    wiki_url: Option<String>,
    #[serde(default)]
    time_series: Vec<(JsonValue, Option<f64>)>,
    error: Option<String>,
}

/// Reads a timestamp given either as a number or as a numeric string.
fn timestamp_millis(value: &JsonValue) -> Option<i64> {
    match value {
        JsonValue::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        JsonValue::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

/// Decodes the response body of a detail request.
pub fn parse_details(query: &DetailQuery, body: &[u8]) -> Result<DetailResult, ClientError> {
    match query {
        DetailQuery::Point { .. } => {
            let details: PointDetails = serde_json::from_slice(body)?;
            Ok(match details.error {
                Some(message) => DetailResult::Failure { message },
                None => DetailResult::Success {
                    title: None,
                    external_link: None,
                    time_series: Vec::new(),
                    mean: details.state_1km_mean,
                },
            })
        }
        DetailQuery::Region { .. } => {
            let details: RegionDetails = serde_json::from_slice(body)?;
            if let Some(message) = details.error {
                return Ok(DetailResult::Failure { message });
            }

            let time_series = details
                .time_series
                .iter()
                .filter_map(|(timestamp, value)| {
                    let point = timestamp_millis(timestamp)
                        .zip(*value)
                        .and_then(|(ms, value)| TimePoint::from_millis(ms, value));
                    if point.is_none() {
                        debug!("Skipping time series entry [{}, {:?}]", timestamp, value);
                    }
                    point
                })
                .collect();

            Ok(DetailResult::Success {
                title: details.title,
                external_link: details.wiki_url,
                time_series,
                mean: None,
            })
        }
    }
}

/// Requests details from the cloud frequency backend over HTTP.
///
/// Every request runs on its own thread. There is no cancellation; a superseded request runs to
/// completion and its response is dropped by the caller.
#[derive(Clone, Debug)]
pub struct HttpDetailService {
    base_url: String,
}

impl HttpDetailService {
    /// Creates a service for the backend at `base_url`, e.g. `http://localhost:8080/`.
    pub fn new(base_url: impl Into<String>) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { base_url }
    }

    /// The URL a query is sent to.
    pub fn details_url(&self, query: &DetailQuery) -> Result<String, ClientError> {
        let endpoint = format!("{}details", self.base_url);
        let url = match query {
            DetailQuery::Point { lat, lon } => reqwest::Url::parse_with_params(
                &endpoint,
                &[("lat", lat.to_string()), ("lon", lon.to_string())],
            ),
            DetailQuery::Region { region_id } => {
                reqwest::Url::parse_with_params(&endpoint, &[("polygon_id", region_id)])
            }
        };
        url.map(String::from)
            .map_err(|e| ClientError::InvalidUrl(e.to_string()))
    }
}

impl DetailService for HttpDetailService {
    fn fetch(&self, query: &DetailQuery) -> Promise<Result<DetailResult, ClientError>> {
        let url = match self.details_url(query) {
            Ok(url) => url,
            Err(e) => return Promise::from_ready(Err(e)),
        };
        let query = query.clone();

        debug!("Requesting details from {}", &url);
        Promise::spawn_thread("fetch_details", move || -> Result<_, ClientError> {
            let response = CLIENT.get(&url).send()?;
            if !response.status().is_success() {
                return Err(ClientError::Status(response.status().to_string()));
            }
            let body = response.bytes()?;
            parse_details(&query, &body)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region() -> DetailQuery {
        DetailQuery::Region {
            region_id: "poland".to_string(),
        }
    }

    fn point() -> DetailQuery {
        DetailQuery::Point {
            lat: 10.0,
            lon: 20.0,
        }
    }

    #[test]
    fn point_query_url() {
        let service = HttpDetailService::new("http://localhost:8080");
        assert_eq!(
            service.details_url(&point()).unwrap(),
            "http://localhost:8080/details?lat=10&lon=20"
        );

        let precise = DetailQuery::Point {
            lat: 52.2297,
            lon: -21.0122,
        };
        assert_eq!(
            service.details_url(&precise).unwrap(),
            "http://localhost:8080/details?lat=52.2297&lon=-21.0122"
        );
    }

    #[test]
    fn region_query_url() {
        let service = HttpDetailService::new("http://localhost:8080/");
        assert_eq!(
            service.details_url(&region()).unwrap(),
            "http://localhost:8080/details?polygon_id=poland"
        );

        let spaced = DetailQuery::Region {
            region_id: "south sudan".to_string(),
        };
        assert_eq!(
            service.details_url(&spaced).unwrap(),
            "http://localhost:8080/details?polygon_id=south+sudan"
        );
    }

    #[test]
    fn invalid_base_url_is_reported() {
        let service = HttpDetailService::new("not a url");
        assert!(matches!(
            service.details_url(&point()),
            Err(ClientError::InvalidUrl(_))
        ));
    }

    #[test]
    fn parses_region_success() {
        let body = br#"{"wikiUrl": "http://x", "timeSeries": [[1000, 10], [2000, 20]]}"#;
        let result = parse_details(&region(), body).unwrap();

        assert_eq!(
            result,
            DetailResult::Success {
                title: None,
                external_link: Some("http://x".to_string()),
                time_series: vec![
                    TimePoint::from_millis(1000, 10.0).unwrap(),
                    TimePoint::from_millis(2000, 20.0).unwrap(),
                ],
                mean: None,
            }
        );
    }

    #[test]
    fn parses_region_error() {
        let result = parse_details(&region(), br#"{"error": "no data"}"#).unwrap();
        assert_eq!(
            result,
            DetailResult::Failure {
                message: "no data".to_string()
            }
        );

        // An error wins over partial data.
        let result =
            parse_details(&region(), br#"{"wikiUrl": "http://x", "error": "quota"}"#).unwrap();
        assert!(matches!(result, DetailResult::Failure { message } if message == "quota"));
    }

    #[test]
    fn region_series_tolerates_string_timestamps_and_nulls() {
        let body = br#"{"wikiUrl": "http://x", "timeSeries": [["1000", 1.5], [2000, null], [3000.0, 3]]}"#;
        let result = parse_details(&region(), body).unwrap();

        let DetailResult::Success { time_series, .. } = result else {
            panic!("expected a success");
        };
        let millis: Vec<_> = time_series
            .iter()
            .map(|p| (p.timestamp.timestamp_millis(), p.value))
            .collect();
        assert_eq!(millis, vec![(1000, 1.5), (3000, 3.0)]);
    }

    #[test]
    fn parses_point_value() {
        let result = parse_details(&point(), br#"{"state_1km_mean": 42.6}"#).unwrap();
        assert!(matches!(result, DetailResult::Success { mean: Some(m), .. } if m == 42.6));

        let result = parse_details(&point(), br#"{"state_1km_mean": null}"#).unwrap();
        assert!(matches!(result, DetailResult::Success { mean: None, .. }));

        let result = parse_details(&point(), br#"{"error": "Image.reduceRegion failed"}"#).unwrap();
        assert!(matches!(result, DetailResult::Failure { .. }));
    }

    #[test]
    fn malformed_body_is_a_decode_error() {
        assert!(matches!(
            parse_details(&region(), b"<html>oops</html>"),
            Err(ClientError::Decode(_))
        ));
    }
}
