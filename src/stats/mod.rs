//! Statistics API client.
//!
//! The API serves time series as nested JSON:
//!
//! ```text
//! {"bmx": {"series": [{"idSerie": "SF43718",
//!                      "datos": [{"fecha": "02/01/2024", "dato": "16,950.25"}]}]}}
//! ```
//!
//! Both the vendor keys above and their English forms (`series`, `id`,
//! `data`, `date`, `value`) are accepted, with or without the envelope.
//! Dates are `DD/MM/YYYY`; values are numeric strings where `N/E` marks a
//! missing observation.

use crate::config::StatisticsConfig;
use crate::error::{Result, ServiceError, TabloadError};
use chrono::NaiveDate;
use polars::prelude::*;
use reqwest::blocking::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, warn};

/// Date format used by the API, both in payloads and on the command line
pub const DATE_FORMAT: &str = "%d/%m/%Y";

/// Marker for an observation that does not exist
const MISSING_VALUE: &str = "N/E";

/// Raw HTTP response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatsResponse {
    pub status: u16,
    pub body: String,
}

/// Something that can perform a GET with one extra header
pub trait StatsTransport {
    fn get(&self, url: &str, header: (&str, &str)) -> std::result::Result<StatsResponse, ServiceError>;
}

impl<T: StatsTransport + ?Sized> StatsTransport for &T {
    fn get(&self, url: &str, header: (&str, &str)) -> std::result::Result<StatsResponse, ServiceError> {
        (**self).get(url, header)
    }
}

/// Blocking reqwest transport
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ServiceError::statistics(format!("cannot build HTTP client: {}", e)))?;
        Ok(Self { client })
    }
}

impl StatsTransport for HttpTransport {
    fn get(&self, url: &str, header: (&str, &str)) -> std::result::Result<StatsResponse, ServiceError> {
        let response = self
            .client
            .get(url)
            .header(header.0, header.1)
            .send()
            .map_err(|e| ServiceError::statistics(format!("request to {} failed: {}", url, e)))?;

        let status = response.status().as_u16();
        let body = response
            .text()
            .map_err(|e| ServiceError::statistics(format!("cannot read response body: {}", e)))?;
        Ok(StatsResponse { status, body })
    }
}

pub struct StatsClient<T> {
    transport: T,
    config: StatisticsConfig,
}

impl<T: StatsTransport> StatsClient<T> {
    pub fn new(transport: T, config: StatisticsConfig) -> Self {
        Self { transport, config }
    }

    pub fn series_url(&self, series_id: &str, start: NaiveDate, end: NaiveDate) -> String {
        format!(
            "{}/{}/datos/{}/{}",
            self.config.base_url.trim_end_matches('/'),
            series_id,
            start.format("%Y-%m-%d"),
            end.format("%Y-%m-%d")
        )
    }

    /// Observations of `series_id` between `start` and `end`, inclusive.
    ///
    /// A response other than 200 is logged and yields `Ok(None)`.
    pub fn fetch_series(
        &self,
        series_id: &str,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<Option<DataFrame>> {
        if start > end {
            return Err(TabloadError::configuration(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        let token = self.config.token.as_deref().ok_or_else(|| {
            TabloadError::configuration("no statistics API token configured")
        })?;

        let url = self.series_url(series_id, start, end);
        debug!("Fetching series {} from {}", series_id, url);
        let response = self
            .transport
            .get(&url, (self.config.token_header.as_str(), token))?;

        if response.status != 200 {
            warn!(
                "Statistics API returned status {} for series {}",
                response.status, series_id
            );
            return Ok(None);
        }

        parse_payload(&response.body, Some(series_id)).map(Some)
    }
}

/// Parse a `DD/MM/YYYY` date
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(text.trim(), DATE_FORMAT).map_err(|e| {
        TabloadError::parse("date", format!("'{}' is not a DD/MM/YYYY date: {}", text, e))
    })
}

/// Flatten a series payload into `series_id`, `date` and `value` columns
pub fn parse_series_payload(body: &str) -> Result<DataFrame> {
    parse_payload(body, None)
}

#[derive(Debug, Deserialize)]
struct SeriesSet {
    #[serde(default)]
    series: Vec<RawSeries>,
}

#[derive(Debug, Deserialize)]
struct RawSeries {
    #[serde(default, alias = "idSerie")]
    id: Option<String>,
    #[serde(default, alias = "datos")]
    data: Vec<RawPoint>,
}

#[derive(Debug, Deserialize)]
struct RawPoint {
    #[serde(alias = "fecha")]
    date: String,
    #[serde(alias = "dato")]
    value: Value,
}

fn parse_payload(body: &str, default_id: Option<&str>) -> Result<DataFrame> {
    let root: Value = serde_json::from_str(body)?;
    let set: SeriesSet = serde_json::from_value(unwrap_envelope(root)?)?;

    let mut ids: Vec<Option<String>> = Vec::new();
    let mut dates: Vec<NaiveDate> = Vec::new();
    let mut values: Vec<Option<f64>> = Vec::new();

    for series in set.series {
        let id = series.id.or_else(|| default_id.map(str::to_string));
        for point in series.data {
            ids.push(id.clone());
            dates.push(parse_date(&point.date)?);
            values.push(parse_value(&point.value)?);
        }
    }
    debug!("Parsed {} observations", values.len());

    let frame = DataFrame::new(vec![
        Series::new("series_id".into(), ids).into_column(),
        Series::new("date".into(), dates).into_column(),
        Series::new("value".into(), values).into_column(),
    ])?;
    Ok(frame)
}

/// The object holding `series`, looking one level into an envelope
fn unwrap_envelope(root: Value) -> Result<Value> {
    match root {
        Value::Object(map) if map.contains_key("series") => Ok(Value::Object(map)),
        Value::Object(map) => map
            .into_iter()
            .map(|(_, inner)| inner)
            .find(|inner| inner.get("series").is_some())
            .ok_or_else(|| TabloadError::parse("series payload", "no 'series' list found")),
        _ => Err(TabloadError::parse("series payload", "expected a JSON object")),
    }
}

fn parse_value(value: &Value) -> Result<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Number(n) => Ok(n.as_f64()),
        Value::String(text) => {
            let text = text.trim();
            if text.is_empty() || text.eq_ignore_ascii_case(MISSING_VALUE) {
                return Ok(None);
            }
            text.replace(',', "")
                .parse::<f64>()
                .map(Some)
                .map_err(|_| TabloadError::parse("series payload", format!("invalid value '{}'", text)))
        }
        other => Err(TabloadError::parse(
            "series payload",
            format!("invalid value {}", other),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    const BANXICO_BODY: &str = r#"{
        "bmx": {
            "series": [{
                "idSerie": "SF43718",
                "titulo": "Tipo de cambio",
                "datos": [
                    {"fecha": "02/01/2024", "dato": "16,950.25"},
                    {"fecha": "03/01/2024", "dato": "N/E"},
                    {"fecha": "04/01/2024", "dato": "17.01"}
                ]
            }]
        }
    }"#;

    struct FakeTransport {
        response: std::result::Result<StatsResponse, ServiceError>,
        requests: RefCell<Vec<(String, String, String)>>,
    }

    impl FakeTransport {
        fn replying(status: u16, body: &str) -> Self {
            Self {
                response: Ok(StatsResponse {
                    status,
                    body: body.to_string(),
                }),
                requests: RefCell::new(Vec::new()),
            }
        }
    }

    impl StatsTransport for FakeTransport {
        fn get(&self, url: &str, header: (&str, &str)) -> std::result::Result<StatsResponse, ServiceError> {
            self.requests
                .borrow_mut()
                .push((url.to_string(), header.0.to_string(), header.1.to_string()));
            self.response.clone()
        }
    }

    fn config() -> StatisticsConfig {
        StatisticsConfig {
            base_url: "https://stats.example/series/".to_string(),
            token: Some("secret".to_string()),
            ..StatisticsConfig::default()
        }
    }

    fn ymd(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_parse_vendor_payload() {
        let df = parse_series_payload(BANXICO_BODY).unwrap();
        assert_eq!(df.shape(), (3, 3));
        assert_eq!(df.column("date").unwrap().dtype(), &DataType::Date);

        let values: Vec<Option<f64>> = df
            .column("value")
            .unwrap()
            .as_materialized_series()
            .f64()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(values, vec![Some(16950.25), None, Some(17.01)]);

        let expected = Series::new(
            "date".into(),
            vec![ymd(2024, 1, 2), ymd(2024, 1, 3), ymd(2024, 1, 4)],
        );
        assert!(df
            .column("date")
            .unwrap()
            .as_materialized_series()
            .equals(&expected));
    }

    #[test]
    fn test_parse_bare_english_payload() {
        let body = r#"{"series": [{"data": [{"date": "31/12/2023", "value": 1.5}]}]}"#;
        let df = parse_series_payload(body).unwrap();
        assert_eq!(df.height(), 1);
        assert_eq!(df.column("series_id").unwrap().null_count(), 1);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_series_payload("not json").is_err());
        assert!(parse_series_payload(r#"{"other": {}}"#).is_err());

        let bad_date = r#"{"series": [{"data": [{"date": "2024-01-02", "value": "1"}]}]}"#;
        match parse_series_payload(bad_date).unwrap_err() {
            TabloadError::Parse { .. } => {}
            _ => panic!("Expected Parse error"),
        }

        let bad_value = r#"{"series": [{"data": [{"date": "02/01/2024", "value": "abc"}]}]}"#;
        assert!(parse_series_payload(bad_value).is_err());
    }

    #[test]
    fn test_empty_series_yields_empty_frame() {
        let df = parse_series_payload(r#"{"bmx": {"series": [{"idSerie": "X"}]}}"#).unwrap();
        assert_eq!(df.shape(), (0, 3));
    }

    #[test]
    fn test_fetch_series_sends_token_and_fills_id() {
        let body = r#"{"series": [{"data": [{"date": "02/01/2024", "value": "2"}]}]}"#;
        let transport = FakeTransport::replying(200, body);
        let client = StatsClient::new(&transport, config());

        let df = client
            .fetch_series("SF1", ymd(2024, 1, 1), ymd(2024, 1, 31))
            .unwrap()
            .unwrap();

        let ids: Vec<Option<&str>> = df
            .column("series_id")
            .unwrap()
            .as_materialized_series()
            .str()
            .unwrap()
            .into_iter()
            .collect();
        assert_eq!(ids, vec![Some("SF1")]);

        let requests = transport.requests.borrow();
        assert_eq!(
            requests[0],
            (
                "https://stats.example/series/SF1/datos/2024-01-01/2024-01-31".to_string(),
                "Bmx-Token".to_string(),
                "secret".to_string()
            )
        );
    }

    #[test]
    fn test_non_200_yields_none() {
        let transport = FakeTransport::replying(401, "unauthorized");
        let client = StatsClient::new(&transport, config());
        let result = client
            .fetch_series("SF1", ymd(2024, 1, 1), ymd(2024, 1, 2))
            .unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn test_fetch_preconditions() {
        let transport = FakeTransport::replying(200, "{}");
        let no_token = StatsClient::new(
            &transport,
            StatisticsConfig {
                token: None,
                ..config()
            },
        );
        assert!(no_token
            .fetch_series("SF1", ymd(2024, 1, 1), ymd(2024, 1, 2))
            .is_err());

        let client = StatsClient::new(&transport, config());
        assert!(client
            .fetch_series("SF1", ymd(2024, 2, 1), ymd(2024, 1, 1))
            .is_err());
        assert!(transport.requests.borrow().is_empty());
    }

    #[test]
    fn test_transport_failure_is_service_error() {
        let transport = FakeTransport {
            response: Err(ServiceError::statistics("connection refused")),
            requests: RefCell::new(Vec::new()),
        };
        let client = StatsClient::new(&transport, config());
        match client
            .fetch_series("SF1", ymd(2024, 1, 1), ymd(2024, 1, 2))
            .unwrap_err()
        {
            TabloadError::Service(e) => assert_eq!(e.service, "statistics"),
            _ => panic!("Expected Service error"),
        }
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("15/03/2024").unwrap(), ymd(2024, 3, 15));
        assert!(parse_date("2024-03-15").is_err());
    }
}
