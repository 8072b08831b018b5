//! Environment Agency flood-monitoring API client.
//!
//! Read-only access to three resources under the flood-monitoring base URL:
//!
//!   /id/stations                          station list (`_limit`)
//!   /id/stations/{ref}/measures           measures at a station
//!   /id/measures/{id}/readings            readings for one measure
//!   /id/stations/{ref}/readings           readings for every measure at a station
//!
//! Every response wraps its payload in an envelope whose `items` array is the
//! only part consumed here.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use reqwest::blocking::{Client, Request};
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer};

use crate::error::FetchError;

pub const DEFAULT_BASE_URL: &str = "https://environment.data.gov.uk/flood-monitoring";
pub const DEFAULT_STATION_LIMIT: u32 = 1000;
const USER_AGENT: &str = "floodwatch";

/// Hours covered by a readings request, ending at the moment of the request.
pub const READINGS_WINDOW_HOURS: i64 = 24;

#[derive(Deserialize, Debug)]
struct Envelope<T> {
    items: Vec<T>,
}

/// A handful of stations publish some fields as arrays instead of scalars.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(v) => vec![v],
            OneOrMany::Many(vs) => vs,
        }
    }
}

fn joined_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(OneOrMany::<String>::deserialize(deserializer)?
        .into_vec()
        .join(" / "))
}

fn optional_joined_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let text = Option::<OneOrMany<String>>::deserialize(deserializer)?
        .map(|v| v.into_vec().join(" / "));
    Ok(text.filter(|s| !s.is_empty()))
}

fn optional_first_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<OneOrMany<f64>>::deserialize(deserializer)?
        .and_then(|v| v.into_vec().into_iter().next()))
}

fn first_number<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    OneOrMany::<f64>::deserialize(deserializer)?
        .into_vec()
        .into_iter()
        .next()
        .ok_or_else(|| serde::de::Error::custom("empty value array"))
}

pub mod station {
    use super::*;

    #[derive(Deserialize, Debug, Clone, PartialEq)]
    pub struct Station {
        #[serde(rename = "@id", default)]
        pub id: String,

        #[serde(rename = "stationReference")]
        pub station_reference: String,

        #[serde(deserialize_with = "joined_text")]
        pub label: String,

        #[serde(rename = "riverName", default, deserialize_with = "optional_joined_text")]
        pub river_name: Option<String>,

        #[serde(default, deserialize_with = "optional_joined_text")]
        pub town: Option<String>,

        #[serde(rename = "catchmentName", default, deserialize_with = "optional_joined_text")]
        pub catchment_name: Option<String>,

        #[serde(default, deserialize_with = "optional_first_number")]
        pub lat: Option<f64>,

        #[serde(default, deserialize_with = "optional_first_number")]
        pub long: Option<f64>,

        #[serde(rename = "dateOpened", default, deserialize_with = "optional_joined_text")]
        pub date_opened: Option<String>,

        #[serde(default, deserialize_with = "optional_first_number")]
        pub easting: Option<f64>,

        #[serde(default, deserialize_with = "optional_first_number")]
        pub northing: Option<f64>,

        #[serde(rename = "gridReference", default, deserialize_with = "optional_joined_text")]
        pub grid_reference: Option<String>,

        #[serde(default, deserialize_with = "optional_joined_text")]
        pub notation: Option<String>,

        #[serde(rename = "RLOIid", default, deserialize_with = "optional_joined_text")]
        pub rloi_id: Option<String>,

        #[serde(rename = "wiskiID", default, deserialize_with = "optional_joined_text")]
        pub wiski_id: Option<String>,

        #[serde(default, deserialize_with = "optional_joined_text")]
        pub status: Option<String>,

        #[serde(rename = "stageScale", default)]
        pub stage_scale: Option<StageScaleRef>,
    }

    impl Station {
        /// Case-insensitive substring match on label, river, or town.
        /// `needle` must already be lowercase.
        pub fn matches(&self, needle: &str) -> bool {
            if needle.is_empty() {
                return true;
            }
            [Some(&self.label), self.river_name.as_ref(), self.town.as_ref()]
                .into_iter()
                .flatten()
                .any(|field| field.to_lowercase().contains(needle))
        }
    }

    /// The station list links to the stage scale; the single-station
    /// resource embeds it.
    #[derive(Deserialize, Debug, Clone, PartialEq)]
    #[serde(untagged)]
    pub enum StageScaleRef {
        Link(String),
        Inline(StageScale),
    }

    #[derive(Deserialize, Debug, Clone, PartialEq)]
    pub struct StageScale {
        #[serde(rename = "@id", default)]
        pub id: String,

        #[serde(default)]
        pub datum: Option<f64>,

        #[serde(rename = "highestRecent", default)]
        pub highest_recent: Option<serde_json::Value>,

        #[serde(rename = "maxOnRecord", default)]
        pub max_on_record: Option<serde_json::Value>,

        #[serde(rename = "minOnRecord", default)]
        pub min_on_record: Option<serde_json::Value>,

        #[serde(rename = "scaleMax", default)]
        pub scale_max: Option<f64>,

        #[serde(rename = "typicalRangeHigh", default)]
        pub typical_range_high: Option<f64>,

        #[serde(rename = "typicalRangeLow", default)]
        pub typical_range_low: Option<f64>,
    }
}

pub mod measure {
    use super::*;

    #[derive(Deserialize, Debug, Clone, PartialEq)]
    pub struct Measure {
        #[serde(rename = "@id")]
        pub id: String,

        #[serde(default)]
        pub parameter: Option<String>,

        #[serde(rename = "parameterName")]
        pub parameter_name: String,

        #[serde(default)]
        pub period: Option<u32>,

        #[serde(default)]
        pub qualifier: Option<String>,

        #[serde(rename = "unitName", default)]
        pub unit_name: String,

        #[serde(rename = "valueType", default)]
        pub value_type: Option<String>,

        #[serde(rename = "latestReading", default)]
        pub latest_reading: Option<LatestReading>,

        #[serde(default)]
        pub notation: Option<String>,

        #[serde(default)]
        pub station: Option<String>,

        #[serde(rename = "stationReference", default)]
        pub station_reference: Option<String>,
    }

    impl Measure {
        /// Identifier used in the readings path: the last segment of `@id`.
        pub fn measure_id(&self) -> Result<&str, FetchError> {
            match self.id.rsplit('/').next() {
                Some(id) if !id.is_empty() => Ok(id),
                _ => Err(FetchError::InvalidMeasureId(self.id.clone())),
            }
        }

        /// Option text inside a parameter group.
        pub fn label(&self) -> String {
            let name = self.qualifier.as_deref().unwrap_or(&self.parameter_name);
            if self.unit_name.is_empty() {
                name.to_string()
            } else {
                format!("{name} ({})", self.unit_name)
            }
        }

        pub fn latest(&self) -> Option<&super::reading::Reading> {
            match self.latest_reading {
                Some(LatestReading::Inline(ref r)) => Some(r),
                _ => None,
            }
        }
    }

    #[derive(Deserialize, Debug, Clone, PartialEq)]
    #[serde(untagged)]
    pub enum LatestReading {
        Inline(super::reading::Reading),
        Link(String),
    }
}

pub mod reading {
    use super::*;

    #[derive(Deserialize, Debug, Clone, PartialEq)]
    pub struct Reading {
        #[serde(rename = "@id", default)]
        pub id: String,

        #[serde(rename = "dateTime")]
        pub date_time: DateTime<Utc>,

        #[serde(deserialize_with = "first_number")]
        pub value: f64,

        #[serde(default)]
        pub date: String,

        #[serde(default)]
        pub measure: String,
    }
}

use measure::Measure;
use reading::Reading;
use station::Station;

/// Start of the trailing readings window ending at `now`.
pub fn window_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now - Duration::hours(READINGS_WINDOW_HOURS)
}

/// `since` query value: RFC 3339, UTC, millisecond precision.
pub fn since_param(since: DateTime<Utc>) -> String {
    since.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Decodes the `items` array of a response body.
pub fn decode_items<T: DeserializeOwned>(body: &str) -> serde_json::Result<Vec<T>> {
    serde_json::from_str::<Envelope<T>>(body).map(|e| e.items)
}

/// The operations the rest of the program needs from the remote API.
///
/// Every call is a fresh round trip: no caching, no retries.
pub trait FloodApi {
    fn fetch_stations(&self) -> Result<Vec<Station>, FetchError>;

    fn fetch_measures(&self, station_reference: &str) -> Result<Vec<Measure>, FetchError>;

    /// Readings for one measure over the trailing window, oldest first.
    fn fetch_readings(&self, measure_id: &str) -> Result<Vec<Reading>, FetchError>;

    /// Readings for every measure at a station over the trailing window.
    fn fetch_station_readings(&self, station_reference: &str)
        -> Result<Vec<Reading>, FetchError>;
}

pub struct EaClient {
    client: Client,
    base_url: String,
    station_limit: u32,
}

impl EaClient {
    pub fn new(base_url: &str, station_limit: u32) -> Result<Self, FetchError> {
        let client = Client::builder().user_agent(USER_AGENT).build()?;
        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            station_limit,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn request(&self, path: &str, query: &[(&str, String)]) -> Result<Request, FetchError> {
        let url = format!("{}{path}", self.base_url);
        Ok(self.client.get(url).query(query).build()?)
    }

    fn stations_request(&self) -> Result<Request, FetchError> {
        self.request("/id/stations", &[("_limit", self.station_limit.to_string())])
    }

    fn measures_request(&self, station_reference: &str) -> Result<Request, FetchError> {
        self.request(&format!("/id/stations/{station_reference}/measures"), &[])
    }

    fn readings_request(&self, measure_id: &str, now: DateTime<Utc>) -> Result<Request, FetchError> {
        self.request(
            &format!("/id/measures/{measure_id}/readings"),
            &window_query(now),
        )
    }

    fn station_readings_request(
        &self,
        station_reference: &str,
        now: DateTime<Utc>,
    ) -> Result<Request, FetchError> {
        self.request(
            &format!("/id/stations/{station_reference}/readings"),
            &window_query(now),
        )
    }

    fn get_items<T: DeserializeOwned>(&self, request: Request) -> Result<Vec<T>, FetchError> {
        log::debug!("GET {}", request.url());
        let response = self.client.execute(request)?;
        check_status(response.status())?;
        let envelope: Envelope<T> = response.json()?;
        Ok(envelope.items)
    }
}

fn window_query(now: DateTime<Utc>) -> Vec<(&'static str, String)> {
    vec![
        ("since", since_param(window_start(now))),
        ("_sorted", "true".to_string()),
    ]
}

/// Anything outside 2xx is a failure, whatever the body says.
fn check_status(status: StatusCode) -> Result<(), FetchError> {
    if status.is_success() {
        Ok(())
    } else {
        Err(FetchError::Status(status))
    }
}

impl FloodApi for EaClient {
    fn fetch_stations(&self) -> Result<Vec<Station>, FetchError> {
        self.get_items(self.stations_request()?)
    }

    fn fetch_measures(&self, station_reference: &str) -> Result<Vec<Measure>, FetchError> {
        self.get_items(self.measures_request(station_reference)?)
    }

    fn fetch_readings(&self, measure_id: &str) -> Result<Vec<Reading>, FetchError> {
        self.get_items(self.readings_request(measure_id, Utc::now())?)
    }

    fn fetch_station_readings(
        &self,
        station_reference: &str,
    ) -> Result<Vec<Reading>, FetchError> {
        self.get_items(self.station_readings_request(station_reference, Utc::now())?)
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    pub const STATIONS: &str = r#"{
      "@context": "http://environment.data.gov.uk/flood-monitoring/meta/context.jsonld",
      "meta": { "publisher": "Environment Agency", "limit": 1000, "hasFormat": [] },
      "items": [
        {
          "@id": "http://environment.data.gov.uk/flood-monitoring/id/stations/1029TH",
          "RLOIid": "7041",
          "catchmentName": "Cotswolds",
          "dateOpened": "1994-01-01",
          "easting": 417990,
          "label": "Bourton Dickler",
          "lat": 51.874767,
          "long": -1.740083,
          "northing": 219610,
          "notation": "1029TH",
          "riverName": "River Dikler",
          "stageScale": "http://environment.data.gov.uk/flood-monitoring/id/stations/1029TH/stageScale",
          "stationReference": "1029TH",
          "status": "http://environment.data.gov.uk/flood-monitoring/def/core/statusActive",
          "town": "Little Rissington",
          "wiskiID": "1029TH"
        },
        {
          "@id": "http://environment.data.gov.uk/flood-monitoring/id/stations/E2043",
          "label": ["Surfleet Sluice", "Surfleet"],
          "lat": [52.845991, 52.84599],
          "long": -0.100848,
          "stationReference": "E2043"
        }
      ]
    }"#;

    pub const MEASURES: &str = r#"{
      "meta": {},
      "items": [
        {
          "@id": "http://environment.data.gov.uk/flood-monitoring/id/measures/1029TH-level-stage-i-15_min-mASD",
          "label": "Bourton Dickler - level-stage-i-15_min-mASD",
          "latestReading": {
            "@id": "http://environment.data.gov.uk/flood-monitoring/data/readings/1029TH-level-stage-i-15_min-mASD/2024-03-01T10-00-00Z",
            "date": "2024-03-01",
            "dateTime": "2024-03-01T10:00:00Z",
            "measure": "http://environment.data.gov.uk/flood-monitoring/id/measures/1029TH-level-stage-i-15_min-mASD",
            "value": 0.153
          },
          "notation": "1029TH-level-stage-i-15_min-mASD",
          "parameter": "level",
          "parameterName": "Water Level",
          "period": 900,
          "qualifier": "Stage",
          "station": "http://environment.data.gov.uk/flood-monitoring/id/stations/1029TH",
          "stationReference": "1029TH",
          "unit": "http://qudt.org/1.1/vocab/unit#Meter",
          "unitName": "mASD",
          "valueType": "instantaneous"
        },
        {
          "@id": "http://environment.data.gov.uk/flood-monitoring/id/measures/1029TH-flow--i-15_min-m3_s",
          "parameterName": "Flow",
          "unitName": "m3/s",
          "latestReading": "http://environment.data.gov.uk/flood-monitoring/data/readings/1029TH-flow--i-15_min-m3_s/latest"
        }
      ]
    }"#;

    pub const READINGS: &str = r#"{
      "items": [
        { "@id": "r/2", "dateTime": "2024-03-01T10:15:00Z", "value": 0.155, "date": "2024-03-01", "measure": "m" },
        { "@id": "r/1", "dateTime": "2024-03-01T10:00:00Z", "value": 0.153, "date": "2024-03-01", "measure": "m" },
        { "@id": "r/3", "dateTime": "2024-03-01T10:30:00Z", "value": [0.160, 0.161], "date": "2024-03-01", "measure": "m" }
      ]
    }"#;
}
