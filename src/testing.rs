//! In-memory stand-ins for the remote API and the fetch worker.

use std::cell::RefCell;
use std::collections::HashMap;

use reqwest::StatusCode;

use crate::ea::{measure::Measure, reading::Reading, station::Station, FloodApi};
use crate::error::FetchError;
use crate::worker::{Dispatch, Request};

/// Serves canned data; unknown keys answer 404.
#[derive(Debug, Default, Clone)]
pub struct FakeApi {
    stations: Option<Vec<Station>>,
    measures: HashMap<String, Vec<Measure>>,
    readings: HashMap<String, Vec<Reading>>,
}

impl FakeApi {
    pub fn with_stations(mut self, stations: Vec<Station>) -> Self {
        self.stations = Some(stations);
        self
    }

    pub fn with_measures(mut self, station_reference: &str, measures: Vec<Measure>) -> Self {
        self.measures.insert(station_reference.to_string(), measures);
        self
    }

    pub fn with_readings(mut self, key: &str, readings: Vec<Reading>) -> Self {
        self.readings.insert(key.to_string(), readings);
        self
    }
}

fn not_found<T>() -> Result<T, FetchError> {
    Err(FetchError::Status(StatusCode::NOT_FOUND))
}

impl FloodApi for FakeApi {
    fn fetch_stations(&self) -> Result<Vec<Station>, FetchError> {
        self.stations.clone().map_or_else(not_found, Ok)
    }

    fn fetch_measures(&self, station_reference: &str) -> Result<Vec<Measure>, FetchError> {
        self.measures
            .get(station_reference)
            .cloned()
            .map_or_else(not_found, Ok)
    }

    fn fetch_readings(&self, measure_id: &str) -> Result<Vec<Reading>, FetchError> {
        self.readings
            .get(measure_id)
            .cloned()
            .map_or_else(not_found, Ok)
    }

    fn fetch_station_readings(
        &self,
        station_reference: &str,
    ) -> Result<Vec<Reading>, FetchError> {
        self.fetch_readings(station_reference)
    }
}

/// Keeps every dispatched request for inspection.
#[derive(Debug, Default)]
pub struct Recorder {
    pub sent: RefCell<Vec<Request>>,
}

impl Recorder {
    pub fn take(&self) -> Vec<Request> {
        self.sent.borrow_mut().drain(..).collect()
    }
}

impl Dispatch for Recorder {
    fn dispatch(&self, request: Request) -> Result<(), FetchError> {
        self.sent.borrow_mut().push(request);
        Ok(())
    }
}
