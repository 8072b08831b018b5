use crate::ea::{station::Station, FloodApi};
use crate::error::FetchError;

/// Matches listed at once; the rest are counted but not shown.
pub const MAX_SHOWN: usize = 100;

/// All stations, fetched once and held in label order.
#[derive(Debug, Default, Clone)]
pub struct StationDirectory {
    stations: Vec<Station>,
}

/// One page of filter results.
#[derive(Debug)]
pub struct FilterView<'a> {
    pub shown: Vec<&'a Station>,
    pub total: usize,
}

impl FilterView<'_> {
    pub fn is_truncated(&self) -> bool {
        self.total > self.shown.len()
    }

    /// Text to show under a truncated list.
    pub fn notice(&self) -> Option<String> {
        self.is_truncated().then(|| {
            format!(
                "Showing {} of {} results. Refine your search to see more.",
                self.shown.len(),
                self.total
            )
        })
    }
}

impl StationDirectory {
    pub fn load(api: &dyn FloodApi) -> Result<Self, FetchError> {
        Ok(Self::from_stations(api.fetch_stations()?))
    }

    /// Sorts by label. `sort_by` is stable, so equal labels keep fetch order.
    pub fn from_stations(mut stations: Vec<Station>) -> Self {
        stations.sort_by(|a, b| a.label.cmp(&b.label));
        Self { stations }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn stations(&self) -> &[Station] {
        &self.stations
    }

    pub fn find(&self, reference: &str) -> Option<&Station> {
        self.stations
            .iter()
            .find(|s| s.station_reference == reference)
    }

    /// Every station whose label, river, or town contains `query`,
    /// ignoring case. An empty query matches everything.
    pub fn filter(&self, query: &str) -> Vec<&Station> {
        let needle = query.to_lowercase();
        self.stations.iter().filter(|s| s.matches(&needle)).collect()
    }

    /// `filter`, capped to `MAX_SHOWN` with the uncapped count alongside.
    pub fn view(&self, query: &str) -> FilterView<'_> {
        let mut shown = self.filter(query);
        let total = shown.len();
        shown.truncate(MAX_SHOWN);
        FilterView { shown, total }
    }

    /// "N stations available" plus "M matches found" when the query narrows it.
    pub fn summary(&self, query: &str) -> String {
        let matches = self.filter(query).len();
        let mut text = format!("{} stations available", self.len());
        if matches < self.len() {
            text.push_str(&format!(" \u{2022} {matches} matches found"));
        }
        text
    }
}

#[cfg(test)]
pub(crate) fn station(reference: &str, label: &str) -> Station {
    Station {
        id: format!("http://example/id/stations/{reference}"),
        station_reference: reference.to_string(),
        label: label.to_string(),
        river_name: None,
        town: None,
        catchment_name: None,
        lat: None,
        long: None,
        date_opened: None,
        easting: None,
        northing: None,
        grid_reference: None,
        notation: None,
        rloi_id: None,
        wiski_id: None,
        status: None,
        stage_scale: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> StationDirectory {
        let mut thames = station("T1", "Thames Lock");
        thames.river_name = Some("River Thames".into());
        thames.town = Some("Oxford".into());
        let mut avon = station("A1", "Avon Bridge");
        avon.river_name = Some("River Avon".into());
        avon.town = Some("Bath".into());
        StationDirectory::from_stations(vec![thames, avon])
    }

    #[test]
    fn test_sorted_by_label() {
        let dir = sample();
        let labels: Vec<_> = dir.stations().iter().map(|s| s.label.as_str()).collect();
        assert_eq!(labels, vec!["Avon Bridge", "Thames Lock"]);
    }

    #[test]
    fn test_equal_labels_keep_fetch_order() {
        let dir = StationDirectory::from_stations(vec![
            station("B", "Mill"),
            station("A", "Aller"),
            station("C", "Mill"),
        ]);
        let refs: Vec<_> = dir
            .stations()
            .iter()
            .map(|s| s.station_reference.as_str())
            .collect();
        assert_eq!(refs, vec!["A", "B", "C"]);
    }

    #[test]
    fn test_filter_scenario() {
        let dir = sample();
        let hits = dir.filter("tham");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].label, "Thames Lock");
    }

    #[test]
    fn test_filter_river_and_town() {
        let dir = sample();
        assert_eq!(dir.filter("RIVER AVON")[0].label, "Avon Bridge");
        assert_eq!(dir.filter("oxf")[0].label, "Thames Lock");
        assert!(dir.filter("severn").is_empty());
    }

    #[test]
    fn test_empty_query_returns_all() {
        let dir = sample();
        let all: Vec<_> = dir.filter("").into_iter().cloned().collect();
        assert_eq!(all, dir.stations());
    }

    #[test]
    fn test_view_caps_results() {
        let stations = (0..250)
            .map(|i| station(&format!("S{i:03}"), &format!("Station {i:03}")))
            .collect();
        let dir = StationDirectory::from_stations(stations);

        let view = dir.view("station");
        assert_eq!(view.shown.len(), MAX_SHOWN);
        assert_eq!(view.total, 250);
        assert_eq!(
            view.notice().unwrap(),
            "Showing 100 of 250 results. Refine your search to see more."
        );

        let view = dir.view("station 24");
        assert_eq!(view.total, 10);
        assert!(view.notice().is_none());
    }

    #[test]
    fn test_find_and_summary() {
        let dir = sample();
        assert_eq!(dir.find("T1").unwrap().label, "Thames Lock");
        assert!(dir.find("nope").is_none());
        assert_eq!(dir.summary(""), "2 stations available");
        assert_eq!(
            dir.summary("bath"),
            "2 stations available \u{2022} 1 matches found"
        );
    }
}
