//! Trailing-window readings for the selected measure.
//!
//! One fetched set backs two views: ascending for the chart and descending
//! for the table. Sorting happens once on arrival; neither view refetches.

use chrono::{DateTime, Utc};

use crate::ea::{measure::Measure, reading::Reading, FloodApi};
use crate::error::FetchError;
use crate::load::{Applied, Load, Ticket, Tracker};

pub const NO_READINGS: &str = "No readings available for this measure in the last 24 hours.";
pub const DEFAULT_PAGE_SIZE: usize = 10;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Stats {
    pub min: f64,
    pub max: f64,
    pub average: f64,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartBounds {
    pub x: [f64; 2],
    pub y: [f64; 2],
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Series {
    ascending: Vec<Reading>,
}

impl Series {
    pub fn from_readings(mut readings: Vec<Reading>) -> Self {
        readings.sort_by_key(|r| r.date_time);
        Self {
            ascending: readings,
        }
    }

    pub fn len(&self) -> usize {
        self.ascending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ascending.is_empty()
    }

    /// Oldest first, for charting.
    pub fn ascending(&self) -> &[Reading] {
        &self.ascending
    }

    /// Newest first, for the table.
    pub fn descending(&self) -> impl DoubleEndedIterator<Item = &Reading> + ExactSizeIterator {
        self.ascending.iter().rev()
    }

    pub fn first_time(&self) -> Option<DateTime<Utc>> {
        self.ascending.first().map(|r| r.date_time)
    }

    pub fn last_time(&self) -> Option<DateTime<Utc>> {
        self.ascending.last().map(|r| r.date_time)
    }

    /// `None` for an empty series.
    pub fn stats(&self) -> Option<Stats> {
        let first = self.ascending.first()?.value;
        let (min, max, sum) = self
            .ascending
            .iter()
            .fold((first, first, 0.0), |(min, max, sum), r| {
                (min.min(r.value), max.max(r.value), sum + r.value)
            });
        Some(Stats {
            min,
            max,
            average: sum / self.ascending.len() as f64,
        })
    }

    /// (seconds since epoch, value) pairs in chart order.
    pub fn points(&self) -> Vec<(f64, f64)> {
        self.ascending
            .iter()
            .map(|r| (r.date_time.timestamp() as f64, r.value))
            .collect()
    }

    /// Axis bounds with 10% headroom on the value range. Non-negative series
    /// are floored at zero; series that dip below zero keep their full pad.
    pub fn chart_bounds(&self) -> Option<ChartBounds> {
        let stats = self.stats()?;
        let range = stats.max - stats.min;
        let pad = if range > 0.0 {
            range * 0.1
        } else if stats.max != 0.0 {
            stats.max.abs() * 0.01
        } else {
            1.0
        };
        let y0 = if stats.min >= 0.0 {
            (stats.min - pad).max(0.0)
        } else {
            stats.min - pad
        };
        let x0 = self.first_time()?.timestamp() as f64;
        let x1 = self.last_time()?.timestamp() as f64;
        Some(ChartBounds {
            x: [x0, if x1 > x0 { x1 } else { x0 + 1.0 }],
            y: [y0, stats.max + pad],
        })
    }

    /// Rows of the table page described by `pager`.
    pub fn page(&self, pager: &Pager) -> Vec<&Reading> {
        let range = pager.range();
        self.descending()
            .skip(range.start)
            .take(range.len())
            .collect()
    }
}

/// Entry in the page selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PagerItem {
    Page(usize),
    Gap,
}

/// 1-based table pagination.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pager {
    page: usize,
    size: usize,
    total: usize,
}

impl Pager {
    pub fn new(page: usize, size: usize, total: usize) -> Self {
        let size = size.max(1);
        let mut pager = Self { page, size, total };
        pager.page = page.clamp(1, pager.page_count().max(1));
        pager
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        self.total.div_ceil(self.size)
    }

    /// Row indices into the descending order.
    pub fn range(&self) -> std::ops::Range<usize> {
        let start = ((self.page - 1) * self.size).min(self.total);
        let end = (start + self.size).min(self.total);
        start..end
    }

    /// First page, last page, and the current page's neighbours, with a
    /// `Gap` wherever numbers are skipped.
    pub fn window(&self) -> Vec<PagerItem> {
        let count = self.page_count();
        let mut items = Vec::new();
        let mut previous = 0;
        for page in 1..=count {
            let keep = page == 1
                || page == count
                || (page + 1 >= self.page && page <= self.page + 1);
            if !keep {
                continue;
            }
            if previous != 0 && page != previous + 1 {
                items.push(PagerItem::Gap);
            }
            items.push(PagerItem::Page(page));
            previous = page;
        }
        items
    }

    pub fn caption(&self) -> String {
        let range = self.range();
        format!(
            "Showing {}-{} of {} readings",
            range.start + 1,
            range.end,
            self.total
        )
    }
}

/// Readings of the selected measure plus the table page being viewed.
#[derive(Debug)]
pub struct ReadingsSeries {
    tracker: Tracker,
    state: Load<Series>,
    page: usize,
    page_size: usize,
}

impl Default for ReadingsSeries {
    fn default() -> Self {
        Self::new(DEFAULT_PAGE_SIZE)
    }
}

impl ReadingsSeries {
    pub fn new(page_size: usize) -> Self {
        Self {
            tracker: Tracker::default(),
            state: Load::Idle,
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn state(&self) -> &Load<Series> {
        &self.state
    }

    pub fn series(&self) -> Option<&Series> {
        self.state.ready()
    }

    /// Starts a fetch for `measure`, replacing whatever was shown.
    ///
    /// Fails without issuing a ticket if the measure's id is unusable.
    pub fn begin(&mut self, measure: &Measure) -> Result<Ticket, FetchError> {
        match measure.measure_id() {
            Ok(id) => {
                self.state = Load::Loading;
                self.page = 1;
                Ok(self.tracker.begin(id))
            }
            Err(err) => {
                log::error!("{err}");
                self.tracker.cancel();
                self.state = Load::Failed(err.user_message("readings"));
                Err(err)
            }
        }
    }

    pub fn apply(&mut self, ticket: &Ticket, result: Result<Vec<Reading>, FetchError>) -> Applied {
        if !self.tracker.is_current(ticket) {
            log::info!(
                "discarding stale readings for measure {} (request {})",
                ticket.key,
                ticket.seq
            );
            return Applied::Stale;
        }
        self.state = match result {
            Ok(readings) => Load::Ready(Series::from_readings(readings)),
            Err(err) => {
                log::error!("readings for measure {}: {err}", ticket.key);
                Load::Failed(err.user_message("readings"))
            }
        };
        self.page = 1;
        Applied::Applied
    }

    pub fn clear(&mut self) {
        self.tracker.cancel();
        self.state = Load::Idle;
        self.page = 1;
    }

    /// Measure id of the latest request, for retrying.
    pub fn measure_id(&self) -> Option<&str> {
        self.tracker.current().map(|t| t.key.as_str())
    }

    /// Fetches and applies in one blocking step.
    pub fn load_for_measure(
        &mut self,
        api: &dyn FloodApi,
        measure: &Measure,
    ) -> Result<Series, FetchError> {
        let ticket = self.begin(measure)?;
        match api.fetch_readings(&ticket.key) {
            Ok(readings) => {
                let series = Series::from_readings(readings);
                self.state = Load::Ready(series.clone());
                Ok(series)
            }
            Err(err) => {
                log::error!("readings for measure {}: {err}", ticket.key);
                self.state = Load::Failed(err.user_message("readings"));
                Err(err)
            }
        }
    }

    /// Readings across every measure at a station, blocking. Keyed by the
    /// station reference rather than a measure id.
    pub fn load_for_station(
        &mut self,
        api: &dyn FloodApi,
        station_reference: &str,
    ) -> Result<Series, FetchError> {
        self.state = Load::Loading;
        self.page = 1;
        let ticket = self.tracker.begin(station_reference);
        match api.fetch_station_readings(station_reference) {
            Ok(readings) => {
                let series = Series::from_readings(readings);
                self.state = Load::Ready(series.clone());
                Ok(series)
            }
            Err(err) => {
                log::error!("readings for station {}: {err}", ticket.key);
                self.state = Load::Failed(err.user_message("readings"));
                Err(err)
            }
        }
    }

    pub fn pager(&self) -> Pager {
        let total = self.series().map_or(0, Series::len);
        Pager::new(self.page, self.page_size, total)
    }

    pub fn next_page(&mut self) {
        self.page = Pager::new(self.page + 1, self.page_size, self.total()).page();
    }

    pub fn prev_page(&mut self) {
        self.page = Pager::new(self.page.saturating_sub(1), self.page_size, self.total()).page();
    }

    fn total(&self) -> usize {
        self.series().map_or(0, Series::len)
    }
}

#[cfg(test)]
pub(crate) fn reading(minute: u32, value: f64) -> Reading {
    use chrono::TimeZone;
    Reading {
        id: format!("r/{minute}"),
        date_time: Utc
            .with_ymd_and_hms(2024, 3, 1, minute / 60, minute % 60, 0)
            .unwrap(),
        value,
        date: "2024-03-01".to_string(),
        measure: "m".to_string(),
    }
}
