use crate::ea::{measure::Measure, station::Station};

/// Which station and measure the user is looking at.
///
/// Choosing a station always drops the measure, so a measure from another
/// station can never be observed alongside the new one.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct SelectionFlow {
    station: Option<Station>,
    measure: Option<Measure>,
}

impl SelectionFlow {
    pub fn select_station(&mut self, station: Station) {
        self.station = Some(station);
        self.measure = None;
    }

    /// Only reachable once a station is selected; ignored otherwise.
    pub fn select_measure(&mut self, measure: Measure) {
        if self.station.is_none() {
            log::warn!("measure {} selected with no station", measure.id);
            return;
        }
        self.measure = Some(measure);
    }

    pub fn clear(&mut self) {
        self.station = None;
        self.measure = None;
    }

    pub fn station(&self) -> Option<&Station> {
        self.station.as_ref()
    }

    pub fn measure(&self) -> Option<&Measure> {
        self.measure.as_ref()
    }
}
