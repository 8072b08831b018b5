use crate::ea::{measure::Measure, FloodApi};
use crate::error::FetchError;
use crate::load::{Applied, Load, Ticket, Tracker};

pub const NO_MEASURES: &str = "No measures available for this station.";

/// Measures of one station grouped by `parameterName`.
///
/// Groups appear in the order their parameter was first seen; measures keep
/// fetch order within a group.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasureGroups {
    groups: Vec<(String, Vec<Measure>)>,
}

impl MeasureGroups {
    pub fn from_measures(measures: Vec<Measure>) -> Self {
        let mut groups: Vec<(String, Vec<Measure>)> = Vec::new();
        for measure in measures {
            match groups
                .iter_mut()
                .find(|(name, _)| *name == measure.parameter_name)
            {
                Some((_, members)) => members.push(measure),
                None => groups.push((measure.parameter_name.clone(), vec![measure])),
            }
        }
        Self { groups }
    }

    pub fn groups(&self) -> &[(String, Vec<Measure>)] {
        &self.groups
    }

    pub fn get(&self, parameter_name: &str) -> Option<&[Measure]> {
        self.groups
            .iter()
            .find(|(name, _)| name == parameter_name)
            .map(|(_, members)| members.as_slice())
    }

    /// All measures in display order: group by group.
    pub fn iter(&self) -> impl Iterator<Item = &Measure> {
        self.groups.iter().flat_map(|(_, members)| members.iter())
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|(_, members)| members.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn nth(&self, index: usize) -> Option<&Measure> {
        self.iter().nth(index)
    }
}

/// The measure set of the selected station.
#[derive(Debug, Default)]
pub struct MeasureCatalog {
    tracker: Tracker,
    state: Load<MeasureGroups>,
}

impl MeasureCatalog {
    pub fn state(&self) -> &Load<MeasureGroups> {
        &self.state
    }

    pub fn groups(&self) -> Option<&MeasureGroups> {
        self.state.ready()
    }

    /// Drops the current set and marks a fetch for `station_reference` as
    /// the only one whose response will be accepted.
    pub fn begin(&mut self, station_reference: &str) -> Ticket {
        self.state = Load::Loading;
        self.tracker.begin(station_reference)
    }

    /// Applies a response if `ticket` is still the latest request.
    pub fn apply(
        &mut self,
        ticket: &Ticket,
        result: Result<Vec<Measure>, FetchError>,
    ) -> Applied {
        if !self.tracker.is_current(ticket) {
            log::info!(
                "discarding stale measures for station {} (request {})",
                ticket.key,
                ticket.seq
            );
            return Applied::Stale;
        }
        self.state = match result {
            Ok(measures) => Load::Ready(MeasureGroups::from_measures(measures)),
            Err(err) => {
                log::error!("measures for station {}: {err}", ticket.key);
                Load::Failed(err.user_message("measures for this station"))
            }
        };
        Applied::Applied
    }

    pub fn clear(&mut self) {
        self.tracker.cancel();
        self.state = Load::Idle;
    }

    /// Station reference of the latest request, for retrying.
    pub fn station_reference(&self) -> Option<&str> {
        self.tracker.current().map(|t| t.key.as_str())
    }

    /// Fetches and applies in one blocking step.
    pub fn load_for_station(
        &mut self,
        api: &dyn FloodApi,
        station_reference: &str,
    ) -> Result<MeasureGroups, FetchError> {
        let ticket = self.begin(station_reference);
        match api.fetch_measures(station_reference) {
            Ok(measures) => {
                let groups = MeasureGroups::from_measures(measures);
                self.state = Load::Ready(groups.clone());
                Ok(groups)
            }
            Err(err) => {
                self.state = Load::Failed(err.user_message("measures for this station"));
                log::error!("measures for station {}: {err}", ticket.key);
                Err(err)
            }
        }
    }
}

#[cfg(test)]
pub(crate) fn measure(id: &str, parameter_name: &str, qualifier: Option<&str>) -> Measure {
    Measure {
        id: format!("http://example/id/measures/{id}"),
        parameter: None,
        parameter_name: parameter_name.to_string(),
        period: Some(900),
        qualifier: qualifier.map(String::from),
        unit_name: "m".to_string(),
        value_type: None,
        latest_reading: None,
        notation: None,
        station: None,
        station_reference: None,
    }
}
