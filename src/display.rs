use chrono::{DateTime, Local, NaiveDate, Utc};

pub const MISSING: &str = "N/A";

pub fn value(v: f64) -> String {
    format!("{v:.2}")
}

pub fn or_missing(text: Option<&str>) -> &str {
    text.unwrap_or(MISSING)
}

pub mod time {
    use super::*;

    pub fn clock(dt: DateTime<Utc>) -> String {
        DateTime::<Local>::from(dt).format("%H:%M").to_string()
    }

    pub fn full(dt: DateTime<Utc>) -> String {
        DateTime::<Local>::from(dt)
            .format("%d-%m-%Y %H:%M")
            .to_string()
    }

    /// `dateOpened` is a plain date; anything unparseable is shown as-is.
    pub fn opened(date: &str) -> String {
        match NaiveDate::parse_from_str(date, "%Y-%m-%d") {
            Ok(d) => d.format("%d/%m/%Y").to_string(),
            Err(_) => date.to_string(),
        }
    }

    /// Measure period in seconds, e.g. 900 -> "15 min".
    pub fn period(secs: u32) -> String {
        match secs {
            s if s >= 86_400 && s % 86_400 == 0 => format!("{} day", s / 86_400),
            s if s >= 3_600 && s % 3_600 == 0 => format!("{} h", s / 3_600),
            s if s >= 60 && s % 60 == 0 => format!("{} min", s / 60),
            s => format!("{s} s"),
        }
    }

    #[test]
    fn test_opened() {
        assert_eq!(opened("1994-01-01"), "01/01/1994");
        assert_eq!(opened("sometime"), "sometime");
    }

    #[test]
    fn test_period() {
        assert_eq!(period(900), "15 min");
        assert_eq!(period(3600), "1 h");
        assert_eq!(period(86400), "1 day");
        assert_eq!(period(45), "45 s");
        assert_eq!(period(90), "90 s");
    }
}

pub mod place {
    use super::MISSING;

    pub fn coordinates(lat: Option<f64>, long: Option<f64>) -> String {
        match (lat, long) {
            (Some(lat), Some(long)) => format!("{lat:.5}, {long:.5}"),
            _ => MISSING.to_string(),
        }
    }

    #[test]
    fn test_coordinates() {
        assert_eq!(
            coordinates(Some(51.874767), Some(-1.740083)),
            "51.87477, -1.74008"
        );
        assert_eq!(coordinates(None, Some(1.0)), "N/A");
    }
}

#[test]
fn test_value() {
    assert_eq!(value(0.153), "0.15");
    assert_eq!(value(2.0), "2.00");
    assert_eq!(or_missing(None), "N/A");
    assert_eq!(or_missing(Some("Bath")), "Bath");
}
