use std::path::PathBuf;

use clap::builder::{styling::AnsiColor, Styles, TypedValueParser};
use clap::Parser;

use crate::ea::{DEFAULT_BASE_URL, DEFAULT_STATION_LIMIT};
use crate::series::DEFAULT_PAGE_SIZE;

const ABOUT: &str = "UK flood monitoring TUI";

const LONG_ABOUT: &str = "
TUI for browsing Environment Agency flood-monitoring stations.

Search stations by name, river, or town, pick a measure (water level, flow, rainfall, ...), and
view the last 24 hours of readings as a chart and a table. Data comes from the public
flood-monitoring API at https://environment.data.gov.uk/flood-monitoring.

Pass a station reference (e.g. 1029TH) to open that station as soon as the list has loaded.
";

const STYLES: Styles = Styles::styled()
    .header(AnsiColor::Yellow.on_default())
    .usage(AnsiColor::Green.on_default())
    .literal(AnsiColor::Green.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Parser, Debug)]
#[command(version, styles=STYLES, about=ABOUT, long_about = LONG_ABOUT)]
pub struct Args {
    #[arg(help = "Station reference to open at start-up (e.g. 1029TH, E2043)")]
    pub station: Option<String>,

    #[arg(long, env = "FLOODWATCH_BASE_URL", default_value = DEFAULT_BASE_URL)]
    pub base_url: String,

    #[arg(
        long,
        env = "FLOODWATCH_LIMIT",
        default_value_t = DEFAULT_STATION_LIMIT,
        help = "Maximum number of stations requested"
    )]
    pub limit: u32,

    #[arg(
        long,
        default_value_t = DEFAULT_PAGE_SIZE,
        value_parser = clap::value_parser!(u16).range(1..).map(usize::from),
        help = "Rows per page in the readings table"
    )]
    pub page_size: usize,

    #[arg(
        long,
        env = "FLOODWATCH_PLATFORM",
        default_value = std::env::consts::OS,
        help = "Platform name reported by the host shell"
    )]
    pub platform: String,

    #[arg(long, env = "FLOODWATCH_LOG", help = "Write log output to this file")]
    pub log_file: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::try_parse_from(["floodwatch"]).unwrap();
        assert_eq!(args.station, None);
        assert_eq!(args.limit, 1000);
        assert_eq!(args.page_size, 10);
        assert_eq!(args.platform, std::env::consts::OS);
    }

    #[test]
    fn test_overrides() {
        let args = Args::try_parse_from([
            "floodwatch",
            "1029TH",
            "--base-url",
            "http://localhost:8080/flood-monitoring",
            "--page-size",
            "25",
            "--platform",
            "win32",
        ])
        .unwrap();
        assert_eq!(args.station.as_deref(), Some("1029TH"));
        assert_eq!(args.base_url, "http://localhost:8080/flood-monitoring");
        assert_eq!(args.page_size, 25);
        assert_eq!(args.platform, "win32");
    }

    #[test]
    fn test_zero_page_size_rejected() {
        assert!(Args::try_parse_from(["floodwatch", "--page-size", "0"]).is_err());
    }
}
