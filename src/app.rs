use std::io;
use std::sync::mpsc::Receiver;
use std::time::Duration;

use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use ratatui::{
    backend::Backend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Block, BorderType, Borders, Cell, Chart, Dataset, GraphType, List, ListItem,
        ListState, Paragraph, Row, Table, Wrap,
    },
    Frame, Terminal,
};

use crate::catalog::{MeasureCatalog, MeasureGroups, NO_MEASURES};
use crate::directory::StationDirectory;
use crate::display::{self, place, time, MISSING};
use crate::ea::{measure::Measure, station::Station};
use crate::flow::SelectionFlow;
use crate::load::{Applied, Load, Tracker};
use crate::series::{PagerItem, ReadingsSeries, Series, NO_READINGS};
use crate::worker::{Dispatch, Request, Response};

const TICK: Duration = Duration::from_millis(100);
const STATIONS_KEY: &str = "stations";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Stations,
    Measures,
    Readings,
}

impl Focus {
    fn next(self) -> Self {
        match self {
            Focus::Stations => Focus::Measures,
            Focus::Measures => Focus::Readings,
            Focus::Readings => Focus::Stations,
        }
    }

    fn prev(self) -> Self {
        match self {
            Focus::Stations => Focus::Readings,
            Focus::Measures => Focus::Stations,
            Focus::Readings => Focus::Measures,
        }
    }
}

pub struct App<D: Dispatch> {
    dispatcher: D,
    platform: String,
    focus: Focus,
    query: String,
    preselect: Option<String>,
    station_tracker: Tracker,
    directory: Load<StationDirectory>,
    station_list: ListState,
    catalog: MeasureCatalog,
    measure_list: ListState,
    readings: ReadingsSeries,
    flow: SelectionFlow,
}

impl<D: Dispatch> App<D> {
    pub fn new(dispatcher: D, platform: &str, page_size: usize, preselect: Option<String>) -> Self {
        Self {
            dispatcher,
            platform: platform.to_string(),
            focus: Focus::Stations,
            query: String::new(),
            preselect,
            station_tracker: Tracker::default(),
            directory: Load::Idle,
            station_list: ListState::default(),
            catalog: MeasureCatalog::default(),
            measure_list: ListState::default(),
            readings: ReadingsSeries::new(page_size),
            flow: SelectionFlow::default(),
        }
    }

    pub fn focus(&self) -> Focus {
        self.focus
    }

    pub fn flow(&self) -> &SelectionFlow {
        &self.flow
    }

    pub fn directory(&self) -> &Load<StationDirectory> {
        &self.directory
    }

    pub fn catalog(&self) -> &MeasureCatalog {
        &self.catalog
    }

    pub fn readings(&self) -> &ReadingsSeries {
        &self.readings
    }

    pub fn load_stations(&mut self) {
        let ticket = self.station_tracker.begin(STATIONS_KEY);
        self.directory = Load::Loading;
        if let Err(err) = self.dispatcher.dispatch(Request::Stations(ticket)) {
            log::error!("stations: {err}");
            self.directory = Load::Failed(err.user_message("stations"));
        }
    }

    pub fn select_station(&mut self, station: Station) {
        log::info!("station {} selected", station.station_reference);
        let reference = station.station_reference.clone();
        self.flow.select_station(station);
        self.readings.clear();
        self.measure_list.select(None);

        let ticket = self.catalog.begin(&reference);
        if let Err(err) = self.dispatcher.dispatch(Request::Measures(ticket.clone())) {
            self.catalog.apply(&ticket, Err(err));
        }
    }

    pub fn select_measure(&mut self, measure: Measure) {
        log::info!("measure {} selected", measure.id);
        self.flow.select_measure(measure.clone());
        if self.flow.measure().is_none() {
            return;
        }
        if let Ok(ticket) = self.readings.begin(&measure) {
            if let Err(err) = self.dispatcher.dispatch(Request::Readings(ticket.clone())) {
                self.readings.apply(&ticket, Err(err));
            }
        }
    }

    pub fn clear_selection(&mut self) {
        self.flow.clear();
        self.catalog.clear();
        self.readings.clear();
        self.measure_list.select(None);
    }

    /// Re-issues the failed fetch behind the focused panel.
    pub fn retry(&mut self) {
        match self.focus {
            Focus::Stations if self.directory.error().is_some() => self.load_stations(),
            Focus::Measures if self.catalog.state().error().is_some() => {
                if let Some(station) = self.flow.station().cloned() {
                    self.select_station(station);
                }
            }
            Focus::Readings if self.readings.state().error().is_some() => {
                if let Some(measure) = self.flow.measure().cloned() {
                    self.select_measure(measure);
                }
            }
            _ => {}
        }
    }

    pub fn on_response(&mut self, response: Response) {
        match response {
            Response::Stations(ticket, result) => {
                if !self.station_tracker.is_current(&ticket) {
                    return;
                }
                self.directory = match result {
                    Ok(stations) => {
                        log::info!("{} stations loaded", stations.len());
                        Load::Ready(StationDirectory::from_stations(stations))
                    }
                    Err(err) => {
                        log::error!("stations: {err}");
                        Load::Failed(err.user_message("stations"))
                    }
                };
                let any = self.directory.ready().is_some_and(|d| !d.is_empty());
                self.station_list.select(any.then_some(0));
                self.apply_preselect();
            }
            Response::Measures(ticket, result) => {
                if self.catalog.apply(&ticket, result) == Applied::Applied {
                    let any = self.catalog.groups().is_some_and(|g| !g.is_empty());
                    self.measure_list.select(any.then_some(0));
                }
            }
            Response::Readings(ticket, result) => {
                self.readings.apply(&ticket, result);
            }
        }
    }

    fn apply_preselect(&mut self) {
        if self.directory.ready().is_none() {
            return;
        }
        let Some(reference) = self.preselect.take() else {
            return;
        };
        let found = self
            .directory
            .ready()
            .and_then(|dir| dir.find(&reference))
            .cloned();
        match found {
            Some(station) => {
                self.select_station(station);
                self.focus = Focus::Measures;
            }
            None => log::warn!("station {reference} not found"),
        }
    }

    fn visible_stations(&self) -> Vec<&Station> {
        self.directory
            .ready()
            .map(|dir| dir.view(&self.query).shown)
            .unwrap_or_default()
    }

    fn set_query(&mut self, query: String) {
        self.query = query;
        let any = !self.visible_stations().is_empty();
        self.station_list.select(any.then_some(0));
    }

    /// Returns `true` when the user asked to quit.
    pub fn handle_key(&mut self, key: KeyEvent) -> bool {
        if key.kind != KeyEventKind::Press {
            return false;
        }
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return true;
        }
        match key.code {
            KeyCode::Tab => self.focus = self.focus.next(),
            KeyCode::BackTab => self.focus = self.focus.prev(),
            _ => match self.focus {
                Focus::Stations => self.station_key(key.code),
                Focus::Measures => return self.measure_key(key.code),
                Focus::Readings => return self.readings_key(key.code),
            },
        }
        false
    }

    fn station_key(&mut self, code: KeyCode) {
        match code {
            KeyCode::Char('r') if self.directory.error().is_some() => self.retry(),
            KeyCode::Char(c) => {
                let mut query = self.query.clone();
                query.push(c);
                self.set_query(query);
            }
            KeyCode::Backspace => {
                let mut query = self.query.clone();
                query.pop();
                self.set_query(query);
            }
            KeyCode::Esc if self.query.is_empty() => self.clear_selection(),
            KeyCode::Esc => self.set_query(String::new()),
            KeyCode::Up => {
                let count = self.visible_stations().len();
                step(&mut self.station_list, count, -1);
            }
            KeyCode::Down => {
                let count = self.visible_stations().len();
                step(&mut self.station_list, count, 1);
            }
            KeyCode::Enter => {
                let chosen = self
                    .station_list
                    .selected()
                    .and_then(|i| self.visible_stations().get(i).map(|s| (*s).clone()));
                if let Some(station) = chosen {
                    self.select_station(station);
                    self.focus = Focus::Measures;
                }
            }
            _ => {}
        }
    }

    fn measure_key(&mut self, code: KeyCode) -> bool {
        let count = self.catalog.groups().map_or(0, MeasureGroups::len);
        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('r') => self.retry(),
            KeyCode::Esc => self.focus = Focus::Stations,
            KeyCode::Up => step(&mut self.measure_list, count, -1),
            KeyCode::Down => step(&mut self.measure_list, count, 1),
            KeyCode::Enter => {
                let chosen = self
                    .measure_list
                    .selected()
                    .and_then(|i| self.catalog.groups().and_then(|g| g.nth(i)).cloned());
                if let Some(measure) = chosen {
                    self.select_measure(measure);
                    self.focus = Focus::Readings;
                }
            }
            _ => {}
        }
        false
    }

    fn readings_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Char('r') => self.retry(),
            KeyCode::Esc => self.focus = Focus::Measures,
            KeyCode::Left => self.readings.prev_page(),
            KeyCode::Right => self.readings.next_page(),
            _ => {}
        }
        false
    }
}

fn step(state: &mut ListState, len: usize, delta: isize) {
    if len == 0 {
        state.select(None);
        return;
    }
    let current = state.selected().unwrap_or(0) as isize;
    let next = (current + delta).clamp(0, len as isize - 1);
    state.select(Some(next as usize));
}

pub fn run_app<B: Backend, D: Dispatch>(
    terminal: &mut Terminal<B>,
    app: &mut App<D>,
    responses: &Receiver<Response>,
) -> io::Result<()> {
    app.load_stations();
    loop {
        while let Ok(response) = responses.try_recv() {
            app.on_response(response);
        }

        terminal.draw(|f| ui(f, app))?;

        if event::poll(TICK)? {
            if let Event::Key(key) = event::read()? {
                if app.handle_key(key) {
                    return Ok(());
                }
            }
        }
    }
}

fn panel(title: &str, focused: bool) -> Block<'static> {
    let border = if focused { Color::Yellow } else { Color::Cyan };
    Block::default()
        .borders(Borders::ALL)
        .title(Span::styled(
            format!(" {title} "),
            Style::default().fg(Color::Yellow),
        ))
        .title_alignment(Alignment::Left)
        .border_style(Style::default().fg(border))
        .border_type(BorderType::Rounded)
}

fn label_row<'a>(label: &'a str, value: String) -> Line<'a> {
    Line::from(vec![
        Span::raw(format!(" {label:12}")),
        Span::styled(value, Style::default().fg(Color::Green)),
    ])
}

fn notice(text: &str, color: Color) -> Paragraph<'_> {
    Paragraph::new(vec![Line::from(""), Line::from(format!(" {text}"))])
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: false })
}

fn display_headline<'a>(platform: &'a str, directory: &Load<StationDirectory>, query: &str) -> Paragraph<'a> {
    let summary = match directory {
        Load::Ready(dir) => dir.summary(query),
        Load::Loading => "Loading stations...".to_string(),
        Load::Failed(msg) => msg.clone(),
        Load::Idle => String::new(),
    };
    Paragraph::new(vec![
        Line::from(vec![
            Span::raw(" "),
            Span::styled(
                "UK Flood Monitoring",
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD),
            ),
            Span::raw(" : "),
            Span::styled(platform, Style::default().fg(Color::Blue)),
        ]),
        Line::from(format!(" {summary}")),
    ])
    .block(
        Block::default()
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan))
            .border_type(BorderType::Rounded),
    )
}

fn display_station_info(station: &Station) -> Paragraph<'_> {
    let mut lines = vec![
        Line::from(Span::styled(
            format!(" {}", station.label),
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD),
        )),
        label_row("River", display::or_missing(station.river_name.as_deref()).to_string()),
        label_row("Town", display::or_missing(station.town.as_deref()).to_string()),
        label_row(
            "Catchment",
            display::or_missing(station.catchment_name.as_deref()).to_string(),
        ),
        label_row("Coordinates", place::coordinates(station.lat, station.long)),
    ];
    if let Some(ref opened) = station.date_opened {
        lines.push(label_row("Opened", time::opened(opened)));
    }
    Paragraph::new(lines).block(panel("Station", false))
}

fn display_measure_info(measure: &Measure) -> Paragraph<'_> {
    let latest = match measure.latest() {
        Some(r) => format!("{} at {}", display::value(r.value), time::full(r.date_time)),
        None => MISSING.to_string(),
    };
    let lines = vec![
        label_row("Parameter", measure.parameter_name.clone()),
        label_row("Qualifier", display::or_missing(measure.qualifier.as_deref()).to_string()),
        label_row("Unit", measure.unit_name.clone()),
        label_row(
            "Period",
            measure.period.map_or(MISSING.to_string(), time::period),
        ),
        label_row("Value type", display::or_missing(measure.value_type.as_deref()).to_string()),
        label_row("Latest", latest),
    ];
    Paragraph::new(lines).block(panel("Measure", false))
}

fn draw_stations<D: Dispatch>(f: &mut Frame, app: &mut App<D>, area: Rect) {
    let focused = app.focus == Focus::Stations;
    let detail_height = if app.flow.station().is_some() { 8 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(3),
            Constraint::Length(detail_height),
        ])
        .split(area);

    let search = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        if app.query.is_empty() {
            Span::styled(
                "Search by station name, river, or town...",
                Style::default().fg(Color::DarkGray),
            )
        } else {
            Span::raw(app.query.as_str())
        },
    ]))
    .block(panel("Search", focused));
    f.render_widget(search, chunks[0]);

    match app.directory {
        Load::Ready(ref dir) => {
            let view = dir.view(&app.query);
            let selected = app.flow.station().map(|s| s.station_reference.as_str());
            let mut items: Vec<ListItem> = view
                .shown
                .iter()
                .map(|s| {
                    let mut spans = vec![Span::styled(
                        s.label.clone(),
                        if Some(s.station_reference.as_str()) == selected {
                            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                        } else {
                            Style::default()
                        },
                    )];
                    let place: Vec<String> = [
                        s.river_name.as_ref().map(|r| format!("River: {r}")),
                        s.town.as_ref().map(|t| format!("Town: {t}")),
                    ]
                    .into_iter()
                    .flatten()
                    .collect();
                    if !place.is_empty() {
                        spans.push(Span::styled(
                            format!("  {}", place.join(" \u{2022} ")),
                            Style::default().fg(Color::DarkGray),
                        ));
                    }
                    ListItem::new(Line::from(spans))
                })
                .collect();
            if items.is_empty() {
                items.push(ListItem::new(format!(
                    " No stations found matching \"{}\"",
                    app.query
                )));
            }
            if let Some(text) = view.notice() {
                items.push(ListItem::new(Span::styled(
                    text,
                    Style::default().fg(Color::DarkGray),
                )));
            }
            let list = List::new(items)
                .block(panel("Stations", focused))
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
                .highlight_symbol("> ");
            f.render_stateful_widget(list, chunks[1], &mut app.station_list);
        }
        Load::Loading | Load::Idle => f.render_widget(
            notice("Loading stations...", Color::Gray).block(panel("Stations", focused)),
            chunks[1],
        ),
        Load::Failed(ref msg) => f.render_widget(
            notice(msg, Color::Red).block(panel("Stations", focused)),
            chunks[1],
        ),
    }

    if let Some(station) = app.flow.station() {
        f.render_widget(display_station_info(station), chunks[2]);
    }
}

fn draw_measures<D: Dispatch>(f: &mut Frame, app: &mut App<D>, area: Rect) {
    let focused = app.focus == Focus::Measures;
    let detail_height = if app.flow.measure().is_some() { 8 } else { 0 };
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(3), Constraint::Length(detail_height)])
        .split(area);

    if app.flow.station().is_none() {
        f.render_widget(
            notice(
                "Select a station to begin. Search by name, river, or town.",
                Color::Gray,
            )
            .block(panel("Measures", focused)),
            chunks[0],
        );
        return;
    }

    match app.catalog.state() {
        Load::Ready(groups) if groups.is_empty() => f.render_widget(
            notice(NO_MEASURES, Color::Yellow).block(panel("Measures", focused)),
            chunks[0],
        ),
        Load::Ready(groups) => {
            let selected = app.flow.measure().map(|m| m.id.as_str());
            let items: Vec<ListItem> = groups
                .groups()
                .iter()
                .flat_map(|(name, members)| members.iter().map(move |m| (name, m)))
                .map(|(name, m)| {
                    let style = if Some(m.id.as_str()) == selected {
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD)
                    } else {
                        Style::default()
                    };
                    ListItem::new(Line::from(vec![
                        Span::styled(format!("{name:14}"), Style::default().fg(Color::Yellow)),
                        Span::styled(m.label(), style),
                    ]))
                })
                .collect();
            let list = List::new(items)
                .block(panel("Measures", focused))
                .highlight_style(Style::default().add_modifier(Modifier::REVERSED))
                .highlight_symbol("> ");
            f.render_stateful_widget(list, chunks[0], &mut app.measure_list);
        }
        Load::Loading | Load::Idle => f.render_widget(
            notice("Loading measures...", Color::Gray).block(panel("Measures", focused)),
            chunks[0],
        ),
        Load::Failed(msg) => f.render_widget(
            notice(msg, Color::Red).block(panel("Measures", focused)),
            chunks[0],
        ),
    }

    if let Some(measure) = app.flow.measure() {
        f.render_widget(display_measure_info(measure), chunks[1]);
    }
}

fn display_stats(series: &Series) -> Paragraph<'_> {
    let Some(stats) = series.stats() else {
        return Paragraph::new("");
    };
    let span = match (series.first_time(), series.last_time()) {
        (Some(first), Some(last)) => format!("{} to {}", time::full(first), time::full(last)),
        _ => MISSING.to_string(),
    };
    Paragraph::new(vec![
        Line::from(vec![
            Span::raw(" Min "),
            Span::styled(display::value(stats.min), Style::default().fg(Color::Green)),
            Span::raw("   Average "),
            Span::styled(display::value(stats.average), Style::default().fg(Color::Green)),
            Span::raw("   Max "),
            Span::styled(display::value(stats.max), Style::default().fg(Color::Green)),
        ]),
        Line::from(format!(" {span}")),
    ])
}

fn display_table<'a>(series: &'a Series, readings: &ReadingsSeries, unit: &str) -> Table<'a> {
    let pager = readings.pager();
    let rows: Vec<Row> = series
        .page(&pager)
        .into_iter()
        .map(|r| {
            Row::new(vec![
                Cell::from(format!(" {}", time::full(r.date_time))),
                Cell::from(display::value(r.value)).style(Style::default().fg(Color::Green)),
            ])
        })
        .collect();

    let pages: Vec<Span> = pager
        .window()
        .into_iter()
        .map(|item| match item {
            PagerItem::Page(n) if n == pager.page() => Span::styled(
                format!(" [{n}]"),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
            PagerItem::Page(n) => Span::raw(format!(" {n}")),
            PagerItem::Gap => Span::raw(" \u{2026}"),
        })
        .collect();

    Table::new(rows, [Constraint::Length(20), Constraint::Length(12)])
        .header(
            Row::new(vec![
                Cell::from(" Time"),
                Cell::from(format!("Value ({unit})")),
            ])
            .style(Style::default().fg(Color::Yellow)),
        )
        .block(
            panel("Readings", false)
                .title_bottom(Line::from(pages).alignment(Alignment::Right))
                .title_bottom(Line::from(format!(" {} ", pager.caption()))),
        )
}

fn display_chart<'a>(series: &Series, points: &'a [(f64, f64)], unit: &str) -> Option<Chart<'a>> {
    let bounds = series.chart_bounds()?;
    let first = series.first_time()?;
    let last = series.last_time()?;
    let mid = first + (last - first) / 2;

    let dataset = Dataset::default()
        .name(unit.to_string())
        .marker(symbols::Marker::Braille)
        .graph_type(GraphType::Line)
        .style(Style::default().fg(Color::Cyan))
        .data(points);

    let y_mid = (bounds.y[0] + bounds.y[1]) / 2.0;
    Some(
        Chart::new(vec![dataset])
            .block(panel("Last 24 hours", false))
            .x_axis(
                Axis::default()
                    .style(Style::default().fg(Color::Gray))
                    .bounds(bounds.x)
                    .labels(vec![time::clock(first), time::clock(mid), time::clock(last)]),
            )
            .y_axis(
                Axis::default()
                    .style(Style::default().fg(Color::Gray))
                    .bounds(bounds.y)
                    .labels(vec![
                        display::value(bounds.y[0]),
                        display::value(y_mid),
                        display::value(bounds.y[1]),
                    ]),
            ),
    )
}

fn draw_readings<D: Dispatch>(f: &mut Frame, app: &App<D>, area: Rect) {
    let focused = app.focus == Focus::Readings;
    let Some(measure) = app.flow.measure() else {
        let hint = if app.flow.station().is_some() {
            "Select a measure to view the last 24 hours of readings."
        } else {
            "Select a station, then a measure."
        };
        f.render_widget(notice(hint, Color::Gray).block(panel("Readings", focused)), area);
        return;
    };

    let series = match app.readings.state() {
        Load::Ready(series) if series.is_empty() => {
            f.render_widget(
                notice(NO_READINGS, Color::Yellow).block(panel("Readings", focused)),
                area,
            );
            return;
        }
        Load::Ready(series) => series,
        Load::Failed(msg) => {
            f.render_widget(notice(msg, Color::Red).block(panel("Readings", focused)), area);
            return;
        }
        Load::Loading | Load::Idle => {
            f.render_widget(
                notice("Loading readings data...", Color::Gray).block(panel("Readings", focused)),
                area,
            );
            return;
        }
    };

    let outer = panel(&measure.label(), focused);
    let inner = outer.inner(area);
    f.render_widget(outer, area);

    let table_height = app.readings.pager().range().len() as u16 + 3;
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(2),
            Constraint::Min(8),
            Constraint::Length(table_height),
        ])
        .split(inner);

    f.render_widget(display_stats(series), chunks[0]);

    let points = series.points();
    if let Some(chart) = display_chart(series, &points, &measure.unit_name) {
        f.render_widget(chart, chunks[1]);
    }
    f.render_widget(
        display_table(series, &app.readings, &measure.unit_name),
        chunks[2],
    );
}

fn ui<D: Dispatch>(f: &mut Frame, app: &mut App<D>) {
    let vert_layout = Layout::default()
        .direction(Direction::Vertical)
        .margin(1)
        .constraints([
            Constraint::Length(4),
            Constraint::Min(10),
            Constraint::Length(1),
        ])
        .split(f.area());

    f.render_widget(
        display_headline(&app.platform, &app.directory, &app.query),
        vert_layout[0],
    );

    let chunks = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(vert_layout[1]);

    let rchunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(35), Constraint::Percentage(65)])
        .split(chunks[1]);

    draw_stations(f, app, chunks[0]);
    draw_measures(f, app, rchunks[0]);
    draw_readings(f, app, rchunks[1]);

    let help = Paragraph::new(Span::styled(
        " Tab focus  \u{2191}\u{2193} move  Enter select  \u{2190}\u{2192} page  Esc back  r retry  q quit",
        Style::default().fg(Color::DarkGray),
    ));
    f.render_widget(help, vert_layout[2]);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::measure;
    use crate::directory::station;
    use crate::error::FetchError;
    use crate::series::reading;
    use crate::testing::Recorder;
    use ratatui::backend::TestBackend;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn type_text(app: &mut App<Recorder>, text: &str) {
        for c in text.chars() {
            app.handle_key(key(KeyCode::Char(c)));
        }
    }

    fn loaded_app() -> App<Recorder> {
        let mut app = App::new(Recorder::default(), "linux", 10, None);
        app.load_stations();
        let ticket = match app.dispatcher.take().pop() {
            Some(Request::Stations(ticket)) => ticket,
            other => panic!("expected stations request, got {other:?}"),
        };
        let mut thames = station("T1", "Thames Lock");
        thames.river_name = Some("River Thames".into());
        app.on_response(Response::Stations(
            ticket,
            Ok(vec![thames, station("A1", "Avon Bridge")]),
        ));
        app
    }

    fn measures_ticket(app: &App<Recorder>) -> crate::load::Ticket {
        match app.dispatcher.sent.borrow().last() {
            Some(Request::Measures(ticket)) => ticket.clone(),
            other => panic!("expected measures request, got {other:?}"),
        }
    }

    #[test]
    fn test_search_and_select_station() {
        let mut app = loaded_app();
        type_text(&mut app, "tham");
        app.handle_key(key(KeyCode::Enter));

        assert_eq!(app.flow().station().unwrap().label, "Thames Lock");
        assert_eq!(app.focus(), Focus::Measures);
        assert_eq!(measures_ticket(&app).key, "T1");
        assert!(app.catalog().state().is_loading());
    }

    #[test]
    fn test_q_in_search_box_is_text() {
        let mut app = loaded_app();
        assert!(!app.handle_key(key(KeyCode::Char('q'))));
        assert_eq!(app.query, "q");
        app.handle_key(key(KeyCode::Tab));
        assert!(app.handle_key(key(KeyCode::Char('q'))));
    }

    #[test]
    fn test_ctrl_c_quits() {
        let mut app = loaded_app();
        assert!(app.handle_key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL)));
    }

    #[test]
    fn test_stale_measures_do_not_replace_current() {
        let mut app = loaded_app();
        app.select_station(station("A1", "Avon Bridge"));
        let for_a = measures_ticket(&app);
        app.select_station(station("T1", "Thames Lock"));
        let for_t = measures_ticket(&app);

        app.on_response(Response::Measures(for_t, Ok(vec![measure("t1", "Flow", None)])));
        app.on_response(Response::Measures(
            for_a,
            Ok(vec![measure("a1", "Water Level", None)]),
        ));

        let groups = app.catalog().groups().unwrap();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups.nth(0).unwrap().parameter_name, "Flow");
    }

    #[test]
    fn test_new_station_clears_measure_and_readings() {
        let mut app = loaded_app();
        app.select_station(station("A1", "Avon Bridge"));
        let ticket = measures_ticket(&app);
        app.on_response(Response::Measures(ticket, Ok(vec![measure("a1", "Flow", None)])));
        app.select_measure(measure("a1", "Flow", None));
        assert!(app.flow().measure().is_some());

        app.select_station(station("T1", "Thames Lock"));
        assert!(app.flow().measure().is_none());
        assert_eq!(app.readings().state(), &Load::Idle);
    }

    #[test]
    fn test_empty_readings_render_no_data() {
        let mut app = loaded_app();
        app.select_station(station("A1", "Avon Bridge"));
        app.select_measure(measure("a1", "Flow", None));
        let ticket = match app.dispatcher.take().pop() {
            Some(Request::Readings(ticket)) => ticket,
            other => panic!("expected readings request, got {other:?}"),
        };
        assert_eq!(ticket.key, "a1");
        app.on_response(Response::Readings(ticket, Ok(vec![])));
        assert!(app.readings().state().error().is_none());

        let mut terminal = Terminal::new(TestBackend::new(160, 50)).unwrap();
        terminal.draw(|f| ui(f, &mut app)).unwrap();
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(screen.contains("No readings available"));
        assert!(!screen.contains("Failed to load"));
    }

    #[test]
    fn test_renders_readings() {
        let mut app = loaded_app();
        app.select_station(station("A1", "Avon Bridge"));
        app.select_measure(measure("a1", "Flow", None));
        let ticket = match app.dispatcher.take().pop() {
            Some(Request::Readings(ticket)) => ticket,
            other => panic!("expected readings request, got {other:?}"),
        };
        app.on_response(Response::Readings(
            ticket,
            Ok(vec![reading(0, 1.0), reading(15, 3.0), reading(30, 2.0)]),
        ));

        let mut terminal = Terminal::new(TestBackend::new(160, 50)).unwrap();
        terminal.draw(|f| ui(f, &mut app)).unwrap();
        let screen: String = terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|c| c.symbol())
            .collect();
        assert!(screen.contains("Average"));
        assert!(screen.contains("Showing 1-3 of 3 readings"));
    }

    #[test]
    fn test_failure_then_retry() {
        let mut app = loaded_app();
        app.select_station(station("A1", "Avon Bridge"));
        let ticket = measures_ticket(&app);
        app.on_response(Response::Measures(ticket, Err(FetchError::WorkerGone)));
        assert_eq!(
            app.catalog().state().error(),
            Some("Failed to load measures for this station. Please try again later.")
        );
        assert_eq!(app.flow().station().unwrap().station_reference, "A1");

        app.dispatcher.take();
        app.handle_key(key(KeyCode::Tab));
        app.handle_key(key(KeyCode::Char('r')));
        assert_eq!(measures_ticket(&app).key, "A1");
        assert!(app.catalog().state().is_loading());
    }

    #[test]
    fn test_station_failure_keeps_running() {
        let mut app = App::new(Recorder::default(), "linux", 10, None);
        app.load_stations();
        let ticket = match app.dispatcher.take().pop() {
            Some(Request::Stations(ticket)) => ticket,
            other => panic!("expected stations request, got {other:?}"),
        };
        app.on_response(Response::Stations(ticket, Err(FetchError::WorkerGone)));
        assert_eq!(
            app.directory().error(),
            Some("Failed to load stations. Please try again later.")
        );
        app.handle_key(key(KeyCode::Char('r')));
        assert!(app.directory().is_loading());
    }

    #[test]
    fn test_preselect() {
        let mut app = App::new(Recorder::default(), "linux", 10, Some("A1".into()));
        app.load_stations();
        let ticket = match app.dispatcher.take().pop() {
            Some(Request::Stations(ticket)) => ticket,
            other => panic!("expected stations request, got {other:?}"),
        };
        app.on_response(Response::Stations(ticket, Ok(vec![station("A1", "Avon Bridge")])));
        assert_eq!(app.flow().station().unwrap().label, "Avon Bridge");
        assert_eq!(measures_ticket(&app).key, "A1");
    }

    #[test]
    fn test_esc_clears_query_then_selection() {
        let mut app = loaded_app();
        type_text(&mut app, "avon");
        app.handle_key(key(KeyCode::Enter));
        app.handle_key(key(KeyCode::BackTab));
        app.handle_key(key(KeyCode::Esc));
        assert_eq!(app.query, "");
        assert!(app.flow().station().is_some());
        app.handle_key(key(KeyCode::Esc));
        assert!(app.flow().station().is_none());
        assert_eq!(app.catalog().state(), &Load::Idle);
    }
}
