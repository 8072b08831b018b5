use clap::Parser;
use crossterm::{
    event::{DisableMouseCapture, EnableMouseCapture},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{error::Error, io};

use floodwatch::app::{run_app, App};
use floodwatch::cli::Args;
use floodwatch::ea::EaClient;
use floodwatch::logging;
use floodwatch::worker::Worker;

fn main() -> Result<(), Box<dyn Error>> {
    let args = Args::parse();
    logging::init(args.log_file.as_deref())?;
    log::info!(
        "starting on {} against {} (limit {})",
        args.platform,
        args.base_url,
        args.limit
    );

    let client = EaClient::new(&args.base_url, args.limit)?;
    let (worker, responses) = Worker::spawn(client)?;
    let mut app = App::new(worker, &args.platform, args.page_size, args.station);

    // setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, &mut app, &responses);

    // restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        log::error!("{err}");
        println!("{:?}", err)
    }

    Ok(())
}
