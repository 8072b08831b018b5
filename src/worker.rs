//! Background fetch thread.
//!
//! The UI thread never waits on the network. Requests go out over one mpsc
//! channel, responses come back over another, each carrying the `Ticket` it
//! was issued with. The worker does not judge staleness; the panel that
//! issued the ticket does.

use std::sync::mpsc::{self, Receiver, Sender};
use std::thread;

use crate::ea::{measure::Measure, reading::Reading, station::Station, FloodApi};
use crate::error::FetchError;
use crate::load::Ticket;

#[derive(Debug, Clone, PartialEq)]
pub enum Request {
    Stations(Ticket),
    /// Ticket key is the station reference.
    Measures(Ticket),
    /// Ticket key is the measure id.
    Readings(Ticket),
}

#[derive(Debug)]
pub enum Response {
    Stations(Ticket, Result<Vec<Station>, FetchError>),
    Measures(Ticket, Result<Vec<Measure>, FetchError>),
    Readings(Ticket, Result<Vec<Reading>, FetchError>),
}

/// Somewhere to send fetch requests.
pub trait Dispatch {
    fn dispatch(&self, request: Request) -> Result<(), FetchError>;
}

pub struct Worker {
    requests: Sender<Request>,
}

impl Worker {
    /// Starts the fetch thread. It exits once the `Worker` is dropped and
    /// the request in hand, if any, has finished.
    pub fn spawn<A>(api: A) -> std::io::Result<(Self, Receiver<Response>)>
    where
        A: FloodApi + Send + 'static,
    {
        let (request_tx, request_rx) = mpsc::channel::<Request>();
        let (response_tx, response_rx) = mpsc::channel::<Response>();

        thread::Builder::new()
            .name("fetch".to_string())
            .spawn(move || {
                for request in request_rx {
                    if response_tx.send(handle(&api, request)).is_err() {
                        break;
                    }
                }
                log::debug!("fetch worker stopped");
            })?;

        Ok((
            Self {
                requests: request_tx,
            },
            response_rx,
        ))
    }
}

impl Dispatch for Worker {
    fn dispatch(&self, request: Request) -> Result<(), FetchError> {
        self.requests
            .send(request)
            .map_err(|_| FetchError::WorkerGone)
    }
}

/// Runs one request against `api`.
pub fn handle(api: &dyn FloodApi, request: Request) -> Response {
    match request {
        Request::Stations(ticket) => Response::Stations(ticket, api.fetch_stations()),
        Request::Measures(ticket) => {
            let result = api.fetch_measures(&ticket.key);
            Response::Measures(ticket, result)
        }
        Request::Readings(ticket) => {
            let result = api.fetch_readings(&ticket.key);
            Response::Readings(ticket, result)
        }
    }
}
