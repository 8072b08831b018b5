//! Per-panel fetch state and request tagging.
//!
//! Each panel that fetches owns a `Tracker`. Starting a fetch hands out a
//! `Ticket`; a response may only be applied while its ticket is still the
//! latest one issued by that tracker. Anything older is stale and dropped.

/// What a panel is currently showing.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Load<T> {
    #[default]
    Idle,
    Loading,
    Failed(String),
    Ready(T),
}

impl<T> Load<T> {
    pub fn ready(&self) -> Option<&T> {
        match self {
            Load::Ready(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, Load::Loading)
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Load::Failed(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Identifies one request: a monotonic sequence number plus the key it was
/// issued for (station reference or measure id).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    pub seq: u64,
    pub key: String,
}

/// Outcome of offering a response to its tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    Applied,
    Stale,
}

#[derive(Debug, Default, Clone)]
pub struct Tracker {
    next_seq: u64,
    current: Option<Ticket>,
}

impl Tracker {
    /// Supersedes any request in flight.
    pub fn begin(&mut self, key: &str) -> Ticket {
        self.next_seq += 1;
        let ticket = Ticket {
            seq: self.next_seq,
            key: key.to_string(),
        };
        self.current = Some(ticket.clone());
        ticket
    }

    /// Forget the current request; every outstanding ticket becomes stale.
    pub fn cancel(&mut self) {
        self.current = None;
    }

    pub fn is_current(&self, ticket: &Ticket) -> bool {
        self.current.as_ref() == Some(ticket)
    }

    pub fn current(&self) -> Option<&Ticket> {
        self.current.as_ref()
    }
}
