//! Narrowing and ordering of enumerated sockets for display.

use crate::cli::SortField;
use crate::record::{SocketRecord, SocketState};

pub fn sort_sockets(sockets: &mut [SocketRecord], sort: Option<SortField>) {
    match sort {
        Some(SortField::Port) => sockets.sort_by_key(|s| s.local().port),
        Some(SortField::Pid) => sockets.sort_by_key(|s| s.pid()),
        Some(SortField::Name) => sockets.sort_by_key(|s| s.display_name()),
        None => {}
    }
}

pub fn listening_only(sockets: Vec<SocketRecord>) -> Vec<SocketRecord> {
    sockets
        .into_iter()
        .filter(|s| s.state() == SocketState::Listen)
        .collect()
}

/// Keep sockets matching a query: a port number matches either endpoint's
/// port, anything else is a case-insensitive program name substring.
pub fn filter_by_query(sockets: Vec<SocketRecord>, query: &str) -> Vec<SocketRecord> {
    if let Ok(port) = query.parse::<u16>() {
        return sockets
            .into_iter()
            .filter(|s| s.local().port == port || s.foreign().port == port)
            .collect();
    }

    let query = query.to_lowercase();
    sockets
        .into_iter()
        .filter(|s| s.display_name().to_lowercase().contains(&query))
        .collect()
}
