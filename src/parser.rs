//! Parsing of the `/proc/net/{tcp,udp,raw,...}` socket tables.
//!
//! Every table shares one layout: a header line starting with `sl`, then one
//! line per socket with at least 12 whitespace-separated columns:
//!
//! ```text
//!   sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode
//!    0: 0100007F:0050 00000000:0000 0A 00000000:00000000 00:00000000 00000000     0        0 12345 ...
//! ```
//!
//! Lines that do not decode are dropped; a table read only fails when the
//! underlying stream does.

use std::io::{self, BufRead, BufReader, Read};

use log::trace;

use crate::addr::{decode_address, parse_hex_port, AddressFamily};
use crate::error::ParseError;
use crate::record::{Endpoint, Protocol, SocketRecord, SocketState};

const MIN_FIELDS: usize = 12;
const HEADER_MARKER: &str = "sl";

/// What the caller knows about the table being read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableFormat {
    pub protocol: Protocol,
    pub family: AddressFamily,
}

impl TableFormat {
    pub const TCP: TableFormat = TableFormat::new(Protocol::Tcp, AddressFamily::V4);
    pub const TCP6: TableFormat = TableFormat::new(Protocol::Tcp, AddressFamily::V6);
    pub const UDP: TableFormat = TableFormat::new(Protocol::Udp, AddressFamily::V4);
    pub const UDP6: TableFormat = TableFormat::new(Protocol::Udp, AddressFamily::V6);

    pub const fn new(protocol: Protocol, family: AddressFamily) -> Self {
        TableFormat { protocol, family }
    }
}

fn parse_endpoint(token: &str, family: AddressFamily) -> Result<Endpoint, ParseError> {
    let parts: Vec<&str> = token.split(':').collect();
    let [addr_hex, port_hex] = parts[..] else {
        return Err(ParseError::InvalidEndpoint(token.to_string()));
    };

    Ok(Endpoint {
        ip: decode_address(addr_hex, family)?,
        port: parse_hex_port(port_hex)?,
    })
}

fn parse_state(token: &str) -> Result<SocketState, ParseError> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(ParseError::InvalidState(token.to_string()));
    }
    let code =
        u8::from_str_radix(token, 16).map_err(|_| ParseError::InvalidState(token.to_string()))?;
    Ok(SocketState::from_code(code))
}

fn parse_queue_pair(token: &str) -> Result<(u32, u32), ParseError> {
    let invalid = || ParseError::InvalidQueuePair(token.to_string());

    let parts: Vec<&str> = token.split(':').collect();
    let [recv_hex, send_hex] = parts[..] else {
        return Err(invalid());
    };

    let parse = |hex: &str| {
        if hex.is_empty() || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Err(invalid());
        }
        u32::from_str_radix(hex, 16).map_err(|_| invalid())
    };

    Ok((parse(recv_hex)?, parse(send_hex)?))
}

/// Decode one table line.
///
/// Returns `Ok(None)` for lines that are not socket entries at all (the
/// header, or anything with fewer than 12 columns) and `Err` for entries
/// whose columns do not decode.
pub fn parse_socket_line(
    line: &str,
    format: TableFormat,
) -> Result<Option<SocketRecord>, ParseError> {
    let fields: Vec<&str> = line.split_whitespace().collect();

    if fields.len() < MIN_FIELDS || fields[0] == HEADER_MARKER {
        return Ok(None);
    }

    let local = parse_endpoint(fields[1], format.family)?;
    let foreign = parse_endpoint(fields[2], format.family)?;
    let state = parse_state(fields[3])?;
    let (recv_queue, send_queue) = parse_queue_pair(fields[4])?;

    Ok(Some(SocketRecord::new(
        format.protocol,
        state,
        local,
        foreign,
        recv_queue,
        send_queue,
        fields.into_iter().map(str::to_owned).collect(),
    )))
}

fn accept_line(line: &str, format: TableFormat) -> Option<SocketRecord> {
    match parse_socket_line(line, format) {
        Ok(record) => record,
        Err(e) => {
            trace!("dropping {} line {:?}: {}", format.protocol, line.trim(), e);
            None
        }
    }
}

/// Parse a whole table held in memory. Never fails.
pub fn parse_proc_net_file(content: &str, format: TableFormat) -> Vec<SocketRecord> {
    content
        .lines()
        .filter_map(|line| accept_line(line, format))
        .collect()
}

/// Read and parse a table from a stream, keeping records in line order.
///
/// Non-UTF-8 bytes are replaced rather than treated as a read error.
pub fn read_table<R: BufRead>(mut reader: R, format: TableFormat) -> io::Result<Vec<SocketRecord>> {
    let mut sockets = Vec::new();
    let mut buf = Vec::new();

    loop {
        buf.clear();
        if reader.read_until(b'\n', &mut buf)? == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        if let Some(record) = accept_line(&line, format) {
            sockets.push(record);
        }
    }

    Ok(sockets)
}

pub fn parse_tcp<R: Read>(device: R) -> io::Result<Vec<SocketRecord>> {
    read_table(BufReader::new(device), TableFormat::TCP)
}

pub fn parse_tcp6<R: Read>(device: R) -> io::Result<Vec<SocketRecord>> {
    read_table(BufReader::new(device), TableFormat::TCP6)
}

pub fn parse_udp<R: Read>(device: R) -> io::Result<Vec<SocketRecord>> {
    read_table(BufReader::new(device), TableFormat::UDP)
}

pub fn parse_udp6<R: Read>(device: R) -> io::Result<Vec<SocketRecord>> {
    read_table(BufReader::new(device), TableFormat::UDP6)
}
