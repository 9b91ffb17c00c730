//! Core data types for decoded socket-table entries.

use std::fmt;
use std::net::IpAddr;

use serde::{Serialize, Serializer};

const INODE_FIELD: usize = 9;
const UID_FIELD: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    Tcp,
    Udp,
    UdpLite,
    Raw,
    Unknown,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Protocol::Tcp => write!(f, "tcp"),
            Protocol::Udp => write!(f, "udp"),
            Protocol::UdpLite => write!(f, "udplite"),
            Protocol::Raw => write!(f, "raw"),
            Protocol::Unknown => write!(f, "unknown"),
        }
    }
}

/// Connection state as printed in the `st` column.
///
/// Only TCP gives these codes their full meaning; UDP sockets report
/// `ESTABLISHED` or `CLOSE` and the value is carried through as-is.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketState {
    Established,
    SynSent,
    SynRecv,
    FinWait1,
    FinWait2,
    TimeWait,
    Close,
    CloseWait,
    LastAck,
    Listen,
    Closing,
    Unknown(u8),
}

impl SocketState {
    pub fn from_code(code: u8) -> Self {
        match code {
            1 => SocketState::Established,
            2 => SocketState::SynSent,
            3 => SocketState::SynRecv,
            4 => SocketState::FinWait1,
            5 => SocketState::FinWait2,
            6 => SocketState::TimeWait,
            7 => SocketState::Close,
            8 => SocketState::CloseWait,
            9 => SocketState::LastAck,
            10 => SocketState::Listen,
            11 => SocketState::Closing,
            n => SocketState::Unknown(n),
        }
    }

    pub fn code(self) -> u8 {
        match self {
            SocketState::Established => 1,
            SocketState::SynSent => 2,
            SocketState::SynRecv => 3,
            SocketState::FinWait1 => 4,
            SocketState::FinWait2 => 5,
            SocketState::TimeWait => 6,
            SocketState::Close => 7,
            SocketState::CloseWait => 8,
            SocketState::LastAck => 9,
            SocketState::Listen => 10,
            SocketState::Closing => 11,
            SocketState::Unknown(n) => n,
        }
    }
}

impl fmt::Display for SocketState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SocketState::Established => "ESTABLISHED",
            SocketState::SynSent => "SYN_SENT",
            SocketState::SynRecv => "SYN_RECV",
            SocketState::FinWait1 => "FIN_WAIT1",
            SocketState::FinWait2 => "FIN_WAIT2",
            SocketState::TimeWait => "TIME_WAIT",
            SocketState::Close => "CLOSE",
            SocketState::CloseWait => "CLOSE_WAIT",
            SocketState::LastAck => "LAST_ACK",
            SocketState::Listen => "LISTEN",
            SocketState::Closing => "CLOSING",
            SocketState::Unknown(n) => return write!(f, "UNKNOWN({n:02X})"),
        };
        f.write_str(name)
    }
}

impl Serialize for SocketState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub struct Endpoint {
    pub ip: IpAddr,
    pub port: u16,
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.ip {
            IpAddr::V4(ip) => write!(f, "{}:{}", ip, self.port),
            IpAddr::V6(ip) => write!(f, "[{}]:{}", ip, self.port),
        }
    }
}

/// Identity of a socket across repeated enumerations.
///
/// Queue sizes and timers change between reads; this does not.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SocketKey {
    pub protocol: Protocol,
    pub local: Endpoint,
    pub foreign: Endpoint,
    pub inode: Option<String>,
}

/// One row of a `/proc/net/*` table, optionally attributed to a process.
///
/// Everything but the owner is fixed at parse time. The owner is attached at
/// most once, by [`crate::process`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SocketRecord {
    protocol: Protocol,
    state: SocketState,
    local: Endpoint,
    foreign: Endpoint,
    recv_queue: u32,
    send_queue: u32,
    pid: Option<u32>,
    program_name: String,
    #[serde(rename = "raw")]
    raw_fields: Vec<String>,
}

impl SocketRecord {
    pub fn new(
        protocol: Protocol,
        state: SocketState,
        local: Endpoint,
        foreign: Endpoint,
        recv_queue: u32,
        send_queue: u32,
        raw_fields: Vec<String>,
    ) -> Self {
        SocketRecord {
            protocol,
            state,
            local,
            foreign,
            recv_queue,
            send_queue,
            pid: None,
            program_name: String::new(),
            raw_fields,
        }
    }

    pub fn protocol(&self) -> Protocol {
        self.protocol
    }

    pub fn state(&self) -> SocketState {
        self.state
    }

    pub fn local(&self) -> Endpoint {
        self.local
    }

    pub fn foreign(&self) -> Endpoint {
        self.foreign
    }

    pub fn recv_queue(&self) -> u32 {
        self.recv_queue
    }

    pub fn send_queue(&self) -> u32 {
        self.send_queue
    }

    /// Owning process, `None` until correlation finds one.
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Raw `cmdline` of the owning process, empty until correlated.
    pub fn program_name(&self) -> &str {
        &self.program_name
    }

    pub fn raw_fields(&self) -> &[String] {
        &self.raw_fields
    }

    /// The kernel inode token, verbatim.
    pub fn inode(&self) -> Option<&str> {
        self.raw_fields.get(INODE_FIELD).map(String::as_str)
    }

    pub fn uid(&self) -> Option<u32> {
        self.raw_fields.get(UID_FIELD)?.parse().ok()
    }

    pub fn key(&self) -> SocketKey {
        SocketKey {
            protocol: self.protocol,
            local: self.local,
            foreign: self.foreign,
            inode: self.inode().map(str::to_owned),
        }
    }

    /// `cmdline` with NUL separators shown as spaces, for display.
    pub fn display_name(&self) -> String {
        self.program_name
            .trim_end_matches('\0')
            .replace('\0', " ")
    }

    pub(crate) fn attach_owner(&mut self, pid: u32, program_name: String) {
        if self.pid.is_none() {
            self.pid = Some(pid);
            self.program_name = program_name;
        }
    }
}
