//! Enumerate sockets across the selected tables and attach their owners.

use std::fmt;
use std::fs::File;
use std::io::BufReader;
use std::ops::{BitOr, BitOrAssign};
use std::path::{Path, PathBuf};

use log::{debug, warn};

use crate::addr::AddressFamily;
use crate::error::Result;
use crate::parser::{read_table, TableFormat};
use crate::process::InodeIndex;
use crate::record::{Protocol, SocketRecord};

pub const DEFAULT_PROC_ROOT: &str = "/proc";

/// Set of socket tables to read.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ProtocolFilter(u8);

impl ProtocolFilter {
    pub const TCP: ProtocolFilter = ProtocolFilter(1);
    pub const TCP6: ProtocolFilter = ProtocolFilter(1 << 1);
    pub const UDP: ProtocolFilter = ProtocolFilter(1 << 2);
    pub const UDP6: ProtocolFilter = ProtocolFilter(1 << 3);
    pub const UDPLITE: ProtocolFilter = ProtocolFilter(1 << 4);
    pub const UDPLITE6: ProtocolFilter = ProtocolFilter(1 << 5);
    pub const RAW: ProtocolFilter = ProtocolFilter(1 << 6);
    pub const RAW6: ProtocolFilter = ProtocolFilter(1 << 7);

    pub const fn empty() -> Self {
        ProtocolFilter(0)
    }

    pub const fn all() -> Self {
        ProtocolFilter(u8::MAX)
    }

    pub const fn from_bits(bits: u8) -> Self {
        ProtocolFilter(bits)
    }

    pub const fn bits(self) -> u8 {
        self.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const fn contains(self, other: ProtocolFilter) -> bool {
        self.0 & other.0 == other.0
    }

    pub const fn intersects(self, other: ProtocolFilter) -> bool {
        self.0 & other.0 != 0
    }
}

/// TCP and UDP over both address families.
impl Default for ProtocolFilter {
    fn default() -> Self {
        ProtocolFilter::TCP | ProtocolFilter::TCP6 | ProtocolFilter::UDP | ProtocolFilter::UDP6
    }
}

impl BitOr for ProtocolFilter {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self {
        ProtocolFilter(self.0 | rhs.0)
    }
}

impl BitOrAssign for ProtocolFilter {
    fn bitor_assign(&mut self, rhs: Self) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for ProtocolFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = TABLES
            .iter()
            .filter(|t| self.contains(t.flag))
            .map(|t| t.name)
            .collect();
        write!(f, "ProtocolFilter({})", names.join(" | "))
    }
}

/// One `/proc/net` table and how to read it.
struct Table {
    flag: ProtocolFilter,
    name: &'static str,
    format: TableFormat,
}

static TABLES: [Table; 8] = [
    Table {
        flag: ProtocolFilter::TCP,
        name: "tcp",
        format: TableFormat::TCP,
    },
    Table {
        flag: ProtocolFilter::TCP6,
        name: "tcp6",
        format: TableFormat::TCP6,
    },
    Table {
        flag: ProtocolFilter::UDP,
        name: "udp",
        format: TableFormat::UDP,
    },
    Table {
        flag: ProtocolFilter::UDP6,
        name: "udp6",
        format: TableFormat::UDP6,
    },
    Table {
        flag: ProtocolFilter::UDPLITE,
        name: "udplite",
        format: TableFormat::new(Protocol::UdpLite, AddressFamily::V4),
    },
    Table {
        flag: ProtocolFilter::UDPLITE6,
        name: "udplite6",
        format: TableFormat::new(Protocol::UdpLite, AddressFamily::V6),
    },
    Table {
        flag: ProtocolFilter::RAW,
        name: "raw",
        format: TableFormat::new(Protocol::Raw, AddressFamily::V4),
    },
    Table {
        flag: ProtocolFilter::RAW6,
        name: "raw6",
        format: TableFormat::new(Protocol::Raw, AddressFamily::V6),
    },
];

/// Where and what to enumerate.
///
/// ```
/// use procsock::{Options, ProtocolFilter};
///
/// let options = Options::new()
///     .proc_root("/host/proc")
///     .filter(ProtocolFilter::TCP | ProtocolFilter::TCP6);
/// assert_eq!(options.get_proc_root().to_str(), Some("/host/proc"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    proc_root: PathBuf,
    namespace: Option<i32>,
    filter: ProtocolFilter,
}

impl Options {
    pub fn new() -> Self {
        Options {
            proc_root: PathBuf::from(DEFAULT_PROC_ROOT),
            namespace: None,
            filter: ProtocolFilter::default(),
        }
    }

    /// Mount point of procfs. Defaults to `/proc`.
    pub fn proc_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.proc_root = root.into();
        self
    }

    /// Tables to read. An empty filter means the default set.
    pub fn filter(mut self, filter: ProtocolFilter) -> Self {
        self.filter = if filter.is_empty() {
            ProtocolFilter::default()
        } else {
            filter
        };
        self
    }

    /// Network namespace hint. Recorded only; enumeration reads the
    /// namespace that `proc_root` exposes.
    pub fn namespace(mut self, ns: i32) -> Self {
        self.namespace = Some(ns);
        self
    }

    pub fn get_proc_root(&self) -> &Path {
        &self.proc_root
    }

    pub fn get_namespace(&self) -> Option<i32> {
        self.namespace
    }

    pub fn get_filter(&self) -> ProtocolFilter {
        self.filter
    }
}

impl Default for Options {
    fn default() -> Self {
        Options::new()
    }
}

/// Read one table. A table that cannot be opened yields no sockets.
pub fn read_protocol_table(path: &Path, format: TableFormat) -> Result<Vec<SocketRecord>> {
    let file = match File::open(path) {
        Ok(file) => file,
        Err(e) => {
            debug!("skipping {}: {}", path.display(), e);
            return Ok(Vec::new());
        }
    };

    Ok(read_table(BufReader::new(file), format)?)
}

/// Enumerate every socket in the selected tables and attribute each to its
/// owning process where one can be found.
///
/// Records come back grouped by table (tcp, tcp6, udp, udp6, udplite,
/// udplite6, raw, raw6) and in table order within each group. Sockets whose
/// owner could not be inspected keep `pid() == None`.
pub fn sockets(options: &Options) -> Result<Vec<SocketRecord>> {
    let net_dir = options.proc_root.join("net");
    let mut sockets = Vec::new();

    for table in TABLES.iter().filter(|t| options.filter.contains(t.flag)) {
        let parsed = read_protocol_table(&net_dir.join(table.name), table.format)?;
        debug!("read {} sockets from {}", parsed.len(), table.name);
        sockets.extend(parsed);
    }

    if sockets.is_empty() {
        return Ok(sockets);
    }

    let index = match InodeIndex::build(&options.proc_root) {
        Ok(index) => index,
        Err(e) => {
            warn!("cannot attribute sockets to processes: {}", e);
            return Ok(sockets);
        }
    };

    let mut related = 0;
    for socket in &mut sockets {
        match index.relate(socket) {
            Ok(true) => related += 1,
            Ok(false) => {}
            Err(e) => debug!("{}", e),
        }
    }
    debug!("attributed {} of {} sockets", related, sockets.len());

    Ok(sockets)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use std::os::unix::fs::symlink;

    use tempfile::TempDir;

    use crate::record::SocketState;

    const HEADER: &str = "  sl  local_address rem_address   st tx_queue rx_queue tr tm->when retrnsmt   uid  timeout inode\n";

    fn write_table(root: &Path, name: &str, lines: &[&str]) {
        let net = root.join("net");
        fs::create_dir_all(&net).unwrap();
        let mut content = HEADER.to_string();
        for line in lines {
            content.push_str(line);
            content.push('\n');
        }
        fs::write(net.join(name), content).unwrap();
    }

    #[test]
    fn test_default_filter_is_tcp_and_udp() {
        let filter = ProtocolFilter::default();
        assert!(filter.contains(ProtocolFilter::TCP));
        assert!(filter.contains(ProtocolFilter::TCP6));
        assert!(filter.contains(ProtocolFilter::UDP));
        assert!(filter.contains(ProtocolFilter::UDP6));
        assert!(!filter.intersects(ProtocolFilter::RAW | ProtocolFilter::UDPLITE));
        assert_eq!(filter.bits(), 0b1111);
        assert!(ProtocolFilter::all().contains(filter | ProtocolFilter::RAW6));
    }

    #[test]
    fn test_empty_filter_falls_back_to_default() {
        let options = Options::new().filter(ProtocolFilter::empty());
        assert_eq!(options.get_filter(), ProtocolFilter::default());
    }

    #[test]
    fn test_filter_debug_lists_tables() {
        let filter = ProtocolFilter::TCP | ProtocolFilter::RAW6;
        assert_eq!(format!("{filter:?}"), "ProtocolFilter(tcp | raw6)");
    }

    #[test]
    fn test_options_defaults() {
        let options = Options::default();
        assert_eq!(options.get_proc_root(), Path::new("/proc"));
        assert_eq!(options.get_namespace(), None);
        assert_eq!(options.get_filter(), ProtocolFilter::default());
    }

    #[test]
    fn test_missing_table_yields_no_sockets() {
        let root = TempDir::new().unwrap();
        let result =
            read_protocol_table(&root.path().join("net/tcp6"), TableFormat::TCP6).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_sockets_reads_only_selected_tables() {
        let root = TempDir::new().unwrap();
        write_table(
            root.path(),
            "tcp",
            &[
                "0: 0100007F:0050 00000000:0000 0A 00000000:00000000 00:00000000 00000000 0 0 11 1 0",
            ],
        );
        write_table(
            root.path(),
            "udp",
            &[
                "0: 00000000:0035 00000000:0000 07 00000000:00000000 00:00000000 00000000 0 0 22 2 0",
            ],
        );

        let options = Options::new()
            .proc_root(root.path())
            .filter(ProtocolFilter::UDP);
        let result = sockets(&options).unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].protocol(), Protocol::Udp);
        assert_eq!(result[0].local().port, 53);
    }

    #[test]
    fn test_sockets_attributes_owners() {
        let root = TempDir::new().unwrap();
        write_table(
            root.path(),
            "tcp",
            &[
                "0: 0100007F:0050 00000000:0000 0A 00000000:00000000 00:00000000 00000000 0 0 12345 1 0",
                "1: 0100007F:1F90 00000000:0000 0A 00000000:00000000 00:00000000 00000000 0 0 555 1 0",
            ],
        );
        let fd = root.path().join("900").join("fd");
        fs::create_dir_all(&fd).unwrap();
        fs::write(root.path().join("900").join("cmdline"), b"httpd\0").unwrap();
        symlink("socket:[12345]", fd.join("4")).unwrap();

        let result = sockets(&Options::new().proc_root(root.path())).unwrap();

        assert_eq!(result.len(), 2);
        assert_eq!(result[0].state(), SocketState::Listen);
        assert_eq!(result[0].pid(), Some(900));
        assert_eq!(result[0].program_name(), "httpd\0");
        assert_eq!(result[1].pid(), None);
    }

    #[test]
    fn test_sockets_with_empty_root() {
        let root = TempDir::new().unwrap();
        let result = sockets(&Options::new().proc_root(root.path())).unwrap();
        assert!(result.is_empty());
    }

    #[test]
    fn test_sockets_reads_raw_tables_when_asked() {
        let root = TempDir::new().unwrap();
        write_table(
            root.path(),
            "raw",
            &[
                "0: 00000000:0001 00000000:0000 07 00000000:00000000 00:00000000 00000000 0 0 31 2 0 0",
            ],
        );

        let result = sockets(
            &Options::new()
                .proc_root(root.path())
                .filter(ProtocolFilter::RAW),
        )
        .unwrap();

        assert_eq!(result.len(), 1);
        assert_eq!(result[0].protocol(), Protocol::Raw);
        assert_eq!(result[0].local().port, 1);
    }
}
