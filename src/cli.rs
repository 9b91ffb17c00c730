use std::path::PathBuf;

use clap::{Parser, Subcommand, ValueEnum};
use clap_complete::Shell;

use crate::netstat::{Options, ProtocolFilter, DEFAULT_PROC_ROOT};

#[derive(Parser)]
#[command(name = "procsock")]
#[command(version, about = "List sockets and the processes that own them, read from /proc")]
pub struct Cli {
    /// Port number or program name to query
    pub query: Option<String>,

    /// Output as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// Watch mode: refresh continuously
    #[arg(short, long, global = true)]
    pub watch: bool,

    /// Refresh interval in seconds (default: 1)
    #[arg(short = 'n', long, default_value = "1", global = true)]
    pub interval: f64,

    /// Only show listening sockets
    #[arg(short, long, global = true)]
    pub listening: bool,

    /// Sort results by field
    #[arg(short, long, value_enum, global = true)]
    pub sort: Option<SortField>,

    /// Tables to read, comma separated (default: tcp,udp)
    #[arg(short, long, value_enum, value_delimiter = ',', global = true)]
    pub protocol: Vec<ProtocolArg>,

    /// Only IPv4 tables
    #[arg(short = '4', long, global = true, conflicts_with = "ipv6")]
    pub ipv4: bool,

    /// Only IPv6 tables
    #[arg(short = '6', long, global = true)]
    pub ipv6: bool,

    /// Where procfs is mounted
    #[arg(long, env = "PROCSOCK_PROC_ROOT", default_value = DEFAULT_PROC_ROOT, global = true)]
    pub proc_root: PathBuf,

    /// Log what is skipped and why (same as RUST_LOG=debug)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Clone, Copy, ValueEnum)]
pub enum SortField {
    Port,
    Pid,
    Name,
}

#[derive(Clone, Copy, ValueEnum, PartialEq, Eq)]
pub enum ProtocolArg {
    Tcp,
    Udp,
    Udplite,
    Raw,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List all sockets
    List,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

impl Cli {
    pub fn filter(&self) -> ProtocolFilter {
        let protocols: &[ProtocolArg] = if self.protocol.is_empty() {
            &[ProtocolArg::Tcp, ProtocolArg::Udp]
        } else {
            &self.protocol
        };

        let mut filter = ProtocolFilter::empty();
        for proto in protocols {
            let (v4, v6) = match proto {
                ProtocolArg::Tcp => (ProtocolFilter::TCP, ProtocolFilter::TCP6),
                ProtocolArg::Udp => (ProtocolFilter::UDP, ProtocolFilter::UDP6),
                ProtocolArg::Udplite => (ProtocolFilter::UDPLITE, ProtocolFilter::UDPLITE6),
                ProtocolArg::Raw => (ProtocolFilter::RAW, ProtocolFilter::RAW6),
            };
            if !self.ipv6 {
                filter |= v4;
            }
            if !self.ipv4 {
                filter |= v6;
            }
        }
        filter
    }

    pub fn options(&self) -> Options {
        Options::new()
            .proc_root(self.proc_root.clone())
            .filter(self.filter())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("procsock").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn test_default_filter_matches_library_default() {
        assert_eq!(parse(&[]).filter(), ProtocolFilter::default());
    }

    #[test]
    fn test_ipv4_tcp_only() {
        let cli = parse(&["-4", "-p", "tcp"]);
        assert_eq!(cli.filter(), ProtocolFilter::TCP);
    }

    #[test]
    fn test_ipv6_udp_and_raw() {
        let cli = parse(&["-6", "--protocol", "udp,raw"]);
        assert_eq!(cli.filter(), ProtocolFilter::UDP6 | ProtocolFilter::RAW6);
    }

    #[test]
    fn test_ipv4_and_ipv6_conflict() {
        let result = Cli::try_parse_from(["procsock", "-4", "-6"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_proc_root_flag() {
        let cli = parse(&["--proc-root", "/host/proc", "list"]);
        assert_eq!(cli.options().get_proc_root(), std::path::Path::new("/host/proc"));
        assert!(matches!(cli.command, Some(Commands::List)));
    }
}
