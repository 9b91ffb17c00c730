//! Enumerate Linux sockets and their owning processes from procfs.
//!
//! The socket tables under `/proc/net` are decoded into [`SocketRecord`]s and
//! each record's inode is matched against the `fd` symlinks of every process
//! under `/proc`.
//!
//! ```no_run
//! use procsock::{sockets, Options, ProtocolFilter};
//!
//! let options = Options::new().filter(ProtocolFilter::TCP | ProtocolFilter::TCP6);
//! for socket in sockets(&options)? {
//!     println!("{} {} {:?}", socket.local(), socket.state(), socket.pid());
//! }
//! # Ok::<(), procsock::Error>(())
//! ```

pub mod addr;
pub mod cli;
pub mod commands;
pub mod error;
pub mod filter;
pub mod netstat;
pub mod output;
pub mod parser;
pub mod process;
pub mod record;
#[cfg(feature = "watch")]
pub mod watch;

pub use addr::AddressFamily;
pub use cli::Cli;
pub use error::{CorrelateError, Error, ParseError, Result};
pub use netstat::{sockets, Options, ProtocolFilter};
pub use parser::{parse_tcp, parse_tcp6, parse_udp, parse_udp6, TableFormat};
pub use process::{relate_process, InodeIndex, Owner};
pub use record::{Endpoint, Protocol, SocketKey, SocketRecord, SocketState};

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let options = cli.options();

    if cli.watch {
        if let Some(cli::Commands::Completions { .. }) = &cli.command {
            anyhow::bail!("Cannot use --watch with completions");
        }
        return run_watch(&cli, options);
    }

    match &cli.command {
        Some(cli::Commands::Completions { shell }) => {
            commands::completions::execute(*shell);
            Ok(())
        }
        Some(cli::Commands::List) => {
            commands::list::execute(&options, cli.json, cli.listening, cli.sort)
        }
        None => match &cli.query {
            Some(query) => {
                commands::query::execute(query, &options, cli.json, cli.listening, cli.sort)
            }
            None => commands::list::execute(&options, cli.json, cli.listening, cli.sort),
        },
    }
}

#[cfg(feature = "watch")]
fn run_watch(cli: &Cli, options: Options) -> anyhow::Result<()> {
    use std::time::Duration;

    let interval = match Duration::try_from_secs_f64(cli.interval) {
        Ok(interval) if !interval.is_zero() => interval,
        _ => anyhow::bail!("Interval must be a positive number of seconds"),
    };

    let filter = match &cli.command {
        Some(cli::Commands::List) => None,
        _ => cli.query.clone(),
    };

    watch::run(watch::WatchOptions {
        interval,
        json: cli.json,
        filter,
        listening: cli.listening,
        sort: cli.sort,
        options,
    })
}

#[cfg(not(feature = "watch"))]
fn run_watch(_cli: &Cli, _options: Options) -> anyhow::Result<()> {
    anyhow::bail!("Watch mode is not available in this build")
}
