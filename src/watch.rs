use std::collections::HashSet;
use std::io::{self, Write};
use std::thread;
use std::time::Duration;

use anyhow::Result;
use colored::Colorize;

use crate::cli::SortField;
use crate::filter;
use crate::netstat::{self, Options};
use crate::output::{json, table};
use crate::record::SocketKey;

pub struct WatchOptions {
    pub interval: Duration,
    pub json: bool,
    pub filter: Option<String>,
    pub listening: bool,
    pub sort: Option<SortField>,
    pub options: Options,
}

pub fn run(options: WatchOptions) -> Result<()> {
    let mut previous: Option<HashSet<SocketKey>> = None;

    loop {
        clear_screen();

        let mut sockets = netstat::sockets(&options.options)?;
        if options.listening {
            sockets = filter::listening_only(sockets);
        }
        if let Some(query) = &options.filter {
            sockets = filter::filter_by_query(sockets, query);
        }
        filter::sort_sockets(&mut sockets, options.sort);

        let current: HashSet<SocketKey> = sockets.iter().map(|s| s.key()).collect();

        if options.json {
            json::print_sockets(&sockets)?;
        } else {
            // Nothing is "new" on the first frame.
            let new_sockets: HashSet<SocketKey> = match &previous {
                Some(previous) => current.difference(previous).cloned().collect(),
                None => HashSet::new(),
            };
            table::print_sockets_watch(&sockets, &new_sockets);
        }

        print_watch_status(&options);
        io::stdout().flush()?;

        previous = Some(current);
        thread::sleep(options.interval);
    }
}

fn clear_screen() {
    print!("\x1B[2J\x1B[1;1H");
}

fn print_watch_status(options: &WatchOptions) {
    let mode = if options.listening {
        "listening sockets"
    } else {
        "all sockets"
    };
    println!(
        "\n{} {} (every {:.1}s, Ctrl+C to exit)",
        "Watching".dimmed(),
        mode.dimmed(),
        options.interval.as_secs_f64()
    );
}
