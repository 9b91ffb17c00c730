use anyhow::{Context, Result};

use crate::cli::SortField;
use crate::filter;
use crate::netstat::{self, Options};
use crate::output::{json, table};

pub fn execute(
    options: &Options,
    output_json: bool,
    listening: bool,
    sort: Option<SortField>,
) -> Result<()> {
    let mut sockets = netstat::sockets(options).with_context(|| {
        format!(
            "Failed to read socket tables under {}",
            options.get_proc_root().display()
        )
    })?;

    if listening {
        sockets = filter::listening_only(sockets);
    }
    filter::sort_sockets(&mut sockets, sort);

    if output_json {
        json::print_sockets(&sockets)?;
    } else {
        table::print_sockets(&sockets);
    }

    Ok(())
}
