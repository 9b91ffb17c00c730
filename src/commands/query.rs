use anyhow::{Context, Result};

use crate::cli::SortField;
use crate::filter;
use crate::netstat::{self, Options};
use crate::output::{json, table};

pub fn execute(
    query: &str,
    options: &Options,
    output_json: bool,
    listening: bool,
    sort: Option<SortField>,
) -> Result<()> {
    let sockets = netstat::sockets(options).with_context(|| {
        format!(
            "Failed to read socket tables under {}",
            options.get_proc_root().display()
        )
    })?;

    let sockets = if listening {
        filter::listening_only(sockets)
    } else {
        sockets
    };
    let mut filtered = filter::filter_by_query(sockets, query);
    filter::sort_sockets(&mut filtered, sort);

    if output_json {
        json::print_sockets(&filtered)?;
    } else {
        table::print_sockets(&filtered);
    }

    Ok(())
}
