use anyhow::{Context, Result};

use crate::record::SocketRecord;

pub fn print_sockets(sockets: &[SocketRecord]) -> Result<()> {
    let json = serde_json::to_string_pretty(sockets).context("Failed to serialize to JSON")?;
    println!("{json}");
    Ok(())
}
