use std::collections::HashSet;

use colored::Colorize;
use comfy_table::{Cell, CellAlignment, Color, Table};

use crate::record::{Protocol, SocketKey, SocketRecord, SocketState};

pub fn print_sockets(sockets: &[SocketRecord]) {
    print_sockets_inner(sockets, &HashSet::new())
}

pub fn print_sockets_watch(sockets: &[SocketRecord], new_sockets: &HashSet<SocketKey>) {
    print_sockets_inner(sockets, new_sockets)
}

fn protocol_color(protocol: Protocol) -> Color {
    match protocol {
        Protocol::Tcp => Color::Cyan,
        Protocol::Udp => Color::Magenta,
        Protocol::UdpLite => Color::Blue,
        Protocol::Raw | Protocol::Unknown => Color::Reset,
    }
}

fn state_color(state: SocketState) -> Color {
    match state {
        SocketState::Listen => Color::Green,
        SocketState::Established => Color::Reset,
        SocketState::TimeWait
        | SocketState::CloseWait
        | SocketState::FinWait1
        | SocketState::FinWait2 => Color::Yellow,
        _ => Color::DarkGrey,
    }
}

fn print_sockets_inner(sockets: &[SocketRecord], new_sockets: &HashSet<SocketKey>) {
    if sockets.is_empty() {
        println!("{}", "No results found".yellow());
        return;
    }

    let mut table = Table::new();
    table.set_header(vec![
        "PROTO", "LOCAL", "FOREIGN", "STATE", "RECV-Q", "SEND-Q", "PID", "PROGRAM",
    ]);

    let mut new_count = 0;
    for socket in sockets {
        let is_new = new_sockets.contains(&socket.key());
        if is_new {
            new_count += 1;
        }
        let row_color = if is_new { Color::Green } else { Color::Reset };
        let pick = |c: Color| if is_new { Color::Green } else { c };

        let pid = socket
            .pid()
            .map(|p| p.to_string())
            .unwrap_or_else(|| "-".to_string());
        let program = socket.display_name();
        let program = if program.is_empty() { "-".to_string() } else { program };

        table.add_row(vec![
            Cell::new(socket.protocol()).fg(pick(protocol_color(socket.protocol()))),
            Cell::new(socket.local()).fg(row_color),
            Cell::new(socket.foreign()).fg(row_color),
            Cell::new(socket.state()).fg(pick(state_color(socket.state()))),
            Cell::new(socket.recv_queue())
                .set_alignment(CellAlignment::Right)
                .fg(row_color),
            Cell::new(socket.send_queue())
                .set_alignment(CellAlignment::Right)
                .fg(row_color),
            Cell::new(pid).fg(row_color),
            Cell::new(program).fg(row_color),
        ]);
    }

    println!("{table}");

    let count_str = sockets.len().to_string();
    if new_count == 0 {
        println!("\n{} socket(s)", count_str.green());
    } else {
        println!(
            "\n{} socket(s) ({} new)",
            count_str.green(),
            new_count.to_string().green().bold()
        );
    }
}
