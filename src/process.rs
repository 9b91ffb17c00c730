//! Attribute sockets to processes by walking `<root>/<pid>/fd`.
//!
//! Nothing in procfs maps a socket inode back to its owner, so every
//! `fd` symlink of every process has to be read. [`relate_process`] does that
//! walk for one record; [`InodeIndex`] does it once and answers any number
//! of records with the same result.

use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use log::debug;
use regex::Regex;

use crate::error::CorrelateError;
use crate::record::SocketRecord;

static PID_DIR: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[1-9][0-9]*$").expect("pid pattern is valid"));

static SOCKET_LINK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^socket:\[([0-9]+)\]$").expect("socket pattern is valid"));

/// A process found holding a socket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    pub pid: u32,
    /// Raw `cmdline`, NUL separators included.
    pub program_name: String,
}

/// Numeric directories directly under `root`, in directory order.
fn process_dirs(root: &Path) -> Result<Vec<(u32, PathBuf)>, CorrelateError> {
    let entries = fs::read_dir(root).map_err(|source| CorrelateError::Io {
        path: root.to_path_buf(),
        source,
    })?;

    let dirs = entries
        .flatten()
        .filter(|entry| entry.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter_map(|entry| {
            let name = entry.file_name();
            let name = name.to_str()?;
            if !PID_DIR.is_match(name) {
                return None;
            }
            let pid = name.parse::<u32>().ok()?;
            Some((pid, entry.path()))
        })
        .collect();

    Ok(dirs)
}

/// Socket inodes referenced by a process's open descriptors.
fn read_socket_inodes(process_dir: &Path) -> io::Result<Vec<String>> {
    let fd_dir = fs::read_dir(process_dir.join("fd"))?;

    let mut inodes = Vec::new();

    for entry in fd_dir.flatten() {
        if let Ok(link_target) = fs::read_link(entry.path()) {
            if let Some(inode) = parse_socket_link(&link_target) {
                inodes.push(inode);
            }
        }
    }

    Ok(inodes)
}

fn parse_socket_link(path: &Path) -> Option<String> {
    let s = path.to_string_lossy();
    SOCKET_LINK
        .captures(&s)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

fn read_cmdline(process_dir: &Path) -> io::Result<String> {
    let raw = fs::read(process_dir.join("cmdline"))?;
    Ok(String::from_utf8_lossy(&raw).into_owned())
}

fn target_inode(record: &SocketRecord) -> Result<String, CorrelateError> {
    record
        .inode()
        .map(str::to_owned)
        .ok_or(CorrelateError::MissingInode {
            fields: record.raw_fields().len(),
        })
}

/// Find the process holding `record`'s socket and attach it to the record.
///
/// The first process (in directory order) with a matching descriptor and a
/// readable `cmdline` wins. Processes whose `fd` directory cannot be read are
/// skipped. Finding no owner is not an error; the record is left as it was.
pub fn relate_process(record: &mut SocketRecord, proc_root: &Path) -> Result<(), CorrelateError> {
    let inode = target_inode(record)?;

    for (pid, dir) in process_dirs(proc_root)? {
        let inodes = match read_socket_inodes(&dir) {
            Ok(inodes) => inodes,
            Err(e) => {
                debug!("skipping pid {}: {}", pid, e);
                continue;
            }
        };

        for candidate in inodes {
            if candidate != inode {
                continue;
            }
            match read_cmdline(&dir) {
                Ok(cmdline) => {
                    record.attach_owner(pid, cmdline);
                    return Ok(());
                }
                Err(e) => debug!(
                    "pid {} holds socket {} but cmdline is unreadable: {}",
                    pid, inode, e
                ),
            }
        }
    }

    Ok(())
}

/// Socket inode to owning process, built from one walk of the process tree.
#[derive(Debug, Default)]
pub struct InodeIndex {
    owners: HashMap<String, Owner>,
}

impl InodeIndex {
    pub fn build(proc_root: &Path) -> Result<Self, CorrelateError> {
        let mut owners: HashMap<String, Owner> = HashMap::new();

        for (pid, dir) in process_dirs(proc_root)? {
            let inodes = match read_socket_inodes(&dir) {
                Ok(inodes) => inodes,
                Err(e) => {
                    debug!("skipping pid {}: {}", pid, e);
                    continue;
                }
            };
            if inodes.iter().all(|inode| owners.contains_key(inode)) {
                continue;
            }

            let cmdline = match read_cmdline(&dir) {
                Ok(cmdline) => cmdline,
                Err(e) => {
                    debug!("skipping pid {}: cmdline unreadable: {}", pid, e);
                    continue;
                }
            };

            for inode in inodes {
                owners.entry(inode).or_insert_with(|| Owner {
                    pid,
                    program_name: cmdline.clone(),
                });
            }
        }

        debug!("indexed {} socket inodes under {}", owners.len(), proc_root.display());

        Ok(InodeIndex { owners })
    }

    pub fn get(&self, inode: &str) -> Option<&Owner> {
        self.owners.get(inode)
    }

    pub fn len(&self) -> usize {
        self.owners.len()
    }

    pub fn is_empty(&self) -> bool {
        self.owners.is_empty()
    }

    /// Attach the indexed owner to `record`. Returns whether one was found.
    pub fn relate(&self, record: &mut SocketRecord) -> Result<bool, CorrelateError> {
        let inode = target_inode(record)?;

        match self.owners.get(&inode) {
            Some(owner) => {
                record.attach_owner(owner.pid, owner.program_name.clone());
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
