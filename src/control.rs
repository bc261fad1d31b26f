/*
 *  control.rs
 *
 *  xlivebg - live wallpapers for the X window system
 *  (c) 2020-26 Stuart Hunter
 *
 *  Control socket for front-ends
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

//! Line based control protocol.
//!
//! A front-end connects to the Unix socket and sends one command per line.
//! Every command gets exactly one reply line:
//!
//! ```text
//! ping                      -> pong
//! list                      -> [{"name":"distort","description":"..."}]
//! active                    -> distort
//! switch stars              -> ok
//! props                     -> [{"id":"frequency","desc":"...","type":"number"}]
//! get xlivebg.fit           -> crop
//! set xlivebg.fps 30        -> ok
//! save                      -> ok
//! ```
//!
//! Connection tasks never touch the host. They forward each command over a
//! channel to the task that owns it and wait for the reply.

use std::fmt;
use std::io;
use std::os::unix::fs::FileTypeExt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{debug, info, warn};
use serde::Serialize;
use thiserror::Error;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::{mpsc, oneshot};

use crate::constants::CONTROL_SOCKET_NAME;
use crate::host::Host;
use crate::store::ConfigValue;

#[derive(Debug, Error)]
pub enum ControlError {
    #[error("cannot bind control socket {0}: {1}")]
    Bind(PathBuf, io::Error),

    #[error("control socket {0} is in use by another xlivebg")]
    InUse(PathBuf),

    #[error("control socket I/O: {0}")]
    Io(#[from] io::Error),

    #[error("unknown command \"{0}\"")]
    UnknownCommand(String),

    #[error("{0}: missing argument")]
    MissingArgument(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlCommand {
    Ping,
    List,
    Active,
    Switch(String),
    Props,
    Get(String),
    Set(String, ConfigValue),
    Save,
}

impl FromStr for ControlCommand {
    type Err = ControlError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (verb, rest) = match line.split_once(char::is_whitespace) {
            Some((verb, rest)) => (verb, rest.trim()),
            None => (line, ""),
        };

        let arg = |name: &'static str| {
            if rest.is_empty() {
                Err(ControlError::MissingArgument(name))
            } else {
                Ok(rest.to_string())
            }
        };

        match verb.to_ascii_lowercase().as_str() {
            "ping" => Ok(ControlCommand::Ping),
            "list" => Ok(ControlCommand::List),
            "active" => Ok(ControlCommand::Active),
            "switch" => Ok(ControlCommand::Switch(arg("switch")?)),
            "props" => Ok(ControlCommand::Props),
            "get" => Ok(ControlCommand::Get(arg("get")?)),
            "set" => {
                let (path, value) = rest
                    .split_once(char::is_whitespace)
                    .ok_or(ControlError::MissingArgument("set"))?;
                Ok(ControlCommand::Set(path.to_string(), ConfigValue::from_text(value)))
            }
            "save" => Ok(ControlCommand::Save),
            _ => Err(ControlError::UnknownCommand(verb.to_string())),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum ControlReply {
    Ok,
    Text(String),
    Error(String),
}

impl ControlReply {
    fn error(e: impl fmt::Display) -> Self {
        ControlReply::Error(e.to_string())
    }

    fn json(value: &impl Serialize) -> Self {
        match serde_json::to_string(value) {
            Ok(s) => ControlReply::Text(s),
            Err(e) => ControlReply::error(e),
        }
    }
}

impl fmt::Display for ControlReply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControlReply::Ok => f.write_str("ok"),
            ControlReply::Text(s) => f.write_str(s),
            ControlReply::Error(msg) => write!(f, "error {}", msg),
        }
    }
}

#[derive(Serialize)]
struct PluginSummary<'a> {
    name: &'a str,
    description: &'a str,
}

/// Run one command against the host
pub fn execute(host: &mut Host, command: ControlCommand) -> ControlReply {
    debug!("control: {:?}", command);
    match command {
        ControlCommand::Ping => ControlReply::Text("pong".into()),
        ControlCommand::List => {
            let list: Vec<PluginSummary> = host
                .registry()
                .iter()
                .map(|p| PluginSummary {
                    name: p.name(),
                    description: p.description(),
                })
                .collect();
            ControlReply::json(&list)
        }
        ControlCommand::Active => {
            ControlReply::Text(host.active().map(|p| p.name().to_string()).unwrap_or_default())
        }
        ControlCommand::Switch(name) => match host.activate_by_name(&name) {
            Ok(()) => ControlReply::Ok,
            Err(e) => ControlReply::error(e),
        },
        ControlCommand::Props => match host.active() {
            Some(p) => ControlReply::json(&p.properties()),
            None => ControlReply::Text("[]".into()),
        },
        ControlCommand::Get(path) => match host.config().lookup(&path) {
            Some(value) => ControlReply::Text(value.to_string()),
            None => ControlReply::Error(format!("{} not set", path)),
        },
        ControlCommand::Set(path, value) => match host.set_config(&path, value) {
            Ok(()) => ControlReply::Ok,
            Err(e) => ControlReply::error(e),
        },
        ControlCommand::Save => match host.save_config() {
            Ok(_) => ControlReply::Ok,
            Err(e) => ControlReply::error(e),
        },
    }
}

/// A command from a connection, with the channel its reply goes back on
#[derive(Debug)]
pub struct ControlRequest {
    pub command: ControlCommand,
    pub reply: oneshot::Sender<ControlReply>,
}

/// `$XDG_RUNTIME_DIR/xlivebg.sock`, or a per-user name in /tmp
pub fn socket_path() -> PathBuf {
    match dirs_next::runtime_dir() {
        Some(dir) => dir.join(CONTROL_SOCKET_NAME),
        None => {
            // SAFETY: getuid has no failure modes
            let uid = unsafe { libc::getuid() };
            PathBuf::from(format!("/tmp/xlivebg-{}.sock", uid))
        }
    }
}

/// Listening control socket. The socket file is removed on drop.
pub struct ControlServer {
    path: PathBuf,
    listener: UnixListener,
}

impl ControlServer {
    /// Bind, replacing a stale socket left by an earlier run.
    ///
    /// A socket some other process still answers on is left alone, and so is
    /// anything at `path` that is not a socket.
    pub fn bind(path: &Path) -> Result<Self, ControlError> {
        let bind_err = |e: io::Error| ControlError::Bind(path.to_path_buf(), e);

        if let Ok(meta) = std::fs::symlink_metadata(path) {
            if !meta.file_type().is_socket() {
                return Err(bind_err(io::Error::new(
                    io::ErrorKind::AlreadyExists,
                    "path exists and is not a socket",
                )));
            }
            match std::os::unix::net::UnixStream::connect(path) {
                Ok(_) => return Err(ControlError::InUse(path.to_path_buf())),
                Err(e) if e.kind() == io::ErrorKind::ConnectionRefused => {
                    debug!("removing stale control socket {}", path.display());
                    std::fs::remove_file(path).map_err(bind_err)?;
                }
                Err(e) => return Err(bind_err(e)),
            }
        }
        let listener = UnixListener::bind(path).map_err(bind_err)?;
        info!("control socket: {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
            listener,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Accept connections until the request channel closes
    pub async fn run(&self, requests: mpsc::Sender<ControlRequest>) {
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, _)) => {
                        let requests = requests.clone();
                        tokio::spawn(async move {
                            if let Err(e) = handle_connection(stream, requests).await {
                                debug!("control connection closed: {}", e);
                            }
                        });
                    }
                    Err(e) => warn!("control socket accept: {}", e),
                },
                _ = requests.closed() => break,
            }
        }
    }
}

impl Drop for ControlServer {
    fn drop(&mut self) {
        std::fs::remove_file(&self.path).ok();
    }
}

async fn handle_connection(
    stream: UnixStream,
    requests: mpsc::Sender<ControlRequest>,
) -> Result<(), ControlError> {
    let (reader, mut writer) = stream.into_split();
    let mut lines = BufReader::new(reader).lines();

    while let Some(line) = lines.next_line().await? {
        if line.trim().is_empty() {
            continue;
        }
        let reply = match line.parse::<ControlCommand>() {
            Ok(command) => {
                let (tx, rx) = oneshot::channel();
                if requests.send(ControlRequest { command, reply: tx }).await.is_err() {
                    break;
                }
                rx.await
                    .unwrap_or_else(|_| ControlReply::Error("host shutting down".into()))
            }
            Err(e) => ControlReply::error(e),
        };
        writer.write_all(format!("{}\n", reply).as_bytes()).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_commands() {
        assert_eq!("ping".parse::<ControlCommand>().unwrap(), ControlCommand::Ping);
        assert_eq!(" LIST \n".parse::<ControlCommand>().unwrap(), ControlCommand::List);
        assert_eq!(
            "switch distort".parse::<ControlCommand>().unwrap(),
            ControlCommand::Switch("distort".into())
        );
        assert_eq!(
            "get xlivebg.fit".parse::<ControlCommand>().unwrap(),
            ControlCommand::Get("xlivebg.fit".into())
        );
    }

    #[test]
    fn test_parse_set_values() {
        assert_eq!(
            "set xlivebg.fps 30".parse::<ControlCommand>().unwrap(),
            ControlCommand::Set("xlivebg.fps".into(), ConfigValue::Integer(30))
        );
        assert_eq!(
            "set xlivebg.image \"/home/me/my pics/a.jpg\"".parse::<ControlCommand>().unwrap(),
            ControlCommand::Set("xlivebg.image".into(), "/home/me/my pics/a.jpg".into())
        );
        match "set xlivebg.color [1, 0.5, 0, 1]".parse::<ControlCommand>().unwrap() {
            ControlCommand::Set(_, ConfigValue::Vector(v)) => assert_eq!(v.as_slice(), &[1.0, 0.5, 0.0, 1.0]),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_parse_errors() {
        assert!(matches!("dance".parse::<ControlCommand>(), Err(ControlError::UnknownCommand(_))));
        assert!(matches!("switch".parse::<ControlCommand>(), Err(ControlError::MissingArgument("switch"))));
        assert!(matches!("set xlivebg.fps".parse::<ControlCommand>(), Err(ControlError::MissingArgument("set"))));
    }

    #[test]
    fn test_reply_lines() {
        assert_eq!(ControlReply::Ok.to_string(), "ok");
        assert_eq!(ControlReply::Error("no such plugin: x".into()).to_string(), "error no such plugin: x");
    }

    fn scratch_socket(tag: &str) -> PathBuf {
        let path = std::env::temp_dir().join(format!("xlivebg-ctl-{}-{}.sock", std::process::id(), tag));
        let _ = std::fs::remove_file(&path);
        path
    }

    #[tokio::test]
    async fn test_bind_refuses_live_socket() {
        let path = scratch_socket("live");
        let first = ControlServer::bind(&path).unwrap();

        let second = ControlServer::bind(&path);
        assert!(matches!(second, Err(ControlError::InUse(ref p)) if p == &path));
        assert!(path.exists());

        drop(first);
        assert!(!path.exists());
    }

    #[tokio::test]
    async fn test_bind_replaces_stale_socket() {
        let path = scratch_socket("stale");
        drop(std::os::unix::net::UnixListener::bind(&path).unwrap());
        assert!(path.exists());

        let server = ControlServer::bind(&path).unwrap();
        assert_eq!(server.path(), path.as_path());
    }

    #[tokio::test]
    async fn test_bind_leaves_regular_file_alone() {
        let path = scratch_socket("file");
        std::fs::write(&path, "keep me").unwrap();

        assert!(matches!(ControlServer::bind(&path), Err(ControlError::Bind(..))));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "keep me");
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_socket_path_name() {
        let path = socket_path();
        let name = path.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name == CONTROL_SOCKET_NAME || name.starts_with("xlivebg-"));
    }
}
