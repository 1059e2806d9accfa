// X11 backend
// Talks RandR over an x11rb connection

use crate::backend::{
    Atom, Connect, DisplayBackend, Output, OutputPropertyInfo, OutputPropertyReply, ScreenRef,
};
use crate::{Error, Result};
use tracing::debug;
use x11rb::connection::{Connection, RequestConnection};
use x11rb::errors::{ConnectionError, ReplyError};
use x11rb::protocol::randr::{self, ConnectionExt as RandrConnectionExt};
use x11rb::protocol::xproto::{AtomEnum, ConnectionExt as XprotoConnectionExt, PropMode};
use x11rb::rust_connection::RustConnection;

/// Version this client announces in `RRQueryVersion`.
const CLIENT_RANDR_VERSION: (u32, u32) = (1, 2);

/// Longest property read we issue, in 32-bit units.
const PROPERTY_READ_LENGTH: u32 = 4;

/// Opens connections to an X server.
#[derive(Debug, Clone, Default)]
pub struct X11Connector {
    display: Option<String>,
}

impl X11Connector {
    /// `None` connects to `$DISPLAY`.
    pub fn new(display: Option<String>) -> Self {
        Self { display }
    }
}

impl Connect for X11Connector {
    type Backend = X11Backend;

    fn connect(&self) -> Result<X11Backend> {
        let (conn, screen_num) = x11rb::connect(self.display.as_deref()).map_err(|e| {
            let target = self.display.as_deref().unwrap_or("$DISPLAY");
            Error::NoDisplay(format!("{}: {}", target, e))
        })?;
        debug!("Connected to X server, default screen {}", screen_num);
        Ok(X11Backend { conn })
    }
}

/// A failed send means the connection itself is gone.
fn connection_error(request: &str, e: ConnectionError) -> Error {
    Error::x11_protocol(format!("Failed to send {}: {}", request, e))
}

/// Only an error reply concerns the output; a dropped connection aborts the cycle.
fn output_reply_error(output: Output, request: &str, e: ReplyError) -> Error {
    match e {
        ReplyError::X11Error(err) => Error::property_unavailable(
            output,
            format!("{} failed: {:?}", request, err.error_kind),
        ),
        ReplyError::ConnectionError(e) => connection_error(request, e),
    }
}

pub struct X11Backend {
    conn: RustConnection,
}

impl DisplayBackend for X11Backend {
    fn query_version(&mut self) -> Result<Option<(u32, u32)>> {
        let present = self
            .conn
            .extension_information(randr::X11_EXTENSION_NAME)
            .map_err(|e| Error::x11_protocol(format!("Failed to query RandR extension: {}", e)))?
            .is_some();
        if !present {
            return Ok(None);
        }

        let (major, minor) = CLIENT_RANDR_VERSION;
        let reply = self
            .conn
            .randr_query_version(major, minor)
            .map_err(|e| Error::x11_protocol(format!("Failed to query RandR version: {}", e)))?
            .reply()
            .map_err(|e| Error::x11_protocol(format!("Failed to get RandR version reply: {}", e)))?;

        Ok(Some((reply.major_version, reply.minor_version)))
    }

    fn lookup_atom(&mut self, name: &str) -> Result<Option<Atom>> {
        let atom = self
            .conn
            .intern_atom(true, name.as_bytes())
            .map_err(|e| Error::x11_protocol(format!("Failed to intern {} atom: {}", name, e)))?
            .reply()
            .map_err(|e| {
                Error::x11_protocol(format!("Failed to get {} atom reply: {}", name, e))
            })?
            .atom;

        Ok(if atom == x11rb::NONE { None } else { Some(atom) })
    }

    fn screens(&self) -> Vec<ScreenRef> {
        self.conn.setup().roots.iter().map(|s| s.root).collect()
    }

    fn screen_outputs(&mut self, screen: ScreenRef) -> Result<Vec<Output>> {
        let resources = self
            .conn
            .randr_get_screen_resources_current(screen)
            .map_err(|e| Error::x11_protocol(format!("Failed to get screen resources: {}", e)))?
            .reply()
            .map_err(|e| {
                Error::x11_protocol(format!("Failed to get screen resources reply: {}", e))
            })?;

        Ok(resources.outputs)
    }

    fn output_name(&mut self, output: Output) -> Result<String> {
        let info = self
            .conn
            .randr_get_output_info(output, x11rb::CURRENT_TIME)
            .map_err(|e| Error::x11_protocol(format!("Failed to get output info: {}", e)))?
            .reply()
            .map_err(|e| Error::x11_protocol(format!("Failed to get output info reply: {}", e)))?;

        Ok(String::from_utf8_lossy(&info.name).to_string())
    }

    fn get_output_property(
        &mut self,
        output: Output,
        property: Atom,
    ) -> Result<OutputPropertyReply> {
        let reply = self
            .conn
            .randr_get_output_property(
                output,
                property,
                AtomEnum::ANY,
                0,
                PROPERTY_READ_LENGTH,
                false,
                false,
            )
            .map_err(|e| connection_error("GetOutputProperty", e))?
            .reply()
            .map_err(|e| output_reply_error(output, "GetOutputProperty", e))?;

        let values = if reply.format == 32 {
            reply
                .data
                .chunks_exact(4)
                .map(|b| i32::from_ne_bytes([b[0], b[1], b[2], b[3]]))
                .collect()
        } else {
            Vec::new()
        };

        Ok(OutputPropertyReply {
            type_: reply.type_,
            format: reply.format,
            num_items: reply.num_items,
            values,
        })
    }

    fn query_output_property(
        &mut self,
        output: Output,
        property: Atom,
    ) -> Result<OutputPropertyInfo> {
        let reply = self
            .conn
            .randr_query_output_property(output, property)
            .map_err(|e| connection_error("QueryOutputProperty", e))?
            .reply()
            .map_err(|e| output_reply_error(output, "QueryOutputProperty", e))?;

        Ok(OutputPropertyInfo {
            range: reply.range,
            valid_values: reply.valid_values,
        })
    }

    fn change_output_property(&mut self, output: Output, property: Atom, value: i32) -> Result<()> {
        self.conn
            .randr_change_output_property(
                output,
                property,
                AtomEnum::INTEGER.into(),
                32,
                PropMode::REPLACE,
                1,
                &value.to_ne_bytes(),
            )
            .map_err(|e| connection_error("ChangeOutputProperty", e))?
            .check()
            .map_err(|e| output_reply_error(output, "ChangeOutputProperty", e))
    }

    fn flush(&mut self) -> Result<()> {
        self.conn
            .flush()
            .map_err(|e| Error::x11_protocol(format!("Failed to flush connection: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unreachable_display_is_no_display() {
        let connector = X11Connector::new(Some(":9999".to_string()));
        let result = connector.connect();

        assert!(matches!(result, Err(Error::NoDisplay(_))));
    }

    #[test]
    fn test_dropped_connection_is_fatal() {
        let send = connection_error("GetOutputProperty", ConnectionError::UnknownError);
        assert!(matches!(send, Error::X11Protocol(_)));
        assert!(send.is_fatal());

        let reply = output_reply_error(
            0x42,
            "QueryOutputProperty",
            ReplyError::ConnectionError(ConnectionError::UnknownError),
        );
        assert!(matches!(reply, Error::X11Protocol(_)));
        assert!(reply.is_fatal());
    }

    #[test]
    fn test_default_connector_targets_env_display() {
        let connector = X11Connector::default();
        assert!(connector.display.is_none());

        // Without an X server this fails cleanly; with one it connects.
        match connector.connect() {
            Ok(mut backend) => assert!(!backend.screens().is_empty() && backend.flush().is_ok()),
            Err(e) => assert!(matches!(e, Error::NoDisplay(_))),
        }
    }
}
