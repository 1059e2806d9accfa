// Display server session
// One connection per control cycle: Closed -> Opened -> CapabilityChecked -> PropertyResolved -> Closed

use crate::backend::{Connect, DisplayBackend};
use crate::property::ResolvedProperty;
use crate::{Error, Result};
use tracing::{debug, warn};

/// Oldest RandR version with output properties.
pub const MIN_RANDR_VERSION: (u32, u32) = (1, 2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SessionState {
    Closed,
    Opened,
    CapabilityChecked,
    PropertyResolved,
}

pub struct Session<B: DisplayBackend> {
    backend: B,
    version: Option<(u32, u32)>,
    state: SessionState,
    pub(crate) resolved: Option<ResolvedProperty>,
}

impl<B: DisplayBackend> Session<B> {
    /// Connect to the display server.
    ///
    /// Fails with `NoDisplay` when the server is unreachable.
    pub fn open<C>(connector: &C) -> Result<Self>
    where
        C: Connect<Backend = B>,
    {
        let backend = connector.connect()?;
        Ok(Self::from_backend(backend))
    }

    /// Wrap an already connected backend.
    pub fn from_backend(backend: B) -> Self {
        Self {
            backend,
            version: None,
            state: SessionState::Opened,
            resolved: None,
        }
    }

    /// Require RandR 1.2 or newer.
    ///
    /// Fails with `UnsupportedProtocol` when the extension is absent or older.
    pub fn check_capability(&mut self) -> Result<(u32, u32)> {
        self.require(SessionState::Opened, "check capability")?;

        let version = self.backend.query_version()?;
        self.version = version;

        match version {
            None => {
                warn!("Server doesn't have the RandR extension");
                Err(Error::UnsupportedProtocol { found: None })
            }
            Some(found) if found < MIN_RANDR_VERSION => {
                warn!("RandR extension version {}.{} too old", found.0, found.1);
                Err(Error::UnsupportedProtocol { found: Some(found) })
            }
            Some(found) => {
                debug!("RandR {}.{}", found.0, found.1);
                if self.state < SessionState::CapabilityChecked {
                    self.state = SessionState::CapabilityChecked;
                }
                Ok(found)
            }
        }
    }

    /// Flush pending requests. The connection itself is released on drop.
    pub fn close(&mut self) -> Result<()> {
        if self.state == SessionState::Closed {
            return Ok(());
        }
        self.state = SessionState::Closed;
        self.resolved = None;
        self.backend.flush()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Version reported by the last capability check.
    pub fn version(&self) -> Option<(u32, u32)> {
        self.version
    }

    pub(crate) fn backend(&mut self) -> &mut B {
        &mut self.backend
    }

    pub(crate) fn mark_resolved(&mut self, resolved: ResolvedProperty) {
        self.resolved = Some(resolved);
        self.state = SessionState::PropertyResolved;
    }

    /// Fail unless the session has reached at least `needed` and is still open.
    pub(crate) fn require(&self, needed: SessionState, op: &str) -> Result<()> {
        if self.state == SessionState::Closed {
            return Err(Error::SessionState(format!("cannot {} on a closed session", op)));
        }
        if self.state < needed {
            return Err(Error::SessionState(format!(
                "cannot {} in state {:?} (needs {:?})",
                op, self.state, needed
            )));
        }
        Ok(())
    }
}

impl<B: DisplayBackend> Drop for Session<B> {
    fn drop(&mut self) {
        if self.state != SessionState::Closed {
            if let Err(e) = self.backend.flush() {
                debug!("Flush on drop failed: {}", e);
            }
        }
    }
}
