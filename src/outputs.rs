// Output enumeration
// Walks every screen of a session and every output in each screen's current resources

use crate::backend::{DisplayBackend, Output, ScreenRef};
use crate::session::{Session, SessionState};
use crate::Result;
use serde::Serialize;
use std::collections::VecDeque;
use tracing::{debug, warn};

/// An output together with the screen it was found on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OutputRef {
    pub screen_index: usize,
    pub screen: ScreenRef,
    pub output: Output,
}

pub struct OutputEnumerator;

impl OutputEnumerator {
    pub fn list_screens<B: DisplayBackend>(session: &mut Session<B>) -> Result<Vec<ScreenRef>> {
        session.require(SessionState::Opened, "list screens")?;
        Ok(session.backend().screens())
    }

    /// Outputs of one screen. A failed resource snapshot yields no outputs.
    pub fn list_outputs<B: DisplayBackend>(
        session: &mut Session<B>,
        screen: ScreenRef,
    ) -> Result<Vec<Output>> {
        session.require(SessionState::Opened, "list outputs")?;
        match session.backend().screen_outputs(screen) {
            Ok(outputs) => {
                debug!("Screen {:#x}: {} output(s)", screen, outputs.len());
                Ok(outputs)
            }
            Err(e) => {
                warn!("Skipping screen {:#x}: {}", screen, e);
                Ok(Vec::new())
            }
        }
    }

    /// Connector name of an output, if the server will tell us.
    pub fn output_name<B: DisplayBackend>(
        session: &mut Session<B>,
        output: Output,
    ) -> Option<String> {
        session.require(SessionState::Opened, "get output name").ok()?;
        match session.backend().output_name(output) {
            Ok(name) => Some(name),
            Err(e) => {
                debug!("No name for output {:#x}: {}", output, e);
                None
            }
        }
    }

    /// Start a fresh walk over the session's topology.
    pub fn walk<B: DisplayBackend>(session: &mut Session<B>) -> Result<OutputWalk> {
        let screens = Self::list_screens(session)?;
        Ok(OutputWalk {
            screens,
            next_screen: 0,
            pending: VecDeque::new(),
        })
    }

    /// Every output of every screen, in enumeration order.
    pub fn all<B: DisplayBackend>(session: &mut Session<B>) -> Result<Vec<OutputRef>> {
        let mut walk = Self::walk(session)?;
        let mut outputs = Vec::new();
        while let Some(output) = walk.next_output(session)? {
            outputs.push(output);
        }
        Ok(outputs)
    }
}

/// Lazy walk: a screen's resources are only requested once the walk reaches it.
///
/// The walk does not borrow the session, so the caller can issue requests on
/// each output between steps.
#[derive(Debug)]
pub struct OutputWalk {
    screens: Vec<ScreenRef>,
    next_screen: usize,
    pending: VecDeque<OutputRef>,
}

impl OutputWalk {
    pub fn next_output<B: DisplayBackend>(
        &mut self,
        session: &mut Session<B>,
    ) -> Result<Option<OutputRef>> {
        loop {
            if let Some(output) = self.pending.pop_front() {
                return Ok(Some(output));
            }
            let Some(&screen) = self.screens.get(self.next_screen) else {
                return Ok(None);
            };
            let screen_index = self.next_screen;
            self.next_screen += 1;

            let outputs = OutputEnumerator::list_outputs(session, screen)?;
            self.pending.extend(outputs.into_iter().map(|output| OutputRef {
                screen_index,
                screen,
                output,
            }));
        }
    }
}
