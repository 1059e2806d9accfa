// Backlight property resolution
// Picks between the "Backlight" and legacy "BACKLIGHT" output property names

use crate::backend::{Atom, DisplayBackend};
use crate::session::{Session, SessionState};
use crate::{Error, Result};
use serde::Serialize;
use tracing::{debug, warn};

pub const NEW_STYLE_NAME: &str = "Backlight";
pub const LEGACY_STYLE_NAME: &str = "BACKLIGHT";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PropertyId {
    NewStyle,
    LegacyStyle,
    Unresolved,
}

impl PropertyId {
    /// Property name as interned on the server.
    pub fn name(&self) -> Option<&'static str> {
        match self {
            PropertyId::NewStyle => Some(NEW_STYLE_NAME),
            PropertyId::LegacyStyle => Some(LEGACY_STYLE_NAME),
            PropertyId::Unresolved => None,
        }
    }
}

/// Which of the two property atoms exist in a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedProperty {
    new_style: Option<Atom>,
    legacy_style: Option<Atom>,
}

impl ResolvedProperty {
    pub fn new(new_style: Option<Atom>, legacy_style: Option<Atom>) -> Self {
        Self {
            new_style,
            legacy_style,
        }
    }

    /// Session-wide identifier, new style first.
    pub fn preferred(&self) -> PropertyId {
        if self.new_style.is_some() {
            PropertyId::NewStyle
        } else if self.legacy_style.is_some() {
            PropertyId::LegacyStyle
        } else {
            PropertyId::Unresolved
        }
    }

    pub fn atom(&self, id: PropertyId) -> Option<Atom> {
        match id {
            PropertyId::NewStyle => self.new_style,
            PropertyId::LegacyStyle => self.legacy_style,
            PropertyId::Unresolved => None,
        }
    }

    /// Identifiers to try on a single output: the preferred one, then the legacy fallback.
    pub fn candidates(&self) -> Vec<(PropertyId, Atom)> {
        [PropertyId::NewStyle, PropertyId::LegacyStyle]
            .into_iter()
            .filter_map(|id| self.atom(id).map(|atom| (id, atom)))
            .collect()
    }
}

pub struct PropertyResolver;

impl PropertyResolver {
    /// Look up both property names once per session; later calls reuse the result.
    ///
    /// Names are looked up without being created, so absence is detectable.
    pub fn resolve<B: DisplayBackend>(session: &mut Session<B>) -> Result<ResolvedProperty> {
        session.require(SessionState::CapabilityChecked, "resolve backlight property")?;

        if let Some(resolved) = session.resolved {
            return Ok(resolved);
        }

        let new_style = session.backend().lookup_atom(NEW_STYLE_NAME)?;
        let legacy_style = session.backend().lookup_atom(LEGACY_STYLE_NAME)?;
        let resolved = ResolvedProperty::new(new_style, legacy_style);

        match resolved.preferred() {
            PropertyId::Unresolved => {
                warn!("No outputs have backlight property");
                session.resolved = Some(resolved);
            }
            id => {
                debug!("Session backlight property resolved to {:?}", id);
                session.mark_resolved(resolved);
            }
        }

        Ok(resolved)
    }

    /// Like `resolve`, but an unresolved session is an error.
    pub fn require<B: DisplayBackend>(session: &mut Session<B>) -> Result<ResolvedProperty> {
        let resolved = Self::resolve(session)?;
        if resolved.preferred() == PropertyId::Unresolved {
            return Err(Error::NoBacklightProperty);
        }
        Ok(resolved)
    }
}
