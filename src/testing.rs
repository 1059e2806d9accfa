// In-memory display server for unit tests

use crate::backend::{
    Atom, Connect, DisplayBackend, Output, OutputPropertyInfo, OutputPropertyReply, ScreenRef,
    INTEGER_ATOM,
};
use crate::property::{LEGACY_STYLE_NAME, NEW_STYLE_NAME};
use crate::{Error, Result};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet};
use std::rc::Rc;

pub const NEW_ATOM: Atom = 300;
pub const LEGACY_ATOM: Atom = 301;

#[derive(Debug, Clone)]
pub struct FakeScreen {
    pub root: ScreenRef,
    /// `None` makes the resource snapshot request fail.
    pub outputs: Option<Vec<Output>>,
}

#[derive(Debug, Clone)]
pub struct FakeProperty {
    pub reply: OutputPropertyReply,
    pub info: Option<OutputPropertyInfo>,
}

#[derive(Debug, Default)]
pub struct FakeState {
    pub unreachable: bool,
    pub version: Option<(u32, u32)>,
    pub atoms: HashMap<String, Atom>,
    pub screens: Vec<FakeScreen>,
    pub properties: HashMap<(Output, Atom), FakeProperty>,
    pub names: HashMap<Output, String>,
    /// Reads answered with an error reply (BadName and friends).
    pub failing_reads: HashSet<(Output, Atom)>,
    /// Reads that find the connection gone.
    pub lost_reads: HashSet<(Output, Atom)>,
    pub writes: Vec<(Output, Atom, i32)>,
    pub flushes: usize,
    pub connects: usize,
}

/// Shared handle: every `connect()` sees and mutates the same state.
#[derive(Debug, Clone, Default)]
pub struct FakeServer {
    pub state: Rc<RefCell<FakeState>>,
}

impl FakeServer {
    /// RandR 1.2 with both property names interned and no screens yet.
    pub fn new() -> Self {
        let server = Self::default();
        {
            let mut state = server.state.borrow_mut();
            state.version = Some((1, 2));
            state.atoms.insert(NEW_STYLE_NAME.to_string(), NEW_ATOM);
            state.atoms.insert(LEGACY_STYLE_NAME.to_string(), LEGACY_ATOM);
        }
        server
    }

    pub fn unreachable() -> Self {
        let server = Self::new();
        server.state.borrow_mut().unreachable = true;
        server
    }

    pub fn with_version(self, version: Option<(u32, u32)>) -> Self {
        self.state.borrow_mut().version = version;
        self
    }

    pub fn without_atom(self, name: &str) -> Self {
        self.state.borrow_mut().atoms.remove(name);
        self
    }

    pub fn with_screen(self, root: ScreenRef, outputs: Option<Vec<Output>>) -> Self {
        self.state
            .borrow_mut()
            .screens
            .push(FakeScreen { root, outputs });
        self
    }

    /// Integer backlight property with a bounded `[min, max]` range.
    pub fn with_backlight(self, output: Output, atom: Atom, value: i32, min: i32, max: i32) -> Self {
        self.with_property(
            output,
            atom,
            integer_reply(value),
            Some(OutputPropertyInfo {
                range: true,
                valid_values: vec![min, max],
            }),
        )
    }

    pub fn with_property(
        self,
        output: Output,
        atom: Atom,
        reply: OutputPropertyReply,
        info: Option<OutputPropertyInfo>,
    ) -> Self {
        self.state
            .borrow_mut()
            .properties
            .insert((output, atom), FakeProperty { reply, info });
        self
    }

    pub fn with_failing_read(self, output: Output, atom: Atom) -> Self {
        self.state.borrow_mut().failing_reads.insert((output, atom));
        self
    }

    pub fn with_lost_connection_on_read(self, output: Output, atom: Atom) -> Self {
        self.state.borrow_mut().lost_reads.insert((output, atom));
        self
    }

    pub fn with_name(self, output: Output, name: &str) -> Self {
        self.state.borrow_mut().names.insert(output, name.to_string());
        self
    }

    pub fn writes(&self) -> Vec<(Output, Atom, i32)> {
        self.state.borrow().writes.clone()
    }

    pub fn value(&self, output: Output, atom: Atom) -> Option<i32> {
        self.state
            .borrow()
            .properties
            .get(&(output, atom))
            .and_then(|p| p.reply.as_integer_scalar())
    }
}

pub fn integer_reply(value: i32) -> OutputPropertyReply {
    OutputPropertyReply {
        type_: INTEGER_ATOM,
        format: 32,
        num_items: 1,
        values: vec![value],
    }
}

impl Connect for FakeServer {
    type Backend = FakeBackend;

    fn connect(&self) -> Result<FakeBackend> {
        let mut state = self.state.borrow_mut();
        if state.unreachable {
            return Err(Error::NoDisplay(":fake: connection refused".to_string()));
        }
        state.connects += 1;
        Ok(FakeBackend {
            state: Rc::clone(&self.state),
        })
    }
}

pub struct FakeBackend {
    state: Rc<RefCell<FakeState>>,
}

impl DisplayBackend for FakeBackend {
    fn query_version(&mut self) -> Result<Option<(u32, u32)>> {
        Ok(self.state.borrow().version)
    }

    fn lookup_atom(&mut self, name: &str) -> Result<Option<Atom>> {
        Ok(self.state.borrow().atoms.get(name).copied())
    }

    fn screens(&self) -> Vec<ScreenRef> {
        self.state.borrow().screens.iter().map(|s| s.root).collect()
    }

    fn screen_outputs(&mut self, screen: ScreenRef) -> Result<Vec<Output>> {
        let state = self.state.borrow();
        let screen = state
            .screens
            .iter()
            .find(|s| s.root == screen)
            .ok_or_else(|| Error::x11_protocol(format!("BadWindow {:#x}", screen)))?;
        screen
            .outputs
            .clone()
            .ok_or_else(|| Error::x11_protocol("screen resources unavailable"))
    }

    fn output_name(&mut self, output: Output) -> Result<String> {
        Ok(self
            .state
            .borrow()
            .names
            .get(&output)
            .cloned()
            .unwrap_or_else(|| format!("OUT-{}", output)))
    }

    fn get_output_property(
        &mut self,
        output: Output,
        property: Atom,
    ) -> Result<OutputPropertyReply> {
        let state = self.state.borrow();
        if state.lost_reads.contains(&(output, property)) {
            return Err(Error::x11_protocol("Failed to send GetOutputProperty: broken pipe"));
        }
        if state.failing_reads.contains(&(output, property)) {
            return Err(Error::property_unavailable(output, "GetOutputProperty failed: BadAtom"));
        }
        match state.properties.get(&(output, property)) {
            Some(p) => Ok(p.reply.clone()),
            // An absent property reads back as type None with no data
            None => Ok(OutputPropertyReply {
                type_: 0,
                format: 0,
                num_items: 0,
                values: Vec::new(),
            }),
        }
    }

    fn query_output_property(
        &mut self,
        output: Output,
        property: Atom,
    ) -> Result<OutputPropertyInfo> {
        self.state
            .borrow()
            .properties
            .get(&(output, property))
            .and_then(|p| p.info.clone())
            .ok_or_else(|| Error::property_unavailable(output, "BadName"))
    }

    fn change_output_property(&mut self, output: Output, property: Atom, value: i32) -> Result<()> {
        let mut state = self.state.borrow_mut();
        let prop = state
            .properties
            .get_mut(&(output, property))
            .ok_or_else(|| Error::property_unavailable(output, "BadName"))?;
        prop.reply = integer_reply(value);
        state.writes.push((output, property, value));
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.state.borrow_mut().flushes += 1;
        Ok(())
    }
}
