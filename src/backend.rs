// Display server seam
// Protocol-level requests the brightness engine needs, independent of the transport

use crate::Result;

/// Server-side atom identifier (`0` is `None`).
pub type Atom = u32;

/// RandR output identifier, valid only within the resource snapshot that produced it.
pub type Output = u32;

/// Root window of a screen.
pub type ScreenRef = u32;

/// Predefined `INTEGER` atom from the core protocol.
pub const INTEGER_ATOM: Atom = 19;

/// Raw shape of a `RRGetOutputProperty` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPropertyReply {
    pub type_: Atom,
    pub format: u8,
    pub num_items: u32,
    /// 32-bit items, already decoded from the reply bytes. Empty unless `format == 32`.
    pub values: Vec<i32>,
}

impl OutputPropertyReply {
    /// The single 32-bit integer this reply carries, if it has exactly that shape.
    pub fn as_integer_scalar(&self) -> Option<i32> {
        if self.type_ == INTEGER_ATOM
            && self.format == 32
            && self.num_items == 1
            && self.values.len() == 1
        {
            Some(self.values[0])
        } else {
            None
        }
    }
}

/// Raw shape of a `RRQueryOutputProperty` reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputPropertyInfo {
    pub range: bool,
    pub valid_values: Vec<i32>,
}

/// Blocking round-trips to a display server.
///
/// Every method maps onto a single request of the core protocol or the RandR
/// extension. Shape validation is left to the caller.
pub trait DisplayBackend {
    /// RandR version negotiated with the server, or `None` when the extension is absent.
    fn query_version(&mut self) -> Result<Option<(u32, u32)>>;

    /// Look up an atom without creating it. `None` when the name is unknown to the server.
    fn lookup_atom(&mut self, name: &str) -> Result<Option<Atom>>;

    /// Root windows of every screen, in server order.
    fn screens(&self) -> Vec<ScreenRef>;

    /// Outputs from the screen's current resource snapshot.
    fn screen_outputs(&mut self, screen: ScreenRef) -> Result<Vec<Output>>;

    /// Connector name (e.g. `eDP-1`).
    fn output_name(&mut self, output: Output) -> Result<String>;

    fn get_output_property(&mut self, output: Output, property: Atom)
        -> Result<OutputPropertyReply>;

    fn query_output_property(&mut self, output: Output, property: Atom)
        -> Result<OutputPropertyInfo>;

    /// Replace the property with a single 32-bit integer.
    fn change_output_property(&mut self, output: Output, property: Atom, value: i32)
        -> Result<()>;

    /// Push pending requests to the server.
    fn flush(&mut self) -> Result<()>;
}

/// Opens fresh backend connections, one per control cycle.
pub trait Connect {
    type Backend: DisplayBackend;

    fn connect(&self) -> Result<Self::Backend>;
}
