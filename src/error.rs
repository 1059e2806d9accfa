use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("Cannot open display: {0}\n\nThis usually means:\n1. No X server is running for this session\n2. $DISPLAY points at the wrong server\n3. The X server refused the connection (check xhost / Xauthority)")]
    NoDisplay(String),

    #[error("{}", unsupported_protocol_message(.found))]
    UnsupportedProtocol { found: Option<(u32, u32)> },

    #[error("No outputs have a backlight property (neither \"Backlight\" nor \"BACKLIGHT\" is known to the server)")]
    NoBacklightProperty,

    #[error("Output {output:#x} has no usable backlight property: {reason}")]
    PropertyUnavailable { output: u32, reason: String },

    #[error("X11 protocol error: {0}")]
    X11Protocol(String),

    #[error("Session used out of order: {0}")]
    SessionState(String),

    #[error("Invalid brightness value: {0}")]
    InvalidBrightness(String),

    #[error("Configuration error at {location}: {message}")]
    Config { location: String, message: String },

    #[error("Configuration file syntax error: {0}")]
    ConfigSyntax(String),

    #[error("Configuration validation failed: {0}")]
    ConfigValidation(String),
}

fn unsupported_protocol_message(found: &Option<(u32, u32)>) -> String {
    match found {
        Some((major, minor)) => format!(
            "RandR extension version {}.{} is too old (1.2 or newer required)",
            major, minor
        ),
        None => "The X server does not have the RandR extension".to_string(),
    }
}

impl Error {
    /// Create an X11 protocol error
    pub fn x11_protocol(message: impl Into<String>) -> Self {
        Error::X11Protocol(message.into())
    }

    /// Create a per-output property error
    pub fn property_unavailable(output: u32, reason: impl Into<String>) -> Self {
        Error::PropertyUnavailable {
            output,
            reason: reason.into(),
        }
    }

    /// Create a configuration error with location context
    pub fn config_error(location: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Config {
            location: location.into(),
            message: message.into(),
        }
    }

    /// Check if this error aborts a whole control cycle.
    ///
    /// `PropertyUnavailable` only concerns a single output, which is skipped.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, Error::PropertyUnavailable { .. })
    }

    /// Check if this error is a configuration error
    pub fn is_config_error(&self) -> bool {
        matches!(
            self,
            Error::Config { .. } | Error::ConfigSyntax(_) | Error::ConfigValidation(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, Error>;
