// Core library modules
pub mod backend;
pub mod brightness;
pub mod config;
pub mod error;
pub mod outputs;
pub mod panel;
pub mod property;
pub mod session;
pub mod x11;

#[cfg(test)]
mod testing;

pub use error::{Error, Result};
