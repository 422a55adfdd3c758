//! Utilities shared by the roomchat binaries and libraries.

pub mod logger;
pub mod time;
