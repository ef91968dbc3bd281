// Push-channel sessions for the reference server

pub mod manager;

pub use manager::{build_snapshot, validate_config, PushSession, SessionSettings};
