//! Telemetry setup

mod init;

pub use init::init_telemetry;
