//! Library side of the `rxlink` command: logging setup, configuration, and
//! batch file handling.

pub mod batch;
pub mod config;
pub mod logging;
