//! Command implementations.

pub mod absence;
pub mod replay;
pub mod run;
pub mod setup;
pub mod status;
