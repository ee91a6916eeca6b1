//! Target attention dashboard: per-target publication trends styled by clinical phase and
//! colored by recent attention score.

pub mod colors;
pub mod data;
pub mod figure;
pub mod interaction;
pub mod logging;
pub mod server;
pub mod state;
pub mod traces;
