//! Command implementations for the naarad CLI

mod alerts;
mod auth;
mod misc;
mod wizard;

pub use alerts::*;
pub use auth::*;
pub use misc::*;
pub use wizard::*;
