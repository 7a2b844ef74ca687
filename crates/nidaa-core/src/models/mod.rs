//! Domain models for the queue system.

mod announcement;
mod clinic;
mod document;
mod log;
mod settings;

pub use announcement::*;
pub use clinic::*;
pub use document::*;
pub use log::*;
pub use settings::*;
