//! Audible and visual rendering of queue announcements.
//!
//! The display view listens for store changes, picks up announcements it has
//! not processed yet and hands them to the [`AnnouncementPipeline`]:
//! chime, settling delay, then speech or a playlist of pre-recorded Arabic
//! fragments. Playback failures never propagate.

pub mod display;
pub mod fragments;
pub mod listener;
pub mod phrases;
pub mod pipeline;

pub use display::*;
pub use fragments::*;
pub use listener::*;
pub use pipeline::*;
