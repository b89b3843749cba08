//! State Management Module
//!
//! Session state owned by the application root: configuration, render
//! history and the [`Studio`] itself.

pub mod config;
pub mod history;
pub mod studio;

pub use config::StudioConfig;
pub use history::{History, RenderResult, RenderSummary, DEFAULT_HISTORY_CAPACITY};
pub use studio::{LoadedClip, Status, StatusLevel, Studio};
