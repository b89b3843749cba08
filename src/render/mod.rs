//! Rendering
//!
//! Two disciplines over the same graph plan:
//! - [`live`]: one persistent monitoring graph with in-place parameter pushes
//! - [`offline`]: a disposable graph per render, run to completion

pub mod live;
pub mod offline;

pub use live::{LiveSession, SessionState};
pub use offline::{render_offline, render_offline_async, render_preview};
