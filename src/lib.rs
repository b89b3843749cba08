//! EchoClip - voice clip effect core
//!
//! Loads or records a short clip, runs it through a fixed echo and voice
//! enhancement graph, and exports WAV and MP3 with a bounded history.
//!
//! # Architecture
//!
//! - [`graph`]: pure plan construction plus a backend interface; the same
//!   plan drives the live monitoring session and every offline render
//! - [`render`]: live session (built once, parameter pushes) and offline
//!   renders (disposable graph per call)
//! - [`codec`]: float PCM to 16-bit WAV and 128 kbps MP3
//! - [`state`]: history, configuration and the [`Studio`](state::Studio) root

pub mod cli;
pub mod codec;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod graph;
pub mod render;
pub mod state;

pub use error::{EchoClipError, Result};
