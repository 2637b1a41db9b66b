//! Frame Watcher
//!
//! Keeps a Samsung Frame TV in Art Mode whenever the Apple TV feeding it is
//! off, and lets live video through while it is on.

pub mod config;
pub mod display;
pub mod paths;
pub mod player;
pub mod retry;
pub mod watcher;

pub use config::AppConfig;
pub use watcher::{LoopState, Watcher, WatcherTimings};
