//! Configuration management for playback, cache, and acquisition settings

pub mod settings;

#[cfg(test)]
mod tests;

pub use settings::{ConfigError, Settings};
