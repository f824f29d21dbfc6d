//! Kline shape and combination detectors
//!
//! - **Single-bar**: shape taxonomy and strength tiers ([`SingleBarClassifier`])
//! - **Two-bar**: engulfing pattern ([`EngulfingDetector`])
//! - **Three-bar**: star slot, currently inert ([`StarDetector`])

pub mod helpers;

pub mod single_bar;
pub mod three_bar;
pub mod two_bar;

pub use helpers::*;
pub use single_bar::*;
pub use three_bar::*;
pub use two_bar::*;
