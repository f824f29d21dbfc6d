//! Three-bar combination detector
//!
//! Star-type three-bar combinations are not recognized. The detector stays registered
//! so the combination scan keeps a three-bar slot; it never produces a match.

use crate::{PatternDetector, PatternId, PatternMatch, OHLCV};

/// Three-bar star detector (never matches)
#[derive(Debug, Clone, Copy, Default)]
pub struct StarDetector;

impl StarDetector {
    pub fn with_defaults() -> Self {
        Self
    }
}

impl PatternDetector for StarDetector {
    fn id(&self) -> PatternId {
        PatternId("STAR")
    }

    fn min_bars(&self) -> usize {
        3
    }

    fn detect<T: OHLCV>(&self, _bars: &[T], _index: usize) -> Option<PatternMatch> {
        None
    }
}
