//! Orientation buckets
//!
//! Frames are compared against 16:9 in long-edge/short-edge space so that
//! landscape and portrait share the same tolerance band.

use serde::Serialize;
use std::fmt;

/// Maximum absolute ratio difference still counted as a match
pub const RATIO_TOLERANCE: f64 = 0.001;

const WIDESCREEN: f64 = 16.0 / 9.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OrientationBucket {
    Landscape,
    Portrait,
    Other,
}

impl OrientationBucket {
    /// Storage path segment for this bucket
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Landscape => "landscape",
            Self::Portrait => "portrait",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for OrientationBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Classify a frame by its pixel dimensions
///
/// Both bands are measured as long edge over short edge against 16/9.
/// Portrait is `|h/w - 16/9| <= 0.001`, which is narrower than comparing
/// `w/h` against 9/16 would be: 1081x1920 is `Other`, not `Portrait`.
pub fn classify(width: u32, height: u32) -> OrientationBucket {
    if width == 0 || height == 0 {
        return OrientationBucket::Other;
    }

    let (w, h) = (f64::from(width), f64::from(height));

    if (w / h - WIDESCREEN).abs() <= RATIO_TOLERANCE {
        OrientationBucket::Landscape
    } else if (h / w - WIDESCREEN).abs() <= RATIO_TOLERANCE {
        OrientationBucket::Portrait
    } else {
        OrientationBucket::Other
    }
}
