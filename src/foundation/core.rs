use std::{fmt, str::FromStr};

use crate::foundation::error::{StillcutError, StillcutResult};

/// Position of a frame in the input sequence (0-based).
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
pub struct FrameIndex(pub u64);

impl fmt::Display for FrameIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Rational media time: `value / timescale` seconds.
///
/// Two times with different timescales compare by their exact rational value.
#[derive(Clone, Copy, Debug, serde::Serialize, serde::Deserialize)]
pub struct MediaTime {
    pub value: u64,
    pub timescale: u32, // must be > 0
}

impl MediaTime {
    /// Time zero.
    pub const ZERO: Self = Self {
        value: 0,
        timescale: 1,
    };

    /// Create a media time. `timescale` must be non-zero.
    pub fn new(value: u64, timescale: u32) -> StillcutResult<Self> {
        if timescale == 0 {
            return Err(StillcutError::validation("MediaTime timescale must be > 0"));
        }
        Ok(Self { value, timescale })
    }

    pub fn is_zero(self) -> bool {
        self.value == 0
    }

    /// `self × n`, keeping the timescale.
    pub fn checked_mul(self, n: u64) -> Option<Self> {
        self.value.checked_mul(n).map(|value| Self {
            value,
            timescale: self.timescale,
        })
    }

    /// Sum of two times. Timescales must match; mixed timescales are rescaled to the product.
    pub fn checked_add(self, other: Self) -> Option<Self> {
        if self.timescale == other.timescale {
            return self.value.checked_add(other.value).map(|value| Self {
                value,
                timescale: self.timescale,
            });
        }
        let timescale = self.timescale.checked_mul(other.timescale)?;
        let a = self.value.checked_mul(u64::from(other.timescale))?;
        let b = other.value.checked_mul(u64::from(self.timescale))?;
        a.checked_add(b).map(|value| Self { value, timescale })
    }

    fn cross(self, other: Self) -> (u128, u128) {
        (
            u128::from(self.value) * u128::from(other.timescale),
            u128::from(other.value) * u128::from(self.timescale),
        )
    }
}

impl PartialEq for MediaTime {
    fn eq(&self, other: &Self) -> bool {
        let (a, b) = self.cross(*other);
        a == b
    }
}

impl Eq for MediaTime {}

impl PartialOrd for MediaTime {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for MediaTime {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let (a, b) = self.cross(*other);
        a.cmp(&b)
    }
}

impl fmt::Display for MediaTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.value, self.timescale)
    }
}

/// Parses `"value/timescale"` (e.g. `"1/5"`) or a bare integer number of seconds.
impl FromStr for MediaTime {
    type Err = StillcutError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let (value, timescale) = match s.split_once('/') {
            Some((v, t)) => (v.trim(), t.trim()),
            None => (s, "1"),
        };
        let value = value
            .parse::<u64>()
            .map_err(|e| StillcutError::validation(format!("invalid time value '{value}': {e}")))?;
        let timescale = timescale.parse::<u32>().map_err(|e| {
            StillcutError::validation(format!("invalid timescale '{timescale}': {e}"))
        })?;
        Self::new(value, timescale)
    }
}

/// Maps frame indices onto presentation timestamps: `timestamp(i) = i × frame_duration`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PresentationClock {
    frame_duration: MediaTime,
}

impl PresentationClock {
    /// Five frames per second.
    pub const DEFAULT_FRAME_DURATION: MediaTime = MediaTime {
        value: 1,
        timescale: 5,
    };

    pub fn new(frame_duration: MediaTime) -> StillcutResult<Self> {
        if frame_duration.timescale == 0 {
            return Err(StillcutError::validation("frame duration timescale must be > 0"));
        }
        if frame_duration.is_zero() {
            return Err(StillcutError::validation("frame duration must be > 0"));
        }
        Ok(Self { frame_duration })
    }

    pub fn frame_duration(&self) -> MediaTime {
        self.frame_duration
    }

    /// Presentation timestamp of `frame`. Frame 0 is presented at time zero.
    pub fn timestamp(&self, frame: FrameIndex) -> StillcutResult<MediaTime> {
        self.frame_duration.checked_mul(frame.0).ok_or_else(|| {
            StillcutError::validation(format!("presentation time overflow at frame {frame}"))
        })
    }
}

impl Default for PresentationClock {
    fn default() -> Self {
        Self {
            frame_duration: Self::DEFAULT_FRAME_DURATION,
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/core.rs"]
mod tests;
