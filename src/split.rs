//! Train/test split selection.

use std::fmt;
use std::str::FromStr;

use rand::Rng;
use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Which partition the converted data goes to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SplitMode {
    /// Everything goes to the training files.
    #[default]
    Train,
    /// Everything goes to the test files.
    Test,
    /// The given percentage goes to test, the remainder to train.
    Percent(f64),
}

impl SplitMode {
    /// Fraction of the data assigned to the test partition.
    #[must_use]
    pub fn test_ratio(self) -> f64 {
        match self {
            Self::Train => 0.0,
            Self::Test => 1.0,
            Self::Percent(p) => p / 100.0,
        }
    }

    /// Index separating train (before) from test (from here on) items.
    #[must_use]
    pub fn split_index(self, count: usize) -> usize {
        match self {
            Self::Train => count,
            Self::Test => 0,
            Self::Percent(_) => {
                let train = (count as f64 * (1.0 - self.test_ratio())).floor() as usize;
                train.min(count)
            }
        }
    }

    /// Whether the training files are written in this mode.
    #[must_use]
    pub fn writes_train(self) -> bool {
        !matches!(self, Self::Test)
    }

    /// Whether the test files are written in this mode.
    #[must_use]
    pub fn writes_test(self) -> bool {
        !matches!(self, Self::Train)
    }
}

impl FromStr for SplitMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "train" => Ok(Self::Train),
            "test" => Ok(Self::Test),
            other => match other.parse::<f64>() {
                Ok(p) if (0.0..=100.0).contains(&p) => Ok(Self::Percent(p)),
                _ => Err(Error::InvalidSplit(s.to_string())),
            },
        }
    }
}

impl fmt::Display for SplitMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Train => write!(f, "train"),
            Self::Test => write!(f, "test"),
            Self::Percent(p) => write!(f, "{p}%"),
        }
    }
}

/// Shuffle the whole sample pool in place.
pub fn shuffle<T, R: Rng + ?Sized>(items: &mut [T], rng: &mut R) {
    items.shuffle(rng);
}
