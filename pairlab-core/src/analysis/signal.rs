//! Z-score band signals.
//!
//! Each observation falls in exactly one band:
//!
//! | z-score                     | raw signal |
//! |-----------------------------|------------|
//! | `z > entry`                 | Short      |
//! | `z < -entry`                | Long       |
//! | `abs(z) < exit`             | Flat       |
//! | otherwise, or no z-score    | hold       |
//!
//! "Hold" carries the previous position forward; before any band is hit the
//! position is flat.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{PairError, PairResult};

/// Spread position. Long buys A and sells B; Short does the opposite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    Long,
    Flat,
    Short,
}

impl Position {
    pub fn as_i8(self) -> i8 {
        match self {
            Position::Long => 1,
            Position::Flat => 0,
            Position::Short => -1,
        }
    }

    pub fn as_f64(self) -> f64 {
        f64::from(self.as_i8())
    }

    pub fn is_flat(self) -> bool {
        self == Position::Flat
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_i8())
    }
}

/// Rolling window and band thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub window: usize,
    pub entry_threshold: f64,
    pub exit_threshold: f64,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            window: 30,
            entry_threshold: 1.5,
            exit_threshold: 0.5,
        }
    }
}

impl SignalConfig {
    /// Reject windows below 2 and bands that are negative, non-finite or
    /// overlapping.
    pub fn validate(&self) -> PairResult<()> {
        if self.window < 2 {
            return Err(PairError::invalid(
                "window",
                format!("must be at least 2, got {}", self.window),
            ));
        }
        for (field, value) in [
            ("entry_threshold", self.entry_threshold),
            ("exit_threshold", self.exit_threshold),
        ] {
            if !value.is_finite() || value < 0.0 {
                return Err(PairError::invalid(
                    field,
                    format!("must be finite and non-negative, got {value}"),
                ));
            }
        }
        if self.exit_threshold >= self.entry_threshold {
            return Err(PairError::invalid(
                "exit_threshold",
                format!(
                    "must be below entry_threshold ({} >= {})",
                    self.exit_threshold, self.entry_threshold
                ),
            ));
        }
        Ok(())
    }
}

/// Band lookup per observation; `None` means hold.
pub fn raw_signals(zscores: &[Option<f64>], config: &SignalConfig) -> Vec<Option<Position>> {
    zscores
        .iter()
        .map(|z| {
            let z = (*z)?;
            if z > config.entry_threshold {
                Some(Position::Short)
            } else if z < -config.entry_threshold {
                Some(Position::Long)
            } else if z.abs() < config.exit_threshold {
                Some(Position::Flat)
            } else {
                None
            }
        })
        .collect()
}

/// Carry the last determined position through undetermined steps.
pub fn forward_fill(raw: &[Option<Position>]) -> Vec<Position> {
    let mut current = Position::Flat;
    raw.iter()
        .map(|r| {
            if let Some(p) = r {
                current = *p;
            }
            current
        })
        .collect()
}

/// Positions held at each step.
pub fn generate_signals(zscores: &[Option<f64>], config: &SignalConfig) -> Vec<Position> {
    forward_fill(&raw_signals(zscores, config))
}

/// Number of steps where the position differs from the previous one.
pub fn position_changes(signals: &[Position]) -> usize {
    signals.windows(2).filter(|w| w[0] != w[1]).count()
}
