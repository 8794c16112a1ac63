use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{AnalyticsError, Result};

/// Position held for one period: short, flat or long.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Position {
    Short,
    #[default]
    Flat,
    Long,
}

impl Position {
    pub fn direction(&self) -> i8 {
        match self {
            Position::Short => -1,
            Position::Flat => 0,
            Position::Long => 1,
        }
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.direction())
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Position::Short => "SHORT",
            Position::Flat => "FLAT",
            Position::Long => "LONG",
        }
    }

    pub fn is_flat(&self) -> bool {
        matches!(self, Position::Flat)
    }

    /// Parse a numeric signal cell. Only exact -1, 0 and 1 are accepted.
    pub fn from_value(value: f64, row: usize) -> Result<Self> {
        if value == -1.0 {
            Ok(Position::Short)
        } else if value == 0.0 {
            Ok(Position::Flat)
        } else if value == 1.0 {
            Ok(Position::Long)
        } else {
            Err(AnalyticsError::InvalidSignal { row, value })
        }
    }
}

impl TryFrom<i8> for Position {
    type Error = AnalyticsError;

    fn try_from(value: i8) -> Result<Self> {
        Position::from_value(f64::from(value), 0)
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
