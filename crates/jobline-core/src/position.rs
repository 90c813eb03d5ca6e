//! Fixed-point queue positions.
//!
//! A position is a decimal with [`POSITION_DECIMALS`] fractional digits,
//! stored as an integer count of the smallest representable step. Jobs are
//! first placed on whole positions; reordering inserts a job at the midpoint
//! between two neighbours. Each bisection halves the gap, so a gap of one
//! whole position can be split roughly forty times before neighbours become
//! adjacent and the pool has to be renumbered.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Number of fractional decimal digits a position carries.
pub const POSITION_DECIMALS: u32 = 12;

const SCALE: i128 = 10i128.pow(POSITION_DECIMALS);

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Position(i128);

impl Position {
    pub const ZERO: Position = Position(0);
    pub const ONE: Position = Position(SCALE);

    /// Position at a whole number.
    pub fn whole(n: i64) -> Self {
        Self(i128::from(n) * SCALE)
    }

    /// Position from raw fixed-point units.
    pub fn from_units(units: i128) -> Self {
        Self(units)
    }

    pub fn units(&self) -> i128 {
        self.0
    }

    /// The position one whole step before this one.
    pub fn prev_whole(self) -> Self {
        Self(self.0 - SCALE)
    }

    /// The position one whole step after this one.
    pub fn next_whole(self) -> Self {
        Self(self.0 + SCALE)
    }

    /// Midpoint strictly between two positions.
    ///
    /// Fails with [`Error::PositionExhausted`] when no representable value
    /// lies strictly between them, which is the signal to rebalance.
    pub fn between(a: Position, b: Position) -> Result<Position> {
        let (lower, upper) = match a.cmp(&b) {
            Ordering::Greater => (b, a),
            _ => (a, b),
        };
        let gap = upper.0 - lower.0;
        if gap < 2 {
            return Err(Error::PositionExhausted {
                lower: lower.to_string(),
                upper: upper.to_string(),
            });
        }
        Ok(Position(lower.0 + gap / 2))
    }
}

impl std::fmt::Display for Position {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let scale = SCALE.unsigned_abs();
        let whole = abs / scale;
        let frac = abs % scale;
        if frac == 0 {
            return write!(f, "{}{}", sign, whole);
        }
        let digits = format!("{:0width$}", frac, width = POSITION_DECIMALS as usize);
        write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
    }
}

impl std::str::FromStr for Position {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let invalid = || Error::InvalidInput(format!("invalid position: {:?}", s));

        let (negative, body) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };
        let (whole, frac) = match body.split_once('.') {
            Some((w, f)) => (w, f),
            None => (body, ""),
        };
        if whole.is_empty() || frac.len() > POSITION_DECIMALS as usize {
            return Err(invalid());
        }
        if !whole.bytes().all(|b| b.is_ascii_digit()) || !frac.bytes().all(|b| b.is_ascii_digit())
        {
            return Err(invalid());
        }

        let whole: i128 = whole.parse().map_err(|_| invalid())?;
        let frac_units: i128 = if frac.is_empty() {
            0
        } else {
            let padded = format!("{:0<width$}", frac, width = POSITION_DECIMALS as usize);
            padded.parse().map_err(|_| invalid())?
        };

        let units = whole
            .checked_mul(SCALE)
            .and_then(|u| u.checked_add(frac_units))
            .ok_or_else(invalid)?;
        Ok(Position(if negative { -units } else { units }))
    }
}
