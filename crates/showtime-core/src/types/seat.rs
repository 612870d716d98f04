//! Seat identifiers and event seat layouts.
//!
//! A seat id is a row label (`A`..`Z`, then `AA`, `AB`, ...) followed by a
//! 1-based column number, e.g. `A1` or `AB12`. Ids are canonicalized to
//! upper case with surrounding whitespace removed.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

/// Canonical seat identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatId(String);

impl SeatId {
    /// Canonicalize and validate a raw seat id.
    pub fn parse(raw: &str) -> Result<Self, AppError> {
        let canonical = raw.trim().to_uppercase();
        if canonical.is_empty() {
            return Err(AppError::validation("Seat id is empty"));
        }
        match split(&canonical) {
            Some((_, col)) if !col.starts_with('0') => Ok(Self(canonical)),
            _ => Err(AppError::validation(format!(
                "Invalid seat id '{}'",
                raw.trim()
            ))),
        }
    }

    /// The row label part, e.g. `"C"` for `C12`.
    pub fn row_label(&self) -> &str {
        let end = self.0.find(|c: char| c.is_ascii_digit()).unwrap_or(self.0.len());
        &self.0[..end]
    }

    /// The 1-based column number.
    pub fn column(&self) -> u32 {
        let start = self.0.find(|c: char| c.is_ascii_digit()).unwrap_or(self.0.len());
        self.0[start..].parse().unwrap_or(0)
    }

    /// The 1-based row index (`A` = 1, `Z` = 26, `AA` = 27).
    pub fn row_index(&self) -> u32 {
        row_label_to_index(self.row_label())
    }

    /// Borrow the canonical form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for SeatId {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for SeatId {
    type Error = AppError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<SeatId> for String {
    fn from(seat: SeatId) -> Self {
        seat.0
    }
}

/// Splits a canonical id into its letter and digit runs.
fn split(canonical: &str) -> Option<(&str, &str)> {
    let digits_at = canonical.find(|c: char| c.is_ascii_digit())?;
    let (row, col) = canonical.split_at(digits_at);
    let row_ok = !row.is_empty() && row.chars().all(|c| c.is_ascii_uppercase());
    let col_ok = !col.is_empty() && col.len() <= 4 && col.chars().all(|c| c.is_ascii_digit());
    (row_ok && col_ok).then_some((row, col))
}

fn row_label_to_index(label: &str) -> u32 {
    label
        .bytes()
        .fold(0u32, |acc, b| acc.saturating_mul(26).saturating_add(u32::from(b - b'A' + 1)))
}

/// The fixed seat universe of an event: `rows` x `cols`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeatLayout {
    /// Number of rows.
    pub rows: u32,
    /// Seats per row.
    pub cols: u32,
}

impl SeatLayout {
    /// Creates a layout, rejecting empty grids.
    pub fn new(rows: u32, cols: u32) -> Result<Self, AppError> {
        if rows == 0 || cols == 0 {
            return Err(AppError::validation("Seat layout must have at least one row and column"));
        }
        Ok(Self { rows, cols })
    }

    /// Whether the seat exists in this layout.
    pub fn contains(&self, seat: &SeatId) -> bool {
        let row = seat.row_index();
        let col = seat.column();
        (1..=self.rows).contains(&row) && (1..=self.cols).contains(&col)
    }

    /// Total number of seats.
    pub fn capacity(&self) -> u64 {
        u64::from(self.rows) * u64::from(self.cols)
    }
}
