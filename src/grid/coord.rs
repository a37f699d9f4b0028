//! Spreadsheet-style cell coordinates.
//!
//! Rows take letters (`A`…`Z`, then `AA`…`AZ`, `BA`…), columns take 1-based
//! numbers, so the top-left cell is `A1`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Rows with a distinct label: `A`…`Z` plus `AA`…`ZZ`.
pub const MAX_LABELED_ROWS: u16 = 26 + 26 * 26;

/// A coordinate on a board. Both axes are zero-based internally.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct CellCoord {
    /// Row index (0 = `A`).
    pub row: u16,
    /// Column index (0 = `1`).
    pub column: u16,
}

impl CellCoord {
    /// Create a new coordinate.
    #[must_use]
    pub const fn new(row: u16, column: u16) -> Self {
        Self { row, column }
    }

    /// Letters naming `row`.
    #[must_use]
    pub fn row_letters(row: u16) -> String {
        let letter = |n: u16| char::from(b'A' + (n % 26) as u8);
        if row < 26 {
            letter(row).to_string()
        } else {
            let mut s = String::with_capacity(2);
            s.push(letter(row / 26 - 1));
            s.push(letter(row % 26));
            s
        }
    }

    /// The label shown to players, e.g. `B7`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}{}", Self::row_letters(self.row), u32::from(self.column) + 1)
    }

    /// Parse a label such as `A1` or `AB12`.
    #[cfg(test)]
    fn parse(label: &str) -> Option<Self> {
        let split = label.find(|c: char| c.is_ascii_digit())?;
        let (letters, digits) = label.split_at(split);
        let index = |c: char| c.is_ascii_uppercase().then(|| c as u16 - u16::from(b'A'));

        let mut chars = letters.chars();
        let row = match (chars.next(), chars.next(), chars.next()) {
            (Some(a), None, None) => index(a)?,
            (Some(a), Some(b), None) => (index(a)? + 1) * 26 + index(b)?,
            _ => return None,
        };
        let column: u16 = digits.parse().ok()?;
        (column >= 1).then(|| Self::new(row, column - 1))
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}
