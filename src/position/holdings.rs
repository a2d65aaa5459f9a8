//! Holdings (captured-piece pool) and the bughouse FEN extension.
//!
//! A bughouse position is a standard chess position plus a pocket of
//! pieces each side can drop. We encode it the way the common bughouse
//! FEN dialect does: a bracketed suffix on the board field, e.g.
//! `rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR[Qp] w KQkq - 0 1` means
//! White holds a queen and Black holds a pawn. Piece letters inside the
//! brackets follow the same case convention as the board (uppercase =
//! White's holdings, lowercase = Black's), and are conventionally listed
//! queen, rook, bishop, knight, pawn — [`Holdings::to_bracket`] always
//! emits that order so output is stable for tests and logs.

use shakmaty::{Color, Role};
use std::fmt;

const ROLE_ORDER: [Role; 5] = [Role::Queen, Role::Rook, Role::Bishop, Role::Knight, Role::Pawn];

/// Per-color counts of pieces available to drop. Kings are never held.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Holdings {
    white: RoleCounts,
    black: RoleCounts,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct RoleCounts {
    queen: u8,
    rook: u8,
    bishop: u8,
    knight: u8,
    pawn: u8,
}

impl RoleCounts {
    fn get(&self, role: Role) -> u8 {
        match role {
            Role::Queen => self.queen,
            Role::Rook => self.rook,
            Role::Bishop => self.bishop,
            Role::Knight => self.knight,
            Role::Pawn => self.pawn,
            Role::King => 0,
        }
    }

    fn get_mut(&mut self, role: Role) -> Option<&mut u8> {
        match role {
            Role::Queen => Some(&mut self.queen),
            Role::Rook => Some(&mut self.rook),
            Role::Bishop => Some(&mut self.bishop),
            Role::Knight => Some(&mut self.knight),
            Role::Pawn => Some(&mut self.pawn),
            Role::King => None,
        }
    }
}

impl Holdings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, color: Color, role: Role) -> u8 {
        match color {
            Color::White => self.white.get(role),
            Color::Black => self.black.get(role),
        }
    }

    /// Add a captured piece to `color`'s pool. Kings are never added; a
    /// king capture ends the game before holdings bookkeeping runs.
    pub fn add(&mut self, color: Color, role: Role) {
        let counts = match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        };
        if let Some(slot) = counts.get_mut(role) {
            *slot = slot.saturating_add(1);
        }
    }

    /// Remove one piece of `role` from `color`'s pool. Returns `false`
    /// (and leaves holdings unchanged) if none is available — the caller
    /// is expected to turn that into [`crate::error::OrchestratorError::NoSuchPieceInHoldings`].
    #[must_use]
    pub fn remove(&mut self, color: Color, role: Role) -> bool {
        let counts = match color {
            Color::White => &mut self.white,
            Color::Black => &mut self.black,
        };
        match counts.get_mut(role) {
            Some(slot) if *slot > 0 => {
                *slot -= 1;
                true
            }
            _ => false,
        }
    }

    /// Render the `[...]` bracket suffix used in bughouse FEN, queen
    /// through pawn, White letters before Black letters are not required
    /// by the dialect but we keep insertion order per-color stable:
    /// White pieces first, then Black, both in `ROLE_ORDER`.
    pub fn to_bracket(&self) -> String {
        let mut s = String::from("[");
        for &role in &ROLE_ORDER {
            let ch = role_letter(role).to_ascii_uppercase();
            for _ in 0..self.white.get(role) {
                s.push(ch);
            }
        }
        for &role in &ROLE_ORDER {
            let ch = role_letter(role).to_ascii_lowercase();
            for _ in 0..self.black.get(role) {
                s.push(ch);
            }
        }
        s.push(']');
        s
    }

    /// Parse a `[...]` bracket suffix (without the surrounding brackets).
    pub fn from_bracket(inner: &str) -> Result<Self, HoldingsParseError> {
        let mut holdings = Holdings::new();
        for ch in inner.chars() {
            let role = role_from_letter(ch.to_ascii_lowercase())
                .ok_or(HoldingsParseError::UnknownPieceLetter(ch))?;
            let color = if ch.is_ascii_uppercase() { Color::White } else { Color::Black };
            let counts = match color {
                Color::White => &mut holdings.white,
                Color::Black => &mut holdings.black,
            };
            if let Some(slot) = counts.get_mut(role) {
                *slot = slot.saturating_add(1);
            }
        }
        Ok(holdings)
    }
}

impl fmt::Display for Holdings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_bracket())
    }
}

fn role_letter(role: Role) -> char {
    match role {
        Role::Pawn => 'p',
        Role::Knight => 'n',
        Role::Bishop => 'b',
        Role::Rook => 'r',
        Role::Queen => 'q',
        Role::King => 'k',
    }
}

fn role_from_letter(ch: char) -> Option<Role> {
    match ch {
        'p' => Some(Role::Pawn),
        'n' => Some(Role::Knight),
        'b' => Some(Role::Bishop),
        'r' => Some(Role::Rook),
        'q' => Some(Role::Queen),
        'k' => Some(Role::King),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum HoldingsParseError {
    #[error("unknown piece letter in holdings bracket: {0:?}")]
    UnknownPieceLetter(char),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn round_trip_empty() {
        let h = Holdings::new();
        assert_eq!(h.to_bracket(), "[]");
        assert_eq!(Holdings::from_bracket("").unwrap(), h);
    }

    #[test]
    fn round_trip_mixed() {
        let mut h = Holdings::new();
        h.add(Color::White, Role::Queen);
        h.add(Color::White, Role::Pawn);
        h.add(Color::White, Role::Pawn);
        h.add(Color::Black, Role::Knight);
        let bracket = h.to_bracket();
        assert_eq!(bracket, "[QPPn]");
        let parsed = Holdings::from_bracket("QPPn").unwrap();
        assert_eq!(parsed, h);
    }

    #[test]
    fn add_then_remove() {
        let mut h = Holdings::new();
        h.add(Color::Black, Role::Rook);
        assert_eq!(h.count(Color::Black, Role::Rook), 1);
        assert!(h.remove(Color::Black, Role::Rook));
        assert_eq!(h.count(Color::Black, Role::Rook), 0);
        assert!(!h.remove(Color::Black, Role::Rook));
    }

    #[test]
    fn kings_are_never_held() {
        let mut h = Holdings::new();
        h.add(Color::White, Role::King);
        assert_eq!(h.count(Color::White, Role::King), 0);
        assert_eq!(h.to_bracket(), "[]");
    }

    #[test]
    fn rejects_unknown_letter() {
        assert!(matches!(
            Holdings::from_bracket("X"),
            Err(HoldingsParseError::UnknownPieceLetter('x' | 'X'))
        ));
    }
}
