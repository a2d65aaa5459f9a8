//! Move representation for a bughouse board: either an ordinary chess
//! move (delegated to `shakmaty::Move`) or a drop of a held piece onto an
//! empty square, written `P@e4` in the usual bughouse/crazyhouse notation.

use shakmaty::uci::UciMove;
use shakmaty::{Role, Square};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Board(shakmaty::Move),
    Drop { role: Role, to: Square },
}

impl Move {
    pub fn to(&self) -> Square {
        match self {
            Move::Board(mv) => mv.to(),
            Move::Drop { to, .. } => *to,
        }
    }

    pub fn is_drop(&self) -> bool {
        matches!(self, Move::Drop { .. })
    }

    /// Render in `@`-drop or plain UCI notation, matching the
    /// `<role>@<square>` dialect used by Fairy-Stockfish-derived engines
    /// for bughouse/crazyhouse.
    pub fn to_uci_string(&self) -> String {
        match self {
            Move::Board(mv) => UciMove::from_standard(mv).to_string(),
            Move::Drop { role, to } => format!("{}@{}", role_letter(*role), to),
        }
    }

    pub fn from_uci_str(s: &str) -> Result<Self, ParseMoveError> {
        if let Some((letter, square)) = s.split_once('@') {
            let role = role_from_letter(letter.chars().next().ok_or(ParseMoveError::Empty)?)
                .ok_or_else(|| ParseMoveError::UnknownRole(letter.to_string()))?;
            let to: Square = square.parse().map_err(|_| ParseMoveError::BadSquare(square.to_string()))?;
            Ok(Move::Drop { role, to })
        } else {
            Err(ParseMoveError::NotADrop)
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_uci_string())
    }
}

fn role_letter(role: Role) -> char {
    match role {
        Role::Pawn => 'P',
        Role::Knight => 'N',
        Role::Bishop => 'B',
        Role::Rook => 'R',
        Role::Queen => 'Q',
        Role::King => 'K',
    }
}

fn role_from_letter(ch: char) -> Option<Role> {
    match ch.to_ascii_uppercase() {
        'P' => Some(Role::Pawn),
        'N' => Some(Role::Knight),
        'B' => Some(Role::Bishop),
        'R' => Some(Role::Rook),
        'Q' => Some(Role::Queen),
        'K' => Some(Role::King),
        _ => None,
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ParseMoveError {
    #[error("empty move string")]
    Empty,
    #[error("unknown drop role letter: {0}")]
    UnknownRole(String),
    #[error("bad square in drop move: {0}")]
    BadSquare(String),
    #[error("not a drop move")]
    NotADrop,
}
