//! A single bughouse board: a standard chess position plus the holdings
//! available to each side and the move history played so far.
//!
//! Mirrors the validate-then-apply shape of
//! `EngineProcess::validate_position` (parse FEN with
//! `CastlingMode::Chess960`, fall back through
//! `ignore_too_much_material()` for positions a pure chess mover would
//! otherwise reject because of the extra pocket material), generalized to
//! carry a [`Holdings`] alongside the `shakmaty::Chess` position.

use super::holdings::Holdings;
use super::mv::Move;
use crate::error::{OrchestratorError, OrchestratorResult};
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Color, FromSetup, Position, Role, Setup, Square};

#[derive(Debug, Clone)]
pub struct Board {
    position: Chess,
    holdings: Holdings,
    history: Vec<Move>,
}

impl Board {
    pub fn starting() -> Self {
        Board {
            position: Chess::default(),
            holdings: Holdings::new(),
            history: Vec::new(),
        }
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn holdings(&self) -> &Holdings {
        &self.holdings
    }

    pub fn holdings_mut(&mut self) -> &mut Holdings {
        &mut self.holdings
    }

    pub fn history(&self) -> &[Move] {
        &self.history
    }

    pub fn turn(&self) -> Color {
        self.position.turn()
    }

    /// Parse `board_fen[holdings] side castling ep halfmove fullmove`,
    /// i.e. a standard FEN with the bughouse bracket spliced in after the
    /// board field.
    pub fn from_fen_with_holdings(fen: &str) -> OrchestratorResult<Self> {
        let (board_part, rest) = fen
            .split_once('[')
            .ok_or_else(|| OrchestratorError::ProtocolParseError(format!("missing holdings bracket in {fen}")))?;
        let (holdings_part, tail) = rest
            .split_once(']')
            .ok_or_else(|| OrchestratorError::ProtocolParseError(format!("unterminated holdings bracket in {fen}")))?;
        let holdings = Holdings::from_bracket(holdings_part)
            .map_err(|e| OrchestratorError::ProtocolParseError(e.to_string()))?;
        let plain_fen = format!("{}{}", board_part.trim_end(), tail);
        let setup: Fen = plain_fen.parse()?;
        let position = setup
            .into_position(CastlingMode::Chess960)
            .or_else(|e| e.ignore_too_much_material())?;
        Ok(Board { position, holdings, history: Vec::new() })
    }

    /// Render `board_fen[holdings] side castling ep halfmove fullmove`.
    pub fn to_fen_with_holdings(&self) -> String {
        let setup = self.position.clone().into_setup(shakmaty::EnPassantMode::Legal);
        let fen = Fen(setup).to_string();
        let mut parts = fen.splitn(2, ' ');
        let board_field = parts.next().unwrap_or_default();
        let rest = parts.next().unwrap_or_default();
        format!("{board_field}{} {rest}", self.holdings.to_bracket())
    }

    /// Replay a move history from the starting position, used to rebuild
    /// a [`Board`] from a persisted game log (spec.md's round-trip law:
    /// decode(encode(board)) == board, and replay_from(history) ==
    /// board after playing that history live).
    pub fn replay_from(history: &[Move]) -> OrchestratorResult<Self> {
        let mut board = Board::starting();
        for mv in history {
            board.apply(*mv)?;
        }
        Ok(board)
    }

    /// Apply a move or drop, updating holdings (captures go to the
    /// *mover's own* holdings here; cross-board routing to the partner
    /// is the responsibility of [`crate::piece_flow`], which observes
    /// this via the capture it extracts before calling back in).
    ///
    /// Both arms reject anything that would leave the mover's own king
    /// in check (spec.md §4.3's `is_drop_legal`, generalized to normal
    /// moves too): board moves are checked against
    /// `Position::legal_moves()` directly; a drop has no such list to
    /// consult (shakmaty's move generator knows nothing about holdings),
    /// so it is speculatively played on a clone and the clone is
    /// re-validated the same way [`Self::from_fen_with_holdings`]
    /// validates an externally supplied FEN — any `PositionError` left
    /// over after ignoring the now-expected "too much material" means
    /// the drop left the mover in check.
    pub fn apply(&mut self, mv: Move) -> OrchestratorResult<Option<shakmaty::Role>> {
        let captured = match mv {
            Move::Board(m) => {
                if !self.position.legal_moves().contains(&m) {
                    return Err(OrchestratorError::IllegalMove(shakmaty::uci::UciMove::from_standard(&m).to_string()));
                }
                let captured = m.capture();
                self.position.play_unchecked(&m);
                captured
            }
            Move::Drop { role, to } => {
                if self.position.board().piece_at(to).is_some() {
                    return Err(OrchestratorError::SquareOccupied(to));
                }
                let side = self.position.turn();
                if role == Role::Pawn {
                    let rank = to.rank();
                    if rank == shakmaty::Rank::First || rank == shakmaty::Rank::Eighth {
                        return Err(OrchestratorError::PawnOnBackRank);
                    }
                }
                if !self.holdings.remove(side, role) {
                    return Err(OrchestratorError::NoSuchPieceInHoldings);
                }
                let drop = shakmaty::Move::Put { role, to };
                let mut probe = self.position.clone();
                probe.play_unchecked(&drop);
                if leaves_own_king_in_check(&probe) {
                    self.holdings.add(side, role);
                    return Err(OrchestratorError::WouldLeaveKingInCheck);
                }
                self.position.play_unchecked(&drop);
                None
            }
        };
        self.history.push(mv);
        Ok(captured)
    }

    pub fn is_drop_legal(&self, role: Role, to: Square) -> bool {
        if self.position.board().piece_at(to).is_some() {
            return false;
        }
        if role == Role::Pawn && (to.rank() == shakmaty::Rank::First || to.rank() == shakmaty::Rank::Eighth) {
            return false;
        }
        if self.holdings.count(self.position.turn(), role) == 0 {
            return false;
        }
        let mut probe = self.position.clone();
        probe.play_unchecked(&shakmaty::Move::Put { role, to });
        !leaves_own_king_in_check(&probe)
    }

    pub fn is_checkmate(&self) -> bool {
        self.position.is_checkmate()
    }

    pub fn is_stalemate(&self) -> bool {
        self.position.is_stalemate()
    }
}

/// True if `position`'s side-that-just-moved left its own king in check.
/// `position` is already past the move in question (its `turn()` is the
/// *other* side); re-running it through setup validation surfaces
/// exactly this as an "opposite check" `PositionError`, the same check
/// `into_position` applies to any externally supplied FEN.
fn leaves_own_king_in_check(position: &Chess) -> bool {
    let setup = position.clone().into_setup(shakmaty::EnPassantMode::Legal);
    let revalidated: Result<Chess, _> = setup.into_position(CastlingMode::Chess960);
    revalidated.or_else(|e| e.ignore_too_much_material()).is_err()
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::{Role, Square};

    #[test]
    fn fen_round_trip_starting_position() {
        let board = Board::starting();
        let fen = board.to_fen_with_holdings();
        let decoded = Board::from_fen_with_holdings(&fen).unwrap();
        assert_eq!(decoded.to_fen_with_holdings(), fen);
    }

    #[test]
    fn drop_consumes_holdings() {
        let mut board = Board::starting();
        board.holdings_mut().add(Color::White, Role::Knight);
        board.apply(Move::Drop { role: Role::Knight, to: Square::E4 }).unwrap();
        assert_eq!(board.holdings().count(Color::White, Role::Knight), 0);
    }

    #[test]
    fn drop_without_holdings_fails() {
        let mut board = Board::starting();
        let err = board.apply(Move::Drop { role: Role::Queen, to: Square::E4 }).unwrap_err();
        assert!(matches!(err, OrchestratorError::NoSuchPieceInHoldings));
    }

    #[test]
    fn pawn_cannot_drop_on_back_rank() {
        let mut board = Board::starting();
        board.holdings_mut().add(Color::White, Role::Pawn);
        let err = board.apply(Move::Drop { role: Role::Pawn, to: Square::A8 }).unwrap_err();
        assert!(matches!(err, OrchestratorError::PawnOnBackRank));
    }

    #[test]
    fn illegal_board_move_is_rejected() {
        let mut board = Board::starting();
        // A pawn cannot jump three squares on its first move.
        let mv = Move::Board(shakmaty::Move::Normal {
            role: Role::Pawn,
            from: Square::E2,
            to: Square::E5,
            capture: None,
            promotion: None,
        });
        let err = board.apply(mv).unwrap_err();
        assert!(matches!(err, OrchestratorError::IllegalMove(_)));
        assert!(board.history().is_empty());
    }

    #[test]
    fn drop_that_leaves_own_king_in_check_is_rejected() {
        // White king on e1 is in check from the black rook on e8; a
        // knight drop on a1 does nothing to address it.
        let mut board = Board::from_fen_with_holdings("k3r3/8/8/8/8/8/8/4K3[N] w - - 0 1").unwrap();
        let err = board.apply(Move::Drop { role: Role::Knight, to: Square::A1 }).unwrap_err();
        assert!(matches!(err, OrchestratorError::WouldLeaveKingInCheck));
        // the rejected drop must not have consumed the held knight.
        assert_eq!(board.holdings().count(Color::White, Role::Knight), 1);
        assert!(board.history().is_empty());
    }

    #[test]
    fn is_drop_legal_rejects_a_drop_that_leaves_the_king_in_check() {
        let board = Board::from_fen_with_holdings("k3r3/8/8/8/8/8/8/4K3[N] w - - 0 1").unwrap();
        assert!(!board.is_drop_legal(Role::Knight, Square::A1));
        // blocking the checking rook on the e-file is legal.
        assert!(board.is_drop_legal(Role::Knight, Square::E4));
    }

    #[test]
    fn replay_matches_direct_play() {
        let mv = Move::Board(shakmaty::Move::Normal {
            role: Role::Pawn,
            from: Square::E2,
            to: Square::E4,
            capture: None,
            promotion: None,
        });
        let mut direct = Board::starting();
        direct.apply(mv).unwrap();
        let replayed = Board::replay_from(&[mv]).unwrap();
        assert_eq!(replayed.to_fen_with_holdings(), direct.to_fen_with_holdings());
    }
}
