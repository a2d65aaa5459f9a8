//! Cross-board piece flow (C4): a capture on one board adds the
//! captured piece to *its own original color's* pool on the other
//! board, not the capturer's color — captured pieces don't change
//! color, they arrive as reinforcements to the player whose army they
//! belonged to (spec.md §4.4). This routing rule is specific to
//! bughouse's two-board pairing and has no close analog in the
//! single-board engines this crate is otherwise grounded on; it is
//! derived directly from spec.md §4.4 rather than adapted from a
//! corpus file.

use crate::events::{BoardId, GameEvent};
use shakmaty::{Color, Role};

/// Which board a capture landed on and which board's holdings it should
/// flow to. Board A is Human vs Bot1; Board B is Partner vs Bot2. A
/// capture on A feeds B's holdings and vice versa.
pub fn partner_board(board: BoardId) -> BoardId {
    match board {
        BoardId::A => BoardId::B,
        BoardId::B => BoardId::A,
    }
}

/// The color whose holdings a capture is credited to: the captured
/// piece's own color, which is always the opposite of whoever made the
/// capturing move (a piece never changes color when captured, unlike
/// single-board crazyhouse).
pub fn destination_color(mover_color: Color) -> Color {
    mover_color.other()
}

/// Promoted pieces revert to pawns when captured and routed across
/// boards — a piece promoted on one board is worth only a pawn drop on
/// the other, per standard bughouse/crazyhouse rules.
pub fn demote_for_drop(role: Role, was_promoted: bool) -> Role {
    if was_promoted {
        Role::Pawn
    } else {
        role
    }
}

/// Coordinates the routing of a single capture: computes the
/// destination board/color/role and emits the `CaptureDelivered` event.
/// The caller is responsible for actually crediting the destination
/// board's [`crate::position::Holdings`]; this function is pure so it
/// can be unit tested without a live board.
pub struct PieceFlowCoordinator;

impl PieceFlowCoordinator {
    /// `mover_color` is the color of the side that made the capturing
    /// move; the captured piece belongs to `mover_color.other()`.
    pub fn route_capture(
        source_board: BoardId,
        mover_color: Color,
        captured_role: Role,
        was_promoted: bool,
    ) -> (BoardId, Color, Role, GameEvent) {
        let to_board = partner_board(source_board);
        let color = destination_color(mover_color);
        let role = demote_for_drop(captured_role, was_promoted);
        let event = GameEvent::CaptureDelivered { to_board, color, piece: role };
        (to_board, color, role, event)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_flows_to_other_board() {
        assert_eq!(partner_board(BoardId::A), BoardId::B);
        assert_eq!(partner_board(BoardId::B), BoardId::A);
    }

    #[test]
    fn captured_piece_keeps_its_own_color() {
        // White captures -> the captured piece was Black's.
        assert_eq!(destination_color(Color::White), Color::Black);
        assert_eq!(destination_color(Color::Black), Color::White);
    }

    #[test]
    fn promoted_piece_demotes_to_pawn() {
        assert_eq!(demote_for_drop(Role::Queen, true), Role::Pawn);
        assert_eq!(demote_for_drop(Role::Queen, false), Role::Queen);
    }

    #[test]
    fn route_capture_produces_expected_event() {
        // White captures a black knight on board A: it lands in Black's
        // holdings on board B.
        let (to_board, color, role, event) =
            PieceFlowCoordinator::route_capture(BoardId::A, Color::White, Role::Knight, false);
        assert_eq!(to_board, BoardId::B);
        assert_eq!(color, Color::Black);
        assert_eq!(role, Role::Knight);
        assert!(matches!(
            event,
            GameEvent::CaptureDelivered { to_board: BoardId::B, color: Color::Black, piece: Role::Knight }
        ));
    }
}
