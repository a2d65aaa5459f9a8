//! Chat line generation: turns a stall/request event into the short
//! scripted text lines spec.md §4.6.5 describes bots sending their
//! partner ("P mates in N", "I am mated", ...). Kept as flat string
//! templates rather than anything fancier, since these are a fixed,
//! small vocabulary rather than free text generation.

use crate::position::Move;
use crate::stall::StallReason;
use shakmaty::Role;

fn role_name(role: Role) -> &'static str {
    match role {
        Role::Pawn => "pawn",
        Role::Knight => "knight",
        Role::Bishop => "bishop",
        Role::Rook => "rook",
        Role::Queen => "queen",
        Role::King => "king",
    }
}

/// Text emitted when a bot enters a stall for `reason` while holding
/// `role`. `mate_distance` fills in the "mates in N" / "mated in N"
/// detail for the two mate-adjacent reasons when it's known; omitted
/// entirely for `LostToWinning`, which has no mate distance.
pub fn stall_entered_line(role: Role, reason: StallReason, mate_distance: Option<u32>) -> String {
    match (reason, mate_distance) {
        (StallReason::ForcesMate, Some(n)) => format!("{} mates in {n}", role_name(role)),
        (StallReason::ForcesMate, None) => format!("{} mates soon", role_name(role)),
        (StallReason::SavesFromMate, _) => format!("{} helps me survive", role_name(role)),
        (StallReason::LostToWinning, _) => format!("{} saves my position", role_name(role)),
    }
}

/// Text emitted when a bot exits a stall and plays the held move.
pub fn stall_exited_line(role: Role, mv: &Move) -> String {
    format!("playing the {} now: {}", role_name(role), mv)
}

/// Text emitted when a claimed checkmate turns out to hold up against
/// the queen-drop probe.
pub fn mated_line() -> &'static str {
    "I am mated"
}

/// Text emitted when a bot issues an outbound partner request for
/// `role`.
pub fn request_line(role: Role) -> String {
    format!("go for the {}", role_name(role))
}

/// Text emitted on receiving an inbound partner request, ahead of the
/// caller's own 1-2s delay before sending it.
pub fn will_try_line() -> &'static str {
    "I will try."
}

/// Text emitted when a partner request has been fulfilled.
pub fn request_fulfilled_line() -> &'static str {
    "Thanks :)"
}

/// Text emitted when a stall is abandoned because of a forced exit
/// (time crossed over, or a player `Go`) rather than fulfillment.
pub fn forced_exit_line() -> &'static str {
    "I go"
}

#[cfg(test)]
mod tests {
    use super::*;
    use shakmaty::Square;

    #[test]
    fn stall_lines_mention_the_role() {
        assert!(stall_entered_line(Role::Queen, StallReason::ForcesMate, None).contains("queen"));
        assert!(stall_entered_line(Role::Pawn, StallReason::SavesFromMate, None).contains("pawn"));
    }

    #[test]
    fn forces_mate_line_includes_distance_when_known() {
        let line = stall_entered_line(Role::Pawn, StallReason::ForcesMate, Some(3));
        assert_eq!(line, "pawn mates in 3");
    }

    #[test]
    fn request_line_mentions_the_role() {
        assert_eq!(request_line(Role::Rook), "go for the rook");
    }

    #[test]
    fn fulfilled_line_matches_spec_wording() {
        assert_eq!(request_fulfilled_line(), "Thanks :)");
    }

    #[test]
    fn exit_line_includes_move() {
        let mv = Move::Drop { role: Role::Knight, to: Square::E4 };
        let line = stall_exited_line(Role::Knight, &mv);
        assert!(line.contains("N@e4"));
    }
}
