//! UCI score parsing and the normalization rules the should-stall
//! procedure needs (spec.md §4.6.1, steps 1–3): centipawn scores are
//! UCI's White-relative convention, mate scores are side-to-move
//! relative, and any mate beyond the "long-mate" cutoff of 5 plies is
//! re-expressed as a ±5000cp sentinel so "winning" and "forced mate"
//! can be compared on one scale. Parsing style mirrors
//! `parse_info_to_best_moves` (`engine/communication.rs`): scan an
//! `info` line's whitespace-separated tokens for `score cp`/`score
//! mate` rather than a full grammar.

use shakmaty::Color;

/// A `score` as read off one `info` line, in UCI's raw convention
/// (centipawns White-relative, mate side-to-move-relative).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawScore {
    Centipawns(i32),
    MateIn(i32),
}

/// Extract the last `score cp N` / `score mate N` token pair from a UCI
/// `info` line. Returns `None` for lines that carry no score (e.g. a
/// bare `info depth 1 currmove e2e4`).
pub fn parse_info_score(line: &str) -> Option<RawScore> {
    let tokens: Vec<&str> = line.split_whitespace().collect();
    let idx = tokens.iter().position(|&t| t == "score")?;
    match tokens.get(idx + 1).copied() {
        Some("cp") => tokens.get(idx + 2)?.parse().ok().map(RawScore::Centipawns),
        Some("mate") => tokens.get(idx + 2)?.parse().ok().map(RawScore::MateIn),
        _ => None,
    }
}

/// The long-mate cutoff (spec.md §4.6.1 step 3): mates further out than
/// this are treated as "winning", not "forced mate".
pub const LONG_MATE_CUTOFF: i32 = 5;

/// The sentinel centipawn value a beyond-cutoff mate is re-expressed
/// as, signed from our side's perspective.
pub const LONG_MATE_SENTINEL_CP: i32 = 5000;

/// A score normalized to "from our side's perspective": positive always
/// means good for the side asking, matching spec.md §4.6.1 steps 2–3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizedScore {
    /// We mate in `n` (n > 0) or are mated in `n` (n < 0), `|n| <=`
    /// [`LONG_MATE_CUTOFF`].
    Mate(i32),
    Centipawns(i32),
}

impl NormalizedScore {
    /// True exactly when this score represents "we mate in <= cutoff",
    /// step 4 of the should-stall procedure ("never sit on a winning line").
    pub fn is_short_mate_for_us(&self) -> bool {
        matches!(self, NormalizedScore::Mate(n) if *n > 0)
    }

    /// True exactly when this score represents "we are mated in 1".
    pub fn is_mate_in_one_against_us(&self) -> bool {
        matches!(self, NormalizedScore::Mate(-1))
    }

    pub fn as_cp(&self) -> i32 {
        match self {
            NormalizedScore::Centipawns(cp) => *cp,
            NormalizedScore::Mate(n) if *n > 0 => LONG_MATE_SENTINEL_CP,
            NormalizedScore::Mate(_) => -LONG_MATE_SENTINEL_CP,
        }
    }
}

/// Normalize a raw UCI score to our side's perspective.
/// `side_to_move` is whichever color the engine is currently evaluating
/// for (the FEN's side-to-move field); `our_color` is the bot's own
/// color on its board.
pub fn normalize(raw: RawScore, side_to_move: Color, our_color: Color) -> NormalizedScore {
    match raw {
        RawScore::MateIn(n) => {
            // `score mate N` is already side-to-move relative.
            let our_relative = if side_to_move == our_color { n } else { -n };
            if our_relative.abs() > LONG_MATE_CUTOFF {
                NormalizedScore::Centipawns(if our_relative > 0 { LONG_MATE_SENTINEL_CP } else { -LONG_MATE_SENTINEL_CP })
            } else {
                NormalizedScore::Mate(our_relative)
            }
        }
        RawScore::Centipawns(cp) => {
            // `score cp N` is White-relative; flip when White is to move
            // so the value becomes side-to-move relative, then flip
            // again if we're not the side to move.
            let side_relative = if side_to_move == Color::White { cp } else { -cp };
            let our_relative = if side_to_move == our_color { side_relative } else { -side_relative };
            NormalizedScore::Centipawns(our_relative)
        }
    }
}
