//! Variant file parsing: loads the named move-biasing hints a stalling
//! bot uses to choose *which* legal reply to play while it's sitting on
//! a piece (spec.md §6's "move-biasing strategies"). Three strategies
//! exist — prefer moving the royal piece, prefer the highest-value
//! piece, or prefer the move closest to the partner board's action —
//! selected per game via [`crate::config::StallBiasStrategy`], with the
//! first two needing a small per-variant data file to know which piece
//! is "royal" or how much each piece is worth. Modeled after the
//! engine-name-sniffing table in `engine/config.rs`
//! (`get_recommended_settings`), which also keys small hint tables by a
//! short identifier read from a config source.
//!
//! File format, one line per variant:
//! ```text
//! <name> = <base>
//! <name> = <base> ghost_royal <PIECE>
//! <name> = <base> ghost_highvalue <PIECE> <VALUE>
//! ```
//! `<PIECE>` is a single uppercase piece letter (P/N/B/R/Q/K).

use crate::config::StallBiasStrategy;
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::position::Board;
use crate::stall::PartnerRequest;
use shakmaty::{Position, Role, Square};
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariantDefinition {
    pub base: String,
    pub ghost_royal: Option<Role>,
    pub ghost_high_value: Option<(Role, u32)>,
}

#[derive(Debug, Clone, Default)]
pub struct VariantTable {
    variants: HashMap<String, VariantDefinition>,
}

impl VariantTable {
    pub fn load(path: &Path) -> OrchestratorResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| OrchestratorError::VariantFileError {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        Self::parse(&text).map_err(|reason| OrchestratorError::VariantFileError {
            path: path.display().to_string(),
            reason,
        })
    }

    pub fn parse(text: &str) -> Result<Self, String> {
        let mut variants = HashMap::new();
        for (lineno, raw_line) in text.lines().enumerate() {
            let line = raw_line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (name, rest) = line
                .split_once('=')
                .ok_or_else(|| format!("line {}: missing `=`", lineno + 1))?;
            let name = name.trim().to_string();
            let mut tokens = rest.split_whitespace();
            let base = tokens.next().ok_or_else(|| format!("line {}: missing base variant", lineno + 1))?.to_string();

            let mut ghost_royal = None;
            let mut ghost_high_value = None;
            match tokens.next() {
                None => {}
                Some("ghost_royal") => {
                    let piece = tokens
                        .next()
                        .ok_or_else(|| format!("line {}: ghost_royal missing piece letter", lineno + 1))?;
                    ghost_royal = Some(parse_role_letter(piece).ok_or_else(|| format!("line {}: unknown piece letter {piece:?}", lineno + 1))?);
                }
                Some("ghost_highvalue") => {
                    let piece = tokens
                        .next()
                        .ok_or_else(|| format!("line {}: ghost_highvalue missing piece letter", lineno + 1))?;
                    let value: u32 = tokens
                        .next()
                        .ok_or_else(|| format!("line {}: ghost_highvalue missing value", lineno + 1))?
                        .parse()
                        .map_err(|_| format!("line {}: ghost_highvalue value is not a number", lineno + 1))?;
                    let role = parse_role_letter(piece).ok_or_else(|| format!("line {}: unknown piece letter {piece:?}", lineno + 1))?;
                    ghost_high_value = Some((role, value));
                }
                Some(other) => return Err(format!("line {}: unknown modifier {other:?}", lineno + 1)),
            }

            variants.insert(name, VariantDefinition { base, ghost_royal, ghost_high_value });
        }
        Ok(VariantTable { variants })
    }

    pub fn get(&self, name: &str) -> Option<&VariantDefinition> {
        self.variants.get(name)
    }

    /// Find the variant that gives `role` its forcing-line treatment
    /// under `strategy` (spec.md §4.6.4 step 3's `ghost_royal`/
    /// `ghost_highvalue` variant switch). `Proximity` has no variant
    /// file of its own — it biases among ordinary legal replies instead.
    pub fn find_for_role(&self, role: Role, strategy: StallBiasStrategy) -> Option<&str> {
        self.variants.iter().find_map(|(name, def)| {
            let matches = match strategy {
                StallBiasStrategy::RoyalPiece => def.ghost_royal == Some(role),
                StallBiasStrategy::HighValue => def.ghost_high_value.map(|(r, _)| r) == Some(role),
                StallBiasStrategy::Proximity => false,
            };
            matches.then_some(name.as_str())
        })
    }
}

/// Legal replies on `board` whose capture would satisfy `request`,
/// rendered as UCI move strings for a `go ... searchmoves` restriction
/// (spec.md §4.6.4 step 2's "geometric candidate generation"). Rather
/// than hand-rolling per-piece reachability (pawn diagonal-one, knight
/// L-shape, sliders, king one-step), this filters the position's own
/// legal-move list by capture role — the move generator already linked
/// into this crate is a more reliable source of the same candidate set
/// than reimplementing piece geometry by hand.
pub fn request_candidates(board: &Board, request: PartnerRequest) -> Vec<String> {
    board
        .position()
        .legal_moves()
        .iter()
        .filter(|m| m.capture().is_some_and(|captured| request.fulfilled_by(captured)))
        .map(|m| shakmaty::uci::UciMove::from_standard(m).to_string())
        .collect()
}

/// Manhattan distance between two squares (file + rank steps), used by
/// the proximity forcing-line strategy to prefer the reply that lands
/// closest to `target` — a stand-in for "closest to the partner board's
/// action" when no royal-piece or high-value hint applies.
pub fn manhattan_distance(a: Square, b: Square) -> u32 {
    let (af, ar) = square_coords(a);
    let (bf, br) = square_coords(b);
    af.abs_diff(bf) + ar.abs_diff(br)
}

fn square_coords(sq: Square) -> (u32, u32) {
    let s = sq.to_string();
    let bytes = s.as_bytes();
    (bytes[0] as u32, bytes[1] as u32)
}

fn parse_role_letter(s: &str) -> Option<Role> {
    match s.to_ascii_uppercase().as_str() {
        "P" => Some(Role::Pawn),
        "N" => Some(Role::Knight),
        "B" => Some(Role::Bishop),
        "R" => Some(Role::Rook),
        "Q" => Some(Role::Queen),
        "K" => Some(Role::King),
        _ => None,
    }
}

/// Standard-piece value table for the high-value biasing strategy,
/// matching the `piece_value` helper in `engine/types.rs`.
pub fn piece_value(role: Role) -> u32 {
    match role {
        Role::Pawn => 100,
        Role::Knight => 300,
        Role::Bishop => 300,
        Role::Rook => 500,
        Role::Queen => 900,
        Role::King => 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_baseline_variant() {
        let table = VariantTable::parse("bughouse = crazyhouse\n").unwrap();
        let def = table.get("bughouse").unwrap();
        assert_eq!(def.base, "crazyhouse");
        assert!(def.ghost_royal.is_none());
    }

    #[test]
    fn parses_ghost_royal() {
        let table = VariantTable::parse("koedem = bughouse ghost_royal Q\n").unwrap();
        let def = table.get("koedem").unwrap();
        assert_eq!(def.ghost_royal, Some(Role::Queen));
    }

    #[test]
    fn parses_ghost_highvalue() {
        let table = VariantTable::parse("variant_x = bughouse ghost_highvalue R 500\n").unwrap();
        let def = table.get("variant_x").unwrap();
        assert_eq!(def.ghost_high_value, Some((Role::Rook, 500)));
    }

    #[test]
    fn comments_and_blank_lines_are_skipped() {
        let table = VariantTable::parse("# comment\n\nbughouse = crazyhouse\n").unwrap();
        assert!(table.get("bughouse").is_some());
    }

    #[test]
    fn rejects_unknown_modifier() {
        assert!(VariantTable::parse("x = base weird").is_err());
    }

    #[test]
    fn find_for_role_respects_strategy() {
        let table = VariantTable::parse("koedem = bughouse ghost_royal Q\nheavy = bughouse ghost_highvalue R 500\n").unwrap();
        assert_eq!(table.find_for_role(Role::Queen, StallBiasStrategy::RoyalPiece), Some("koedem"));
        assert_eq!(table.find_for_role(Role::Rook, StallBiasStrategy::HighValue), Some("heavy"));
        assert_eq!(table.find_for_role(Role::Queen, StallBiasStrategy::HighValue), None);
        assert_eq!(table.find_for_role(Role::Rook, StallBiasStrategy::Proximity), None);
    }

    #[test]
    fn request_candidates_filters_legal_moves_by_fulfillment() {
        use crate::position::Board;

        // White knight on e4 has exactly one capture available: Nxc5,
        // taking a black pawn.
        let board = Board::from_fen_with_holdings("4k3/8/8/2p5/4N3/8/8/4K3[] w - - 0 1").unwrap();

        let pawn_request = PartnerRequest::new(Role::Pawn);
        let candidates = request_candidates(&board, pawn_request);
        assert_eq!(candidates, vec!["e4c5".to_string()]);

        let knight_request = PartnerRequest::new(Role::Knight);
        assert!(request_candidates(&board, knight_request).is_empty());
    }

    #[test]
    fn manhattan_distance_counts_file_and_rank_steps() {
        assert_eq!(manhattan_distance(Square::A1, Square::A1), 0);
        assert_eq!(manhattan_distance(Square::A1, Square::H8), 14);
        assert_eq!(manhattan_distance(Square::E4, Square::E5), 1);
    }

    #[test]
    fn piece_values_match_standard_table() {
        assert_eq!(piece_value(Role::Queen), 900);
        assert_eq!(piece_value(Role::Pawn), 100);
    }
}
