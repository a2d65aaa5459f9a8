//! Probabilistic stalling and partner-request state machine (C6).
//!
//! A bot holding a piece that its partner board's capture would win or save
//! the game with does not always move it immediately. Instead it may
//! "stall" on the piece: delay a hanging-capture move for a beat, request
//! the partner to hurry a capture, or trade clock for a better drop square.
//! The decision is driven by [`should_stall`], which looks up a
//! move-dependent probability in a table of [`StallReason`]s and rolls
//! against it, subject to the diagonal-time up-on-time rule.

use rand::Rng;
use serde::{Deserialize, Serialize};
use shakmaty::Role;
use std::time::Duration;

/// One of the three engines under orchestration. `Bot1` and `Bot2` are the
/// two bots playing against `Partner` (human) and each other's partners
/// across the two boards; see spec.md §1 for the board/seat layout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BotId {
    Bot1,
    Partner,
    Bot2,
}

/// Why a bot is considering stalling on a piece rather than playing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum StallReason {
    /// Playing the piece now would deliver checkmate to the partner board.
    ForcesMate,
    /// Holding the piece one more ply would let the partner board survive
    /// a mate it is currently facing.
    SavesFromMate,
    /// The partner board has gone from losing to winning (or vice versa)
    /// because of recent piece flow, and timing the drop matters less.
    LostToWinning,
}

/// Per-piece, per-reason stall probabilities (P_stall table, spec.md §6).
/// Values are read top-to-bottom as `(forces_mate, saves_from_mate,
/// lost_to_winning)`.
fn default_probability(role: Role) -> (f64, f64, f64) {
    match role {
        Role::Pawn => (0.98, 0.90, 0.60),
        Role::Knight => (0.95, 0.70, 0.50),
        Role::Bishop => (0.95, 0.70, 0.50),
        Role::Rook => (0.95, 0.33, 0.0),
        Role::Queen => (0.95, 0.25, 0.0),
        Role::King => (0.0, 0.0, 0.0),
    }
}

/// Overridable probability table, loaded from [`crate::config::OrchestratorConfig`].
/// Falls back to [`default_probability`] for any role not present.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StallProbabilityTable {
    overrides: Vec<(RoleKey, f64, f64, f64)>,
}

/// `Role` doesn't implement `Serialize`/`Hash` in shakmaty, so the config
/// layer stores probabilities keyed by this local mirror instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoleKey {
    Pawn,
    Knight,
    Bishop,
    Rook,
    Queen,
    King,
}

impl From<Role> for RoleKey {
    fn from(role: Role) -> Self {
        match role {
            Role::Pawn => RoleKey::Pawn,
            Role::Knight => RoleKey::Knight,
            Role::Bishop => RoleKey::Bishop,
            Role::Rook => RoleKey::Rook,
            Role::Queen => RoleKey::Queen,
            Role::King => RoleKey::King,
        }
    }
}

impl StallProbabilityTable {
    pub fn with_override(mut self, role: Role, forces_mate: f64, saves_from_mate: f64, lost_to_winning: f64) -> Self {
        self.overrides.push((role.into(), forces_mate, saves_from_mate, lost_to_winning));
        self
    }

    fn lookup(&self, role: Role) -> (f64, f64, f64) {
        let key = RoleKey::from(role);
        self.overrides
            .iter()
            .rev()
            .find(|(k, ..)| *k == key)
            .map(|(_, a, b, c)| (*a, *b, *c))
            .unwrap_or_else(|| default_probability(role))
    }

    pub fn probability_for(&self, role: Role, reason: StallReason) -> f64 {
        let (forces_mate, saves_from_mate, lost_to_winning) = self.lookup(role);
        match reason {
            StallReason::ForcesMate => forces_mate,
            StallReason::SavesFromMate => saves_from_mate,
            StallReason::LostToWinning => lost_to_winning,
        }
    }
}

/// One side's remaining clock, for the diagonal up-on-time comparison.
#[derive(Debug, Clone, Copy)]
pub struct ClockSnapshot {
    pub bot1_remaining: Duration,
    pub partner_remaining: Duration,
    pub bot2_remaining: Duration,
    pub human_remaining: Duration,
}

/// The diagonal-time rule (spec.md §6): a bot is "up on time" against the
/// player it is being asked to wait on behalf of along the diagonal
/// Bot1↔Partner, Partner↔Bot1, Bot2↔Human. Stalling is only ever allowed
/// when the stalling side is not behind on its own diagonal matchup.
pub fn up_on_time(clocks: &ClockSnapshot, bot: BotId) -> bool {
    match bot {
        BotId::Bot1 => clocks.bot1_remaining >= clocks.partner_remaining,
        BotId::Partner => clocks.partner_remaining >= clocks.bot1_remaining,
        BotId::Bot2 => clocks.bot2_remaining >= clocks.human_remaining,
    }
}

/// Outcome of evaluating whether to stall on a candidate piece.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StallDecision {
    Stall,
    Move,
}

/// Roll the stall decision for a single `(role, reason)` pair.
///
/// Mate-in-1 saves always stall (probability forced to 1.0) provided the
/// bot is up on time; this is handled by the caller passing
/// `StallReason::SavesFromMate` with `forced: true` rather than by a
/// special-cased branch here, keeping the rolling logic in one place.
pub fn should_stall(
    table: &StallProbabilityTable,
    rng: &mut impl Rng,
    clocks: &ClockSnapshot,
    bot: BotId,
    role: Role,
    reason: StallReason,
    forced: bool,
) -> StallDecision {
    if !up_on_time(clocks, bot) {
        return StallDecision::Move;
    }
    let p = if forced { 1.0 } else { table.probability_for(role, reason) };
    if rng.gen::<f64>() < p {
        StallDecision::Stall
    } else {
        StallDecision::Move
    }
}

/// A bot currently sitting on a piece it decided to stall on.
#[derive(Debug, Clone)]
pub struct StallRecord {
    pub bot: BotId,
    pub role: Role,
    pub reason: StallReason,
    pub entered_ply: u32,
}

/// Whether a bot is actively searching/playing or sitting on a stall.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BotActivity {
    Active,
    Sitting(StallReason),
}

/// A request from a stalling bot to its partner: "hurry and deliver a
/// piece that would let me play the one I'm sitting on." Carries only
/// the piece type, since that's all the fulfillment equivalence table
/// (spec.md §4.6.3) keys on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartnerRequest {
    pub role: Role,
}

impl PartnerRequest {
    pub fn new(role: Role) -> Self {
        PartnerRequest { role }
    }

    /// True if a captured `role` satisfies this request, per spec.md
    /// §4.6.3's fulfillment table: a queen always substitutes for
    /// anything but a knight, a knight accepts only a knight back.
    pub fn fulfilled_by(&self, captured: Role) -> bool {
        match self.role {
            Role::Pawn => matches!(captured, Role::Pawn | Role::Bishop | Role::Queen),
            Role::Knight => captured == Role::Knight,
            Role::Bishop => matches!(captured, Role::Bishop | Role::Queen),
            Role::Rook => matches!(captured, Role::Rook | Role::Queen),
            Role::Queen => captured == Role::Queen,
            Role::King => false,
        }
    }

    /// True if `self` is already satisfied by an earlier request `other`
    /// of the same role — used to suppress duplicate chat spam when the
    /// same stalling reason persists across plies.
    pub fn subsumes(&self, other: &PartnerRequest) -> bool {
        self.role == other.role
    }
}

/// The bot whose captures fulfill `requester`'s outstanding partner
/// request (spec.md §4.6.3): Bot1⇄Bot2 is symmetric. Partner's requests
/// are fulfilled by the human seat, which has no `BotId` of its own, so
/// there is no counterpart to credit automatically — `None`.
pub fn request_counterpart(requester: BotId) -> Option<BotId> {
    match requester {
        BotId::Bot1 => Some(BotId::Bot2),
        BotId::Bot2 => Some(BotId::Bot1),
        BotId::Partner => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn even_clocks() -> ClockSnapshot {
        ClockSnapshot {
            bot1_remaining: Duration::from_secs(60),
            partner_remaining: Duration::from_secs(60),
            bot2_remaining: Duration::from_secs(60),
            human_remaining: Duration::from_secs(60),
        }
    }

    #[test]
    fn default_table_matches_spec_values() {
        let table = StallProbabilityTable::default();
        assert_eq!(table.probability_for(Role::Pawn, StallReason::ForcesMate), 0.98);
        assert_eq!(table.probability_for(Role::Pawn, StallReason::SavesFromMate), 0.90);
        assert_eq!(table.probability_for(Role::Pawn, StallReason::LostToWinning), 0.60);
        assert_eq!(table.probability_for(Role::Queen, StallReason::LostToWinning), 0.0);
        assert_eq!(table.probability_for(Role::Rook, StallReason::LostToWinning), 0.0);
    }

    #[test]
    fn override_wins_over_default() {
        let table = StallProbabilityTable::default().with_override(Role::Pawn, 0.5, 0.5, 0.5);
        assert_eq!(table.probability_for(Role::Pawn, StallReason::ForcesMate), 0.5);
        assert_eq!(table.probability_for(Role::Knight, StallReason::ForcesMate), 0.95);
    }

    #[test]
    fn behind_on_time_never_stalls() {
        let table = StallProbabilityTable::default();
        let mut rng = rand::thread_rng();
        let clocks = ClockSnapshot {
            bot1_remaining: Duration::from_secs(1),
            partner_remaining: Duration::from_secs(60),
            bot2_remaining: Duration::from_secs(60),
            human_remaining: Duration::from_secs(60),
        };
        let decision = should_stall(
            &table,
            &mut rng,
            &clocks,
            BotId::Bot1,
            Role::Queen,
            StallReason::ForcesMate,
            true,
        );
        assert_eq!(decision, StallDecision::Move);
    }

    #[test]
    fn forced_stall_always_stalls_when_up_on_time() {
        let table = StallProbabilityTable::default();
        let mut rng = rand::thread_rng();
        let clocks = even_clocks();
        for _ in 0..20 {
            let decision = should_stall(
                &table,
                &mut rng,
                &clocks,
                BotId::Partner,
                Role::Rook,
                StallReason::SavesFromMate,
                true,
            );
            assert_eq!(decision, StallDecision::Stall);
        }
    }

    #[test]
    fn request_equivalence() {
        let pawn_request = PartnerRequest::new(Role::Pawn);
        assert!(pawn_request.fulfilled_by(Role::Pawn));
        assert!(pawn_request.fulfilled_by(Role::Bishop));
        assert!(pawn_request.fulfilled_by(Role::Queen));
        assert!(!pawn_request.fulfilled_by(Role::Knight));
        assert!(!pawn_request.fulfilled_by(Role::Rook));

        let knight_request = PartnerRequest::new(Role::Knight);
        assert!(knight_request.fulfilled_by(Role::Knight));
        assert!(!knight_request.fulfilled_by(Role::Queen));

        let rook_request = PartnerRequest::new(Role::Rook);
        assert!(rook_request.fulfilled_by(Role::Rook));
        assert!(rook_request.fulfilled_by(Role::Queen));
        assert!(!rook_request.fulfilled_by(Role::Bishop));

        let queen_request = PartnerRequest::new(Role::Queen);
        assert!(queen_request.fulfilled_by(Role::Queen));
        assert!(!queen_request.fulfilled_by(Role::Rook));

        assert!(PartnerRequest::new(Role::Rook).subsumes(&PartnerRequest::new(Role::Rook)));
        assert!(!PartnerRequest::new(Role::Rook).subsumes(&PartnerRequest::new(Role::Queen)));
    }

    #[test]
    fn request_counterpart_pairs_bots_and_leaves_partner_to_the_human() {
        assert_eq!(request_counterpart(BotId::Bot1), Some(BotId::Bot2));
        assert_eq!(request_counterpart(BotId::Bot2), Some(BotId::Bot1));
        assert_eq!(request_counterpart(BotId::Partner), None);
    }
}
