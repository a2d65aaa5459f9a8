//! Crate-wide error taxonomy.
//!
//! Mirrors the error-kind design from spec.md §7: transport failures retire
//! the offending engine handle, illegal actions are typed rejections handed
//! back to the caller, evaluation/parse failures are recovered with an
//! annotation, and logic invariant violations are treated as bugs that stop
//! the game rather than silently desynchronise it.

use crate::stall::BotId;
use shakmaty::Square;

/// Standard result alias for the crate.
pub type OrchestratorResult<T> = Result<T, OrchestratorError>;

#[derive(Debug, thiserror::Error)]
pub enum OrchestratorError {
    // ---- TransportFailure -------------------------------------------------
    #[error("IO error talking to engine: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine initialization timed out")]
    InitTimeout,

    #[error("engine did not answer `stop` in time")]
    StopTimeout,

    #[error("engine did not produce the expected response in time")]
    Timeout,

    #[error("engine stdin is unavailable")]
    NoStdin,

    #[error("engine stdout is unavailable")]
    NoStdout,

    #[error("broken pipe talking to engine")]
    BrokenPipe,

    #[error("engine handle for {0:?} has been retired and cannot be used")]
    HandleRetired(BotId),

    // ---- PoolExhausted ------------------------------------------------------
    #[error("engine pool exhausted (non-blocking acquire requested)")]
    PoolExhausted,

    // ---- IllegalAction ------------------------------------------------------
    #[error("square {0:?} is occupied")]
    SquareOccupied(Square),

    #[error("pawns cannot be dropped on rank 1 or rank 8")]
    PawnOnBackRank,

    #[error("drop or move would leave the mover's king in check")]
    WouldLeaveKingInCheck,

    #[error("it is not this side's turn to move")]
    NotYourTurn,

    #[error("the game is not in progress")]
    GameNotInProgress,

    #[error("illegal move: {0}")]
    IllegalMove(String),

    #[error("no such piece in holdings to drop")]
    NoSuchPieceInHoldings,

    #[error("bot {0:?} is currently sitting and cannot be asked to move")]
    BotIsSitting(BotId),

    // ---- EvaluationFailure (recovered) --------------------------------------
    #[error("engine failed to return an evaluation at the requested depth")]
    EvaluationFailure,

    // ---- ProtocolParseError (recovered) --------------------------------------
    #[error("malformed UCI line: {0}")]
    ProtocolParseError(String),

    #[error("FEN parsing error: {0}")]
    FenParsing(#[from] shakmaty::fen::ParseFenError),

    #[error("position setup error: {0}")]
    PositionSetup(#[from] shakmaty::PositionError<shakmaty::Chess>),

    #[error("UCI move parsing error: {0}")]
    UciMoveParsing(#[from] shakmaty::uci::ParseUciMoveError),

    // ---- LogicInvariantViolation (fatal, stops the game) --------------------
    #[error("logic invariant violated: {0}")]
    LogicInvariantViolation(String),

    // ---- Configuration / variant file ---------------------------------------
    #[error("could not load variant file {path}: {reason}")]
    VariantFileError { path: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

impl From<shakmaty::uci::IllegalUciMoveError> for OrchestratorError {
    fn from(err: shakmaty::uci::IllegalUciMoveError) -> Self {
        OrchestratorError::IllegalMove(err.to_string())
    }
}

/// Raise and log a [`OrchestratorError::LogicInvariantViolation`].
///
/// Every call site that can observe a broken invariant (holdings
/// underflow, move-index regression, releasing an engine that wasn't
/// busy, ...) should go through this helper so the `error!` log line and
/// the returned error can never drift apart.
#[macro_export]
macro_rules! invariant_violation {
    ($($arg:tt)*) => {{
        let msg = format!($($arg)*);
        log::error!("invariant violated: {msg}");
        $crate::error::OrchestratorError::LogicInvariantViolation(msg)
    }};
}
