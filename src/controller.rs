//! Game controller (C5): owns the two boards and the three engine
//! transports bound to this game (Bot1, Partner, Bot2 — the human seat
//! on board B has no engine transport and is driven by whatever client
//! calls [`GameController::make_player_move`]/[`GameController::drop_piece`]),
//! and is the single place that sequences a move: validate, apply,
//! route any capture to the partner board, check for checkmate/
//! stalemate (with the true-checkmate queen-drop probe), update clocks,
//! and publish events. Grounded on the shape of
//! `EngineManager::run_communication_loop` (`engine/manager.rs`): one
//! handle per engine, retry around anything that touches a process.
//!
//! Generic over the engine transport ([`EngineTransport`]) so tests can
//! supply an in-memory duplex-backed fake instead of a real UCI binary.
//! The production instantiation (`GameController<PooledEngine>`) pulls
//! its three engines from a shared [`PoolRegistry`] rather than spawning
//! them directly, so concurrently running games reuse the same bounded
//! set of processes per engine binary (spec.md §5).

use crate::chat;
use crate::clock::GameClocks;
use crate::config::{OrchestratorConfig, StallBiasStrategy};
use crate::error::{OrchestratorError, OrchestratorResult};
use crate::evaluation::{self, NormalizedScore};
use crate::events::{BoardId, EventBus, GameEvent, GameStatus, MoveRecord, StallExitCause};
use crate::invariant_violation;
use crate::piece_flow::PieceFlowCoordinator;
use crate::pool::{PoolRegistry, PooledEngine};
use crate::position::{Board, Move};
use crate::stall::{BotActivity, BotId, PartnerRequest, StallDecision, StallProbabilityTable, StallReason};
use crate::uci::{EngineTransport, UciProcess};
use crate::variant::{self, VariantTable};
use rand::rngs::ThreadRng;
use shakmaty::uci::UciMove;
use shakmaty::{Color, Role};
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Which seat is to move / in check on which board, from the
/// controller's point of view. Board A is the Human vs. Bot1 (the
/// "player-opponent"); board B is Partner vs. Bot2, the two bots on the
/// human's team and the opposing team facing off directly. Teams are
/// {Human, Partner} vs {Bot1, Bot2}. Color assignment per board is a
/// deployment convention, not dictated by spec.md: Bot1 plays White on
/// board A (Human Black), Partner plays White on board B (Bot2 Black).
fn engine_for_board_color(board: BoardId, color: Color) -> Option<BotId> {
    match (board, color) {
        (BoardId::A, Color::White) => Some(BotId::Bot1),
        (BoardId::A, Color::Black) => None, // human
        (BoardId::B, Color::White) => Some(BotId::Partner),
        (BoardId::B, Color::Black) => Some(BotId::Bot2),
    }
}

/// The board a given bot plays on — the inverse lookup of
/// [`engine_for_board_color`], keyed by seat rather than by (board, color).
fn board_for_bot(bot: BotId) -> BoardId {
    match bot {
        BotId::Bot1 => BoardId::A,
        BotId::Partner | BotId::Bot2 => BoardId::B,
    }
}

/// The color a given bot plays on its board — paired with
/// [`board_for_bot`] so a caller can ask "is it this bot's turn" without
/// re-deriving the board/seat/color table at every call site.
fn color_for_bot(bot: BotId) -> Color {
    match bot {
        BotId::Bot1 => Color::White,
        BotId::Partner => Color::White,
        BotId::Bot2 => Color::Black,
    }
}

/// Coarse game lifecycle state, separate from [`GameStatus`] (which only
/// exists once the game is actually over). Gates which operations are
/// valid: the partner-board decision loop only runs while `InProgress`,
/// and a `Sit`/`Go` command or a forced stall-abandonment only make
/// sense once the game has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControllerStatus {
    NotStarted,
    InProgress,
    Paused,
    Over,
}

pub struct GameController<T: EngineTransport = PooledEngine> {
    board_a: Board,
    board_b: Board,
    bot1: T,
    partner: T,
    bot2: T,
    clocks: GameClocks,
    stall_table: StallProbabilityTable,
    activity: HashMap<BotId, BotActivity>,
    outbound_requests: HashMap<BotId, PartnerRequest>,
    events: EventBus,
    game_over: Option<GameStatus>,
    rng: ThreadRng,
    status: ControllerStatus,
    variant_table: Option<VariantTable>,
    bias_strategy: StallBiasStrategy,
}

impl GameController<PooledEngine> {
    /// Acquire the three playing engines from `registry`'s pools (one
    /// pool per engine binary path, shared with any other game currently
    /// using the same binary) rather than spawning dedicated processes.
    pub async fn new(config: &OrchestratorConfig, registry: &PoolRegistry, clock_time: Duration, clock_increment: Duration) -> OrchestratorResult<Self> {
        let bot1_pool = registry.get_or_create(&config.bot1_engine_path.to_string_lossy(), config.pool_capacity, config.warm_floor, config.idle_threshold());
        let partner_pool = registry.get_or_create(&config.partner_engine_path.to_string_lossy(), config.pool_capacity, config.warm_floor, config.idle_threshold());
        let bot2_pool = registry.get_or_create(&config.bot2_engine_path.to_string_lossy(), config.pool_capacity, config.warm_floor, config.idle_threshold());

        let bot1 = bot1_pool.acquire().await?;
        let partner = partner_pool.acquire().await?;
        let bot2 = bot2_pool.acquire().await?;

        let mut controller = Self::from_transports(bot1, partner, bot2, config.stall_probability_overrides.clone(), clock_time, clock_increment);

        // `variant_dir` is read as the variant file's own path rather
        // than a directory to search — the one variant table a game
        // needs is small enough to live in a single file.
        if let Some(path) = &config.variant_dir {
            controller.variant_table = Some(VariantTable::load(path)?);
        }
        controller.bias_strategy = config.stall_bias_strategy;

        Ok(controller)
    }
}

impl<T: EngineTransport> GameController<T> {
    pub fn from_transports(
        bot1: T,
        partner: T,
        bot2: T,
        stall_table: StallProbabilityTable,
        clock_time: Duration,
        clock_increment: Duration,
    ) -> Self {
        let mut activity = HashMap::new();
        activity.insert(BotId::Bot1, BotActivity::Active);
        activity.insert(BotId::Partner, BotActivity::Active);
        activity.insert(BotId::Bot2, BotActivity::Active);

        GameController {
            board_a: Board::starting(),
            board_b: Board::starting(),
            bot1,
            partner,
            bot2,
            clocks: GameClocks::new(clock_time, clock_increment),
            stall_table,
            activity,
            outbound_requests: HashMap::new(),
            events: EventBus::new(),
            game_over: None,
            rng: rand::thread_rng(),
            status: ControllerStatus::NotStarted,
            variant_table: None,
            bias_strategy: StallBiasStrategy::Proximity,
        }
    }

    pub fn events(&self) -> EventBus {
        self.events.clone()
    }

    pub fn status(&self) -> ControllerStatus {
        self.status
    }

    pub fn board(&self, board: BoardId) -> &Board {
        match board {
            BoardId::A => &self.board_a,
            BoardId::B => &self.board_b,
        }
    }

    pub fn is_game_over(&self) -> bool {
        self.game_over.is_some()
    }

    fn board_mut(&mut self, board: BoardId) -> &mut Board {
        match board {
            BoardId::A => &mut self.board_a,
            BoardId::B => &mut self.board_b,
        }
    }

    /// Sync both boards' starting positions to their engines. Must run
    /// before [`Self::start`]; leaves the controller `Paused` rather than
    /// running so a caller can still make setup adjustments (load a
    /// variant table, pre-seed holdings for a test) before the clocks
    /// start ticking.
    pub async fn initialize(&mut self) -> OrchestratorResult<()> {
        if self.status != ControllerStatus::NotStarted {
            return Err(OrchestratorError::GameNotInProgress);
        }
        for bot in [BotId::Bot1, BotId::Partner, BotId::Bot2] {
            let board = board_for_bot(bot);
            let fen = self.board(board).to_fen_with_holdings();
            self.engine_mut(bot).set_position(&fen, &[]).await?;
        }
        self.status = ControllerStatus::Paused;
        Ok(())
    }

    /// Start (or restart after [`Self::pause`]) all four clocks and mark
    /// the game `InProgress`. Idempotent while already running.
    pub fn start(&mut self, now: Instant) -> OrchestratorResult<()> {
        if self.status == ControllerStatus::InProgress {
            return Ok(());
        }
        if self.status == ControllerStatus::Over {
            return Err(OrchestratorError::GameNotInProgress);
        }
        self.status = ControllerStatus::InProgress;
        self.clocks.bot1.start(now);
        self.clocks.partner.start(now);
        self.clocks.bot2.start(now);
        self.clocks.human.start(now);
        Ok(())
    }

    /// Freeze all four clocks in place without ending the game.
    pub fn pause(&mut self, now: Instant) -> OrchestratorResult<()> {
        if self.status != ControllerStatus::InProgress {
            return Err(OrchestratorError::GameNotInProgress);
        }
        self.status = ControllerStatus::Paused;
        self.clocks.bot1.stop(now);
        self.clocks.partner.stop(now);
        self.clocks.bot2.stop(now);
        self.clocks.human.stop(now);
        Ok(())
    }

    pub fn resume(&mut self, now: Instant) -> OrchestratorResult<()> {
        if self.status != ControllerStatus::Paused {
            return Err(OrchestratorError::GameNotInProgress);
        }
        self.start(now)
    }

    /// Run the partner-board loop until the game ends: each pass, every
    /// bot whose turn it currently is and who isn't already sitting on a
    /// stall runs one decision cycle. A pass that moves nobody (every
    /// live bot is either off-turn or sitting) yields briefly rather than
    /// busy-spinning, the same shape the demo binary's own polling loop
    /// already used for "is the game over yet".
    pub async fn run_until_game_over(&mut self) -> OrchestratorResult<()> {
        self.start(Instant::now())?;
        while !self.is_game_over() {
            let mut acted = false;
            for bot in [BotId::Bot1, BotId::Partner, BotId::Bot2] {
                if self.is_game_over() {
                    break;
                }
                let board = board_for_bot(bot);
                if self.board(board).turn() != color_for_bot(bot) {
                    continue;
                }
                if matches!(self.activity.get(&bot), Some(BotActivity::Sitting(_))) {
                    continue;
                }
                self.run_decision_cycle(bot, board, 6, Instant::now()).await?;
                acted = true;
            }
            if !acted {
                tokio::time::sleep(Duration::from_millis(50)).await;
            }
        }
        Ok(())
    }

    /// Apply a move played by the human seat (board A, Black), the only
    /// seat this controller doesn't drive through a UCI transport.
    pub async fn make_player_move(&mut self, mv: Move) -> OrchestratorResult<()> {
        self.apply_move(BoardId::A, mv).await
    }

    pub async fn drop_piece(&mut self, board: BoardId, role: Role, to: shakmaty::Square) -> OrchestratorResult<()> {
        self.apply_move(board, Move::Drop { role, to }).await
    }

    /// A player-issued `Sit`: latch `bot` onto `role`/`reason` the same
    /// way an engine-decided stall does (spec.md §4.6.2), bypassing the
    /// probability roll since this is a deliberate human override.
    pub fn send_sit_command(&mut self, bot: BotId, role: Role, reason: StallReason) -> OrchestratorResult<()> {
        if self.status != ControllerStatus::InProgress {
            return Err(OrchestratorError::GameNotInProgress);
        }
        self.activity.insert(bot, BotActivity::Sitting(reason));
        self.events.publish(GameEvent::StallEntered { bot, piece: role, reason });
        Ok(())
    }

    /// A player-issued `Go` (or a forced exit from the time rule): make
    /// `bot` abandon whatever it's sitting on and play a move immediately.
    pub async fn send_go_command(&mut self, bot: BotId) -> OrchestratorResult<()> {
        if !matches!(self.activity.get(&bot), Some(BotActivity::Sitting(_))) {
            return Err(OrchestratorError::GameNotInProgress);
        }
        self.outbound_requests.remove(&bot);
        self.activity.insert(bot, BotActivity::Active);
        self.events.publish(GameEvent::StallExited { bot, cause: StallExitCause::Forced });
        self.events.publish(GameEvent::ChatLine { bot, text: chat::forced_exit_line().to_string() });
        let board = board_for_bot(bot);
        self.play_move(bot, board).await
    }

    /// Core move sequencing shared by bot and human moves: validate
    /// turn order, apply to the board, route any capture across to the
    /// partner board's holdings (checking whether it fulfills an
    /// outstanding partner request), advance the clocks, check for game
    /// end, and publish events.
    async fn apply_move(&mut self, board_id: BoardId, mv: Move) -> OrchestratorResult<()> {
        if self.game_over.is_some() {
            return Err(OrchestratorError::GameNotInProgress);
        }

        let was_promoted = matches!(mv, Move::Board(shakmaty::Move::Normal { promotion: Some(_), .. }));
        let mover_color = self.board(board_id).turn();
        let ply = self.board(board_id).history().len() as u32 + 1;

        let captured = self.board_mut(board_id).apply(mv)?;

        let now = Instant::now();
        self.advance_clock_after_move(board_id, mover_color, now);

        self.events.publish(GameEvent::MoveApplied { board: board_id, mv: MoveRecord::from(&mv), ply });

        if let Some(role) = captured {
            let (to_board, color, drop_role, event) =
                PieceFlowCoordinator::route_capture(board_id, mover_color, role, was_promoted);
            self.board_mut(to_board).holdings_mut().add(color, drop_role);
            self.events.publish(event);

            let mover_bot = engine_for_board_color(board_id, mover_color);
            self.check_request_fulfillment(mover_bot, drop_role);
        }

        self.check_game_end(board_id).await?;
        Ok(())
    }

    /// Stop the mover's clock (crediting its increment) and start the
    /// clock of whoever is to move next on the same board. A move on one
    /// board never touches the other board's pair of clocks.
    fn advance_clock_after_move(&mut self, board_id: BoardId, mover_color: Color, now: Instant) {
        match engine_for_board_color(board_id, mover_color) {
            Some(bot) => self.clocks.clock_for(bot).stop(now),
            None => self.clocks.human.stop(now),
        }
        match engine_for_board_color(board_id, mover_color.other()) {
            Some(bot) => self.clocks.clock_for(bot).start(now),
            None => self.clocks.human.start(now),
        }
    }

    /// If `mover` just delivered a capture that satisfies some bot's
    /// outstanding partner request (spec.md §4.6.3), clear the request,
    /// return that bot to `Active` if it was sitting, and publish the
    /// fulfillment event plus the scripted "thanks" chat line.
    fn check_request_fulfillment(&mut self, mover: Option<BotId>, delivered_role: Role) {
        let Some(mover) = mover else { return };
        let fulfilled_requester = self.outbound_requests.iter().find_map(|(requester, request)| {
            if crate::stall::request_counterpart(*requester) == Some(mover) && request.fulfilled_by(delivered_role) {
                Some(*requester)
            } else {
                None
            }
        });
        let Some(requester) = fulfilled_requester else { return };

        self.outbound_requests.remove(&requester);
        if matches!(self.activity.get(&requester), Some(BotActivity::Sitting(_))) {
            self.activity.insert(requester, BotActivity::Active);
            self.events.publish(GameEvent::StallExited { bot: requester, cause: StallExitCause::ConditionResolved });
        }
        self.events.publish(GameEvent::RequestFulfilled { by: requester });
        self.events.publish(GameEvent::ChatLine { bot: requester, text: chat::request_fulfilled_line().to_string() });
    }

    /// Record `bot`'s outbound request for `role`, publishing
    /// `RequestIssued` and the scripted "go for the X" chat line — unless
    /// an equivalent request is already outstanding, in which case this
    /// is just a persisting stall and nothing new needs saying.
    fn issue_partner_request(&mut self, bot: BotId, role: Role) {
        let request = PartnerRequest::new(role);
        let is_new = !self.outbound_requests.get(&bot).is_some_and(|existing| existing.subsumes(&request));
        self.outbound_requests.insert(bot, request);
        if is_new {
            self.events.publish(GameEvent::RequestIssued { by: bot, piece: role });
            self.events.publish(GameEvent::ChatLine { bot, text: chat::request_line(role) });
        }
    }

    /// The outstanding request (if any) that `bot`'s own captures would
    /// help fulfill — i.e. some other bot is waiting on `bot` as its
    /// counterpart (spec.md §4.6.3/§4.6.4: the counterpart biases its own
    /// moves toward delivering the requested piece).
    fn request_targeting(&self, bot: BotId) -> Option<PartnerRequest> {
        self.outbound_requests.iter().find_map(|(requester, request)| {
            (crate::stall::request_counterpart(*requester) == Some(bot)).then_some(*request)
        })
    }

    /// Resolve checkmate/stalemate on `board`. A stalemate is authoritative
    /// as soon as shakmaty reports it: Open Question 1 in spec.md is
    /// resolved in favor of *not* running the queen-drop probe on
    /// stalemate, only on checkmate.
    async fn check_game_end(&mut self, board: BoardId) -> OrchestratorResult<()> {
        if self.board(board).is_stalemate() {
            self.game_over = Some(GameStatus::Stalemate { board });
            self.status = ControllerStatus::Over;
            self.events.publish(GameEvent::GameOver { status: GameStatus::Stalemate { board } });
            return Ok(());
        }
        if self.board(board).is_checkmate() {
            let mated_color = self.board(board).turn();
            if self.verify_true_checkmate(board, mated_color).await? {
                let winner = mated_color.other();
                self.game_over = Some(GameStatus::Checkmate { board, winner });
                self.status = ControllerStatus::Over;
                self.events.publish(GameEvent::GameOver { status: GameStatus::Checkmate { board, winner } });
            }
        }
        Ok(())
    }

    /// Probe whether a claimed checkmate survives a hypothetical extra
    /// queen in the mated side's holdings: set the position (with the
    /// queen added) on that board's engine and ask for a move. If the
    /// engine finds none (`bestmove (none)`/`bestmove 0000`), the mate
    /// is confirmed; any other reply means the mate is only apparent
    /// and game-over is not declared yet. Mutates only a cloned board,
    /// never the live one.
    async fn verify_true_checkmate(&mut self, board: BoardId, mated_color: Color) -> OrchestratorResult<bool> {
        let mut probe_board = self.board(board).clone();
        probe_board.holdings_mut().add(mated_color, Role::Queen);
        let fen = probe_board.to_fen_with_holdings();

        let engine = match engine_for_board_color(board, mated_color) {
            Some(bot) => self.engine_mut(bot),
            None => return Ok(true), // human seat mated: no engine to probe with, trust shakmaty
        };

        engine.set_position(&fen, &[]).await?;
        let mv = engine.best_move(100).await?;
        Ok(mv == "(none)" || mv == "0000")
    }

    fn engine_mut(&mut self, bot: BotId) -> &mut T {
        match bot {
            BotId::Bot1 => &mut self.bot1,
            BotId::Partner => &mut self.partner,
            BotId::Bot2 => &mut self.bot2,
        }
    }

    /// Decide whether `bot` should stall on the piece it's about to
    /// play rather than play it immediately, rolling against the
    /// configured probability table. Updates activity bookkeeping and
    /// publishes `StallEntered`/`StallExited`.
    pub fn evaluate_stall(&mut self, bot: BotId, role: Role, reason: StallReason, forced: bool, now: Instant) -> StallDecision {
        let clocks = self.clocks.snapshot_at(now);
        let decision = crate::stall::should_stall(&self.stall_table, &mut self.rng, &clocks, bot, role, reason, forced);
        match decision {
            StallDecision::Stall => {
                self.activity.insert(bot, BotActivity::Sitting(reason));
                self.events.publish(GameEvent::StallEntered { bot, piece: role, reason });
            }
            StallDecision::Move => {
                if matches!(self.activity.get(&bot), Some(BotActivity::Sitting(_))) {
                    self.activity.insert(bot, BotActivity::Active);
                    self.events.publish(GameEvent::StallExited { bot, cause: StallExitCause::ConditionResolved });
                }
            }
        }
        decision
    }

    pub fn activity_of(&self, bot: BotId) -> &BotActivity {
        self.activity.get(&bot).unwrap_or(&BotActivity::Active)
    }

    /// Query `bot`'s engine for its current evaluation of `fen` at
    /// `depth`, normalized to `our_color`'s perspective (spec.md §4.6.1
    /// steps 1–3). Collects `info` lines until `bestmove`, keeping the
    /// last score seen — matching `parse_info_to_best_moves`'s
    /// habit of treating the final `info` line before `bestmove` as
    /// authoritative.
    /// `side_to_move` and `our_color` are taken separately even though
    /// every caller in this file passes the same value for both (it's
    /// always the bot's own turn when it's deciding whether to stall);
    /// kept distinct because [`evaluation::normalize`] only needs to
    /// know "whose turn does the FEN say it is" vs. "whose perspective
    /// do we want the result in", which aren't the same bot if this is
    /// ever called to evaluate a position on somebody else's turn.
    async fn query_score(&mut self, bot: BotId, fen: &str, depth: u32, side_to_move: Color, our_color: Color) -> OrchestratorResult<NormalizedScore> {
        let engine = self.engine_mut(bot);
        engine.set_position(fen, &[]).await?;
        engine.send_command(&format!("go depth {depth}")).await?;
        let mut last_raw = None;
        loop {
            let line = engine.read_line().await?;
            if let Some(raw) = evaluation::parse_info_score(&line) {
                last_raw = Some(raw);
            }
            if line.starts_with("bestmove") {
                break;
            }
        }
        let raw = last_raw.ok_or(OrchestratorError::EvaluationFailure)?;
        Ok(evaluation::normalize(raw, side_to_move, our_color))
    }

    /// Run the full should-stall decision cycle for `bot`, who is about
    /// to play `role` on `board` (spec.md §4.6.1): evaluate the current
    /// position, evaluate the hypothetical position with `role` added to
    /// `bot`'s own holdings, classify the swing between the two, and
    /// roll against the probability table via [`Self::evaluate_stall`].
    /// Returns `StallDecision::Move` with no state change when the swing
    /// doesn't match any of the three stall-eligible shapes.
    pub async fn run_stall_decision(&mut self, bot: BotId, board: BoardId, role: Role, depth: u32, now: Instant) -> OrchestratorResult<StallDecision> {
        let our_color = self.board(board).turn();

        let baseline_fen = self.board(board).to_fen_with_holdings();
        let baseline = self.query_score(bot, &baseline_fen, depth, our_color, our_color).await?;

        let mut hypothetical_board = self.board(board).clone();
        hypothetical_board.holdings_mut().add(our_color, role);
        let hypothetical_fen = hypothetical_board.to_fen_with_holdings();
        let hypothetical = self.query_score(bot, &hypothetical_fen, depth, our_color, our_color).await?;

        match classify_stall_swing(baseline, hypothetical) {
            Some((reason, forced)) => Ok(self.evaluate_stall(bot, role, reason, forced, now)),
            None => Ok(StallDecision::Move),
        }
    }

    /// Run one ply of the partner-board decision procedure for `bot`,
    /// who is to move on `board` (spec.md §4.6): try each role `bot`
    /// currently holds, lowest-value first, for a stall-worthy swing; the
    /// first one that rolls `Stall` wins and an outbound partner request
    /// is issued instead of moving. If none does, `bot` plays an ordinary
    /// move via [`Self::play_move`].
    pub async fn run_decision_cycle(&mut self, bot: BotId, board: BoardId, depth: u32, now: Instant) -> OrchestratorResult<()> {
        if self.status != ControllerStatus::InProgress {
            return Err(OrchestratorError::GameNotInProgress);
        }
        if matches!(self.activity.get(&bot), Some(BotActivity::Sitting(_))) {
            return Ok(());
        }

        let held_color = self.board(board).turn();
        for role in [Role::Pawn, Role::Knight, Role::Bishop, Role::Rook, Role::Queen] {
            if self.board(board).holdings().count(held_color, role) == 0 {
                continue;
            }
            let decision = self.run_stall_decision(bot, board, role, depth, now).await?;
            if decision == StallDecision::Stall {
                self.issue_partner_request(bot, role);
                return Ok(());
            }
        }

        self.play_move(bot, board).await
    }

    /// Switch `bot`'s engine to whichever loaded variant gives `role` its
    /// forcing-line treatment under the configured bias strategy
    /// (spec.md §4.6.4 step 3). A no-op if no variant table is loaded, no
    /// matching variant exists, or the strategy is `Proximity` (which has
    /// no variant file of its own).
    async fn apply_forcing_variant(&mut self, bot: BotId, role: Role) -> OrchestratorResult<()> {
        let variant_name = match &self.variant_table {
            Some(table) => table.find_for_role(role, self.bias_strategy).map(str::to_string),
            None => None,
        };
        let Some(variant_name) = variant_name else { return Ok(()) };
        let mut options = HashMap::new();
        options.insert("UCI_Variant".to_string(), variant_name);
        self.engine_mut(bot).set_options(&options).await?;
        Ok(())
    }

    /// Select and play `bot`'s move on `board` (spec.md §4.6.4): a short
    /// forced mate always plays straight through; otherwise, if some
    /// other bot is waiting on `bot` to deliver a particular piece,
    /// restrict the search to the legal captures that would fulfill it
    /// (switching to a forcing-line variant first where the bias strategy
    /// calls for one); failing either of those, play the engine's
    /// ordinary best move.
    async fn play_move(&mut self, bot: BotId, board: BoardId) -> OrchestratorResult<()> {
        let fen = self.board(board).to_fen_with_holdings();
        let our_color = self.board(board).turn();

        let score = self.query_score(bot, &fen, 6, our_color, our_color).await?;

        let mv_str = if score.is_short_mate_for_us() {
            self.engine_mut(bot).set_position(&fen, &[]).await?;
            self.engine_mut(bot).best_move(1000).await?
        } else if let Some(request) = self.request_targeting(bot) {
            let candidates = variant::request_candidates(self.board(board), request);
            if candidates.is_empty() {
                self.engine_mut(bot).set_position(&fen, &[]).await?;
                self.engine_mut(bot).best_move(1000).await?
            } else {
                self.apply_forcing_variant(bot, request.role).await?;
                self.engine_mut(bot).set_position(&fen, &[]).await?;
                self.engine_mut(bot).best_move_with_searchmoves(1000, &candidates).await?
            }
        } else {
            self.engine_mut(bot).set_position(&fen, &[]).await?;
            self.engine_mut(bot).best_move(1000).await?
        };

        if mv_str == "(none)" || mv_str == "0000" {
            return Err(invariant_violation!("{bot:?} had no legal move while it was its turn to move"));
        }

        let mv = parse_engine_move(self.board(board).position(), &mv_str)?;
        self.apply_move(board, mv).await
    }

    /// Resign a side, ending the game immediately in favor of its
    /// opponent on `board`.
    pub fn resign(&mut self, board: BoardId, resigning_color: Color) {
        if self.game_over.is_some() {
            return;
        }
        let winner = resigning_color.other();
        self.game_over = Some(GameStatus::Resignation { board, winner });
        self.status = ControllerStatus::Over;
        self.events.publish(GameEvent::GameOver { status: GameStatus::Resignation { board, winner } });
    }

    /// Abort the game without declaring a winner (both engines are
    /// still live and should be shut down by the caller via
    /// [`GameController::shutdown`]).
    pub fn abort(&mut self) {
        if self.game_over.is_some() {
            return;
        }
        self.game_over = Some(GameStatus::Aborted);
        self.status = ControllerStatus::Over;
        self.events.publish(GameEvent::GameOver { status: GameStatus::Aborted });
    }

    /// Mark the controller over. The three transports are not killed
    /// here: for a pooled production transport, dropping `self` returns
    /// each engine to its pool for the next game to reuse (spec.md §5);
    /// a caller that wants the underlying processes gone entirely should
    /// shut down the pool itself once no game still references it.
    pub async fn shutdown(&mut self) -> OrchestratorResult<()> {
        self.status = ControllerStatus::Over;
        Ok(())
    }
}

/// Parse an engine's raw move reply (`e2e4`, `e7e8q`, a drop `N@e4`, or a
/// UCI null move) into a validated [`Move`] against `position`. Mirrors
/// the `UciMove::from_ascii(..).to_move(&pos)` idiom used throughout the
/// teacher's own engine-reply handling (`engine/process.rs`,
/// `engine/communication.rs`, `chess/process.rs`).
fn parse_engine_move(position: &shakmaty::Chess, mv_str: &str) -> OrchestratorResult<Move> {
    let uci = UciMove::from_ascii(mv_str.as_bytes())?;
    let mv = uci.to_move(position)?;
    Ok(match mv {
        shakmaty::Move::Put { role, to } => Move::Drop { role, to },
        other => Move::Board(other),
    })
}

/// Classify the swing from `baseline` (bot's current evaluation) to
/// `hypothetical` (evaluation if `role` were already in hand), per
/// spec.md §4.6.1 steps 4–6. A mate-in-1 save is always `forced`
/// (subject to the up-on-time gate applied later in
/// [`crate::stall::should_stall`]); the other two shapes are not.
fn classify_stall_swing(baseline: NormalizedScore, hypothetical: NormalizedScore) -> Option<(StallReason, bool)> {
    let baseline_being_mated = matches!(baseline, NormalizedScore::Mate(n) if n < 0);
    let hypothetical_not_mated = !matches!(hypothetical, NormalizedScore::Mate(n) if n < 0);
    if baseline_being_mated && hypothetical_not_mated {
        let forced = baseline.is_mate_in_one_against_us();
        return Some((StallReason::SavesFromMate, forced));
    }

    if !baseline.is_short_mate_for_us() && hypothetical.is_short_mate_for_us() {
        return Some((StallReason::ForcesMate, false));
    }

    if baseline.as_cp() < 0 && hypothetical.as_cp() > 0 {
        return Some((StallReason::LostToWinning, false));
    }

    None
}
