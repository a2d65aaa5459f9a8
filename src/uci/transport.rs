//! UCI subprocess transport (C1).
//!
//! Mirrors `EngineProcess` (`engine/process.rs`): spawn a
//! child process with piped stdio, run the `uci`/`uciok`/`isready`/
//! `readyok` handshake under a timeout, then expose `send_command` and a
//! line-by-line reader. The one structural change from that shape is
//! that [`UciProcess`] is generic over its reader/writer halves, so
//! tests can plug in a `tokio::io::duplex` pair wired to a scripted fake
//! engine instead of spawning a real UCI binary.

use crate::error::{OrchestratorError, OrchestratorResult};
use std::collections::HashMap;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader, Lines};
use tokio::process::{Child, ChildStdin, ChildStdout};
use tokio::time::timeout;
use vampirc_uci::{parse_one, UciMessage};

const ENGINE_INIT_TIMEOUT: Duration = Duration::from_secs(10);
const ENGINE_STOP_TIMEOUT: Duration = Duration::from_secs(8);
const ENGINE_QUICK_STOP_TIMEOUT: Duration = Duration::from_millis(500);

/// A live UCI engine transport: a writer half and a line-buffered
/// reader half, plus the child handle when backed by a real process.
pub struct UciProcess<R, W> {
    child: Option<Child>,
    writer: W,
    lines: Lines<BufReader<R>>,
    name: String,
}

impl UciProcess<ChildStdout, ChildStdin> {
    /// Spawn `path` and run the `uci`/`isready` handshake. Grounded on
    /// `spawn_engine_process` + `initialize_uci` in
    /// `engine/process.rs`: stdio fully piped, `TERM=dumb` so engines
    /// that sniff the terminal don't try to colorize their output.
    pub async fn spawn(path: &str, name: impl Into<String>) -> OrchestratorResult<Self> {
        let mut command = tokio::process::Command::new(path);
        command
            .stdin(std::process::Stdio::piped())
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .env("TERM", "dumb")
            .kill_on_drop(true);

        let mut child = command.spawn()?;
        let stdin = child.stdin.take().ok_or(OrchestratorError::NoStdin)?;
        let stdout = child.stdout.take().ok_or(OrchestratorError::NoStdout)?;
        if let Some(stderr) = child.stderr.take() {
            spawn_stderr_drain(stderr, "engine");
        }
        let lines = BufReader::new(stdout).lines();

        let mut process = UciProcess { child: Some(child), writer: stdin, lines, name: name.into() };
        process.initialize().await?;
        Ok(process)
    }
}

impl<R, W> UciProcess<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    /// Wrap an already-connected reader/writer pair without running a
    /// real handshake, used by tests that drive a scripted fake engine.
    #[cfg(test)]
    pub(crate) fn from_halves(reader: R, writer: W, name: impl Into<String>) -> Self {
        UciProcess { child: None, writer, lines: BufReader::new(reader).lines(), name: name.into() }
    }

    async fn initialize(&mut self) -> OrchestratorResult<()> {
        timeout(ENGINE_INIT_TIMEOUT, async {
            self.send_command("uci").await?;
            self.wait_for_line(|l| l.trim() == "uciok").await?;
            self.send_command("isready").await?;
            self.wait_for_line(|l| l.trim() == "readyok").await?;
            Ok::<_, OrchestratorError>(())
        })
        .await
        .map_err(|_| OrchestratorError::InitTimeout)??;
        log::info!("engine {} initialized", self.name);
        Ok(())
    }

    /// Send a raw UCI command, appending the trailing newline.
    pub async fn send_command(&mut self, command: &str) -> OrchestratorResult<()> {
        log::trace!("-> {}: {command}", self.name);
        let line = format!("{command}\n");
        self.writer.write_all(line.as_bytes()).await.map_err(classify_write_error)?;
        self.writer.flush().await.map_err(classify_write_error)?;
        Ok(())
    }

    /// Read lines until `predicate` matches one, discarding the rest.
    /// Every line read (including discarded ones) is logged at trace
    /// level so a hung handshake is debuggable from logs alone.
    pub async fn wait_for_line(&mut self, predicate: impl Fn(&str) -> bool) -> OrchestratorResult<String> {
        loop {
            let line = self.read_line().await?;
            if predicate(&line) {
                return Ok(line);
            }
        }
    }

    pub async fn read_line(&mut self) -> OrchestratorResult<String> {
        match self.lines.next_line().await {
            Ok(Some(line)) => {
                log::trace!("<- {}: {line}", self.name);
                Ok(line)
            }
            Ok(None) => Err(OrchestratorError::BrokenPipe),
            Err(e) => Err(classify_write_error(e)),
        }
    }

    /// Read one line with a bounded wait, used by the controller's poll
    /// loop so it can interleave reads from several engines without
    /// blocking forever on a silent one.
    pub async fn try_read_line(&mut self, wait: Duration) -> OrchestratorResult<Option<String>> {
        match timeout(wait, self.read_line()).await {
            Ok(result) => result.map(Some),
            Err(_) => Ok(None),
        }
    }

    /// `setoption name N value V` for each entry, then a fresh
    /// `isready`/`readyok` sync so a caller knows every option has taken
    /// effect before the next `position`/`go`. Mirrors `set_option` in
    /// `engine/process.rs`, generalized from one option at a time to a
    /// batch.
    pub async fn set_options(&mut self, options: &HashMap<String, String>) -> OrchestratorResult<()> {
        for (name, value) in options {
            self.send_command(&format!("setoption name {name} value {value}")).await?;
        }
        self.send_command("isready").await?;
        self.wait_for_line(|l| l.trim() == "readyok").await?;
        Ok(())
    }

    /// `position fen F [moves …]`, matching `build_position_command` in
    /// `engine/process.rs`.
    pub async fn set_position(&mut self, fen: &str, moves: &[String]) -> OrchestratorResult<()> {
        let command = if moves.is_empty() {
            format!("position fen {fen}")
        } else {
            format!("position fen {fen} moves {}", moves.join(" "))
        };
        self.send_command(&command).await
    }

    /// `go movetime T`, then wait for `bestmove` and return the move
    /// string (`e2e4`, `e7e8q`, a drop `P@e4`, or a sentinel `0000`/
    /// `(none)` for "no legal move").
    pub async fn best_move(&mut self, time_ms: u64) -> OrchestratorResult<String> {
        self.send_command(&format!("go movetime {time_ms}")).await?;
        let line = self.wait_for_line(|l| l.starts_with("bestmove")).await?;
        parse_bestmove_line(&line)
    }

    /// Like [`Self::best_move`] but restricts the search root to
    /// `candidates` via `searchmoves`, the move-biasing procedure's way
    /// of steering the engine toward a request-fulfilling capture
    /// without disabling its own search.
    pub async fn best_move_with_searchmoves(&mut self, time_ms: u64, candidates: &[String]) -> OrchestratorResult<String> {
        let command = format!("go movetime {time_ms} searchmoves {}", candidates.join(" "));
        self.send_command(&command).await?;
        let line = self.wait_for_line(|l| l.starts_with("bestmove")).await?;
        parse_bestmove_line(&line)
    }

    /// Progressive stop: `stop`, short wait, `stop` again, longer wait,
    /// matching the `wait_for_stop_with_fallback` retry shape.
    pub async fn stop(&mut self) -> OrchestratorResult<()> {
        self.send_command("stop").await?;
        if timeout(ENGINE_QUICK_STOP_TIMEOUT, self.wait_for_line(|l| l.starts_with("bestmove"))).await.is_ok() {
            return Ok(());
        }
        self.send_command("stop").await?;
        timeout(ENGINE_STOP_TIMEOUT, self.wait_for_line(|l| l.starts_with("bestmove")))
            .await
            .map_err(|_| OrchestratorError::StopTimeout)??;
        Ok(())
    }

    /// Graceful `quit`, falling back to a hard kill if the process
    /// doesn't exit on its own. No-op on a test-only transport with no
    /// backing child process.
    pub async fn kill(&mut self) -> OrchestratorResult<()> {
        let _ = self.send_command("quit").await;
        if let Some(mut child) = self.child.take() {
            match timeout(Duration::from_millis(500), child.wait()).await {
                Ok(_) => {}
                Err(_) => {
                    log::warn!("engine {} did not exit after quit, killing", self.name);
                    let _ = child.kill().await;
                }
            }
        }
        Ok(())
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// The subset of [`UciProcess`] the controller needs, extracted as a
/// trait so [`crate::controller::GameController`] can be generic over a
/// real subprocess transport in production and an in-memory duplex pair
/// wired to a scripted fake engine in tests.
pub trait EngineTransport: Send {
    async fn send_command(&mut self, command: &str) -> OrchestratorResult<()>;
    async fn wait_for_line(&mut self, predicate: impl Fn(&str) -> bool + Send) -> OrchestratorResult<String>;
    async fn read_line(&mut self) -> OrchestratorResult<String>;
    async fn set_options(&mut self, options: &HashMap<String, String>) -> OrchestratorResult<()>;
    async fn set_position(&mut self, fen: &str, moves: &[String]) -> OrchestratorResult<()>;
    async fn best_move(&mut self, time_ms: u64) -> OrchestratorResult<String>;
    async fn best_move_with_searchmoves(&mut self, time_ms: u64, candidates: &[String]) -> OrchestratorResult<String>;
    async fn stop(&mut self) -> OrchestratorResult<()>;
    async fn kill(&mut self) -> OrchestratorResult<()>;
    fn name(&self) -> &str;
}

impl<R, W> EngineTransport for UciProcess<R, W>
where
    R: AsyncRead + Unpin + Send,
    W: AsyncWrite + Unpin + Send,
{
    async fn send_command(&mut self, command: &str) -> OrchestratorResult<()> {
        UciProcess::send_command(self, command).await
    }

    async fn wait_for_line(&mut self, predicate: impl Fn(&str) -> bool + Send) -> OrchestratorResult<String> {
        UciProcess::wait_for_line(self, predicate).await
    }

    async fn read_line(&mut self) -> OrchestratorResult<String> {
        UciProcess::read_line(self).await
    }

    async fn set_options(&mut self, options: &HashMap<String, String>) -> OrchestratorResult<()> {
        UciProcess::set_options(self, options).await
    }

    async fn set_position(&mut self, fen: &str, moves: &[String]) -> OrchestratorResult<()> {
        UciProcess::set_position(self, fen, moves).await
    }

    async fn best_move(&mut self, time_ms: u64) -> OrchestratorResult<String> {
        UciProcess::best_move(self, time_ms).await
    }

    async fn best_move_with_searchmoves(&mut self, time_ms: u64, candidates: &[String]) -> OrchestratorResult<String> {
        UciProcess::best_move_with_searchmoves(self, time_ms, candidates).await
    }

    async fn stop(&mut self) -> OrchestratorResult<()> {
        UciProcess::stop(self).await
    }

    async fn kill(&mut self) -> OrchestratorResult<()> {
        UciProcess::kill(self).await
    }

    fn name(&self) -> &str {
        UciProcess::name(self)
    }
}

/// Extract the move token from a `bestmove` line via `vampirc_uci`,
/// matching `parse_message` (`engine/communication.rs`). Engines answer
/// "no legal move" with `0000`/`(none)`, neither of which is a
/// well-formed UCI move, so a parse miss falls back to the raw
/// whitespace-split token rather than treating it as a transport error.
fn parse_bestmove_line(line: &str) -> OrchestratorResult<String> {
    match parse_one(line) {
        UciMessage::BestMove { best_move, .. } => Ok(best_move.to_string()),
        _ => line
            .split_whitespace()
            .nth(1)
            .map(str::to_string)
            .ok_or_else(|| OrchestratorError::ProtocolParseError(line.to_string())),
    }
}

fn classify_write_error(err: std::io::Error) -> OrchestratorError {
    if err.raw_os_error() == Some(32) || err.kind() == std::io::ErrorKind::BrokenPipe {
        OrchestratorError::BrokenPipe
    } else {
        OrchestratorError::Io(err)
    }
}

/// Drain an engine's stderr to `warn!` in the background, the way the
/// `spawn_stderr_handler` does, so a noisy engine never blocks
/// its own stdout pipe by filling the stderr buffer.
fn spawn_stderr_drain(stderr: tokio::process::ChildStderr, tag: &str) {
    let tag = tag.to_string();
    tokio::spawn(async move {
        let mut lines = BufReader::new(stderr).lines();
        while let Ok(Some(line)) = lines.next_line().await {
            log::warn!("[{tag} stderr] {line}");
        }
    });
}
