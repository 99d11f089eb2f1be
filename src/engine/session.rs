use std::{str::FromStr, time::Duration};

use async_trait::async_trait;
use shakmaty::uci::Uci;
use tokio::time::{sleep, timeout_at, Instant};

use crate::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Started,
    Handshaken,
    Ready,
    NewGame,
    Positioned,
    Searching,
    Stopping,
    MoveReceived,
    Terminated,
}

/// A line-oriented connection to a UCI engine.
#[async_trait]
pub trait UciChannel: Send {
    async fn send(&mut self, line: &str) -> std::io::Result<()>;

    /// Next line of engine output, `None` once the engine closed it.
    async fn recv(&mut self) -> std::io::Result<Option<String>>;

    /// Shuts the engine down. Must not fail.
    async fn terminate(&mut self);
}

/// Starts engine processes.
#[async_trait]
pub trait Launcher: Send + Sync {
    type Channel: UciChannel;

    async fn launch(&self) -> Result<Self::Channel, EngineError>;
}

/// Time limits for one search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchLimits {
    /// How long the engine searches before it is told to stop.
    pub think_time: Duration,
    /// Ceiling on every wait for an engine reply.
    pub reply_timeout: Duration,
}

impl Default for SearchLimits {
    fn default() -> Self {
        SearchLimits {
            think_time: Duration::from_millis(150),
            reply_timeout: Duration::from_secs(2),
        }
    }
}

/// Runs a full session against `fen` and returns the engine's best move.
///
/// The subprocess is terminated whether or not the search succeeded.
pub async fn best_move<L: Launcher>(
    launcher: &L,
    limits: SearchLimits,
    fen: &str,
) -> Result<Uci, EngineError> {
    let mut session = EngineSession::start(launcher, limits).await?;
    let result = session.search(fen).await;
    if let Err(ref e) = result {
        log::warn!("engine search aborted in state {:?}: {e}", session.state());
    }
    session.terminate().await;
    result
}

/// One engine subprocess, driven through a single search.
///
/// ```text
/// Idle -> Started -> Handshaken -> Ready -> NewGame -> Positioned
///      -> Searching -> Stopping -> MoveReceived -> Terminated
/// ```
///
/// Every step waits for the previous one to finish. A session is created per
/// turn and torn down by [`best_move`] on every exit path.
pub struct EngineSession<C> {
    channel: C,
    state: SessionState,
    limits: SearchLimits,
}

impl<C: UciChannel> EngineSession<C> {
    pub async fn start<L>(launcher: &L, limits: SearchLimits) -> Result<Self, EngineError>
    where
        L: Launcher<Channel = C>,
    {
        log::debug!("starting engine");
        let channel = launcher.launch().await?;
        Ok(EngineSession {
            channel,
            state: SessionState::Started,
            limits,
        })
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    async fn search(&mut self, fen: &str) -> Result<Uci, EngineError> {
        self.handshake().await?;
        self.confirm_ready().await?;
        self.new_game().await?;
        self.set_position(fen).await?;
        self.begin_search().await?;
        self.think().await?;
        self.stop().await
    }

    pub async fn handshake(&mut self) -> Result<(), EngineError> {
        self.transition(SessionState::Started, "uci")?;
        self.send("uci", "uci").await?;
        self.expect("uciok").await?;
        self.state = SessionState::Handshaken;
        Ok(())
    }

    pub async fn confirm_ready(&mut self) -> Result<(), EngineError> {
        self.transition(SessionState::Handshaken, "isready")?;
        self.send("isready", "isready").await?;
        self.expect("readyok").await?;
        self.state = SessionState::Ready;
        Ok(())
    }

    pub async fn new_game(&mut self) -> Result<(), EngineError> {
        self.transition(SessionState::Ready, "ucinewgame")?;
        self.send("ucinewgame", "ucinewgame").await?;
        self.state = SessionState::NewGame;
        Ok(())
    }

    pub async fn set_position(&mut self, fen: &str) -> Result<(), EngineError> {
        self.transition(SessionState::NewGame, "position")?;
        self.send("position", &format!("position fen {fen}")).await?;
        self.state = SessionState::Positioned;
        Ok(())
    }

    /// Starts a search with no depth or node limit.
    pub async fn begin_search(&mut self) -> Result<(), EngineError> {
        self.transition(SessionState::Positioned, "go")?;
        self.send("go", "go infinite").await?;
        self.state = SessionState::Searching;
        Ok(())
    }

    /// Lets the engine search for the configured interval.
    pub async fn think(&mut self) -> Result<(), EngineError> {
        self.transition(SessionState::Searching, "think")?;
        sleep(self.limits.think_time).await;
        self.state = SessionState::Stopping;
        Ok(())
    }

    pub async fn stop(&mut self) -> Result<Uci, EngineError> {
        self.transition(SessionState::Stopping, "stop")?;
        self.send("stop", "stop").await?;
        let line = self.expect("bestmove").await?;
        let uci = parse_bestmove(&line)?;
        self.state = SessionState::MoveReceived;
        Ok(uci)
    }

    /// Shuts the subprocess down and returns the state it was left in.
    pub async fn terminate(mut self) -> SessionState {
        log::debug!("quit");
        self.channel.terminate().await;
        self.state = SessionState::Terminated;
        self.state
    }

    fn transition(&self, expected: SessionState, step: &'static str) -> Result<(), EngineError> {
        if self.state == expected {
            log::debug!("{step}");
            Ok(())
        } else {
            Err(EngineError::Protocol {
                step,
                reason: format!("expected state {expected:?}, found {:?}", self.state),
            })
        }
    }

    async fn send(&mut self, step: &'static str, line: &str) -> Result<(), EngineError> {
        self.channel
            .send(line)
            .await
            .map_err(|e| EngineError::Protocol {
                step,
                reason: e.to_string(),
            })
    }

    /// Reads until a line starting with `expected` arrives.
    async fn expect(&mut self, expected: &'static str) -> Result<String, EngineError> {
        let after = self.limits.reply_timeout;
        let deadline = Instant::now() + after;
        loop {
            let line = match timeout_at(deadline, self.channel.recv()).await {
                Err(_) => return Err(EngineError::Timeout { expected, after }),
                Ok(Err(e)) => {
                    return Err(EngineError::Protocol {
                        step: expected,
                        reason: e.to_string(),
                    })
                }
                Ok(Ok(None)) => return Err(EngineError::Closed { expected }),
                Ok(Ok(Some(line))) => line,
            };
            if line.split_whitespace().next() == Some(expected) {
                return Ok(line);
            }
            log::trace!("engine: {line}");
        }
    }
}

/// Parses `bestmove <move> [ponder <move>]`.
fn parse_bestmove(line: &str) -> Result<Uci, EngineError> {
    let token = line
        .split_whitespace()
        .nth(1)
        .ok_or(EngineError::NoMove)?;
    if token == "(none)" {
        return Err(EngineError::NoMove);
    }
    match Uci::from_str(token) {
        Ok(Uci::Null) => Err(EngineError::NoMove),
        Ok(uci) => Ok(uci),
        Err(_) => Err(EngineError::Protocol {
            step: "bestmove",
            reason: format!("unparseable move {token:?}"),
        }),
    }
}
