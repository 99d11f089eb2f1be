pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod moves;
pub mod oracle;
#[cfg(feature = "server")]
pub mod server;
pub mod server_types;
pub mod turn;

use async_trait::async_trait;
use shakmaty::{uci::Uci, Chess};

pub use config::Config;
pub use error::{EngineError, TurnError};
pub use shakmaty;
pub use turn::TurnHandler;

/// The trait that defines a chess engine.
///
/// An engine takes a position and, after thinking for a while, names the move
/// it wants to play there. The turn handler plays Black with it.
///
/// ## Statefulness
/// The engine must not remember anything between calls. All game state
/// travels with the caller, so the same position may arrive from a
/// different process on the next turn, and the engine is expected to answer
/// it as if it had never seen the game before.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Calculate a move for the side to move in `position`.
    ///
    /// The move is not trusted: the caller checks it against the position
    /// before playing it.
    async fn propose_move(&self, position: &Chess) -> Result<Uci, EngineError>;
}
