pub mod process;
pub mod session;

use async_trait::async_trait;
use shakmaty::{uci::Uci, Chess};

pub use process::ProcessLauncher;
pub use session::{Launcher, SearchLimits, SessionState, UciChannel};

use crate::{codec, config::EngineConfig, error::EngineError, Engine};

/// An [`Engine`] that starts a fresh UCI process for every move.
#[derive(Debug, Clone)]
pub struct UciEngine<L = ProcessLauncher> {
    launcher: L,
    limits: SearchLimits,
}

impl UciEngine<ProcessLauncher> {
    pub fn new(config: &EngineConfig) -> Self {
        UciEngine {
            launcher: ProcessLauncher::new(config.path.clone()),
            limits: config.limits,
        }
    }
}

impl<L: Launcher> UciEngine<L> {
    pub fn with_launcher(launcher: L, limits: SearchLimits) -> Self {
        UciEngine { launcher, limits }
    }

    pub fn limits(&self) -> SearchLimits {
        self.limits
    }
}

#[async_trait]
impl<L: Launcher> Engine for UciEngine<L> {
    async fn propose_move(&self, position: &Chess) -> Result<Uci, EngineError> {
        session::best_move(&self.launcher, self.limits, &codec::encode(position)).await
    }
}
