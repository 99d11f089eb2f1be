use shakmaty::{uci::Uci, CastlingMode, Chess, Color, Move, Position, Role, Square};

use crate::{codec, error::TurnError, moves::MoveIntent};

/// What the position says about the game after a half-move.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TerminalStatus {
    None,
    Check,
    Checkmate,
    Stalemate,
    InsufficientMaterial,
}

impl TerminalStatus {
    /// Checkmate, draw, stalemate, check: the first condition that holds wins.
    /// Draw means insufficient material only; the 50-move rule is not reported.
    pub fn of(position: &Chess) -> Self {
        if position.is_checkmate() {
            TerminalStatus::Checkmate
        } else if position.is_insufficient_material() {
            TerminalStatus::InsufficientMaterial
        } else if position.is_stalemate() {
            TerminalStatus::Stalemate
        } else if position.is_check() {
            TerminalStatus::Check
        } else {
            TerminalStatus::None
        }
    }

    /// True when no further half-move may be played.
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            TerminalStatus::Checkmate | TerminalStatus::Stalemate | TerminalStatus::InsufficientMaterial
        )
    }
}

/// A half-move that the oracle accepted and applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppliedMove {
    pub from: Square,
    pub to: Square,
    pub role: Role,
    pub promotion: Option<Role>,
}

impl AppliedMove {
    fn of(m: &Move) -> Option<Self> {
        match m.to_uci(CastlingMode::Standard) {
            Uci::Normal {
                from,
                to,
                promotion,
            } => Some(AppliedMove {
                from,
                to,
                role: m.role(),
                promotion,
            }),
            _ => None,
        }
    }
}

/// Thin call boundary around the shakmaty rules engine. Owns the position
/// for the duration of one turn.
#[derive(Debug, Clone)]
pub struct RulesOracle {
    position: Chess,
}

impl RulesOracle {
    pub fn new(position: Chess) -> Self {
        RulesOracle { position }
    }

    /// Restores the oracle from a position token.
    pub fn load(token: &str) -> Result<Self, TurnError> {
        codec::decode(token).map(RulesOracle::new)
    }

    /// Plays the first legal move of the stated piece kind that lands on the
    /// stated square. Captures need no marker. Promotions choose the queen.
    ///
    /// Returns `None` and leaves the position untouched when nothing matches.
    pub fn attempt_move(&mut self, intent: &MoveIntent) -> Option<AppliedMove> {
        let role = intent.piece.role();
        let found = self
            .position
            .legal_moves()
            .into_iter()
            .find(|m| {
                m.role() == role
                    && m.promotion().map_or(true, |p| p == Role::Queen)
                    && AppliedMove::of(m).map_or(false, |a| a.to == intent.square)
            })?;
        self.apply(&found)
    }

    /// Plays a move given in UCI notation, as reported by the engine.
    pub fn apply_uci(&mut self, uci: &Uci) -> Option<AppliedMove> {
        let m = uci.to_move(&self.position).ok()?;
        self.apply(&m)
    }

    fn apply(&mut self, m: &Move) -> Option<AppliedMove> {
        let applied = AppliedMove::of(m)?;
        self.position.play_unchecked(m);
        Some(applied)
    }

    pub fn position(&self) -> &Chess {
        &self.position
    }

    pub fn into_position(self) -> Chess {
        self.position
    }

    /// The position token after the moves played so far.
    pub fn current_position(&self) -> String {
        codec::encode(&self.position)
    }

    pub fn terminal_status(&self) -> TerminalStatus {
        TerminalStatus::of(&self.position)
    }

    pub fn turn(&self) -> Color {
        self.position.turn()
    }
}
