use std::str::FromStr;

use serde::Deserialize;
use serde_json::Value;
use shakmaty::{fen::Fen, CastlingMode, Chess, EnPassantMode};

use crate::error::TurnError;

/// Everything we know about a game, rebuilt from scratch on every request.
///
/// The position travels as a FEN string inside the session params. It is
/// only ever produced by [`encode`], so it is always valid when we emit it.
#[derive(Deserialize, Debug, Clone)]
pub struct GameState {
    /// The authoritative position.
    #[serde(rename = "fen", deserialize_with = "position_serde::deserialize")]
    pub position: Chess,

    /// Epoch milliseconds when the game began.
    #[serde(rename = "start")]
    pub started_at: i64,

    /// Epoch milliseconds of the previous turn boundary.
    #[serde(rename = "timestamp")]
    pub last_turn_at: i64,

    /// Accumulated think time in milliseconds, White first.
    #[serde(rename = "elapsed", default)]
    pub elapsed: [u64; 2],
}

impl GameState {
    /// A fresh game in the initial position.
    pub fn new(now: i64) -> Self {
        GameState {
            position: Chess::default(),
            started_at: now,
            last_turn_at: now,
            elapsed: [0, 0],
        }
    }

    /// Rebuilds the state from the session params the caller echoed back.
    pub fn decode(params: &Value) -> Result<Self, TurnError> {
        let mut state: GameState = serde_json::from_value(params.clone())
            .map_err(|e| TurnError::MalformedState(e.to_string()))?;
        if state.last_turn_at < state.started_at {
            log::warn!(
                "turn timestamp {} predates game start {}, clamping",
                state.last_turn_at,
                state.started_at
            );
            state.last_turn_at = state.started_at;
        }
        Ok(state)
    }

    /// Serializes the state into session params.
    pub fn encode(&self) -> Value {
        serde_json::json!({
            "fen": encode(&self.position),
            "start": self.started_at,
            "timestamp": self.last_turn_at,
            "elapsed": self.elapsed,
        })
    }

    /// Charges `millis` of think time to one side. White is index 0.
    pub fn charge(&mut self, white: bool, millis: u64) {
        let side = if white { 0 } else { 1 };
        self.elapsed[side] = self.elapsed[side].saturating_add(millis);
    }

    /// Moves the turn boundary forward, never backwards.
    pub fn close_turn(&mut self, now: i64) {
        self.last_turn_at = self.last_turn_at.max(now).max(self.started_at);
    }
}

/// Parses a position token.
pub fn decode(token: &str) -> Result<Chess, TurnError> {
    Fen::from_str(token)
        .map_err(|_| TurnError::MalformedState(format!("error in parsing board's FEN {token:?}")))?
        .into_position(CastlingMode::Standard)
        .map_err(|v| {
            TurnError::MalformedState(format!("error in parsing FEN into game position: {v}"))
        })
}

/// Serializes a position into a token.
pub fn encode(position: &Chess) -> String {
    Fen::from_position(position.clone(), EnPassantMode::Legal).to_string()
}

pub mod position_serde {
    use serde::{
        de::{Error, Visitor},
        Deserializer,
    };
    use shakmaty::Chess;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Chess, D::Error> {
        struct ChessVisitor {}
        impl<'de> Visitor<'de> for ChessVisitor {
            type Value = Chess;

            fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(formatter, "a game state in the FEN format")
            }
            fn visit_str<E>(self, v: &str) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                super::decode(v).map_err(Error::custom)
            }
        }
        d.deserialize_string(ChessVisitor {})
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;
    use shakmaty::{Position, Square};

    use super::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn new_game_encodes_initial_position() {
        let params = GameState::new(1_000).encode();
        assert_eq!(params["fen"], START);
        assert_eq!(params["start"], 1_000);
        assert_eq!(params["timestamp"], 1_000);
        assert_eq!(params["elapsed"], json!([0, 0]));
    }

    #[test]
    fn decode_is_stable_after_a_move() {
        let mut pos = decode(START).unwrap();
        let m = pos
            .legal_moves()
            .into_iter()
            .find(|m| m.to() == Square::E4)
            .unwrap();
        pos.play_unchecked(&m);
        let token = encode(&pos);
        assert_ne!(token, START);
        assert_eq!(encode(&decode(&token).unwrap()), token);
    }

    #[test]
    fn bad_fen_is_malformed() {
        let err = decode("not a position").unwrap_err();
        assert!(matches!(err, TurnError::MalformedState(_)));

        let params = json!({ "fen": "8/8/8/8/8/8/8/8 w - - 0 1", "start": 0, "timestamp": 0 });
        assert!(matches!(
            GameState::decode(&params),
            Err(TurnError::MalformedState(_))
        ));
    }

    #[test]
    fn missing_params_are_malformed() {
        assert!(GameState::decode(&json!({})).is_err());
        assert!(GameState::decode(&Value::Null).is_err());
    }

    #[test]
    fn stale_timestamp_is_clamped_to_start() {
        let params = json!({ "fen": START, "start": 500, "timestamp": 100, "elapsed": [0, 0] });
        let state = GameState::decode(&params).unwrap();
        assert_eq!(state.last_turn_at, 500);
    }

    #[test]
    fn clocks_only_move_forward() {
        let mut state = GameState::new(1_000);
        state.charge(true, 250);
        state.charge(false, 150);
        state.close_turn(900);
        assert_eq!(state.elapsed, [250, 150]);
        assert_eq!(state.last_turn_at, 1_000);
        state.close_turn(4_000);
        assert_eq!(state.last_turn_at, 4_000);
    }
}
