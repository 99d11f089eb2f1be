use std::fmt;

use serde_json::Value;
use shakmaty::{Role, Square};

use crate::error::TurnError;

pub const PIECE_SLOT: &str = "Piece";
pub const FILE_SLOT: &str = "GridLetter";
pub const RANK_SLOT: &str = "GridNumber";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PieceKind {
    Pawn,
    Knight,
    King,
    Rook,
    Bishop,
    Queen,
}

impl PieceKind {
    pub fn from_name(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "pawn" => Some(PieceKind::Pawn),
            "knight" => Some(PieceKind::Knight),
            "king" => Some(PieceKind::King),
            "rook" => Some(PieceKind::Rook),
            "bishop" => Some(PieceKind::Bishop),
            "queen" => Some(PieceKind::Queen),
            _ => None,
        }
    }

    /// The SAN letter for this piece. Pawns have none.
    pub fn letter(self) -> &'static str {
        match self {
            PieceKind::Pawn => "",
            PieceKind::Knight => "N",
            PieceKind::King => "K",
            PieceKind::Rook => "R",
            PieceKind::Bishop => "B",
            PieceKind::Queen => "Q",
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            PieceKind::Pawn => "pawn",
            PieceKind::Knight => "knight",
            PieceKind::King => "king",
            PieceKind::Rook => "rook",
            PieceKind::Bishop => "bishop",
            PieceKind::Queen => "queen",
        }
    }

    pub fn role(self) -> Role {
        match self {
            PieceKind::Pawn => Role::Pawn,
            PieceKind::Knight => Role::Knight,
            PieceKind::King => Role::King,
            PieceKind::Rook => Role::Rook,
            PieceKind::Bishop => Role::Bishop,
            PieceKind::Queen => Role::Queen,
        }
    }
}

/// A player's move as spoken: which kind of piece goes to which square.
///
/// This is a hint, not a full move. The rules oracle picks the piece.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveIntent {
    pub piece: PieceKind,
    pub file: char,
    pub rank: u8,
    pub square: Square,
}

impl MoveIntent {
    /// Reads the `Piece`, `GridLetter` and `GridNumber` slots of a scene.
    pub fn from_slots(slots: &Value) -> Result<Self, TurnError> {
        let piece = match slot_value(slots, PIECE_SLOT) {
            None => PieceKind::Pawn,
            Some(raw) => PieceKind::from_name(&raw).ok_or_else(|| TurnError::InvalidSlot {
                slot: PIECE_SLOT,
                reason: format!("unknown piece {raw:?}"),
            })?,
        };

        let file = slot_value(slots, FILE_SLOT)
            .and_then(|raw| {
                let mut chars = raw.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => Some(c.to_ascii_lowercase()),
                    _ => None,
                }
            })
            .filter(|c| ('a'..='h').contains(c))
            .ok_or_else(|| TurnError::InvalidSlot {
                slot: FILE_SLOT,
                reason: "expected a letter from a to h".to_string(),
            })?;

        let rank_raw = slot_value(slots, RANK_SLOT).ok_or_else(|| TurnError::InvalidSlot {
            slot: RANK_SLOT,
            reason: "missing".to_string(),
        })?;
        let rank = rank_raw
            .parse::<i64>()
            .ok()
            .filter(|r| (1..=8).contains(r))
            .ok_or_else(|| TurnError::InvalidSlot {
                slot: RANK_SLOT,
                reason: format!("{rank_raw:?} is not a rank from 1 to 8"),
            })? as u8;

        let square = format!("{file}{rank}")
            .parse::<Square>()
            .map_err(|_| TurnError::InvalidSlot {
                slot: RANK_SLOT,
                reason: format!("no square {file}{rank}"),
            })?;

        Ok(MoveIntent {
            piece,
            file,
            rank,
            square,
        })
    }

    /// The move token: piece letter, file and rank, e.g. `Ne4` or `e4`.
    pub fn token(&self) -> String {
        format!("{}{}{}", self.piece.letter(), self.file, self.rank)
    }
}

impl fmt::Display for MoveIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} to {} {}", self.piece.name(), self.file, self.rank)
    }
}

fn slot_value(slots: &Value, name: &str) -> Option<String> {
    match slots.get(name)?.get("value")? {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(match (n.as_i64(), n.as_f64()) {
            (Some(i), _) => i.to_string(),
            (None, Some(f)) if f.fract() == 0.0 => format!("{f:.0}"),
            _ => n.to_string(),
        }),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn slots(piece: Option<&str>, letter: &str, number: Value) -> Value {
        let mut slots = json!({
            "GridLetter": { "value": letter },
            "GridNumber": { "value": number },
        });
        if let Some(piece) = piece {
            slots["Piece"] = json!({ "value": piece });
        }
        slots
    }

    #[test]
    fn pawn_has_no_letter() {
        let absent = MoveIntent::from_slots(&slots(None, "e", json!("4"))).unwrap();
        let named = MoveIntent::from_slots(&slots(Some("pawn"), "e", json!("4"))).unwrap();
        assert_eq!(absent.token(), "e4");
        assert_eq!(named.token(), "e4");
        assert_eq!(absent.square, Square::E4);
    }

    #[test]
    fn piece_letters() {
        for (name, token) in [
            ("knight", "Nf3"),
            ("king", "Kf3"),
            ("rook", "Rf3"),
            ("bishop", "Bf3"),
            ("queen", "Qf3"),
        ] {
            let intent = MoveIntent::from_slots(&slots(Some(name), "f", json!(3))).unwrap();
            assert_eq!(intent.token(), token);
        }
    }

    #[test]
    fn uppercase_letter_is_normalized() {
        let intent = MoveIntent::from_slots(&slots(Some("Knight"), "E", json!("4"))).unwrap();
        assert_eq!(intent.token(), "Ne4");
        assert_eq!(intent.to_string(), "knight to e 4");
    }

    #[test]
    fn float_rank_is_accepted() {
        let intent = MoveIntent::from_slots(&slots(None, "e", json!(4.0))).unwrap();
        assert_eq!(intent.token(), "e4");
        assert!(MoveIntent::from_slots(&slots(None, "e", json!(4.5))).is_err());
    }

    #[test]
    fn non_numeric_rank_is_rejected() {
        let err = MoveIntent::from_slots(&slots(None, "e", json!("four"))).unwrap_err();
        assert!(matches!(err, TurnError::InvalidSlot { slot: RANK_SLOT, .. }));
    }

    #[test]
    fn out_of_board_values_are_rejected() {
        assert!(MoveIntent::from_slots(&slots(None, "e", json!(9))).is_err());
        assert!(MoveIntent::from_slots(&slots(None, "e", json!(0))).is_err());
        assert!(MoveIntent::from_slots(&slots(None, "j", json!(4))).is_err());
        assert!(MoveIntent::from_slots(&slots(Some("dragon"), "e", json!(4))).is_err());
        assert!(MoveIntent::from_slots(&json!({})).is_err());
    }
}
