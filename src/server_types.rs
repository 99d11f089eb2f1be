use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Scene name the platform uses when a conversation begins.
pub const START_SCENE: &str = "actions.scene.START_CONVERSATION";

/// One incoming turn.
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct TurnRequest {
    pub session: Session,
    pub scene: Scene,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub intent: Option<Intent>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Session {
    pub id: String,

    /// The game state, as last returned by us.
    #[serde(default)]
    pub params: Value,
}

/// The scene is echoed back exactly as received. An absent field stays
/// absent and an explicit `null` stays `null`.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Scene {
    pub name: String,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub slots: Option<Value>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub next: Option<Value>,
}

impl Scene {
    /// The slot map, or `null` when the platform sent none.
    pub fn slots(&self) -> &Value {
        self.slots.as_ref().unwrap_or(&Value::Null)
    }
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Intent {
    pub name: String,
}

/// The reply to one turn.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TurnResponse {
    pub session: Session,
    pub prompt: Prompt,
    pub scene: Scene,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Prompt {
    pub r#override: bool,
    #[serde(rename = "firstSimple")]
    pub first_simple: Simple,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Simple {
    pub speech: String,
}

/// What a turn decided: the words to say, and new session params if any.
#[derive(Debug, Clone, PartialEq)]
pub struct TurnOutcome {
    pub speech: String,
    pub params: Option<Value>,
}

impl TurnOutcome {
    /// Narration only; the caller's params are echoed.
    pub fn say(speech: impl Into<String>) -> Self {
        TurnOutcome {
            speech: speech.into(),
            params: None,
        }
    }

    pub fn with_params(speech: impl Into<String>, params: Value) -> Self {
        TurnOutcome {
            speech: speech.into(),
            params: Some(params),
        }
    }
}

impl TurnResponse {
    /// Builds the reply envelope. Session id and scene are copied through.
    pub fn compose(request: &TurnRequest, outcome: TurnOutcome) -> Self {
        TurnResponse {
            session: Session {
                id: request.session.id.clone(),
                params: outcome
                    .params
                    .unwrap_or_else(|| request.session.params.clone()),
            },
            prompt: Prompt {
                r#override: false,
                first_simple: Simple {
                    speech: outcome.speech,
                },
            },
            scene: request.scene.clone(),
        }
    }
}

/// `GET /` payload describing the service.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct ServiceInfo {
    pub id: String,
    pub description: String,
    /// The thinking interval given to the engine, in milliseconds.
    pub think_ms: u64,
}
