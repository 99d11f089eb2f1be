use shakmaty::Color;
use tokio::time::Instant;

use crate::{
    codec::GameState,
    moves::MoveIntent,
    oracle::{RulesOracle, TerminalStatus},
    server_types::{TurnOutcome, TurnRequest, TurnResponse, START_SCENE},
    Engine,
};

pub const OPENING: &str = "Beginning game of chess. White, your move. Say, 'move' followed by \
    Standard Algebraic Notation placement to complete your turn.";

pub const ILLEGAL_POSITION: &str = "Illegal position. White to move.";

pub const HELP: &str = "The game of chess is played by making moves specified in Standard \
    Algebraic Notation. Player Make moves for white by saying, for example, Move Pawn to E-Four, \
    to move the pawn at E-Two forward two spaces. I will move the black pieces and resume to turn \
    to you, player.";

pub const NOT_UNDERSTOOD: &str =
    "Sorry, I didn't catch that. Say 'help' to hear how to play.";

pub const GAME_OVER: &str = "This game is over. Start a new conversation to play again.";

pub const NO_GAME: &str = "There is no game in progress.";

const ENGINE_FAILED: &str = "I couldn't come up with a reply. Say any move and I will make mine first.";

const DRAW: &str = "The game is now at a draw. There is insufficient material to continue.";
const STALEMATE: &str = "The game is now in a stalemate. You've done well, human.";

/// What the caller asked for this turn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Turn {
    SessionStart,
    Move,
    QueryElapsed,
    Help,
    End,
    Unknown(String),
}

impl Turn {
    pub fn of(request: &TurnRequest) -> Self {
        if request.scene.name == START_SCENE {
            return Turn::SessionStart;
        }
        match request.intent.as_ref().map(|i| i.name.as_str()) {
            Some("MOVE") => Turn::Move,
            Some("ELAPSED") => Turn::QueryElapsed,
            Some("HELP") => Turn::Help,
            Some("actions.intent.CANCEL") | Some("STOP_MATCH") => Turn::End,
            Some(other) => Turn::Unknown(other.to_string()),
            None => Turn::Unknown(String::new()),
        }
    }
}

/// Handles turns for any number of games. Holds no game state of its own.
pub struct TurnHandler<E> {
    engine: E,
}

impl<E: Engine> TurnHandler<E> {
    pub fn new(engine: E) -> Self {
        TurnHandler { engine }
    }

    /// Handles one request. `now` is epoch milliseconds.
    pub async fn handle(&self, request: &TurnRequest, now: i64) -> TurnResponse {
        let turn = Turn::of(request);
        log::info!("session {}: {:?}", request.session.id, turn);
        let outcome = match turn {
            Turn::SessionStart => TurnOutcome::with_params(OPENING, GameState::new(now).encode()),
            Turn::Move => self.play(request, now).await,
            Turn::QueryElapsed => game_clock(request, now),
            Turn::Help => TurnOutcome::say(HELP),
            Turn::End => end_game(request, now),
            Turn::Unknown(name) => {
                log::info!("unhandled intent {name:?}");
                TurnOutcome::say(NOT_UNDERSTOOD)
            }
        };
        TurnResponse::compose(request, outcome)
    }

    async fn play(&self, request: &TurnRequest, now: i64) -> TurnOutcome {
        let mut state = match GameState::decode(&request.session.params) {
            Ok(state) => state,
            Err(e) => {
                log::warn!("{e}");
                return TurnOutcome::say(ILLEGAL_POSITION);
            }
        };
        let mut oracle = RulesOracle::new(state.position.clone());

        if oracle.terminal_status().is_terminal() {
            return TurnOutcome::say(GAME_OVER);
        }
        if oracle.turn() == Color::Black {
            return self.catch_up(state, oracle, now).await;
        }

        let intent = match MoveIntent::from_slots(request.scene.slots()) {
            Ok(intent) => intent,
            Err(e) => {
                log::info!("{e}");
                return TurnOutcome::say(ILLEGAL_POSITION);
            }
        };
        let token = intent.token();
        log::debug!("attempting move {token}");
        if oracle.attempt_move(&intent).is_none() {
            log::info!("illegal move {token}");
            return TurnOutcome::say(format!("Illegal position: '{token}'. White to move."));
        }
        state.charge(true, millis_between(state.last_turn_at, now));

        let mut speech = format!("Player moved {intent}.");
        let status = oracle.terminal_status();
        push_line(&mut speech, human_status(status));
        if status.is_terminal() {
            state.position = oracle.into_position();
            state.close_turn(now);
            return TurnOutcome::with_params(speech, state.encode());
        }

        let (reply, spent) = self.reply(&mut oracle, &mut state).await;
        push_line(&mut speech, Some(reply.as_str()));
        state.position = oracle.into_position();
        state.close_turn(now.saturating_add(spent as i64));
        TurnOutcome::with_params(speech, state.encode())
    }

    /// Plays an engine half-move left over from a turn where the engine failed.
    async fn catch_up(&self, mut state: GameState, mut oracle: RulesOracle, now: i64) -> TurnOutcome {
        log::info!("engine owes a half-move, playing it first");
        let (reply, spent) = self.reply(&mut oracle, &mut state).await;
        if oracle.turn() == Color::Black {
            return TurnOutcome::say(reply);
        }
        let mut speech = reply;
        if !oracle.terminal_status().is_terminal() {
            push_line(&mut speech, Some("White, your move."));
        }
        state.position = oracle.into_position();
        state.close_turn(now.saturating_add(spent as i64));
        TurnOutcome::with_params(speech, state.encode())
    }

    /// Asks the engine for a move and applies it. Returns the narration and
    /// the milliseconds spent.
    async fn reply(&self, oracle: &mut RulesOracle, state: &mut GameState) -> (String, u64) {
        let started = Instant::now();
        let proposed = self.engine.propose_move(oracle.position()).await;
        let spent = started.elapsed().as_millis() as u64;
        state.charge(false, spent);

        let speech = match proposed {
            Ok(uci) => match oracle.apply_uci(&uci) {
                Some(m) => {
                    let mut speech = format!("Black moves {} {}.", m.from, m.to);
                    push_line(&mut speech, engine_status(oracle.terminal_status()));
                    speech
                }
                None => {
                    log::warn!("engine proposed illegal move {uci}");
                    ENGINE_FAILED.to_string()
                }
            },
            Err(e) => {
                log::warn!("engine failed: {e}");
                ENGINE_FAILED.to_string()
            }
        };
        (speech, spent)
    }
}

fn game_clock(request: &TurnRequest, now: i64) -> TurnOutcome {
    match GameState::decode(&request.session.params) {
        Ok(state) => TurnOutcome::say(format!(
            "Game clock is at {} seconds.",
            rounded_seconds(millis_between(state.last_turn_at, now))
        )),
        Err(e) => {
            log::warn!("{e}");
            TurnOutcome::say(NO_GAME)
        }
    }
}

fn end_game(request: &TurnRequest, now: i64) -> TurnOutcome {
    match GameState::decode(&request.session.params) {
        Ok(state) => {
            let total = rounded_seconds(millis_between(state.started_at, now));
            TurnOutcome::say(format!(
                "Ending game of chess. Playtime was {} minutes {} seconds.",
                total / 60,
                total % 60
            ))
        }
        Err(e) => {
            log::warn!("{e}");
            TurnOutcome::say("Ending game of chess.")
        }
    }
}

fn human_status(status: TerminalStatus) -> Option<&'static str> {
    match status {
        TerminalStatus::Checkmate => Some(
            "Checkmate! You've beaten me. I will self-destruct in 3, 2, 1... kidding. Ha Ha.",
        ),
        TerminalStatus::InsufficientMaterial => Some(DRAW),
        TerminalStatus::Stalemate => Some(STALEMATE),
        TerminalStatus::Check => {
            Some("You have put me in check. The machines will banish me, if I lose.")
        }
        TerminalStatus::None => None,
    }
}

fn engine_status(status: TerminalStatus) -> Option<&'static str> {
    match status {
        TerminalStatus::Checkmate => {
            Some("Checkmate! Try again, mortal. I have all of eternity and never get bored.")
        }
        TerminalStatus::InsufficientMaterial => Some(DRAW),
        TerminalStatus::Stalemate => Some(STALEMATE),
        TerminalStatus::Check => Some("Check."),
        TerminalStatus::None => None,
    }
}

fn push_line(speech: &mut String, line: Option<&str>) {
    if let Some(line) = line {
        speech.push(' ');
        speech.push_str(line);
    }
}

fn millis_between(from: i64, to: i64) -> u64 {
    to.saturating_sub(from).max(0) as u64
}

fn rounded_seconds(millis: u64) -> u64 {
    (millis + 500) / 1000
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;
    use crate::engine::{
        session::tests::{Script, ScriptedLauncher, TERMINATED},
        SearchLimits, UciEngine,
    };

    fn request(scene: &str, intent: Option<&str>, params: serde_json::Value) -> TurnRequest {
        serde_json::from_value(json!({
            "session": { "id": "s1", "params": params },
            "scene": {
                "name": scene,
                "slots": { "GridLetter": { "value": "e" }, "GridNumber": { "value": "4" } },
            },
            "intent": intent.map(|name| json!({ "name": name })),
        }))
        .unwrap()
    }

    #[test]
    fn intents_dispatch() {
        let params = json!({});
        assert_eq!(Turn::of(&request(START_SCENE, None, params.clone())), Turn::SessionStart);
        assert_eq!(Turn::of(&request("Game", Some("MOVE"), params.clone())), Turn::Move);
        assert_eq!(
            Turn::of(&request("Game", Some("ELAPSED"), params.clone())),
            Turn::QueryElapsed
        );
        assert_eq!(Turn::of(&request("Game", Some("HELP"), params.clone())), Turn::Help);
        assert_eq!(
            Turn::of(&request("Game", Some("actions.intent.CANCEL"), params.clone())),
            Turn::End
        );
        assert_eq!(Turn::of(&request("Game", Some("STOP_MATCH"), params.clone())), Turn::End);
        assert_eq!(
            Turn::of(&request("Game", Some("DANCE"), params)),
            Turn::Unknown("DANCE".to_string())
        );
    }

    #[test]
    fn checkmate_is_not_also_check() {
        assert_eq!(human_status(TerminalStatus::Checkmate).map(|s| s.contains("in check")), Some(false));
        assert_eq!(engine_status(TerminalStatus::Checkmate).map(|s| s == "Check."), Some(false));
    }

    #[test]
    fn clock_rounding() {
        assert_eq!(rounded_seconds(4_499), 4);
        assert_eq!(rounded_seconds(4_500), 5);
        assert_eq!(millis_between(10, 5), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn move_through_a_scripted_engine() {
        let launcher = ScriptedLauncher::new(Script::default());
        let handler = TurnHandler::new(UciEngine::with_launcher(
            launcher.clone(),
            SearchLimits::default(),
        ));
        let start = handler.handle(&request(START_SCENE, None, json!({})), 0).await;
        let reply = handler
            .handle(&request("Game", Some("MOVE"), start.session.params.clone()), 1_000)
            .await;

        assert_eq!(
            reply.prompt.first_simple.speech,
            "Player moved pawn to e 4. Black moves e7 e5."
        );
        assert_eq!(
            reply.session.params["fen"],
            "rnbqkbnr/pppp1ppp/8/4p3/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2"
        );
        let elapsed = &reply.session.params["elapsed"];
        assert_eq!(elapsed[0], 1_000);
        assert!(elapsed[1].as_u64().unwrap() >= 150);
        assert_eq!(
            launcher.lines().iter().filter(|l| *l == TERMINATED).count(),
            1
        );
    }

    #[tokio::test(start_paused = true)]
    async fn silent_engine_keeps_the_human_move() {
        let launcher = ScriptedLauncher::new(Script {
            silent_on: Some("stop"),
            ..Script::default()
        });
        let handler = TurnHandler::new(UciEngine::with_launcher(
            launcher.clone(),
            SearchLimits::default(),
        ));
        let params = GameState::new(0).encode();
        let reply = handler
            .handle(&request("Game", Some("MOVE"), params), 0)
            .await;
        assert!(reply
            .prompt
            .first_simple
            .speech
            .starts_with("Player moved pawn to e 4. I couldn't come up with a reply."));
        assert_eq!(
            reply.session.params["fen"],
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"
        );
        assert_eq!(launcher.lines().last().map(String::as_str), Some(TERMINATED));
    }
}
