/// Trivia-style minigames played by typing answers in a channel
pub mod guess_number;
pub mod lobby;
pub mod math;

use rand::RngCore;

use crate::utils::string_utils::normalize_quotes;

pub use guess_number::GuessTheNumber;
pub use lobby::{GameLobby, LobbyStep};
pub use math::MathGame;

/// Credits for a correct answer before the game's extra reward
pub const BASE_WIN_CREDITS: i64 = 70;

/// Result of one answer given to a running game
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GameOutcome {
    /// Wrong answer, the game keeps going
    Continue(String),
    /// Correct answer worth `credits`
    Won { credits: i64 },
    /// No attempts left
    Lost(String),
}

pub trait Game: Send {
    fn name(&self) -> &'static str;

    /// Set up a new round and return the prompt shown to players
    fn on_start(&mut self, rng: &mut dyn RngCore) -> String;

    /// Answers revealed when the game ends without a winner
    fn expected_answers(&self) -> Vec<String>;

    fn handle(&mut self, content: &str) -> GameOutcome;
}

/// Shared answer logic: case-insensitive match against `expected`.
///
/// `attempts` starts at 1 and counts the answer being checked.
pub fn check_answer(
    attempts: &mut u32,
    max_attempts: u32,
    content: &str,
    expected: &[String],
    extra: i64,
) -> GameOutcome {
    let answer = normalize_quotes(content);
    let answer = answer.trim();

    if expected.iter().any(|e| e.eq_ignore_ascii_case(answer)) {
        return GameOutcome::Won {
            credits: BASE_WIN_CREDITS + extra,
        };
    }

    if *attempts >= max_attempts {
        return GameOutcome::Lost(format!(
            "You used all your attempts! The answer was: **{}**",
            expected.join(", ")
        ));
    }

    let left = max_attempts - *attempts;
    *attempts += 1;
    GameOutcome::Continue(format!(
        "That's not it, you have **{}** attempts left.",
        left
    ))
}

/// Build a game from its command name
pub fn game_from_name(name: &str) -> Option<Box<dyn Game>> {
    match name.to_lowercase().as_str() {
        "number" | "guess" => Some(Box::new(GuessTheNumber::default())),
        "math" => Some(Box::new(MathGame::default())),
        _ => None,
    }
}
