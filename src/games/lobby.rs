use poise::serenity_prelude::{ChannelId, UserId};
use rand::RngCore;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

use super::{Game, GameOutcome};

/// What the channel should see after a message reached the lobby
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LobbyStep {
    Ignored,
    Reply(String),
    /// The running game is over. `winner` gets `credits`.
    GameOver {
        message: String,
        winner: Option<(UserId, i64)>,
    },
}

/// Games queued for one channel, played in order
pub struct GameLobby {
    pub channel_id: ChannelId,
    players: Vec<UserId>,
    queue: VecDeque<Box<dyn Game>>,
    current: Option<Box<dyn Game>>,
    last_activity: Instant,
}

impl GameLobby {
    pub fn new(channel_id: ChannelId, players: Vec<UserId>, games: Vec<Box<dyn Game>>) -> Self {
        Self {
            channel_id,
            players,
            queue: games.into(),
            current: None,
            last_activity: Instant::now(),
        }
    }

    pub fn is_player(&self, user_id: UserId) -> bool {
        self.players.contains(&user_id)
    }

    pub fn current_game(&self) -> Option<&'static str> {
        self.current.as_ref().map(|game| game.name())
    }

    pub fn queued(&self) -> usize {
        self.queue.len()
    }

    /// Start the next queued game and return its prompt, `None` when the queue is empty
    pub fn start_next(&mut self, rng: &mut dyn RngCore, now: Instant) -> Option<String> {
        self.current = self.queue.pop_front();
        let game = self.current.as_mut()?;
        self.last_activity = now;
        Some(game.on_start(rng))
    }

    /// Drop every queued game after the running one
    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    /// Feed a channel message to the running game
    pub fn handle_message(
        &mut self,
        author: UserId,
        content: &str,
        prefixes: &[String],
        now: Instant,
    ) -> LobbyStep {
        if prefixes.iter().any(|prefix| content.starts_with(prefix.as_str())) {
            return LobbyStep::Ignored;
        }
        if !self.is_player(author) {
            return LobbyStep::Ignored;
        }
        let Some(game) = self.current.as_mut() else {
            return LobbyStep::Ignored;
        };

        self.last_activity = now;
        let trimmed = content.trim();

        if trimmed.eq_ignore_ascii_case("end") {
            let message = format!(
                "✅ Ended the game. The answer was: **{}**",
                game.expected_answers().join(", ")
            );
            self.current = None;
            return LobbyStep::GameOver {
                message,
                winner: None,
            };
        }

        if trimmed.eq_ignore_ascii_case("endlobby") {
            self.current = None;
            self.clear_queue();
            return LobbyStep::GameOver {
                message: "✅ Ended the lobby.".to_string(),
                winner: None,
            };
        }

        match game.handle(trimmed) {
            GameOutcome::Continue(message) => LobbyStep::Reply(message),
            GameOutcome::Won { credits } => {
                self.current = None;
                LobbyStep::GameOver {
                    message: format!(
                        "📣 <@{}> got the right answer and won **{}** credits!",
                        author, credits
                    ),
                    winner: Some((author, credits)),
                }
            }
            GameOutcome::Lost(message) => {
                self.current = None;
                LobbyStep::GameOver {
                    message,
                    winner: None,
                }
            }
        }
    }

    /// Whether the running game went `timeout` without a player message
    pub fn is_expired(&self, now: Instant, timeout: Duration) -> bool {
        self.current.is_some() && now.saturating_duration_since(self.last_activity) >= timeout
    }

    /// End the lobby because nobody answered, returning the message to send
    pub fn time_out(&mut self) -> String {
        let answers = self
            .current
            .take()
            .map(|game| game.expected_answers().join(", "))
            .unwrap_or_default();
        self.clear_queue();
        format!(
            "❌ The time ran out! The answer was: **{}**. Closing the lobby.",
            answers
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::games::GuessTheNumber;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    /// Answer is always "yes"
    struct YesGame;

    impl Game for YesGame {
        fn name(&self) -> &'static str {
            "yes"
        }

        fn on_start(&mut self, _rng: &mut dyn RngCore) -> String {
            "Say yes".to_string()
        }

        fn expected_answers(&self) -> Vec<String> {
            vec!["yes".to_string()]
        }

        fn handle(&mut self, content: &str) -> GameOutcome {
            if content == "yes" {
                GameOutcome::Won { credits: 70 }
            } else {
                GameOutcome::Continue("no".to_string())
            }
        }
    }

    fn lobby(games: usize) -> GameLobby {
        let games: Vec<Box<dyn Game>> = (0..games)
            .map(|_| Box::new(YesGame) as Box<dyn Game>)
            .collect();
        GameLobby::new(ChannelId::new(1), vec![UserId::new(10)], games)
    }

    fn prefixes() -> Vec<String> {
        vec!["~>".to_string()]
    }

    #[test]
    fn test_games_run_in_order() {
        let mut rng = StdRng::seed_from_u64(1);
        let now = Instant::now();
        let mut lobby = lobby(2);

        assert_eq!(lobby.start_next(&mut rng, now).as_deref(), Some("Say yes"));
        assert_eq!(lobby.queued(), 1);

        let step = lobby.handle_message(UserId::new(10), "yes", &prefixes(), now);
        assert!(matches!(
            step,
            LobbyStep::GameOver { winner: Some((id, 70)), .. } if id == UserId::new(10)
        ));
        assert!(lobby.current_game().is_none());

        assert!(lobby.start_next(&mut rng, now).is_some());
        assert!(lobby.start_next(&mut rng, now).is_none());
    }

    #[test]
    fn test_ignores_prefixed_and_outsiders() {
        let mut rng = StdRng::seed_from_u64(1);
        let now = Instant::now();
        let mut lobby = lobby(1);
        lobby.start_next(&mut rng, now);

        assert_eq!(
            lobby.handle_message(UserId::new(10), "~>yes", &prefixes(), now),
            LobbyStep::Ignored
        );
        assert_eq!(
            lobby.handle_message(UserId::new(99), "yes", &prefixes(), now),
            LobbyStep::Ignored
        );
        assert_eq!(
            lobby.handle_message(UserId::new(10), "maybe", &prefixes(), now),
            LobbyStep::Reply("no".to_string())
        );
    }

    #[test]
    fn test_end_and_endlobby() {
        let mut rng = StdRng::seed_from_u64(1);
        let now = Instant::now();
        let mut lobby = lobby(3);
        lobby.start_next(&mut rng, now);

        match lobby.handle_message(UserId::new(10), "END", &prefixes(), now) {
            LobbyStep::GameOver { message, winner } => {
                assert!(message.contains("**yes**"));
                assert!(winner.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(lobby.queued(), 2);

        lobby.start_next(&mut rng, now);
        lobby.handle_message(UserId::new(10), "endlobby", &prefixes(), now);
        assert_eq!(lobby.queued(), 0);
        assert!(lobby.start_next(&mut rng, now).is_none());
    }

    #[test]
    fn test_timeout() {
        let mut rng = StdRng::seed_from_u64(1);
        let start = Instant::now();
        let mut lobby = GameLobby::new(
            ChannelId::new(1),
            vec![UserId::new(10)],
            vec![
                Box::new(GuessTheNumber::default()) as Box<dyn Game>,
                Box::new(YesGame),
            ],
        );
        lobby.start_next(&mut rng, start);

        let timeout = Duration::from_secs(60);
        assert!(!lobby.is_expired(start + Duration::from_secs(30), timeout));

        // a player message resets the idle timer
        lobby.handle_message(UserId::new(10), "1000", &prefixes(), start + Duration::from_secs(30));
        assert!(!lobby.is_expired(start + Duration::from_secs(80), timeout));
        assert!(lobby.is_expired(start + Duration::from_secs(90), timeout));

        let message = lobby.time_out();
        assert!(message.contains("time ran out"));
        assert_eq!(lobby.queued(), 0);
        assert!(!lobby.is_expired(start + Duration::from_secs(200), timeout));
    }
}
