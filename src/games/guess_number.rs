use rand::{Rng, RngCore};

use super::{Game, GameOutcome};

const MAX_ATTEMPTS: u32 = 5;
const MAX_NUMBER: u32 = 150;
const WIN_CREDITS: i64 = 140;

/// Guess a number below 150 with higher/lower hints
pub struct GuessTheNumber {
    number: u32,
    attempts: u32,
}

impl Default for GuessTheNumber {
    fn default() -> Self {
        Self {
            number: 0,
            attempts: 1,
        }
    }
}

impl GuessTheNumber {
    #[cfg(test)]
    fn with_number(number: u32) -> Self {
        Self {
            number,
            ..Self::default()
        }
    }
}

impl Game for GuessTheNumber {
    fn name(&self) -> &'static str {
        "number"
    }

    fn on_start(&mut self, rng: &mut dyn RngCore) -> String {
        self.number = rng.random_range(0..MAX_NUMBER);
        self.attempts = 1;
        format!(
            "🤔 Guess the number! It's between 0 and {}. You have {} attempts.\n\
             Type `end` to end this game or `endlobby` to end every queued game.",
            MAX_NUMBER - 1,
            MAX_ATTEMPTS
        )
    }

    fn expected_answers(&self) -> Vec<String> {
        vec![self.number.to_string()]
    }

    fn handle(&mut self, content: &str) -> GameOutcome {
        let Ok(guess) = content.trim().parse::<u32>() else {
            // a non-number still uses an attempt
            self.attempts += 1;
            return GameOutcome::Continue("❌ That's not a number!".to_string());
        };

        if guess == self.number {
            return GameOutcome::Won {
                credits: WIN_CREDITS,
            };
        }

        if self.attempts >= MAX_ATTEMPTS {
            return GameOutcome::Lost(format!(
                "❌ You used all your attempts! The number was **{}**",
                self.number
            ));
        }

        let hint = if guess < self.number { "higher" } else { "lower" };
        let left = MAX_ATTEMPTS - self.attempts;
        self.attempts += 1;
        GameOutcome::Continue(format!(
            "❌ That's not it, you have **{}** attempts left.\nHint: the number is **{}**.",
            left, hint
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn test_start_picks_number_in_range() {
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..50 {
            let mut game = GuessTheNumber::default();
            game.on_start(&mut rng);
            let number: u32 = game.expected_answers()[0].parse().unwrap();
            assert!(number < MAX_NUMBER);
        }
    }

    #[test]
    fn test_hints_and_win() {
        let mut game = GuessTheNumber::with_number(80);

        match game.handle("50") {
            GameOutcome::Continue(message) => {
                assert!(message.contains("**4**"));
                assert!(message.contains("higher"));
            }
            other => panic!("unexpected {:?}", other),
        }
        match game.handle("100") {
            GameOutcome::Continue(message) => assert!(message.contains("lower")),
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(game.handle(" 80 "), GameOutcome::Won { credits: 140 });
    }

    #[test]
    fn test_non_numbers_use_attempts() {
        let mut game = GuessTheNumber::with_number(10);

        for _ in 0..4 {
            assert!(matches!(game.handle("what"), GameOutcome::Continue(_)));
        }
        match game.handle("11") {
            GameOutcome::Lost(message) => assert!(message.contains("**10**")),
            other => panic!("unexpected {:?}", other),
        }
    }
}
