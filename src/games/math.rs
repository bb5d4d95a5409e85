use rand::{Rng, RngCore};

use super::{Game, GameOutcome, check_answer};

const MAX_ATTEMPTS: u32 = 3;
const EXTRA_CREDITS: i64 = 0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Operator {
    Add,
    Subtract,
    Multiply,
}

impl Operator {
    fn symbol(self) -> char {
        match self {
            Operator::Add => '+',
            Operator::Subtract => '-',
            Operator::Multiply => '*',
        }
    }

    fn apply(self, left: i64, right: i64) -> i64 {
        match self {
            Operator::Add => left + right,
            Operator::Subtract => left - right,
            Operator::Multiply => left * right,
        }
    }
}

/// Solve a small arithmetic question
pub struct MathGame {
    question: String,
    answer: i64,
    attempts: u32,
}

impl Default for MathGame {
    fn default() -> Self {
        Self {
            question: String::new(),
            answer: 0,
            attempts: 1,
        }
    }
}

impl Game for MathGame {
    fn name(&self) -> &'static str {
        "math"
    }

    fn on_start(&mut self, rng: &mut dyn RngCore) -> String {
        let operator = match rng.random_range(0..3) {
            0 => Operator::Add,
            1 => Operator::Subtract,
            _ => Operator::Multiply,
        };
        let (left, right) = match operator {
            Operator::Multiply => (rng.random_range(2..=12), rng.random_range(2..=12)),
            _ => (rng.random_range(1..=100), rng.random_range(1..=100)),
        };

        self.question = format!("{} {} {}", left, operator.symbol(), right);
        self.answer = operator.apply(left, right);
        self.attempts = 1;

        format!(
            "🧮 How much is **{}**? You have {} attempts.\n\
             Type `end` to end this game or `endlobby` to end every queued game.",
            self.question, MAX_ATTEMPTS
        )
    }

    fn expected_answers(&self) -> Vec<String> {
        vec![self.answer.to_string()]
    }

    fn handle(&mut self, content: &str) -> GameOutcome {
        let expected = self.expected_answers();
        check_answer(
            &mut self.attempts,
            MAX_ATTEMPTS,
            content,
            &expected,
            EXTRA_CREDITS,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn eval(question: &str) -> i64 {
        let parts: Vec<&str> = question.split(' ').collect();
        let left: i64 = parts[0].parse().unwrap();
        let right: i64 = parts[2].parse().unwrap();
        match parts[1] {
            "+" => left + right,
            "-" => left - right,
            _ => left * right,
        }
    }

    #[test]
    fn test_answer_matches_question() {
        let mut rng = StdRng::seed_from_u64(11);
        for _ in 0..30 {
            let mut game = MathGame::default();
            game.on_start(&mut rng);
            assert_eq!(game.answer, eval(&game.question));
        }
    }

    #[test]
    fn test_three_attempts() {
        let mut game = MathGame::default();
        game.on_start(&mut StdRng::seed_from_u64(1));
        let wrong = (game.answer + 1).to_string();

        assert!(matches!(game.handle(&wrong), GameOutcome::Continue(_)));
        assert!(matches!(game.handle(&wrong), GameOutcome::Continue(_)));
        assert!(matches!(game.handle(&wrong), GameOutcome::Lost(_)));
    }

    #[test]
    fn test_correct_answer_wins() {
        let mut game = MathGame::default();
        game.on_start(&mut StdRng::seed_from_u64(2));
        let answer = game.answer.to_string();

        assert_eq!(game.handle(&answer), GameOutcome::Won { credits: 70 });
    }
}
