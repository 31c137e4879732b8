//! Small games: dice, random choice, rock paper scissors

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use std::fmt;
use std::str::FromStr;

use crate::application::errors::{CommandError, SetupError};
use crate::domain::entities::Command;
use crate::domain::traits::{Extension, Registrar};

const MAX_DICE: u32 = 100;
const MAX_SIDES: u32 = 1000;

pub struct Fun;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Hand {
    Rock,
    Paper,
    Scissors,
}

impl Hand {
    const ALL: [Hand; 3] = [Hand::Rock, Hand::Paper, Hand::Scissors];

    fn beats(self, other: Hand) -> bool {
        matches!(
            (self, other),
            (Hand::Rock, Hand::Scissors) | (Hand::Paper, Hand::Rock) | (Hand::Scissors, Hand::Paper)
        )
    }
}

impl FromStr for Hand {
    type Err = CommandError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "rock" | "r" => Ok(Hand::Rock),
            "paper" | "p" => Ok(Hand::Paper),
            "scissors" | "s" => Ok(Hand::Scissors),
            other => Err(CommandError::InvalidArgs(format!(
                "'{}' is not one of rock, paper, scissors",
                other
            ))),
        }
    }
}

impl fmt::Display for Hand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Hand::Rock => "Rock",
            Hand::Paper => "Paper",
            Hand::Scissors => "Scissors",
        };
        f.write_str(name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RoundResult {
    Win,
    Lose,
    Tie,
}

pub fn play_round(player: Hand, bot: Hand) -> RoundResult {
    if player == bot {
        RoundResult::Tie
    } else if player.beats(bot) {
        RoundResult::Win
    } else {
        RoundResult::Lose
    }
}

/// Parse `NdM` or `M` into (dice, sides)
pub fn parse_dice(spec: &str) -> Result<(u32, u32), CommandError> {
    let invalid = || CommandError::InvalidArgs(format!("'{}' is not a dice expression like 2d6", spec));
    let (count, sides): (u32, u32) = match spec.to_lowercase().split_once('d') {
        Some((count, sides)) => {
            let count = if count.is_empty() { 1 } else { count.parse().map_err(|_| invalid())? };
            (count, sides.parse().map_err(|_| invalid())?)
        }
        None => (1, spec.parse().map_err(|_| invalid())?),
    };

    if count == 0 || count > MAX_DICE || sides < 2 || sides > MAX_SIDES {
        return Err(CommandError::InvalidArgs(format!(
            "use 1-{} dice with 2-{} sides",
            MAX_DICE, MAX_SIDES
        )));
    }
    Ok((count, sides))
}

#[async_trait]
impl Extension for Fun {
    fn name(&self) -> &str {
        "fun"
    }

    fn description(&self) -> Option<&str> {
        Some("Dice, choices and rock paper scissors")
    }

    async fn register(&self, host: &mut Registrar) -> Result<(), SetupError> {
        host.add_command(
            Command::new("roll")
                .with_aliases(vec!["dice".to_string()])
                .with_description("Roll dice")
                .with_usage("roll [NdM]")
                .with_handler(|msg| {
                    let (count, sides) = match msg.content.args().first() {
                        Some(spec) => parse_dice(spec)?,
                        None => (1, 6),
                    };
                    let mut rng = rand::thread_rng();
                    let rolls: Vec<u32> = (0..count).map(|_| rng.gen_range(1..=sides)).collect();
                    let total: u32 = rolls.iter().sum();
                    if rolls.len() == 1 {
                        Ok(format!("🎲 {}", total))
                    } else {
                        let shown: Vec<String> = rolls.iter().map(u32::to_string).collect();
                        Ok(format!("🎲 {} = {}", shown.join(" + "), total))
                    }
                }),
        )
        .add_command(
            Command::new("choose")
                .with_description("Pick one of several options")
                .with_usage("choose <a> <b> [...]")
                .with_handler(|msg| {
                    let options = msg.content.args();
                    if options.len() < 2 {
                        return Err(CommandError::InvalidArgs("give me at least two options".to_string()));
                    }
                    options
                        .choose(&mut rand::thread_rng())
                        .map(|choice| format!("I choose **{}**", choice))
                        .ok_or_else(|| CommandError::ExecutionFailed("nothing to choose from".to_string()))
                }),
        )
        .add_command(
            Command::new("rps")
                .with_description("Play rock paper scissors against the bot")
                .with_usage("rps <rock|paper|scissors>")
                .with_handler(|msg| {
                    let player: Hand = msg
                        .content
                        .args()
                        .first()
                        .ok_or_else(|| CommandError::InvalidArgs("usage: rps <rock|paper|scissors>".to_string()))?
                        .parse()?;
                    let bot = *Hand::ALL
                        .choose(&mut rand::thread_rng())
                        .unwrap_or(&Hand::Rock);
                    let verdict = match play_round(player, bot) {
                        RoundResult::Win => "You win!",
                        RoundResult::Lose => "I win!",
                        RoundResult::Tie => "Tie! No one wins.",
                    };
                    Ok(format!("{} vs {}: {}", player, bot, verdict))
                }),
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_results() {
        assert_eq!(play_round(Hand::Rock, Hand::Scissors), RoundResult::Win);
        assert_eq!(play_round(Hand::Rock, Hand::Paper), RoundResult::Lose);
        assert_eq!(play_round(Hand::Paper, Hand::Paper), RoundResult::Tie);
        assert_eq!(play_round(Hand::Scissors, Hand::Paper), RoundResult::Win);
    }

    #[test]
    fn test_parse_hand() {
        assert_eq!("ROCK".parse::<Hand>().unwrap(), Hand::Rock);
        assert_eq!("s".parse::<Hand>().unwrap(), Hand::Scissors);
        assert!("lizard".parse::<Hand>().is_err());
    }

    #[test]
    fn test_parse_dice() {
        assert_eq!(parse_dice("2d6").unwrap(), (2, 6));
        assert_eq!(parse_dice("d20").unwrap(), (1, 20));
        assert_eq!(parse_dice("12").unwrap(), (1, 12));
        assert!(parse_dice("0d6").is_err());
        assert!(parse_dice("2d1").is_err());
        assert!(parse_dice("many").is_err());
    }
}
