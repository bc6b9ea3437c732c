//! Console commands for the interactive binary
//!
//! One command per input line. The bare digits `1`..`4` are shortcuts for
//! `add 1`..`add 4`, matching the number-key bindings of the game build.

use crate::error::Result;
use crate::jukebox::Jukebox;
use std::str::FromStr;

/// Parsed console command
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Add(usize),
    Sub(usize),
    FadeAll,
    Damaged,
    Ko,
    Victory,
    Status,
    Help,
    Quit,
}

pub const HELP: &str = "\
commands:
  add <n> | <n>     fade layer n in (digits 1-4 work alone)
  sub <n>           fade layer n out
  fade              fade out every non-lead layer
  damaged | ko      play a one-shot on the lead layer
  victory           switch the lead layer to the victory clip
  status            print channel state as JSON
  help              show this text
  quit              stop and exit";

fn parse_index(arg: Option<&str>, command: &str) -> std::result::Result<usize, jukebox_common::Error> {
    let arg = arg.ok_or_else(|| {
        jukebox_common::Error::InvalidInput(format!("'{}' needs a layer index", command))
    })?;
    arg.parse::<usize>().map_err(|_| {
        jukebox_common::Error::InvalidInput(format!("'{}' is not a layer index", arg))
    })
}

impl FromStr for Command {
    type Err = jukebox_common::Error;

    fn from_str(line: &str) -> std::result::Result<Self, Self::Err> {
        let mut words = line.split_whitespace();
        let head = words
            .next()
            .ok_or_else(|| jukebox_common::Error::InvalidInput("empty command".to_string()))?
            .to_ascii_lowercase();
        let arg = words.next();

        let command = match head.as_str() {
            "1" | "2" | "3" | "4" if arg.is_none() => Command::Add(parse_index(Some(head.as_str()), "add")?),
            "add" | "a" => Command::Add(parse_index(arg, "add")?),
            "sub" | "s" => Command::Sub(parse_index(arg, "sub")?),
            "fade" => Command::FadeAll,
            "damaged" => Command::Damaged,
            "ko" => Command::Ko,
            "victory" => Command::Victory,
            "status" => Command::Status,
            "help" | "?" => Command::Help,
            "quit" | "exit" | "q" => Command::Quit,
            other => {
                return Err(jukebox_common::Error::InvalidInput(format!(
                    "unknown command '{}'",
                    other
                )))
            }
        };
        Ok(command)
    }
}

/// Parse one input line
pub fn parse_line(line: &str) -> Result<Command> {
    Ok(line.parse::<Command>()?)
}

/// Run one command against the jukebox and describe the outcome
pub async fn execute(jukebox: &Jukebox, command: Command) -> Result<String> {
    let message = match command {
        Command::Add(index) => {
            let ramp = jukebox.add_speaker(index).await?;
            format!("fading in layer {} (ramp {})", index, ramp)
        }
        Command::Sub(index) => {
            let ramp = jukebox.sub_speaker(index).await?;
            format!("fading out layer {} (ramp {})", index, ramp)
        }
        Command::FadeAll => {
            let ramps = jukebox.fade_all_speakers().await?;
            format!("fading out {} layer(s)", ramps.len())
        }
        Command::Damaged => {
            jukebox.trigger_damaged_sfx().await?;
            "damaged".to_string()
        }
        Command::Ko => {
            jukebox.trigger_ko_sfx().await?;
            "ko".to_string()
        }
        Command::Victory => {
            jukebox.trigger_victory().await?;
            "victory".to_string()
        }
        Command::Status => {
            let snapshot = jukebox.snapshot().await;
            serde_json::to_string_pretty(&snapshot)
                .map_err(|e| crate::error::Error::InvalidState(format!("status encoding failed: {}", e)))?
        }
        Command::Help => HELP.to_string(),
        Command::Quit => "bye".to_string(),
    };
    Ok(message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digit_shortcuts_add_layers() {
        for n in 1..=4 {
            assert_eq!(n.to_string().parse::<Command>().unwrap(), Command::Add(n));
        }
    }

    #[test]
    fn test_parse_commands_with_arguments() {
        assert_eq!("add 2".parse::<Command>().unwrap(), Command::Add(2));
        assert_eq!("  SUB 1 ".parse::<Command>().unwrap(), Command::Sub(1));
        assert_eq!("fade".parse::<Command>().unwrap(), Command::FadeAll);
        assert_eq!("victory".parse::<Command>().unwrap(), Command::Victory);
        assert_eq!("q".parse::<Command>().unwrap(), Command::Quit);
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<Command>().is_err());
        assert!("sub".parse::<Command>().is_err());
        assert!("add x".parse::<Command>().is_err());
        assert!("dance".parse::<Command>().is_err());
        // A digit with an argument is not a shortcut
        assert!("1 2".parse::<Command>().is_err());
    }

    #[test]
    fn test_parse_line_wraps_input_errors() {
        assert_eq!(parse_line("ko").unwrap(), Command::Ko);
        assert!(matches!(
            parse_line("louder"),
            Err(crate::error::Error::Common(jukebox_common::Error::InvalidInput(_)))
        ));
    }
}
