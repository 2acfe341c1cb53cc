//! Console commands, one per input line.

use std::str::FromStr;

#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    List,
    Search(String),
    /// Empty clears the filter.
    Country(String),
    Countries,
    /// Zero-based index into the visible list.
    Play(usize),
    Favorite(usize),
    Favorites,
    Volume(f32),
    Mute,
    Status,
    Help,
    Quit,
}

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown command '{0}' (try 'help')")]
    Unknown(String),
    #[error("'{0}' needs a station number from the list")]
    StationNumber(&'static str),
    #[error("volume must be a number between 0 and 1")]
    Volume,
}

pub const HELP: &str = "\
commands:
  list                 show matching stations
  search <text>        filter by name, country or tags (empty clears)
  country <name>       only stations from <name> (empty clears)
  countries            show the top countries
  play <n>             play / pause station n
  fav <n>              toggle station n as favorite
  favs                 show favorites
  vol <0..1>           set volume
  mute                 toggle mute
  status               show what is playing
  quit";

fn station_number(arg: &str, command: &'static str) -> Result<usize, ParseError> {
    match arg.parse::<usize>() {
        Ok(n) if n > 0 => Ok(n - 1),
        _ => Err(ParseError::StationNumber(command)),
    }
}

impl FromStr for Action {
    type Err = ParseError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (command, arg) = match line.split_once(char::is_whitespace) {
            Some((command, arg)) => (command, arg.trim()),
            None => (line, ""),
        };

        match command.to_lowercase().as_str() {
            "list" | "ls" => Ok(Action::List),
            "search" | "s" => Ok(Action::Search(arg.to_string())),
            "country" | "c" => Ok(Action::Country(arg.to_string())),
            "countries" => Ok(Action::Countries),
            "play" | "p" => station_number(arg, "play").map(Action::Play),
            "fav" | "f" => station_number(arg, "fav").map(Action::Favorite),
            "favs" => Ok(Action::Favorites),
            "vol" | "volume" => arg
                .parse::<f32>()
                .ok()
                .filter(|v| (0.0..=1.0).contains(v))
                .map(Action::Volume)
                .ok_or(ParseError::Volume),
            "mute" | "m" => Ok(Action::Mute),
            "status" => Ok(Action::Status),
            "help" | "?" => Ok(Action::Help),
            "quit" | "q" | "exit" => Ok(Action::Quit),
            other => Err(ParseError::Unknown(other.to_string())),
        }
    }
}
