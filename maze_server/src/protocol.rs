// protocol.rs - Wire format: tagged reply lines and command parsing
//
// Every reply line starts with a single category digit and a space. Commands
// are one per line, case-insensitive.

use std::fmt;
use std::time::Duration;

use maze_engine::{Dimensions, Direction, Window};

// ============= Reply Lines =============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Category {
    Info,
    Progress,
    Confirmation,
    Coordinates,
    MapRow,
    Denied,
    Solved,
    Prompt,
}

impl Category {
    pub fn digit(self) -> char {
        match self {
            Category::Info => '0',
            Category::Progress => '1',
            Category::Confirmation => '2',
            Category::Coordinates => '3',
            Category::MapRow => '4',
            Category::Denied => '5',
            Category::Solved => '8',
            Category::Prompt => '9',
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Reply {
    pub category: Category,
    pub text: String,
}

impl Reply {
    pub fn new(category: Category, text: impl Into<String>) -> Self {
        Self {
            category,
            text: text.into(),
        }
    }

    pub fn info(text: impl Into<String>) -> Self {
        Self::new(Category::Info, text)
    }

    pub fn ok() -> Self {
        Self::new(Category::Confirmation, "OK.")
    }

    pub fn done() -> Self {
        Self::new(Category::Confirmation, "DONE.")
    }

    pub fn ready() -> Self {
        Self::new(Category::Confirmation, "READY.")
    }

    pub fn denied(text: impl Into<String>) -> Self {
        Self::new(Category::Denied, text)
    }

    pub fn blocked() -> Self {
        Self::denied("You can't enter that tile.")
    }

    pub fn prompt(dims: Dimensions) -> Self {
        Self::new(
            Category::Prompt,
            format!(
                "[W:{};H:{};D:{};M={}]>",
                dims.width(),
                dims.height(),
                dims.depth(),
                dims.memory()
            ),
        )
    }

    pub fn solved(elapsed: Duration) -> Self {
        Self::new(
            Category::Solved,
            format!("Congratulation. You solved the labyrinth in {}.", format_elapsed(elapsed)),
        )
    }

    /// `3 <x>x<y>x<d>.` followed by one `4 ` line per window row.
    pub fn window(window: &Window) -> Vec<Reply> {
        let mut lines = Vec::with_capacity(window.rows.len() + 1);
        lines.push(Self::new(Category::Coordinates, format!("{}.", window.position)));
        lines.extend(
            window
                .rows
                .iter()
                .map(|row| Self::new(Category::MapRow, row.as_str())),
        );
        lines
    }
}

impl fmt::Display for Reply {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.category.digit(), self.text)
    }
}

/// Minutes from ten minutes on, seconds below; two decimals either way.
pub fn format_elapsed(elapsed: Duration) -> String {
    let secs = elapsed.as_secs_f64();
    if secs >= 600.0 {
        format!("{:.2} mins", secs / 60.0)
    } else {
        format!("{:.2} secs", secs)
    }
}

// ============= Fixed Texts =============

/// Advertised protocol revision.
pub const PROTOCOL_VERSION: &str = "0.3";

fn greeting() -> Reply {
    Reply::info(format!("Welcome to NetworkLabyrinth v{}.", PROTOCOL_VERSION))
}

pub fn welcome(read_timeout: Duration) -> Vec<Reply> {
    let timeout = format!(
        "the network timeout has been configured to {} seconds of inactivity. Just",
        read_timeout.as_secs()
    );
    let mut lines = vec![greeting()];
    lines.extend(
        [
            "",
            "You are on the main menu. Use the following commands to change settings",
            "or to start the game:",
            "",
            " * WIDTH <32-65536>    Specifies the width of the labyrinth.",
            " * HEIGHT <32-65536>   Specifies the height of the labyrinth.",
            " * DEPTH <1-16>        Specifies the depth of the labyrinth.",
            " * START               Starts the game.",
            "",
            "Please note that the requested labyrinth can't exceed 16 MB of RAM and that",
            timeout.as_str(),
            "disconnect when you want to stop playing.",
            "",
        ]
        .into_iter()
        .map(Reply::info),
    );
    lines
}

/// Lines sent to a client turned away by admission control before closing.
pub fn policy_violation(reason: &str) -> Vec<Reply> {
    let mut lines = vec![greeting()];
    lines.extend(
        [
            "",
            reason,
            "",
            "Please consider connecting at a later point in time or closing some of",
            "your connections.",
            "",
        ]
        .into_iter()
        .map(Reply::info),
    );
    lines.push(Reply::denied("Policy violation."));
    lines
}

pub fn briefing(dims: Dimensions) -> Vec<Reply> {
    let dimensions = format!("Your labyrinth has the dimensions of [WxHxD] {}.", dims);
    [
        "We now prepare the labyrinth you have requested, which will consist of",
        "those settings:",
        dimensions.as_str(),
        "",
        "The following commands are available when the labyrinth has been generated:",
        "",
        " * UP          Walks Y--.",
        " * DOWN        Walks Y++.",
        " * LEFT        Walks X--.",
        " * RIGHT       Walks X++.",
        " * ENTER       Enters the stairs (Z-- or Z++) or enters the exit.",
        " * PRINT       Prints the environment of the player on the current floor.",
        "",
        "The following elements will be returned by the PRINT command:",
        "",
        " ' ' (0x20)    Floor you can walk on.",
        " 'W' (0x57)    A wall you can't pass.",
        " 'P' (0x50)    The player (you).",
        " '.' (0x2E)    Region outside the labyrinth border.",
        " 'U' (0x55)    Stairs up to the floor above you. (Z--)",
        " 'D' (0x44)    Stairs down to the floor below you. (Z++)",
        " 'T' (0x54)    The target of the labyrinth. Use ENTER when reached.",
        "",
        "Please wait while we generate several labyrinths and choose the one suiting",
        "your settings the most:",
        "",
    ]
    .into_iter()
    .map(Reply::info)
    .collect()
}

pub const UNKNOWN_CONFIG_COMMAND: &str = "Unknown command. Use WIDTH ?, HEIGHT ?, DEPTH ? or START.";
pub const UNKNOWN_GAME_COMMAND: &str = "Unknown command.";
pub const GENERATION_FAILED: &str =
    "No playable labyrinth could be generated. Change the settings and START again.";

// ============= Commands =============

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigCommand {
    Width(u64),
    Height(u64),
    Depth(u64),
    Start,
    Unknown,
}

impl ConfigCommand {
    /// `NAME [PARAM]`, space separated. A parameter must be a non-negative
    /// 32-bit integer; anything larger is not a number to the protocol. A
    /// missing one reads as 0.
    pub fn parse(line: &str) -> Self {
        let tokens: Vec<&str> = line.split(' ').filter(|t| !t.is_empty()).collect();
        let (name, parameter) = match tokens.as_slice() {
            [name] => (*name, 0),
            [name, value] => match value.parse::<i32>().map(u64::try_from) {
                Ok(Ok(v)) => (*name, v),
                _ => return ConfigCommand::Unknown,
            },
            _ => return ConfigCommand::Unknown,
        };

        match name.to_ascii_lowercase().as_str() {
            "width" => ConfigCommand::Width(parameter),
            "height" => ConfigCommand::Height(parameter),
            "depth" => ConfigCommand::Depth(parameter),
            "start" => ConfigCommand::Start,
            _ => ConfigCommand::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameCommand {
    Move(Direction),
    Enter,
    Print,
    Unknown,
}

impl GameCommand {
    pub fn parse(line: &str) -> Self {
        match line.trim().to_ascii_lowercase().as_str() {
            "up" => GameCommand::Move(Direction::Up),
            "down" => GameCommand::Move(Direction::Down),
            "left" => GameCommand::Move(Direction::Left),
            "right" => GameCommand::Move(Direction::Right),
            "enter" => GameCommand::Enter,
            "print" => GameCommand::Print,
            _ => GameCommand::Unknown,
        }
    }
}
