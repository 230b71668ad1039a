//! Robot roles and team colors

use serde::{Deserialize, Serialize};

use super::Rgb;

/// Team of a robot, from the high bit of the id byte.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum TeamColor {
    /// Flag 0 (team A)
    #[default]
    Magenta,
    /// Flag 1 (team B)
    Cyan,
}

impl TeamColor {
    pub fn from_flag(flag: u8) -> Self {
        if flag & 1 == 0 { TeamColor::Magenta } else { TeamColor::Cyan }
    }

    pub fn flag(self) -> u8 {
        match self {
            TeamColor::Magenta => 0,
            TeamColor::Cyan => 1,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TeamColor::Magenta => "MAGENTA",
            TeamColor::Cyan => "CYAN",
        }
    }

    /// Inverse of [`TeamColor::label`].
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "MAGENTA" => Some(TeamColor::Magenta),
            "CYAN" => Some(TeamColor::Cyan),
            _ => None,
        }
    }
}

/// Behavioral role announced in the message string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Role {
    Attacker,
    Neutral,
    Defender,
    Keeper,
    #[default]
    Unknown,
}

impl Role {
    /// Keyword priority; the first keyword found anywhere in the message wins.
    const KEYWORDS: [(&'static str, Role); 4] = [
        ("Attacker", Role::Attacker),
        ("Neutral", Role::Neutral),
        ("Defender", Role::Defender),
        ("Keeper", Role::Keeper),
    ];

    /// Classify a message by case-sensitive keyword search.
    pub fn classify(message: &str) -> Self {
        Self::KEYWORDS
            .iter()
            .find(|(keyword, _)| message.contains(keyword))
            .map(|&(_, role)| role)
            .unwrap_or(Role::Unknown)
    }

    /// Text color for this role.
    pub fn color(self) -> Rgb {
        match self {
            Role::Attacker => Rgb::RED,
            Role::Neutral => Rgb::GREEN,
            Role::Defender => Rgb::BLUE,
            Role::Keeper => Rgb::ORANGE,
            Role::Unknown => Rgb::BLACK,
        }
    }
}
