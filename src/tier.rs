use bitflags::bitflags;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};

bitflags! {
    /// Tier is a severity or category of a listed word.
    /// They can be combined with bitwise operators; `Level` maps to such combinations.
    pub struct Tier: u8 {
        /// Not that bad.
        const MILD     = 0b00001;
        /// Bad.
        const MODERATE = 0b00010;
        /// Cover your eyes!
        const STRONG   = 0b00100;
        /// Sexual or explicit words.
        const NSFW     = 0b01000;
        /// Hateful words targeting groups of people.
        const SLURS    = 0b10000;

        /// Cumulative severities; `Tier::NSFW` and `Tier::SLURS` are orthogonal to these.
        const SEVERITIES = Self::MILD.bits | Self::MODERATE.bits | Self::STRONG.bits;

        /// No tier.
        const NONE = 0;
    }
}

impl Tier {
    /// Every single tier, in the order words are checked.
    pub const EACH: [Tier; 5] = [
        Tier::MILD,
        Tier::MODERATE,
        Tier::STRONG,
        Tier::NSFW,
        Tier::SLURS,
    ];

    /// Parses a tier name as written in data assets.
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name.trim() {
            "mild" => Self::MILD,
            "moderate" => Self::MODERATE,
            "strong" => Self::STRONG,
            "nsfw" => Self::NSFW,
            "slurs" => Self::SLURS,
            _ => return None,
        })
    }

    /// Name of a single tier, or `None` if `self` is a combination.
    pub fn name(self) -> Option<&'static str> {
        Some(match self {
            Self::MILD => "mild",
            Self::MODERATE => "moderate",
            Self::STRONG => "strong",
            Self::NSFW => "nsfw",
            Self::SLURS => "slurs",
            _ => return None,
        })
    }
}

/// Level selects which tiers of words are checked.
///
/// `Mild`, `Moderate` and `Strong` are cumulative, `Nsfw` and `Slurs` stand alone, and `All`
/// covers every tier.
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Mild,
    #[default]
    Moderate,
    Strong,
    Nsfw,
    Slurs,
    All,
}

impl Level {
    pub const EACH: [Level; 6] = [
        Level::Mild,
        Level::Moderate,
        Level::Strong,
        Level::Nsfw,
        Level::Slurs,
        Level::All,
    ];

    /// Interprets an opaque level token. Unknown tokens fall back to the default,
    /// `Level::Moderate`.
    pub fn from_token(token: &str) -> Self {
        match token.trim().to_ascii_lowercase().as_str() {
            "mild" => Self::Mild,
            "moderate" => Self::Moderate,
            "strong" => Self::Strong,
            "nsfw" => Self::Nsfw,
            "slurs" => Self::Slurs,
            "all" => Self::All,
            _ => Self::default(),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Mild => "mild",
            Self::Moderate => "moderate",
            Self::Strong => "strong",
            Self::Nsfw => "nsfw",
            Self::Slurs => "slurs",
            Self::All => "all",
        }
    }

    /// The tiers whose words are checked at this level.
    pub fn tiers(self) -> Tier {
        match self {
            Self::Mild => Tier::MILD,
            Self::Moderate => Tier::MILD | Tier::MODERATE,
            Self::Strong => Tier::SEVERITIES,
            Self::Nsfw => Tier::NSFW,
            Self::Slurs => Tier::SLURS,
            Self::All => Tier::all(),
        }
    }

    /// Returns `true` if every word checked at `other` is also checked at `self`.
    pub fn includes(self, other: Self) -> bool {
        self.tiers().contains(other.tiers())
    }
}

impl From<&str> for Level {
    fn from(token: &str) -> Self {
        Self::from_token(token)
    }
}

impl Display for Level {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
