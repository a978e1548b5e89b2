use std::fmt;

/// A text command after normalization and parsing.
///
/// Integer arguments are kept as `i64` so that out-of-range values survive
/// parsing and are rejected by the codec with a precise error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogicalCommand {
    TurnOn,
    TurnOff,
    SetBrightness(i64),
    SetColor(i64, i64, i64),
    Illuminate,
    /// The client asked to end its own session (`exit`).
    Disconnect,
    /// Anything not matching the grammar, holding the normalized input.
    Unknown(String),
}

impl LogicalCommand {
    /// Parse one line of text.
    ///
    /// Grammar (case-insensitive, surrounding whitespace ignored):
    /// `on`, `off`, `brightness <int>`, `color <int> <int> <int>`,
    /// `illuminate`, `exit`. Wrong argument counts and non-integer
    /// arguments fall through to [`LogicalCommand::Unknown`].
    pub fn parse(line: &str) -> Self {
        let normalized = normalize(line);
        let tokens: Vec<&str> = normalized.split_whitespace().collect();

        let parsed = match tokens.as_slice() {
            ["on"] => Some(Self::TurnOn),
            ["off"] => Some(Self::TurnOff),
            ["illuminate"] => Some(Self::Illuminate),
            ["exit"] => Some(Self::Disconnect),
            ["brightness", percent] => parse_int(percent).map(Self::SetBrightness),
            ["color", red, green, blue] => match (parse_int(red), parse_int(green), parse_int(blue))
            {
                (Some(r), Some(g), Some(b)) => Some(Self::SetColor(r, g, b)),
                _ => None,
            },
            _ => None,
        };

        parsed.unwrap_or(Self::Unknown(normalized))
    }
}

impl fmt::Display for LogicalCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TurnOn => f.write_str("on"),
            Self::TurnOff => f.write_str("off"),
            Self::SetBrightness(percent) => write!(f, "brightness {percent}"),
            Self::SetColor(red, green, blue) => write!(f, "color {red} {green} {blue}"),
            Self::Illuminate => f.write_str("illuminate"),
            Self::Disconnect => f.write_str("exit"),
            Self::Unknown(raw) => f.write_str(raw),
        }
    }
}

/// Trim surrounding whitespace and fold ASCII letters to lowercase.
pub fn normalize(line: &str) -> String {
    line.trim().to_ascii_lowercase()
}

fn parse_int(token: &str) -> Option<i64> {
    token.parse().ok()
}
