use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Content language for localized fields.
///
/// Sent to the backend as the `lang` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Lang {
    #[default]
    En,
    Es,
}

impl Lang {
    /// Returns the query-parameter value for this language.
    pub fn as_str(self) -> &'static str {
        match self {
            Lang::En => "en",
            Lang::Es => "es",
        }
    }
}

impl fmt::Display for Lang {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Lang {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "en" | "english" => Ok(Lang::En),
            "es" | "spanish" | "espanol" | "español" => Ok(Lang::Es),
            other => Err(format!("Unknown language: {other} (expected 'en' or 'es')")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_accepts_codes_and_names() {
        assert_eq!("en".parse::<Lang>().unwrap(), Lang::En);
        assert_eq!(" ES ".parse::<Lang>().unwrap(), Lang::Es);
        assert_eq!("spanish".parse::<Lang>().unwrap(), Lang::Es);
        assert!("fr".parse::<Lang>().is_err());
    }

    #[test]
    fn test_serializes_lowercase() {
        assert_eq!(serde_json::to_string(&Lang::Es).unwrap(), r#""es""#);
    }
}
