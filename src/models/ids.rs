use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
#[error("invalid id `{0}`")]
pub struct IdParseError(String);

macro_rules! seq_id {
    ($name:ident, $prefix:literal, $width:literal) => {
        #[derive(
            Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd, Hash, Serialize, Deserialize,
        )]
        #[serde(try_from = "String", into = "String")]
        pub struct $name(pub u32);

        impl $name {
            pub fn next(self) -> Self {
                Self(self.0 + 1)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}{:0width$}", $prefix, self.0, width = $width)
            }
        }

        impl FromStr for $name {
            type Err = IdParseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                let digits = s
                    .strip_prefix($prefix)
                    .ok_or_else(|| IdParseError(s.to_string()))?;
                let n: u32 = digits.parse().map_err(|_| IdParseError(s.to_string()))?;
                Ok(Self(n))
            }
        }

        impl TryFrom<String> for $name {
            type Error = IdParseError;

            fn try_from(s: String) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl From<$name> for String {
            fn from(id: $name) -> String {
                id.to_string()
            }
        }
    };
}

seq_id!(SourceId, "S", 3);
seq_id!(ClaimId, "C", 4);

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct RunId(pub Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn source_id_round_trips() {
        let id = SourceId(7);
        assert_eq!(id.to_string(), "S007");
        assert_eq!("S007".parse::<SourceId>().unwrap(), id);
    }

    #[test]
    fn claim_id_is_wider() {
        assert_eq!(ClaimId(12).to_string(), "C0012");
        assert_eq!("C0012".parse::<ClaimId>().unwrap(), ClaimId(12));
    }

    #[test]
    fn rejects_wrong_prefix() {
        assert!("C001".parse::<SourceId>().is_err());
        assert!("001".parse::<SourceId>().is_err());
    }
}
