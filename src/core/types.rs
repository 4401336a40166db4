use serde::{Deserialize, Serialize};

/// Strand of a mapping hint relative to the reference
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Orientation {
    /// Query aligns as given
    Forward,
    /// Query aligns as its reverse complement
    Reverse,
}

impl Orientation {
    /// Parse a strand token. Only `+` is forward; every other token is reverse.
    pub fn from_token(token: &str) -> Self {
        if token == "+" {
            Self::Forward
        } else {
            Self::Reverse
        }
    }
}

impl std::fmt::Display for Orientation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Forward => write!(f, "+"),
            Self::Reverse => write!(f, "-"),
        }
    }
}
