use std::fmt;

use serde::{Deserialize, Deserializer};

const MASK: &str = "********";

/// Wrapper for credential material (the iLO password).
///
/// `Debug` and `Display` always render the mask so the raw value cannot leak
/// through logs or error chains. Call sites that genuinely need the value
/// (building an Authorization header) go through [`Secret::expose`].
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render for an operator-facing surface. With `obfuscate` on (the
    /// default policy) the mask is shown; turning the policy off reveals
    /// the raw value.
    pub fn render(&self, obfuscate: bool) -> &str {
        if obfuscate {
            MASK
        } else {
            &self.0
        }
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}

impl fmt::Display for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(MASK)
    }
}

impl From<String> for Secret {
    fn from(value: String) -> Self {
        Self(value)
    }
}

impl<'de> Deserialize<'de> for Secret {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        String::deserialize(deserializer).map(Secret)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_and_display_are_masked() {
        let s = Secret::new("hunter2");
        assert_eq!(format!("{:?}", s), "********");
        assert_eq!(format!("{}", s), "********");
        assert_eq!(s.expose(), "hunter2");
    }

    #[test]
    fn test_render_respects_policy() {
        let s = Secret::new("hunter2");
        assert_eq!(s.render(true), "********");
        assert_eq!(s.render(false), "hunter2");
    }
}
