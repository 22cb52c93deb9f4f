// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! State token vocabulary.
//!
//! This module provides the [`State`] type: the built-in vocabulary of
//! device states plus an escape hatch for domain-specific tokens.

use std::fmt;
use std::str::FromStr;

use crate::error::ValueError;

/// A device state token.
///
/// The built-in vocabulary covers the states common home-automation devices
/// report: power (`On`/`Off`), luminance (`Light`/`Dark`), motion sensing
/// (`Motion`/`Still`), occupancy (`Presence`/`Vacant`), and contact sensing
/// (`Open`/`Closed`). [`State::custom`] extends it with lower-cased,
/// non-empty tokens of your own.
///
/// The canonical textual form is lower-case. Parsing with [`FromStr`] is
/// strict: only the built-in vocabulary is accepted, so a typo surfaces as a
/// [`ValueError`] instead of silently minting a new state.
///
/// # Examples
///
/// ```
/// use domostate::State;
///
/// let on = State::On;
/// assert_eq!(on.as_str(), "on");
/// assert_eq!("MOTION".parse::<State>().unwrap(), State::Motion);
/// assert!("blinking".parse::<State>().is_err());
///
/// let heating = State::custom("Heating").unwrap();
/// assert_eq!(heating.as_str(), "heating");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(into = "String", try_from = "String")]
pub enum State {
    /// State has not been established yet.
    #[default]
    Unknown,
    /// Device is on.
    On,
    /// Device is off.
    Off,
    /// Ambient light detected.
    Light,
    /// Darkness detected.
    Dark,
    /// Motion detected.
    Motion,
    /// No motion detected.
    Still,
    /// Occupancy detected.
    Presence,
    /// No occupancy detected.
    Vacant,
    /// Contact is open.
    Open,
    /// Contact is closed.
    Closed,
    /// Domain-specific token outside the built-in vocabulary.
    Custom(String),
}

impl State {
    /// Creates a domain-specific state token.
    ///
    /// The token is lower-cased; a token matching a built-in state yields
    /// that built-in state rather than a shadowing custom one.
    ///
    /// # Errors
    ///
    /// Returns [`ValueError::EmptyCustomState`] if the token is empty.
    pub fn custom(token: impl Into<String>) -> Result<Self, ValueError> {
        let token = token.into();
        if token.trim().is_empty() {
            return Err(ValueError::EmptyCustomState);
        }
        let lower = token.trim().to_lowercase();
        match lower.parse() {
            Ok(builtin) => Ok(builtin),
            Err(_) => Ok(Self::Custom(lower)),
        }
    }

    /// Returns the canonical lower-case token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            Self::Unknown => "unknown",
            Self::On => "on",
            Self::Off => "off",
            Self::Light => "light",
            Self::Dark => "dark",
            Self::Motion => "motion",
            Self::Still => "still",
            Self::Presence => "presence",
            Self::Vacant => "vacant",
            Self::Open => "open",
            Self::Closed => "closed",
            Self::Custom(token) => token,
        }
    }

    /// Returns `true` if the state has not been established yet.
    #[must_use]
    pub const fn is_unknown(&self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Returns `true` for tokens outside the built-in vocabulary.
    #[must_use]
    pub const fn is_custom(&self) -> bool {
        matches!(self, Self::Custom(_))
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for State {
    type Err = ValueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unknown" => Ok(Self::Unknown),
            "on" => Ok(Self::On),
            "off" => Ok(Self::Off),
            "light" => Ok(Self::Light),
            "dark" => Ok(Self::Dark),
            "motion" => Ok(Self::Motion),
            "still" => Ok(Self::Still),
            "presence" => Ok(Self::Presence),
            "vacant" => Ok(Self::Vacant),
            "open" => Ok(Self::Open),
            "closed" => Ok(Self::Closed),
            _ => Err(ValueError::UnrecognizedState(s.to_string())),
        }
    }
}

impl From<bool> for State {
    fn from(value: bool) -> Self {
        if value { Self::On } else { Self::Off }
    }
}

impl From<State> for String {
    fn from(state: State) -> Self {
        match state {
            State::Custom(token) => token,
            builtin => builtin.as_str().to_string(),
        }
    }
}

impl TryFrom<String> for State {
    type Error = ValueError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::custom(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_as_str() {
        assert_eq!(State::Unknown.as_str(), "unknown");
        assert_eq!(State::On.as_str(), "on");
        assert_eq!(State::Off.as_str(), "off");
        assert_eq!(State::Light.as_str(), "light");
        assert_eq!(State::Dark.as_str(), "dark");
        assert_eq!(State::Motion.as_str(), "motion");
        assert_eq!(State::Still.as_str(), "still");
        assert_eq!(State::Presence.as_str(), "presence");
        assert_eq!(State::Vacant.as_str(), "vacant");
        assert_eq!(State::Open.as_str(), "open");
        assert_eq!(State::Closed.as_str(), "closed");
    }

    #[test]
    fn state_from_str() {
        assert_eq!("on".parse::<State>().unwrap(), State::On);
        assert_eq!("OFF".parse::<State>().unwrap(), State::Off);
        assert_eq!("Motion".parse::<State>().unwrap(), State::Motion);
        assert_eq!("vacant".parse::<State>().unwrap(), State::Vacant);
    }

    #[test]
    fn state_from_str_unrecognized() {
        let result = "blinking".parse::<State>();
        assert!(matches!(
            result,
            Err(ValueError::UnrecognizedState(token)) if token == "blinking"
        ));
    }

    #[test]
    fn state_from_bool() {
        assert_eq!(State::from(true), State::On);
        assert_eq!(State::from(false), State::Off);
    }

    #[test]
    fn custom_lowercases() {
        let state = State::custom("Heating").unwrap();
        assert_eq!(state, State::Custom("heating".to_string()));
        assert_eq!(state.as_str(), "heating");
        assert!(state.is_custom());
    }

    #[test]
    fn custom_canonicalizes_builtins() {
        assert_eq!(State::custom("ON").unwrap(), State::On);
        assert_eq!(State::custom("closed").unwrap(), State::Closed);
    }

    #[test]
    fn custom_rejects_empty() {
        assert_eq!(State::custom(""), Err(ValueError::EmptyCustomState));
        assert_eq!(State::custom("   "), Err(ValueError::EmptyCustomState));
    }

    #[test]
    fn display_matches_as_str() {
        assert_eq!(State::Presence.to_string(), "presence");
        assert_eq!(State::custom("heating").unwrap().to_string(), "heating");
    }

    #[test]
    fn default_is_unknown() {
        assert!(State::default().is_unknown());
    }

    #[test]
    fn serde_round_trip() {
        let json = serde_json::to_string(&State::Motion).unwrap();
        assert_eq!(json, "\"motion\"");
        let back: State = serde_json::from_str(&json).unwrap();
        assert_eq!(back, State::Motion);

        let custom = State::custom("heating").unwrap();
        let json = serde_json::to_string(&custom).unwrap();
        assert_eq!(json, "\"heating\"");
        let back: State = serde_json::from_str(&json).unwrap();
        assert_eq!(back, custom);
    }

    #[test]
    fn serde_rejects_empty_token() {
        let result = serde_json::from_str::<State>("\"\"");
        assert!(result.is_err());
    }
}
