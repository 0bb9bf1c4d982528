// SPDX-License-Identifier: GPL-3.0-or-later

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Entity families that can appear in an identifier, as (prefix code, full name).
pub const TYPENAMES: &[(&str, &str)] = &[
    ("AR", "artist"),
    ("SO", "song"),
    ("RE", "release"),
    ("TR", "track"),
    ("PE", "person"),
    ("DE", "device"),
    ("LI", "listener"),
    ("ED", "editor"),
    ("TW", "tweditor"),
    ("CA", "catalog"),
];

fn codes() -> String {
    TYPENAMES
        .iter()
        .map(|(code, _)| *code)
        .collect::<Vec<_>>()
        .join("|")
}

fn names() -> String {
    TYPENAMES
        .iter()
        .map(|(_, name)| *name)
        .collect::<Vec<_>>()
        .join("|")
}

lazy_static! {
    static ref SHORT_REGEX: Regex = Regex::new(&format!(
        r"^((?:{})[0-9A-Z]{{16}})(?:\^([0-9.]+))?$",
        codes()
    ))
    .expect("valid short id regex");
    static ref LONG_REGEX: Regex = Regex::new(&format!(
        r"^[A-Za-z][A-Za-z0-9+.-]*://[^/]+/.+?/(?:{codes})/((?:{codes})[0-9A-Z]{{16}})(?:\^([0-9.]+))?$",
        codes = codes()
    ))
    .expect("valid long id regex");
    static ref FOREIGN_REGEX: Regex = Regex::new(&format!(
        r"^(.+?):({}):([^\^]+)(?:\^([0-9.]+))?$",
        names()
    ))
    .expect("valid foreign id regex");
}

/// Which textual form an identifier takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IdentifierKind {
    /// Two-letter type code plus 16 alphanumerics, e.g. `ARH6W4X1187B99274F`.
    Short,
    /// URI form, e.g. `music://id.echonest.com/~/AR/ARH6W4X1187B99274F`.
    Long,
    /// Third-party id, e.g. `musicbrainz:artist:a74b1b7f-...`.
    Foreign,
    /// Anything else; sent as free text.
    Name,
}

/// Classify an identifier string. Pure pattern matching, total over all inputs.
pub fn classify(s: &str) -> IdentifierKind {
    if SHORT_REGEX.is_match(s) {
        IdentifierKind::Short
    } else if LONG_REGEX.is_match(s) {
        IdentifierKind::Long
    } else if FOREIGN_REGEX.is_match(s) {
        IdentifierKind::Foreign
    } else {
        IdentifierKind::Name
    }
}

/// An entity identifier tagged with its classified form.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Identifier {
    raw: String,
    kind: IdentifierKind,
}

impl Identifier {
    pub fn parse(s: impl Into<String>) -> Self {
        let raw = s.into();
        let kind = classify(&raw);
        Self { raw, kind }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn kind(&self) -> IdentifierKind {
        self.kind
    }

    /// True for the short, long and foreign forms.
    pub fn is_id(&self) -> bool {
        self.kind != IdentifierKind::Name
    }

    /// Request parameter the identifier travels under: `id` or `name`.
    pub fn param_key(&self) -> &'static str {
        if self.is_id() {
            "id"
        } else {
            "name"
        }
    }

    /// The `^version` suffix, when present.
    pub fn version(&self) -> Option<&str> {
        let captures = match self.kind {
            IdentifierKind::Short => SHORT_REGEX.captures(&self.raw),
            IdentifierKind::Long => LONG_REGEX.captures(&self.raw),
            IdentifierKind::Foreign => {
                return FOREIGN_REGEX
                    .captures(&self.raw)
                    .and_then(|c| c.get(4))
                    .map(|m| m.as_str());
            }
            IdentifierKind::Name => None,
        };
        captures.and_then(|c| c.get(2)).map(|m| m.as_str())
    }

    /// Full entity type name (`artist`, `song`, ...) encoded in the identifier.
    pub fn entity_type(&self) -> Option<&str> {
        match self.kind {
            IdentifierKind::Short | IdentifierKind::Long => {
                let code = self.short_code()?.get(..2)?;
                TYPENAMES
                    .iter()
                    .find(|(c, _)| *c == code)
                    .map(|(_, name)| *name)
            }
            IdentifierKind::Foreign => FOREIGN_REGEX
                .captures(&self.raw)
                .and_then(|c| c.get(2))
                .map(|m| m.as_str()),
            IdentifierKind::Name => None,
        }
    }

    /// The bare 18-character code of a short or long identifier.
    pub fn short_code(&self) -> Option<&str> {
        let captures = match self.kind {
            IdentifierKind::Short => SHORT_REGEX.captures(&self.raw),
            IdentifierKind::Long => LONG_REGEX.captures(&self.raw),
            _ => None,
        }?;
        captures.get(1).map(|m| m.as_str())
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl From<&str> for Identifier {
    fn from(s: &str) -> Self {
        Self::parse(s)
    }
}

impl From<String> for Identifier {
    fn from(s: String) -> Self {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHORT: &str = "ARH6W4X1187B99274F";
    const LONG: &str = "music://id.echonest.com/~/AR/ARH6W4X1187B99274F";
    const FOREIGN: &str = "musicbrainz:artist:a74b1b7f-71a5-4011-9441-d0b5e4122711";

    fn matches(s: &str) -> [bool; 3] {
        [
            SHORT_REGEX.is_match(s),
            LONG_REGEX.is_match(s),
            FOREIGN_REGEX.is_match(s),
        ]
    }

    #[test]
    fn short_ids_for_every_type_code() {
        for (code, _) in TYPENAMES {
            let id = format!("{code}ABCDEFGHIJ123456");
            assert_eq!(classify(&id), IdentifierKind::Short, "{id}");
            assert_eq!(classify(&format!("{id}^1.2")), IdentifierKind::Short);
        }
    }

    #[test]
    fn valid_forms_match_exactly_one_pattern() {
        assert_eq!(matches(SHORT), [true, false, false]);
        assert_eq!(matches(LONG), [false, true, false]);
        assert_eq!(matches(FOREIGN), [false, false, true]);
        assert_eq!(matches("spotify-WW:artist:4Z8W4fKeB5YxbusRsdQVPb^2"), [false, false, true]);
        assert_eq!(matches("The National"), [false, false, false]);
    }

    #[test]
    fn near_misses_fall_back_to_name() {
        for s in [
            "",
            "the national",
            "ARH6W4X1187B99274",      // 15 chars after prefix
            "XXH6W4X1187B99274F",     // unknown prefix
            "arh6w4x1187b99274f",     // lowercase
            "ARH6W4X1187B99274F trailing",
            "musicbrainz:widget:abc", // unknown entity type
            "music://id.echonest.com/AR",
        ] {
            assert_eq!(classify(s), IdentifierKind::Name, "{s:?}");
        }
    }

    #[test]
    fn param_key_follows_classification() {
        assert_eq!(Identifier::parse(SHORT).param_key(), "id");
        assert_eq!(Identifier::parse(LONG).param_key(), "id");
        assert_eq!(Identifier::parse(FOREIGN).param_key(), "id");
        assert_eq!(Identifier::parse("weezer").param_key(), "name");
    }

    #[test]
    fn extracts_version_type_and_code() {
        let short = Identifier::parse("SOCZMFK12AC468668F^3.1");
        assert_eq!(short.version(), Some("3.1"));
        assert_eq!(short.entity_type(), Some("song"));
        assert_eq!(short.short_code(), Some("SOCZMFK12AC468668F"));

        let long = Identifier::parse(LONG);
        assert_eq!(long.version(), None);
        assert_eq!(long.entity_type(), Some("artist"));
        assert_eq!(long.short_code(), Some(SHORT));

        let foreign = Identifier::parse("7digital-US:track:12345^2");
        assert_eq!(foreign.kind(), IdentifierKind::Foreign);
        assert_eq!(foreign.entity_type(), Some("track"));
        assert_eq!(foreign.version(), Some("2"));

        assert_eq!(Identifier::parse("radiohead").entity_type(), None);
    }
}
