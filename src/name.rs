//! Name normalization.
//!
//! Every slot in a [`Namespace`](crate::Namespace) is keyed by a
//! [`CanonicalName`]: the camel-cased spelling of whatever identifier the
//! caller used. `models`, `Models` and `_models` all address the same slot;
//! `user_account` becomes `UserAccount`.

use std::borrow::Borrow;
use std::fmt;

/// Convert a raw identifier to its canonical camel-cased form.
///
/// A leading ASCII lower-case letter is upper-cased, and every run of `_`
/// that is followed by an alphanumeric character is dropped with that
/// character upper-cased. Underscores with nothing alphanumeric after them
/// are kept.
///
/// ```rust
/// use lazyspace::name::normalize;
///
/// assert_eq!(normalize("user_account"), "UserAccount");
/// assert_eq!(normalize("user__account"), "UserAccount");
/// assert_eq!(normalize("UserAccount"), "UserAccount");
/// ```
pub fn normalize(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();

    if let Some(&first) = chars.peek() {
        if first.is_ascii_lowercase() {
            out.push(first.to_ascii_uppercase());
            chars.next();
        }
    }

    while let Some(c) = chars.next() {
        if c != '_' {
            out.push(c);
            continue;
        }
        let mut run = 1;
        while chars.next_if_eq(&'_').is_some() {
            run += 1;
        }
        match chars.next_if(|next| next.is_alphanumeric()) {
            Some(next) => out.extend(next.to_uppercase()),
            None => out.extend(std::iter::repeat('_').take(run)),
        }
    }
    out
}

/// Convert a canonical name to its lower-case, underscore separated form.
///
/// Used to derive file name stems for file-sourced definitions.
///
/// ```rust
/// use lazyspace::name::path_form;
///
/// assert_eq!(path_form("UserAccount"), "user_account");
/// assert_eq!(path_form("HTMLParser"), "html_parser");
/// ```
pub fn path_form(name: &str) -> String {
    let chars: Vec<char> = name.chars().collect();
    let mut out = String::with_capacity(name.len() + 4);

    for (i, &c) in chars.iter().enumerate() {
        if i > 0 && c.is_ascii_uppercase() {
            let prev = chars[i - 1];
            let next = chars.get(i + 1).copied();
            // "HTMLParser": split before the capital that starts a word
            let acronym_end =
                prev.is_ascii_uppercase() && next.is_some_and(|n| n.is_ascii_lowercase());
            let word_start = prev.is_ascii_lowercase() || prev.is_ascii_digit();
            if acronym_end || word_start {
                out.push('_');
            }
        }
        out.push(c);
    }
    out.to_lowercase()
}

/// A normalized identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CanonicalName(String);

impl CanonicalName {
    /// Normalize `raw` into a canonical name.
    pub fn new(raw: impl AsRef<str>) -> Self {
        Self(normalize(raw.as_ref()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The lower-case, underscore separated spelling of this name.
    pub fn path_form(&self) -> String {
        path_form(&self.0)
    }
}

impl fmt::Display for CanonicalName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for CanonicalName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl Borrow<str> for CanonicalName {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CanonicalName {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for CanonicalName {
    fn from(raw: String) -> Self {
        Self::new(raw)
    }
}

impl From<&CanonicalName> for CanonicalName {
    fn from(name: &CanonicalName) -> Self {
        name.clone()
    }
}

impl PartialEq<str> for CanonicalName {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for CanonicalName {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// Registration key for factory and initializer chains.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Key {
    /// Matches every requested name.
    Wildcard,
    /// Matches one canonical name.
    Name(CanonicalName),
}

impl Key {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Key::Wildcard)
    }
}

impl From<&str> for Key {
    fn from(raw: &str) -> Self {
        Key::Name(CanonicalName::new(raw))
    }
}

impl From<String> for Key {
    fn from(raw: String) -> Self {
        Key::Name(CanonicalName::new(raw))
    }
}

impl From<CanonicalName> for Key {
    fn from(name: CanonicalName) -> Self {
        Key::Name(name)
    }
}

impl From<&CanonicalName> for Key {
    fn from(name: &CanonicalName) -> Self {
        Key::Name(name.clone())
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Wildcard => f.write_str("*"),
            Key::Name(name) => name.fmt(f),
        }
    }
}
