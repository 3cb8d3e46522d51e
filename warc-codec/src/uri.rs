// Copyright 2025 Janek Bevendorff
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::fmt;

/// How strictly URIs are validated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum UriProfile {
    /// Only RFC 3986 characters and well-formed percent escapes.
    Strict,
    /// Anything without whitespace or control characters, as found in historical crawls.
    #[default]
    Lax,
}

/// An absolute URI as used in WARC headers (record IDs, target URIs, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Uri {
    value: String,
}

fn is_rfc3986_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b"-._~:/?#[]@!$&'()*+,;=%".contains(&b)
}

fn valid_percent_escapes(text: &str) -> bool {
    let bytes = text.as_bytes();
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'%' {
            match bytes.get(i + 1..i + 3) {
                Some(hex) if hex.iter().all(u8::is_ascii_hexdigit) => i += 3,
                _ => return false,
            }
        } else {
            i += 1;
        }
    }
    true
}

/// `ALPHA *( ALPHA / DIGIT / "+" / "-" / "." ) ":"` prefix.
fn has_scheme(text: &str) -> bool {
    let Some((scheme, _)) = text.split_once(':') else {
        return false;
    };
    let mut bytes = scheme.bytes();
    bytes.next().is_some_and(|b| b.is_ascii_alphabetic())
        && bytes.all(|b| b.is_ascii_alphanumeric() || b"+-.".contains(&b))
}

impl Uri {
    /// Parse a bare URI (no angle brackets).
    pub fn parse(text: &str, profile: UriProfile) -> Option<Uri> {
        if text.is_empty() {
            return None;
        }
        let chars_ok = match profile {
            UriProfile::Strict => text.bytes().all(is_rfc3986_char) && valid_percent_escapes(text),
            UriProfile::Lax => !text.chars().any(|c| c.is_whitespace() || c.is_control() || c == '<' || c == '>'),
        };
        if !chars_ok {
            return None;
        }
        match profile {
            UriProfile::Strict => {
                url::Url::parse(text).ok()?;
            }
            UriProfile::Lax if !has_scheme(text) => return None,
            UriProfile::Lax => {}
        }
        Some(Uri { value: text.to_string() })
    }

    /// Parse either a bare URI or one enclosed in `<` `>`.
    ///
    /// Returns the URI and whether it was enclosed in angle brackets.
    pub fn parse_any(text: &str, profile: UriProfile) -> Option<(Uri, bool)> {
        match text.strip_prefix('<') {
            Some(inner) => Some((Self::parse(inner.strip_suffix('>')?, profile)?, true)),
            None => Some((Self::parse(text, profile)?, false)),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn scheme(&self) -> &str {
        self.value.split(':').next().unwrap_or_default()
    }

    /// `<uri>` form used for record identifiers.
    pub fn bracketed(&self) -> String {
        format!("<{}>", self.value)
    }
}

impl fmt::Display for Uri {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
