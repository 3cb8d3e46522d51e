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

/// Parsed `type/subtype; name=value` media type.
///
/// Type, subtype and parameter names are lower-cased, parameter values are kept
/// as written (without surrounding quotes).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContentType {
    media_type: String,
    media_subtype: String,
    parameters: Vec<(String, String)>,
}

fn is_token_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-.^_`|~".contains(c)
}

fn is_token(s: &str) -> bool {
    !s.is_empty() && s.chars().all(is_token_char)
}

impl ContentType {
    pub fn new(media_type: &str, media_subtype: &str) -> Self {
        ContentType {
            media_type: media_type.to_lowercase(),
            media_subtype: media_subtype.to_lowercase(),
            parameters: Vec::new(),
        }
    }

    /// Parse a content type. Returns `None` if the value is not a valid media type.
    pub fn parse(text: &str) -> Option<ContentType> {
        let text = text.trim();
        let (mime, mut rest) = match text.find(';') {
            Some(pos) => (&text[..pos], &text[pos..]),
            None => (text, ""),
        };
        let (media_type, media_subtype) = mime.trim().split_once('/')?;
        if !is_token(media_type) || !is_token(media_subtype) {
            return None;
        }
        let mut content_type = ContentType::new(media_type, media_subtype);

        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }
            rest = rest.strip_prefix(';')?.trim_start();
            if rest.is_empty() {
                // Tolerate a trailing separator.
                break;
            }
            let eq = rest.find('=')?;
            let name = rest[..eq].trim_end();
            if !is_token(name) {
                return None;
            }
            rest = rest[eq + 1..].trim_start();
            let value;
            if let Some(quoted) = rest.strip_prefix('"') {
                let mut out = String::new();
                let mut chars = quoted.char_indices();
                let mut end = None;
                while let Some((i, c)) = chars.next() {
                    match c {
                        '\\' => out.push(chars.next()?.1),
                        '"' => {
                            end = Some(i + 1);
                            break;
                        }
                        _ => out.push(c),
                    }
                }
                value = out;
                rest = &quoted[end?..];
            } else {
                let end = rest.find(';').unwrap_or(rest.len());
                let token = rest[..end].trim_end();
                if !is_token(token) {
                    return None;
                }
                value = token.to_string();
                rest = &rest[end..];
            }
            content_type.parameters.push((name.to_lowercase(), value));
        }
        Some(content_type)
    }

    /// Add a parameter.
    pub fn with_parameter(mut self, name: &str, value: &str) -> Self {
        self.parameters.push((name.to_lowercase(), value.to_string()));
        self
    }

    pub fn media_type(&self) -> &str {
        &self.media_type
    }

    pub fn media_subtype(&self) -> &str {
        &self.media_subtype
    }

    /// `type/subtype` without parameters.
    pub fn essence(&self) -> String {
        format!("{}/{}", self.media_type, self.media_subtype)
    }

    /// Get value of the first (case-insensitive) parameter `name`.
    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.parameters
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn parameters(&self) -> &[(String, String)] {
        &self.parameters
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.media_type, self.media_subtype)?;
        for (name, value) in &self.parameters {
            if is_token(value) {
                write!(f, "; {name}={value}")?;
            } else {
                let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
                write!(f, "; {name}=\"{escaped}\"")?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_parameters() {
        let ct = ContentType::parse("Application/HTTP; msgtype=response").unwrap();
        assert_eq!(ct.essence(), "application/http");
        assert_eq!(ct.parameter("MsgType"), Some("response"));
        assert_eq!(ct.to_string(), "application/http; msgtype=response");

        let ct = ContentType::parse(r#"text/plain;charset="utf-8";;"#);
        assert!(ct.is_none());

        let ct = ContentType::parse(r#"text/plain; title="a \"b\"; c";"#).unwrap();
        assert_eq!(ct.parameter("title"), Some(r#"a "b"; c"#));
    }

    #[test]
    fn rejects_invalid() {
        for text in ["", "text", "text/", "/html", "te xt/html", "text/html; charset", "text/html; =x", "text/html; a=\"open"] {
            assert!(ContentType::parse(text).is_none(), "{text}");
        }
    }
}
