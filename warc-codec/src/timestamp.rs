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

//! Variable-precision WARC dates (W3C-DTF profile).
//!
//! Accepted forms:
//!
//! ```text
//! YYYYZ
//! YYYY-MMZ
//! YYYY-MM-DDZ
//! YYYY-MM-DDThh:mmZ
//! YYYY-MM-DDThh:mm:ssZ
//! YYYY-MM-DDThh:mm:ss.f+Z
//! ```
//!
//! `T` and `Z` are accepted in either case and always rendered upper-case.
//! A parsed timestamp renders back to exactly its source text (modulo case),
//! including the number of fraction digits.

use std::fmt;

use chrono::{DateTime, Datelike, NaiveDate, Timelike, Utc};

/// Maximum number of fractional second digits kept verbatim.
pub const MAX_FRACTION_DIGITS: usize = 38;

/// Last component present in the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Precision {
    Year,
    Month,
    Day,
    Minute,
    Second,
    Fraction,
}

/// A WARC date with the precision it was written in.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Timestamp {
    year: u16,
    month: u8,
    day: u8,
    hour: u8,
    minute: u8,
    second: u8,
    nanosecond: u32,
    fraction_digits: u8,
    fraction_value: u128,
    precision: Precision,
}

struct Cursor<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn digits(&mut self, count: usize) -> Option<u32> {
        let end = self.pos.checked_add(count)?;
        let slice = self.bytes.get(self.pos..end)?;
        let mut value = 0u32;
        for &b in slice {
            if !b.is_ascii_digit() {
                return None;
            }
            value = value * 10 + (b - b'0') as u32;
        }
        self.pos = end;
        Some(value)
    }

    fn eat(&mut self, expected: u8) -> bool {
        match self.bytes.get(self.pos) {
            Some(b) if b.eq_ignore_ascii_case(&expected) => {
                self.pos += 1;
                true
            }
            _ => false,
        }
    }

    fn at_end(&self) -> bool {
        self.pos == self.bytes.len()
    }
}

fn in_range(value: u32, min: u32, max: u32) -> Option<u8> {
    if (min..=max).contains(&value) {
        Some(value as u8)
    } else {
        None
    }
}

impl Timestamp {
    /// Parse a WARC date string. Returns `None` on any malformed character or
    /// out-of-range component.
    pub fn parse(text: &str) -> Option<Timestamp> {
        let mut c = Cursor { bytes: text.as_bytes(), pos: 0 };
        let mut ts = Timestamp {
            year: c.digits(4)? as u16,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            nanosecond: 0,
            fraction_digits: 0,
            fraction_value: 0,
            precision: Precision::Year,
        };

        if c.eat(b'-') {
            ts.month = in_range(c.digits(2)?, 1, 12)?;
            ts.precision = Precision::Month;
            if c.eat(b'-') {
                ts.day = c.digits(2)? as u8;
                NaiveDate::from_ymd_opt(ts.year as i32, ts.month as u32, ts.day as u32)?;
                ts.precision = Precision::Day;
                if c.eat(b'T') {
                    ts.hour = in_range(c.digits(2)?, 0, 23)?;
                    if !c.eat(b':') {
                        return None;
                    }
                    ts.minute = in_range(c.digits(2)?, 0, 59)?;
                    ts.precision = Precision::Minute;
                    if c.eat(b':') {
                        ts.second = in_range(c.digits(2)?, 0, 59)?;
                        ts.precision = Precision::Second;
                        if c.eat(b'.') {
                            ts.parse_fraction(&mut c)?;
                            ts.precision = Precision::Fraction;
                        }
                    }
                }
            }
        }
        // Every form ends in the UTC designator.
        if !c.eat(b'Z') || !c.at_end() {
            return None;
        }
        Some(ts)
    }

    fn parse_fraction(&mut self, c: &mut Cursor<'_>) -> Option<()> {
        let start = c.pos;
        let mut value = 0u128;
        while let Some(b) = c.bytes.get(c.pos).filter(|b| b.is_ascii_digit()) {
            if c.pos - start == MAX_FRACTION_DIGITS {
                return None;
            }
            value = value * 10 + (b - b'0') as u128;
            c.pos += 1;
        }
        let digits = c.pos - start;
        if digits == 0 {
            return None;
        }
        self.fraction_digits = digits as u8;
        self.fraction_value = value;
        self.nanosecond = if digits <= 9 {
            (value * 10u128.pow(9 - digits as u32)) as u32
        } else {
            (value / 10u128.pow(digits as u32 - 9)) as u32
        };
        Some(())
    }

    /// Build a timestamp from a UTC date time, truncated to `precision`.
    ///
    /// A [`Precision::Fraction`] timestamp is rendered with nine digits.
    pub fn from_datetime(dt: &DateTime<Utc>, precision: Precision) -> Timestamp {
        let mut ts = Timestamp {
            year: dt.year().clamp(0, 9999) as u16,
            month: 1,
            day: 1,
            hour: 0,
            minute: 0,
            second: 0,
            nanosecond: 0,
            fraction_digits: 0,
            fraction_value: 0,
            precision,
        };
        if precision >= Precision::Month {
            ts.month = dt.month() as u8;
        }
        if precision >= Precision::Day {
            ts.day = dt.day() as u8;
        }
        if precision >= Precision::Minute {
            ts.hour = dt.hour() as u8;
            ts.minute = dt.minute() as u8;
        }
        if precision >= Precision::Second {
            // Leap seconds are folded into second 59.
            ts.second = dt.second().min(59) as u8;
        }
        if precision == Precision::Fraction {
            ts.nanosecond = dt.nanosecond() % 1_000_000_000;
            ts.fraction_digits = 9;
            ts.fraction_value = ts.nanosecond as u128;
        }
        ts
    }

    /// Current time with second precision.
    pub fn now() -> Timestamp {
        Self::from_datetime(&Utc::now(), Precision::Second)
    }

    /// Convert to a `chrono` date time. Absent components default to their minimum.
    pub fn to_datetime(&self) -> Option<DateTime<Utc>> {
        NaiveDate::from_ymd_opt(self.year as i32, self.month as u32, self.day as u32)?
            .and_hms_nano_opt(self.hour as u32, self.minute as u32, self.second as u32, self.nanosecond)
            .map(|dt| dt.and_utc())
    }

    pub fn year(&self) -> u16 {
        self.year
    }

    pub fn month(&self) -> u8 {
        self.month
    }

    pub fn day(&self) -> u8 {
        self.day
    }

    pub fn hour(&self) -> u8 {
        self.hour
    }

    pub fn minute(&self) -> u8 {
        self.minute
    }

    pub fn second(&self) -> u8 {
        self.second
    }

    pub fn nanosecond(&self) -> u32 {
        self.nanosecond
    }

    /// Number of fractional second digits in the source text.
    pub fn fraction_digits(&self) -> usize {
        self.fraction_digits as usize
    }

    /// Numeric value of the fractional second digits as written.
    pub fn fraction_value(&self) -> u128 {
        self.fraction_value
    }

    pub fn precision(&self) -> Precision {
        self.precision
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        if self.precision >= Precision::Month {
            write!(f, "-{:02}", self.month)?;
        }
        if self.precision >= Precision::Day {
            write!(f, "-{:02}", self.day)?;
        }
        if self.precision >= Precision::Minute {
            write!(f, "T{:02}:{:02}", self.hour, self.minute)?;
        }
        if self.precision >= Precision::Second {
            write!(f, ":{:02}", self.second)?;
        }
        if self.precision == Precision::Fraction {
            write!(f, ".{:0width$}", self.fraction_value, width = self.fraction_digits as usize)?;
        }
        f.write_str("Z")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn parses_every_precision() {
        let cases = [
            ("2016Z", Precision::Year),
            ("2016-01Z", Precision::Month),
            ("2016-01-11Z", Precision::Day),
            ("2016-01-11T23:01Z", Precision::Minute),
            ("2016-01-11T23:01:42Z", Precision::Second),
            ("2016-01-11T23:01:42.5Z", Precision::Fraction),
        ];
        for (text, precision) in cases {
            let ts = Timestamp::parse(text).unwrap_or_else(|| panic!("{text} did not parse"));
            assert_eq!(ts.precision(), precision, "{text}");
            assert_eq!(ts.to_string(), text);
        }
    }

    #[test]
    fn normalises_case() {
        let ts = Timestamp::parse("2016-01-11t23:01:42z").unwrap();
        assert_eq!(ts.to_string(), "2016-01-11T23:01:42Z");
    }

    #[test]
    fn keeps_trailing_fraction_zeros() {
        let ts = Timestamp::parse("2016-01-11T23:01:42.120000000Z").unwrap();
        assert_eq!(ts.fraction_digits(), 9);
        assert_eq!(ts.fraction_value(), 120_000_000);
        assert_eq!(ts.nanosecond(), 120_000_000);
        assert_eq!(ts.to_string(), "2016-01-11T23:01:42.120000000Z");

        let ts = Timestamp::parse("2016-01-11T23:01:42.0001234567891234567Z").unwrap();
        assert_eq!(ts.fraction_digits(), 19);
        assert_eq!(ts.nanosecond(), 123_456);
        assert_eq!(ts.to_string(), "2016-01-11T23:01:42.0001234567891234567Z");
    }

    #[test]
    fn rejects_malformed_input() {
        for text in [
            "",
            "2016",
            "2016-01",
            "2016-01-11",
            "201Z",
            "20160",
            "2016-1",
            "2016-13",
            "2016-02-30",
            "2016-01-11T",
            "2016-01-11T23Z",
            "2016-01-11T24:00Z",
            "2016-01-11T23:01",
            "2016-01-11T23:01:42",
            "2016-01-11T23:01:60Z",
            "2016-01-11T23:01:42.Z",
            "2016-01-11T23:01:42ZZ",
            "2016-01-11 23:01:42Z",
            "x016-01-11T23:01:42Z",
        ] {
            assert!(Timestamp::parse(text).is_none(), "{text} should not parse");
        }
    }

    #[test]
    fn converts_to_chrono() {
        let ts = Timestamp::parse("2016-01-11T23:01:42.25Z").unwrap();
        let dt = ts.to_datetime().unwrap();
        assert_eq!(dt.to_rfc3339(), "2016-01-11T23:01:42.250+00:00");
        let back = Timestamp::from_datetime(&dt, Precision::Second);
        assert_eq!(back.to_string(), "2016-01-11T23:01:42Z");
    }

    #[test]
    fn now_has_second_precision() {
        let now = Timestamp::now();
        assert_eq!(now.precision(), Precision::Second);
        assert_eq!(now.to_string().len(), "2016-01-11T23:01:42Z".len());
    }

    fn timestamp_text() -> impl Strategy<Value = String> {
        (
            1000u32..=9999,
            1u32..=12,
            1u32..=28,
            0u32..=23,
            0u32..=59,
            0u32..=59,
            "[0-9]{1,19}",
            0usize..7,
            any::<bool>(),
            any::<bool>(),
        )
            .prop_map(|(y, mo, d, h, mi, s, frac, depth, lower_t, lower_z)| {
                let t = if lower_t { "t" } else { "T" };
                let z = if lower_z { "z" } else { "Z" };
                match depth {
                    0 | 1 => format!("{y:04}{z}"),
                    2 => format!("{y:04}-{mo:02}{z}"),
                    3 => format!("{y:04}-{mo:02}-{d:02}{z}"),
                    4 => format!("{y:04}-{mo:02}-{d:02}{t}{h:02}:{mi:02}{z}"),
                    5 => format!("{y:04}-{mo:02}-{d:02}{t}{h:02}:{mi:02}:{s:02}{z}"),
                    _ => format!("{y:04}-{mo:02}-{d:02}{t}{h:02}:{mi:02}:{s:02}.{frac}{z}"),
                }
            })
    }

    proptest! {
        #[test]
        fn render_reproduces_source(text in timestamp_text()) {
            let ts = Timestamp::parse(&text).expect("generated timestamp must parse");
            prop_assert_eq!(ts.to_string(), text.to_uppercase());
        }
    }
}
