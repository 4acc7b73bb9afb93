//-
// Copyright (c) 2024, The Eml2mbox Authors
//
// This file is part of Eml2mbox.
//
// Eml2mbox is free software: you can redistribute it and/or modify it under the
// terms of  the GNU General Public  License as published by  the Free Software
// Foundation, either version  3 of the License, or (at  your option) any later
// version.
//
// Eml2mbox is distributed in the hope that  it will be useful,  but WITHOUT ANY
// WARRANTY; without  even the implied  warranty of MERCHANTABILITY  or FITNESS
// FOR  A PARTICULAR  PURPOSE.  See the  GNU General  Public  License for  more
// details.
//
// You should have received a copy of the GNU General Public License along with
// Eml2mbox. If not, see <http://www.gnu.org/licenses/>.

//! Lenient parsing of the date text found in `Date:` headers.
//!
//! RFC 2822 3.3 defines the format, but real mail also carries the obsolete
//! forms from 4.3, asctime-style dates, missing seconds, lower-case names and
//! whatever else agents have come up with over the years. This parser only
//! extracts the individual fields; whether they form a real calendar date is
//! for the caller to decide.

use chrono::prelude::*;
use nom::{
    branch::alt,
    bytes::complete::{take_while, take_while1, take_while_m_n},
    character::complete::{alpha1, char, one_of},
    combinator::{map, map_opt, opt, recognize},
    sequence::{pair, preceded, terminated, tuple},
    IResult,
};

/// The zone of a parsed date, as written.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Zone {
    /// A `+hhmm` or `-hhmm` offset, kept verbatim.
    Numeric(String),
    /// An alphabetic zone name such as `PDT`.
    Named(String),
}

/// The fields of a date, exactly as written in the header.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DateParts {
    pub weekday: Option<Weekday>,
    pub year: i32,
    pub month: u32,
    pub day: u32,
    pub hour: u32,
    pub minute: u32,
    pub second: u32,
    pub zone: Option<Zone>,
}

impl DateParts {
    /// Combine the numeric fields into a single instant.
    ///
    /// Returns `None` if the fields do not describe a valid date and time.
    /// A leap second (`:60`) is accepted.
    pub fn instant(&self) -> Option<NaiveDateTime> {
        let date = NaiveDate::from_ymd_opt(self.year, self.month, self.day)?;
        if 60 == self.second {
            date.and_hms_milli_opt(self.hour, self.minute, 59, 1000)
        } else {
            date.and_hms_opt(self.hour, self.minute, self.second)
        }
    }
}

/// Parse the value of a `Date:` header.
///
/// Anything following the recognised date (such as a trailing comment with
/// the zone name) is ignored. Returns `None` if no date could be found at the
/// start of `text`.
pub fn parse_date(text: &str) -> Option<DateParts> {
    date_time(text.trim_start()).ok().map(|(_, parts)| parts)
}

static WEEKDAY_NAMES: [(&str, Weekday); 7] = [
    ("mon", Weekday::Mon),
    ("tue", Weekday::Tue),
    ("wed", Weekday::Wed),
    ("thu", Weekday::Thu),
    ("fri", Weekday::Fri),
    ("sat", Weekday::Sat),
    ("sun", Weekday::Sun),
];

static MONTH_NAMES: [&str; 12] = [
    "jan", "feb", "mar", "apr", "may", "jun", "jul", "aug", "sep", "oct", "nov",
    "dec",
];

// Names are matched on their first three letters so that both "Thu" and
// "Thursday" (or "Sept") are understood.
fn abbreviation(name: &str) -> Option<&str> {
    if name.len() >= 3 && name.is_ascii() {
        Some(&name[..3])
    } else {
        None
    }
}

fn blanks(i: &str) -> IResult<&str, &str> {
    take_while(|c: char| ' ' == c || '\t' == c)(i)
}

fn blanks1(i: &str) -> IResult<&str, &str> {
    take_while1(|c: char| ' ' == c || '\t' == c)(i)
}

fn date_separator(i: &str) -> IResult<&str, &str> {
    take_while1(|c: char| ' ' == c || '\t' == c || '-' == c)(i)
}

fn number(i: &str, min: usize, max: usize) -> IResult<&str, u32> {
    map_opt(
        take_while_m_n(min, max, |c: char| c.is_ascii_digit()),
        |s: &str| s.parse::<u32>().ok(),
    )(i)
}

fn one_or_two_digit(i: &str) -> IResult<&str, u32> {
    number(i, 1, 2)
}

fn two_digit(i: &str) -> IResult<&str, u32> {
    number(i, 2, 2)
}

fn weekday(i: &str) -> IResult<&str, Weekday> {
    map_opt(alpha1, |name: &str| {
        let abbr = abbreviation(name)?;
        WEEKDAY_NAMES
            .iter()
            .find(|&&(n, _)| n.eq_ignore_ascii_case(abbr))
            .map(|&(_, wd)| wd)
    })(i)
}

fn month(i: &str) -> IResult<&str, u32> {
    map_opt(alpha1, |name: &str| {
        let abbr = abbreviation(name)?;
        MONTH_NAMES
            .iter()
            .position(|n| n.eq_ignore_ascii_case(abbr))
            .map(|ix| ix as u32 + 1)
    })(i)
}

fn year(i: &str) -> IResult<&str, i32> {
    map_opt(
        take_while_m_n(2, 4, |c: char| c.is_ascii_digit()),
        |s: &str| {
            let mut y = s.parse::<i32>().ok()?;
            // Y2K windowing described by RFC 2822 4.3
            if 2 == s.len() && y < 50 {
                y += 2000;
            } else if s.len() < 4 {
                y += 1900;
            }
            Some(y)
        },
    )(i)
}

fn colon(i: &str) -> IResult<&str, char> {
    preceded(blanks, terminated(char(':'), blanks))(i)
}

// Seconds are optional per RFC 2822 3.3. Hours are allowed a single digit
// since some agents fail to pad them.
fn time_of_day(i: &str) -> IResult<&str, (u32, u32, u32)> {
    map(
        tuple((
            one_or_two_digit,
            preceded(colon, two_digit),
            opt(preceded(colon, two_digit)),
        )),
        |(h, m, s)| (h, m, s.unwrap_or(0)),
    )(i)
}

fn numeric_zone(i: &str) -> IResult<&str, Zone> {
    map(
        recognize(pair(
            one_of("+-"),
            take_while_m_n(4, 4, |c: char| c.is_ascii_digit()),
        )),
        |s: &str| Zone::Numeric(s.to_owned()),
    )(i)
}

fn named_zone(i: &str) -> IResult<&str, Zone> {
    map(alpha1, |s: &str| Zone::Named(s.to_owned()))(i)
}

fn zone(i: &str) -> IResult<&str, Zone> {
    alt((numeric_zone, named_zone))(i)
}

// day month year time [zone]
fn standard_date(i: &str) -> IResult<&str, DateParts> {
    map(
        tuple((
            terminated(one_or_two_digit, date_separator),
            terminated(month, date_separator),
            terminated(year, blanks1),
            time_of_day,
            opt(preceded(blanks, zone)),
        )),
        |(day, month, year, (hour, minute, second), zone)| DateParts {
            weekday: None,
            year,
            month,
            day,
            hour,
            minute,
            second,
            zone,
        },
    )(i)
}

// month day time [zone] year [zone], as produced by asctime() and date(1)
fn asctime_date(i: &str) -> IResult<&str, DateParts> {
    map(
        tuple((
            terminated(month, blanks1),
            terminated(one_or_two_digit, blanks1),
            terminated(time_of_day, blanks1),
            opt(terminated(zone, blanks1)),
            year,
            opt(preceded(blanks1, zone)),
        )),
        |(month, day, (hour, minute, second), zone_before, year, zone_after)| {
            DateParts {
                weekday: None,
                year,
                month,
                day,
                hour,
                minute,
                second,
                zone: zone_before.or(zone_after),
            }
        },
    )(i)
}

fn date_time(i: &str) -> IResult<&str, DateParts> {
    map(
        pair(
            opt(terminated(
                weekday,
                tuple((blanks, opt(char(',')), blanks)),
            )),
            alt((standard_date, asctime_date)),
        ),
        |(weekday, mut parts)| {
            parts.weekday = weekday;
            parts
        },
    )(i)
}
