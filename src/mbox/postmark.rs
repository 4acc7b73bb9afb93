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

//! Construction of the parts of the mbox postmark ("From_") line.

use std::borrow::Cow;

use chrono::prelude::*;
use log::debug;

use super::date::{parse_date, Zone};

// Named zones and their offsets. RFC 2822 4.3 only defines UT, GMT and the
// North American zones; the rest are abbreviations that show up in real mail
// often enough to be worth knowing. Ambiguous names (e.g. IST) are left out.
static ZONE_OFFSETS: &[(&str, &str)] = &[
    ("UT", "+0000"),
    ("UTC", "+0000"),
    ("GMT", "+0000"),
    ("Z", "+0000"),
    ("EST", "-0500"),
    ("EDT", "-0400"),
    ("CST", "-0600"),
    ("CDT", "-0500"),
    ("MST", "-0700"),
    ("MDT", "-0600"),
    ("PST", "-0800"),
    ("PDT", "-0700"),
    ("AST", "-0400"),
    ("ADT", "-0300"),
    ("AKST", "-0900"),
    ("AKDT", "-0800"),
    ("HST", "-1000"),
    ("WET", "+0000"),
    ("WEST", "+0100"),
    ("BST", "+0100"),
    ("CET", "+0100"),
    ("CEST", "+0200"),
    ("MET", "+0100"),
    ("MEST", "+0200"),
    ("EET", "+0200"),
    ("EEST", "+0300"),
    ("MSK", "+0300"),
    ("HKT", "+0800"),
    ("SGT", "+0800"),
    ("JST", "+0900"),
    ("KST", "+0900"),
    ("AEST", "+1000"),
    ("AEDT", "+1100"),
    ("NZST", "+1200"),
    ("NZDT", "+1300"),
];

/// Look up the numeric offset of a named time zone.
pub fn zone_offset(name: &str) -> Option<&'static str> {
    ZONE_OFFSETS
        .iter()
        .find(|&&(n, _)| n.eq_ignore_ascii_case(name))
        .map(|&(_, offset)| offset)
}

/// Reduce a `From <value>` string to `From <address>`.
///
/// The address is whatever lies between the last `<` and the last `>`. If
/// there is no such pair, the value is assumed to already be a bare address
/// (or to be too broken to do anything with) and is returned unchanged.
pub fn reduce_from_header(value: &str) -> Cow<str> {
    match (value.rfind('<'), value.rfind('>')) {
        (Some(open), Some(close)) if open < close => {
            Cow::Owned(format!("From {}", &value[open + 1..close]))
        },
        _ => Cow::Borrowed(value),
    }
}

/// Render the date part of a postmark line.
///
/// The result is asctime-like (`Mon Jan 02 15:04:05 2006`). If `offset` is
/// given, it is placed after the year, or between the time and the year if
/// `zone_before_year` is set.
pub fn format_postmark_date(
    instant: &NaiveDateTime,
    offset: Option<&str>,
    zone_before_year: bool,
) -> String {
    let time = instant.format("%a %b %d %H:%M:%S");
    let year = instant.format("%Y");
    match offset {
        None => format!("{} {}", time, year),
        Some(offset) if zone_before_year => {
            format!("{} {} {}", time, offset, year)
        },
        Some(offset) => format!("{} {} {}", time, year, offset),
    }
}

/// Turn the value of a `Date:` header into a postmark date.
///
/// The wall-clock fields are kept as written; the zone only contributes the
/// offset text. Named zones not in the table produce a date without an
/// offset. Returns `None` if the value cannot be parsed or does not describe
/// a real date.
pub fn format_date_header(
    value: &str,
    zone_before_year: bool,
) -> Option<String> {
    let parts = parse_date(value)?;
    let instant = parts.instant()?;
    if let Some(weekday) = parts.weekday {
        if weekday != instant.weekday() {
            debug!(
                "Date {:?} says {} but the date is a {}",
                value,
                weekday,
                instant.weekday()
            );
        }
    }

    let offset = match parts.zone {
        None => None,
        Some(Zone::Numeric(ref offset)) => Some(offset.as_str()),
        Some(Zone::Named(ref name)) => zone_offset(name),
    };

    Some(format_postmark_date(&instant, offset, zone_before_year))
}
