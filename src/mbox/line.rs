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

//! Per-line transforms applied while transcoding a message.
//!
//! Every transform here is a pure function over a single line, line
//! terminator included, so the transcoder can compose them in whatever order
//! it needs.

use std::borrow::Cow;

use encoding_rs::WINDOWS_1252;

/// The token that begins a postmark line.
pub const POSTMARK_TOKEN: &str = "From";

/// Decode a raw line from the legacy Western single-byte encoding.
///
/// windows-1252 (which is also what ISO-8859-1 labels resolve to) assigns a
/// character to every byte value, so this cannot fail; the few unassigned
/// positions come out as C1 control characters.
pub fn decode_legacy(raw: &[u8]) -> Cow<str> {
    WINDOWS_1252.decode_without_bom_handling(raw).0
}

/// Prefix `line` with `>` if it would otherwise be taken as a postmark line.
pub fn escape_postmark(line: String) -> String {
    if line.starts_with(POSTMARK_TOKEN) {
        let mut escaped = String::with_capacity(line.len() + 1);
        escaped.push('>');
        escaped.push_str(&line);
        escaped
    } else {
        line
    }
}

/// Remove any line terminator characters from the end of `line`.
pub fn trim_terminator(line: &str) -> &str {
    line.trim_end_matches(|c| '\r' == c || '\n' == c)
}

/// Turn a final CR LF into a bare LF.
pub fn strip_trailing_cr(mut line: String) -> String {
    if line.ends_with("\r\n") {
        line.truncate(line.len() - 2);
        line.push('\n');
    }
    line
}

/// Turn a final LF CR into a bare CR.
pub fn strip_leading_lf(mut line: String) -> String {
    if line.ends_with("\n\r") {
        line.truncate(line.len() - 2);
        line.push('\r');
    }
    line
}

/// Whether `line` ends with any kind of line terminator.
pub fn is_terminated(line: &str) -> bool {
    line.ends_with('\n') || line.ends_with('\r')
}

/// Split raw message data into lines, each keeping its terminator.
///
/// Lines end after each LF. A CR directly after the LF stays with the line
/// (the LF CR convention) unless it is itself the start of a CR LF pair.
pub fn split_lines(data: &[u8]) -> SplitLines<'_> {
    SplitLines { data }
}

#[derive(Clone, Debug)]
pub struct SplitLines<'a> {
    data: &'a [u8],
}

impl<'a> Iterator for SplitLines<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<&'a [u8]> {
        if self.data.is_empty() {
            return None;
        }

        let end = match memchr::memchr(b'\n', self.data) {
            None => self.data.len(),
            Some(ix) => {
                let mut end = ix + 1;
                if Some(&b'\r') == self.data.get(end)
                    && Some(&b'\n') != self.data.get(end + 1)
                {
                    end += 1;
                }
                end
            }
        };

        let (line, rest) = self.data.split_at(end);
        self.data = rest;
        Some(line)
    }
}
