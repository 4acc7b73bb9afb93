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

//! Transcoding of a single message into an mbox record.

use std::cell::OnceCell;

use chrono::prelude::*;
use lazy_static::lazy_static;
use log::{debug, warn};
use regex::Regex;

use super::line::*;
use super::postmark::{
    format_date_header, format_postmark_date, reduce_from_header,
};
use crate::support::convert_config::ConvertOptions;
use crate::support::error::Error;

lazy_static! {
    static ref FROM_HEADER: Regex = Regex::new(r"(?is)^from:(.*)$").unwrap();
    static ref DATE_HEADER: Regex = Regex::new(r"(?is)^date:(.*)$").unwrap();
}

/// A message that has been fully transcoded.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessedMessage {
    /// The lines of the record, each with its terminator. The first is the
    /// postmark line and the last is the empty separator line.
    pub lines: Vec<String>,
    /// Whether anything went wrong that the operator should hear about,
    /// such as the date having to be made up.
    pub had_error: bool,
}

/// Accumulates the lines of one message and turns them into an mbox record.
///
/// Lines are fed in with `add_line()` in order; `processed_lines()` then
/// produces the record. A transcoder is only good for one message.
///
/// Only the first usable `From:` and `Date:` headers are considered. Once the
/// sender is known, any further line beginning with `From` is escaped. Lines
/// before that point are left alone, even if they look like postmark lines.
#[derive(Debug)]
pub struct MessageTranscoder<'a> {
    options: &'a ConvertOptions,
    body_lines: Vec<String>,
    sender: OnceCell<String>,
    postmark_date: OnceCell<String>,
    pending_from: Option<String>,
    had_error: bool,
}

impl<'a> MessageTranscoder<'a> {
    pub fn new(options: &'a ConvertOptions) -> Self {
        MessageTranscoder {
            options,
            body_lines: Vec::new(),
            sender: OnceCell::new(),
            postmark_date: OnceCell::new(),
            pending_from: None,
            had_error: false,
        }
    }

    /// Feed the next raw line (terminator included) of the message.
    pub fn add_line(&mut self, raw: &[u8]) {
        let mut line = decode_legacy(raw).into_owned();

        if self.sender.get().is_some() {
            line = escape_postmark(line);
        }

        if let Some(fragment) = self.pending_from.take() {
            line = format!("{} {}", fragment, line);
        }

        if self.sender.get().is_none() {
            if let Some(value) = header_value(&FROM_HEADER, &line) {
                if value.contains('@') {
                    self.capture_sender(value);
                } else if self.options.multiline_from_header {
                    // The address is expected on the next line
                    self.pending_from = Some(trim_terminator(&line).to_owned());
                    return;
                }
            }
        }

        if self.postmark_date.get().is_none() {
            if let Some(value) = header_value(&DATE_HEADER, &line) {
                self.capture_date(value);
            }
        }

        if self.options.remove_trailing_cr {
            line = strip_trailing_cr(line);
        }
        if self.options.remove_leading_lf {
            line = strip_leading_lf(line);
        }

        self.body_lines.push(line);
    }

    /// Produce the finished record, using the current local time if the
    /// message has no usable date.
    pub fn processed_lines(self) -> Result<ProcessedMessage, Error> {
        self.processed_lines_at(Local::now().naive_local())
    }

    /// Produce the finished record, using `now` if the message has no usable
    /// date.
    ///
    /// Fails with `Error::MessageUnusable` if no sender was ever found.
    pub fn processed_lines_at(
        self,
        now: NaiveDateTime,
    ) -> Result<ProcessedMessage, Error> {
        let MessageTranscoder {
            options,
            mut body_lines,
            sender,
            postmark_date,
            mut had_error,
            ..
        } = self;

        let sender = sender.into_inner().ok_or(Error::MessageUnusable)?;
        let postmark_date = match postmark_date.into_inner() {
            Some(date) => date,
            None => {
                warn!("{}: no usable date; using the current time", sender);
                had_error = true;
                format_postmark_date(&now, None, options.timezone_before_year)
            },
        };

        // The separator must stay on a line of its own
        if let Some(last) = body_lines.last_mut() {
            if !is_terminated(last) {
                last.push('\n');
            }
        }

        let mut lines = Vec::with_capacity(body_lines.len() + 2);
        lines.push(format!("{} {}\n", sender, postmark_date));
        lines.append(&mut body_lines);
        lines.push("\n".to_owned());

        Ok(ProcessedMessage { lines, had_error })
    }

    fn capture_sender(&mut self, value: &str) {
        let sender = format!("From {}", trim_terminator(value).trim());
        let sender = if self.options.use_raw_header_values {
            sender
        } else {
            reduce_from_header(&sender).into_owned()
        };

        debug!("Sender: {}", sender);
        let _ = self.sender.set(sender);
    }

    fn capture_date(&mut self, value: &str) {
        let value = trim_terminator(value).trim();
        if self.options.use_raw_header_values {
            let _ = self.postmark_date.set(value.to_owned());
            return;
        }

        match format_date_header(value, self.options.timezone_before_year) {
            Some(date) => {
                let _ = self.postmark_date.set(date);
            },
            None => {
                warn!("Unparseable date {:?}", value);
                self.had_error = true;
            },
        }
    }
}

fn header_value<'l>(header: &Regex, line: &'l str) -> Option<&'l str> {
    header
        .captures(line)
        .and_then(|captures| captures.get(1))
        .map(|value| value.as_str())
}
