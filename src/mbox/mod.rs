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

//! Conversion of individual messages into mbox records.

pub mod date;
pub mod line;
pub mod postmark;
pub mod transcoder;

pub use transcoder::{MessageTranscoder, ProcessedMessage};

use crate::support::convert_config::ConvertOptions;
use crate::support::error::Error;

/// Transcode the raw contents of one message file.
pub fn transcode(
    options: &ConvertOptions,
    data: &[u8],
) -> Result<ProcessedMessage, Error> {
    let mut transcoder = MessageTranscoder::new(options);
    for line in line::split_lines(data) {
        transcoder.add_line(line);
    }
    transcoder.processed_lines()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn transcode_crlf_message() {
        let options = ConvertOptions {
            remove_trailing_cr: true,
            ..ConvertOptions::default()
        };
        let message = transcode(
            &options,
            b"Date: Mon, 02 Jan 2006 15:04:05 +0200\r\n\
              From: A <a@b.com>\r\n\
              \r\n\
              From the body\r\n",
        )
        .unwrap();

        assert!(!message.had_error);
        assert_eq!(
            "From a@b.com Mon Jan 02 15:04:05 2006 +0200\n\
             Date: Mon, 02 Jan 2006 15:04:05 +0200\n\
             From: A <a@b.com>\n\
             \n\
             >From the body\n\
             \n",
            message.lines.concat()
        );
    }

    #[test]
    fn transcode_without_sender() {
        assert_matches!(
            Err(Error::MessageUnusable),
            transcode(&ConvertOptions::default(), b"Subject: hi\n\nBody\n")
        );
    }
}
