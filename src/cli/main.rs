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

use std::path::PathBuf;

use log::LevelFilter;
use structopt::StructOpt;

use crate::support::convert_config::{ConvertConfig, ConvertOptions};
use crate::support::sysexits::*;

/// Convert a directory of email message files into a single mbox archive.
///
/// Each message file in SOURCE becomes one record in OUTPUT, in file name
/// order. The postmark ("From_") line of each record is built from the first
/// `From:` header with an address and the first parseable `Date:` header.
/// Messages with no sender address are skipped; messages whose date cannot
/// be read are dated with the current time. Either case is reported at the
/// end of the run.
///
/// Message files are read as windows-1252 (Western European) text.
///
/// Default options and the list of recognised extensions can be given in a
/// TOML file passed with `--config`, for example:
///
/// extensions = ["eml"]
///
/// [options]
///
/// remove_trailing_cr = true
#[derive(StructOpt, Debug, Default)]
#[structopt(max_term_width = 80)]
pub(super) struct ConvertCommand {
    /// Treat every file in SOURCE as a message, whatever its extension.
    #[structopt(short = "i", long)]
    pub(super) ignore_extension: bool,

    /// Turn CR LF line endings into LF.
    #[structopt(short = "r", long)]
    pub(super) remove_trailing_cr: bool,

    /// Turn LF CR line endings into CR.
    #[structopt(short = "l", long)]
    pub(super) remove_leading_lf: bool,

    /// Allow the address of a `From:` header to be on the following line.
    #[structopt(short = "m", long)]
    pub(super) multiline_from_header: bool,

    /// Use the `From:` and `Date:` values verbatim in the postmark line.
    #[structopt(short = "u", long)]
    pub(super) use_raw_header_values: bool,

    /// Put the time zone offset before the year in the postmark line.
    #[structopt(short = "t", long)]
    pub(super) timezone_before_year: bool,

    /// SOURCE is a single message file instead of a directory.
    #[structopt(short = "s", long)]
    pub(super) single_file_mode: bool,

    /// Overwrite OUTPUT if it already exists.
    #[structopt(short = "f", long, conflicts_with = "append")]
    pub(super) force: bool,

    /// Append to OUTPUT if it already exists.
    #[structopt(short = "a", long)]
    pub(super) append: bool,

    /// Read default options from this TOML file.
    #[structopt(long, parse(from_os_str))]
    pub(super) config: Option<PathBuf>,

    /// Configure logging with this log4rs configuration file instead of
    /// logging to standard error.
    #[structopt(long, parse(from_os_str))]
    pub(super) log_config: Option<PathBuf>,

    /// Log every message as it is converted.
    #[structopt(short = "v", long)]
    pub(super) verbose: bool,

    /// The directory containing the messages, or with `-s`, the message.
    #[structopt(parse(from_os_str))]
    pub(super) source: PathBuf,

    /// The mbox file to write.
    #[structopt(parse(from_os_str))]
    pub(super) output: PathBuf,
}

impl ConvertCommand {
    pub(super) fn options(&self) -> ConvertOptions {
        ConvertOptions {
            ignore_extension: self.ignore_extension,
            remove_trailing_cr: self.remove_trailing_cr,
            remove_leading_lf: self.remove_leading_lf,
            multiline_from_header: self.multiline_from_header,
            use_raw_header_values: self.use_raw_header_values,
            timezone_before_year: self.timezone_before_year,
            single_file_mode: self.single_file_mode,
        }
    }
}

pub fn main() {
    // Clap exits with status 1 instead of EX_USAGE if we use the more concise
    // API
    let cmd = ConvertCommand::from_clap(
        &match ConvertCommand::clap().get_matches_safe() {
            Ok(matches) => matches,
            Err(
                e @ clap::Error {
                    kind: clap::ErrorKind::HelpDisplayed,
                    ..
                },
            )
            | Err(
                e @ clap::Error {
                    kind: clap::ErrorKind::VersionDisplayed,
                    ..
                },
            ) => {
                println!("{}", e.message);
                return;
            },
            Err(e) => {
                eprintln!("{}", e.message);
                EX_USAGE.exit()
            },
        },
    );

    if let Some(ref log_config_file) = cmd.log_config {
        if let Err(e) = log4rs::init_file(
            log_config_file,
            log4rs::file::Deserializers::new(),
        ) {
            eprintln!(
                "Error in logging configuration '{}': {}",
                log_config_file.display(),
                e
            );
            EX_CONFIG.exit();
        }
    } else {
        crate::init_simple_log(if cmd.verbose {
            LevelFilter::Debug
        } else {
            LevelFilter::Info
        });
    }

    let mut config = match cmd.config {
        None => ConvertConfig::default(),
        Some(ref path) => match ConvertConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("Error reading '{}': {}", path.display(), e);
                EX_CONFIG.exit()
            },
        },
    };
    config.options = config.options.union(cmd.options());

    super::convert::convert(config, cmd);
}

#[cfg(test)]
mod test {
    use super::*;

    fn parse(args: &[&str]) -> ConvertCommand {
        ConvertCommand::from_iter_safe(
            std::iter::once("eml2mbox").chain(args.iter().copied()),
        )
        .unwrap()
    }

    #[test]
    fn parse_short_flags() {
        let cmd = parse(&["-irlmuts", "in", "out.mbox"]);
        assert_eq!(
            ConvertOptions {
                ignore_extension: true,
                remove_trailing_cr: true,
                remove_leading_lf: true,
                multiline_from_header: true,
                use_raw_header_values: true,
                timezone_before_year: true,
                single_file_mode: true,
            },
            cmd.options()
        );
        assert_eq!(PathBuf::from("in"), cmd.source);
        assert_eq!(PathBuf::from("out.mbox"), cmd.output);
    }

    #[test]
    fn parse_defaults() {
        let cmd = parse(&["in", "out.mbox"]);
        assert_eq!(ConvertOptions::default(), cmd.options());
        assert!(!cmd.force);
        assert!(!cmd.append);
        assert_eq!(None, cmd.config);
    }

    #[test]
    fn force_and_append_conflict() {
        assert!(ConvertCommand::from_iter_safe(
            ["eml2mbox", "-f", "-a", "in", "out"].iter()
        )
        .is_err());
        assert!(ConvertCommand::from_iter_safe(["eml2mbox", "in"].iter())
            .is_err());
    }
}
