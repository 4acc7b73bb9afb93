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

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use super::error::Error;

/// The switches which control how messages are converted.
///
/// These are fixed for the whole run and shared by every message.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Treat every file in the source directory as a message, not just those
    /// with a recognised extension.
    pub ignore_extension: bool,
    /// Turn CR LF line endings into LF.
    pub remove_trailing_cr: bool,
    /// Turn LF CR line endings into CR.
    pub remove_leading_lf: bool,
    /// Allow the address of a `From:` header to be on the following line.
    pub multiline_from_header: bool,
    /// Use the `From:` and `Date:` header values as-is in the postmark line.
    pub use_raw_header_values: bool,
    /// Put the time zone offset before the year in the postmark line.
    pub timezone_before_year: bool,
    /// The source is a single message file rather than a directory.
    pub single_file_mode: bool,
}

impl ConvertOptions {
    /// Combine two option sets; an option is on if either has it on.
    pub fn union(self, other: Self) -> Self {
        ConvertOptions {
            ignore_extension: self.ignore_extension || other.ignore_extension,
            remove_trailing_cr: self.remove_trailing_cr
                || other.remove_trailing_cr,
            remove_leading_lf: self.remove_leading_lf
                || other.remove_leading_lf,
            multiline_from_header: self.multiline_from_header
                || other.multiline_from_header,
            use_raw_header_values: self.use_raw_header_values
                || other.use_raw_header_values,
            timezone_before_year: self.timezone_before_year
                || other.timezone_before_year,
            single_file_mode: self.single_file_mode || other.single_file_mode,
        }
    }
}

/// The conversion configuration.
///
/// This can be loaded from a TOML file passed with `--config`; options given
/// on the command line are added on top.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConvertConfig {
    /// File extensions (without the dot, case-insensitive) of the files in
    /// the source directory which are taken to be messages.
    pub extensions: Vec<String>,

    /// Default conversion options.
    pub options: ConvertOptions,
}

impl Default for ConvertConfig {
    fn default() -> Self {
        ConvertConfig {
            extensions: vec!["eml".to_owned()],
            options: ConvertOptions::default(),
        }
    }
}

impl ConvertConfig {
    pub fn load(path: &Path) -> Result<Self, Error> {
        let data = fs::read(path)?;
        Ok(toml::from_slice(&data)?)
    }

    /// Whether a file found in the source directory should be converted.
    pub fn is_message_file(&self, path: &Path) -> bool {
        if self.options.ignore_extension {
            return true;
        }

        path.extension()
            .and_then(|ext| ext.to_str())
            .map_or(false, |ext| {
                self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext))
            })
    }
}

#[cfg(test)]
mod test {
    use std::io::Write;

    use super::*;

    #[test]
    fn parse_full_config() {
        let config: ConvertConfig = toml::from_str(
            r#"
extensions = ["eml", "msg"]

[options]
remove_trailing_cr = true
timezone_before_year = true
"#,
        )
        .unwrap();

        assert_eq!(vec!["eml", "msg"], config.extensions);
        assert_eq!(
            ConvertOptions {
                remove_trailing_cr: true,
                timezone_before_year: true,
                ..ConvertOptions::default()
            },
            config.options
        );
    }

    #[test]
    fn parse_empty_config() {
        let config: ConvertConfig = toml::from_str("").unwrap();
        assert_eq!(ConvertConfig::default(), config);
    }

    #[test]
    fn load_config_file() {
        let tmpdir = tempfile::TempDir::new().unwrap();
        let path = tmpdir.path().join("eml2mbox.toml");
        std::fs::File::create(&path)
            .unwrap()
            .write_all(b"[options]\nsingle_file_mode = true\n")
            .unwrap();

        let config = ConvertConfig::load(&path).unwrap();
        assert!(config.options.single_file_mode);
        assert_eq!(vec!["eml"], config.extensions);

        assert_matches!(
            Err(Error::Io(..)),
            ConvertConfig::load(&tmpdir.path().join("nx.toml"))
        );

        std::fs::write(&path, b"extensions = 42\n").unwrap();
        assert_matches!(Err(Error::BadConfig(..)), ConvertConfig::load(&path));
    }

    #[test]
    fn options_union() {
        let a = ConvertOptions {
            remove_trailing_cr: true,
            ..ConvertOptions::default()
        };
        let b = ConvertOptions {
            single_file_mode: true,
            ..ConvertOptions::default()
        };
        let both = a.union(b);
        assert!(both.remove_trailing_cr);
        assert!(both.single_file_mode);
        assert!(!both.ignore_extension);
        assert_eq!(a, a.union(ConvertOptions::default()));
    }

    #[test]
    fn message_file_recognition() {
        let config = ConvertConfig::default();
        assert!(config.is_message_file(Path::new("foo/a.eml")));
        assert!(config.is_message_file(Path::new("foo/a.EML")));
        assert!(!config.is_message_file(Path::new("foo/a.txt")));
        assert!(!config.is_message_file(Path::new("foo/eml")));

        let config = ConvertConfig {
            options: ConvertOptions {
                ignore_extension: true,
                ..ConvertOptions::default()
            },
            ..ConvertConfig::default()
        };
        assert!(config.is_message_file(Path::new("foo/a.txt")));
        assert!(config.is_message_file(Path::new("foo/eml")));
    }
}
