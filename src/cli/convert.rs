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
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

use log::{debug, error, info, warn};

use super::main::ConvertCommand;
use crate::mbox;
use crate::support::{
    convert_config::{ConvertConfig, ConvertOptions},
    error::Error,
    sysexits::*,
};

pub(super) fn convert(config: ConvertConfig, cmd: ConvertCommand) {
    if let Err(exit) = run(config, cmd) {
        exit.exit();
    }
}

fn run(config: ConvertConfig, cmd: ConvertCommand) -> Result<(), Sysexit> {
    let sources = match list_sources(&config, &cmd.source, &cmd.output) {
        Ok(sources) => sources,
        Err(e) if io::ErrorKind::InvalidInput == e.kind() => {
            error!("Refusing to convert {}: {}", cmd.source.display(), e);
            return Err(EX_USAGE);
        },
        Err(e) => {
            error!("Unable to list {}: {}", cmd.source.display(), e);
            return Err(EX_NOINPUT);
        },
    };

    if sources.is_empty() {
        warn!("No messages found in {}", cmd.source.display());
    }

    let disposition = if !cmd.output.exists() {
        OutputDisposition::Create
    } else if cmd.append {
        OutputDisposition::Append
    } else if cmd.force {
        OutputDisposition::Overwrite
    } else if Ok(true) == nix::unistd::isatty(0) {
        let stdin = io::stdin();
        let stdout = io::stdout();
        match prompt_disposition(&cmd.output, stdin.lock(), stdout.lock()) {
            Ok(Some(disposition)) => disposition,
            Ok(None) => {
                info!("Cancelled; {} left untouched", cmd.output.display());
                return Err(EX_CANTCREAT);
            },
            Err(e) => {
                error!("Failed to read answer: {}", e);
                return Err(EX_IOERR);
            },
        }
    } else {
        error!(
            "{} already exists; pass --force to overwrite it or \
             --append to add to it",
            cmd.output.display()
        );
        return Err(EX_CANTCREAT);
    };

    let output = match open_output(&cmd.output, disposition) {
        Ok(output) => output,
        Err(e) => {
            error!("Unable to open {}: {}", cmd.output.display(), e);
            return Err(EX_CANTCREAT);
        },
    };

    let mut sink = io::BufWriter::new(output);
    let report =
        run_conversion(&config.options, sources.into_iter(), &mut sink)
            .and_then(|report| sink.flush().map(|_| report))
            .map_err(|e| {
                error!("Failed to write {}: {}", cmd.output.display(), e);
                EX_IOERR
            })?;

    info!(
        "{} of {} messages written to {}",
        report.written,
        report.seen,
        cmd.output.display()
    );
    if report.errors() > 0 {
        warn!(
            "{} messages had errors ({} skipped, {} with made-up dates)",
            report.errors(),
            report.dropped,
            report.flagged
        );
    }

    Ok(())
}

/// How an output file is to be opened.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OutputDisposition {
    /// The file must not exist yet.
    Create,
    Overwrite,
    Append,
}

fn open_output(
    path: &Path,
    disposition: OutputDisposition,
) -> io::Result<fs::File> {
    let mut options = fs::OpenOptions::new();
    match disposition {
        OutputDisposition::Create => options.write(true).create_new(true),
        OutputDisposition::Overwrite => {
            options.write(true).create(true).truncate(true)
        },
        OutputDisposition::Append => options.append(true).create(true),
    };
    options.open(path)
}

/// Ask the operator what to do with an existing output file.
///
/// Returns `None` if the operator cancels or input ends.
fn prompt_disposition(
    path: &Path,
    mut input: impl BufRead,
    mut output: impl Write,
) -> io::Result<Option<OutputDisposition>> {
    loop {
        write!(
            output,
            "{} already exists. [o]verwrite, [a]ppend or [c]ancel? ",
            path.display()
        )?;
        output.flush()?;

        let mut answer = String::new();
        if 0 == input.read_line(&mut answer)? {
            return Ok(None);
        }

        match answer.trim().to_lowercase().as_str() {
            "o" | "overwrite" => return Ok(Some(OutputDisposition::Overwrite)),
            "a" | "append" => return Ok(Some(OutputDisposition::Append)),
            "c" | "cancel" => return Ok(None),
            _ => (),
        }
    }
}

/// Find the message files to convert, in the order they are to be written.
///
/// `output` is never included, even if it would otherwise qualify.
fn list_sources(
    config: &ConvertConfig,
    source: &Path,
    output: &Path,
) -> io::Result<Vec<PathBuf>> {
    if config.options.single_file_mode {
        if !source.is_file() {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                "not a regular file",
            ));
        }
        if output.exists() && source.canonicalize()? == output.canonicalize()? {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "source and output are the same file",
            ));
        }
        return Ok(vec![source.to_owned()]);
    }

    let output = output.canonicalize().ok();
    let mut sources = Vec::new();
    for entry in fs::read_dir(source)? {
        let path = entry?.path();
        if !path.is_file() || !config.is_message_file(&path) {
            continue;
        }

        if output.is_some() && path.canonicalize().ok() == output {
            debug!("Skipping output file {}", path.display());
            continue;
        }

        sources.push(path);
    }

    sources.sort();
    Ok(sources)
}

/// Tally of a conversion run.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
struct ConversionReport {
    /// Message files encountered.
    seen: usize,
    /// Records written to the archive.
    written: usize,
    /// Messages which could not be read or had no sender.
    dropped: usize,
    /// Messages written, but with some problem such as a made-up date.
    flagged: usize,
}

impl ConversionReport {
    fn errors(&self) -> usize {
        self.dropped + self.flagged
    }
}

/// Convert each message in `items` and write it to `sink`.
///
/// Problems with individual messages are logged and counted but do not stop
/// the run; only a failure to write to `sink` does.
fn run_conversion(
    options: &ConvertOptions,
    items: impl Iterator<Item = PathBuf>,
    sink: &mut impl Write,
) -> io::Result<ConversionReport> {
    let mut report = ConversionReport::default();

    for item in items {
        report.seen += 1;

        let data = match fs::read(&item) {
            Ok(data) => data,
            Err(e) => {
                error!("Unable to read {}: {}", item.display(), e);
                report.dropped += 1;
                continue;
            },
        };

        match mbox::transcode(options, &data) {
            Ok(message) => {
                for line in &message.lines {
                    sink.write_all(line.as_bytes())?;
                }

                report.written += 1;
                if message.had_error {
                    warn!("{}: converted with errors", item.display());
                    report.flagged += 1;
                } else {
                    debug!("{}: converted", item.display());
                }
            },
            Err(Error::MessageUnusable) => {
                error!("{}: no sender address found, skipped", item.display());
                report.dropped += 1;
            },
            Err(e) => {
                error!("{}: {}, skipped", item.display(), e);
                report.dropped += 1;
            },
        }
    }

    Ok(report)
}

#[cfg(test)]
mod test {
    use std::io::Read;

    use super::*;

    const GOOD: &[u8] = b"From: A <a@example.com>\n\
                          Date: Mon, 02 Jan 2006 15:04:05 +0200\n\
                          \n\
                          From the body\n";
    const UNDATED: &[u8] = b"From: b@example.com\n\nHello\n";
    const NO_SENDER: &[u8] = b"Subject: who knows\n\nHello\n";

    fn write_file(dir: &Path, name: &str, data: &[u8]) -> PathBuf {
        let path = dir.join(name);
        fs::write(&path, data).unwrap();
        path
    }

    fn names(paths: &[PathBuf]) -> Vec<String> {
        paths
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_owned())
            .collect()
    }

    #[test]
    fn list_directory_sources() {
        let tmpdir = tempfile::TempDir::new().unwrap();
        let dir = tmpdir.path();
        write_file(dir, "b.eml", GOOD);
        write_file(dir, "a.eml", GOOD);
        write_file(dir, "c.EML", GOOD);
        write_file(dir, "notes.txt", GOOD);
        fs::create_dir(dir.join("sub.eml")).unwrap();

        let config = ConvertConfig::default();
        let sources =
            list_sources(&config, dir, &dir.join("out.mbox")).unwrap();
        assert_eq!(vec!["a.eml", "b.eml", "c.EML"], names(&sources));

        let config = ConvertConfig {
            options: ConvertOptions {
                ignore_extension: true,
                ..ConvertOptions::default()
            },
            ..ConvertConfig::default()
        };
        let sources =
            list_sources(&config, dir, &dir.join("out.mbox")).unwrap();
        assert_eq!(
            vec!["a.eml", "b.eml", "c.EML", "notes.txt"],
            names(&sources)
        );
    }

    #[test]
    fn output_is_never_a_source() {
        let tmpdir = tempfile::TempDir::new().unwrap();
        let dir = tmpdir.path();
        write_file(dir, "a.eml", GOOD);
        let output = write_file(dir, "archive.eml", b"");

        let sources =
            list_sources(&ConvertConfig::default(), dir, &output).unwrap();
        assert_eq!(vec!["a.eml"], names(&sources));
    }

    #[test]
    fn list_single_file_source() {
        let tmpdir = tempfile::TempDir::new().unwrap();
        let dir = tmpdir.path();
        let message = write_file(dir, "message.txt", GOOD);

        let config = ConvertConfig {
            options: ConvertOptions {
                single_file_mode: true,
                ..ConvertOptions::default()
            },
            ..ConvertConfig::default()
        };
        assert_eq!(
            vec![message.clone()],
            list_sources(&config, &message, &dir.join("out")).unwrap()
        );
        assert!(list_sources(&config, dir, &dir.join("out")).is_err());
    }

    #[test]
    fn single_file_source_cannot_be_output() {
        let tmpdir = tempfile::TempDir::new().unwrap();
        let dir = tmpdir.path();
        let message = write_file(dir, "message.eml", GOOD);

        let config = ConvertConfig {
            options: ConvertOptions {
                single_file_mode: true,
                ..ConvertOptions::default()
            },
            ..ConvertConfig::default()
        };
        let err = list_sources(&config, &message, &message).unwrap_err();
        assert_eq!(io::ErrorKind::InvalidInput, err.kind());
        let alias = dir.join(".").join("message.eml");
        let err = list_sources(&config, &message, &alias).unwrap_err();
        assert_eq!(io::ErrorKind::InvalidInput, err.kind());

        assert_eq!(GOOD, &fs::read(&message).unwrap()[..]);
    }

    #[test]
    fn list_missing_directory() {
        let tmpdir = tempfile::TempDir::new().unwrap();
        assert!(list_sources(
            &ConvertConfig::default(),
            &tmpdir.path().join("nx"),
            &tmpdir.path().join("out"),
        )
        .is_err());
    }

    #[test]
    fn convert_mixed_messages() {
        crate::init_test_log();

        let tmpdir = tempfile::TempDir::new().unwrap();
        let dir = tmpdir.path();
        let items = vec![
            write_file(dir, "1.eml", GOOD),
            write_file(dir, "2.eml", NO_SENDER),
            dir.join("3.eml"),
            write_file(dir, "4.eml", UNDATED),
            write_file(dir, "5.eml", GOOD),
        ];

        let mut sink = Vec::<u8>::new();
        let report = run_conversion(
            &ConvertOptions::default(),
            items.into_iter(),
            &mut sink,
        )
        .unwrap();

        assert_eq!(
            ConversionReport {
                seen: 5,
                written: 3,
                dropped: 2,
                flagged: 1,
            },
            report
        );
        assert_eq!(3, report.errors());

        let archive = String::from_utf8(sink).unwrap();
        let good_record = "From a@example.com Mon Jan 02 15:04:05 2006 +0200\n\
                           From: A <a@example.com>\n\
                           Date: Mon, 02 Jan 2006 15:04:05 +0200\n\
                           \n\
                           >From the body\n\
                           \n";
        assert!(archive.starts_with(good_record));
        assert!(archive.ends_with(good_record));

        let middle =
            &archive[good_record.len()..archive.len() - good_record.len()];
        assert!(middle.starts_with("From b@example.com "));
        assert!(middle.ends_with("\nFrom: b@example.com\n\nHello\n\n"));
        assert!(!archive.contains("who knows"));
    }

    #[test]
    fn prompt_answers() {
        let path = Path::new("out.mbox");
        let mut shown = Vec::<u8>::new();

        assert_eq!(
            Some(OutputDisposition::Overwrite),
            prompt_disposition(path, &b"o\n"[..], &mut shown).unwrap()
        );
        assert_eq!(
            Some(OutputDisposition::Append),
            prompt_disposition(path, &b"APPEND\n"[..], &mut shown).unwrap()
        );
        assert_eq!(
            None,
            prompt_disposition(path, &b"c\n"[..], &mut shown).unwrap()
        );
        assert_eq!(
            None,
            prompt_disposition(path, &b""[..], &mut shown).unwrap()
        );

        shown.clear();
        assert_eq!(
            Some(OutputDisposition::Append),
            prompt_disposition(path, &b"what\n\na\n"[..], &mut shown)
                .unwrap()
        );
        let shown = String::from_utf8(shown).unwrap();
        assert_eq!(
            3,
            shown.matches("[o]verwrite, [a]ppend or [c]ancel?").count()
        );
    }

    #[test]
    fn output_dispositions() {
        let tmpdir = tempfile::TempDir::new().unwrap();
        let path = write_file(tmpdir.path(), "out.mbox", b"existing\n");

        assert!(open_output(&path, OutputDisposition::Create).is_err());

        open_output(&path, OutputDisposition::Append)
            .unwrap()
            .write_all(b"more\n")
            .unwrap();
        let mut content = String::new();
        fs::File::open(&path)
            .unwrap()
            .read_to_string(&mut content)
            .unwrap();
        assert_eq!("existing\nmore\n", content);

        open_output(&path, OutputDisposition::Overwrite)
            .unwrap()
            .write_all(b"new\n")
            .unwrap();
        assert_eq!("new\n", fs::read_to_string(&path).unwrap());

        let fresh = tmpdir.path().join("fresh.mbox");
        open_output(&fresh, OutputDisposition::Create)
            .unwrap()
            .write_all(b"x")
            .unwrap();
        assert_eq!("x", fs::read_to_string(&fresh).unwrap());
    }
}
