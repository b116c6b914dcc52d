//! Exports the [`build_site`] function which stitches together the high-level
//! steps of building the output static site: parsing the pages
//! ([`crate::parser`]), rendering them through their layouts
//! ([`crate::write`]), and copying passthrough files into the output
//! directory.

use crate::config::Config;
use crate::filters::Filters;
use crate::parser::{Error as ParseError, Parser as PageParser};
use crate::transform;
use crate::write::{Error as WriteError, Writer};
use std::fmt;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Builds the site from a [`Config`] object, making the given [`Filters`]
/// available to every template. This calls into [`PageParser::parse_pages`]
/// and [`Writer::write_pages`] which do the heavy-lifting, then copies the
/// passthrough files.
pub fn build_site(config: &Config, filters: &Filters) -> Result<()> {
    let parser = PageParser::new(
        &config.site_url,
        &config.output_directory,
        &config.passthrough,
    );

    // collect all pages
    let pages = parser.parse_pages(&config.input_directory)?;
    info!(pages = pages.len(), input = %config.input_directory.display(), "parsed pages");

    // Blow away the old output directory so we don't have any stale files.
    rmdir(&config.output_directory)?;

    let transforms = transform::standard();
    let writer = Writer {
        filters,
        transforms: &transforms,
        includes_directory: &config.includes_directory,
        site_title: &config.title,
        site_url: &config.site_url,
    };
    writer.write_pages(&pages)?;

    for relative in config.passthrough.iter() {
        copy_passthrough(
            &config.input_directory,
            &config.output_directory,
            relative,
        )?;
    }

    info!(output = %config.output_directory.display(), "built site");
    Ok(())
}

/// Copies `{input}/{relative}` to `{output}/{relative}`. Directories are
/// copied recursively.
fn copy_passthrough(input: &Path, output: &Path, relative: &Path) -> Result<()> {
    let src = input.join(relative);
    if !src.exists() {
        return Err(Error::MissingPassthrough(src));
    }

    for result in WalkDir::new(&src) {
        let entry = result?;
        // strip_prefix shouldn't fail since `src` is always an ancestor of
        // the entry path
        let dst = match entry.path().strip_prefix(&src).unwrap() {
            rest if rest.as_os_str().is_empty() => output.join(relative),
            rest => output.join(relative).join(rest),
        };
        if entry.file_type().is_dir() {
            std::fs::create_dir_all(&dst)?;
        } else {
            if let Some(parent) = dst.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::copy(entry.path(), &dst)?;
            debug!(from = %entry.path().display(), to = %dst.display(), "copied");
        }
    }
    Ok(())
}

fn rmdir(dir: &Path) -> Result<()> {
    match std::fs::remove_dir_all(dir) {
        Ok(x) => Ok(x),
        Err(e) => match e.kind() {
            std::io::ErrorKind::NotFound => Ok(()),
            _ => Err(Error::Clean {
                path: dir.to_owned(),
                err: e,
            }),
        },
    }
}

type Result<T> = std::result::Result<T, Error>;

/// The error type for building a site. Errors can be during parsing, writing,
/// cleaning the output directory, copying passthrough files, and other I/O.
#[derive(Debug)]
pub enum Error {
    /// Returned for errors during parsing.
    Parse(ParseError),

    /// Returned for errors rendering or writing pages.
    Write(WriteError),

    /// Returned for I/O problems while cleaning the output directory.
    Clean { path: PathBuf, err: std::io::Error },

    /// Returned when a configured passthrough path doesn't exist.
    MissingPassthrough(PathBuf),

    /// Returned for errors walking passthrough directories.
    WalkDir(walkdir::Error),

    /// Returned for other I/O errors.
    Io(std::io::Error),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Parse(err) => err.fmt(f),
            Error::Write(err) => err.fmt(f),
            Error::Clean { path, err } => {
                write!(f, "Cleaning directory '{}': {}", path.display(), err)
            }
            Error::MissingPassthrough(path) => {
                write!(f, "Passthrough path '{}' does not exist", path.display())
            }
            Error::WalkDir(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(err) => Some(err),
            Error::Write(err) => Some(err),
            Error::Clean { path: _, err } => Some(err),
            Error::MissingPassthrough(_) => None,
            Error::WalkDir(err) => Some(err),
            Error::Io(err) => Some(err),
        }
    }
}

impl From<std::io::Error> for Error {
    /// Converts [`std::io::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts [`walkdir::Error`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<ParseError> for Error {
    /// Converts [`ParseError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: ParseError) -> Error {
        Error::Parse(err)
    }
}

impl From<WriteError> for Error {
    /// Converts [`WriteError`]s into [`Error`]. This allows us to use the `?`
    /// operator.
    fn from(err: WriteError) -> Error {
        Error::Write(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_copy_passthrough_file_and_directory() -> Result<()> {
        let input = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        std::fs::create_dir_all(input.path().join("assets/css/vendor"))?;
        std::fs::write(input.path().join("favicon.png"), b"png")?;
        std::fs::write(input.path().join("assets/css/site.css"), "body {}")?;
        std::fs::write(input.path().join("assets/css/vendor/x.css"), "x {}")?;

        copy_passthrough(input.path(), output.path(), Path::new("favicon.png"))?;
        copy_passthrough(input.path(), output.path(), Path::new("assets/css"))?;

        assert_eq!(b"png".to_vec(), std::fs::read(output.path().join("favicon.png"))?);
        assert_eq!(
            "body {}",
            std::fs::read_to_string(output.path().join("assets/css/site.css"))?
        );
        assert!(output.path().join("assets/css/vendor/x.css").is_file());
        Ok(())
    }

    #[test]
    fn test_copy_passthrough_missing() -> Result<()> {
        let input = tempfile::tempdir()?;
        let output = tempfile::tempdir()?;
        assert!(matches!(
            copy_passthrough(input.path(), output.path(), Path::new("nope")),
            Err(Error::MissingPassthrough(_))
        ));
        Ok(())
    }

    #[test]
    fn test_rmdir_missing_is_ok() -> Result<()> {
        let dir = tempfile::tempdir()?;
        rmdir(&dir.path().join("never-created"))
    }
}
