//! Loads the project configuration from a `folio.yaml` file.

use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};
use url::Url;

const PROJECT_FILE: &str = "folio.yaml";
const DEFAULT_SITE_URL: &str = "http://localhost/";

/// The project file as written on disk. Every field is optional.
#[derive(Deserialize, Default)]
#[serde(deny_unknown_fields)]
struct Project {
    #[serde(default)]
    title: String,

    #[serde(default)]
    url: Option<Url>,

    #[serde(default)]
    input: Option<PathBuf>,

    #[serde(default)]
    output: Option<PathBuf>,

    #[serde(default)]
    includes: Option<PathBuf>,

    #[serde(default)]
    passthrough: Vec<PathBuf>,
}

/// The resolved configuration for a build.
#[derive(Debug, Clone)]
pub struct Config {
    /// The site title, available to templates as `.site.title`.
    pub title: String,

    /// The site root URL. Always ends in a slash.
    pub site_url: Url,

    /// The directory containing page sources.
    pub input_directory: PathBuf,

    /// The directory the site is written to. It is deleted and recreated on
    /// every build.
    pub output_directory: PathBuf,

    /// The directory containing layout templates.
    pub includes_directory: PathBuf,

    /// Files and directories, relative to the input directory, copied
    /// verbatim into the output directory.
    pub passthrough: Vec<PathBuf>,
}

impl Config {
    /// Looks for `folio.yaml` in `dir` and then in each of its parents,
    /// loading the first one found. Without a project file, the defaults are
    /// used with `dir` as the project root. `output_directory` overrides the
    /// configured output directory when provided.
    pub fn from_directory(dir: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let mut current = Some(dir);
        while let Some(candidate) = current {
            let path = candidate.join(PROJECT_FILE);
            if path.is_file() {
                return Config::from_project_file(&path, output_directory).map_err(|e| {
                    Error::Annotated(format!("loading `{}`", path.display()), Box::new(e))
                });
            }
            current = candidate.parent();
        }
        Config::resolve(Project::default(), dir, output_directory)
    }

    /// Loads the configuration from a specific project file. Relative paths
    /// in the file are resolved against the file's directory.
    pub fn from_project_file(path: &Path, output_directory: Option<&Path>) -> Result<Config> {
        let file = std::fs::File::open(path).map_err(|err| Error::OpenProjectFile {
            path: path.to_owned(),
            err,
        })?;
        let project: Project = serde_yaml::from_reader(file)?;
        let project_root = path
            .parent()
            .ok_or_else(|| Error::NoParentDirectory(path.to_owned()))?;
        Config::resolve(project, project_root, output_directory)
    }

    fn resolve(
        project: Project,
        project_root: &Path,
        output_directory: Option<&Path>,
    ) -> Result<Config> {
        let input_directory =
            project_root.join(project.input.unwrap_or_else(|| PathBuf::from("src")));
        let includes_directory =
            input_directory.join(project.includes.unwrap_or_else(|| PathBuf::from("_includes")));
        Ok(Config {
            title: project.title,
            site_url: match project.url {
                Some(url) => with_trailing_slash(url),
                None => Url::parse(DEFAULT_SITE_URL)?,
            },
            output_directory: match output_directory {
                Some(output_directory) => output_directory.to_owned(),
                None => project_root.join(project.output.unwrap_or_else(|| PathBuf::from("_site"))),
            },
            input_directory,
            includes_directory,
            passthrough: project.passthrough,
        })
    }
}

/// `Url::join` treats the last path segment as a file name unless the path
/// ends in a slash, so the site root must always end in one.
fn with_trailing_slash(mut url: Url) -> Url {
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

type Result<T> = std::result::Result<T, Error>;

/// Represents a problem loading the project configuration.
#[derive(Debug)]
pub enum Error {
    /// Returned for I/O problems while opening the project file.
    OpenProjectFile { path: PathBuf, err: std::io::Error },

    /// Returned when the project file isn't valid YAML or has unknown fields.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when the project file path has no parent directory.
    NoParentDirectory(PathBuf),

    /// Returned when the default site URL can't be parsed.
    UrlParse(url::ParseError),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Implements [`fmt::Display`] for [`Error`].
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::OpenProjectFile { path, err } => {
                write!(f, "Opening project file '{}': {}", path.display(), err)
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::NoParentDirectory(path) => write!(
                f,
                "Can't get parent directory for project file path '{}'",
                path.display()
            ),
            Error::UrlParse(err) => err.fmt(f),
            Error::Annotated(annotation, err) => write!(f, "{}: {}", annotation, err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements [`std::error::Error`] for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::OpenProjectFile { path: _, err } => Some(err),
            Error::DeserializeYaml(err) => Some(err),
            Error::NoParentDirectory(_) => None,
            Error::UrlParse(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts [`serde_yaml::Error`]s into [`Error`]. This allows us to use
    /// the `?` operator.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts [`url::ParseError`]s into [`Error`]. This allows us to use the
    /// `?` operator.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_without_project_file() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_directory(dir.path(), None)?;
        assert_eq!("", config.title);
        assert_eq!(DEFAULT_SITE_URL, config.site_url.as_str());
        assert_eq!(dir.path().join("src"), config.input_directory);
        assert_eq!(dir.path().join("_site"), config.output_directory);
        assert_eq!(dir.path().join("src/_includes"), config.includes_directory);
        assert!(config.passthrough.is_empty());
        Ok(())
    }

    #[test]
    fn test_project_file_in_parent() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(
            dir.path().join(PROJECT_FILE),
            "title: Notes\n\
             url: https://example.org/blog\n\
             input: content\n\
             includes: layouts\n\
             passthrough: [favicon.png, assets/css]\n",
        )
        .unwrap();
        let nested = dir.path().join("content/posts");
        std::fs::create_dir_all(&nested).unwrap();

        let config = Config::from_directory(&nested, None)?;
        assert_eq!("Notes", config.title);
        assert_eq!("https://example.org/blog/", config.site_url.as_str());
        assert_eq!(dir.path().join("content"), config.input_directory);
        assert_eq!(dir.path().join("content/layouts"), config.includes_directory);
        assert_eq!(
            vec![PathBuf::from("favicon.png"), PathBuf::from("assets/css")],
            config.passthrough
        );
        Ok(())
    }

    #[test]
    fn test_output_override() -> Result<()> {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_directory(dir.path(), Some(Path::new("/tmp/elsewhere")))?;
        assert_eq!(PathBuf::from("/tmp/elsewhere"), config.output_directory);
        Ok(())
    }

    #[test]
    fn test_unknown_field_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(PROJECT_FILE), "titel: typo\n").unwrap();
        assert!(Config::from_directory(dir.path(), None).is_err());
    }
}
