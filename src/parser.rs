//! Defines the [`Parser`] and [`Error`] types: the logic for reading page
//! source files from the input directory into [`Page`] objects.

use std::{
    fmt,
    path::{Component, Path, PathBuf},
};

use serde::Deserialize;
use tracing::debug;
use url::Url;
use walkdir::{DirEntry, WalkDir};

use crate::{
    filters::parse_date,
    page::{Format, Page},
    tag::{Tag, Tags},
};

/// Parses [`Page`] objects from source files.
pub struct Parser<'a> {
    /// `site_url` is the base URL for the site. Page URLs are derived from
    /// it (e.g., the URL for `{input}/foo/bar.md` is `{site_url}foo/bar/`).
    site_url: &'a Url,

    /// `output_directory` is the directory in which pages will be rendered.
    output_directory: &'a Path,

    /// Paths (relative to the input directory) that are copied verbatim and
    /// must not be treated as pages.
    ignored: &'a [PathBuf],
}

impl<'a> Parser<'a> {
    /// Constructs a new parser. See fields on [`Parser`] for argument
    /// descriptions.
    pub fn new(
        site_url: &'a Url,
        output_directory: &'a Path,
        ignored: &'a [PathBuf],
    ) -> Parser<'a> {
        Parser {
            site_url,
            output_directory,
            ignored,
        }
    }

    /// Parses a single [`Page`] from its source file, annotating any error
    /// with the file's relative path.
    fn parse_page(
        &self,
        input_directory: &Path,
        relative_path: &Path,
        format: Format,
    ) -> Result<Page> {
        match self._parse_page(input_directory, relative_path, format) {
            Ok(p) => Ok(p),
            Err(e) => Err(Error::Annotated(
                format!("parsing page `{}`", relative_path.display()),
                Box::new(e),
            )),
        }
    }

    fn _parse_page(
        &self,
        input_directory: &Path,
        relative_path: &Path,
        format: Format,
    ) -> Result<Page> {
        use std::io::Read;
        let mut contents = String::new();
        std::fs::File::open(input_directory.join(relative_path))?
            .read_to_string(&mut contents)?;
        let input: &str = &contents;

        let (yaml_start, yaml_stop, body_start) = frontmatter_indices(input)?;
        let yaml = &input[yaml_start..yaml_stop];
        let frontmatter: Frontmatter = match yaml.trim().is_empty() {
            true => Frontmatter::default(),
            false => serde_yaml::from_str(yaml)?,
        };

        if let Some(date) = &frontmatter.date {
            if parse_date(date).is_none() {
                return Err(Error::InvalidDate(date.clone()));
            }
        }

        let (output_path, url_path) = output_location(relative_path)?;
        Ok(Page {
            title: frontmatter.title,
            date: frontmatter.date,
            description: frontmatter.description,
            tags: frontmatter
                .tags
                .normalize()
                .iter()
                .map(|name| Tag::new(name, self.site_url))
                .collect::<std::result::Result<Vec<Tag>, _>>()?,
            layout: frontmatter.layout,
            source_path: relative_path.to_owned(),
            file_path: self.output_directory.join(output_path),
            url: self.site_url.join(&url_path)?,
            format,
            body: input[body_start..]
                .trim_start_matches(|c: char| c == '\r' || c == '\n')
                .to_owned(),
        })
    }

    /// Walks `input_directory` for page files (extensions `.md` and `.html`)
    /// and returns a list of [`Page`] objects sorted by date, most recent
    /// first. Files and directories whose names begin with `_` or `.` are
    /// skipped, as are the parser's ignored paths. Each page file must be
    /// structured as follows:
    ///
    /// 1. Initial frontmatter fence (`---`)
    /// 2. YAML frontmatter with optional fields `title`, `date`, `tags`,
    ///    `layout`, and `description`
    /// 3. Terminal frontmatter fence (`---`)
    /// 4. Page body
    ///
    /// For example:
    ///
    /// ```md
    /// ---
    /// title: Hello, world!
    /// date: 2021-04-16
    /// tags: [greet, posts]
    /// layout: post.html
    /// ---
    /// # Hello
    ///
    /// World
    /// ```
    pub fn parse_pages(&self, input_directory: &Path) -> Result<Vec<Page>> {
        let mut pages = Vec::new();
        let walker = WalkDir::new(input_directory)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|entry| {
                entry.depth() == 0 || !self.is_skipped(input_directory, entry)
            });
        for result in walker {
            let entry = result?;
            if !entry.file_type().is_file() {
                continue;
            }
            let format = match entry
                .path()
                .extension()
                .and_then(|ext| ext.to_str())
                .and_then(Format::from_extension)
            {
                Some(format) => format,
                None => continue,
            };
            // strip_prefix() should never fail since the walk starts at
            // `input_directory`
            let relative_path = entry.path().strip_prefix(input_directory).unwrap();
            debug!(path = %relative_path.display(), "parsing page");
            pages.push(self.parse_page(input_directory, relative_path, format)?);
        }

        sort_pages(&mut pages);
        Ok(pages)
    }

    fn is_skipped(&self, input_directory: &Path, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if name.starts_with('_') || name.starts_with('.') {
            return true;
        }
        match entry.path().strip_prefix(input_directory) {
            Ok(relative) => self.ignored.iter().any(|ignored| relative == ignored),
            Err(_) => false,
        }
    }
}

/// Sorts pages by date, most recent first. Undated pages come last, and ties
/// are broken by URL so output is stable.
pub fn sort_pages(pages: &mut [Page]) {
    pages.sort_by(|a, b| {
        let a_date = a.date.as_deref().and_then(parse_date);
        let b_date = b.date.as_deref().and_then(parse_date);
        // `None` sorts before `Some`, so comparing b to a puts undated pages
        // at the end
        b_date
            .cmp(&a_date)
            .then_with(|| a.url.as_str().cmp(b.url.as_str()))
    });
}

fn frontmatter_indices(input: &str) -> Result<(usize, usize, usize)> {
    const FENCE: &str = "---";
    if !input.starts_with(FENCE) {
        return Err(Error::FrontmatterMissingStartFence);
    }
    match input[FENCE.len()..].find(FENCE) {
        None => Err(Error::FrontmatterMissingEndFence),
        Some(offset) => Ok((
            FENCE.len(),                        // yaml_start
            FENCE.len() + offset,               // yaml_stop
            FENCE.len() + offset + FENCE.len(), // body_start
        )),
    }
}

/// Maps a page's relative source path to its relative output file path and
/// its URL path relative to the site root:
///
/// * `index.md` -> `index.html`, ``
/// * `foo/index.md` -> `foo/index.html`, `foo/`
/// * `foo/bar.md` -> `foo/bar/index.html`, `foo/bar/`
fn output_location(relative_path: &Path) -> Result<(PathBuf, String)> {
    let invalid = || InvalidFileNameError(relative_path.to_owned());

    let mut segments = Vec::new();
    if let Some(parent) = relative_path.parent() {
        for component in parent.components() {
            match component {
                Component::Normal(segment) => {
                    segments.push(segment.to_str().ok_or_else(invalid)?.to_owned())
                }
                _ => return Err(invalid().into()),
            }
        }
    }

    let stem = relative_path
        .file_stem()
        .ok_or_else(invalid)?
        .to_str()
        .ok_or_else(invalid)?;
    if stem != "index" {
        segments.push(stem.to_owned());
    }

    let mut output_path: PathBuf = segments.iter().collect();
    output_path.push("index.html");
    let url_path = segments
        .iter()
        .map(|segment| format!("{}/", segment))
        .collect::<String>();
    Ok((output_path, url_path))
}

#[derive(Deserialize, Clone, Default)]
struct Frontmatter {
    /// The title of the page.
    #[serde(default)]
    title: String,

    /// The date of the page.
    #[serde(default)]
    date: Option<String>,

    /// The tags associated with the page.
    #[serde(default)]
    tags: Tags,

    /// The layout template for the page.
    #[serde(default)]
    layout: Option<String>,

    /// A short description of the page.
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug)]
pub struct InvalidFileNameError(PathBuf);

impl fmt::Display for InvalidFileNameError {
    /// Displays an [`InvalidFileNameError`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "invalid file name: {:?}", &self.0)
    }
}

impl std::error::Error for InvalidFileNameError {
    /// Implements the [`std::error::Error`] trait for [`InvalidFileNameError`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        None
    }
}

/// Represents the result of a [`Page`]-parse operation.
pub type Result<T> = std::result::Result<T, Error>;

/// Represents an error parsing a [`Page`] object.
#[derive(Debug)]
pub enum Error {
    /// Returned when a page source file is missing its starting frontmatter
    /// fence (`---`).
    FrontmatterMissingStartFence,

    /// Returned when a page source file is missing its terminal frontmatter
    /// fence (`---` i.e., the starting fence was found but the ending one was
    /// missing).
    FrontmatterMissingEndFence,

    /// Returned when there was an error parsing the frontmatter as YAML.
    DeserializeYaml(serde_yaml::Error),

    /// Returned when the frontmatter date is neither `YYYY-MM-DD` nor RFC 3339.
    InvalidDate(String),

    /// Returned when there is a problem parsing URLs.
    UrlParse(url::ParseError),

    /// Returned for other I/O errors.
    Io(std::io::Error),

    /// Returned for WalkDir I/O errors.
    WalkDir(walkdir::Error),

    /// Returned when a source file path isn't valid UTF-8.
    InvalidFileName(InvalidFileNameError),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as human-readable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::FrontmatterMissingStartFence => {
                write!(f, "Page must begin with `---`")
            }
            Error::FrontmatterMissingEndFence => {
                write!(f, "Missing closing `---`")
            }
            Error::DeserializeYaml(err) => err.fmt(f),
            Error::InvalidDate(date) => write!(f, "invalid date `{}`", date),
            Error::UrlParse(err) => err.fmt(f),
            Error::Io(err) => err.fmt(f),
            Error::WalkDir(err) => err.fmt(f),
            Error::InvalidFileName(err) => err.fmt(f),
            Error::Annotated(annotation, err) => {
                write!(f, "{}: {}", &annotation, err)
            }
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::FrontmatterMissingStartFence => None,
            Error::FrontmatterMissingEndFence => None,
            Error::DeserializeYaml(err) => Some(err),
            Error::InvalidDate(_) => None,
            Error::UrlParse(err) => Some(err),
            Error::Io(err) => Some(err),
            Error::WalkDir(err) => Some(err),
            Error::InvalidFileName(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

impl From<InvalidFileNameError> for Error {
    fn from(err: InvalidFileNameError) -> Error {
        Error::InvalidFileName(err)
    }
}

impl From<url::ParseError> for Error {
    /// Converts a [`url::ParseError`] into an [`Error`]. It allows us to use
    /// the `?` operator for URL parsing and joining functions.
    fn from(err: url::ParseError) -> Error {
        Error::UrlParse(err)
    }
}

impl From<serde_yaml::Error> for Error {
    /// Converts a [`serde_yaml::Error`] into an [`Error`]. It allows us to use
    /// the `?` operator for [`serde_yaml`] deserialization functions.
    fn from(err: serde_yaml::Error) -> Error {
        Error::DeserializeYaml(err)
    }
}

impl From<walkdir::Error> for Error {
    /// Converts a [`walkdir::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible directory walks.
    fn from(err: walkdir::Error) -> Error {
        Error::WalkDir(err)
    }
}

impl From<std::io::Error> for Error {
    /// Converts a [`std::io::Error`] into an [`Error`]. It allows us to
    /// use the `?` operator for fallible I/O functions.
    fn from(err: std::io::Error) -> Error {
        Error::Io(err)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::fs;

    fn write(dir: &Path, relative: &str, contents: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    #[test]
    fn test_output_location() -> Result<()> {
        assert_eq!(
            (PathBuf::from("index.html"), String::new()),
            output_location(Path::new("index.md"))?
        );
        assert_eq!(
            (PathBuf::from("posts/index.html"), String::from("posts/")),
            output_location(Path::new("posts/index.html"))?
        );
        assert_eq!(
            (PathBuf::from("posts/hello/index.html"), String::from("posts/hello/")),
            output_location(Path::new("posts/hello.md"))?
        );
        Ok(())
    }

    #[test]
    fn test_frontmatter_fences() {
        assert!(matches!(
            frontmatter_indices("title: x\n---\n"),
            Err(Error::FrontmatterMissingStartFence)
        ));
        assert!(matches!(
            frontmatter_indices("---\ntitle: x\n"),
            Err(Error::FrontmatterMissingEndFence)
        ));
    }

    #[test]
    fn test_parse_pages() -> Result<()> {
        let input = tempfile::tempdir()?;
        write(
            input.path(),
            "posts/older.md",
            "---\ntitle: Older\ndate: 2020-01-01\ntags: posts\n---\nOld news.",
        );
        write(
            input.path(),
            "posts/newer.md",
            "---\ntitle: Newer\ndate: 2021-04-16\ntags: [posts, rust]\nlayout: post.html\n---\n# Hi\n",
        );
        write(input.path(), "about.html", "---\ntitle: About\n---\n<p>About</p>");
        write(input.path(), "_includes/post.html", "{{ .page.content }}");
        write(input.path(), "assets/readme.md", "not a page");
        write(input.path(), "notes.txt", "ignored");

        let site_url = Url::parse("https://example.org/")?;
        let output = Path::new("/out");
        let ignored = [PathBuf::from("assets")];
        let pages = Parser::new(&site_url, output, &ignored).parse_pages(input.path())?;

        let titles: Vec<&str> = pages.iter().map(|p| p.title.as_str()).collect();
        assert_eq!(vec!["Newer", "Older", "About"], titles);

        let newer = &pages[0];
        assert_eq!("https://example.org/posts/newer/", newer.url.as_str());
        assert_eq!(PathBuf::from("/out/posts/newer/index.html"), newer.file_path);
        assert_eq!(Some("post.html".to_owned()), newer.layout);
        assert_eq!(Format::Markdown, newer.format);
        assert_eq!("# Hi\n", newer.body);
        let tags: Vec<&str> = newer.tags.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(vec!["posts", "rust"], tags);

        assert_eq!(Format::Html, pages[2].format);
        assert_eq!("https://example.org/about/", pages[2].url.as_str());
        Ok(())
    }

    #[test]
    fn test_parse_pages_rejects_bad_date() -> Result<()> {
        let input = tempfile::tempdir()?;
        write(input.path(), "bad.md", "---\ntitle: Bad\ndate: someday\n---\n");
        let site_url = Url::parse("https://example.org/")?;
        let err = Parser::new(&site_url, Path::new("/out"), &[])
            .parse_pages(input.path())
            .unwrap_err();
        assert_eq!("parsing page `bad.md`: invalid date `someday`", err.to_string());
        Ok(())
    }

    #[test]
    fn test_parse_pages_empty_frontmatter() -> Result<()> {
        let input = tempfile::tempdir()?;
        write(input.path(), "index.md", "---\n---\nHome");
        let site_url = Url::parse("https://example.org/")?;
        let pages = Parser::new(&site_url, Path::new("/out"), &[]).parse_pages(input.path())?;
        assert_eq!(1, pages.len());
        assert_eq!("", pages[0].title);
        assert_eq!("https://example.org/", pages[0].url.as_str());
        assert_eq!("Home", pages[0].body);
        Ok(())
    }
}
