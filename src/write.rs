use crate::filters::Filters;
use crate::markdown;
use crate::page::{Format, Page};
use crate::tag::tag_list;
use crate::transform::{self, Transform};
use gtmpl::{Context, Template};
use gtmpl_value::Value;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use tracing::debug;
use url::Url;

/// The subdirectory of the includes directory whose files are appended to
/// every layout, so layouts can call the templates they `define`.
const PARTIALS_DIRECTORY: &str = "partials";

/// Responsible for templating, transforming, and writing HTML pages to disk
/// from [`Page`] sources.
pub struct Writer<'a> {
    /// The functions made available to every template, including page bodies.
    pub filters: &'a Filters,

    /// The transforms applied, in order, to every rendered page. Every page is
    /// written as `index.html`, so all output is HTML.
    pub transforms: &'a [Transform],

    /// The directory containing layout templates. A page with
    /// `layout: post.html` is rendered with `{includes_directory}/post.html`.
    pub includes_directory: &'a Path,

    /// The site title. This is made available to all templates as
    /// `.site.title`.
    pub site_title: &'a str,

    /// The site root URL. This is made available to all templates as
    /// `.site.url`.
    pub site_url: &'a Url,
}

impl Writer<'_> {
    /// Renders and writes every page. Rendering happens in two passes: first
    /// each page body is rendered (as a template, then as markdown where
    /// applicable), then each page is wrapped in its layout with the rendered
    /// contents of all pages available as collections.
    pub fn write_pages(&self, pages: &[Page]) -> Result<()> {
        let site = self.site_value();

        let contents = pages
            .iter()
            .map(|page| {
                self.render_content(page, &site)
                    .map_err(|e| annotate(page, e))
            })
            .collect::<Result<Vec<String>>>()?;

        let collections = collections_value(pages, &contents);
        let mut layouts: HashMap<String, Template> = HashMap::new();
        let mut seen_dirs: HashSet<PathBuf> = HashSet::new();
        for (page, content) in pages.iter().zip(contents.iter()) {
            let html = self
                .render_layout(page, content, &site, &collections, &mut layouts)
                .map_err(|e| annotate(page, e))?;
            let html = transform::apply(self.transforms, html);

            if let Some(dir) = page.file_path.parent() {
                if seen_dirs.insert(dir.to_owned()) {
                    std::fs::create_dir_all(dir)?;
                }
            }
            std::fs::write(&page.file_path, html)?;
            debug!(path = %page.file_path.display(), "wrote page");
        }
        Ok(())
    }

    /// Renders a page body into HTML. Bodies are templates in their own
    /// right, so filters can be used directly in page sources.
    fn render_content(&self, page: &Page, site: &Value) -> Result<String> {
        let body = match page.body.contains("{{") {
            true => {
                let mut template = self.new_template();
                template
                    .parse(&page.body)
                    .map_err(|e| Error::Template(e.to_string()))?;
                let mut m: HashMap<String, Value> = HashMap::new();
                m.insert("page".to_owned(), page.to_value(None));
                m.insert("site".to_owned(), site.clone());
                template
                    .render(&Context::from(Value::Object(m)))
                    .map_err(|e| Error::Template(e.to_string()))?
            }
            false => page.body.clone(),
        };

        Ok(match page.format {
            Format::Markdown => {
                let mut html = String::new();
                markdown::to_html(&mut html, &body);
                html
            }
            Format::Html => body,
        })
    }

    /// Wraps rendered page content in the page's layout, if it has one.
    /// Layouts are parsed on first use and cached in `layouts`.
    fn render_layout(
        &self,
        page: &Page,
        content: &str,
        site: &Value,
        collections: &Value,
        layouts: &mut HashMap<String, Template>,
    ) -> Result<String> {
        let layout = match &page.layout {
            None => return Ok(content.to_owned()),
            Some(layout) => layout,
        };
        if !layouts.contains_key(layout) {
            let template = self.load_layout(layout)?;
            layouts.insert(layout.clone(), template);
        }

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("page".to_owned(), page.to_value(Some(content)));
        m.insert("content".to_owned(), Value::String(content.to_owned()));
        m.insert("site".to_owned(), site.clone());
        m.insert("collections".to_owned(), collections.clone());
        layouts[layout]
            .render(&Context::from(Value::Object(m)))
            .map_err(|e| Error::Template(e.to_string()))
    }

    // Loads the layout file contents, appends the partials to it, and parses
    // the result into a template with the filters installed.
    fn load_layout(&self, layout: &str) -> Result<Template> {
        let mut files = vec![self.includes_directory.join(layout)];
        let partials = self.includes_directory.join(PARTIALS_DIRECTORY);
        if partials.is_dir() {
            let mut entries = std::fs::read_dir(&partials)?
                .map(|entry| entry.map(|entry| entry.path()))
                .collect::<io::Result<Vec<PathBuf>>>()?;
            entries.sort();
            files.extend(entries.into_iter().filter(|path| path.is_file()));
        }

        let mut contents = String::new();
        for file in files.iter() {
            let source = std::fs::read_to_string(file).map_err(|err| Error::OpenTemplateFile {
                path: file.to_owned(),
                err,
            })?;
            contents.push_str(&source);
            contents.push(' ');
        }

        let mut template = self.new_template();
        template
            .parse(&contents)
            .map_err(|e| Error::Template(format!("layout `{}`: {}", layout, e)))?;
        Ok(template)
    }

    fn new_template(&self) -> Template {
        let mut template = Template::default();
        self.filters.install(&mut template);
        template
    }

    fn site_value(&self) -> Value {
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::String(self.site_title.to_owned()));
        m.insert("url".to_owned(), Value::String(self.site_url.to_string()));
        Value::Object(m)
    }
}

/// Builds the `collections` template value: `all` holds every page (most
/// recent first), `tagList` every distinct tag, and each tag name maps to
/// the pages carrying that tag.
fn collections_value(pages: &[Page], contents: &[String]) -> Value {
    let values: Vec<Value> = pages
        .iter()
        .zip(contents.iter())
        .map(|(page, content)| page.to_value(Some(content)))
        .collect();

    let mut m: HashMap<String, Value> = HashMap::new();
    for (page, value) in pages.iter().zip(values.iter()) {
        for tag in page.tags.iter() {
            match m.entry(tag.name.clone()).or_insert_with(|| Value::Array(Vec::new())) {
                Value::Array(tagged) => tagged.push(value.clone()),
                _ => unreachable!("tag collections are always arrays"),
            }
        }
    }
    m.insert(
        "tagList".to_owned(),
        Value::Array(
            tag_list(pages.iter().flat_map(|page| page.tags.iter()))
                .iter()
                .map(Value::from)
                .collect(),
        ),
    );
    m.insert("all".to_owned(), Value::Array(values));
    Value::Object(m)
}

fn annotate(page: &Page, err: Error) -> Error {
    Error::Annotated(
        format!("rendering page `{}`", page.source_path.display()),
        Box::new(err),
    )
}

/// The result of a fallible page-writing operation.
type Result<T> = std::result::Result<T, Error>;

/// Represents an error in a page-writing operation.
#[derive(Debug)]
pub enum Error {
    /// An error parsing or executing a template.
    Template(String),

    /// Returned for I/O problems while opening layout files.
    OpenTemplateFile { path: PathBuf, err: io::Error },

    /// An error writing the output files.
    Io(io::Error),

    /// An error with an annotation.
    Annotated(String, Box<Error>),
}

impl From<io::Error> for Error {
    /// Converts an [`io::Error`] into an [`Error`]. This allows us to use the
    /// `?` operator for fallible I/O operations.
    fn from(err: io::Error) -> Error {
        Error::Io(err)
    }
}

impl fmt::Display for Error {
    /// Displays an [`Error`] as presentable text.
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Error::Template(err) => err.fmt(f),
            Error::OpenTemplateFile { path, err } => {
                write!(f, "Opening template file '{}': {}", path.display(), err)
            }
            Error::Io(err) => err.fmt(f),
            Error::Annotated(annotation, err) => write!(f, "{}: {}", annotation, err),
        }
    }
}

impl std::error::Error for Error {
    /// Implements the [`std::error::Error`] trait for [`Error`].
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Template(_) => None,
            Error::OpenTemplateFile { path: _, err } => Some(err),
            Error::Io(err) => Some(err),
            Error::Annotated(_, err) => Some(err),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::tag::Tag;
    use pretty_assertions::assert_eq;

    fn page(output: &Path, name: &str, format: Format, body: &str) -> Page {
        let site_url = Url::parse("https://example.org/").unwrap();
        Page {
            title: name.to_owned(),
            date: None,
            description: None,
            tags: vec![Tag::new("posts", &site_url).unwrap()],
            layout: None,
            source_path: PathBuf::from(format!("{}.md", name)),
            file_path: output.join(name).join("index.html"),
            url: site_url.join(&format!("{}/", name)).unwrap(),
            format,
            body: body.to_owned(),
        }
    }

    fn write_with(includes: &Path, pages: &[Page]) -> Result<()> {
        let site_url = Url::parse("https://example.org/").unwrap();
        let filters = Filters::standard();
        let transforms = transform::standard();
        Writer {
            filters: &filters,
            transforms: &transforms,
            includes_directory: includes,
            site_title: "Example",
            site_url: &site_url,
        }
        .write_pages(pages)
    }

    #[test]
    fn test_write_pages_with_layout() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let includes = dir.path().join("_includes");
        std::fs::create_dir_all(&includes)?;
        std::fs::write(
            includes.join("base.html"),
            "<h1>{{ .site.title }}: {{ .page.title }}</h1>{{ .content }}\
             {{ range .collections.posts }}[{{ .title }}]{{ end }}",
        )?;

        let output = dir.path().join("out");
        let mut first = page(&output, "first", Format::Markdown, "Hello *there*");
        first.layout = Some("base.html".to_owned());
        let second = page(&output, "second", Format::Html, "<p>{{ .page.title | truncate 3 }}</p>");
        write_with(&includes, &[first, second])?;

        assert_eq!(
            "<h1>Example: first</h1><p>Hello <em>there</em></p>\n[first][second] ",
            std::fs::read_to_string(output.join("first/index.html"))?
        );
        assert_eq!(
            "<p>sec...</p>",
            std::fs::read_to_string(output.join("second/index.html"))?
        );
        Ok(())
    }

    #[test]
    fn test_write_pages_wraps_tables() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("out");
        let table = page(&output, "table", Format::Markdown, "| a |\n|---|\n| 1 |\n");
        write_with(dir.path(), &[table])?;

        let html = std::fs::read_to_string(output.join("table/index.html"))?;
        assert!(html.starts_with(r#"<div class="table-wrapper"><table>"#));
        assert!(html.trim_end().ends_with("</table></div>"));
        Ok(())
    }

    #[test]
    fn test_write_pages_missing_layout() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let output = dir.path().join("out");
        let mut orphan = page(&output, "orphan", Format::Html, "x");
        orphan.layout = Some("nope.html".to_owned());

        let err = write_with(dir.path(), &[orphan]).unwrap_err();
        assert!(err.to_string().starts_with("rendering page `orphan.md`: Opening template file"));
        Ok(())
    }
}
