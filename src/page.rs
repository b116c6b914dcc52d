//! Defines the [`Page`] type and its conversion into template values. See
//! [`Page::to_value`] for the fields a layout can reference.

use crate::tag::Tag;
use gtmpl_value::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use url::Url;

/// The source format of a page body.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    Markdown,
    Html,
}

impl Format {
    /// Returns the format for a source file extension, if it is a page at all.
    pub fn from_extension(extension: &str) -> Option<Format> {
        match extension {
            "md" => Some(Format::Markdown),
            "html" => Some(Format::Html),
            _ => None,
        }
    }
}

/// Represents a page parsed from a source file.
#[derive(Clone, Debug)]
pub struct Page {
    /// The title of the page.
    pub title: String,

    /// The date of the page as written in the frontmatter, if any. The
    /// [`crate::parser::Parser`] guarantees it is parseable.
    pub date: Option<String>,

    /// A short description of the page, if any.
    pub description: Option<String>,

    /// The tags associated with the page.
    pub tags: Vec<Tag>,

    /// The layout template (relative to the includes directory) that wraps
    /// the page content. Pages without a layout are written as is.
    pub layout: Option<String>,

    /// The source file path relative to the input directory.
    pub source_path: PathBuf,

    /// The output file path.
    pub file_path: PathBuf,

    /// The URL at which the page will be served.
    pub url: Url,

    /// The format of `body`.
    pub format: Format,

    /// The raw page body, following the frontmatter.
    pub body: String,
}

impl Page {
    /// Converts the page into a [`Value::Object`] with fields `title`, `date`,
    /// `description`, `url`, `tags`, and `content`. `content` is the rendered
    /// HTML body, which is only known once the page has been rendered.
    pub fn to_value(&self, content: Option<&str>) -> Value {
        let option_to_value = |opt: &Option<String>| match opt {
            Some(s) => Value::String(s.clone()),
            None => Value::Nil,
        };

        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("title".to_owned(), Value::String(self.title.clone()));
        m.insert("date".to_owned(), option_to_value(&self.date));
        m.insert("description".to_owned(), option_to_value(&self.description));
        m.insert("url".to_owned(), Value::String(self.url.to_string()));
        m.insert(
            "tags".to_owned(),
            Value::Array(self.tags.iter().map(Value::from).collect()),
        );
        m.insert(
            "content".to_owned(),
            match content {
                Some(content) => Value::String(content.to_owned()),
                None => Value::Nil,
            },
        );
        Value::Object(m)
    }
}
