//! Defines the [`Tag`] type, which represents a [`crate::page::Page`] tag, and
//! the tag collection shared by all templates.

use gtmpl_value::Value;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use url::Url;

/// Tags that only group pages into collections. They are never listed in the
/// site's tag list.
const RESERVED_TAGS: [&str; 4] = ["all", "nav", "post", "posts"];

/// Represents a [`crate::page::Page`] tag.
#[derive(Clone, Debug)]
pub struct Tag {
    /// The tag's name as written in the frontmatter.
    pub name: String,

    /// The URL for the tag's page, `{site_url}tags/{slug}/`. Slugifying the
    /// name makes e.g., `macOS` and `MacOS` land on the same page.
    pub url: Url,
}

impl Tag {
    pub fn new(name: &str, site_url: &Url) -> Result<Tag, url::ParseError> {
        Ok(Tag {
            name: name.to_owned(),
            url: site_url.join(&format!("tags/{}/", slug::slugify(name)))?,
        })
    }
}

impl Hash for Tag {
    /// Implements [`Hash`] for [`Tag`] by delegating directly to the `name`
    /// field.
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state)
    }
}

impl PartialEq for Tag {
    /// Implements [`PartialEq`] and [`Eq`] for [`Tag`] by delegating directly
    /// to the `name` field.
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}
impl Eq for Tag {}

impl From<&Tag> for Value {
    /// Converts [`Tag`]s into [`Value`]s for templating.
    fn from(t: &Tag) -> Value {
        use std::collections::HashMap;
        let mut m: HashMap<String, Value> = HashMap::new();
        m.insert("name".to_owned(), Value::String(t.name.clone()));
        m.insert("url".to_owned(), Value::String(t.url.to_string()));
        Value::Object(m)
    }
}

/// The frontmatter `tags` field, which may be written either as a single
/// string or as a list of strings.
#[derive(Deserialize, Clone, Debug, PartialEq)]
#[serde(untagged)]
pub enum Tags {
    One(String),
    Many(Vec<String>),
}

impl Default for Tags {
    fn default() -> Self {
        Tags::Many(Vec::new())
    }
}

impl Tags {
    /// Flattens either form into a list of distinct, non-empty tag names,
    /// keeping their first-seen order.
    pub fn normalize(self) -> Vec<String> {
        let names = match self {
            Tags::One(name) => vec![name],
            Tags::Many(names) => names,
        };
        let mut seen = Vec::with_capacity(names.len());
        for name in names {
            let name = name.trim();
            if !name.is_empty() && !seen.iter().any(|s: &String| s == name) {
                seen.push(name.to_owned());
            }
        }
        seen
    }
}

/// Returns every distinct tag across `tags`, sorted by name, without the
/// reserved collection tags.
pub fn tag_list<'a>(tags: impl IntoIterator<Item = &'a Tag>) -> Vec<Tag> {
    let mut list: BTreeMap<&str, &Tag> = BTreeMap::new();
    for tag in tags {
        if !RESERVED_TAGS.contains(&tag.name.as_str()) {
            list.entry(tag.name.as_str()).or_insert(tag);
        }
    }
    list.into_values().cloned().collect()
}
