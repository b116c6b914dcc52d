//! Defines the [`Filters`] registry: the named functions made available to
//! layout templates. The registry is built once (usually via
//! [`Filters::standard`]) and handed to the [`crate::write::Writer`], which
//! installs it into every template it parses. Nothing is registered globally.

use crate::text::{
    strip_tags, truncate, truncate_sentences, DEFAULT_EXCERPT_LENGTH, DEFAULT_TRUNCATE_LENGTH,
};
use chrono::{DateTime, Datelike, Local, NaiveDate, TimeZone, Utc};
use gtmpl::Template;
use gtmpl_value::{Func, FuncError, Number, Value};
use std::collections::BTreeMap;

/// A mapping from filter name to template function.
#[derive(Clone, Default)]
pub struct Filters {
    funcs: BTreeMap<String, Func>,
}

impl Filters {
    /// Returns an empty registry.
    pub fn new() -> Filters {
        Filters::default()
    }

    /// Returns a registry with the built-in filters: `truncate`, `excerpt`,
    /// `striptags`, `date`, and `currentYear`.
    pub fn standard() -> Filters {
        let mut filters = Filters::new();
        filters.register("truncate", truncate_filter);
        filters.register("excerpt", excerpt_filter);
        filters.register("striptags", striptags_filter);
        filters.register("date", date_filter);
        filters.register("currentYear", current_year_filter);
        filters
    }

    /// Adds `func` under `name`, replacing any filter already registered with
    /// that name.
    pub fn register(&mut self, name: &str, func: Func) -> &mut Filters {
        self.funcs.insert(name.to_owned(), func);
        self
    }

    /// Looks up a filter by name.
    pub fn get(&self, name: &str) -> Option<Func> {
        self.funcs.get(name).copied()
    }

    /// Returns the registered names in sorted order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.funcs.keys().map(String::as_str)
    }

    /// Makes every filter callable from `template`. This must happen before
    /// the template source is parsed, since parsing rejects unknown functions.
    pub fn install(&self, template: &mut Template) {
        for (name, func) in self.funcs.iter() {
            template.add_func(name, *func);
        }
    }
}

fn truncate_filter(args: &[Value]) -> Result<Value, FuncError> {
    let (text, length) = text_and_length("truncate", args, DEFAULT_TRUNCATE_LENGTH)?;
    Ok(Value::String(truncate(&text, length)))
}

fn excerpt_filter(args: &[Value]) -> Result<Value, FuncError> {
    let (text, length) = text_and_length("excerpt", args, DEFAULT_EXCERPT_LENGTH)?;
    Ok(Value::String(truncate_sentences(&text, length)))
}

fn striptags_filter(args: &[Value]) -> Result<Value, FuncError> {
    match args {
        [Value::String(text)] => Ok(Value::String(strip_tags(text))),
        _ => Err(FuncError::Generic(
            "striptags: expected exactly one string argument".to_owned(),
        )),
    }
}

fn date_filter(args: &[Value]) -> Result<Value, FuncError> {
    let (date, format) = match args {
        [Value::String(date)] => (date, None),
        [Value::String(date), Value::String(format)] => (date, Some(format.as_str())),
        _ => {
            return Err(FuncError::Generic(
                "date: expected a date string and an optional format string".to_owned(),
            ))
        }
    };
    let date = parse_date(date)
        .ok_or_else(|| FuncError::Generic(format!("date: can't parse date `{}`", date)))?;
    Ok(Value::String(format_date(&date, format)))
}

fn current_year_filter(_args: &[Value]) -> Result<Value, FuncError> {
    Ok(Value::String(Local::now().year().to_string()))
}

/// Pulls the text and the optional length out of a truncation filter's
/// arguments. The two may come in either order: a pipeline such as
/// `{{ .content | excerpt 200 }}` passes the piped text last.
fn text_and_length(
    name: &str,
    args: &[Value],
    default_length: usize,
) -> Result<(String, usize), FuncError> {
    let mut text = None;
    let mut length = None;
    for arg in args {
        match arg {
            Value::String(s) if text.is_none() => text = Some(s.clone()),
            Value::Number(n) if length.is_none() => length = Some(positive_length(name, n)?),
            other => {
                return Err(FuncError::Generic(format!(
                    "{}: unexpected argument {:?}",
                    name, other
                )))
            }
        }
    }
    match text {
        Some(text) => Ok((text, length.unwrap_or(default_length))),
        None => Err(FuncError::Generic(format!(
            "{}: expected a string argument",
            name
        ))),
    }
}

fn positive_length(name: &str, n: &Number) -> Result<usize, FuncError> {
    n.as_u64()
        .or_else(|| n.as_i64().and_then(|i| u64::try_from(i).ok()))
        .filter(|&length| length > 0)
        .map(|length| length as usize)
        .ok_or_else(|| {
            FuncError::Generic(format!(
                "{}: length must be a positive integer, got {:?}",
                name, n
            ))
        })
}

/// Parses either a bare `YYYY-MM-DD` date (taken as UTC midnight) or a full
/// RFC 3339 timestamp.
pub fn parse_date(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date
            .and_hms_opt(0, 0, 0)
            .map(|midnight| Utc.from_utc_datetime(&midnight));
    }
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|date| date.with_timezone(&Utc))
}

/// Formats a date with one of the supported format names: `Y`, `Y-m-d`, or
/// `F j, Y`. Anything else yields an ISO 8601 timestamp.
pub fn format_date(date: &DateTime<Utc>, format: Option<&str>) -> String {
    match format {
        Some("Y") => date.format("%Y").to_string(),
        Some("Y-m-d") => date.format("%Y-%m-%d").to_string(),
        Some("F j, Y") => date.format("%B %-d, %Y").to_string(),
        _ => date.format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string(),
    }
}
