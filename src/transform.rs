//! Post-processing applied to rendered HTML before it is written to disk.

use once_cell::sync::Lazy;
use regex::Regex;

/// A transform takes a page's rendered HTML and returns the replacement.
pub type Transform = fn(&str) -> String;

/// The transforms applied to every HTML page, in order.
pub fn standard() -> Vec<Transform> {
    vec![wrap_tables]
}

/// Wraps every `<table>` element in `<div class="table-wrapper">` so wide
/// tables can scroll horizontally instead of overflowing the layout.
pub fn wrap_tables(html: &str) -> String {
    static TABLE: Lazy<Regex> =
        Lazy::new(|| Regex::new(r"(?is)<table(?:\s[^>]*)?>.*?</table>").unwrap());
    TABLE
        .replace_all(html, r#"<div class="table-wrapper">$0</div>"#)
        .into_owned()
}

/// Runs `html` through each of `transforms` in order.
pub fn apply(transforms: &[Transform], html: String) -> String {
    transforms
        .iter()
        .fold(html, |html, transform| transform(&html))
}

#[cfg(test)]
mod test {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_wrap_tables() {
        assert_eq!(
            r#"<p>x</p><div class="table-wrapper"><table><tr><td>1</td></tr></table></div>"#,
            wrap_tables("<p>x</p><table><tr><td>1</td></tr></table>")
        );
    }

    #[test]
    fn test_wrap_tables_with_attributes_and_newlines() {
        let html = "<table class=\"t\">\n<tr><td>1</td></tr>\n</table>\n<TABLE></TABLE>";
        assert_eq!(
            "<div class=\"table-wrapper\"><table class=\"t\">\n<tr><td>1</td></tr>\n</table></div>\n<div class=\"table-wrapper\"><TABLE></TABLE></div>",
            wrap_tables(html)
        );
    }

    #[test]
    fn test_wrap_tables_ignores_similar_tags() {
        let html = "<tablet>not a table</tablet>";
        assert_eq!(html, wrap_tables(html));
    }

    #[test]
    fn test_apply_runs_in_order() {
        fn shout(s: &str) -> String {
            s.to_uppercase()
        }
        let got = apply(&[wrap_tables, shout], "<table></table>".to_owned());
        assert_eq!(r#"<DIV CLASS="TABLE-WRAPPER"><TABLE></TABLE></DIV>"#, got);
    }
}
