use pulldown_cmark::{html, Options, Parser};

/// Converts markdown to HTML, appending the result onto `out`.
pub fn to_html(out: &mut String, markdown: &str) {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_FOOTNOTES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);
    html::push_html(out, Parser::new_ext(markdown, options));
}
