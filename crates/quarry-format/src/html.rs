//! HTML and URL building helpers.

/// Escapes text content: `&`, `<` and `>`.
pub fn escape_text(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Escapes an attribute value; quotes are escaped as well.
pub fn escape_attr(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#039;"),
            _ => out.push(c),
        }
    }
    out
}

fn open_tag(tag: &str, attrs: &[(&str, &str)]) -> String {
    let mut out = format!("<{tag}");
    for (name, value) in attrs {
        out.push_str(&format!(" {name}=\"{}\"", escape_attr(value)));
    }
    out.push('>');
    out
}

/// An element whose content is already HTML.
pub fn raw_element(tag: &str, attrs: &[(&str, &str)], html: &str) -> String {
    format!("{}{html}</{tag}>", open_tag(tag, attrs))
}

/// An element with escaped text content.
pub fn element(tag: &str, attrs: &[(&str, &str)], text: &str) -> String {
    raw_element(tag, attrs, &escape_text(text))
}

/// A void element such as `<img>`.
pub fn void_element(tag: &str, attrs: &[(&str, &str)]) -> String {
    open_tag(tag, attrs)
}

/// The error box shown in place of a failed query.
pub fn error_box(message: &str) -> String {
    element("div", &[("class", "error")], message)
}

/// Percent-encodes a query-string component; spaces become `+`.
pub fn url_encode(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            b' ' => out.push('+'),
            _ => out.push_str(&format!("%{byte:02X}")),
        }
    }
    out
}

/// Joins key/value pairs into a query string.
pub fn query_string<K: AsRef<str>, V: AsRef<str>>(params: &[(K, V)]) -> String {
    params
        .iter()
        .map(|(k, v)| format!("{}={}", url_encode(k.as_ref()), url_encode(v.as_ref())))
        .collect::<Vec<_>>()
        .join("&")
}

/// `base?query`, or `base` alone when there are no parameters.
pub fn url_with_query<K: AsRef<str>, V: AsRef<str>>(base: &str, params: &[(K, V)]) -> String {
    if params.is_empty() {
        return base.to_string();
    }
    let separator = if base.contains('?') { '&' } else { '?' };
    format!("{base}{separator}{}", query_string(params))
}

/// Substitutes a document name into a `$1` path template.
///
/// Spaces become underscores and the name is percent-encoded, keeping
/// `/` and `:` readable.
pub fn page_url(template: &str, name: &str) -> String {
    let encoded = url_encode(&name.trim().replace(' ', "_"))
        .replace("%2F", "/")
        .replace("%3A", ":");
    template.replace("$1", &encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escaping() {
        assert_eq!(escape_text("a < b & \"c\""), "a &lt; b &amp; \"c\"");
        assert_eq!(escape_attr("say \"hi\" & 'bye'"), "say &quot;hi&quot; &amp; &#039;bye&#039;");
    }

    #[test]
    fn test_elements() {
        assert_eq!(
            element("a", &[("href", "/x?a=1&b=2")], "A & B"),
            "<a href=\"/x?a=1&amp;b=2\">A &amp; B</a>"
        );
        assert_eq!(raw_element("p", &[], "<b>x</b>"), "<p><b>x</b></p>");
        assert_eq!(error_box("No <results>"), "<div class=\"error\">No &lt;results&gt;</div>");
        assert_eq!(void_element("img", &[("src", "a.png")]), "<img src=\"a.png\">");
    }

    #[test]
    fn test_query_string() {
        assert_eq!(url_encode("join on"), "join+on");
        assert_eq!(url_encode("Year>1950"), "Year%3E1950");
        assert_eq!(url_encode("tables[0]"), "tables%5B0%5D");
        assert_eq!(
            url_with_query("/export", &[("tables", "Books"), ("where", "Year = 1")]),
            "/export?tables=Books&where=Year+%3D+1"
        );
        assert_eq!(url_with_query::<&str, &str>("/export", &[]), "/export");
        assert_eq!(url_with_query("/index.php?title=X", &[("a", "b")]), "/index.php?title=X&a=b");
    }

    #[test]
    fn test_page_url() {
        assert_eq!(page_url("/wiki/$1", "Frank Herbert"), "/wiki/Frank_Herbert");
        assert_eq!(page_url("/wiki/$1", "File:Dune cover.jpg"), "/wiki/File:Dune_cover.jpg");
        assert_eq!(page_url("/wiki/$1", "Q&A"), "/wiki/Q%26A");
    }
}
