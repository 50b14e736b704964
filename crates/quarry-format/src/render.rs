//! Type-aware value rendering.
//!
//! [`ValueRenderer`] turns raw cell values into display HTML according to
//! their [`FieldDescription`]. Rendering never fails: a value that cannot
//! be rendered (an unparsable date, a URL without link text) keeps its raw
//! text, HTML-escaped.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use quarry_common::RenderConfig;
use quarry_sql::executor::{MergedResult, Row, RowSet};
use quarry_sql::schema::{FieldDescription, FieldDescriptions, FieldType};

use crate::html;

/// Rich-text collaborator used for `Wikitext` values.
pub trait WikitextRenderer: Send + Sync {
    /// Renders markup to HTML.
    fn render(&self, text: &str) -> String;
}

/// A small wikitext subset: internal links `[[Page]]` / `[[Page|label]]`,
/// external links `[url label]`, `'''bold'''` and `''italic''`. Everything
/// else is escaped.
#[derive(Debug, Clone)]
pub struct PlainWikitext {
    article_path: String,
}

impl PlainWikitext {
    /// Creates a renderer linking documents through `article_path`.
    pub fn new(article_path: impl Into<String>) -> Self {
        Self {
            article_path: article_path.into(),
        }
    }
}

impl Default for PlainWikitext {
    fn default() -> Self {
        Self::new(RenderConfig::default().article_path)
    }
}

fn is_external(target: &str) -> bool {
    ["http://", "https://", "ftp://", "mailto:", "//"]
        .iter()
        .any(|scheme| target.starts_with(scheme))
}

impl WikitextRenderer for PlainWikitext {
    fn render(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut rest = text;

        while let Some(c) = rest.chars().next() {
            if let Some(after) = rest.strip_prefix("[[") {
                if let Some(end) = after.find("]]") {
                    let inner = &after[..end];
                    let (target, label) = inner.split_once('|').unwrap_or((inner, inner));
                    out.push_str(&page_link(&self.article_path, target.trim(), label.trim()));
                    rest = &after[end + 2..];
                    continue;
                }
            } else if let Some(after) = rest.strip_prefix('[') {
                if let Some(end) = after.find(']') {
                    let inner = after[..end].trim();
                    if is_external(inner) {
                        let (url, label) = inner.split_once(' ').unwrap_or((inner, inner));
                        out.push_str(&html::element(
                            "a",
                            &[("class", "external text"), ("href", url)],
                            label.trim(),
                        ));
                        rest = &after[end + 1..];
                        continue;
                    }
                }
            } else if let Some(after) = rest.strip_prefix("'''") {
                if let Some(end) = after.find("'''") {
                    out.push_str(&format!("<b>{}</b>", self.render(&after[..end])));
                    rest = &after[end + 3..];
                    continue;
                }
            } else if let Some(after) = rest.strip_prefix("''") {
                if let Some(end) = after.find("''") {
                    out.push_str(&format!("<i>{}</i>", self.render(&after[..end])));
                    rest = &after[end + 2..];
                    continue;
                }
            }

            out.push_str(&html::escape_text(&rest[..c.len_utf8()]));
            rest = &rest[c.len_utf8()..];
        }
        out
    }
}

fn page_link(article_path: &str, target: &str, label: &str) -> String {
    html::element(
        "a",
        &[("href", &html::page_url(article_path, target)), ("title", target)],
        label,
    )
}

/// Renders cell values for display.
pub struct ValueRenderer<'a> {
    config: &'a RenderConfig,
    wikitext: &'a dyn WikitextRenderer,
}

impl<'a> ValueRenderer<'a> {
    /// Creates a renderer.
    pub fn new(config: &'a RenderConfig, wikitext: &'a dyn WikitextRenderer) -> Self {
        Self { config, wikitext }
    }

    /// Link to the named document.
    pub fn page_link(&self, name: &str) -> String {
        let name = name.trim();
        page_link(&self.config.article_path, name, name)
    }

    /// Direct URL of an uploaded file.
    pub fn file_url(&self, name: &str) -> String {
        html::page_url(&self.config.file_path, name)
    }

    fn file_thumbnail(&self, name: &str) -> String {
        let name = name.trim();
        let description_page = format!("{}:{name}", self.config.file_namespace);
        let image = html::void_element(
            "img",
            &[
                ("alt", name),
                ("src", &self.file_url(name)),
                ("width", &self.config.thumbnail_width.to_string()),
            ],
        );
        html::raw_element(
            "a",
            &[
                ("href", &html::page_url(&self.config.article_path, &description_page)),
                ("class", "image"),
            ],
            &image,
        )
    }

    fn render_date(&self, value: &str, with_time: bool) -> Option<String> {
        let parsed = parse_datetime(value)?;
        let date_format = if self.config.american_dates {
            "%B %-d, %Y"
        } else {
            "%Y-%m-%d"
        };
        let mut text = parsed.format(date_format).to_string();
        if with_time {
            text.push(' ');
            text.push_str(&parsed.format("%-I:%M:%S %p").to_string());
        }
        Some(text)
    }

    /// Renders one scalar value. Values without markup of their own come
    /// back as escaped text.
    fn render_scalar(&self, value: &str, description: &FieldDescription) -> String {
        match description.field_type {
            FieldType::Page => self.page_link(value),
            FieldType::File => self.file_thumbnail(value),
            FieldType::Url => match description.hint(FieldDescription::LINK_TEXT_HINT) {
                Some(text) => html::element("a", &[("href", value.trim())], text),
                None => html::escape_text(value),
            },
            FieldType::Date => self
                .render_date(value, false)
                .unwrap_or_else(|| html::escape_text(value)),
            FieldType::Datetime => self
                .render_date(value, true)
                .unwrap_or_else(|| html::escape_text(value)),
            FieldType::Wikitext => self.wikitext.render(value),
            FieldType::String
            | FieldType::Text
            | FieldType::Integer
            | FieldType::Float
            | FieldType::Boolean
            | FieldType::Coordinates
            | FieldType::CoordinatesPart
            | FieldType::Email => html::escape_text(value),
        }
    }

    /// Renders a value, splitting list values on their delimiter.
    ///
    /// Returns `None` when there is nothing to display.
    pub fn render_value(&self, value: &str, description: &FieldDescription) -> Option<String> {
        if value.trim().is_empty() {
            return None;
        }

        let Some(delimiter) = description.delimiter() else {
            return Some(self.render_scalar(value, description));
        };

        let rendered: Vec<String> = value
            .split(delimiter)
            .map(str::trim)
            .filter(|element| !element.is_empty())
            .map(|element| self.render_scalar(element, description))
            .collect();
        let text = rendered.join(&html::escape_text(&format!("{delimiter} ")));
        (!text.is_empty()).then_some(text)
    }

    /// Renders every value of a row. Values without a description, and
    /// blank values, are escaped as they are.
    pub fn format_row(&self, row: &Row, descriptions: &FieldDescriptions) -> Row {
        row.iter()
            .map(|(alias, value)| {
                let formatted = descriptions
                    .get(alias)
                    .and_then(|description| self.render_value(value, description))
                    .filter(|text| !text.is_empty())
                    .unwrap_or_else(|| html::escape_text(value));
                (alias.clone(), formatted)
            })
            .collect()
    }

    /// Renders rows of one query.
    pub fn format_rows(&self, rows: &RowSet, descriptions: &FieldDescriptions) -> RowSet {
        rows.iter()
            .map(|row| self.format_row(row, descriptions))
            .collect()
    }

    /// Renders merged rows, each with the descriptions of its own query.
    pub fn format_merged(&self, merged: &MergedResult) -> RowSet {
        merged
            .rows
            .iter()
            .enumerate()
            .map(|(i, row)| self.format_row(row, merged.descriptions_for_row(i)))
            .collect()
    }
}

/// Parses the date layouts the store may hold.
fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    const DATETIME_FORMATS: [&str; 4] = [
        "%Y-%m-%d %H:%M:%S",
        "%Y-%m-%dT%H:%M:%S",
        "%Y-%m-%d %H:%M",
        "%Y/%m/%d %H:%M:%S",
    ];
    const DATE_FORMATS: [&str; 3] = ["%Y-%m-%d", "%Y/%m/%d", "%B %d, %Y"];

    let value = value.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.naive_local());
    }
    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .or_else(|| {
            DATE_FORMATS
                .iter()
                .find_map(|format| NaiveDate::parse_from_str(value, format).ok())
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn with_renderer<T>(config: &RenderConfig, f: impl FnOnce(&ValueRenderer<'_>) -> T) -> T {
        let wikitext = PlainWikitext::new(config.article_path.clone());
        let renderer = ValueRenderer::new(config, &wikitext);
        f(&renderer)
    }

    #[test]
    fn test_page_and_file() {
        let config = RenderConfig::default();
        with_renderer(&config, |r| {
            assert_eq!(
                r.render_value("Frank Herbert", &FieldDescription::new(FieldType::Page)),
                Some("<a href=\"/wiki/Frank_Herbert\" title=\"Frank Herbert\">Frank Herbert</a>".to_string())
            );
            let thumb = r
                .render_value("Dune cover.jpg", &FieldDescription::new(FieldType::File))
                .unwrap();
            assert_eq!(
                thumb,
                "<a href=\"/wiki/File:Dune_cover.jpg\" class=\"image\"><img alt=\"Dune cover.jpg\" src=\"/wiki/Special:FilePath/Dune_cover.jpg\" width=\"180\"></a>"
            );
        });
    }

    #[test]
    fn test_url_needs_link_text() {
        let config = RenderConfig::default();
        with_renderer(&config, |r| {
            let plain = FieldDescription::new(FieldType::Url);
            assert_eq!(
                r.render_value("https://example.org", &plain),
                Some("https://example.org".to_string())
            );

            let labeled = plain.with_hint(FieldDescription::LINK_TEXT_HINT, "homepage");
            assert_eq!(
                r.render_value("https://example.org", &labeled),
                Some("<a href=\"https://example.org\">homepage</a>".to_string())
            );
        });
    }

    #[test]
    fn test_dates() {
        let mut config = RenderConfig::default();
        with_renderer(&config, |r| {
            let date = FieldDescription::new(FieldType::Date);
            assert_eq!(r.render_value("2014-01-05", &date), Some("2014-01-05".to_string()));
            assert_eq!(r.render_value("not a date", &date), Some("not a date".to_string()));
            assert_eq!(r.render_value("<b>soon</b>", &date), Some("&lt;b&gt;soon&lt;/b&gt;".to_string()));

            let datetime = FieldDescription::new(FieldType::Datetime);
            assert_eq!(
                r.render_value("2014-01-05 15:04:09", &datetime),
                Some("2014-01-05 3:04:09 PM".to_string())
            );
        });

        config.american_dates = true;
        with_renderer(&config, |r| {
            let date = FieldDescription::new(FieldType::Date);
            assert_eq!(
                r.render_value("2014-01-05", &date),
                Some("January 5, 2014".to_string())
            );
        });
    }

    #[test]
    fn test_list_rendering_skips_empty_elements() {
        let config = RenderConfig::default();
        with_renderer(&config, |r| {
            let strings = FieldDescription::list(FieldType::String, ";");
            assert_eq!(r.render_value("A;  ;B", &strings), Some("A; B".to_string()));

            let pages = FieldDescription::list(FieldType::Page, ";");
            assert_eq!(
                r.render_value("A;  ;B", &pages),
                Some(
                    "<a href=\"/wiki/A\" title=\"A\">A</a>; <a href=\"/wiki/B\" title=\"B\">B</a>"
                        .to_string()
                )
            );
            assert_eq!(r.render_value(" ; ", &strings), None);
        });
    }

    #[test]
    fn test_identity_types_are_escaped() {
        let config = RenderConfig::default();
        with_renderer(&config, |r| {
            for field_type in [FieldType::String, FieldType::Integer, FieldType::Boolean, FieldType::Email] {
                assert_eq!(
                    r.render_value("x<y", &FieldDescription::new(field_type)),
                    Some("x&lt;y".to_string())
                );
            }
            let tags = FieldDescription::list(FieldType::String, ";");
            assert_eq!(
                r.render_value("<i>a</i>;b&c", &tags),
                Some("&lt;i&gt;a&lt;/i&gt;; b&amp;c".to_string())
            );
            assert_eq!(r.render_value("   ", &FieldDescription::new(FieldType::String)), None);
        });
    }

    #[test]
    fn test_format_row_escapes_when_unrendered() {
        let config = RenderConfig::default();
        with_renderer(&config, |r| {
            let mut descriptions = FieldDescriptions::new();
            descriptions.insert("Title".to_string(), FieldDescription::new(FieldType::Page));
            descriptions.insert("Born".to_string(), FieldDescription::new(FieldType::Date));

            let mut row = Row::new();
            row.insert("Title".to_string(), "Emma".to_string());
            row.insert("Born".to_string(), "sometime".to_string());
            row.insert("Extra".to_string(), "<kept>".to_string());

            let formatted = r.format_row(&row, &descriptions);
            assert!(formatted["Title"].starts_with("<a href=\"/wiki/Emma\""));
            assert_eq!(formatted["Born"], "sometime");
            assert_eq!(formatted["Extra"], "&lt;kept&gt;");
        });
    }

    #[test]
    fn test_plain_wikitext() {
        let wikitext = PlainWikitext::default();
        assert_eq!(
            wikitext.render("See [[Dune|the novel]] & [https://example.org site]"),
            "See <a href=\"/wiki/Dune\" title=\"Dune\">the novel</a> &amp; <a class=\"external text\" href=\"https://example.org\">site</a>"
        );
        assert_eq!(wikitext.render("'''bold''' and ''it''"), "<b>bold</b> and <i>it</i>");
        assert_eq!(wikitext.render("[not a link] <x>"), "[not a link] &lt;x&gt;");
    }
}
