//! Locator strategies.
//!
//! A locator is one way of finding an element. Locators are plain data so
//! selector tables can be edited without touching engine logic; each
//! backend interprets them (the WebDriver backend compiles them to XPath).

use std::fmt;

use serde::{Deserialize, Serialize};

/// One element-finding strategy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "by", rename_all = "snake_case")]
pub enum Locator {
    /// Match on an attribute. A missing `value` matches any element that
    /// carries the attribute at all.
    Attribute {
        #[serde(default)]
        tag: Option<String>,
        name: String,
        #[serde(default)]
        value: Option<String>,
        #[serde(default)]
        contains: bool,
    },

    /// Match on whitespace-normalized text content.
    Text {
        #[serde(default)]
        tag: Option<String>,
        text: String,
        #[serde(default)]
        exact: bool,
    },

    /// The `index`-th (1-based) element with `tag`, in document order.
    Position { tag: String, index: usize },
}

impl Locator {
    /// Attribute equality.
    pub fn attr(tag: &str, name: &str, value: &str) -> Self {
        Locator::Attribute {
            tag: Some(tag.to_string()),
            name: name.to_string(),
            value: Some(value.to_string()),
            contains: false,
        }
    }

    /// Attribute substring match.
    pub fn attr_contains(tag: &str, name: &str, value: &str) -> Self {
        Locator::Attribute {
            tag: Some(tag.to_string()),
            name: name.to_string(),
            value: Some(value.to_string()),
            contains: true,
        }
    }

    /// Any element carrying the attribute.
    pub fn has_attr(name: &str) -> Self {
        Locator::Attribute {
            tag: None,
            name: name.to_string(),
            value: None,
            contains: false,
        }
    }

    /// Text substring match.
    pub fn text(tag: &str, text: &str) -> Self {
        Locator::Text {
            tag: Some(tag.to_string()),
            text: text.to_string(),
            exact: false,
        }
    }

    /// Exact text match.
    pub fn text_exact(tag: &str, text: &str) -> Self {
        Locator::Text {
            tag: Some(tag.to_string()),
            text: text.to_string(),
            exact: true,
        }
    }

    pub fn position(tag: &str, index: usize) -> Self {
        Locator::Position {
            tag: tag.to_string(),
            index,
        }
    }

    /// Short name of the strategy kind, for diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Locator::Attribute { .. } => "attribute",
            Locator::Text { .. } => "text",
            Locator::Position { .. } => "position",
        }
    }

    /// Substitute `{name}` placeholders in every string field.
    pub fn bind(&self, params: &[(&str, &str)]) -> Locator {
        let sub = |s: &str| substitute(s, params);
        match self {
            Locator::Attribute {
                tag,
                name,
                value,
                contains,
            } => Locator::Attribute {
                tag: tag.as_deref().map(sub),
                name: sub(name),
                value: value.as_deref().map(sub),
                contains: *contains,
            },
            Locator::Text { tag, text, exact } => Locator::Text {
                tag: tag.as_deref().map(sub),
                text: sub(text),
                exact: *exact,
            },
            Locator::Position { tag, index } => Locator::Position {
                tag: sub(tag),
                index: *index,
            },
        }
    }

    /// Compile to an XPath expression.
    ///
    /// Scoped expressions search below a context node (`.//`), unscoped
    /// ones search the whole document.
    pub fn to_xpath(&self, scoped: bool) -> String {
        let axis = if scoped { ".//" } else { "//" };
        match self {
            Locator::Attribute {
                tag,
                name,
                value,
                contains,
            } => {
                let tag = tag.as_deref().unwrap_or("*");
                let predicate = match value {
                    None => format!("@{name}"),
                    Some(v) if *contains => format!("contains(@{name}, {})", xpath_literal(v)),
                    Some(v) => format!("@{name}={}", xpath_literal(v)),
                };
                format!("{axis}{tag}[{predicate}]")
            }
            Locator::Text { tag, text, exact } => {
                let tag = tag.as_deref().unwrap_or("*");
                let literal = xpath_literal(text);
                if *exact {
                    format!("{axis}{tag}[normalize-space(.)={literal}]")
                } else {
                    format!("{axis}{tag}[contains(normalize-space(.), {literal})]")
                }
            }
            Locator::Position { tag, index } => format!("({axis}{tag})[{index}]"),
        }
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Attribute {
                tag,
                name,
                value,
                contains,
            } => {
                let tag = tag.as_deref().unwrap_or("*");
                match value {
                    None => write!(f, "attribute {tag}[{name}]"),
                    Some(v) if *contains => write!(f, "attribute {tag}[{name}~={v:?}]"),
                    Some(v) => write!(f, "attribute {tag}[{name}={v:?}]"),
                }
            }
            Locator::Text { tag, text, exact } => {
                let tag = tag.as_deref().unwrap_or("*");
                let op = if *exact { "=" } else { "~=" };
                write!(f, "text {tag}{op}{text:?}")
            }
            Locator::Position { tag, index } => write!(f, "position {tag}#{index}"),
        }
    }
}

fn substitute(template: &str, params: &[(&str, &str)]) -> String {
    params
        .iter()
        .fold(template.to_string(), |acc, (key, value)| {
            acc.replace(&format!("{{{key}}}"), value)
        })
}

/// Quote a string as an XPath 1.0 literal.
fn xpath_literal(s: &str) -> String {
    if !s.contains('\'') {
        format!("'{s}'")
    } else if !s.contains('"') {
        format!("\"{s}\"")
    } else {
        let parts: Vec<String> = s.split('\'').map(|part| format!("'{part}'")).collect();
        format!("concat({})", parts.join(", \"'\", "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn attribute_xpath() {
        let loc = Locator::attr("input", "formcontrolname", "userid");
        assert_eq!(loc.to_xpath(false), "//input[@formcontrolname='userid']");

        let loc = Locator::attr_contains("input", "placeholder", "From");
        assert_eq!(
            loc.to_xpath(false),
            "//input[contains(@placeholder, 'From')]"
        );

        let loc = Locator::has_attr("required");
        assert_eq!(loc.to_xpath(true), ".//*[@required]");
    }

    #[test]
    fn text_xpath() {
        assert_eq!(
            Locator::text("button", "Search").to_xpath(false),
            "//button[contains(normalize-space(.), 'Search')]"
        );
        assert_eq!(
            Locator::text_exact("strong", "3A").to_xpath(true),
            ".//strong[normalize-space(.)='3A']"
        );
    }

    #[test]
    fn position_xpath() {
        assert_eq!(Locator::position("input", 2).to_xpath(false), "(//input)[2]");
    }

    #[test]
    fn literal_quoting() {
        assert_eq!(xpath_literal("plain"), "'plain'");
        assert_eq!(xpath_literal("it's"), "\"it's\"");
        assert_eq!(
            xpath_literal(r#"it's "x""#),
            r#"concat('it', "'", 's "x"')"#
        );
    }

    #[test]
    fn bind_placeholders() {
        let loc = Locator::attr("div", "id", "{train}-{class}");
        let bound = loc.bind(&[("train", "12301"), ("class", "3A")]);
        assert_eq!(bound, Locator::attr("div", "id", "12301-3A"));
    }

    #[test]
    fn deserialize_table_entries() {
        let json = r#"[
            {"by": "attribute", "tag": "input", "name": "placeholder", "value": "From", "contains": true},
            {"by": "text", "tag": "button", "text": "Search"},
            {"by": "position", "tag": "input", "index": 1}
        ]"#;
        let locators: Vec<Locator> = serde_json::from_str(json).unwrap();
        assert_eq!(locators[0], Locator::attr_contains("input", "placeholder", "From"));
        assert_eq!(locators[1], Locator::text("button", "Search"));
        assert_eq!(locators[2], Locator::position("input", 1));
    }

    #[test]
    fn display_is_readable() {
        assert_eq!(
            Locator::attr("input", "id", "origin").to_string(),
            "attribute input[id=\"origin\"]"
        );
        assert_eq!(Locator::position("input", 3).to_string(), "position input#3");
    }
}
