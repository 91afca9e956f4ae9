//! The embedded stylesheet
//!
//! Rules are keyed by selector and kept in document order. Text that is not a
//! plain `selector { declarations }` rule (at-rules, comments) is stored as a
//! raw item and written back unchanged.

use crate::declarations::DeclarationList;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StyleRule {
    pub selector: String,
    pub declarations: DeclarationList,
}

impl StyleRule {
    pub fn to_css(&self) -> String {
        if self.declarations.is_empty() {
            format!("{} {{ }}", self.selector)
        } else {
            format!("{} {{ {} }}", self.selector, self.declarations.to_css())
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SheetItem {
    Rule(StyleRule),
    Raw(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSheet {
    items: Vec<SheetItem>,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse style element text. Never fails; an unterminated block runs to the end.
    pub fn parse(css: &str) -> Self {
        let mut items = Vec::new();
        let mut rest = css;

        loop {
            rest = rest.trim_start();
            if rest.is_empty() {
                break;
            }

            if rest.starts_with("/*") {
                let end = rest.find("*/").map(|i| i + 2).unwrap_or(rest.len());
                items.push(SheetItem::Raw(rest[..end].to_string()));
                rest = &rest[end..];
                continue;
            }

            let Some(open) = find_outside_strings(rest, '{') else {
                // Trailing text without a block, e.g. `@import url(x);`
                items.push(SheetItem::Raw(rest.trim().to_string()));
                break;
            };

            let prelude = rest[..open].trim();
            if prelude.starts_with('@') {
                if let Some(semi) = find_outside_strings(&rest[..open], ';') {
                    // Statement at-rule ending before the next block
                    items.push(SheetItem::Raw(rest[..=semi].trim().to_string()));
                    rest = &rest[semi + 1..];
                    continue;
                }
            }

            let close = matching_brace(rest, open).unwrap_or(rest.len());
            let body_end = close.min(rest.len());
            let body = &rest[open + 1..body_end];
            let consumed = (close + 1).min(rest.len());

            if prelude.starts_with('@') {
                items.push(SheetItem::Raw(rest[..consumed].trim().to_string()));
            } else if !prelude.is_empty() {
                items.push(SheetItem::Rule(StyleRule {
                    selector: normalize_selector(prelude),
                    declarations: DeclarationList::parse(body),
                }));
            }
            rest = &rest[consumed..];
        }

        Self { items }
    }

    pub fn items(&self) -> &[SheetItem] {
        &self.items
    }

    pub fn rules(&self) -> impl Iterator<Item = &StyleRule> {
        self.items.iter().filter_map(|item| match item {
            SheetItem::Rule(rule) => Some(rule),
            SheetItem::Raw(_) => None,
        })
    }

    pub fn rule(&self, selector: &str) -> Option<&StyleRule> {
        let selector = normalize_selector(selector);
        self.rules().find(|r| r.selector == selector)
    }

    pub fn contains(&self, selector: &str) -> bool {
        self.rule(selector).is_some()
    }

    /// Replace the rule for `selector` in place, or append a new one
    pub fn upsert(&mut self, selector: &str, declarations: DeclarationList) {
        let selector = normalize_selector(selector);
        for item in &mut self.items {
            if let SheetItem::Rule(rule) = item {
                if rule.selector == selector {
                    rule.declarations = declarations;
                    return;
                }
            }
        }
        self.items.push(SheetItem::Rule(StyleRule {
            selector,
            declarations,
        }));
    }

    /// Remove every rule keyed by `selector`; returns whether anything was removed
    pub fn remove(&mut self, selector: &str) -> bool {
        let selector = normalize_selector(selector);
        let before = self.items.len();
        self.items
            .retain(|item| !matches!(item, SheetItem::Rule(rule) if rule.selector == selector));
        self.items.len() != before
    }

    pub fn rule_count(&self) -> usize {
        self.rules().count()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// One item per line. `</` is written as `<\/` so the text cannot close
    /// the style element it is stored in.
    pub fn to_css(&self) -> String {
        self.items
            .iter()
            .map(|item| match item {
                SheetItem::Rule(rule) => rule.to_css(),
                SheetItem::Raw(raw) => raw.clone(),
            })
            .collect::<Vec<_>>()
            .join("\n")
            .replace("</", "<\\/")
    }
}

/// Collapse whitespace so `.a  >  b` and `.a > b` key the same rule
fn normalize_selector(selector: &str) -> String {
    selector.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn find_outside_strings(text: &str, target: char) -> Option<usize> {
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, ch) in text.char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            c if c == target => return Some(i),
            _ => {}
        }
    }
    None
}

/// Index of the `}` closing the block opened at `open`
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    let mut quote: Option<char> = None;
    let mut escaped = false;
    for (i, ch) in text[open..].char_indices() {
        if let Some(q) = quote {
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == q {
                quote = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => quote = Some(ch),
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rules_in_order() {
        let sheet = StyleSheet::parse(".mc-el-a-1 { color: red; } .mc-el-a-2{padding:4px}");
        let selectors: Vec<_> = sheet.rules().map(|r| r.selector.as_str()).collect();
        assert_eq!(selectors, vec![".mc-el-a-1", ".mc-el-a-2"]);
        assert_eq!(
            sheet.rule(".mc-el-a-2").unwrap().declarations.get("padding"),
            Some("4px")
        );
    }

    #[test]
    fn test_upsert_replaces_in_place() {
        let mut sheet = StyleSheet::parse(".a { color: red; }\n.b { color: blue; }");
        sheet.upsert(".a", DeclarationList::parse("color: green"));
        sheet.upsert(".c", DeclarationList::parse("margin: 0"));
        assert_eq!(
            sheet.to_css(),
            ".a { color: green; }\n.b { color: blue; }\n.c { margin: 0; }"
        );
        assert_eq!(sheet.rule_count(), 3);
    }

    #[test]
    fn test_remove_rule() {
        let mut sheet = StyleSheet::parse(".a { color: red; } .b { color: blue; }");
        assert!(sheet.remove(".a"));
        assert!(!sheet.remove(".a"));
        assert_eq!(sheet.to_css(), ".b { color: blue; }");
    }

    #[test]
    fn test_at_rules_and_comments_are_preserved() {
        let css = "@import url(\"fonts.css\");\n/* brand */\n.a { color: red; }\n@media (max-width: 600px) { .a { color: blue; } }";
        let sheet = StyleSheet::parse(css);
        assert_eq!(sheet.items().len(), 4);
        assert_eq!(sheet.rule_count(), 1);
        assert_eq!(sheet.to_css(), css);
    }

    #[test]
    fn test_braces_inside_strings() {
        let sheet = StyleSheet::parse(r#".a::after { content: "}"; color: red; } .b { margin: 0; }"#);
        assert_eq!(sheet.rule_count(), 2);
        assert_eq!(sheet.rule(".a::after").unwrap().declarations.get("color"), Some("red"));
    }

    #[test]
    fn test_unterminated_block() {
        let sheet = StyleSheet::parse(".a { color: red");
        assert_eq!(sheet.rule(".a").unwrap().declarations.get("color"), Some("red"));
    }

    #[test]
    fn test_output_cannot_close_the_style_element() {
        let sheet = StyleSheet::parse("/* </style><script>alert(1)</script> */\n.a { color: red; }");
        let css = sheet.to_css();
        assert!(!css.contains("</"));
        assert!(css.contains("<\\/style>"));
        assert_eq!(sheet.rule(".a").unwrap().declarations.get("color"), Some("red"));
    }

    #[test]
    fn test_selector_whitespace_is_normalized() {
        let sheet = StyleSheet::parse("td  >  p { margin: 0; }");
        assert!(sheet.contains("td > p"));
    }
}
