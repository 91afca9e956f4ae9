//! `padding` / `margin` shorthand handling
//!
//! The style editor shows one field per side, so shorthands are expanded to
//! longhands when a rule is read and collapsed back to the shortest shorthand
//! when all four sides are present on save.

use crate::declarations::{split_top_level, Declaration, DeclarationList};

const BOX_PROPERTIES: [&str; 2] = ["padding", "margin"];
const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

/// Four side values of a box shorthand
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoxSides {
    pub top: String,
    pub right: String,
    pub bottom: String,
    pub left: String,
}

impl BoxSides {
    /// Expand a 1–4 token shorthand value
    ///
    /// 1 → all; 2 → vertical/horizontal; 3 → top/horizontal/bottom;
    /// 4 → top/right/bottom/left. Anything else is not a box value.
    pub fn expand(value: &str) -> Option<Self> {
        let tokens = split_top_level(value, ' ')
            .into_iter()
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>();
        let (top, right, bottom, left) = match tokens.as_slice() {
            [a] => (*a, *a, *a, *a),
            [v, h] => (*v, *h, *v, *h),
            [t, h, b] => (*t, *h, *b, *h),
            [t, r, b, l] => (*t, *r, *b, *l),
            _ => return None,
        };
        Some(Self {
            top: top.to_string(),
            right: right.to_string(),
            bottom: bottom.to_string(),
            left: left.to_string(),
        })
    }

    /// Shortest shorthand value describing these sides
    pub fn collapse(&self) -> String {
        let Self {
            top,
            right,
            bottom,
            left,
        } = self;
        if right == left {
            if top == bottom {
                if top == right {
                    return top.clone();
                }
                return format!("{} {}", top, right);
            }
            return format!("{} {} {}", top, right, bottom);
        }
        format!("{} {} {} {}", top, right, bottom, left)
    }

    fn values(&self) -> [&str; 4] {
        [&self.top, &self.right, &self.bottom, &self.left]
    }
}

/// Replace `padding`/`margin` shorthands with their four longhands
///
/// Longhands take the shorthand's position. Later declarations still win, so a
/// longhand written after the shorthand overrides the expanded side.
pub fn expand_box_shorthands(list: &DeclarationList) -> DeclarationList {
    let mut out = DeclarationList::new();
    for decl in list {
        let expanded = BOX_PROPERTIES
            .contains(&decl.property.as_str())
            .then(|| BoxSides::expand(&decl.value))
            .flatten();
        match expanded {
            Some(sides) => {
                for (side, value) in SIDES.iter().zip(sides.values()) {
                    let mut longhand = Declaration::new(format!("{}-{}", decl.property, side), value);
                    longhand.important = decl.important;
                    out.push(longhand);
                }
            }
            None => out.push(decl.clone()),
        }
    }
    out
}

/// Collapse complete sets of side longhands back into a shorthand
///
/// Sets are only collapsed when all four sides exist and agree on
/// `!important`. The shorthand lands where the first longhand was.
pub fn collapse_box_shorthands(list: &DeclarationList) -> DeclarationList {
    let mut decls = list.clone().into_vec();

    for property in BOX_PROPERTIES {
        let longhands: Vec<Option<&Declaration>> = SIDES
            .iter()
            .map(|side| {
                let name = format!("{}-{}", property, side);
                decls.iter().find(|d| d.property == name)
            })
            .collect();
        let Some(found) = longhands.into_iter().collect::<Option<Vec<_>>>() else {
            continue;
        };
        let important = found[0].important;
        if found.iter().any(|d| d.important != important) {
            continue;
        }

        let sides = BoxSides {
            top: found[0].value.clone(),
            right: found[1].value.clone(),
            bottom: found[2].value.clone(),
            left: found[3].value.clone(),
        };
        let mut shorthand = Declaration::new(property, sides.collapse());
        shorthand.important = important;

        let prefix = format!("{}-", property);
        let is_side = |d: &Declaration| {
            d.property
                .strip_prefix(&prefix)
                .is_some_and(|side| SIDES.contains(&side))
        };
        decls.retain(|d| d.property != property);
        let Some(first) = decls.iter().position(is_side) else {
            continue;
        };
        let mut collapsed = Vec::with_capacity(decls.len());
        for (i, decl) in decls.into_iter().enumerate() {
            if i == first {
                collapsed.push(shorthand.clone());
            }
            if !is_side(&decl) {
                collapsed.push(decl);
            }
        }
        decls = collapsed;
    }

    let mut out = DeclarationList::new();
    out.replace_all(decls);
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_expand_token_counts() {
        let one = BoxSides::expand("4px").unwrap();
        assert_eq!(one.values(), ["4px", "4px", "4px", "4px"]);

        let two = BoxSides::expand("4px 8px").unwrap();
        assert_eq!(two.values(), ["4px", "8px", "4px", "8px"]);

        let three = BoxSides::expand("1px 2px 3px").unwrap();
        assert_eq!(three.values(), ["1px", "2px", "3px", "2px"]);

        let four = BoxSides::expand("1px 2px 3px 4px").unwrap();
        assert_eq!(four.values(), ["1px", "2px", "3px", "4px"]);

        assert!(BoxSides::expand("").is_none());
        assert!(BoxSides::expand("1px 2px 3px 4px 5px").is_none());
    }

    #[test]
    fn test_expand_keeps_function_values_whole() {
        let sides = BoxSides::expand("calc(1px + 2px) 0").unwrap();
        assert_eq!(sides.top, "calc(1px + 2px)");
        assert_eq!(sides.right, "0");
    }

    #[test]
    fn test_collapse_is_shortest() {
        for (input, expected) in [
            ("4px", "4px"),
            ("4px 8px", "4px 8px"),
            ("4px 8px 4px 8px", "4px 8px"),
            ("1px 2px 3px", "1px 2px 3px"),
            ("1px 2px 3px 2px", "1px 2px 3px"),
            ("1px 2px 3px 4px", "1px 2px 3px 4px"),
        ] {
            assert_eq!(BoxSides::expand(input).unwrap().collapse(), expected, "{input}");
        }
    }

    #[test]
    fn test_expand_list_for_editing() {
        let list = DeclarationList::parse("color: red; padding: 4px 8px; margin-top: 2px");
        let expanded = expand_box_shorthands(&list);
        assert_eq!(
            expanded.to_css(),
            "color: red; padding-top: 4px; padding-right: 8px; padding-bottom: 4px; padding-left: 8px; margin-top: 2px;"
        );
    }

    #[test]
    fn test_collapse_list_on_save() {
        let list = DeclarationList::parse(
            "color: red; padding-top: 4px; padding-right: 8px; padding-bottom: 4px; padding-left: 8px; margin-top: 2px",
        );
        let collapsed = collapse_box_shorthands(&list);
        assert_eq!(collapsed.to_css(), "color: red; padding: 4px 8px; margin-top: 2px;");
    }

    #[test]
    fn test_expand_then_collapse_restores_shorthand() {
        let list = DeclarationList::parse("padding: 8px; margin: 0 auto !important");
        let restored = collapse_box_shorthands(&expand_box_shorthands(&list));
        assert_eq!(restored, list);
    }

    #[test]
    fn test_mixed_important_is_not_collapsed() {
        let list = DeclarationList::parse(
            "margin-top: 1px !important; margin-right: 1px; margin-bottom: 1px; margin-left: 1px",
        );
        assert_eq!(collapse_box_shorthands(&list), list);
    }
}
