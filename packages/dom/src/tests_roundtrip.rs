//! Parse → serialize → parse stability over realistic template markup

use crate::{parse, selector, serialize};

const FIXTURES: &[&str] = &[
    "<p>Hello</p>",
    "<div class=\"mc-root\"><div class=\"mc-placeholder\" contenteditable=\"false\" data-mc-inert=\"true\">Drop content here</div></div>",
    r#"<!DOCTYPE html>
<html>
  <head>
    <meta charset="utf-8">
    <style id="mc-styles">.mc-el-a-1 { padding: 8px; }</style>
  </head>
  <body>
    <table class="mc-root" role="presentation" width="100%">
      <tr>
        <td class="mc-content">
          <h1 class="mc-el-a-1">Welcome</h1>
          <p>Line one<br>line two &amp; more</p>
          <img src="https://cdn.example.com/logo.png" alt="Logo">
        </td>
      </tr>
    </table>
  </body>
</html>"#,
    "<ul><li>one<li>two</ul><p>unclosed<div>block</div>",
    "<table><tr><td>a</td></tr><p>foster</p></table>",
    "<!-- note --><section><template><b>t</b></template></section>",
    "<a href=\"?a=1&b=2\" title='x \"y\"'>q</a>",
    "<pre>\nkept</pre><textarea>\n\nx</textarea>",
    "<noscript><b>x</b> &amp; y</noscript>",
];

#[test]
fn test_serialization_is_idempotent() {
    for fixture in FIXTURES {
        let once = serialize(&parse(fixture));
        let twice = serialize(&parse(&once));
        assert_eq!(once, twice, "fixture: {fixture}");
    }
}

#[test]
fn test_noscript_text_is_not_escaped_again() {
    let once = serialize(&parse("<noscript><b>x</b> &amp; y</noscript>"));
    assert!(once.contains("<noscript><b>x</b> &amp; y</noscript>"), "{once}");
    assert_eq!(serialize(&parse(&once)), once);
}

#[test]
fn test_reparse_keeps_tree_shape() {
    for fixture in FIXTURES {
        let first = parse(fixture);
        let second = parse(&serialize(&first));

        let shape = |tree: &crate::Tree| -> Vec<Option<String>> {
            tree.descendants(tree.document())
                .into_iter()
                .filter(|id| tree.is_element(*id))
                .map(|id| tree.tag(id).map(str::to_string))
                .collect()
        };
        assert_eq!(shape(&first), shape(&second), "fixture: {fixture}");
    }
}

#[test]
fn test_selectors_are_snapshot_stable() {
    for fixture in FIXTURES {
        let tree = parse(fixture);
        for node in tree.find_all(tree.document(), |t, id| t.is_element(id)) {
            if let Some(sel) = selector::generate(&tree, node) {
                assert_eq!(selector::resolve(&tree, &sel), Some(node), "{sel} in {fixture}");

                let reparsed: selector::Selector = sel.to_string().parse().expect("reparse");
                assert_eq!(reparsed, sel);
            }
        }
    }
}
