use editor_state::export::{ExportFormat, export};
use editor_state::{codec, convert_markdown, from_markdown};

const NOTES: &str = "---
title: Notes
---

# Shopping

Buy **fresh** bread and *ripe* tomatoes.

> Never go hungry.

1. Bakery
2. Market
   - Tomatoes
   - Basil

- [x] List written
- [ ] Groceries bought
";

#[test]
fn markdown_survives_import_and_export() {
    let state = from_markdown(NOTES).unwrap();
    let markdown = export(&state, ExportFormat::Markdown).unwrap();
    assert_eq!(
        markdown,
        "# Shopping\n\n\
         Buy **fresh** bread and *ripe* tomatoes.\n\n\
         > Never go hungry.\n\n\
         1. Bakery\n\
         2. Market\n    \
         - Tomatoes\n    \
         - Basil\n\n\
         - [x] List written\n\
         - [ ] Groceries bought"
    );

    // A second pass changes nothing
    assert_eq!(from_markdown(&markdown).unwrap(), state);
}

#[test]
fn imported_state_round_trips_through_json() {
    let state = from_markdown(NOTES).unwrap();
    let json = codec::encode(&state).unwrap();
    assert_eq!(codec::decode(&json).unwrap(), state);
}

#[test]
fn markdown_to_html() {
    assert_eq!(
        convert_markdown("Some `code` and [a link](https://e.com).", ExportFormat::Html).unwrap(),
        "<p>Some <code>code</code> and <a href=\"https://e.com\">a link</a>.</p>"
    );
}
