use super::{Context, Converter, Phase};
use crate::error::ExportError;
use crate::node::{Heading, Link, List, ListItem, NodeKind, Paragraph, Quote, Tab, Text};

/// Text content only: one line per line block, formatting dropped.
#[derive(Debug, Default)]
pub struct PlainTextConverter {
    lines: Vec<String>,
    line: String,
}

impl PlainTextConverter {
    pub fn new() -> Self {
        Self::default()
    }

    fn end_line(&mut self) {
        self.lines.push(std::mem::take(&mut self.line));
    }
}

impl Converter for PlainTextConverter {
    fn finish(&mut self) -> String {
        std::mem::take(&mut self.lines).join("\n")
    }

    fn heading(&mut self, _node: &Heading, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Leave {
            self.end_line();
        }
        Ok(())
    }

    fn quote(&mut self, node: &Quote, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        let ends_inline = node.children.last().is_some_and(|c| c.kind().is_inline());
        if phase == Phase::Leave && ends_inline {
            self.end_line();
        }
        Ok(())
    }

    fn paragraph(&mut self, _node: &Paragraph, phase: Phase, cx: &Context<'_>) -> Result<(), ExportError> {
        let pending = phase == Phase::Enter && cx.inside(NodeKind::Quote) && !self.line.is_empty();
        if phase == Phase::Leave || pending {
            self.end_line();
        }
        Ok(())
    }

    fn list(&mut self, _node: &List, _phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        Ok(())
    }

    fn list_item(&mut self, node: &ListItem, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Leave && node.nested_list().is_none() {
            self.end_line();
        }
        Ok(())
    }

    fn link(&mut self, _node: &Link, _phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        Ok(())
    }

    fn text(&mut self, node: &Text, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Enter {
            self.line.push_str(&node.text);
        }
        Ok(())
    }

    fn tab(&mut self, _node: &Tab, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Enter {
            self.line.push('\t');
        }
        Ok(())
    }

    fn line_break(&mut self, phase: Phase, _cx: &Context<'_>) -> Result<(), ExportError> {
        if phase == Phase::Enter {
            self.line.push('\n');
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::export::{ExportFormat, export};
    use crate::node::*;

    fn plain(children: Vec<Node>) -> String {
        let state = EditorState::new(Root::new(children)).unwrap();
        export(&state, ExportFormat::PlainText).unwrap()
    }

    #[test]
    fn empty_document() {
        assert_eq!(plain(vec![]), "");
    }

    #[test]
    fn one_line_per_block() {
        let bold = TextFormat::empty().with(TextStyle::Bold);
        assert_eq!(
            plain(vec![
                Heading::new(HeadingTag::H1, vec![Text::plain("Title").into()]).into(),
                Paragraph::new(vec![
                    Text::plain("some ").into(),
                    Text::new("bold", bold).into(),
                ])
                .into(),
                Paragraph::new(vec![]).into(),
            ]),
            "Title\nsome bold\n"
        );
    }

    #[test]
    fn lists_quotes_and_breaks() {
        let inner = List::build(
            ListType::Bullet,
            1,
            vec![ListItem::new(vec![Text::plain("b").into()])],
        );
        let list = List::build(
            ListType::Number,
            1,
            vec![
                ListItem::new(vec![Text::plain("a").into()]),
                ListItem::nested(inner),
            ],
        );
        let quote = Quote::new(vec![
            Text::plain("x").into(),
            Node::LineBreak,
            Link::new("https://e.com", vec![Text::plain("y").into()]).into(),
            Tab::new().into(),
        ]);
        assert_eq!(plain(vec![list.into(), quote.into()]), "a\nb\nx\ny\t");
    }

    #[test]
    fn quote_mixing_inline_and_paragraphs() {
        let quote = Quote::new(vec![
            Text::plain("a").into(),
            Paragraph::new(vec![Text::plain("b").into()]).into(),
        ]);
        assert_eq!(plain(vec![quote.into()]), "a\nb");
    }
}
