use super::Converter;
use crate::codec;
use crate::error::ExportError;
use crate::node::EditorState;

/// The wire format itself, pretty-printed.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonConverter;

impl Converter for JsonConverter {
    fn finish(&mut self) -> String {
        String::new()
    }

    fn convert(&mut self, state: &EditorState) -> Result<String, ExportError> {
        Ok(codec::encode_pretty(state)?)
    }
}

#[cfg(test)]
mod tests {
    use crate::codec;
    use crate::export::{ExportFormat, export};
    use crate::node::*;

    #[test]
    fn export_decodes_back() {
        let state = EditorState::new(Root::new(vec![
            Paragraph::new(vec![Text::plain("hi").into()]).into(),
        ]))
        .unwrap();
        let json = export(&state, ExportFormat::Json).unwrap();
        assert!(json.contains('\n'));
        assert_eq!(codec::decode(&json).unwrap(), state);
    }
}
