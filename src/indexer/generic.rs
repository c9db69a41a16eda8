use crate::indexer::plugin::{LanguagePlugin, ParseContext, ParsedFile};

/// Catch-all for extensions no structural parser owns. The pipeline still
/// records a file entity for these, so the graph covers the whole tree.
pub struct GenericPlugin;

impl LanguagePlugin for GenericPlugin {
    fn language(&self) -> &'static str {
        "text"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &[]
    }

    fn parse_file(&self, _ctx: &ParseContext<'_>) -> ParsedFile {
        ParsedFile::default()
    }
}
