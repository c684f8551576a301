//! Parser adapter (C9): the narrow contract the core consumes instead of a
//! concrete parser. `spec.md` treats the parser as an external collaborator
//! that returns "a typed syntax tree with source spans" — `Parser` is that
//! boundary, and `SwcParser` is the shipped implementation built on swc.

use std::path::Path;
use std::sync::Arc;

use swc_common::{FileName, SourceMap};
use swc_ecma_ast::Module;
use swc_ecma_parser::{Parser as SwcModuleParser, StringInput, Syntax, TsSyntax};

/// A parsed file: its AST plus the byte offset at which its own source text
/// begins within the `SourceMap` spans it was parsed against.
///
/// `module_start` is `spec.md`'s `moduleStart`: every span on `module` is a
/// byte offset relative to the start of the whole `SourceMap`, not relative
/// to this file, since a `SourceMap` concatenates source files as they are
/// registered.
pub struct Ast {
    pub module: Module,
    pub module_start: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("{0}")]
    Syntax(String),
}

/// Narrow parser contract. Implementations must not panic; a malformed file
/// is a `ParseError`, not a crash.
pub trait Parser {
    fn parse(&self, source_map: &Arc<SourceMap>, source: &str, file_path: &Path) -> Result<Ast, ParseError>;
}

/// Default parser: swc's TypeScript/JSX grammar, used uniformly for
/// `.ts`/`.tsx`/`.js`/`.jsx` (see SPEC_FULL.md §4.9 for why the grammar is
/// not branched per extension).
pub struct SwcParser;

impl Parser for SwcParser {
    fn parse(&self, source_map: &Arc<SourceMap>, source: &str, file_path: &Path) -> Result<Ast, ParseError> {
        let source_file =
            source_map.new_source_file(FileName::Real(file_path.to_path_buf()).into(), source.to_string());
        let module_start = source_file.start_pos.0;

        // TypeScript's grammar is a superset of JS/JSX, so one syntax config
        // handles .ts/.tsx/.js/.jsx alike without branching on extension.
        let syntax = Syntax::Typescript(TsSyntax {
            tsx: true,
            decorators: true,
            ..Default::default()
        });

        let mut parser = SwcModuleParser::new(syntax, StringInput::from(&*source_file), None);
        let module = parser
            .parse_module()
            .map_err(|e| ParseError::Syntax(format!("{e:?}")))?;

        Ok(Ast { module, module_start })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn parses_a_simple_module() {
        let source_map: Arc<SourceMap> = Default::default();
        let ast = SwcParser
            .parse(&source_map, "const x = 1;\n", &PathBuf::from("a.ts"))
            .unwrap();
        assert_eq!(ast.module.body.len(), 1);
    }

    #[test]
    fn reports_syntax_errors_without_panicking() {
        let source_map: Arc<SourceMap> = Default::default();
        let result = SwcParser.parse(&source_map, "const = = =;\n", &PathBuf::from("a.ts"));
        assert!(result.is_err());
    }

    #[test]
    fn parses_tsx_jsx() {
        let source_map: Arc<SourceMap> = Default::default();
        let ast = SwcParser
            .parse(&source_map, "const el = <div>hi</div>;\n", &PathBuf::from("a.tsx"))
            .unwrap();
        assert_eq!(ast.module.body.len(), 1);
    }
}
