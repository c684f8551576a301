//! Test-only harness: parse a source string and run rules against it,
//! mirroring the real single-worker pipeline closely enough for rule unit
//! tests without pulling in the orchestrator.

#![cfg(test)]

use std::path::{Path, PathBuf};
use std::sync::Arc;

use swc_common::SourceMap;

use crate::context::{create_context, run_rules};
use crate::messages::Language;
use crate::parser::{Parser, SwcParser};
use crate::reporter::{FileScanResult, Reporter};
use crate::rule::Rule;
use crate::source_index::SourceIndex;

pub(crate) fn scan_with_rules(source: &str, file_name: &str, rules: &[Rule]) -> FileScanResult {
    let source_map: Arc<SourceMap> = Default::default();
    let path: PathBuf = Path::new(file_name).to_path_buf();
    let ast = SwcParser
        .parse(&source_map, source, &path)
        .expect("test fixture must parse");
    let source_index = SourceIndex::build(source, ast.module_start);
    let reporter = Reporter::new(path.clone(), source, &source_index);
    let ctx = create_context(&ast, &path, source, Language::En, reporter);
    run_rules(&ctx, rules)
}
