//! One translation run: parse, collect, render.

use std::path::Path;

use tracing::{debug, info};

use crate::ast::AstProvider;
use crate::collect::{Collector, FnDecl};
use crate::diag::Reporter;
use crate::emit::render_extern_block;
use crate::error::Result;

/// Parse `path` with `provider` and collect its exportable functions.
///
/// Non-fatal diagnostics go to `reporter` as they are raised.
pub fn collect_file(
    provider: &dyn AstProvider,
    path: &Path,
    args: &[String],
    reporter: &mut dyn Reporter,
) -> Result<Vec<FnDecl>> {
    debug!(path = %path.display(), ?args, "parsing translation unit");
    let unit = provider.parse(path, args)?;
    let functions = Collector::collect(&unit.root, reporter)?;
    info!(path = %path.display(), functions = functions.len(), "collected function signatures");
    Ok(functions)
}

/// [`collect_file`], rendered as an `extern` block.
pub fn translate_file(
    provider: &dyn AstProvider,
    path: &Path,
    args: &[String],
    reporter: &mut dyn Reporter,
) -> Result<String> {
    let functions = collect_file(provider, path, args, reporter)?;
    Ok(render_extern_block(&functions))
}
