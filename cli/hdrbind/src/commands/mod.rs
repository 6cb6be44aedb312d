//! CLI command implementations.

pub mod init;
pub mod inspect;
pub mod translate;

use std::path::Path;

use anyhow::Result;
use hdrbind_core::ast::AstProvider;
use hdrbind_core::flags::compiler_args_from_env;
use hdrbind_frontend::HeaderParser;

use crate::config::{Frontend, HdrbindConfig};

/// The AST provider for `frontend`.
pub(crate) fn provider(frontend: Frontend) -> Result<Box<dyn AstProvider>> {
    tracing::debug!(?frontend, "selecting front end");
    let provider: Box<dyn AstProvider> = match frontend {
        Frontend::Builtin => Box::new(HeaderParser::new()),
        Frontend::Libclang => hdrbind_frontend::libclang_provider()?,
    };
    Ok(provider)
}

/// Flags for one run: config flags, then command-line flags, then the
/// environment.
pub(crate) fn compiler_args(config: &HdrbindConfig, config_dir: &Path, cli_flags: &[String]) -> Vec<String> {
    let mut base = config.flags(config_dir);
    base.extend(cli_flags.iter().cloned());
    compiler_args_from_env(&base)
}
