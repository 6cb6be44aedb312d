//! `hdrbind translate`: header in, `extern` block (or JSON) out.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use hdrbind_core::ast::AstProvider;
use hdrbind_core::diag::{Reporter, StderrReporter};
use hdrbind_core::{collect_file, render_extern_block};

use crate::config::{Frontend, HdrbindConfig, OutputFormat};

/// Command-line options; unset ones fall back to the config file.
#[derive(Debug, Default)]
pub struct TranslateOptions {
    pub header: PathBuf,
    pub flags: Vec<String>,
    pub format: Option<OutputFormat>,
    pub output: Option<PathBuf>,
    pub frontend: Option<Frontend>,
}

pub fn run(config: &HdrbindConfig, config_dir: &Path, options: TranslateOptions) -> Result<()> {
    let frontend = options.frontend.or(config.parse.frontend).unwrap_or_default();
    let format = options.format.or(config.output.format).unwrap_or_default();
    let output = options
        .output
        .or_else(|| config.output.path.as_ref().map(|path| config_dir.join(path)));

    let provider = super::provider(frontend)?;
    let args = super::compiler_args(config, config_dir, &options.flags);
    let mut reporter = StderrReporter::new();
    // Rendered in full first: a failed run leaves no partial output behind.
    let rendered = render(provider.as_ref(), &options.header, &args, format, &mut reporter)?;
    tracing::info!(warnings = reporter.reported(), "translation finished");

    match output {
        Some(path) => {
            fs::write(&path, rendered).with_context(|| format!("writing {}", path.display()))?;
        }
        None => {
            let mut stdout = std::io::stdout().lock();
            stdout.write_all(rendered.as_bytes()).context("writing to stdout")?;
            stdout.flush().context("writing to stdout")?;
        }
    }
    Ok(())
}

/// Parse `header`, collect its functions and format them.
pub(crate) fn render(
    provider: &dyn AstProvider,
    header: &Path,
    args: &[String],
    format: OutputFormat,
    reporter: &mut dyn Reporter,
) -> Result<String> {
    let functions = collect_file(provider, header, args, reporter)?;
    Ok(match format {
        OutputFormat::Extern => render_extern_block(&functions),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(&functions).context("serializing functions")?;
            json.push('\n');
            json
        }
    })
}
