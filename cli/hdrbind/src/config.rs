//! `hdrbind.toml` parsing.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// File name searched for by [`HdrbindConfig::find_and_load`].
pub const CONFIG_FILE: &str = "hdrbind.toml";

/// Project-level defaults for `hdrbind` runs. Every section is optional.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HdrbindConfig {
    #[serde(default)]
    pub parse: ParseConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// How headers are parsed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ParseConfig {
    /// Compiler flags passed before any given on the command line.
    #[serde(default)]
    pub flags: Vec<String>,
    /// Directories added with `-I`. Relative paths are taken from the
    /// directory holding the config file.
    #[serde(default)]
    pub include_dirs: Vec<PathBuf>,
    /// Macros added with `-D`, as `NAME` or `NAME=VALUE`.
    #[serde(default)]
    pub defines: Vec<String>,
    #[serde(default)]
    pub frontend: Option<Frontend>,
}

/// Where and how results are written.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    #[serde(default)]
    pub format: Option<OutputFormat>,
    /// Output file; stdout when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

/// AST provider selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Frontend {
    /// The built-in header parser.
    #[default]
    Builtin,
    /// libclang (requires the `libclang` build feature).
    Libclang,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// An `extern` block.
    #[default]
    Extern,
    /// The collected functions as JSON.
    Json,
}

impl HdrbindConfig {
    /// Search upward from `start_dir` for `hdrbind.toml`, parse it and
    /// return it along with the directory it was found in.
    pub fn find_and_load(start_dir: &Path) -> Result<Option<(Self, PathBuf)>> {
        let mut dir = start_dir.to_path_buf();
        loop {
            let candidate = dir.join(CONFIG_FILE);
            if candidate.is_file() {
                let config = Self::load(&candidate)?;
                return Ok(Some((config, dir)));
            }
            if !dir.pop() {
                break;
            }
        }
        Ok(None)
    }

    /// Parse the config file at `path`.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    #[cfg(test)]
    pub fn from_str(s: &str) -> Result<Self> {
        toml::from_str(s).context("parsing hdrbind.toml")
    }

    /// Compiler flags contributed by the config: `flags` as written, then
    /// one `-I` per include directory, then one `-D` per define.
    pub fn flags(&self, config_dir: &Path) -> Vec<String> {
        let parse = &self.parse;
        let includes = parse
            .include_dirs
            .iter()
            .map(|dir| format!("-I{}", config_dir.join(dir).display()));
        let defines = parse.defines.iter().map(|define| format!("-D{define}"));
        parse.flags.iter().cloned().chain(includes).chain(defines).collect()
    }

    /// Generate the default template for `hdrbind init`.
    pub fn template() -> String {
        format!(
            r#"# hdrbind configuration. Every setting here can be overridden on the
# command line; flags from {env} are appended last.

[parse]
# Compiler flags passed to the front end before any --flag arguments.
flags = []
# Directories passed as -I, relative to this file.
include-dirs = []
# Macros passed as -D.
defines = []
# "builtin" or "libclang".
frontend = "builtin"

[output]
# "extern" or "json".
format = "extern"
# Uncomment to write to a file instead of stdout.
# path = "bindings.rs"
"#,
            env = hdrbind_core::flags::CFLAGS_ENV
        )
    }
}
