//! `hdrbind inspect`: show the declaration tree a front end produces.

use std::fmt::Write as _;
use std::path::Path;

use anyhow::{Context, Result};
use hdrbind_core::ast::{Node, StorageClass};

use crate::config::{Frontend, HdrbindConfig};

pub fn run(
    config: &HdrbindConfig,
    config_dir: &Path,
    header: &Path,
    flags: &[String],
    frontend: Option<Frontend>,
    json: bool,
) -> Result<()> {
    let frontend = frontend.or(config.parse.frontend).unwrap_or_default();
    let provider = super::provider(frontend)?;
    let args = super::compiler_args(config, config_dir, flags);
    let unit = provider.parse(header, &args)?;

    if json {
        let text = serde_json::to_string_pretty(&unit.root).context("serializing declaration tree")?;
        println!("{text}");
    } else {
        print!("{}", describe(&unit.root));
    }
    Ok(())
}

/// One line per node, children indented below their parent.
pub(crate) fn describe(root: &Node) -> String {
    let mut out = String::new();
    describe_into(root, 0, &mut out);
    out
}

fn describe_into(node: &Node, depth: usize, out: &mut String) {
    let _ = write!(out, "{:indent$}{}", "", node.kind, indent = depth * 2);
    if !node.spelling.is_empty() {
        let _ = write!(out, " `{}`", node.spelling);
    }
    if depth > 0 {
        let _ = write!(out, " <{}>", node.location);
    }
    if node.storage != StorageClass::None {
        let _ = write!(out, " {:?}", node.storage);
    }
    out.push('\n');
    for child in &node.children {
        describe_into(child, depth + 1, out);
    }
}
