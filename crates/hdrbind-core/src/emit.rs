//! Rendering of collected signatures as an `extern` block.

use std::fmt::{self, Write as _};
use std::io;

use crate::collect::FnDecl;

/// Spaces before each function line.
pub const INDENT: usize = 4;

impl fmt::Display for FnDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fn {}(", self.name)?;
        for (i, arg) in self.args.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}: {}", arg.name, arg.ty)?;
        }
        write!(f, ")")?;
        if self.return_type != "void" {
            write!(f, " -> {}", self.return_type)?;
        }
        write!(f, ";")
    }
}

/// Render `fns` as an `extern` block. An empty list renders as nothing.
pub fn render_extern_block(fns: &[FnDecl]) -> String {
    let mut out = String::new();
    if fns.is_empty() {
        return out;
    }
    out.push_str("extern {\n");
    for decl in fns {
        let _ = writeln!(out, "{:indent$}{decl}", "", indent = INDENT);
    }
    out.push_str("}\n");
    out
}

/// Write the `extern` block for `fns` to `sink`.
pub fn write_extern_block<W: io::Write>(fns: &[FnDecl], sink: &mut W) -> io::Result<()> {
    sink.write_all(render_extern_block(fns).as_bytes())
}
