//! Type classification: C type descriptors to target type expressions.
//!
//! The output is the textual spelling used in the emitted `extern` block,
//! e.g. `*const u8`, `[i32; 4]` or a bare record name.

use tracing::trace;

use crate::descriptor::{CharKind, FloatKind, IntWidth, Signedness, TypeDescriptor};
use crate::diag::{Reporter, SourceLocation};
use crate::error::{BindError, Result};
use crate::names::strip_prefixes;

/// Deepest type nesting the classifier will follow.
pub const MAX_DEPTH: usize = 256;

/// Stand-in for function types, which are not translated.
pub const FUNCTION_PLACEHOLDER: &str = "*const u8";

/// Classify `ty`, attributing diagnostics to `location`.
///
/// Function types produce a warning and [`FUNCTION_PLACEHOLDER`]; kinds with
/// no mapping are errors.
pub fn classify(
    ty: &TypeDescriptor,
    location: &SourceLocation,
    reporter: &mut dyn Reporter,
) -> Result<String> {
    Classifier { location, reporter }.classify(ty, 0)
}

/// Typedef names translated by name alone, without looking at what they alias.
pub fn fixed_width_alias(name: &str) -> Option<&'static str> {
    let mapped = match name {
        "int8_t" => "i8",
        "int16_t" => "i16",
        "int32_t" => "i32",
        "int64_t" => "i64",
        "uint8_t" => "u8",
        "uint16_t" => "u16",
        "uint32_t" => "u32",
        "uint64_t" => "u64",
        _ => return None,
    };
    Some(mapped)
}

struct Classifier<'a> {
    location: &'a SourceLocation,
    reporter: &'a mut dyn Reporter,
}

impl Classifier<'_> {
    fn classify(&mut self, ty: &TypeDescriptor, depth: usize) -> Result<String> {
        if depth > MAX_DEPTH {
            return Err(BindError::DepthExceeded {
                limit: MAX_DEPTH,
                location: self.location.clone(),
            });
        }
        trace!(depth, ?ty, "classify");

        match ty {
            TypeDescriptor::Unexposed { canonical } => match canonical.as_ref() {
                TypeDescriptor::Unexposed { .. } => Err(BindError::Unexposed {
                    location: self.location.clone(),
                }),
                resolved => self.classify(resolved, depth + 1),
            },
            TypeDescriptor::Void => Ok("void".to_string()),
            TypeDescriptor::Bool => Ok("bool".to_string()),
            TypeDescriptor::Char(kind) => self.char_type(*kind),
            TypeDescriptor::Int { signedness, width } => self.int_type(*signedness, *width),
            TypeDescriptor::Float(kind) => Ok(match kind {
                FloatKind::Float => "f32",
                FloatKind::Double => "f64",
                FloatKind::LongDouble => "f128",
            }
            .to_string()),
            TypeDescriptor::Pointer { pointee, is_const } => {
                if pointee.signature().is_some() {
                    return Ok(self.function_placeholder());
                }
                self.pointer_to(pointee, *is_const, depth)
            }
            TypeDescriptor::IncompleteArray { element, is_const } => {
                self.pointer_to(element, *is_const, depth)
            }
            TypeDescriptor::ConstantArray { element, len, .. } => {
                let element = self.classify(element, depth + 1)?;
                Ok(format!("[{element}; {len}]"))
            }
            TypeDescriptor::Record { spelling } | TypeDescriptor::Enum { spelling } => {
                Ok(strip_prefixes(spelling).to_string())
            }
            TypeDescriptor::Typedef {
                spelling,
                underlying,
            } => match fixed_width_alias(strip_prefixes(spelling)) {
                Some(mapped) => Ok(mapped.to_string()),
                None => self.classify(underlying, depth + 1),
            },
            TypeDescriptor::FunctionProto(_) => Ok(self.function_placeholder()),
            TypeDescriptor::FunctionNoProto { .. } => Err(BindError::unsupported(
                "function without prototype",
                self.location,
            )),
            TypeDescriptor::Unsupported(kind) => {
                Err(BindError::unsupported_kind(kind, self.location))
            }
        }
    }

    fn char_type(&self, kind: CharKind) -> Result<String> {
        match kind {
            CharKind::Signed => Ok("i8".to_string()),
            CharKind::Plain(_) | CharKind::Unsigned => Ok("u8".to_string()),
            CharKind::Wide => Err(BindError::unsupported("wchar", self.location)),
            CharKind::Utf16 => Err(BindError::unsupported("char16", self.location)),
            CharKind::Utf32 => Err(BindError::unsupported("char32", self.location)),
        }
    }

    fn int_type(&self, signedness: Signedness, width: IntWidth) -> Result<String> {
        if width == IntWidth::W128 {
            return Err(BindError::unsupported("128-bit integer", self.location));
        }
        let prefix = match signedness {
            Signedness::Signed => 'i',
            Signedness::Unsigned => 'u',
        };
        Ok(format!("{prefix}{}", width.bits()))
    }

    fn pointer_to(&mut self, pointee: &TypeDescriptor, is_const: bool, depth: usize) -> Result<String> {
        let inner = self.classify(pointee, depth + 1)?;
        let mutability = if is_const { "const" } else { "mut" };
        Ok(format!("*{mutability} {inner}"))
    }

    fn function_placeholder(&mut self) -> String {
        self.reporter.warn(
            self.location,
            &format!("function types are not translated, using `{FUNCTION_PLACEHOLDER}`"),
        );
        FUNCTION_PLACEHOLDER.to_string()
    }
}
