//! Declarators and the types they derive from a base type.
//!
//! A declarator is kept as parsed (pointer levels, an optional nested
//! declarator, then array and function suffixes) and only turned into a
//! [`TypeDescriptor`] once the base type from the specifiers is known.

use hdrbind_core::ast::Node;
use hdrbind_core::descriptor::{CallingConv, FunctionSignature, TypeDescriptor, UnsupportedKind};
use hdrbind_core::diag::SourceLocation;

/// One `*` or `^` with the qualifiers that follow it.
#[derive(Debug, Clone, Default)]
pub struct PointerLevel {
    pub is_const: bool,
    /// A block pointer (`^`).
    pub block: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ArrayLen {
    Fixed(u64),
    Unknown,
    Variable,
}

#[derive(Debug, Clone)]
pub struct Param {
    pub name: String,
    pub location: SourceLocation,
    /// Declared type after array and function decay.
    pub ty: TypeDescriptor,
    /// Attributes attached to the parameter.
    pub attrs: Vec<Node>,
}

#[derive(Debug, Clone, Default)]
pub struct ParamList {
    pub params: Vec<Param>,
    pub variadic: bool,
    /// False for an empty `()` list, which declares no prototype.
    pub prototyped: bool,
}

#[derive(Debug, Clone)]
pub enum Suffix {
    Array(ArrayLen),
    Function(ParamList),
}

#[derive(Debug, Clone, Default)]
pub struct Declarator {
    pub name: Option<(String, SourceLocation)>,
    pub pointers: Vec<PointerLevel>,
    pub inner: Option<Box<Declarator>>,
    pub suffixes: Vec<Suffix>,
    pub calling_conv: Option<CallingConv>,
    /// `vector_size` or `ext_vector_type` appeared in an attribute.
    pub vector: bool,
    pub attrs: Vec<Node>,
}

impl Declarator {
    /// The declared name, wherever it is nested.
    pub fn name(&self) -> Option<&(String, SourceLocation)> {
        self.name
            .as_ref()
            .or_else(|| self.inner.as_deref().and_then(Declarator::name))
    }

    /// Calling convention named anywhere in the declarator.
    pub fn calling_conv(&self) -> Option<CallingConv> {
        self.calling_conv
            .clone()
            .or_else(|| self.inner.as_deref().and_then(Declarator::calling_conv))
    }

    /// Attributes from every nesting level.
    pub fn take_attrs(&mut self) -> Vec<Node> {
        let mut attrs = std::mem::take(&mut self.attrs);
        if let Some(inner) = self.inner.as_deref_mut() {
            attrs.extend(inner.take_attrs());
        }
        attrs
    }

    pub fn has_vector(&self) -> bool {
        self.vector || self.inner.as_deref().is_some_and(Declarator::has_vector)
    }
}

/// A type with its own const qualification, which pointer and array
/// descriptors record on their pointee or element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Qualified {
    pub ty: TypeDescriptor,
    pub is_const: bool,
}

/// The result of applying a declarator to a base type.
#[derive(Debug, Clone)]
pub struct Derived<'d> {
    pub ty: Qualified,
    /// Parameters of the outermost function derivation, if any.
    pub params: Option<&'d ParamList>,
}

/// Build the declared type from `base` and `decl`.
///
/// `calling_conv` applies to the function derivation closest to the base
/// type; every other function type gets the C convention.
pub fn derive<'d>(base: Qualified, decl: &'d Declarator, calling_conv: Option<CallingConv>) -> Derived<'d> {
    let mut calling_conv = calling_conv;
    derive_level(base, decl, &mut calling_conv)
}

fn derive_level<'d>(base: Qualified, decl: &'d Declarator, calling_conv: &mut Option<CallingConv>) -> Derived<'d> {
    let Qualified { mut ty, mut is_const } = base;
    let mut params = None;

    for level in &decl.pointers {
        ty = if level.block {
            TypeDescriptor::Unsupported(UnsupportedKind::BlockPointer)
        } else {
            TypeDescriptor::pointer(ty, is_const)
        };
        is_const = level.is_const;
    }

    for suffix in decl.suffixes.iter().rev() {
        match suffix {
            Suffix::Array(ArrayLen::Fixed(len)) => {
                ty = TypeDescriptor::ConstantArray {
                    element: Box::new(ty),
                    is_const,
                    len: *len,
                };
            }
            Suffix::Array(ArrayLen::Unknown) => {
                ty = TypeDescriptor::IncompleteArray {
                    element: Box::new(ty),
                    is_const,
                };
            }
            Suffix::Array(ArrayLen::Variable) => {
                ty = TypeDescriptor::Unsupported(UnsupportedKind::VariableArray);
            }
            Suffix::Function(list) => {
                ty = if list.prototyped {
                    TypeDescriptor::FunctionProto(Box::new(FunctionSignature {
                        result: ty,
                        params: list.params.iter().map(|p| p.ty.clone()).collect(),
                        variadic: list.variadic,
                        calling_conv: calling_conv.take().unwrap_or(CallingConv::C),
                    }))
                } else {
                    TypeDescriptor::FunctionNoProto { result: Box::new(ty) }
                };
                is_const = false;
                params = Some(list);
            }
        }
    }

    let ty = Qualified { ty, is_const };
    match decl.inner.as_deref() {
        Some(inner) => {
            let derived = derive_level(ty, inner, calling_conv);
            Derived {
                params: derived.params.or(params),
                ty: derived.ty,
            }
        }
        None => Derived { ty, params },
    }
}

/// The type a parameter declared as `declared` actually has: arrays become
/// pointers to their element and functions become pointers to functions.
pub fn decay(declared: Qualified) -> TypeDescriptor {
    match declared.ty.peel() {
        TypeDescriptor::ConstantArray { element, is_const, .. }
        | TypeDescriptor::IncompleteArray { element, is_const } => TypeDescriptor::Pointer {
            pointee: element.clone(),
            is_const: *is_const,
        },
        TypeDescriptor::FunctionProto(_) | TypeDescriptor::FunctionNoProto { .. } => {
            TypeDescriptor::pointer(declared.ty, false)
        }
        _ => declared.ty,
    }
}
