//! Source-language type descriptors.
//!
//! A [`TypeDescriptor`] is what an AST provider hands over for every C type
//! it encounters. Providers resolve everything they can up front (typedef
//! targets, canonical forms of unexposed types, array lengths) so the
//! classifier never needs to call back into the provider.

use serde::{Deserialize, Serialize};

/// Integer signedness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Signedness {
    Signed,
    Unsigned,
}

/// Storage width of an integer type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum IntWidth {
    W8,
    W16,
    W32,
    W64,
    W128,
}

impl IntWidth {
    /// Width in bits.
    pub fn bits(self) -> u32 {
        match self {
            IntWidth::W8 => 8,
            IntWidth::W16 => 16,
            IntWidth::W32 => 32,
            IntWidth::W64 => 64,
            IntWidth::W128 => 128,
        }
    }

    /// Width for a byte size, if it is one of the supported storage sizes.
    pub fn from_bytes(bytes: usize) -> Option<Self> {
        match bytes {
            1 => Some(IntWidth::W8),
            2 => Some(IntWidth::W16),
            4 => Some(IntWidth::W32),
            8 => Some(IntWidth::W64),
            16 => Some(IntWidth::W128),
            _ => None,
        }
    }
}

/// The distinct flavours of C character types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CharKind {
    /// Plain `char`, whose signedness the target decides.
    Plain(Signedness),
    /// `signed char`.
    Signed,
    /// `unsigned char`.
    Unsigned,
    /// `wchar_t` as a builtin type.
    Wide,
    /// `char16_t` as a builtin type.
    Utf16,
    /// `char32_t` as a builtin type.
    Utf32,
}

/// Floating-point kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FloatKind {
    Float,
    Double,
    LongDouble,
}

/// Calling convention attached to a function type.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CallingConv {
    /// The plain C convention.
    C,
    StdCall,
    FastCall,
    ThisCall,
    VectorCall,
    Pascal,
    RegCall,
    Win64,
    SysV64,
    Aapcs,
    AapcsVfp,
    /// Anything else the provider could name.
    Other(String),
}

impl CallingConv {
    pub fn is_c(&self) -> bool {
        matches!(self, CallingConv::C)
    }
}

impl std::fmt::Display for CallingConv {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CallingConv::C => write!(f, "C"),
            CallingConv::StdCall => write!(f, "stdcall"),
            CallingConv::FastCall => write!(f, "fastcall"),
            CallingConv::ThisCall => write!(f, "thiscall"),
            CallingConv::VectorCall => write!(f, "vectorcall"),
            CallingConv::Pascal => write!(f, "pascal"),
            CallingConv::RegCall => write!(f, "regcall"),
            CallingConv::Win64 => write!(f, "win64"),
            CallingConv::SysV64 => write!(f, "sysv64"),
            CallingConv::Aapcs => write!(f, "aapcs"),
            CallingConv::AapcsVfp => write!(f, "aapcs-vfp"),
            CallingConv::Other(name) => write!(f, "{name}"),
        }
    }
}

/// A prototyped function type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FunctionSignature {
    pub result: TypeDescriptor,
    /// Parameter types in declaration order.
    pub params: Vec<TypeDescriptor>,
    pub variadic: bool,
    pub calling_conv: CallingConv,
}

/// Type kinds with no designed translation.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum UnsupportedKind {
    Vector,
    Complex,
    BlockPointer,
    VariableArray,
    DependentSizedArray,
    MemberPointer,
    LValueReference,
    RValueReference,
    NullPtr,
    Overload,
    Dependent,
    ObjCInterface,
    ObjCObjectPointer,
    ObjCId,
    ObjCClass,
    ObjCSel,
    /// A kind the provider knows by name only.
    Other(String),
}

impl std::fmt::Display for UnsupportedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            UnsupportedKind::Vector => "vector",
            UnsupportedKind::Complex => "complex",
            UnsupportedKind::BlockPointer => "block pointer",
            UnsupportedKind::VariableArray => "variable length array",
            UnsupportedKind::DependentSizedArray => "dependent sized array",
            UnsupportedKind::MemberPointer => "member pointer",
            UnsupportedKind::LValueReference => "lvalue reference",
            UnsupportedKind::RValueReference => "rvalue reference",
            UnsupportedKind::NullPtr => "nullptr_t",
            UnsupportedKind::Overload => "overload",
            UnsupportedKind::Dependent => "dependent type",
            UnsupportedKind::ObjCInterface => "Objective-C interface",
            UnsupportedKind::ObjCObjectPointer => "Objective-C object pointer",
            UnsupportedKind::ObjCId => "Objective-C id",
            UnsupportedKind::ObjCClass => "Objective-C Class",
            UnsupportedKind::ObjCSel => "Objective-C SEL",
            UnsupportedKind::Other(name) => return write!(f, "{name}"),
        };
        f.write_str(name)
    }
}

/// A C type as seen by the classifier.
///
/// Pointer and array variants carry the const-qualification of their
/// pointee or element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TypeDescriptor {
    Void,
    Bool,
    Char(CharKind),
    Int {
        signedness: Signedness,
        width: IntWidth,
    },
    Float(FloatKind),
    Pointer {
        pointee: Box<TypeDescriptor>,
        is_const: bool,
    },
    IncompleteArray {
        element: Box<TypeDescriptor>,
        is_const: bool,
    },
    ConstantArray {
        element: Box<TypeDescriptor>,
        is_const: bool,
        len: u64,
    },
    /// A struct or union, identified by its spelling (e.g. `const struct foo`).
    Record { spelling: String },
    /// An enum, identified by its spelling (e.g. `enum color`).
    Enum { spelling: String },
    Typedef {
        spelling: String,
        underlying: Box<TypeDescriptor>,
    },
    FunctionProto(Box<FunctionSignature>),
    FunctionNoProto { result: Box<TypeDescriptor> },
    /// A type the provider could not expose directly, with its canonical form.
    Unexposed { canonical: Box<TypeDescriptor> },
    Unsupported(UnsupportedKind),
}

impl TypeDescriptor {
    pub fn int(signedness: Signedness, width: IntWidth) -> Self {
        TypeDescriptor::Int { signedness, width }
    }

    pub fn pointer(pointee: TypeDescriptor, is_const: bool) -> Self {
        TypeDescriptor::Pointer {
            pointee: Box::new(pointee),
            is_const,
        }
    }

    pub fn typedef(spelling: impl Into<String>, underlying: TypeDescriptor) -> Self {
        TypeDescriptor::Typedef {
            spelling: spelling.into(),
            underlying: Box::new(underlying),
        }
    }

    /// Strip typedef and unexposed layers.
    pub fn peel(&self) -> &TypeDescriptor {
        match self {
            TypeDescriptor::Typedef { underlying, .. } => underlying.peel(),
            TypeDescriptor::Unexposed { canonical } => canonical.peel(),
            other => other,
        }
    }

    /// Whether this is a function type once aliases are peeled.
    pub fn is_function(&self) -> bool {
        matches!(
            self.peel(),
            TypeDescriptor::FunctionProto(_) | TypeDescriptor::FunctionNoProto { .. }
        )
    }

    /// The prototype, if this is a prototyped function type.
    pub fn signature(&self) -> Option<&FunctionSignature> {
        match self.peel() {
            TypeDescriptor::FunctionProto(sig) => Some(sig),
            _ => None,
        }
    }
}
