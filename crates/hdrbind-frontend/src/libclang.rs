//! AST provider backed by libclang, through the `clang` crate.
//!
//! libclang does the preprocessing and semantic analysis; this module only
//! converts its cursors and types into the provider-neutral tree.

use std::path::Path;

use clang::{CallingConvention, Clang, Entity, EntityKind, Index, Type, TypeKind};
use tracing::{debug, trace};

use hdrbind_core::ast::{AstProvider, Node, NodeKind, StorageClass, TranslationUnit};
use hdrbind_core::descriptor::{
    CallingConv, CharKind, FloatKind, FunctionSignature, IntWidth, Signedness, TypeDescriptor,
    UnsupportedKind,
};
use hdrbind_core::diag::{Diagnostic, SourceLocation};
use hdrbind_core::error::{BindError, Result};

/// The libclang-backed provider.
#[derive(Debug, Default, Clone, Copy)]
pub struct LibClang;

impl LibClang {
    pub fn new() -> Self {
        Self
    }
}

impl AstProvider for LibClang {
    fn parse(&self, path: &Path, args: &[String]) -> Result<TranslationUnit> {
        let clang = Clang::new().map_err(|detail| BindError::Frontend { detail })?;
        let index = Index::new(&clang, false, false);
        debug!(path = %path.display(), ?args, "parsing with libclang");
        let unit = index
            .parser(path)
            .arguments(args)
            .parse()
            .map_err(|e| BindError::Frontend {
                detail: format!("libclang could not parse {}: {e}", path.display()),
            })?;

        let diagnostics: Vec<Diagnostic> = unit
            .get_diagnostics()
            .into_iter()
            .filter(|d| d.get_severity() >= clang::diagnostic::Severity::Warning)
            .map(|d| {
                let location = spelling_location(d.get_location());
                match d.get_severity() {
                    clang::diagnostic::Severity::Warning => Diagnostic::warning(location, d.get_text()),
                    _ => Diagnostic::error(location, d.get_text()),
                }
            })
            .collect();
        if !diagnostics.is_empty() {
            return Err(BindError::SourceDiagnostics(diagnostics));
        }

        let root = convert_entity(unit.get_entity());
        Ok(TranslationUnit {
            path: path.to_path_buf(),
            root,
        })
    }
}

fn spelling_location(location: clang::source::SourceLocation<'_>) -> SourceLocation {
    let spelled = location.get_spelling_location();
    let file = spelled
        .file
        .map(|f| f.get_path().display().to_string())
        .unwrap_or_default();
    SourceLocation::new(file, spelled.line, spelled.column)
}

fn entity_location(entity: &Entity<'_>) -> SourceLocation {
    entity
        .get_range()
        .map(|range| range.get_start())
        .or_else(|| entity.get_location())
        .map(spelling_location)
        .unwrap_or_default()
}

fn node_kind(kind: EntityKind) -> NodeKind {
    match kind {
        EntityKind::TranslationUnit => NodeKind::TranslationUnit,
        EntityKind::FunctionDecl => NodeKind::FunctionDecl,
        EntityKind::ParmDecl => NodeKind::ParmDecl,
        EntityKind::UnexposedAttr => NodeKind::UnexposedAttr,
        EntityKind::CompoundStmt => NodeKind::CompoundStmt,
        EntityKind::FieldDecl => NodeKind::FieldDecl,
        EntityKind::TypedefDecl => NodeKind::TypedefDecl,
        EntityKind::StructDecl => NodeKind::StructDecl,
        EntityKind::UnionDecl => NodeKind::UnionDecl,
        EntityKind::EnumDecl => NodeKind::EnumDecl,
        EntityKind::EnumConstantDecl => NodeKind::EnumConstantDecl,
        EntityKind::VarDecl => NodeKind::VarDecl,
        EntityKind::LinkageSpec => NodeKind::LinkageSpec,
        other => NodeKind::Other(format!("{other:?}")),
    }
}

fn storage_class(entity: &Entity<'_>) -> StorageClass {
    match entity.get_storage_class() {
        Some(clang::StorageClass::Extern) => StorageClass::Extern,
        Some(clang::StorageClass::Static) => StorageClass::Static,
        Some(clang::StorageClass::PrivateExtern) => StorageClass::PrivateExtern,
        Some(clang::StorageClass::OpenClWorkGroupLocal) => StorageClass::OpenClWorkGroupLocal,
        Some(clang::StorageClass::Auto) => StorageClass::Auto,
        Some(clang::StorageClass::Register) => StorageClass::Register,
        _ => StorageClass::None,
    }
}

fn convert_entity(entity: Entity<'_>) -> Node {
    let kind = entity.get_kind();
    let mut node = Node::new(
        node_kind(kind),
        entity.get_name().unwrap_or_default(),
        entity_location(&entity),
    )
    .with_storage(storage_class(&entity));

    let ty = match kind {
        EntityKind::TypedefDecl => entity.get_typedef_underlying_type(),
        EntityKind::FunctionDecl
        | EntityKind::ParmDecl
        | EntityKind::FieldDecl
        | EntityKind::VarDecl
        | EntityKind::EnumConstantDecl => entity.get_type(),
        _ => None,
    };
    node.ty = ty.map(|ty| convert_type(&ty));

    // Bodies are opaque, and parameters only belong under their function:
    // a function-pointer variable also lists ParmDecl children.
    if kind != EntityKind::CompoundStmt {
        node.children = entity
            .get_children()
            .into_iter()
            .filter(|child| child.get_kind() != EntityKind::ParmDecl || kind == EntityKind::FunctionDecl)
            .map(convert_entity)
            .collect();
    }
    trace!(kind = %node.kind, name = %node.spelling, "converted cursor");
    node
}

/// Named types (typedefs, records, enums) keep the spelling clang prints,
/// const qualification included.
fn convert_type(ty: &Type<'_>) -> TypeDescriptor {
    let kind = ty.get_kind();
    match kind {
        TypeKind::Void => TypeDescriptor::Void,
        TypeKind::Bool => TypeDescriptor::Bool,
        TypeKind::CharS => TypeDescriptor::Char(CharKind::Plain(Signedness::Signed)),
        TypeKind::CharU => TypeDescriptor::Char(CharKind::Plain(Signedness::Unsigned)),
        TypeKind::SChar => TypeDescriptor::Char(CharKind::Signed),
        TypeKind::UChar => TypeDescriptor::Char(CharKind::Unsigned),
        TypeKind::WChar => TypeDescriptor::Char(CharKind::Wide),
        TypeKind::Char16 => TypeDescriptor::Char(CharKind::Utf16),
        TypeKind::Char32 => TypeDescriptor::Char(CharKind::Utf32),
        TypeKind::Short
        | TypeKind::Int
        | TypeKind::Long
        | TypeKind::LongLong
        | TypeKind::Int128 => integer(ty, Signedness::Signed),
        TypeKind::UShort
        | TypeKind::UInt
        | TypeKind::ULong
        | TypeKind::ULongLong
        | TypeKind::UInt128 => integer(ty, Signedness::Unsigned),
        TypeKind::Float => TypeDescriptor::Float(FloatKind::Float),
        TypeKind::Double => TypeDescriptor::Float(FloatKind::Double),
        TypeKind::LongDouble | TypeKind::Float128 => TypeDescriptor::Float(FloatKind::LongDouble),
        TypeKind::Pointer => match ty.get_pointee_type() {
            Some(pointee) => TypeDescriptor::Pointer {
                is_const: pointee.is_const_qualified(),
                pointee: Box::new(convert_type(&pointee)),
            },
            None => unsupported("pointer without pointee"),
        },
        TypeKind::ConstantArray => match (ty.get_element_type(), ty.get_size()) {
            (Some(element), Some(len)) => TypeDescriptor::ConstantArray {
                is_const: element.is_const_qualified(),
                element: Box::new(convert_type(&element)),
                len: len as u64,
            },
            _ => unsupported("array without element type"),
        },
        TypeKind::IncompleteArray => match ty.get_element_type() {
            Some(element) => TypeDescriptor::IncompleteArray {
                is_const: element.is_const_qualified(),
                element: Box::new(convert_type(&element)),
            },
            None => unsupported("array without element type"),
        },
        TypeKind::Record => TypeDescriptor::Record {
            spelling: ty.get_display_name(),
        },
        TypeKind::Enum => TypeDescriptor::Enum {
            spelling: ty.get_display_name(),
        },
        TypeKind::Typedef => {
            let underlying = ty
                .get_declaration()
                .and_then(|decl| decl.get_typedef_underlying_type())
                .unwrap_or_else(|| ty.get_canonical_type());
            TypeDescriptor::typedef(ty.get_display_name(), convert_type(&underlying))
        }
        TypeKind::Elaborated => match ty.get_elaborated_type() {
            Some(named) => respell(convert_type(&named), ty.get_display_name()),
            None => unsupported("elaborated type without named type"),
        },
        TypeKind::FunctionPrototype => {
            let result = ty
                .get_result_type()
                .map(|r| convert_type(&r))
                .unwrap_or(TypeDescriptor::Void);
            let params = ty
                .get_argument_types()
                .unwrap_or_default()
                .iter()
                .map(convert_type)
                .collect();
            TypeDescriptor::FunctionProto(Box::new(FunctionSignature {
                result,
                params,
                variadic: ty.is_variadic(),
                calling_conv: ty
                    .get_calling_convention()
                    .map(calling_convention)
                    .unwrap_or(CallingConv::C),
            }))
        }
        TypeKind::FunctionNoPrototype => TypeDescriptor::FunctionNoProto {
            result: Box::new(
                ty.get_result_type()
                    .map(|r| convert_type(&r))
                    .unwrap_or(TypeDescriptor::Void),
            ),
        },
        TypeKind::Unexposed => {
            let canonical = ty.get_canonical_type();
            let canonical = if canonical.get_kind() == TypeKind::Unexposed {
                // Still unexposed: the classifier reports this as a tooling limit.
                TypeDescriptor::Unexposed {
                    canonical: Box::new(TypeDescriptor::Void),
                }
            } else {
                convert_type(&canonical)
            };
            TypeDescriptor::Unexposed {
                canonical: Box::new(canonical),
            }
        }
        TypeKind::Vector => TypeDescriptor::Unsupported(UnsupportedKind::Vector),
        TypeKind::Complex => TypeDescriptor::Unsupported(UnsupportedKind::Complex),
        TypeKind::BlockPointer => TypeDescriptor::Unsupported(UnsupportedKind::BlockPointer),
        TypeKind::VariableArray => TypeDescriptor::Unsupported(UnsupportedKind::VariableArray),
        TypeKind::DependentSizedArray => {
            TypeDescriptor::Unsupported(UnsupportedKind::DependentSizedArray)
        }
        TypeKind::MemberPointer => TypeDescriptor::Unsupported(UnsupportedKind::MemberPointer),
        TypeKind::LValueReference => TypeDescriptor::Unsupported(UnsupportedKind::LValueReference),
        TypeKind::RValueReference => TypeDescriptor::Unsupported(UnsupportedKind::RValueReference),
        TypeKind::Nullptr => TypeDescriptor::Unsupported(UnsupportedKind::NullPtr),
        TypeKind::Overload => TypeDescriptor::Unsupported(UnsupportedKind::Overload),
        TypeKind::Dependent => TypeDescriptor::Unsupported(UnsupportedKind::Dependent),
        TypeKind::ObjCInterface => TypeDescriptor::Unsupported(UnsupportedKind::ObjCInterface),
        TypeKind::ObjCObjectPointer => {
            TypeDescriptor::Unsupported(UnsupportedKind::ObjCObjectPointer)
        }
        TypeKind::ObjCId => TypeDescriptor::Unsupported(UnsupportedKind::ObjCId),
        TypeKind::ObjCClass => TypeDescriptor::Unsupported(UnsupportedKind::ObjCClass),
        TypeKind::ObjCSel => TypeDescriptor::Unsupported(UnsupportedKind::ObjCSel),
        other => {
            // Sugar kinds (attributed, parenthesised) resolve through the canonical type.
            let canonical = ty.get_canonical_type();
            if canonical.get_kind() != other {
                convert_type(&canonical)
            } else {
                TypeDescriptor::Unsupported(UnsupportedKind::Other(format!("{other:?}")))
            }
        }
    }
}

fn integer(ty: &Type<'_>, signedness: Signedness) -> TypeDescriptor {
    match ty.get_sizeof().ok().and_then(IntWidth::from_bytes) {
        Some(width) => TypeDescriptor::int(signedness, width),
        None => unsupported("integer of unusual size"),
    }
}

fn unsupported(detail: &str) -> TypeDescriptor {
    TypeDescriptor::Unsupported(UnsupportedKind::Other(detail.to_string()))
}

/// Give a named type the spelling of the elaborated type that wraps it.
fn respell(ty: TypeDescriptor, spelling: String) -> TypeDescriptor {
    match ty {
        TypeDescriptor::Record { .. } => TypeDescriptor::Record { spelling },
        TypeDescriptor::Enum { .. } => TypeDescriptor::Enum { spelling },
        TypeDescriptor::Typedef { underlying, .. } => TypeDescriptor::Typedef {
            spelling,
            underlying,
        },
        other => other,
    }
}

fn calling_convention(cc: CallingConvention) -> CallingConv {
    match cc {
        CallingConvention::Cdecl => CallingConv::C,
        CallingConvention::Stdcall => CallingConv::StdCall,
        CallingConvention::Fastcall => CallingConv::FastCall,
        CallingConvention::Thiscall => CallingConv::ThisCall,
        CallingConvention::Vectorcall => CallingConv::VectorCall,
        CallingConvention::Pascal => CallingConv::Pascal,
        CallingConvention::RegCall => CallingConv::RegCall,
        CallingConvention::Win64 => CallingConv::Win64,
        CallingConvention::SysV64 => CallingConv::SysV64,
        CallingConvention::Aapcs => CallingConv::Aapcs,
        CallingConvention::AapcsVfp => CallingConv::AapcsVfp,
        other => CallingConv::Other(format!("{other:?}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use std::sync::Mutex;

    use hdrbind_core::translate::translate_file;

    #[test]
    fn respelling_keeps_underlying_type() {
        let ty = TypeDescriptor::typedef("size_t", TypeDescriptor::int(Signedness::Unsigned, IntWidth::W64));
        match respell(ty, "const size_t".into()) {
            TypeDescriptor::Typedef { spelling, underlying } => {
                assert_eq!(spelling, "const size_t");
                assert_eq!(*underlying, TypeDescriptor::int(Signedness::Unsigned, IntWidth::W64));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(respell(TypeDescriptor::Void, "void".into()), TypeDescriptor::Void);
    }

    #[test]
    fn calling_conventions_map() {
        assert_eq!(calling_convention(CallingConvention::Cdecl), CallingConv::C);
        assert_eq!(calling_convention(CallingConvention::Stdcall), CallingConv::StdCall);
        assert_eq!(calling_convention(CallingConvention::Win64), CallingConv::Win64);
    }

    #[test]
    fn cursor_kinds_map() {
        assert_eq!(node_kind(EntityKind::FunctionDecl), NodeKind::FunctionDecl);
        assert_eq!(node_kind(EntityKind::LinkageSpec), NodeKind::LinkageSpec);
        assert!(matches!(node_kind(EntityKind::MacroDefinition), NodeKind::Other(_)));
    }

    // libclang allows one `Clang` instance per process.
    static CLANG: Mutex<()> = Mutex::new(());

    fn header(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(".h").tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    fn parse(contents: &str) -> (tempfile::NamedTempFile, Result<TranslationUnit>) {
        let file = header(contents);
        let _guard = CLANG.lock().unwrap_or_else(|e| e.into_inner());
        let unit = LibClang::new().parse(file.path(), &[]);
        (file, unit)
    }

    fn translate(contents: &str) -> Result<String> {
        let file = header(contents);
        let _guard = CLANG.lock().unwrap_or_else(|e| e.into_inner());
        translate_file(&LibClang::new(), file.path(), &[], &mut Vec::<Diagnostic>::new())
    }

    fn find<'a>(node: &'a Node, name: &str) -> &'a Node {
        node.children
            .iter()
            .find(|child| child.spelling == name)
            .unwrap_or_else(|| panic!("no top-level node named {name}"))
    }

    fn first_param(function: &Node) -> &TypeDescriptor {
        &function.ty.as_ref().and_then(TypeDescriptor::signature).unwrap().params[0]
    }

    #[test]
    fn function_pointer_variable_parameters_stay_out_of_the_tree() {
        let (_file, unit) = parse("void (*v)(int x);\nint f(int y);\n");
        let unit = unit.unwrap();
        let var = find(&unit.root, "v");
        assert_eq!(var.kind, NodeKind::VarDecl);
        assert!(var.children.iter().all(|c| c.kind != NodeKind::ParmDecl));
        let f = find(&unit.root, "f");
        assert_eq!(f.children[0].kind, NodeKind::ParmDecl);
        assert_eq!(f.children[0].spelling, "y");

        assert_eq!(
            translate("void (*v)(int x);\nint f(int y);\n").unwrap(),
            "extern {\n    fn f(y: i32) -> i32;\n}\n"
        );
    }

    #[test]
    fn const_pointee_sets_pointer_constness() {
        let (_file, unit) = parse("int put(const char *s, char *buf);\n");
        let unit = unit.unwrap();
        let function = find(&unit.root, "put");
        match first_param(function) {
            TypeDescriptor::Pointer { is_const, pointee } => {
                assert!(*is_const);
                assert!(matches!(pointee.as_ref(), TypeDescriptor::Char(CharKind::Plain(_))));
            }
            other => panic!("expected a pointer, got {other:?}"),
        }
        assert_eq!(
            translate("int put(const char *s, char *buf);\n").unwrap(),
            "extern {\n    fn put(s: *const u8, buf: *mut u8) -> i32;\n}\n"
        );
    }

    #[test]
    fn typedefs_carry_their_underlying_type() {
        let source = "typedef unsigned int word_t;\nword_t g(word_t a);\n";
        let (_file, unit) = parse(source);
        let unit = unit.unwrap();
        let typedef = find(&unit.root, "word_t");
        assert_eq!(typedef.kind, NodeKind::TypedefDecl);
        assert_eq!(typedef.ty, Some(TypeDescriptor::int(Signedness::Unsigned, IntWidth::W32)));
        match first_param(find(&unit.root, "g")) {
            TypeDescriptor::Typedef { spelling, underlying } => {
                assert_eq!(spelling, "word_t");
                assert_eq!(**underlying, TypeDescriptor::int(Signedness::Unsigned, IntWidth::W32));
            }
            other => panic!("expected a typedef, got {other:?}"),
        }
        assert_eq!(translate(source).unwrap(), "extern {\n    fn g(a: u32) -> u32;\n}\n");
    }

    #[test]
    fn compiler_errors_become_source_diagnostics() {
        let (_file, unit) = parse("mystery_t make(void);\n");
        match unit {
            Err(BindError::SourceDiagnostics(diagnostics)) => {
                assert!(!diagnostics.is_empty());
                assert_eq!(diagnostics[0].location.line, 1);
            }
            other => panic!("expected diagnostics, got {other:?}"),
        }
    }
}
