//! Recursive-descent parser for the declarations in a C header.
//!
//! Errors are collected as diagnostics and the parser resynchronises at the
//! next `;` or closing brace, so one run reports every problem in the file.

use std::collections::HashMap;

use hdrbind_core::ast::{Node, NodeKind, StorageClass};
use hdrbind_core::descriptor::{
    CallingConv, CharKind, FloatKind, IntWidth, Signedness, TypeDescriptor, UnsupportedKind,
};
use hdrbind_core::diag::{Diagnostic, SourceLocation};

use crate::declarator::{
    decay, derive, ArrayLen, Declarator, Param, ParamList, PointerLevel, Qualified, Suffix,
};
use crate::expr::{self, ExprError};
use crate::lexer::{Token, TokenKind};
use crate::model::DataModel;

const QUALIFIERS: &[&str] = &[
    "const",
    "__const",
    "__const__",
    "volatile",
    "__volatile",
    "__volatile__",
    "restrict",
    "__restrict",
    "__restrict__",
    "_Atomic",
    "_Nonnull",
    "_Nullable",
    "_Null_unspecified",
    "__unaligned",
    "__ptr32",
    "__ptr64",
];

/// Specifiers with no effect on the declared type or linkage.
const IGNORED_SPECIFIERS: &[&str] = &[
    "inline",
    "__inline",
    "__inline__",
    "_Noreturn",
    "__extension__",
    "_Thread_local",
    "__thread",
];

const TYPE_KEYWORDS: &[&str] = &[
    "void",
    "char",
    "short",
    "int",
    "long",
    "signed",
    "__signed",
    "__signed__",
    "unsigned",
    "float",
    "double",
    "_Bool",
    "bool",
    "_Complex",
    "__complex__",
    "__int128",
    "__int128_t",
    "__uint128_t",
    "_Float16",
    "__fp16",
    "__float128",
    "_Float128",
    "struct",
    "union",
    "enum",
];

const STORAGE_KEYWORDS: &[&str] = &[
    "typedef",
    "static",
    "extern",
    "register",
    "auto",
    "__private_extern__",
];

const ATTRIBUTE_KEYWORDS: &[&str] = &["__attribute__", "__attribute", "__declspec"];

const ASM_KEYWORDS: &[&str] = &["asm", "__asm", "__asm__"];

/// Deepest nesting of declarators, record bodies and linkage blocks.
const MAX_NESTING: usize = 256;

fn is_keyword(word: &str) -> bool {
    QUALIFIERS.contains(&word)
        || IGNORED_SPECIFIERS.contains(&word)
        || TYPE_KEYWORDS.contains(&word)
        || STORAGE_KEYWORDS.contains(&word)
        || ATTRIBUTE_KEYWORDS.contains(&word)
        || ASM_KEYWORDS.contains(&word)
        || calling_conv_keyword(word).is_some()
        || word == "sizeof"
}

fn is_const_qualifier(word: &str) -> bool {
    matches!(word, "const" | "__const" | "__const__")
}

/// Calling conventions spelled as keywords (`__stdcall`).
fn calling_conv_keyword(word: &str) -> Option<CallingConv> {
    let cc = match word {
        "__cdecl" | "_cdecl" => CallingConv::C,
        "__stdcall" | "_stdcall" => CallingConv::StdCall,
        "__fastcall" | "_fastcall" => CallingConv::FastCall,
        "__thiscall" | "_thiscall" => CallingConv::ThisCall,
        "__vectorcall" => CallingConv::VectorCall,
        "__pascal" | "_pascal" => CallingConv::Pascal,
        "__regcall" => CallingConv::RegCall,
        _ => return None,
    };
    Some(cc)
}

/// Calling conventions spelled as attributes (`__attribute__((stdcall))`).
fn calling_conv_attribute(name: &str, args: &[Token]) -> Option<CallingConv> {
    let cc = match name {
        "cdecl" => CallingConv::C,
        "stdcall" => CallingConv::StdCall,
        "fastcall" => CallingConv::FastCall,
        "thiscall" => CallingConv::ThisCall,
        "vectorcall" => CallingConv::VectorCall,
        "pascal" => CallingConv::Pascal,
        "regcall" => CallingConv::RegCall,
        "ms_abi" => CallingConv::Win64,
        "sysv_abi" => CallingConv::SysV64,
        "pcs" => match args.iter().find_map(|t| match &t.kind {
            TokenKind::Str(s) => Some(s.as_str()),
            _ => None,
        }) {
            Some("aapcs") => CallingConv::Aapcs,
            Some("aapcs-vfp") => CallingConv::AapcsVfp,
            other => CallingConv::Other(format!("pcs({})", other.unwrap_or_default())),
        },
        "preserve_most" | "preserve_all" | "swiftcall" | "intel_ocl_bicc" => {
            CallingConv::Other(name.to_string())
        }
        _ => return None,
    };
    Some(cc)
}

/// Attributes parsed from one `__attribute__` or `__declspec`.
#[derive(Debug, Default)]
struct Attributes {
    nodes: Vec<Node>,
    calling_conv: Option<CallingConv>,
    vector: bool,
}

/// Counts of the builtin type keywords in one specifier list.
#[derive(Debug, Default)]
struct BaseCounts {
    void: u8,
    bool: u8,
    char: u8,
    short: u8,
    int: u8,
    long: u8,
    signed: u8,
    unsigned: u8,
    float: u8,
    double: u8,
    complex: u8,
    int128: u8,
}

impl BaseCounts {
    fn any(&self) -> bool {
        self.void
            + self.bool
            + self.char
            + self.short
            + self.int
            + self.long
            + self.signed
            + self.unsigned
            + self.float
            + self.double
            + self.complex
            + self.int128
            > 0
    }

    /// Number of mutually exclusive base types named.
    fn kinds(&self) -> u8 {
        [self.void, self.bool, self.char, self.float, self.double, self.int128]
            .iter()
            .map(|&n| n.min(1))
            .sum()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Context {
    File,
    Member,
    Param,
}

/// The declaration specifiers in front of a declarator list.
#[derive(Debug)]
struct Specifiers {
    location: SourceLocation,
    storage: StorageClass,
    typedef: bool,
    base: Qualified,
    calling_conv: Option<CallingConv>,
    vector: bool,
    attrs: Vec<Node>,
    /// Struct, union and enum definitions made inside the specifiers.
    definitions: Vec<Node>,
    /// Keyword of an anonymous tag type defined here, if any.
    anonymous_tag: Option<&'static str>,
}

/// Parser over one file's tokens.
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    file: String,
    model: DataModel,
    /// Typedef names in scope and what they alias.
    typedefs: HashMap<String, TypeDescriptor>,
    /// Enumerator values, for constant expressions.
    constants: HashMap<String, i128>,
    diagnostics: Vec<Diagnostic>,
    /// Declarators, record bodies and linkage blocks currently open.
    depth: usize,
    /// Set once nesting ran too deep; the rest of the file is skipped.
    abandoned: bool,
}

impl Parser {
    pub fn new(file: impl Into<String>, tokens: Vec<Token>, model: DataModel) -> Self {
        let typedefs = model
            .predefined_typedefs()
            .into_iter()
            .map(|(name, ty)| (name.to_string(), ty))
            .collect();
        Self {
            tokens,
            pos: 0,
            file: file.into(),
            model,
            typedefs,
            constants: HashMap::new(),
            diagnostics: Vec::new(),
            depth: 0,
            abandoned: false,
        }
    }

    /// Parse every declaration, returning the translation-unit node and the
    /// diagnostics found on the way.
    pub fn parse(mut self) -> (Node, Vec<Diagnostic>) {
        let mut children = Vec::new();
        while self.peek().is_some() {
            let before = self.pos;
            if self.at_punct("}") {
                let location = self.here();
                self.error(location, "extraneous closing brace ('}')");
                self.pos += 1;
                continue;
            }
            self.external_declaration(&mut children);
            if self.pos == before {
                self.pos += 1;
            }
        }
        let root = Node::new(
            NodeKind::TranslationUnit,
            self.file.clone(),
            SourceLocation::new(self.file.clone(), 1, 1),
        )
        .with_children(children);
        (root, self.diagnostics)
    }

    // ---- token helpers ----

    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_at(&self, ahead: usize) -> Option<&Token> {
        self.tokens.get(self.pos + ahead)
    }

    fn peek_word(&self) -> Option<&str> {
        self.peek().and_then(Token::ident)
    }

    fn at_punct(&self, punct: &str) -> bool {
        self.peek().is_some_and(|t| t.is_punct(punct))
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.at_punct(punct) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn location_of(&self, tok: &Token) -> SourceLocation {
        SourceLocation::new(self.file.clone(), tok.line, tok.column)
    }

    /// Location of the current token, or of the last one at end of input.
    fn here(&self) -> SourceLocation {
        match self.peek().or_else(|| self.tokens.last()) {
            Some(tok) => self.location_of(tok),
            None => SourceLocation::new(self.file.clone(), 1, 1),
        }
    }

    fn error(&mut self, location: SourceLocation, message: impl Into<String>) {
        if self.abandoned {
            return;
        }
        let diagnostic = Diagnostic::error(location, message);
        tracing::debug!(%diagnostic, "parse error");
        self.diagnostics.push(diagnostic);
    }

    fn error_here(&mut self, message: impl Into<String>) {
        let location = self.here();
        self.error(location, message);
    }

    /// Run `parse` one nesting level deeper. Past [`MAX_NESTING`] levels the
    /// rest of the file is abandoned with a single diagnostic.
    fn nested<T: Default>(&mut self, parse: impl FnOnce(&mut Self) -> T) -> T {
        if self.depth >= MAX_NESTING {
            self.error_here(format!("declaration nests more than {MAX_NESTING} levels deep"));
            self.abandoned = true;
            self.pos = self.tokens.len();
            return T::default();
        }
        self.depth += 1;
        let result = parse(self);
        self.depth -= 1;
        result
    }

    /// Skip to just past the next `;` or the end of the next braced body,
    /// stopping before an unmatched closing bracket.
    fn recover(&mut self) {
        let start = self.pos;
        let mut depth = 0usize;
        while let Some(tok) = self.peek() {
            if tok.is_punct("{") || tok.is_punct("(") || tok.is_punct("[") {
                depth += 1;
            } else if tok.is_punct("}") || tok.is_punct(")") || tok.is_punct("]") {
                if depth == 0 {
                    if self.pos == start {
                        self.pos += 1;
                    }
                    return;
                }
                depth -= 1;
                if depth == 0 && tok.is_punct("}") {
                    self.pos += 1;
                    return;
                }
            } else if tok.is_punct(";") && depth == 0 {
                self.pos += 1;
                return;
            }
            self.pos += 1;
        }
    }

    /// Collect tokens up to (not including) one of `stops` at nesting depth 0.
    fn collect_until(&mut self, stops: &[&str]) -> Vec<Token> {
        let mut collected = Vec::new();
        let mut depth = 0usize;
        while let Some(tok) = self.peek() {
            if depth == 0 && stops.iter().any(|s| tok.is_punct(s)) {
                break;
            }
            if tok.is_punct("(") || tok.is_punct("[") || tok.is_punct("{") {
                depth += 1;
            } else if tok.is_punct(")") || tok.is_punct("]") || tok.is_punct("}") {
                if depth == 0 {
                    break;
                }
                depth -= 1;
            }
            collected.push(tok.clone());
            self.pos += 1;
        }
        collected
    }

    /// Consume a parenthesised group and return the tokens inside it.
    fn balanced_parens(&mut self) -> Vec<Token> {
        if !self.eat_punct("(") {
            self.error_here("expected '('");
            return Vec::new();
        }
        let inner = self.collect_until(&[")"]);
        if !self.eat_punct(")") {
            self.error_here("expected ')'");
        }
        inner
    }

    /// Consume a braced body, nested braces included.
    fn skip_braces(&mut self) {
        let open = self.here();
        let mut depth = 0usize;
        while let Some(tok) = self.peek() {
            if tok.is_punct("{") {
                depth += 1;
            } else if tok.is_punct("}") {
                depth -= 1;
                if depth == 0 {
                    self.pos += 1;
                    return;
                }
            }
            self.pos += 1;
        }
        self.error(open, "expected '}'");
    }

    // ---- declarations ----

    fn external_declaration(&mut self, out: &mut Vec<Node>) {
        if self.eat_punct(";") {
            return;
        }
        if self.peek_word() == Some("extern")
            && matches!(self.peek_at(1).map(|t| &t.kind), Some(TokenKind::Str(_)))
        {
            self.nested(|parser| parser.linkage_spec(out));
            return;
        }
        if matches!(self.peek_word(), Some("_Static_assert" | "static_assert")) {
            self.collect_until(&[";"]);
            self.eat_punct(";");
            return;
        }
        if self.peek_word().is_some_and(|w| ASM_KEYWORDS.contains(&w)) {
            self.pos += 1;
            self.balanced_parens();
            self.eat_punct(";");
            return;
        }

        let Some(mut specs) = self.specifiers(Context::File) else {
            self.error_here("expected identifier or '('");
            self.recover();
            return;
        };
        out.append(&mut specs.definitions);
        if self.eat_punct(";") {
            return;
        }

        let mut first = true;
        loop {
            let mut decl = self.declarator();
            let Some((name, _)) = decl.name().cloned() else {
                self.error_here("expected identifier or '('");
                self.recover();
                return;
            };
            if first && specs.typedef && is_plain(&decl) {
                if let Some(keyword) = specs.anonymous_tag {
                    specs.base.ty = name_anonymous_tag(keyword, &name, specs.base.is_const);
                }
            }

            let calling_conv = specs.calling_conv.clone().or_else(|| decl.calling_conv());
            let derived = derive(specs.base.clone(), &decl, calling_conv);
            let ty = derived.ty.ty;
            let params = derived.params.filter(|list| list.prototyped).cloned();
            let vector = specs.vector || decl.has_vector();
            let mut attrs = specs.attrs.clone();
            attrs.extend(decl.take_attrs());

            if specs.typedef {
                let underlying = if vector {
                    TypeDescriptor::Unsupported(UnsupportedKind::Vector)
                } else {
                    ty
                };
                tracing::trace!(%name, ?underlying, "typedef");
                self.typedefs.insert(name.clone(), underlying.clone());
                out.push(
                    Node::new(NodeKind::TypedefDecl, name, specs.location.clone())
                        .with_type(underlying)
                        .with_children(attrs),
                );
            } else if ty.is_function() {
                let mut children = attrs;
                if let Some(list) = params {
                    children.extend(list.params.into_iter().map(param_node));
                }
                let node = Node::new(NodeKind::FunctionDecl, name, specs.location.clone())
                    .with_storage(specs.storage)
                    .with_type(ty);
                if first && self.at_punct("{") {
                    let body = Node::new(NodeKind::CompoundStmt, "", self.here());
                    self.skip_braces();
                    children.push(body);
                    out.push(node.with_children(children));
                    return;
                }
                out.push(node.with_children(children));
            } else {
                let ty = if vector {
                    TypeDescriptor::Unsupported(UnsupportedKind::Vector)
                } else {
                    ty
                };
                out.push(
                    Node::new(NodeKind::VarDecl, name, specs.location.clone())
                        .with_storage(specs.storage)
                        .with_type(ty)
                        .with_children(attrs),
                );
                if self.eat_punct("=") {
                    self.collect_until(&[",", ";"]);
                }
            }

            first = false;
            if self.eat_punct(",") {
                continue;
            }
            if self.eat_punct(";") {
                return;
            }
            self.error_here("expected ';' after declaration");
            self.recover();
            return;
        }
    }

    fn linkage_spec(&mut self, out: &mut Vec<Node>) {
        let location = self.here();
        self.pos += 1;
        let language = match self.peek().map(|t| &t.kind) {
            Some(TokenKind::Str(lang)) => lang.clone(),
            _ => String::new(),
        };
        self.pos += 1;
        let mut children = Vec::new();
        if self.eat_punct("{") {
            loop {
                match self.peek() {
                    None => {
                        self.error(location.clone(), "expected '}'");
                        break;
                    }
                    Some(tok) if tok.is_punct("}") => {
                        self.pos += 1;
                        break;
                    }
                    Some(_) => {
                        let before = self.pos;
                        self.external_declaration(&mut children);
                        if self.pos == before {
                            self.pos += 1;
                        }
                    }
                }
            }
        } else {
            self.external_declaration(&mut children);
        }
        out.push(Node::new(NodeKind::LinkageSpec, language, location).with_children(children));
    }

    /// Parse declaration specifiers. `None` when there are none at all.
    fn specifiers(&mut self, context: Context) -> Option<Specifiers> {
        let location = self.here();
        let start = self.pos;
        let mut counts = BaseCounts::default();
        let mut named: Option<TypeDescriptor> = None;
        let mut specs = Specifiers {
            location: location.clone(),
            storage: StorageClass::None,
            typedef: false,
            base: Qualified {
                ty: TypeDescriptor::Void,
                is_const: false,
            },
            calling_conv: None,
            vector: false,
            attrs: Vec::new(),
            definitions: Vec::new(),
            anonymous_tag: None,
        };

        while let Some(word) = self.peek_word().map(str::to_string) {
            let word = word.as_str();
            let has_type = named.is_some() || counts.any();
            if QUALIFIERS.contains(&word) {
                specs.base.is_const |= is_const_qualifier(word);
                self.pos += 1;
                continue;
            }
            if IGNORED_SPECIFIERS.contains(&word) {
                self.pos += 1;
                continue;
            }
            if let Some(attrs) = self.attributes() {
                merge_attributes(&mut specs, attrs);
                continue;
            }
            let storage = match word {
                "typedef" => {
                    specs.typedef = true;
                    None
                }
                "static" => Some(StorageClass::Static),
                "extern" => Some(StorageClass::Extern),
                "register" => Some(StorageClass::Register),
                "auto" => Some(StorageClass::Auto),
                "__private_extern__" => Some(StorageClass::PrivateExtern),
                _ => {
                    if !self.type_specifier(word, has_type, &mut counts, &mut named, &mut specs) {
                        break;
                    }
                    continue;
                }
            };
            if let Some(storage) = storage {
                if context == Context::File {
                    specs.storage = storage;
                }
            }
            self.pos += 1;
        }

        let has_type = named.is_some() || counts.any();
        if !has_type {
            if let Some(word) = self.peek_word().map(str::to_string) {
                let follows_name = self
                    .peek_at(1)
                    .is_some_and(|t| t.ident().is_some() || t.is_punct("*"));
                if !is_keyword(&word) && (follows_name || context == Context::Param) {
                    self.error_here(format!("unknown type name '{word}'"));
                    self.pos += 1;
                    named = Some(TypeDescriptor::int(Signedness::Signed, IntWidth::W32));
                }
            }
        }
        if named.is_none() && !counts.any() {
            if self.pos == start {
                return None;
            }
            self.error(location.clone(), "type specifier missing, defaults to 'int'");
            counts.int = 1;
        }

        let ty = match named {
            Some(ty) => {
                if counts.any() {
                    self.error(location, "cannot combine with previous declaration specifier");
                }
                ty
            }
            None => self.builtin_type(&counts, &location),
        };
        specs.base.ty = const_spelling(ty, specs.base.is_const);
        Some(specs)
    }

    /// Consume one type specifier word. Returns false when `word` does not
    /// continue the specifier list.
    fn type_specifier(
        &mut self,
        word: &str,
        has_type: bool,
        counts: &mut BaseCounts,
        named: &mut Option<TypeDescriptor>,
        specs: &mut Specifiers,
    ) -> bool {
        let counter = match word {
            "void" => &mut counts.void,
            "_Bool" | "bool" => &mut counts.bool,
            "char" => &mut counts.char,
            "short" => &mut counts.short,
            "int" => &mut counts.int,
            "long" => &mut counts.long,
            "signed" | "__signed" | "__signed__" => &mut counts.signed,
            "unsigned" => &mut counts.unsigned,
            "float" => &mut counts.float,
            "double" => &mut counts.double,
            "_Complex" | "__complex__" => &mut counts.complex,
            "__int128" => &mut counts.int128,
            "struct" | "union" | "enum" => {
                let keyword = match word {
                    "struct" => "struct",
                    "union" => "union",
                    _ => "enum",
                };
                let ty = self.tag(keyword, specs);
                *named = Some(ty);
                return true;
            }
            _ => {
                if has_type {
                    return false;
                }
                let builtin = match word {
                    "__int128_t" => Some(TypeDescriptor::int(Signedness::Signed, IntWidth::W128)),
                    "__uint128_t" => Some(TypeDescriptor::int(Signedness::Unsigned, IntWidth::W128)),
                    "__float128" | "_Float128" => Some(TypeDescriptor::Float(FloatKind::LongDouble)),
                    "_Float16" | "__fp16" => Some(TypeDescriptor::Unsupported(UnsupportedKind::Other(
                        "half-precision float".into(),
                    ))),
                    _ => None,
                };
                let resolved = builtin.or_else(|| {
                    self.typedefs
                        .get(word)
                        .map(|underlying| TypeDescriptor::typedef(word, underlying.clone()))
                });
                match resolved {
                    Some(ty) => {
                        *named = Some(ty);
                        self.pos += 1;
                        return true;
                    }
                    None => return false,
                }
            }
        };
        *counter += 1;
        self.pos += 1;
        true
    }

    fn builtin_type(&mut self, counts: &BaseCounts, location: &SourceLocation) -> TypeDescriptor {
        if counts.signed > 0 && counts.unsigned > 0 {
            self.error(
                location.clone(),
                "'signed' and 'unsigned' cannot be combined",
            );
        }
        if counts.kinds() > 1 {
            self.error(location.clone(), "cannot combine with previous declaration specifier");
        }
        let signedness = if counts.unsigned > 0 {
            Signedness::Unsigned
        } else {
            Signedness::Signed
        };
        if counts.complex > 0 {
            return TypeDescriptor::Unsupported(UnsupportedKind::Complex);
        }
        if counts.void > 0 {
            return TypeDescriptor::Void;
        }
        if counts.bool > 0 {
            return TypeDescriptor::Bool;
        }
        if counts.char > 0 {
            return match (counts.signed > 0, counts.unsigned > 0) {
                (true, _) => TypeDescriptor::Char(CharKind::Signed),
                (_, true) => TypeDescriptor::Char(CharKind::Unsigned),
                _ => self.model.plain_char(),
            };
        }
        if counts.float > 0 {
            return TypeDescriptor::Float(FloatKind::Float);
        }
        if counts.double > 0 {
            return TypeDescriptor::Float(if counts.long > 0 {
                FloatKind::LongDouble
            } else {
                FloatKind::Double
            });
        }
        let width = if counts.int128 > 0 {
            IntWidth::W128
        } else if counts.short > 0 {
            IntWidth::W16
        } else {
            match counts.long {
                0 => IntWidth::W32,
                1 => self.model.long_width,
                2 => IntWidth::W64,
                _ => {
                    self.error(location.clone(), "'long long long' is invalid");
                    IntWidth::W64
                }
            }
        };
        TypeDescriptor::int(signedness, width)
    }

    /// Parse `struct`/`union`/`enum` with an optional name and body.
    fn tag(&mut self, keyword: &'static str, specs: &mut Specifiers) -> TypeDescriptor {
        let location = self.here();
        self.pos += 1;
        let mut attrs = Vec::new();
        while let Some(parsed) = self.attributes() {
            attrs.extend(parsed.nodes);
        }
        let name = match self.peek_word() {
            Some(word) if !is_keyword(word) => {
                let word = word.to_string();
                self.pos += 1;
                Some(word)
            }
            _ => None,
        };
        let spelling = match &name {
            Some(name) => format!("{keyword} {name}"),
            None => format!(
                "{keyword} (anonymous at {}:{}:{})",
                location.file, location.line, location.column
            ),
        };

        if self.at_punct("{") {
            let children = if keyword == "enum" {
                self.enum_body()
            } else {
                self.nested(Self::record_body)
            };
            let kind = match keyword {
                "struct" => NodeKind::StructDecl,
                "union" => NodeKind::UnionDecl,
                _ => NodeKind::EnumDecl,
            };
            attrs.extend(children);
            specs
                .definitions
                .push(Node::new(kind, name.clone().unwrap_or_default(), location).with_children(attrs));
            if name.is_none() {
                specs.anonymous_tag = Some(keyword);
            }
        } else if name.is_none() {
            self.error(location, format!("declaration of anonymous {keyword} must be a definition"));
        }

        if keyword == "enum" {
            TypeDescriptor::Enum { spelling }
        } else {
            TypeDescriptor::Record { spelling }
        }
    }

    fn record_body(&mut self) -> Vec<Node> {
        self.pos += 1;
        let mut fields = Vec::new();
        loop {
            match self.peek() {
                None => {
                    self.error_here("expected '}'");
                    break;
                }
                Some(tok) if tok.is_punct("}") => {
                    self.pos += 1;
                    break;
                }
                Some(tok) if tok.is_punct(";") => {
                    self.pos += 1;
                    continue;
                }
                Some(_) => {}
            }
            let Some(mut specs) = self.specifiers(Context::Member) else {
                self.error_here("expected member declaration");
                self.recover();
                continue;
            };
            fields.append(&mut specs.definitions);
            if self.eat_punct(";") {
                continue;
            }
            loop {
                let mut decl = if self.at_punct(":") {
                    Declarator::default()
                } else {
                    self.declarator()
                };
                if self.eat_punct(":") {
                    self.bit_width();
                }
                let derived = derive(specs.base.clone(), &decl, specs.calling_conv.clone());
                let ty = if specs.vector || decl.has_vector() {
                    TypeDescriptor::Unsupported(UnsupportedKind::Vector)
                } else {
                    derived.ty.ty
                };
                let (name, location) = decl
                    .name()
                    .cloned()
                    .unwrap_or_else(|| (String::new(), specs.location.clone()));
                let mut attrs = specs.attrs.clone();
                attrs.extend(decl.take_attrs());
                fields.push(
                    Node::new(NodeKind::FieldDecl, name, location)
                        .with_type(ty)
                        .with_children(attrs),
                );
                if self.eat_punct(",") {
                    continue;
                }
                if self.eat_punct(";") {
                    break;
                }
                self.error_here("expected ';' at end of declaration list");
                self.recover();
                break;
            }
        }
        fields
    }

    /// Check a bit-field width. The width itself does not affect any
    /// declared type.
    fn bit_width(&mut self) {
        let location = self.here();
        let tokens = self.collect_until(&[",", ";"]);
        match expr::evaluate(&tokens, &self.constants) {
            Ok(width) if width < 0 => self.error(location, "bit-field has negative width"),
            Ok(width) => tracing::trace!(width = %width, "bit-field"),
            Err(ExprError::NotConstant(name)) => {
                self.error(location, format!("bit-field width is not a constant ('{name}')"));
            }
            Err(ExprError::Invalid(message)) => self.error(location, message),
        }
    }

    fn enum_body(&mut self) -> Vec<Node> {
        self.pos += 1;
        let mut enumerators = Vec::new();
        let mut next = Some(0i128);
        let mut overflowed = false;
        loop {
            if self.eat_punct("}") {
                break;
            }
            let Some(tok) = self.peek().cloned() else {
                self.error_here("expected '}'");
                break;
            };
            let Some(name) = tok.ident().map(str::to_string) else {
                self.error(self.location_of(&tok), "expected identifier");
                self.pos += 1;
                self.collect_until(&[",", "}"]);
                self.eat_punct(",");
                continue;
            };
            let location = self.location_of(&tok);
            self.pos += 1;
            while self.attributes().is_some() {}
            if self.eat_punct("=") {
                let value_location = self.here();
                let tokens = self.collect_until(&[",", "}"]);
                next = match expr::evaluate(&tokens, &self.constants) {
                    Ok(value) => Some(value),
                    Err(ExprError::NotConstant(_)) => None,
                    Err(ExprError::Invalid(message)) => {
                        self.error(value_location, message);
                        None
                    }
                };
            } else if overflowed {
                self.error(location.clone(), format!("overflow in enumeration value for '{name}'"));
            }
            if let Some(value) = next {
                self.constants.insert(name.clone(), value);
            }
            let current = next;
            next = current.and_then(|value| value.checked_add(1));
            overflowed = current.is_some() && next.is_none();
            enumerators.push(
                Node::new(NodeKind::EnumConstantDecl, name, location)
                    .with_type(TypeDescriptor::int(Signedness::Signed, IntWidth::W32)),
            );
            if self.eat_punct(",") || self.at_punct("}") {
                continue;
            }
            self.error_here("expected '}'");
            self.recover();
            break;
        }
        enumerators
    }

    // ---- declarators ----

    fn declarator(&mut self) -> Declarator {
        self.nested(Self::declarator_levels)
    }

    fn declarator_levels(&mut self) -> Declarator {
        let mut decl = Declarator::default();
        loop {
            if self.declarator_attribute(&mut decl) {
                continue;
            }
            let block = self.at_punct("^");
            if !block && !self.at_punct("*") {
                break;
            }
            self.pos += 1;
            let mut level = PointerLevel {
                is_const: false,
                block,
            };
            while let Some(word) = self.peek_word() {
                if QUALIFIERS.contains(&word) {
                    level.is_const |= is_const_qualifier(word);
                    self.pos += 1;
                } else if !self.declarator_attribute(&mut decl) {
                    break;
                }
            }
            decl.pointers.push(level);
        }

        match self.peek().cloned() {
            Some(tok) if tok.ident().is_some_and(|w| !is_keyword(w)) => {
                let name = tok.ident().unwrap_or_default().to_string();
                decl.name = Some((name, self.location_of(&tok)));
                self.pos += 1;
            }
            Some(tok) if tok.is_punct("(") && self.paren_opens_declarator() => {
                self.pos += 1;
                let inner = self.declarator();
                if !self.eat_punct(")") {
                    self.error_here("expected ')'");
                }
                decl.inner = Some(Box::new(inner));
            }
            _ => {}
        }

        loop {
            if self.at_punct("[") {
                let len = self.array_len();
                decl.suffixes.push(Suffix::Array(len));
            } else if self.at_punct("(") {
                let list = self.param_list();
                decl.suffixes.push(Suffix::Function(list));
            } else {
                break;
            }
        }

        loop {
            if self.declarator_attribute(&mut decl) {
                continue;
            }
            if self.peek_word().is_some_and(|w| ASM_KEYWORDS.contains(&w)) {
                self.pos += 1;
                self.balanced_parens();
                continue;
            }
            break;
        }
        decl
    }

    fn declarator_attribute(&mut self, decl: &mut Declarator) -> bool {
        match self.attributes() {
            Some(attrs) => {
                decl.attrs.extend(attrs.nodes);
                decl.vector |= attrs.vector;
                if attrs.calling_conv.is_some() {
                    decl.calling_conv = attrs.calling_conv;
                }
                true
            }
            None => false,
        }
    }

    /// Whether the `(` at the cursor opens a nested declarator rather than
    /// a parameter list.
    fn paren_opens_declarator(&self) -> bool {
        match self.peek_at(1) {
            Some(tok) if tok.is_punct("*") || tok.is_punct("^") => true,
            Some(tok) => match tok.ident() {
                Some(word) if ATTRIBUTE_KEYWORDS.contains(&word) => true,
                Some(word) if calling_conv_keyword(word).is_some() => true,
                Some(word) => !is_keyword(word) && !self.typedefs.contains_key(word),
                None => false,
            },
            None => false,
        }
    }

    fn array_len(&mut self) -> ArrayLen {
        self.pos += 1;
        while self
            .peek_word()
            .is_some_and(|w| QUALIFIERS.contains(&w) || w == "static")
        {
            self.pos += 1;
        }
        if self.eat_punct("]") {
            return ArrayLen::Unknown;
        }
        if self.at_punct("*") && self.peek_at(1).is_some_and(|t| t.is_punct("]")) {
            self.pos += 2;
            return ArrayLen::Variable;
        }
        let location = self.here();
        let tokens = self.collect_until(&["]"]);
        if !self.eat_punct("]") {
            self.error_here("expected ']'");
        }
        match expr::evaluate(&tokens, &self.constants) {
            Ok(len) => match u64::try_from(len) {
                Ok(len) => ArrayLen::Fixed(len),
                Err(_) => {
                    self.error(location, "array has negative size");
                    ArrayLen::Unknown
                }
            },
            Err(ExprError::NotConstant(name)) => {
                tracing::debug!(%name, "array bound is not constant");
                ArrayLen::Variable
            }
            Err(ExprError::Invalid(message)) => {
                self.error(location, message);
                ArrayLen::Unknown
            }
        }
    }

    fn param_list(&mut self) -> ParamList {
        self.pos += 1;
        let mut list = ParamList::default();
        if self.eat_punct(")") {
            return list;
        }
        list.prototyped = true;
        if self.peek_word() == Some("void") && self.peek_at(1).is_some_and(|t| t.is_punct(")")) {
            self.pos += 2;
            return list;
        }
        loop {
            if self.eat_punct("...") {
                list.variadic = true;
                if !self.eat_punct(")") {
                    self.error_here("expected ')'");
                    self.collect_until(&[")"]);
                    self.eat_punct(")");
                }
                return list;
            }
            let location = self.here();
            match self.specifiers(Context::Param) {
                Some(specs) => {
                    let mut decl = self.declarator();
                    let calling_conv = specs.calling_conv.clone().or_else(|| decl.calling_conv());
                    let derived = derive(specs.base.clone(), &decl, calling_conv);
                    let ty = if specs.vector || decl.has_vector() {
                        TypeDescriptor::Unsupported(UnsupportedKind::Vector)
                    } else {
                        decay(derived.ty)
                    };
                    let name = decl.name().map(|(n, _)| n.clone()).unwrap_or_default();
                    let mut attrs = specs.attrs;
                    attrs.extend(decl.take_attrs());
                    list.params.push(Param {
                        name,
                        location,
                        ty,
                        attrs,
                    });
                }
                None => {
                    self.error_here("expected parameter declarator");
                    self.collect_until(&[",", ")"]);
                }
            }
            if self.eat_punct(",") {
                continue;
            }
            if self.eat_punct(")") {
                return list;
            }
            self.error_here("expected ')'");
            self.collect_until(&[")"]);
            self.eat_punct(")");
            return list;
        }
    }

    // ---- attributes ----

    /// Parse one `__attribute__((...))`, `__declspec(...)` or calling
    /// convention keyword at the cursor.
    fn attributes(&mut self) -> Option<Attributes> {
        let tok = self.peek()?.clone();
        let word = tok.ident()?;
        if let Some(cc) = calling_conv_keyword(word) {
            self.pos += 1;
            return Some(Attributes {
                calling_conv: Some(cc),
                ..Attributes::default()
            });
        }
        if !ATTRIBUTE_KEYWORDS.contains(&word) {
            return None;
        }
        let declspec = word == "__declspec";
        self.pos += 1;
        let mut inner = self.balanced_parens();
        if !declspec
            && inner.first().is_some_and(|t| t.is_punct("("))
            && inner.last().is_some_and(|t| t.is_punct(")"))
        {
            inner = inner[1..inner.len() - 1].to_vec();
        }

        let mut parsed = Attributes::default();
        for item in split_top_level(&inner) {
            let Some(first) = item.first() else { continue };
            let Some(raw) = first.ident() else { continue };
            let name = raw.trim_start_matches("__").trim_end_matches("__");
            let args = &item[1..];
            if let Some(cc) = calling_conv_attribute(name, args) {
                parsed.calling_conv = Some(cc);
            }
            if matches!(name, "vector_size" | "ext_vector_type" | "neon_vector_type") {
                parsed.vector = true;
            }
            parsed
                .nodes
                .push(Node::new(NodeKind::UnexposedAttr, name, self.location_of(first)));
        }
        Some(parsed)
    }
}

fn merge_attributes(specs: &mut Specifiers, attrs: Attributes) {
    specs.attrs.extend(attrs.nodes);
    specs.vector |= attrs.vector;
    if attrs.calling_conv.is_some() {
        specs.calling_conv = attrs.calling_conv;
    }
}

/// Split attribute tokens on commas outside parentheses.
fn split_top_level(tokens: &[Token]) -> Vec<&[Token]> {
    let mut items = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    for (i, tok) in tokens.iter().enumerate() {
        if tok.is_punct("(") {
            depth += 1;
        } else if tok.is_punct(")") {
            depth = depth.saturating_sub(1);
        } else if tok.is_punct(",") && depth == 0 {
            items.push(&tokens[start..i]);
            start = i + 1;
        }
    }
    items.push(&tokens[start..]);
    items
}

fn param_node(param: Param) -> Node {
    Node::new(NodeKind::ParmDecl, param.name, param.location)
        .with_type(param.ty)
        .with_children(param.attrs)
}

/// A declarator that is just a name.
fn is_plain(decl: &Declarator) -> bool {
    decl.pointers.is_empty() && decl.suffixes.is_empty() && decl.inner.is_none()
}

/// Spell a const-qualified named type the way compilers print it.
fn const_spelling(ty: TypeDescriptor, is_const: bool) -> TypeDescriptor {
    if !is_const {
        return ty;
    }
    match ty {
        TypeDescriptor::Typedef { spelling, underlying } => TypeDescriptor::Typedef {
            spelling: format!("const {spelling}"),
            underlying,
        },
        TypeDescriptor::Record { spelling } => TypeDescriptor::Record {
            spelling: format!("const {spelling}"),
        },
        TypeDescriptor::Enum { spelling } => TypeDescriptor::Enum {
            spelling: format!("const {spelling}"),
        },
        other => other,
    }
}

/// An anonymous struct, union or enum takes the name of the typedef that
/// declares it.
fn name_anonymous_tag(keyword: &str, name: &str, is_const: bool) -> TypeDescriptor {
    let spelling = format!("{keyword} {name}");
    let ty = if keyword == "enum" {
        TypeDescriptor::Enum { spelling }
    } else {
        TypeDescriptor::Record { spelling }
    };
    const_spelling(ty, is_const)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::tokenize;
    use pretty_assertions::assert_eq;

    fn parse_with(source: &str, model: DataModel) -> (Node, Vec<Diagnostic>) {
        let (tokens, errors) = tokenize(source);
        assert!(errors.is_empty(), "lex errors: {errors:?}");
        Parser::new("test.h", tokens, model).parse()
    }

    fn parse_ok(source: &str) -> Node {
        let (root, diagnostics) = parse_with(source, DataModel::default());
        assert!(diagnostics.is_empty(), "unexpected diagnostics: {diagnostics:?}");
        root
    }

    fn messages(source: &str) -> Vec<String> {
        let (_, diagnostics) = parse_with(source, DataModel::default());
        diagnostics.into_iter().map(|d| d.to_string()).collect()
    }

    fn i32() -> TypeDescriptor {
        TypeDescriptor::int(Signedness::Signed, IntWidth::W32)
    }

    fn find<'a>(root: &'a Node, name: &str) -> &'a Node {
        fn search<'a>(node: &'a Node, name: &str) -> Option<&'a Node> {
            node.children
                .iter()
                .find_map(|c| (c.spelling == name).then_some(c).or_else(|| search(c, name)))
        }
        search(root, name).unwrap_or_else(|| panic!("no node named {name}"))
    }

    fn signature(node: &Node) -> &hdrbind_core::descriptor::FunctionSignature {
        node.ty
            .as_ref()
            .and_then(TypeDescriptor::signature)
            .expect("function type")
    }

    #[test]
    fn simple_prototype() {
        let root = parse_ok("int add(int a, int b);");
        let add = find(&root, "add");
        assert_eq!(add.kind, NodeKind::FunctionDecl);
        assert_eq!(add.location, SourceLocation::new("test.h", 1, 1));
        let sig = signature(add);
        assert_eq!(sig.result, i32());
        assert_eq!(sig.params, vec![i32(), i32()]);
        let names: Vec<_> = add.children.iter().map(|c| c.spelling.as_str()).collect();
        assert_eq!(names, ["a", "b"]);
        assert_eq!(add.children[1].location.column, 16);
    }

    #[test]
    fn void_and_empty_parameter_lists() {
        let root = parse_ok("void a(void); int b();");
        assert!(signature(find(&root, "a")).params.is_empty());
        assert!(matches!(
            find(&root, "b").ty,
            Some(TypeDescriptor::FunctionNoProto { .. })
        ));
    }

    #[test]
    fn pointers_and_const() {
        let root = parse_ok("const char *name(char * const *argv);");
        let sig = signature(find(&root, "name"));
        let plain = TypeDescriptor::Char(CharKind::Plain(Signedness::Signed));
        assert_eq!(sig.result, TypeDescriptor::pointer(plain.clone(), true));
        assert_eq!(
            sig.params[0],
            TypeDescriptor::pointer(TypeDescriptor::pointer(plain, false), true)
        );
    }

    #[test]
    fn storage_classes() {
        let root = parse_ok("static int s(void); extern int e(void); int n(void); __private_extern__ int p(void);");
        assert_eq!(find(&root, "s").storage, StorageClass::Static);
        assert_eq!(find(&root, "e").storage, StorageClass::Extern);
        assert_eq!(find(&root, "n").storage, StorageClass::None);
        assert_eq!(find(&root, "p").storage, StorageClass::PrivateExtern);
    }

    #[test]
    fn definitions_get_a_body_node() {
        let root = parse_ok("static inline int twice(int x) { if (x) { return x * 2; } return 0; }\nint after(void);");
        let twice = find(&root, "twice");
        assert_eq!(twice.children.last().map(|c| &c.kind), Some(&NodeKind::CompoundStmt));
        assert_eq!(find(&root, "after").kind, NodeKind::FunctionDecl);
    }

    #[test]
    fn typedefs_resolve() {
        let root = parse_ok("typedef unsigned long handle_t;\nhandle_t open_handle(const handle_t *h);");
        let sig = signature(find(&root, "open_handle"));
        let ulong = TypeDescriptor::int(Signedness::Unsigned, IntWidth::W64);
        assert_eq!(sig.result, TypeDescriptor::typedef("handle_t", ulong.clone()));
        assert_eq!(
            sig.params[0],
            TypeDescriptor::pointer(TypeDescriptor::typedef("const handle_t", ulong), true)
        );
    }

    #[test]
    fn predefined_fixed_width_types() {
        let root = parse_ok("uint32_t crc(const uint8_t *data, size_t len);");
        let sig = signature(find(&root, "crc"));
        assert!(matches!(&sig.result, TypeDescriptor::Typedef { spelling, .. } if spelling == "uint32_t"));
        assert!(matches!(&sig.params[1], TypeDescriptor::Typedef { spelling, .. } if spelling == "size_t"));
    }

    #[test]
    fn records_and_enums() {
        let root = parse_ok(
            "struct point { int x, y; unsigned flags : 3; };\nenum color { RED, GREEN = 5, BLUE };\nvoid draw(struct point *p, enum color c);",
        );
        let point = find(&root, "point");
        assert_eq!(point.kind, NodeKind::StructDecl);
        let fields: Vec<_> = point.children.iter().map(|c| c.spelling.as_str()).collect();
        assert_eq!(fields, ["x", "y", "flags"]);
        let color = find(&root, "color");
        assert_eq!(color.children.len(), 3);

        let sig = signature(find(&root, "draw"));
        assert_eq!(
            sig.params[0],
            TypeDescriptor::pointer(TypeDescriptor::Record { spelling: "struct point".into() }, false)
        );
        assert_eq!(sig.params[1], TypeDescriptor::Enum { spelling: "enum color".into() });
    }

    #[test]
    fn enum_values_size_arrays() {
        let root = parse_ok("enum { SMALL = 4, LARGE = SMALL * 4 };\nvoid fill(int out[LARGE + 1]);\nextern int table[LARGE];");
        assert!(matches!(
            find(&root, "table").ty,
            Some(TypeDescriptor::ConstantArray { len: 16, .. })
        ));
        assert_eq!(
            signature(find(&root, "fill")).params[0],
            TypeDescriptor::pointer(i32(), false)
        );
    }

    #[test]
    fn anonymous_typedef_struct_takes_typedef_name() {
        let root = parse_ok("typedef struct { int x; } Point;\nPoint origin(void);");
        let sig = signature(find(&root, "origin"));
        assert_eq!(
            sig.result,
            TypeDescriptor::typedef("Point", TypeDescriptor::Record { spelling: "struct Point".into() })
        );
    }

    #[test]
    fn function_pointers() {
        let root = parse_ok("typedef void (*callback_t)(int);\nvoid on(callback_t cb, int (*filter)(const char *));\nvoid (*signal(int sig, void (*func)(int)))(int);");
        let sig = signature(find(&root, "on"));
        assert!(matches!(&sig.params[0], TypeDescriptor::Typedef { spelling, .. } if spelling == "callback_t"));
        match &sig.params[1] {
            TypeDescriptor::Pointer { pointee, .. } => assert!(pointee.is_function()),
            other => panic!("expected pointer, got {other:?}"),
        }

        let signal = find(&root, "signal");
        let names: Vec<_> = signal.children.iter().map(|c| c.spelling.as_str()).collect();
        assert_eq!(names, ["sig", "func"]);
        match &signature(signal).result {
            TypeDescriptor::Pointer { pointee, .. } => assert!(pointee.is_function()),
            other => panic!("expected pointer, got {other:?}"),
        }
    }

    #[test]
    fn function_parameters_decay() {
        let root = parse_ok("void sort(int cmp(int, int), char buf[]);");
        let sig = signature(find(&root, "sort"));
        assert!(matches!(&sig.params[0], TypeDescriptor::Pointer { pointee, .. } if pointee.is_function()));
        assert!(matches!(&sig.params[1], TypeDescriptor::Pointer { is_const: false, .. }));
    }

    #[test]
    fn variadic_and_calling_conventions() {
        let root = parse_ok(
            "int printf(const char *fmt, ...);\nint __stdcall win(int);\nint __attribute__((fastcall)) fast(int);\nint __attribute__((ms_abi)) ms(void);",
        );
        assert!(signature(find(&root, "printf")).variadic);
        assert_eq!(signature(find(&root, "win")).calling_conv, CallingConv::StdCall);
        assert_eq!(signature(find(&root, "fast")).calling_conv, CallingConv::FastCall);
        assert_eq!(signature(find(&root, "ms")).calling_conv, CallingConv::Win64);
    }

    #[test]
    fn attributes_become_nodes() {
        let root = parse_ok("__attribute__((visibility(\"default\"), nonnull)) void *get(void) __asm__(\"_get\");");
        let get = find(&root, "get");
        let kinds: Vec<_> = get.children.iter().map(|c| (&c.kind, c.spelling.as_str())).collect();
        assert_eq!(
            kinds,
            [
                (&NodeKind::UnexposedAttr, "visibility"),
                (&NodeKind::UnexposedAttr, "nonnull")
            ]
        );
    }

    #[test]
    fn unsupported_types_are_described() {
        let root = parse_ok(
            "typedef float v4 __attribute__((vector_size(16)));\nvoid a(v4 x);\nvoid b(double _Complex z);\nvoid c(void (^block)(void));\nvoid d(__int128 big);",
        );
        assert_eq!(
            signature(find(&root, "a")).params[0],
            TypeDescriptor::typedef("v4", TypeDescriptor::Unsupported(UnsupportedKind::Vector))
        );
        assert_eq!(
            signature(find(&root, "b")).params[0],
            TypeDescriptor::Unsupported(UnsupportedKind::Complex)
        );
        assert_eq!(
            signature(find(&root, "c")).params[0],
            TypeDescriptor::Unsupported(UnsupportedKind::BlockPointer)
        );
        assert_eq!(
            signature(find(&root, "d")).params[0],
            TypeDescriptor::int(Signedness::Signed, IntWidth::W128)
        );
    }

    #[test]
    fn variable_length_array_parameter() {
        let root = parse_ok("void vla(int n, double values[n]);");
        assert_eq!(
            signature(find(&root, "vla")).params[1],
            TypeDescriptor::Unsupported(UnsupportedKind::VariableArray)
        );
    }

    #[test]
    fn extern_c_blocks() {
        let root = parse_ok("#ifdef __cplusplus\nextern \"C\" {\n#endif\nint inside(void);\n#ifdef __cplusplus\n}\n#endif\n");
        // Without macro expansion both halves of the guard are seen.
        let spec = &root.children[0];
        assert_eq!(spec.kind, NodeKind::LinkageSpec);
        assert_eq!(spec.spelling, "C");
        assert_eq!(spec.children[0].spelling, "inside");
    }

    #[test]
    fn data_model_changes_long() {
        let (root, _) = parse_with("long size(void);", DataModel::ILP32);
        assert_eq!(
            signature(find(&root, "size")).result,
            TypeDescriptor::int(Signedness::Signed, IntWidth::W32)
        );
        let (root, _) = parse_with("char c(void);", DataModel::for_triple("aarch64-linux-gnu"));
        assert_eq!(
            signature(find(&root, "c")).result,
            TypeDescriptor::Char(CharKind::Plain(Signedness::Unsigned))
        );
    }

    #[test]
    fn globals_with_initializers() {
        let root = parse_ok("static const int limits[] = { 1, 2, 3 }, count = 3;\nint after(void);");
        assert_eq!(find(&root, "limits").kind, NodeKind::VarDecl);
        assert_eq!(find(&root, "count").storage, StorageClass::Static);
        assert_eq!(find(&root, "after").kind, NodeKind::FunctionDecl);
    }

    #[test]
    fn unknown_type_name_is_reported() {
        assert_eq!(
            messages("mystery_t make(void);"),
            ["test.h line 1, column 1: unknown type name 'mystery_t'"]
        );
        assert_eq!(
            messages("void take(int a, widget_t w);"),
            ["test.h line 1, column 18: unknown type name 'widget_t'"]
        );
    }

    #[test]
    fn missing_semicolon_is_reported_and_parsing_recovers() {
        let (root, diagnostics) = parse_with("int a(void)\nint b(void);\nint c(void);", DataModel::default());
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(
            diagnostics[0].to_string(),
            "test.h line 2, column 1: expected ';' after declaration"
        );
        assert_eq!(find(&root, "c").kind, NodeKind::FunctionDecl);
    }

    #[test]
    fn stray_closing_brace() {
        let messages = messages("}\nint ok(void);");
        assert_eq!(messages, ["test.h line 1, column 1: extraneous closing brace ('}')"]);
    }

    #[test]
    fn enumerator_overflow_is_reported() {
        assert_eq!(
            messages("enum big { A = 170141183460469231731687303715884105727, B };"),
            ["test.h line 1, column 57: overflow in enumeration value for 'B'"]
        );
        let root = parse_ok("enum edge { A = 170141183460469231731687303715884105727, B = 0 };");
        assert_eq!(find(&root, "B").kind, NodeKind::EnumConstantDecl);
    }

    #[test]
    fn overflowing_array_bound_is_reported() {
        assert_eq!(
            messages("int a[(-170141183460469231731687303715884105727 - 1) / -1];"),
            ["test.h line 1, column 7: integer overflow in constant expression"]
        );
    }

    #[test]
    fn deeply_nested_declarator_is_reported_once() {
        let source = format!("int {}x{};\nint after(void);", "(*".repeat(50_000), ")".repeat(50_000));
        let messages = messages(&source);
        assert_eq!(messages.len(), 1, "{messages:?}");
        assert!(messages[0].ends_with("declaration nests more than 256 levels deep"));
    }

    #[test]
    fn deeply_nested_records_are_reported_once() {
        let source = format!("{}int x;{}", "struct s { ".repeat(5_000), " } f;".repeat(5_000));
        let messages = messages(&source);
        assert_eq!(messages.len(), 1, "{messages:?}");
        assert!(messages[0].ends_with("declaration nests more than 256 levels deep"));
    }

    #[test]
    fn deeply_parenthesized_array_bound_is_reported() {
        let source = format!("int a[{}1{}];", "(".repeat(50_000), ")".repeat(50_000));
        assert_eq!(
            messages(&source),
            ["test.h line 1, column 7: constant expression nests more than 256 levels deep"]
        );
    }
}
