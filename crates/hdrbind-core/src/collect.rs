//! Function signature collection from a declaration tree.
//!
//! The [`Collector`] is a [`Visitor`] that keeps at most one function in
//! progress. Parameter types come from the function type when the
//! declaration is entered; parameter names arrive afterwards, one
//! `ParmDecl` node at a time, while the declaration's children are walked.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::ast::{walk, Node, NodeKind, Visit, Visitor};
use crate::classify::classify;
use crate::descriptor::TypeDescriptor;
use crate::diag::{Reporter, SourceLocation};
use crate::error::{BindError, Result};

/// One function parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arg {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
}

impl Arg {
    pub fn new(name: impl Into<String>, ty: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ty: ty.into(),
        }
    }
}

/// A collected function signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FnDecl {
    pub name: String,
    pub return_type: String,
    pub args: Vec<Arg>,
}

/// Naming progress of the function being collected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamState {
    /// All parameter types known, no names yet.
    Typed { arity: usize },
    /// Some parameters named.
    PartiallyNamed { named: usize, arity: usize },
    /// Every parameter named (or there are none).
    Complete { arity: usize },
}

#[derive(Debug)]
struct PendingFn {
    decl: FnDecl,
    named: usize,
}

impl PendingFn {
    fn state(&self) -> ParamState {
        let arity = self.decl.args.len();
        match self.named {
            0 if arity > 0 => ParamState::Typed { arity },
            named if named < arity => ParamState::PartiallyNamed { named, arity },
            _ => ParamState::Complete { arity },
        }
    }

    fn name_next(&mut self, name: &str, location: &SourceLocation) -> Result<()> {
        let arity = self.decl.args.len();
        let Some(arg) = self.decl.args.get_mut(self.named) else {
            return Err(BindError::ArityExceeded {
                function: self.decl.name.clone(),
                name: name.to_string(),
                arity,
                index: self.named,
                location: location.clone(),
            });
        };
        arg.name = name.to_string();
        self.named += 1;
        Ok(())
    }

    /// Unnamed parameters become `arg<index>`.
    fn finish(mut self) -> FnDecl {
        for (index, arg) in self.decl.args.iter_mut().enumerate() {
            if arg.name.is_empty() {
                arg.name = format!("arg{index}");
            }
        }
        self.decl
    }
}

/// Assembles [`FnDecl`]s from a depth-first walk of a declaration tree.
pub struct Collector<'r> {
    current: Option<PendingFn>,
    functions: Vec<FnDecl>,
    reporter: &'r mut dyn Reporter,
}

impl<'r> Collector<'r> {
    pub fn new(reporter: &'r mut dyn Reporter) -> Self {
        Self {
            current: None,
            functions: Vec::new(),
            reporter,
        }
    }

    /// Walk `root` and return every exportable function beneath it.
    pub fn collect(root: &Node, reporter: &'r mut dyn Reporter) -> Result<Vec<FnDecl>> {
        let mut collector = Self::new(reporter);
        walk(root, &mut collector)?;
        Ok(collector.finish())
    }

    /// Naming progress of the function in progress, if any.
    pub fn param_state(&self) -> Option<ParamState> {
        self.current.as_ref().map(PendingFn::state)
    }

    /// Finalize the function in progress and return everything collected.
    pub fn finish(mut self) -> Vec<FnDecl> {
        self.end_fn();
        self.functions
    }

    fn end_fn(&mut self) {
        if let Some(pending) = self.current.take() {
            if let ParamState::PartiallyNamed { named, arity } = pending.state() {
                debug!(function = %pending.decl.name, named, arity, "function finished with unnamed parameters");
            }
            self.functions.push(pending.finish());
        }
    }

    fn function(&mut self, node: &Node) -> Result<Visit> {
        if !node.storage.is_exported() {
            debug!(function = %node.spelling, storage = ?node.storage, "skipping function without external linkage");
            return Ok(Visit::Continue);
        }

        let sig = match node.ty.as_ref().map(TypeDescriptor::peel) {
            Some(TypeDescriptor::FunctionProto(sig)) => sig,
            Some(TypeDescriptor::FunctionNoProto { .. }) => {
                self.reporter.warn(
                    &node.location,
                    "skipping function without prototype, not yet supported",
                );
                return Ok(Visit::Continue);
            }
            _ => {
                return Err(BindError::MalformedTree {
                    detail: format!("function `{}` has no function type", node.spelling),
                    location: node.location.clone(),
                })
            }
        };

        if sig.variadic {
            self.reporter.warn(
                &node.location,
                "skipping variadic function, not yet supported",
            );
            return Ok(Visit::Continue);
        }
        if !sig.calling_conv.is_c() {
            self.reporter.warn(
                &node.location,
                &format!(
                    "skipping {} calling convention function, not yet supported",
                    sig.calling_conv
                ),
            );
            return Ok(Visit::Continue);
        }

        self.end_fn();

        let return_type = classify(&sig.result, &node.location, self.reporter)?;
        let mut args = Vec::with_capacity(sig.params.len());
        for param in &sig.params {
            let ty = classify(param, &node.location, self.reporter)?;
            args.push(Arg::new(String::new(), ty));
        }

        debug!(function = %node.spelling, arity = args.len(), "collecting function");
        self.current = Some(PendingFn {
            decl: FnDecl {
                name: node.spelling.clone(),
                return_type,
                args,
            },
            named: 0,
        });
        Ok(Visit::Recurse)
    }

    fn parameter(&mut self, node: &Node) -> Result<Visit> {
        let Some(current) = self.current.as_mut() else {
            return Err(BindError::OrphanParameter {
                name: node.spelling.clone(),
                location: node.location.clone(),
            });
        };
        current.name_next(&node.spelling, &node.location)?;
        Ok(Visit::Continue)
    }
}

impl Visitor for Collector<'_> {
    type Error = BindError;

    fn visit(&mut self, node: &Node) -> Result<Visit> {
        match node.kind {
            NodeKind::FunctionDecl => self.function(node),
            NodeKind::ParmDecl => self.parameter(node),
            NodeKind::UnexposedAttr
            | NodeKind::CompoundStmt
            | NodeKind::FieldDecl
            | NodeKind::TypedefDecl => Ok(Visit::Continue),
            _ => Ok(Visit::Recurse),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ast::StorageClass;
    use crate::descriptor::{CallingConv, CharKind, FunctionSignature, IntWidth, Signedness};
    use crate::diag::Diagnostic;

    fn loc(line: u32) -> SourceLocation {
        SourceLocation::new("api.h", line, 1)
    }

    fn int() -> TypeDescriptor {
        TypeDescriptor::int(Signedness::Signed, IntWidth::W32)
    }

    fn proto(result: TypeDescriptor, params: Vec<TypeDescriptor>) -> FunctionSignature {
        FunctionSignature {
            result,
            params,
            variadic: false,
            calling_conv: CallingConv::C,
        }
    }

    fn function(name: &str, line: u32, sig: FunctionSignature, params: &[&str]) -> Node {
        let children = params
            .iter()
            .map(|p| Node::new(NodeKind::ParmDecl, *p, loc(line)))
            .collect();
        Node::new(NodeKind::FunctionDecl, name, loc(line))
            .with_type(TypeDescriptor::FunctionProto(Box::new(sig)))
            .with_children(children)
    }

    fn unit(children: Vec<Node>) -> Node {
        Node::new(NodeKind::TranslationUnit, "api.h", loc(0)).with_children(children)
    }

    fn collect(root: &Node) -> (Result<Vec<FnDecl>>, Vec<Diagnostic>) {
        let mut diags = Vec::new();
        let result = Collector::collect(root, &mut diags);
        (result, diags)
    }

    #[test]
    fn collects_names_and_types_in_order() {
        let const_char = TypeDescriptor::pointer(TypeDescriptor::Char(CharKind::Plain(Signedness::Signed)), true);
        let root = unit(vec![
            function("add", 1, proto(int(), vec![int(), int()]), &["a", "b"]),
            function("log", 2, proto(TypeDescriptor::Void, vec![const_char]), &["msg"]),
        ]);
        let (result, diags) = collect(&root);
        let fns = result.unwrap();
        assert!(diags.is_empty());
        assert_eq!(
            fns,
            vec![
                FnDecl {
                    name: "add".into(),
                    return_type: "i32".into(),
                    args: vec![Arg::new("a", "i32"), Arg::new("b", "i32")],
                },
                FnDecl {
                    name: "log".into(),
                    return_type: "void".into(),
                    args: vec![Arg::new("msg", "*const u8")],
                },
            ]
        );
    }

    #[test]
    fn functions_inside_linkage_blocks_are_found() {
        let block = Node::new(NodeKind::LinkageSpec, "", loc(1)).with_children(vec![function(
            "init",
            2,
            proto(TypeDescriptor::Void, vec![]),
            &[],
        )]);
        let (result, _) = collect(&unit(vec![block]));
        assert_eq!(result.unwrap()[0].name, "init");
    }

    #[test]
    fn static_functions_are_skipped_silently() {
        let hidden = function("helper", 1, proto(int(), vec![int()]), &["x"]).with_storage(StorageClass::Static);
        let (result, diags) = collect(&unit(vec![hidden]));
        assert!(result.unwrap().is_empty());
        assert!(diags.is_empty());
    }

    #[test]
    fn variadic_functions_are_skipped_with_one_warning() {
        let mut sig = proto(int(), vec![int()]);
        sig.variadic = true;
        let root = unit(vec![function("printf_like", 3, sig, &["fmt"])]);
        let (result, diags) = collect(&root);
        assert!(result.unwrap().is_empty());
        assert_eq!(diags.len(), 1);
        assert_eq!(diags[0].location, loc(3));
        assert!(diags[0].message.contains("variadic"));
    }

    #[test]
    fn non_c_calling_conventions_are_skipped_with_one_warning() {
        let mut sig = proto(int(), vec![]);
        sig.calling_conv = CallingConv::StdCall;
        let root = unit(vec![
            function("win_api", 5, sig, &[]),
            function("portable", 6, proto(int(), vec![]), &[]),
        ]);
        let (result, diags) = collect(&root);
        let fns = result.unwrap();
        assert_eq!(fns.len(), 1);
        assert_eq!(fns[0].name, "portable");
        assert_eq!(diags.len(), 1);
        assert!(diags[0].message.contains("stdcall"));
    }

    #[test]
    fn unprototyped_functions_are_skipped_with_warning() {
        let node = Node::new(NodeKind::FunctionDecl, "legacy", loc(9)).with_type(TypeDescriptor::FunctionNoProto {
            result: Box::new(int()),
        });
        let (result, diags) = collect(&unit(vec![node]));
        assert!(result.unwrap().is_empty());
        assert_eq!(diags.len(), 1);
    }

    #[test]
    fn bodies_attributes_and_typedefs_are_not_entered() {
        // A stray parameter inside a body would be an arity violation if visited.
        let body = Node::new(NodeKind::CompoundStmt, "", loc(2))
            .with_children(vec![Node::new(NodeKind::ParmDecl, "stray", loc(2))]);
        let mut def = function("run", 2, proto(TypeDescriptor::Void, vec![]), &[]);
        def.children.push(Node::new(NodeKind::UnexposedAttr, "", loc(2)));
        def.children.push(body);
        let (result, _) = collect(&unit(vec![def]));
        assert_eq!(result.unwrap().len(), 1);
    }

    #[test]
    fn unnamed_parameters_get_positional_names() {
        let root = unit(vec![function("pair", 1, proto(TypeDescriptor::Void, vec![int(), int()]), &["", "second"])]);
        let (result, _) = collect(&root);
        let fns = result.unwrap();
        assert_eq!(fns[0].args[0].name, "arg0");
        assert_eq!(fns[0].args[1].name, "second");
    }

    #[test]
    fn orphan_parameter_is_rejected() {
        let root = unit(vec![Node::new(NodeKind::ParmDecl, "x", loc(1))]);
        let (result, _) = collect(&root);
        assert!(matches!(result, Err(BindError::OrphanParameter { .. })));
    }

    #[test]
    fn extra_parameter_is_rejected() {
        let root = unit(vec![function("one", 1, proto(TypeDescriptor::Void, vec![int()]), &["a", "b"])]);
        let (result, _) = collect(&root);
        match result {
            Err(BindError::ArityExceeded { arity, index, name, .. }) => {
                assert_eq!((arity, index, name.as_str()), (1, 1, "b"));
            }
            other => panic!("expected arity violation, got {other:?}"),
        }
    }

    #[test]
    fn param_state_progresses() {
        let mut diags = Vec::new();
        let mut collector = Collector::new(&mut diags);
        assert_eq!(collector.param_state(), None);

        let decl = function("three", 1, proto(TypeDescriptor::Void, vec![int(), int(), int()]), &[]);
        assert_eq!(collector.visit(&decl).unwrap(), Visit::Recurse);
        assert_eq!(collector.param_state(), Some(ParamState::Typed { arity: 3 }));

        let parm = |name: &str| Node::new(NodeKind::ParmDecl, name, loc(1));
        collector.visit(&parm("a")).unwrap();
        assert_eq!(collector.param_state(), Some(ParamState::PartiallyNamed { named: 1, arity: 3 }));
        collector.visit(&parm("b")).unwrap();
        collector.visit(&parm("c")).unwrap();
        assert_eq!(collector.param_state(), Some(ParamState::Complete { arity: 3 }));
        assert!(collector.visit(&parm("d")).is_err());

        let fns = collector.finish();
        assert_eq!(fns.len(), 1);
        assert_eq!(fns[0].args.len(), 3);
    }

    #[test]
    fn function_without_type_is_malformed() {
        let node = Node::new(NodeKind::FunctionDecl, "ghost", loc(1));
        let (result, _) = collect(&unit(vec![node]));
        assert!(matches!(result, Err(BindError::MalformedTree { .. })));
    }

    #[test]
    fn classifier_failures_abort_collection() {
        let sig = proto(TypeDescriptor::int(Signedness::Signed, IntWidth::W128), vec![]);
        let (result, _) = collect(&unit(vec![function("wide", 1, sig, &[])]));
        assert!(matches!(result, Err(BindError::Unsupported { .. })));
    }
}
