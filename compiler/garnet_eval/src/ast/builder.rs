//! Programmatic AST construction.
//!
//! Hosts without a parser (and the test suite) build trees with
//! `AstBuilder`. Each constructor stamps the node with the builder's
//! current file and line; call constructors allocate a fresh `CallSite`
//! per call expression.

use std::cell::Cell;
use std::sync::Arc;

use garnet_ir::{CallType, Name, SharedInterner, SourcePosition, StaticScope};

use super::{
    ArgsDecl, AssignTarget, BlockArg, CPath, CPathScope, CallArgs, ClassBody, IterNode, LoopKind,
    MasgnTargets, MethodDef, Node, NodeKind, NodeRef, OpAsgnKind, OptParam, Param, RescueClause,
    RestTarget, WhenClause,
};
use crate::call_site::CallSite;

pub struct AstBuilder {
    interner: SharedInterner,
    file: Name,
    line: Cell<u32>,
}

impl AstBuilder {
    pub fn new(interner: &SharedInterner, file: &str) -> Self {
        Self {
            interner: interner.clone(),
            file: interner.intern(file),
            line: Cell::new(1),
        }
    }

    pub fn name(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    /// Set the line stamped on subsequently built nodes.
    pub fn at(&self, line: u32) -> &Self {
        self.line.set(line);
        self
    }

    pub fn position(&self) -> SourcePosition {
        SourcePosition::new(self.file, self.line.get())
    }

    pub fn node(&self, kind: NodeKind) -> NodeRef {
        Node::new(kind, self.position())
    }

    fn site(&self, name: &str, call_type: CallType) -> Arc<CallSite> {
        CallSite::new(self.name(name), call_type)
    }

    // Static scopes

    pub fn local_scope(&self, vars: &[&str]) -> Arc<StaticScope> {
        StaticScope::local(vars.iter().map(|v| self.name(v)).collect())
    }

    pub fn block_scope(&self, parent: &Arc<StaticScope>, vars: &[&str]) -> Arc<StaticScope> {
        StaticScope::block(parent.clone(), vars.iter().map(|v| self.name(v)).collect())
    }

    // Literals

    pub fn nil(&self) -> NodeRef {
        self.node(NodeKind::Nil)
    }

    pub fn true_(&self) -> NodeRef {
        self.node(NodeKind::True)
    }

    pub fn false_(&self) -> NodeRef {
        self.node(NodeKind::False)
    }

    pub fn self_(&self) -> NodeRef {
        self.node(NodeKind::SelfRef)
    }

    pub fn int(&self, n: i64) -> NodeRef {
        self.node(NodeKind::Fixnum(n))
    }

    pub fn float(&self, x: f64) -> NodeRef {
        self.node(NodeKind::Float(x))
    }

    pub fn str(&self, s: &str) -> NodeRef {
        self.node(NodeKind::Str(Arc::from(s)))
    }

    pub fn dstr(&self, parts: Vec<NodeRef>) -> NodeRef {
        self.node(NodeKind::DStr(parts))
    }

    pub fn sym(&self, s: &str) -> NodeRef {
        self.node(NodeKind::Symbol(self.name(s)))
    }

    pub fn array(&self, items: Vec<NodeRef>) -> NodeRef {
        self.node(NodeKind::Array(items))
    }

    pub fn splat(&self, value: NodeRef) -> NodeRef {
        self.node(NodeKind::Splat(value))
    }

    // Sequencing and logic

    pub fn block(&self, stmts: Vec<NodeRef>) -> NodeRef {
        self.node(NodeKind::Block(stmts))
    }

    pub fn if_(&self, cond: NodeRef, then_body: Option<NodeRef>, else_body: Option<NodeRef>) -> NodeRef {
        self.node(NodeKind::If {
            cond,
            then_body,
            else_body,
        })
    }

    pub fn and(&self, left: NodeRef, right: NodeRef) -> NodeRef {
        self.node(NodeKind::And(left, right))
    }

    pub fn or(&self, left: NodeRef, right: NodeRef) -> NodeRef {
        self.node(NodeKind::Or(left, right))
    }

    pub fn not(&self, value: NodeRef) -> NodeRef {
        self.node(NodeKind::Not(value))
    }

    pub fn case(
        &self,
        subject: Option<NodeRef>,
        whens: Vec<(Vec<NodeRef>, Option<NodeRef>)>,
        else_body: Option<NodeRef>,
    ) -> NodeRef {
        self.node(NodeKind::Case {
            subject,
            whens: whens
                .into_iter()
                .map(|(values, body)| WhenClause { values, body })
                .collect(),
            else_body,
            site: self.site("===", CallType::Normal),
        })
    }

    // Loops and jumps

    pub fn while_(&self, cond: NodeRef, body: Option<NodeRef>) -> NodeRef {
        self.node(NodeKind::Loop {
            kind: LoopKind::While,
            cond,
            body,
            pre_test: true,
        })
    }

    pub fn until_(&self, cond: NodeRef, body: Option<NodeRef>) -> NodeRef {
        self.node(NodeKind::Loop {
            kind: LoopKind::Until,
            cond,
            body,
            pre_test: true,
        })
    }

    /// `begin body end while cond`.
    pub fn do_while(&self, body: Option<NodeRef>, cond: NodeRef) -> NodeRef {
        self.node(NodeKind::Loop {
            kind: LoopKind::While,
            cond,
            body,
            pre_test: false,
        })
    }

    /// `for target in iter; body; end`. `enclosing` is the scope the loop
    /// variable lives in.
    pub fn for_(
        &self,
        target: AssignTarget,
        iter: NodeRef,
        body: Option<NodeRef>,
        enclosing: &Arc<StaticScope>,
    ) -> NodeRef {
        let block = Arc::new(IterNode {
            params: Some(MasgnTargets {
                pre: vec![target],
                rest: None,
                post: vec![],
            }),
            body,
            scope: enclosing.clone(),
            position: self.position(),
        });
        self.node(NodeKind::For {
            iter,
            block,
            site: self.site("each", CallType::Normal),
        })
    }

    pub fn break_(&self, value: Option<NodeRef>) -> NodeRef {
        self.node(NodeKind::Break(value))
    }

    pub fn next(&self, value: Option<NodeRef>) -> NodeRef {
        self.node(NodeKind::Next(value))
    }

    pub fn redo(&self) -> NodeRef {
        self.node(NodeKind::Redo)
    }

    pub fn retry(&self) -> NodeRef {
        self.node(NodeKind::Retry)
    }

    pub fn return_(&self, value: Option<NodeRef>) -> NodeRef {
        self.node(NodeKind::Return(value))
    }

    // Exceptions

    pub fn rescue(
        &self,
        body: Option<NodeRef>,
        clauses: Vec<RescueClause>,
        else_body: Option<NodeRef>,
    ) -> NodeRef {
        self.node(NodeKind::Rescue {
            body,
            clauses,
            else_body,
        })
    }

    pub fn rescue_clause(
        &self,
        exceptions: Vec<NodeRef>,
        target: Option<AssignTarget>,
        body: Option<NodeRef>,
    ) -> RescueClause {
        RescueClause {
            exceptions,
            target,
            body,
        }
    }

    pub fn ensure(&self, body: Option<NodeRef>, ensure: Option<NodeRef>) -> NodeRef {
        self.node(NodeKind::Ensure { body, ensure })
    }

    // Calls

    pub fn call(&self, receiver: NodeRef, name: &str, args: Vec<NodeRef>) -> NodeRef {
        self.call_with(receiver, name, args, None)
    }

    pub fn call_with(
        &self,
        receiver: NodeRef,
        name: &str,
        args: Vec<NodeRef>,
        block: Option<BlockArg>,
    ) -> NodeRef {
        self.node(NodeKind::Call {
            receiver,
            args: CallArgs { args, block },
            site: self.site(name, CallType::Normal),
        })
    }

    pub fn fcall(&self, name: &str, args: Vec<NodeRef>) -> NodeRef {
        self.fcall_with(name, args, None)
    }

    pub fn fcall_with(&self, name: &str, args: Vec<NodeRef>, block: Option<BlockArg>) -> NodeRef {
        self.node(NodeKind::FCall {
            args: CallArgs { args, block },
            site: self.site(name, CallType::Functional),
        })
    }

    pub fn vcall(&self, name: &str) -> NodeRef {
        self.node(NodeKind::VCall {
            site: self.site(name, CallType::Variable),
        })
    }

    pub fn super_(&self, args: Vec<NodeRef>, block: Option<BlockArg>) -> NodeRef {
        self.node(NodeKind::Super {
            args: CallArgs { args, block },
        })
    }

    pub fn zsuper(&self, block: Option<BlockArg>) -> NodeRef {
        self.node(NodeKind::ZSuper { block })
    }

    pub fn yield_(&self, args: Vec<NodeRef>) -> NodeRef {
        self.node(NodeKind::Yield { args })
    }

    /// `recv.writer(args)` as an assignment; `writer` includes the `=`.
    pub fn attr_assign(&self, receiver: NodeRef, writer: &str, args: Vec<NodeRef>) -> NodeRef {
        self.node(NodeKind::AttrAssign {
            receiver,
            args,
            site: self.site(writer, CallType::Normal),
        })
    }

    /// `recv.attr op= value`, where `op` is `||`, `&&` or a binary operator.
    pub fn op_asgn(&self, receiver: NodeRef, attr: &str, op: &str, value: NodeRef) -> NodeRef {
        let op = match op {
            "||" => OpAsgnKind::Or,
            "&&" => OpAsgnKind::And,
            other => OpAsgnKind::Operator(self.site(other, CallType::Normal)),
        };
        self.node(NodeKind::OpAsgn {
            receiver,
            reader: self.site(attr, CallType::Normal),
            writer: self.site(&format!("{attr}="), CallType::Normal),
            op,
            value,
        })
    }

    pub fn or_asgn(&self, read: NodeRef, assign: NodeRef) -> NodeRef {
        self.node(NodeKind::OrAsgn { read, assign })
    }

    pub fn and_asgn(&self, read: NodeRef, assign: NodeRef) -> NodeRef {
        self.node(NodeKind::AndAsgn { read, assign })
    }

    /// A literal block argument.
    pub fn iter(
        &self,
        params: Option<MasgnTargets>,
        body: Option<NodeRef>,
        scope: Arc<StaticScope>,
    ) -> BlockArg {
        BlockArg::Literal(Arc::new(IterNode {
            params,
            body,
            scope,
            position: self.position(),
        }))
    }

    pub fn block_pass(&self, value: NodeRef) -> BlockArg {
        BlockArg::Pass(value)
    }

    // Variables

    pub fn lvar(&self, name: &str, index: usize) -> NodeRef {
        self.node(NodeKind::LocalVar {
            name: self.name(name),
            index,
        })
    }

    pub fn dvar(&self, name: &str, index: usize, depth: usize) -> NodeRef {
        self.node(NodeKind::DVar {
            name: self.name(name),
            index,
            depth,
        })
    }

    pub fn ivar(&self, name: &str) -> NodeRef {
        self.node(NodeKind::InstVar(self.name(name)))
    }

    pub fn gvar(&self, name: &str) -> NodeRef {
        self.node(NodeKind::GlobalVar(self.name(name)))
    }

    pub fn cvar(&self, name: &str) -> NodeRef {
        self.node(NodeKind::ClassVar(self.name(name)))
    }

    pub fn const_(&self, name: &str) -> NodeRef {
        self.node(NodeKind::Const(self.name(name)))
    }

    pub fn colon2(&self, scope: NodeRef, name: &str) -> NodeRef {
        self.node(NodeKind::Colon2 {
            scope,
            name: self.name(name),
        })
    }

    pub fn colon3(&self, name: &str) -> NodeRef {
        self.node(NodeKind::Colon3(self.name(name)))
    }

    pub fn asgn(&self, target: AssignTarget, value: NodeRef) -> NodeRef {
        self.node(NodeKind::Asgn { target, value })
    }

    pub fn lasgn(&self, name: &str, index: usize, value: NodeRef) -> NodeRef {
        self.asgn(self.t_local(name, index), value)
    }

    pub fn dasgn(&self, name: &str, index: usize, depth: usize, value: NodeRef) -> NodeRef {
        self.asgn(self.t_dvar(name, index, depth), value)
    }

    pub fn iasgn(&self, name: &str, value: NodeRef) -> NodeRef {
        self.asgn(self.t_ivar(name), value)
    }

    pub fn gasgn(&self, name: &str, value: NodeRef) -> NodeRef {
        self.asgn(AssignTarget::GlobalVar(self.name(name)), value)
    }

    pub fn cvasgn(&self, name: &str, value: NodeRef) -> NodeRef {
        self.asgn(AssignTarget::ClassVar(self.name(name)), value)
    }

    pub fn cdecl(&self, path: CPath, value: NodeRef) -> NodeRef {
        self.asgn(AssignTarget::Const(path), value)
    }

    pub fn masgn(&self, targets: MasgnTargets, value: NodeRef) -> NodeRef {
        self.node(NodeKind::MultipleAsgn { targets, value })
    }

    // Assignment targets

    pub fn t_local(&self, name: &str, index: usize) -> AssignTarget {
        AssignTarget::Local {
            name: self.name(name),
            index,
        }
    }

    pub fn t_dvar(&self, name: &str, index: usize, depth: usize) -> AssignTarget {
        AssignTarget::DVar {
            name: self.name(name),
            index,
            depth,
        }
    }

    pub fn t_ivar(&self, name: &str) -> AssignTarget {
        AssignTarget::InstVar(self.name(name))
    }

    pub fn t_gvar(&self, name: &str) -> AssignTarget {
        AssignTarget::GlobalVar(self.name(name))
    }

    pub fn t_attr(&self, receiver: NodeRef, writer: &str) -> AssignTarget {
        AssignTarget::Attr {
            receiver,
            site: self.site(writer, CallType::Normal),
        }
    }

    pub fn t_index(&self, receiver: NodeRef, args: Vec<NodeRef>) -> AssignTarget {
        AssignTarget::Index {
            receiver,
            args,
            site: self.site("[]=", CallType::Normal),
        }
    }

    pub fn targets(
        &self,
        pre: Vec<AssignTarget>,
        rest: Option<AssignTarget>,
        post: Vec<AssignTarget>,
    ) -> MasgnTargets {
        MasgnTargets {
            pre,
            rest: rest.map(|t| RestTarget::Named(Box::new(t))),
            post,
        }
    }

    pub fn t_nested(&self, targets: MasgnTargets) -> AssignTarget {
        AssignTarget::Nested(Box::new(targets))
    }

    // Definitions

    pub fn param(&self, name: &str, index: usize) -> Param {
        Param {
            name: self.name(name),
            index,
        }
    }

    pub fn opt(&self, name: &str, index: usize, default: NodeRef) -> OptParam {
        OptParam {
            param: self.param(name, index),
            default,
        }
    }

    /// `ArgsDecl` with only required parameters, in slots `0..names.len()`.
    pub fn required_args(&self, names: &[&str]) -> ArgsDecl {
        ArgsDecl {
            pre: names
                .iter()
                .enumerate()
                .map(|(i, n)| self.param(n, i))
                .collect(),
            ..ArgsDecl::default()
        }
    }

    pub fn method_def(
        &self,
        name: &str,
        args: ArgsDecl,
        body: Option<NodeRef>,
        scope: Arc<StaticScope>,
    ) -> Arc<MethodDef> {
        Arc::new(MethodDef {
            name: self.name(name),
            args,
            body,
            scope,
            position: self.position(),
        })
    }

    pub fn defn(&self, name: &str, args: ArgsDecl, body: Option<NodeRef>, scope: Arc<StaticScope>) -> NodeRef {
        let def = self.method_def(name, args, body, scope);
        self.node(NodeKind::Defn {
            name: def.name,
            def,
        })
    }

    pub fn defs(
        &self,
        receiver: NodeRef,
        name: &str,
        args: ArgsDecl,
        body: Option<NodeRef>,
        scope: Arc<StaticScope>,
    ) -> NodeRef {
        let def = self.method_def(name, args, body, scope);
        self.node(NodeKind::Defs {
            receiver,
            name: def.name,
            def,
        })
    }

    pub fn cpath(&self, name: &str) -> CPath {
        CPath {
            scope: CPathScope::Lexical,
            name: self.name(name),
        }
    }

    pub fn cpath_in(&self, scope: NodeRef, name: &str) -> CPath {
        CPath {
            scope: CPathScope::Explicit(scope),
            name: self.name(name),
        }
    }

    pub fn cpath_top(&self, name: &str) -> CPath {
        CPath {
            scope: CPathScope::TopLevel,
            name: self.name(name),
        }
    }

    pub fn class_(
        &self,
        path: CPath,
        superclass: Option<NodeRef>,
        body: Option<NodeRef>,
        scope: Arc<StaticScope>,
    ) -> NodeRef {
        self.node(NodeKind::Class {
            path,
            superclass,
            body: Arc::new(ClassBody { body, scope }),
        })
    }

    pub fn module_(&self, path: CPath, body: Option<NodeRef>, scope: Arc<StaticScope>) -> NodeRef {
        self.node(NodeKind::Module {
            path,
            body: Arc::new(ClassBody { body, scope }),
        })
    }

    pub fn sclass(&self, receiver: NodeRef, body: Option<NodeRef>, scope: Arc<StaticScope>) -> NodeRef {
        self.node(NodeKind::SClass {
            receiver,
            body: Arc::new(ClassBody { body, scope }),
        })
    }

    pub fn alias(&self, new_name: &str, old_name: &str) -> NodeRef {
        self.node(NodeKind::Alias {
            new_name: self.name(new_name),
            old_name: self.name(old_name),
        })
    }

    pub fn undef(&self, name: &str) -> NodeRef {
        self.node(NodeKind::Undef(self.name(name)))
    }
}
