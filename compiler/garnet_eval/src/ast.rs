//! The evaluator's input tree.
//!
//! Produced by an external parser (or [`AstBuilder`]); immutable once
//! built and shared through `Arc` so method bodies and blocks can hold
//! subtrees past the evaluation that created them. The node-kind set is
//! closed: the evaluator matches on it exhaustively.
//!
//! Call expressions embed their [`CallSite`], so each call expression in
//! the tree carries its own inline cache.

mod builder;

pub use builder::AstBuilder;

use std::sync::Arc;

use garnet_ir::{Arity, Name, SourcePosition, StaticScope};

use crate::call_site::CallSite;

pub type NodeRef = Arc<Node>;

#[derive(Debug)]
pub struct Node {
    pub kind: NodeKind,
    pub position: SourcePosition,
}

impl Node {
    pub fn new(kind: NodeKind, position: SourcePosition) -> NodeRef {
        Arc::new(Self { kind, position })
    }
}

#[derive(Debug)]
pub enum NodeKind {
    // Literals
    Nil,
    True,
    False,
    SelfRef,
    Fixnum(i64),
    Float(f64),
    Str(Arc<str>),
    /// Interpolated string; parts are converted with `to_s`.
    DStr(Vec<NodeRef>),
    Symbol(Name),
    /// Array literal; elements may be `Splat`.
    Array(Vec<NodeRef>),
    /// `*expr` inside an array literal, argument list or `when` list.
    Splat(NodeRef),

    // Sequencing and logic
    Block(Vec<NodeRef>),
    If {
        cond: NodeRef,
        then_body: Option<NodeRef>,
        else_body: Option<NodeRef>,
    },
    And(NodeRef, NodeRef),
    Or(NodeRef, NodeRef),
    Not(NodeRef),
    Case {
        subject: Option<NodeRef>,
        whens: Vec<WhenClause>,
        else_body: Option<NodeRef>,
        /// `===` dispatch site shared by all candidates.
        site: Arc<CallSite>,
    },

    // Loops and jumps
    Loop {
        kind: LoopKind,
        cond: NodeRef,
        body: Option<NodeRef>,
        /// `false` for `begin ... end while cond`: the body runs once
        /// before the first test.
        pre_test: bool,
    },
    For {
        iter: NodeRef,
        block: Arc<IterNode>,
        /// `each` dispatch site.
        site: Arc<CallSite>,
    },
    Break(Option<NodeRef>),
    Next(Option<NodeRef>),
    Redo,
    Retry,
    Return(Option<NodeRef>),

    // Exceptions
    Rescue {
        body: Option<NodeRef>,
        clauses: Vec<RescueClause>,
        else_body: Option<NodeRef>,
    },
    Ensure {
        body: Option<NodeRef>,
        ensure: Option<NodeRef>,
    },

    // Calls
    /// `recv.name(args)`.
    Call {
        receiver: NodeRef,
        args: CallArgs,
        site: Arc<CallSite>,
    },
    /// `name(args)` with implicit `self`.
    FCall {
        args: CallArgs,
        site: Arc<CallSite>,
    },
    /// `name` with no receiver and no arguments.
    VCall {
        site: Arc<CallSite>,
    },
    /// `super(args)`.
    Super {
        args: CallArgs,
    },
    /// Bare `super`: re-passes the current frame's arguments.
    ZSuper {
        block: Option<BlockArg>,
    },
    Yield {
        args: Vec<NodeRef>,
    },
    /// `recv.name = value` / `recv[i] = value`; the expression's value is
    /// the last argument, not the writer's result.
    AttrAssign {
        receiver: NodeRef,
        args: Vec<NodeRef>,
        site: Arc<CallSite>,
    },
    /// `recv.attr op= value`.
    OpAsgn {
        receiver: NodeRef,
        reader: Arc<CallSite>,
        writer: Arc<CallSite>,
        op: OpAsgnKind,
        value: NodeRef,
    },
    /// `target ||= value`: `read` is the target's read expression,
    /// `assign` the full assignment.
    OrAsgn {
        read: NodeRef,
        assign: NodeRef,
    },
    /// `target &&= value`.
    AndAsgn {
        read: NodeRef,
        assign: NodeRef,
    },

    // Variables
    LocalVar {
        name: Name,
        index: usize,
    },
    /// Block-local or captured variable at `depth` scopes out.
    DVar {
        name: Name,
        index: usize,
        depth: usize,
    },
    InstVar(Name),
    GlobalVar(Name),
    ClassVar(Name),
    Const(Name),
    /// `scope::Name`.
    Colon2 {
        scope: NodeRef,
        name: Name,
    },
    /// `::Name`.
    Colon3(Name),
    /// Single assignment to any target kind.
    Asgn {
        target: AssignTarget,
        value: NodeRef,
    },
    MultipleAsgn {
        targets: MasgnTargets,
        value: NodeRef,
    },

    // Definitions
    Defn {
        name: Name,
        def: Arc<MethodDef>,
    },
    Defs {
        receiver: NodeRef,
        name: Name,
        def: Arc<MethodDef>,
    },
    Class {
        path: CPath,
        superclass: Option<NodeRef>,
        body: Arc<ClassBody>,
    },
    Module {
        path: CPath,
        body: Arc<ClassBody>,
    },
    /// `class << receiver`.
    SClass {
        receiver: NodeRef,
        body: Arc<ClassBody>,
    },
    Alias {
        new_name: Name,
        old_name: Name,
    },
    Undef(Name),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LoopKind {
    While,
    Until,
}

#[derive(Debug)]
pub enum OpAsgnKind {
    Or,
    And,
    /// Binary operator dispatched on the current value.
    Operator(Arc<CallSite>),
}

#[derive(Debug, Default)]
pub struct CallArgs {
    /// Positional arguments; may contain `Splat`.
    pub args: Vec<NodeRef>,
    pub block: Option<BlockArg>,
}

#[derive(Debug)]
pub enum BlockArg {
    /// `{ |x| ... }` / `do |x| ... end`.
    Literal(Arc<IterNode>),
    /// `&expr`.
    Pass(NodeRef),
}

/// A block literal.
#[derive(Debug)]
pub struct IterNode {
    pub params: Option<MasgnTargets>,
    pub body: Option<NodeRef>,
    /// Block-local variables. `for` loops reuse the enclosing scope.
    pub scope: Arc<StaticScope>,
    pub position: SourcePosition,
}

impl IterNode {
    /// `|a, b, *c|` accepts at least 2; `|a|` exactly one; no parameter
    /// list accepts anything.
    pub fn arity(&self) -> Arity {
        match &self.params {
            None => Arity::optional(),
            Some(targets) if targets.rest.is_some() => {
                Arity::required(targets.pre.len() + targets.post.len())
            }
            Some(targets) => Arity::fixed(targets.pre.len() + targets.post.len()),
        }
    }
}

#[derive(Debug)]
pub struct WhenClause {
    pub values: Vec<NodeRef>,
    pub body: Option<NodeRef>,
}

#[derive(Debug)]
pub struct RescueClause {
    /// Exception classes; empty means `StandardError`. May contain `Splat`.
    pub exceptions: Vec<NodeRef>,
    /// `=> target`.
    pub target: Option<AssignTarget>,
    pub body: Option<NodeRef>,
}

#[derive(Debug)]
pub enum AssignTarget {
    Local { name: Name, index: usize },
    DVar { name: Name, index: usize, depth: usize },
    InstVar(Name),
    GlobalVar(Name),
    ClassVar(Name),
    Const(CPath),
    /// `recv.name = v`; the site's name is the writer (`name=`).
    Attr { receiver: NodeRef, site: Arc<CallSite> },
    /// `recv[args] = v`.
    Index {
        receiver: NodeRef,
        args: Vec<NodeRef>,
        site: Arc<CallSite>,
    },
    /// Parenthesized nested destructuring.
    Nested(Box<MasgnTargets>),
}

/// Left-hand side of a destructuring assignment or block parameter list:
/// `pre, *rest, post`.
#[derive(Debug, Default)]
pub struct MasgnTargets {
    pub pre: Vec<AssignTarget>,
    pub rest: Option<RestTarget>,
    pub post: Vec<AssignTarget>,
}

#[derive(Debug)]
pub enum RestTarget {
    Named(Box<AssignTarget>),
    /// A bare `*` that discards the middle.
    Anonymous,
}

#[derive(Copy, Clone, Debug)]
pub struct Param {
    pub name: Name,
    pub index: usize,
}

#[derive(Debug)]
pub struct OptParam {
    pub param: Param,
    pub default: NodeRef,
}

/// A method's parameter declaration, bound in the order
/// required, optional, rest, post, block.
#[derive(Debug, Default)]
pub struct ArgsDecl {
    pub pre: Vec<Param>,
    pub optional: Vec<OptParam>,
    pub rest: Option<Param>,
    pub post: Vec<Param>,
    pub block: Option<Param>,
}

impl ArgsDecl {
    pub fn required_count(&self) -> usize {
        self.pre.len() + self.post.len()
    }

    /// Counts accepted by a call: exact without optionals or rest, a
    /// range with optionals only, a minimum with a rest parameter.
    pub fn arity(&self) -> Arity {
        if self.rest.is_some() {
            Arity::required(self.required_count())
        } else {
            Arity::range(self.required_count(), self.optional.len())
        }
    }
}

#[derive(Debug)]
pub struct MethodDef {
    pub name: Name,
    pub args: ArgsDecl,
    pub body: Option<NodeRef>,
    pub scope: Arc<StaticScope>,
    pub position: SourcePosition,
}

#[derive(Debug)]
pub struct ClassBody {
    pub body: Option<NodeRef>,
    pub scope: Arc<StaticScope>,
}

/// Where a class, module or constant is defined.
#[derive(Debug)]
pub struct CPath {
    pub scope: CPathScope,
    pub name: Name,
}

#[derive(Debug)]
pub enum CPathScope {
    /// Innermost lexical module.
    Lexical,
    /// `Outer::Name`.
    Explicit(NodeRef),
    /// `::Name`.
    TopLevel,
}
