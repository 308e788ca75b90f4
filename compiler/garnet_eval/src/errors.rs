//! Error and control-signal types for the evaluator.
//!
//! # Structured error categories
//!
//! `EvalErrorKind` carries the typed cause of a user-visible exception.
//! Its `Display` impl is the exception message; [`EvalErrorKind::exception_class`]
//! names the exception class it materializes as. Factory functions
//! (`wrong_arg_count()`, `no_method()`, ...) are the public way to build
//! errors.
//!
//! # Control signals
//!
//! `return`, `break`, `next`, `redo` and `retry` travel through the same
//! `Result` channel as exceptions, as variants of [`ControlAction`]. Each
//! targeted signal carries the identity of the activation it belongs to so
//! catch sites can tell "mine" from "re-propagate".

use std::fmt;

use garnet_ir::{ArityError, SourcePosition};

use crate::block::BlockId;
use crate::diagnostics::EvalBacktrace;
use crate::frame::ActivationId;
use crate::value::Value;

/// Result of evaluating a node or calling a method.
pub type EvalResult = Result<Value, ControlAction>;

/// Why a jump could not reach its target.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum LocalJumpReason {
    Break,
    Next,
    Redo,
    Return,
    Retry,
    NoBlock,
    /// `break` from a proc whose creating call has already returned.
    BreakFromProc,
}

impl fmt::Display for LocalJumpReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            LocalJumpReason::Break => "unexpected break",
            LocalJumpReason::Next => "unexpected next",
            LocalJumpReason::Redo => "unexpected redo",
            LocalJumpReason::Return => "unexpected return",
            LocalJumpReason::Retry => "retry outside of rescue",
            LocalJumpReason::NoBlock => "no block given (yield)",
            LocalJumpReason::BreakFromProc => "break from proc-closure",
        })
    }
}

/// Typed error category. `Display` is the user-visible message.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum EvalErrorKind {
    #[error("wrong number of arguments ({given} for {expected})")]
    ArgumentCount { given: usize, expected: String },
    #[error("{message}")]
    Argument { message: String },

    // Resolution
    #[error("undefined method `{name}' for {receiver}")]
    NoMethod { name: String, receiver: String },
    #[error("private method `{name}' called for {receiver}")]
    PrivateMethod { name: String, receiver: String },
    #[error("protected method `{name}' called for {receiver}")]
    ProtectedMethod { name: String, receiver: String },
    #[error("undefined local variable or method `{name}' for {receiver}")]
    UndefinedLocalOrMethod { name: String, receiver: String },
    #[error("super: no superclass method `{name}'")]
    NoSuperMethod { name: String },
    #[error("super called outside of method")]
    SuperOutsideMethod,
    #[error("uninitialized constant {name}")]
    UninitializedConstant { name: String },
    #[error("uninitialized class variable {name} in {module}")]
    UninitializedClassVar { name: String, module: String },
    #[error("undefined method `{name}' for class `{module}'")]
    UndefinedMethodForClass { name: String, module: String },
    #[error("{message}")]
    Name { message: String },

    // Definitions and types
    #[error("{message}")]
    Type { message: String },

    // Control flow
    #[error("{reason}")]
    LocalJump { reason: LocalJumpReason },
    #[error("stack level too deep")]
    StackTooDeep,

    // Core library
    #[error("divided by 0")]
    ZeroDivision,
    #[error("{message}")]
    Index { message: String },
    #[error("{message}")]
    Range { message: String },
    #[error("{message}")]
    Runtime { message: String },

    // Thread events
    #[error("{message}")]
    Interrupt { message: String },
    #[error("thread killed")]
    ThreadKilled,

    /// A user-raised exception object.
    #[error("{message}")]
    Raised { class_name: String, message: String },
}

impl EvalErrorKind {
    /// Name of the exception class this error materializes as.
    pub fn exception_class(&self) -> &str {
        match self {
            EvalErrorKind::ArgumentCount { .. } | EvalErrorKind::Argument { .. } => {
                "ArgumentError"
            }
            EvalErrorKind::NoMethod { .. }
            | EvalErrorKind::PrivateMethod { .. }
            | EvalErrorKind::ProtectedMethod { .. }
            | EvalErrorKind::NoSuperMethod { .. }
            | EvalErrorKind::SuperOutsideMethod => "NoMethodError",
            EvalErrorKind::UndefinedLocalOrMethod { .. }
            | EvalErrorKind::UninitializedConstant { .. }
            | EvalErrorKind::UninitializedClassVar { .. }
            | EvalErrorKind::UndefinedMethodForClass { .. }
            | EvalErrorKind::Name { .. } => "NameError",
            EvalErrorKind::Type { .. } => "TypeError",
            EvalErrorKind::LocalJump { .. } => "LocalJumpError",
            EvalErrorKind::StackTooDeep => "SystemStackError",
            EvalErrorKind::ZeroDivision => "ZeroDivisionError",
            EvalErrorKind::Index { .. } => "IndexError",
            EvalErrorKind::Range { .. } => "RangeError",
            EvalErrorKind::Runtime { .. } => "RuntimeError",
            EvalErrorKind::Interrupt { .. } => "Interrupt",
            EvalErrorKind::ThreadKilled => "SignalException",
            EvalErrorKind::Raised { class_name, .. } => class_name,
        }
    }
}

/// A user-visible exception in flight.
#[derive(Clone, Debug)]
pub struct EvalError {
    pub kind: EvalErrorKind,
    /// Exception message; equals `kind.to_string()` for factory errors.
    pub message: String,
    /// The exception object, once materialized (or when user code raised
    /// an existing object).
    pub exception: Option<Value>,
    /// Where the error was raised.
    pub position: Option<SourcePosition>,
    /// Call stack at the raise point.
    pub backtrace: Option<EvalBacktrace>,
}

impl EvalError {
    pub fn new(kind: EvalErrorKind) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            message,
            exception: None,
            position: None,
            backtrace: None,
        }
    }

    pub fn exception_class(&self) -> &str {
        self.kind.exception_class()
    }

    /// Thread kills unwind through every rescue clause.
    pub fn is_rescuable(&self) -> bool {
        !matches!(self.kind, EvalErrorKind::ThreadKilled)
    }

    /// Record the raise position unless one is already set.
    #[must_use]
    pub fn with_position(mut self, position: SourcePosition) -> Self {
        self.position.get_or_insert(position);
        self
    }

    /// Attach a backtrace unless one was captured closer to the raise.
    #[must_use]
    pub fn with_backtrace(mut self, backtrace: EvalBacktrace) -> Self {
        self.backtrace.get_or_insert(backtrace);
        self
    }

    #[must_use]
    pub fn with_exception(mut self, exception: Value) -> Self {
        self.exception = Some(exception);
        self
    }
}

impl fmt::Display for EvalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.message, self.exception_class())
    }
}

impl std::error::Error for EvalError {}

impl From<ArityError> for EvalError {
    fn from(err: ArityError) -> Self {
        wrong_arg_count(err.given, err.expected)
    }
}

/// Everything that unwinds the evaluator: exceptions and non-local jumps.
#[derive(Debug)]
pub enum ControlAction {
    Error(Box<EvalError>),
    /// Return from the method activation `target`.
    Return { target: ActivationId, value: Value },
    /// Break out of a loop (`target: None`) or, once tagged by the block
    /// that raised it, out of the call that received that block.
    Break {
        target: Option<BlockId>,
        value: Value,
    },
    Next(Value),
    Redo,
    Retry,
}

impl ControlAction {
    /// Convert a signal that escaped its legal boundary into the
    /// `LocalJumpError` user code sees.
    pub fn into_error(self) -> EvalError {
        match self {
            ControlAction::Error(err) => *err,
            ControlAction::Return { .. } => local_jump(LocalJumpReason::Return),
            ControlAction::Break { target: None, .. } => local_jump(LocalJumpReason::Break),
            ControlAction::Break { target: Some(_), .. } => {
                local_jump(LocalJumpReason::BreakFromProc)
            }
            ControlAction::Next(_) => local_jump(LocalJumpReason::Next),
            ControlAction::Redo => local_jump(LocalJumpReason::Redo),
            ControlAction::Retry => local_jump(LocalJumpReason::Retry),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ControlAction::Error(_))
    }
}

impl From<EvalError> for ControlAction {
    fn from(err: EvalError) -> Self {
        ControlAction::Error(Box::new(err))
    }
}

impl From<ArityError> for ControlAction {
    fn from(err: ArityError) -> Self {
        ControlAction::from(EvalError::from(err))
    }
}

// Argument errors

#[cold]
pub fn wrong_arg_count(given: usize, expected: impl fmt::Display) -> EvalError {
    EvalError::new(EvalErrorKind::ArgumentCount {
        given,
        expected: expected.to_string(),
    })
}

#[cold]
pub fn argument_error(message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::Argument {
        message: message.into(),
    })
}

// Resolution errors

#[cold]
pub fn no_method(name: &str, receiver: &str) -> EvalError {
    EvalError::new(EvalErrorKind::NoMethod {
        name: name.to_string(),
        receiver: receiver.to_string(),
    })
}

#[cold]
pub fn private_method(name: &str, receiver: &str) -> EvalError {
    EvalError::new(EvalErrorKind::PrivateMethod {
        name: name.to_string(),
        receiver: receiver.to_string(),
    })
}

#[cold]
pub fn protected_method(name: &str, receiver: &str) -> EvalError {
    EvalError::new(EvalErrorKind::ProtectedMethod {
        name: name.to_string(),
        receiver: receiver.to_string(),
    })
}

#[cold]
pub fn undefined_local_or_method(name: &str, receiver: &str) -> EvalError {
    EvalError::new(EvalErrorKind::UndefinedLocalOrMethod {
        name: name.to_string(),
        receiver: receiver.to_string(),
    })
}

#[cold]
pub fn no_super_method(name: &str) -> EvalError {
    EvalError::new(EvalErrorKind::NoSuperMethod {
        name: name.to_string(),
    })
}

#[cold]
pub fn super_outside_method() -> EvalError {
    EvalError::new(EvalErrorKind::SuperOutsideMethod)
}

#[cold]
pub fn uninitialized_constant(name: &str) -> EvalError {
    EvalError::new(EvalErrorKind::UninitializedConstant {
        name: name.to_string(),
    })
}

#[cold]
pub fn uninitialized_class_var(name: &str, module: &str) -> EvalError {
    EvalError::new(EvalErrorKind::UninitializedClassVar {
        name: name.to_string(),
        module: module.to_string(),
    })
}

#[cold]
pub fn undefined_method_for_class(name: &str, module: &str) -> EvalError {
    EvalError::new(EvalErrorKind::UndefinedMethodForClass {
        name: name.to_string(),
        module: module.to_string(),
    })
}

#[cold]
pub fn name_error(message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::Name {
        message: message.into(),
    })
}

// Type and definition errors

#[cold]
pub fn type_error(message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::Type {
        message: message.into(),
    })
}

#[cold]
pub fn superclass_mismatch(class: &str) -> EvalError {
    type_error(format!("superclass mismatch for class {class}"))
}

#[cold]
pub fn not_a_class(name: &str) -> EvalError {
    type_error(format!("{name} is not a class"))
}

#[cold]
pub fn not_a_module(name: &str) -> EvalError {
    type_error(format!("{name} is not a module"))
}

#[cold]
pub fn wrong_argument_type(got: &str, expected: &str) -> EvalError {
    type_error(format!("wrong argument type {got} (expected {expected})"))
}

// Control flow

#[cold]
pub fn local_jump(reason: LocalJumpReason) -> EvalError {
    EvalError::new(EvalErrorKind::LocalJump { reason })
}

#[cold]
pub fn stack_too_deep() -> EvalError {
    EvalError::new(EvalErrorKind::StackTooDeep)
}

// Core library

#[cold]
pub fn zero_division() -> EvalError {
    EvalError::new(EvalErrorKind::ZeroDivision)
}

#[cold]
pub fn index_error(message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::Index {
        message: message.into(),
    })
}

#[cold]
pub fn range_error(message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::Range {
        message: message.into(),
    })
}

#[cold]
pub fn runtime_error(message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::Runtime {
        message: message.into(),
    })
}

// Thread events

#[cold]
pub fn interrupted(message: impl Into<String>) -> EvalError {
    EvalError::new(EvalErrorKind::Interrupt {
        message: message.into(),
    })
}

#[cold]
pub fn thread_killed() -> EvalError {
    EvalError::new(EvalErrorKind::ThreadKilled)
}

/// An exception raised from user code with an existing exception object.
#[cold]
pub fn raised(class_name: &str, message: impl Into<String>, exception: Value) -> EvalError {
    EvalError::new(EvalErrorKind::Raised {
        class_name: class_name.to_string(),
        message: message.into(),
    })
    .with_exception(exception)
}
