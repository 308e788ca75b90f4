//! End-to-end evaluation tests.
//!
//! Programs are built with [`AstBuilder`] and run on a `TestRun`
//! interpreter, whose print handler captures output.

mod blocks_tests;
mod cache_tests;
mod control_tests;
mod threads_tests;

use crate::ast::NodeRef;
use crate::{AstBuilder, EvalError, EvalMode, Interpreter, Value};

pub(crate) struct Session {
    pub(crate) interp: Interpreter,
}

impl Session {
    pub(crate) fn new() -> Self {
        Self::with(Interpreter::builder())
    }

    pub(crate) fn with(builder: crate::InterpreterBuilder) -> Self {
        Self {
            interp: builder.mode(EvalMode::TestRun).build(),
        }
    }

    /// A builder sharing the session's interner.
    pub(crate) fn builder(&self) -> AstBuilder {
        AstBuilder::new(self.interp.runtime().interner(), "test.rb")
    }

    pub(crate) fn run(&mut self, program: &NodeRef) -> Value {
        match self.interp.eval(program) {
            Ok(value) => value,
            Err(err) => panic!("unexpected error: {err}\n{:?}", err.backtrace),
        }
    }

    pub(crate) fn run_err(&mut self, program: &NodeRef) -> EvalError {
        match self.interp.eval(program) {
            Ok(value) => panic!("expected an error, got {value:?}"),
            Err(err) => err,
        }
    }

    pub(crate) fn output(&self) -> String {
        self.interp.runtime().print_handler().get_output()
    }

    pub(crate) fn sym(&self, name: &str) -> Value {
        Value::Symbol(self.interp.runtime().intern(name))
    }
}

pub(crate) fn ints(values: &[i64]) -> Value {
    Value::array(values.iter().copied().map(Value::Fixnum).collect())
}
