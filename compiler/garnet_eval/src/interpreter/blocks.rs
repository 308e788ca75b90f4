//! Yielding to blocks.
//!
//! A yield runs the block body in a copy of the block's defining frame
//! and a new scope whose parent is the defining scope, so the body sees
//! (and writes) the variables it closed over. `for` bodies bind directly
//! in the defining scope.
//!
//! Signals leaving a block body:
//!
//! - `next v` ends this yield with `v`
//! - `redo` restarts the body without rebinding parameters
//! - `break v` ends the call the block was passed to, or the lambda itself
//! - `return v` leaves the defining method, or the lambda itself

use std::borrow::Cow;

use super::{Activation, Interpreter};
use crate::ast::IterNode;
use crate::block::{Block, BlockBody, BlockData, BlockKind};
use crate::errors::{local_jump, ControlAction, EvalResult, LocalJumpReason};
use crate::frame::ActivationId;
use crate::scope::DynamicScope;
use crate::value::Value;

impl Interpreter {
    /// Call `block` with `args`.
    pub fn yield_block(&mut self, block: &Block, args: &[Value]) -> EvalResult {
        let Some(data) = block.data() else {
            return Err(local_jump(LocalJumpReason::NoBlock).into());
        };
        let lambda = data.kind() == BlockKind::Lambda;
        if lambda {
            data.arity().check(args.len())?;
        }
        let self_value = data.self_value().clone();
        let frame = if lambda {
            data.frame().for_lambda(self_value)
        } else {
            data.frame().for_yield(self_value)
        };
        let activation = frame.activation();
        let scope = match data.body() {
            BlockBody::Interpreted(iter) if data.kind() != BlockKind::For => {
                DynamicScope::new(iter.scope.clone(), Some(data.scope().clone()))
            }
            _ => data.scope().clone(),
        };

        let mut guard = self.activate(Activation {
            frame: Some(frame),
            scope: Some(scope),
            context: Some(data.context().clone()),
            ..Activation::default()
        })?;
        let result = match data.body() {
            BlockBody::Native(func) => func(&mut *guard, args),
            BlockBody::Interpreted(iter) => guard.run_iter_body(iter, args, lambda),
        };
        drop(guard);
        self.block_result(result, data, activation, lambda)
    }

    fn run_iter_body(&mut self, iter: &IterNode, args: &[Value], lambda: bool) -> EvalResult {
        if let Some(params) = &iter.params {
            let fixed = params.pre.len() + params.post.len();
            let splats = fixed > 1 || (fixed == 1 && params.rest.is_some());
            let values: Cow<'_, [Value]> = match args {
                [Value::Array(items)] if !lambda && splats => Cow::Owned(items.to_vec()),
                _ => Cow::Borrowed(args),
            };
            self.bind_targets(params, &values)?;
        }
        loop {
            match self.eval_opt(iter.body.as_ref()) {
                Err(ControlAction::Redo) => {}
                other => return other,
            }
        }
    }

    fn block_result(
        &mut self,
        result: EvalResult,
        data: &BlockData,
        activation: ActivationId,
        lambda: bool,
    ) -> EvalResult {
        match result {
            Ok(value) | Err(ControlAction::Next(value)) => Ok(value),
            Err(ControlAction::Break {
                target: None,
                value,
            }) => {
                if lambda {
                    Ok(value)
                } else if self.active_block_calls.contains(&data.id()) {
                    Err(ControlAction::Break {
                        target: Some(data.id()),
                        value,
                    })
                } else {
                    Err(local_jump(LocalJumpReason::BreakFromProc).into())
                }
            }
            Err(ControlAction::Return { target, value }) if lambda && target == activation => {
                Ok(value)
            }
            Err(ControlAction::Retry) => Err(local_jump(LocalJumpReason::Retry).into()),
            other => other,
        }
    }
}
