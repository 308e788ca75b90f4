//! Call expressions: argument lists, block arguments, `super`.

use std::sync::Arc;

use garnet_ir::CallType;
use smallvec::SmallVec;

use super::{Interpreter, MissingReason};
use crate::ast::{BlockArg, CallArgs, IterNode, NodeKind, NodeRef, OpAsgnKind};
use crate::block::{Block, BlockKind};
use crate::call_site::CallSite;
use crate::errors::{super_outside_method, type_error, wrong_argument_type, ControlAction, EvalResult};
use crate::value::Value;

/// Evaluated argument list; most calls pass a handful of arguments.
pub(crate) type ArgVec = SmallVec<[Value; 4]>;

impl Interpreter {
    /// Evaluate an argument list, expanding `*splat` entries.
    pub(crate) fn eval_args(&mut self, nodes: &[NodeRef]) -> Result<ArgVec, ControlAction> {
        let mut values = ArgVec::with_capacity(nodes.len());
        for node in nodes {
            if let NodeKind::Splat(inner) = &node.kind {
                let value = self.eval_node(inner)?;
                values.extend(self.splat_values(value)?);
            } else {
                values.push(self.eval_node(node)?);
            }
        }
        Ok(values)
    }

    /// `*value`: arrays expand, `nil` is empty, objects with `to_a` are
    /// converted, anything else is a single element.
    pub(crate) fn splat_values(&mut self, value: Value) -> Result<Vec<Value>, ControlAction> {
        match value {
            Value::Array(items) => Ok(items.to_vec()),
            Value::Nil => Ok(Vec::new()),
            Value::Object(_) if self.responds_to(&value, self.runtime.names().to_a) => {
                let to_a = self.runtime.names().to_a;
                match self.send(&value, to_a, &[], &Block::none(), CallType::Normal)? {
                    Value::Array(items) => Ok(items.to_vec()),
                    _ => Err(type_error(format!(
                        "can't convert {} to Array",
                        self.runtime.real_class_of(&value).display_name()
                    ))
                    .into()),
                }
            }
            other => Ok(vec![other]),
        }
    }

    pub(crate) fn eval_call(
        &mut self,
        site: &Arc<CallSite>,
        receiver: &Value,
        args: &CallArgs,
    ) -> EvalResult {
        let values = self.eval_args(&args.args)?;
        match &args.block {
            None => site.call(self, receiver, &values, &Block::none()),
            Some(BlockArg::Literal(iter)) => {
                let block = self.capture_block(iter, BlockKind::Normal);
                site.call_iter(self, receiver, &values, &block)
            }
            Some(BlockArg::Pass(expr)) => {
                let value = self.eval_node(expr)?;
                let block = self.block_from_value(&value)?;
                site.call(self, receiver, &values, &block)
            }
        }
    }

    /// Capture a block literal over the current frame, scope and context.
    pub(crate) fn capture_block(&self, iter: &Arc<IterNode>, kind: BlockKind) -> Block {
        Block::interpreted(
            iter.clone(),
            self.frames.current(),
            self.scopes.current().clone(),
            self.context.clone(),
            kind,
        )
    }

    /// `&value`: `nil` passes no block, a proc passes its block, anything
    /// else is converted with `to_proc`.
    pub(crate) fn block_from_value(&mut self, value: &Value) -> Result<Block, ControlAction> {
        match value {
            Value::Nil => Ok(Block::none()),
            Value::Proc(proc_value) => Ok(proc_value.block().clone()),
            other => {
                let to_proc = self.runtime.names().to_proc;
                if self.responds_to(other, to_proc) {
                    if let Value::Proc(converted) =
                        self.send(other, to_proc, &[], &Block::none(), CallType::Normal)?
                    {
                        return Ok(converted.block().clone());
                    }
                }
                let class = self.runtime.real_class_of(other).display_name();
                Err(wrong_argument_type(&class, "Proc").into())
            }
        }
    }

    fn eval_block_arg(&mut self, arg: Option<&BlockArg>) -> Result<Option<Block>, ControlAction> {
        match arg {
            None => Ok(None),
            Some(BlockArg::Literal(iter)) => Ok(Some(self.capture_block(iter, BlockKind::Normal))),
            Some(BlockArg::Pass(expr)) => {
                let value = self.eval_node(expr)?;
                Ok(Some(self.block_from_value(&value)?))
            }
        }
    }

    /// `super(args)` (`explicit` is `Some`) or bare `super`, which re-passes
    /// the current method's arguments. Without a block argument, the
    /// current method's block is passed on.
    pub(crate) fn eval_super(
        &mut self,
        explicit: Option<&CallArgs>,
        zsuper_block: Option<&BlockArg>,
    ) -> EvalResult {
        let frame = self.frames.current();
        let (Some(klazz), Some(name)) = (frame.klazz().cloned(), frame.name()) else {
            return Err(super_outside_method().into());
        };
        let self_value = frame.self_value().clone();
        let frame_block = frame.block().clone();
        let frame_args = frame.args().cloned();

        let (args, block_arg) = match explicit {
            Some(call_args) => (self.eval_args(&call_args.args)?, call_args.block.as_ref()),
            None => (
                frame_args.map(|args| args.iter().cloned().collect()).unwrap_or_default(),
                zsuper_block,
            ),
        };
        let block = self.eval_block_arg(block_arg)?.unwrap_or(frame_block);

        let class = self.runtime.class_of(&self_value);
        let start = if class.inherits_from(&klazz) {
            class
                .chain()
                .skip_while(|entry| !entry.same_origin(&klazz))
                .nth(1)
        } else {
            klazz.superclass()
        };
        let method = start.and_then(|start| start.search_method(name));

        let literal = match block_arg {
            Some(BlockArg::Literal(_)) => block.id(),
            _ => None,
        };
        if let Some(id) = literal {
            self.enter_block_call(id);
        }
        let result = match method {
            Some((method, _)) if !method.is_undefined() => {
                self.invoke_method(&method, &self_value, name, &args, &block)
            }
            _ => self.call_method_missing(&self_value, name, &args, &block, MissingReason::Super),
        };
        let Some(id) = literal else {
            return result;
        };
        self.exit_block_call(id);
        match result {
            Err(ControlAction::Break {
                target: Some(target),
                value,
            }) if target == id => Ok(value),
            other => other,
        }
    }

    /// `recv.attr op= value`.
    pub(crate) fn eval_op_asgn(
        &mut self,
        receiver: &NodeRef,
        reader: &Arc<CallSite>,
        writer: &Arc<CallSite>,
        op: &OpAsgnKind,
        value: &NodeRef,
    ) -> EvalResult {
        let receiver = self.eval_node(receiver)?;
        let current = reader.call(self, &receiver, &[], &Block::none())?;
        let new_value = match op {
            OpAsgnKind::Or if current.is_truthy() => return Ok(current),
            OpAsgnKind::And if !current.is_truthy() => return Ok(current),
            OpAsgnKind::Or | OpAsgnKind::And => self.eval_node(value)?,
            OpAsgnKind::Operator(site) => {
                let operand = self.eval_node(value)?;
                site.call(self, &current, &[operand], &Block::none())?
            }
        };
        writer.call(self, &receiver, &[new_value.clone()], &Block::none())?;
        Ok(new_value)
    }
}
