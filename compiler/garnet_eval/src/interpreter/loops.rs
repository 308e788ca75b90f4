//! `while`, `until`, `for` and `case`.

use std::sync::Arc;

use super::Interpreter;
use crate::ast::{IterNode, LoopKind, NodeRef, WhenClause};
use crate::block::{Block, BlockKind};
use crate::call_site::CallSite;
use crate::errors::{ControlAction, EvalResult};
use crate::value::Value;

impl Interpreter {
    /// `while`/`until`. `next` skips to the condition, `redo` reruns the
    /// body without testing, `break v` ends the loop with `v`.
    pub(crate) fn eval_loop(
        &mut self,
        kind: LoopKind,
        cond: &NodeRef,
        body: Option<&NodeRef>,
        pre_test: bool,
    ) -> EvalResult {
        let continue_when = kind == LoopKind::While;
        let mut test = pre_test;
        loop {
            self.poll_events()?;
            if test && self.eval_node(cond)?.is_truthy() != continue_when {
                return Ok(Value::Nil);
            }
            test = true;
            loop {
                match self.eval_opt(body) {
                    Ok(_) | Err(ControlAction::Next(_)) => break,
                    Err(ControlAction::Redo) => {}
                    Err(ControlAction::Break {
                        target: None,
                        value,
                    }) => return Ok(value),
                    Err(other) => return Err(other),
                }
            }
        }
    }

    /// `for x in iter`: `iter.each` with a block that binds in the
    /// enclosing scope.
    pub(crate) fn eval_for(
        &mut self,
        iter: &NodeRef,
        block: &Arc<IterNode>,
        site: &Arc<CallSite>,
    ) -> EvalResult {
        let receiver = self.eval_node(iter)?;
        let block = self.capture_block(block, BlockKind::For);
        site.call_iter(self, &receiver, &[], &block)
    }

    /// `case`: candidates are tested in order with `candidate === subject`,
    /// or by truthiness when there is no subject.
    pub(crate) fn eval_case(
        &mut self,
        subject: Option<&NodeRef>,
        whens: &[WhenClause],
        else_body: Option<&NodeRef>,
        site: &Arc<CallSite>,
    ) -> EvalResult {
        self.poll_events()?;
        let subject = match subject {
            Some(subject) => Some(self.eval_node(subject)?),
            None => None,
        };
        for when in whens {
            for candidate in self.eval_args(&when.values)? {
                let hit = match &subject {
                    Some(subject) => site
                        .call(self, &candidate, std::slice::from_ref(subject), &Block::none())?
                        .is_truthy(),
                    None => candidate.is_truthy(),
                };
                if hit {
                    return self.eval_opt(when.body.as_ref());
                }
            }
        }
        self.eval_opt(else_body)
    }
}
