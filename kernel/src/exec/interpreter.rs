//! Stepwise program execution.
//!
//! [`Execution`] is an explicit state machine over a frame stack. Each call
//! to [`Execution::next_action`] runs the program until the next primitive
//! action has been performed and then suspends, handing the step back so the
//! caller can read the environment, compute a reward and decide whether to
//! continue. Conditions never suspend.
//!
//! In record mode, [`Execution::next_event`] also surfaces every perception
//! evaluated along the way, in evaluation order and before any later action
//! mutates the world.

use std::collections::VecDeque;

use crate::dsl::{Ast, NodeId, NodeKind};
use crate::env::Environment;

/// Refusal to start a run.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ExecError {
    #[error("program root must be Program, found {found}")]
    RootNotProgram { found: String },
    #[error("program is incomplete: hole at {node}")]
    IncompleteProgram { node: NodeId },
}

/// One performed action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ActionStep<'a> {
    pub node: NodeId,
    pub name: &'a str,
}

/// One evaluated perception (record mode only).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PerceptionStep<'a> {
    pub node: NodeId,
    pub name: &'a str,
    pub result: bool,
}

/// A visited primitive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecEvent<'a> {
    Action(ActionStep<'a>),
    Perception(PerceptionStep<'a>),
}

impl ExecEvent<'_> {
    #[must_use]
    pub fn node(&self) -> NodeId {
        match self {
            Self::Action(step) => step.node,
            Self::Perception(step) => step.node,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Frame {
    Visit(NodeId),
    Loop(NodeId),
    Repeat { body: NodeId, remaining: u8 },
}

/// A single, non-restartable run of a program against an environment.
pub struct Execution<'a, E: Environment> {
    ast: &'a Ast,
    env: &'a mut E,
    stack: Vec<Frame>,
    pending: VecDeque<PerceptionStep<'a>>,
    record: bool,
    actions: u64,
    halted: bool,
}

impl<'a, E: Environment> Execution<'a, E> {
    /// Start a run that yields actions only.
    ///
    /// # Errors
    ///
    /// Returns [`ExecError`] if `ast` is not a complete program.
    pub fn new(ast: &'a Ast, env: &'a mut E) -> Result<Self, ExecError> {
        Self::start(ast, env, false)
    }

    /// Start a run that also reports perceptions through [`Execution::next_event`].
    ///
    /// # Errors
    ///
    /// Returns [`ExecError`] if `ast` is not a complete program.
    pub fn recording(ast: &'a Ast, env: &'a mut E) -> Result<Self, ExecError> {
        Self::start(ast, env, true)
    }

    fn start(ast: &'a Ast, env: &'a mut E, record: bool) -> Result<Self, ExecError> {
        let root_kind = ast.kind(ast.root());
        if *root_kind != NodeKind::Program {
            return Err(ExecError::RootNotProgram {
                found: root_kind.label(),
            });
        }
        if let Some(node) = ast.first_hole() {
            return Err(ExecError::IncompleteProgram { node });
        }
        let halted = env.is_crashed();
        Ok(Self {
            ast,
            env,
            stack: vec![Frame::Visit(ast.root())],
            pending: VecDeque::new(),
            record,
            actions: 0,
            halted,
        })
    }

    /// The environment being driven.
    #[must_use]
    pub fn env(&self) -> &E {
        self.env
    }

    /// The program being run.
    #[must_use]
    pub fn program(&self) -> &'a Ast {
        self.ast
    }

    /// Actions performed so far.
    #[must_use]
    pub fn actions_taken(&self) -> u64 {
        self.actions
    }

    /// `true` once no further event will be produced.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.pending.is_empty() && (self.halted || self.stack.is_empty())
    }

    /// Run until the next action has been performed.
    pub fn next_action(&mut self) -> Option<ActionStep<'a>> {
        loop {
            match self.next_event()? {
                ExecEvent::Action(step) => return Some(step),
                ExecEvent::Perception(_) => {}
            }
        }
    }

    /// Run until the next action or (in record mode) perception.
    pub fn next_event(&mut self) -> Option<ExecEvent<'a>> {
        if let Some(step) = self.pending.pop_front() {
            return Some(ExecEvent::Perception(step));
        }
        if self.halted {
            return None;
        }
        self.advance()
    }

    fn halt(&mut self) {
        self.halted = true;
        self.stack.clear();
    }

    fn advance(&mut self) -> Option<ExecEvent<'a>> {
        let ast = self.ast;
        while let Some(frame) = self.stack.pop() {
            let mut performed = None;
            match frame {
                Frame::Visit(id) => {
                    let children = ast.children(id);
                    match ast.kind(id) {
                        NodeKind::Program => self.stack.push(Frame::Visit(children[0])),
                        NodeKind::Concatenate => {
                            self.stack.push(Frame::Visit(children[1]));
                            self.stack.push(Frame::Visit(children[0]));
                        }
                        NodeKind::If => {
                            if self.test(children[0]) {
                                self.stack.push(Frame::Visit(children[1]));
                            }
                        }
                        NodeKind::IfElse => {
                            let branch = if self.test(children[0]) { 1 } else { 2 };
                            self.stack.push(Frame::Visit(children[branch]));
                        }
                        NodeKind::While => self.stack.push(Frame::Loop(id)),
                        NodeKind::Repeat => {
                            let remaining = match ast.kind(children[0]) {
                                NodeKind::Int(n) => *n,
                                _ => 0,
                            };
                            self.stack.push(Frame::Repeat {
                                body: children[1],
                                remaining,
                            });
                        }
                        NodeKind::Action(name) => {
                            self.env.perform(name);
                            self.actions += 1;
                            performed = Some(ActionStep { node: id, name });
                        }
                        NodeKind::Int(_)
                        | NodeKind::Perception { .. }
                        | NodeKind::Not
                        | NodeKind::Hole(_) => {}
                    }
                }
                Frame::Loop(id) => {
                    let children = ast.children(id);
                    if self.test(children[0]) {
                        self.stack.push(Frame::Loop(id));
                        self.stack.push(Frame::Visit(children[1]));
                    }
                }
                Frame::Repeat { body, remaining } => {
                    if remaining > 0 {
                        self.stack.push(Frame::Repeat {
                            body,
                            remaining: remaining - 1,
                        });
                        self.stack.push(Frame::Visit(body));
                    }
                }
            }
            if self.env.is_crashed() {
                self.halt();
            }
            if let Some(step) = performed {
                return Some(ExecEvent::Action(step));
            }
            if let Some(step) = self.pending.pop_front() {
                return Some(ExecEvent::Perception(step));
            }
            if self.halted {
                return None;
            }
        }
        self.halted = true;
        None
    }

    fn test(&mut self, condition: NodeId) -> bool {
        let ast = self.ast;
        match ast.kind(condition) {
            NodeKind::Not => !self.test(ast.children(condition)[0]),
            NodeKind::Perception { name, params } => {
                let result = self.env.perceive(name, params);
                if self.record {
                    self.pending.push_back(PerceptionStep {
                        node: condition,
                        name,
                        result,
                    });
                }
                result
            }
            _ => false,
        }
    }
}

impl<'a, E: Environment> Iterator for Execution<'a, E> {
    type Item = ActionStep<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_action()
    }
}
