//! Indented, one-statement-per-line rendering for diagnostics.
//!
//! Render-only: nothing parses this output.

use super::ast::{Ast, Category, NodeId, NodeKind};

/// Indentation unit.
pub const INDENT: &str = "    ";

/// Suffix placed on the line that owns the currently executing node.
pub const CURRENT_MARKER: &str = "  # <- executing";

/// Surface syntax of the indented rendering.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RenderStyle {
    /// `WHILE frontIsClear:` / `REPEAT 3:` / `move`
    Dsl,
    /// `while frontIsClear():` / `for i in range(3):` / `move()`
    #[default]
    Python,
}

/// Render `ast` with one statement per line.
#[must_use]
pub fn render_indented(ast: &Ast, style: RenderStyle) -> String {
    render_marked(ast, style, None)
}

/// Render `ast`, appending [`CURRENT_MARKER`] to the line that executes `current`.
///
/// Conditions are marked on the line of the statement that tests them.
#[must_use]
pub fn render_marked(ast: &Ast, style: RenderStyle, current: Option<NodeId>) -> String {
    let marked = current.filter(|&id| ast.contains(id)).map(|id| owning_line(ast, id));
    let mut out = Renderer {
        ast,
        style,
        marked,
        lines: Vec::new(),
    };
    out.node(ast.root(), 0);
    out.lines.join("\n")
}

fn owning_line(ast: &Ast, id: NodeId) -> NodeId {
    let mut node = id;
    while matches!(ast.kind(node).category(), Category::Condition | Category::Integer) {
        match ast.parent(node) {
            Some(parent) => node = parent,
            None => break,
        }
    }
    node
}

struct Renderer<'a> {
    ast: &'a Ast,
    style: RenderStyle,
    marked: Option<NodeId>,
    lines: Vec<String>,
}

impl Renderer<'_> {
    fn line(&mut self, id: NodeId, depth: usize, text: String) {
        let mut line = INDENT.repeat(depth);
        line.push_str(&text);
        if self.marked == Some(id) {
            line.push_str(CURRENT_MARKER);
        }
        self.lines.push(line);
    }

    fn python(&self) -> bool {
        self.style == RenderStyle::Python
    }

    fn node(&mut self, id: NodeId, depth: usize) {
        let ast = self.ast;
        let children = ast.children(id);
        match ast.kind(id) {
            NodeKind::Program => {
                let head = if self.python() { "def run():" } else { "DEF run:" };
                self.line(id, depth, head.into());
                self.node(children[0], depth + 1);
            }
            NodeKind::Concatenate => {
                self.node(children[0], depth);
                self.node(children[1], depth);
            }
            NodeKind::While => {
                let keyword = if self.python() { "while" } else { "WHILE" };
                let head = format!("{keyword} {}:", self.condition(children[0]));
                self.line(id, depth, head);
                self.node(children[1], depth + 1);
            }
            NodeKind::If | NodeKind::IfElse => {
                let keyword = if self.python() { "if" } else { "IF" };
                let head = format!("{keyword} {}:", self.condition(children[0]));
                self.line(id, depth, head);
                self.node(children[1], depth + 1);
                if let Some(&otherwise) = children.get(2) {
                    let keyword = if self.python() { "else:" } else { "ELSE:" };
                    self.lines.push(format!("{}{keyword}", INDENT.repeat(depth)));
                    self.node(otherwise, depth + 1);
                }
            }
            NodeKind::Repeat => {
                let count = match ast.kind(children[0]) {
                    NodeKind::Int(n) => *n,
                    _ => 0,
                };
                let head = if self.python() {
                    format!("for i in range({count}):")
                } else {
                    format!("REPEAT {count}:")
                };
                self.line(id, depth, head);
                self.node(children[1], depth + 1);
            }
            NodeKind::Action(name) => {
                let text = if self.python() {
                    format!("{name}()")
                } else {
                    name.clone()
                };
                self.line(id, depth, text);
            }
            NodeKind::Hole(_) => self.line(id, depth, "<HOLE>".into()),
            NodeKind::Int(_) | NodeKind::Perception { .. } | NodeKind::Not => {
                let text = self.condition(id);
                self.line(id, depth, text);
            }
        }
    }

    fn condition(&self, id: NodeId) -> String {
        let ast = self.ast;
        match ast.kind(id) {
            NodeKind::Not => {
                let keyword = if self.python() { "not" } else { "NOT" };
                format!("{keyword} {}", self.condition(ast.children(id)[0]))
            }
            NodeKind::Perception { name, params } if self.python() => {
                let args: Vec<String> = params.iter().map(|p| format!("\"{p}\"")).collect();
                format!("{name}({})", args.join(", "))
            }
            NodeKind::Perception { name, params } if params.is_empty() => name.clone(),
            NodeKind::Perception { name, params } => format!("{name}({})", params.join(", ")),
            other => other.label(),
        }
    }
}
