//! Per-node credit assignment.
//!
//! After a rollout, each action step's reward is credited to the action node
//! and to every strict ancestor below the `Program` root. Counts record how
//! many credited steps passed through a node. Read-only over the tree.

use crate::dsl::{Ast, NodeId, NodeKind};

/// Accumulated reward and step counts per node.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeCredit {
    score: Vec<f64>,
    count: Vec<u64>,
    total: f64,
}

impl NodeCredit {
    /// All-zero ledger sized for `ast`.
    #[must_use]
    pub fn new(ast: &Ast) -> Self {
        Self {
            score: vec![0.0; ast.size()],
            count: vec![0; ast.size()],
            total: 0.0,
        }
    }

    /// Ledger built from `(action node, reward)` pairs.
    #[must_use]
    pub fn from_steps(ast: &Ast, steps: impl IntoIterator<Item = (NodeId, f64)>) -> Self {
        let mut credit = Self::new(ast);
        for (node, reward) in steps {
            credit.credit(ast, node, reward);
        }
        credit
    }

    /// Credit `reward` to `action` and its ancestors, stopping at the root.
    pub fn credit(&mut self, ast: &Ast, action: NodeId, reward: f64) {
        self.total += reward;
        for node in std::iter::once(action).chain(ast.ancestors(action)) {
            if *ast.kind(node) == NodeKind::Program {
                break;
            }
            if let (Some(score), Some(count)) =
                (self.score.get_mut(node.index()), self.count.get_mut(node.index()))
            {
                *score += reward;
                *count += 1;
            }
        }
    }

    #[must_use]
    pub fn score(&self, node: NodeId) -> f64 {
        self.score.get(node.index()).copied().unwrap_or(0.0)
    }

    #[must_use]
    pub fn count(&self, node: NodeId) -> u64 {
        self.count.get(node.index()).copied().unwrap_or(0)
    }

    /// Sum of every credited step reward.
    #[must_use]
    pub fn total(&self) -> f64 {
        self.total
    }

    /// Fraction of the total reward attributable to `node` (0 when the total is 0).
    #[must_use]
    pub fn share(&self, node: NodeId) -> f64 {
        if self.total == 0.0 {
            0.0
        } else {
            self.score(node) / self.total
        }
    }

    /// Executed nodes of `ast` ordered by score, highest first; ties by pre-order.
    #[must_use]
    pub fn ranked(&self, ast: &Ast) -> Vec<(NodeId, f64)> {
        let mut ranked: Vec<(NodeId, f64)> = ast
            .all_nodes()
            .filter(|&id| self.count(id) > 0)
            .map(|id| (id, self.score(id)))
            .collect();
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        ranked
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsl::{decode, Vocabulary};
    use crate::exec::interpreter::tests::Corridor;
    use crate::exec::Execution;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn concatenate_accumulates_both_children() {
        let ast = decode("DEF run m( move turnLeft m)", &Vocabulary::karel()).expect("valid");
        let body = ast.program_body().expect("body");
        let [a, b] = ast.children(body) else {
            panic!("two children");
        };
        let credit = NodeCredit::from_steps(&ast, [(*a, 0.5), (*b, -0.2)]);
        assert!(approx(credit.score(body), 0.3));
        assert_eq!(credit.count(body), 2);
        assert!(approx(credit.score(*a), 0.5));
        assert_eq!(credit.count(*b), 1);
        // The Program root is never credited.
        assert_eq!(credit.count(ast.root()), 0);
        assert!(approx(credit.total(), 0.3));
    }

    #[test]
    fn loop_bodies_are_counted_per_iteration() {
        let ast =
            decode("DEF run m( REPEAT R=3 r( move r) m)", &Vocabulary::karel()).expect("valid");
        let mut env = Corridor::new(10);
        let steps: Vec<(NodeId, f64)> = Execution::new(&ast, &mut env)
            .expect("complete")
            .map(|s| (s.node, 0.25))
            .collect();
        let credit = NodeCredit::from_steps(&ast, steps);
        let repeat = ast.program_body().expect("body");
        assert_eq!(credit.count(repeat), 3);
        assert!(approx(credit.score(repeat), 0.75));
        assert!(approx(credit.share(repeat), 1.0));
    }

    #[test]
    fn ranking_orders_by_score() {
        let ast = decode(
            "DEF run m( IF c( frontIsClear c) i( move i) putMarker m)",
            &Vocabulary::karel(),
        )
        .expect("valid");
        let action = |name: &str| {
            ast.all_nodes()
                .find(|&id| ast.kind(id).label() == name)
                .expect("present")
        };
        let credit =
            NodeCredit::from_steps(&ast, [(action("move"), 1.0), (action("putMarker"), -1.0)]);
        let ranked = credit.ranked(&ast);
        assert_eq!(ranked.first().map(|r| r.0), Some(action("If")));
        assert_eq!(ranked.last().map(|r| r.0), Some(action("putMarker")));
        // Rewards cancel out, so no node owns a share of the total.
        assert!(approx(credit.total(), 0.0));
        assert!(approx(credit.share(action("move")), 0.0));
    }
}
