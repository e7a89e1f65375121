//! Production slots.
//!
//! Every child position in the grammar is typed by a [`Slot`]. The slot
//! decides which node kinds may be placed there when programs are
//! generated or mutated. Validation only checks the slot's [`Category`];
//! the narrower `*NoConcat` / `*NoNot` rules are generation priors, except
//! for the left child of `Concatenate`, which the codec relies on.

use serde::{Deserialize, Serialize};

use super::ast::{Category, HoleKind, NodeKind};

/// A typed child position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    /// Any statement.
    Statement,
    /// Any statement except `Concatenate` (first child of `Concatenate`).
    StatementNoConcat,
    /// Any condition.
    Condition,
    /// A condition that is not `Not` (`IfElse` condition, `Not` operand).
    ConditionNoNot,
    /// The count literal of `Repeat`.
    Integer,
}

impl Slot {
    /// Slot occupied by child `index` of a node tagged `parent`.
    #[must_use]
    pub fn for_child(parent: &NodeKind, index: usize) -> Option<Self> {
        let slot = match (parent, index) {
            (NodeKind::Program, 0)
            | (NodeKind::Concatenate | NodeKind::While | NodeKind::If | NodeKind::Repeat, 1)
            | (NodeKind::IfElse, 1 | 2) => Self::Statement,
            (NodeKind::Concatenate, 0) => Self::StatementNoConcat,
            (NodeKind::While | NodeKind::If, 0) => Self::Condition,
            (NodeKind::IfElse | NodeKind::Not, 0) => Self::ConditionNoNot,
            (NodeKind::Repeat, 0) => Self::Integer,
            _ => return None,
        };
        Some(slot)
    }

    /// Category every occupant of this slot belongs to.
    #[must_use]
    pub fn category(self) -> Category {
        match self {
            Self::Statement | Self::StatementNoConcat => Category::Statement,
            Self::Condition | Self::ConditionNoNot => Category::Condition,
            Self::Integer => Category::Integer,
        }
    }

    /// Whether the production rules allow `kind` in this slot.
    #[must_use]
    pub fn admits(self, kind: &NodeKind) -> bool {
        if kind.category() != self.category() {
            return false;
        }
        match self {
            Self::StatementNoConcat => *kind != NodeKind::Concatenate,
            Self::ConditionNoNot => *kind != NodeKind::Not,
            Self::Statement | Self::Condition | Self::Integer => true,
        }
    }

    /// Hole kind that fits this slot, `None` for [`Slot::Integer`].
    #[must_use]
    pub fn hole(self) -> Option<HoleKind> {
        match self.category() {
            Category::Statement => Some(HoleKind::Statement),
            Category::Condition => Some(HoleKind::Condition),
            Category::Program | Category::Integer => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn concatenate_first_child_excludes_concatenate() {
        let slot = Slot::for_child(&NodeKind::Concatenate, 0).expect("slot");
        assert!(!slot.admits(&NodeKind::Concatenate));
        assert!(slot.admits(&NodeKind::While));
        let rest = Slot::for_child(&NodeKind::Concatenate, 1).expect("slot");
        assert!(rest.admits(&NodeKind::Concatenate));
    }

    #[test]
    fn if_else_condition_and_not_operand_exclude_not() {
        for parent in [NodeKind::IfElse, NodeKind::Not] {
            let slot = Slot::for_child(&parent, 0).expect("slot");
            assert!(!slot.admits(&NodeKind::Not));
            assert!(slot.admits(&NodeKind::Hole(HoleKind::Condition)));
        }
        let slot = Slot::for_child(&NodeKind::While, 0).expect("slot");
        assert!(slot.admits(&NodeKind::Not));
    }

    #[test]
    fn leaves_have_no_slots() {
        assert_eq!(Slot::for_child(&NodeKind::Action("move".into()), 0), None);
        assert_eq!(Slot::for_child(&NodeKind::Repeat, 2), None);
    }
}
