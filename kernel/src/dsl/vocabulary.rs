//! Per-domain vocabularies.
//!
//! A [`Vocabulary`] fixes the primitive actions and boolean perceptions a
//! program may mention. Weights are sampling priors used by program
//! generation; they do not affect decoding or execution.

use serde::{Deserialize, Serialize};

/// A named primitive action.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionSpec {
    pub name: String,
    pub weight: f64,
}

/// A named perception with up to two enumerated parameters.
///
/// `params[i]` lists the admissible values of the `i`-th parameter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerceptionSpec {
    pub name: String,
    pub params: Vec<Vec<String>>,
    pub weight: f64,
}

impl PerceptionSpec {
    /// Check that `values` matches this perception's parameter domains.
    ///
    /// # Errors
    ///
    /// Returns a description of the first mismatch.
    pub fn check_params(&self, values: &[String]) -> Result<(), String> {
        if values.len() != self.params.len() {
            return Err(format!(
                "expected {} parameter(s), found {}",
                self.params.len(),
                values.len()
            ));
        }
        for (value, domain) in values.iter().zip(&self.params) {
            if !domain.contains(value) {
                return Err(format!(
                    "'{value}' is not one of [{}]",
                    domain.join(", ")
                ));
            }
        }
        Ok(())
    }
}

/// The closed action/perception set of one grid-world domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vocabulary {
    domain: String,
    actions: Vec<ActionSpec>,
    perceptions: Vec<PerceptionSpec>,
}

fn uniform_actions(names: &[&str]) -> Vec<ActionSpec> {
    names
        .iter()
        .map(|n| ActionSpec {
            name: (*n).to_string(),
            weight: 1.0,
        })
        .collect()
}

fn plain_perception(name: &str) -> PerceptionSpec {
    PerceptionSpec {
        name: name.to_string(),
        params: Vec::new(),
        weight: 1.0,
    }
}

fn param_perception(name: &str, values: &[&str]) -> PerceptionSpec {
    PerceptionSpec {
        name: name.to_string(),
        params: vec![values.iter().map(|v| (*v).to_string()).collect()],
        weight: 1.0,
    }
}

impl Vocabulary {
    #[must_use]
    pub fn new(
        domain: impl Into<String>,
        actions: Vec<ActionSpec>,
        perceptions: Vec<PerceptionSpec>,
    ) -> Self {
        Self {
            domain: domain.into(),
            actions,
            perceptions,
        }
    }

    /// Karel: five actions, five parameterless perceptions.
    #[must_use]
    pub fn karel() -> Self {
        Self::new(
            "karel",
            uniform_actions(&["move", "turnLeft", "turnRight", "pickMarker", "putMarker"]),
            [
                "frontIsClear",
                "leftIsClear",
                "rightIsClear",
                "markersPresent",
                "noMarkersPresent",
            ]
            .iter()
            .map(|n| plain_perception(n))
            .collect(),
        )
    }

    /// Minigrid: six actions, two plain and two parameterized perceptions.
    #[must_use]
    pub fn minigrid() -> Self {
        let actions = [
            ("left", 0.15),
            ("right", 0.15),
            ("forward", 0.5),
            ("pickup", 0.08),
            ("drop", 0.08),
            ("toggle", 0.04),
        ]
        .iter()
        .map(|(name, weight)| ActionSpec {
            name: (*name).to_string(),
            weight: *weight,
        })
        .collect();
        Self::new(
            "minigrid",
            actions,
            vec![
                plain_perception("front_is_clear"),
                param_perception("front_object_type", &["lava", "door", "ball", "box"]),
                param_perception("front_object_color", &["red", "blue"]),
                plain_perception("is_carrying_object"),
            ],
        )
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn actions(&self) -> &[ActionSpec] {
        &self.actions
    }

    #[must_use]
    pub fn perceptions(&self) -> &[PerceptionSpec] {
        &self.perceptions
    }

    #[must_use]
    pub fn has_action(&self, name: &str) -> bool {
        self.actions.iter().any(|a| a.name == name)
    }

    #[must_use]
    pub fn perception(&self, name: &str) -> Option<&PerceptionSpec> {
        self.perceptions.iter().find(|p| p.name == name)
    }

    /// `true` if `token` is a value of some perception parameter.
    #[must_use]
    pub fn is_param_value(&self, token: &str) -> bool {
        self.perceptions
            .iter()
            .flat_map(|p| p.params.iter().flatten())
            .any(|v| v == token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn karel_vocabulary_membership() {
        let vocab = Vocabulary::karel();
        assert!(vocab.has_action("pickMarker"));
        assert!(!vocab.has_action("forward"));
        assert!(vocab.perception("noMarkersPresent").is_some());
        assert!(!vocab.is_param_value("door"));
    }

    #[test]
    fn minigrid_parameters_are_checked() {
        let vocab = Vocabulary::minigrid();
        let spec = vocab.perception("front_object_type").expect("known");
        assert!(spec.check_params(&["door".to_string()]).is_ok());
        assert!(spec.check_params(&["red".to_string()]).is_err());
        assert!(spec.check_params(&[]).is_err());
        assert!(vocab.is_param_value("blue"));
    }
}
