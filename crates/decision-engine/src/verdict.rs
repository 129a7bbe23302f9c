use serde::Deserialize;
use soulscout_core_types::{Decision, ElementClassification, InteractionKind};

use crate::errors::OracleError;
use crate::json::extract_json_object;

/// Typed shape the oracle must answer with.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OracleVerdict {
    pub should_interact: bool,
    pub interaction_type: InteractionKind,
    pub reasoning: String,
    pub confidence: f64,
    pub element_classification: ElementClassification,
}

impl OracleVerdict {
    fn validate(&self) -> Result<(), OracleError> {
        if !self.confidence.is_finite() || !(0.0..=1.0).contains(&self.confidence) {
            return Err(OracleError::schema(format!(
                "confidence {} outside [0, 1]",
                self.confidence
            )));
        }
        let skips = self.interaction_type == InteractionKind::Skip;
        if self.should_interact == skips {
            return Err(OracleError::schema(format!(
                "shouldInteract={} contradicts interactionType={}",
                self.should_interact, self.interaction_type
            )));
        }
        Ok(())
    }

    pub fn into_decision(self) -> Decision {
        if self.interaction_type == InteractionKind::Skip {
            Decision::skip(self.reasoning, self.confidence, self.element_classification)
        } else {
            Decision::interact(
                self.interaction_type,
                self.reasoning,
                self.confidence,
                self.element_classification,
            )
        }
    }
}

/// Extract and validate a verdict from raw oracle output.
pub fn parse_verdict(raw: &str) -> Result<Decision, OracleError> {
    let json = extract_json_object(raw)
        .ok_or_else(|| OracleError::missing("no JSON object in oracle output"))?;
    let verdict: OracleVerdict = serde_json::from_str(&json)
        .map_err(|err| OracleError::schema(format!("failed to parse verdict JSON: {err}")))?;
    verdict.validate()?;
    Ok(verdict.into_decision())
}

#[cfg(test)]
mod tests {
    use super::*;

    const VALID: &str = r#"{"shouldInteract": true, "interactionType": "click", "reasoning": "Primary submit", "confidence": 0.82, "elementClassification": "action_button"}"#;

    #[test]
    fn parses_prose_wrapped_verdict() {
        let raw = format!("Sure! Here is my analysis: {VALID} Hope that helps.");
        let decision = parse_verdict(&raw).expect("verdict");
        assert!(decision.should_interact);
        assert_eq!(decision.interaction, InteractionKind::Click);
        assert_eq!(decision.classification, ElementClassification::ActionButton);
        assert!((decision.confidence - 0.82).abs() < 1e-9);
    }

    #[test]
    fn rejects_unknown_enum_values() {
        let raw = VALID.replace("\"click\"", "\"hover\"");
        assert!(matches!(parse_verdict(&raw), Err(OracleError::Schema(_))));
    }

    #[test]
    fn rejects_out_of_range_confidence() {
        let raw = VALID.replace("0.82", "1.5");
        assert!(matches!(parse_verdict(&raw), Err(OracleError::Schema(_))));
    }

    #[test]
    fn rejects_contradictory_flags() {
        let raw = VALID.replace("\"click\"", "\"skip\"");
        assert!(parse_verdict(&raw).is_err());
    }

    #[test]
    fn rejects_missing_fields_and_missing_object() {
        assert!(parse_verdict(r#"{"shouldInteract": false}"#).is_err());
        assert!(matches!(
            parse_verdict("I cannot decide"),
            Err(OracleError::MissingContent(_))
        ));
    }
}
