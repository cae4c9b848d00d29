use serde::{Deserialize, Serialize};

/// User authored auto-response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Trigger {
    #[serde(rename = "trigger")]
    pub pattern: String,
    pub response: String,
}

impl Trigger {
    pub fn new(
        pattern: impl Into<String>,
        response: impl Into<String>,
    ) -> Self {
        Self {
            pattern: pattern.into(),
            response: response.into(),
        }
    }
}

/// Matches clean lines against triggers by case-insensitive containment.
#[derive(Debug, Clone, Default)]
pub struct TriggerEngine {
    triggers: Vec<Trigger>,
    needles: Vec<String>,
}

impl TriggerEngine {
    pub fn new(triggers: Vec<Trigger>) -> Self {
        let mut engine = Self::default();
        engine.set(triggers);
        engine
    }

    pub fn set(&mut self, triggers: Vec<Trigger>) {
        self.needles = triggers
            .iter()
            .map(|trigger| trigger.pattern.to_lowercase())
            .collect();
        self.triggers = triggers;
    }

    pub fn triggers(&self) -> &[Trigger] {
        &self.triggers
    }

    /// Responses of every trigger found in `line`, in trigger order.
    pub fn check(&self, line: &str) -> Vec<String> {
        if self.triggers.is_empty() {
            return Vec::new();
        }

        let haystack = line.to_lowercase();
        self.triggers
            .iter()
            .zip(&self.needles)
            .filter(|(_, needle)| {
                !needle.is_empty() && haystack.contains(needle.as_str())
            })
            .map(|(trigger, _)| trigger.response.clone())
            .collect()
    }
}
