//! Calculation requests and reports.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use ratesheet_engine::engine::{RuntimeInputs, format_number, parse_number};
use tracing::warn;

use crate::error::SelectionFailure;
use crate::layout::Layout;
use crate::rules::{Breakdown, MatchPhase};

/// One route choice of a calculate request.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Selection {
    pub node: String,
    #[serde(default, deserialize_with = "deserialize_inputs")]
    pub inputs: BTreeMap<String, String>,
}

impl Selection {
    pub fn new(node: &str, inputs: &[(&str, &str)]) -> Selection {
        Selection {
            node: node.to_string(),
            inputs: inputs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        }
    }

    /// Numeric values of the runtime-input fields in this selection.
    /// Values that do not parse count as 0.
    pub fn runtime_inputs(&self, layout: &Layout) -> RuntimeInputs {
        self.inputs
            .iter()
            .filter(|(label, _)| layout.is_runtime_input(label))
            .map(|(label, raw)| {
                let value = parse_number(raw.trim()).unwrap_or_else(|| {
                    warn!(field = %label, value = %raw, "runtime input is not a number, using 0");
                    0.0
                });
                (label.clone(), value)
            })
            .collect()
    }
}

/// Input values arrive as JSON strings, numbers, booleans or null; matching
/// compares them as trimmed text.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawInput {
    Text(String),
    Number(f64),
    Flag(bool),
    Null(()),
}

fn deserialize_inputs<'de, D>(deserializer: D) -> Result<BTreeMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = BTreeMap::<String, RawInput>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .map(|(k, v)| {
            let text = match v {
                RawInput::Text(s) => s,
                RawInput::Number(n) => format_number(n),
                RawInput::Flag(b) => b.to_string(),
                RawInput::Null(()) => String::new(),
            };
            (k, text)
        })
        .collect())
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeResult {
    pub node: String,
    pub row: usize,
    pub phase: MatchPhase,
    pub cost: f64,
    pub breakdown: Breakdown,
}

/// Result of a calculate batch. `total_cost` sums successful selections only.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CalculationReport {
    pub node_results: Vec<NodeResult>,
    pub total_cost: f64,
    pub failures: Vec<SelectionFailure>,
}

impl CalculationReport {
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}
