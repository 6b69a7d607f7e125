// SPDX-FileCopyrightText: Copyright (c) 2025 NVIDIA CORPORATION & AFFILIATES. All rights reserved.
// SPDX-License-Identifier: Apache-2.0

//! Priority-selector DSL shared by the plugins.
//!
//! A selector is a disjunction of simple expressions over a signed 32-bit
//! priority. Selectors arrive in plugin arguments, e.g.:
//!
//! ```json
//! {"anyExpressions": [{"operator": "Between", "values": [0, 50]}]}
//! ```

use serde::Deserialize;

/// Comparison operator of a single expression.
///
/// Unrecognised operator names deserialize to [`Operator::Unknown`] rather
/// than failing the whole selector; such expressions never match.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "String")]
pub enum Operator {
    In,
    NotIn,
    Between,
    Lt,
    Gt,
    Lte,
    Gte,
    Unknown(String),
}

impl From<String> for Operator {
    fn from(name: String) -> Self {
        match name.as_str() {
            "In" => Self::In,
            "NotIn" => Self::NotIn,
            "Between" => Self::Between,
            "Lt" => Self::Lt,
            "Gt" => Self::Gt,
            "Lte" => Self::Lte,
            "Gte" => Self::Gte,
            _ => {
                tracing::warn!(operator = %name, "unknown priority expression operator");
                Self::Unknown(name)
            }
        }
    }
}

/// A single priority matching expression.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PriorityExpression {
    pub operator: Operator,
    #[serde(default)]
    pub values: Vec<i32>,
}

impl PriorityExpression {
    pub fn new(operator: Operator, values: impl Into<Vec<i32>>) -> Self {
        Self {
            operator,
            values: values.into(),
        }
    }

    /// Whether `priority` satisfies this expression.
    pub fn matches(&self, priority: i32) -> bool {
        match &self.operator {
            Operator::In => self.values.contains(&priority),
            Operator::NotIn => !self.values.contains(&priority),
            Operator::Between => {
                // Bounds are normalised: the smaller value is the lower
                // inclusive bound regardless of their order in the config.
                if self.values.len() < 2 {
                    return false;
                }
                let lo = self.values[0].min(self.values[1]);
                let hi = self.values[0].max(self.values[1]);
                (lo..=hi).contains(&priority)
            }
            Operator::Lt => self.values.first().is_some_and(|v| priority < *v),
            Operator::Gt => self.values.first().is_some_and(|v| priority > *v),
            Operator::Lte => self.values.first().is_some_and(|v| priority <= *v),
            Operator::Gte => self.values.first().is_some_and(|v| priority >= *v),
            Operator::Unknown(_) => false,
        }
    }
}

/// A set of expressions combined with OR logic.
///
/// An empty selector matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrioritySelector {
    #[serde(default)]
    pub any_expressions: Vec<PriorityExpression>,
}

impl PrioritySelector {
    /// A selector consisting of a single expression.
    pub fn single(operator: Operator, values: impl Into<Vec<i32>>) -> Self {
        Self {
            any_expressions: vec![PriorityExpression::new(operator, values)],
        }
    }

    /// Whether `priority` matches any of the expressions.
    pub fn matches(&self, priority: i32) -> bool {
        self.any_expressions.iter().any(|expr| expr.matches(priority))
    }
}
