//! Parsing of k6-style threshold definitions.
//!
//! A threshold is a metric name with an optional `{key:value}` filter, and an
//! expression such as `p(95)<300` or `rate<0.001`.

use thiserror::Error;

use super::{Comparison, MetricSelector, Statistic};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ThresholdParseError {
    #[error("unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("invalid metric filter in '{metric}': {reason}")]
    InvalidFilter { metric: String, reason: String },

    #[error("invalid expression '{expression}': {reason}")]
    InvalidExpression { expression: String, reason: String },

    #[error("statistic '{statistic}' is not supported for metric '{metric}'")]
    UnsupportedStatistic { metric: String, statistic: String },
}

pub(super) fn parse_metric(raw: &str) -> Result<MetricSelector, ThresholdParseError> {
    let raw = raw.trim();
    let (name, filter) = match raw.split_once('{') {
        Some((name, rest)) => {
            let inner = rest.strip_suffix('}').ok_or_else(|| ThresholdParseError::InvalidFilter {
                metric: raw.to_string(),
                reason: "missing closing '}'".to_string(),
            })?;
            let (key, value) =
                inner
                    .split_once(':')
                    .ok_or_else(|| ThresholdParseError::InvalidFilter {
                        metric: raw.to_string(),
                        reason: "expected key:value".to_string(),
                    })?;
            let value = value.trim();
            if value.is_empty() {
                return Err(ThresholdParseError::InvalidFilter {
                    metric: raw.to_string(),
                    reason: "empty filter value".to_string(),
                });
            }
            (name.trim(), Some((key.trim(), value.to_string())))
        }
        None => (raw, None),
    };

    let tag = |filter: Option<(&str, String)>| -> Result<Option<String>, ThresholdParseError> {
        match filter {
            None => Ok(None),
            Some(("tag" | "name", value)) => Ok(Some(value)),
            Some((key, _)) => Err(ThresholdParseError::InvalidFilter {
                metric: raw.to_string(),
                reason: format!("unsupported filter key '{key}', use 'name'"),
            }),
        }
    };

    match name {
        "http_req_duration" => Ok(MetricSelector::RequestDuration { tag: tag(filter)? }),
        "http_req_failed" => Ok(MetricSelector::RequestFailed { tag: tag(filter)? }),
        "http_reqs" => Ok(MetricSelector::Requests { tag: tag(filter)? }),
        "checks" => match filter {
            None => Ok(MetricSelector::Checks { check: None }),
            Some(("check", value)) => Ok(MetricSelector::Checks { check: Some(value) }),
            Some((key, _)) => Err(ThresholdParseError::InvalidFilter {
                metric: raw.to_string(),
                reason: format!("unsupported filter key '{key}', use 'check'"),
            }),
        },
        "iterations" if filter.is_none() => Ok(MetricSelector::Iterations),
        "iterations" => Err(ThresholdParseError::InvalidFilter {
            metric: raw.to_string(),
            reason: "iterations cannot be filtered".to_string(),
        }),
        other => Err(ThresholdParseError::UnknownMetric(other.to_string())),
    }
}

pub(super) fn parse_expression(
    raw: &str,
) -> Result<(Statistic, Comparison, f64), ThresholdParseError> {
    let invalid = |reason: &str| ThresholdParseError::InvalidExpression {
        expression: raw.to_string(),
        reason: reason.to_string(),
    };

    // two-character operators first so "<=" is not read as "<"
    const OPERATORS: [(&str, Comparison); 6] = [
        ("<=", Comparison::Le),
        (">=", Comparison::Ge),
        ("==", Comparison::Eq),
        ("!=", Comparison::Ne),
        ("<", Comparison::Lt),
        (">", Comparison::Gt),
    ];
    let (lhs, op, rhs) = OPERATORS
        .iter()
        .filter_map(|(token, op)| raw.find(token).map(|pos| (pos, *token, *op)))
        .min_by_key(|(pos, token, _)| (*pos, std::cmp::Reverse(token.len())))
        .map(|(pos, token, op)| (&raw[..pos], op, &raw[pos + token.len()..]))
        .ok_or_else(|| invalid("missing comparison operator"))?;

    let bound: f64 = rhs
        .trim()
        .parse()
        .map_err(|_| invalid("bound is not a number"))?;
    if !bound.is_finite() {
        return Err(invalid("bound must be finite"));
    }

    let statistic = match lhs.trim() {
        "avg" => Statistic::Avg,
        "min" => Statistic::Min,
        "max" => Statistic::Max,
        "med" => Statistic::Med,
        "rate" => Statistic::Rate,
        "count" => Statistic::Count,
        other => {
            let p = other
                .strip_prefix("p(")
                .and_then(|s| s.strip_suffix(')'))
                .ok_or_else(|| invalid("unknown statistic"))?;
            let p: f64 = p.trim().parse().map_err(|_| invalid("percentile is not a number"))?;
            if !(0.0..=100.0).contains(&p) {
                return Err(invalid("percentile must be within 0..=100"));
            }
            Statistic::Percentile(p)
        }
    };

    Ok((statistic, op, bound))
}

pub(super) fn check_supported(
    metric: &MetricSelector,
    statistic: Statistic,
    metric_name: &str,
) -> Result<(), ThresholdParseError> {
    let ok = match metric {
        MetricSelector::RequestDuration { .. } => !matches!(statistic, Statistic::Rate),
        MetricSelector::RequestFailed { .. } | MetricSelector::Checks { .. } => {
            matches!(statistic, Statistic::Rate | Statistic::Count)
        }
        MetricSelector::Requests { .. } | MetricSelector::Iterations => {
            matches!(statistic, Statistic::Count)
        }
    };
    if ok {
        Ok(())
    } else {
        Err(ThresholdParseError::UnsupportedStatistic {
            metric: metric_name.to_string(),
            statistic: statistic.to_string(),
        })
    }
}
