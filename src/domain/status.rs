use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::RangeInclusive;
use std::str::FromStr;

use super::Outcome;

/// Set of HTTP status codes treated as a successful response.
///
/// Parsed from a comma-separated list of codes and inclusive ranges, e.g.
/// `"200-399"` or `"200,201,204"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpectedStatuses(Vec<RangeInclusive<u16>>);

impl ExpectedStatuses {
    pub fn contains(&self, status: u16) -> bool {
        self.0.iter().any(|r| r.contains(&status))
    }

    /// An outcome matches only if it has a status inside the set.
    pub fn matches(&self, outcome: &Outcome) -> bool {
        outcome.status.is_some_and(|s| self.contains(s))
    }
}

impl Default for ExpectedStatuses {
    fn default() -> Self {
        Self(vec![200..=399])
    }
}

impl fmt::Display for ExpectedStatuses {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self
            .0
            .iter()
            .map(|r| {
                if r.start() == r.end() {
                    r.start().to_string()
                } else {
                    format!("{}-{}", r.start(), r.end())
                }
            })
            .collect();
        f.write_str(&parts.join(","))
    }
}

impl FromStr for ExpectedStatuses {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut ranges = Vec::new();
        for part in s.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let range = match part.split_once('-') {
                Some((lo, hi)) => {
                    let lo = parse_code(lo)?;
                    let hi = parse_code(hi)?;
                    if lo > hi {
                        return Err(format!("status range '{part}' is reversed"));
                    }
                    lo..=hi
                }
                None => {
                    let code = parse_code(part)?;
                    code..=code
                }
            };
            ranges.push(range);
        }
        if ranges.is_empty() {
            return Err("expected statuses must not be empty".to_string());
        }
        Ok(Self(ranges))
    }
}

fn parse_code(s: &str) -> Result<u16, String> {
    let code: u16 = s
        .trim()
        .parse()
        .map_err(|_| format!("invalid status code '{s}'"))?;
    if !(100..=599).contains(&code) {
        return Err(format!("status code {code} out of range 100-599"));
    }
    Ok(code)
}

impl Serialize for ExpectedStatuses {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_string())
    }
}

impl<'de> Deserialize<'de> for ExpectedStatuses {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RequestError;
    use std::time::Duration;

    #[test]
    fn test_default_is_2xx_3xx() {
        let set = ExpectedStatuses::default();
        assert!(set.contains(200));
        assert!(set.contains(301));
        assert!(!set.contains(404));
        assert!(!set.contains(500));
    }

    #[test]
    fn test_parse_mixed_list() {
        let set: ExpectedStatuses = "200-204, 304".parse().unwrap();
        assert!(set.contains(201));
        assert!(set.contains(304));
        assert!(!set.contains(302));
        assert_eq!(set.to_string(), "200-204,304");
    }

    #[test]
    fn test_parse_rejects_reversed_and_out_of_range() {
        assert!("399-200".parse::<ExpectedStatuses>().is_err());
        assert!("700".parse::<ExpectedStatuses>().is_err());
        assert!("".parse::<ExpectedStatuses>().is_err());
    }

    #[test]
    fn test_error_outcome_never_matches() {
        let set = ExpectedStatuses::default();
        let outcome = Outcome::failure(RequestError::timeout(), Duration::from_secs(1));
        assert!(!set.matches(&outcome));
    }
}
