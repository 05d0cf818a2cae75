use std::collections::{BTreeMap, HashSet};
use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

use super::model::MetricDefinition;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DefinitionEvent {
    Added(MetricDefinition),
    Updated(MetricDefinition),
    Removed(String),
}

impl DefinitionEvent {
    pub fn id(&self) -> &str {
        match self {
            Self::Added(definition) | Self::Updated(definition) => &definition.name,
            Self::Removed(id) => id,
        }
    }
}

#[derive(Debug, Error)]
pub enum DefinitionError {
    #[error("failed to read definitions file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },
    #[error("failed to parse definitions file {path}: {source}")]
    Parse {
        path: String,
        source: toml::de::Error,
    },
    #[error("invalid metric definition: {0}")]
    Invalid(String),
}

#[derive(Debug, Deserialize)]
struct DefinitionsFile {
    #[serde(default)]
    metrics: Vec<MetricDefinition>,
}

pub fn load_definitions(path: impl AsRef<Path>) -> Result<Vec<MetricDefinition>, DefinitionError> {
    let path = path.as_ref();
    let path_str = path.display().to_string();
    let raw = std::fs::read_to_string(path).map_err(|source| DefinitionError::Read {
        path: path_str.clone(),
        source,
    })?;
    parse_definitions(&raw).map_err(|error| match error {
        ParseFailure::Toml(source) => DefinitionError::Parse {
            path: path_str,
            source,
        },
        ParseFailure::Invalid(message) => DefinitionError::Invalid(message),
    })
}

enum ParseFailure {
    Toml(toml::de::Error),
    Invalid(String),
}

fn parse_definitions(raw: &str) -> Result<Vec<MetricDefinition>, ParseFailure> {
    let file: DefinitionsFile = toml::from_str(raw).map_err(ParseFailure::Toml)?;

    let mut seen = HashSet::new();
    for definition in &file.metrics {
        definition.validate().map_err(ParseFailure::Invalid)?;
        if !seen.insert(definition.name.as_str()) {
            return Err(ParseFailure::Invalid(format!(
                "duplicate metric name {}",
                definition.name
            )));
        }
    }

    Ok(file.metrics)
}

/// Events that turn `previous` into `next`; removals first, then additions and updates by name.
pub fn diff_definitions(
    previous: &[MetricDefinition],
    next: &[MetricDefinition],
) -> Vec<DefinitionEvent> {
    let before = previous
        .iter()
        .map(|definition| (definition.name.as_str(), definition))
        .collect::<BTreeMap<_, _>>();
    let after = next
        .iter()
        .map(|definition| (definition.name.as_str(), definition))
        .collect::<BTreeMap<_, _>>();

    let mut events = before
        .keys()
        .filter(|name| !after.contains_key(*name))
        .map(|name| DefinitionEvent::Removed((*name).to_string()))
        .collect::<Vec<_>>();

    for (name, definition) in after {
        match before.get(name) {
            None => events.push(DefinitionEvent::Added(definition.clone())),
            Some(existing) if *existing != definition => {
                events.push(DefinitionEvent::Updated(definition.clone()))
            }
            Some(_) => {}
        }
    }

    events
}

#[cfg(test)]
mod tests {
    use std::fs;

    use super::{DefinitionError, DefinitionEvent, diff_definitions, load_definitions};
    use crate::definitions::MetricDefinition;

    const DEFINITIONS: &str = r#"
[[metrics]]
name = "available-cpus"
provider = { name = "prometheus" }
query = "sum(kube_node_status_capacity{resource='cpu'})"
fetch_interval_seconds = 10

[[metrics]]
name = "error-rate"
provider = { name = "datadog" }
query = "avg:http.errors{*}"
fetch_interval_seconds = 30

[metrics.range]
interval = "10m"
step = "1m"
aggregation = "p95"
stored_results = 5
"#;

    #[test]
    fn loads_definitions_with_optional_range() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("metrics.toml");
        fs::write(&path, DEFINITIONS).expect("definitions should be written");

        let definitions = load_definitions(&path).expect("definitions should load");
        assert_eq!(definitions.len(), 2);
        assert!(definitions[0].range.is_none());

        let range = definitions[1].range.as_ref().expect("range should be present");
        assert_eq!(range.interval, "10m");
        assert_eq!(range.step.as_deref(), Some("1m"));
        assert_eq!(range.aggregation.as_deref(), Some("p95"));
        assert_eq!(range.stored_results, Some(5));
    }

    #[test]
    fn rejects_duplicate_names_and_zero_intervals() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("metrics.toml");

        let duplicate = format!(
            "{}\n{}",
            DEFINITIONS,
            r#"
[[metrics]]
name = "available-cpus"
provider = { name = "prometheus" }
query = "up"
fetch_interval_seconds = 5
"#
        );
        fs::write(&path, duplicate).expect("definitions should be written");
        let error = load_definitions(&path).expect_err("duplicate should be rejected");
        assert!(matches!(error, DefinitionError::Invalid(message) if message.contains("duplicate")));

        fs::write(&path, DEFINITIONS.replace("= 10", "= 0")).expect("definitions should be written");
        let error = load_definitions(&path).expect_err("zero interval should be rejected");
        assert!(matches!(error, DefinitionError::Invalid(_)));
    }

    #[test]
    fn stored_results_above_255_is_a_parse_error() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join("metrics.toml");
        fs::write(&path, DEFINITIONS.replace("stored_results = 5", "stored_results = 256"))
            .expect("definitions should be written");

        let error = load_definitions(&path).expect_err("out of range cap should be rejected");
        assert!(matches!(error, DefinitionError::Parse { .. }));
    }

    #[test]
    fn diff_reports_removed_added_and_changed_definitions() {
        let kept = MetricDefinition::new("kept", "p1", "q1");
        let changed = MetricDefinition::new("changed", "p1", "q2");
        let removed = MetricDefinition::new("removed", "p1", "q3");
        let added = MetricDefinition::new("added", "p1", "q4");

        let previous = vec![kept.clone(), changed.clone(), removed];
        let changed_next = changed.with_fetch_interval(5);
        let next = vec![kept, changed_next.clone(), added.clone()];

        let events = diff_definitions(&previous, &next);
        assert_eq!(
            events,
            vec![
                DefinitionEvent::Removed("removed".to_string()),
                DefinitionEvent::Added(added),
                DefinitionEvent::Updated(changed_next),
            ]
        );
    }

    #[test]
    fn diff_of_identical_sets_is_empty() {
        let definitions = vec![MetricDefinition::new("a", "p1", "q")];
        assert!(diff_definitions(&definitions, &definitions).is_empty());
    }
}
