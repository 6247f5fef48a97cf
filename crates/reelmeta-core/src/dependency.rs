//! Dependency resolver (component C3): layers enabled output plugins into
//! parallel-safe execution groups via Kahn's algorithm, and evaluates the
//! runtime `expects` readiness predicate against an availability set.
use std::collections::{HashMap, HashSet};

use crate::error::DependencyError;
use crate::manifest::{ExpectsPath, PluginManifest};

/// One layer of the execution plan: plugin names eligible for concurrent
/// invocation, sorted for deterministic iteration.
pub type Group = Vec<String>;

/// An ordered sequence of [`Group`]s produced by [`plan`].
#[derive(Debug, Clone, Default)]
pub struct ExecutionPlan {
    pub groups: Vec<Group>,
}

impl ExecutionPlan {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}

/// Build the execution plan for the given enabled output manifests.
///
/// Edges are taken from `depends_on`; an edge to a plugin absent from
/// `manifests` (unknown or disabled) is a [`DependencyError::UnknownDependency`].
/// A residual, non-empty graph after layering terminates is a cycle.
pub fn plan(manifests: &HashMap<String, PluginManifest>) -> Result<ExecutionPlan, DependencyError> {
    let mut indegree: HashMap<String, usize> = HashMap::new();
    let mut successors: HashMap<String, Vec<String>> = HashMap::new();

    for name in manifests.keys() {
        indegree.entry(name.clone()).or_insert(0);
        successors.entry(name.clone()).or_default();
    }

    for manifest in manifests.values() {
        for dep in &manifest.depends_on {
            if !manifests.contains_key(dep) {
                return Err(DependencyError::UnknownDependency {
                    plugin: manifest.name.clone(),
                    depends_on: dep.clone(),
                });
            }
            successors.get_mut(dep).unwrap().push(manifest.name.clone());
            *indegree.get_mut(&manifest.name).unwrap() += 1;
        }
    }

    let mut remaining = indegree.clone();
    let mut groups = Vec::new();

    loop {
        let mut ready: Vec<String> = remaining
            .iter()
            .filter(|(_, &deg)| deg == 0)
            .map(|(name, _)| name.clone())
            .collect();

        if ready.is_empty() {
            break;
        }
        ready.sort();

        for name in &ready {
            remaining.remove(name);
            for succ in &successors[name] {
                if let Some(deg) = remaining.get_mut(succ) {
                    *deg -= 1;
                }
            }
        }

        groups.push(ready);
    }

    if !remaining.is_empty() {
        let mut members: Vec<String> = remaining.keys().cloned().collect();
        members.sort();
        return Err(DependencyError::Cycle { members });
    }

    Ok(ExecutionPlan { groups })
}

/// Validate that every `expects` entry names a known, enabled plugin.
pub fn validate_expectations(
    manifests: &HashMap<String, PluginManifest>,
) -> Result<(), DependencyError> {
    for manifest in manifests.values() {
        for expects in &manifest.expects {
            if !manifests.contains_key(expects.plugin()) {
                return Err(DependencyError::UnknownExpectation {
                    plugin: manifest.name.clone(),
                    expects: expects.to_string(),
                });
            }
        }
    }
    Ok(())
}

/// The set of data paths currently present in a match's accumulated
/// results, used to gate a plugin's `expects` predicate.
#[derive(Debug, Default, Clone)]
pub struct AvailabilitySet {
    keys: HashSet<String>,
    subkeys: HashSet<(String, String)>,
}

impl AvailabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_key(&mut self, key: impl Into<String>) {
        self.keys.insert(key.into());
    }

    pub fn insert_subkey(&mut self, key: impl Into<String>, subkey: impl Into<String>) {
        self.subkeys.insert((key.into(), subkey.into()));
    }

    pub fn satisfies(&self, path: &ExpectsPath) -> bool {
        match &path.subkey {
            None => self.keys.contains(&path.key),
            Some(sub) => self.subkeys.contains(&(path.key.clone(), sub.clone())),
        }
    }
}

/// Whether a plugin is ready to run given the current availability set.
pub fn is_ready(manifest: &PluginManifest, availability: &AvailabilitySet) -> bool {
    manifest
        .expects
        .iter()
        .all(|path| availability.satisfies(path))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manifest::PluginCategory;

    fn manifest(name: &str, depends_on: &[&str]) -> PluginManifest {
        PluginManifest {
            name: name.to_string(),
            version: "0.1.0".to_string(),
            category: PluginCategory::Output,
            class_hint: None,
            depends_on: depends_on.iter().map(|s| s.to_string()).collect(),
            expects: HashSet::new(),
            categories_supported: HashSet::new(),
            source: std::path::PathBuf::new(),
        }
    }

    #[test]
    fn linear_chain_produces_ordered_groups() {
        let mut manifests = HashMap::new();
        manifests.insert("a".into(), manifest("a", &[]));
        manifests.insert("b".into(), manifest("b", &["a"]));
        manifests.insert("c".into(), manifest("c", &["b"]));

        let plan = plan(&manifests).unwrap();
        assert_eq!(plan.groups, vec![vec!["a".to_string()], vec!["b".to_string()], vec!["c".to_string()]]);
    }

    #[test]
    fn independent_nodes_share_a_group_sorted_by_name() {
        let mut manifests = HashMap::new();
        manifests.insert("z".into(), manifest("z", &[]));
        manifests.insert("a".into(), manifest("a", &[]));

        let plan = plan(&manifests).unwrap();
        assert_eq!(plan.groups, vec![vec!["a".to_string(), "z".to_string()]]);
    }

    #[test]
    fn cycle_is_detected() {
        let mut manifests = HashMap::new();
        manifests.insert("b".into(), manifest("b", &["c"]));
        manifests.insert("c".into(), manifest("c", &["b"]));

        let err = plan(&manifests).unwrap_err();
        match err {
            DependencyError::Cycle { members } => {
                assert_eq!(members, vec!["b".to_string(), "c".to_string()]);
            }
            other => panic!("expected Cycle, got {other:?}"),
        }
    }

    #[test]
    fn unknown_dependency_is_rejected() {
        let mut manifests = HashMap::new();
        manifests.insert("a".into(), manifest("a", &["ghost"]));

        let err = plan(&manifests).unwrap_err();
        assert!(matches!(err, DependencyError::UnknownDependency { .. }));
    }

    #[test]
    fn availability_gates_subkey_paths() {
        let mut availability = AvailabilitySet::new();
        availability.insert_key("b");
        availability.insert_subkey("b", "parsed");

        assert!(availability.satisfies(&ExpectsPath::parse("b").unwrap()));
        assert!(availability.satisfies(&ExpectsPath::parse("b.parsed").unwrap()));
        assert!(!availability.satisfies(&ExpectsPath::parse("b.missing").unwrap()));
    }
}
