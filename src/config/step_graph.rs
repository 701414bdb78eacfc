use std::collections::{BTreeSet, HashMap, VecDeque};

use crate::config::{Config, StepConfig};

/// The validated DAG of step definitions.
///
/// Built once from a validated [`Config`] and read-only thereafter: step
/// lookup, dependency edges in both directions, and a deterministic
/// topological order (ties broken by declaration order, so two runs of
/// the same configuration always schedule identically).
#[derive(Debug, Clone)]
pub struct StepGraph {
    steps: Vec<StepConfig>,
    dependencies: HashMap<String, Vec<String>>,
    dependents: HashMap<String, Vec<String>>,
    topo: Vec<String>,
}

impl StepGraph {
    /// Build the graph. Returns `None` when the step set contains a cycle,
    /// which validation is expected to have caught already.
    pub fn from_config(config: &Config) -> Option<Self> {
        let steps = config.steps.clone();

        let mut dependencies: HashMap<String, Vec<String>> = HashMap::new();
        let mut dependents: HashMap<String, Vec<String>> = HashMap::new();
        for step in &steps {
            let deps = step.dependencies();
            for dep in &deps {
                dependents
                    .entry(dep.clone())
                    .or_default()
                    .push(step.id.clone());
            }
            dependencies.insert(step.id.clone(), deps);
        }

        let topo = kahn_order(&steps, &dependencies, &dependents)?;

        Some(Self {
            steps,
            dependencies,
            dependents,
            topo,
        })
    }

    pub fn step(&self, id: &str) -> Option<&StepConfig> {
        self.steps.iter().find(|s| s.id == id)
    }

    pub fn steps(&self) -> &[StepConfig] {
        &self.steps
    }

    /// Step IDs in dependency order.
    pub fn topological_order(&self) -> &[String] {
        &self.topo
    }

    pub fn dependencies_of(&self, id: &str) -> &[String] {
        self.dependencies.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn dependents_of(&self, id: &str) -> &[String] {
        self.dependents.get(id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Every step downstream of `id`, directly or transitively.
    pub fn transitive_dependents(&self, id: &str) -> BTreeSet<String> {
        let mut result = BTreeSet::new();
        let mut queue: VecDeque<&str> = self.dependents_of(id).iter().map(String::as_str).collect();
        while let Some(node) = queue.pop_front() {
            if result.insert(node.to_string()) {
                queue.extend(self.dependents_of(node).iter().map(String::as_str));
            }
        }
        result
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// Kahn's algorithm with declaration-order tie breaking.
fn kahn_order(
    steps: &[StepConfig],
    dependencies: &HashMap<String, Vec<String>>,
    dependents: &HashMap<String, Vec<String>>,
) -> Option<Vec<String>> {
    let declaration_index: HashMap<&str, usize> = steps
        .iter()
        .enumerate()
        .map(|(i, s)| (s.id.as_str(), i))
        .collect();

    let mut pending: HashMap<&str, usize> = steps
        .iter()
        .map(|s| {
            (
                s.id.as_str(),
                dependencies.get(&s.id).map(Vec::len).unwrap_or(0),
            )
        })
        .collect();

    let mut ready: Vec<&str> = pending
        .iter()
        .filter_map(|(id, &count)| (count == 0).then_some(*id))
        .collect();
    ready.sort_by_key(|id| declaration_index[id]);

    let mut order = Vec::with_capacity(steps.len());
    while let Some(next) = ready.first().copied() {
        ready.remove(0);
        order.push(next.to_string());

        if let Some(consumers) = dependents.get(next) {
            for consumer in consumers {
                let count = pending
                    .get_mut(consumer.as_str())
                    .expect("dependent is a declared step");
                *count -= 1;
                if *count == 0 {
                    ready.push(consumer.as_str());
                    ready.sort_by_key(|id| declaration_index[id]);
                }
            }
        }
    }

    (order.len() == steps.len()).then_some(order)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config_from(yaml: &str) -> Config {
        serde_yaml::from_str(yaml).expect("test config parses")
    }

    #[test]
    fn topological_order_respects_dependencies() {
        let config = config_from(
            r#"
steps:
  - id: average
    transform: average
    depends_on: [epochs]
  - id: filter
    transform: bandpass
  - id: epochs
    transform: epochs
    depends_on: [filter]
"#,
        );
        let graph = StepGraph::from_config(&config).expect("acyclic");
        assert_eq!(graph.topological_order(), &["filter", "epochs", "average"]);
    }

    #[test]
    fn declaration_order_breaks_ties() {
        let config = config_from(
            r#"
steps:
  - id: b
    transform: bandpass
  - id: a
    transform: bandpass
"#,
        );
        let graph = StepGraph::from_config(&config).expect("acyclic");
        assert_eq!(graph.topological_order(), &["b", "a"]);
    }

    #[test]
    fn cyclic_config_yields_none() {
        let config = config_from(
            r#"
steps:
  - id: a
    transform: bandpass
    depends_on: [b]
  - id: b
    transform: bandpass
    depends_on: [a]
"#,
        );
        assert!(StepGraph::from_config(&config).is_none());
    }

    #[test]
    fn transitive_dependents_cover_the_whole_branch() {
        let config = config_from(
            r#"
steps:
  - id: filter
    transform: bandpass
  - id: epochs
    transform: epochs
    depends_on: [filter]
  - id: cov
    transform: covariance
    depends_on: [epochs]
  - id: unrelated
    transform: bandpass
"#,
        );
        let graph = StepGraph::from_config(&config).expect("acyclic");
        let downstream = graph.transitive_dependents("filter");
        assert_eq!(
            downstream.into_iter().collect::<Vec<_>>(),
            vec!["cov".to_string(), "epochs".to_string()]
        );
        assert!(graph.transitive_dependents("unrelated").is_empty());
    }
}
