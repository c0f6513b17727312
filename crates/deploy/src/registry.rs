//! Deployment steps and the registry that orders them.

use std::{
    collections::{BTreeSet, HashMap},
    fmt,
    sync::Arc,
};

use futures::future::BoxFuture;

use crate::{
    context::StepContext,
    error::{DeployError, DeployResult},
    record::DeployedContract,
};

/// The work a step performs.
pub trait StepAction: Send + Sync {
    fn execute<'a>(&'a self, ctx: StepContext<'a>) -> BoxFuture<'a, DeployResult<DeployedContract>>;
}

/// A named unit of deployment work.
#[derive(Clone)]
pub struct DeploymentStep {
    name: String,
    tags: BTreeSet<String>,
    dependencies: Vec<String>,
    action: Arc<dyn StepAction>,
}

impl fmt::Debug for DeploymentStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeploymentStep")
            .field("name", &self.name)
            .field("tags", &self.tags)
            .field("dependencies", &self.dependencies)
            .finish_non_exhaustive()
    }
}

impl DeploymentStep {
    pub fn new(name: impl Into<String>, action: impl StepAction + 'static) -> Self {
        Self {
            name: name.into(),
            tags: BTreeSet::new(),
            dependencies: Vec::new(),
            action: Arc::new(action),
        }
    }

    pub fn tags<I, T>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        self.tags.extend(tags.into_iter().map(Into::into));
        self
    }

    /// Names of the records this step reads. The step runs after any registered
    /// step of those names.
    pub fn depends_on<I, T>(mut self, dependencies: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        for dependency in dependencies {
            let dependency = dependency.into();
            if !self.dependencies.contains(&dependency) {
                self.dependencies.push(dependency);
            }
        }
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn tag_set(&self) -> &BTreeSet<String> {
        &self.tags
    }

    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Whether this step is selected by `tags`.
    pub fn matches_tags(&self, tags: &BTreeSet<String>) -> bool {
        !self.tags.is_disjoint(tags)
    }

    pub(crate) fn action(&self) -> &dyn StepAction {
        self.action.as_ref()
    }
}

/// Registered steps, in registration order.
#[derive(Debug, Clone, Default)]
pub struct StepRegistry {
    steps: Vec<DeploymentStep>,
}

impl StepRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a step. Fails without modifying the registry if the name is taken.
    pub fn register(&mut self, step: DeploymentStep) -> DeployResult<()> {
        if self.get(step.name()).is_some() {
            return Err(DeployError::DuplicateName {
                name: step.name().to_string(),
            });
        }

        tracing::trace!(step = step.name(), tags = ?step.tags, dependencies = ?step.dependencies, "Registered deployment step");
        self.steps.push(step);
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&DeploymentStep> {
        self.steps.iter().find(|step| step.name() == name)
    }

    pub fn steps(&self) -> &[DeploymentStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Steps sorted so that every step comes after the registered steps it
    /// depends on. Independent steps keep their registration order.
    ///
    /// Dependencies on names that are not registered impose no ordering.
    pub fn execution_order(&self) -> DeployResult<Vec<&DeploymentStep>> {
        let index: HashMap<&str, usize> = self
            .steps
            .iter()
            .enumerate()
            .map(|(i, step)| (step.name(), i))
            .collect();

        let mut pending: Vec<usize> = self
            .steps
            .iter()
            .map(|step| {
                step.dependencies()
                    .iter()
                    .filter(|dep| index.contains_key(dep.as_str()))
                    .count()
            })
            .collect();

        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); self.steps.len()];
        for (i, step) in self.steps.iter().enumerate() {
            for dep in step.dependencies() {
                if let Some(&j) = index.get(dep.as_str()) {
                    dependents[j].push(i);
                }
            }
        }

        // Always pick the earliest-registered ready step.
        let mut ready: BTreeSet<usize> = (0..self.steps.len()).filter(|&i| pending[i] == 0).collect();
        let mut order = Vec::with_capacity(self.steps.len());

        while let Some(i) = ready.pop_first() {
            order.push(&self.steps[i]);
            for &j in &dependents[i] {
                pending[j] -= 1;
                if pending[j] == 0 {
                    ready.insert(j);
                }
            }
        }

        if order.len() < self.steps.len() {
            return Err(DeployError::CyclicDependency {
                steps: self.find_cycle(&index, &pending),
            });
        }

        Ok(order)
    }

    /// Walk unresolved dependencies from a blocked step until a name repeats.
    fn find_cycle(&self, index: &HashMap<&str, usize>, pending: &[usize]) -> Vec<String> {
        let Some(start) = pending.iter().position(|&count| count > 0) else {
            return Vec::new();
        };

        let mut path = vec![start];
        let mut current = start;
        loop {
            let next = self.steps[current]
                .dependencies()
                .iter()
                .filter_map(|dep| index.get(dep.as_str()).copied())
                .find(|&j| pending[j] > 0);

            let Some(next) = next else {
                break;
            };

            if let Some(pos) = path.iter().position(|&i| i == next) {
                let mut cycle: Vec<String> = path[pos..]
                    .iter()
                    .map(|&i| self.steps[i].name().to_string())
                    .collect();
                cycle.push(self.steps[next].name().to_string());
                return cycle;
            }

            path.push(next);
            current = next;
        }

        path.iter()
            .map(|&i| self.steps[i].name().to_string())
            .collect()
    }
}
