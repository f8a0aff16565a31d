//! Condition dependency graph.
//!
//! Every condition a field declares is an edge from the field it tests to
//! the field that declares it. The graph is built once per schema, must be
//! acyclic, and tells the engine which fields need re-resolution after a
//! value changes.

use crate::{error::Result, Error, FieldName, FormSchema};
use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// Edges `source -> dependents` derived from field conditions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DependencyGraph {
    dependents: BTreeMap<FieldName, BTreeSet<FieldName>>,
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    Visiting,
    Done,
}

impl DependencyGraph {
    /// Build the graph for a schema, rejecting condition cycles.
    ///
    /// A field whose condition references itself is a cycle of length one.
    pub fn build(schema: &FormSchema) -> Result<Self> {
        let mut dependents: BTreeMap<FieldName, BTreeSet<FieldName>> = BTreeMap::new();

        for field in schema.leaf_fields() {
            for condition in field.conditions() {
                dependents
                    .entry(condition.field.clone())
                    .or_default()
                    .insert(field.name.clone());
            }
        }

        let graph = Self { dependents };
        graph.detect_cycle()?;
        Ok(graph)
    }

    fn detect_cycle(&self) -> Result<()> {
        let mut marks: BTreeMap<&str, Mark> = BTreeMap::new();
        let mut path: Vec<&str> = Vec::new();

        for source in self.dependents.keys() {
            if !marks.contains_key(source.as_str()) {
                self.visit(source, &mut marks, &mut path)?;
            }
        }

        Ok(())
    }

    fn visit<'a>(
        &'a self,
        node: &'a str,
        marks: &mut BTreeMap<&'a str, Mark>,
        path: &mut Vec<&'a str>,
    ) -> Result<()> {
        marks.insert(node, Mark::Visiting);
        path.push(node);

        for next in self.direct_dependents(node) {
            match marks.get(next) {
                Some(Mark::Visiting) => {
                    let start = path.iter().position(|n| *n == next).unwrap_or(0);
                    let mut cycle: Vec<FieldName> =
                        path[start..].iter().map(|n| n.to_string()).collect();
                    cycle.push(next.to_string());
                    return Err(Error::ConditionCycle(cycle));
                }
                Some(Mark::Done) => {}
                None => self.visit(next, marks, path)?,
            }
        }

        path.pop();
        marks.insert(node, Mark::Done);
        Ok(())
    }

    /// Fields whose conditions test `name` directly.
    pub fn direct_dependents(&self, name: &str) -> impl Iterator<Item = &str> {
        self.dependents
            .get(name)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// All fields whose resolved state may change when `name` changes,
    /// in breadth-first order. Does not include `name` itself.
    pub fn dependents_of(&self, name: &str) -> Vec<FieldName> {
        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let mut order = Vec::new();
        let mut queue: VecDeque<&str> = self.direct_dependents(name).collect();

        while let Some(next) = queue.pop_front() {
            if !seen.insert(next) {
                continue;
            }
            order.push(next.to_string());
            queue.extend(self.direct_dependents(next));
        }

        order
    }

    /// Whether any condition in the schema tests `name`.
    pub fn is_source(&self, name: &str) -> bool {
        self.dependents.contains_key(name)
    }

    /// Number of distinct condition edges.
    pub fn edge_count(&self) -> usize {
        self.dependents.values().map(BTreeSet::len).sum()
    }
}
