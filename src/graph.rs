//! Resource graph with explicit handles and reference validation
//!
//! Declaring a resource returns a [`LogicalId`] handle; later declarations
//! reference earlier ones only through handles they were explicitly given.
//! There is no ambient parent/child registration: the graph owns ordering and
//! the builder threads handles as arguments.
//!
//! The graph is strictly ordered. A declaration may only depend on or
//! reference resources declared before it, which makes the dependency graph
//! acyclic by construction and keeps declaration order a valid topological
//! order. Violations fail fast at declaration time; [`ResourceGraph::validate`]
//! re-checks the whole graph before synthesis.

use indexmap::IndexMap;
use serde_json::Value;

/// Handle to a declared resource or parameter
///
/// Only obtainable from the graph that declared it, so holding one proves the
/// target exists.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct LogicalId(String);

impl LogicalId {
    /// The logical name of the resource in the template
    pub fn name(&self) -> &str {
        &self.0
    }

    /// Late-bound reference token, resolved by the deployment engine
    ///
    /// Serializes as `{"Ref": "<id>"}`.
    pub fn reference(&self) -> Value {
        serde_json::json!({ "Ref": self.0 })
    }

    /// Late-bound attribute token, resolved by the deployment engine
    ///
    /// Serializes as `{"Fn::GetAtt": ["<id>", "<attr>"]}`.
    pub fn get_att(&self, attr: &str) -> Value {
        serde_json::json!({ "Fn::GetAtt": [self.0, attr] })
    }
}

impl std::fmt::Display for LogicalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A declared resource: logical id, provider type, properties, and explicit
/// dependencies
#[derive(Clone, Debug, PartialEq)]
pub struct ResourceNode {
    /// Logical id within the template
    pub id: LogicalId,
    /// Provider resource type, e.g. `AWS::EC2::VPC`
    pub kind: String,
    /// Resource properties, possibly containing late-bound references
    pub properties: Value,
    /// Resources that must exist before this one
    pub depends_on: Vec<LogicalId>,
}

/// A template parameter, standing in for a value resolved outside the stack
/// (lookups, deploy-time inputs)
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ParameterDecl {
    /// Parameter type, e.g. `String`
    pub type_: String,
    /// Human-readable description
    pub description: Option<String>,
}

/// A named value exported for cross-stack consumption
#[derive(Clone, Debug, PartialEq)]
pub struct OutputDecl {
    /// Human-readable description
    pub description: Option<String>,
    /// Output value, possibly a late-bound reference
    pub value: Value,
    /// Export name for cross-stack imports
    pub export_name: Option<String>,
}

/// Insertion-ordered collection of parameters, resources, and outputs
#[derive(Clone, Debug, Default)]
pub struct ResourceGraph {
    parameters: IndexMap<String, ParameterDecl>,
    resources: IndexMap<String, ResourceNode>,
    outputs: IndexMap<String, OutputDecl>,
}

impl ResourceGraph {
    /// Create an empty graph
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a template parameter and return its handle
    pub fn parameter(
        &mut self,
        name: &str,
        type_: &str,
        description: Option<&str>,
    ) -> crate::Result<LogicalId> {
        if self.parameters.contains_key(name) || self.resources.contains_key(name) {
            return Err(crate::Error::synthesis(format!("duplicate logical id '{name}'")));
        }
        self.parameters.insert(
            name.to_string(),
            ParameterDecl {
                type_: type_.to_string(),
                description: description.map(str::to_string),
            },
        );
        Ok(LogicalId(name.to_string()))
    }

    /// Declare a resource and return its handle
    ///
    /// Fails fast on duplicate ids and on references to anything not yet
    /// declared.
    pub fn declare(&mut self, id: &str, kind: &str, properties: Value) -> crate::Result<LogicalId> {
        self.declare_with_deps(id, kind, properties, &[])
    }

    /// Declare a resource with explicit dependencies and return its handle
    pub fn declare_with_deps(
        &mut self,
        id: &str,
        kind: &str,
        properties: Value,
        depends_on: &[&LogicalId],
    ) -> crate::Result<LogicalId> {
        if id.trim().is_empty() {
            return Err(crate::Error::synthesis("logical id must not be empty"));
        }
        if self.resources.contains_key(id) || self.parameters.contains_key(id) {
            return Err(crate::Error::synthesis(format!("duplicate logical id '{id}'")));
        }
        for dep in depends_on {
            if !self.resources.contains_key(dep.name()) {
                return Err(crate::Error::reference(format!(
                    "'{id}' depends on undeclared resource '{dep}'"
                )));
            }
        }
        self.check_references(id, &properties)?;

        self.resources.insert(
            id.to_string(),
            ResourceNode {
                id: LogicalId(id.to_string()),
                kind: kind.to_string(),
                properties,
                depends_on: depends_on.iter().map(|d| (*d).clone()).collect(),
            },
        );
        Ok(LogicalId(id.to_string()))
    }

    /// Declare an exported output
    pub fn output(
        &mut self,
        name: &str,
        description: Option<&str>,
        value: Value,
        export_name: Option<&str>,
    ) -> crate::Result<()> {
        if self.outputs.contains_key(name) {
            return Err(crate::Error::synthesis(format!("duplicate output '{name}'")));
        }
        self.check_references(name, &value)?;
        self.outputs.insert(
            name.to_string(),
            OutputDecl {
                description: description.map(str::to_string),
                value,
                export_name: export_name.map(str::to_string),
            },
        );
        Ok(())
    }

    /// Whether a resource or parameter with this logical id exists
    pub fn contains(&self, id: &str) -> bool {
        self.resources.contains_key(id) || self.parameters.contains_key(id)
    }

    /// Look up a declared resource by logical id
    pub fn get(&self, id: &str) -> Option<&ResourceNode> {
        self.resources.get(id)
    }

    /// Number of declared resources
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether no resources have been declared
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Declared resources, in declaration order
    pub fn resources(&self) -> impl Iterator<Item = &ResourceNode> {
        self.resources.values()
    }

    /// Resources of one provider type, in declaration order
    pub fn resources_of_kind<'a>(&'a self, kind: &'a str) -> impl Iterator<Item = &'a ResourceNode> {
        self.resources.values().filter(move |r| r.kind == kind)
    }

    /// Declared parameters, in declaration order
    pub fn parameters(&self) -> impl Iterator<Item = (&String, &ParameterDecl)> {
        self.parameters.iter()
    }

    /// Declared outputs, in declaration order
    pub fn outputs(&self) -> impl Iterator<Item = (&String, &OutputDecl)> {
        self.outputs.iter()
    }

    /// Re-validate the whole graph
    ///
    /// Declaration already enforces ordering, so this is a consistency check
    /// run once more before synthesis: every `DependsOn` and every embedded
    /// reference must name a declared resource or parameter.
    pub fn validate(&self) -> crate::Result<()> {
        for node in self.resources.values() {
            for dep in &node.depends_on {
                if !self.resources.contains_key(dep.name()) {
                    return Err(crate::Error::reference(format!(
                        "'{}' depends on undeclared resource '{dep}'",
                        node.id
                    )));
                }
            }
            for target in collect_references(&node.properties) {
                if !self.is_resolvable(&target) {
                    return Err(crate::Error::reference(format!(
                        "'{}' references undeclared resource '{target}'",
                        node.id
                    )));
                }
            }
        }
        for (name, output) in &self.outputs {
            for target in collect_references(&output.value) {
                if !self.is_resolvable(&target) {
                    return Err(crate::Error::reference(format!(
                        "output '{name}' references undeclared resource '{target}'"
                    )));
                }
            }
        }
        Ok(())
    }

    /// Reject properties that reference anything not declared yet
    fn check_references(&self, id: &str, value: &Value) -> crate::Result<()> {
        for target in collect_references(value) {
            if !self.is_resolvable(&target) {
                return Err(crate::Error::reference(format!(
                    "'{id}' references undeclared resource '{target}'"
                )));
            }
        }
        Ok(())
    }

    /// Pseudo parameters like `AWS::Region` resolve on the provider side
    fn is_resolvable(&self, target: &str) -> bool {
        target.starts_with("AWS::") || self.contains(target)
    }
}

/// Collect the logical ids named by `Ref` and `Fn::GetAtt` tokens anywhere in
/// a property tree
fn collect_references(value: &Value) -> Vec<String> {
    let mut targets = Vec::new();
    collect_into(value, &mut targets);
    targets
}

fn collect_into(value: &Value, targets: &mut Vec<String>) {
    match value {
        Value::Object(map) => {
            if map.len() == 1 {
                if let Some(Value::String(target)) = map.get("Ref") {
                    targets.push(target.clone());
                    return;
                }
                if let Some(att) = map.get("Fn::GetAtt") {
                    match att {
                        Value::Array(parts) => {
                            if let Some(Value::String(target)) = parts.first() {
                                targets.push(target.clone());
                            }
                        }
                        Value::String(dotted) => {
                            if let Some((target, _)) = dotted.split_once('.') {
                                targets.push(target.to_string());
                            }
                        }
                        _ => {}
                    }
                    return;
                }
            }
            for nested in map.values() {
                collect_into(nested, targets);
            }
        }
        Value::Array(items) => {
            for item in items {
                collect_into(item, targets);
            }
        }
        _ => {}
    }
}
