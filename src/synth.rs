//! Template synthesis
//!
//! Turns a validated [`StackDefinition`](crate::stack::StackDefinition) into
//! a deployable template document. Synthesis is a pure function of the
//! definition: same stack in, byte-identical template out. Resources,
//! parameters, and outputs keep their declaration order.

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::info;

use crate::graph::ResourceGraph;
use crate::stack::StackDefinition;

/// Template document format version emitted by the synthesizer
const TEMPLATE_FORMAT_VERSION: &str = "2010-09-09";

/// Output serialization format
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Pretty-printed JSON
    #[default]
    Json,
    /// YAML
    Yaml,
}

impl std::str::FromStr for OutputFormat {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "yaml" | "yml" => Ok(Self::Yaml),
            other => Err(crate::Error::config(format!(
                "unknown output format: {other}, expected json or yaml"
            ))),
        }
    }
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json => write!(f, "json"),
            Self::Yaml => write!(f, "yaml"),
        }
    }
}

/// A rendered parameter entry
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateParameter {
    /// Parameter type
    #[serde(rename = "Type")]
    pub type_: String,
    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A rendered resource entry
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateResource {
    /// Provider resource type
    #[serde(rename = "Type")]
    pub type_: String,
    /// Resource properties with late-bound tokens left in place
    pub properties: Value,
    /// Explicit dependencies, omitted when empty
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub depends_on: Vec<String>,
}

/// A rendered output entry
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct TemplateOutput {
    /// Human-readable description
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Output value
    pub value: Value,
    /// Cross-stack export, omitted when the output is not exported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub export: Option<Value>,
}

/// The deployable template document
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct Template {
    /// Template format version
    #[serde(rename = "AWSTemplateFormatVersion")]
    pub format_version: String,
    /// Stack description, carrying the name and target environment
    pub description: String,
    /// Deploy-time inputs
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub parameters: IndexMap<String, TemplateParameter>,
    /// Declared resources, in declaration order
    pub resources: IndexMap<String, TemplateResource>,
    /// Exported outputs, omitted when none are declared
    #[serde(skip_serializing_if = "IndexMap::is_empty")]
    pub outputs: IndexMap<String, TemplateOutput>,
}

impl Template {
    /// Serialize the template in the requested format
    pub fn render(&self, format: OutputFormat) -> crate::Result<String> {
        match format {
            OutputFormat::Json => serde_json::to_string_pretty(self)
                .map_err(|e| crate::Error::serialization(e.to_string())),
            OutputFormat::Yaml => serde_yaml::to_string(self)
                .map_err(|e| crate::Error::serialization(e.to_string())),
        }
    }
}

/// Synthesize a stack definition into a [`Template`]
///
/// The graph is re-validated first; a graph with a dangling reference never
/// reaches rendering.
pub fn synthesize(stack: &StackDefinition) -> crate::Result<Template> {
    let graph = stack.graph();
    graph.validate()?;

    let template = Template {
        format_version: TEMPLATE_FORMAT_VERSION.to_string(),
        description: format!("{} ({})", stack.name(), stack.environment()),
        parameters: render_parameters(graph),
        resources: render_resources(graph),
        outputs: render_outputs(graph),
    };
    info!(
        stack = %stack.name(),
        resources = template.resources.len(),
        outputs = template.outputs.len(),
        "synthesized template"
    );
    Ok(template)
}

fn render_parameters(graph: &ResourceGraph) -> IndexMap<String, TemplateParameter> {
    graph
        .parameters()
        .map(|(name, decl)| {
            (
                name.clone(),
                TemplateParameter {
                    type_: decl.type_.clone(),
                    description: decl.description.clone(),
                },
            )
        })
        .collect()
}

fn render_resources(graph: &ResourceGraph) -> IndexMap<String, TemplateResource> {
    graph
        .resources()
        .map(|node| {
            (
                node.id.name().to_string(),
                TemplateResource {
                    type_: node.kind.clone(),
                    properties: node.properties.clone(),
                    depends_on: node.depends_on.iter().map(|d| d.name().to_string()).collect(),
                },
            )
        })
        .collect()
}

fn render_outputs(graph: &ResourceGraph) -> IndexMap<String, TemplateOutput> {
    graph
        .outputs()
        .map(|(name, decl)| {
            (
                name.clone(),
                TemplateOutput {
                    description: decl.description.clone(),
                    value: decl.value.clone(),
                    export: decl
                        .export_name
                        .as_ref()
                        .map(|export| json!({ "Name": export })),
                },
            )
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, StackConfig};

    fn stack(config: StackConfig) -> StackDefinition {
        StackDefinition::new("demo", Environment::new("310181001400", "us-west-2"), config)
            .unwrap()
    }

    // =========================================================================
    // Story: Synthesis Is a Pure Function of the Definition
    // =========================================================================

    /// Story: The same stack renders byte-identical templates
    #[test]
    fn story_synthesis_is_deterministic() {
        let a = synthesize(&stack(StackConfig::service_discovery())).unwrap();
        let b = synthesize(&stack(StackConfig::service_discovery())).unwrap();
        assert_eq!(
            a.render(OutputFormat::Json).unwrap(),
            b.render(OutputFormat::Json).unwrap()
        );
        assert_eq!(
            a.render(OutputFormat::Yaml).unwrap(),
            b.render(OutputFormat::Yaml).unwrap()
        );
    }

    /// Story: Declaration order survives into the template
    ///
    /// The first resource is always the VPC; listing order is the topological
    /// order the builder declared.
    #[test]
    fn story_declaration_order_is_preserved() {
        let template = synthesize(&stack(StackConfig::baseline())).unwrap();
        let first = template.resources.keys().next().unwrap();
        assert_eq!(first, "Vpc");

        let keys: Vec<&String> = template.resources.keys().collect();
        let vpc_pos = keys.iter().position(|k| *k == "Vpc").unwrap();
        let service_pos = keys.iter().position(|k| *k == "Service").unwrap();
        assert!(vpc_pos < service_pos);
    }

    /// Story: Late-bound tokens are rendered verbatim, never resolved
    ///
    /// Resolution is the deployment engine's job; the synthesizer ships the
    /// tokens as data.
    #[test]
    fn story_tokens_survive_rendering() {
        let template = synthesize(&stack(StackConfig::with_tls())).unwrap();
        let rendered = template.render(OutputFormat::Json).unwrap();
        assert!(rendered.contains("\"Ref\": \"Vpc\""));
        assert!(rendered.contains("Fn::GetAtt"));
    }

    // =========================================================================
    // Template Shape
    // =========================================================================

    #[test]
    fn test_format_version_and_description() {
        let template = synthesize(&stack(StackConfig::baseline())).unwrap();
        assert_eq!(template.format_version, "2010-09-09");
        assert_eq!(template.description, "demo (310181001400/us-west-2)");
    }

    #[test]
    fn test_baseline_has_no_parameters_or_outputs() {
        let template = synthesize(&stack(StackConfig::baseline())).unwrap();
        assert!(template.parameters.is_empty());
        assert!(template.outputs.is_empty());

        // Empty sections are omitted entirely from the document
        let rendered = template.render(OutputFormat::Json).unwrap();
        assert!(!rendered.contains("\"Parameters\""));
        assert!(!rendered.contains("\"Outputs\""));
    }

    #[test]
    fn test_tls_template_carries_the_zone_parameter() {
        let template = synthesize(&stack(StackConfig::with_tls())).unwrap();
        let param = template.parameters.get("HostedZoneId").unwrap();
        assert_eq!(param.type_, "String");
    }

    #[test]
    fn test_outputs_render_exports() {
        let template = synthesize(&stack(StackConfig::service_discovery())).unwrap();
        let output = template.outputs.get("ECSClusterName").unwrap();
        assert_eq!(output.value, serde_json::json!({ "Ref": "Cluster" }));
        assert_eq!(
            output.export,
            Some(serde_json::json!({ "Name": "demo-ECSClusterName" }))
        );
    }

    #[test]
    fn test_depends_on_rendered_only_when_present() {
        let template = synthesize(&stack(StackConfig::baseline())).unwrap();
        let service = template.resources.get("Service").unwrap();
        assert_eq!(service.depends_on, vec!["HttpListener"]);

        let vpc = template.resources.get("Vpc").unwrap();
        assert!(vpc.depends_on.is_empty());
        let rendered = template.render(OutputFormat::Json).unwrap();
        // The VPC entry must not carry an empty DependsOn list
        let parsed: serde_json::Value = serde_json::from_str(&rendered).unwrap();
        assert!(parsed["Resources"]["Vpc"].get("DependsOn").is_none());
    }

    #[test]
    fn test_output_format_parsing() {
        assert_eq!("json".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("yaml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert_eq!("yml".parse::<OutputFormat>().unwrap(), OutputFormat::Yaml);
        assert!("toml".parse::<OutputFormat>().is_err());
    }
}
