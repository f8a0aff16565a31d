//! Schema definition.
//!
//! A form schema is a tree of field, group and repeater nodes. Leaf fields
//! carry validation rules and conditions; containers are purely structural.
//! Remote collaborators (option loaders, async validators) are attached with
//! builder methods and are never serialized.

use crate::{
    error::Result, graph::DependencyGraph, Condition, Error, FieldName, Primitive, SchemaVersion,
    SelectOption,
};
use crate::remote::{AsyncValidator, OptionsLoader};
use regex::Regex;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Debounce applied to async validation when a field does not set one.
pub const DEFAULT_DEBOUNCE_MS: u64 = 300;

/// Leaf field types.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FieldType {
    #[default]
    Text,
    Number,
    Checkbox,
    Select,
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldType::Text => write!(f, "text"),
            FieldType::Number => write!(f, "number"),
            FieldType::Checkbox => write!(f, "checkbox"),
            FieldType::Select => write!(f, "select"),
        }
    }
}

/// A compiled regular expression, serialized as its source.
#[derive(Clone)]
pub struct Pattern(Regex);

impl Pattern {
    pub fn new(source: &str) -> std::result::Result<Self, regex::Error> {
        Regex::new(source).map(Pattern)
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    /// Unanchored match: the pattern may occur anywhere in the input.
    pub fn is_match(&self, input: &str) -> bool {
        self.0.is_match(input)
    }
}

impl fmt::Debug for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Pattern").field(&self.as_str()).finish()
    }
}

impl PartialEq for Pattern {
    fn eq(&self, other: &Self) -> bool {
        self.as_str() == other.as_str()
    }
}

impl Serialize for Pattern {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Pattern {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let source = String::deserialize(deserializer)?;
        Pattern::new(&source).map_err(serde::de::Error::custom)
    }
}

/// Declared validation rules. Every rule is optional and applies only to
/// values of the matching runtime type.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationRules {
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_length: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<Pattern>,
}

impl ValidationRules {
    pub fn is_empty(&self) -> bool {
        *self == ValidationRules::default()
    }
}

/// Remote option source for a select field.
///
/// The cache `key` is shared across all fields using it.
#[derive(Clone, Serialize, Deserialize)]
pub struct AsyncOptions {
    pub key: String,
    #[serde(skip)]
    pub loader: Option<Arc<dyn OptionsLoader>>,
}

impl AsyncOptions {
    pub fn new(key: impl Into<String>, loader: Arc<dyn OptionsLoader>) -> Self {
        Self {
            key: key.into(),
            loader: Some(loader),
        }
    }
}

impl fmt::Debug for AsyncOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncOptions")
            .field("key", &self.key)
            .field("loader", &self.loader.as_ref().map(|_| "<loader>"))
            .finish()
    }
}

impl PartialEq for AsyncOptions {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key && same_handle(&self.loader, &other.loader)
    }
}

/// Remote validation for a text field.
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AsyncValidation {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub debounce_ms: Option<u64>,
    #[serde(skip)]
    pub validator: Option<Arc<dyn AsyncValidator>>,
}

impl AsyncValidation {
    pub fn new(validator: Arc<dyn AsyncValidator>) -> Self {
        Self {
            debounce_ms: None,
            validator: Some(validator),
        }
    }

    pub fn with_debounce_ms(mut self, debounce_ms: u64) -> Self {
        self.debounce_ms = Some(debounce_ms);
        self
    }

    /// Effective debounce, falling back to `default_ms` when unset.
    pub fn debounce(&self, default_ms: u64) -> Duration {
        Duration::from_millis(self.debounce_ms.unwrap_or(default_ms))
    }
}

impl fmt::Debug for AsyncValidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncValidation")
            .field("debounce_ms", &self.debounce_ms)
            .field("validator", &self.validator.as_ref().map(|_| "<validator>"))
            .finish()
    }
}

impl PartialEq for AsyncValidation {
    fn eq(&self, other: &Self) -> bool {
        self.debounce_ms == other.debounce_ms && same_handle(&self.validator, &other.validator)
    }
}

fn same_handle<T: ?Sized>(a: &Option<Arc<T>>, b: &Option<Arc<T>>) -> bool {
    match (a, b) {
        (Some(a), Some(b)) => std::ptr::eq(Arc::as_ptr(a) as *const (), Arc::as_ptr(b) as *const ()),
        (None, None) => true,
        _ => false,
    }
}

/// A leaf field.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldNode {
    /// Carried by the node's `type` tag on the wire
    #[serde(skip)]
    pub field_type: FieldType,
    /// Value-map key, unique across the schema
    pub name: FieldName,
    pub label: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<Primitive>,
    #[serde(default, skip_serializing_if = "ValidationRules::is_empty")]
    pub validation: ValidationRules,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visible_when: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enabled_when: Option<Condition>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_when: Option<Condition>,
    /// Text only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub placeholder: Option<String>,
    /// Number only
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,
    /// Select only: static options, used when no async source is attached
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<SelectOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub async_options: Option<AsyncOptions>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub async_validation: Option<AsyncValidation>,
}

impl FieldNode {
    /// Create a field of the given type with no rules or conditions.
    pub fn new(field_type: FieldType, name: impl Into<FieldName>, label: impl Into<String>) -> Self {
        Self {
            field_type,
            name: name.into(),
            label: label.into(),
            description: None,
            default_value: None,
            validation: ValidationRules::default(),
            visible_when: None,
            enabled_when: None,
            required_when: None,
            placeholder: None,
            step: None,
            options: Vec::new(),
            async_options: None,
            async_validation: None,
        }
    }

    pub fn text(name: impl Into<FieldName>, label: impl Into<String>) -> Self {
        Self::new(FieldType::Text, name, label)
    }

    pub fn number(name: impl Into<FieldName>, label: impl Into<String>) -> Self {
        Self::new(FieldType::Number, name, label)
    }

    pub fn checkbox(name: impl Into<FieldName>, label: impl Into<String>) -> Self {
        Self::new(FieldType::Checkbox, name, label)
    }

    pub fn select(name: impl Into<FieldName>, label: impl Into<String>) -> Self {
        Self::new(FieldType::Select, name, label)
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<Primitive>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_validation(mut self, rules: ValidationRules) -> Self {
        self.validation = rules;
        self
    }

    pub fn required(mut self) -> Self {
        self.validation.required = true;
        self
    }

    pub fn with_min_length(mut self, min: usize) -> Self {
        self.validation.min_length = Some(min);
        self
    }

    pub fn with_max_length(mut self, max: usize) -> Self {
        self.validation.max_length = Some(max);
        self
    }

    pub fn with_min(mut self, min: f64) -> Self {
        self.validation.min = Some(min);
        self
    }

    pub fn with_max(mut self, max: f64) -> Self {
        self.validation.max = Some(max);
        self
    }

    /// Attach a pattern rule. Fails if the source is not a valid regex.
    pub fn with_pattern(mut self, source: &str) -> Result<Self> {
        let pattern = Pattern::new(source).map_err(|e| Error::InvalidPattern {
            field: self.name.clone(),
            reason: e.to_string(),
        })?;
        self.validation.pattern = Some(pattern);
        Ok(self)
    }

    pub fn visible_when(mut self, condition: Condition) -> Self {
        self.visible_when = Some(condition);
        self
    }

    pub fn enabled_when(mut self, condition: Condition) -> Self {
        self.enabled_when = Some(condition);
        self
    }

    pub fn required_when(mut self, condition: Condition) -> Self {
        self.required_when = Some(condition);
        self
    }

    pub fn with_placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    pub fn with_step(mut self, step: f64) -> Self {
        self.step = Some(step);
        self
    }

    pub fn with_options(mut self, options: Vec<SelectOption>) -> Self {
        self.options = options;
        self
    }

    pub fn with_async_options(
        mut self,
        key: impl Into<String>,
        loader: impl OptionsLoader + 'static,
    ) -> Self {
        self.async_options = Some(AsyncOptions::new(key, Arc::new(loader)));
        self
    }

    /// Attach a loader to an async option source declared without one
    /// (e.g. after deserializing the schema).
    pub fn with_loader(mut self, loader: impl OptionsLoader + 'static) -> Self {
        if let Some(source) = self.async_options.as_mut() {
            source.loader = Some(Arc::new(loader));
        }
        self
    }

    pub fn with_async_validation(
        mut self,
        validator: impl AsyncValidator + 'static,
        debounce_ms: Option<u64>,
    ) -> Self {
        self.async_validation = Some(AsyncValidation {
            debounce_ms,
            validator: Some(Arc::new(validator)),
        });
        self
    }

    /// Attach a validator, keeping any debounce already declared.
    pub fn with_validator(mut self, validator: impl AsyncValidator + 'static) -> Self {
        let debounce_ms = self.async_validation.as_ref().and_then(|v| v.debounce_ms);
        self.async_validation = Some(AsyncValidation {
            debounce_ms,
            validator: Some(Arc::new(validator)),
        });
        self
    }

    /// Conditions declared on this field, in resolution order.
    pub fn conditions(&self) -> impl Iterator<Item = &Condition> {
        [&self.visible_when, &self.enabled_when, &self.required_when]
            .into_iter()
            .flatten()
    }

    /// Initial value: the declared default, or `null`.
    pub fn initial_value(&self) -> Primitive {
        self.default_value.clone().unwrap_or_default()
    }
}

/// A structural container. Holds no value of its own.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GroupNode {
    pub name: FieldName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    pub fields: Vec<SchemaNode>,
}

impl GroupNode {
    pub fn new(name: impl Into<FieldName>, fields: Vec<SchemaNode>) -> Self {
        Self {
            name: name.into(),
            label: None,
            fields,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }
}

/// A container whose value is an ordered list of rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepeaterNode {
    pub name: FieldName,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_items: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_items: Option<usize>,
    pub fields: Vec<SchemaNode>,
}

impl RepeaterNode {
    pub fn new(name: impl Into<FieldName>, fields: Vec<SchemaNode>) -> Self {
        Self {
            name: name.into(),
            label: None,
            min_items: None,
            max_items: None,
            fields,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_bounds(mut self, min_items: Option<usize>, max_items: Option<usize>) -> Self {
        self.min_items = min_items;
        self.max_items = max_items;
        self
    }
}

/// A node in the schema tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "NodeRepr", into = "NodeRepr")]
pub enum SchemaNode {
    Field(FieldNode),
    Group(GroupNode),
    Repeater(RepeaterNode),
}

impl SchemaNode {
    pub fn name(&self) -> &str {
        match self {
            SchemaNode::Field(f) => &f.name,
            SchemaNode::Group(g) => &g.name,
            SchemaNode::Repeater(r) => &r.name,
        }
    }

    /// Child nodes of a container; empty for leaf fields.
    pub fn children(&self) -> &[SchemaNode] {
        match self {
            SchemaNode::Field(_) => &[],
            SchemaNode::Group(g) => &g.fields,
            SchemaNode::Repeater(r) => &r.fields,
        }
    }
}

impl From<FieldNode> for SchemaNode {
    fn from(field: FieldNode) -> Self {
        SchemaNode::Field(field)
    }
}

impl From<GroupNode> for SchemaNode {
    fn from(group: GroupNode) -> Self {
        SchemaNode::Group(group)
    }
}

impl From<RepeaterNode> for SchemaNode {
    fn from(repeater: RepeaterNode) -> Self {
        SchemaNode::Repeater(repeater)
    }
}

/// Wire shape: a single `type` tag covers both leaf types and containers.
#[derive(Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
enum NodeRepr {
    Text(FieldNode),
    Number(FieldNode),
    Checkbox(FieldNode),
    Select(FieldNode),
    Group(GroupNode),
    Repeater(RepeaterNode),
}

impl From<NodeRepr> for SchemaNode {
    fn from(repr: NodeRepr) -> Self {
        let (field_type, mut field) = match repr {
            NodeRepr::Group(g) => return SchemaNode::Group(g),
            NodeRepr::Repeater(r) => return SchemaNode::Repeater(r),
            NodeRepr::Text(f) => (FieldType::Text, f),
            NodeRepr::Number(f) => (FieldType::Number, f),
            NodeRepr::Checkbox(f) => (FieldType::Checkbox, f),
            NodeRepr::Select(f) => (FieldType::Select, f),
        };
        field.field_type = field_type;
        SchemaNode::Field(field)
    }
}

impl From<SchemaNode> for NodeRepr {
    fn from(node: SchemaNode) -> Self {
        match node {
            SchemaNode::Group(g) => NodeRepr::Group(g),
            SchemaNode::Repeater(r) => NodeRepr::Repeater(r),
            SchemaNode::Field(f) => match f.field_type {
                FieldType::Text => NodeRepr::Text(f),
                FieldType::Number => NodeRepr::Number(f),
                FieldType::Checkbox => NodeRepr::Checkbox(f),
                FieldType::Select => NodeRepr::Select(f),
            },
        }
    }
}

/// The complete schema for one form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormSchema {
    /// Compatibility token for persisted drafts
    pub version: SchemaVersion,
    pub fields: Vec<SchemaNode>,
}

impl FormSchema {
    /// Create an empty schema.
    pub fn new(version: SchemaVersion) -> Self {
        Self {
            version,
            fields: Vec::new(),
        }
    }

    /// Append a top-level node.
    pub fn add_node(&mut self, node: impl Into<SchemaNode>) -> &mut Self {
        self.fields.push(node.into());
        self
    }

    /// Builder-style method to append a top-level node.
    pub fn with_node(mut self, node: impl Into<SchemaNode>) -> Self {
        self.add_node(node);
        self
    }

    /// Parse and check a schema from JSON. Callables must be attached
    /// afterwards.
    pub fn from_json(json: &str) -> Result<Self> {
        let schema: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidSchema(e.to_string()))?;
        schema.check()?;
        Ok(schema)
    }

    /// Leaf fields in depth-first document order, including repeater
    /// children.
    pub fn leaf_fields(&self) -> Vec<&FieldNode> {
        fn walk<'a>(nodes: &'a [SchemaNode], out: &mut Vec<&'a FieldNode>) {
            for node in nodes {
                match node {
                    SchemaNode::Field(f) => out.push(f),
                    other => walk(other.children(), out),
                }
            }
        }

        let mut out = Vec::new();
        walk(&self.fields, &mut out);
        out
    }

    /// Find a leaf field by name anywhere in the tree.
    pub fn find_field(&self, name: &str) -> Option<&FieldNode> {
        self.leaf_fields().into_iter().find(|f| f.name == name)
    }

    /// Mutable access to a leaf field, for attaching callables after load.
    pub fn find_field_mut(&mut self, name: &str) -> Option<&mut FieldNode> {
        fn walk<'a>(nodes: &'a mut [SchemaNode], name: &str) -> Option<&'a mut FieldNode> {
            for node in nodes {
                let found = match node {
                    SchemaNode::Field(f) if f.name == name => return Some(f),
                    SchemaNode::Field(_) => None,
                    SchemaNode::Group(g) => walk(&mut g.fields, name),
                    SchemaNode::Repeater(r) => walk(&mut r.fields, name),
                };
                if found.is_some() {
                    return found;
                }
            }
            None
        }

        walk(&mut self.fields, name)
    }

    /// Check structural invariants: node names are unique across the whole
    /// tree and conditions form no cycle. Returns the condition graph built
    /// along the way.
    pub fn check(&self) -> Result<DependencyGraph> {
        fn walk<'a>(nodes: &'a [SchemaNode], seen: &mut HashSet<&'a str>) -> Result<()> {
            for node in nodes {
                if !seen.insert(node.name()) {
                    return Err(Error::DuplicateField(node.name().to_string()));
                }
                walk(node.children(), seen)?;
            }
            Ok(())
        }

        walk(&self.fields, &mut HashSet::new())?;
        DependencyGraph::build(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::remote::RemoteError;
    use serde_json::json;

    fn signup_schema() -> FormSchema {
        FormSchema::new(1)
            .with_node(FieldNode::text("username", "Username").required().with_min_length(3))
            .with_node(FieldNode::number("age", "Age").with_min(18.0))
            .with_node(FieldNode::checkbox("newsletter", "Subscribe to newsletter"))
            .with_node(FieldNode::select("country", "Country").with_options(vec![
                SelectOption::new("India", "in"),
                SelectOption::new("USA", "us"),
            ]))
    }

    #[test]
    fn parse_wire_format() {
        let schema = FormSchema::from_json(
            r#"{
                "version": 1,
                "fields": [
                    {"type": "text", "name": "username", "label": "Username",
                     "validation": {"required": true, "minLength": 3}},
                    {"type": "group", "name": "company", "fields": [
                        {"type": "checkbox", "name": "hasCompany", "label": "I own a company"},
                        {"type": "text", "name": "companyName", "label": "Company Name",
                         "visibleWhen": {"field": "hasCompany", "equals": true}}
                    ]},
                    {"type": "repeater", "name": "phones", "minItems": 1, "fields": [
                        {"type": "text", "name": "phone", "label": "Phone"}
                    ]}
                ]
            }"#,
        )
        .unwrap();

        assert_eq!(schema.version, 1);
        let username = schema.find_field("username").unwrap();
        assert_eq!(username.field_type, FieldType::Text);
        assert!(username.validation.required);
        assert_eq!(username.validation.min_length, Some(3));

        let has_company = schema.find_field("hasCompany").unwrap();
        assert_eq!(has_company.field_type, FieldType::Checkbox);

        let company_name = schema.find_field("companyName").unwrap();
        assert_eq!(
            company_name.visible_when,
            Some(Condition::equals("hasCompany", true))
        );

        assert!(matches!(&schema.fields[2], SchemaNode::Repeater(r) if r.min_items == Some(1)));
        assert_eq!(
            schema
                .leaf_fields()
                .iter()
                .map(|f| f.name.as_str())
                .collect::<Vec<_>>(),
            vec!["username", "hasCompany", "companyName", "phone"]
        );
    }

    #[test]
    fn reject_unknown_node_type() {
        let result = FormSchema::from_json(
            r#"{"version": 1, "fields": [{"type": "date", "name": "dob", "label": "Birthday"}]}"#,
        );
        assert!(matches!(result, Err(Error::InvalidSchema(_))));
    }

    #[test]
    fn reject_invalid_pattern() {
        let result = FormSchema::from_json(
            r#"{"version": 1, "fields": [
                {"type": "text", "name": "zip", "label": "Zip", "validation": {"pattern": "([0-9"}}
            ]}"#,
        );
        assert!(matches!(result, Err(Error::InvalidSchema(_))));

        let result = FieldNode::text("zip", "Zip").with_pattern("([0-9");
        assert!(matches!(result, Err(Error::InvalidPattern { field, .. }) if field == "zip"));
    }

    #[test]
    fn reject_duplicate_names_across_containers() {
        let schema = FormSchema::new(1)
            .with_node(FieldNode::text("email", "Email"))
            .with_node(GroupNode::new(
                "contact",
                vec![FieldNode::text("email", "Work email").into()],
            ));

        assert!(matches!(schema.check(), Err(Error::DuplicateField(f)) if f == "email"));
    }

    #[test]
    fn container_names_count_as_names() {
        let schema = FormSchema::new(1)
            .with_node(FieldNode::text("phones", "Phones"))
            .with_node(RepeaterNode::new(
                "phones",
                vec![FieldNode::text("phone", "Phone").into()],
            ));

        assert!(matches!(schema.check(), Err(Error::DuplicateField(f)) if f == "phones"));
    }

    #[test]
    fn reject_condition_cycle() {
        let schema = FormSchema::new(1)
            .with_node(FieldNode::text("a", "A").visible_when(Condition::exists("b", true)))
            .with_node(FieldNode::text("b", "B").enabled_when(Condition::exists("a", true)));

        assert!(matches!(schema.check(), Err(Error::ConditionCycle(_))));
    }

    #[test]
    fn check_returns_condition_graph() {
        let schema = FormSchema::new(1)
            .with_node(FieldNode::checkbox("hasCompany", "I own a company"))
            .with_node(
                FieldNode::text("companyName", "Company Name")
                    .visible_when(Condition::equals("hasCompany", true))
                    .required_when(Condition::equals("hasCompany", true)),
            );

        let graph = schema.check().unwrap();
        assert!(graph.is_source("hasCompany"));
        assert_eq!(graph.edge_count(), 1);
        assert_eq!(graph.dependents_of("hasCompany"), vec!["companyName".to_string()]);
    }

    #[test]
    fn schema_serialization() {
        let schema = signup_schema()
            .with_node(FieldNode::text("zip", "Zip").with_pattern(r"^\d{5}$").unwrap());
        let json = serde_json::to_string(&schema).unwrap();
        let parsed: FormSchema = serde_json::from_str(&json).unwrap();
        assert_eq!(schema, parsed);

        let value = serde_json::to_value(&schema).unwrap();
        assert_eq!(value["fields"][0]["type"], "text");
        assert_eq!(value["fields"][0]["validation"], json!({"required": true, "minLength": 3}));
        assert_eq!(value["fields"][4]["validation"]["pattern"], r"^\d{5}$");
    }

    #[test]
    fn attach_callables_after_parse() {
        let mut schema = FormSchema::from_json(
            r#"{"version": 2, "fields": [
                {"type": "select", "name": "city", "label": "City", "asyncOptions": {"key": "cities"}},
                {"type": "text", "name": "handle", "label": "Handle", "asyncValidation": {"debounceMs": 50}}
            ]}"#,
        )
        .unwrap();

        let city = schema.find_field("city").unwrap();
        assert!(city.async_options.as_ref().unwrap().loader.is_none());

        let city = schema.find_field_mut("city").unwrap();
        *city = city
            .clone()
            .with_loader(|| async { Ok::<_, RemoteError>(vec![SelectOption::new("Pune", "pune")]) });
        assert!(schema.find_field("city").unwrap().async_options.as_ref().unwrap().loader.is_some());

        let handle = schema.find_field_mut("handle").unwrap();
        *handle = handle
            .clone()
            .with_validator(|_value: crate::FieldValue| async { Ok::<Option<String>, RemoteError>(None) });
        let validation = schema
            .find_field("handle")
            .unwrap()
            .async_validation
            .clone()
            .unwrap();
        assert_eq!(validation.debounce_ms, Some(50));
        assert!(validation.validator.is_some());
        assert_eq!(validation.debounce(DEFAULT_DEBOUNCE_MS), Duration::from_millis(50));
    }

    #[test]
    fn field_type_display() {
        assert_eq!(FieldType::Text.to_string(), "text");
        assert_eq!(FieldType::Select.to_string(), "select");
    }
}
