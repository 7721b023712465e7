//! Diagnostic context header model.
//!
//! Wire keys are short on purpose: the whole object travels in one HTTP
//! header and is parsed by the service's request log.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Either the full value or the number of elements it had.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Collapsible<T> {
    Count(usize),
    Full(T),
}

/// Diagnostic context attached to outgoing requests.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ContextHeader {
    /// Client application id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cid: Option<String>,

    /// Window id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wid: Option<String>,

    /// Page id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<String>,

    /// Catalog id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub catalog: Option<String>,

    /// `schema:table` the request addresses.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema_table: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub action: Option<String>,

    /// Milliseconds since the client was created.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub elapsed_ms: Option<u64>,

    /// Query parameter the page was loaded with.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cqp: Option<String>,

    /// Parent page id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ppid: Option<String>,

    /// Parent client application id.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pcid: Option<String>,

    /// Set to 1 on a header reduced to its minimal form.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub t: Option<u8>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack: Option<Collapsible<Vec<StackFrame>>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// One logical operation in the stack.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StackFrame {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filters: Option<FilterSet>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<Collapsible<SourcePath>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FilterSet {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub and: Option<Collapsible<Vec<FacetFilter>>>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Match criteria on one facet.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FacetFilter {
    #[serde(rename = "src", skip_serializing_if = "Option::is_none")]
    pub source: Option<SourcePath>,

    #[serde(rename = "ch", skip_serializing_if = "Option::is_none")]
    pub choices: Option<Value>,

    #[serde(rename = "r", skip_serializing_if = "Option::is_none")]
    pub ranges: Option<Value>,

    #[serde(rename = "s", skip_serializing_if = "Option::is_none")]
    pub search: Option<Value>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Addressing path: a bare column or a sequence of hops ending in a column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourcePath {
    Column(String),
    Nodes(Vec<SourceNode>),
}

impl SourcePath {
    /// Number of path nodes.
    pub fn node_count(&self) -> usize {
        match self {
            SourcePath::Column(_) => 1,
            SourcePath::Nodes(nodes) => nodes.len(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SourceNode {
    Column(String),
    Hop(PathHop),
}

/// A join across a foreign key, in either direction.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PathHop {
    #[serde(rename = "i", skip_serializing_if = "Option::is_none")]
    pub inbound: Option<ConstraintRef>,

    #[serde(rename = "o", skip_serializing_if = "Option::is_none")]
    pub outbound: Option<ConstraintRef>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl PathHop {
    pub fn inbound(schema: &str, constraint: &str) -> Self {
        Self {
            inbound: Some(ConstraintRef::named(schema, constraint)),
            ..Default::default()
        }
    }

    pub fn outbound(schema: &str, constraint: &str) -> Self {
        Self {
            outbound: Some(ConstraintRef::named(schema, constraint)),
            ..Default::default()
        }
    }
}

/// A constraint named by `[schema, constraint]`, or its short RID.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ConstraintRef {
    Name(Vec<String>),
    Rid(String),
}

impl ConstraintRef {
    pub fn named(schema: &str, constraint: &str) -> Self {
        ConstraintRef::Name(vec![schema.to_string(), constraint.to_string()])
    }
}

impl ContextHeader {
    pub fn new(action: impl Into<String>) -> Self {
        Self {
            action: Some(action.into()),
            ..Default::default()
        }
    }

    /// Fill every key this header leaves unset from `defaults`.
    ///
    /// Keys already present are never overwritten.
    pub fn merge_defaults(&mut self, defaults: &ContextHeader) {
        fn fill<T: Clone>(slot: &mut Option<T>, default: &Option<T>) {
            if slot.is_none() {
                slot.clone_from(default);
            }
        }

        fill(&mut self.cid, &defaults.cid);
        fill(&mut self.wid, &defaults.wid);
        fill(&mut self.pid, &defaults.pid);
        fill(&mut self.catalog, &defaults.catalog);
        fill(&mut self.schema_table, &defaults.schema_table);
        fill(&mut self.action, &defaults.action);
        fill(&mut self.elapsed_ms, &defaults.elapsed_ms);
        fill(&mut self.cqp, &defaults.cqp);
        fill(&mut self.ppid, &defaults.ppid);
        fill(&mut self.pcid, &defaults.pcid);
        fill(&mut self.t, &defaults.t);
        fill(&mut self.stack, &defaults.stack);

        for (key, value) in &defaults.extra {
            self.extra
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    /// Frames of a stack that has not been collapsed.
    pub fn frames_mut(&mut self) -> Option<&mut Vec<StackFrame>> {
        match &mut self.stack {
            Some(Collapsible::Full(frames)) => Some(frames),
            _ => None,
        }
    }
}
