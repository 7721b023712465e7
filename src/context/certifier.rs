//! Context header certification.
//!
//! Encodes a [`ContextHeader`] and, when the encoding does not fit the byte
//! budget, reduces it step by step until it does:
//!
//! 1. constraint names in the stack → constraint RIDs (all or nothing)
//! 2. facet value lists (`ch`, `r`, `s`) → their lengths
//! 3. `filters.and` → number of filters
//! 4. frame `source` paths → number of path nodes
//! 5. `stack` → number of frames
//!
//! If nothing fits the minimal header is used; if even that is too large the
//! empty object is sent. Diagnostics never block a request.

use crate::context::constraints::ConstraintLookup;
use crate::context::encoding::encode;
use crate::context::header::{
    Collapsible, ConstraintRef, ContextHeader, SourceNode, SourcePath, StackFrame,
};
use crate::observability::metrics;
use serde_json::Value;

/// Encoding used when not even the minimal header fits.
pub const EMPTY_HEADER: &str = "{}";

/// How far a header had to be reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    None,
    ConstraintRids,
    FilterValueCounts,
    FilterCounts,
    SourceCounts,
    StackCount,
    Minimal,
    Empty,
}

impl Reduction {
    pub fn label(&self) -> &'static str {
        match self {
            Reduction::None => "none",
            Reduction::ConstraintRids => "constraint_rids",
            Reduction::FilterValueCounts => "filter_value_counts",
            Reduction::FilterCounts => "filter_counts",
            Reduction::SourceCounts => "source_counts",
            Reduction::StackCount => "stack_count",
            Reduction::Minimal => "minimal",
            Reduction::Empty => "empty",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CertifiedHeader {
    /// Header value to send.
    pub value: String,
    pub reduction: Reduction,
}

/// Encode `header` so that it stays strictly below `budget` bytes.
pub fn certify(
    header: &ContextHeader,
    budget: usize,
    constraints: &dyn ConstraintLookup,
) -> CertifiedHeader {
    let certified = reduce(header, budget, constraints);
    if certified.reduction != Reduction::None {
        tracing::debug!(
            reduction = certified.reduction.label(),
            bytes = certified.value.len(),
            budget,
            "Context header reduced to fit budget"
        );
        metrics::record_header_degraded(certified.reduction.label());
    }
    certified
}

fn reduce(
    header: &ContextHeader,
    budget: usize,
    constraints: &dyn ConstraintLookup,
) -> CertifiedHeader {
    let fits = |s: &str| s.len() < budget;
    let done = |value: String, reduction: Reduction| CertifiedHeader { value, reduction };
    let empty = || done(EMPTY_HEADER.to_string(), Reduction::Empty);

    let full = match encode(header) {
        Ok(s) => s,
        Err(e) => {
            tracing::warn!(error = %e, "Context header could not be encoded");
            return empty();
        }
    };
    if fits(&full) {
        return done(full, Reduction::None);
    }

    let minimal = match encode(&minimal_header(header)) {
        Ok(s) if fits(&s) => s,
        _ => return empty(),
    };

    if !matches!(header.stack, Some(Collapsible::Full(_))) {
        return done(minimal, Reduction::Minimal);
    }

    let mut truncated = header.clone();

    let attempt = |h: &ContextHeader, reduction: Reduction| -> Option<CertifiedHeader> {
        encode(h)
            .ok()
            .filter(|s| fits(s))
            .map(|s| done(s, reduction))
    };

    if let Some(frames) = truncated.frames_mut() {
        let catalog = header.catalog.as_deref();
        if let Some(replaced) = frames_with_rids(frames, catalog, constraints) {
            *frames = replaced;
            if let Some(c) = attempt(&truncated, Reduction::ConstraintRids) {
                return c;
            }
        }
    }

    for frame in truncated.frames_mut().into_iter().flatten() {
        collapse_facet_values(frame);
    }
    if let Some(c) = attempt(&truncated, Reduction::FilterValueCounts) {
        return c;
    }

    for frame in truncated.frames_mut().into_iter().flatten() {
        if let Some(filters) = frame.filters.as_mut() {
            if let Some(Collapsible::Full(facets)) = &filters.and {
                let count = facets.len();
                filters.and = Some(Collapsible::Count(count));
            }
        }
    }
    if let Some(c) = attempt(&truncated, Reduction::FilterCounts) {
        return c;
    }

    for frame in truncated.frames_mut().into_iter().flatten() {
        if let Some(Collapsible::Full(path)) = &frame.source {
            let count = path.node_count();
            frame.source = Some(Collapsible::Count(count));
        }
    }
    if let Some(c) = attempt(&truncated, Reduction::SourceCounts) {
        return c;
    }

    if let Some(Collapsible::Full(frames)) = &truncated.stack {
        let count = frames.len();
        truncated.stack = Some(Collapsible::Count(count));
    }
    if let Some(c) = attempt(&truncated, Reduction::StackCount) {
        return c;
    }

    done(minimal, Reduction::Minimal)
}

/// Required fields plus the optional correlation fields that are set.
pub fn minimal_header(header: &ContextHeader) -> ContextHeader {
    let non_empty = |v: &Option<String>| v.clone().filter(|s| !s.is_empty());
    ContextHeader {
        cid: header.cid.clone(),
        wid: header.wid.clone(),
        pid: header.pid.clone(),
        catalog: header.catalog.clone(),
        schema_table: header.schema_table.clone(),
        action: header.action.clone(),
        elapsed_ms: header.elapsed_ms.filter(|ms| *ms != 0),
        cqp: non_empty(&header.cqp),
        ppid: non_empty(&header.ppid),
        pcid: non_empty(&header.pcid),
        t: Some(1),
        ..Default::default()
    }
}

/// Copy of `frames` with every named constraint replaced by its RID, or
/// `None` if any referenced constraint has no known RID.
fn frames_with_rids(
    frames: &[StackFrame],
    catalog: Option<&str>,
    constraints: &dyn ConstraintLookup,
) -> Option<Vec<StackFrame>> {
    let mut frames = frames.to_vec();
    for frame in &mut frames {
        if let Some(filters) = frame.filters.as_mut() {
            if let Some(Collapsible::Full(facets)) = filters.and.as_mut() {
                for facet in facets {
                    if let Some(path) = facet.source.as_mut() {
                        replace_path_rids(path, catalog, constraints)?;
                    }
                }
            }
        }
        if let Some(Collapsible::Full(path)) = frame.source.as_mut() {
            replace_path_rids(path, catalog, constraints)?;
        }
    }
    Some(frames)
}

fn replace_path_rids(
    path: &mut SourcePath,
    catalog: Option<&str>,
    constraints: &dyn ConstraintLookup,
) -> Option<()> {
    let SourcePath::Nodes(nodes) = path else {
        return Some(());
    };
    for node in nodes {
        let SourceNode::Hop(hop) = node else {
            continue;
        };
        for slot in [&mut hop.inbound, &mut hop.outbound] {
            let rid = match (catalog, slot.as_ref()) {
                (_, None) | (_, Some(ConstraintRef::Rid(_))) => continue,
                (Some(catalog), Some(ConstraintRef::Name(name))) => match name.as_slice() {
                    [schema, constraint, ..] => constraints.lookup(catalog, schema, constraint)?,
                    _ => return None,
                },
                (None, Some(ConstraintRef::Name(_))) => return None,
            };
            *slot = Some(ConstraintRef::Rid(rid));
        }
    }
    Some(())
}

fn collapse_facet_values(frame: &mut StackFrame) {
    let Some(filters) = frame.filters.as_mut() else {
        return;
    };
    let Some(Collapsible::Full(facets)) = filters.and.as_mut() else {
        return;
    };
    for facet in facets {
        for values in [&mut facet.choices, &mut facet.ranges, &mut facet.search] {
            let count = match values.as_ref() {
                None | Some(Value::Number(_)) => continue,
                Some(Value::Array(items)) => items.len(),
                Some(_) => 1,
            };
            *values = Some(Value::from(count));
        }
    }
}
