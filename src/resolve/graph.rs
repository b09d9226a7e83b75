//! Import graph utilities.

use std::collections::{HashMap, HashSet};

use crate::config::FragmentSet;
use crate::error::ResolveError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum Mark {
    InProgress,
    Done,
}

/// Verify that every import reachable from the root names a known fragment
/// and that the import graph is acyclic.
///
/// # Errors
///
/// Returns [`ResolveError::Cycle`] with the offending path (first id repeated
/// at the end) or [`ResolveError::UnknownFragment`] for a dangling import.
pub fn check_imports(set: &FragmentSet) -> Result<(), ResolveError> {
    let mut marks = HashMap::new();
    let mut path = Vec::new();
    visit(set, set.root_id(), &mut marks, &mut path)
}

fn visit<'a>(
    set: &'a FragmentSet,
    id: &'a str,
    marks: &mut HashMap<&'a str, Mark>,
    path: &mut Vec<&'a str>,
) -> Result<(), ResolveError> {
    match marks.get(id) {
        Some(Mark::Done) => return Ok(()),
        Some(Mark::InProgress) => {
            let start = path.iter().position(|p| *p == id).unwrap_or(0);
            let mut cycle: Vec<String> = path
                .get(start..)
                .unwrap_or_default()
                .iter()
                .map(ToString::to_string)
                .collect();
            cycle.push(id.to_string());
            return Err(ResolveError::Cycle { cycle });
        }
        None => {}
    }

    let Some(fragment) = set.get(id) else {
        return Err(ResolveError::UnknownFragment {
            id: id.to_string(),
            referenced_by: path.last().map(ToString::to_string).unwrap_or_default(),
        });
    };

    marks.insert(id, Mark::InProgress);
    path.push(id);
    for import in &fragment.imports {
        visit(set, import, marks, path)?;
    }
    path.pop();
    marks.insert(id, Mark::Done);
    Ok(())
}

/// Merge order: the root followed by its transitive imports, depth-first in
/// declaration order. A fragment imported more than once keeps its first
/// position.
///
/// # Errors
///
/// Same as [`check_imports`], which runs first.
pub fn merge_order(set: &FragmentSet) -> Result<Vec<String>, ResolveError> {
    check_imports(set)?;

    let mut order = Vec::new();
    let mut seen = HashSet::new();
    let mut stack = vec![set.root_id()];
    while let Some(id) = stack.pop() {
        if !seen.insert(id) {
            continue;
        }
        order.push(id.to_string());
        if let Some(fragment) = set.get(id) {
            stack.extend(fragment.imports.iter().rev().map(String::as_str));
        }
    }
    Ok(order)
}

/// Ids of fragments that the root never reaches.
#[must_use]
pub fn unreachable(set: &FragmentSet) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut stack = vec![set.root_id()];
    while let Some(id) = stack.pop() {
        if seen.insert(id)
            && let Some(fragment) = set.get(id)
        {
            stack.extend(fragment.imports.iter().map(String::as_str));
        }
    }
    set.iter()
        .filter(|f| !seen.contains(f.id.as_str()))
        .map(|f| f.id.clone())
        .collect()
}
