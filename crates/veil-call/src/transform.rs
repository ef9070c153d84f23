//! Shape-preserving tree rewrite.
//!
//! Both directions of the engine are built on [`map_leaves`]: containers are
//! rebuilt with the same kind and arity, every leaf is offered to a rewrite
//! function that either replaces it or leaves it as is. Lists and tuples are
//! walked by index, records by key order, and [`visit_leaves`] uses the same
//! order so a collect-then-rewrite pass lines up leaf for leaf.

use std::fmt;

use veil_core::CallValue;

/// One step from a container to a child.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Index(usize),
    Field(String),
}

/// Location of a node inside a call tree, rendered as `$.field[0]`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LeafPath(Vec<PathSegment>);

impl LeafPath {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn segments(&self) -> &[PathSegment] {
        &self.0
    }

    pub(crate) fn push(&mut self, segment: PathSegment) {
        self.0.push(segment);
    }

    pub(crate) fn pop(&mut self) {
        self.0.pop();
    }
}

impl fmt::Display for LeafPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "$")?;
        for segment in &self.0 {
            match segment {
                PathSegment::Index(i) => write!(f, "[{i}]")?,
                PathSegment::Field(name) => write!(f, ".{name}")?,
            }
        }
        Ok(())
    }
}

/// Rebuild `value`, replacing each leaf for which `rewrite` returns `Some`.
///
/// The input is never modified. The first error aborts the walk.
pub fn map_leaves<F, E>(value: &CallValue, rewrite: &mut F) -> Result<CallValue, E>
where
    F: FnMut(&LeafPath, &CallValue) -> Result<Option<CallValue>, E>,
{
    let mut path = LeafPath::root();
    map_at(value, &mut path, rewrite)
}

fn map_at<F, E>(value: &CallValue, path: &mut LeafPath, rewrite: &mut F) -> Result<CallValue, E>
where
    F: FnMut(&LeafPath, &CallValue) -> Result<Option<CallValue>, E>,
{
    match value {
        CallValue::List(items) => Ok(CallValue::List(map_items(items, path, rewrite)?)),
        CallValue::Tuple(items) => Ok(CallValue::Tuple(map_items(items, path, rewrite)?)),
        CallValue::Record(fields) => {
            let mut out = std::collections::BTreeMap::new();
            for (name, child) in fields {
                path.push(PathSegment::Field(name.clone()));
                let mapped = map_at(child, path, rewrite);
                path.pop();
                out.insert(name.clone(), mapped?);
            }
            Ok(CallValue::Record(out))
        }
        leaf => Ok(rewrite(path, leaf)?.unwrap_or_else(|| leaf.clone())),
    }
}

fn map_items<F, E>(
    items: &[CallValue],
    path: &mut LeafPath,
    rewrite: &mut F,
) -> Result<Vec<CallValue>, E>
where
    F: FnMut(&LeafPath, &CallValue) -> Result<Option<CallValue>, E>,
{
    let mut out = Vec::with_capacity(items.len());
    for (i, child) in items.iter().enumerate() {
        path.push(PathSegment::Index(i));
        let mapped = map_at(child, path, rewrite);
        path.pop();
        out.push(mapped?);
    }
    Ok(out)
}

/// Visit every leaf in the order [`map_leaves`] rewrites them.
pub fn visit_leaves<F>(value: &CallValue, visit: &mut F)
where
    F: FnMut(&LeafPath, &CallValue),
{
    let mut path = LeafPath::root();
    visit_at(value, &mut path, visit);
}

fn visit_at<F>(value: &CallValue, path: &mut LeafPath, visit: &mut F)
where
    F: FnMut(&LeafPath, &CallValue),
{
    match value {
        CallValue::List(items) | CallValue::Tuple(items) => {
            for (i, child) in items.iter().enumerate() {
                path.push(PathSegment::Index(i));
                visit_at(child, path, visit);
                path.pop();
            }
        }
        CallValue::Record(fields) => {
            for (name, child) in fields {
                path.push(PathSegment::Field(name.clone()));
                visit_at(child, path, visit);
                path.pop();
            }
        }
        leaf => visit(path, leaf),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn sample() -> CallValue {
        CallValue::record([
            (
                "pair",
                CallValue::tuple([CallValue::from(1u64), CallValue::Null]),
            ),
            (
                "items",
                CallValue::list([CallValue::from("a"), CallValue::from(2u64)]),
            ),
        ])
    }

    #[test]
    fn test_identity_rewrite_preserves_shape() {
        let tree = sample();
        let out = map_leaves(&tree, &mut |_, _| Ok::<_, Infallible>(None)).unwrap();
        assert_eq!(out, tree);
    }

    #[test]
    fn test_rewrite_replaces_only_matching_leaves() {
        let tree = sample();
        let out = map_leaves(&tree, &mut |_, leaf| {
            Ok::<_, Infallible>(match leaf {
                CallValue::Uint(_) => Some(CallValue::from("n")),
                _ => None,
            })
        })
        .unwrap();

        let pair = out.get("pair").unwrap();
        assert!(matches!(pair, CallValue::Tuple(items) if items.len() == 2));
        assert_eq!(pair.at(0), Some(&CallValue::from("n")));
        assert_eq!(pair.at(1), Some(&CallValue::Null));
        assert_eq!(out.get("items").unwrap().at(0), Some(&CallValue::from("a")));
        assert_eq!(out.get("items").unwrap().at(1), Some(&CallValue::from("n")));
    }

    #[test]
    fn test_visit_order_matches_paths() {
        let mut seen = Vec::new();
        visit_leaves(&sample(), &mut |path, _| seen.push(path.to_string()));
        assert_eq!(
            seen,
            vec!["$.items[0]", "$.items[1]", "$.pair[0]", "$.pair[1]"]
        );
    }

    #[test]
    fn test_error_aborts_walk() {
        let mut calls = 0;
        let result = map_leaves(&sample(), &mut |path, _| {
            calls += 1;
            Err(path.to_string())
        });
        assert_eq!(result, Err("$.items[0]".to_string()));
        assert_eq!(calls, 1);
    }

    #[test]
    fn test_scalar_root() {
        let mut seen = Vec::new();
        visit_leaves(&CallValue::Bool(true), &mut |path, _| seen.push(path.to_string()));
        assert_eq!(seen, vec!["$"]);
    }
}
