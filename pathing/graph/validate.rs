use std::cmp::Reverse;
use std::collections::BinaryHeap;

use indexmap::IndexMap;

use compass_domain::{CourseCatalog, EngineError};

/// Kahn's algorithm over the prerequisite graph, always draining the
/// lexicographically smallest ready course so the order is deterministic.
///
/// Fails with `MalformedRecord` on a prerequisite pointing outside the
/// catalog, and with `CycleDetected` (listing the residual courses) when the
/// graph is not acyclic. Cycles are a hard error, never silently broken.
pub fn topological_order(catalog: &CourseCatalog) -> Result<Vec<String>, EngineError> {
    let mut indegree: IndexMap<&str, usize> = IndexMap::new();
    let mut dependents: IndexMap<&str, Vec<&str>> = IndexMap::new();
    for course in catalog.courses.values() {
        indegree.entry(course.course_id.as_str()).or_insert(0);
        for prereq in &course.prerequisites {
            if !catalog.courses.contains_key(prereq) {
                return Err(EngineError::malformed(format!(
                    "course '{}' requires unknown course '{prereq}'",
                    course.course_id
                )));
            }
            *indegree.entry(course.course_id.as_str()).or_insert(0) += 1;
            dependents
                .entry(prereq.as_str())
                .or_default()
                .push(course.course_id.as_str());
        }
    }

    let mut ready: BinaryHeap<Reverse<&str>> = indegree
        .iter()
        .filter(|(_, degree)| **degree == 0)
        .map(|(course_id, _)| Reverse(*course_id))
        .collect();

    let mut order = Vec::with_capacity(catalog.len());
    while let Some(Reverse(course_id)) = ready.pop() {
        order.push(course_id.to_string());
        if let Some(next) = dependents.get(course_id) {
            for dependent in next {
                if let Some(degree) = indegree.get_mut(dependent) {
                    *degree -= 1;
                    if *degree == 0 {
                        ready.push(Reverse(*dependent));
                    }
                }
            }
        }
    }

    if order.len() < catalog.len() {
        let mut remaining: Vec<String> = indegree
            .iter()
            .filter(|(_, degree)| **degree > 0)
            .map(|(course_id, _)| (*course_id).to_string())
            .collect();
        remaining.sort();
        return Err(EngineError::CycleDetected { remaining });
    }
    Ok(order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use compass_domain::{CourseNode, DifficultyTier};

    fn course(id: &str, prereqs: &[&str]) -> CourseNode {
        let mut node = CourseNode::new(id, 10.0, DifficultyTier::Core).teaching("skill", 0.3);
        for prereq in prereqs {
            node = node.requiring(*prereq);
        }
        node
    }

    #[test]
    fn order_respects_prerequisites_and_breaks_ties_lexicographically() {
        let catalog = CourseCatalog::new(1)
            .with_course(course("zeta", &[]))
            .with_course(course("alpha", &[]))
            .with_course(course("mid", &["zeta", "alpha"]));
        let order = topological_order(&catalog).unwrap();
        assert_eq!(order, vec!["alpha", "zeta", "mid"]);
    }

    #[test]
    fn cycle_is_a_hard_error() {
        let catalog = CourseCatalog::new(1)
            .with_course(course("a", &["b"]))
            .with_course(course("b", &["a"]))
            .with_course(course("free", &[]));
        match topological_order(&catalog) {
            Err(EngineError::CycleDetected { remaining }) => {
                assert_eq!(remaining, vec!["a", "b"]);
            }
            other => panic!("expected cycle error, got {other:?}"),
        }
    }

    #[test]
    fn dangling_prerequisite_is_malformed() {
        let catalog = CourseCatalog::new(1).with_course(course("a", &["ghost"]));
        assert!(matches!(
            topological_order(&catalog),
            Err(EngineError::MalformedRecord { .. })
        ));
    }
}
