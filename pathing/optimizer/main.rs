//! Prerequisite-aware path optimization. Course selection is a shortest-path
//! search over the validated prerequisite DAG where the cost of a course is
//! its duration discounted by how much it remediates flagged weak skills.

/// Pure cost helpers.
pub mod cost;

use indexmap::{IndexMap, IndexSet};
use serde_json::json;
use shared_logging::LogLevel;
use tokio_util::sync::CancellationToken;

use compass_domain::{
    CourseCatalog, EngineError, LearnerProfile, LearningPath, PathConfig, WeaknessProfile,
};

use crate::graph::{GraphValidator, ValidatedOrder};
use crate::telemetry::PathingTelemetry;

const GAIN_EPSILON: f32 = 1e-6;

/// Computes minimum-cost goal-covering course sequences.
#[derive(Debug, Default)]
pub struct PathOptimizer {
    config: PathConfig,
    validator: GraphValidator,
}

impl PathOptimizer {
    /// Creates an optimizer with the given tuning.
    #[must_use]
    pub fn new(config: PathConfig) -> Self {
        Self {
            config,
            validator: GraphValidator::new(),
        }
    }

    /// Plans a path toward the goal skill tags.
    pub fn plan(
        &self,
        learner: &LearnerProfile,
        goals: &IndexSet<String>,
        catalog: &CourseCatalog,
        weakness: &WeaknessProfile,
        cancel: &CancellationToken,
    ) -> Result<LearningPath, EngineError> {
        self.plan_with_telemetry(learner, goals, catalog, weakness, cancel, None)
    }

    /// Plans a path with optional telemetry instrumentation.
    ///
    /// The graph is validated (cycles, dangling prerequisites) before any
    /// search; a goal tag no course can satisfy fails fast with
    /// `UnreachableGoal`; the cancellation token is honored between
    /// topological steps and returns `Cancelled`, never a partial path.
    pub fn plan_with_telemetry(
        &self,
        learner: &LearnerProfile,
        goals: &IndexSet<String>,
        catalog: &CourseCatalog,
        weakness: &WeaknessProfile,
        cancel: &CancellationToken,
        telemetry: Option<&PathingTelemetry>,
    ) -> Result<LearningPath, EngineError> {
        if goals.is_empty() {
            return Err(EngineError::malformed(
                "path planning requires a non-empty goal set",
            ));
        }
        log(
            telemetry,
            LogLevel::Debug,
            "plan.start",
            json!({ "learner_id": learner.learner_id, "goals": goals.len() }),
        );

        let validated = self.validator.order(catalog)?;
        let pending = pending_gains(learner, goals, catalog, self.config.goal_proficiency)?;
        if pending.is_empty() {
            let projected = projected_proficiency(learner, goals, catalog, &[]);
            log(
                telemetry,
                LogLevel::Info,
                "plan.complete",
                json!({ "learner_id": learner.learner_id, "courses": 0 }),
            );
            return Ok(LearningPath::new(Vec::new(), 0.0, projected));
        }

        let relevant = relevant_courses(catalog, &pending, weakness)?;
        let dp = ClosureTable::build(
            catalog,
            &validated,
            &relevant,
            weakness,
            self.config.remediation_weight,
            cancel,
        )
        .map_err(|err| cancelled_log(err, telemetry, learner))?;
        let selected = greedy_cover(catalog, &relevant, &dp, pending, cancel)
            .map_err(|err| cancelled_log(err, telemetry, learner))?;

        let mut sequence: Vec<String> = selected.into_iter().collect();
        sequence.sort_by_key(|course_id| {
            validated
                .rank
                .get(course_id)
                .copied()
                .unwrap_or(usize::MAX)
        });
        let total_duration = sequence
            .iter()
            .filter_map(|course_id| catalog.get(course_id))
            .map(|course| course.duration_minutes)
            .sum();
        let projected = projected_proficiency(learner, goals, catalog, &sequence);
        let path = LearningPath::new(sequence, total_duration, projected);
        log(
            telemetry,
            LogLevel::Info,
            "plan.complete",
            json!({
                "learner_id": learner.learner_id,
                "plan_id": path.plan_id,
                "courses": path.len(),
                "total_duration_minutes": path.total_duration_minutes
            }),
        );
        Ok(path)
    }
}

/// Gains still required per goal tag. Fails fast when a goal tag is taught
/// nowhere or the whole catalog cannot supply the required gain.
fn pending_gains(
    learner: &LearnerProfile,
    goals: &IndexSet<String>,
    catalog: &CourseCatalog,
    goal_proficiency: f32,
) -> Result<IndexMap<String, f32>, EngineError> {
    for tag in goals {
        if catalog.courses_teaching(tag).is_empty() {
            return Err(EngineError::UnreachableGoal {
                skill_tag: tag.clone(),
            });
        }
    }
    let pending: IndexMap<String, f32> = goals
        .iter()
        .filter_map(|tag| {
            let need = goal_proficiency - learner.proficiency(tag);
            (need > GAIN_EPSILON).then(|| (tag.clone(), need))
        })
        .collect();
    for (tag, need) in &pending {
        let available: f32 = catalog
            .courses_teaching(tag)
            .iter()
            .map(|course| course.gain(tag))
            .sum();
        if available + GAIN_EPSILON < *need {
            return Err(EngineError::UnreachableGoal {
                skill_tag: tag.clone(),
            });
        }
    }
    Ok(pending)
}

/// Courses teaching a pending goal or a flagged weak skill, expanded by
/// their transitive prerequisites, each validated.
fn relevant_courses(
    catalog: &CourseCatalog,
    pending: &IndexMap<String, f32>,
    weakness: &WeaknessProfile,
) -> Result<IndexSet<String>, EngineError> {
    let mut relevant: IndexSet<String> = catalog
        .courses
        .values()
        .filter(|course| {
            course
                .taught
                .keys()
                .any(|tag| pending.contains_key(tag) || weakness.is_weak(tag))
        })
        .map(|course| course.course_id.clone())
        .collect();
    let mut frontier: Vec<String> = relevant.iter().cloned().collect();
    while let Some(course_id) = frontier.pop() {
        let Some(course) = catalog.get(&course_id) else {
            return Err(EngineError::UnknownCourse { course_id });
        };
        for prereq in &course.prerequisites {
            if relevant.insert(prereq.clone()) {
                frontier.push(prereq.clone());
            }
        }
    }
    for course_id in &relevant {
        if let Some(course) = catalog.get(course_id) {
            course.validate()?;
        }
    }
    Ok(relevant)
}

/// Per-course prerequisite closures and remediation-discounted costs,
/// computed by one pass in topological order.
struct ClosureTable {
    closures: IndexMap<String, IndexSet<String>>,
    costs: IndexMap<String, f32>,
}

impl ClosureTable {
    fn build(
        catalog: &CourseCatalog,
        validated: &ValidatedOrder,
        relevant: &IndexSet<String>,
        weakness: &WeaknessProfile,
        remediation_weight: f32,
        cancel: &CancellationToken,
    ) -> Result<Self, EngineError> {
        let mut closures: IndexMap<String, IndexSet<String>> = IndexMap::new();
        let mut costs: IndexMap<String, f32> = IndexMap::new();
        for course_id in validated.order.iter() {
            if !relevant.contains(course_id) {
                continue;
            }
            if cancel.is_cancelled() {
                return Err(EngineError::Cancelled);
            }
            let Some(course) = catalog.get(course_id) else {
                continue;
            };
            let mut closure = IndexSet::new();
            for prereq in &course.prerequisites {
                // Prerequisites precede their dependents in topological order.
                if let Some(prereq_closure) = closures.get(prereq) {
                    closure.extend(prereq_closure.iter().cloned());
                }
            }
            closure.insert(course_id.clone());
            costs.insert(
                course_id.clone(),
                cost::effective_cost(
                    course.duration_minutes,
                    cost::remediation_overlap(course, weakness),
                    remediation_weight,
                ),
            );
            closures.insert(course_id.clone(), closure);
        }
        Ok(Self { closures, costs })
    }

    /// Cost, duration, and pending-gain coverage added by the part of a
    /// course's closure not yet selected.
    fn marginal(
        &self,
        catalog: &CourseCatalog,
        course_id: &str,
        selected: &IndexSet<String>,
        pending: &IndexMap<String, f32>,
    ) -> Option<(f32, f32, f32)> {
        let closure = self.closures.get(course_id)?;
        let mut added_cost = 0.0f32;
        let mut added_duration = 0.0f32;
        let mut coverage = 0.0f32;
        for member in closure {
            if selected.contains(member) {
                continue;
            }
            let node = catalog.get(member)?;
            added_cost += self.costs.get(member).copied().unwrap_or(node.duration_minutes);
            added_duration += node.duration_minutes;
            coverage += pending
                .iter()
                .map(|(tag, need)| node.gain(tag).min(*need))
                .sum::<f32>();
        }
        Some((added_cost, added_duration, coverage))
    }
}

/// Greedy cover of the pending goal gains by best marginal cost/coverage;
/// ties break on lower added duration, then the smaller course identifier.
fn greedy_cover(
    catalog: &CourseCatalog,
    relevant: &IndexSet<String>,
    dp: &ClosureTable,
    mut pending: IndexMap<String, f32>,
    cancel: &CancellationToken,
) -> Result<IndexSet<String>, EngineError> {
    let mut selected: IndexSet<String> = IndexSet::new();
    while pending.values().any(|need| *need > GAIN_EPSILON) {
        if cancel.is_cancelled() {
            return Err(EngineError::Cancelled);
        }
        let mut best: Option<(f32, f32, String)> = None;
        for course_id in relevant {
            if selected.contains(course_id) {
                continue;
            }
            let Some((added_cost, added_duration, coverage)) =
                dp.marginal(catalog, course_id, &selected, &pending)
            else {
                continue;
            };
            if coverage <= GAIN_EPSILON {
                continue;
            }
            let ratio = added_cost / coverage;
            let better = best
                .as_ref()
                .map_or(true, |(best_ratio, best_duration, best_id)| {
                    ratio < best_ratio - GAIN_EPSILON
                        || ((ratio - best_ratio).abs() <= GAIN_EPSILON
                            && (added_duration < best_duration - GAIN_EPSILON
                                || ((added_duration - best_duration).abs() <= GAIN_EPSILON
                                    && course_id.as_str() < best_id.as_str())))
                });
            if better {
                best = Some((ratio, added_duration, course_id.clone()));
            }
        }

        let Some((_, _, chosen)) = best else {
            let skill_tag = pending
                .iter()
                .find(|(_, need)| **need > GAIN_EPSILON)
                .map(|(tag, _)| tag.clone())
                .unwrap_or_default();
            return Err(EngineError::UnreachableGoal { skill_tag });
        };
        let Some(closure) = dp.closures.get(&chosen) else {
            continue;
        };
        for member in closure.clone() {
            if selected.insert(member.clone()) {
                if let Some(node) = catalog.get(&member) {
                    for (tag, need) in &mut pending {
                        *need = (*need - node.gain(tag)).max(0.0);
                    }
                }
            }
        }
    }
    Ok(selected)
}

fn projected_proficiency(
    learner: &LearnerProfile,
    goals: &IndexSet<String>,
    catalog: &CourseCatalog,
    sequence: &[String],
) -> IndexMap<String, f32> {
    goals
        .iter()
        .map(|tag| {
            let gained: f32 = sequence
                .iter()
                .filter_map(|course_id| catalog.get(course_id))
                .map(|course| course.gain(tag))
                .sum();
            (tag.clone(), (learner.proficiency(tag) + gained).min(1.0))
        })
        .collect()
}

fn log(
    telemetry: Option<&PathingTelemetry>,
    level: LogLevel,
    message: &str,
    fields: serde_json::Value,
) {
    if let Some(telemetry) = telemetry {
        let _ = telemetry.log(level, message, fields);
    }
}

fn cancelled_log(
    err: EngineError,
    telemetry: Option<&PathingTelemetry>,
    learner: &LearnerProfile,
) -> EngineError {
    if matches!(err, EngineError::Cancelled) {
        log(
            telemetry,
            LogLevel::Warn,
            "plan.cancelled",
            json!({ "learner_id": learner.learner_id }),
        );
    }
    err
}
