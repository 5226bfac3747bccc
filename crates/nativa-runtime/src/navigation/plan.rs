#![forbid(unsafe_code)]

//! Transition planning: logical stack diff → native stack operations.
//!
//! The planner compares the current and requested stacks by page identity
//! and emits the smallest sequence of [`StackOp`]s with the animation flags
//! a user expects:
//!
//! | Change | Steps |
//! |--------|-------|
//! | none | none |
//! | initial load (current empty) | `Replace`, not animated |
//! | no common prefix | `Replace`, animated as requested |
//! | one pop | `Pop` |
//! | one push | `Push` |
//! | several pops | `PopTo { depth }` |
//! | several pushes | `Push` each, only the last animated |
//! | pops and pushes | `PopTo` not animated, then pushes, last animated |
//!
//! With [`NavigationPolicy::in_place_edits`], inserting or removing one page
//! below an unchanged top page plans a single non-animated `Insert`/`Remove`.

use nativa_backend::{PageId, StackOp};

use crate::config::NavigationPolicy;

/// One native operation and whether it animates.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlannedStep {
    pub op: StackOp,
    pub animated: bool,
}

impl PlannedStep {
    fn new(op: StackOp, animated: bool) -> Self {
        Self { op, animated }
    }
}

/// Shape of a planned transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlanKind {
    Unchanged,
    Initial,
    Replace,
    Pop,
    Push,
    PopTo,
    PushMany,
    Mixed,
    Insert,
    Remove,
}

/// The native steps that take the current stack to the requested one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionPlan {
    pub kind: PlanKind,
    pub steps: Vec<PlannedStep>,
}

impl TransitionPlan {
    #[must_use]
    pub fn is_unchanged(&self) -> bool {
        self.kind == PlanKind::Unchanged
    }
}

/// Length of the longest common prefix of two stacks.
#[must_use]
pub fn common_prefix_len(current: &[PageId], target: &[PageId]) -> usize {
    current
        .iter()
        .zip(target)
        .take_while(|(a, b)| a == b)
        .count()
}

/// Plan the transition from `current` to `target`.
///
/// `target` must be non-empty and free of duplicates; the manager validates
/// requests before planning.
#[must_use]
pub fn plan_transition(
    current: &[PageId],
    target: &[PageId],
    animated: bool,
    policy: &NavigationPolicy,
) -> TransitionPlan {
    if current == target {
        return TransitionPlan {
            kind: PlanKind::Unchanged,
            steps: Vec::new(),
        };
    }
    if current.is_empty() {
        return TransitionPlan {
            kind: PlanKind::Initial,
            steps: vec![PlannedStep::new(StackOp::Replace(target.to_vec()), false)],
        };
    }
    if policy.in_place_edits {
        if let Some(plan) = plan_in_place(current, target) {
            return plan;
        }
    }

    let prefix = common_prefix_len(current, target);
    let pops = current.len() - prefix;
    let pushes = &target[prefix..];

    if prefix == 0 {
        return TransitionPlan {
            kind: PlanKind::Replace,
            steps: vec![PlannedStep::new(StackOp::Replace(target.to_vec()), animated)],
        };
    }

    match (pops, pushes.len()) {
        (1, 0) => TransitionPlan {
            kind: PlanKind::Pop,
            steps: vec![PlannedStep::new(StackOp::Pop, animated)],
        },
        (0, 1) => TransitionPlan {
            kind: PlanKind::Push,
            steps: vec![PlannedStep::new(StackOp::Push(pushes[0]), animated)],
        },
        (_, 0) => TransitionPlan {
            kind: PlanKind::PopTo,
            steps: vec![PlannedStep::new(StackOp::PopTo { depth: prefix }, animated)],
        },
        (0, _) => TransitionPlan {
            kind: PlanKind::PushMany,
            steps: push_steps(pushes, animated),
        },
        (_, _) => {
            let mut steps = vec![PlannedStep::new(StackOp::PopTo { depth: prefix }, false)];
            steps.extend(push_steps(pushes, animated));
            TransitionPlan {
                kind: PlanKind::Mixed,
                steps,
            }
        }
    }
}

fn push_steps(pages: &[PageId], animated: bool) -> Vec<PlannedStep> {
    let last = pages.len().saturating_sub(1);
    pages
        .iter()
        .enumerate()
        .map(|(i, page)| PlannedStep::new(StackOp::Push(*page), animated && i == last))
        .collect()
}

fn plan_in_place(current: &[PageId], target: &[PageId]) -> Option<TransitionPlan> {
    if current.last() != target.last() {
        return None;
    }
    if target.len() == current.len() + 1 {
        let index = common_prefix_len(current, target);
        let rest_matches = current[index..] == target[index + 1..];
        return rest_matches.then(|| TransitionPlan {
            kind: PlanKind::Insert,
            steps: vec![PlannedStep::new(
                StackOp::Insert {
                    index,
                    page: target[index],
                },
                false,
            )],
        });
    }
    if current.len() == target.len() + 1 {
        let index = common_prefix_len(current, target);
        let rest_matches = current[index + 1..] == target[index..];
        return rest_matches.then(|| TransitionPlan {
            kind: PlanKind::Remove,
            steps: vec![PlannedStep::new(StackOp::Remove { index }, false)],
        });
    }
    None
}
