//! Detect members that make a structure contain itself by value.
//!
//! A member is boxed when its target can reach the member's own container by
//! following structure and union members only. Lists and maps already provide
//! heap indirection, so a cycle that passes through one of them stays unboxed.
use std::collections::{BTreeMap, BTreeSet};

use super::{Shape, ShapeId, ShapeKind};

pub(super) fn boxed_members(shapes: &BTreeMap<ShapeId, Shape>) -> BTreeSet<ShapeId> {
    let mut boxed = BTreeSet::new();
    for container in shapes.values() {
        let members = match &container.kind {
            ShapeKind::Structure { members } | ShapeKind::Union { members } => members,
            _ => continue,
        };
        for member_id in members {
            let Some(target) = shapes.get(member_id).and_then(Shape::member_target) else {
                continue;
            };
            let mut seen = BTreeSet::new();
            if reaches_by_value(shapes, target, &container.id, &mut seen) {
                boxed.insert(member_id.clone());
            }
        }
    }
    boxed
}

fn reaches_by_value(
    shapes: &BTreeMap<ShapeId, Shape>,
    from: &ShapeId,
    goal: &ShapeId,
    seen: &mut BTreeSet<ShapeId>,
) -> bool {
    if from == goal {
        return true;
    }
    if !seen.insert(from.clone()) {
        return false;
    }
    let members = match shapes.get(from).map(|s| &s.kind) {
        Some(ShapeKind::Structure { members }) | Some(ShapeKind::Union { members }) => members,
        _ => return false,
    };
    members.iter().any(|member_id| {
        shapes
            .get(member_id)
            .and_then(Shape::member_target)
            .is_some_and(|target| reaches_by_value(shapes, target, goal, seen))
    })
}
