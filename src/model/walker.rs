use std::collections::BTreeSet;

use super::{Model, Shape, ShapeId, ShapeKind};

/// Depth-first, declaration-ordered traversal of everything reachable from a
/// shape. Each shape is yielded once, cycles included.
pub struct Walker<'a> {
    model: &'a Model,
}

impl<'a> Walker<'a> {
    pub fn new(model: &'a Model) -> Self {
        Self { model }
    }

    pub fn walk_shapes(&self, root: &'a Shape) -> Vec<&'a Shape> {
        let mut seen = BTreeSet::<&ShapeId>::new();
        let mut out = Vec::new();
        let mut stack = vec![root];
        while let Some(shape) = stack.pop() {
            if !seen.insert(&shape.id) {
                continue;
            }
            out.push(shape);
            // push in reverse so the first neighbour is visited first
            for next in self.neighbours(shape).into_iter().rev() {
                if !seen.contains(&next.id) {
                    stack.push(next);
                }
            }
        }
        out
    }

    fn neighbours(&self, shape: &'a Shape) -> Vec<&'a Shape> {
        let ids: Vec<&ShapeId> = match &shape.kind {
            ShapeKind::Member { target } => vec![target],
            ShapeKind::Operation { input, output, errors } => {
                input.iter().chain(output.iter()).chain(errors.iter()).collect()
            }
            ShapeKind::Service { operations, .. } => operations.iter().collect(),
            _ => shape.member_ids(),
        };
        ids.into_iter().map(|id| self.model.shape(id)).collect()
    }
}
