//! Brick-level view of the link graph.

use std::collections::{HashSet, VecDeque};

use super::world::{BrickId, BrickWorld};
use crate::connectivity::connection::SlotRef;

impl BrickWorld {
    /// Bricks directly linked to `brick`, in no particular order.
    fn neighbours(&self, brick: BrickId) -> HashSet<BrickId> {
        self.brick_fields(brick)
            .into_iter()
            .filter_map(|field| self.field(field))
            .flat_map(|f| f.links().map(|(_, partner)| partner.field).collect::<Vec<_>>())
            .filter_map(|field| self.brick_of_field(field))
            .filter(|&b| b != brick)
            .collect()
    }

    /// Bricks linked to `root`. With `recursive`, everything reachable through
    /// any chain of links. `root` itself is never included, even on a cycle.
    pub fn connected_bricks(&self, root: BrickId, recursive: bool) -> HashSet<BrickId> {
        if !recursive {
            return self.neighbours(root);
        }

        let mut visited = HashSet::new();
        visited.insert(root);
        let mut queue = VecDeque::new();
        queue.push_back(root);

        while let Some(brick) = queue.pop_front() {
            for neighbour in self.neighbours(brick) {
                if visited.insert(neighbour) {
                    queue.push_back(neighbour);
                }
            }
        }

        visited.remove(&root);
        visited
    }

    /// Partition every brick into connected groups. Groups come out in the
    /// order of their first brick; an unlinked brick is a group of one.
    pub fn connected_components(&self) -> Vec<HashSet<BrickId>> {
        let mut seen = HashSet::new();
        let mut components = Vec::new();

        for start in self.brick_ids() {
            if seen.contains(&start) {
                continue;
            }
            let mut component = self.connected_bricks(start, true);
            component.insert(start);
            seen.extend(component.iter().copied());
            components.push(component);
        }
        components
    }

    /// Every link once, as `(lower, higher)` slot pairs.
    pub fn links(&self) -> impl Iterator<Item = (SlotRef, SlotRef)> + '_ {
        self.fields_with_ids().flat_map(|(id, field)| {
            field
                .links()
                .map(move |(index, partner)| (SlotRef::new(id, index), partner))
                .filter(|(own, partner)| own < partner)
        })
    }

    pub fn link_count(&self) -> usize {
        self.links().count()
    }
}
