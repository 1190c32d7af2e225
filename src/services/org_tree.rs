//! Org unit hierarchy as an index arena
//!
//! Units reference their parent by id only. The tree is rebuilt from those
//! ids whenever it is needed, so there are no live back-pointers to keep in
//! sync.

use std::collections::HashMap;
use uuid::Uuid;

use crate::domain::OrgUnit;

#[derive(Debug)]
struct Node {
    unit: OrgUnit,
    parent: Option<usize>,
    children: Vec<usize>,
}

#[derive(Debug, Default)]
pub struct OrgTree {
    nodes: Vec<Node>,
    index: HashMap<Uuid, usize>,
}

impl OrgTree {
    /// Build from the units of one organization. A parent id that is not
    /// among `units` leaves the unit detached (treated as a root).
    pub fn build(units: Vec<OrgUnit>) -> Self {
        let index: HashMap<Uuid, usize> = units
            .iter()
            .enumerate()
            .map(|(i, unit)| (unit.id, i))
            .collect();

        let mut nodes: Vec<Node> = units
            .into_iter()
            .map(|unit| Node {
                parent: unit.parent_org_unit_id.and_then(|p| index.get(&p).copied()),
                unit,
                children: Vec::new(),
            })
            .collect();

        for i in 0..nodes.len() {
            if let Some(parent) = nodes[i].parent {
                nodes[parent].children.push(i);
            }
        }

        Self { nodes, index }
    }

    /// Direct children in insertion order
    pub fn children(&self, id: Uuid) -> Vec<&OrgUnit> {
        self.index
            .get(&id)
            .map(|&i| {
                self.nodes[i]
                    .children
                    .iter()
                    .map(|&c| &self.nodes[c].unit)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Parent chain from the nearest ancestor up to the root
    pub fn ancestors(&self, id: Uuid) -> Vec<&OrgUnit> {
        let mut chain = Vec::new();
        let Some(&start) = self.index.get(&id) else {
            return chain;
        };

        let mut current = self.nodes[start].parent;
        // A corrupt chain can loop; never walk more steps than there are nodes
        while let Some(i) = current {
            if chain.len() >= self.nodes.len() || i == start {
                break;
            }
            chain.push(&self.nodes[i].unit);
            current = self.nodes[i].parent;
        }
        chain
    }

    /// Every unit below `id`, breadth first
    pub fn descendants(&self, id: Uuid) -> Vec<&OrgUnit> {
        let mut out = Vec::new();
        let Some(&start) = self.index.get(&id) else {
            return out;
        };

        let mut seen = vec![false; self.nodes.len()];
        seen[start] = true;
        let mut queue = std::collections::VecDeque::from([start]);
        while let Some(i) = queue.pop_front() {
            for &c in &self.nodes[i].children {
                if !seen[c] {
                    seen[c] = true;
                    out.push(&self.nodes[c].unit);
                    queue.push_back(c);
                }
            }
        }
        out
    }

    /// Whether making `new_parent` the parent of `unit` would put `unit` in its own parent chain
    pub fn would_cycle(&self, unit: Uuid, new_parent: Uuid) -> bool {
        if unit == new_parent {
            return true;
        }
        let Some(&start) = self.index.get(&new_parent) else {
            return false;
        };

        let mut current = Some(start);
        let mut steps = 0;
        while let Some(i) = current {
            if self.nodes[i].unit.id == unit {
                return true;
            }
            steps += 1;
            if steps > self.nodes.len() {
                // Existing data already loops
                return true;
            }
            current = self.nodes[i].parent;
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn unit(id: Uuid, parent: Option<Uuid>) -> OrgUnit {
        OrgUnit {
            id,
            organization_id: Uuid::nil(),
            parent_org_unit_id: parent,
            name: id.to_string(),
            description: None,
            additional_attributes: serde_json::json!({}),
            created_at: Utc::now(),
        }
    }

    /// root -> a -> b, root -> c
    fn sample() -> (OrgTree, [Uuid; 4]) {
        let ids = [Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4()];
        let [root, a, b, c] = ids;
        let tree = OrgTree::build(vec![
            unit(root, None),
            unit(a, Some(root)),
            unit(b, Some(a)),
            unit(c, Some(root)),
        ]);
        (tree, ids)
    }

    #[test]
    fn children_in_insertion_order() {
        let (tree, [root, a, b, c]) = sample();
        let kids: Vec<Uuid> = tree.children(root).iter().map(|u| u.id).collect();
        assert_eq!(kids, vec![a, c]);
        assert!(tree.children(b).is_empty());
        assert!(tree.children(Uuid::new_v4()).is_empty());
    }

    #[test]
    fn ancestors_are_nearest_first() {
        let (tree, [root, a, b, _c]) = sample();
        let chain: Vec<Uuid> = tree.ancestors(b).iter().map(|u| u.id).collect();
        assert_eq!(chain, vec![a, root]);
        assert!(tree.ancestors(root).is_empty());
    }

    #[test]
    fn descendants_cover_the_subtree() {
        let (tree, [root, a, b, c]) = sample();
        let below: Vec<Uuid> = tree.descendants(root).iter().map(|u| u.id).collect();
        assert_eq!(below, vec![a, c, b]);
        assert_eq!(tree.descendants(a).len(), 1);
    }

    #[test]
    fn self_parent_is_a_cycle() {
        let (tree, [_root, a, _b, _c]) = sample();
        assert!(tree.would_cycle(a, a));
    }

    #[test]
    fn reparenting_under_a_descendant_is_a_cycle() {
        let (tree, [root, a, b, c]) = sample();
        assert!(tree.would_cycle(root, b));
        assert!(tree.would_cycle(a, b));
        assert!(!tree.would_cycle(b, c));
        assert!(!tree.would_cycle(c, a));
    }

    #[test]
    fn corrupt_loops_do_not_hang() {
        let (x, y) = (Uuid::new_v4(), Uuid::new_v4());
        let tree = OrgTree::build(vec![unit(x, Some(y)), unit(y, Some(x))]);
        assert_eq!(tree.ancestors(x).len(), 1);
        assert!(tree.would_cycle(Uuid::new_v4(), x));
    }
}
