use petgraph::Direction;
use petgraph::algo::toposort;
use petgraph::graph::{DiGraph, NodeIndex};
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("prerequisite cycle detected involving topic {topic_id}")]
pub struct PrerequisiteCycle {
    pub topic_id: i32,
}

/// Prerequisite graph over a set of topics; edges run prerequisite -> dependent.
pub struct PrerequisiteDag {
    pub graph: DiGraph<i32, ()>,
    pub id_to_index: HashMap<i32, NodeIndex>,
}

impl PrerequisiteDag {
    /// Builds the graph for `topics` (id, prerequisites). Prerequisites outside the set are ignored.
    pub fn build<'t, I>(topics: I) -> Self
    where
        I: IntoIterator<Item = (i32, &'t [i32])>,
    {
        let topics: Vec<(i32, &[i32])> = topics.into_iter().collect();
        let mut graph: DiGraph<i32, ()> = DiGraph::new();
        let mut id_to_index: HashMap<i32, NodeIndex> = HashMap::new();

        // Add nodes first
        for (topic_id, _) in &topics {
            let node_ix = graph.add_node(*topic_id);
            id_to_index.insert(*topic_id, node_ix);
        }

        for (topic_id, prerequisites) in &topics {
            for prereq in prerequisites.iter() {
                if let (Some(&u), Some(&v)) = (id_to_index.get(prereq), id_to_index.get(topic_id))
                {
                    graph.update_edge(u, v, ());
                }
            }
        }

        Self { graph, id_to_index }
    }

    pub fn check_acyclic(&self) -> Result<(), PrerequisiteCycle> {
        toposort(&self.graph, None)
            .map(|_| ())
            .map_err(|cycle| PrerequisiteCycle {
                topic_id: self.graph[cycle.node_id()],
            })
    }

    /// Topological order where, among topics whose prerequisites are done, the
    /// lowest `rank` goes first.
    pub fn study_order(&self, rank: &HashMap<i32, usize>) -> Result<Vec<i32>, PrerequisiteCycle> {
        self.check_acyclic()?;

        let mut in_degree: HashMap<NodeIndex, usize> = self
            .graph
            .node_indices()
            .map(|ix| {
                let degree = self
                    .graph
                    .neighbors_directed(ix, Direction::Incoming)
                    .count();
                (ix, degree)
            })
            .collect();

        let rank_of = |ix: NodeIndex| {
            let topic_id = self.graph[ix];
            (rank.get(&topic_id).copied().unwrap_or(usize::MAX), topic_id)
        };

        let mut ready: BinaryHeap<Reverse<(usize, i32, NodeIndex)>> = BinaryHeap::new();
        for (ix, degree) in &in_degree {
            if *degree == 0 {
                let (r, id) = rank_of(*ix);
                ready.push(Reverse((r, id, *ix)));
            }
        }

        let mut order = Vec::with_capacity(self.graph.node_count());
        while let Some(Reverse((_, topic_id, ix))) = ready.pop() {
            order.push(topic_id);
            for next in self.graph.neighbors_directed(ix, Direction::Outgoing) {
                if let Some(degree) = in_degree.get_mut(&next) {
                    *degree -= 1;
                    if *degree == 0 {
                        let (r, id) = rank_of(next);
                        ready.push(Reverse((r, id, next)));
                    }
                }
            }
        }
        Ok(order)
    }

    /// Direct prerequisites of `topic_id` that are part of this graph.
    pub fn prerequisites_of(&self, topic_id: i32) -> Vec<i32> {
        let Some(&ix) = self.id_to_index.get(&topic_id) else {
            return Vec::new();
        };
        let mut prereqs: Vec<i32> = self
            .graph
            .neighbors_directed(ix, Direction::Incoming)
            .map(|n| self.graph[n])
            .collect();
        prereqs.sort_unstable();
        prereqs
    }
}
