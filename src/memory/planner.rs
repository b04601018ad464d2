use std::collections::HashSet;

use crate::model::{NodeId, Program, ProgramNode};

/// Tensors whose last consuming operator sits at each program position
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeallocationSchedule {
    dead: Vec<Vec<String>>,
}

impl DeallocationSchedule {
    /// Names to free right after the node at `node_id`
    pub fn dead_after(&self, node_id: NodeId) -> &[String] {
        self.dead.get(node_id).map(|names| names.as_slice()).unwrap_or(&[])
    }

    /// Number of program positions covered
    pub fn len(&self) -> usize {
        self.dead.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dead.is_empty()
    }

    /// Total number of scheduled deallocations
    pub fn total(&self) -> usize {
        self.dead.iter().map(|names| names.len()).sum()
    }

    /// Positions paired with the names that die there
    pub fn iter(&self) -> impl Iterator<Item = (NodeId, &[String])> {
        self.dead
            .iter()
            .enumerate()
            .map(|(id, names)| (id, names.as_slice()))
    }
}

/// Computes when each tensor can be released
#[derive(Debug, Clone, Copy, Default)]
pub struct LifetimeScheduler;

impl LifetimeScheduler {
    pub fn new() -> Self {
        Self
    }

    /// Schedule every consumed tensor for deallocation after its last consumer.
    ///
    /// Walks the program backwards; the first time a name is seen as an operator
    /// input it is assigned to that operator. Only tensors that live in the
    /// pipeline (graph inputs and operator outputs) are released. Graph outputs
    /// are revealed after the forward pass and are never scheduled, nor are
    /// layer parameters such as weights. Within a node, names keep their input
    /// order.
    pub fn schedule(&self, program: &Program) -> DeallocationSchedule {
        let mut dead = vec![Vec::new(); program.len()];

        let revealed: HashSet<&str> = program.outputs().map(|t| t.name.as_str()).collect();
        let mut produced: HashSet<&str> = program.inputs().map(|t| t.name.as_str()).collect();
        for (_, op) in program.operators() {
            produced.extend(op.outputs.iter().map(|name| name.as_str()));
        }

        let mut scheduled: HashSet<&str> = HashSet::new();
        for (node_id, node) in program.nodes.iter().enumerate().rev() {
            if let ProgramNode::Operator(op) = node {
                for input in &op.inputs {
                    let name = input.as_str();
                    if !produced.contains(name) || revealed.contains(name) {
                        continue;
                    }
                    if scheduled.insert(name) {
                        dead[node_id].push(input.clone());
                    }
                }
            }
        }

        DeallocationSchedule { dead }
    }
}
