use crate::domain::ast::{AtomicStmt, Expr};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::fmt;

pub type BlockId = usize;

/// How control leaves a basic block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Jump {
    Halt,
    Goto(BlockId),
    Branch {
        guard: Expr,
        then_target: BlockId,
        else_target: BlockId,
    },
}

impl Jump {
    /// Every block control may continue in.
    pub fn targets(&self) -> Vec<BlockId> {
        match self {
            Jump::Halt => Vec::new(),
            Jump::Goto(target) => vec![*target],
            Jump::Branch {
                then_target,
                else_target,
                ..
            } if then_target == else_target => vec![*then_target],
            Jump::Branch {
                then_target,
                else_target,
                ..
            } => vec![*then_target, *else_target],
        }
    }

    pub fn guard(&self) -> Option<&Expr> {
        match self {
            Jump::Branch { guard, .. } => Some(guard),
            Jump::Halt | Jump::Goto(_) => None,
        }
    }

    /// Rewrites every target through `subst`, following chains.
    pub fn redirect(&mut self, subst: &HashMap<BlockId, BlockId>) {
        match self {
            Jump::Halt => {}
            Jump::Goto(target) => *target = final_target(subst, *target),
            Jump::Branch {
                then_target,
                else_target,
                ..
            } => {
                *then_target = final_target(subst, *then_target);
                *else_target = final_target(subst, *else_target);
            }
        }
    }
}

/// Follows `subst` from `target`; stops when a chain loops back on itself.
pub(crate) fn final_target(subst: &HashMap<BlockId, BlockId>, target: BlockId) -> BlockId {
    let mut seen = HashSet::new();
    let mut current = target;
    while let Some(&next) = subst.get(&current) {
        if !seen.insert(current) {
            break;
        }
        current = next;
    }
    current
}

impl fmt::Display for Jump {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Jump::Halt => write!(f, "halt"),
            Jump::Goto(target) => write!(f, "goto {}", target),
            Jump::Branch {
                guard,
                then_target,
                else_target,
            } => write!(
                f,
                "if ({}) then goto {} else goto {}",
                guard, then_target, else_target
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicBlock {
    pub id: BlockId,
    pub statements: Vec<AtomicStmt>,
    pub jump: Jump,
}

impl fmt::Display for BasicBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for stmt in &self.statements {
            writeln!(f, "{};", stmt)?;
        }
        write!(f, "{}", self.jump)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ControlFlowGraph {
    next_id: BlockId,
    entry: BlockId,
    blocks: BTreeMap<BlockId, BasicBlock>,
}

impl ControlFlowGraph {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_block_id(&mut self) -> BlockId {
        let id = self.next_id;
        self.next_id += 1;
        id
    }

    pub fn create_block(&mut self, statements: Vec<AtomicStmt>, jump: Jump) -> BlockId {
        let id = self.fresh_block_id();
        self.blocks.insert(
            id,
            BasicBlock {
                id,
                statements,
                jump,
            },
        );
        id
    }

    pub fn entry(&self) -> BlockId {
        self.entry
    }

    pub fn set_entry(&mut self, id: BlockId) {
        self.entry = id;
    }

    pub fn block(&self, id: BlockId) -> Option<&BasicBlock> {
        self.blocks.get(&id)
    }

    pub(crate) fn block_mut(&mut self, id: BlockId) -> Option<&mut BasicBlock> {
        self.blocks.get_mut(&id)
    }

    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    pub fn block_ids(&self) -> impl Iterator<Item = BlockId> + '_ {
        self.blocks.keys().copied()
    }

    /// Blocks in descending id order: the order construction finishes them,
    /// which puts the entry block near the top.
    pub fn blocks(&self) -> Vec<&BasicBlock> {
        self.blocks.values().rev().collect()
    }

    pub fn successors(&self, id: BlockId) -> Vec<BlockId> {
        self.blocks
            .get(&id)
            .map(|block| block.jump.targets())
            .unwrap_or_default()
    }

    pub fn predecessors(&self) -> BTreeMap<BlockId, BTreeSet<BlockId>> {
        let mut preds: BTreeMap<BlockId, BTreeSet<BlockId>> =
            self.blocks.keys().map(|id| (*id, BTreeSet::new())).collect();
        for block in self.blocks.values() {
            for target in block.jump.targets() {
                preds.entry(target).or_default().insert(block.id);
            }
        }
        preds
    }

    pub fn exit_blocks(&self) -> Vec<BlockId> {
        self.blocks
            .values()
            .filter(|block| block.jump == Jump::Halt)
            .map(|block| block.id)
            .collect()
    }

    /// True when no block holds more than one statement.
    pub fn is_atomic(&self) -> bool {
        self.blocks.values().all(|block| block.statements.len() <= 1)
    }

    pub fn statements(&self) -> impl Iterator<Item = &AtomicStmt> + '_ {
        self.blocks.values().flat_map(|block| block.statements.iter())
    }

    pub fn guards(&self) -> impl Iterator<Item = &Expr> + '_ {
        self.blocks.values().filter_map(|block| block.jump.guard())
    }

    /// Removes empty blocks that only jump somewhere else and points their
    /// predecessors (and the entry) at the final destination.
    pub fn simplify(&mut self) {
        let subst: HashMap<BlockId, BlockId> = self
            .blocks
            .values()
            .filter_map(|block| match block.jump {
                Jump::Goto(target) if block.statements.is_empty() && target != block.id => {
                    Some((block.id, target))
                }
                _ => None,
            })
            .collect();

        if subst.is_empty() {
            return;
        }

        for block in self.blocks.values_mut() {
            block.jump.redirect(&subst);
        }
        self.entry = final_target(&subst, self.entry);

        let removed: Vec<BlockId> = subst
            .keys()
            .copied()
            .filter(|id| *id != self.entry)
            .collect();
        for id in &removed {
            self.blocks.remove(id);
        }

        tracing::debug!("simplify removed {} empty jump blocks", removed.len());
    }
}

impl fmt::Display for ControlFlowGraph {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for block in self.blocks() {
            write!(f, "{}\n{}\n\n", block.id, block)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jump_targets() {
        assert!(Jump::Halt.targets().is_empty());
        assert_eq!(Jump::Goto(4).targets(), vec![4]);

        let branch = Jump::Branch {
            guard: Expr::var("c"),
            then_target: 1,
            else_target: 2,
        };
        assert_eq!(branch.targets(), vec![1, 2]);
        assert_eq!(branch.to_string(), "if (c) then goto 1 else goto 2");
    }

    #[test]
    fn test_final_target_follows_chains_and_stops_on_cycles() {
        let chain = HashMap::from([(1, 2), (2, 3)]);
        assert_eq!(final_target(&chain, 1), 3);
        assert_eq!(final_target(&chain, 7), 7);

        let cycle = HashMap::from([(1, 2), (2, 1)]);
        let end = final_target(&cycle, 1);
        assert!(end == 1 || end == 2);
    }

    #[test]
    fn test_simplify_removes_empty_gotos() {
        let mut cfg = ControlFlowGraph::new();
        let exit = cfg.create_block(
            vec![AtomicStmt::Output {
                expr: Expr::var("x"),
            }],
            Jump::Halt,
        );
        let hop = cfg.create_block(Vec::new(), Jump::Goto(exit));
        let entry = cfg.create_block(Vec::new(), Jump::Goto(hop));
        cfg.set_entry(entry);

        cfg.simplify();

        assert_eq!(cfg.len(), 1);
        assert_eq!(cfg.entry(), exit);
        assert_eq!(cfg.to_string(), "0\noutput(x);\nhalt\n\n");
    }

    #[test]
    fn test_predecessors_and_exits() {
        let mut cfg = ControlFlowGraph::new();
        let exit = cfg.create_block(Vec::new(), Jump::Halt);
        let left = cfg.create_block(Vec::new(), Jump::Goto(exit));
        let right = cfg.create_block(Vec::new(), Jump::Goto(exit));
        let head = cfg.create_block(
            Vec::new(),
            Jump::Branch {
                guard: Expr::Input,
                then_target: left,
                else_target: right,
            },
        );
        cfg.set_entry(head);

        let preds = cfg.predecessors();
        assert_eq!(preds[&exit], BTreeSet::from([left, right]));
        assert!(preds[&head].is_empty());
        assert_eq!(cfg.exit_blocks(), vec![exit]);
        assert_eq!(cfg.successors(head), vec![left, right]);
    }
}
