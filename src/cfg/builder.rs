use crate::cfg::graph::{BlockId, ControlFlowGraph, Jump};
use crate::domain::ast::{AtomicStmt, Block, Stmt};
use serde::{Deserialize, Serialize};
use std::fmt;

/// How many statements a CFG block may hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum Granularity {
    /// Maximal straight-line blocks.
    Basic,
    /// At most one statement per block.
    Atomic,
}

impl Granularity {
    pub const NAMES: [&'static str; 2] = ["basic", "atomic"];

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "basic" => Some(Granularity::Basic),
            "atomic" => Some(Granularity::Atomic),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Granularity::Basic => "basic",
            Granularity::Atomic => "atomic",
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Builds the control-flow graph of `program`.
///
/// Construction runs backwards from a single `halt` block: each statement is
/// handed the block control continues in and returns the block where it
/// starts. Empty forwarding blocks are folded away at the end.
pub fn build_cfg(program: &Block, granularity: Granularity) -> ControlFlowGraph {
    let mut builder = CfgBuilder {
        cfg: ControlFlowGraph::new(),
        granularity,
    };

    let exit = builder.cfg.create_block(Vec::new(), Jump::Halt);
    let entry = builder.process_block(program, exit);
    builder.cfg.set_entry(entry);
    builder.cfg.simplify();

    tracing::debug!(
        "built {} CFG with {} blocks, entry {}",
        granularity,
        builder.cfg.len(),
        builder.cfg.entry()
    );
    builder.cfg
}

struct CfgBuilder {
    cfg: ControlFlowGraph,
    granularity: Granularity,
}

impl CfgBuilder {
    fn process_block(&mut self, block: &Block, next: BlockId) -> BlockId {
        let mut current = next;
        for stmt in block.statements().iter().rev() {
            let start = self.process_statement(stmt, current);
            current = match self.granularity {
                Granularity::Basic => start,
                Granularity::Atomic => self.cfg.create_block(Vec::new(), Jump::Goto(start)),
            };
        }
        current
    }

    fn process_statement(&mut self, stmt: &Stmt, next: BlockId) -> BlockId {
        match stmt {
            Stmt::Assign { var, rhs } => self.prepend(
                next,
                AtomicStmt::Assign {
                    var: var.clone(),
                    rhs: rhs.clone(),
                },
            ),
            Stmt::Output { expr } => self.prepend(next, AtomicStmt::Output { expr: expr.clone() }),
            Stmt::If {
                guard,
                then_branch,
                else_branch,
            } => {
                let then_in = self.cfg.create_block(Vec::new(), Jump::Goto(next));
                let then_start = self.process_block(then_branch, then_in);

                let else_in = self.cfg.create_block(Vec::new(), Jump::Goto(next));
                let else_start = self.process_block(else_branch, else_in);

                self.cfg.create_block(
                    Vec::new(),
                    Jump::Branch {
                        guard: guard.clone(),
                        then_target: then_start,
                        else_target: else_start,
                    },
                )
            }
            Stmt::While { guard, body } => {
                // head 先建立，迴圈本體才能跳回來
                let head = self.cfg.create_block(Vec::new(), Jump::Halt);
                let body_in = self.cfg.create_block(Vec::new(), Jump::Goto(head));
                let body_start = self.process_block(body, body_in);

                if let Some(head_block) = self.cfg.block_mut(head) {
                    head_block.jump = Jump::Branch {
                        guard: guard.clone(),
                        then_target: body_start,
                        else_target: next,
                    };
                }

                // statements before the loop must not re-run on the back edge
                self.cfg.create_block(Vec::new(), Jump::Goto(head))
            }
        }
    }

    fn prepend(&mut self, block: BlockId, stmt: AtomicStmt) -> BlockId {
        if let Some(target) = self.cfg.block_mut(block) {
            target.statements.insert(0, stmt);
        }
        block
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::ast::Expr;

    fn countdown() -> Block {
        Block(vec![
            Stmt::assign("x", Expr::Input),
            Stmt::while_loop(
                Expr::var("x"),
                vec![Stmt::assign("x", Expr::add(Expr::var("x"), Expr::lit(-1)))],
            ),
            Stmt::output(Expr::var("x")),
        ])
    }

    #[test]
    fn test_empty_program_is_single_halt_block() {
        let cfg = build_cfg(&Block::default(), Granularity::Atomic);
        assert_eq!(cfg.len(), 1);
        assert_eq!(cfg.entry(), 0);
        assert_eq!(cfg.to_string(), "0\nhalt\n\n");
    }

    #[test]
    fn test_straight_line_basic_block() {
        let program = Block(vec![
            Stmt::assign("x", Expr::lit(1)),
            Stmt::assign("y", Expr::var("x")),
            Stmt::output(Expr::var("y")),
        ]);

        let cfg = build_cfg(&program, Granularity::Basic);
        assert_eq!(cfg.len(), 1);
        assert_eq!(cfg.to_string(), "0\nx := 1;\ny := x;\noutput(y);\nhalt\n\n");

        let atomic = build_cfg(&program, Granularity::Atomic);
        assert_eq!(atomic.len(), 3);
        assert!(atomic.is_atomic());
    }

    #[test]
    fn test_while_loop_has_back_edge() {
        let cfg = build_cfg(&countdown(), Granularity::Atomic);
        assert_eq!(cfg.len(), 4);

        let entry = cfg.block(cfg.entry()).unwrap();
        assert_eq!(entry.statements[0].to_string(), "x := input");

        let head = match entry.jump {
            Jump::Goto(head) => head,
            ref other => panic!("unexpected entry jump {:?}", other),
        };
        let (body, exit) = match &cfg.block(head).unwrap().jump {
            Jump::Branch {
                then_target,
                else_target,
                ..
            } => (*then_target, *else_target),
            other => panic!("loop head should branch, got {:?}", other),
        };

        assert_eq!(cfg.successors(body), vec![head]);
        assert_eq!(cfg.block(exit).unwrap().jump, Jump::Halt);
        assert_eq!(cfg.block(exit).unwrap().statements[0].to_string(), "output(x)");
    }

    #[test]
    fn test_statements_before_loop_stay_out_of_head() {
        let cfg = build_cfg(&countdown(), Granularity::Basic);

        let heads: Vec<_> = cfg
            .blocks()
            .into_iter()
            .filter(|block| matches!(block.jump, Jump::Branch { .. }))
            .collect();
        assert_eq!(heads.len(), 1);
        assert!(heads[0].statements.is_empty());
    }

    #[test]
    fn test_granularity_names() {
        for name in Granularity::NAMES {
            assert_eq!(Granularity::from_name(name).unwrap().name(), name);
        }
        assert!(Granularity::from_name("huge").is_none());
    }
}
