use crate::analysis::available::kill_mentions;
use crate::analysis::{program_expressions, DataflowAnalysis, Direction, StatementSite};
use crate::cfg::graph::ControlFlowGraph;
use crate::domain::ast::{AtomicStmt, Expr};
use crate::domain::visit::complex_expressions;
use crate::lattice::ReversePowersetLattice;
use std::collections::BTreeSet;

/// Backward must-analysis: complex expressions that will be evaluated on
/// every path from a point before any of their operands change. The mirror
/// image of [`AvailableExpressions`](crate::analysis::AvailableExpressions).
#[derive(Debug, Clone)]
pub struct VeryBusyExpressions {
    lattice: ReversePowersetLattice<Expr>,
}

impl VeryBusyExpressions {
    pub fn new(cfg: &ControlFlowGraph) -> Self {
        Self {
            lattice: ReversePowersetLattice::new(program_expressions(cfg)),
        }
    }
}

impl DataflowAnalysis for VeryBusyExpressions {
    type Lattice = ReversePowersetLattice<Expr>;

    fn lattice(&self) -> &Self::Lattice {
        &self.lattice
    }

    fn direction(&self) -> Direction {
        Direction::Backward
    }

    /// Nothing is evaluated after the program halts.
    fn boundary(&self) -> BTreeSet<Expr> {
        BTreeSet::new()
    }

    fn transfer_statement(
        &self,
        _site: StatementSite,
        stmt: &AtomicStmt,
        mut busy: BTreeSet<Expr>,
    ) -> BTreeSet<Expr> {
        match stmt {
            AtomicStmt::Assign { var, rhs } => {
                kill_mentions(&mut busy, var);
                busy.extend(complex_expressions(rhs));
            }
            AtomicStmt::Output { expr } => busy.extend(complex_expressions(expr)),
        }
        busy
    }

    fn transfer_guard(&self, guard: &Expr, mut busy: BTreeSet<Expr>) -> BTreeSet<Expr> {
        busy.extend(complex_expressions(guard));
        busy
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::analyze;
    use crate::cfg::builder::{build_cfg, Granularity};
    use crate::domain::ast::{Block, Stmt};

    #[test]
    fn test_expression_busy_when_both_branches_compute_it() {
        let a_times_b = Expr::mul(Expr::var("a"), Expr::var("b"));
        // if (input) { x := a * b } else { y := a * b + 1 }
        let program = Block(vec![Stmt::if_else(
            Expr::Input,
            vec![Stmt::assign("x", a_times_b.clone())],
            vec![Stmt::assign("y", Expr::add(a_times_b.clone(), Expr::lit(1)))],
        )]);
        let cfg = build_cfg(&program, Granularity::Atomic);
        let solution = analyze(&VeryBusyExpressions::new(&cfg), &cfg, 1000).unwrap();

        assert_eq!(*solution.before(cfg.entry()).unwrap(), BTreeSet::from([a_times_b]));
    }

    #[test]
    fn test_redefined_operand_is_not_busy() {
        // a := input; x := a * 2
        let program = Block(vec![
            Stmt::assign("a", Expr::Input),
            Stmt::assign("x", Expr::mul(Expr::var("a"), Expr::lit(2))),
        ]);
        let cfg = build_cfg(&program, Granularity::Atomic);
        let solution = analyze(&VeryBusyExpressions::new(&cfg), &cfg, 1000).unwrap();

        assert!(solution.before(cfg.entry()).unwrap().is_empty());
        assert_eq!(solution.after(cfg.entry()).unwrap().len(), 1);
    }
}
