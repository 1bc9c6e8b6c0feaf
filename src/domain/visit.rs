use crate::domain::ast::{AtomicStmt, Block, Expr, Stmt};
use std::collections::BTreeSet;

/// Bottom-up fold over an expression tree.
///
/// Implementors only describe how each node combines the values of its
/// children; [`ExprFold::fold`] does the traversal.
pub trait ExprFold {
    type Output;

    fn literal(&self, value: i64) -> Self::Output;
    fn var(&self, name: &str) -> Self::Output;
    fn input(&self) -> Self::Output;
    fn add(&self, lhs: Self::Output, rhs: Self::Output) -> Self::Output;
    fn multiply(&self, lhs: Self::Output, rhs: Self::Output) -> Self::Output;

    fn fold(&self, expr: &Expr) -> Self::Output {
        match expr {
            Expr::Literal { value } => self.literal(*value),
            Expr::Var { name } => self.var(name),
            Expr::Input => self.input(),
            Expr::Add { lhs, rhs } => {
                let lhs = self.fold(lhs);
                let rhs = self.fold(rhs);
                self.add(lhs, rhs)
            }
            Expr::Multiply { lhs, rhs } => {
                let lhs = self.fold(lhs);
                let rhs = self.fold(rhs);
                self.multiply(lhs, rhs)
            }
        }
    }
}

struct Variables;

impl ExprFold for Variables {
    type Output = BTreeSet<String>;

    fn literal(&self, _value: i64) -> Self::Output {
        BTreeSet::new()
    }

    fn var(&self, name: &str) -> Self::Output {
        BTreeSet::from([name.to_string()])
    }

    fn input(&self) -> Self::Output {
        BTreeSet::new()
    }

    fn add(&self, mut lhs: Self::Output, rhs: Self::Output) -> Self::Output {
        lhs.extend(rhs);
        lhs
    }

    fn multiply(&self, lhs: Self::Output, rhs: Self::Output) -> Self::Output {
        self.add(lhs, rhs)
    }
}

/// Variables read by an expression.
pub fn expression_variables(expr: &Expr) -> BTreeSet<String> {
    Variables.fold(expr)
}

/// Variables mentioned by an atomic statement, the assigned one included.
pub fn atomic_statement_variables(stmt: &AtomicStmt) -> BTreeSet<String> {
    match stmt {
        AtomicStmt::Assign { var, rhs } => {
            let mut vars = expression_variables(rhs);
            vars.insert(var.clone());
            vars
        }
        AtomicStmt::Output { expr } => expression_variables(expr),
    }
}

/// Variables mentioned anywhere in a statement, nested blocks and guards included.
pub fn statement_variables(stmt: &Stmt) -> BTreeSet<String> {
    match stmt {
        Stmt::Assign { var, rhs } => {
            let mut vars = expression_variables(rhs);
            vars.insert(var.clone());
            vars
        }
        Stmt::Output { expr } => expression_variables(expr),
        Stmt::If {
            guard,
            then_branch,
            else_branch,
        } => {
            let mut vars = expression_variables(guard);
            vars.extend(block_variables(then_branch));
            vars.extend(block_variables(else_branch));
            vars
        }
        Stmt::While { guard, body } => {
            let mut vars = expression_variables(guard);
            vars.extend(block_variables(body));
            vars
        }
    }
}

pub fn block_variables(block: &Block) -> BTreeSet<String> {
    block.statements().iter().flat_map(statement_variables).collect()
}

/// Every `Add`/`Multiply` node of an expression, nested ones included.
pub fn complex_expressions(expr: &Expr) -> BTreeSet<Expr> {
    let mut found = BTreeSet::new();
    collect_complex(expr, &mut found);
    found
}

fn collect_complex(expr: &Expr, found: &mut BTreeSet<Expr>) {
    match expr {
        Expr::Add { lhs, rhs } | Expr::Multiply { lhs, rhs } => {
            found.insert(expr.clone());
            collect_complex(lhs, found);
            collect_complex(rhs, found);
        }
        Expr::Literal { .. } | Expr::Var { .. } | Expr::Input => {}
    }
}

pub fn atomic_complex_expressions(stmt: &AtomicStmt) -> BTreeSet<Expr> {
    match stmt {
        AtomicStmt::Assign { rhs, .. } => complex_expressions(rhs),
        AtomicStmt::Output { expr } => complex_expressions(expr),
    }
}
