//! Syntax of the while-language analysed by this crate.
//!
//! Programs are trees of [`Stmt`] over integer [`Expr`]essions. They are
//! usually loaded from JSON, where every node carries a `"kind"` tag.

use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Expr {
    Literal { value: i64 },
    Var { name: String },
    /// A value read from the environment at run time.
    Input,
    Add { lhs: Box<Expr>, rhs: Box<Expr> },
    Multiply { lhs: Box<Expr>, rhs: Box<Expr> },
}

impl Expr {
    pub fn lit(value: i64) -> Self {
        Expr::Literal { value }
    }

    pub fn var(name: impl Into<String>) -> Self {
        Expr::Var { name: name.into() }
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Self {
        Expr::Add {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }

    pub fn mul(lhs: Expr, rhs: Expr) -> Self {
        Expr::Multiply {
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Literal { value } => write!(f, "{}", value),
            Expr::Var { name } => write!(f, "{}", name),
            Expr::Input => write!(f, "input"),
            Expr::Add { lhs, rhs } => write!(f, "({} + {})", lhs, rhs),
            Expr::Multiply { lhs, rhs } => write!(f, "({} * {})", lhs, rhs),
        }
    }
}

/// Statements that never transfer control; the only ones a CFG block holds.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AtomicStmt {
    Assign { var: String, rhs: Expr },
    Output { expr: Expr },
}

impl fmt::Display for AtomicStmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AtomicStmt::Assign { var, rhs } => write!(f, "{} := {}", var, rhs),
            AtomicStmt::Output { expr } => write!(f, "output({})", expr),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Stmt {
    Assign {
        var: String,
        rhs: Expr,
    },
    Output {
        expr: Expr,
    },
    If {
        guard: Expr,
        then_branch: Block,
        else_branch: Block,
    },
    While {
        guard: Expr,
        body: Block,
    },
}

impl Stmt {
    pub fn assign(var: impl Into<String>, rhs: Expr) -> Self {
        Stmt::Assign {
            var: var.into(),
            rhs,
        }
    }

    pub fn output(expr: Expr) -> Self {
        Stmt::Output { expr }
    }

    pub fn if_else(guard: Expr, then_branch: Vec<Stmt>, else_branch: Vec<Stmt>) -> Self {
        Stmt::If {
            guard,
            then_branch: Block(then_branch),
            else_branch: Block(else_branch),
        }
    }

    pub fn while_loop(guard: Expr, body: Vec<Stmt>) -> Self {
        Stmt::While {
            guard,
            body: Block(body),
        }
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Assign { var, rhs } => write!(f, "{} := {}", var, rhs),
            Stmt::Output { expr } => write!(f, "output({})", expr),
            Stmt::If {
                guard,
                then_branch,
                else_branch,
            } => write!(
                f,
                "if ({}) then {{\n{}\n}} else {{\n{}\n}}",
                guard, then_branch, else_branch
            ),
            Stmt::While { guard, body } => write!(f, "while ({}) {{\n{}\n}}", guard, body),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Block(pub Vec<Stmt>);

impl Block {
    pub fn statements(&self) -> &[Stmt] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Vec<Stmt>> for Block {
    fn from(statements: Vec<Stmt>) -> Self {
        Block(statements)
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, stmt) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str(";\n")?;
            }
            write!(f, "{}", stmt)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Program {
    #[serde(default = "Program::default_name")]
    pub name: String,
    pub body: Block,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProgramFile {
    Named(Program),
    Bare(Block),
}

impl Program {
    pub fn new(name: impl Into<String>, body: Vec<Stmt>) -> Self {
        Self {
            name: name.into(),
            body: Block(body),
        }
    }

    fn default_name() -> String {
        "program".to_string()
    }

    /// Parses either `{"name": .., "body": [..]}` or a bare statement array.
    pub fn from_json_str(content: &str) -> serde_json::Result<Self> {
        Ok(match serde_json::from_str::<ProgramFile>(content)? {
            ProgramFile::Named(program) => program,
            ProgramFile::Bare(body) => Program {
                name: Self::default_name(),
                body,
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_source_syntax() {
        let stmt = Stmt::if_else(
            Expr::var("c"),
            vec![Stmt::assign("y", Expr::add(Expr::var("x"), Expr::lit(1)))],
            vec![Stmt::output(Expr::mul(Expr::Input, Expr::lit(-2)))],
        );

        assert_eq!(
            stmt.to_string(),
            "if (c) then {\ny := (x + 1)\n} else {\noutput((input * -2))\n}"
        );

        let body = Block(vec![
            Stmt::assign("x", Expr::lit(1)),
            Stmt::while_loop(Expr::var("x"), vec![Stmt::assign("x", Expr::lit(0))]),
        ]);
        assert_eq!(body.to_string(), "x := 1;\nwhile (x) {\nx := 0\n}");
    }

    #[test]
    fn test_parse_named_program() {
        let json = r#"{
            "name": "demo",
            "body": [
                {"kind": "assign", "var": "x", "rhs": {"kind": "input"}},
                {"kind": "while", "guard": {"kind": "var", "name": "x"}, "body": [
                    {"kind": "assign", "var": "x", "rhs": {"kind": "add",
                        "lhs": {"kind": "var", "name": "x"},
                        "rhs": {"kind": "literal", "value": -1}}}
                ]},
                {"kind": "output", "expr": {"kind": "var", "name": "x"}}
            ]
        }"#;

        let program = Program::from_json_str(json).unwrap();
        assert_eq!(program.name, "demo");
        assert_eq!(program.body.statements().len(), 3);
        assert_eq!(
            program.body.statements()[1],
            Stmt::while_loop(
                Expr::var("x"),
                vec![Stmt::assign("x", Expr::add(Expr::var("x"), Expr::lit(-1)))]
            )
        );
    }

    #[test]
    fn test_parse_bare_statement_array() {
        let json = r#"[{"kind": "output", "expr": {"kind": "literal", "value": 7}}]"#;
        let program = Program::from_json_str(json).unwrap();
        assert_eq!(program.name, "program");
        assert_eq!(program.body, Block(vec![Stmt::output(Expr::lit(7))]));
    }

    #[test]
    fn test_reject_unknown_kind() {
        let json = r#"[{"kind": "goto", "target": 3}]"#;
        assert!(Program::from_json_str(json).is_err());
    }
}
