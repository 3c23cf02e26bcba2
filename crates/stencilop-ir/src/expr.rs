//! Symbolic stencil expressions.
//!
//! [`Expr`] is the right-hand-side language of an equation cluster: grid
//! accesses with dimension-relative offsets, scalar symbols, constants, and
//! arithmetic over them. The cluster-level passes rewrite expressions
//! structurally (factoring, power expansion, redundancy elimination) and rely
//! on three per-expression queries: estimated operation count, the set of
//! dimensions an expression varies along, and structural replacement of a
//! subexpression.
//!
//! # Examples
//!
//! ```
//! use stencilop_ir::{Expr, Index};
//!
//! // 0.5 * (u[x+1] + u[x-1])
//! let e = Expr::mul(
//!     Expr::Constant(0.5),
//!     Expr::add(
//!         Expr::access("u", vec![Index::new("x", 1)]),
//!         Expr::access("u", vec![Index::new("x", -1)]),
//!     ),
//! );
//! assert_eq!(e.op_count(), 2);
//! assert!(!e.is_invariant("x"));
//! assert!(e.is_invariant("y"));
//! ```

use std::collections::BTreeSet;
use std::fmt;

use serde::{Deserialize, Serialize};

/// A dimension-relative stencil offset, e.g. `x + 1`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Index {
    pub dim: String,
    pub offset: i64,
}

impl Index {
    pub fn new(dim: impl Into<String>, offset: i64) -> Self {
        Index {
            dim: dim.into(),
            offset,
        }
    }
}

impl fmt::Display for Index {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.offset {
            0 => write!(f, "{}", self.dim),
            o if o > 0 => write!(f, "{}+{}", self.dim, o),
            o => write!(f, "{}{}", self.dim, o),
        }
    }
}

/// A symbolic expression over grid functions and scalars.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Expr {
    Constant(f64),
    /// A scalar symbol (loop-invariant value or compiler temporary).
    Symbol(String),
    /// A grid-function access at a stencil point.
    Access { array: String, indices: Vec<Index> },
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    /// Integer power of the base expression.
    Pow(Box<Expr>, i32),
    /// Pointwise minimum; used by relaxed block bounds.
    Min(Box<Expr>, Box<Expr>),
}

impl Expr {
    pub fn sym(name: impl Into<String>) -> Expr {
        Expr::Symbol(name.into())
    }

    pub fn access(array: impl Into<String>, indices: Vec<Index>) -> Expr {
        Expr::Access {
            array: array.into(),
            indices,
        }
    }

    pub fn add(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Add(Box::new(lhs), Box::new(rhs))
    }

    pub fn sub(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Sub(Box::new(lhs), Box::new(rhs))
    }

    pub fn mul(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Mul(Box::new(lhs), Box::new(rhs))
    }

    pub fn div(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Div(Box::new(lhs), Box::new(rhs))
    }

    pub fn pow(base: Expr, exp: i32) -> Expr {
        Expr::Pow(Box::new(base), exp)
    }

    pub fn min(lhs: Expr, rhs: Expr) -> Expr {
        Expr::Min(Box::new(lhs), Box::new(rhs))
    }

    /// Estimated operation count, the cost measure used by the CIRE
    /// minimum-cost thresholds.
    pub fn op_count(&self) -> usize {
        match self {
            Expr::Constant(_) | Expr::Symbol(_) | Expr::Access { .. } => 0,
            Expr::Add(l, r) | Expr::Sub(l, r) | Expr::Mul(l, r) | Expr::Div(l, r) => {
                1 + l.op_count() + r.op_count()
            }
            Expr::Min(l, r) => 1 + l.op_count() + r.op_count(),
            Expr::Pow(b, e) => e.unsigned_abs() as usize + b.op_count(),
        }
    }

    /// The set of dimension names this expression varies along.
    ///
    /// Scalars and constants vary along no dimension; an access varies along
    /// every dimension it indexes.
    pub fn dims(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.collect_dims(&mut out);
        out
    }

    fn collect_dims(&self, out: &mut BTreeSet<String>) {
        match self {
            Expr::Constant(_) | Expr::Symbol(_) => {}
            Expr::Access { indices, .. } => {
                for i in indices {
                    out.insert(i.dim.clone());
                }
            }
            Expr::Add(l, r)
            | Expr::Sub(l, r)
            | Expr::Mul(l, r)
            | Expr::Div(l, r)
            | Expr::Min(l, r) => {
                l.collect_dims(out);
                r.collect_dims(out);
            }
            Expr::Pow(b, _) => b.collect_dims(out),
        }
    }

    pub fn is_invariant(&self, dim: &str) -> bool {
        !self.dims().contains(dim)
    }

    /// Names of all grid functions read by this expression.
    pub fn arrays(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.visit(&mut |e| {
            if let Expr::Access { array, .. } = e {
                out.insert(array.clone());
            }
        });
        out
    }

    /// Names of all scalar symbols read by this expression.
    pub fn symbols(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        self.visit(&mut |e| {
            if let Expr::Symbol(name) = e {
                out.insert(name.clone());
            }
        });
        out
    }

    /// Every name (grid function or scalar) this expression references.
    pub fn names(&self) -> BTreeSet<String> {
        let mut out = self.arrays();
        out.extend(self.symbols());
        out
    }

    /// Pre-order traversal over every node of the expression tree.
    pub fn visit(&self, f: &mut impl FnMut(&Expr)) {
        f(self);
        match self {
            Expr::Constant(_) | Expr::Symbol(_) | Expr::Access { .. } => {}
            Expr::Add(l, r)
            | Expr::Sub(l, r)
            | Expr::Mul(l, r)
            | Expr::Div(l, r)
            | Expr::Min(l, r) => {
                l.visit(f);
                r.visit(f);
            }
            Expr::Pow(b, _) => b.visit(f),
        }
    }

    /// Pre-order enumeration of compound (non-leaf) subexpressions,
    /// including the expression itself.
    pub fn subexprs(&self) -> Vec<&Expr> {
        let mut out = Vec::new();
        self.collect_subexprs(&mut out);
        out
    }

    fn collect_subexprs<'a>(&'a self, out: &mut Vec<&'a Expr>) {
        if self.op_count() > 0 {
            out.push(self);
        }
        match self {
            Expr::Constant(_) | Expr::Symbol(_) | Expr::Access { .. } => {}
            Expr::Add(l, r)
            | Expr::Sub(l, r)
            | Expr::Mul(l, r)
            | Expr::Div(l, r)
            | Expr::Min(l, r) => {
                l.collect_subexprs(out);
                r.collect_subexprs(out);
            }
            Expr::Pow(b, _) => b.collect_subexprs(out),
        }
    }

    pub fn contains(&self, other: &Expr) -> bool {
        let mut found = false;
        self.visit(&mut |e| {
            if e == other {
                found = true;
            }
        });
        found
    }

    /// Structural replacement: every occurrence of `from` becomes `to`.
    pub fn replace(&self, from: &Expr, to: &Expr) -> Expr {
        if self == from {
            return to.clone();
        }
        match self {
            Expr::Constant(_) | Expr::Symbol(_) | Expr::Access { .. } => self.clone(),
            Expr::Add(l, r) => Expr::add(l.replace(from, to), r.replace(from, to)),
            Expr::Sub(l, r) => Expr::sub(l.replace(from, to), r.replace(from, to)),
            Expr::Mul(l, r) => Expr::mul(l.replace(from, to), r.replace(from, to)),
            Expr::Div(l, r) => Expr::div(l.replace(from, to), r.replace(from, to)),
            Expr::Min(l, r) => Expr::min(l.replace(from, to), r.replace(from, to)),
            Expr::Pow(b, e) => Expr::pow(b.replace(from, to), *e),
        }
    }

    /// Canonical textual key; two structurally equal expressions render the
    /// same key.
    pub fn key(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(c) => write!(f, "{}", c),
            Expr::Symbol(s) => write!(f, "{}", s),
            Expr::Access { array, indices } => {
                write!(f, "{}[", array)?;
                for (i, idx) in indices.iter().enumerate() {
                    if i > 0 {
                        write!(f, ",")?;
                    }
                    write!(f, "{}", idx)?;
                }
                write!(f, "]")
            }
            Expr::Add(l, r) => write!(f, "({} + {})", l, r),
            Expr::Sub(l, r) => write!(f, "({} - {})", l, r),
            Expr::Mul(l, r) => write!(f, "({} * {})", l, r),
            Expr::Div(l, r) => write!(f, "({} / {})", l, r),
            Expr::Min(l, r) => write!(f, "min({}, {})", l, r),
            Expr::Pow(b, e) => write!(f, "{}^{}", b, e),
        }
    }
}

/// An assignment-like statement: `target := rhs`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Assignment {
    pub target: Expr,
    pub rhs: Expr,
}

impl Assignment {
    pub fn new(target: Expr, rhs: Expr) -> Self {
        Assignment { target, rhs }
    }

    /// Name of the grid function or scalar this statement writes.
    pub fn write_name(&self) -> Option<&str> {
        match &self.target {
            Expr::Access { array, .. } => Some(array),
            Expr::Symbol(name) => Some(name),
            _ => None,
        }
    }

    /// True when the statement accumulates into its own target, e.g.
    /// `u[x] = u[x] + e`.
    pub fn is_increment(&self) -> bool {
        self.rhs.contains(&self.target)
    }

    /// Every name read by the right-hand side.
    pub fn reads(&self) -> BTreeSet<String> {
        self.rhs.names()
    }
}

impl fmt::Display for Assignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.target, self.rhs)
    }
}
