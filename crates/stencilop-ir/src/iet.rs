//! The imperative execution tree (IET).
//!
//! The IET is the low-level structural representation of a kernel: nested
//! loops, guarded bodies, statements, communication points, and symbol
//! declarations, rooted at the kernel's public entry function. IET-level
//! passes mutate the tree in place.
//!
//! Invariant held across every pass: the root function's parameter list is
//! never altered by an optimization pass. Symbol placement may *add*
//! [`Node::Definition`] and [`Node::Cast`] nodes, never remove parameters.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::cluster::Cluster;
use crate::dimension::Dimension;
use crate::error::IrError;
use crate::expr::{Assignment, Expr};
use crate::registry::SymbolRegistry;

/// Scalar element types of parameters and declarations.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DType {
    Float32,
    Int32,
}

/// A formal parameter of the kernel entry function.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub dtype: DType,
    /// True for grid-function (array) parameters.
    pub pointer: bool,
}

impl Parameter {
    pub fn array(name: impl Into<String>) -> Self {
        Parameter {
            name: name.into(),
            dtype: DType::Float32,
            pointer: true,
        }
    }

    pub fn scalar(name: impl Into<String>, dtype: DType) -> Self {
        Parameter {
            name: name.into(),
            dtype,
            pointer: false,
        }
    }
}

/// Halo-exchange communication scheme.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum HaloScheme {
    /// Face-neighbour exchanges only.
    Basic,
    /// Face and diagonal-neighbour exchanges.
    Diagonal,
}

/// A standalone compiler directive.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Directive {
    /// Flush subnormal floating-point results to zero.
    FlushDenormals,
}

/// A loop annotation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Pragma {
    /// The loop is vectorizable at the given lane width.
    Simd { width: usize },
    /// The loop is parallel across threads.
    ParallelFor { collapse: usize, nthreads: String },
}

/// A loop bound.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Bound {
    /// Halo-relative fixed offset from the dimension extent.
    Fixed(i64),
    /// Bound clamped to the enclosing block of `parent`; boundary blocks may
    /// have non-uniform extent.
    Relaxed { parent: String, extent: i64 },
}

/// A node of the imperative execution tree.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Function {
        name: String,
        parameters: Vec<Parameter>,
        body: Vec<Node>,
    },
    Loop {
        dim: Dimension,
        lower: Bound,
        upper: Bound,
        pragmas: Vec<Pragma>,
        parallel: bool,
        body: Vec<Node>,
    },
    Conditional {
        condition: Expr,
        body: Vec<Node>,
    },
    Statement(Assignment),
    Definition {
        name: String,
        dtype: DType,
    },
    Cast {
        name: String,
        dtype: DType,
    },
    HaloExchange {
        arrays: Vec<String>,
        mode: HaloScheme,
    },
    Directive(Directive),
    /// A point probe advancing asynchronous progress (e.g. communication).
    Prodder {
        name: String,
    },
}

impl Node {
    /// The child statement list of a structured node, if it has one.
    pub fn body(&self) -> Option<&[Node]> {
        match self {
            Node::Function { body, .. }
            | Node::Loop { body, .. }
            | Node::Conditional { body, .. } => Some(body),
            _ => None,
        }
    }

    pub fn body_mut(&mut self) -> Option<&mut Vec<Node>> {
        match self {
            Node::Function { body, .. }
            | Node::Loop { body, .. }
            | Node::Conditional { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Pre-order traversal over this node and its subtree.
    pub fn visit(&self, f: &mut impl FnMut(&Node)) {
        f(self);
        if let Some(body) = self.body() {
            for child in body {
                child.visit(f);
            }
        }
    }
}

/// An IET rooted at the kernel's public entry function.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    root: Node,
}

impl Graph {
    pub fn new(root: Node) -> Result<Self, IrError> {
        match root {
            Node::Function { .. } => Ok(Graph { root }),
            _ => Err(IrError::RootNotFunction),
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    /// The externally visible call signature of the kernel.
    pub fn parameters(&self) -> &[Parameter] {
        match &self.root {
            Node::Function { parameters, .. } => parameters,
            _ => unreachable!("root is validated at construction"),
        }
    }

    pub fn body(&self) -> &[Node] {
        match &self.root {
            Node::Function { body, .. } => body,
            _ => unreachable!("root is validated at construction"),
        }
    }

    pub fn body_mut(&mut self) -> &mut Vec<Node> {
        match &mut self.root {
            Node::Function { body, .. } => body,
            _ => unreachable!("root is validated at construction"),
        }
    }

    pub fn visit(&self, f: &mut impl FnMut(&Node)) {
        self.root.visit(f);
    }

    pub fn any(&self, pred: impl Fn(&Node) -> bool) -> bool {
        let mut found = false;
        self.visit(&mut |n| {
            if pred(n) {
                found = true;
            }
        });
        found
    }

    pub fn count(&self, pred: impl Fn(&Node) -> bool) -> usize {
        let mut n = 0;
        self.visit(&mut |node| {
            if pred(node) {
                n += 1;
            }
        });
        n
    }
}

/// Lowers an optimized cluster sequence into a loop nest rooted at the
/// kernel entry function.
///
/// Parameters are the externally supplied grid functions and scalars (any
/// name not generated by the [`SymbolRegistry`]) plus a `<dim>_m`/`<dim>_M`
/// extent pair per dimension. Compiler temporaries are deliberately left
/// undeclared here; symbol placement runs as the final IET pass.
pub fn build(clusters: &[Cluster]) -> Result<Graph, IrError> {
    for (index, cluster) in clusters.iter().enumerate() {
        if cluster.exprs.is_empty() {
            return Err(IrError::EmptyCluster { index });
        }
        for iv in &cluster.ispace.intervals {
            if iv.upper < iv.lower {
                return Err(IrError::InvalidInterval {
                    dim: iv.dim.name.clone(),
                    lower: iv.lower,
                    upper: iv.upper,
                });
            }
        }
    }

    let mut arrays = BTreeSet::new();
    let mut scalars = BTreeSet::new();
    let mut extent_dims = BTreeSet::new();
    for cluster in clusters {
        for name in cluster.reads().union(&cluster.writes()) {
            if SymbolRegistry::is_generated(name) {
                continue;
            }
            if is_array(clusters, name) {
                arrays.insert(name.clone());
            } else {
                scalars.insert(name.clone());
            }
        }
        for dim in cluster.ispace.dims() {
            if !dim.is_block() {
                extent_dims.insert(dim.name.clone());
            }
        }
    }

    let mut parameters: Vec<Parameter> = arrays
        .iter()
        .map(|a| Parameter::array(a.clone()))
        .collect();
    parameters.extend(
        scalars
            .iter()
            .map(|s| Parameter::scalar(s.clone(), DType::Float32)),
    );
    for dim in &extent_dims {
        parameters.push(Parameter::scalar(format!("{}_m", dim), DType::Int32));
        parameters.push(Parameter::scalar(format!("{}_M", dim), DType::Int32));
    }

    let mut body = Vec::new();
    for cluster in clusters {
        body.push(build_nest(cluster));
    }

    Graph::new(Node::Function {
        name: "kernel".to_string(),
        parameters,
        body,
    })
}

fn is_array(clusters: &[Cluster], name: &str) -> bool {
    let mut found = false;
    let mut check = |e: &Expr| {
        if let Expr::Access { array, .. } = e {
            if array == name {
                found = true;
            }
        }
    };
    for cluster in clusters {
        for a in &cluster.exprs {
            a.target.visit(&mut check);
            a.rhs.visit(&mut check);
        }
    }
    found
}

fn build_nest(cluster: &Cluster) -> Node {
    let mut body: Vec<Node> = cluster
        .exprs
        .iter()
        .map(|a| Node::Statement(a.clone()))
        .collect();

    for guard in cluster.guards.iter().rev() {
        body = vec![Node::Conditional {
            condition: guard.clone(),
            body,
        }];
    }

    let mut node = None;
    for iv in cluster.ispace.intervals.iter().rev() {
        let inner = match node.take() {
            Some(n) => vec![n],
            None => std::mem::take(&mut body),
        };
        node = Some(Node::Loop {
            dim: iv.dim.clone(),
            lower: Bound::Fixed(iv.lower),
            upper: Bound::Fixed(iv.upper),
            pragmas: Vec::new(),
            parallel: cluster.is_parallel() && !iv.dim.is_time(),
            body: inner,
        });
    }

    match node {
        Some(n) => n,
        // Empty iteration space: the statements execute once.
        None => Node::Conditional {
            condition: Expr::Constant(1.0),
            body,
        },
    }
}
