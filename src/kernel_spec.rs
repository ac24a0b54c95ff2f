//! `KernelSpec`: the static description of a kernel, and the builder host
//! applications use to construct one.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use anvil_core::{AccessMode, Error, Expr, Result, Shape, TypeDescriptor};

use crate::bound_kernel::BoundKernel;
use crate::dispatcher::AxisArg;

/// One declared parameter of a kernel.
pub struct FormalParameter {
    pub name: String,
    pub element_type: Arc<dyn TypeDescriptor>,
    pub access: AccessMode,
    pub shape: Shape,
}

impl fmt::Debug for FormalParameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FormalParameter")
            .field("name", &self.name)
            .field("element_type", &self.element_type.id())
            .field("access", &self.access)
            .field("shape", &self.shape)
            .finish()
    }
}

/// One declared grid dimension.
#[derive(Clone, Debug)]
pub struct DimensionDecl {
    pub name: String,
    pub extent: Expr,
    pub default_block: Option<i64>,
}

/// A comparison operator accepted by `add_constraint`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConstraintOp {
    Eq,
    Le,
    Lt,
    Ge,
    Gt,
    Ne,
}

impl ConstraintOp {
    pub fn parse(s: &str) -> Result<ConstraintOp> {
        match s {
            "==" => Ok(ConstraintOp::Eq),
            "<=" => Ok(ConstraintOp::Le),
            "<" => Ok(ConstraintOp::Lt),
            ">=" => Ok(ConstraintOp::Ge),
            ">" => Ok(ConstraintOp::Gt),
            "!=" => Ok(ConstraintOp::Ne),
            other => {
                Err(Error::UnknownIdentifier { context: "constraint operator", name: other.to_string() })
            }
        }
    }

    fn apply(self, lhs: i64, rhs: i64) -> bool {
        match self {
            ConstraintOp::Eq => lhs == rhs,
            ConstraintOp::Le => lhs <= rhs,
            ConstraintOp::Lt => lhs < rhs,
            ConstraintOp::Ge => lhs >= rhs,
            ConstraintOp::Gt => lhs > rhs,
            ConstraintOp::Ne => lhs != rhs,
        }
    }
}

impl fmt::Display for ConstraintOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ConstraintOp::Eq => "==",
            ConstraintOp::Le => "<=",
            ConstraintOp::Lt => "<",
            ConstraintOp::Ge => ">=",
            ConstraintOp::Gt => ">",
            ConstraintOp::Ne => "!=",
        };
        f.write_str(s)
    }
}

/// A declared constraint between two shape expressions.
///
/// Whether this is enforced (an *assertion*) or merely advisory (a *hint*)
/// depends on what it references: a constraint naming only tuneables and
/// dimensions — values fixed before any particular call's arguments arrive —
/// is checked and enforced. One referencing a primitive parameter's value
/// can only be evaluated once that call's arguments are known, so treating
/// its violation as a hard failure would be surprising; it is evaluated when
/// possible and logged under the `debug_print` feature, never blocking the
/// call.
#[derive(Clone, Debug)]
pub struct Constraint {
    pub lhs: Expr,
    pub op: ConstraintOp,
    pub rhs: Expr,
    pub rationale: String,
}

impl Constraint {
    fn is_assertion(&self, bindable: &std::collections::HashSet<&str>) -> bool {
        self.lhs.identifiers().iter().all(|id| bindable.contains(id))
            && self.rhs.identifiers().iter().all(|id| bindable.contains(id))
    }
}

/// A reference to a kernel's executable body. Only the host back-end's
/// representation is implemented here; a real device back-end would hold a
/// compiled program/entry-point handle instead, behind this same position in
/// `KernelSpec`.
pub type HostEntry = Arc<dyn Fn(&mut BoundKernel, &[AxisArg]) -> anvil_core::Result<()> + Send + Sync>;

/// The static description of a kernel: parameters, dimensions, tuneables,
/// constraints, the grid expression, and its entry point.
pub struct KernelSpec {
    pub(crate) name: String,
    pub(crate) parameters: Vec<FormalParameter>,
    pub(crate) dimensions: Vec<DimensionDecl>,
    pub(crate) tuneables: HashMap<String, i64>,
    pub(crate) constraints: Vec<Constraint>,
    pub(crate) grid_global: Vec<Expr>,
    pub(crate) grid_local: Vec<Expr>,
    pub(crate) entry: Option<HostEntry>,
    pub(crate) arity_hint: u8,
    pub(crate) allow_grid_padding: bool,
    pub(crate) outer_axis_as_range: bool,
}

impl KernelSpec {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[FormalParameter] {
        &self.parameters
    }

    pub fn dimensions(&self) -> &[DimensionDecl] {
        &self.dimensions
    }

    pub fn tuneables(&self) -> &HashMap<String, i64> {
        &self.tuneables
    }

    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn allow_grid_padding(&self) -> bool {
        self.allow_grid_padding
    }

    pub fn outer_axis_as_range(&self) -> bool {
        self.outer_axis_as_range
    }

    pub fn entry(&self) -> &HostEntry {
        self.entry.as_ref().expect("KernelSpecBuilder::build requires an entry")
    }

    pub fn grid_global(&self) -> &[Expr] {
        &self.grid_global
    }

    pub fn grid_local(&self) -> &[Expr] {
        &self.grid_local
    }

    /// Evaluates every declared constraint against `env`, logging (under
    /// `debug_print`) any hint that doesn't hold, and returning the first
    /// violated assertion as a bind-time error.
    pub(crate) fn check_constraints(&self, env: &anvil_core::Env) -> Result<()> {
        let bindable: std::collections::HashSet<&str> = self
            .tuneables
            .keys()
            .map(String::as_str)
            .chain(self.dimensions.iter().map(|d| d.name.as_str()))
            .collect();

        for c in &self.constraints {
            let lhs = match c.lhs.eval(env) {
                Ok(v) => v,
                Err(_) => continue,
            };
            let rhs = match c.rhs.eval(env) {
                Ok(v) => v,
                Err(_) => continue,
            };
            let holds = c.op.apply(lhs, rhs);
            if holds {
                continue;
            }
            if c.is_assertion(&bindable) {
                return Err(Error::ConstraintViolated { rationale: c.rationale.clone() });
            }
            #[cfg(feature = "debug_print")]
            eprintln!(
                "anvil: kernel '{}': constraint '{} {} {}' violated ({}): {}",
                self.name, lhs, c.op, rhs, "hint", c.rationale
            );
        }
        Ok(())
    }
}

impl fmt::Debug for KernelSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KernelSpec")
            .field("name", &self.name)
            .field("parameters", &self.parameters)
            .field("dimensions", &self.dimensions.len())
            .field("tuneables", &self.tuneables)
            .field("constraints", &self.constraints.len())
            .field("allow_grid_padding", &self.allow_grid_padding)
            .finish()
    }
}

/// Builds a `KernelSpec` imperatively.
pub struct KernelSpecBuilder {
    name: String,
    type_registry: Arc<TypeRegistry>,
    parameters: Vec<FormalParameter>,
    dimensions: Vec<DimensionDecl>,
    tuneables: HashMap<String, i64>,
    constraints: Vec<Constraint>,
    grid_global: Vec<Expr>,
    grid_local: Vec<Expr>,
    entry: Option<HostEntry>,
    arity_hint: u8,
    allow_grid_padding: bool,
    outer_axis_as_range: bool,
}

impl KernelSpecBuilder {
    pub fn new(name: impl Into<String>, type_registry: Arc<TypeRegistry>) -> KernelSpecBuilder {
        KernelSpecBuilder {
            name: name.into(),
            type_registry,
            parameters: Vec::new(),
            dimensions: Vec::new(),
            tuneables: HashMap::new(),
            constraints: Vec::new(),
            grid_global: Vec::new(),
            grid_local: Vec::new(),
            entry: None,
            arity_hint: 0,
            allow_grid_padding: false,
            outer_axis_as_range: false,
        }
    }

    fn known_name(&self, name: &str) -> bool {
        self.parameters.iter().any(|p| p.name == name)
            || self.dimensions.iter().any(|d| d.name == name)
            || self.tuneables.contains_key(name)
    }

    fn check_duplicate(&self, scope: &'static str, name: &str) -> Result<()> {
        if self.known_name(name) {
            Err(Error::DuplicateName { scope, name: name.to_string() })
        } else {
            Ok(())
        }
    }

    pub fn add_parameter(mut self, name: &str, access: &str, type_spec: &str) -> Result<KernelSpecBuilder> {
        self.check_duplicate("parameter", name)?;
        let access = AccessMode::parse(access)?;
        let (prim, shape) = anvil_core::parser::parse_type_expr(type_spec)?;
        let element_type = self.type_registry.lookup(&prim)?;
        self.parameters.push(FormalParameter { name: name.to_string(), element_type, access, shape });
        Ok(self)
    }

    pub fn add_dimension(
        mut self,
        name: &str,
        extent_expr: &str,
        default_block: Option<i64>,
    ) -> Result<KernelSpecBuilder> {
        self.check_duplicate("dimension", name)?;
        let extent = anvil_core::parser::parse_expr(extent_expr)?;
        self.dimensions.push(DimensionDecl { name: name.to_string(), extent, default_block });
        Ok(self)
    }

    pub fn add_tuneable(mut self, name: &str, default: i64) -> Result<KernelSpecBuilder> {
        self.check_duplicate("tuneable", name)?;
        self.tuneables.insert(name.to_string(), default);
        Ok(self)
    }

    pub fn add_constraint(mut self, lhs: &str, op: &str, rhs: &str, rationale: &str) -> Result<KernelSpecBuilder> {
        let lhs = anvil_core::parser::parse_expr(lhs)?;
        let op = ConstraintOp::parse(op)?;
        let rhs = anvil_core::parser::parse_expr(rhs)?;
        self.constraints.push(Constraint { lhs, op, rhs, rationale: rationale.to_string() });
        Ok(self)
    }

    pub fn set_grid_expression(mut self, global: &str, local: &str) -> Result<KernelSpecBuilder> {
        self.grid_global = anvil_core::parser::parse_expr_list(global)?;
        self.grid_local = anvil_core::parser::parse_expr_list(local)?;
        Ok(self)
    }

    pub fn set_compute_function(mut self, entry: HostEntry, arity_hint: u8) -> KernelSpecBuilder {
        self.entry = Some(entry);
        self.arity_hint = arity_hint;
        self
    }

    #[must_use]
    pub fn allow_grid_padding(mut self) -> KernelSpecBuilder {
        self.allow_grid_padding = true;
        self
    }

    /// Requests that axis 0 be delivered to the entry point as a single
    /// `GridRange` the kernel body iterates itself, rather than one call per
    /// index.
    #[must_use]
    pub fn request_outer_axis_as_range(mut self) -> KernelSpecBuilder {
        self.outer_axis_as_range = true;
        self
    }

    /// Validates every identifier referenced by a shape or grid expression
    /// resolves to a tuneable, a dimension, or another parameter, then
    /// assembles the spec.
    pub fn build(self) -> Result<KernelSpec> {
        let known: std::collections::HashSet<&str> = self
            .tuneables
            .keys()
            .map(String::as_str)
            .chain(self.dimensions.iter().map(|d| d.name.as_str()))
            .chain(self.parameters.iter().map(|p| p.name.as_str()))
            .collect();

        let check_ids = |expr: &Expr| -> Result<()> {
            for id in expr.identifiers() {
                if !known.contains(id) {
                    return Err(Error::UnknownIdentifier { context: "kernel spec", name: id.to_string() });
                }
            }
            Ok(())
        };

        for dim in &self.dimensions {
            check_ids(&dim.extent)?;
        }
        for expr in self.grid_global.iter().chain(self.grid_local.iter()) {
            check_ids(expr)?;
        }
        for param in &self.parameters {
            if let Shape::Array(expr) = &param.shape {
                check_ids(expr)?;
            }
        }
        for c in &self.constraints {
            check_ids(&c.lhs)?;
            check_ids(&c.rhs)?;
        }

        if self.grid_global.len() != self.dimensions.len() || self.grid_local.len() != self.dimensions.len() {
            return Err(Error::ArityMismatch { expected: self.dimensions.len(), got: self.grid_global.len() });
        }

        if self.entry.is_none() {
            return Err(Error::MissingEntry { name: self.name });
        }

        Ok(KernelSpec {
            name: self.name,
            parameters: self.parameters,
            dimensions: self.dimensions,
            tuneables: self.tuneables,
            constraints: self.constraints,
            grid_global: self.grid_global,
            grid_local: self.grid_local,
            entry: self.entry,
            arity_hint: self.arity_hint,
            allow_grid_padding: self.allow_grid_padding,
            outer_axis_as_range: self.outer_axis_as_range,
        })
    }
}

/// Resolves the element-type names `add_parameter`'s `type_spec` grammar
/// references to concrete `TypeDescriptor`s, supplied by the host
/// application.
#[derive(Default)]
pub struct TypeRegistry {
    types: std::sync::RwLock<HashMap<String, Arc<dyn TypeDescriptor>>>,
}

impl TypeRegistry {
    pub fn new() -> TypeRegistry {
        TypeRegistry { types: std::sync::RwLock::new(HashMap::new()) }
    }

    pub fn register(&self, name: impl Into<String>, descriptor: Arc<dyn TypeDescriptor>) {
        self.types.write().unwrap().insert(name.into(), descriptor);
    }

    pub fn lookup(&self, name: &str) -> Result<Arc<dyn TypeDescriptor>> {
        self.types
            .read()
            .unwrap()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownIdentifier { context: "type registry", name: name.to_string() })
    }
}

impl fmt::Debug for TypeRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry").field("types", &self.types.read().unwrap().len()).finish()
    }
}
