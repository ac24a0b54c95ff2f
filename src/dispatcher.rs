//! Evaluates grid expressions against bound tuneables and iterates the
//! kernel's work items for the host back-end.

use anvil_core::{ceil_div, Env, Error, Result};

use crate::bound_kernel::BoundKernel;
use crate::kernel_spec::{HostEntry, KernelSpec};

/// A half-open interval `[lo, hi)` over one grid axis, plus the axis's
/// logical extent for boundary checks when padding is allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridRange {
    lo: usize,
    hi: usize,
    range: usize,
}

impl GridRange {
    pub fn new(lo: usize, hi: usize, range: usize) -> GridRange {
        GridRange { lo, hi, range }
    }

    pub fn lo(&self) -> usize {
        self.lo
    }

    pub fn hi(&self) -> usize {
        self.hi
    }

    /// The dimension's logical (pre-padding) extent.
    pub fn range(&self) -> usize {
        self.range
    }

    /// True if `idx` is within the logical extent — callers launched into
    /// padding (`idx >= range`) must skip their body.
    pub fn in_range(&self, idx: usize) -> bool {
        idx < self.range
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> {
        self.lo..self.hi
    }
}

/// What a kernel entry point receives for one grid axis: either a concrete
/// index (the common case) or, for an axis requested via
/// `request_outer_axis_as_range`, the whole `GridRange` to iterate itself.
#[derive(Clone, Copy, Debug)]
pub enum AxisArg {
    Index(usize),
    Range(GridRange),
}

impl AxisArg {
    pub fn index(&self) -> Option<usize> {
        match self {
            AxisArg::Index(i) => Some(*i),
            AxisArg::Range(_) => None,
        }
    }

    pub fn range(&self) -> Option<GridRange> {
        match self {
            AxisArg::Range(r) => Some(*r),
            AxisArg::Index(_) => None,
        }
    }
}

/// The per-axis `(global, local)` pair, evaluated from the spec's grid
/// expression against a bind-time environment.
pub struct EvaluatedGrid {
    pub axes: Vec<GridRange>,
}

/// Builds the environment a kernel's shape/grid/constraint expressions are
/// evaluated against: tuneables (fixed at build time), every bound primitive
/// parameter's value, and one entry per declared dimension.
///
/// A dimension's `extent_expr` usually resolves straight from tuneables and
/// primitive parameters already bound this call (e.g. a dimension whose
/// extent is simply the primitive parameter `n`'s value). When it can't —
/// nothing bound this call determines it — the caller-supplied `grid[axis]`
/// value is used instead, so a kernel can also declare a dimension with no
/// parameter of its own driving it. `grid.len()` must still equal the
/// kernel's declared dimension count.
pub fn build_env(spec: &KernelSpec, bound: &BoundKernel, grid: &[i64]) -> Result<Env> {
    let mut env = Env::new();
    for (tuneable, default) in spec.tuneables() {
        env.bind(tuneable.clone(), *default);
    }
    for param in spec.parameters() {
        if param.shape.is_scalar() {
            if let Some(v) = bound.primitive_i64(&param.name) {
                env.bind(param.name.clone(), v);
            }
        }
    }
    for (axis, dim) in spec.dimensions().iter().enumerate() {
        let value = match dim.extent.eval(&env) {
            Ok(v) => v,
            Err(_) => *grid
                .get(axis)
                .ok_or(Error::ArityMismatch { expected: spec.dimensions().len(), got: grid.len() })?,
        };
        env.bind(dim.name.clone(), value);
    }
    Ok(env)
}

/// Evaluates `spec`'s grid expression against `env` (already populated by
/// `build_env`), enforcing `GridMisalignment` when padding isn't allowed.
pub fn evaluate_grid(spec: &KernelSpec, env: &Env) -> Result<EvaluatedGrid> {
    let mut axes = Vec::with_capacity(spec.dimensions().len());
    for (axis, dim) in spec.dimensions().iter().enumerate() {
        let extent = env.get(&dim.name)?;
        let global = spec.grid_global()[axis].eval(env)?;
        let local = spec.grid_local()[axis].eval(env)?;

        if !spec.allow_grid_padding() && global % local != 0 {
            return Err(Error::GridMisalignment { axis, global: global as u32, local: local as u32 });
        }
        debug_assert!(ceil_div(global, local) * local >= global);

        let hi = if spec.allow_grid_padding() { ceil_div(global, local) * local } else { global };
        axes.push(GridRange::new(0, hi.max(0) as usize, extent.max(0) as usize));
    }
    Ok(EvaluatedGrid { axes })
}

/// Walks the evaluated grid in lexicographic order (axis 0 outermost),
/// invoking `entry` once per combination of indices — or, if
/// `outer_as_range` is set, once per combination of the *inner* axes, with
/// axis 0 collapsed into a single `GridRange` the entry iterates itself.
pub fn launch_host(entry: &HostEntry, bound: &mut BoundKernel, grid: &EvaluatedGrid, outer_as_range: bool) -> Result<()> {
    let mut acc = Vec::with_capacity(grid.axes.len());
    walk_axis(entry, bound, &grid.axes, outer_as_range, 0, &mut acc)
}

fn walk_axis(
    entry: &HostEntry,
    bound: &mut BoundKernel,
    axes: &[GridRange],
    outer_as_range: bool,
    axis: usize,
    acc: &mut Vec<AxisArg>,
) -> Result<()> {
    if axis == axes.len() {
        return entry(bound, acc);
    }
    if axis == 0 && outer_as_range {
        acc.push(AxisArg::Range(axes[0]));
        let result = walk_axis(entry, bound, axes, outer_as_range, axis + 1, acc);
        acc.pop();
        return result;
    }
    for i in axes[axis].iter() {
        acc.push(AxisArg::Index(i));
        walk_axis(entry, bound, axes, outer_as_range, axis + 1, acc)?;
        acc.pop();
    }
    Ok(())
}
