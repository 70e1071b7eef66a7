//! Skinning a stack of ribs with B-spline surfaces.
//!
//! Edge `e` of every rib becomes one row of control points of a surface.
//! The U direction (along the edge) keeps the knots and degree of the first
//! rib's edge; the V direction (across the ribs) gets a synthesized knot
//! vector that depends only on the number of ribs. When the surface cannot be
//! built, the same edges are joined with a ruled loft instead.

use curved_kernel::curved_kernel_nurbs::SurfaceSpec;
use curved_kernel::curved_kernel_topo::Shape;
use curved_kernel::{GeometryKernel, KernelError};
use tracing::debug;

use crate::{CurvedError, Diagnostics, Result, Rib};

/// Knots and multiplicities across `n_ribs` ribs.
///
/// More than three ribs get clamped ends of multiplicity 4 with simple
/// interior knots at `i / (n_ribs - 1)` for `i` in `1..n_ribs - 3`. Two or
/// three ribs get one span, `[0, 1]`, with both multiplicities equal to the
/// rib count.
pub fn v_knots(n_ribs: usize) -> (Vec<f64>, Vec<usize>) {
    if n_ribs > 3 {
        let mut knots = vec![0.0];
        let mut mults = vec![4];
        for i in 1..n_ribs - 3 {
            knots.push(i as f64 / (n_ribs - 1) as f64);
            mults.push(1);
        }
        knots.push(1.0);
        mults.push(4);
        (knots, mults)
    } else {
        (vec![0.0, 1.0], vec![n_ribs, n_ribs])
    }
}

/// Build the skin through `ribs`, optionally closed into a solid.
///
/// Returns the solid when `solid` is set and the shell closes. Otherwise
/// returns the only surface, or a compound of all surfaces (caps included)
/// when there are several. Surface, cap and solid failures are recorded in
/// `diagnostics` and do not abort.
///
/// When the direct fit fails for edge `e`, the fallback lofts a band
/// through edge `e` of every rib only, not through whole rib wires, so each
/// failed edge yields its own band next to the fitted surfaces.
///
/// # Errors
/// [`CurvedError::Configuration`] for fewer than two ribs, ribs without
/// edges, or ribs with different edge counts. [`CurvedError::NothingBuilt`]
/// if no surface could be built at all.
pub fn build_surface_or_solid(
    kernel: &dyn GeometryKernel,
    ribs: &[Rib],
    solid: bool,
    diagnostics: &mut Diagnostics,
) -> Result<Shape> {
    if ribs.len() < 2 {
        return Err(CurvedError::config(format!(
            "at least 2 ribs are needed, got {}",
            ribs.len()
        )));
    }
    let n_edges = ribs[0].edge_count();
    if n_edges == 0 {
        return Err(CurvedError::config(format!("rib {} has no edges", ribs[0].name)));
    }
    if let Some(odd) = ribs.iter().find(|r| r.edge_count() != n_edges) {
        return Err(CurvedError::config(format!(
            "rib {} has {} edges, expected {}",
            odd.name,
            odd.edge_count(),
            n_edges
        )));
    }

    let (v_knots, v_mults) = v_knots(ribs.len());
    debug!(ribs = ribs.len(), edges = n_edges, ?v_knots, ?v_mults, "skinning ribs");

    let mut surfaces = Vec::with_capacity(n_edges + 2);
    for e in 0..n_edges {
        match edge_surface(kernel, ribs, e, &v_knots, &v_mults) {
            Ok(face) => surfaces.push(face),
            Err(err) => {
                diagnostics.warning(format!(
                    "B-spline surface failed for edge {e}, creating loft instead: {err}"
                ));
                let wires: Vec<_> = ribs
                    .iter()
                    .map(|r| kernel.make_wire(&r.edges[e..=e]))
                    .collect();
                match kernel.make_loft(&wires) {
                    Ok(shape) => surfaces.push(shape),
                    Err(err) => diagnostics.error(format!("loft failed for edge {e}: {err}")),
                }
            }
        }
    }

    if solid {
        for rib in [&ribs[0], &ribs[ribs.len() - 1]] {
            if let Some(cap) = make_cap(kernel, rib, diagnostics) {
                surfaces.push(cap);
            }
        }
        match kernel
            .make_shell(&surfaces)
            .and_then(|shell| kernel.make_solid(&shell))
        {
            Ok(solid) => return Ok(solid),
            Err(err) => diagnostics.error(format!("creating solid failed: {err}")),
        }
    }

    match surfaces.len() {
        0 => Err(CurvedError::NothingBuilt(
            "no surface could be built through the ribs".into(),
        )),
        1 => Ok(surfaces.remove(0)),
        _ => Ok(kernel.make_compound(surfaces)),
    }
}

/// B-spline face through edge `e` of every rib.
fn edge_surface(
    kernel: &dyn GeometryKernel,
    ribs: &[Rib],
    e: usize,
    v_knots: &[f64],
    v_mults: &[usize],
) -> std::result::Result<Shape, KernelError> {
    let first = kernel.to_bspline(&ribs[0].edges[e])?;

    let mut poles = Vec::with_capacity(ribs.len());
    let mut weights = Vec::with_capacity(ribs.len() * first.num_poles());
    for rib in ribs {
        let spline = kernel.to_bspline(&rib.edges[e])?;
        weights.extend_from_slice(spline.weights());
        poles.push(spline.poles().to_vec());
    }

    kernel.build_bspline_surface(&SurfaceSpec {
        poles,
        weights: Some(weights),
        v_knots: v_knots.to_vec(),
        v_mults: v_mults.to_vec(),
        u_knots: first.knots().to_vec(),
        u_mults: first.multiplicities().to_vec(),
        v_periodic: false,
        u_periodic: first.is_periodic(),
        u_degree: first.degree(),
        v_degree: first.degree(),
    })
}

/// Planar face closing `rib`, or `None` with an error diagnostic.
fn make_cap(kernel: &dyn GeometryKernel, rib: &Rib, diagnostics: &mut Diagnostics) -> Option<Shape> {
    let wire = kernel.make_wire(&rib.edges);
    if !kernel.is_closed(&wire) {
        diagnostics.error(format!("{}: shape is not closed, cannot make a solid", rib.name));
        return None;
    }
    match kernel.make_face(&wire) {
        Ok(face) => Some(face),
        Err(err) => {
            diagnostics.error(format!("{}: face construction failed: {err}", rib.name));
            None
        }
    }
}
