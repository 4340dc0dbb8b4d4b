//! Centering and uniform scaling of position sets.

use crate::error::{Error, Result};
use crate::graph::{NodeId, PositionMap};
use nalgebra::DMatrix;

/// Recenters the rows of `pos` on their centroid and scales them uniformly so the farthest point
/// lies at distance `scale`, then translates by `center`.
///
/// When every row coincides the result is `center` for every row. `center` must have exactly one
/// component per column.
pub fn rescale(pos: &mut DMatrix<f64>, scale: f64, center: &[f64]) -> Result<()> {
    if center.len() != pos.ncols() {
        return Err(Error::CenterDimension {
            dim: pos.ncols(),
            len: center.len(),
        });
    }
    if pos.nrows() == 0 {
        return Ok(());
    }

    let centroid = pos.row_mean();
    for mut row in pos.row_iter_mut() {
        for (c, v) in row.iter_mut().enumerate() {
            *v -= centroid[c];
        }
    }

    let max_norm = pos
        .row_iter()
        .map(|row| row.norm())
        .fold(0.0f64, f64::max);

    if max_norm > 0.0 {
        let factor = scale / max_norm;
        for mut row in pos.row_iter_mut() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = *v * factor + center[c];
            }
        }
    } else {
        for mut row in pos.row_iter_mut() {
            for (c, v) in row.iter_mut().enumerate() {
                *v = center[c];
            }
        }
    }
    Ok(())
}

/// [`rescale`] applied to a position map. `center` defaults to the origin.
pub fn rescale_map<N: NodeId>(
    positions: &PositionMap<N>,
    scale: f64,
    center: Option<&[f64]>,
) -> Result<PositionMap<N>> {
    let Some(dim) = positions.values().next().map(Vec::len) else {
        return Ok(PositionMap::new());
    };
    if let Some((id, p)) = positions.iter().find(|(_, p)| p.len() != dim) {
        return Err(Error::invalid(
            "positions",
            format!("{id:?} has {} components, expected {dim}", p.len()),
        ));
    }

    let zeros = vec![0.0; dim];
    let center = center.unwrap_or(&zeros);
    let mut pos = DMatrix::from_row_iterator(
        positions.len(),
        dim,
        positions.values().flat_map(|p| p.iter().copied()),
    );
    rescale(&mut pos, scale, center)?;

    Ok(positions
        .keys()
        .cloned()
        .zip(pos.row_iter().map(|row| row.iter().copied().collect::<Vec<f64>>()))
        .collect())
}
