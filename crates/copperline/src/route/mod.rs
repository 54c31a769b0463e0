//! Grid autorouters. Both variants sample existing copper into a blocked-cell
//! mask, flood from the start cell and backtrack from the goal; committed
//! routes block their cells for the next signal. Grids are rebuilt per
//! routing batch and never replanned.

pub mod hex;
pub mod rect;

use crate::geom::{self, Poly};
use geo::{Polygon, Rect};
use rstar::{RTree, RTreeObject, AABB};

/// An indexed polygon of a copper layer, held in the R-tree by bounding box.
struct CopperEntry {
    index: usize,
    bbox: Rect<f64>,
}

impl RTreeObject for CopperEntry {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_corners(
            [self.bbox.min().x, self.bbox.min().y],
            [self.bbox.max().x, self.bbox.max().y],
        )
    }
}

/// Bounding-box prefilter over one layer's copper polygons. Candidates from
/// `query` still need a precise intersection test.
pub(crate) struct CopperIndex {
    polys: Vec<Polygon<f64>>,
    tree: RTree<CopperEntry>,
}

impl CopperIndex {
    pub fn build(copper: &Poly) -> Self {
        let polys: Vec<Polygon<f64>> = copper.0.clone();
        let entries: Vec<CopperEntry> = polys
            .iter()
            .enumerate()
            .filter_map(|(index, p)| {
                use geo::BoundingRect;
                p.bounding_rect().map(|bbox| CopperEntry { index, bbox })
            })
            .collect();
        CopperIndex {
            polys,
            tree: RTree::bulk_load(entries),
        }
    }

    /// True when `probe` intersects any indexed polygon.
    pub fn hits(&self, probe: &Poly) -> bool {
        let Some(b) = geom::bounds(probe) else {
            return false;
        };
        let envelope = AABB::from_corners([b.min().x, b.min().y], [b.max().x, b.max().y]);
        self.tree
            .locate_in_envelope_intersecting(&envelope)
            .any(|e| {
                let candidate = Poly::new(vec![self.polys[e.index].clone()]);
                geom::intersects(probe, &candidate)
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_copper_index_prefilter() {
        let copper = geom::union(
            &geom::rect(0.0, 0.0, 1.0, 1.0),
            &geom::rect(5.0, 5.0, 6.0, 6.0),
        );
        let idx = CopperIndex::build(&copper);
        assert!(idx.hits(&geom::rect(0.5, 0.5, 0.7, 0.7)));
        assert!(!idx.hits(&geom::rect(2.0, 2.0, 3.0, 3.0)));
        assert!(idx.hits(&geom::rect(5.5, 5.5, 5.6, 5.6)));
    }
}
