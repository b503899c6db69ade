//! Nearest-neighbour queries over the planar projection of a cloud.

use rstar::{PointDistance, RTree, RTreeObject, AABB};

use pcd_core::pointcloud::point::PointCloud;

/// A planar coordinate tagged with its position in the source cloud.
#[derive(Debug, Clone, Copy)]
struct IndexedPoint {
    xy: [f64; 2],
    index: usize,
}

impl RTreeObject for IndexedPoint {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        AABB::from_point(self.xy)
    }
}

impl PointDistance for IndexedPoint {
    fn distance_2(&self, point: &[f64; 2]) -> f64 {
        let dx = self.xy[0] - point[0];
        let dy = self.xy[1] - point[1];
        dx * dx + dy * dy
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f64,
}

/// R-tree over `(x, y)` built once per cloud.
pub struct SpatialIndex {
    tree: RTree<IndexedPoint>,
}

impl SpatialIndex {
    pub fn new(point_cloud: &PointCloud) -> Self {
        let indexed: Vec<IndexedPoint> = point_cloud
            .points
            .iter()
            .enumerate()
            .map(|(index, p)| IndexedPoint {
                xy: p.planar(),
                index,
            })
            .collect();

        Self {
            tree: RTree::bulk_load(indexed),
        }
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }

    /// The `k` nearest points to `query`, closest first.
    ///
    /// Equal distances are ordered by index, including at the cut-off, so
    /// the result does not depend on the tree layout. `k` is clamped to the
    /// number of indexed points.
    pub fn nearest(&self, query: [f64; 2], k: usize) -> Vec<Neighbor> {
        let k = k.min(self.len());
        if k == 0 {
            return Vec::new();
        }

        // Pull candidates until the k-th distance is passed so that every
        // point tied with the k-th one competes on index.
        let mut candidates: Vec<(f64, usize)> = Vec::with_capacity(k + 4);
        for item in self.tree.nearest_neighbor_iter(&query) {
            let d2 = item.distance_2(&query);
            if candidates.len() >= k && d2 > candidates[k - 1].0 {
                break;
            }
            candidates.push((d2, item.index));
        }

        candidates.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        candidates.truncate(k);
        candidates
            .into_iter()
            .map(|(d2, index)| Neighbor {
                index,
                distance: d2.sqrt(),
            })
            .collect()
    }
}
