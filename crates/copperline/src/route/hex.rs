//! Wavefront router on a hexagonal lattice. Axial (q, r) coordinates with an
//! odd-r pointy-top planar mapping: odd rows shove right by half a column.

use super::CopperIndex;
use crate::board::Board;
use crate::geom;
use anyhow::{bail, Result};
use kurbo::Point;
use log::debug;
use std::collections::{BTreeSet, HashMap};

/// The six axial neighbor steps, in the fixed scan order used by routing.
pub const DIRS: [(i32, i32); 6] = [(1, 0), (1, -1), (0, -1), (-1, 0), (-1, 1), (0, 1)];

/// Ratio of row spacing to column spacing, sin(60).
const F: f64 = 0.866_025_403_784_438_6;

/// An axial lattice coordinate. The third cube coordinate is derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Hex {
    pub q: i32,
    pub r: i32,
}

impl Hex {
    pub fn new(q: i32, r: i32) -> Self {
        Hex { q, r }
    }

    pub fn s(&self) -> i32 {
        -self.q - self.r
    }

    pub fn add(&self, other: Hex) -> Hex {
        Hex::new(self.q + other.q, self.r + other.r)
    }

    pub fn sub(&self, other: Hex) -> Hex {
        Hex::new(self.q - other.q, self.r - other.r)
    }

    /// Cube distance: lattice steps between two cells.
    pub fn distance(&self, other: Hex) -> i32 {
        let d = self.sub(other);
        d.q.abs().max(d.r.abs()).max(d.s().abs())
    }

    /// Offset-grid column and row; odd rows lean right half a column.
    fn to_grid(&self) -> (i32, i32) {
        (self.q + (self.r - (self.r & 1)) / 2, self.r)
    }

    /// Planar position for a lattice of the given row spacing.
    pub fn to_plane(&self, size: f64) -> Point {
        let height = size / F;
        let (col, row) = self.to_grid();
        let x = col as f64 + 0.5 * (row & 1) as f64;
        Point::new(x * height, row as f64 * size)
    }

    /// Nearest lattice cell to a planar position.
    pub fn from_xy(p: Point, size: f64) -> Hex {
        let height = size / F;
        let col = (p.x / height - 0.25).round() as i32;
        let row = (p.y / size).round() as i32;
        Hex::new(col - (row - (row & 1)) / 2, row)
    }

    pub fn neighbors(&self) -> impl Iterator<Item = Hex> + '_ {
        DIRS.iter().map(|&(dq, dr)| Hex::new(self.q + dq, self.r + dr))
    }

    /// Sixfold rotation about the origin, `k` steps counterclockwise.
    pub fn rot(&self, k: i32) -> Hex {
        match k.rem_euclid(6) {
            0 => *self,
            1 => Hex::new(-self.r, -self.s()),
            2 => Hex::new(self.s(), self.q),
            3 => Hex::new(-self.q, -self.r),
            4 => Hex::new(self.r, self.s()),
            _ => Hex::new(-self.s(), -self.q),
        }
    }

    /// Shortest two-leg dogleg to `other`: of the four single-bend candidate
    /// paths, the one with the smallest total lattice length (later
    /// candidates win ties).
    pub fn hop(&self, other: Hex) -> [Hex; 3] {
        let x = other.s() - self.s();
        let candidates = [
            [*self, Hex::new(other.q, self.r), other],
            [*self, Hex::new(self.q, other.r), other],
            [*self, Hex::new(self.q - x, self.r), other],
            [*self, Hex::new(self.q, self.r - x), other],
        ];
        let len = |p: &[Hex; 3]| p[0].distance(p[1]) + p[1].distance(p[2]);
        let mut best = candidates[0];
        for c in &candidates[1..] {
            if len(c) <= len(&best) {
                best = *c;
            }
        }
        best
    }
}

/// A routed signal on the hex lattice: the layer and cell chain in
/// start-to-goal order.
pub struct HexRoute {
    pub layer: String,
    pub cells: Vec<Hex>,
}

/// The routable region of a board sampled onto the hex lattice, with one
/// blocked mask per copper layer.
pub struct HexGrid {
    size: f64,
    q0: i32,
    q1: i32,
    r1: i32,
    valid: BTreeSet<Hex>,
    blocked: HashMap<String, HashMap<Hex, bool>>,
    routes: Vec<HexRoute>,
}

impl HexGrid {
    /// Sample the board's copper on `layers` onto a lattice with row spacing
    /// at the track pitch. A cell is blocked when its hex-radius disc
    /// intersects existing copper on that layer.
    pub fn from_board(board: &Board, layers: &[&str]) -> Result<Self> {
        let size = board.pitch();
        let (w, h) = board.size;
        let corner = Hex::from_xy(Point::new(0.0, h), size);
        let q0 = corner.q;
        let r1 = corner.r;
        let q1 = Hex::from_xy(Point::new(w, 0.0), size).q;
        if q0 >= q1 || r1 <= 0 {
            bail!("board {}x{} mm too small for the hex lattice", w, h);
        }

        let mut valid = BTreeSet::new();
        for r in 0..r1 {
            for q in q0..q1 {
                let hx = Hex::new(q, r);
                let p = hx.to_plane(size);
                if p.x >= 0.0 && p.x < w && p.y >= 0.0 && p.y < h {
                    valid.insert(hx);
                }
            }
        }

        // hex radius: half the center-to-center distance
        let hr = Hex::new(1, 0).to_plane(size).x / 2.0;
        let mut blocked = HashMap::new();
        for name in layers {
            let copper = board.layer(name)?.merged();
            let index = CopperIndex::build(&copper);
            let mut mask = HashMap::new();
            let mut n = 0usize;
            for hx in &valid {
                let c = hx.to_plane(size);
                let hit = index.hits(&geom::disc(c, hr));
                if hit {
                    n += 1;
                }
                mask.insert(*hx, hit);
            }
            debug!("{}: {} of {} hex cells blocked by copper", name, n, valid.len());
            blocked.insert(name.to_string(), mask);
        }

        Ok(HexGrid {
            size,
            q0,
            q1,
            r1,
            valid,
            blocked,
            routes: Vec::new(),
        })
    }

    pub fn bounds(&self) -> (i32, i32, i32) {
        (self.q0, self.q1, self.r1)
    }

    pub fn is_blocked(&self, layer: &str, hx: Hex) -> Result<bool> {
        let mask = self
            .blocked
            .get(layer)
            .ok_or_else(|| anyhow::anyhow!("layer '{}' not sampled into the hex grid", layer))?;
        Ok(*mask.get(&hx).unwrap_or(&true))
    }

    pub fn block(&mut self, layer: &str, hx: Hex) {
        if let Some(mask) = self.blocked.get_mut(layer) {
            mask.insert(hx, true);
        }
    }

    pub fn routes(&self) -> &[HexRoute] {
        &self.routes
    }

    /// Route between two cells on one layer by breadth-first wavefront: each
    /// newly reached cell records the iteration that reached it and is closed
    /// to re-entry. When the frontier stops growing before the goal is
    /// reached the signal cannot be routed. The committed route blocks its
    /// cells for subsequent signals.
    pub fn route(&mut self, layer: &str, a: Hex, b: Hex) -> Result<()> {
        if !self.valid.contains(&a) || !self.valid.contains(&b) {
            bail!("route endpoints off the lattice: {:?} -> {:?}", a, b);
        }
        if a == b {
            bail!("route endpoints coincide at {:?}", a);
        }
        let mut closed: HashMap<Hex, bool> = self
            .blocked
            .get(layer)
            .ok_or_else(|| anyhow::anyhow!("layer '{}' not sampled into the hex grid", layer))?
            .clone();
        closed.insert(b, false);

        let mut distance: HashMap<Hex, u32> = HashMap::new();
        let mut wavefront: BTreeSet<Hex> = BTreeSet::new();
        wavefront.insert(a);

        let mut i = 1u32;
        while !wavefront.contains(&b) {
            let mut next = BTreeSet::new();
            for p in &wavefront {
                for n in p.neighbors() {
                    if self.valid.contains(&n) && !closed.get(&n).copied().unwrap_or(true) {
                        next.insert(n);
                        closed.insert(n, true);
                        distance.insert(n, i);
                    }
                }
            }
            if next.is_empty() {
                bail!("signal failed to route");
            }
            wavefront = next;
            i += 1;
        }
        debug!("hex route {:?} -> {:?} reached in {} iterations", a, b, i - 1);

        let mut cells = vec![b];
        let mut p = b;
        loop {
            let n = match distance.get(&p) {
                Some(&n) => n,
                None => bail!("hex backtrack lost the wavefront at {:?}", p),
            };
            if n == 1 {
                break;
            }
            let mut stepped = false;
            for d in DIRS {
                let cand = p.add(Hex::new(d.0, d.1));
                if distance.get(&cand) == Some(&(n - 1)) {
                    p = cand;
                    cells.push(p);
                    if let Some(mask) = self.blocked.get_mut(layer) {
                        mask.insert(p, true);
                    }
                    stepped = true;
                    break;
                }
            }
            if !stepped {
                bail!("hex backtrack dead end at {:?}", p);
            }
        }
        cells.push(a);
        cells.reverse();
        if let Some(mask) = self.blocked.get_mut(layer) {
            mask.insert(a, true);
            mask.insert(b, true);
        }
        self.routes.push(HexRoute {
            layer: layer.to_string(),
            cells,
        });
        Ok(())
    }

    /// Convert every committed route into a board trace.
    pub fn wire_routes(&self, board: &mut Board) -> Result<()> {
        for r in &self.routes {
            let mut dc = board.dc(r.cells[0].to_plane(self.size), 0.0);
            dc.set_layer(&r.layer);
            for p in &r.cells[1..] {
                dc.path_append(p.to_plane(self.size));
            }
            dc.wire(board)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Board, DesignRules};

    fn board() -> Board {
        Board::new(
            (10.0, 10.0),
            DesignRules {
                trace: 0.2,
                space: 0.2,
                via_hole: 0.3,
                via: 0.6,
                via_space: 0.2,
                silk: 0.15,
            },
        )
    }

    #[test]
    fn test_plane_round_trip() {
        for q in -4..4 {
            for r in 0..8 {
                let h = Hex::new(q, r);
                let p = h.to_plane(0.4);
                assert_eq!(Hex::from_xy(p, 0.4), h, "round trip at {:?}", h);
            }
        }
    }

    #[test]
    fn test_cube_invariant_and_distance() {
        let a = Hex::new(2, -1);
        assert_eq!(a.q + a.r + a.s(), 0);
        assert_eq!(a.distance(Hex::new(2, -1)), 0);
        assert_eq!(a.distance(Hex::new(3, -1)), 1);
        assert_eq!(Hex::new(0, 0).distance(Hex::new(2, 2)), 4);
    }

    #[test]
    fn test_rot_six_is_identity() {
        let h = Hex::new(3, -2);
        let mut r = h;
        for _ in 0..6 {
            r = r.rot(1);
        }
        assert_eq!(r, h);
        assert_eq!(h.rot(3), Hex::new(-3, 2));
    }

    #[test]
    fn test_hop_is_two_legs() {
        let a = Hex::new(0, 0);
        let b = Hex::new(4, -2);
        let p = a.hop(b);
        assert_eq!(p[0], a);
        assert_eq!(p[2], b);
        let total = p[0].distance(p[1]) + p[1].distance(p[2]);
        assert_eq!(total, a.distance(b), "dogleg length equals lattice distance");
    }

    #[test]
    fn test_route_on_empty_grid() {
        let b = board();
        let mut g = HexGrid::from_board(&b, &["GTL"]).expect("grid");
        let from = Hex::from_xy(kurbo::Point::new(2.0, 2.0), b.pitch());
        let to = Hex::from_xy(kurbo::Point::new(8.0, 8.0), b.pitch());
        g.route("GTL", from, to).expect("route");
        let r = &g.routes()[0];
        assert_eq!(r.cells.first(), Some(&from));
        assert_eq!(r.cells.last(), Some(&to));
        // consecutive cells are lattice neighbors
        for w in r.cells.windows(2) {
            assert_eq!(w[0].distance(w[1]), 1);
        }
        // with nothing in the way the wavefront finds a shortest path
        assert_eq!(r.cells.len() - 1, from.distance(to) as usize);
    }

    #[test]
    fn test_route_blocks_for_next_signal() {
        let b = board();
        let mut g = HexGrid::from_board(&b, &["GTL"]).expect("grid");
        let from = Hex::from_xy(kurbo::Point::new(2.0, 5.0), b.pitch());
        let to = Hex::from_xy(kurbo::Point::new(8.0, 5.0), b.pitch());
        g.route("GTL", from, to).expect("route");
        for c in &g.routes()[0].cells.clone() {
            assert!(g.is_blocked("GTL", *c).expect("mask"));
        }
    }

    #[test]
    fn test_walled_goal_fails() {
        let b = board();
        let mut g = HexGrid::from_board(&b, &["GTL"]).expect("grid");
        let from = Hex::from_xy(kurbo::Point::new(2.0, 5.0), b.pitch());
        let to = Hex::from_xy(kurbo::Point::new(8.0, 5.0), b.pitch());
        for n in to.neighbors().collect::<Vec<_>>() {
            g.block("GTL", n);
        }
        let err = g.route("GTL", from, to).unwrap_err();
        assert!(err.to_string().contains("failed to route"));
    }
}
