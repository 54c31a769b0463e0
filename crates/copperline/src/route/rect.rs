//! Lee's-algorithm maze router on a two-layer rectangular lattice. Layer 0
//! prefers vertical runs and layer 1 horizontal, so each layer carries one
//! direction cheaply and crossings resolve through vias.

use super::CopperIndex;
use crate::board::Board;
use crate::geom;
use anyhow::{anyhow, bail, Result};
use kurbo::Point;
use log::debug;

pub const COST_H: [u32; 2] = [5, 1];
pub const COST_V: [u32; 2] = [1, 5];
pub const COST_VIA: u32 = 100;
const UNREACHED: u32 = u32::MAX;

/// A lattice cell: (layer, x, y).
pub type Cell = (usize, usize, usize);

/// One routed signal: the cell chain in start-to-goal order, its summed step
/// cost and the number of layer changes.
#[derive(Debug, Clone)]
pub struct Route {
    pub cells: Vec<Cell>,
    pub cost: u32,
    pub vias: usize,
}

pub struct RectGrid {
    w: usize,
    h: usize,
    pitch: f64,
    layers: [String; 2],
    blocked: [Vec<bool>; 2],
}

impl RectGrid {
    /// An all-clear grid of `w`×`h` cells at the given pitch.
    pub fn new(w: usize, h: usize, pitch: f64, layers: [&str; 2]) -> Self {
        RectGrid {
            w,
            h,
            pitch,
            layers: [layers[0].to_string(), layers[1].to_string()],
            blocked: [vec![false; w * h], vec![false; w * h]],
        }
    }

    /// Sample the board's copper into a grid spanning the board rectangle at
    /// the track pitch. A cell is blocked when its sample square intersects
    /// existing copper on that layer.
    pub fn from_board(board: &Board, layers: [&str; 2]) -> Result<Self> {
        let pitch = board.pitch();
        let w = (board.size.0 / pitch).floor() as usize;
        let h = (board.size.1 / pitch).floor() as usize;
        if w == 0 || h == 0 {
            bail!("board {}x{} mm too small for the routing lattice", board.size.0, board.size.1);
        }
        let mut grid = RectGrid::new(w, h, pitch, layers);
        for (l, name) in layers.iter().enumerate() {
            let copper = board.layer(name)?.merged();
            let index = CopperIndex::build(&copper);
            let mut n = 0usize;
            for y in 0..h {
                for x in 0..w {
                    let c = grid.center(x, y);
                    let half = pitch / 2.0;
                    let probe = geom::rect(c.x - half, c.y - half, c.x + half, c.y + half);
                    if index.hits(&probe) {
                        grid.blocked[l][y * w + x] = true;
                        n += 1;
                    }
                }
            }
            debug!("{}: {} of {} cells blocked by copper", name, n, w * h);
        }
        Ok(grid)
    }

    pub fn center(&self, x: usize, y: usize) -> Point {
        Point::new((x as f64 + 0.5) * self.pitch, (y as f64 + 0.5) * self.pitch)
    }

    /// The cell under a board position, if it falls on the lattice.
    pub fn cell_at(&self, layer: usize, p: Point) -> Option<Cell> {
        let x = (p.x / self.pitch).floor();
        let y = (p.y / self.pitch).floor();
        if layer < 2 && x >= 0.0 && y >= 0.0 && (x as usize) < self.w && (y as usize) < self.h {
            Some((layer, x as usize, y as usize))
        } else {
            None
        }
    }

    pub fn block(&mut self, layer: usize, x: usize, y: usize) {
        self.blocked[layer][y * self.w + x] = true;
    }

    pub fn is_blocked(&self, layer: usize, x: usize, y: usize) -> bool {
        self.blocked[layer][y * self.w + x]
    }

    fn check(&self, c: Cell, what: &str) -> Result<()> {
        let (l, x, y) = c;
        if l >= 2 || x >= self.w || y >= self.h {
            bail!("{} cell ({}, {}, {}) outside {}x{} grid", what, l, x, y, self.w, self.h);
        }
        Ok(())
    }

    /// Flood the whole lattice from `start` until `goal` is costed, then
    /// backtrack the cheapest chain. Horizontal and vertical steps cost
    /// `COST_H`/`COST_V` per layer; a layer change costs `COST_VIA`. When a
    /// full relaxation pass changes nothing before the goal is reached the
    /// signal cannot be routed.
    pub fn route(&self, start: Cell, goal: Cell) -> Result<Route> {
        self.check(start, "start")?;
        self.check(goal, "goal")?;
        let (w, h) = (self.w, self.h);
        let idx = |x: usize, y: usize| y * w + x;

        let mut cost = [vec![UNREACHED; w * h], vec![UNREACHED; w * h]];
        let mut vias = [vec![false; w * h], vec![false; w * h]];
        cost[start.0][idx(start.1, start.2)] = 1;

        loop {
            if cost[goal.0][idx(goal.1, goal.2)] != UNREACHED {
                break;
            }
            let mut changed = false;
            let mut next = cost.clone();
            for l in 0..2 {
                for y in 0..h {
                    for x in 0..w {
                        let i = idx(x, y);
                        if self.blocked[l][i] && (l, x, y) != start && (l, x, y) != goal {
                            continue;
                        }
                        let mut planar = UNREACHED;
                        let mut relax = |c: u32, step: u32| {
                            if c != UNREACHED && c + step < planar {
                                planar = c + step;
                            }
                        };
                        if x > 0 {
                            relax(cost[l][i - 1], COST_H[l]);
                        }
                        if x + 1 < w {
                            relax(cost[l][i + 1], COST_H[l]);
                        }
                        if y > 0 {
                            relax(cost[l][i - w], COST_V[l]);
                        }
                        if y + 1 < h {
                            relax(cost[l][i + w], COST_V[l]);
                        }
                        let through = cost[1 - l][i];
                        let via = if through != UNREACHED { through + COST_VIA } else { UNREACHED };
                        let best = planar.min(via);
                        if best < next[l][i] {
                            if cost[l][i] == UNREACHED && via == best {
                                vias[l][i] = true;
                            }
                            next[l][i] = best;
                            changed = true;
                        }
                    }
                }
            }
            cost = next;
            if !changed {
                bail!("failed to route");
            }
        }

        let mut cells = vec![goal];
        let mut nvias = 0usize;
        let mut cp = goal;
        while cp != start {
            let (l, x, y) = cp;
            let i = idx(x, y);
            let mut options: Vec<((u32, u32), Cell)> = Vec::with_capacity(5);
            for (j, k) in [(0i64, 1i64), (0, -1), (1, 0), (-1, 0)] {
                let (nx, ny) = (x as i64 + j, y as i64 + k);
                if nx >= 0 && ny >= 0 && (nx as usize) < w && (ny as usize) < h {
                    let nb = (l, nx as usize, ny as usize);
                    options.push(((cost[l][idx(nb.1, nb.2)], 0), nb));
                }
            }
            if vias[l][i] {
                options.push(((cost[1 - l][i], COST_VIA), (1 - l, x, y)));
            }
            let (key, nb) = options
                .into_iter()
                .reduce(|a, b| if b.0 < a.0 { b } else { a })
                .ok_or_else(|| anyhow!("backtrack dead end at ({}, {}, {})", l, x, y))?;
            if key.0 == UNREACHED {
                bail!("backtrack dead end at ({}, {}, {})", l, x, y);
            }
            if nb.0 != l {
                nvias += 1;
            }
            cp = nb;
            cells.push(cp);
        }
        cells.reverse();

        let total = cost[goal.0][idx(goal.1, goal.2)] - 1;
        debug!(
            "routed ({},{},{}) -> ({},{},{}): {} cells, cost {}, {} vias",
            start.0, start.1, start.2, goal.0, goal.1, goal.2, cells.len(), total, nvias
        );
        Ok(Route {
            cells,
            cost: total,
            vias: nvias,
        })
    }

    /// Mark a route's cells as blocked for subsequent signals. Routing order
    /// is the caller's channel-allocation policy; there is no rip-up.
    pub fn commit(&mut self, route: &Route) {
        for &(l, x, y) in &route.cells {
            self.blocked[l][y * self.w + x] = true;
        }
    }

    /// Convert a route into board traces: one wire per same-layer run, a via
    /// stamped at each layer change.
    pub fn wire(&self, board: &mut Board, route: &Route) -> Result<()> {
        let mut i = 0;
        while i < route.cells.len() {
            let l = route.cells[i].0;
            let mut j = i;
            while j + 1 < route.cells.len() && route.cells[j + 1].0 == l {
                j += 1;
            }
            if j > i {
                let mut dc = board.dc(self.center(route.cells[i].1, route.cells[i].2), 0.0);
                dc.set_layer(&self.layers[l]);
                for &(_, x, y) in &route.cells[i + 1..=j] {
                    dc.path_append(self.center(x, y));
                }
                dc.wire(board)?;
            }
            if j + 1 < route.cells.len() {
                let (_, x, y) = route.cells[j + 1];
                let mut v = board.dc(self.center(x, y), 0.0);
                v.via(board, None)?;
            }
            i = j + 1;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_straight_run_cost() {
        let g = RectGrid::new(6, 6, 0.4, ["GTL", "GBL"]);
        // layer 1 carries horizontal runs at cost 1 per step
        let r = g.route((1, 0, 0), (1, 5, 0)).expect("route");
        assert_eq!(r.cells.len(), 6);
        assert_eq!(r.cost, 5);
        assert_eq!(r.vias, 0);
    }

    #[test]
    fn test_via_only_route() {
        let g = RectGrid::new(3, 3, 0.4, ["GTL", "GBL"]);
        let r = g.route((0, 1, 1), (1, 1, 1)).expect("route");
        assert_eq!(r.cells.len(), 2);
        assert_eq!(r.cost, COST_VIA);
        assert_eq!(r.vias, 1);
    }

    #[test]
    fn test_blocked_wall_detours() {
        let mut g = RectGrid::new(5, 5, 0.4, ["GTL", "GBL"]);
        // wall across x=2 on both layers except the top row
        for l in 0..2 {
            for y in 0..4 {
                g.block(l, 2, y);
            }
        }
        let r = g.route((1, 0, 0), (1, 4, 0)).expect("route");
        assert!(r.cells.len() > 5, "detour is longer than the straight run");
        for &(l, x, y) in &r.cells {
            assert!(!(x == 2 && y < 4), "route crosses the wall at ({},{},{})", l, x, y);
        }
    }

    #[test]
    fn test_unreachable_fails() {
        let mut g = RectGrid::new(5, 5, 0.4, ["GTL", "GBL"]);
        // seal the goal corner on both layers
        for l in 0..2 {
            g.block(l, 3, 4);
            g.block(l, 4, 3);
        }
        let err = g.route((0, 0, 0), (0, 4, 4)).unwrap_err();
        assert!(err.to_string().contains("failed to route"));
    }

    #[test]
    fn test_commit_blocks_cells() {
        let mut g = RectGrid::new(5, 5, 0.4, ["GTL", "GBL"]);
        let r = g.route((1, 0, 2), (1, 4, 2)).expect("route");
        g.commit(&r);
        assert!(g.is_blocked(1, 2, 2));
        // the same corridor now forces a detour or a via
        let r2 = g.route((1, 0, 2), (1, 4, 2));
        assert!(r2.is_err() || r2.as_ref().map(|r| r.cost > 5).unwrap_or(false) || r2.map(|r| r.vias > 0).unwrap_or(false));
    }
}
