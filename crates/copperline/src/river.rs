use crate::board::Board;
use crate::cursor::Cursor;
use anyhow::{anyhow, bail, Result};
use log::debug;
use std::collections::{HashMap, HashSet};

/// Lateral alignment tolerance for bundle maneuvers, in millimeters.
const ALIGN_EPS: f64 = 1e-9;

/// Residual below which a straight jog closes alignment exactly. The
/// chord-stepped arcs of `shimmy` floor the residual near a tenth of this,
/// so shimmying alone can never finish the job.
const TRIM_TOL: f64 = 1e-3;

/// An ordered bundle of parallel cursors manipulated as one group. Member i
/// runs in the lane `pitch × i` to the left of member 0, so member 0 is the
/// inside edge of a right turn and the last member is the inside edge of a
/// left turn.
pub struct River {
    pub members: Vec<Cursor>,
    pub pitch: f64,
}

fn opposite_copper(layer: &str) -> Result<&'static str> {
    match layer {
        "GTL" => Ok("GBL"),
        "GBL" => Ok("GTL"),
        _ => Err(anyhow!("no opposite outer copper layer for '{}'", layer)),
    }
}

impl River {
    pub fn new(members: Vec<Cursor>, pitch: f64) -> Self {
        River { members, pitch }
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Turning radius of the bundle as a whole.
    pub fn radius(&self) -> f64 {
        self.pitch * self.members.len() as f64
    }

    pub fn forward(&mut self, d: f64) -> &mut Self {
        for t in &mut self.members {
            t.forward(d);
        }
        self
    }

    /// Rotate the bundle right about member 0. Each member traces an arc of
    /// radius `pitch × i` in `ceil(a)` micro-rotation substeps; the substep
    /// count is part of the trace-length contract.
    pub fn right(&mut self, a: f64) -> &mut Self {
        let n = (a.ceil() as usize).max(1);
        for (i, t) in self.members.iter_mut().enumerate() {
            let r = self.pitch * i as f64;
            let arc = 2.0 * std::f64::consts::PI * r * a / 360.0;
            for _ in 0..n {
                t.right(a / n as f64);
                t.forward(arc / n as f64);
            }
        }
        self
    }

    /// Rotate the bundle left about the last member (the inside edge of a
    /// left turn). Mirror image of `right`.
    pub fn left(&mut self, a: f64) -> &mut Self {
        let n = (a.ceil() as usize).max(1);
        for (rev, t) in self.members.iter_mut().rev().enumerate() {
            let r = self.pitch * rev as f64;
            let arc = 2.0 * std::f64::consts::PI * r * a / 360.0;
            for _ in 0..n {
                t.left(a / n as f64);
                t.forward(arc / n as f64);
            }
        }
        self
    }

    /// Lateral lane change at the bundle's fixed turning radius. Positive d
    /// moves the bundle toward its left. Within one radius the maneuver is a
    /// pure S-curve of angle `180·acos(1 − |d|/radius)/π`; beyond that it
    /// turns a full 90, covers the remainder straight, and turns back.
    pub fn shimmy(&mut self, d: f64) -> &mut Self {
        if d.abs() < ALIGN_EPS {
            return self;
        }
        let r = self.radius();
        let (a, f) = if d.abs() > r {
            (90.0, d.abs() - r)
        } else {
            (180.0 * (1.0 - d.abs() / r).acos() / std::f64::consts::PI, 0.0)
        };
        if d > 0.0 {
            self.left(a);
            self.forward(f);
            self.right(a);
        } else {
            self.right(a);
            self.forward(f);
            self.left(a);
        }
        self
    }

    /// Exact lateral shift: one perpendicular jog per member. Positive d
    /// moves the bundle toward its left, matching `shimmy`.
    fn slide(&mut self, d: f64) -> &mut Self {
        if d.abs() < ALIGN_EPS {
            return self;
        }
        for t in &mut self.members {
            t.goxy(-d, 0.0);
        }
        self
    }

    /// Shimmy until member 0 is laterally on the lane of `target`, then
    /// close the chord residue with an exact jog. Each shimmy undershoots by
    /// a factor of 1/N (the pivot member sweeps one lane less than the
    /// bundle radius assumes), so the residual shrinks geometrically down to
    /// the chord error floor; `slide` takes it from there.
    fn align_laterally(&mut self, target: &Cursor) -> Result<()> {
        if self.members.len() < 2 {
            bail!("lateral alignment needs at least 2 members");
        }
        for _ in 0..48 {
            let (dx, _) = self.members[0].seek(target);
            if dx.abs() < TRIM_TOL {
                break;
            }
            self.shimmy(-dx);
        }
        let (dx, _) = self.members[0].seek(target);
        if dx.abs() >= self.pitch {
            bail!("river failed to align laterally, residual {:.6} mm", dx);
        }
        self.slide(-dx);
        Ok(())
    }

    /// Commit every member's path.
    pub fn wire(&mut self, board: &mut Board) -> Result<()> {
        for t in &mut self.members {
            t.wire(board)?;
        }
        Ok(())
    }

    /// Advance every member in `members` to align flush on the line through
    /// `target` perpendicular to the bundle heading. Required before any wire
    /// commit that merges parallel traces.
    pub fn extend(target: &Cursor, members: &mut [Cursor]) -> Result<()> {
        let mut finish = target.fork();
        finish.left(90.0);
        for t in members.iter_mut() {
            t.approach(0.0, &finish)?;
        }
        Ok(())
    }

    /// Merge a co-directional bundle running alongside this one into a single
    /// wider bundle. The perpendicular offset between the facing edge
    /// members, corrected by one pitch for the interleave, is closed by
    /// shimmying this side by `ratio` of it and the other side by the rest;
    /// whichever side lags is extended onto a common line.
    pub fn join(mut self, mut other: River, ratio: f64) -> Result<River> {
        if !(0.0..=1.0).contains(&ratio) {
            bail!("join ratio {} outside [0, 1]", ratio);
        }
        if (self.pitch - other.pitch).abs() > ALIGN_EPS {
            bail!(
                "join with mismatched pitch: {} vs {}",
                self.pitch,
                other.pitch
            );
        }
        if self.is_empty() || other.is_empty() {
            bail!("join with empty river");
        }
        let st = self.members[self.members.len() - 1].fork();
        let ot = other.members[0].fork();
        let rel = (st.dir() - ot.dir()).rem_euclid(360.0);
        if rel.min(360.0 - rel) > 1e-6 {
            bail!("join requires co-directional rivers");
        }

        // The other bundle's edge lane belongs one pitch to our left.
        let (dx, _) = st.seek(&ot);
        let err = dx + self.pitch;
        if ratio > 0.0 {
            self.shimmy(-ratio * err);
        }
        if ratio < 1.0 {
            other.shimmy((1.0 - ratio) * err);
        }
        // Converge the shimmy undershoot on whichever side can still move,
        // then close the chord residue with an exact jog.
        for _ in 0..48 {
            let st = self.members[self.members.len() - 1].fork();
            let (dx, _) = st.seek(&other.members[0]);
            let res = dx + self.pitch;
            if res.abs() < TRIM_TOL {
                break;
            }
            if other.members.len() >= 2 {
                other.shimmy(res);
            } else {
                self.shimmy(-res);
            }
        }
        let st = self.members[self.members.len() - 1].fork();
        let (dx, _) = st.seek(&other.members[0]);
        let res = dx + self.pitch;
        if res.abs() >= self.pitch {
            bail!("join failed to align the bundles, residual {:.6} mm", res);
        }
        other.slide(res);

        let st = self.members[self.members.len() - 1].fork();
        let (_, dy) = st.seek(&other.members[0]);
        if dy >= 0.0 {
            let target = other.members[0].fork();
            River::extend(&target, &mut self.members)?;
        } else {
            River::extend(&st, &mut other.members)?;
        }

        let pitch = self.pitch;
        let mut members = self.members;
        members.append(&mut other.members);
        Ok(River::new(members, pitch))
    }

    /// Route this bundle head-on into `other`: rotate to face it, close the
    /// lateral offset, advance to contact and wire. Head-on bundles
    /// interleave in reverse, so one net is recorded per
    /// (member i, other member N−1−i) pair.
    pub fn meet(&mut self, other: &River, board: &mut Board) -> Result<()> {
        let n = self.members.len();
        if n != other.members.len() {
            bail!(
                "meet with mismatched widths: {} vs {}",
                n,
                other.members.len()
            );
        }
        if (self.pitch - other.pitch).abs() > ALIGN_EPS {
            bail!(
                "meet with mismatched pitch: {} vs {}",
                self.pitch,
                other.pitch
            );
        }

        let tu = (other.members[0].dir() + 180.0 - self.members[0].dir()).rem_euclid(360.0);
        if tu > 1e-9 {
            if tu <= 180.0 {
                self.right(tu);
            } else {
                self.left(360.0 - tu);
            }
        }

        let target = other.members[n - 1].fork();
        self.align_laterally(&target)?;

        let (_, dy) = self.members[0].seek(&target);
        if dy < -1e-6 {
            bail!("meet: bundles already overlap by {:.3} mm", -dy);
        }
        self.forward(dy.max(0.0));
        self.wire(board)?;

        let mut nets = Vec::new();
        for i in 0..n {
            let a = &self.members[i];
            let b = &other.members[n - 1 - i];
            let ends = [a, b]
                .iter()
                .map(|c| {
                    match (&c.part, &c.name) {
                        (Some(p), Some(nm)) => Ok((p.clone(), nm.clone())),
                        _ => Err(anyhow!("meet: river member without part/pad identity")),
                    }
                })
                .collect::<Result<Vec<_>>>()?;
            nets.push(ends);
        }
        for ends in nets {
            board.add_net(ends);
        }
        debug!("meet recorded {} nets", n);
        Ok(())
    }

    /// Per-member crossbar: reorder this bundle into the member order of
    /// `other`. Every member drops to the opposite outer copper layer
    /// through a via at a longitudinal station proportional to its
    /// destination lane, runs laterally, and vias back, so members cross
    /// without touching. `mapping` must send every member name to a distinct
    /// member name of `other`.
    pub fn shuffle(
        mut self,
        other: &River,
        mapping: &HashMap<String, String>,
        board: &mut Board,
    ) -> Result<River> {
        let n = self.members.len();
        if (self.pitch - other.pitch).abs() > ALIGN_EPS {
            bail!("shuffle with mismatched pitch");
        }

        let mut dst = Vec::with_capacity(n);
        let mut seen = HashSet::new();
        for t in &self.members {
            let name = t
                .name
                .as_deref()
                .ok_or_else(|| anyhow!("shuffle: unnamed river member"))?;
            let to = mapping
                .get(name)
                .ok_or_else(|| anyhow!("shuffle: no mapping for member '{}'", name))?;
            if !seen.insert(to.clone()) {
                bail!("shuffle: duplicate destination '{}'", to);
            }
            let j = other
                .members
                .iter()
                .position(|o| o.name.as_deref() == Some(to))
                .ok_or_else(|| anyhow!("shuffle: '{}' is not a member of the target river", to))?;
            dst.push(j);
        }

        let pitch = self.pitch;
        for (i, t) in self.members.iter_mut().enumerate() {
            let j = dst[i];
            t.forward(pitch * (1.0 + j as f64));
            t.wire(board)?;
            t.via(board, None)?;
            let home = t.layer.clone();
            let back = opposite_copper(&home)?;
            t.set_layer(back);
            let delta = (j as f64 - i as f64) * pitch;
            if delta.abs() > ALIGN_EPS {
                if delta > 0.0 {
                    t.left(90.0);
                    t.forward(delta);
                    t.right(90.0);
                } else {
                    t.right(90.0);
                    t.forward(-delta);
                    t.left(90.0);
                }
            }
            t.wire(board)?;
            t.via(board, None)?;
            t.set_layer(&home);
            t.forward(pitch * (n - j) as f64);
        }

        let mut paired: Vec<(usize, Cursor)> = dst.into_iter().zip(self.members).collect();
        paired.sort_by_key(|(j, _)| *j);
        let members = paired.into_iter().map(|(_, t)| t).collect();
        Ok(River::new(members, pitch))
    }
}

/// Fold a fan of escaped pad cursors into a parallel bundle: the pivot end
/// turns by `a`, every other member counter-turns, approaches its lane gap
/// from the pivot and turns back, and the whole bank is squared up on a
/// common finish line and wired. `a` must be ±45 so the approach geometry
/// stays perpendicular.
pub fn enriver(board: &mut Board, mut bank: Vec<Cursor>, a: f64) -> Result<River> {
    if bank.is_empty() {
        bail!("enriver with empty bank");
    }
    let pitch = board.pitch();
    let n = bank.len();
    let mut order: Vec<usize> = (0..n).collect();
    if a > 0.0 {
        order.reverse();
    }

    bank[order[0]].right(a);
    let pivot = bank[order[0]].fork();
    for (k, &idx) in order.iter().enumerate().skip(1) {
        let gap = pitch * k as f64;
        let t = &mut bank[idx];
        t.left(a);
        t.approach(gap, &pivot)?;
        t.right(2.0 * a);
    }

    let mut finish = bank[order[n - 1]].fork();
    finish.left(90.0);
    for t in bank.iter_mut() {
        t.approach(0.0, &finish)?;
        t.wire(board)?;
    }
    Ok(River::new(bank, pitch))
}
