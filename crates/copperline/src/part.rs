use crate::board::Board;
use crate::cursor::Cursor;
use anyhow::{anyhow, bail, Result};
use log::debug;

/// A footprint knows how to stamp itself onto a board (`place`) and how to
/// fan its pads out to routable cursors (`escape`). Placed parts are kept in
/// the board as trait objects.
pub trait Footprint {
    /// Reference-designator family, e.g. "C" or "U".
    fn family(&self) -> &'static str;

    /// Drive the cursor to stamp pads and silkscreen, registering pads on
    /// `part`.
    fn place(&self, dc: &mut Cursor, board: &mut Board, part: &mut Part) -> Result<()>;

    /// Fan the part's pads out to routable cursors. Optional.
    fn escape(&self, _part: &Part, _board: &mut Board) -> Result<Vec<Cursor>> {
        Err(anyhow!("footprint '{}' has no escape procedure", self.family()))
    }
}

/// A placed part: an assigned id, the placement cursor and the pad snapshots.
/// Position is immutable once placed; the pads may still be routed from.
pub struct Part {
    pub id: String,
    pub value: Option<String>,
    pub center: Cursor,
    pads: Vec<Cursor>,
}

impl Part {
    pub fn new(id: &str, value: Option<&str>, center: Cursor) -> Self {
        Part {
            id: id.to_string(),
            value: value.map(|s| s.to_string()),
            center,
            pads: Vec::new(),
        }
    }

    /// Snapshot the cursor as a pad of this part.
    pub fn add_pad(&mut self, dc: &Cursor) {
        let mut pad = dc.fork();
        pad.part = Some(self.id.clone());
        self.pads.push(pad);
    }

    pub fn pads(&self) -> &[Cursor] {
        &self.pads
    }

    /// Assign names to the pads in placement order. The count must match.
    pub fn name_pads(&mut self, names: &[&str]) -> Result<()> {
        if names.len() != self.pads.len() {
            bail!(
                "{}: {} pad names for {} pads",
                self.id,
                names.len(),
                self.pads.len()
            );
        }
        for (pad, name) in self.pads.iter_mut().zip(names) {
            pad.set_name(name);
        }
        Ok(())
    }

    /// Look up a pad by name. Absence and ambiguity are both design errors.
    pub fn pad_named(&self, name: &str) -> Result<&Cursor> {
        let mut hits = self
            .pads
            .iter()
            .filter(|p| p.name.as_deref() == Some(name));
        let first = hits
            .next()
            .ok_or_else(|| anyhow!("{}: no pad named '{}'", self.id, name))?;
        if hits.next().is_some() {
            bail!("{}: pad name '{}' is ambiguous", self.id, name);
        }
        Ok(first)
    }
}

/// Draw the notched-corner silkscreen outline for a `w`×`h` package and
/// record the part id as a text annotation next to the chamfer.
pub fn chamfered(dc: &mut Cursor, board: &mut Board, id: &str, w: f64, h: f64) -> Result<()> {
    let nt = 0.4;
    dc.push();
    dc.forward(h / 2.0);
    dc.left(90.0);
    dc.forward(w / 2.0 - nt);
    dc.right(180.0);
    dc.newpath();
    // the ring closure supplies the chamfer diagonal
    for e in [w - nt, h, w, h - nt] {
        dc.forward(e);
        dc.right(90.0);
    }
    dc.silko(board)?;
    dc.pop()?;

    dc.push();
    dc.forward(h / 2.0 + 0.5);
    dc.left(90.0);
    dc.forward(w / 2.0 + 0.5);
    board.annotate(dc.xy(), id);
    dc.pop()?;
    Ok(())
}

/// Repeat `op` then `forward(step)` n times: pin rows and pad trains.
pub fn train<F>(dc: &mut Cursor, board: &mut Board, n: usize, mut op: F, step: f64) -> Result<()>
where
    F: FnMut(&mut Cursor, &mut Board) -> Result<()>,
{
    for _ in 0..n {
        op(dc, board)?;
        dc.forward(step);
    }
    Ok(())
}

/// Two-terminal 0402 chip part: one pad on each side plus a silk outline.
pub struct Discrete0402;

impl Footprint for Discrete0402 {
    fn family(&self) -> &'static str {
        "C"
    }

    fn place(&self, dc: &mut Cursor, board: &mut Board, part: &mut Part) -> Result<()> {
        for d in [-90.0, 90.0] {
            dc.push();
            dc.left(d);
            dc.forward(1.30 / 2.0);
            dc.rect(0.7, 0.9);
            dc.pad(board)?;
            part.add_pad(dc);
            dc.pop()?;
        }
        dc.rect(1.0, 0.5);
        dc.silko(board)?;

        dc.push();
        dc.right(90.0);
        dc.forward(2.0);
        board.annotate(dc.xy(), &part.id);
        dc.pop()?;

        part.name_pads(&["1", "2"])
    }

    fn escape(&self, part: &Part, board: &mut Board) -> Result<Vec<Cursor>> {
        // Pads face away from the body; a short stub makes them routable.
        let mut out = Vec::new();
        for pad in part.pads() {
            let mut c = pad.fork();
            c.forward(board.rules.trace);
            c.wire(board)?;
            out.push(c);
        }
        Ok(out)
    }
}

/// 64-pin QFN, 9 mm body, 0.5 mm pitch, with a thermal ground pad stitched
/// to the GL2 plane through a 3×3 via grid.
pub struct Qfn64;

impl Footprint for Qfn64 {
    fn family(&self) -> &'static str {
        "U"
    }

    fn place(&self, dc: &mut Cursor, board: &mut Board, part: &mut Part) -> Result<()> {
        // Thermal pad: nine squares, one pad record, nine stitching vias.
        let g = 7.15 / 3.0;
        dc.set_name("GND");
        let mut first = true;
        for i in [-g, 0.0, g] {
            for j in [-g, 0.0, g] {
                dc.push();
                dc.forward(i);
                dc.left(90.0);
                dc.forward(j);
                dc.square(g - 0.5);
                dc.pad(board)?;
                if first {
                    part.add_pad(dc);
                    first = false;
                }
                dc.via(board, Some("GL2"))?;
                dc.pop()?;
            }
        }
        dc.name = None;

        chamfered(dc, board, &part.id, 9.0, 9.0)?;

        for _ in 0..4 {
            dc.left(90.0);
            dc.push();
            dc.forward(8.10 / 2.0 + 0.70 / 2.0);
            dc.right(90.0);
            dc.forward(7.50 / 2.0);
            dc.left(90.0);
            for _ in 0..16 {
                dc.rect(0.25, 0.70);
                dc.pad(board)?;
                part.add_pad(dc);
                dc.left(90.0);
                dc.forward(0.50);
                dc.right(90.0);
            }
            dc.pop()?;
        }

        let names: Vec<String> = std::iter::once("GND".to_string())
            .chain((1..=64).map(|i| i.to_string()))
            .collect();
        let refs: Vec<&str> = names.iter().map(|s| s.as_str()).collect();
        debug!("{}: {} pads", part.id, refs.len());
        part.name_pads(&refs)
    }
}
