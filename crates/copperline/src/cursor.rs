use crate::board::Board;
use crate::geom;
use anyhow::{anyhow, bail, Result};
use kurbo::{Point, Vec2};

/// Turtle-style drawing cursor: a position plus a heading in degrees,
/// accumulating a path that is later committed to a board layer as copper or
/// silkscreen. Headings are clockwise with 0 pointing along +Y, so
/// `forward` moves by `(d·sin, d·cos)`.
///
/// A cursor is a small copyable value; a mirrored cursor is the same type
/// with the turn sense flipped, not a separate variant.
#[derive(Debug, Clone)]
pub struct Cursor {
    xy: Point,
    dir: f64,
    path: Vec<Point>,
    stack: Vec<(Point, f64)>,
    pub layer: String,
    pub width: f64,
    pub name: Option<String>,
    pub part: Option<String>,
    mirrored: bool,
}

impl Cursor {
    pub fn new(xy: Point, dir: f64) -> Self {
        Cursor {
            xy,
            dir: dir.rem_euclid(360.0),
            path: vec![xy],
            stack: Vec::new(),
            layer: "GTL".to_string(),
            width: 0.0,
            name: None,
            part: None,
            mirrored: false,
        }
    }

    pub fn xy(&self) -> Point {
        self.xy
    }

    pub fn dir(&self) -> f64 {
        self.dir
    }

    pub fn path(&self) -> &[Point] {
        &self.path
    }

    /// Heading unit vector in world coordinates.
    fn heading(&self) -> Vec2 {
        let a = self.dir.to_radians();
        Vec2::new(a.sin(), a.cos())
    }

    /// Unit vector pointing to the right of the heading.
    fn rightward(&self) -> Vec2 {
        let a = self.dir.to_radians();
        let r = Vec2::new(a.cos(), -a.sin());
        if self.mirrored {
            -r
        } else {
            r
        }
    }

    pub fn set_layer(&mut self, layer: &str) -> &mut Self {
        self.layer = layer.to_string();
        self
    }

    pub fn set_width(&mut self, width: f64) -> &mut Self {
        self.width = width;
        self
    }

    pub fn set_name(&mut self, name: &str) -> &mut Self {
        self.name = Some(name.to_string());
        self
    }

    /// Full-state copy with a fresh path rooted at the current position.
    pub fn fork(&self) -> Cursor {
        Cursor {
            xy: self.xy,
            dir: self.dir,
            path: vec![self.xy],
            stack: Vec::new(),
            layer: self.layer.clone(),
            width: self.width,
            name: self.name.clone(),
            part: self.part.clone(),
            mirrored: self.mirrored,
        }
    }

    /// Same cursor with the turn sense flipped.
    pub fn mirrored(&self) -> Cursor {
        let mut c = self.fork();
        c.mirrored = !c.mirrored;
        c
    }

    pub fn newpath(&mut self) -> &mut Self {
        self.path = vec![self.xy];
        self
    }

    /// Append a raw point to the path without moving through it. Used by the
    /// routers to turn committed lattice cells back into traces.
    pub fn path_append(&mut self, p: Point) -> &mut Self {
        self.xy = p;
        self.path.push(p);
        self
    }

    pub fn push(&mut self) -> &mut Self {
        self.stack.push((self.xy, self.dir));
        self
    }

    pub fn pop(&mut self) -> Result<&mut Self> {
        let (xy, dir) = self
            .stack
            .pop()
            .ok_or_else(|| anyhow!("cursor pop with empty stack"))?;
        self.xy = xy;
        self.dir = dir;
        Ok(self)
    }

    pub fn forward(&mut self, d: f64) -> &mut Self {
        self.xy += self.heading() * d;
        self.path.push(self.xy);
        self
    }

    pub fn left(&mut self, a: f64) -> &mut Self {
        if self.mirrored {
            self.dir = (self.dir + a).rem_euclid(360.0);
        } else {
            self.dir = (self.dir - a).rem_euclid(360.0);
        }
        self
    }

    pub fn right(&mut self, a: f64) -> &mut Self {
        if self.mirrored {
            self.dir = (self.dir - a).rem_euclid(360.0);
        } else {
            self.dir = (self.dir + a).rem_euclid(360.0);
        }
        self
    }

    /// Relative jog in the cursor's local frame (x to the right, y ahead).
    pub fn goxy(&mut self, dx: f64, dy: f64) -> &mut Self {
        self.xy += self.rightward() * dx + self.heading() * dy;
        self.path.push(self.xy);
        self
    }

    /// Position of `other` expressed in this cursor's local frame.
    pub fn seek(&self, other: &Cursor) -> (f64, f64) {
        let d = other.xy - self.xy;
        (d.dot(self.rightward()), d.dot(self.heading()))
    }

    /// Advance until exactly `d` short of the infinite line through `other`.
    /// The two headings must differ by exactly 90 or 270 degrees.
    pub fn approach(&mut self, d: f64, other: &Cursor) -> Result<&mut Self> {
        let rel = (self.dir - other.dir).rem_euclid(360.0);
        if (rel - 90.0).abs() > 1e-6 && (rel - 270.0).abs() > 1e-6 {
            bail!(
                "approach requires perpendicular headings, got {:.3} vs {:.3}",
                self.dir,
                other.dir
            );
        }
        let (x0, y0) = (self.xy.x, self.xy.y);
        let (x1, y1) = (other.xy.x, other.xy.y);
        let mut o2 = other.fork();
        o2.forward(1.0);
        let (x2, y2) = (o2.xy.x, o2.xy.y);
        // Distance from our position to the line through `other`; the forward
        // step of 1 makes the denominator unity.
        let dist = ((y2 - y1) * x0 - (x2 - x1) * y0 + x2 * y1 - y2 * x1).abs();
        self.forward(dist - d);
        Ok(self)
    }

    /// Emit a closed `w`×`h` rectangle path centered on the cursor. Position
    /// and heading are restored.
    pub fn rect(&mut self, w: f64, h: f64) -> &mut Self {
        let saved = (self.xy, self.dir);
        self.forward(h / 2.0);
        self.right(90.0);
        self.forward(w / 2.0);
        self.newpath();
        self.right(90.0);
        self.forward(h);
        self.right(90.0);
        self.forward(w);
        self.right(90.0);
        self.forward(h);
        self.right(90.0);
        self.forward(w);
        self.xy = saved.0;
        self.dir = saved.1;
        self
    }

    pub fn square(&mut self, w: f64) -> &mut Self {
        self.rect(w, w)
    }

    /// Emit a closed regular n-gon path approximating a circle of radius `r`
    /// centered on the cursor.
    pub fn n_agon(&mut self, r: f64, n: usize) -> &mut Self {
        let ea = 360.0 / (n as f64);
        let half_edge = r * (std::f64::consts::PI / (n as f64)).tan();
        let saved = (self.xy, self.dir);
        self.forward(r);
        self.right(90.0);
        self.newpath();
        for _ in 0..n {
            self.forward(half_edge);
            self.right(ea);
            self.forward(half_edge);
        }
        self.xy = saved.0;
        self.dir = saved.1;
        self
    }

    /// Commit the accumulated path as a stroked trace on the cursor's layer.
    /// A path with fewer than two points commits nothing, so calling twice
    /// without movement in between is a no-op the second time.
    pub fn wire(&mut self, board: &mut Board) -> Result<()> {
        let layer = self.layer.clone();
        let width = if self.width > 0.0 { self.width } else { board.rules.trace };
        self.wire_on(board, &layer, width)
    }

    pub fn wire_on(&mut self, board: &mut Board, layer: &str, width: f64) -> Result<()> {
        if self.path.len() < 2 {
            return Ok(());
        }
        let g = geom::stroke(&self.path, width)?;
        let net = self.name.clone();
        board.layer_mut(layer)?.add(net.as_deref(), g);
        self.newpath();
        Ok(())
    }

    /// Commit the path as a closed pad polygon onto copper, solder mask and
    /// paste of the cursor's side.
    pub fn pad(&mut self, board: &mut Board) -> Result<()> {
        let g = geom::from_ring(&self.path)?;
        let names: [&str; 3] = if self.layer == "GBL" {
            ["GBL", "GBS", "GBP"]
        } else {
            ["GTL", "GTS", "GTP"]
        };
        let net = self.name.clone();
        for n in names {
            board.layer_mut(n)?.add(net.as_deref(), g.clone());
        }
        Ok(())
    }

    /// Stroke the open path onto the silkscreen of the cursor's side.
    pub fn silk(&mut self, board: &mut Board) -> Result<()> {
        let silk = board.rules.silk;
        let g = geom::stroke(&self.path, silk)?;
        let n = if self.layer == "GBL" { "GBO" } else { "GTO" };
        board.layer_mut(n)?.add(None, g);
        Ok(())
    }

    /// Stroke the path as a closed outline onto the silkscreen of the
    /// cursor's side.
    pub fn silko(&mut self, board: &mut Board) -> Result<()> {
        let silk = board.rules.silk;
        let g = geom::ring_stroke(&self.path, silk)?;
        let n = if self.layer == "GBL" { "GBO" } else { "GTO" };
        board.layer_mut(n)?.add(None, g);
        Ok(())
    }

    /// Stamp a via: a via-diameter disc on every copper layer except
    /// `except`, plus a drill hole. Resets the path.
    pub fn via(&mut self, board: &mut Board, except: Option<&str>) -> Result<()> {
        let r = board.rules.via / 2.0;
        let hole = board.rules.via_hole;
        let g = geom::disc(self.xy, r);
        let net = self.name.clone();
        for n in Board::COPPER_LAYERS {
            if Some(n) == except {
                continue;
            }
            board.layer_mut(n)?.add(net.as_deref(), g.clone());
        }
        board.drill(self.xy, hole);
        self.newpath();
        Ok(())
    }

    /// Run a whitespace-separated command string against the primitive API.
    /// `f`, `l`, `r` take exactly one numeric argument; `-`, `+`, `.`, `/`
    /// take none. Unknown tokens and wrong arity fail fast.
    pub fn interp(&mut self, board: &mut Board, program: &str) -> Result<()> {
        let mut toks = program.split_whitespace();
        while let Some(tok) = toks.next() {
            match tok {
                "f" | "l" | "r" => {
                    let arg = toks
                        .next()
                        .ok_or_else(|| anyhow!("token '{}' needs a numeric argument", tok))?;
                    let v: f64 = arg
                        .parse()
                        .map_err(|_| anyhow!("token '{}': bad numeric argument '{}'", tok, arg))?;
                    match tok {
                        "f" => {
                            self.forward(v);
                        }
                        "l" => {
                            self.left(v);
                        }
                        _ => {
                            self.right(v);
                        }
                    }
                }
                "-" => {
                    self.left(90.0);
                }
                "+" => {
                    self.right(90.0);
                }
                "." => self.wire(board)?,
                "/" => self.via(board, None)?,
                _ => bail!("unknown drawing token '{}'", tok),
            }
        }
        Ok(())
    }
}
