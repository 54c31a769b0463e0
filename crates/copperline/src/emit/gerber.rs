//! Gerber RS-274X writer. Coordinates are 7-digit zero-padded integers at
//! 10 µm resolution; filled regions are bracketed G36/G37. The format has no
//! even-odd primitive, so a polygon with holes is recursively quartered into
//! simply-connected pieces before emission.

use crate::geom::{self, Poly};
use anyhow::Result;
use geo::Polygon;
use std::io::Write;

/// Quartering epsilon: the two half boxes overlap by this much so the cut
/// line leaves no sliver.
const SPLIT_EPS: f64 = 1e-6;

pub struct Gerber<W: Write> {
    f: W,
}

impl<W: Write> Gerber<W> {
    pub fn new(mut f: W, desc: &str) -> Result<Self> {
        write!(
            f,
            "G04 copperline RS-274X export*\n\
             G75*\n\
             %MOMM*%\n\
             %FSLAX34Y34*%\n\
             %LPD*%\n\
             %IN{}*%\n\
             %IPPOS*%\n\
             %AMOC8*\n\
             5,1,8,0,0,1.08239X$1,22.5*%\n\
             G01*\n\
             %ADD10C,0.254000*%\n\n",
            desc
        )?;
        Ok(Gerber { f })
    }

    fn number(n: f64) -> String {
        format!("{:07}", (n * 10000.0).round() as i64)
    }

    /// Emit a point chain: D02 moves to the first point, D01 draws to the
    /// rest.
    pub fn points<I>(&mut self, pp: I) -> Result<()>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        let mut d = "D02";
        for (x, y) in pp {
            writeln!(self.f, "X{}Y{}{}*", Self::number(x), Self::number(y), d)?;
            d = "D01";
        }
        Ok(())
    }

    pub fn rect(&mut self, x0: f64, y0: f64, x1: f64, y1: f64) -> Result<()> {
        writeln!(self.f, "D10*")?;
        self.points([(x0, y0), (x1, y0), (x1, y1), (x0, y1), (x0, y0)])
    }

    pub fn linestring<I>(&mut self, pp: I) -> Result<()>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        writeln!(self.f, "D10*")?;
        self.points(pp)
    }

    /// A filled region from a closed boundary ring.
    pub fn poly<I>(&mut self, pp: I) -> Result<()>
    where
        I: IntoIterator<Item = (f64, f64)>,
    {
        writeln!(self.f, "G36*")?;
        self.points(pp)?;
        writeln!(self.f, "G37*")?;
        writeln!(self.f)?;
        Ok(())
    }

    pub fn finish(&mut self) -> Result<()> {
        writeln!(self.f, "M02*")?;
        Ok(())
    }

    /// Emit a multipolygon surface, quartering rings with holes.
    pub fn surface(&mut self, p: &Poly) -> Result<()> {
        for poly in &p.0 {
            self.simple(poly)?;
        }
        Ok(())
    }

    fn simple(&mut self, po: &Polygon<f64>) -> Result<()> {
        if po.interiors().is_empty() {
            return self.poly(po.exterior().coords().map(|c| (c.x, c.y)));
        }
        // Split down the middle until every piece is simply connected.
        let whole = Poly::new(vec![po.clone()]);
        let Some(b) = geom::bounds(&whole) else {
            return Ok(());
        };
        let (x0, y0, x1, y1) = (b.min().x, b.min().y, b.max().x, b.max().y);
        let xm = (x0 + x1) / 2.0;
        let left = geom::intersection(&whole, &geom::rect(x0, y0, xm + SPLIT_EPS, y1));
        let right = geom::intersection(&whole, &geom::rect(xm - SPLIT_EPS, y0, x1, y1));
        self.surface(&left)?;
        self.surface(&right)
    }
}
