//! Fabrication output: Gerber RS-274X per layer, an Excellon drill file and
//! an SVG preview.

pub mod excellon;
pub mod gerber;
pub mod svg;

use crate::board::Board;
use anyhow::{Context, Result};
use gerber::Gerber;
use log::info;
use std::fs::File;
use std::io::BufWriter;

impl Board {
    /// Write the full fabrication set: `<basename>.GML` board outline, one
    /// Gerber per layer, `<basename>.XLN` drills and `<basename>.svg`.
    pub fn save(&self, basename: &str) -> Result<()> {
        let path = format!("{}.GML", basename);
        let f = BufWriter::new(File::create(&path).with_context(|| format!("create {}", path))?);
        let mut g = Gerber::new(f, "Mechanical")?;
        g.rect(0.0, 0.0, self.size.0, self.size.1)?;
        g.finish()?;

        for layer in self.layers() {
            let path = format!("{}.{}", basename, layer.name);
            let f =
                BufWriter::new(File::create(&path).with_context(|| format!("create {}", path))?);
            let mut g = Gerber::new(f, &layer.desc)?;
            g.surface(&layer.merged())?;
            g.finish()?;
        }

        let path = format!("{}.XLN", basename);
        let mut f =
            BufWriter::new(File::create(&path).with_context(|| format!("create {}", path))?);
        excellon::write_drills(&mut f, self.holes())?;

        let path = format!("{}.svg", basename);
        let mut f =
            BufWriter::new(File::create(&path).with_context(|| format!("create {}", path))?);
        svg::write(&mut f, self)?;

        info!(
            "saved {}: {} layers, {} drill diameters",
            basename,
            self.layers().len(),
            self.holes().len()
        );
        Ok(())
    }
}
