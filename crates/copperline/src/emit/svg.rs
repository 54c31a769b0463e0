//! SVG preview writer: board outline with drill holes, filled silkscreen and
//! text annotations. SVG's Y axis points down, so everything is flipped and
//! translated back to the origin.

use crate::board::Board;
use crate::geom::{self, Poly};
use anyhow::{anyhow, Result};
use geo::{Coord, LineString, MapCoords, Polygon};
use std::io::Write;

const SPLIT_EPS: f64 = 1e-6;

fn flip(p: &Poly) -> Poly {
    p.map_coords(|c| Coord { x: c.x, y: -c.y })
}

fn translate(p: &Poly, dx: f64, dy: f64) -> Poly {
    p.map_coords(|c| Coord {
        x: c.x + dx,
        y: c.y + dy,
    })
}

fn ring_points(ring: &LineString<f64>) -> String {
    ring.coords()
        .map(|c| format!("{:.4},{:.4}", c.x, c.y))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Recursively split polygons with holes into simply connected pieces; SVG
/// polygons have no hole syntax worth relying on across viewers.
fn simple_pieces(p: &Poly, out: &mut Vec<Polygon<f64>>) {
    for po in &p.0 {
        if po.interiors().is_empty() {
            out.push(po.clone());
            continue;
        }
        let whole = Poly::new(vec![po.clone()]);
        let Some(b) = geom::bounds(&whole) else {
            continue;
        };
        let (x0, y0, x1, y1) = (b.min().x, b.min().y, b.max().x, b.max().y);
        let xm = (x0 + x1) / 2.0;
        simple_pieces(
            &geom::intersection(&whole, &geom::rect(x0, y0, xm + SPLIT_EPS, y1)),
            out,
        );
        simple_pieces(
            &geom::intersection(&whole, &geom::rect(xm - SPLIT_EPS, y0, x1, y1)),
            out,
        );
    }
}

fn escape(s: &str) -> String {
    s.replace('&', "&amp;").replace('<', "&lt;").replace('>', "&gt;")
}

pub fn write<W: Write>(f: &mut W, board: &Board) -> Result<()> {
    // Outline minus any hole a viewer would care to see.
    let mut block = board.outline();
    for (dia_um, hits) in board.holes() {
        if *dia_um > 300 {
            let r = *dia_um as f64 / 2000.0;
            let discs = geom::union_all(hits.iter().map(|p| geom::disc(*p, r)));
            block = geom::difference(&block, &discs);
        }
    }

    let block = flip(&block);
    let b = geom::bounds(&block).ok_or_else(|| anyhow!("empty board outline"))?;
    let (x0, y0) = (b.min().x, b.min().y);
    let (w, h) = (b.max().x - x0, b.max().y - y0);
    let block = translate(&block, -x0, -y0);

    writeln!(f, r#"<?xml version="1.0" encoding="utf-8"?>"#)?;
    writeln!(
        f,
        r#"<svg xmlns="http://www.w3.org/2000/svg" width="{:.4}mm" height="{:.4}mm" viewBox="0 0 {:.4} {:.4}">"#,
        w, h, w, h
    )?;

    for po in &block.0 {
        for ring in std::iter::once(po.exterior()).chain(po.interiors()) {
            writeln!(
                f,
                r#"<polyline points="{}" stroke="red" fill-opacity="0" stroke-width="0.1"/>"#,
                ring_points(ring)
            )?;
        }
    }

    let silk = translate(&flip(&board.layer("GTO")?.merged()), -x0, -y0);
    let mut pieces = Vec::new();
    simple_pieces(&silk, &mut pieces);
    for po in &pieces {
        writeln!(
            f,
            r#"<polygon points="{}" fill="black" fill-opacity="1" stroke-width="0"/>"#,
            ring_points(po.exterior())
        )?;
    }
    for po in &silk.0 {
        for ring in std::iter::once(po.exterior()).chain(po.interiors()) {
            writeln!(
                f,
                r#"<polyline points="{}" stroke="blue" fill-opacity="0" stroke-width="0.1"/>"#,
                ring_points(ring)
            )?;
        }
    }

    for (p, text) in board.annotations() {
        writeln!(
            f,
            r#"<text x="{:.4}" y="{:.4}" font-size="1" fill="red">{}</text>"#,
            p.x - x0,
            -p.y - y0,
            escape(text)
        )?;
    }

    writeln!(f, "</svg>")?;
    Ok(())
}
