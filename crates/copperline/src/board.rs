use crate::cursor::Cursor;
use crate::geom::{self, Poly};
use crate::part::{Footprint, Part};
use anyhow::{anyhow, Context, Result};
use kurbo::Point;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path as StdPath;

/// The board construction parameters. All fields are required; there are no
/// defaults. Dimensions in millimeters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DesignRules {
    /// Trace width.
    pub trace: f64,
    /// Trace-to-trace spacing.
    pub space: f64,
    /// Via drill diameter.
    pub via_hole: f64,
    /// Via pad diameter.
    pub via: f64,
    /// Via-to-copper clearance.
    pub via_space: f64,
    /// Silkscreen stroke width.
    pub silk: f64,
}

impl DesignRules {
    /// Load design rules from a JSON file.
    pub fn load_from_path<P: AsRef<StdPath>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let data =
            fs::read(path).with_context(|| format!("read design rules {}", path.display()))?;
        let rules: DesignRules =
            serde_json::from_slice(&data).context("deserialize design rules")?;
        Ok(rules)
    }
}

/// One named layer: an ordered list of (net tag, polygon) entries.
#[derive(Debug, Clone)]
pub struct Layer {
    pub name: String,
    pub desc: String,
    polys: Vec<(Option<String>, Poly)>,
}

impl Layer {
    fn new(name: &str, desc: &str) -> Self {
        Layer {
            name: name.to_string(),
            desc: desc.to_string(),
            polys: Vec::new(),
        }
    }

    /// Append a polygon tagged with an optional net name. Input is
    /// self-repaired before it enters the layer.
    pub fn add(&mut self, net: Option<&str>, poly: Poly) {
        self.polys.push((net.map(|s| s.to_string()), geom::repair(&poly)));
    }

    pub fn entries(&self) -> &[(Option<String>, Poly)] {
        &self.polys
    }

    /// Union of every entry on the layer.
    pub fn merged(&self) -> Poly {
        geom::union_all(self.polys.iter().map(|(_, p)| p.clone()))
    }

    /// Ground-plane pour. Replaces the layer's entries wholesale with the
    /// foreign copper plus one pour polygon tagged `target`:
    /// excluded ∪ (included − buffer(excluded, clearance)), where included is
    /// the background united with everything tagged `target` and excluded is
    /// everything else. Subtracting the grown exclusion guarantees the
    /// clearance without per-point distance checks.
    pub fn paint(&mut self, background: &Poly, target: &str, clearance: f64) {
        let included = geom::union(
            background,
            &geom::union_all(
                self.polys
                    .iter()
                    .filter(|(n, _)| n.as_deref() == Some(target))
                    .map(|(_, p)| p.clone()),
            ),
        );
        let foreign: Vec<(Option<String>, Poly)> = self
            .polys
            .iter()
            .filter(|(n, _)| n.as_deref() != Some(target))
            .cloned()
            .collect();
        let excluded = geom::union_all(foreign.iter().map(|(_, p)| p.clone()));
        let pour = geom::difference(&included, &geom::buffer(&excluded, clearance));

        debug!(
            "paint {}: {} foreign entries, pour has {} polygons",
            self.name,
            foreign.len(),
            pour.0.len()
        );
        self.polys = foreign;
        self.polys.push((Some(target.to_string()), pour));
    }
}

/// A recorded electrical connection: a chain of (part id, pad name) ends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Net {
    pub ends: Vec<(String, String)>,
}

pub(crate) struct PlacedPart {
    pub part: Part,
    pub footprint: Option<Box<dyn Footprint>>,
}

/// The board under construction: layers, rules, parts, drills, keepouts and
/// the net list. One per build; everything references it explicitly.
pub struct Board {
    pub size: (f64, f64),
    pub rules: DesignRules,
    layers: Vec<Layer>,
    /// Drill hits grouped by diameter in integer micrometers.
    holes: BTreeMap<u32, Vec<Point>>,
    keepouts: Vec<Poly>,
    counters: HashMap<String, usize>,
    parts: BTreeMap<String, PlacedPart>,
    pub nets: Vec<Net>,
    annotations: Vec<(Point, String)>,
}

const LAYER_SET: [(&str, &str); 10] = [
    ("GTP", "Top Paste"),
    ("GTO", "Top Silkscreen"),
    ("GTS", "Top Solder Mask"),
    ("GTL", "Top Copper"),
    ("GL2", "Inner Layer 2"),
    ("GL3", "Inner Layer 3"),
    ("GBL", "Bottom Copper"),
    ("GBO", "Bottom Silkscreen"),
    ("GBS", "Bottom Solder Mask"),
    ("GBP", "Bottom Paste"),
];

impl Board {
    pub const COPPER_LAYERS: [&'static str; 4] = ["GTL", "GL2", "GL3", "GBL"];

    pub fn new(size: (f64, f64), rules: DesignRules) -> Self {
        Board {
            size,
            rules,
            layers: LAYER_SET.iter().map(|(n, d)| Layer::new(n, d)).collect(),
            holes: BTreeMap::new(),
            keepouts: Vec::new(),
            counters: HashMap::new(),
            parts: BTreeMap::new(),
            nets: Vec::new(),
            annotations: Vec::new(),
        }
    }

    /// Track pitch: trace width plus spacing. This is the river pitch and the
    /// routing lattice spacing.
    pub fn pitch(&self) -> f64 {
        self.rules.trace + self.rules.space
    }

    /// A new drawing cursor on the top copper layer, primed with the board's
    /// trace width.
    pub fn dc(&self, xy: Point, dir: f64) -> Cursor {
        let mut c = Cursor::new(xy, dir);
        c.set_width(self.rules.trace);
        c
    }

    pub fn layer(&self, name: &str) -> Result<&Layer> {
        self.layers
            .iter()
            .find(|l| l.name == name)
            .ok_or_else(|| anyhow!("unknown layer '{}'", name))
    }

    pub fn layer_mut(&mut self, name: &str) -> Result<&mut Layer> {
        self.layers
            .iter_mut()
            .find(|l| l.name == name)
            .ok_or_else(|| anyhow!("unknown layer '{}'", name))
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    /// The rectangular board outline on the mechanical layer.
    pub fn outline(&self) -> Poly {
        geom::rect(0.0, 0.0, self.size.0, self.size.1)
    }

    /// Register a drill hit.
    pub fn drill(&mut self, xy: Point, dia: f64) {
        let key = (dia * 1000.0).round() as u32;
        self.holes.entry(key).or_default().push(xy);
    }

    /// Drill hits grouped by diameter in micrometers, ascending.
    pub fn holes(&self) -> &BTreeMap<u32, Vec<Point>> {
        &self.holes
    }

    pub fn keepout(&mut self, poly: Poly) {
        self.keepouts.push(geom::repair(&poly));
    }

    pub fn keepouts(&self) -> &[Poly] {
        &self.keepouts
    }

    /// Freeform text annotation, carried to the SVG preview only.
    pub fn annotate(&mut self, xy: Point, text: &str) {
        self.annotations.push((xy, text.to_string()));
    }

    pub fn annotations(&self) -> &[(Point, String)] {
        &self.annotations
    }

    fn assign(&mut self, family: &str) -> String {
        let n = self.counters.entry(family.to_string()).or_insert(0);
        *n += 1;
        format!("{}{}", family, n)
    }

    /// Place a footprint at the given cursor. Assigns the per-family id, runs
    /// the footprint's placement procedure and registers the part.
    pub fn place(
        &mut self,
        fp: Box<dyn Footprint>,
        mut dc: Cursor,
        value: Option<&str>,
    ) -> Result<String> {
        let id = self.assign(fp.family());
        dc.part = Some(id.clone());
        info!("placing {} at ({:.3}, {:.3})", id, dc.xy().x, dc.xy().y);
        let mut part = Part::new(&id, value, dc.fork());
        fp.place(&mut dc, self, &mut part)
            .with_context(|| format!("place {}", id))?;
        self.parts.insert(
            id.clone(),
            PlacedPart {
                part,
                footprint: Some(fp),
            },
        );
        Ok(id)
    }

    pub fn part(&self, id: &str) -> Result<&Part> {
        self.parts
            .get(id)
            .map(|p| &p.part)
            .ok_or_else(|| anyhow!("unknown part '{}'", id))
    }

    /// A cloned cursor for the named pad of the named part.
    pub fn pad_cursor(&self, part: &str, pad: &str) -> Result<Cursor> {
        Ok(self.part(part)?.pad_named(pad)?.fork())
    }

    /// Run the footprint's escape procedure, fanning its pads out to
    /// routable cursors.
    pub fn escape(&mut self, id: &str) -> Result<Vec<Cursor>> {
        let mut placed = self
            .parts
            .remove(id)
            .ok_or_else(|| anyhow!("unknown part '{}'", id))?;
        let fp = match placed.footprint.take() {
            Some(fp) => fp,
            None => {
                self.parts.insert(id.to_string(), placed);
                return Err(anyhow!("part '{}' has no footprint attached", id));
            }
        };
        let out = fp.escape(&placed.part, self);
        placed.footprint = Some(fp);
        self.parts.insert(id.to_string(), placed);
        out
    }

    /// Record an electrical connection between pad endpoints.
    pub fn add_net(&mut self, ends: Vec<(String, String)>) {
        self.nets.push(Net { ends });
    }
}
