//! Excellon drill file writer. One tool per distinct diameter, ascending,
//! numbered from T2; hit coordinates are zero-padded integer micrometers.

use anyhow::Result;
use kurbo::Point;
use std::collections::BTreeMap;
use std::io::Write;

fn number(n: f64) -> String {
    format!("{:03}", (n * 1000.0).round() as i64)
}

/// Write the drill registry: diameters keyed in integer micrometers, hits in
/// millimeters.
pub fn write_drills<W: Write>(f: &mut W, holes: &BTreeMap<u32, Vec<Point>>) -> Result<()> {
    write!(f, "M48\nFMAT,2\nICI,OFF\nMETRIC,TZ,000.000\n")?;
    for (i, dia_um) in holes.keys().enumerate() {
        writeln!(f, "T{}C{:.3}", i + 2, *dia_um as f64 / 1000.0)?;
    }
    write!(f, "%\nG90\nM71\n")?;
    for (i, hits) in holes.values().enumerate() {
        writeln!(f, "T{}", i + 2)?;
        for p in hits {
            writeln!(f, "X{}Y{}", number(p.x), number(p.y))?;
        }
    }
    writeln!(f, "M30")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tools_ascend_from_t2() {
        let mut holes = BTreeMap::new();
        holes.insert(1000u32, vec![Point::new(5.0, 5.0)]);
        holes.insert(300u32, vec![Point::new(1.0, 2.0), Point::new(3.0, 4.0)]);
        let mut buf = Vec::new();
        write_drills(&mut buf, &holes).expect("write");
        let s = String::from_utf8(buf).expect("utf8");
        // smaller diameter first
        let t2 = s.find("T2C0.300").expect("T2");
        let t3 = s.find("T3C1.000").expect("T3");
        assert!(t2 < t3);
        assert!(s.starts_with("M48\nFMAT,2\nICI,OFF\nMETRIC,TZ,000.000\n"));
        assert!(s.ends_with("M30\n"));
    }

    #[test]
    fn test_hit_coordinates_in_micrometers() {
        let mut holes = BTreeMap::new();
        holes.insert(300u32, vec![Point::new(1.5, 0.025)]);
        let mut buf = Vec::new();
        write_drills(&mut buf, &holes).expect("write");
        let s = String::from_utf8(buf).expect("utf8");
        assert!(s.contains("X1500Y025\n"), "got {}", s);
    }
}
