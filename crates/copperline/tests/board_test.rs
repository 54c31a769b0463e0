use copperline::geom;
use copperline::*;
use kurbo::Point;

fn rules() -> DesignRules {
    DesignRules {
        trace: 0.2,
        space: 0.2,
        via_hole: 0.3,
        via: 0.6,
        via_space: 0.2,
        silk: 0.15,
    }
}

#[test]
fn test_paint_pours_with_clearance() {
    let mut b = Board::new((20.0, 20.0), rules());

    // ground stitching via plus one foreign trace on the inner layer
    let mut gnd = b.dc(Point::new(5.0, 5.0), 0.0);
    gnd.set_name("GND");
    gnd.via(&mut b, None).expect("via");
    let mut sig = b.dc(Point::new(10.0, 2.0), 0.0);
    sig.set_layer("GL2");
    sig.set_name("CLK");
    sig.forward(16.0);
    sig.wire(&mut b).expect("wire");

    let outline = b.outline();
    let clearance = 0.4;
    b.layer_mut("GL2").expect("GL2").paint(&outline, "GND", clearance);

    let entries = b.layer("GL2").expect("GL2").entries();
    // one preserved foreign trace plus the pour
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].0.as_deref(), Some("CLK"));
    assert_eq!(entries[1].0.as_deref(), Some("GND"));

    let foreign = &entries[0].1;
    let pour = &entries[1].1;
    // pour fills most of the board but honors the clearance
    assert!(geom::intersects(pour, &geom::disc(Point::new(15.0, 15.0), 0.1)));
    // margin allows for the offset arc approximation
    let grown = geom::buffer(foreign, clearance / 4.0);
    assert!(
        !geom::intersects(pour, &grown),
        "pour violates the clearance around foreign copper"
    );
}

#[test]
fn test_paint_replaces_entries_wholesale() {
    let mut b = Board::new((10.0, 10.0), rules());
    for i in 0..5 {
        let mut dc = b.dc(Point::new(1.0 + i as f64, 1.0), 0.0);
        dc.set_layer("GL2");
        dc.set_name("GND");
        dc.forward(2.0);
        dc.wire(&mut b).expect("wire");
    }
    let outline = b.outline();
    b.layer_mut("GL2").expect("GL2").paint(&outline, "GND", 0.4);
    // all five tagged entries collapse into the single pour
    assert_eq!(b.layer("GL2").expect("GL2").entries().len(), 1);
}

#[test]
fn test_place_pad_cursor_and_net() {
    let mut b = Board::new((20.0, 20.0), rules());
    let dc = b.dc(Point::new(6.0, 6.0), 0.0);
    let c1 = b.place(Box::new(Discrete0402), dc, Some("10k")).expect("place");
    let dc = b.dc(Point::new(12.0, 6.0), 0.0);
    let c2 = b.place(Box::new(Discrete0402), dc, None).expect("place");
    assert_eq!((c1.as_str(), c2.as_str()), ("C1", "C2"));

    let pad = b.pad_cursor(&c1, "2").expect("pad cursor");
    assert_eq!(pad.part.as_deref(), Some("C1"));
    assert!(b.pad_cursor(&c1, "9").is_err());
    assert!(b.pad_cursor("C9", "1").is_err());

    b.add_net(vec![
        ("C1".to_string(), "2".to_string()),
        ("C2".to_string(), "1".to_string()),
    ]);
    assert_eq!(b.nets.len(), 1);
    assert_eq!(b.nets[0].ends[1].0, "C2");
}

#[test]
fn test_design_rules_round_trip() {
    let dir = std::env::temp_dir();
    let path = dir.join(format!("copperline-rules-{}.json", std::process::id()));
    let json = serde_json::to_string(&rules()).expect("serialize");
    std::fs::write(&path, json).expect("write");
    let loaded = DesignRules::load_from_path(&path).expect("load");
    assert!((loaded.trace - 0.2).abs() < 1e-12);
    assert!((loaded.via - 0.6).abs() < 1e-12);
    std::fs::remove_file(&path).ok();

    assert!(DesignRules::load_from_path("/nonexistent/rules.json").is_err());
}

#[test]
fn test_keepouts_and_annotations() {
    let mut b = Board::new((10.0, 10.0), rules());
    b.keepout(geom::rect(1.0, 1.0, 3.0, 3.0));
    b.annotate(Point::new(5.0, 5.0), "J1");
    assert_eq!(b.keepouts().len(), 1);
    assert_eq!(b.annotations().len(), 1);
    assert_eq!(b.annotations()[0].1, "J1");
}
