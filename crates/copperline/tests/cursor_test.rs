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

fn board() -> Board {
    Board::new((20.0, 20.0), rules())
}

#[test]
fn test_push_pop_nest() {
    let b = board();
    let mut dc = b.dc(Point::new(5.0, 5.0), 0.0);
    dc.push();
    dc.forward(3.0);
    dc.right(90.0);
    dc.push();
    dc.forward(2.0);
    dc.pop().expect("inner pop");
    assert!((dc.xy() - Point::new(5.0, 8.0)).hypot() < 1e-9);
    assert!((dc.dir() - 90.0).abs() < 1e-9);
    dc.pop().expect("outer pop");
    assert!((dc.xy() - Point::new(5.0, 5.0)).hypot() < 1e-9);
    assert!(dc.dir().abs() < 1e-9);
}

#[test]
fn test_approach_stops_short_of_line() {
    let b = board();
    // heading +Y toward the line y = 8 running along +X
    let mut dc = b.dc(Point::new(3.0, 2.0), 0.0);
    let target = b.dc(Point::new(10.0, 8.0), 90.0);
    dc.approach(1.0, &target).expect("approach");
    assert!((dc.xy().y - 7.0).abs() < 1e-9);
    assert!((dc.xy().x - 3.0).abs() < 1e-9);
}

#[test]
fn test_approach_rejects_parallel_headings() {
    let b = board();
    let mut dc = b.dc(Point::new(3.0, 2.0), 0.0);
    let target = b.dc(Point::new(10.0, 8.0), 0.0);
    assert!(dc.approach(1.0, &target).is_err());
}

#[test]
fn test_wire_commits_tagged_copper() {
    let mut b = board();
    let mut dc = b.dc(Point::new(5.0, 5.0), 0.0);
    dc.set_name("CLK");
    dc.forward(4.0);
    dc.wire(&mut b).expect("wire");
    let entries = b.layer("GTL").expect("GTL").entries();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].0.as_deref(), Some("CLK"));
    // committing again without movement is a no-op
    dc.wire(&mut b).expect("wire again");
    assert_eq!(b.layer("GTL").expect("GTL").entries().len(), 1);
}

#[test]
fn test_via_stamps_copper_and_drills() {
    let mut b = board();
    let mut dc = b.dc(Point::new(10.0, 10.0), 0.0);
    dc.via(&mut b, Some("GL2")).expect("via");
    for name in ["GTL", "GL3", "GBL"] {
        assert_eq!(b.layer(name).expect("layer").entries().len(), 1, "{}", name);
    }
    assert!(b.layer("GL2").expect("GL2").entries().is_empty());
    assert_eq!(b.holes()[&300].len(), 1);
}

#[test]
fn test_interp_draws_and_commits() {
    let mut b = board();
    let mut dc = b.dc(Point::new(2.0, 2.0), 0.0);
    dc.interp(&mut b, "f 3 + f 2 - f 1 .").expect("interp");
    assert_eq!(b.layer("GTL").expect("GTL").entries().len(), 1);
    assert!((dc.xy() - Point::new(4.0, 6.0)).hypot() < 1e-9);
    assert!(dc.dir().abs() < 1e-9);
}

#[test]
fn test_interp_arity_and_unknown_token() {
    let mut b = board();
    let mut dc = b.dc(Point::new(2.0, 2.0), 0.0);
    let err = dc.interp(&mut b, "f").unwrap_err();
    assert!(err.to_string().contains("numeric argument"));
    let err = dc.interp(&mut b, "f x").unwrap_err();
    assert!(err.to_string().contains("bad numeric argument"));
    let err = dc.interp(&mut b, "q").unwrap_err();
    assert!(err.to_string().contains("unknown drawing token"));
}

#[test]
fn test_mirrored_cursor_parity() {
    let b = board();
    let mut dc = b.dc(Point::new(5.0, 5.0), 0.0).mirrored();
    dc.right(90.0);
    dc.forward(1.0);
    // mirrored right turn goes to the left
    assert!((dc.xy() - Point::new(4.0, 5.0)).hypot() < 1e-9);
    // mirroring twice restores the original sense
    let mut dc2 = dc.mirrored();
    dc2.left(90.0);
    assert!((dc2.dir() - 180.0).abs() < 1e-9);
}
