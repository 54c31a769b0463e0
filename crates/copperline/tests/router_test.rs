use copperline::route::hex::{Hex, HexGrid};
use copperline::route::rect::RectGrid;
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
fn test_rect_grid_samples_copper() {
    let mut b = Board::new((8.0, 8.0), rules());
    // a fat vertical bar through the middle of the top layer
    let mut dc = b.dc(Point::new(4.0, 1.0), 0.0);
    dc.set_width(1.0);
    dc.forward(6.0);
    dc.wire(&mut b).expect("wire");

    let grid = RectGrid::from_board(&b, ["GTL", "GBL"]).expect("grid");
    let (_, x, y) = grid.cell_at(0, Point::new(4.0, 4.0)).expect("cell");
    assert!(grid.is_blocked(0, x, y), "cell under the bar is blocked");
    let (_, x, y) = grid.cell_at(1, Point::new(4.0, 4.0)).expect("cell");
    assert!(!grid.is_blocked(1, x, y), "bottom layer stays clear");
    assert!(grid.cell_at(0, Point::new(9.0, 1.0)).is_none());
}

#[test]
fn test_rect_route_avoids_copper_or_vias_through() {
    let mut b = Board::new((8.0, 8.0), rules());
    let mut dc = b.dc(Point::new(4.0, 0.2), 0.0);
    dc.set_width(0.8);
    dc.forward(7.6);
    dc.wire(&mut b).expect("wire");

    let mut grid = RectGrid::from_board(&b, ["GTL", "GBL"]).expect("grid");
    let start = grid.cell_at(0, Point::new(1.0, 4.0)).expect("start");
    let goal = grid.cell_at(0, Point::new(7.0, 4.0)).expect("goal");
    let route = grid.route(start, goal).expect("route");
    // the bar spans the full height of the top layer, so the route must
    // change layers to cross it
    assert!(route.vias >= 2, "expected a layer change, got {} vias", route.vias);
    grid.commit(&route);
    grid.wire(&mut b, &route).expect("wire route");
    assert!(!b.layer("GBL").expect("GBL").entries().is_empty());
    // each layer change left a drill hit
    assert_eq!(b.holes()[&300].len(), route.vias);
}

#[test]
fn test_hex_route_avoids_copper() {
    let mut b = Board::new((10.0, 10.0), rules());
    // horizontal wall with a gap near the right edge
    let mut dc = b.dc(Point::new(0.2, 5.0), 90.0);
    dc.set_width(0.8);
    dc.forward(7.0);
    dc.wire(&mut b).expect("wire");

    let mut grid = HexGrid::from_board(&b, &["GTL"]).expect("grid");
    let pitch = b.pitch();
    let a = Hex::from_xy(Point::new(5.0, 2.0), pitch);
    let goal = Hex::from_xy(Point::new(5.0, 8.0), pitch);
    grid.route("GTL", a, goal).expect("route");

    let route = &grid.routes()[0];
    // every committed cell is clear of the wall copper
    for h in &route.cells[1..route.cells.len() - 1] {
        let p = h.to_plane(pitch);
        assert!(
            !(p.y > 4.4 && p.y < 5.6 && p.x < 7.4),
            "route crosses the wall at {:?}",
            p
        );
    }

    grid.wire_routes(&mut b).expect("wire routes");
    // the original wall plus the routed trace
    assert!(b.layer("GTL").expect("GTL").entries().len() >= 2);
}

#[test]
fn test_hex_routes_block_each_other() {
    let b = Board::new((10.0, 10.0), rules());
    let mut grid = HexGrid::from_board(&b, &["GTL"]).expect("grid");
    let pitch = b.pitch();
    let a = Hex::from_xy(Point::new(2.0, 5.0), pitch);
    let c = Hex::from_xy(Point::new(8.0, 5.0), pitch);
    grid.route("GTL", a, c).expect("first");
    let first_len = grid.routes()[0].cells.len();

    // the second signal crosses the first one's corridor and must go around
    let d = Hex::from_xy(Point::new(5.0, 2.0), pitch);
    let e = Hex::from_xy(Point::new(5.0, 8.0), pitch);
    grid.route("GTL", d, e).expect("second");
    let second = &grid.routes()[1];
    for cell in &second.cells {
        assert!(
            !grid.routes()[0].cells.contains(cell),
            "second route reuses a committed cell"
        );
    }
    assert!(first_len > 0 && second.cells.len() > 0);
}
