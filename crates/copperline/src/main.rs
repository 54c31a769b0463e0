use anyhow::Result;
use copperline::route::hex::{Hex, HexGrid};
use copperline::route::rect::RectGrid;
use copperline::*;
use kurbo::Point;

fn main() {
    env_logger::init();
    let args: Vec<String> = std::env::args().collect();
    let demo = args.get(1).map(|s| s.as_str()).unwrap_or("board");

    let r = match demo {
        "board" => demo_board(),
        "hex" => demo_hex(),
        _ => {
            println!("Usage: copperline [board|hex]");
            println!("  board  - place parts, route and write fabrication files (default)");
            println!("  hex    - route on the hexagonal lattice");
            return;
        }
    };
    if let Err(e) = r {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

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

fn demo_board() -> Result<()> {
    let mut board = Board::new((30.0, 30.0), rules());

    let dc = board.dc(Point::new(15.0, 15.0), 0.0);
    let u1 = board.place(Box::new(Qfn64), dc, None)?;
    let dc = board.dc(Point::new(5.0, 24.0), 0.0);
    let c1 = board.place(Box::new(Discrete0402), dc, Some("100n"))?;
    println!("placed {} and {}", u1, c1);

    // mounting holes
    for (x, y) in [(2.0, 2.0), (28.0, 2.0), (2.0, 28.0), (28.0, 28.0)] {
        board.drill(Point::new(x, y), 2.5);
    }

    // hand-drawn trace off the capacitor, command-interpreter style
    let mut dc = board.pad_cursor(&c1, "1")?;
    dc.interp(&mut board, "f 1 r 45 f 2 l 45 f 3 .")?;

    // one maze-routed signal across the board
    let mut grid = RectGrid::from_board(&board, ["GTL", "GBL"])?;
    let route = grid.route((0, 5, 5), (1, 70, 70))?;
    println!("routed {} cells, cost {}, {} vias", route.cells.len(), route.cost, route.vias);
    grid.commit(&route);
    grid.wire(&mut board, &route)?;

    // ground pour on inner layer 2
    let outline = board.outline();
    let clearance = board.rules.space;
    board.layer_mut("GL2")?.paint(&outline, "GND", clearance);

    board.save("copperline-demo")?;
    println!("wrote copperline-demo.*");
    Ok(())
}

fn demo_hex() -> Result<()> {
    let mut board = Board::new((20.0, 20.0), rules());

    let mut grid = HexGrid::from_board(&board, &["GTL"])?;
    let pitch = board.pitch();
    let a = Hex::from_xy(Point::new(3.0, 3.0), pitch);
    let b = Hex::from_xy(Point::new(17.0, 16.0), pitch);
    grid.route("GTL", a, b)?;
    grid.wire_routes(&mut board)?;
    println!("routed {} hex cells", grid.routes()[0].cells.len());

    board.save("copperline-hex")?;
    println!("wrote copperline-hex.*");
    Ok(())
}
