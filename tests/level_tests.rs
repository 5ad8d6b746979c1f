//! Level tests: placement, the ownership protocol, freeze, fusion and
//! board changes against runtime instances.

use blockfall::core::{Block, BlockChanges, Level, LevelBlock, Mgmt};
use blockfall::types::{Direction, Point, Rect, Tile};

fn l_block() -> Block {
    let tiles: Vec<Tile> = (0..4).map(|i| Tile::with_color('L', i)).collect();
    Block::with_rotations(
        &tiles,
        &[(true, 0, 0), (true, 0, 1), (true, 0, 2), (true, 1, 2)],
        4,
    )
}

fn instance(block: Block, pos: Point) -> LevelBlock {
    LevelBlock::new(block, None, pos, 0, false, None, false)
}

// ============== Scenario: Strict Placement On 20x20 ==============

#[test]
fn test_strict_placement_marks_owners() {
    let mut level = Level::new(20, 20);
    let lb = instance(l_block(), Point::new(5, 10));
    let id = level.block_add(lb, Mgmt::AutoStrictOwner).ok().unwrap();

    let placed = level.block(id).unwrap().coords();
    assert_eq!(placed.len(), 4);
    for p in &placed {
        assert_eq!(level.owner(*p), Some(id));
    }
    // the cells around the piece stay unowned
    assert_eq!(level.owner(Point::new(5, 9)), None);

    // a second overlapping instance is refused and handed back
    let again = level.block_add(instance(l_block(), Point::new(5, 10)), Mgmt::AutoStrictOwner);
    let lb = match again {
        Err(lb) => lb,
        Ok(_) => panic!("overlapping placement must fail"),
    };
    assert!(!lb.is_added());
    // it fits elsewhere
    assert!(level.block_add(lb, Mgmt::AutoStrictOwner).is_ok());
}

#[test]
fn test_placement_outside_board_fails() {
    let mut level = Level::new(20, 20);
    let res = level.block_add(instance(l_block(), Point::new(19, 10)), Mgmt::AutoStrictOwner);
    assert!(res.is_err());
    let res = level.block_add(instance(l_block(), Point::new(5, -1)), Mgmt::AutoStrictOwner);
    assert!(res.is_err());
}

#[test]
fn test_normal_instances_skip_board_bookkeeping() {
    let mut level = Level::new(10, 10);
    let a = level
        .block_add(instance(l_block(), Point::new(2, 2)), Mgmt::Normal)
        .ok()
        .unwrap();
    // overlapping Normal instances are fine, no cells are owned
    let b = level
        .block_add(instance(l_block(), Point::new(2, 2)), Mgmt::Normal)
        .ok()
        .unwrap();
    assert_ne!(a, b);
    for p in level.block(a).unwrap().coords() {
        assert_eq!(level.owner(p), None);
    }
}

// ============== Ownership Protocol ==============

#[test]
fn test_move_rotate_keeps_owners_in_sync() {
    let mut level = Level::new(20, 20);
    let id = level
        .block_add(instance(l_block(), Point::new(5, 10)), Mgmt::AutoStrictOwner)
        .ok()
        .unwrap();
    let before = level.block(id).unwrap().coords();
    let next_shape = {
        let lb = level.block(id).unwrap();
        lb.block().shape_next(lb.shape()).unwrap()
    };
    level.block_move_rotate(id, Some(next_shape), 1, 1);
    for p in before {
        // old footprint fully released unless re-covered
        let owner = level.owner(p);
        assert!(owner.is_none() || level.block(id).unwrap().coords().contains(&p));
    }
    for p in level.block(id).unwrap().coords() {
        assert_eq!(level.owner(p), Some(id));
    }
}

#[test]
fn test_block_modify_updates_owners() {
    let mut level = Level::new(10, 10);
    let domino = Block::from_shapes(
        &[Tile::new('a'), Tile::new('b')],
        &[vec![(true, 0, 0), (true, 0, 1)]],
    );
    let id = level
        .block_add(instance(domino, Point::new(3, 3)), Mgmt::AutoStrictOwner)
        .ok()
        .unwrap();
    let changes = BlockChanges {
        delta: Point::new(2, 0),
        remove: vec![0],
        add: vec![(Tile::new('c'), Point::new(1, 1), true)],
        ..Default::default()
    };
    let added = level.block_modify(id, &changes);
    assert_eq!(added.len(), 1);
    assert_eq!(level.owner(Point::new(3, 3)), None);
    assert_eq!(level.owner(Point::new(3, 4)), None);
    // remaining brick (0,1) and new brick (1,1) from pos (5,3)
    assert_eq!(level.owner(Point::new(5, 4)), Some(id));
    assert_eq!(level.owner(Point::new(6, 4)), Some(id));
}

// ============== Freeze ==============

#[test]
fn test_freeze_merges_bricks_into_board() {
    let mut level = Level::new(20, 20);
    let id = level
        .block_add(instance(l_block(), Point::new(5, 10)), Mgmt::AutoStrictOwner)
        .ok()
        .unwrap();
    let coords = level.block(id).unwrap().coords();
    assert!(level.block_freeze(id));
    assert!(level.block(id).is_none());
    for p in coords {
        assert!(!level.board_tile(p).is_empty());
        assert_eq!(level.owner(p), None);
    }
    // the spot is now taken for strict placement
    assert!(level
        .block_add(instance(l_block(), Point::new(5, 10)), Mgmt::AutoStrictOwner)
        .is_err());
    assert!(!level.block_freeze(id));
}

// ============== Fusion ==============

#[test]
fn test_fuse_keeps_absolute_cells_and_owners() {
    let mut level = Level::new(10, 10);
    let single = |ch: char| Block::from_shapes(&[Tile::new(ch)], &[vec![(true, 0, 0)]]);
    let master = level
        .block_add(instance(single('a'), Point::new(3, 3)), Mgmt::AutoStrictOwner)
        .ok()
        .unwrap();
    let victim = level
        .block_add(instance(single('b'), Point::new(4, 3)), Mgmt::AutoStrictOwner)
        .ok()
        .unwrap();
    assert!(level.block_fuse(master, victim));
    assert!(level.block(victim).is_none());
    let mut coords = level.block(master).unwrap().coords();
    coords.sort_unstable();
    assert_eq!(coords, vec![Point::new(3, 3), Point::new(4, 3)]);
    assert_eq!(level.owner(Point::new(3, 3)), Some(master));
    assert_eq!(level.owner(Point::new(4, 3)), Some(master));
    // fused catalog got fresh rotations
    assert_eq!(level.block(master).unwrap().block().tot_shapes(), 4);
}

#[test]
fn test_fuse_rejects_self_and_unknown() {
    let mut level = Level::new(5, 5);
    let single = Block::from_shapes(&[Tile::new('a')], &[vec![(true, 0, 0)]]);
    let id = level
        .block_add(instance(single, Point::new(1, 1)), Mgmt::AutoOwner)
        .ok()
        .unwrap();
    assert!(!level.block_fuse(id, id));
    assert!(!level.block_fuse(id, id + 7));
    assert!(!level.block_fuse(id + 7, id));
    assert!(level.block(id).is_some());
}

// ============== Board Changes ==============

#[test]
fn test_board_insert_up_pushes_content_up() {
    let mut level = Level::new(4, 4);
    level.set_board_tile(Point::new(1, 3), Tile::new('#'));
    level.set_board_tile(Point::new(3, 3), Tile::new('#'));
    // only columns 0..3 are affected
    level.board_insert(Direction::Up, Rect::new(0, 0, 3, 1));
    assert_eq!(level.board_tile(Point::new(1, 2)), Tile::new('#'));
    assert_eq!(level.board_tile(Point::new(1, 3)), Tile::EMPTY);
    assert_eq!(level.board_tile(Point::new(3, 3)), Tile::new('#'));
}

#[test]
fn test_board_insert_invalid_is_ignored() {
    let mut level = Level::new(4, 4);
    level.set_board_tile(Point::new(0, 0), Tile::new('#'));
    level.board_insert(Direction::Left, Rect::new(0, 0, 4, 1));
    level.board_insert(Direction::Up, Rect::new(0, 1, 4, 1));
    assert_eq!(level.board_tile(Point::new(0, 0)), Tile::new('#'));
}

#[test]
fn test_move_within_area_and_intersects() {
    let mut level = Level::new(20, 20);
    let id = level
        .block_add(instance(l_block(), Point::new(5, 10)), Mgmt::AutoStrictOwner)
        .ok()
        .unwrap();
    let board = level.board_rect();
    assert!(level.block_move_is_within_area(id, 0, 1, board));
    // footprint is rows 10..13, moving up 11 leaves the board
    assert!(!level.block_move_is_within_area(id, 0, -11, board));
    assert!(level.block_intersects_area(id, Rect::new(0, 12, 20, 1)));
    assert!(!level.block_intersects_area(id, Rect::new(0, 13, 20, 1)));
}
