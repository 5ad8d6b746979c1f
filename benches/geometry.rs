use criterion::{black_box, criterion_group, criterion_main, Criterion};

use blockfall::core::{Block, Level, LevelBlock, Mgmt};
use blockfall::types::{Direction, Point, Tile};

fn l_block() -> Block {
    let tiles: Vec<Tile> = (0..4).map(|i| Tile::with_color('L', i)).collect();
    Block::with_rotations(
        &tiles,
        &[(true, 0, 0), (true, 0, 1), (true, 0, 2), (true, 1, 2)],
        4,
    )
}

fn bench_catalog_build(c: &mut Criterion) {
    c.bench_function("build_l_catalog", |b| {
        b.iter(|| black_box(l_block()))
    });
}

fn bench_contacts(c: &mut Criterion) {
    let block = l_block();
    let sid = block.shape_first().unwrap();
    c.bench_function("shape_contacts", |b| {
        b.iter(|| black_box(block.shape_contacts(sid, black_box(Direction::Down))))
    });
}

fn bench_fuse(c: &mut Criterion) {
    let block = l_block();
    let sid = block.shape_first().unwrap();
    c.bench_function("fuse_l_pair", |b| {
        b.iter(|| black_box(Block::fuse(&block, sid, &block, sid, Point::new(2, 0))))
    });
}

fn bench_block_move(c: &mut Criterion) {
    let mut level = Level::new(40, 40);
    let lb = LevelBlock::new(l_block(), None, Point::new(10, 10), 0, false, None, false);
    let id = level.block_add(lb, Mgmt::AutoStrictOwner).ok().unwrap();
    let mut dx = 1;
    c.bench_function("block_move", |b| {
        b.iter(|| {
            level.block_move(id, dx, 0);
            dx = -dx;
        })
    });
}

criterion_group!(
    benches,
    bench_catalog_build,
    bench_contacts,
    bench_fuse,
    bench_block_move
);
criterion_main!(benches);
