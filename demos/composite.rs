//! Walkthrough of the composite allocator: watch it create children on
//! demand, promote the busy ones and tear everything down at the end.
//!
//! Run with `RUST_LOG=debug` to see the growth events.

use alloclist::{AllocList, Block, Region};

fn log_alloc(what: &str, b: Block) {
    if b.is_null() {
        println!("{what}: failed");
    } else {
        println!("{what}: {} bytes at {:?}", b.len(), b.ptr());
    }
}

fn main() {
    tracing_subscriber::fmt::init();

    // Children are 64 KiB regions, or bigger when a request demands it.
    let mut list = AllocList::new(|n: usize| Region::with_capacity(n.max(64 * 1024)));

    let a = list.allocate(10_000);
    log_alloc("first request", a);

    let b = list.allocate(50_000);
    log_alloc("second request", b);

    // This one exceeds what is left in the first child, so a new child
    // appears and the slot array moves into it.
    let c = list.allocate(60_000);
    log_alloc("third request", c);

    // A request far beyond the default child size just makes the factory
    // produce a bigger child.
    let d = list.allocate(1 << 20);
    log_alloc("big request", d);

    unsafe {
        list.deallocate(b);
        list.deallocate(a);
        list.deallocate(c);
        list.deallocate(d);
    }
    println!("composite empty: {}", list.empty());

    list.deallocate_all();
    println!("composite empty after teardown: {}", list.empty());
}
