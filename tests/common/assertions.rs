// Custom assertions for deletion tests

use super::{StoreCall, TestFiler};
use filer::FullPath;

/// Assert that no path in `store` lies under `dir`, and `dir` itself is gone.
pub fn assert_subtree_gone(harness: &TestFiler, dir: &str) {
    let dir = FullPath::new(dir);
    let leftovers: Vec<FullPath> = harness
        .paths()
        .into_iter()
        .filter(|p| *p == dir || p.is_under(&dir))
        .collect();
    assert!(leftovers.is_empty(), "entries left under {}: {:?}", dir, leftovers);
}

/// Assert that no mutating store call was made.
pub fn assert_no_mutations(harness: &TestFiler) {
    let mutations = harness.store.mutations();
    assert!(mutations.is_empty(), "unexpected mutations: {:?}", mutations);
}

/// Assert that every subdirectory's children were deleted before its parent's.
pub fn assert_children_before_parents(calls: &[StoreCall]) {
    let order: Vec<&FullPath> = calls
        .iter()
        .filter_map(|c| match c {
            StoreCall::DeleteFolderChildren(p) => Some(p),
            _ => None,
        })
        .collect();

    for (i, dir) in order.iter().enumerate() {
        for later in &order[i + 1..] {
            assert!(
                !later.is_under(dir),
                "{} deleted after its ancestor {}",
                later,
                dir
            );
        }
    }
}
