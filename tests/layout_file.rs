use std::path::Path;

use itch_depth::LayoutTable;

#[test]
fn test_shipped_layout_file_matches_builtin_table() {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("layouts/pse_itch.toml");
    let loaded = LayoutTable::from_file(&path).unwrap();
    let builtin = LayoutTable::default();

    assert_eq!(loaded.tags(), builtin.tags());
    for tag in builtin.tags() {
        assert_eq!(loaded.get(tag), builtin.get(tag), "layout {}", tag as char);
    }
}
