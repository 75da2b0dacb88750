use crate::Mapping;

/// Package layout to index layout, processed in this order.
///
/// The last row deliberately leaves both roots: it links the per-program
/// `Settings` sibling of a version directory into the `Settings` sibling of
/// the index.
pub const MAPPINGS: &[Mapping] = &[
    Mapping::new("/lib", "/lib"),
    Mapping::new("/lib64", "/lib"),
    Mapping::new("/libexec", "/libexec"),
    Mapping::new("/include", "/include"),
    Mapping::new("/share", "/share"),
    Mapping::new("/bin", "/bin"),
    Mapping::new("/sbin", "/bin"),
    Mapping::new("/Resources/Wrappers", "/bin"),
    Mapping::new("/../Settings", "/../Settings"),
];

#[test]
fn test_mappings_are_rooted() {
    assert_eq!(MAPPINGS.len(), 9);
    for m in MAPPINGS {
        assert!(m.source.starts_with('/'), "{m}");
        assert!(m.target.starts_with('/'), "{m}");
    }
}

#[test]
fn test_bin_merges_three_sources() {
    let sources: Vec<&str> = MAPPINGS
        .iter()
        .filter(|m| m.target == "/bin")
        .map(|m| m.source)
        .collect();
    assert_eq!(sources, ["/bin", "/sbin", "/Resources/Wrappers"]);
}
