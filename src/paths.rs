use std::ffi::{OsStr, OsString};
use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};

/// Appends `suffix` to `base` as plain text.
///
/// `Path::join` would discard `base` for suffixes starting with `/`, and the
/// mapping table is made of exactly such suffixes, so no normalization happens
/// here at all.
pub fn concat(base: &Path, suffix: &str) -> PathBuf {
    let mut s = OsString::from(base.as_os_str());
    s.push(suffix);
    PathBuf::from(s)
}

/// Any stat failure counts as "not a directory".
pub fn is_dir(path: &Path) -> bool {
    fs::metadata(path).map(|m| m.is_dir()).unwrap_or(false)
}

/// Everything after the last `/`, or the whole path when there is none.
pub fn base_name(path: &Path) -> &OsStr {
    let bytes = path.as_os_str().as_bytes();
    match bytes.iter().rposition(|b| *b == b'/') {
        Some(i) => OsStr::from_bytes(&bytes[i + 1..]),
        None => path.as_os_str(),
    }
}

#[test]
fn test_concat_keeps_separators() {
    let p = concat(Path::new("/System/Index"), "/bin");
    assert_eq!(p, PathBuf::from("/System/Index/bin"));
    let p = concat(Path::new("/Programs/Foo/1.0/"), "/lib");
    assert_eq!(p.as_os_str(), "/Programs/Foo/1.0//lib");
    let p = concat(Path::new("/Programs/Foo/1.0"), "/../Settings");
    assert_eq!(p.as_os_str(), "/Programs/Foo/1.0/../Settings");
}

#[test]
fn test_is_dir() -> anyhow::Result<()> {
    let tmp = tempfile::TempDir::new()?;
    let file = tmp.path().join("file");
    fs::write(&file, b"x")?;
    assert!(is_dir(tmp.path()));
    assert!(!is_dir(&file));
    assert!(!is_dir(&tmp.path().join("missing")));
    Ok(())
}

#[test]
fn test_base_name() {
    assert_eq!(base_name(Path::new("/Programs/Glibc/2.31/bin/ldd")), "ldd");
    assert_eq!(base_name(Path::new("ldd")), "ldd");
    assert_eq!(base_name(Path::new("/usr/lib/")), "");
}
