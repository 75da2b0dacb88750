use crate::mapping::MAPPINGS;
use crate::paths::{base_name, concat, is_dir};
use crate::{Link, LinkReport, Mapping, PROGRAM, Roots};
use anyhow::{Context, Result};
use colored::Colorize;
use glob::{MatchOptions, Pattern, glob_with};
use std::fs;
use std::io;
use std::os::unix;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

// Same matching as glob(3) without GLOB_PERIOD: `*` skips dotfiles.
const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: true,
};

fn list_entries(source_dir: &Path) -> Result<Vec<PathBuf>> {
    let dir = source_dir
        .to_str()
        .with_context(|| format!("{} is not valid UTF-8", source_dir.display()))?;
    let pat = format!("{}/*", Pattern::escape(dir));
    let mut entries = vec![];
    for r in glob_with(&pat, MATCH_OPTIONS)? {
        match r {
            Ok(p) => entries.push(p),
            Err(e) => error!("{PROGRAM}: {e}"),
        }
    }
    Ok(entries)
}

/// Replaces whatever is called like `entry` inside `target_dir` with a
/// symlink to `entry`.
fn link_entry(entry: &Path, target_dir: &Path) -> io::Result<Link> {
    let link = Link::new(entry.to_path_buf(), target_dir.join(base_name(entry)));
    // unlink(2) only; a real directory stays and makes symlink fail below
    let _ = fs::remove_file(&link.target);
    unix::fs::symlink(&link.source, &link.target)?;
    Ok(link)
}

/// Links every immediate entry of `source_dir` into `target_dir`.
///
/// A missing `source_dir` is not an error. Failing entries are logged and
/// counted, the remaining ones are still linked.
pub fn link_if_exists(source_dir: &Path, target_dir: &Path) -> Result<LinkReport> {
    let mut report = LinkReport::default();
    if !is_dir(source_dir) {
        return Ok(report);
    }
    for entry in list_entries(source_dir)? {
        match link_entry(&entry, target_dir) {
            Ok(link) => {
                debug!("{PROGRAM}: {} {}", "LINK:".green(), &link);
                report.linked += 1;
            }
            Err(e) => {
                error!("{PROGRAM}: {}: {e}", base_name(&entry).to_string_lossy());
                report.failed += 1;
            }
        }
    }
    Ok(report)
}

fn link_mapping(roots: &Roots, mapping: &Mapping) -> Result<Option<LinkReport>> {
    let target_dir = concat(&roots.index, mapping.target);
    if !is_dir(&target_dir) {
        return Ok(None);
    }
    info!(
        "{PROGRAM}: {} -> {}",
        mapping.target_name().cyan(),
        target_dir.display()
    );
    let source_dir = concat(&roots.package, mapping.source);
    link_if_exists(&source_dir, &target_dir).map(Some)
}

/// Walks the mapping table in order; rows whose index directory is missing
/// are skipped silently.
pub fn link_all(roots: &Roots) -> LinkReport {
    let mut total = LinkReport::default();
    for mapping in MAPPINGS {
        match link_mapping(roots, mapping) {
            Ok(Some(report)) => total += report,
            Ok(None) => debug!("{PROGRAM}: {} {mapping}", "SKIP:".yellow()),
            Err(e) => error!("{PROGRAM}: {mapping}: {e:#}"),
        }
    }
    debug!(
        "{PROGRAM}: {} linked, {} failed",
        total.linked, total.failed
    );
    total
}

#[cfg(test)]
struct Fixture {
    _tmp: tempfile::TempDir,
    roots: Roots,
}

#[cfg(test)]
impl Fixture {
    /// `<tmp>/Programs/Glibc/2.31` and `<tmp>/System/Index` with `bin`, `lib`.
    fn new() -> Result<Self> {
        let tmp = tempfile::TempDir::new()?;
        let package = tmp.path().join("Programs/Glibc/2.31");
        let index = tmp.path().join("System/Index");
        fs::create_dir_all(&package)?;
        fs::create_dir_all(index.join("bin"))?;
        fs::create_dir_all(index.join("lib"))?;
        Ok(Self {
            _tmp: tmp,
            roots: Roots {
                package,
                index,
                index_defaulted: false,
            },
        })
    }

    fn package_file(&self, rel: &str) -> Result<PathBuf> {
        let p = self.roots.package.join(rel);
        fs::create_dir_all(p.parent().unwrap())?;
        fs::write(&p, rel)?;
        Ok(p)
    }

    fn index(&self, rel: &str) -> PathBuf {
        self.roots.index.join(rel)
    }
}

#[test]
fn test_link_glibc() -> Result<()> {
    let fx = Fixture::new()?;
    let ldd = fx.package_file("bin/ldd")?;
    let libc = fx.package_file("lib/libc.so.6")?;
    let report = link_all(&fx.roots);
    assert_eq!(report, LinkReport { linked: 2, failed: 0 });
    assert_eq!(fs::read_link(fx.index("bin/ldd"))?, ldd);
    assert_eq!(fs::read_link(fx.index("lib/libc.so.6"))?, libc);
    Ok(())
}

#[test]
fn test_link_twice() -> Result<()> {
    let fx = Fixture::new()?;
    let ldd = fx.package_file("bin/ldd")?;
    link_all(&fx.roots);
    let report = link_all(&fx.roots);
    assert_eq!(report.failed, 0);
    assert_eq!(fs::read_link(fx.index("bin/ldd"))?, ldd);
    assert_eq!(fs::read_dir(fx.index("bin"))?.count(), 1);
    Ok(())
}

#[test]
fn test_link_replaces_file_and_symlink() -> Result<()> {
    let fx = Fixture::new()?;
    let ldd = fx.package_file("bin/ldd")?;
    let libc = fx.package_file("lib/libc.so.6")?;
    fs::write(fx.index("bin/ldd"), "stale")?;
    unix::fs::symlink("/nowhere", fx.index("lib/libc.so.6"))?;
    let report = link_all(&fx.roots);
    assert_eq!(report.failed, 0);
    assert_eq!(fs::read_link(fx.index("bin/ldd"))?, ldd);
    assert_eq!(fs::read_link(fx.index("lib/libc.so.6"))?, libc);
    Ok(())
}

#[test]
fn test_link_blocked_by_directory() -> Result<()> {
    let fx = Fixture::new()?;
    fx.package_file("bin/ldd")?;
    fx.package_file("bin/iconv")?;
    fs::create_dir(fx.index("bin/ldd"))?;
    let report = link_all(&fx.roots);
    assert_eq!(report, LinkReport { linked: 1, failed: 1 });
    assert!(fs::symlink_metadata(fx.index("bin/ldd"))?.is_dir());
    assert!(fs::read_link(fx.index("bin/iconv")).is_ok());
    Ok(())
}

#[test]
fn test_link_missing_dirs() -> Result<()> {
    let fx = Fixture::new()?;
    fx.package_file("include/stdio.h")?;
    let report = link_all(&fx.roots);
    assert_eq!(report, LinkReport::default());
    assert!(!fx.index("include").exists());
    assert_eq!(fs::read_dir(fx.index("bin"))?.count(), 0);
    Ok(())
}

#[test]
fn test_link_merges_into_bin_and_lib() -> Result<()> {
    let fx = Fixture::new()?;
    fx.package_file("bin/tool")?;
    let sbin_tool = fx.package_file("sbin/tool")?;
    let ldconfig = fx.package_file("sbin/ldconfig")?;
    let wrapper = fx.package_file("Resources/Wrappers/wrapped")?;
    let ld = fx.package_file("lib64/ld-linux-x86-64.so.2")?;
    link_all(&fx.roots);
    assert_eq!(fs::read_link(fx.index("bin/tool"))?, sbin_tool);
    assert_eq!(fs::read_link(fx.index("bin/ldconfig"))?, ldconfig);
    assert_eq!(fs::read_link(fx.index("bin/wrapped"))?, wrapper);
    assert_eq!(fs::read_link(fx.index("lib/ld-linux-x86-64.so.2"))?, ld);
    Ok(())
}

#[test]
fn test_link_directories_and_skips_dotfiles() -> Result<()> {
    let fx = Fixture::new()?;
    fs::create_dir_all(fx.roots.package.join("lib/pkgconfig"))?;
    fx.package_file("lib/.hidden")?;
    let report = link_all(&fx.roots);
    assert_eq!(report.linked, 1);
    assert!(fs::read_link(fx.index("lib/pkgconfig")).is_ok());
    assert!(fs::symlink_metadata(fx.index("lib/.hidden")).is_err());
    Ok(())
}

#[test]
fn test_link_settings_sibling() -> Result<()> {
    let fx = Fixture::new()?;
    let settings = fx.roots.package.join("../Settings");
    fs::create_dir_all(&settings)?;
    fs::write(settings.join("glibc.conf"), "conf")?;
    fs::create_dir_all(fx.roots.index.join("../Settings"))?;
    link_all(&fx.roots);
    let link = fx.roots.index.join("../Settings/glibc.conf");
    assert!(fs::symlink_metadata(&link)?.file_type().is_symlink());
    assert_eq!(
        fs::canonicalize(&link)?,
        fs::canonicalize(settings.join("glibc.conf"))?
    );
    Ok(())
}

#[test]
fn test_link_if_exists_missing_source() -> Result<()> {
    let fx = Fixture::new()?;
    let report = link_if_exists(&fx.roots.package.join("bin"), &fx.index("bin"))?;
    assert_eq!(report, LinkReport::default());
    Ok(())
}
