use crate::paths::is_dir;
use crate::{PROGRAM, Roots};
use anyhow::{Context, Result, bail};
use serde::Deserialize;
use std::fs;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const DEFAULT_INDEX: &str = "/System/Index";
const CONFIG_DIR_NAME: &str = "rescue-symlink";
const CONFIG_FILE_NAME: &str = "config.toml";

#[derive(Deserialize, Debug, Default)]
pub struct GlobalConfig {
    pub index: Option<PathBuf>,
}

impl GlobalConfig {
    pub fn from_path(confpath: &Path) -> Result<Self> {
        let mut file = fs::File::open(confpath)?;
        let mut buf = String::new();
        file.read_to_string(&mut buf)?;
        toml::from_str::<GlobalConfig>(&buf)
            .with_context(|| format!("parse {}", confpath.display()))
    }

    /// Reads the user config; a missing file is the empty config.
    pub fn load() -> Self {
        let Some(path) = config_path() else {
            return Self::default();
        };
        if !path.exists() {
            return Self::default();
        }
        match Self::from_path(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("{PROGRAM}: ignoring config: {e:#}");
                Self::default()
            }
        }
    }

    pub fn default_index(&self) -> PathBuf {
        self.index
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_INDEX))
    }
}

fn config_path() -> Option<PathBuf> {
    let mut path = dirs::config_dir()?;
    path.push(CONFIG_DIR_NAME);
    path.push(CONFIG_FILE_NAME);
    Some(path)
}

/// Validates the command line paths and turns them into [`Roots`].
///
/// An index argument that is missing or not a directory falls back to
/// `default_index` with a warning; the result must still be a directory.
pub fn resolve_roots(package: &Path, index: Option<&Path>, default_index: &Path) -> Result<Roots> {
    if !is_dir(package) {
        bail!("{} is not an existing directory.", package.display());
    }
    let (index, index_defaulted) = match index.filter(|p| is_dir(p)) {
        Some(p) => (p.to_path_buf(), false),
        None => {
            warn!(
                "{PROGRAM}: Assuming {} as goboIndex directory.",
                default_index.display()
            );
            (default_index.to_path_buf(), true)
        }
    };
    if !is_dir(&index) {
        bail!("{} is not an existing directory.", index.display());
    }
    // absolute() keeps symlinked components, so `Current` stays in link targets
    Ok(Roots {
        package: std::path::absolute(package)?,
        index: std::path::absolute(&index)?,
        index_defaulted,
    })
}

#[test]
fn test_config_from_path() -> Result<()> {
    let tmp = tempfile::TempDir::new()?;
    let confpath = tmp.path().join(CONFIG_FILE_NAME);
    fs::write(&confpath, "index = \"/Mount/Index\"\n")?;
    let config = GlobalConfig::from_path(&confpath)?;
    assert_eq!(config.default_index(), PathBuf::from("/Mount/Index"));
    Ok(())
}

#[test]
fn test_config_without_index() -> Result<()> {
    let tmp = tempfile::TempDir::new()?;
    let confpath = tmp.path().join(CONFIG_FILE_NAME);
    fs::write(&confpath, "")?;
    let config = GlobalConfig::from_path(&confpath)?;
    assert_eq!(config.default_index(), PathBuf::from(DEFAULT_INDEX));
    Ok(())
}

#[test]
fn test_config_rejects_garbage() -> Result<()> {
    let tmp = tempfile::TempDir::new()?;
    let confpath = tmp.path().join(CONFIG_FILE_NAME);
    fs::write(&confpath, "index = [")?;
    assert!(GlobalConfig::from_path(&confpath).is_err());
    Ok(())
}

#[test]
fn test_resolve_roots_explicit_index() -> Result<()> {
    let tmp = tempfile::TempDir::new()?;
    let package = tmp.path().join("pkg");
    let index = tmp.path().join("index");
    fs::create_dir(&package)?;
    fs::create_dir(&index)?;
    let roots = resolve_roots(&package, Some(&index), Path::new("/nonexistent"))?;
    assert_eq!(roots.package, package);
    assert_eq!(roots.index, index);
    assert!(!roots.index_defaulted);
    Ok(())
}

#[test]
fn test_resolve_roots_defaults_index() -> Result<()> {
    let tmp = tempfile::TempDir::new()?;
    let package = tmp.path().join("pkg");
    let fallback = tmp.path().join("fallback");
    fs::create_dir(&package)?;
    fs::create_dir(&fallback)?;
    let roots = resolve_roots(&package, None, &fallback)?;
    assert_eq!(roots.index, fallback);
    assert!(roots.index_defaulted);
    let roots = resolve_roots(&package, Some(&tmp.path().join("missing")), &fallback)?;
    assert_eq!(roots.index, fallback);
    assert!(roots.index_defaulted);
    // a trailing `--help` is just an index path that does not exist
    let roots = resolve_roots(&package, Some(Path::new("--help")), &fallback)?;
    assert_eq!(roots.index, fallback);
    assert!(roots.index_defaulted);
    Ok(())
}

#[test]
fn test_resolve_roots_invalid() -> Result<()> {
    let tmp = tempfile::TempDir::new()?;
    let package = tmp.path().join("pkg");
    fs::create_dir(&package)?;
    let err = resolve_roots(&tmp.path().join("missing"), None, tmp.path()).unwrap_err();
    assert!(err.to_string().ends_with("is not an existing directory."));
    let err = resolve_roots(&package, None, &tmp.path().join("no-index")).unwrap_err();
    assert!(err.to_string().contains("no-index"));
    Ok(())
}

#[test]
fn test_resolve_roots_relative_package() -> Result<()> {
    let roots = resolve_roots(Path::new("."), None, Path::new("/"))?;
    assert!(roots.package.is_absolute());
    assert_eq!(roots.index, PathBuf::from("/"));
    Ok(())
}
