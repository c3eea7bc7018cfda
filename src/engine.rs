//! Process-wide PDF engine initialisation.
//!
//! The native pdfium library is located and bound exactly once by
//! [`initialize`]. The resulting [`Pdfium`] lives for the rest of the
//! process: pdfium initialises its global state when an instance is created
//! and destroys it when the instance drops, so there is never more than one.
//! Converters borrow it through [`bind`], which fails with
//! [`ConvertError::EngineUnavailable`] when `initialize` was never called
//! successfully. Individual pdfium calls are serialised by the
//! `thread_safe` feature of `pdfium-render`.
//!
//! Resolution order for [`initialize`]:
//!
//! 1. [`EngineConfig::library_path`] (file, or directory containing the
//!    platform library)
//! 2. `PDFIUM_LIB_PATH`
//! 3. the directory of the running executable
//! 4. the system library search path

use crate::config::EngineConfig;
use crate::error::{ConvertError, EngineError};
use pdfium_render::prelude::Pdfium;
use std::fmt;
use std::path::{Path, PathBuf};
use once_cell::sync::OnceCell;
use tracing::{debug, info, warn};

/// Where the engine library was found.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineLocation {
    /// An explicit shared-library file.
    Library(PathBuf),
    /// Whatever the dynamic loader finds on the system search path.
    System,
}

impl fmt::Display for EngineLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineLocation::Library(p) => write!(f, "{}", p.display()),
            EngineLocation::System => f.write_str("system library"),
        }
    }
}

struct Engine {
    location: EngineLocation,
    pdfium: Pdfium,
}

static ENGINE: OnceCell<Engine> = OnceCell::new();

/// Locate and bind the engine. Subsequent calls return the cached location
/// without touching the filesystem again. Concurrent first calls block until
/// one of them has finished binding.
pub fn initialize(config: &EngineConfig) -> Result<EngineLocation, EngineError> {
    let engine = ENGINE.get_or_try_init(|| {
        let location = resolve(config)?;
        let pdfium = open(&location).map_err(|reason| EngineError::BindFailed {
            path: match &location {
                EngineLocation::Library(p) => Some(p.clone()),
                EngineLocation::System => None,
            },
            reason,
        })?;
        info!("PDF engine ready: {}", location);
        Ok::<_, EngineError>(Engine { location, pdfium })
    })?;
    Ok(engine.location.clone())
}

/// `true` once [`initialize`] has succeeded in this process.
pub fn is_initialized() -> bool {
    ENGINE.get().is_some()
}

/// The process-wide [`Pdfium`] bound by [`initialize`].
pub fn bind() -> Result<&'static Pdfium, ConvertError> {
    ENGINE.get().map(|engine| &engine.pdfium).ok_or_else(|| {
        ConvertError::EngineUnavailable(
            "engine not initialised; call engine::initialize first".to_string(),
        )
    })
}

fn open(location: &EngineLocation) -> Result<Pdfium, String> {
    let bindings = match location {
        EngineLocation::Library(path) => Pdfium::bind_to_library(path),
        EngineLocation::System => Pdfium::bind_to_system_library(),
    }
    .map_err(|e| e.to_string())?;
    Ok(Pdfium::new(bindings))
}

fn resolve(config: &EngineConfig) -> Result<EngineLocation, EngineError> {
    if let Some(explicit) = &config.library_path {
        let path = library_file(explicit);
        if !path.exists() {
            return Err(EngineError::LibraryNotFound { path });
        }
        debug!("Using configured engine library: {}", path.display());
        return Ok(EngineLocation::Library(path));
    }

    if let Ok(env_path) = std::env::var("PDFIUM_LIB_PATH") {
        let path = library_file(Path::new(&env_path));
        if path.exists() {
            debug!("Using PDFIUM_LIB_PATH: {}", path.display());
            return Ok(EngineLocation::Library(path));
        }
        warn!(
            "PDFIUM_LIB_PATH '{}' not found; falling back to default locations",
            path.display()
        );
    }

    if let Some(dir) = std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
    {
        let path = library_file(&dir);
        if path.exists() {
            debug!("Using engine library next to executable: {}", path.display());
            return Ok(EngineLocation::Library(path));
        }
    }

    Ok(EngineLocation::System)
}

/// Directories are expanded to the platform library name inside them.
fn library_file(path: &Path) -> PathBuf {
    if path.is_dir() {
        Pdfium::pdfium_platform_library_name_at_path(path)
    } else {
        path.to_path_buf()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_missing_path_is_not_found() {
        let cfg = EngineConfig::with_library_path("/definitely/not/here/libpdfium.so");
        match resolve(&cfg) {
            Err(EngineError::LibraryNotFound { path }) => {
                assert!(path.ends_with("libpdfium.so"))
            }
            other => panic!("expected LibraryNotFound, got {other:?}"),
        }
    }

    #[test]
    fn directory_expands_to_platform_name() {
        let dir = tempfile::tempdir().unwrap();
        let file = library_file(dir.path());
        assert_eq!(file.parent(), Some(dir.path()));
        assert_ne!(file, dir.path());
    }

    #[test]
    fn bind_without_engine_is_unavailable() {
        if let Err(e) = bind() {
            assert!(matches!(e, ConvertError::EngineUnavailable(_)));
        }
    }

    #[test]
    fn bind_shares_one_instance() {
        if initialize(&EngineConfig::default()).is_err() {
            println!("SKIP — PDF engine unavailable");
            return;
        }
        let a = bind().unwrap();
        let b = std::thread::spawn(|| bind().unwrap() as *const Pdfium as usize)
            .join()
            .unwrap();
        assert_eq!(a as *const Pdfium as usize, b);
    }

    #[test]
    fn location_display() {
        assert_eq!(EngineLocation::System.to_string(), "system library");
        assert_eq!(
            EngineLocation::Library(PathBuf::from("/opt/libpdfium.so")).to_string(),
            "/opt/libpdfium.so"
        );
    }
}
