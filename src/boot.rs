//! The parameters the client is started with, read from a JSON file.
//!
//! ```json
//! {
//!     "overlay_id": "projects/earthengine-legacy/maps/abc",
//!     "overlay_token": "tok",
//!     "region_ids": ["poland", "moldova"],
//!     "backend_url": "http://localhost:8080/"
//! }
//! ```

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::config::OverlayConfig;
use crate::layers::region::GeometrySource;

/// The backend the client talks to when none is configured.
pub const DEFAULT_BACKEND_URL: &str = "http://localhost:8080/";

/// Errors that can occur while reading the boot parameters.
#[derive(Error, Debug)]
pub enum BootError {
    /// The file could not be read.
    #[error("Unable to read boot parameters from `{}`", .0.display())]
    Read(PathBuf, #[source] std::io::Error),

    /// The file is not valid boot parameter JSON.
    #[error("Invalid boot parameters")]
    Parse(#[from] serde_json::Error),

    /// The backend URL is not an HTTP URL.
    #[error("Invalid backend URL `{0}`")]
    InvalidBackendUrl(String),
}

fn default_backend_url() -> String {
    DEFAULT_BACKEND_URL.to_string()
}

/// Boot parameters supplied by the process launching the client.
#[derive(Clone, Debug, PartialEq, Deserialize)]
pub struct BootConfig {
    /// The Earth Engine map id of the overlay.
    pub overlay_id: String,

    /// The time limited access token of the overlay.
    pub overlay_token: String,

    /// The regions shown on the map.
    #[serde(default)]
    pub region_ids: Vec<String>,

    /// The base URL of the detail service, which also serves the region geometry.
    #[serde(default = "default_backend_url")]
    pub backend_url: String,

    /// A local directory to read region geometry from instead of the backend.
    #[serde(default)]
    pub polygon_dir: Option<PathBuf>,
}

impl BootConfig {
    /// Reads and validates the boot parameters from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, BootError> {
        let path = path.as_ref();
        let json =
            std::fs::read_to_string(path).map_err(|e| BootError::Read(path.to_path_buf(), e))?;
        Self::from_json(&json)
    }

    /// Parses and validates the boot parameters.
    pub fn from_json(json: &str) -> Result<Self, BootError> {
        let mut config: Self = serde_json::from_str(json)?;

        if !(config.backend_url.starts_with("http://") || config.backend_url.starts_with("https://"))
        {
            return Err(BootError::InvalidBackendUrl(config.backend_url));
        }
        if !config.backend_url.ends_with('/') {
            config.backend_url.push('/');
        }
        Ok(config)
    }

    /// The descriptor of the image overlay.
    pub fn overlay(&self) -> OverlayConfig {
        OverlayConfig::new(&self.overlay_id, &self.overlay_token)
    }

    /// Where the region geometry is loaded from.
    pub fn geometry_source(&self) -> GeometrySource {
        match &self.polygon_dir {
            Some(dir) => GeometrySource::Directory(dir.clone()),
            None => GeometrySource::Http(format!("{}static/polygons/", self.backend_url)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = BootConfig::from_json(r#"{"overlay_id": "abc", "overlay_token": "tok"}"#).unwrap();

        assert!(config.region_ids.is_empty());
        assert_eq!(config.backend_url, DEFAULT_BACKEND_URL);
        assert_eq!(
            config.geometry_source(),
            GeometrySource::Http("http://localhost:8080/static/polygons/".to_string())
        );
        assert_eq!(config.overlay(), OverlayConfig::new("abc", "tok"));
    }

    #[test]
    fn backend_url_gets_a_trailing_slash() {
        let config = BootConfig::from_json(
            r#"{"overlay_id": "abc", "overlay_token": "tok", "region_ids": ["poland"], "backend_url": "https://cloud.example.com/api"}"#,
        )
        .unwrap();

        assert_eq!(config.region_ids, vec!["poland"]);
        assert_eq!(config.backend_url, "https://cloud.example.com/api/");
        assert_eq!(
            config.geometry_source().resource("poland"),
            "https://cloud.example.com/api/static/polygons/poland.json"
        );
    }

    #[test]
    fn polygon_dir_overrides_the_backend() {
        let config = BootConfig::from_json(
            r#"{"overlay_id": "abc", "overlay_token": "tok", "polygon_dir": "static/polygons"}"#,
        )
        .unwrap();

        assert_eq!(
            config.geometry_source(),
            GeometrySource::Directory(PathBuf::from("static/polygons"))
        );
    }

    #[test]
    fn invalid_parameters_are_rejected() {
        assert!(matches!(
            BootConfig::from_json(r#"{"overlay_id": "abc"}"#),
            Err(BootError::Parse(_))
        ));
        assert!(matches!(
            BootConfig::from_json(
                r#"{"overlay_id": "abc", "overlay_token": "tok", "backend_url": "ftp://x"}"#
            ),
            Err(BootError::InvalidBackendUrl(url)) if url == "ftp://x"
        ));
        assert!(matches!(
            BootConfig::load("/nonexistent/boot.json"),
            Err(BootError::Read(..))
        ));
    }
}
