use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

/// Remote object store backends
///
/// Defined in core because configuration selects it before any store exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StoreBackend {
    /// Third-party media host reached over its REST API.
    MediaHost,
    /// Filesystem-backed store for development and tests.
    Local,
}

impl FromStr for StoreBackend {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "media-host" | "mediahost" | "cloudinary" => Ok(StoreBackend::MediaHost),
            "local" => Ok(StoreBackend::Local),
            _ => Err(anyhow::anyhow!("Invalid storage backend: {}", s)),
        }
    }
}

impl Display for StoreBackend {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            StoreBackend::MediaHost => write!(f, "media-host"),
            StoreBackend::Local => write!(f, "local"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_backend_aliases() {
        assert_eq!(
            "cloudinary".parse::<StoreBackend>().unwrap(),
            StoreBackend::MediaHost
        );
        assert_eq!("LOCAL".parse::<StoreBackend>().unwrap(), StoreBackend::Local);
        assert!("s3".parse::<StoreBackend>().is_err());
    }
}
