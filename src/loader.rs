//! Sources an [`EnvSnapshot`] can be loaded from
//!
//! A [`Loader`] produces a snapshot from some source using a shared
//! [`EnvParser`]. Files and the process environment are provided; any
//! closure with the right shape works as well.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::env::{EnvParser, EnvSnapshot};
use crate::error::{Result, VaultenvError};

/// Loads key/value pairs from a source into a fresh snapshot.
pub trait Loader {
    fn load(&self, parser: &EnvParser) -> Result<EnvSnapshot>;
}

impl<F> Loader for F
where
    F: Fn(&EnvParser) -> Result<EnvSnapshot>,
{
    fn load(&self, parser: &EnvParser) -> Result<EnvSnapshot> {
        self(parser)
    }
}

/// Loads a `KEY=VALUE` file from disk.
#[derive(Debug, Clone)]
pub struct FileLoader {
    path: PathBuf,
}

impl FileLoader {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Loader for FileLoader {
    fn load(&self, parser: &EnvParser) -> Result<EnvSnapshot> {
        let source_name = self.path.display().to_string();
        let file = File::open(&self.path)
            .map_err(|e| VaultenvError::source_unavailable(source_name.as_str(), e))?;

        // The handle is closed when the reader drops at the end of this scope.
        let snapshot = parser.parse_reader(BufReader::new(file), &source_name)?;
        info!(
            "Loaded {} plain and {} secret entries from {}",
            snapshot.plain().len(),
            snapshot.secrets().len(),
            source_name
        );
        Ok(snapshot)
    }
}

/// Loads the named keys from the current process environment.
///
/// Values are only classified as secret or plain; there is no multiline
/// handling since each value is already a complete string.
#[derive(Debug, Clone)]
pub struct ProcessEnvLoader {
    keys: Vec<String>,
}

impl ProcessEnvLoader {
    pub fn new<I, S>(keys: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            keys: keys.into_iter().map(Into::into).collect(),
        }
    }
}

impl Loader for ProcessEnvLoader {
    fn load(&self, parser: &EnvParser) -> Result<EnvSnapshot> {
        let mut snapshot = EnvSnapshot::new();
        for key in &self.keys {
            let value = std::env::var(key).map_err(|e| {
                VaultenvError::source_unavailable(format!("environment variable {}", key), e)
            })?;
            parser.classify_value(&mut snapshot, key, &value)?;
        }
        debug!("Loaded {} entries from the process environment", snapshot.len());
        Ok(snapshot)
    }
}
