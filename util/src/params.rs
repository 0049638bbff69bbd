//! Generic parameters functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::de::DeserializeOwned;
use std::fs::read_to_string;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// An error that occurs during loading of a parameter file.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("Could not read the parameter file: {0}")]
    FileLoadError(#[from] std::io::Error),

    #[error("Could not deserialise the parameter file: {0}")]
    DeserialiseError(#[from] toml::de::Error),
}

// ---------------------------------------------------------------------------
// PUBLIC FUNCTIONS
// ---------------------------------------------------------------------------

/// Load a parameter file.
///
/// Parameter files are TOML, deserialised into the target parameter struct.
pub fn load<P>(param_file_path: &str) -> Result<P, LoadError>
where
    P: DeserializeOwned,
{
    let params_str = read_to_string(param_file_path)?;

    Ok(toml::from_str(params_str.as_str())?)
}
