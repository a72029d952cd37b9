pub mod audit;
pub mod inspect;
pub mod run;

use anyhow::Result;
use dossier_archive::{AesGcmProvider, EnvKeyProvider};

/// Build the cipher from the key env var shared by `run` and `inspect`.
pub(crate) fn cipher_from_env(var: &str) -> Result<AesGcmProvider> {
    AesGcmProvider::from_provider(&EnvKeyProvider::new(var))
}
