/*!
Utilitaires de test

- Logging tracing capturé par le harness de test
- Écriture de fixtures JSON sur disque pour les tests du kernel
*/

use anyhow::Result;
use serde_json::Value;
use std::path::{Path, PathBuf};

/// Init logging pour tests (idempotent, sortie capturée par `cargo test`)
pub fn init_test_logging() {
    tracing_subscriber::fmt()
        .with_test_writer()
        .with_max_level(tracing_subscriber::filter::LevelFilter::DEBUG)
        .try_init()
        .ok();
}

/// Écrit `value` en JSON dans `dir/name` et retourne le chemin
pub fn write_json_fixture(dir: &Path, name: &str, value: &Value) -> Result<PathBuf> {
    let path = dir.join(name);
    std::fs::write(&path, serde_json::to_string_pretty(value)?)?;
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_write_json_fixture() {
        let temp_dir = TempDir::new().unwrap();
        let value = serde_json::json!({ "hosts": {} });

        let path = write_json_fixture(temp_dir.path(), "local_db.json", &value).unwrap();

        let back: Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(back, value);
    }

    #[test]
    fn test_logging_init_twice() {
        init_test_logging();
        init_test_logging();
    }
}
