use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::Path;

pub type DB<T> = HashMap<String, T>;

#[derive(Debug)]
pub enum StoreError {
    Io(io::Error),
    Serde(serde_json::Error),
}

impl std::fmt::Display for StoreError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StoreError::Io(e) => write!(f, "store io error: {}", e),
            StoreError::Serde(e) => write!(f, "store serde error: {}", e),
        }
    }
}

impl std::error::Error for StoreError {}

impl From<io::Error> for StoreError {
    fn from(e: io::Error) -> Self {
        StoreError::Io(e)
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(e: serde_json::Error) -> Self {
        StoreError::Serde(e)
    }
}

fn db_file(location: &str) -> std::path::PathBuf {
    Path::new(location).join("db.json")
}

// Missing file means a fresh store, not an error.
pub fn load_db<T: DeserializeOwned>(location: &str) -> Result<DB<T>, StoreError> {
    let path = db_file(location);
    if !path.exists() {
        return Ok(HashMap::new());
    }
    let content = fs::read_to_string(&path)?;
    let db = serde_json::from_str(&content)?;
    Ok(db)
}

pub fn save_db<T: Serialize>(location: &str, db: &DB<T>) -> Result<(), StoreError> {
    fs::create_dir_all(location)?;
    let path = db_file(location);
    let tmp = Path::new(location).join("db.json.tmp");
    let content = serde_json::to_string_pretty(db)?;
    fs::write(&tmp, content)?;
    fs::rename(&tmp, &path)?;
    Ok(())
}
