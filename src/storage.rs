// ============================================================================
// KEY-VALUE SLOTS - Where the serialized note collection lives
// ============================================================================

#[cfg(test)]
use std::collections::HashMap;
use std::fs;
use std::path::PathBuf;

use anyhow::Result;

// Security limit for a single slot file
const MAX_FILE_SIZE: u64 = 50 * 1024 * 1024; // 50 MB

pub trait KeyValueSlot {
    fn get(&self, key: &str) -> Result<Option<String>>;
    fn set(&mut self, key: &str, value: &str) -> Result<()>;
}

impl<T: KeyValueSlot + ?Sized> KeyValueSlot for Box<T> {
    fn get(&self, key: &str) -> Result<Option<String>> {
        (**self).get(key)
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        (**self).set(key, value)
    }
}

/// One JSON file per key under a data directory.
pub struct FileSlot {
    dir: PathBuf,
}

impl FileSlot {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", key))
    }
}

impl KeyValueSlot for FileSlot {
    fn get(&self, key: &str) -> Result<Option<String>> {
        let path = self.path_for(key);
        if !path.exists() {
            return Ok(None);
        }

        // Security: Check file size before reading
        let metadata = fs::metadata(&path)?;
        if metadata.len() > MAX_FILE_SIZE {
            return Err(anyhow::anyhow!(
                "Data file exceeds maximum size limit - possible corruption"
            ));
        }

        Ok(Some(fs::read_to_string(&path)?))
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        if value.len() > MAX_FILE_SIZE as usize {
            return Err(anyhow::anyhow!("Serialized data exceeds maximum size limit"));
        }

        fs::create_dir_all(&self.dir)?;
        let path = self.path_for(key);

        // Write to temporary file first, then atomic rename
        let temp_path = path.with_extension("json.tmp");
        fs::write(&temp_path, value)?;
        fs::rename(temp_path, path)?;

        Ok(())
    }
}

/// Slot kept in memory, counting writes.
#[cfg(test)]
#[derive(Default)]
pub struct MemorySlot {
    values: HashMap<String, String>,
    pub writes: usize,
}

#[cfg(test)]
impl MemorySlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_value(key: &str, value: &str) -> Self {
        let mut slot = Self::new();
        slot.values.insert(key.to_string(), value.to_string());
        slot
    }
}

#[cfg(test)]
impl KeyValueSlot for MemorySlot {
    fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<()> {
        self.values.insert(key.to_string(), value.to_string());
        self.writes += 1;
        Ok(())
    }
}
