//! Best score persistence
//!
//! A single integer, persisted to LocalStorage on the web. The session only
//! talks to the `ScoreStore` trait so it can run without a browser.

/// Where the best score lives between sessions
pub trait ScoreStore {
    /// Stored best, 0 if nothing usable is stored
    fn get(&self) -> u64;
    /// Persist a new best
    fn set(&mut self, value: u64);
}

/// Parse a raw stored value. Absent or non-numeric values count as 0.
pub fn parse_stored_score(raw: Option<&str>) -> u64 {
    let Some(raw) = raw else { return 0 };
    match raw.trim().parse::<f64>() {
        Ok(value) if value.is_finite() && value > 0.0 => value.floor() as u64,
        Ok(_) => 0,
        Err(_) => {
            log::warn!("Ignoring unreadable stored high score {:?}", raw);
            0
        }
    }
}

/// In-memory store for native runs and tests
#[derive(Debug, Clone, Default)]
pub struct MemoryScoreStore {
    value: u64,
    writes: u32,
}

impl MemoryScoreStore {
    pub fn with_value(value: u64) -> Self {
        Self { value, writes: 0 }
    }

    /// Number of `set` calls so far
    pub fn writes(&self) -> u32 {
        self.writes
    }
}

impl ScoreStore for MemoryScoreStore {
    fn get(&self) -> u64 {
        self.value
    }

    fn set(&mut self, value: u64) {
        self.value = value;
        self.writes += 1;
    }
}

/// LocalStorage-backed store (WASM only)
#[cfg(target_arch = "wasm32")]
#[derive(Debug, Default)]
pub struct LocalStorageScore;

#[cfg(target_arch = "wasm32")]
impl LocalStorageScore {
    /// LocalStorage key
    const STORAGE_KEY: &'static str = "highScore";

    fn storage() -> Option<web_sys::Storage> {
        web_sys::window()
            .and_then(|w| w.local_storage().ok())
            .flatten()
    }
}

#[cfg(target_arch = "wasm32")]
impl ScoreStore for LocalStorageScore {
    fn get(&self) -> u64 {
        let raw = Self::storage().and_then(|s| s.get_item(Self::STORAGE_KEY).ok().flatten());
        let best = parse_stored_score(raw.as_deref());
        log::info!("Loaded high score {}", best);
        best
    }

    fn set(&mut self, value: u64) {
        if let Some(storage) = Self::storage() {
            let _ = storage.set_item(Self::STORAGE_KEY, &value.to_string());
            log::info!("High score saved ({})", value);
        }
    }
}
