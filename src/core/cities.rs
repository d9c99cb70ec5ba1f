use crate::models::Coordinates;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Built-in city coordinates (Andhra Pradesh and Telangana)
const BUILTIN_CITIES: &[(&str, f64, f64)] = &[
    // Andhra Pradesh
    ("Visakhapatnam", 17.6868, 83.2185),
    ("Vijayawada", 16.5062, 80.6480),
    ("Guntur", 16.3067, 80.4365),
    ("Nellore", 14.4426, 79.9865),
    ("Kurnool", 15.8281, 78.0373),
    ("Tirupati", 13.6288, 79.4192),
    ("Rajahmundry", 16.9891, 81.7898),
    ("Kadapa", 14.4674, 78.8242),
    ("Anantapur", 14.6816, 77.6000),
    ("Ongole", 15.5057, 80.0499),
    // Telangana
    ("Hyderabad", 17.3850, 78.4867),
    ("Warangal", 17.9689, 79.5941),
    ("Nizamabad", 18.6727, 78.0941),
    ("Khammam", 17.2473, 80.1514),
    ("Karimnagar", 18.4386, 79.1281),
    ("Mahbubnagar", 16.7428, 77.9874),
    ("Adilabad", 19.6640, 78.5316),
    ("Nalgonda", 17.0540, 79.2670),
    ("Suryapet", 17.1450, 79.6126),
    ("Ramagundam", 18.8060, 79.4526),
];

#[derive(Debug, Error)]
pub enum CityTableError {
    #[error("failed to read city table {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse city table: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid coordinates for {0}")]
    InvalidCoordinates(String),
}

/// City table file layout:
///
/// ```toml
/// [cities]
/// Chennai = [13.0827, 80.2707]
/// ```
#[derive(Debug, Deserialize)]
struct CityTableFile {
    #[serde(default)]
    cities: HashMap<String, [f64; 2]>,
}

/// Lookup table from place name to coordinates
#[derive(Debug, Clone)]
pub struct CityDirectory {
    coords: HashMap<String, Coordinates>,
}

impl CityDirectory {
    /// Directory with the built-in cities only
    pub fn builtin() -> Self {
        let coords = BUILTIN_CITIES
            .iter()
            .map(|(name, lat, lon)| (name.to_string(), Coordinates::new(*lat, *lon)))
            .collect();
        Self { coords }
    }

    /// Directory with exactly the given entries
    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, Coordinates)>,
        S: Into<String>,
    {
        Self {
            coords: entries.into_iter().map(|(name, c)| (name.into(), c)).collect(),
        }
    }

    /// Built-in cities extended (and overridden) by a TOML file
    pub fn with_overrides<P: AsRef<Path>>(path: P) -> Result<Self, CityTableError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|source| CityTableError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let file: CityTableFile = toml::from_str(&raw)?;

        let mut directory = Self::builtin();
        for (name, [lat, lon]) in file.cities {
            if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
                return Err(CityTableError::InvalidCoordinates(name));
            }
            directory.coords.insert(name, Coordinates::new(lat, lon));
        }

        tracing::debug!("Loaded city table from {} ({} entries)", path.display(), directory.len());
        Ok(directory)
    }

    pub fn get(&self, name: &str) -> Option<Coordinates> {
        self.coords.get(name.trim()).copied()
    }

    /// Resolve a location: city first, then state, then the origin (0.0, 0.0)
    ///
    /// Unresolvable places all collapse onto the origin, so they are zero distance
    /// from each other and far from every resolvable place.
    pub fn resolve(&self, city: Option<&str>, state: Option<&str>) -> Coordinates {
        city.and_then(|c| self.get(c))
            .or_else(|| state.and_then(|s| self.get(s)))
            .unwrap_or(Coordinates::ORIGIN)
    }

    pub fn len(&self) -> usize {
        self.coords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.coords.is_empty()
    }
}

impl Default for CityDirectory {
    fn default() -> Self {
        Self::builtin()
    }
}
