use cities_core::{City, DecodeError};
use serde::{Deserialize, Serialize};

/// Wire representation of a single city.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CityRecord {
    /// Globally unique identifier.
    #[serde(rename = "_id")]
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Two-letter country code.
    pub country: String,
    /// Position of the city.
    pub coord: Coordinates,
}

/// Nested coordinate object in a [`CityRecord`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
    /// WGS84 longitude in degrees.
    pub lon: f64,
    /// WGS84 latitude in degrees.
    pub lat: f64,
}

impl From<CityRecord> for City {
    fn from(record: CityRecord) -> Self {
        Self::new(
            record.id,
            record.name,
            record.country,
            record.coord.lat,
            record.coord.lon,
        )
    }
}

/// Decode a JSON array of [`CityRecord`] values into cities.
///
/// # Examples
/// ```
/// use cities_data::decode_cities;
///
/// let body = br#"[{"_id": 3433955, "name": "Buenos Aires", "country": "AR",
///                  "coord": {"lon": -58.377232, "lat": -34.613152}}]"#;
/// let cities = decode_cities(body).expect("valid dataset");
/// assert_eq!(cities[0].longitude, -58.377232);
/// assert!(!cities[0].is_favorite);
/// ```
pub fn decode_cities(bytes: &[u8]) -> Result<Vec<City>, DecodeError> {
    let records: Vec<CityRecord> =
        serde_json::from_slice(bytes).map_err(|err| DecodeError::new(err.to_string()))?;
    Ok(records.into_iter().map(City::from).collect())
}
