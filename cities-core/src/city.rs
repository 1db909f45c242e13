use geo::Coord;

/// Regional indicator offset applied to ASCII capitals when building flags.
const REGIONAL_INDICATOR_BASE: u32 = 0x1F1A5;

/// Shown when a country code cannot be rendered as a flag.
const FALLBACK_FLAG: &str = "\u{1F3F3}\u{FE0F}";

/// A place record held by the local catalogue.
///
/// `id` is the natural key. `is_favorite` is the only field mutated outside a
/// full refresh.
///
/// # Examples
/// ```
/// use cities_core::City;
///
/// let city = City::new(3_433_955, "Buenos Aires", "AR", -34.6, -58.4);
///
/// assert_eq!(city.id, 3_433_955);
/// assert!(!city.is_favorite);
/// assert_eq!(city.flag_emoji(), "\u{1F1E6}\u{1F1F7}");
/// ```
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct City {
    /// Globally unique identifier.
    pub id: i64,
    /// Display name, used for sorting and search.
    pub name: String,
    /// Country code, used for sorting and search.
    pub country: String,
    /// WGS84 latitude in degrees.
    pub latitude: f64,
    /// WGS84 longitude in degrees.
    pub longitude: f64,
    /// Whether the user marked the city as a favourite.
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_favorite: bool,
}

impl City {
    /// Construct a city that is not marked as a favourite.
    pub fn new(
        id: i64,
        name: impl Into<String>,
        country: impl Into<String>,
        latitude: f64,
        longitude: f64,
    ) -> Self {
        Self {
            id,
            name: name.into(),
            country: country.into(),
            latitude,
            longitude,
            is_favorite: false,
        }
    }

    /// Return the same city with the favourite flag set to `is_favorite`.
    #[must_use]
    pub fn with_favorite(mut self, is_favorite: bool) -> Self {
        self.is_favorite = is_favorite;
        self
    }

    /// Position of the city with `x = longitude` and `y = latitude`.
    ///
    /// # Examples
    /// ```
    /// use cities_core::City;
    ///
    /// let city = City::new(1, "Quito", "EC", -0.22, -78.51);
    /// let coordinate = city.coordinate();
    /// assert_eq!((coordinate.x, coordinate.y), (-78.51, -0.22));
    /// ```
    #[must_use]
    pub const fn coordinate(&self) -> Coord<f64> {
        Coord {
            x: self.longitude,
            y: self.latitude,
        }
    }

    /// Render the two-letter country code as a regional indicator flag.
    ///
    /// Codes that are not exactly two ASCII letters yield a white flag.
    #[must_use]
    pub fn flag_emoji(&self) -> String {
        let code = self.country.to_ascii_uppercase();
        if code.chars().count() != 2 || !code.chars().all(|ch| ch.is_ascii_uppercase()) {
            return FALLBACK_FLAG.to_owned();
        }
        code.chars()
            .map(|ch| char::from_u32(REGIONAL_INDICATOR_BASE + u32::from(ch)))
            .collect::<Option<String>>()
            .unwrap_or_else(|| FALLBACK_FLAG.to_owned())
    }
}
