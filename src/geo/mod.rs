use crate::error::AppError;

const LATITUDE_BOUND: f64 = 90.0;
const LONGITUDE_BOUND: f64 = 180.0;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lng: f64,
}

impl GeoPoint {
    pub fn parse_pair(field: &str, pair: &[String]) -> Result<Self, AppError> {
        let [lat, lng] = pair else {
            return Err(AppError::InvalidInput(format!(
                "{field} must contain exactly two values, got {}",
                pair.len()
            )));
        };

        let point = GeoPoint {
            lat: parse_number(field, lat)?,
            lng: parse_number(field, lng)?,
        };
        point.validate(field)?;
        Ok(point)
    }

    pub fn is_valid(&self) -> bool {
        within_open_bound(self.lat, LATITUDE_BOUND) && within_open_bound(self.lng, LONGITUDE_BOUND)
    }

    pub fn validate(&self, field: &str) -> Result<(), AppError> {
        if self.is_valid() {
            return Ok(());
        }

        Err(AppError::InvalidInput(format!(
            "{field} must be a valid latitude and longitude, got [{}, {}]",
            self.lat, self.lng
        )))
    }

    pub fn to_query_value(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

fn parse_number(field: &str, raw: &str) -> Result<f64, AppError> {
    raw.trim()
        .parse::<f64>()
        .map_err(|err| AppError::InvalidInput(format!("{field} value {raw:?} is not a number: {err}")))
}

fn within_open_bound(value: f64, bound: f64) -> bool {
    value > -bound && value < bound
}
