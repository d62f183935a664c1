#[derive(Debug)]
pub enum GeoError {
    InvalidCoordinate(String),
    UnsupportedZoom(u8),
}
