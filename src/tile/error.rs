#[derive(Debug)]
pub enum FetchError {
    /// The request could not be sent or its body could not be read.
    Request { url: String, reason: String },
    /// The server answered, but not with a success status.
    Status { url: String, status: u16 },
    /// Every mirror failed its probe. Holds each host alongside why it failed.
    NoMirrorAvailable { attempts: Vec<(String, FetchError)> },
    /// A URL template referenced a placeholder that could not be filled.
    InvalidTemplate(String),
}

#[derive(Debug)]
pub enum DecodeError {
    Image(image::ImageError),
    /// A fetched tile was not `TILE_SIZE` square.
    TileSize { expected: u32, found: (u32, u32) },
    InvalidColour(String),
    /// Palettes need between 1 and 255 colours, as 255 marks unclassified pixels.
    PaletteSize(usize),
    NoClassifiedPixels,
    /// A fill pass left unclassified pixels it could not resolve.
    Stalled { remaining: usize },
}

impl From<image::ImageError> for DecodeError {
    fn from(value: image::ImageError) -> Self {
        DecodeError::Image(value)
    }
}

impl From<image::ImageError> for crate::Error {
    fn from(value: image::ImageError) -> Self {
        crate::Error::Decode(DecodeError::Image(value))
    }
}

impl std::fmt::Display for DecodeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DecodeError::Image(err) => write!(f, "Undecodable image: {err}"),
            DecodeError::TileSize { expected, found } => {
                write!(f, "Expected a {expected}px square tile, found {}x{}", found.0, found.1)
            }
            DecodeError::InvalidColour(colour) => write!(f, "Invalid colour {colour:?}, expected #RRGGBB"),
            DecodeError::PaletteSize(size) => write!(f, "Palettes hold 1 to 255 colours, got {size}"),
            DecodeError::NoClassifiedPixels => write!(f, "No pixel matched the palette"),
            DecodeError::Stalled { remaining } => {
                write!(f, "Boundary fill stalled with {remaining} unclassified pixels")
            }
        }
    }
}
