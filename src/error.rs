// Error type for the tracking core and the host window.
// Every variant states *where* things went wrong. Camera trouble never ends
// the game: the tracker catches these and goes inert instead.

pub type Result<T> = std::result::Result<T, Error>;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    /// No capture device, or it refused to start streaming.
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),

    /// Grabbing/decoding a frame failed.
    #[error("camera frame error: {0}")]
    CameraFrame(String),

    /// Frame dimensions at or below the usable floor, or a buffer that does not match them.
    #[error("invalid frame resolution {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },

    #[error("window init error: {0}")]
    WindowInit(String),

    #[error("window update error: {0}")]
    WindowUpdate(String),

    #[error("config error: {0}")]
    Config(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn device_unavailable(msg: impl Into<String>) -> Self {
        Self::DeviceUnavailable(msg.into())
    }

    pub fn camera_frame(msg: impl Into<String>) -> Self {
        Self::CameraFrame(msg.into())
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// True for the conditions the pipeline absorbs locally (inert or skipped frame).
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Self::DeviceUnavailable(_) | Self::CameraFrame(_) | Self::InvalidResolution { .. }
        )
    }
}
