use std::{error, fmt};

use rwh_06::HandleError;
use wayland_client::backend::InvalidId;
use wayland_client::DispatchError;

/// An error that may be generated while setting up or driving the keyboard.
///
/// Errors never reach the [`KeyboardHandler`](crate::KeyboardHandler); a
/// keyboard that fails to initialize stays inert instead.
#[derive(Debug)]
pub enum Error {
    /// The host window doesn't live on a Wayland display.
    UnsupportedDisplay,
    /// The host couldn't provide its display or window handle.
    Handle(HandleError),
    /// The host surface isn't a live `wl_surface`.
    InvalidSurface(InvalidId),
    /// The event loop failed.
    EventLoop(calloop::Error),
    /// Dispatching Wayland events failed, usually because the connection died.
    Dispatch(DispatchError),
}

impl From<HandleError> for Error {
    fn from(value: HandleError) -> Self {
        Self::Handle(value)
    }
}

impl From<InvalidId> for Error {
    fn from(value: InvalidId) -> Self {
        Self::InvalidSurface(value)
    }
}

impl From<calloop::Error> for Error {
    fn from(value: calloop::Error) -> Self {
        Self::EventLoop(value)
    }
}

impl From<DispatchError> for Error {
    fn from(value: DispatchError) -> Self {
        Self::Dispatch(value)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        match self {
            Error::UnsupportedDisplay => f.pad("the display is not a Wayland display"),
            Error::Handle(e) => write!(f, "failed to get a handle from the host: {e}"),
            Error::InvalidSurface(e) => write!(f, "invalid surface: {e}"),
            Error::EventLoop(e) => write!(f, "event loop error: {e}"),
            Error::Dispatch(e) => write!(f, "failed to dispatch Wayland events: {e}"),
        }
    }
}

impl error::Error for Error {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            Error::UnsupportedDisplay => None,
            Error::Handle(e) => Some(e),
            Error::InvalidSurface(e) => Some(e),
            Error::EventLoop(e) => Some(e),
            Error::Dispatch(e) => Some(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::error::Error as _;

    use super::*;

    #[test]
    fn ensure_fmt_does_not_panic() {
        let _ = format!("{:?}, {}", Error::UnsupportedDisplay, Error::UnsupportedDisplay);
        let _ = format!(
            "{:?}, {}",
            Error::Handle(HandleError::Unavailable),
            Error::Handle(HandleError::Unavailable)
        );
        let _ =
            format!("{:?}, {}", Error::InvalidSurface(InvalidId), Error::InvalidSurface(InvalidId));
    }

    #[test]
    fn sources_are_forwarded() {
        assert!(Error::UnsupportedDisplay.source().is_none());
        assert!(Error::from(HandleError::Unavailable).source().is_some());
        assert!(matches!(Error::from(InvalidId), Error::InvalidSurface(InvalidId)));
    }
}
