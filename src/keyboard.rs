//! The [`Keyboard`] and its lifecycle.

use std::any::Any;
use std::fmt;
use std::os::unix::io::{AsFd, BorrowedFd};
use std::time::Duration;

use rwh_06::{HasDisplayHandle, HasWindowHandle, RawDisplayHandle, RawWindowHandle};
use sctk::reexports::calloop_wayland_source::WaylandSource;
use tracing::{debug, warn};
use wayland_client::backend::{Backend, ObjectId};
use wayland_client::protocol::wl_surface::WlSurface;
use wayland_client::{Connection, EventQueue, Proxy};
use wlkbd_core::{KeyboardAttributes, KeyboardHandler, KeyboardState, SurfaceId};

use crate::error::Error;
use crate::platform::WaylandPlatform;
use crate::state::{make_surface_id, WaylandState};

type WaylandDispatcher = calloop::Dispatcher<'static, WaylandSource<WaylandState>, WaylandState>;

/// Keyboard input for one surface.
///
/// The keyboard runs on a private event queue of the host's Wayland
/// connection, so it never competes with the host for events. The host drives
/// it with [`Keyboard::dispatch`], typically after polling [`Keyboard::as_fd`]
/// from its own loop.
///
/// A keyboard that could not be initialized is *inert*: it reports nothing
/// and every method is a no-op.
pub struct Keyboard {
    inner: Option<Box<Inner>>,
}

struct Inner {
    // NOTE: field order matters.
    state: WaylandState,
    dispatcher: WaylandDispatcher,
    event_loop: calloop::EventLoop<'static, WaylandState>,
    /// Keeps the foreign display alive.
    _host: Option<Box<dyn Any>>,
}

impl Keyboard {
    /// Start keyboard input for the surface of `window`.
    ///
    /// The display connection and the surface are taken from the host toolkit.
    /// `window` is kept until the keyboard is torn down, since the connection
    /// borrows its display.
    ///
    /// On anything other than a Wayland display, or if setup fails, a warning
    /// is logged and an inert keyboard is returned.
    pub fn initialize<W, H>(window: W, attributes: KeyboardAttributes, handler: H) -> Self
    where
        W: HasDisplayHandle + HasWindowHandle + 'static,
        H: KeyboardHandler + 'static,
    {
        let result = connect_foreign(&window).and_then(|(connection, target)| {
            Inner::new(&connection, target, attributes, handler, Some(Box::new(window)))
        });
        Self::from_result(result)
    }

    /// Start keyboard input for `surface`, on a connection the host already owns.
    pub fn with_connection<H>(
        connection: &Connection,
        surface: &WlSurface,
        attributes: KeyboardAttributes,
        handler: H,
    ) -> Self
    where
        H: KeyboardHandler + 'static,
    {
        let target = make_surface_id(surface);
        Self::from_result(Inner::new(connection, target, attributes, handler, None))
    }

    /// A keyboard that never reports anything.
    pub fn inert() -> Self {
        Self { inner: None }
    }

    fn from_result(result: Result<Inner, Error>) -> Self {
        match result {
            Ok(inner) => Self { inner: Some(Box::new(inner)) },
            Err(err) => {
                warn!("keyboard input is disabled: {err}");
                Self::inert()
            },
        }
    }

    /// Whether the keyboard is connected to a compositor.
    pub fn is_active(&self) -> bool {
        self.inner.is_some()
    }

    /// Whether any keyboard has focus on the surface.
    pub fn has_focus(&self) -> bool {
        self.inner.as_ref().is_some_and(|inner| inner.state.keyboards.has_focus())
    }

    /// Process pending Wayland events and repeat timers, waiting up to
    /// `timeout` for something to happen.
    ///
    /// Handler callbacks run from within this call. An inert keyboard returns
    /// immediately.
    pub fn dispatch(&mut self, timeout: Option<Duration>) -> Result<(), Error> {
        match self.inner.as_mut() {
            Some(inner) => inner.dispatch(timeout),
            None => Ok(()),
        }
    }

    /// The file descriptor to poll for readiness before calling [`Keyboard::dispatch`].
    ///
    /// `None` for an inert keyboard.
    pub fn as_fd(&self) -> Option<BorrowedFd<'_>> {
        self.inner.as_ref().map(|inner| inner.event_loop.as_fd())
    }

    /// Stop keyboard input and release every protocol object.
    ///
    /// No callback is delivered from the moment this is called. Dropping the
    /// keyboard has the same effect.
    pub fn teardown(mut self) {
        if let Some(inner) = self.inner.take() {
            inner.teardown();
        }
    }
}

impl Drop for Keyboard {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.take() {
            inner.teardown();
        }
    }
}

impl fmt::Debug for Keyboard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.inner {
            Some(inner) => f.debug_tuple("Keyboard").field(&inner.state.keyboards).finish(),
            None => f.write_str("Keyboard(inert)"),
        }
    }
}

/// Wrap the host's display and find its surface.
fn connect_foreign<W>(window: &W) -> Result<(Connection, SurfaceId), Error>
where
    W: HasDisplayHandle + HasWindowHandle,
{
    let display = match window.display_handle()?.as_raw() {
        RawDisplayHandle::Wayland(handle) => handle.display,
        _ => return Err(Error::UnsupportedDisplay),
    };
    let surface = match window.window_handle()?.as_raw() {
        RawWindowHandle::Wayland(handle) => handle.surface,
        _ => return Err(Error::UnsupportedDisplay),
    };

    // SAFETY: the handles are valid for as long as `window` lives, which the
    // keyboard keeps around.
    let backend = unsafe { Backend::from_foreign_display(display.as_ptr().cast()) };
    let connection = Connection::from_backend(backend);
    let surface_id =
        unsafe { ObjectId::from_ptr(WlSurface::interface(), surface.as_ptr().cast()) }?;
    let surface = WlSurface::from_id(&connection, surface_id)?;

    Ok((connection, make_surface_id(&surface)))
}

impl Inner {
    fn new<H>(
        connection: &Connection,
        target: SurfaceId,
        attributes: KeyboardAttributes,
        handler: H,
        host: Option<Box<dyn Any>>,
    ) -> Result<Self, Error>
    where
        H: KeyboardHandler + 'static,
    {
        let event_loop = calloop::EventLoop::<'static, WaylandState>::try_new()?;
        let queue = connection.new_event_queue();
        let platform =
            WaylandPlatform::new(connection.display(), queue.handle(), event_loop.handle());
        let keyboards = KeyboardState::new(platform, target, attributes, handler);
        let mut state = WaylandState { keyboards };

        // A source of events that we plug into our event loop.
        let wayland_source = WaylandSource::new(connection.clone(), queue);
        let dispatcher = calloop::Dispatcher::new(
            wayland_source,
            |_, queue: &mut EventQueue<WaylandState>, state: &mut WaylandState| {
                queue.dispatch_pending(state)
            },
        );
        event_loop.handle().register_dispatcher(dispatcher.clone())?;

        // Bind the seats, then create the keyboards of the seats that have one.
        for _ in 0..2 {
            dispatcher.as_source_mut().queue().roundtrip(&mut state)?;
        }
        debug!(seats = state.keyboards.registry().seats().count(), "keyboard input ready");

        Ok(Self { state, dispatcher, event_loop, _host: host })
    }

    fn dispatch(&mut self, timeout: Option<Duration>) -> Result<(), Error> {
        self.event_loop.dispatch(timeout, &mut self.state)?;
        Ok(())
    }

    fn roundtrip(&mut self) -> Result<(), Error> {
        self.dispatcher.as_source_mut().queue().roundtrip(&mut self.state)?;
        Ok(())
    }

    fn teardown(mut self: Box<Self>) {
        self.state.keyboards.release_devices();
        // Flush events still in flight for the released keyboards.
        if let Err(err) = self.roundtrip() {
            warn!("failed to release keyboards: {err}");
        }
        self.state.keyboards.destroy_devices();
        self.state.keyboards.release_seats();
        if let Err(err) = self.roundtrip() {
            warn!("failed to release seats: {err}");
        }
        debug!("keyboard input stopped");
    }
}

#[cfg(test)]
mod tests {
    use std::ptr::NonNull;

    use rwh_06::{
        DisplayHandle, HandleError, WaylandDisplayHandle, WindowHandle, XlibDisplayHandle,
        XlibWindowHandle,
    };
    use wlkbd_core::Callbacks;

    use super::*;

    struct XlibWindow;

    impl HasDisplayHandle for XlibWindow {
        fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
            let raw = RawDisplayHandle::Xlib(XlibDisplayHandle::new(None, 0));
            Ok(unsafe { DisplayHandle::borrow_raw(raw) })
        }
    }

    impl HasWindowHandle for XlibWindow {
        fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
            let raw = RawWindowHandle::Xlib(XlibWindowHandle::new(1));
            Ok(unsafe { WindowHandle::borrow_raw(raw) })
        }
    }

    /// A Wayland window whose surface was already destroyed.
    struct GoneWindow;

    impl HasDisplayHandle for GoneWindow {
        fn display_handle(&self) -> Result<DisplayHandle<'_>, HandleError> {
            let raw = RawDisplayHandle::Wayland(WaylandDisplayHandle::new(NonNull::dangling()));
            Ok(unsafe { DisplayHandle::borrow_raw(raw) })
        }
    }

    impl HasWindowHandle for GoneWindow {
        fn window_handle(&self) -> Result<WindowHandle<'_>, HandleError> {
            Err(HandleError::Unavailable)
        }
    }

    fn init_logging() {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    }

    #[test]
    fn non_wayland_display_is_inert() {
        init_logging();
        let keyboard =
            Keyboard::initialize(XlibWindow, KeyboardAttributes::default(), Callbacks::new());
        assert!(!keyboard.is_active());
        assert!(!keyboard.has_focus());
        assert!(keyboard.as_fd().is_none());
        keyboard.teardown();
    }

    #[test]
    fn unavailable_handle_is_inert() {
        init_logging();
        let result = connect_foreign(&GoneWindow);
        assert!(matches!(result, Err(Error::Handle(HandleError::Unavailable))));

        let mut keyboard =
            Keyboard::initialize(GoneWindow, KeyboardAttributes::default(), Callbacks::new());
        assert!(!keyboard.is_active());
        assert!(keyboard.dispatch(Some(Duration::ZERO)).is_ok());
    }

    #[test]
    fn inert_keyboard_debug() {
        assert_eq!(format!("{:?}", Keyboard::inert()), "Keyboard(inert)");
    }

    #[test]
    fn connects_to_a_live_compositor() {
        init_logging();
        // Only meaningful inside a Wayland session.
        let connection = match Connection::connect_to_env() {
            Ok(connection) => connection,
            Err(_) => return,
        };

        // The target surface is never entered, so nothing is reported.
        let target = SurfaceId::from_raw(usize::MAX);
        let inner =
            Inner::new(&connection, target, KeyboardAttributes::default(), Callbacks::new(), None);
        let mut keyboard = Keyboard::from_result(inner);
        assert!(keyboard.is_active());
        assert!(keyboard.as_fd().is_some());
        assert!(keyboard.dispatch(Some(Duration::from_millis(10))).is_ok());
        assert!(!keyboard.has_focus());
        keyboard.teardown();
    }
}
