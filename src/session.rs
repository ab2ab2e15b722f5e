//! Panel session ownership
//!
//! The configuration panel is a host window. At most one may be open at a
//! time: [`SessionManager`] owns the only handle and closes the previous
//! window before opening a new one.

use crate::{Error, Result};
use log::{info, warn};

/// Development UI server
pub const DEV_SERVER_URL: &str = "http://localhost:5173";

/// Directory inside the plugin bundle that holds the running script
const SCRIPT_DIR_MARKER: &str = "/Contents/Sketch/";

/// Bundled UI entry point relative to the plugin root
const BUNDLED_UI_PATH: &str = "/Contents/Resources/ui/dist/index.html";

/// Window creation options understood by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowOptions {
    pub identifier: String,
    pub width: u32,
    pub height: u32,
    /// Show immediately; the panel stays hidden until ready to avoid a flash
    pub show: bool,
    pub always_on_top: bool,
    pub title_bar_style: String,
    pub background_color: String,
    pub has_shadow: bool,
    pub accepts_first_mouse: bool,
    pub resizable: bool,
    pub frame: bool,
    pub minimizable: bool,
    pub maximizable: bool,
    pub dev_tools: bool,
}

impl Default for WindowOptions {
    fn default() -> Self {
        Self {
            identifier: "studio.workingon.plugin.webview".to_string(),
            width: 400,
            height: 500,
            show: false,
            always_on_top: true,
            title_bar_style: "hiddenInset".to_string(),
            background_color: "#FFFFFF".to_string(),
            has_shadow: true,
            accepts_first_mouse: true,
            resizable: false,
            frame: true,
            minimizable: false,
            maximizable: false,
            dev_tools: true,
        }
    }
}

/// Where the panel UI is loaded from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UiSource {
    DevServer(String),
    Bundled(String),
}

impl UiSource {
    /// Dev server in dev mode, otherwise the bundle next to `script_path`
    pub fn resolve(dev_mode: bool, script_path: &str) -> Self {
        if dev_mode {
            return UiSource::DevServer(DEV_SERVER_URL.to_string());
        }
        let plugin_root = script_path
            .split(SCRIPT_DIR_MARKER)
            .next()
            .unwrap_or(script_path);
        UiSource::Bundled(format!("file://{}{}", plugin_root, BUNDLED_UI_PATH))
    }

    pub fn url(&self) -> &str {
        match self {
            UiSource::DevServer(url) | UiSource::Bundled(url) => url,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct WindowHandle(pub u64);

/// Window operations a host must provide
pub trait PanelHost {
    fn has_document(&self) -> bool;
    fn create_window(&mut self, options: &WindowOptions, source: &UiSource) -> Result<WindowHandle>;
    fn show_window(&mut self, handle: WindowHandle) -> Result<()>;
    fn close_window(&mut self, handle: WindowHandle) -> Result<()>;
    fn is_destroyed(&self, handle: WindowHandle) -> bool;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Hidden,
    Visible,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PanelSession {
    pub handle: WindowHandle,
    pub source: UiSource,
    pub state: SessionState,
}

/// Owns the single open QR panel on a host
pub struct SessionManager<H: PanelHost> {
    host: H,
    options: WindowOptions,
    current: Option<PanelSession>,
}

impl<H: PanelHost> SessionManager<H> {
    pub fn new(host: H) -> Self {
        Self::with_options(host, WindowOptions::default())
    }

    pub fn with_options(host: H, options: WindowOptions) -> Self {
        Self {
            host,
            options,
            current: None,
        }
    }

    pub fn current(&self) -> Option<&PanelSession> {
        self.current.as_ref()
    }

    pub fn host(&self) -> &H {
        &self.host
    }

    /// Open the panel, replacing any window that is already open
    pub fn open(&mut self, dev_mode: bool, script_path: &str) -> Result<WindowHandle> {
        if !self.host.has_document() {
            return Err(Error::NoDocument);
        }

        self.close_current();

        let source = UiSource::resolve(dev_mode, script_path);
        match &source {
            UiSource::DevServer(url) => info!("dev mode: loading panel from {}", url),
            UiSource::Bundled(url) => info!("loading bundled panel from {}", url),
        }
        let handle = self.host.create_window(&self.options, &source)?;
        self.current = Some(PanelSession {
            handle,
            source,
            state: SessionState::Hidden,
        });
        Ok(handle)
    }

    /// The window finished loading; reveal it
    pub fn ready_to_show(&mut self, handle: WindowHandle) -> Result<()> {
        match self.current.as_mut() {
            Some(session) if session.handle == handle => {
                self.host.show_window(handle)?;
                session.state = SessionState::Visible;
                Ok(())
            }
            _ => Err(Error::Window(format!("window {} is not the open panel", handle.0))),
        }
    }

    /// The host reports a window closed by the user
    pub fn closed(&mut self, handle: WindowHandle) {
        if self.current.as_ref().map(|s| s.handle) == Some(handle) {
            self.current = None;
        }
    }

    /// Close the open panel, if any
    pub fn close(&mut self) {
        self.close_current();
    }

    fn close_current(&mut self) {
        if let Some(previous) = self.current.take() {
            if !self.host.is_destroyed(previous.handle) {
                if let Err(e) = self.host.close_window(previous.handle) {
                    warn!("failed to close panel window {}: {}", previous.handle.0, e);
                }
            }
        }
    }
}
