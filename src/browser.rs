use std::env;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use headless_chrome::protocol::cdp::Browser::{SetDownloadBehavior, SetDownloadBehaviorBehaviorOption};
use headless_chrome::{Browser, Element, LaunchOptions, Tab};
use log::{debug, info};
use scraper::{Html, Selector};
use serde_json::json;
use url::Url;

use crate::error::{Error, Result};
use crate::request::BrowserKind;
use crate::settings::Settings;

/// Text the portals render in `p.alert` when the sign-in form is rejected.
pub const INVALID_LOGIN_ALERT: &str = "Invalid email or password.";

const EDGE_EXECUTABLES: [&str; 4] = ["msedge", "microsoft-edge", "microsoft-edge-stable", "msedge.exe"];
const EDGE_WINDOWS_PATHS: [&str; 2] = [
    r"C:\Program Files (x86)\Microsoft\Edge\Application\msedge.exe",
    r"C:\Program Files\Microsoft\Edge\Application\msedge.exe",
];

/// Checkpoints of a portal session, in the only order they may be reached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Start,
    Authenticated,
    PortalEntered,
    ModelSelected,
    SearchSubmitted,
    SpectrumSelected,
    ExportTriggered,
    Downloading,
    Done,
}

impl SessionState {
    pub fn next(self) -> Option<SessionState> {
        use SessionState::*;
        match self {
            Start => Some(Authenticated),
            Authenticated => Some(PortalEntered),
            PortalEntered => Some(ModelSelected),
            ModelSelected => Some(SearchSubmitted),
            SearchSubmitted => Some(SpectrumSelected),
            SpectrumSelected => Some(ExportTriggered),
            ExportTriggered => Some(Downloading),
            Downloading => Some(Done),
            Done => None,
        }
    }
}

#[derive(Debug)]
pub struct StateMachine {
    state: SessionState,
}

impl Default for StateMachine {
    fn default() -> Self {
        StateMachine { state: SessionState::Start }
    }
}

impl StateMachine {
    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn advance(&mut self, to: SessionState) -> Result<()> {
        if self.state.next() != Some(to) {
            return Err(Error::Browser(format!(
                "session cannot move from {:?} to {:?}",
                self.state, to
            )));
        }
        info!("Session: {:?} -> {:?}", self.state, to);
        self.state = to;
        Ok(())
    }
}

/// How a portal control is found on the page.
#[derive(Debug, Clone, Copy)]
pub enum Locator<'a> {
    Name(&'a str),
    Id(&'a str),
    Css(&'a str),
    XPath(&'a str),
    LinkText(&'a str),
}

enum Query {
    Css(String),
    XPath(String),
}

impl Locator<'_> {
    fn query(&self) -> Query {
        match self {
            Locator::Name(name) => Query::Css(format!("[name=\"{}\"]", name)),
            Locator::Id(id) => Query::Css(format!("[id=\"{}\"]", id)),
            Locator::Css(css) => Query::Css(css.to_string()),
            Locator::XPath(xpath) => Query::XPath(xpath.to_string()),
            Locator::LinkText(text) => Query::XPath(format!("//a[normalize-space(.)=\"{}\"]", text)),
        }
    }
}

impl fmt::Display for Locator<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Locator::Name(v) => write!(f, "name={}", v),
            Locator::Id(v) => write!(f, "id={}", v),
            Locator::Css(v) => write!(f, "css={}", v),
            Locator::XPath(v) => write!(f, "xpath={}", v),
            Locator::LinkText(v) => write!(f, "link={}", v),
        }
    }
}

/// A live browser driving one portal. Dropping it shuts the browser down.
pub struct UiSession {
    tab: Arc<Tab>,
    machine: StateMachine,
    // Owns the browser process; kept last so the tab handle goes first.
    _browser: Browser,
}

impl UiSession {
    pub fn launch(kind: BrowserKind, settings: &Settings) -> Result<Self> {
        let executable = resolve_executable(kind, settings.browser_path.as_deref())?;
        let download_dir = absolute_dir(&settings.work_dir)?;
        // Downloads happen without CDP traffic; keep the browser alive through them.
        let idle = settings.element_timeout() + settings.download_timeout() + Duration::from_secs(60);

        let options = LaunchOptions::default_builder()
            .headless(settings.headless)
            .path(executable)
            .idle_browser_timeout(idle)
            .build()
            .map_err(|e| Error::Browser(format!("invalid launch options: {}", e)))?;

        info!("Launching {:?} (headless: {})", kind, settings.headless);
        let browser = Browser::new(options)
            .map_err(|e| Error::Browser(format!("failed to launch {:?}: {}", kind, e)))?;
        let tab = browser
            .new_tab()
            .map_err(|e| Error::Browser(format!("failed to open a tab: {}", e)))?;
        tab.set_default_timeout(settings.element_timeout());

        tab.call_method(SetDownloadBehavior {
            behavior: SetDownloadBehaviorBehaviorOption::Allow,
            browser_context_id: None,
            download_path: Some(download_dir.to_string_lossy().into_owned()),
            events_enabled: None,
        })
        .map_err(|e| Error::Browser(format!("failed to set download directory: {}", e)))?;
        debug!("Downloads go to {:?}", download_dir);

        Ok(UiSession { tab, machine: StateMachine::default(), _browser: browser })
    }

    pub fn advance(&mut self, to: SessionState) -> Result<()> {
        self.machine.advance(to)
    }

    pub fn open(&self, url: &Url) -> Result<()> {
        info!("Opening {}", url);
        self.tab
            .navigate_to(url.as_str())
            .and_then(|tab| tab.wait_until_navigated())
            .map_err(|e| Error::Browser(format!("failed to load {}: {}", url, e)))?;
        Ok(())
    }

    /// Waits up to the element timeout for the control to appear.
    pub fn find(&self, locator: Locator<'_>) -> Result<Element<'_>> {
        let found = match locator.query() {
            Query::Css(css) => self.tab.wait_for_element(&css),
            Query::XPath(xpath) => self.tab.wait_for_xpath(&xpath),
        };
        found.map_err(|e| {
            debug!("Lookup of {} failed: {}", locator, e);
            Error::UiElementNotFound { locator: locator.to_string() }
        })
    }

    pub fn click(&self, locator: Locator<'_>) -> Result<()> {
        debug!("Click {}", locator);
        self.find(locator)?
            .click()
            .map_err(|e| Error::Browser(format!("click on {} failed: {}", locator, e)))?;
        Ok(())
    }

    /// Clears the input, then types `text` into it.
    pub fn fill(&self, locator: Locator<'_>, text: &str) -> Result<()> {
        let element = self.find(locator)?;
        element
            .call_js_fn("function() { this.value = ''; }", vec![], false)
            .and_then(|_| element.type_into(text))
            .map_err(|e| Error::Browser(format!("typing into {} failed: {}", locator, e)))?;
        Ok(())
    }

    /// Picks an `<option>` of a `<select>` by value and fires `change`.
    pub fn select_value(&self, locator: Locator<'_>, value: &str) -> Result<()> {
        debug!("Select {} on {}", value, locator);
        let element = self.find(locator)?;
        let selected = element
            .call_js_fn(
                "function(value) {
                    const option = Array.from(this.options).find(o => o.value === value);
                    if (!option) { return false; }
                    this.value = value;
                    this.dispatchEvent(new Event('change', { bubbles: true }));
                    return true;
                }",
                vec![json!(value)],
                false,
            )
            .map_err(|e| Error::Browser(format!("selecting {} on {} failed: {}", value, locator, e)))?;

        if selected.value != Some(json!(true)) {
            return Err(Error::UiElementNotFound {
                locator: format!("{} option value={}", locator, value),
            });
        }
        Ok(())
    }

    /// Makes `alert`/`confirm` on the current page return immediately, confirming.
    pub fn accept_dialogs(&self) -> Result<()> {
        self.tab
            .evaluate(
                "window.alert = function() {}; window.confirm = function() { return true; }; true",
                false,
            )
            .map_err(|e| Error::Browser(format!("failed to install dialog handler: {}", e)))?;
        Ok(())
    }

    pub fn wait_for_navigation(&self) -> Result<()> {
        self.tab
            .wait_until_navigated()
            .map_err(|e| Error::Browser(format!("page did not finish loading: {}", e)))?;
        Ok(())
    }

    pub fn page_html(&self) -> Result<String> {
        self.tab
            .get_content()
            .map_err(|e| Error::Browser(format!("failed to read page content: {}", e)))
    }

    pub fn close(self) {
        info!("Closing browser.");
    }
}

/// The portal's rejection message, if the rendered sign-in page shows one.
pub fn login_rejection(html: &str) -> Option<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse("p.alert").ok()?;
    document
        .select(&selector)
        .map(|alert| alert.text().collect::<String>().trim().to_string())
        .find(|text| text == INVALID_LOGIN_ALERT)
}

fn resolve_executable(kind: BrowserKind, configured: Option<&Path>) -> Result<Option<PathBuf>> {
    if let Some(path) = configured {
        if !path.is_file() {
            return Err(Error::Configuration(format!("browser executable {:?} not found", path)));
        }
        return Ok(Some(path.to_path_buf()));
    }
    match kind {
        // headless_chrome finds Chrome/Chromium on its own.
        BrowserKind::Chrome => Ok(None),
        BrowserKind::Edge => find_edge().map(Some).ok_or_else(|| {
            Error::Configuration("Microsoft Edge not found; set browser_path in the settings".into())
        }),
    }
}

fn find_edge() -> Option<PathBuf> {
    let on_path = env::var_os("PATH").and_then(|paths| {
        env::split_paths(&paths)
            .flat_map(|dir| EDGE_EXECUTABLES.iter().map(move |exe| dir.join(exe)))
            .find(|candidate| candidate.is_file())
    });
    on_path.or_else(|| {
        EDGE_WINDOWS_PATHS.iter().map(PathBuf::from).find(|candidate| candidate.is_file())
    })
}

fn absolute_dir(dir: &Path) -> Result<PathBuf> {
    if !dir.is_dir() {
        return Err(Error::Configuration(format!("work directory {:?} does not exist", dir)));
    }
    Ok(dir.canonicalize()?)
}
