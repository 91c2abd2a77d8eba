//! Element sources.
//!
//! The tracker never talks to a browser directly. It asks an
//! [`ElementSource`] for a [`RawElementSnapshot`] of whatever the selector
//! currently resolves to.
//!
//! - [`MockElementSource`]: in-memory, for tests
//! - `CdpElementSource`: chromiumoxide page, behind the `browser` feature

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::genetic_code::RawElementSnapshot;
use crate::result::{GenomeError, GenomeResult};

/// Resolves a selector to a raw element snapshot
#[async_trait]
pub trait ElementSource: Send + Sync {
    /// Snapshot the element matched by `selector`, `Ok(None)` if nothing matches
    async fn snapshot(&self, selector: &str) -> GenomeResult<Option<RawElementSnapshot>>;
}

/// In-memory element source for unit testing
#[derive(Debug, Default)]
pub struct MockElementSource {
    elements: Mutex<HashMap<String, RawElementSnapshot>>,
    failure: Mutex<Option<String>>,
    delay: Option<Duration>,
    call_history: Mutex<Vec<String>>,
}

impl MockElementSource {
    /// Create an empty mock source
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every lookup after `delay`
    #[must_use]
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Register or replace the element behind a selector
    pub fn set_element(&self, selector: impl Into<String>, raw: RawElementSnapshot) {
        self.elements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(selector.into(), raw);
    }

    /// Remove the element behind a selector
    pub fn remove_element(&self, selector: &str) {
        self.elements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(selector);
    }

    /// Fail every lookup with a source error, or stop failing with `None`
    pub fn set_failure(&self, message: Option<String>) {
        *self.failure.lock().unwrap_or_else(PoisonError::into_inner) = message;
    }

    /// Selectors looked up so far
    #[must_use]
    pub fn history(&self) -> Vec<String> {
        self.call_history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Whether `selector` was looked up
    #[must_use]
    pub fn was_called(&self, selector: &str) -> bool {
        self.call_history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .any(|c| c == selector)
    }
}

#[async_trait]
impl ElementSource for MockElementSource {
    async fn snapshot(&self, selector: &str) -> GenomeResult<Option<RawElementSnapshot>> {
        self.call_history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(selector.to_string());

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(message) = self
            .failure
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
        {
            return Err(GenomeError::source(message));
        }
        Ok(self
            .elements
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(selector)
            .cloned())
    }
}

// ============================================================================
// Real CDP implementation (when `browser` feature is enabled)
// ============================================================================

#[cfg(feature = "browser")]
pub use cdp::{CdpElementSource, CdpSession};

/// Script that returns `JSON.stringify(snapshot)` for the first match of a
/// selector, or `"null"`. The snapshot uses the camelCase layout of
/// [`RawElementSnapshot`].
pub const EXTRACTION_SCRIPT: &str = r#"(selector) => {
  const el = document.querySelector(selector);
  if (!el) return JSON.stringify(null);
  const text = (s) => (s || "").trim().slice(0, 100) || undefined;
  const summary = (n) => n ? {
    tagName: n.tagName.toLowerCase(),
    id: n.id || undefined,
    classList: Array.from(n.classList),
    text: text(n.textContent && n.textContent.slice(0, 50)),
  } : undefined;
  const pathOf = (n) => {
    const parts = [];
    while (n && n.nodeType === 1) {
      const parent = n.parentElement;
      let part = n.tagName.toLowerCase();
      if (parent) part += `:nth-child(${Array.from(parent.children).indexOf(n) + 1})`;
      parts.unshift(part);
      n = parent;
    }
    return parts.join(" > ");
  };
  const data = {}, aria = {}, extra = {};
  for (const a of Array.from(el.attributes)) {
    if (a.name.startsWith("data-")) data[a.name.slice(5)] = a.value;
    else if (a.name.startsWith("aria-")) aria[a.name.slice(5)] = a.value;
    else if (!["id", "name", "class", "role", "style", "type", "placeholder", "href", "value"].includes(a.name)) extra[a.name] = a.value;
  }
  const form = {
    inputType: el.getAttribute("type") || undefined,
    placeholder: el.getAttribute("placeholder") || undefined,
    href: el.getAttribute("href") || undefined,
    value: el.getAttribute("value") || undefined,
  };
  const parent = el.parentElement;
  const siblings = parent ? Array.from(parent.children) : [el];
  const sameTag = siblings.filter((s) => s.tagName === el.tagName);
  let depth = 0;
  for (let n = el.parentElement; n; n = n.parentElement) depth++;
  const ancestry = [];
  for (let n = el.parentElement; n && ancestry.length < 3; n = n.parentElement) {
    ancestry.push({
      tagName: n.tagName.toLowerCase(),
      id: n.id || undefined,
      classList: Array.from(n.classList),
      role: n.getAttribute("role") || undefined,
      dataTestid: n.getAttribute("data-testid") || undefined,
    });
  }
  const cs = getComputedStyle(el);
  const r = el.getBoundingClientRect();
  return JSON.stringify({
    attributes: {
      id: el.id || undefined,
      name: el.getAttribute("name") || undefined,
      classList: Array.from(el.classList),
      dataAttributes: data,
      ariaAttributes: aria,
      role: el.getAttribute("role") || undefined,
      form: Object.values(form).some((v) => v !== undefined) ? form : undefined,
      extra,
    },
    style: {
      display: cs.display, visibility: cs.visibility, position: cs.position,
      zIndex: cs.zIndex, opacity: cs.opacity,
    },
    position: {
      tagName: el.tagName.toLowerCase(),
      siblingIndex: siblings.indexOf(el),
      depth,
      path: pathOf(el),
      sameTagIndex: sameTag.indexOf(el),
    },
    siblings: {
      previous: summary(el.previousElementSibling),
      next: summary(el.nextElementSibling),
      siblingCount: siblings.length,
      sameTagCount: sameTag.length,
    },
    ancestry,
    boundingBox: { x: r.x, y: r.y, width: r.width, height: r.height },
    textContent: text(el.textContent),
    domain: location.hostname || undefined,
  });
}"#;

#[cfg(feature = "browser")]
mod cdp {
    use super::{ElementSource, EXTRACTION_SCRIPT};
    use crate::genetic_code::RawElementSnapshot;
    use crate::result::{GenomeError, GenomeResult};
    use async_trait::async_trait;
    use chromiumoxide::browser::{Browser as CdpBrowser, BrowserConfig as CdpConfig};
    use chromiumoxide::page::Page as CdpPage;
    use futures::StreamExt;
    use tokio::task::JoinHandle;

    /// Launched chromium with one page open on the target URL
    #[derive(Debug)]
    pub struct CdpSession {
        browser: CdpBrowser,
        page: CdpPage,
        handler: JoinHandle<()>,
    }

    impl CdpSession {
        /// Launch chromium and open `url`
        ///
        /// # Errors
        ///
        /// Returns [`GenomeError::Source`] if the browser cannot be launched or
        /// the page cannot be opened
        pub async fn launch(url: &str, headless: bool) -> GenomeResult<Self> {
            let mut builder = CdpConfig::builder();
            if !headless {
                builder = builder.with_head();
            }
            let config = builder.build().map_err(GenomeError::source)?;

            let (browser, mut handler) = CdpBrowser::launch(config)
                .await
                .map_err(|e| GenomeError::source(e.to_string()))?;
            let handler = tokio::spawn(async move {
                while let Some(event) = handler.next().await {
                    if event.is_err() {
                        break;
                    }
                }
            });

            let page = browser
                .new_page(url)
                .await
                .map_err(|e| GenomeError::source(e.to_string()))?;
            Ok(Self {
                browser,
                page,
                handler,
            })
        }

        /// Element source over the open page
        #[must_use]
        pub fn source(&self) -> CdpElementSource {
            CdpElementSource::new(self.page.clone())
        }

        /// Close the browser
        ///
        /// # Errors
        ///
        /// Returns [`GenomeError::Source`] if chromium does not shut down cleanly
        pub async fn close(mut self) -> GenomeResult<()> {
            self.browser
                .close()
                .await
                .map_err(|e| GenomeError::source(e.to_string()))?;
            self.handler.abort();
            Ok(())
        }
    }

    /// Element source backed by a live chromiumoxide page
    #[derive(Debug, Clone)]
    pub struct CdpElementSource {
        page: CdpPage,
    }

    impl CdpElementSource {
        /// Wrap an open page
        #[must_use]
        pub const fn new(page: CdpPage) -> Self {
            Self { page }
        }

        /// The wrapped page
        #[must_use]
        pub const fn page(&self) -> &CdpPage {
            &self.page
        }
    }

    #[async_trait]
    impl ElementSource for CdpElementSource {
        async fn snapshot(&self, selector: &str) -> GenomeResult<Option<RawElementSnapshot>> {
            let expr = format!("({EXTRACTION_SCRIPT})({})", serde_json::to_string(selector)?);
            let result = self
                .page
                .evaluate_expression(expr)
                .await
                .map_err(|e| GenomeError::source(e.to_string()))?;
            let json: String = result
                .into_value()
                .map_err(|e| GenomeError::source(e.to_string()))?;
            Ok(serde_json::from_str(&json)?)
        }
    }
}
