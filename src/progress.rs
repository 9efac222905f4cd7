//! Loading indicator.
//!
//! The viewer only signals "update" and "hide"; what the indicator looks like
//! is up to the host page (web) or the log (native).

use crate::resources::Progress;

pub trait ProgressSink {
    fn update(&mut self, progress: Progress);

    /// Called once, after the model was attached.
    fn hide(&mut self);
}

/// Logs progress at info level whenever another tenth of the file arrived.
#[derive(Debug, Default)]
pub struct LogProgress {
    last_decile: Option<u32>,
    hidden: bool,
}

impl LogProgress {
    pub fn is_hidden(&self) -> bool {
        self.hidden
    }
}

impl ProgressSink for LogProgress {
    fn update(&mut self, progress: Progress) {
        match progress.fraction() {
            Some(fraction) => {
                let decile = (fraction * 10.0).floor() as u32;
                if self.last_decile != Some(decile) {
                    self.last_decile = Some(decile);
                    log::info!("Loading model: {progress}");
                }
            }
            None => log::debug!("Loading model: {progress}"),
        }
    }

    fn hide(&mut self) {
        self.hidden = true;
    }
}

/// Hides a DOM element (by id) once loading finished.
#[cfg(target_arch = "wasm32")]
pub struct DomProgress {
    element_id: String,
}

#[cfg(target_arch = "wasm32")]
impl DomProgress {
    pub const DEFAULT_ID: &'static str = "progress-container";

    pub fn new(element_id: &str) -> Self {
        Self {
            element_id: element_id.to_string(),
        }
    }

    fn element(&self) -> Option<web_sys::HtmlElement> {
        use wasm_bindgen::JsCast;
        web_sys::window()?
            .document()?
            .get_element_by_id(&self.element_id)?
            .dyn_into::<web_sys::HtmlElement>()
            .ok()
    }
}

#[cfg(target_arch = "wasm32")]
impl ProgressSink for DomProgress {
    fn update(&mut self, progress: Progress) {
        if let Some(el) = self.element() {
            let _ = el.set_attribute("data-progress", &progress.to_string());
        }
    }

    fn hide(&mut self) {
        match self.element() {
            Some(el) => {
                if el.style().set_property("display", "none").is_err() {
                    log::warn!("Could not hide #{}", self.element_id);
                }
            }
            None => log::debug!("No #{} element to hide", self.element_id),
        }
    }
}
