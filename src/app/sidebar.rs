//! Sidebar collapse state with localStorage persistence.
//!
//! Pure preference logic here; the `wasm32` half wires the toggle
//! button and applies the stored state on load.

const STORAGE_KEY: &str = "cbm:sb-collapsed";

/// Collapse preference as stored in the browser.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum SidebarState {
    #[default]
    Expanded,
    Collapsed,
}

impl SidebarState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SidebarState::Expanded => "0",
            SidebarState::Collapsed => "1",
        }
    }

    /// Anything other than an explicit "1" means expanded, so a missing
    /// or corrupted key falls back to the default layout.
    pub fn parse(value: &str) -> Self {
        match value {
            "1" => SidebarState::Collapsed,
            _ => SidebarState::Expanded,
        }
    }

    pub fn toggled(&self) -> Self {
        match self {
            SidebarState::Expanded => SidebarState::Collapsed,
            SidebarState::Collapsed => SidebarState::Expanded,
        }
    }

    pub fn is_collapsed(&self) -> bool {
        matches!(self, SidebarState::Collapsed)
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm::*;

#[cfg(target_arch = "wasm32")]
mod wasm {
    use super::{SidebarState, STORAGE_KEY};

    use wasm_bindgen::prelude::*;
    use wasm_bindgen::JsCast;

    fn load() -> SidebarState {
        if let Some(window) = web_sys::window() {
            if let Ok(Some(storage)) = window.local_storage() {
                if let Ok(Some(value)) = storage.get_item(STORAGE_KEY) {
                    return SidebarState::parse(&value);
                }
            }
        }
        SidebarState::Expanded
    }

    fn save(state: SidebarState) {
        if let Some(window) = web_sys::window() {
            if let Ok(Some(storage)) = window.local_storage() {
                let _ = storage.set_item(STORAGE_KEY, state.as_str());
            }
        }
    }

    fn apply(state: SidebarState) {
        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let Some(body) = document.body() else { return };
        let _ = body
            .class_list()
            .toggle_with_force("sb-collapsed", state.is_collapsed());
    }

    /// Restore the stored collapse state and wire the toggle button.
    /// The click closure lives for the page lifetime.
    pub fn init_sidebar() {
        apply(load());

        let Some(document) = web_sys::window().and_then(|w| w.document()) else {
            return;
        };
        let Some(toggle) = document.get_element_by_id("sidebarToggle") else {
            return;
        };
        let on_click = Closure::wrap(Box::new(move |_event: web_sys::Event| {
            let next = load().toggled();
            save(next);
            apply(next);
        }) as Box<dyn FnMut(web_sys::Event)>);
        let _ = toggle
            .add_event_listener_with_callback("click", on_click.as_ref().unchecked_ref());
        on_click.forget();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_tolerates_garbage() {
        assert_eq!(SidebarState::parse("1"), SidebarState::Collapsed);
        assert_eq!(SidebarState::parse("0"), SidebarState::Expanded);
        assert_eq!(SidebarState::parse(""), SidebarState::Expanded);
        assert_eq!(SidebarState::parse("true"), SidebarState::Expanded);
    }

    #[test]
    fn toggle_round_trips() {
        let state = SidebarState::Expanded;
        assert_eq!(state.toggled().toggled(), state);
        assert!(state.toggled().is_collapsed());
    }
}
