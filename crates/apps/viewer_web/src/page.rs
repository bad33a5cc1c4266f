use explorer::{FocusTarget, Glyph, Page, PanelContent, TourCard};
use runtime::Notice;
use scene::MarkerId;
use wasm_bindgen::prelude::*;
use web_sys::{Document, Element, HtmlElement, HtmlImageElement};

use crate::map::marker_element;
use crate::{UiEvent, dispatch};

const FOCUSABLE: &str = "button, [href], input, select, textarea, [tabindex]:not([tabindex=\"-1\"])";

const PANEL: &str = "info-panel";
const PANEL_CONTENT: &str = "info-panel-content";
const PANEL_CLOSE: &str = "panel-close-btn";
const MAP: &str = "map";
const WELCOME: &str = "welcome-overlay";
const TOUR_ENTRY: &str = "start-tour-btn";
const TOUR_CARD: &str = "tour-card";

/// The real document. Element lookups happen per call so a missing element
/// only disables the one affordance that needs it.
pub struct DomPage {
    document: Document,
    /// The panel image whose load callbacks are currently installed.
    panel_image: Option<HtmlImageElement>,
    image_handlers: Vec<Closure<dyn FnMut()>>,
    tour_handlers: Vec<Closure<dyn FnMut()>>,
}

impl DomPage {
    pub fn new(document: Document) -> Self {
        Self {
            document,
            panel_image: None,
            image_handlers: Vec::new(),
            tour_handlers: Vec::new(),
        }
    }

    /// Hooks static controls to UI events. Lives as long as the page.
    pub fn wire_controls(&self) {
        let bindings = [
            (PANEL_CLOSE, UiEvent::CloseRequested),
            ("zoom-in", UiEvent::ZoomIn),
            ("zoom-out", UiEvent::ZoomOut),
            ("start-journey-btn", UiEvent::BeginJourney),
            (TOUR_ENTRY, UiEvent::TourStart),
        ];
        for (id, event) in bindings {
            let Some(el) = self.document.get_element_by_id(id) else {
                tracing::warn!(id, "control missing; not wired");
                continue;
            };
            let handler = Closure::<dyn FnMut()>::new(move || dispatch(event));
            let _ = el.add_event_listener_with_callback("click", handler.as_ref().unchecked_ref());
            handler.forget();
        }

        let on_key = Closure::<dyn FnMut(web_sys::KeyboardEvent)>::new(crate::handle_key);
        let _ = self
            .document
            .add_event_listener_with_callback("keydown", on_key.as_ref().unchecked_ref());
        on_key.forget();
    }

    fn by_id(&self, id: &str) -> Option<HtmlElement> {
        self.document.get_element_by_id(id)?.dyn_into().ok()
    }

    fn create(&self, tag: &str, class: &str) -> Result<Element, JsValue> {
        let el = self.document.create_element(tag)?;
        if !class.is_empty() {
            el.set_class_name(class);
        }
        Ok(el)
    }

    fn text(&self, tag: &str, class: &str, text: &str) -> Result<Element, JsValue> {
        let el = self.create(tag, class)?;
        el.set_text_content(Some(text));
        Ok(el)
    }

    fn glyph(&self, glyph: Glyph) -> Result<Element, JsValue> {
        let class = match glyph {
            Glyph::Pin => "glyph glyph-pin",
        };
        let el = self.create("span", class)?;
        el.set_attribute("aria-hidden", "true")?;
        Ok(el)
    }

    fn panel_focusable_elements(&self) -> Vec<HtmlElement> {
        let Some(panel) = self.document.get_element_by_id(PANEL) else {
            return Vec::new();
        };
        let Ok(list) = panel.query_selector_all(FOCUSABLE) else {
            return Vec::new();
        };
        (0..list.length())
            .filter_map(|i| list.item(i))
            .filter_map(|node| node.dyn_into::<HtmlElement>().ok())
            .collect()
    }

    fn element_for(&self, target: FocusTarget) -> Option<HtmlElement> {
        match target {
            FocusTarget::Marker(marker) => marker_element(marker.index()),
            FocusTarget::PanelClose => self.by_id(PANEL_CLOSE),
            FocusTarget::PanelControl(i) => self.panel_focusable_elements().into_iter().nth(i as usize),
            FocusTarget::MapContainer => self.by_id(MAP),
        }
    }

    fn build_panel(&mut self, content: &PanelContent) -> Result<(), JsValue> {
        let container = self
            .document
            .get_element_by_id(PANEL_CONTENT)
            .ok_or_else(|| JsValue::from_str("panel content container missing"))?;
        self.detach_panel_image();
        container.set_inner_html("");

        let frame = self.create("div", "panel-image-container loading")?;
        frame.append_child(&self.create("div", "loading-spinner")?.into())?;

        let img: HtmlImageElement = self.create("img", "panel-image")?.dyn_into()?;
        img.set_src(&content.image.src);
        if let Some(srcset) = content.image.srcset() {
            img.set_srcset(&srcset);
        }
        if let Some(sizes) = &content.image.sizes {
            img.set_sizes(sizes);
        }
        img.set_alt(&content.image.alt);
        if content.image.lazy {
            img.set_attribute("loading", "lazy")?;
        }

        let revision = content.revision;
        let on_load = Closure::<dyn FnMut()>::new(move || dispatch(UiEvent::ImageLoaded(revision)));
        let on_error = Closure::<dyn FnMut()>::new(move || dispatch(UiEvent::ImageFailed(revision)));
        img.set_onload(Some(on_load.as_ref().unchecked_ref()));
        img.set_onerror(Some(on_error.as_ref().unchecked_ref()));
        self.image_handlers = vec![on_load, on_error];
        self.panel_image = Some(img.clone());
        frame.append_child(&img)?;
        container.append_child(&frame)?;

        let text = self.create("div", "panel-text-content")?;
        text.append_child(&self.text("h2", "", &content.title)?.into())?;
        let region = self.create("h3", "")?;
        region.append_child(&self.glyph(content.region_glyph)?.into())?;
        region.append_child(&self.text("span", "region-label", &content.region)?.into())?;
        text.append_child(&region)?;
        text.append_child(&self.text("p", "", &content.description)?.into())?;
        container.append_child(&text)?;
        Ok(())
    }

    /// A replaced image can still finish loading; unhook it before its
    /// callbacks are dropped.
    fn detach_panel_image(&mut self) {
        if let Some(old) = self.panel_image.take() {
            old.set_onload(None);
            old.set_onerror(None);
        }
        self.image_handlers.clear();
    }

    fn build_tour_card(&mut self, card: &TourCard) -> Result<(), JsValue> {
        let root = match self.document.get_element_by_id(TOUR_CARD) {
            Some(existing) => existing,
            None => {
                let el = self.create("div", "tour-card")?;
                el.set_id(TOUR_CARD);
                el.set_attribute("role", "dialog")?;
                el.set_attribute("aria-label", "Tour Information")?;
                self.document
                    .body()
                    .ok_or_else(|| JsValue::from_str("document has no body"))?
                    .append_child(&el)?;
                el
            }
        };
        root.set_inner_html("");
        root.class_list().toggle_with_force("expanded", card.expanded)?;
        let mut handlers = Vec::new();

        let header = self.create("div", "tour-header")?;
        header.append_child(&self.text("span", "tour-progress", &card.progress_label)?.into())?;
        let close = self.text("button", "tour-close-btn reset-button", "\u{00d7}")?;
        close.set_attribute("aria-label", "Exit Tour")?;
        handlers.push(on_click(&close, UiEvent::TourEnd)?);
        header.append_child(&close)?;
        root.append_child(&header)?;

        let body = self.create("div", "tour-content")?;
        body.append_child(&self.text("h2", "tour-title", &card.title)?.into())?;
        let location = self.create("div", "tour-location")?;
        location.append_child(&self.glyph(Glyph::Pin)?.into())?;
        location.append_child(&self.text("span", "", &card.region)?.into())?;
        body.append_child(&location)?;

        let snippet = self.text("p", "tour-snippet", &card.synopsis)?;
        snippet.class_list().toggle_with_force("hidden", !card.synopsis_visible())?;
        body.append_child(&snippet)?;

        let details = self.create("div", "tour-expanded-content")?;
        details.set_id(&card.details_id);
        details.class_list().toggle_with_force("hidden", !card.details_visible())?;
        details.append_child(&self.text("p", "", &card.description)?.into())?;
        let preview = self.create("div", "tour-image-preview")?;
        let img: HtmlImageElement = self.create("img", "")?.dyn_into()?;
        img.set_src(&card.image_src);
        img.set_alt(&card.image_alt);
        img.set_attribute("loading", "lazy")?;
        preview.append_child(&img)?;
        details.append_child(&preview)?;
        body.append_child(&details)?;

        let more = self.text("button", "tour-more-btn reset-button", card.toggle_label)?;
        more.set_attribute("aria-expanded", if card.expanded { "true" } else { "false" })?;
        more.set_attribute("aria-controls", &card.details_id)?;
        handlers.push(on_click(&more, UiEvent::TourToggle)?);
        body.append_child(&more)?;
        root.append_child(&body)?;

        let controls = self.create("div", "tour-controls")?;
        let prev = self.text("button", "tour-nav-btn prev reset-button", "\u{2039}")?;
        prev.set_attribute("aria-label", "Previous Stop")?;
        if !card.prev_enabled {
            prev.set_attribute("disabled", "")?;
        }
        handlers.push(on_click(&prev, UiEvent::TourPrev)?);
        controls.append_child(&prev)?;

        let next = self.text("button", "tour-nav-btn next reset-button", card.next_label)?;
        let next_aria = if card.is_last { "Finish Tour" } else { "Next Stop" };
        next.set_attribute("aria-label", next_aria)?;
        handlers.push(on_click(&next, UiEvent::TourNext)?);
        controls.append_child(&next)?;
        root.append_child(&controls)?;

        self.tour_handlers = handlers;
        Ok(())
    }

    fn toggle_class(&self, id: &str, class: &str, on: bool) {
        let Some(el) = self.document.get_element_by_id(id) else {
            tracing::debug!(id, "element missing");
            return;
        };
        let _ = el.class_list().toggle_with_force(class, on);
    }
}

fn on_click(el: &Element, event: UiEvent) -> Result<Closure<dyn FnMut()>, JsValue> {
    let handler = Closure::<dyn FnMut()>::new(move || dispatch(event));
    el.add_event_listener_with_callback("click", handler.as_ref().unchecked_ref())?;
    Ok(handler)
}

impl Page for DomPage {
    fn render_panel(&mut self, content: &PanelContent) {
        if let Err(err) = self.build_panel(content) {
            tracing::warn!(?err, "panel render failed");
        }
    }

    fn set_panel_image(&mut self, src: &str) {
        let Ok(Some(el)) = self.document.query_selector(&format!("#{PANEL_CONTENT} .panel-image")) else {
            return;
        };
        if let Ok(img) = el.dyn_into::<HtmlImageElement>() {
            img.set_srcset("");
            img.set_src(src);
        }
    }

    fn set_panel_image_loading(&mut self, loading: bool) {
        if let Ok(Some(el)) = self
            .document
            .query_selector(&format!("#{PANEL_CONTENT} .panel-image-container"))
        {
            let _ = el.class_list().toggle_with_force("loading", loading);
        }
    }

    fn set_panel_visible(&mut self, visible: bool) {
        self.toggle_class(PANEL, "active", visible);
        if let Some(panel) = self.document.get_element_by_id(PANEL) {
            let _ = panel.set_attribute("aria-hidden", if visible { "false" } else { "true" });
        }
    }

    fn set_background_locked(&mut self, locked: bool) {
        if let Some(body) = self.document.body() {
            let _ = body.class_list().toggle_with_force("panel-active", locked);
        }
    }

    fn panel_focusables(&self) -> Vec<FocusTarget> {
        self.panel_focusable_elements()
            .iter()
            .enumerate()
            .map(|(i, el)| {
                if el.id() == PANEL_CLOSE {
                    FocusTarget::PanelClose
                } else {
                    FocusTarget::PanelControl(i as u32)
                }
            })
            .collect()
    }

    fn focused(&self) -> Option<FocusTarget> {
        let active = self.document.active_element()?;
        match active.id().as_str() {
            PANEL_CLOSE => return Some(FocusTarget::PanelClose),
            MAP => return Some(FocusTarget::MapContainer),
            _ => {}
        }
        if let Some(index) = active
            .get_attribute("data-marker-index")
            .and_then(|raw| raw.parse::<usize>().ok())
        {
            return Some(FocusTarget::Marker(MarkerId::from_index(index)));
        }
        self.panel_focusable_elements()
            .iter()
            .position(|el| el.is_same_node(Some(&*active)))
            .map(|i| FocusTarget::PanelControl(i as u32))
    }

    fn is_attached(&self, target: FocusTarget) -> bool {
        self.element_for(target).is_some_and(|el| el.is_connected())
    }

    fn focus(&mut self, target: FocusTarget) -> bool {
        self.element_for(target).is_some_and(|el| el.focus().is_ok())
    }

    fn set_tour_entry_visible(&mut self, visible: bool) {
        self.toggle_class(TOUR_ENTRY, "hidden", !visible);
        if let Some(body) = self.document.body() {
            let _ = body.class_list().toggle_with_force("tour-active", !visible);
        }
    }

    fn render_tour_card(&mut self, card: &TourCard) {
        if let Err(err) = self.build_tour_card(card) {
            tracing::warn!(?err, "tour card render failed");
        }
    }

    fn remove_tour_card(&mut self) {
        if let Some(card) = self.document.get_element_by_id(TOUR_CARD) {
            card.remove();
        }
        self.tour_handlers.clear();
    }

    fn hide_welcome(&mut self) {
        self.toggle_class(WELCOME, "hidden", true);
    }

    fn remove_welcome(&mut self) {
        if let Some(overlay) = self.by_id(WELCOME) {
            let _ = overlay.style().set_property("display", "none");
        }
    }

    fn show_notice(&mut self, notice: &Notice) {
        let build = || -> Result<(), JsValue> {
            let toast = self.text(
                "div",
                &format!("custom-toast toast-{}", notice.level.as_str()),
                &notice.message,
            )?;
            toast.set_id(&format!("notice-{}", notice.id));
            toast.set_attribute("role", "alert")?;
            toast.set_attribute("aria-live", "assertive")?;
            self.document
                .body()
                .ok_or_else(|| JsValue::from_str("document has no body"))?
                .append_child(&toast)?;
            toast.class_list().add_1("visible")?;
            Ok(())
        };
        if let Err(err) = build() {
            tracing::warn!(?err, "notice could not be shown");
        }
    }

    fn hide_notice(&mut self, id: u64) {
        if let Some(toast) = self.document.get_element_by_id(&format!("notice-{id}")) {
            toast.remove();
        }
    }
}

#[cfg(all(test, target_arch = "wasm32"))]
mod tests {
    use explorer::{Glyph, ImageConfig, Page, PanelContent, ResponsiveImage};
    use wasm_bindgen::JsCast;
    use wasm_bindgen_test::*;
    use web_sys::HtmlImageElement;

    use super::{DomPage, PANEL_CONTENT};

    wasm_bindgen_test_configure!(run_in_browser);

    fn content(revision: u64) -> PanelContent {
        PanelContent {
            revision,
            image: ResponsiveImage::build("https://example.com/a.jpg", "A", &ImageConfig::default()),
            title: "A".to_string(),
            region: "Region".to_string(),
            region_glyph: Glyph::Pin,
            description: "A is worth a visit.".to_string(),
        }
    }

    #[wasm_bindgen_test]
    fn rerender_unhooks_the_replaced_image() {
        let document = web_sys::window().unwrap().document().unwrap();
        let container = document.create_element("div").unwrap();
        container.set_id(PANEL_CONTENT);
        document.body().unwrap().append_child(&container).unwrap();

        let mut page = DomPage::new(document);
        page.render_panel(&content(1));
        let first: HtmlImageElement = container
            .query_selector(".panel-image")
            .unwrap()
            .unwrap()
            .dyn_into()
            .unwrap();
        assert!(first.onload().is_some());

        page.render_panel(&content(2));
        assert!(first.onload().is_none());
        assert!(first.onerror().is_none());
        assert_eq!(page.image_handlers.len(), 2);
        container.remove();
    }
}
