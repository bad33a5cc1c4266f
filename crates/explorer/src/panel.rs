use catalog::Location;
use runtime::TimerId;
use url::Url;

use crate::config::ImageConfig;
use crate::focus::{FocusTarget, FocusTrap};

/// Local placeholder shown when a panel image fails to load.
pub const IMAGE_PLACEHOLDER: &str = "data:image/svg+xml,%3Csvg xmlns='http://www.w3.org/2000/svg' \
viewBox='0 0 24 24'%3E%3Crect x='3' y='3' width='18' height='18' rx='2' fill='rgba(255,255,255,0.1)'/%3E%3C/svg%3E";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageVariant {
    pub url: String,
    pub width: u32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponsiveImage {
    /// Plain source, used for layout and by browsers ignoring `srcset`.
    pub src: String,
    pub variants: Vec<ImageVariant>,
    pub sizes: Option<String>,
    pub alt: String,
    pub lazy: bool,
}

impl ResponsiveImage {
    /// Derives one variant per configured width by replacing the `w` and `q`
    /// query parameters. An unparseable source yields no variants.
    pub fn build(src: &str, alt: &str, images: &ImageConfig) -> Self {
        let variants = match Url::parse(src) {
            Ok(base) => variants_for(base, images),
            Err(err) => {
                tracing::warn!(src, error = %err, "image URL not parseable; no srcset");
                Vec::new()
            }
        };
        let sizes = (!variants.is_empty()).then(|| images.sizes.clone());
        Self {
            src: src.to_string(),
            variants,
            sizes,
            alt: alt.to_string(),
            lazy: true,
        }
    }

    /// `srcset` attribute value, `None` without variants.
    pub fn srcset(&self) -> Option<String> {
        if self.variants.is_empty() {
            return None;
        }
        let parts: Vec<String> = self
            .variants
            .iter()
            .map(|v| format!("{} {}w", v.url, v.width))
            .collect();
        Some(parts.join(", "))
    }
}

fn variants_for(mut base: Url, images: &ImageConfig) -> Vec<ImageVariant> {
    let kept: Vec<(String, String)> = base
        .query_pairs()
        .filter(|(k, _)| k != "w" && k != "q")
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();
    base.set_query(None);
    if !kept.is_empty() {
        base.query_pairs_mut().extend_pairs(kept);
    }

    images
        .widths
        .iter()
        .map(|&width| {
            let mut url = base.clone();
            url.query_pairs_mut()
                .append_pair("w", &width.to_string())
                .append_pair("q", &images.quality.to_string());
            ImageVariant {
                url: url.into(),
                width,
            }
        })
        .collect()
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Glyph {
    Pin,
}

/// Freshly built panel body. `revision` increases with every render so the
/// page can tell stale image callbacks apart.
#[derive(Debug, Clone, PartialEq)]
pub struct PanelContent {
    pub revision: u64,
    pub image: ResponsiveImage,
    pub title: String,
    pub region: String,
    pub region_glyph: Glyph,
    pub description: String,
}

/// What to do about an image error reported by the page.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum ImageFailure {
    /// The error belongs to content that has since been replaced.
    Stale,
    /// First failure: swap in the placeholder.
    Substitute(&'static str),
    /// The fallback was already used; only clear the loading state.
    Exhausted,
}

#[derive(Debug, Default, Clone, Copy)]
struct ImageState {
    revision: u64,
    loading: bool,
    fallback_armed: bool,
}

/// Detail panel state: visibility, the focus trap, and the current image.
#[derive(Debug, Default)]
pub struct DetailPanel {
    open: bool,
    /// Bumped on every open so a delayed trap installation can detect that
    /// the panel was closed or re-opened meanwhile.
    session: u64,
    revision: u64,
    trap: Option<FocusTrap>,
    pending_arm: Option<TimerId>,
    image: ImageState,
}

impl DetailPanel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn session(&self) -> u64 {
        self.session
    }

    pub fn trap(&self) -> Option<&FocusTrap> {
        self.trap.as_ref()
    }

    pub fn image_loading(&self) -> bool {
        self.image.loading
    }

    /// Builds new content for `location`. Never patches the previous tree.
    pub fn render(&mut self, location: &Location, images: &ImageConfig) -> PanelContent {
        self.revision += 1;
        self.image = ImageState {
            revision: self.revision,
            loading: true,
            fallback_armed: true,
        };
        PanelContent {
            revision: self.revision,
            image: ResponsiveImage::build(&location.image_ref, &location.name, images),
            title: location.name.clone(),
            region: location.region.clone(),
            region_glyph: Glyph::Pin,
            description: location.description.clone(),
        }
    }

    /// Marks the panel open and starts a new session. Any trap from an
    /// earlier session is released; the returned timer, if any, belongs to a
    /// superseded trap installation and must be cancelled.
    pub fn open(&mut self) -> (u64, Option<TimerId>) {
        if let Some(old) = self.trap.take() {
            old.release();
        }
        self.open = true;
        self.session += 1;
        (self.session, self.pending_arm.take())
    }

    pub fn set_pending_arm(&mut self, timer: TimerId) {
        self.pending_arm = Some(timer);
    }

    /// Installs the trap for `session`. Returns `false` if that session is
    /// over.
    pub fn arm(&mut self, session: u64, focusables: &[FocusTarget]) -> bool {
        if !self.open || session != self.session {
            return false;
        }
        self.pending_arm = None;
        if let Some(old) = self.trap.take() {
            old.release();
        }
        self.trap = FocusTrap::install(focusables);
        if self.trap.is_none() {
            tracing::warn!("panel has no focusable elements; focus trap not installed");
        }
        true
    }

    /// Closes the panel and releases the trap. Returns a pending trap timer
    /// that must be cancelled.
    pub fn close(&mut self) -> Option<TimerId> {
        self.open = false;
        if let Some(trap) = self.trap.take() {
            trap.release();
        }
        self.pending_arm.take()
    }

    /// Returns `true` if the loading state should be cleared.
    pub fn on_image_loaded(&mut self, revision: u64) -> bool {
        if revision != self.image.revision {
            return false;
        }
        self.image.loading = false;
        true
    }

    pub fn on_image_error(&mut self, revision: u64) -> ImageFailure {
        if revision != self.image.revision {
            return ImageFailure::Stale;
        }
        self.image.loading = false;
        if std::mem::take(&mut self.image.fallback_armed) {
            ImageFailure::Substitute(IMAGE_PLACEHOLDER)
        } else {
            ImageFailure::Exhausted
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn location(image_ref: &str) -> Location {
        Location {
            name: "Victoria Falls".to_string(),
            region: "Zambia & Zimbabwe".to_string(),
            lat: -17.9244,
            lng: 25.8566,
            description: "The smoke that thunders. Very loud.".to_string(),
            image_ref: image_ref.to_string(),
        }
    }

    #[test]
    fn srcset_replaces_width_and_quality() {
        let img = ResponsiveImage::build(
            "https://img.example.com/p.jpg?auto=format&w=1470&q=80",
            "alt",
            &ImageConfig::default(),
        );
        assert_eq!(
            img.srcset().unwrap(),
            "https://img.example.com/p.jpg?auto=format&w=400&q=80 400w, \
             https://img.example.com/p.jpg?auto=format&w=800&q=80 800w, \
             https://img.example.com/p.jpg?auto=format&w=1200&q=80 1200w"
        );
        assert_eq!(img.sizes.as_deref(), Some("(max-width: 768px) 100vw, 420px"));
        assert_eq!(img.src, "https://img.example.com/p.jpg?auto=format&w=1470&q=80");
    }

    #[test]
    fn source_without_query_gains_one() {
        let images = ImageConfig {
            widths: vec![640],
            quality: 70,
            ..ImageConfig::default()
        };
        let img = ResponsiveImage::build("https://img.example.com/p.jpg", "alt", &images);
        assert_eq!(img.variants[0].url, "https://img.example.com/p.jpg?w=640&q=70");
    }

    #[test]
    fn unparseable_source_has_no_srcset() {
        let img = ResponsiveImage::build("not a url", "alt", &ImageConfig::default());
        assert!(img.srcset().is_none());
        assert!(img.sizes.is_none());
        assert_eq!(img.src, "not a url");
    }

    #[test]
    fn every_render_is_a_new_revision() {
        let mut panel = DetailPanel::new();
        let loc = location("https://img.example.com/p.jpg");
        let a = panel.render(&loc, &ImageConfig::default());
        let b = panel.render(&loc, &ImageConfig::default());
        assert!(b.revision > a.revision);
        assert_eq!(b.title, "Victoria Falls");
        assert_eq!(b.region_glyph, Glyph::Pin);
        assert_eq!(b.image.alt, "Victoria Falls");
    }

    #[test]
    fn image_fallback_fires_once() {
        let mut panel = DetailPanel::new();
        let content = panel.render(&location("https://img.example.com/p.jpg"), &ImageConfig::default());
        assert!(panel.image_loading());

        assert_eq!(
            panel.on_image_error(content.revision),
            ImageFailure::Substitute(IMAGE_PLACEHOLDER)
        );
        assert!(!panel.image_loading());
        assert_eq!(panel.on_image_error(content.revision), ImageFailure::Exhausted);
        assert_eq!(panel.on_image_error(content.revision - 1), ImageFailure::Stale);
    }

    #[test]
    fn stale_session_cannot_arm_trap() {
        let mut panel = DetailPanel::new();
        let (first, _) = panel.open();
        let (second, _) = panel.open();
        assert!(!panel.arm(first, &[FocusTarget::PanelClose]));
        assert!(panel.trap().is_none());
        assert!(panel.arm(second, &[FocusTarget::PanelClose]));
        assert!(panel.trap().is_some());

        panel.close();
        assert!(panel.trap().is_none());
        assert!(!panel.arm(second, &[FocusTarget::PanelClose]));
    }
}
