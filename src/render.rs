//! Plain-text rendering of a view session for the terminal.
use crate::app::{App, FeedState};
use crate::presenter::{BadgeState, ItemView};
use crate::theme::{Palette, Theme};
use crate::util::{sanitize, truncate_to_width};
use crossterm::style::ContentStyle;
use std::fmt::Write;

pub const DEFAULT_WIDTH: usize = 80;

#[derive(Debug, Clone, Copy)]
pub struct RenderOptions {
    pub width: usize,
    pub color: bool,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            width: DEFAULT_WIDTH,
            color: true,
        }
    }
}

struct Painter {
    palette: Palette,
    color: bool,
}

impl Painter {
    fn paint(&self, style: ContentStyle, text: &str) -> String {
        if self.color {
            style.apply(text).to_string()
        } else {
            text.to_string()
        }
    }
}

/// Render the current state of `app`. Styling follows the theme marker.
pub fn render(app: &App, opts: &RenderOptions) -> String {
    let theme: Theme = app
        .theme
        .marker()
        .current()
        .unwrap_or_else(|| app.theme.current());
    let painter = Painter {
        palette: theme.palette(),
        color: opts.color,
    };
    let width = opts.width.max(20);

    let mut out = String::new();
    let _ = writeln!(out, "{}", painter.paint(painter.palette.header, "provenance-feed"));
    let _ = writeln!(
        out,
        "{}",
        painter.paint(
            painter.palette.meta,
            &format!("Chronological feed with best-effort source trust badges ({theme} theme)")
        )
    );
    out.push('\n');

    match &app.feed {
        FeedState::Idle | FeedState::Loading => {
            let _ = writeln!(out, "{}", painter.paint(painter.palette.placeholder, "Loading…"));
        }
        FeedState::Failed(message) => {
            let _ = writeln!(out, "{}", painter.paint(painter.palette.error, message));
        }
        FeedState::Ready(items) if items.is_empty() => {
            let _ = writeln!(out, "{}", painter.paint(painter.palette.placeholder, "No items."));
        }
        FeedState::Ready(items) => {
            for view in items {
                render_item(&mut out, view, &painter, width);
                out.push('\n');
            }
        }
    }

    out
}

fn render_item(out: &mut String, view: &ItemView, painter: &Painter, width: usize) {
    let p = &painter.palette;
    let item = &view.item;

    let title = sanitize(&item.title);
    let _ = writeln!(out, "{}", painter.paint(p.title, &truncate_to_width(&title, width)));

    let source = format!(
        "Source: {} <{}>",
        sanitize(&item.source_name),
        sanitize(&item.source_url)
    );
    let _ = writeln!(out, "{}", painter.paint(p.meta, &truncate_to_width(&source, width)));
    let _ = writeln!(
        out,
        "{}",
        painter.paint(p.meta, &format!("Published: {}", sanitize(&view.published)))
    );
    if let Some(image) = &item.image_url {
        let line = format!("Image: {}", sanitize(image));
        let _ = writeln!(out, "{}", painter.paint(p.meta, &truncate_to_width(&line, width)));
    }

    let badge = match &view.badge {
        BadgeState::Resolved(b) => {
            let style = if b.provisional { p.provisional } else { p.grade(b.grade) };
            painter.paint(style, &format!("[{}]", view.badge.text()))
        }
        BadgeState::Loading | BadgeState::Unavailable => {
            painter.paint(p.placeholder, &format!("[{}]", view.badge.text()))
        }
    };
    let _ = writeln!(
        out,
        "{} {} {}",
        badge,
        painter.paint(p.link, "View provenance ↗"),
        view.provenance_link
    );
    // Lookup failed for a known source: offer the graphic form instead.
    if let (BadgeState::Unavailable, Some(image)) = (&view.badge, &view.badge_image_url) {
        let _ = writeln!(out, "{}", painter.paint(p.meta, &format!("Badge image: {image}")));
    }
}
