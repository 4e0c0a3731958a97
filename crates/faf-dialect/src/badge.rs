//! Score badge
//!
//! A fixed-height, two-panel SVG in the usual shields style: a `FAF` label
//! on the left and `"{score}% {tier}"` on a tier-coloured panel on the right.

use serde::Serialize;

/// Media type of a rendered badge
pub const BADGE_CONTENT_TYPE: &str = "image/svg+xml";

const LABEL: &str = "FAF";
const LABEL_WIDTH: u32 = 60;
const HEIGHT: u32 = 20;
const PLAIN_WIDTH: u32 = 120;
const ORANGE_WIDTH: u32 = 140;
const ORANGE_MARK: &str = "\u{1F34A}";

/// Score band a badge is drawn in
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    /// Exactly 100
    Trophy,
    /// 85 and above
    Bronze,
    /// 70 and above
    Green,
    /// 55 and above
    Yellow,
    /// Below 55
    Red,
}

impl Tier {
    /// Band for a score
    #[must_use]
    pub fn for_score(score: u8) -> Self {
        match score {
            100.. => Self::Trophy,
            85..=99 => Self::Bronze,
            70..=84 => Self::Green,
            55..=69 => Self::Yellow,
            _ => Self::Red,
        }
    }

    /// Status glyph shown after the percentage
    #[must_use]
    pub fn glyph(&self) -> &'static str {
        match self {
            Self::Trophy => "\u{1F3C6}",
            Self::Bronze => "\u{1F949}",
            Self::Green => "\u{1F7E2}",
            Self::Yellow => "\u{1F7E1}",
            Self::Red => "\u{1F534}",
        }
    }

    /// Fill colour of the value panel
    #[must_use]
    pub fn color(&self) -> &'static str {
        match self {
            Self::Trophy => "#4c1",
            Self::Bronze => "#cd7f32",
            Self::Green => "#2ecc71",
            Self::Yellow => "#f1c40f",
            Self::Red => "#e74c3c",
        }
    }
}

/// A rendered score badge
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Badge {
    /// Score shown
    pub score: u8,
    /// Whether the distinction mark is shown
    pub distinction: bool,
    /// Band the score falls in
    pub tier: Tier,
    /// SVG document
    pub svg: String,
}

impl Badge {
    /// Render a badge for a score and distinction flag
    #[must_use]
    pub fn new(score: u8, distinction: bool) -> Self {
        let score = score.min(100);
        let tier = Tier::for_score(score);
        Self {
            score,
            distinction,
            tier,
            svg: render_badge(score, distinction),
        }
    }

    /// The badge served when the document cannot be read
    #[inline]
    #[must_use]
    pub fn fallback() -> Self {
        Self::new(0, false)
    }

    /// Text on the value panel
    #[must_use]
    pub fn display_text(&self) -> String {
        display_text(self.score, self.distinction)
    }

    /// Pixel width of the whole badge
    #[inline]
    #[must_use]
    pub fn width(&self) -> u32 {
        badge_width(self.distinction)
    }
}

fn display_text(score: u8, distinction: bool) -> String {
    let orange = if distinction { ORANGE_MARK } else { "" };
    format!("{score}% {}{orange}", Tier::for_score(score).glyph())
}

fn badge_width(distinction: bool) -> u32 {
    if distinction {
        ORANGE_WIDTH
    } else {
        PLAIN_WIDTH
    }
}

/// Render the SVG text of a badge
#[must_use]
pub fn render_badge(score: u8, distinction: bool) -> String {
    let width = badge_width(distinction);
    let value_width = width - LABEL_WIDTH;
    let label_x = LABEL_WIDTH / 2;
    let value_x = LABEL_WIDTH + value_width / 2;
    let color = Tier::for_score(score).color();
    let display = display_text(score, distinction);

    format!(
        r##"<svg xmlns="http://www.w3.org/2000/svg" width="{width}" height="{HEIGHT}">
  <linearGradient id="b" x2="0" y2="100%">
    <stop offset="0" stop-color="#bbb" stop-opacity=".1"/>
    <stop offset="1" stop-opacity=".1"/>
  </linearGradient>
  <clipPath id="a">
    <rect width="{width}" height="{HEIGHT}" rx="3" fill="#fff"/>
  </clipPath>
  <g clip-path="url(#a)">
    <rect width="{LABEL_WIDTH}" height="{HEIGHT}" fill="#555"/>
    <rect x="{LABEL_WIDTH}" width="{value_width}" height="{HEIGHT}" fill="{color}"/>
    <rect width="{width}" height="{HEIGHT}" fill="url(#b)"/>
  </g>
  <g fill="#fff" text-anchor="middle" font-family="DejaVu Sans,Verdana,Geneva,sans-serif" font-size="11">
    <text x="{label_x}" y="15" fill="#010101" fill-opacity=".3">{LABEL}</text>
    <text x="{label_x}" y="14" fill="#fff">{LABEL}</text>
    <text x="{value_x}" y="15" fill="#010101" fill-opacity=".3">{display}</text>
    <text x="{value_x}" y="14" fill="#fff">{display}</text>
  </g>
</svg>"##
    )
}
