//! Message rendering (Telegram MarkdownV2)

use crate::catalog::ArtistInfo;
use crate::messaging::LinkButton;
use crate::release::ReleaseCandidate;

/// Label of the inline button linking to the release
pub const LINK_BUTTON_TEXT: &str = "Spotify Link";

/// Characters MarkdownV2 requires to be escaped outside entities
const MARKDOWN_V2_SPECIAL: &[char] = &[
    '\\', '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!',
];

/// A release rendered once and reused for every recipient
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRelease {
    pub caption: String,
    pub link: LinkButton,
    pub cover_url: Option<String>,
}

/// Escape text for MarkdownV2
pub fn escape_markdown_v2(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        if MARKDOWN_V2_SPECIAL.contains(&c) {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

/// Escape a URL placed inside `(...)` of an inline link
fn escape_link_target(url: &str) -> String {
    url.replace('\\', "\\\\").replace(')', "\\)")
}

/// Render a release notification
///
/// Layout: hidden link (drives the preview), bold name, one italic line per
/// artist, blank line, date, category hashtag.
pub fn render_release(release: &ReleaseCandidate) -> RenderedRelease {
    let mut caption = format!(
        "[\u{200d}]({})*{}*\n",
        escape_link_target(&release.external_url),
        escape_markdown_v2(&release.name)
    );
    for artist in &release.artists {
        caption.push_str(&format!("_{}_\n", escape_markdown_v2(artist)));
    }
    caption.push('\n');
    caption.push_str(&format!("🗓 {}\n", escape_markdown_v2(&release.release_date)));
    caption.push_str(&format!("💽 \\#{}", release.category.tag()));

    RenderedRelease {
        caption,
        link: LinkButton {
            text: LINK_BUTTON_TEXT.to_string(),
            url: release.external_url.clone(),
        },
        cover_url: release.cover_url.clone(),
    }
}

/// Render the subscription listing of a chat
pub fn render_subscriptions(artists: &[ArtistInfo]) -> String {
    let mut listing = String::new();
    for artist in artists {
        listing.push_str(&format!(
            "\\- [{}]({})\n",
            escape_markdown_v2(&artist.name),
            escape_link_target(&artist.external_url)
        ));
    }
    if listing.is_empty() {
        listing.push_str("_No One_");
    }
    format!("*Currently subscribed to:*\n{}", listing)
}
