//! Artist identifier extraction from links and URIs

use crate::{Error, Result};

const URL_PREFIXES: [&str; 2] = ["https://open.spotify.com/artist/", "http://open.spotify.com/artist/"];
const URI_PREFIX: &str = "spotify:artist:";

fn strip_prefix_ignore_case<'a>(input: &'a str, prefix: &str) -> Option<&'a str> {
    let head = input.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix).then(|| &input[prefix.len()..])
}

/// Whether the text starts with an artist link or URI
pub fn is_artist_link(input: &str) -> bool {
    let input = input.trim_start();
    URL_PREFIXES
        .iter()
        .chain(std::iter::once(&URI_PREFIX))
        .any(|prefix| strip_prefix_ignore_case(input, prefix).is_some())
}

/// Extract the bare catalog artist id
///
/// Accepts `https://open.spotify.com/artist/<id>` (query string and trailing
/// slash ignored), `spotify:artist:<id>`, or a bare id.
pub fn parse_artist_id(input: &str) -> Result<String> {
    let input = input.trim();

    let id = if let Some(rest) = URL_PREFIXES
        .iter()
        .find_map(|prefix| strip_prefix_ignore_case(input, prefix))
    {
        let end = rest.find(['?', '&', '#']).unwrap_or(rest.len());
        rest[..end].trim_end_matches('/')
    } else if let Some(rest) = strip_prefix_ignore_case(input, URI_PREFIX) {
        rest
    } else {
        input
    };

    let id = id.trim();
    if id.is_empty() || !id.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err(Error::InvalidInput(format!("not an artist link or id: {}", input)));
    }
    Ok(id.to_string())
}
