//! Cover image URL rewriting

use url::Url;

const THUMBNAIL_SEGMENT: &str = "/imagesmin/";
const FULL_SIZE_SEGMENT: &str = "/images/";

/// Turns a thumbnail `src` into an absolute full-resolution image URL
///
/// The first `/imagesmin/` segment is replaced by `/images/` and the result is
/// resolved against `origin`. Missing or blank sources yield `None`.
///
/// # Example
///
/// ```
/// use manga_catalog::extract::full_resolution_url;
/// use url::Url;
///
/// let origin = Url::parse("https://www.nautiljon.com").unwrap();
/// assert_eq!(
///     full_resolution_url(Some("/imagesmin/mangas/1.jpg"), &origin).as_deref(),
///     Some("https://www.nautiljon.com/images/mangas/1.jpg"),
/// );
/// ```
pub fn full_resolution_url(src: Option<&str>, origin: &Url) -> Option<String> {
    let src = src.map(str::trim).filter(|s| !s.is_empty())?;
    let rewritten = src.replacen(THUMBNAIL_SEGMENT, FULL_SIZE_SEGMENT, 1);

    match origin.join(&rewritten) {
        Ok(url) => Some(url.to_string()),
        Err(e) => {
            tracing::debug!("Dropping unresolvable image source {:?}: {}", src, e);
            None
        }
    }
}
