//! URL handling module
//!
//! Catalog records are keyed by the canonical form of their page URL, so
//! every URL entering the crawler or the API passes through here first.

mod normalize;

use crate::config::SiteConfig;
use crate::UrlError;
use url::Url;

pub use normalize::canonicalize_url;

/// Canonicalizes `url_str` and checks that it is a catalog detail page of the
/// configured site
///
/// A catalog page shares scheme, host and port with the site origin and its
/// path contains the configured catalog path.
///
/// # Examples
///
/// ```
/// use manga_catalog::config::SiteConfig;
/// use manga_catalog::url::validate_catalog_url;
///
/// let site = SiteConfig::default();
/// assert!(validate_catalog_url("https://www.nautiljon.com/mangas/gachiakuta.html", &site).is_ok());
/// assert!(validate_catalog_url("https://www.nautiljon.com/animes/gachiakuta.html", &site).is_err());
/// ```
pub fn validate_catalog_url(url_str: &str, site: &SiteConfig) -> Result<Url, UrlError> {
    let url = canonicalize_url(url_str)?;
    let origin = site.origin_url()?;

    let same_origin = url.scheme() == origin.scheme()
        && url.host_str() == origin.host_str()
        && url.port_or_known_default() == origin.port_or_known_default();

    if !same_origin || !url.path().contains(site.catalog_path.as_str()) {
        return Err(UrlError::NotCatalogPage {
            url: url.to_string(),
            origin: site.origin.clone(),
        });
    }

    Ok(url)
}
