//! Fixtures shared by the integration tests

use manga_catalog::config::{parse_config, Config};
use std::path::Path;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const GACHIAKUTA_PATH: &str = "/mangas/gachiakuta.html";

/// A detail page using the "default edition" gallery markup
pub const GACHIAKUTA_PAGE: &str = r#"<!DOCTYPE html>
<html><body>
<h1 class="h1titre">Gachiakuta <a href="/mangas/gachiakuta.html/modifier">Modifier</a></h1>
<ul class="mb10">
    <li><span class="bold">Titre original :</span> ガチアクタ</li>
    <li><span class="bold">Origine :</span> Japon - 2022</li>
    <li><span class="bold">Année VF :</span> 2023</li>
    <li><span class="bold">Type :</span> Shônen</li>
    <li><span class="bold">Genres :</span> Action - Fantastique</li>
    <li><span class="bold">Thèmes :</span> Monde post-apocalyptique</li>
    <li><span class="bold">Auteur :</span> URANA Kei</li>
    <li><span class="bold">Traducteur :</span> Sébastien Ludmann</li>
    <li><span class="bold">Éditeur VO :</span> Kodansha</li>
    <li><span class="bold">Éditeur VF :</span> Pika</li>
    <li><span class="bold">Nb volumes VO :</span> 12 (En cours)</li>
    <li><span class="bold">Nb volumes VF :</span> 9 (En cours)</li>
    <li><span class="bold">Prix :</span> 7.20 €</li>
</ul>
<h2>Édition par défaut</h2>
<div class="edition">
    <h3>Volume simple</h3>
    <div class="vols">
        <img src="/imagesmin/mangas/gachiakuta-1.jpg">
        <img src="/imagesmin/mangas/gachiakuta-2.jpg">
    </div>
</div>
<h3>Spécial</h3>
<div><img src="/imagesmin/mangas/gachiakuta-s1.jpg" alt="Tome 1 édition spéciale"></div>
<h3>Collector</h3>
<div><img src="/imagesmin/mangas/gachiakuta-c1.jpg"></div>
<h3>Coffret</h3>
<div><img src="/imagesmin/mangas/gachiakuta-b1.jpg"></div>
</body></html>
"#;

/// A later version of the same page using the flat cell markup
pub const GACHIAKUTA_PAGE_REVISED: &str = r#"<!DOCTYPE html>
<html><body>
<h1>Gachiakuta (nouvelle édition) <a>Modifier</a></h1>
<ul>
    <li>Type : Seinen</li>
    <li>Nb volumes VO : 14 (Terminé)</li>
</ul>
<h3>Volume simple</h3>
<div>
    <div class="unVol"><a title="Vol. 3"><img src="/imagesmin/mangas/g-3.jpg"></a></div>
</div>
</body></html>
"#;

/// Builds a validated configuration targeting a mock site
pub fn test_config(origin: &str, database: &Path, concurrency: u32, seeds: &[String]) -> Config {
    let seeds = seeds
        .iter()
        .map(|seed| format!("'{}'", seed))
        .collect::<Vec<_>>()
        .join(", ");

    parse_config(&format!(
        r#"
[crawler]
concurrency = {concurrency}
max-attempts = 3
fetch-timeout-ms = 2000
extraction-timeout-ms = 2000
retry-backoff-ms = 1

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[site]
origin = '{origin}'
catalog-path = "/mangas/"
seeds = [{seeds}]

[output]
database-path = '{database}'
"#,
        concurrency = concurrency,
        origin = origin,
        seeds = seeds,
        database = database.display(),
    ))
    .expect("test configuration is valid")
}

/// Serves `body` for `page_path` on the mock site
pub async fn mount_page(server: &MockServer, page_path: &str, body: &str) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

pub fn page_url(server: &MockServer, page_path: &str) -> String {
    format!("{}{}", server.uri(), page_path)
}
