//! Single searches around Staines-upon-Thames
//!
//! This example shows the four searches of a `GeoSearcher`:
//! - articles near a point
//! - Commons images near a point, ranked against a name
//! - the article best matching a keyword near a point
//! - the text of an article
//!
//! Set `WIKIGEO_APP` and `WIKIGEO_CONTACT` to identify yourself to the API.

use wikigeo::{
    BestMatch, Coordinates, GeoSearcher, NearbyImagesParams, NearbyPagesParams, PageMatchParams,
    UserAgent, WikiGeoConfigBuilder, init_logging,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(tracing::Level::INFO)?;

    let user_agent = UserAgent::from_env()
        .or_else(|_| UserAgent::new("wikigeo-example", "https://github.com/SamBroomy/wikigeo"))?;
    let config = WikiGeoConfigBuilder::polite().user_agent(&user_agent).build()?;
    let searcher = GeoSearcher::new(&config)?;
    let staines = Coordinates::new(51.43295, -0.5114918947219849);

    println!("Articles within 10 km:");
    let pages = searcher.get_nearby_pages(staines, &NearbyPagesParams {
        limit: 10,
        radius: 10_000,
    })?;
    for page in &pages {
        println!(
            "  {} - {}",
            page.title,
            page.description.as_deref().unwrap_or("no description")
        );
    }

    println!("\nImages of Staines Moor within 5 km:");
    let images = searcher.get_nearby_images(
        staines,
        &NearbyImagesParams::radius(5_000).matching("Staines Moor", Some(60)),
    )?;
    for image in &images {
        println!(
            "  [{}] {} ({})",
            image.name_match.unwrap_or_default(),
            image.title,
            image.url
        );
    }

    println!("\nBest match for 'Staines Moor':");
    let matches = searcher.get_page_match(
        "Staines Moor",
        Coordinates::new(51.43260, -0.51074),
        &PageMatchParams::default()
            .best(BestMatch::Name)
            .max_distance_km(100.0),
    )?;
    match matches.best() {
        Some(page) => {
            println!(
                "  {} ({:.2} km, name match {})",
                page.title,
                page.distance_km.unwrap_or_default(),
                page.name_match.unwrap_or_default()
            );
            let text = searcher.get_page_text(&page.title, Some(300))?;
            println!("\n{}", text.text);
        }
        None => println!("  nothing close enough"),
    }

    Ok(())
}
