//! Concurrent searches for many points
//!
//! This example runs nearby-page and page-match searches for a list of points in
//! Surrey on a small worker pool. Results come back in input order.

use std::{num::NonZeroUsize, time::Instant};

use wikigeo::{
    BatchSearcher, Coordinates, NearbyPagesParams, PageField, PageMatchParams, UserAgent,
    WikiGeoConfigBuilder, init_logging,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(tracing::Level::INFO)?;

    let user_agent = UserAgent::from_env()
        .or_else(|_| UserAgent::new("wikigeo-example", "https://github.com/SamBroomy/wikigeo"))?;
    let config = WikiGeoConfigBuilder::polite()
        .user_agent(&user_agent)
        .max_workers(NonZeroUsize::new(4).ok_or("worker count must be positive")?)
        .build()?;
    let batch = BatchSearcher::new(&config)?;

    let points = vec![
        Coordinates::new(51.19482552438797, -0.4718933366807213),
        Coordinates::new(51.374798908124774, -0.7340422319483855),
        Coordinates::new(51.4368078571564, -0.6332591317376522),
        Coordinates::new(51.18393717250045, -0.825727955629195),
        Coordinates::new(51.326791473315296, -0.3057011313377656),
    ];

    let t_batch = Instant::now();
    let items = batch.multi_nearby_page_fields(
        points,
        &NearbyPagesParams {
            limit: 5,
            radius: 8_000,
        },
        &[PageField::Title, PageField::Image],
    )?;
    println!(
        "Nearby pages for {} points in {:.2}s",
        items.len(),
        t_batch.elapsed().as_secs_f32()
    );
    for item in &items {
        let titles = item.result.titles.as_deref().unwrap_or_default();
        println!(
            "  ({:.3}, {:.3}): {}",
            item.input.lat,
            item.input.lon,
            titles.join(", ")
        );
    }

    let searches = vec![
        ("Box Hill".to_string(), Coordinates::new(51.2550, -0.3110)),
        ("Runnymede".to_string(), Coordinates::new(51.4440, -0.5650)),
        ("Frensham Common".to_string(), Coordinates::new(51.1570, -0.7880)),
    ];
    println!("\nPage matches:");
    for item in batch.multi_page_match(searches, &PageMatchParams::default())? {
        let found = item
            .result
            .page_matches
            .iter()
            .map(|page| page.title.as_str())
            .collect::<Vec<_>>();
        println!("  {}: {:?}", item.input.0, found);
    }

    Ok(())
}
