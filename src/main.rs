use listings::{Business, ConnectOptions, Listings};
use tracing::info;
use tracing_subscriber::{EnvFilter, fmt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let mut args = std::env::args().skip(1);
    let (Some(user), Some(password), Some(database)) = (args.next(), args.next(), args.next())
    else {
        anyhow::bail!("usage: listings <user> <password> <database>");
    };

    let listings = Listings::open(&ConnectOptions::new(user, password, database)).await?;

    let states = listings.list_states().await?.try_collect().await?;
    info!(count = states.len(), "states");

    // Walk the first state down to the businesses of its first zip code.
    if let Some(state) = states.first() {
        let cities = listings.list_cities(state).await?.try_collect().await?;
        info!(%state, count = cities.len(), "cities");

        if let Some(city) = cities.first() {
            let zips = listings.list_zips(state, city).await?.try_collect().await?;
            info!(%state, %city, ?zips, "zips");

            if let Some(&zip) = zips.first() {
                let mut rows = listings.list_businesses(zip, &[] as &[String]).await?;
                while let Some(row) = rows.next().await {
                    let business: Business = row?.to()?;
                    info!(zip, id = %business.business_id, name = %business.business_name, "business");
                }
            }
        }
    }

    listings.close().await?;
    Ok(())
}
