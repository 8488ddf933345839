use std::time::Duration;

use tracing_subscriber::EnvFilter;

use livescore_client::{ClientConfig, LiveScoreClient, User};

#[tokio::main]
async fn main() -> livescore_client::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let client = LiveScoreClient::new(ClientConfig::from_env())?;
    client.matches().fetch_live_matches().await?;
    println!(
        "{} live matches",
        client.matches().snapshot().live_matches.len()
    );

    if let Ok(token) = std::env::var("LIVESCORE_TOKEN") {
        let user = User {
            id: "demo".into(),
            email: "demo@example.com".into(),
            name: None,
            avatar_url: None,
        };
        client.sign_in(token, user)?;
    } else if !client.start_realtime() {
        println!("No session token, set LIVESCORE_TOKEN to follow the feed");
        return Ok(());
    }
    client.connection().join_live_feed();

    let _printer = client.match_updates().subscribe(|patch| {
        println!(
            "{}: {:?}-{:?} ({:?})",
            patch.id, patch.home_score, patch.away_score, patch.status
        );
    });
    let mut banners = client.banner_host().subscribe();

    let deadline = tokio::time::sleep(Duration::from_secs(300));
    tokio::pin!(deadline);
    loop {
        tokio::select! {
            _ = &mut deadline => break,
            changed = banners.changed() => {
                if changed.is_err() {
                    break;
                }
                if let Some(banner) = banners.borrow_and_update().clone() {
                    println!("[{}] {} {}-{} {}", banner.title, banner.home_team_name,
                        banner.home_score, banner.away_score, banner.away_team_name);
                }
            }
        }
    }
    Ok(())
}
