mod live_banner;
mod match_updates;

pub use live_banner::{BannerHost, LiveBannerBridge};
pub use match_updates::{MatchUpdateBridge, Subscription};
