use crate::domain::model::VisibilityWindow;
use chrono::{DateTime, Utc};

/// 判斷項目在 `as_of` 時間點是否上線；兩端邊界都算可見
pub fn is_visible(window: &VisibilityWindow, as_of: DateTime<Utc>) -> bool {
    let live = window.live_date.map_or(true, |live_date| live_date <= as_of);
    let not_expired = window
        .expiry_date
        .map_or(true, |expiry_date| expiry_date >= as_of);
    live && not_expired
}
