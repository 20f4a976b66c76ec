mod common;

use axum::extract::State;
use campus_canteen_api::routes::health::health_check;
use campus_canteen_api::feed::{ChangeFilter, Table};

#[tokio::test]
async fn health_check_reports_database_and_streams() -> anyhow::Result<()> {
    let state = common::setup_state().await?;
    let _sub = state.feed.subscribe(ChangeFilter::table(Table::Orders));

    let response = health_check(State(state.clone())).await;
    assert_eq!(response.0.message, "Health check");

    let data = response.0.data.expect("health data");
    assert_eq!(data.status, "ok");
    assert_eq!(data.database, "up");
    assert_eq!(data.subscribers, 1);
    Ok(())
}
