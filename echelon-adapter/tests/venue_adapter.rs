use echelon_adapter::{default_polymarket_limiter, OrderRequest, PolymarketClient, VenueClient};
use rust_decimal_macros::dec;

#[tokio::test]
async fn polymarket_client_round_trips_an_order() {
    let client = PolymarketClient::new(default_polymarket_limiter());
    let ack = client
        .create_order(OrderRequest {
            market_id: echelon_domain::MarketId(1),
            venue_market_id: "will-it-rain".into(),
            outcome_idx: 0,
            side: echelon_domain::Side::Buy,
            quote_amount: dec!(25),
            builder_code: "echelon".into(),
        })
        .await
        .unwrap();
    assert_eq!(ack.filled_shares, dec!(25));
    assert!(ack.venue_order_id.starts_with("poly-"));
}

#[tokio::test]
async fn order_book_request_round_trips_symbol_and_outcome() {
    let client = PolymarketClient::new(default_polymarket_limiter());
    let book = client.get_order_book("will-it-rain", 1).await.unwrap();
    assert_eq!(book.venue_market_id.as_str(), "will-it-rain");
    assert_eq!(book.outcome_idx, 1);
}
