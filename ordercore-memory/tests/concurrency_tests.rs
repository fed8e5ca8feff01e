//! Concurrent checkout behavior: row locking must allow exactly one of two
//! competing orders to win when stock cannot cover both.

use futures::future::join_all;
use ordercore::cart::{Cart, CartLine};
use ordercore::checkout::place_order;
use ordercore::errors::{CheckoutError, LineIssue};
use ordercore::order::{CustomerDetails, OrderRequest, ShippingAddress};
use ordercore::product::NewProduct;
use ordercore::store::StorefrontStore;
use ordercore::types::{Money, ProductId, ProductTitle, Quantity, SalesCount, StockQuantity};
use ordercore_memory::InMemoryStorefrontStore;
use rust_decimal_macros::dec;

async fn seed_product(
    store: &InMemoryStorefrontStore,
    title: &str,
    price: rust_decimal::Decimal,
    stock: u32,
) -> ProductId {
    store
        .insert_product(NewProduct {
            title: ProductTitle::try_new(title).unwrap(),
            price: Money::new(price).unwrap(),
            image_url: None,
            initial_stock: StockQuantity::new(stock),
        })
        .await
        .unwrap()
}

fn request(id: ProductId, qty: u32) -> OrderRequest {
    OrderRequest::new(
        CustomerDetails::guest(),
        ShippingAddress::default(),
        None,
        Cart::try_new(vec![CartLine::new(id, Quantity::try_new(qty).unwrap())]).unwrap(),
    )
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn competing_checkouts_cannot_oversell() {
    let store = InMemoryStorefrontStore::new();
    let p = seed_product(&store, "Dune Lamp", dec!(10.00), 5).await;

    // Two concurrent submissions of 3 each against a stock of 5: combined
    // demand exceeds stock, so exactly one may succeed.
    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { place_order(&store, request(p, 3), None).await })
        })
        .collect();

    let results: Vec<_> = join_all(tasks)
        .await
        .into_iter()
        .map(|joined| joined.unwrap())
        .collect();

    let successes = results.iter().filter(|r| r.is_ok()).count();
    assert_eq!(successes, 1, "exactly one checkout must win: {results:?}");

    for result in &results {
        if let Err(err) = result {
            match err {
                CheckoutError::Validation(errors) => {
                    assert_eq!(errors.len(), 1);
                    assert_eq!(errors[0].issue, LineIssue::InsufficientStock);
                }
                other => panic!("loser must fail validation, got {other:?}"),
            }
        }
    }

    let product = store.fetch_product(p).await.unwrap().unwrap();
    assert_eq!(product.stock_quantity, StockQuantity::new(2));
    assert_eq!(product.sales_count, SalesCount::new(3));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn both_checkouts_succeed_when_stock_covers_both() {
    let store = InMemoryStorefrontStore::new();
    let p = seed_product(&store, "Dune Lamp", dec!(10.00), 6).await;

    let tasks: Vec<_> = (0..2)
        .map(|_| {
            let store = store.clone();
            tokio::spawn(async move { place_order(&store, request(p, 3), None).await })
        })
        .collect();

    for joined in join_all(tasks).await {
        joined.unwrap().expect("stock covers both orders");
    }

    let product = store.fetch_product(p).await.unwrap().unwrap();
    assert_eq!(product.stock_quantity, StockQuantity::zero());
    assert_eq!(product.sales_count, SalesCount::new(6));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn disjoint_products_do_not_interfere() {
    let store = InMemoryStorefrontStore::new();
    let a = seed_product(&store, "Dune Lamp", dec!(10.00), 2).await;
    let b = seed_product(&store, "Oasis Rug", dec!(75.00), 2).await;

    let store_a = store.clone();
    let store_b = store.clone();
    let (ra, rb) = tokio::join!(
        tokio::spawn(async move { place_order(&store_a, request(a, 2), None).await }),
        tokio::spawn(async move { place_order(&store_b, request(b, 2), None).await }),
    );

    ra.unwrap().expect("order for product a succeeds");
    rb.unwrap().expect("order for product b succeeds");

    for id in [a, b] {
        let product = store.fetch_product(id).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, StockQuantity::zero());
        assert_eq!(product.sales_count, SalesCount::new(2));
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn repeated_races_never_oversell() {
    for round in 0..20 {
        let store = InMemoryStorefrontStore::new();
        let p = seed_product(&store, "Dune Lamp", dec!(1.00), 1).await;

        let tasks: Vec<_> = (0..2)
            .map(|_| {
                let store = store.clone();
                tokio::spawn(async move { place_order(&store, request(p, 1), None).await })
            })
            .collect();

        let results: Vec<_> = join_all(tasks)
            .await
            .into_iter()
            .map(|joined| joined.unwrap())
            .collect();

        let successes = results.iter().filter(|r| r.is_ok()).count();
        assert_eq!(successes, 1, "round {round}: {results:?}");

        let product = store.fetch_product(p).await.unwrap().unwrap();
        assert_eq!(product.stock_quantity, StockQuantity::zero());
        assert_eq!(product.sales_count, SalesCount::new(1));
    }
}
