//! Macro-generated order service suite
//!
//! `order_service_tests!` runs every order operation against a backend:
//! creation and code allocation, line item edits and totals, payments and
//! discounts, the status lifecycle, batched drafts, listing filters and the
//! dashboard.
//!
//! # Usage
//!
//! ```rust,ignore
//! #[macro_use]
//! mod store_harness;
//!
//! use store_harness::*;
//! use uniform_orders::storage::Stores;
//!
//! order_service_tests!(Stores::in_memory());
//! ```

/// Generate the order service contract suite.
///
/// `$factory` must evaluate to a fresh, empty `Stores`. It is re-evaluated
/// for each test.
#[macro_export]
macro_rules! order_service_tests {
    ($factory:expr) => {
        mod order_service_contract_tests {
            use super::*;
            use uniform_orders::catalog::model::{PriceAmount, PriceKey};
            use uniform_orders::core::query::OrderFilter;
            use uniform_orders::orders::draft::{OrderDraft, QuantityChange, ReadyChange};
            use uniform_orders::orders::input::NewOrder;
            use uniform_orders::orders::model::OrderStatus;
            use uuid::Uuid;

            async fn setup() -> (Shop, Catalog) {
                let shop = Shop::new($factory);
                let catalog = seed_catalog(&shop).await;
                (shop, catalog)
            }

            // ==================================================================
            // Creation
            // ==================================================================

            #[tokio::test]
            async fn test_create_order_prices_items_and_assigns_code() {
                let (shop, catalog) = setup().await;

                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(2)]).with_abono(10000))
                    .await
                    .unwrap();

                assert_eq!(order.order.code, format!("PED-{YEAR}-0001"));
                assert_eq!(order.order.status, OrderStatus::Ingresado);
                assert_eq!(order.order.total, 24000);
                assert_eq!(order.order.abono, 10000);
                assert_eq!(order.order.saldo, 14000);
                assert_eq!(order.items.len(), 1);
                assert_eq!(order.items[0].unit_price, SHIRT_M);
                assert_eq!(order.items[0].subtotal, 24000);
                assert!(!order.items[0].ready);

                let stored = shop.orders.get_order(order.id()).await.unwrap();
                assert_eq!(order_state(&stored), order_state(&order));
            }

            #[tokio::test]
            async fn test_create_order_keeps_delivery_date() {
                let (shop, catalog) = setup().await;
                let date = chrono::NaiveDate::from_ymd_opt(YEAR, 3, 1).unwrap();

                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1)]).with_delivery_date(date))
                    .await
                    .unwrap();
                assert_eq!(order.order.delivery_date, Some(date));

                let stored = shop.orders.get_order(order.id()).await.unwrap();
                assert_eq!(stored.order.delivery_date, Some(date));
            }

            #[tokio::test]
            async fn test_codes_are_sequential_per_year() {
                let (shop, catalog) = setup().await;

                let mut codes = Vec::new();
                for _ in 0..3 {
                    let order = shop
                        .orders
                        .create_order(new_order(vec![catalog.shirt_m(1)]))
                        .await
                        .unwrap();
                    codes.push(order.order.code);
                }
                assert_eq!(
                    codes,
                    vec![
                        format!("PED-{YEAR}-0001"),
                        format!("PED-{YEAR}-0002"),
                        format!("PED-{YEAR}-0003"),
                    ]
                );

                let next_year = shop
                    .orders
                    .create_order(NewOrder::new(
                        client("Luis", "Soto"),
                        YEAR + 1,
                        vec![catalog.shirt_m(1)],
                    ))
                    .await
                    .unwrap();
                assert_eq!(next_year.order.code, format!("PED-{}-0001", YEAR + 1));
            }

            #[tokio::test]
            async fn test_code_sequence_continues_after_highest() {
                let (shop, catalog) = setup().await;

                let first = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1)]))
                    .await
                    .unwrap();
                shop.orders
                    .create_order(new_order(vec![catalog.shirt_m(1)]))
                    .await
                    .unwrap();
                shop.orders.delete_order(first.id()).await.unwrap();

                let third = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1)]))
                    .await
                    .unwrap();
                assert_eq!(third.order.code, format!("PED-{YEAR}-0003"));
            }

            #[tokio::test]
            async fn test_create_without_items_is_rejected() {
                let (shop, _) = setup().await;

                let result = shop.orders.create_order(new_order(vec![])).await;
                assert_eq!(code_of(result), "EMPTY_ORDER");

                let page = shop.orders.list_orders(&OrderFilter::default()).await.unwrap();
                assert_eq!(page.total, 0);
            }

            #[tokio::test]
            async fn test_missing_price_aborts_whole_creation() {
                let (shop, catalog) = setup().await;

                let result = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1), catalog.pants_l(1)]))
                    .await;
                assert_eq!(code_of(result), "PRICE_NOT_FOUND");

                let page = shop.orders.list_orders(&OrderFilter::default()).await.unwrap();
                assert_eq!(page.total, 0);

                let next = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1)]))
                    .await
                    .unwrap();
                assert_eq!(next.order.code, format!("PED-{YEAR}-0001"));
            }

            #[tokio::test]
            async fn test_initial_abono_must_fit_total() {
                let (shop, catalog) = setup().await;

                let result = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1)]).with_abono(SHIRT_M + 1))
                    .await;
                assert_eq!(code_of(result), "INVALID_AMOUNT");

                let result = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1)]).with_abono(-1))
                    .await;
                assert_eq!(code_of(result), "INVALID_AMOUNT");
            }

            #[tokio::test]
            async fn test_create_merges_duplicate_lines() {
                let (shop, catalog) = setup().await;

                let order = shop
                    .orders
                    .create_order(new_order(vec![
                        catalog.shirt_m(1),
                        catalog.pants_m(1),
                        catalog.shirt_m(2),
                    ]))
                    .await
                    .unwrap();

                assert_eq!(order.items.len(), 2);
                assert_eq!(order.items[0].quantity, 3);
                assert_eq!(order.items[0].subtotal, 3 * SHIRT_M);
                assert_eq!(order.order.total, 3 * SHIRT_M + PANTS_M);
            }

            #[tokio::test]
            async fn test_create_rejects_blank_client_name() {
                let (shop, catalog) = setup().await;

                let mut input = new_order(vec![catalog.shirt_m(1)]);
                input.client.client_name = "   ".to_string();
                let result = shop.orders.create_order(input).await;
                assert_eq!(code_of(result), "VALIDATION_ERROR");
            }

            #[tokio::test]
            async fn test_orders_can_mix_schools() {
                let (shop, catalog) = setup().await;

                let order = shop
                    .orders
                    .create_order(new_order(vec![
                        catalog.colegio_shirt_m(1),
                        catalog.shirt_m(1),
                    ]))
                    .await
                    .unwrap();
                assert_eq!(order.order.total, COLEGIO_SHIRT_M + SHIRT_M);
                assert_eq!(order.school_id(), Some(catalog.colegio));
            }

            // ==================================================================
            // Line items and totals
            // ==================================================================

            #[tokio::test]
            async fn test_add_line_item_recomputes_totals() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(2)]).with_abono(10000))
                    .await
                    .unwrap();

                let update = shop
                    .orders
                    .add_line_item(order.id(), catalog.pants_m(1))
                    .await
                    .unwrap();

                assert_eq!(update.item.unit_price, PANTS_M);
                assert_eq!(update.item.subtotal, PANTS_M);
                assert_eq!(update.order.order.total, 42000);
                assert_eq!(update.order.order.saldo, 32000);
                assert_eq!(update.order.items.len(), 2);
            }

            #[tokio::test]
            async fn test_add_then_remove_restores_totals() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(2)]).with_abono(10000))
                    .await
                    .unwrap();

                let update = shop
                    .orders
                    .add_line_item(order.id(), catalog.pants_m(1))
                    .await
                    .unwrap();
                let restored = shop.orders.remove_line_item(update.item.id).await.unwrap();

                assert_eq!(restored.order.total, 24000);
                assert_eq!(restored.order.saldo, 14000);
                assert_eq!(restored.items.len(), 1);

                let stored = shop.orders.get_order(order.id()).await.unwrap();
                assert_eq!(stored.items.len(), 1);
                assert_eq!(stored.order.total, 24000);
            }

            #[tokio::test]
            async fn test_add_line_item_without_price() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1)]))
                    .await
                    .unwrap();

                let result = shop.orders.add_line_item(order.id(), catalog.pants_l(1)).await;
                assert_eq!(code_of(result), "PRICE_NOT_FOUND");

                let result = shop.orders.add_line_item(order.id(), catalog.pants_m(0)).await;
                assert_eq!(code_of(result), "INVALID_QUANTITY");

                let stored = shop.orders.get_order(order.id()).await.unwrap();
                assert_eq!(stored.items.len(), 1);
                assert_eq!(stored.order.total, SHIRT_M);
            }

            #[tokio::test]
            async fn test_add_line_item_to_unknown_order() {
                let (shop, catalog) = setup().await;
                let result = shop
                    .orders
                    .add_line_item(Uuid::new_v4(), catalog.shirt_m(1))
                    .await;
                assert_eq!(code_of(result), "NOT_FOUND");
            }

            #[tokio::test]
            async fn test_update_quantity() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1)]))
                    .await
                    .unwrap();
                let item_id = order.items[0].id;

                let update = shop
                    .orders
                    .update_line_item_quantity(item_id, 3)
                    .await
                    .unwrap();
                assert_eq!(update.item.quantity, 3);
                assert_eq!(update.item.subtotal, 3 * SHIRT_M);
                assert_eq!(update.order.order.total, 3 * SHIRT_M);

                let result = shop.orders.update_line_item_quantity(item_id, 0).await;
                assert_eq!(code_of(result), "INVALID_QUANTITY");
                let result = shop.orders.update_line_item_quantity(item_id, -2).await;
                assert_eq!(code_of(result), "INVALID_QUANTITY");

                let stored = shop.orders.get_order(order.id()).await.unwrap();
                assert_eq!(stored.items[0].quantity, 3);
            }

            #[tokio::test]
            async fn test_total_cannot_drop_below_payment() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(
                        new_order(vec![catalog.shirt_m(1), catalog.pants_m(1)]).with_abono(20000),
                    )
                    .await
                    .unwrap();
                let pants = order.items[1].id;

                let result = shop.orders.remove_line_item(pants).await;
                assert_eq!(code_of(result), "INVALID_AMOUNT");

                let stored = shop.orders.get_order(order.id()).await.unwrap();
                assert_eq!(stored.items.len(), 2);
                assert_eq!(stored.order.total, SHIRT_M + PANTS_M);
            }

            #[tokio::test]
            async fn test_item_price_is_a_snapshot() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1)]))
                    .await
                    .unwrap();

                shop.prices
                    .update_price(
                        &PriceKey::new(catalog.liceo, catalog.shirt, catalog.size_m),
                        PriceAmount { price: 99000 },
                    )
                    .await
                    .unwrap();

                let stored = shop.orders.get_order(order.id()).await.unwrap();
                assert_eq!(stored.items[0].unit_price, SHIRT_M);
                assert_eq!(stored.order.total, SHIRT_M);

                let update = shop
                    .orders
                    .update_line_item_quantity(order.items[0].id, 2)
                    .await
                    .unwrap();
                assert_eq!(update.item.subtotal, 2 * SHIRT_M);

                let added = shop
                    .orders
                    .add_line_item(order.id(), catalog.shirt_m(1))
                    .await
                    .unwrap();
                assert_eq!(added.item.unit_price, 99000);
            }

            #[tokio::test]
            async fn test_unknown_item_is_not_found() {
                let (shop, _) = setup().await;
                let result = shop.orders.remove_line_item(Uuid::new_v4()).await;
                assert_eq!(code_of(result), "NOT_FOUND");
                let result = shop.orders.set_item_ready(Uuid::new_v4(), true).await;
                assert_eq!(code_of(result), "NOT_FOUND");
            }

            // ==================================================================
            // Payment, discount and client info
            // ==================================================================

            #[tokio::test]
            async fn test_set_payment() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(2)]))
                    .await
                    .unwrap();

                let paid = shop.orders.set_payment(order.id(), 24000).await.unwrap();
                assert_eq!(paid.order.abono, 24000);
                assert_eq!(paid.order.saldo, 0);

                let result = shop.orders.set_payment(order.id(), 24001).await;
                assert_eq!(code_of(result), "INVALID_AMOUNT");
                let result = shop.orders.set_payment(order.id(), -1).await;
                assert_eq!(code_of(result), "INVALID_AMOUNT");

                let stored = shop.orders.get_order(order.id()).await.unwrap();
                assert_eq!(stored.order.abono, 24000);
            }

            #[tokio::test]
            async fn test_discount_is_informational() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(2)]).with_abono(4000))
                    .await
                    .unwrap();

                let discounted = shop
                    .orders
                    .set_discount(order.id(), Some(20000))
                    .await
                    .unwrap();
                assert_eq!(discounted.order.discounted_total, Some(20000));
                assert_eq!(discounted.order.saldo, 20000);

                let result = shop.orders.set_discount(order.id(), Some(24001)).await;
                assert_eq!(code_of(result), "INVALID_AMOUNT");

                // total drops to 12000, below the discount
                let shrunk = shop
                    .orders
                    .update_line_item_quantity(order.items[0].id, 1)
                    .await
                    .unwrap();
                assert_eq!(shrunk.order.order.discounted_total, None);

                let cleared = shop.orders.set_discount(order.id(), None).await.unwrap();
                assert_eq!(cleared.order.discounted_total, None);
            }

            #[tokio::test]
            async fn test_update_client_info() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1)]))
                    .await
                    .unwrap();

                let mut input = client("  María ", "González");
                input.client_phone = Some("   ".to_string());
                input.client_email = Some("maria@example.com".to_string());
                let updated = shop
                    .orders
                    .update_client_info(order.id(), input)
                    .await
                    .unwrap();
                assert_eq!(updated.order.client.client_name, "María");
                assert_eq!(updated.order.client.client_phone, None);
                assert_eq!(
                    updated.order.client.client_email.as_deref(),
                    Some("maria@example.com")
                );

                let mut bad = client("María", "González");
                bad.client_email = Some("not-an-email".to_string());
                let result = shop.orders.update_client_info(order.id(), bad).await;
                assert_eq!(code_of(result), "VALIDATION_ERROR");
            }

            // ==================================================================
            // Status lifecycle
            // ==================================================================

            #[tokio::test]
            async fn test_first_ready_item_moves_order_in_progress() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1), catalog.pants_m(1)]))
                    .await
                    .unwrap();

                let update = shop
                    .orders
                    .set_item_ready(order.items[0].id, true)
                    .await
                    .unwrap();
                assert!(update.item.ready);
                assert_eq!(update.order.order.status, OrderStatus::EnProceso);

                // un-readying does not move the order back
                let update = shop
                    .orders
                    .set_item_ready(order.items[0].id, false)
                    .await
                    .unwrap();
                assert_eq!(update.order.order.status, OrderStatus::EnProceso);
            }

            #[tokio::test]
            async fn test_delivery_requires_every_item_ready() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1), catalog.pants_m(1)]))
                    .await
                    .unwrap();

                shop.orders
                    .set_item_ready(order.items[0].id, true)
                    .await
                    .unwrap();
                let result = shop.orders.mark_delivered(order.id()).await;
                assert_eq!(code_of(result), "INCOMPLETE_ORDER");
                let result = shop
                    .orders
                    .set_status(order.id(), OrderStatus::Entregado)
                    .await;
                assert_eq!(code_of(result), "INCOMPLETE_ORDER");

                shop.orders
                    .set_item_ready(order.items[1].id, true)
                    .await
                    .unwrap();
                let delivered = shop.orders.mark_delivered(order.id()).await.unwrap();
                assert_eq!(delivered.order.status, OrderStatus::Entregado);
                assert!(delivered.items.iter().all(|item| item.ready));
                assert_eq!(delivered.progress().percent, 100);

                let again = shop.orders.mark_delivered(order.id()).await.unwrap();
                assert_eq!(again.order.status, OrderStatus::Entregado);
            }

            #[tokio::test]
            async fn test_delivered_order_is_closed() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1)]))
                    .await
                    .unwrap();
                let item_id = order.items[0].id;
                shop.orders.set_item_ready(item_id, true).await.unwrap();
                shop.orders
                    .set_status(order.id(), OrderStatus::Entregado)
                    .await
                    .unwrap();

                let result = shop.orders.add_line_item(order.id(), catalog.pants_m(1)).await;
                assert_eq!(code_of(result), "ORDER_CLOSED");
                let result = shop.orders.update_line_item_quantity(item_id, 2).await;
                assert_eq!(code_of(result), "ORDER_CLOSED");
                let result = shop.orders.set_payment(order.id(), 1000).await;
                assert_eq!(code_of(result), "ORDER_CLOSED");
                let result = shop.orders.set_item_ready(item_id, false).await;
                assert_eq!(code_of(result), "ORDER_CLOSED");
                let result = shop
                    .orders
                    .set_status(order.id(), OrderStatus::EnProceso)
                    .await;
                assert_eq!(code_of(result), "INVALID_TRANSITION");
            }

            #[tokio::test]
            async fn test_status_only_moves_forward() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1)]))
                    .await
                    .unwrap();

                let same = shop
                    .orders
                    .set_status(order.id(), OrderStatus::Ingresado)
                    .await
                    .unwrap();
                assert_eq!(same.order.status, OrderStatus::Ingresado);

                let result = shop
                    .orders
                    .set_status(order.id(), OrderStatus::EnProceso)
                    .await;
                assert_eq!(code_of(result), "INVALID_TRANSITION");

                shop.orders
                    .set_item_ready(order.items[0].id, true)
                    .await
                    .unwrap();
                let started = shop
                    .orders
                    .set_status(order.id(), OrderStatus::EnProceso)
                    .await
                    .unwrap();
                assert_eq!(started.order.status, OrderStatus::EnProceso);

                let result = shop
                    .orders
                    .set_status(order.id(), OrderStatus::Ingresado)
                    .await;
                assert_eq!(code_of(result), "INVALID_TRANSITION");
            }

            // ==================================================================
            // Batched drafts
            // ==================================================================

            #[tokio::test]
            async fn test_apply_batch_applies_every_change() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1), catalog.shirt_l(1)]))
                    .await
                    .unwrap();
                let shirt_m = order.items[0].id;
                let shirt_l = order.items[1].id;

                let draft = OrderDraft {
                    client: Some(client("Ana", "Rojas")),
                    removed_items: vec![shirt_l],
                    added_items: vec![catalog.pants_m(1), catalog.pants_m(1)],
                    quantity_changes: vec![QuantityChange {
                        item_id: shirt_m,
                        quantity: 2,
                    }],
                    ready_changes: vec![ReadyChange {
                        item_id: shirt_m,
                        ready: true,
                    }],
                };

                let updated = shop.orders.apply_batch(order.id(), draft).await.unwrap();
                assert_eq!(updated.items.len(), 2);
                assert!(updated.item(shirt_l).is_none());
                assert_eq!(updated.items[1].quantity, 2);
                assert_eq!(updated.order.total, 2 * SHIRT_M + 2 * PANTS_M);
                assert_eq!(updated.order.status, OrderStatus::EnProceso);
                assert_eq!(updated.order.client.client_surname.as_deref(), Some("Rojas"));

                let stored = shop.orders.get_order(order.id()).await.unwrap();
                assert_eq!(order_state(&stored), order_state(&updated));
            }

            #[tokio::test]
            async fn test_apply_batch_is_all_or_nothing() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1), catalog.shirt_l(1)]))
                    .await
                    .unwrap();

                let draft = OrderDraft {
                    removed_items: vec![order.items[1].id],
                    added_items: vec![catalog.pants_m(1)],
                    quantity_changes: vec![QuantityChange {
                        item_id: order.items[0].id,
                        quantity: 0,
                    }],
                    ..Default::default()
                };
                let result = shop.orders.apply_batch(order.id(), draft).await;
                assert_eq!(code_of(result), "INVALID_QUANTITY");

                let draft = OrderDraft {
                    added_items: vec![catalog.pants_m(1), catalog.pants_l(1)],
                    ..Default::default()
                };
                let result = shop.orders.apply_batch(order.id(), draft).await;
                assert_eq!(code_of(result), "PRICE_NOT_FOUND");

                let stored = shop.orders.get_order(order.id()).await.unwrap();
                assert_eq!(order_state(&stored), order_state(&order));
            }

            #[tokio::test]
            async fn test_empty_batch_is_a_no_op() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1)]))
                    .await
                    .unwrap();

                let unchanged = shop
                    .orders
                    .apply_batch(order.id(), OrderDraft::default())
                    .await
                    .unwrap();
                assert_eq!(order_state(&unchanged), order_state(&order));
            }

            #[tokio::test]
            async fn test_batch_drops_changes_for_removed_items() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1), catalog.shirt_l(1)]))
                    .await
                    .unwrap();
                let shirt_l = order.items[1].id;

                let draft = OrderDraft {
                    removed_items: vec![shirt_l],
                    quantity_changes: vec![QuantityChange {
                        item_id: shirt_l,
                        quantity: 3,
                    }],
                    ready_changes: vec![ReadyChange {
                        item_id: shirt_l,
                        ready: true,
                    }],
                    ..Default::default()
                };

                let updated = shop.orders.apply_batch(order.id(), draft).await.unwrap();
                assert_eq!(updated.items.len(), 1);
                assert!(updated.item(shirt_l).is_none());
                assert_eq!(updated.order.total, SHIRT_M);
                assert_eq!(updated.order.status, OrderStatus::Ingresado);
            }

            #[tokio::test]
            async fn test_batch_with_unknown_item_changes_nothing() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1)]))
                    .await
                    .unwrap();

                let draft = OrderDraft {
                    added_items: vec![catalog.pants_m(1)],
                    ready_changes: vec![ReadyChange {
                        item_id: Uuid::new_v4(),
                        ready: true,
                    }],
                    ..Default::default()
                };
                let result = shop.orders.apply_batch(order.id(), draft).await;
                assert_eq!(code_of(result), "NOT_FOUND");

                let stored = shop.orders.get_order(order.id()).await.unwrap();
                assert_eq!(order_state(&stored), order_state(&order));
            }

            // ==================================================================
            // Concurrent edits
            // ==================================================================

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn test_concurrent_adds_all_land() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1)]))
                    .await
                    .unwrap();

                let mut handles = Vec::new();
                for _ in 0..6 {
                    let shop = shop.clone();
                    let order_id = order.id();
                    handles.push(tokio::spawn(async move {
                        shop.orders.add_line_item(order_id, catalog.pants_m(1)).await
                    }));
                }
                let mut added = Vec::new();
                for handle in handles {
                    added.push(handle.await.unwrap().unwrap().item.id);
                }

                let stored = shop.orders.get_order(order.id()).await.unwrap();
                assert_eq!(stored.items.len(), 7);
                for item_id in added {
                    assert!(stored.item(item_id).is_some());
                }
                assert_eq!(stored.order.total, SHIRT_M + 6 * PANTS_M);
                assert_eq!(stored.order.saldo, stored.order.total);
            }

            #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
            async fn test_concurrent_remove_and_ready_never_revive_the_item() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1), catalog.shirt_l(1)]))
                    .await
                    .unwrap();
                let shirt_m = order.items[0].id;

                let remover = {
                    let shop = shop.clone();
                    tokio::spawn(async move { shop.orders.remove_line_item(shirt_m).await })
                };
                let readier = {
                    let shop = shop.clone();
                    tokio::spawn(async move { shop.orders.set_item_ready(shirt_m, true).await })
                };
                remover.await.unwrap().unwrap();
                if let Err(e) = readier.await.unwrap() {
                    assert_eq!(e.error_code(), "NOT_FOUND");
                }

                let stored = shop.orders.get_order(order.id()).await.unwrap();
                assert!(stored.item(shirt_m).is_none());
                assert_eq!(stored.items.len(), 1);
                assert_eq!(stored.order.total, SHIRT_L);
            }

            // ==================================================================
            // Deletion and listing
            // ==================================================================

            #[tokio::test]
            async fn test_delete_order_cascades_to_items() {
                let (shop, catalog) = setup().await;
                let order = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1)]))
                    .await
                    .unwrap();

                shop.orders.delete_order(order.id()).await.unwrap();

                let result = shop.orders.get_order(order.id()).await;
                assert_eq!(code_of(result), "NOT_FOUND");
                let result = shop.orders.remove_line_item(order.items[0].id).await;
                assert_eq!(code_of(result), "NOT_FOUND");
                let result = shop.orders.delete_order(order.id()).await;
                assert_eq!(code_of(result), "NOT_FOUND");

                // the school is no longer referenced by items, only by prices
                let refs = shop
                    .stores
                    .catalog
                    .count_references(uniform_orders::core::entity::CatalogRef::School(
                        catalog.liceo,
                    ))
                    .await
                    .unwrap();
                assert_eq!(refs.items, 0);
            }

            #[tokio::test]
            async fn test_list_orders_filters_and_paginates() {
                let (shop, catalog) = setup().await;

                let ana = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(1)]))
                    .await
                    .unwrap();
                shop.orders
                    .create_order(NewOrder::new(
                        client("Luis", "Soto"),
                        YEAR,
                        vec![catalog.shirt_m(1)],
                    ))
                    .await
                    .unwrap();
                shop.orders
                    .create_order(NewOrder::new(
                        client("Marta", "Pérez"),
                        YEAR + 1,
                        vec![catalog.shirt_m(1)],
                    ))
                    .await
                    .unwrap();
                shop.orders
                    .set_item_ready(ana.items[0].id, true)
                    .await
                    .unwrap();

                let all = shop.orders.list_orders(&OrderFilter::default()).await.unwrap();
                assert_eq!(all.total, 3);
                assert_eq!(all.items[0].order.client.client_name, "Marta");

                let search = OrderFilter {
                    search: Some("pérez".to_string()),
                    ..Default::default()
                };
                let found = shop.orders.list_orders(&search).await.unwrap();
                assert_eq!(found.total, 2);

                let in_progress = OrderFilter {
                    status: Some(OrderStatus::EnProceso),
                    ..Default::default()
                };
                let found = shop.orders.list_orders(&in_progress).await.unwrap();
                assert_eq!(found.total, 1);
                assert_eq!(found.items[0].id(), ana.id());

                let by_year = OrderFilter {
                    year: Some(YEAR),
                    ..Default::default()
                };
                assert_eq!(shop.orders.list_orders(&by_year).await.unwrap().total, 2);

                let second_page = OrderFilter {
                    page: 2,
                    limit: 2,
                    ..Default::default()
                };
                let page = shop.orders.list_orders(&second_page).await.unwrap();
                assert_eq!(page.total, 3);
                assert_eq!(page.items.len(), 1);
                assert_eq!(page.items[0].id(), ana.id());
                assert_eq!(page.items[0].items.len(), 1);
            }

            // ==================================================================
            // Dashboard
            // ==================================================================

            #[tokio::test]
            async fn test_dashboard_summary() {
                let (shop, catalog) = setup().await;

                let first = shop
                    .orders
                    .create_order(new_order(vec![catalog.shirt_m(2)]).with_abono(4000))
                    .await
                    .unwrap();
                shop.orders
                    .create_order(NewOrder::new(
                        client("Luis", "Soto"),
                        YEAR,
                        vec![catalog.pants_m(1), catalog.colegio_shirt_m(1)],
                    ))
                    .await
                    .unwrap();
                shop.orders
                    .set_item_ready(first.items[0].id, true)
                    .await
                    .unwrap();
                shop.orders.mark_delivered(first.id()).await.unwrap();

                let summary = shop.dashboard.summary().await.unwrap();
                assert_eq!(summary.totals.total_orders, 2);
                assert_eq!(summary.totals.ingresado, 1);
                assert_eq!(summary.totals.en_proceso, 0);
                assert_eq!(summary.totals.entregado, 1);
                assert_eq!(
                    summary.totals.total_sales,
                    2 * SHIRT_M + PANTS_M + COLEGIO_SHIRT_M
                );
                assert_eq!(
                    summary.totals.outstanding_balance,
                    2 * SHIRT_M - 4000 + PANTS_M + COLEGIO_SHIRT_M
                );

                assert_eq!(summary.recent_orders.len(), 2);
                assert_eq!(summary.recent_orders[0].client, "Luis Soto");
                assert_eq!(summary.recent_orders[1].school_name.as_deref(), Some("Liceo X"));

                assert_eq!(summary.top_garments[0].id, catalog.shirt);
                assert_eq!(summary.top_garments[0].name.as_deref(), Some("Camisa"));
                assert_eq!(summary.top_garments[0].quantity, 3);
                assert_eq!(summary.top_schools[0].id, catalog.liceo);
                assert_eq!(summary.top_schools[0].quantity, 3);
            }
        }
    };
}
