//! Integration tests for the full pipeline.
//!
//! Command → EventStore → EventBus → Projections/Workers → ReadModels,
//! plus the collaborator contracts: inventory binding, best-effort
//! notifications, invoice supersession, and the auto-invoicer.

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::{Duration, Instant};

    use rust_decimal_macros::dec;
    use serde_json::Value as JsonValue;

    use wrenchflow_core::{AggregateId, DomainError, TenantId, UserId};
    use wrenchflow_events::{EventEnvelope, InMemoryEventBus};
    use wrenchflow_inventory::{
        AdjustStock, CreatePart, InventoryLookup, Part, PartCommand, PartId, PartSummary,
    };
    use wrenchflow_workorders::{
        LineItemChange, LineItemKind, WorkOrder, WorkOrderId, WorkOrderPriority, WorkOrderStatus,
    };

    use crate::command_dispatcher::{CommandDispatcher, DispatchError};
    use crate::config::{BillingConfig, StockPolicy};
    use crate::event_store::InMemoryEventStore;
    use crate::invoice_archive::{InMemoryInvoiceArchive, InvoiceArchive};
    use crate::notify::{FailingNotifier, RecordingNotifier};
    use crate::projections::{PartsCatalogProjection, WorkOrderBoardProjection};
    use crate::read_model::InMemoryTenantStore;
    use crate::services::{
        InvoicingService, WorkOrderService, PART_STREAM, WORK_ORDER_STREAM,
    };
    use crate::workers::{EventWorker, WorkerHandle};

    type Store = Arc<InMemoryEventStore>;
    type Bus = Arc<InMemoryEventBus<EventEnvelope<JsonValue>>>;
    type Catalog = Arc<PartsCatalogProjection<Arc<InMemoryTenantStore<PartId, PartSummary>>>>;
    type Board = Arc<WorkOrderBoardProjection<Arc<InMemoryTenantStore<WorkOrderId, WorkOrder>>>>;
    type Notifier = Arc<RecordingNotifier>;

    struct Shop {
        store: Store,
        bus: Bus,
        catalog: Catalog,
        board: Board,
        archive: Arc<InMemoryInvoiceArchive>,
        notifier: Notifier,
        work_orders: WorkOrderService<Store, Bus, Catalog, Notifier>,
        invoicing: Arc<InvoicingService<Store, Bus, Arc<InMemoryInvoiceArchive>>>,
        // Kept alive for the duration of the test.
        _workers: Vec<WorkerHandle>,
    }

    fn shop_with(config: BillingConfig) -> Shop {
        wrenchflow_observability::init();

        let store: Store = Arc::new(InMemoryEventStore::new());
        let bus: Bus = Arc::new(InMemoryEventBus::new());
        let catalog: Catalog = Arc::new(PartsCatalogProjection::new(Arc::new(
            InMemoryTenantStore::new(),
        )));
        let board: Board = Arc::new(WorkOrderBoardProjection::new(Arc::new(
            InMemoryTenantStore::new(),
        )));
        let archive = Arc::new(InMemoryInvoiceArchive::new());
        let notifier = Arc::new(RecordingNotifier::new());

        let catalog_feed = catalog.clone();
        let catalog_worker = EventWorker::spawn(
            "parts-catalog",
            bus.clone(),
            None,
            move |envelope: EventEnvelope<JsonValue>| {
                if envelope.aggregate_type == PART_STREAM {
                    catalog_feed
                        .apply_envelope(&envelope)
                        .map_err(|e| format!("{e:?}"))?;
                }
                Ok::<(), String>(())
            },
        );

        let board_feed = board.clone();
        let board_worker = EventWorker::spawn(
            "work-order-board",
            bus.clone(),
            None,
            move |envelope: EventEnvelope<JsonValue>| {
                if envelope.aggregate_type == WORK_ORDER_STREAM {
                    board_feed
                        .apply_envelope(&envelope)
                        .map_err(|e| format!("{e:?}"))?;
                }
                Ok::<(), String>(())
            },
        );

        let work_orders = WorkOrderService::new(
            store.clone(),
            bus.clone(),
            catalog.clone(),
            notifier.clone(),
            config,
        );
        let invoicing = Arc::new(InvoicingService::new(
            store.clone(),
            bus.clone(),
            archive.clone(),
        ));

        Shop {
            store,
            bus,
            catalog,
            board,
            archive,
            notifier,
            work_orders,
            invoicing,
            _workers: vec![catalog_worker, board_worker],
        }
    }

    fn shop() -> Shop {
        shop_with(BillingConfig::default())
    }

    fn wait_until(mut condition: impl FnMut() -> bool) {
        let deadline = Instant::now() + Duration::from_secs(2);
        while Instant::now() < deadline {
            if condition() {
                return;
            }
            std::thread::sleep(Duration::from_millis(20));
        }
        panic!("condition not met within deadline");
    }

    fn stock_part(
        shop: &Shop,
        tenant_id: TenantId,
        name: &str,
        part_number: &str,
        sell_price: rust_decimal::Decimal,
        on_hand: rust_decimal::Decimal,
    ) -> PartId {
        let part_id = PartId::new(AggregateId::new());
        let dispatcher = CommandDispatcher::new(shop.store.clone(), shop.bus.clone());
        dispatcher
            .dispatch(
                tenant_id,
                part_id.0,
                PART_STREAM,
                PartCommand::CreatePart(CreatePart {
                    tenant_id,
                    part_id,
                    name: name.to_string(),
                    part_number: part_number.to_string(),
                    sell_price,
                    occurred_at: chrono::Utc::now(),
                }),
                |_, id| Part::empty(PartId::new(id)),
            )
            .unwrap();
        if on_hand > rust_decimal::Decimal::ZERO {
            dispatcher
                .dispatch(
                    tenant_id,
                    part_id.0,
                    PART_STREAM,
                    PartCommand::AdjustStock(AdjustStock {
                        tenant_id,
                        part_id,
                        delta: on_hand,
                        occurred_at: chrono::Utc::now(),
                    }),
                    |_, id| Part::empty(PartId::new(id)),
                )
                .unwrap();
        }
        let catalog = shop.catalog.clone();
        wait_until(move || {
            catalog
                .get(tenant_id, &part_id)
                .is_some_and(|p| p.quantity_on_hand == on_hand)
        });
        part_id
    }

    #[tokio::test]
    async fn open_bill_and_invoice_a_ticket_end_to_end() {
        let shop = shop();
        let tenant_id = TenantId::new();
        let work_order_id = WorkOrderId::new(AggregateId::new());

        shop.work_orders
            .open(tenant_id, work_order_id, Some(AggregateId::new()), Some(AggregateId::new()))
            .unwrap();
        shop.work_orders
            .add_line_item(
                tenant_id,
                work_order_id,
                LineItemKind::Labor,
                "Oil Change",
                dec!(1),
                dec!(45.99),
            )
            .unwrap();
        shop.work_orders
            .add_line_item(
                tenant_id,
                work_order_id,
                LineItemKind::Part,
                "Oil Filter",
                dec!(1),
                dec!(12.99),
            )
            .unwrap();
        shop.work_orders
            .add_line_item(
                tenant_id,
                work_order_id,
                LineItemKind::Part,
                "Motor Oil",
                dec!(5),
                dec!(3.50),
            )
            .unwrap();

        let order = shop.work_orders.load(tenant_id, work_order_id).unwrap();
        assert_eq!(order.subtotal(), dec!(76.48));
        assert_eq!(order.total(order.tax_rate()), dec!(82.98));

        // The board read model catches up with the stream.
        let board = shop.board.clone();
        wait_until(move || {
            board
                .get(tenant_id, &work_order_id)
                .is_some_and(|s| s.line_item_count == 3)
        });
        let summary = shop.board.get(tenant_id, &work_order_id).unwrap();
        assert_eq!(summary.status, WorkOrderStatus::Pending);
        assert_eq!(summary.subtotal, dec!(76.48));
        assert_eq!(summary.total, dec!(82.98));
        assert_eq!(shop.board.list(tenant_id).len(), 1);

        shop.work_orders
            .change_status(tenant_id, work_order_id, WorkOrderStatus::InProgress)
            .await
            .unwrap();
        assert_eq!(
            shop.notifier.sent(),
            vec![(tenant_id, work_order_id, WorkOrderStatus::InProgress)]
        );

        let invoice = shop.invoicing.generate(tenant_id, work_order_id, None).unwrap();
        assert_eq!(invoice.subtotal(), dec!(76.48));
        assert_eq!(invoice.tax_amount(), dec!(6.50));
        assert_eq!(invoice.total(), dec!(82.98));
        assert_eq!(invoice.supersedes(), None);

        let latest = shop
            .archive
            .latest_for_work_order(tenant_id, work_order_id)
            .unwrap()
            .unwrap();
        assert_eq!(latest.id(), invoice.id());
    }

    #[tokio::test]
    async fn binding_a_part_resolves_price_and_keeps_the_reference() {
        let shop = shop();
        let tenant_id = TenantId::new();
        let work_order_id = WorkOrderId::new(AggregateId::new());
        shop.work_orders.open(tenant_id, work_order_id, None, None).unwrap();

        let part_id = stock_part(&shop, tenant_id, "Brake Pad Set", "BP-2201", dec!(54.99), dec!(6));

        let binding = shop
            .work_orders
            .add_part_from_inventory(tenant_id, work_order_id, part_id, dec!(2))
            .await
            .unwrap();
        assert!(binding.shortage.is_none());

        let order = shop.work_orders.load(tenant_id, work_order_id).unwrap();
        let item = order.find_line_item(binding.line_item_id).unwrap();
        assert_eq!(item.kind, LineItemKind::Part);
        assert_eq!(item.description, "Brake Pad Set");
        assert_eq!(item.unit_price, dec!(54.99));
        assert_eq!(item.source_part_id, Some(part_id));
        assert_eq!(order.subtotal(), dec!(109.98));
    }

    #[tokio::test]
    async fn stock_shortage_warns_by_default_and_blocks_on_request() {
        let warn_shop = shop();
        let tenant_id = TenantId::new();
        let work_order_id = WorkOrderId::new(AggregateId::new());
        warn_shop.work_orders.open(tenant_id, work_order_id, None, None).unwrap();
        let part_id = stock_part(&warn_shop, tenant_id, "Serpentine Belt", "SB-118", dec!(32.50), dec!(1));

        // Default policy: the shortage is reported, the line still lands.
        let binding = warn_shop
            .work_orders
            .add_part_from_inventory(tenant_id, work_order_id, part_id, dec!(3))
            .await
            .unwrap();
        let shortage = binding.shortage.unwrap();
        assert_eq!(shortage.requested, dec!(3));
        assert_eq!(shortage.on_hand, dec!(1));
        let order = warn_shop.work_orders.load(tenant_id, work_order_id).unwrap();
        assert_eq!(order.line_items().len(), 1);

        // Blocking policy: the same request is a hard error.
        let block_shop = shop_with(BillingConfig {
            stock_policy: StockPolicy::Block,
            ..BillingConfig::default()
        });
        let block_tenant = TenantId::new();
        let block_order = WorkOrderId::new(AggregateId::new());
        block_shop.work_orders.open(block_tenant, block_order, None, None).unwrap();
        let scarce = stock_part(&block_shop, block_tenant, "Alternator", "AL-900", dec!(189.00), dec!(0));

        let err = block_shop
            .work_orders
            .add_part_from_inventory(block_tenant, block_order, scarce, dec!(1))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            DispatchError::Domain(DomainError::InsufficientStock { .. })
        ));
        let order = block_shop.work_orders.load(block_tenant, block_order).unwrap();
        assert!(order.line_items().is_empty());
    }

    #[tokio::test]
    async fn catalog_search_matches_name_and_part_number() {
        let shop = shop();
        let tenant_id = TenantId::new();
        stock_part(&shop, tenant_id, "Brake Pad Set", "BP-2201", dec!(54.99), dec!(4));
        stock_part(&shop, tenant_id, "Brake Rotor", "BR-1105", dec!(78.00), dec!(2));
        stock_part(&shop, tenant_id, "Cabin Filter", "CF-330", dec!(18.50), dec!(9));

        let hits = shop.catalog.search_parts(tenant_id, "brake").await.unwrap();
        assert_eq!(hits.len(), 2);

        let by_number = shop.catalog.search_parts(tenant_id, "cf-3").await.unwrap();
        assert_eq!(by_number.len(), 1);
        assert_eq!(by_number[0].name, "Cabin Filter");
    }

    #[tokio::test]
    async fn unknown_part_fails_with_part_not_found() {
        let shop = shop();
        let tenant_id = TenantId::new();
        let work_order_id = WorkOrderId::new(AggregateId::new());
        shop.work_orders.open(tenant_id, work_order_id, None, None).unwrap();

        let err = shop
            .work_orders
            .add_part_from_inventory(
                tenant_id,
                work_order_id,
                PartId::new(AggregateId::new()),
                dec!(1),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Domain(DomainError::PartNotFound(_))));
    }

    #[tokio::test]
    async fn notification_failure_never_blocks_the_transition() {
        let shop = shop();
        let tenant_id = TenantId::new();
        let work_order_id = WorkOrderId::new(AggregateId::new());
        shop.work_orders.open(tenant_id, work_order_id, None, None).unwrap();

        let flaky = WorkOrderService::new(
            shop.store.clone(),
            shop.bus.clone(),
            shop.catalog.clone(),
            Arc::new(FailingNotifier),
            BillingConfig::default(),
        );

        flaky
            .change_status(tenant_id, work_order_id, WorkOrderStatus::InProgress)
            .await
            .unwrap();

        let order = shop.work_orders.load(tenant_id, work_order_id).unwrap();
        assert_eq!(order.status(), WorkOrderStatus::InProgress);
    }

    #[tokio::test]
    async fn regenerated_invoices_supersede_and_retain_the_audit_trail() {
        let shop = shop();
        let tenant_id = TenantId::new();
        let work_order_id = WorkOrderId::new(AggregateId::new());
        shop.work_orders.open(tenant_id, work_order_id, None, None).unwrap();

        let empty_err = shop.invoicing.generate(tenant_id, work_order_id, None).unwrap_err();
        assert!(matches!(
            empty_err,
            crate::services::InvoicingError::Domain(DomainError::EmptyLineItems)
        ));

        shop.work_orders
            .add_line_item(
                tenant_id,
                work_order_id,
                LineItemKind::Labor,
                "Diagnosis",
                dec!(1),
                dec!(120.00),
            )
            .unwrap();
        let first = shop.invoicing.generate(tenant_id, work_order_id, None).unwrap();

        shop.work_orders
            .add_line_item(
                tenant_id,
                work_order_id,
                LineItemKind::Fee,
                "Shop Supplies",
                dec!(1),
                dec!(12.00),
            )
            .unwrap();
        let second = shop.invoicing.generate(tenant_id, work_order_id, None).unwrap();

        assert_eq!(second.supersedes(), Some(first.id()));
        assert_eq!(second.subtotal(), dec!(132.00));

        let history = shop.invoicing.history(tenant_id, work_order_id).unwrap();
        assert_eq!(history.len(), 2);
        // The first snapshot's totals are untouched by the regeneration.
        assert_eq!(history[0].subtotal(), dec!(120.00));
        assert_eq!(history[0].id(), first.id());
    }

    #[tokio::test]
    async fn auto_invoicer_bills_completed_work_orders() {
        let shop = shop();
        let tenant_id = TenantId::new();
        let work_order_id = WorkOrderId::new(AggregateId::new());
        let _auto = InvoicingService::spawn_auto_invoicer(shop.invoicing.clone(), shop.bus.clone());

        shop.work_orders.open(tenant_id, work_order_id, None, None).unwrap();
        shop.work_orders
            .add_line_item(
                tenant_id,
                work_order_id,
                LineItemKind::Labor,
                "Timing Belt",
                dec!(4),
                dec!(95.00),
            )
            .unwrap();
        shop.work_orders
            .change_status(tenant_id, work_order_id, WorkOrderStatus::Completed)
            .await
            .unwrap();

        let archive = shop.archive.clone();
        wait_until(move || {
            archive
                .latest_for_work_order(tenant_id, work_order_id)
                .unwrap()
                .is_some()
        });
        let invoice = shop
            .archive
            .latest_for_work_order(tenant_id, work_order_id)
            .unwrap()
            .unwrap();
        assert_eq!(invoice.subtotal(), dec!(380.00));
    }

    #[tokio::test]
    async fn picked_up_orders_are_archived_for_the_whole_service_surface() {
        let shop = shop();
        let tenant_id = TenantId::new();
        let work_order_id = WorkOrderId::new(AggregateId::new());
        shop.work_orders.open(tenant_id, work_order_id, None, None).unwrap();
        shop.work_orders
            .change_status(tenant_id, work_order_id, WorkOrderStatus::PickedUp)
            .await
            .unwrap();

        let err = shop
            .work_orders
            .add_line_item(
                tenant_id,
                work_order_id,
                LineItemKind::Fee,
                "Storage",
                dec!(1),
                dec!(25.00),
            )
            .unwrap_err();
        assert!(matches!(err, DispatchError::Domain(DomainError::WorkOrderArchived)));

        let err = shop
            .work_orders
            .override_status(
                tenant_id,
                work_order_id,
                WorkOrderStatus::InProgress,
                UserId::new(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Domain(DomainError::WorkOrderArchived)));

        let err = shop
            .work_orders
            .set_priority(tenant_id, work_order_id, WorkOrderPriority::Urgent)
            .unwrap_err();
        assert!(matches!(err, DispatchError::Domain(DomainError::WorkOrderArchived)));

        // The archived order stays visible on the board.
        let board = shop.board.clone();
        wait_until(move || {
            board
                .get(tenant_id, &work_order_id)
                .is_some_and(|s| s.status == WorkOrderStatus::PickedUp)
        });
    }

    #[tokio::test]
    async fn update_and_remove_flow_through_the_service() {
        let shop = shop();
        let tenant_id = TenantId::new();
        let work_order_id = WorkOrderId::new(AggregateId::new());
        shop.work_orders.open(tenant_id, work_order_id, None, None).unwrap();

        let id = shop
            .work_orders
            .add_line_item(
                tenant_id,
                work_order_id,
                LineItemKind::Labor,
                "Coolant Flush",
                dec!(1),
                dec!(10.00),
            )
            .unwrap();

        shop.work_orders
            .update_line_item(tenant_id, work_order_id, id, LineItemChange::SetQuantity(dec!(2)))
            .unwrap();
        let order = shop.work_orders.load(tenant_id, work_order_id).unwrap();
        assert_eq!(order.subtotal(), dec!(20.00));

        shop.work_orders
            .remove_line_item(tenant_id, work_order_id, id)
            .unwrap();
        let order = shop.work_orders.load(tenant_id, work_order_id).unwrap();
        assert!(order.line_items().is_empty());
        assert_eq!(order.subtotal(), dec!(0));
    }
}
