use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use wrenchflow_core::{Aggregate, AggregateId, AggregateRoot, DomainError, TenantId};
use wrenchflow_events::Event;

/// Inventory part identifier (tenant-scoped via `tenant_id` fields in events/commands).
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PartId(pub AggregateId);

impl PartId {
    pub fn new(id: AggregateId) -> Self {
        Self(id)
    }
}

impl core::fmt::Display for PartId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

/// Aggregate root: Part (one catalog record in the shop's parts inventory).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Part {
    id: PartId,
    tenant_id: Option<TenantId>,
    name: String,
    part_number: String,
    sell_price: Decimal,
    quantity_on_hand: Decimal,
    version: u64,
    created: bool,
}

impl Part {
    /// Create an empty, not-yet-created aggregate instance for rehydration.
    pub fn empty(id: PartId) -> Self {
        Self {
            id,
            tenant_id: None,
            name: String::new(),
            part_number: String::new(),
            sell_price: Decimal::ZERO,
            quantity_on_hand: Decimal::ZERO,
            version: 0,
            created: false,
        }
    }

    pub fn id_typed(&self) -> PartId {
        self.id
    }

    pub fn tenant_id(&self) -> Option<TenantId> {
        self.tenant_id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn part_number(&self) -> &str {
        &self.part_number
    }

    pub fn sell_price(&self) -> Decimal {
        self.sell_price
    }

    pub fn quantity_on_hand(&self) -> Decimal {
        self.quantity_on_hand
    }
}

impl AggregateRoot for Part {
    type Id = PartId;

    fn id(&self) -> &Self::Id {
        &self.id
    }

    fn version(&self) -> u64 {
        self.version
    }
}

/// Command: CreatePart.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreatePart {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub name: String,
    pub part_number: String,
    pub sell_price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: AdjustStock.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdjustStock {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub delta: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Command: SetSellPrice.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetSellPrice {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub sell_price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartCommand {
    CreatePart(CreatePart),
    AdjustStock(AdjustStock),
    SetSellPrice(SetSellPrice),
}

/// Event: PartCreated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PartCreated {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub name: String,
    pub part_number: String,
    pub sell_price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: StockAdjusted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjusted {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub delta: Decimal,
    pub occurred_at: DateTime<Utc>,
}

/// Event: SellPriceChanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SellPriceChanged {
    pub tenant_id: TenantId,
    pub part_id: PartId,
    pub sell_price: Decimal,
    pub occurred_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PartEvent {
    PartCreated(PartCreated),
    StockAdjusted(StockAdjusted),
    SellPriceChanged(SellPriceChanged),
}

impl Event for PartEvent {
    fn event_type(&self) -> &'static str {
        match self {
            PartEvent::PartCreated(_) => "inventory.part.created",
            PartEvent::StockAdjusted(_) => "inventory.part.stock_adjusted",
            PartEvent::SellPriceChanged(_) => "inventory.part.sell_price_changed",
        }
    }

    fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            PartEvent::PartCreated(e) => e.occurred_at,
            PartEvent::StockAdjusted(e) => e.occurred_at,
            PartEvent::SellPriceChanged(e) => e.occurred_at,
        }
    }
}

impl Aggregate for Part {
    type Command = PartCommand;
    type Event = PartEvent;
    type Error = DomainError;

    fn apply(&mut self, event: &Self::Event) {
        match event {
            PartEvent::PartCreated(e) => {
                self.id = e.part_id;
                self.tenant_id = Some(e.tenant_id);
                self.name = e.name.clone();
                self.part_number = e.part_number.clone();
                self.sell_price = e.sell_price;
                self.quantity_on_hand = Decimal::ZERO;
                self.created = true;
            }
            PartEvent::StockAdjusted(e) => {
                self.quantity_on_hand += e.delta;
            }
            PartEvent::SellPriceChanged(e) => {
                self.sell_price = e.sell_price;
            }
        }

        // Deterministic version tracking: +1 per applied event.
        self.version += 1;
    }

    fn handle(&self, command: &Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            PartCommand::CreatePart(cmd) => self.handle_create(cmd),
            PartCommand::AdjustStock(cmd) => self.handle_adjust(cmd),
            PartCommand::SetSellPrice(cmd) => self.handle_set_price(cmd),
        }
    }
}

impl Part {
    fn ensure_tenant(&self, tenant_id: TenantId) -> Result<(), DomainError> {
        if !self.created {
            return Ok(());
        }
        if self.tenant_id != Some(tenant_id) {
            return Err(DomainError::invariant("tenant mismatch"));
        }
        Ok(())
    }

    fn ensure_part_id(&self, part_id: PartId) -> Result<(), DomainError> {
        if self.id != part_id {
            return Err(DomainError::invariant("part_id mismatch"));
        }
        Ok(())
    }

    fn handle_create(&self, cmd: &CreatePart) -> Result<Vec<PartEvent>, DomainError> {
        if self.created {
            return Err(DomainError::conflict("part already exists"));
        }
        if cmd.name.trim().is_empty() {
            return Err(DomainError::validation("name cannot be empty"));
        }
        if cmd.part_number.trim().is_empty() {
            return Err(DomainError::validation("part_number cannot be empty"));
        }
        if cmd.sell_price < Decimal::ZERO {
            return Err(DomainError::invalid_amount("sell_price cannot be negative"));
        }
        Ok(vec![PartEvent::PartCreated(PartCreated {
            tenant_id: cmd.tenant_id,
            part_id: cmd.part_id,
            name: cmd.name.clone(),
            part_number: cmd.part_number.clone(),
            sell_price: cmd.sell_price,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_adjust(&self, cmd: &AdjustStock) -> Result<Vec<PartEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_part_id(cmd.part_id)?;

        if cmd.delta == Decimal::ZERO {
            return Err(DomainError::validation("delta cannot be zero"));
        }

        let new_stock = self.quantity_on_hand + cmd.delta;
        if new_stock < Decimal::ZERO {
            return Err(DomainError::invariant("stock cannot go negative"));
        }

        Ok(vec![PartEvent::StockAdjusted(StockAdjusted {
            tenant_id: cmd.tenant_id,
            part_id: cmd.part_id,
            delta: cmd.delta,
            occurred_at: cmd.occurred_at,
        })])
    }

    fn handle_set_price(&self, cmd: &SetSellPrice) -> Result<Vec<PartEvent>, DomainError> {
        if !self.created {
            return Err(DomainError::not_found());
        }
        self.ensure_tenant(cmd.tenant_id)?;
        self.ensure_part_id(cmd.part_id)?;

        if cmd.sell_price < Decimal::ZERO {
            return Err(DomainError::invalid_amount("sell_price cannot be negative"));
        }

        Ok(vec![PartEvent::SellPriceChanged(SellPriceChanged {
            tenant_id: cmd.tenant_id,
            part_id: cmd.part_id,
            sell_price: cmd.sell_price,
            occurred_at: cmd.occurred_at,
        })])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use wrenchflow_core::AggregateId;

    fn test_tenant_id() -> TenantId {
        TenantId::new()
    }

    fn test_part_id() -> PartId {
        PartId::new(AggregateId::new())
    }

    fn test_time() -> DateTime<Utc> {
        Utc::now()
    }

    fn created_part(tenant_id: TenantId, part_id: PartId) -> Part {
        let mut part = Part::empty(part_id);
        let events = part
            .handle(&PartCommand::CreatePart(CreatePart {
                tenant_id,
                part_id,
                name: "Oil Filter".to_string(),
                part_number: "OF-1042".to_string(),
                sell_price: dec!(12.99),
                occurred_at: test_time(),
            }))
            .unwrap();
        part.apply(&events[0]);
        part
    }

    #[test]
    fn create_part_emits_part_created_event() {
        let part = Part::empty(test_part_id());
        let tenant_id = test_tenant_id();
        let part_id = test_part_id();

        let events = part
            .handle(&PartCommand::CreatePart(CreatePart {
                tenant_id,
                part_id,
                name: "Oil Filter".to_string(),
                part_number: "OF-1042".to_string(),
                sell_price: dec!(12.99),
                occurred_at: test_time(),
            }))
            .unwrap();
        assert_eq!(events.len(), 1);

        match &events[0] {
            PartEvent::PartCreated(e) => {
                assert_eq!(e.tenant_id, tenant_id);
                assert_eq!(e.part_id, part_id);
                assert_eq!(e.sell_price, dec!(12.99));
            }
            _ => panic!("Expected PartCreated event"),
        }
    }

    #[test]
    fn negative_sell_price_is_rejected() {
        let part = Part::empty(test_part_id());
        let err = part
            .handle(&PartCommand::CreatePart(CreatePart {
                tenant_id: test_tenant_id(),
                part_id: test_part_id(),
                name: "Oil Filter".to_string(),
                part_number: "OF-1042".to_string(),
                sell_price: dec!(-1),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvalidAmount(_)));
    }

    #[test]
    fn stock_cannot_go_negative() {
        let tenant_id = test_tenant_id();
        let part_id = test_part_id();
        let mut part = created_part(tenant_id, part_id);

        let events = part
            .handle(&PartCommand::AdjustStock(AdjustStock {
                tenant_id,
                part_id,
                delta: dec!(4),
                occurred_at: test_time(),
            }))
            .unwrap();
        part.apply(&events[0]);
        assert_eq!(part.quantity_on_hand(), dec!(4));

        let err = part
            .handle(&PartCommand::AdjustStock(AdjustStock {
                tenant_id,
                part_id,
                delta: dec!(-5),
                occurred_at: test_time(),
            }))
            .unwrap_err();
        assert!(matches!(err, DomainError::InvariantViolation(_)));
        assert_eq!(part.quantity_on_hand(), dec!(4));
    }

    #[test]
    fn sell_price_change_applies() {
        let tenant_id = test_tenant_id();
        let part_id = test_part_id();
        let mut part = created_part(tenant_id, part_id);

        let events = part
            .handle(&PartCommand::SetSellPrice(SetSellPrice {
                tenant_id,
                part_id,
                sell_price: dec!(13.49),
                occurred_at: test_time(),
            }))
            .unwrap();
        part.apply(&events[0]);
        assert_eq!(part.sell_price(), dec!(13.49));
        assert_eq!(part.version(), 2);
    }
}
