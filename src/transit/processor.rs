use crate::core::entity::EntityId;
use crate::core::order::Order;
use crate::core::result::{AccountType, ClearingResult, TransactionType};
use crate::transit::config::{TransitEntity, TransitType};
use log::debug;
use rust_decimal::Decimal;

/// Stateless processor that expands an order through a transit route.
pub struct TransitProcessor;

impl TransitProcessor {
    /// Look up the route that collects or pays through `account`.
    pub fn find_by_account<'a>(
        transits: &'a [TransitEntity],
        account: &str,
    ) -> Option<&'a TransitEntity> {
        transits
            .iter()
            .find(|t| t.active && t.transit_account.as_deref() == Some(account))
    }

    /// Whether any active route applies to the order.
    pub fn requires_transit_entity(order: &Order, transits: &[TransitEntity]) -> bool {
        transits.iter().any(|t| t.applies_to(order))
    }

    /// Active routes applicable to the order, in configuration order.
    pub fn applicable_transits<'a>(
        order: &Order,
        transits: &'a [TransitEntity],
    ) -> Vec<&'a TransitEntity> {
        transits.iter().filter(|t| t.applies_to(order)).collect()
    }

    /// Fee a route retains on a relayed amount.
    pub fn calculate_retention(transit: &TransitEntity, amount: Decimal) -> Decimal {
        transit.retention.calculate(amount)
    }

    /// Expand an order's full amount through a route according to its
    /// direction.
    pub fn process(order: &Order, transit: &TransitEntity) -> Vec<ClearingResult> {
        let amount = order.total_amount();
        match transit.transit_type {
            TransitType::ReceivableTransit => {
                Self::process_receivable_transit(order, transit, amount)
            }
            TransitType::PayableTransit => Self::process_payable_transit(order, transit, amount),
        }
    }

    /// Customer pays under the transit entity's name; the relay keeps its
    /// fee and forwards the remainder to the target entity.
    ///
    /// Legs: external receivable on the relay for the full amount, then an
    /// internal pair moving the post-retention transfer to the target, plus
    /// a zero-amount audit leg recording the retained fee. The amount may
    /// be the full order amount or a partial relay.
    pub fn process_receivable_transit(
        order: &Order,
        transit: &TransitEntity,
        amount: Decimal,
    ) -> Vec<ClearingResult> {
        let retention = transit.retention.calculate(amount);
        let transfer = amount - retention;
        debug!(
            "receivable transit {} on {}: amount {}, retained {}",
            transit.transit_id,
            order.order_no(),
            amount,
            retention
        );

        let mut results = vec![Self::leg(
            order,
            transit,
            transit.transit_entity.clone(),
            amount,
            TransactionType::Receivable,
            AccountType::ExternalReceivable,
            "customer receivable under borrowed name",
        )];

        if transfer != Decimal::ZERO {
            results.push(Self::leg(
                order,
                transit,
                transit.target_entity.clone(),
                transfer,
                TransactionType::Receivable,
                AccountType::InternalReceivable,
                "forwarded from transit entity",
            ));
            results.push(Self::leg(
                order,
                transit,
                transit.transit_entity.clone(),
                -transfer,
                TransactionType::Payable,
                AccountType::InternalPayable,
                "forwarded to target entity",
            ));
        }

        if retention > Decimal::ZERO {
            results.push(Self::retention_audit(order, transit, retention));
        }
        results
    }

    /// Source entity pays through the transit entity, which settles with
    /// the supplier keeping its fee.
    ///
    /// Legs: internal pair moving the full amount from the source to the
    /// relay, then an external payable on the relay for the post-retention
    /// transfer, plus the audit leg.
    pub fn process_payable_transit(
        order: &Order,
        transit: &TransitEntity,
        amount: Decimal,
    ) -> Vec<ClearingResult> {
        let retention = transit.retention.calculate(amount);
        let transfer = amount - retention;
        debug!(
            "payable transit {} on {}: amount {}, retained {}",
            transit.transit_id,
            order.order_no(),
            amount,
            retention
        );

        let mut results = vec![
            Self::leg(
                order,
                transit,
                transit.transit_entity.clone(),
                amount,
                TransactionType::Receivable,
                AccountType::InternalReceivable,
                "funded by source entity",
            ),
            Self::leg(
                order,
                transit,
                transit.source_entity.clone(),
                -amount,
                TransactionType::Payable,
                AccountType::InternalPayable,
                "funding transit entity",
            ),
        ];

        if transfer != Decimal::ZERO {
            results.push(Self::leg(
                order,
                transit,
                transit.transit_entity.clone(),
                -transfer,
                TransactionType::Payable,
                AccountType::ExternalPayable,
                "supplier payable under borrowed name",
            ));
        }

        if retention > Decimal::ZERO {
            results.push(Self::retention_audit(order, transit, retention));
        }
        results
    }

    fn retention_audit(
        order: &Order,
        transit: &TransitEntity,
        retention: Decimal,
    ) -> ClearingResult {
        ClearingResult::new(
            order.id(),
            transit.transit_entity.clone(),
            Decimal::ZERO,
            order.currency().clone(),
            TransactionType::TransitFee,
            AccountType::Retention,
            order.clearing_mode(),
        )
        .as_retention_audit(retention)
        .with_transit_id(transit.transit_id.clone())
        .with_description(format!("retention for {}", order.order_no()))
    }

    fn leg(
        order: &Order,
        transit: &TransitEntity,
        entity: EntityId,
        amount: Decimal,
        transaction: TransactionType,
        account: AccountType,
        description: &str,
    ) -> ClearingResult {
        ClearingResult::new(
            order.id(),
            entity,
            amount,
            order.currency().clone(),
            transaction,
            account,
            order.clearing_mode(),
        )
        .with_transit_id(transit.transit_id.clone())
        .with_description(format!("{} {}", description, order.order_no()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::CurrencyCode;
    use crate::core::entity::EntityId;
    use crate::core::order::ClearingMode;
    use crate::transit::config::Retention;
    use rust_decimal_macros::dec;

    fn order() -> Order {
        Order::new(
            "FF-2024-0010",
            "CUST-ACME",
            EntityId::new("CN-SHA-SALES"),
            dec!(10000),
            dec!(6000),
            CurrencyCode::new("USD"),
            ClearingMode::Star,
        )
    }

    fn receivable_route(retention: Retention) -> TransitEntity {
        TransitEntity::new(
            "TR-HK-1",
            "HK receivable relay",
            TransitType::ReceivableTransit,
            EntityId::new("CUSTOMER"),
            EntityId::new("HK-TRANSIT"),
            EntityId::new("CN-SHA-SALES"),
            retention,
        )
        .with_account("HSBC-888-123")
    }

    #[test]
    fn test_receivable_transit_with_percentage_retention() {
        let route = receivable_route(Retention::Percentage(dec!(0.03)));
        let results = TransitProcessor::process(&order(), &route);

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].amount(), dec!(10000));
        assert_eq!(results[0].entity().as_str(), "HK-TRANSIT");
        assert_eq!(results[1].amount(), dec!(9700.00));
        assert_eq!(results[1].entity().as_str(), "CN-SHA-SALES");
        assert_eq!(results[2].amount(), dec!(-9700.00));

        let audit = &results[3];
        assert!(audit.is_transit_retention());
        assert_eq!(audit.amount(), Decimal::ZERO);
        assert_eq!(audit.retention_amount(), Some(dec!(300.00)));
        assert_eq!(audit.transit_id(), Some("TR-HK-1"));

        // Relay keeps exactly the retention.
        let relay_net: Decimal = results
            .iter()
            .filter(|r| r.entity().as_str() == "HK-TRANSIT")
            .map(|r| r.amount())
            .sum();
        assert_eq!(relay_net, dec!(300.00));
    }

    #[test]
    fn test_receivable_transit_without_retention_has_no_audit_leg() {
        let route = receivable_route(Retention::None);
        let results = TransitProcessor::process_receivable_transit(&order(), &route, dec!(10000));
        assert_eq!(results.len(), 3);
        assert!(results.iter().all(|r| !r.is_transit_retention()));
        assert_eq!(results[1].amount(), dec!(10000));
    }

    #[test]
    fn test_payable_transit_with_fixed_retention() {
        let route = TransitEntity::new(
            "TP-HK-1",
            "HK payable relay",
            TransitType::PayableTransit,
            EntityId::new("CN-SHA-SALES"),
            EntityId::new("HK-TRANSIT"),
            EntityId::new("SUPPLIER"),
            Retention::Fixed(dec!(150)),
        );
        let results = TransitProcessor::process(&order(), &route);

        assert_eq!(results.len(), 4);
        assert_eq!(results[0].amount(), dec!(10000));
        assert_eq!(results[0].entity().as_str(), "HK-TRANSIT");
        assert_eq!(results[1].amount(), dec!(-10000));
        assert_eq!(results[1].entity().as_str(), "CN-SHA-SALES");
        assert_eq!(results[2].amount(), dec!(-9850));
        assert_eq!(results[3].retention_amount(), Some(dec!(150)));
    }

    #[test]
    fn test_partial_amount_relays_independently_of_the_order_total() {
        let route = receivable_route(Retention::Percentage(dec!(0.03)));
        let results = TransitProcessor::process_receivable_transit(&order(), &route, dec!(4000));

        assert_eq!(results[0].amount(), dec!(4000));
        assert_eq!(results[1].amount(), dec!(3880.00));
        assert_eq!(results[3].retention_amount(), Some(dec!(120.00)));
    }

    #[test]
    fn test_find_by_account() {
        let routes = vec![receivable_route(Retention::None)];
        assert!(TransitProcessor::find_by_account(&routes, "HSBC-888-123").is_some());
        assert!(TransitProcessor::find_by_account(&routes, "OTHER").is_none());

        let inactive = vec![receivable_route(Retention::None).deactivated()];
        assert!(TransitProcessor::find_by_account(&inactive, "HSBC-888-123").is_none());
    }

    #[test]
    fn test_applicability_filters_routes() {
        use crate::core::condition::Applicability;

        let matching = receivable_route(Retention::None);
        let gated = receivable_route(Retention::None).with_condition(
            Applicability::new().with_currencies(vec![CurrencyCode::new("CNY")]),
        );
        let routes = vec![matching, gated];

        let order = order();
        assert!(TransitProcessor::requires_transit_entity(&order, &routes));
        assert_eq!(TransitProcessor::applicable_transits(&order, &routes).len(), 1);
    }
}
