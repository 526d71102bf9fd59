//! Order pricing
//!
//! Three branches, decided per order:
//!
//! | Table state | Order mode | Charged |
//! |-------------|------------|---------|
//! | active buffet | any | always-priced items only |
//! | no active buffet | buffet | buffet price × party size + always-priced items |
//! | no active buffet | à la carte | every item |
//!
//! Items that are not charged keep a zero price snapshot and are marked as
//! included in the buffet.

use super::{
    Adjustments, LineInput, MAX_QUANTITY, PricedLine, PricedOrder, PricingError, round_money,
};
use rust_decimal::Decimal;
use shared::models::{Category, MenuItem};
use std::collections::HashMap;

/// How the submitted order wants to be priced
#[derive(Debug, Clone, Copy)]
pub enum PricingMode<'a> {
    ALaCarte,
    Buffet {
        category: &'a Category,
        party_size: u32,
    },
}

/// Price an order
///
/// `table_has_active_buffet` must be read in the same transaction that will
/// write the order. Any unknown or unavailable menu item fails the whole
/// computation.
pub fn price_order(
    mode: PricingMode<'_>,
    lines: &[LineInput],
    menu: &HashMap<i64, MenuItem>,
    adjustments: Adjustments,
    table_has_active_buffet: bool,
) -> Result<PricedOrder, PricingError> {
    validate_adjustments(&adjustments)?;

    let buffet_charge = match mode {
        PricingMode::ALaCarte => None,
        PricingMode::Buffet {
            category,
            party_size,
        } => {
            if !category.is_buffet {
                return Err(PricingError::CategoryNotBuffet(category.id));
            }
            let price = category
                .buffet_price()
                .ok_or(PricingError::MissingBuffetPrice(category.id))?;
            if party_size < 1 {
                return Err(PricingError::InvalidPartySize);
            }
            Some(round_money(price * Decimal::from(party_size)))
        }
    };

    // 已有自助餐在进行：只收 always_priced，自助餐价格不再重复收取
    let buffet_running = table_has_active_buffet || buffet_charge.is_some();

    let mut priced = Vec::with_capacity(lines.len());
    for line in lines {
        let item = menu
            .get(&line.menu_item_id)
            .ok_or(PricingError::MenuItemNotFound(line.menu_item_id))?;
        if !item.is_available {
            return Err(PricingError::MenuItemUnavailable(item.id));
        }
        if line.quantity < 1 || line.quantity > MAX_QUANTITY {
            return Err(PricingError::InvalidQuantity {
                menu_item_id: item.id,
                quantity: line.quantity,
            });
        }

        let included = buffet_running && !item.always_priced;
        priced.push(PricedLine {
            menu_item_id: item.id,
            category_id: item.category_id,
            name: item.name.clone(),
            quantity: line.quantity,
            unit_price: if included {
                Decimal::ZERO
            } else {
                round_money(item.price)
            },
            included_in_buffet: included,
            note: line.note.clone(),
        });
    }

    let items_total: Decimal = priced.iter().map(PricedLine::line_total).sum();
    let subtotal = match buffet_charge {
        Some(charge) if !table_has_active_buffet => charge + items_total,
        _ => items_total,
    };

    Ok(finish(priced, subtotal, adjustments))
}

fn validate_adjustments(adj: &Adjustments) -> Result<(), PricingError> {
    for (field, value) in [
        ("discount", adj.discount),
        ("service_charge", adj.service_charge),
        ("tip", adj.tip),
    ] {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(PricingError::NegativeAdjustment { field, value });
        }
    }
    Ok(())
}

fn finish(lines: Vec<PricedLine>, subtotal: Decimal, adj: Adjustments) -> PricedOrder {
    let subtotal = round_money(subtotal);
    let tax = Decimal::ZERO;
    let service_charge = round_money(adj.service_charge);
    let tip = round_money(adj.tip);

    let gross = subtotal + tax + service_charge + tip;
    let discount = round_money(adj.discount).min(gross);

    PricedOrder {
        lines,
        subtotal,
        tax,
        discount,
        service_charge,
        tip,
        total: subtotal + tax - discount + service_charge + tip,
    }
}
