/// Cost-basis ledger scenarios
///
/// End-to-end arithmetic checks for the weighted-average cost basis model:
/// a position is a (quantity, average_cost_basis) pair, buys fold into the
/// weighted average, sells reduce quantity without touching the average,
/// and a sell that reaches zero closes the position.

#[derive(Debug, Clone, Copy, PartialEq)]
struct Position {
    quantity: f64,
    average_cost_basis: f64,
}

#[derive(Debug, PartialEq)]
enum LedgerError {
    InsufficientQuantity { available: f64, requested: f64 },
    InvalidQuantity,
}

fn apply_buy(position: Option<Position>, quantity: f64, price: f64) -> Position {
    match position {
        None => Position {
            quantity,
            average_cost_basis: price,
        },
        Some(p) => Position {
            quantity: p.quantity + quantity,
            average_cost_basis: (p.quantity * p.average_cost_basis + quantity * price)
                / (p.quantity + quantity),
        },
    }
}

/// `None` quantity sells the whole position. Returns the surviving position,
/// or `None` when the sell closed it.
fn apply_sell(
    position: Position,
    quantity: Option<f64>,
) -> Result<Option<Position>, LedgerError> {
    let sell_quantity = match quantity {
        None => position.quantity,
        Some(q) if q <= 0.0 => return Err(LedgerError::InvalidQuantity),
        Some(q) if q > position.quantity => {
            return Err(LedgerError::InsufficientQuantity {
                available: position.quantity,
                requested: q,
            })
        }
        Some(q) => q,
    };

    let remaining = position.quantity - sell_quantity;
    if remaining == 0.0 {
        Ok(None)
    } else {
        Ok(Some(Position {
            quantity: remaining,
            average_cost_basis: position.average_cost_basis,
        }))
    }
}

fn unrealized_gain(position: Position, market_price: f64) -> f64 {
    position.quantity * (market_price - position.average_cost_basis)
}

// ---------------------------------------------------------------------------
// Buy-side scenarios
// ---------------------------------------------------------------------------

#[test]
fn first_buy_opens_position_at_purchase_price() {
    let p = apply_buy(None, 100.0, 150.0);
    assert_eq!(p.quantity, 100.0);
    assert_eq!(p.average_cost_basis, 150.0);
}

#[test]
fn second_buy_folds_into_weighted_average() {
    // 100 @ 150 then 50 @ 160 -> 150 shares at 153.33
    let p = apply_buy(None, 100.0, 150.0);
    let p = apply_buy(Some(p), 50.0, 160.0);
    assert_eq!(p.quantity, 150.0);
    assert!((p.average_cost_basis - 153.3333333333).abs() < 1e-9);
}

#[test]
fn many_small_buys_match_single_lump_buy() {
    let mut split = apply_buy(None, 10.0, 100.0);
    for _ in 0..9 {
        split = apply_buy(Some(split), 10.0, 100.0);
    }
    let lump = apply_buy(None, 100.0, 100.0);
    assert_eq!(split.quantity, lump.quantity);
    assert!((split.average_cost_basis - lump.average_cost_basis).abs() < 1e-9);
}

#[test]
fn buy_at_higher_price_raises_average() {
    let p = apply_buy(None, 10.0, 100.0);
    let p = apply_buy(Some(p), 10.0, 200.0);
    assert_eq!(p.average_cost_basis, 150.0);
}

#[test]
fn fractional_quantities_are_supported() {
    let p = apply_buy(None, 0.5, 40000.0);
    let p = apply_buy(Some(p), 0.25, 44000.0);
    assert_eq!(p.quantity, 0.75);
    assert!((p.average_cost_basis - 41333.3333333333).abs() < 1e-6);
}

// ---------------------------------------------------------------------------
// Sell-side scenarios
// ---------------------------------------------------------------------------

#[test]
fn partial_sell_keeps_average_cost_basis() {
    let p = apply_buy(None, 100.0, 150.0);
    let p = apply_buy(Some(p), 50.0, 160.0);
    let after = apply_sell(p, Some(50.0)).unwrap().unwrap();
    assert_eq!(after.quantity, 100.0);
    // Selling never moves the average
    assert_eq!(after.average_cost_basis, p.average_cost_basis);
}

#[test]
fn omitted_quantity_closes_the_position() {
    let p = apply_buy(None, 150.0, 153.0);
    assert_eq!(apply_sell(p, None).unwrap(), None);
}

#[test]
fn explicit_sell_of_full_quantity_closes_the_position() {
    let p = apply_buy(None, 150.0, 153.0);
    assert_eq!(apply_sell(p, Some(150.0)).unwrap(), None);
}

#[test]
fn oversell_fails_and_names_both_quantities() {
    let p = apply_buy(None, 150.0, 153.0);
    let err = apply_sell(p, Some(151.0)).unwrap_err();
    assert_eq!(
        err,
        LedgerError::InsufficientQuantity {
            available: 150.0,
            requested: 151.0
        }
    );
}

#[test]
fn zero_quantity_sell_is_rejected() {
    let p = apply_buy(None, 10.0, 100.0);
    assert_eq!(apply_sell(p, Some(0.0)), Err(LedgerError::InvalidQuantity));
}

#[test]
fn rebuy_after_full_sell_starts_a_fresh_cost_basis() {
    let p = apply_buy(None, 100.0, 150.0);
    assert_eq!(apply_sell(p, None).unwrap(), None);
    // History from the closed position does not leak into the new one
    let p = apply_buy(None, 10.0, 999.0);
    assert_eq!(p.average_cost_basis, 999.0);
}

// ---------------------------------------------------------------------------
// Valuation
// ---------------------------------------------------------------------------

#[test]
fn unrealized_gain_against_weighted_average() {
    let p = apply_buy(None, 100.0, 150.0);
    let p = apply_buy(Some(p), 50.0, 160.0);
    // 150 shares, avg 153.33; at 170 the gain is 150 * 16.67 = 2500
    let gain = unrealized_gain(p, 170.0);
    assert!((gain - 2500.0).abs() < 1e-6);
}

#[test]
fn loss_is_negative_gain() {
    let p = apply_buy(None, 10.0, 100.0);
    assert_eq!(unrealized_gain(p, 90.0), -100.0);
}
