use echelon_domain::{EchelonError, EchelonResult, ErrorContext, MarketId, Side};
use rust_decimal::Decimal;

/// Result of applying one trade to a pair of binary CPMM reserves.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TradeEffect {
    pub new_reserves: [Decimal; 2],
    /// Shares delivered to (buy) or taken from (sell) the trader.
    pub shares: Decimal,
    /// Cost (buy) or proceeds (sell) per share.
    pub realized_price: Decimal,
}

/// Apply a trade of `quote_amount` quote-currency on `outcome_idx` to `reserves`, preserving the
/// product invariant `reserves[0] * reserves[1]`.
///
/// A `buy` mints `quote_amount` into the *other* outcome's reserve, then shrinks `outcome_idx`'s
/// reserve to restore the invariant; the shares removed from the pool go to the trader. A `sell`
/// is the mirror: `quote_amount` is removed from the other reserve (the trader is paid out of
/// it) and `outcome_idx`'s reserve grows as the trader's shares return to the pool. This is the
/// concrete rule pinned by the two-step scenario in spec.md §8.
pub fn apply_trade(
    market_id: MarketId,
    reserves: [Decimal; 2],
    outcome_idx: usize,
    quote_amount: Decimal,
    side: Side,
) -> EchelonResult<TradeEffect> {
    if outcome_idx > 1 {
        return Err(EchelonError::InvalidArg {
            reason: format!("outcome_idx {outcome_idx} out of range for binary market"),
            context: ErrorContext::market(market_id),
        });
    }
    if quote_amount <= Decimal::ZERO {
        return Err(EchelonError::InvalidArg {
            reason: "quote_amount must be positive".into(),
            context: ErrorContext::market(market_id),
        });
    }

    let other_idx = 1 - outcome_idx;
    let k = reserves[0] * reserves[1];

    let (new_other, new_self, shares, realized_price) = match side {
        Side::Buy => {
            let new_other = reserves[other_idx] + quote_amount;
            let new_self = k / new_other;
            let shares = reserves[outcome_idx] - new_self;
            if shares <= Decimal::ZERO {
                return Err(EchelonError::InvalidArg {
                    reason: "trade would not yield positive shares".into(),
                    context: ErrorContext::market(market_id),
                });
            }
            (new_other, new_self, shares, quote_amount / shares)
        }
        Side::Sell => {
            if quote_amount >= reserves[other_idx] {
                return Err(EchelonError::InsufficientFunds {
                    needed: quote_amount,
                    available: reserves[other_idx],
                });
            }
            let new_other = reserves[other_idx] - quote_amount;
            let new_self = k / new_other;
            let shares = new_self - reserves[outcome_idx];
            if shares <= Decimal::ZERO {
                return Err(EchelonError::InvalidArg {
                    reason: "trade would not consume positive shares".into(),
                    context: ErrorContext::market(market_id),
                });
            }
            (new_other, new_self, shares, quote_amount / shares)
        }
    };

    let mut new_reserves = [Decimal::ZERO; 2];
    new_reserves[outcome_idx] = new_self;
    new_reserves[other_idx] = new_other;

    Ok(TradeEffect {
        new_reserves,
        shares,
        realized_price,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_buy_yes_shrinks_yes_reserve_and_grows_no_reserve() {
        let effect = apply_trade(MarketId(1), [dec!(1000), dec!(1000)], 0, dec!(50), Side::Buy).unwrap();
        assert!(effect.new_reserves[0] < dec!(1000));
        assert!(effect.new_reserves[1] > dec!(1000));
        assert_eq!(effect.new_reserves[0] * effect.new_reserves[1], dec!(1000) * dec!(1000));
    }

    #[test]
    fn test_repeated_buys_get_progressively_more_expensive() {
        let first = apply_trade(MarketId(1), [dec!(1000), dec!(1000)], 0, dec!(50), Side::Buy).unwrap();
        let second = apply_trade(MarketId(1), first.new_reserves, 0, dec!(50), Side::Buy).unwrap();
        assert!(second.new_reserves[0] < first.new_reserves[0]);
        assert!(second.new_reserves[1] > first.new_reserves[1]);
        assert!(second.realized_price > first.realized_price);
    }
}
