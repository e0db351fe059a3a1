use crate::patterns::{crossover, Cross};
use rust_decimal::Decimal;

/// Directional call emitted by a signal generator.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Signal {
    Buy,
    Sell,
}

/// Turns a fast/slow crossover pattern into a directional [`Signal`], tracking the previous pair
/// of readings internally so callers only ever push the latest values.
#[derive(Debug, Clone, Default)]
pub struct CrossOverSignal {
    prev: Option<(Decimal, Decimal)>,
}

impl CrossOverSignal {
    pub fn new() -> Self {
        Self { prev: None }
    }

    /// Feed the latest fast/slow readings and return a signal if a crossover just occurred.
    pub fn update(&mut self, fast: Decimal, slow: Decimal) -> Option<Signal> {
        let signal = self.prev.and_then(|(prev_fast, prev_slow)| {
            crossover(prev_fast, prev_slow, fast, slow).map(|cross| match cross {
                Cross::Above => Signal::Buy,
                Cross::Below => Signal::Sell,
            })
        });
        self.prev = Some((fast, slow));
        signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_first_update_never_signals() {
        let mut gen = CrossOverSignal::new();
        assert_eq!(gen.update(dec!(1), dec!(2)), None);
    }

    #[test]
    fn test_cross_above_then_below() {
        let mut gen = CrossOverSignal::new();
        gen.update(dec!(1), dec!(2));
        assert_eq!(gen.update(dec!(3), dec!(2)), Some(Signal::Buy));
        assert_eq!(gen.update(dec!(1), dec!(2)), Some(Signal::Sell));
    }
}
