//! Dollar-cost-averaging strategy.
//!
//! Buys a fixed quote amount on the first candle and again every time the
//! configured period has elapsed, irrespective of price. Stateless with
//! respect to indicators.

use crate::domain::candle::Candle;
use crate::domain::error::QuantError;
use crate::domain::order::OrderSide;
use crate::domain::strategy::{Signal, Strategy};
use chrono::{DateTime, Duration, Utc};

#[derive(Debug)]
pub struct DcaStrategy {
    period: Duration,
    amount_quote: f64,

    last_purchase: Option<DateTime<Utc>>,
}

impl DcaStrategy {
    pub fn new(period: Duration, amount_quote: f64) -> Self {
        DcaStrategy {
            period,
            amount_quote,
            last_purchase: None,
        }
    }

    fn buy_signal(&self, candle: &Candle, tag: &str) -> Signal {
        Signal {
            action: OrderSide::Buy,
            quantity: self.amount_quote / candle.close,
            price: 0.0,
            reason: format!(
                "DCA {tag} Purchase: {:.2} quote @ {:.2}",
                self.amount_quote, candle.close
            ),
        }
    }
}

impl Strategy for DcaStrategy {
    fn initialize(&mut self) {
        self.last_purchase = None;
    }

    fn on_candle(&mut self, candle: &Candle) -> Result<Option<Signal>, QuantError> {
        match self.last_purchase {
            None => {
                self.last_purchase = Some(candle.open_time);
                Ok(Some(self.buy_signal(candle, "Initial")))
            }
            Some(last) if candle.open_time - last >= self.period => {
                self.last_purchase = Some(candle.open_time);
                Ok(Some(self.buy_signal(candle, "Regular")))
            }
            Some(_) => Ok(None),
        }
    }

    fn name(&self) -> String {
        let hours = self.period.num_hours();
        let period_str = if self.period.num_minutes() < 60 {
            format!("{}m", self.period.num_minutes())
        } else if hours < 24 {
            format!("{hours}h")
        } else {
            format!("{}d", hours / 24)
        };
        format!("DCA_{period_str}_{:.0}", self.amount_quote)
    }
}
