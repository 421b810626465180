use async_trait::async_trait;
use bigdecimal::BigDecimal;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};

use crate::external::price_provider::{Quote, QuoteProvider, QuoteProviderError};

/// In-memory quote source for tests.
pub struct StubProvider {
    quotes: HashMap<String, Quote>,
    calls: AtomicUsize,
    down: bool,
}

impl StubProvider {
    pub fn with(symbols: &[(&str, &str)]) -> Self {
        let quotes = symbols
            .iter()
            .map(|(s, p)| {
                (
                    s.to_string(),
                    Quote {
                        symbol: s.to_string(),
                        name: format!("{} Inc", s),
                        price: p.parse::<BigDecimal>().unwrap(),
                    },
                )
            })
            .collect();
        Self {
            quotes,
            calls: AtomicUsize::new(0),
            down: false,
        }
    }

    pub fn unavailable() -> Self {
        Self {
            quotes: HashMap::new(),
            calls: AtomicUsize::new(0),
            down: true,
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl QuoteProvider for StubProvider {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, QuoteProviderError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.down {
            return Err(QuoteProviderError::Timeout);
        }
        self.quotes
            .get(symbol)
            .cloned()
            .ok_or_else(|| QuoteProviderError::NotFound(symbol.to_string()))
    }
}
