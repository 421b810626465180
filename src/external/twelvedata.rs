use crate::external::price_provider::{Quote, QuoteProvider, QuoteProviderError};
use async_trait::async_trait;
use bigdecimal::BigDecimal;
use serde::Deserialize;
use std::time::Duration;

pub struct TwelveDataProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
}

impl TwelveDataProvider {
    pub fn new(
        api_key: String,
        base_url: String,
        timeout: Duration,
    ) -> Result<Self, QuoteProviderError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| QuoteProviderError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }
}

#[derive(Debug, Deserialize)]
struct TwelveDataQuoteResponse {
    symbol: Option<String>,
    name: Option<String>,
    close: Option<String>,

    // Error handling
    status: Option<String>,
    message: Option<String>,
    code: Option<u32>,
}

fn into_quote(requested: &str, body: TwelveDataQuoteResponse) -> Result<Quote, QuoteProviderError> {
    if body.status.as_deref() == Some("error") || body.code.is_some() {
        let msg = body.message.unwrap_or_default();
        return match body.code {
            Some(429) => Err(QuoteProviderError::RateLimited),
            _ if msg.contains("API rate limit") || msg.contains("credits") => {
                Err(QuoteProviderError::RateLimited)
            }
            Some(400) | Some(404) => Err(QuoteProviderError::NotFound(requested.to_string())),
            _ => Err(QuoteProviderError::BadResponse(msg)),
        };
    }

    let close = body
        .close
        .ok_or_else(|| QuoteProviderError::BadResponse("missing close in response".into()))?;
    let price = close
        .trim()
        .parse::<BigDecimal>()
        .map_err(|e| QuoteProviderError::Parse(e.to_string()))?;
    if price <= BigDecimal::from(0) {
        return Err(QuoteProviderError::BadResponse(format!("non-positive close {}", close.trim())));
    }

    let symbol = body.symbol.unwrap_or_else(|| requested.to_string());
    let name = body.name.unwrap_or_else(|| symbol.clone());

    Ok(Quote { symbol, name, price })
}

#[async_trait]
impl QuoteProvider for TwelveDataProvider {
    async fn fetch_quote(&self, symbol: &str) -> Result<Quote, QuoteProviderError> {
        let url = format!("{}/quote", self.base_url);

        let resp = self
            .client
            .get(&url)
            .query(&[("symbol", symbol), ("apikey", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    QuoteProviderError::Timeout
                } else {
                    QuoteProviderError::Network(e.to_string())
                }
            })?;

        if resp.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(QuoteProviderError::RateLimited);
        }

        let body: TwelveDataQuoteResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                QuoteProviderError::Timeout
            } else {
                QuoteProviderError::Parse(e.to_string())
            }
        })?;

        into_quote(symbol, body)
    }
}
